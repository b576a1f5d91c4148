//! Daemon lifecycle: wiring, storage checks, sweeper, HTTP servers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ciphare_core::config::{CiphareConfig, MetadataBackend};
use ciphare_crypto::AlgorithmRegistry;
use ciphare_storage::{
    build_operator, BlobStore, BoundedMetadataStore, JsonMetadataStore, MemoryMetadataStore,
    MetadataStore, OperatorBlobStore, S3Credentials,
};
use ciphare_vault::{spawn_sweeper, Vault, VaultSettings};
use prometheus_client::registry::Registry;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::http::AppState;
use crate::metrics::{HealthState, Metrics};

pub async fn run(config: CiphareConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;
    info!("daemon starting");

    // Blob store
    let timeout = Duration::from_secs(config.storage.timeout_secs);
    let creds = S3Credentials::from_env();
    let op = build_operator(&config.storage, creds.as_ref()).context("building storage operator")?;
    let blobs: Arc<dyn BlobStore> = Arc::new(OperatorBlobStore::new(op, timeout));
    match blobs.check_health().await {
        Ok(()) => info!(backend = ?config.storage.backend, "blob store: connected"),
        // Keep going; /readyz reports it until the backend comes back
        Err(e) => warn!(backend = ?config.storage.backend, "blob store: {e}"),
    }

    // Metadata store
    let store: Arc<dyn MetadataStore> = match config.metadata.backend {
        MetadataBackend::Memory => {
            warn!("metadata backend is memory: artifacts are lost on restart");
            Arc::new(MemoryMetadataStore::new())
        }
        MetadataBackend::Json => {
            let store = JsonMetadataStore::open(&config.metadata.path)
                .await
                .with_context(|| {
                    format!("opening metadata store {}", config.metadata.path.display())
                })?;
            info!(path = %store.path().display(), "metadata store: json");
            Arc::new(store)
        }
    };
    let metadata: Arc<dyn MetadataStore> = Arc::new(BoundedMetadataStore::new(store, timeout));

    // Ciphers
    let registry = AlgorithmRegistry::with_defaults(config.crypto.kdf_params());
    registry
        .get(&config.crypto.default_algorithm)
        .context("crypto.default_algorithm")?;
    info!(algorithms = ?registry.names(), "encryption algorithms registered");

    let vault = Vault::new(
        Arc::new(registry),
        Arc::clone(&blobs),
        metadata,
        VaultSettings::from_config(&config),
    );

    // Prometheus metrics endpoint
    let mut prom = Registry::default();
    let metrics = Arc::new(Metrics::new(&mut prom));
    if let Some(addr) = config.daemon.metrics_addr.clone() {
        let state = HealthState {
            registry: Arc::new(prom),
            blobs: Arc::clone(&blobs),
        };
        tokio::spawn(async move {
            if let Err(e) = crate::metrics::serve(addr, state).await {
                error!("metrics server failed: {e}");
            }
        });
    }

    // Expiry sweeper
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = if config.sweep.enabled {
        let swept = metrics.swept.clone();
        Some(spawn_sweeper(
            vault.clone(),
            Duration::from_secs(config.sweep.interval_secs),
            shutdown_rx,
            move |n| {
                swept.inc_by(n as u64);
            },
        ))
    } else {
        info!("expiry sweeper disabled; relying on lazy expiry");
        None
    };

    // Public API
    let app = crate::http::router(AppState { vault, metrics }, &config.limits);
    let listener = tokio::net::TcpListener::bind(&config.daemon.listen)
        .await
        .with_context(|| format!("api bind {}", config.daemon.listen))?;
    info!(
        addr = %config.daemon.listen,
        public_url = %config.daemon.public_url,
        "api: listening"
    );

    notify_ready();

    let mut sigterm = signal(SignalKind::terminate()).context("registering SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("registering SIGINT handler")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM"),
                _ = sigint.recv() => info!("received SIGINT"),
            }
        })
        .await
        .context("api server")?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!("sweeper task ended abnormally: {e}");
        }
    }
    info!("daemon stopped");
    Ok(())
}

fn notify_ready() {
    // Send sd_notify(READY=1) to systemd if running as a service
    // Uses $NOTIFY_SOCKET env var; no-op if not set
    if let Ok(socket) = std::env::var("NOTIFY_SOCKET") {
        use std::os::unix::net::UnixDatagram;
        if let Ok(sock) = UnixDatagram::unbound() {
            let _ = sock.send_to(b"READY=1\n", &socket);
            tracing::debug!(notify_socket = %socket, "sent systemd READY=1");
        }
    }
}
