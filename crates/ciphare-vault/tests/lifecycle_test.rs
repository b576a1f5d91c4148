//! End-to-end submit/retrieve against in-memory collaborators: read
//! counting, lazy expiry, concurrent last reads and the sweeper.

use std::sync::Arc;
use std::time::Duration;

use ciphare_core::types::{ArtifactId, KdfParams};
use ciphare_core::CiphareError;
use ciphare_crypto::{AlgorithmRegistry, SecretString};
use ciphare_storage::{BlobStore, MemoryMetadataStore, MetadataStore, OperatorBlobStore};
use ciphare_vault::{SubmitRequest, Vault, VaultSettings};

const NOW: u64 = 1_700_000_000;

struct Harness {
    vault: Vault,
    blobs: Arc<OperatorBlobStore>,
    metadata: Arc<MemoryMetadataStore>,
}

fn light_kdf() -> KdfParams {
    KdfParams {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

fn harness() -> Harness {
    let blobs = Arc::new(OperatorBlobStore::memory(Duration::from_secs(5)).unwrap());
    let metadata = Arc::new(MemoryMetadataStore::new());
    let vault = Vault::new(
        Arc::new(AlgorithmRegistry::with_defaults(light_kdf())),
        blobs.clone(),
        metadata.clone(),
        VaultSettings::default(),
    );
    Harness {
        vault,
        blobs,
        metadata,
    }
}

fn pw(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

fn request(plaintext: &[u8], password: &str, reads: i64, ttl: i64) -> SubmitRequest {
    let mut req = SubmitRequest::new(plaintext.to_vec(), password);
    req.max_reads = Some(reads);
    req.ttl_secs = Some(ttl);
    req
}

#[tokio::test]
async fn single_read_secret_is_gone_after_first_retrieve() {
    let h = harness();
    let receipt = h
        .vault
        .submit_at(request(b"hello", "correct-horse", 1, 60), NOW)
        .await
        .unwrap();

    let got = h
        .vault
        .retrieve_at(receipt.id.as_str(), pw("correct-horse"), NOW + 1)
        .await
        .unwrap();
    assert_eq!(got.plaintext.as_slice(), b"hello");
    assert_eq!(got.remaining_reads, 0);

    let again = h
        .vault
        .retrieve_at(receipt.id.as_str(), pw("correct-horse"), NOW + 2)
        .await;
    assert!(matches!(again, Err(CiphareError::NotFound)));

    // Both halves destroyed
    assert!(h.metadata.find_by_id(&receipt.id).await.unwrap().is_none());
    assert_eq!(h.metadata.len().await.unwrap(), 0);
}

#[tokio::test]
async fn wrong_password_does_not_consume_a_read() {
    let h = harness();
    let receipt = h
        .vault
        .submit_at(request(b"three reads", "pw", 3, 3600), NOW)
        .await
        .unwrap();
    let id = receipt.id.as_str();

    assert_eq!(h.vault.retrieve_at(id, pw("pw"), NOW).await.unwrap().remaining_reads, 2);
    assert_eq!(h.vault.retrieve_at(id, pw("pw"), NOW).await.unwrap().remaining_reads, 1);

    let wrong = h.vault.retrieve_at(id, pw("nope"), NOW).await;
    assert!(matches!(wrong, Err(CiphareError::Authentication)));

    let record = h.metadata.find_by_id(&receipt.id).await.unwrap().unwrap();
    assert_eq!(record.reads_remaining, 1);

    let last = h.vault.retrieve_at(id, pw("pw"), NOW).await.unwrap();
    assert_eq!(last.plaintext.as_slice(), b"three reads");
    assert_eq!(last.remaining_reads, 0);
}

#[tokio::test]
async fn expired_artifact_is_unreachable_and_destroyed() {
    let h = harness();
    let receipt = h
        .vault
        .submit_at(request(b"ttl", "pw", 5, 60), NOW)
        .await
        .unwrap();
    let record = h.metadata.find_by_id(&receipt.id).await.unwrap().unwrap();

    // now == expires_at is still readable
    h.vault
        .retrieve_at(receipt.id.as_str(), pw("pw"), NOW + 60)
        .await
        .unwrap();

    let late = h
        .vault
        .retrieve_at(receipt.id.as_str(), pw("pw"), NOW + 61)
        .await;
    assert!(matches!(late, Err(CiphareError::NotFound)));
    assert!(h.metadata.find_by_id(&receipt.id).await.unwrap().is_none());
    assert!(h.blobs.get(&record.blob_key).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_and_missing_are_indistinguishable() {
    let h = harness();
    let receipt = h
        .vault
        .submit_at(request(b"x", "pw", 1, 60), NOW)
        .await
        .unwrap();

    let expired = h
        .vault
        .retrieve_at(receipt.id.as_str(), pw("pw"), NOW + 3600)
        .await
        .unwrap_err();
    let missing = h
        .vault
        .retrieve_at("AAAAAAAAAAAAAAAAAAAAAA", pw("pw"), NOW)
        .await
        .unwrap_err();
    let garbage = h
        .vault
        .retrieve_at("../../etc/passwd", pw("pw"), NOW)
        .await
        .unwrap_err();

    assert_eq!(expired.to_string(), missing.to_string());
    assert_eq!(missing.to_string(), garbage.to_string());
}

#[tokio::test]
async fn concurrent_readers_race_for_last_read() {
    let h = harness();
    let receipt = h
        .vault
        .submit_at(request(b"only once", "pw", 1, 600), NOW)
        .await
        .unwrap();
    let id = receipt.id.to_string();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let vault = h.vault.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            vault.retrieve_at(&id, pw("pw"), NOW).await
        }));
    }

    let mut ok = 0;
    let mut not_found = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(got) => {
                assert_eq!(got.remaining_reads, 0);
                ok += 1;
            }
            Err(CiphareError::NotFound) => not_found += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(not_found, 3);
}

#[tokio::test]
async fn tampered_display_metadata_fails_authentication() {
    let h = harness();
    let mut req = request(b"bound", "pw", 2, 600);
    req.file_name = Some("invoice.pdf".into());
    let receipt = h.vault.submit_at(req, NOW).await.unwrap();

    let mut record = h.metadata.find_by_id(&receipt.id).await.unwrap().unwrap();
    record.file_name = "invoice.exe".into();
    h.metadata.delete(&receipt.id).await.unwrap();
    h.metadata.insert(record).await.unwrap();

    let res = h.vault.retrieve_at(receipt.id.as_str(), pw("pw"), NOW).await;
    assert!(matches!(res, Err(CiphareError::Authentication)));
    let record = h.metadata.find_by_id(&receipt.id).await.unwrap().unwrap();
    assert_eq!(record.reads_remaining, 2);
}

#[tokio::test]
async fn malformed_tag_is_reported_before_decryption() {
    let h = harness();
    let receipt = h
        .vault
        .submit_at(request(b"x", "pw", 1, 600), NOW)
        .await
        .unwrap();

    let mut record = h.metadata.find_by_id(&receipt.id).await.unwrap().unwrap();
    record.tag = "AAAA".into(); // 3 bytes
    h.metadata.delete(&receipt.id).await.unwrap();
    h.metadata.insert(record).await.unwrap();

    let res = h.vault.retrieve_at(receipt.id.as_str(), pw("pw"), NOW).await;
    assert!(matches!(res, Err(CiphareError::MalformedMetadata(_))));
    let record = h.metadata.find_by_id(&receipt.id).await.unwrap().unwrap();
    assert_eq!(record.reads_remaining, 1);
}

#[tokio::test]
async fn missing_blob_reads_as_not_found() {
    let h = harness();
    let receipt = h
        .vault
        .submit_at(request(b"x", "pw", 1, 600), NOW)
        .await
        .unwrap();
    let record = h.metadata.find_by_id(&receipt.id).await.unwrap().unwrap();
    h.blobs.delete(&record.blob_key).await.unwrap();

    let res = h.vault.retrieve_at(receipt.id.as_str(), pw("pw"), NOW).await;
    assert!(matches!(res, Err(CiphareError::NotFound)));
    assert!(h.metadata.find_by_id(&receipt.id).await.unwrap().is_none());
}

#[tokio::test]
async fn sweep_destroys_only_expired() {
    let h = harness();
    let short = h
        .vault
        .submit_at(request(b"short", "pw", 1, 60), NOW)
        .await
        .unwrap();
    let long = h
        .vault
        .submit_at(request(b"long", "pw", 1, 86400), NOW)
        .await
        .unwrap();

    assert_eq!(h.vault.sweep_expired(NOW + 30).await.unwrap(), 0);
    assert_eq!(h.vault.sweep_expired(NOW + 120).await.unwrap(), 1);

    assert!(h.metadata.find_by_id(&short.id).await.unwrap().is_none());
    assert!(h.metadata.find_by_id(&long.id).await.unwrap().is_some());
}

#[tokio::test]
async fn sweeper_task_stops_on_shutdown() {
    let h = harness();
    h.vault
        .submit_at(request(b"stale", "pw", 1, 60), 1_000)
        .await
        .unwrap();

    let (tx, rx) = tokio::sync::watch::channel(false);
    let (swept_tx, mut swept_rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = ciphare_vault::spawn_sweeper(
        h.vault.clone(),
        Duration::from_millis(10),
        rx,
        move |n| {
            let _ = swept_tx.send(n);
        },
    );

    // First tick fires immediately and removes the long-expired artifact
    assert_eq!(swept_rx.recv().await, Some(1));
    assert_eq!(h.metadata.len().await.unwrap(), 0);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweeper exits")
        .unwrap();
}

#[tokio::test]
async fn unknown_id_never_touches_other_records() {
    let h = harness();
    let receipt = h
        .vault
        .submit_at(request(b"x", "pw", 2, 600), NOW)
        .await
        .unwrap();

    let other = ArtifactId::new_unchecked("BBBBBBBBBBBBBBBBBBBBBB".into());
    assert!(h.vault.retrieve_at(other.as_str(), pw("pw"), NOW).await.is_err());
    let record = h.metadata.find_by_id(&receipt.id).await.unwrap().unwrap();
    assert_eq!(record.reads_remaining, 2);
}
