//! Name → cipher registry
//!
//! Built once at startup and shared by reference. Lookups are
//! case-insensitive; names are stored upper-cased.

use std::collections::BTreeMap;
use std::sync::Arc;

use ciphare_core::types::KdfParams;

use crate::cipher::{AeadCipher, Aes256GcmCipher};
use crate::error::CryptoError;

#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    ciphers: BTreeMap<String, Arc<dyn AeadCipher>>,
}

impl AlgorithmRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shipped by default: AES-256-GCM under `AES256`.
    pub fn with_defaults(kdf: KdfParams) -> Self {
        let mut registry = Self::new();
        registry.register(Aes256GcmCipher::NAME, Arc::new(Aes256GcmCipher::new(kdf)));
        registry
    }

    /// Register `cipher` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, cipher: Arc<dyn AeadCipher>) {
        let key = name.to_ascii_uppercase();
        if self.ciphers.insert(key.clone(), cipher).is_some() {
            tracing::warn!(algorithm = %key, "replaced registered encryption algorithm");
        } else {
            tracing::debug!(algorithm = %key, "registered encryption algorithm");
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn AeadCipher>, CryptoError> {
        self.resolve(name).map(|(_, cipher)| cipher)
    }

    /// Like [`get`](Self::get), but also returns the key the cipher is
    /// registered under. That key, not [`AeadCipher::name`], is what a
    /// stored artifact must record to be looked up again.
    pub fn resolve(&self, name: &str) -> Result<(String, Arc<dyn AeadCipher>), CryptoError> {
        self.ciphers
            .get_key_value(&name.to_ascii_uppercase())
            .map(|(key, cipher)| (key.clone(), Arc::clone(cipher)))
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.ciphers.keys().cloned().collect()
    }
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("algorithms", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{CipherAux, Sealed};
    use secrecy::SecretString;
    use zeroize::Zeroizing;

    struct NullCipher;

    impl AeadCipher for NullCipher {
        fn name(&self) -> &str {
            "NULL"
        }

        fn encrypt(
            &self,
            _plaintext: &[u8],
            _password: &SecretString,
            _aad: &[u8],
        ) -> Result<Sealed, CryptoError> {
            Err(CryptoError::Encryption)
        }

        fn decrypt(
            &self,
            _ciphertext: &[u8],
            _password: &SecretString,
            _aux: &CipherAux,
            _aad: &[u8],
        ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
            Err(CryptoError::Authentication)
        }
    }

    #[test]
    fn test_default_registry_has_aes256() {
        let registry = AlgorithmRegistry::with_defaults(KdfParams::default());
        assert_eq!(registry.names(), vec!["AES256".to_string()]);
        assert_eq!(registry.get("AES256").unwrap().name(), "AES256");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = AlgorithmRegistry::with_defaults(KdfParams::default());
        assert!(registry.get("aes256").is_ok());
        assert!(registry.get("Aes256").is_ok());
    }

    #[test]
    fn test_unknown_algorithm() {
        let registry = AlgorithmRegistry::with_defaults(KdfParams::default());
        match registry.get("ROT13") {
            Err(CryptoError::UnsupportedAlgorithm { name, available }) => {
                assert_eq!(name, "ROT13");
                assert_eq!(available, "AES256");
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("ROT13 must not resolve"),
        }
    }

    #[test]
    fn test_register_additional_cipher() {
        let mut registry = AlgorithmRegistry::with_defaults(KdfParams::default());
        registry.register("null", Arc::new(NullCipher));

        assert_eq!(registry.names(), vec!["AES256".to_string(), "NULL".to_string()]);
        assert_eq!(registry.get("NULL").unwrap().name(), "NULL");
        // existing entries are untouched
        assert_eq!(registry.get("AES256").unwrap().name(), "AES256");
    }

    #[test]
    fn test_resolve_returns_registry_key() {
        let mut registry = AlgorithmRegistry::new();
        registry.register(
            "aes-256-gcm",
            Arc::new(Aes256GcmCipher::new(KdfParams::default())),
        );

        let (key, cipher) = registry.resolve("Aes-256-Gcm").unwrap();
        assert_eq!(key, "AES-256-GCM");
        // the implementation's own name is not a registry key here
        assert_eq!(cipher.name(), "AES256");
        assert!(registry.get(cipher.name()).is_err());
    }
}
