//! Password-based AEAD ciphers
//!
//! An [`AeadCipher`] owns the whole password → ciphertext step: it generates
//! the salt and nonce itself so no caller can ever reuse one. The tag is kept
//! detached from the ciphertext because it is stored as its own field.

use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm,
};
use ciphare_core::types::KdfParams;
use rand::RngCore;
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::kdf::derive_key;
use crate::{NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// Salts outside this range cannot have been produced by us.
const MIN_SALT_SIZE: usize = 8;
const MAX_SALT_SIZE: usize = 64;

/// Domain separator for associated data.
const AAD_DOMAIN: &[u8] = b"ciphare/v1";

/// Output of one encryption: everything needed to decrypt later except the
/// password.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
    pub salt: [u8; SALT_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub kdf: KdfParams,
}

impl Sealed {
    pub fn aux(&self) -> CipherAux {
        CipherAux {
            nonce: self.nonce.to_vec(),
            salt: self.salt.to_vec(),
            tag: self.tag.to_vec(),
            kdf: self.kdf,
        }
    }
}

/// Stored auxiliary values as read back from metadata. Lengths are not
/// trusted until a cipher checks them.
#[derive(Debug, Clone)]
pub struct CipherAux {
    pub nonce: Vec<u8>,
    pub salt: Vec<u8>,
    pub tag: Vec<u8>,
    pub kdf: KdfParams,
}

/// A named password-based AEAD implementation.
pub trait AeadCipher: Send + Sync {
    /// Canonical registry name, e.g. `AES256`.
    fn name(&self) -> &str;

    /// Encrypt under a key derived from `password` with a fresh random salt
    /// and a fresh random nonce.
    fn encrypt(
        &self,
        plaintext: &[u8],
        password: &SecretString,
        aad: &[u8],
    ) -> Result<Sealed, CryptoError>;

    /// Re-derive the key from `password` and the stored salt, verify the tag
    /// and return the plaintext.
    ///
    /// Returns [`CryptoError::MalformedMetadata`] for wrongly sized aux values
    /// and [`CryptoError::Authentication`] for any tag mismatch.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        password: &SecretString,
        aux: &CipherAux,
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// AES-256-GCM keyed by Argon2id.
#[derive(Debug, Clone)]
pub struct Aes256GcmCipher {
    kdf: KdfParams,
}

impl Aes256GcmCipher {
    pub const NAME: &'static str = "AES256";

    /// `kdf` is used for new encryptions only; decryption always uses the
    /// parameters stored with the artifact.
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }
}

impl Default for Aes256GcmCipher {
    fn default() -> Self {
        Self::new(KdfParams::default())
    }
}

impl AeadCipher for Aes256GcmCipher {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        password: &SecretString,
        aad: &[u8],
    ) -> Result<Sealed, CryptoError> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_SIZE];
        rng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce);

        let key = derive_key(password, &salt, &self.kdf)?;
        let cipher = Aes256Gcm::new(key.as_bytes().into());

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), aad, &mut buffer)
            .map_err(|_| CryptoError::Encryption)?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(tag.as_slice());

        Ok(Sealed {
            ciphertext: buffer,
            nonce,
            salt,
            tag: tag_bytes,
            kdf: self.kdf,
        })
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        password: &SecretString,
        aux: &CipherAux,
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        check_aux(aux)?;

        let key = derive_key(password, &aux.salt, &aux.kdf)
            .map_err(|e| CryptoError::MalformedMetadata(e.to_string()))?;
        let cipher = Aes256Gcm::new(key.as_bytes().into());

        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(&aux.nonce),
                aad,
                &mut buffer,
                GenericArray::from_slice(&aux.tag),
            )
            .map_err(|_| CryptoError::Authentication)?;

        Ok(buffer)
    }
}

fn check_aux(aux: &CipherAux) -> Result<(), CryptoError> {
    if aux.tag.len() != TAG_SIZE {
        return Err(CryptoError::MalformedMetadata(format!(
            "tag must be {TAG_SIZE} bytes, got {}",
            aux.tag.len()
        )));
    }
    if aux.nonce.len() != NONCE_SIZE {
        return Err(CryptoError::MalformedMetadata(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            aux.nonce.len()
        )));
    }
    if !(MIN_SALT_SIZE..=MAX_SALT_SIZE).contains(&aux.salt.len()) {
        return Err(CryptoError::MalformedMetadata(format!(
            "salt must be {MIN_SALT_SIZE}..={MAX_SALT_SIZE} bytes, got {}",
            aux.salt.len()
        )));
    }
    Ok(())
}

/// Build the associated data bound into an artifact's tag.
///
/// Each part is length-prefixed (u32 BE) after a fixed domain string, so no
/// two different part lists encode to the same bytes.
pub fn associated_data(parts: &[&str]) -> Vec<u8> {
    let len = AAD_DOMAIN.len() + parts.iter().map(|p| 4 + p.len()).sum::<usize>();
    let mut aad = Vec::with_capacity(len);
    aad.extend_from_slice(AAD_DOMAIN);
    for part in parts {
        aad.extend_from_slice(&(part.len() as u32).to_be_bytes());
        aad.extend_from_slice(part.as_bytes());
    }
    aad
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_cipher() -> Aes256GcmCipher {
        Aes256GcmCipher::new(KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        })
    }

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let aad = associated_data(&["id1", "note.txt", "text/plain"]);

        let sealed = cipher.encrypt(b"hello", &pw("correct-horse"), &aad).unwrap();
        let plain = cipher
            .decrypt(&sealed.ciphertext, &pw("correct-horse"), &sealed.aux(), &aad)
            .unwrap();

        assert_eq!(plain.as_slice(), b"hello");
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt(b"", &pw("pw"), b"").unwrap();
        assert!(sealed.ciphertext.is_empty());

        let plain = cipher
            .decrypt(&sealed.ciphertext, &pw("pw"), &sealed.aux(), b"")
            .unwrap();
        assert!(plain.is_empty());
    }

    #[test]
    fn test_ciphertext_len_matches_plaintext() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt(&[0u8; 1000], &pw("pw"), b"").unwrap();
        assert_eq!(sealed.ciphertext.len(), 1000);
        assert_eq!(sealed.kdf, *cipher.kdf_params());
    }

    #[test]
    fn test_wrong_password() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt(b"secret", &pw("right"), b"").unwrap();

        let err = cipher
            .decrypt(&sealed.ciphertext, &pw("wrong"), &sealed.aux(), b"")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_call() {
        let cipher = test_cipher();
        let a = cipher.encrypt(b"same", &pw("same"), b"").unwrap();
        let b = cipher.encrypt(b"same", &pw("same"), b"").unwrap();

        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_tampered_fields_fail_authentication() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt(b"secret data", &pw("pw"), b"").unwrap();

        let mut ciphertext = sealed.ciphertext.clone();
        ciphertext[3] ^= 0x01;
        let err = cipher
            .decrypt(&ciphertext, &pw("pw"), &sealed.aux(), b"")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));

        let mut aux = sealed.aux();
        aux.nonce[0] ^= 0x01;
        let err = cipher
            .decrypt(&sealed.ciphertext, &pw("pw"), &aux, b"")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));

        let mut aux = sealed.aux();
        aux.tag[15] ^= 0x80;
        let err = cipher
            .decrypt(&sealed.ciphertext, &pw("pw"), &aux, b"")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));

        let mut aux = sealed.aux();
        aux.salt[0] ^= 0x01;
        let err = cipher
            .decrypt(&sealed.ciphertext, &pw("pw"), &aux, b"")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));
    }

    #[test]
    fn test_associated_data_mismatch() {
        let cipher = test_cipher();
        let aad = associated_data(&["id1", "a.txt", "text/plain"]);
        let sealed = cipher.encrypt(b"secret", &pw("pw"), &aad).unwrap();

        let renamed = associated_data(&["id1", "b.txt", "text/plain"]);
        let err = cipher
            .decrypt(&sealed.ciphertext, &pw("pw"), &sealed.aux(), &renamed)
            .unwrap_err();
        assert!(matches!(err, CryptoError::Authentication));
    }

    #[test]
    fn test_tag_length_checked_before_decrypt() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt(b"secret", &pw("pw"), b"").unwrap();

        let mut aux = sealed.aux();
        aux.tag.truncate(12);
        let err = cipher
            .decrypt(&sealed.ciphertext, &pw("pw"), &aux, b"")
            .unwrap_err();
        assert!(matches!(err, CryptoError::MalformedMetadata(_)));

        let mut aux = sealed.aux();
        aux.nonce.push(0);
        let err = cipher
            .decrypt(&sealed.ciphertext, &pw("pw"), &aux, b"")
            .unwrap_err();
        assert!(matches!(err, CryptoError::MalformedMetadata(_)));

        let mut aux = sealed.aux();
        aux.salt.truncate(2);
        let err = cipher
            .decrypt(&sealed.ciphertext, &pw("pw"), &aux, b"")
            .unwrap_err();
        assert!(matches!(err, CryptoError::MalformedMetadata(_)));
    }

    #[test]
    fn test_associated_data_is_unambiguous() {
        assert_ne!(associated_data(&["ab", "c"]), associated_data(&["a", "bc"]));
        assert_ne!(associated_data(&[]), associated_data(&[""]));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..512),
                          password in ".{0,32}") {
            let cipher = test_cipher();
            let sealed = cipher.encrypt(&plaintext, &pw(&password), b"aad").unwrap();
            let plain = cipher
                .decrypt(&sealed.ciphertext, &pw(&password), &sealed.aux(), b"aad")
                .unwrap();
            prop_assert_eq!(plain.as_slice(), plaintext.as_slice());
        }
    }
}
