//! Provider credential encryption
//!
//! AES-256-GCM encryption for provider access tokens stored in the
//! `api_configurations` table. Encrypted values carry a `zr1:` prefix so
//! plaintext rows from older imports can be detected and migrated.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

use crate::{Error, Result};

/// Prefix identifying encrypted token values
const ENCRYPTED_PREFIX: &str = "zr1:";

/// Cipher for provider access tokens
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Create a cipher from a raw 32-byte key
    pub fn new(key: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new_from_slice(key).expect("valid 32-byte key");
        Self { cipher }
    }

    /// Create a cipher from a base64-encoded 32-byte key
    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Crypto(format!("Invalid token key encoding: {}", e)))?;

        let key: [u8; 32] = decoded
            .try_into()
            .map_err(|_| Error::Crypto("Token key must be exactly 32 bytes".to_string()))?;

        Ok(Self::new(&key))
    }

    /// Encrypt a plaintext token, returning the prefixed ciphertext
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        // 96-bit random nonce, stored alongside the ciphertext
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

        let mut combined = Vec::with_capacity(12 + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", ENCRYPTED_PREFIX, STANDARD.encode(combined)))
    }

    /// Decrypt a prefixed ciphertext back to the plaintext token
    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let encoded = encrypted
            .strip_prefix(ENCRYPTED_PREFIX)
            .ok_or_else(|| Error::Crypto("Value is not an encrypted token".to_string()))?;

        let combined = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Crypto(format!("Invalid token ciphertext encoding: {}", e)))?;

        if combined.len() < 12 {
            return Err(Error::Crypto("Token ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::Crypto("Token decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::Crypto("Decrypted token is not valid UTF-8".to_string()))
    }

    /// Check whether a stored value is in the encrypted format
    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(ENCRYPTED_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> TokenCipher {
        TokenCipher::new(&[7u8; 32])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let token = "evo-api-key-123456";

        let encrypted = cipher.encrypt(token).unwrap();
        assert!(TokenCipher::is_encrypted(&encrypted));
        assert_ne!(encrypted, token);

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, token);
    }

    #[test]
    fn test_nonce_uniqueness() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same-token").unwrap();
        let b = cipher.encrypt("same-token").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = test_cipher().encrypt("secret").unwrap();
        let other = TokenCipher::new(&[9u8; 32]);
        assert!(other.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_plaintext_detected() {
        let cipher = test_cipher();
        assert!(!TokenCipher::is_encrypted("raw-token"));
        assert!(cipher.decrypt("raw-token").is_err());
    }

    #[test]
    fn test_base64_key_validation() {
        assert!(TokenCipher::from_base64_key("not base64!!!").is_err());
        // Valid base64 but wrong length
        assert!(TokenCipher::from_base64_key("c2hvcnQ=").is_err());

        let key = STANDARD.encode([1u8; 32]);
        assert!(TokenCipher::from_base64_key(&key).is_ok());
    }
}
