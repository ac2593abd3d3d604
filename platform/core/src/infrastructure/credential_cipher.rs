// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// AES-256-GCM credential cipher
//
// Provider API keys are stored as base64(nonce || ciphertext). The key is the
// SHA-256 digest of the configured secret.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::domain::provider::{CipherError, CredentialCipher};

const NONCE_LEN: usize = 12;

pub struct AesGcmCredentialCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCredentialCipher {
    pub fn new(secret: &str) -> Result<Self, CipherError> {
        if secret.is_empty() {
            return Err(CipherError::Key("encryption secret must not be empty".into()));
        }
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }
}

impl CredentialCipher for AesGcmCredentialCipher {
    fn encrypt_text(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    fn decrypt_text(&self, encoded: &str) -> Result<String, CipherError> {
        let payload = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CipherError::Decrypt(format!("invalid base64: {}", e)))?;
        if payload.len() <= NONCE_LEN {
            return Err(CipherError::Decrypt("payload too short".into()));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decrypt("authentication failed".into()))?;
        String::from_utf8(plaintext).map_err(|e| CipherError::Decrypt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_then_decrypt() {
        let cipher = AesGcmCredentialCipher::new("platform-secret").unwrap();
        let encrypted = cipher.encrypt_text("sk-live-123").unwrap();

        assert_ne!(encrypted, "sk-live-123");
        assert_eq!(cipher.decrypt_text(&encrypted).unwrap(), "sk-live-123");
    }

    #[test]
    fn test_nonce_differs_per_encryption() {
        let cipher = AesGcmCredentialCipher::new("platform-secret").unwrap();
        let a = cipher.encrypt_text("same").unwrap();
        let b = cipher.encrypt_text("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let encrypted = AesGcmCredentialCipher::new("one").unwrap().encrypt_text("key").unwrap();
        let err = AesGcmCredentialCipher::new("two").unwrap().decrypt_text(&encrypted).unwrap_err();
        assert!(matches!(err, CipherError::Decrypt(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        let cipher = AesGcmCredentialCipher::new("secret").unwrap();
        assert!(cipher.decrypt_text("not base64!").is_err());
        assert!(cipher.decrypt_text("AAAA").is_err());
        assert!(AesGcmCredentialCipher::new("").is_err());
    }
}
