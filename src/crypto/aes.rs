use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};
use crate::error::{AppError, Result};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Derives a key from an arbitrary secret string with SHA-256.
    pub fn derive(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        Self(key)
    }

    /// Returns a reference to the key as a byte slice.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Generates a new random AES-GCM nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypts a plaintext using AES-256-GCM.
///
/// # Returns
///
/// A tuple containing the ciphertext and the nonce used for encryption.
pub fn encrypt(key: &SecureKey, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_SIZE])> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

    Ok((ciphertext, nonce_bytes))
}

/// Decrypts a ciphertext using AES-256-GCM.
pub fn decrypt(key: &SecureKey, ciphertext: &[u8], nonce: &[u8; NONCE_SIZE]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from(*nonce);

    cipher
        .decrypt(&nonce, ciphertext)
        .map_err(|e| AppError::Encryption(format!("Decryption failed: {}", e)))
}

/// Seals a plaintext into a cookie-safe token.
///
/// Format: URL-safe base64 (no padding) of `nonce || ciphertext`.
pub fn seal(key: &SecureKey, plaintext: &[u8]) -> Result<String> {
    let (ciphertext, nonce) = encrypt(key, plaintext)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);

    Ok(general_purpose::URL_SAFE_NO_PAD.encode(sealed))
}

/// Opens a token produced by [`seal`], trying each key in order.
pub fn open(keys: &[SecureKey], token: &str) -> Result<Vec<u8>> {
    let sealed = general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| AppError::Encryption(format!("Invalid token encoding: {}", e)))?;

    if sealed.len() <= NONCE_SIZE {
        return Err(AppError::Encryption("Token too short".to_string()));
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(nonce);

    keys.iter()
        .find_map(|key| decrypt(key, ciphertext, &nonce_bytes).ok())
        .ok_or_else(|| AppError::Encryption("No key could open the token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_token_opens_with_the_same_secret() {
        let key = SecureKey::derive("s3cr3t");
        let token = seal(&key, b"hello").unwrap();
        assert!(!token.contains('='));
        assert_eq!(open(&[key], &token).unwrap(), b"hello");
    }

    #[test]
    fn rotated_secret_still_opens_old_tokens() {
        let old = SecureKey::derive("old");
        let token = seal(&old, b"payload").unwrap();
        let keys = [SecureKey::derive("new"), SecureKey::derive("old")];
        assert_eq!(open(&keys, &token).unwrap(), b"payload");
    }

    #[test]
    fn wrong_secret_or_tampering_is_rejected() {
        let token = seal(&SecureKey::derive("a"), b"payload").unwrap();
        assert!(open(&[SecureKey::derive("b")], &token).is_err());

        let mut tampered = token.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(open(&[SecureKey::derive("a")], &tampered).is_err());

        assert!(open(&[SecureKey::derive("a")], "not base64!").is_err());
        assert!(open(&[SecureKey::derive("a")], "AAAA").is_err());
    }

    #[test]
    fn nonces_differ_between_seals() {
        let key = SecureKey::derive("k");
        assert_ne!(seal(&key, b"x").unwrap(), seal(&key, b"x").unwrap());
    }
}
