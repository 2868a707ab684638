use crate::error::{Error, Result};
use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

pub fn hash_password(plain: &str) -> std::result::Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2.hash_password(plain.as_bytes(), &salt)?.to_string();
    Ok(password_hash)
}

pub fn verify_password(
    plain: &str,
    hashed: &str,
) -> std::result::Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hashed)?;
    let ok = Argon2::default()
        .verify_password(plain.as_bytes(), &parsed_hash)
        .is_ok();
    Ok(ok)
}

/// AES-256-GCM cipher for contact fields. Stored values are hex strings with
/// a random nonce prepended; blind indexes give deterministic equality keys
/// so duplicate checks never require decrypting rows.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
    index_mac: HmacSha256,
}

impl FieldCipher {
    pub fn from_hex_key(master_key: &str) -> Result<Self> {
        let bytes = hex::decode(master_key)
            .map_err(|_| Error::Config("ENCRYPTION_KEY must be hex encoded".to_string()))?;
        if bytes.len() != 32 {
            return Err(Error::Config(
                "ENCRYPTION_KEY must be 64 hex characters (32 bytes)".to_string(),
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(&bytes)
            .map_err(|_| Error::Config("ENCRYPTION_KEY rejected by cipher".to_string()))?;
        // Index key is derived from the master key, so rotating the key also
        // rotates every blind index.
        let index_mac = <HmacSha256 as Mac>::new_from_slice(&bytes)
            .map(|mut mac| {
                mac.update(b"contact-blind-index");
                mac.finalize().into_bytes()
            })
            .and_then(|derived| <HmacSha256 as Mac>::new_from_slice(&derived))
            .map_err(|_| Error::Config("Failed to derive blind index key".to_string()))?;
        Ok(Self { cipher, index_mac })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| Error::Crypto("Encryption failed".to_string()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let raw = hex::decode(stored)
            .map_err(|_| Error::Crypto("Stored value is not valid hex".to_string()))?;
        if raw.len() <= NONCE_LEN {
            return Err(Error::Crypto("Stored value is too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::Crypto("Decryption failed".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|_| Error::Crypto("Decrypted value is not valid UTF-8".to_string()))
    }

    pub fn blind_index(&self, value: &str) -> String {
        let mut mac = self.index_mac.clone();
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Keeps digits and a single leading '+' so formatting differences do not
/// produce distinct duplicate-check keys.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if (c == '+' && i == 0) || c.is_ascii_digit() {
            out.push(c);
        }
    }
    out
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
