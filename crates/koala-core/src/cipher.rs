//! Credential cipher.
//!
//! Secrets travel to the login endpoint as Fernet tokens: AES-128-CBC with
//! PKCS#7 padding, authenticated by HMAC-SHA256, framed as
//!
//! ```text
//! 0x80 || u64be(unix seconds) || iv[16] || ciphertext || hmac[32]
//! ```
//!
//! and encoded as URL-safe base64 with padding. The random IV and the
//! timestamp make every token different, so ciphertexts must never be
//! compared; only their decryption at the receiving side is meaningful.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use aes::Aes128;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

use crate::error::CipherError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

const VERSION: u8 = 0x80;
const KEY_LEN: usize = 32;
const HALF_KEY_LEN: usize = KEY_LEN / 2;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;
const TAG_LEN: usize = 32;
const HEADER_LEN: usize = 1 + 8 + IV_LEN;

/// Maximum seconds a token timestamp may lie in the future when a TTL is enforced.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// URL-safe alphabet; encodes with padding, decodes with or without it.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The pre-shared symmetric key used to encrypt login secrets.
///
/// Parsed from 32 bytes of URL-safe base64: the first half signs, the
/// second half encrypts. Never shown in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginKey {
    signing: [u8; HALF_KEY_LEN],
    encryption: [u8; HALF_KEY_LEN],
}

impl LoginKey {
    /// Parse a base64-encoded key.
    ///
    /// Padding is optional and the standard alphabet's `+` and `/` are
    /// accepted in place of `-` and `_`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] if the input is not base64 or
    /// does not decode to exactly 32 bytes.
    pub fn parse(encoded: &str) -> Result<Self, CipherError> {
        let normalized: String = encoded
            .trim()
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();

        let bytes = URL_SAFE_LENIENT
            .decode(normalized.as_bytes())
            .map_err(|e| CipherError::InvalidKey {
                reason: e.to_string(),
            })?;

        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKey {
                reason: format!("expected {} bytes, got {}", KEY_LEN, bytes.len()),
            });
        }

        let mut signing = [0u8; HALF_KEY_LEN];
        let mut encryption = [0u8; HALF_KEY_LEN];
        signing.copy_from_slice(&bytes[..HALF_KEY_LEN]);
        encryption.copy_from_slice(&bytes[HALF_KEY_LEN..]);

        Ok(Self {
            signing,
            encryption,
        })
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut signing = [0u8; HALF_KEY_LEN];
        let mut encryption = [0u8; HALF_KEY_LEN];
        OsRng.fill_bytes(&mut signing);
        OsRng.fill_bytes(&mut encryption);
        Self {
            signing,
            encryption,
        }
    }

    /// Encode the key in the form [`LoginKey::parse`] accepts.
    pub fn to_base64(&self) -> String {
        let mut bytes = [0u8; KEY_LEN];
        bytes[..HALF_KEY_LEN].copy_from_slice(&self.signing);
        bytes[HALF_KEY_LEN..].copy_from_slice(&self.encryption);
        URL_SAFE_LENIENT.encode(bytes)
    }
}

impl FromStr for LoginKey {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for LoginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoginKey").field(&"[REDACTED]").finish()
    }
}

/// An encrypted secret, ready to be sent in place of the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    /// Returns the token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncryptedSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encrypt a secret with the given key.
///
/// # Errors
///
/// Returns [`CipherError::Encryption`] if the system RNG or clock fails.
pub fn encrypt(secret: &str, key: &LoginKey) -> Result<EncryptedSecret, CipherError> {
    let mut iv = [0u8; IV_LEN];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| CipherError::Encryption {
            message: e.to_string(),
        })?;

    encrypt_with(secret.as_bytes(), key, &iv, Utc::now().timestamp())
}

/// Decrypt a token produced by [`encrypt`].
///
/// The HMAC is verified before anything is decrypted, so a wrong key or a
/// modified token fails instead of yielding wrong plaintext. With a `ttl`,
/// tokens older than the TTL (or dated too far in the future) are rejected.
///
/// # Errors
///
/// Returns [`CipherError::InvalidToken`] or [`CipherError::Expired`].
pub fn decrypt(token: &str, key: &LoginKey, ttl: Option<Duration>) -> Result<String, CipherError> {
    decrypt_at(token, key, ttl, Utc::now().timestamp())
}

fn encrypt_with(
    plaintext: &[u8],
    key: &LoginKey,
    iv: &[u8; IV_LEN],
    timestamp: i64,
) -> Result<EncryptedSecret, CipherError> {
    let timestamp = u64::try_from(timestamp).map_err(|_| CipherError::Encryption {
        message: "system clock is before the unix epoch".to_string(),
    })?;

    let ciphertext = Aes128CbcEnc::new_from_slices(&key.encryption, iv)
        .map_err(|e| CipherError::Encryption {
            message: e.to_string(),
        })?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
    token.push(VERSION);
    token.extend_from_slice(&timestamp.to_be_bytes());
    token.extend_from_slice(iv);
    token.extend_from_slice(&ciphertext);

    let mut mac = HmacSha256::new_from_slice(&key.signing).map_err(|e| CipherError::Encryption {
        message: e.to_string(),
    })?;
    mac.update(&token);
    token.extend_from_slice(&mac.finalize().into_bytes());

    Ok(EncryptedSecret(URL_SAFE_LENIENT.encode(&token)))
}

fn decrypt_at(
    token: &str,
    key: &LoginKey,
    ttl: Option<Duration>,
    now: i64,
) -> Result<String, CipherError> {
    let data = URL_SAFE_LENIENT
        .decode(token.trim().as_bytes())
        .map_err(|_| CipherError::InvalidToken)?;

    if data.len() < HEADER_LEN + BLOCK_LEN + TAG_LEN || data[0] != VERSION {
        return Err(CipherError::InvalidToken);
    }

    let (signed, tag) = data.split_at(data.len() - TAG_LEN);
    let mut mac =
        HmacSha256::new_from_slice(&key.signing).map_err(|_| CipherError::InvalidToken)?;
    mac.update(signed);
    mac.verify_slice(tag).map_err(|_| CipherError::InvalidToken)?;

    if let Some(ttl) = ttl {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&signed[1..9]);
        let issued = i64::try_from(u64::from_be_bytes(ts)).map_err(|_| CipherError::InvalidToken)?;
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        if issued.saturating_add(ttl) < now {
            return Err(CipherError::Expired);
        }
        if now.saturating_add(MAX_CLOCK_SKEW_SECS) < issued {
            return Err(CipherError::Expired);
        }
    }

    let iv = &signed[9..HEADER_LEN];
    let ciphertext = &signed[HEADER_LEN..];
    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CipherError::InvalidToken);
    }

    let plaintext = Aes128CbcDec::new_from_slices(&key.encryption, iv)
        .map_err(|_| CipherError::InvalidToken)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::InvalidToken)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::InvalidToken)
}
