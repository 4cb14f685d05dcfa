//! Authenticated sealing of frame bodies.
//!
//! A sealed box is `nonce || ciphertext || tag` under AES-256-GCM. Each box
//! is bound by its associated data to the frame kind and to the item it was
//! written for, so a box copied from one item into another does not open.

use crate::error::{CodecError, CodecResult};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a sealing key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the per-box nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Salt used for password derivation when the application supplies none.
pub const DEFAULT_SALT: &[u8; 16] = b"a%Z\xe9\xc3N\x96\x82\xc5|#e\xfd1b&";

const DERIVE_INFO: &[u8] = b"appdatastore-value-key-v1";
const BINDING_TAG: &[u8] = b"appds";

/// Key that seals and opens values. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SealKey([u8; KEY_SIZE]);

impl SealKey {
    /// A fresh key from the operating system's random source.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// A key from exactly [`KEY_SIZE`] raw bytes.
    ///
    /// # Errors
    ///
    /// `InvalidKeySize` for any other length.
    pub fn from_slice(bytes: &[u8]) -> CodecResult<Self> {
        <[u8; KEY_SIZE]>::try_from(bytes)
            .map(Self)
            .map_err(|_| CodecError::invalid_key_size(bytes.len(), KEY_SIZE))
    }

    /// Derives a key from a password and salt with HKDF-SHA256.
    ///
    /// Processes sharing a store must agree on both, or they cannot read
    /// each other's sealed values. HKDF does not slow down guessing, so the
    /// password should carry real entropy.
    pub fn from_password(password: &[u8], salt: &[u8]) -> CodecResult<Self> {
        let mut bytes = [0u8; KEY_SIZE];
        Hkdf::<Sha256>::new(Some(salt), password)
            .expand(DERIVE_INFO, &mut bytes)
            .map_err(|e| CodecError::key_derivation_failed(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// The raw key material. Never log it.
    #[must_use]
    pub fn expose(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SealKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealKey(..)")
    }
}

/// Associated data for a box of frame kind `kind` stored under `item`.
pub(crate) fn binding(kind: u8, item: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(BINDING_TAG.len() + 1 + item.len());
    aad.extend_from_slice(BINDING_TAG);
    aad.push(kind);
    aad.extend_from_slice(item.as_bytes());
    aad
}

/// Seals and opens boxes under one key.
pub struct Sealer {
    cipher: Aes256Gcm,
}

impl Sealer {
    /// A sealer for `key`.
    #[must_use]
    pub fn new(key: &SealKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.expose())),
        }
    }

    /// Seals `plaintext` under a fresh nonce, authenticating `aad` with it.
    pub fn seal(&self, aad: &[u8], plaintext: &[u8]) -> CodecResult<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        let payload = Payload {
            msg: plaintext,
            aad,
        };
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), payload)
            .map_err(|e| CodecError::encryption_failed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Opens a box from [`seal`](Self::seal). `aad` must match exactly.
    ///
    /// # Errors
    ///
    /// `DecryptionFailed` for a truncated box, a different key, different
    /// associated data, or any modified byte.
    pub fn open(&self, aad: &[u8], sealed: &[u8]) -> CodecResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CodecError::decryption_failed(format!(
                "sealed box of {} bytes is shorter than nonce and tag",
                sealed.len()
            )));
        }
        let (nonce, msg) = sealed.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg, aad })
            .map_err(|_| CodecError::decryption_failed("authentication failed"))
    }
}

impl fmt::Debug for Sealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sealer(AES-256-GCM)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealer() -> Sealer {
        Sealer::new(&SealKey::from_password(b"pw", DEFAULT_SALT).unwrap())
    }

    #[test]
    fn box_layout_is_nonce_ciphertext_tag() {
        let sealed = sealer().seal(b"ctx", b"hello").unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 5 + TAG_SIZE);
    }

    #[test]
    fn fresh_nonce_per_box() {
        let sealer = sealer();
        let a = sealer.seal(b"ctx", b"same").unwrap();
        let b = sealer.seal(b"ctx", b"same").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_eq!(sealer.open(b"ctx", &a).unwrap(), sealer.open(b"ctx", &b).unwrap());
    }

    #[test]
    fn box_opens_only_with_its_binding() {
        let sealer = sealer();
        let sealed = sealer.seal(&binding(2, "token"), b"abc").unwrap();
        assert_eq!(sealer.open(&binding(2, "token"), &sealed).unwrap(), b"abc");
        assert!(sealer.open(&binding(2, "other"), &sealed).is_err());
        assert!(sealer.open(&binding(1, "token"), &sealed).is_err());
        assert!(sealer.open(b"", &sealed).is_err());
    }

    #[test]
    fn short_box_is_rejected_before_decrypting() {
        let err = sealer().open(b"", &[0u8; NONCE_SIZE + TAG_SIZE - 1]).unwrap_err();
        assert!(matches!(err, CodecError::DecryptionFailed { ref message } if message.contains("shorter")));
    }

    #[test]
    fn password_and_salt_both_shape_the_key() {
        let base = SealKey::from_password(b"pw", DEFAULT_SALT).unwrap();
        let again = SealKey::from_password(b"pw", DEFAULT_SALT).unwrap();
        let salted = SealKey::from_password(b"pw", b"elsewhere").unwrap();
        let other = SealKey::from_password(b"pw2", DEFAULT_SALT).unwrap();
        assert_eq!(base.expose(), again.expose());
        assert_ne!(base.expose(), salted.expose());
        assert_ne!(base.expose(), other.expose());
    }

    #[test]
    fn raw_keys_must_be_full_length() {
        assert!(SealKey::from_slice(&[7u8; KEY_SIZE]).is_ok());
        assert_eq!(
            SealKey::from_slice(&[7u8; 31]).unwrap_err(),
            CodecError::invalid_key_size(31, KEY_SIZE)
        );
        assert_ne!(SealKey::random().expose(), SealKey::random().expose());
    }

    #[test]
    fn debug_never_prints_material() {
        let key = SealKey::from_slice(&[0xAB; KEY_SIZE]).unwrap();
        let shown = format!("{key:?} {:?}", Sealer::new(&key));
        assert_eq!(shown, "SealKey(..) Sealer(AES-256-GCM)");
    }
}
