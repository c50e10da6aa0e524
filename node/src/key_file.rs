//! File-backed [`KeyProvider`]: a hex-encoded 32-byte Ed25519 seed on disk.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use attest_consensus::{KeyProvider, KeyProviderError};
use attest_crypto::{key_fingerprint, public_from_private};
use attest_types::{PrivateKey, PublicKey};
use tracing::info;
use zeroize::Zeroizing;

/// Holds the seed in memory until [`close`](KeyProvider::close); the seed is
/// zeroized when dropped.
pub struct FileKeyProvider {
    path: PathBuf,
    public: PublicKey,
    fingerprint: String,
    seed: Mutex<Option<PrivateKey>>,
}

impl FileKeyProvider {
    /// Read and decode the seed at `path`. Surrounding whitespace is ignored.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeyProviderError> {
        let path = path.as_ref().to_path_buf();
        let text = Zeroizing::new(
            std::fs::read_to_string(&path)
                .map_err(|e| KeyProviderError::Unavailable(format!("{}: {e}", path.display())))?,
        );
        let bytes = Zeroizing::new(
            hex::decode(text.trim())
                .map_err(|e| KeyProviderError::Malformed(format!("{}: {e}", path.display())))?,
        );
        let private = PrivateKey::from_slice(&bytes).ok_or_else(|| {
            KeyProviderError::Malformed(format!(
                "{}: expected 32-byte seed, found {} bytes",
                path.display(),
                bytes.len()
            ))
        })?;

        let public = public_from_private(&private);
        let fingerprint = key_fingerprint(&public);
        info!(path = %path.display(), %fingerprint, "loaded validator key");
        Ok(Self {
            path,
            public,
            fingerprint,
            seed: Mutex::new(Some(private)),
        })
    }

    /// Write `seed` to `path` as hex, for provisioning a validator.
    pub fn write_seed(path: impl AsRef<Path>, seed: &[u8; 32]) -> std::io::Result<()> {
        let encoded = Zeroizing::new(hex::encode(seed));
        std::fs::write(path, encoded.as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Public half, for registering this validator in the host's validator set.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

impl KeyProvider for FileKeyProvider {
    fn private_key(&self) -> Result<PrivateKey, KeyProviderError> {
        let guard = self
            .seed
            .lock()
            .map_err(|_| KeyProviderError::Unavailable("key lock poisoned".into()))?;
        guard
            .as_ref()
            .map(|k| PrivateKey(k.0))
            .ok_or(KeyProviderError::Closed)
    }

    fn key_fingerprint(&self) -> String {
        self.fingerprint.clone()
    }

    fn close(&self) -> Result<(), KeyProviderError> {
        let mut guard = self
            .seed
            .lock()
            .map_err(|_| KeyProviderError::Unavailable("key lock poisoned".into()))?;
        guard.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_crypto::keypair_from_seed;

    #[test]
    fn loads_seed_written_by_write_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.key");
        FileKeyProvider::write_seed(&path, &[9; 32]).unwrap();

        let keys = FileKeyProvider::open(&path).unwrap();
        let expected = keypair_from_seed(&[9; 32]).public;
        assert_eq!(keys.public_key(), &expected);
        assert_eq!(keys.key_fingerprint(), key_fingerprint(&expected));
        assert_eq!(keys.private_key().unwrap().0, [9; 32]);
    }

    #[test]
    fn tolerates_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.key");
        std::fs::write(&path, format!("{}\n", hex::encode([3u8; 32]))).unwrap();
        assert!(FileKeyProvider::open(&path).is_ok());
    }

    #[test]
    fn rejects_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let not_hex = dir.path().join("a.key");
        std::fs::write(&not_hex, "zz").unwrap();
        assert!(matches!(
            FileKeyProvider::open(&not_hex),
            Err(KeyProviderError::Malformed(_))
        ));

        let short = dir.path().join("b.key");
        std::fs::write(&short, hex::encode([1u8; 16])).unwrap();
        assert!(matches!(
            FileKeyProvider::open(&short),
            Err(KeyProviderError::Malformed(_))
        ));
    }

    #[test]
    fn missing_file_is_unavailable() {
        assert!(matches!(
            FileKeyProvider::open("/nonexistent/validator.key"),
            Err(KeyProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn close_drops_the_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.key");
        FileKeyProvider::write_seed(&path, &[4; 32]).unwrap();
        let keys = FileKeyProvider::open(&path).unwrap();

        keys.close().unwrap();
        assert!(matches!(keys.private_key(), Err(KeyProviderError::Closed)));
    }
}
