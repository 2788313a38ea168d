use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{Context, Result};
use base64::Engine;
use rand::RngCore;
use std::fs;
use std::path::Path;

const KEY_FILE: &str = "encryption.key";
const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// AES-256-GCM sealing with a per-install key kept next to the data it guards.
/// Sealed output is `base64(nonce || ciphertext)`.
pub struct Sealer {
    cipher: Aes256Gcm,
}

impl Sealer {
    /// Load the key from `data_dir`, generating it on first use.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let key = load_or_create_key(data_dir)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| anyhow::anyhow!("Failed to create cipher: {}", e))?;
        Ok(Self { cipher })
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
    }

    pub fn unseal(&self, sealed: &str) -> Result<Vec<u8>> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(sealed.trim())
            .context("Sealed data is not valid base64")?;

        if raw.len() < NONCE_SIZE {
            anyhow::bail!("Invalid sealed data: too short");
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow::anyhow!("Decryption failed: {}", e))
    }
}

fn load_or_create_key(data_dir: &Path) -> Result<Vec<u8>> {
    let key_path = data_dir.join(KEY_FILE);

    if key_path.exists() {
        let key = fs::read(&key_path).context("Failed to read encryption key")?;
        if key.len() != KEY_SIZE {
            anyhow::bail!("Invalid encryption key size in {:?}", key_path);
        }
        return Ok(key);
    }

    let mut key = vec![0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create directory {:?}", data_dir))?;
    fs::write(&key_path, &key).context("Failed to write encryption key")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&key_path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_seal_unseal() {
        let temp = TempDir::new().unwrap();
        let sealer = Sealer::open(temp.path()).unwrap();

        let sealed = sealer.seal(b"refresh-token-material").unwrap();
        assert!(!sealed.contains("refresh-token-material"));
        assert_eq!(sealer.unseal(&sealed).unwrap(), b"refresh-token-material");
    }

    #[test]
    fn test_key_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let sealed = Sealer::open(temp.path()).unwrap().seal(b"data").unwrap();

        let reopened = Sealer::open(temp.path()).unwrap();
        assert_eq!(reopened.unseal(&sealed).unwrap(), b"data");
    }

    #[test]
    fn test_foreign_key_rejected() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let sealed = Sealer::open(a.path()).unwrap().seal(b"data").unwrap();

        assert!(Sealer::open(b.path()).unwrap().unseal(&sealed).is_err());
    }
}
