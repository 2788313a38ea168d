use crate::provider::OAuthToken;
use crate::utils::crypto::Sealer;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CREDENTIALS_FILE: &str = "youtube.json";

pub fn save(data_dir: &Path, token: &OAuthToken) -> Result<()> {
    let path = credentials_path(data_dir);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create credentials dir {:?}", parent))?;
    }

    let json = serde_json::to_string(token).context("Failed to serialize token")?;
    let sealed = Sealer::open(data_dir)?
        .seal(json.as_bytes())
        .context("Failed to encrypt credentials")?;

    fs::write(&path, sealed)
        .with_context(|| format!("Failed to write credentials to {:?}", path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

pub fn load(data_dir: &Path) -> Result<Option<OAuthToken>> {
    let path = credentials_path(data_dir);

    if !path.exists() {
        return Ok(None);
    }

    let sealed = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read credentials from {:?}", path))?;

    let decrypted = Sealer::open(data_dir)?
        .unseal(&sealed)
        .context("Failed to decrypt credentials")?;

    let token = serde_json::from_slice(&decrypted).context("Failed to parse credentials")?;

    Ok(Some(token))
}

pub fn delete(data_dir: &Path) -> Result<()> {
    let path = credentials_path(data_dir);

    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete credentials {:?}", path))?;
    }

    Ok(())
}

pub fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// True once the token is within `skew_secs` of its expiry. Tokens without
/// an expiry never expire locally.
pub fn is_expired(token: &OAuthToken, skew_secs: u64) -> bool {
    match token.expires_at {
        Some(expires_at) => now_secs() >= expires_at.saturating_sub(skew_secs),
        None => false,
    }
}

fn credentials_path(data_dir: &Path) -> PathBuf {
    data_dir.join("credentials").join(CREDENTIALS_FILE)
}
