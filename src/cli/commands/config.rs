use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::state::Config;

/// Runs before any existing config is loaded, so a broken file can be
/// replaced with `--force`.
pub fn init(data_dir: &Path, force: bool) -> Result<()> {
    let config = Config {
        data_dir: data_dir.to_path_buf(),
        ..Config::default()
    };
    let path = config.config_path();
    if path.exists() && !force {
        bail!("Config already exists at {:?}. Use --force to overwrite.", path);
    }

    config.save(&path)?;
    println!("Wrote default config to {:?}", path);
    Ok(())
}

pub fn show(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render config")?;
    let source = if config.config_path().exists() {
        format!("{:?}", config.config_path())
    } else {
        "built-in defaults".to_string()
    };

    println!("# {}", source);
    print!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        init(temp.path(), false).unwrap();
        assert!(temp.path().join("config.toml").exists());

        assert!(init(temp.path(), false).is_err());
        init(temp.path(), true).unwrap();
    }

    #[test]
    fn test_init_replaces_broken_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "page_size = 900").unwrap();
        assert!(Config::load_or_default(temp.path()).is_err());

        init(temp.path(), true).unwrap();
        let config = Config::load_or_default(temp.path()).unwrap();
        assert_eq!(config.page_size, 50);
    }
}
