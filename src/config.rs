use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub kintree: KintreeConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Core service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KintreeConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        HttpServerConfig {
            port: default_http_port(),
            bind_address: default_bind_address(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    // Default empty: set allowed_origins in config.toml for production
    vec![]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file.
    ///
    /// Loads environment variables from .env file (if present) before loading
    /// config. Looks for the config file in this order:
    /// 1. Path specified in KINTREE_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional; ignore a missing file.
        let _ = dotenv::dotenv();

        let config_path = std::env::var("KINTREE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str).context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if let Some(parent) = self.kintree.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                anyhow::bail!(
                    "db_path directory does not exist: {}. Create it or point db_path elsewhere in config.toml.",
                    parent.display()
                );
            }
        }

        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        match self.kintree.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => anyhow::bail!(
                "kintree.log_level must be one of error/warn/info/debug/trace, got '{}'",
                other
            ),
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.kintree.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide cwd and env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn create_test_config(temp_dir: &TempDir) -> String {
        let db_dir = temp_dir.path().canonicalize().unwrap();
        let db_path = db_dir.join("kintree.db");
        let db_path_str = db_path.to_str().unwrap().replace('\\', "\\\\");
        format!(
            r#"
[kintree]
db_path = "{}"
log_level = "debug"

[http_server]
port = 9090
bind_address = "0.0.0.0"
allowed_origins = ["https://family.example.com"]
"#,
            db_path_str
        )
    }

    /// Restores cwd when dropped (e.g. on panic).
    struct CwdGuard(std::path::PathBuf);
    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    fn with_config_env(config_path: &std::path::Path, f: impl FnOnce()) {
        let original = std::env::var("KINTREE_CONFIG").ok();
        std::env::set_var("KINTREE_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("KINTREE_CONFIG");
        if let Some(val) = original {
            std::env::set_var("KINTREE_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_content = create_test_config(&temp_dir);
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, config_content).unwrap();
        let config_path = config_path.canonicalize().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let _cwd = CwdGuard(original_dir.clone());
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.kintree.log_level, "debug");
            assert_eq!(config.http_server.port, 9090);
            assert_eq!(config.http_server.bind_address, "0.0.0.0");
            assert_eq!(config.http_server.allowed_origins.len(), 1);
        });
    }

    #[test]
    fn test_config_server_defaults() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().canonicalize().unwrap().join("kintree.db");
        let content = format!(
            "[kintree]\ndb_path = \"{}\"\n",
            db_path.to_str().unwrap().replace('\\', "\\\\")
        );
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).unwrap();
        let config_path = config_path.canonicalize().unwrap();
        with_config_env(&config_path, || {
            let config = Config::load().unwrap();
            assert_eq!(config.kintree.log_level, "info");
            assert_eq!(config.http_server.port, 8080);
            assert_eq!(config.http_server.bind_address, "127.0.0.1");
            assert!(config.http_server.allowed_origins.is_empty());
        });
    }

    #[test]
    fn test_config_rejects_bad_log_level() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().canonicalize().unwrap().join("kintree.db");
        let content = format!(
            "[kintree]\ndb_path = \"{}\"\nlog_level = \"loud\"\n",
            db_path.to_str().unwrap().replace('\\', "\\\\")
        );
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).unwrap();
        let config_path = config_path.canonicalize().unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("log_level"));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("KINTREE_CONFIG").ok();
        std::env::set_var("KINTREE_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("KINTREE_CONFIG");
        if let Some(v) = original {
            std::env::set_var("KINTREE_CONFIG", v);
        }
    }
}
