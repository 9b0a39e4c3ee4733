//! Configuration file management for fitai.
//!
//! Provides a TOML-based config file at `~/.config/fitai/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use fitai_core::generation::GeminiConfig;
use fitai_core::generation::gemini::{API_KEY_ENV, DEFAULT_MODEL, MODEL_ENV};
use fitai_core::retry::RetryPolicy;
use fitai_core::token::{SECRET_ENV, TokenConfig};
use fitai_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// Hex-encoded token secret (64 hex chars = 32 bytes).
    pub token_secret: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Override for the Gemini endpoint root, mostly for local proxies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fallback_attempts: Option<u32>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the fitai config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/fitai` or `~/.config/fitai`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("fitai");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fitai")
}

/// Return the path to the fitai config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file may hold an API key as well as the token secret.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Generate a random token secret: 32 random bytes, hex-encoded (64 chars).
pub fn generate_token_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Generation settings after resolution. The API key stays optional until
/// a command actually needs the model.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub max_fallback_attempts: u32,
}

impl GenerationSettings {
    /// Client config for the Gemini API, or an error naming where to put
    /// the key.
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!(
                "Gemini API key not found; set {API_KEY_ENV} or add generation.api_key to {}",
                config_path().display()
            );
        };
        let mut config = GeminiConfig::new(api_key);
        config.model = self.model.clone();
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_fallback_attempts: self.max_fallback_attempts,
        }
    }
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct FitaiConfig {
    pub db_config: DbConfig,
    /// `None` when neither the env var nor the config file has a secret.
    pub token_config: Option<TokenConfig>,
    pub generation: GenerationSettings,
}

impl FitaiConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `FITAI_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Token secret: `FITAI_TOKEN_SECRET` > `auth.token_secret` (hex-decoded) > none
    /// - API key: `GEMINI_API_KEY` > `generation.api_key` > none
    /// - Model: `FITAI_MODEL` > `generation.model` > `DEFAULT_MODEL`
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let token_config = if let Ok(secret_hex) = std::env::var(SECRET_ENV) {
            Some(
                TokenConfig::from_hex(&secret_hex)
                    .with_context(|| format!("{SECRET_ENV} env var is not a valid secret"))?,
            )
        } else if let Some(ref cfg) = file_config {
            Some(
                TokenConfig::from_hex(&cfg.auth.token_secret)
                    .context("invalid token_secret in config file")?,
            )
        } else {
            None
        };

        let section = file_config.map(|cfg| cfg.generation).unwrap_or_default();
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or(section.api_key);
        let model = std::env::var(MODEL_ENV)
            .ok()
            .filter(|model| !model.trim().is_empty())
            .or(section.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let generation = GenerationSettings {
            api_key,
            model,
            base_url: section.base_url,
            max_fallback_attempts: section
                .max_fallback_attempts
                .unwrap_or(RetryPolicy::default().max_fallback_attempts),
        };

        Ok(Self {
            db_config,
            token_config,
            generation,
        })
    }

    /// The token config, or an error if no secret was configured.
    pub fn require_token_config(&self) -> Result<&TokenConfig> {
        match &self.token_config {
            Some(config) => Ok(config),
            None => bail!(
                "token secret not found; set {SECRET_ENV} or run `fitai init` to create a config file"
            ),
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55";

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Point config lookups at an empty temp dir and clear every fitai env
    /// var. The returned dir must outlive the test body.
    fn isolate_env() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        for var in [DbConfig::ENV_VAR, SECRET_ENV, API_KEY_ENV, MODEL_ENV] {
            unsafe { std::env::remove_var(var) };
        }
        tmp
    }

    fn restore_env() {
        for var in ["XDG_CONFIG_HOME", DbConfig::ENV_VAR, SECRET_ENV, API_KEY_ENV, MODEL_ENV] {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn generate_token_secret_is_64_hex_chars() {
        let secret = generate_token_secret();
        assert_eq!(secret.len(), 64);
        assert!(
            secret.chars().all(|c| c.is_ascii_hexdigit()),
            "expected all hex digits, got: {secret}"
        );
        assert_ne!(secret, generate_token_secret());
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let _tmp = isolate_env();

        let original = ConfigFile {
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_string(),
            },
            auth: AuthSection {
                token_secret: SECRET.to_string(),
            },
            generation: GenerationSection {
                api_key: Some("key-123".to_string()),
                model: Some("gemini-2.5-flash".to_string()),
                base_url: None,
                max_fallback_attempts: Some(2),
            },
        };
        save_config(&original).unwrap();
        let loaded = load_config().unwrap();
        restore_env();

        assert_eq!(loaded.database.url, original.database.url);
        assert_eq!(loaded.auth.token_secret, original.auth.token_secret);
        assert_eq!(loaded.generation.api_key.as_deref(), Some("key-123"));
        assert_eq!(loaded.generation.max_fallback_attempts, Some(2));
        assert!(loaded.generation.base_url.is_none());
    }

    #[test]
    fn config_without_generation_section_parses() {
        let toml = r#"
            [database]
            url = "postgresql://localhost:5432/fitai"

            [auth]
            token_secret = "abcd"
        "#;
        let cfg: ConfigFile = toml::from_str(toml).unwrap();
        assert!(cfg.generation.api_key.is_none());
        assert!(cfg.generation.model.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let _tmp = isolate_env();

        let cfg = ConfigFile {
            database: DatabaseSection {
                url: DbConfig::DEFAULT_URL.to_string(),
            },
            auth: AuthSection {
                token_secret: SECRET.to_string(),
            },
            generation: GenerationSection::default(),
        };
        save_config(&cfg).unwrap();
        let meta = std::fs::metadata(config_path()).unwrap();
        restore_env();

        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        let _tmp = isolate_env();
        unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };

        let config = FitaiConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        restore_env();

        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn resolve_with_env_vars_overrides_config_file() {
        let _lock = lock_env();
        let _tmp = isolate_env();
        save_config(&ConfigFile {
            database: DatabaseSection {
                url: "postgresql://file:5432/filedb".to_string(),
            },
            auth: AuthSection {
                token_secret: "bb".repeat(32),
            },
            generation: GenerationSection {
                api_key: Some("file-key".to_string()),
                model: Some("file-model".to_string()),
                base_url: None,
                max_fallback_attempts: None,
            },
        })
        .unwrap();
        unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(SECRET_ENV, SECRET) };
        unsafe { std::env::set_var(API_KEY_ENV, "env-key") };
        unsafe { std::env::set_var(MODEL_ENV, "env-model") };

        let config = FitaiConfig::resolve(None).unwrap();
        restore_env();

        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(
            config.token_config.unwrap().secret,
            hex::decode(SECRET).unwrap()
        );
        assert_eq!(config.generation.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.generation.model, "env-model");
    }

    #[test]
    fn resolve_reads_config_file() {
        let _lock = lock_env();
        let _tmp = isolate_env();
        save_config(&ConfigFile {
            database: DatabaseSection {
                url: "postgresql://file:5432/filedb".to_string(),
            },
            auth: AuthSection {
                token_secret: SECRET.to_string(),
            },
            generation: GenerationSection {
                api_key: Some("file-key".to_string()),
                model: None,
                base_url: Some("http://localhost:9999".to_string()),
                max_fallback_attempts: Some(3),
            },
        })
        .unwrap();

        let config = FitaiConfig::resolve(None).unwrap();
        restore_env();

        assert_eq!(config.db_config.database_url, "postgresql://file:5432/filedb");
        assert!(config.require_token_config().is_ok());
        assert_eq!(config.generation.model, DEFAULT_MODEL);
        assert_eq!(config.generation.retry_policy().max_calls(), 4);

        let gemini = config.generation.gemini_config().unwrap();
        assert_eq!(gemini.api_key, "file-key");
        assert_eq!(gemini.base_url, "http://localhost:9999");
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        let _tmp = isolate_env();

        let config = FitaiConfig::resolve(None).unwrap();
        restore_env();

        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert!(config.token_config.is_none());
        assert!(config.generation.api_key.is_none());
        assert_eq!(config.generation.model, DEFAULT_MODEL);
        assert_eq!(config.generation.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn missing_secrets_are_reported_when_needed() {
        let _lock = lock_env();
        let _tmp = isolate_env();

        let config = FitaiConfig::resolve(None).unwrap();
        restore_env();

        let msg = config.require_token_config().unwrap_err().to_string();
        assert!(msg.contains("token secret not found"), "unexpected error: {msg}");

        let msg = config.generation.gemini_config().unwrap_err().to_string();
        assert!(msg.contains(API_KEY_ENV), "unexpected error: {msg}");
    }

    #[test]
    fn resolve_rejects_bad_hex_secret() {
        let _lock = lock_env();
        let _tmp = isolate_env();
        unsafe { std::env::set_var(SECRET_ENV, "not-hex") };

        let result = FitaiConfig::resolve(None);
        restore_env();

        assert!(result.is_err());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("fitai/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
