use serde::{Deserialize, Serialize};
use staffio_ldap::DirectoryConfig;
use staffio_postgres::{PostgresConfig, mask_password};

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "staffio.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub postgres: PostgresConfig,
    /// Directory sources in fan-out order
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.postgres.pool_size == 0 {
            return Err("postgres.pool_size must be > 0".into());
        }
        if self.postgres.connect_timeout_ms == 0 {
            return Err("postgres.connect_timeout_ms must be > 0".into());
        }
        self.directory.validate()?;
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// Copy safe to print: database credentials masked. Directory bind
    /// passwords are never serialized.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.postgres.url = copy.postgres.url.as_deref().map(mask_password);
        if copy.postgres.password.is_some() {
            copy.postgres.password = Some("****".into());
        }
        copy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, DEFAULT_CONFIG_PATH};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Builds the configuration from an optional TOML file overlaid with
    /// `STAFFIO__SECTION__KEY` environment variables, then validates it.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., STAFFIO__POSTGRES__POOL_SIZE=20
        builder = builder.add_source(
            Environment::with_prefix("STAFFIO")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffio_ldap::{FanOutPolicy, SourceConfig};
    use std::io::Write;

    fn valid() -> AppConfig {
        AppConfig {
            directory: DirectoryConfig {
                sources: vec![SourceConfig::new("ldap://localhost:389", "dc=example,dc=org")],
                policy: FanOutPolicy::default(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut cfg = valid();
        cfg.postgres.pool_size = 0;
        assert!(cfg.validate().unwrap_err().contains("pool_size"));

        let mut cfg = valid();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));

        let mut cfg = valid();
        cfg.directory.sources.clear();
        assert!(cfg.validate().unwrap_err().contains("directory.sources"));
    }

    #[test]
    fn test_redacted_hides_credentials() {
        let mut cfg = valid();
        cfg.postgres.url = Some("postgres://staffio:hunter2@db/staffio".into());
        cfg.postgres.password = Some("hunter2".into());
        cfg.directory.sources[0].bind_password = "ldap-secret".into();

        let shown = serde_json::to_string(&cfg.redacted()).unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("ldap-secret"));
        assert!(shown.contains("postgres://staffio:****@db/staffio"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[postgres]
host = "db.internal"
pool_size = 4

[directory]
policy = "all_sources"

[[directory.sources]]
addr = "ldap://primary:389"
base = "dc=example,dc=org"
bind_dn = "cn=admin,dc=example,dc=org"
bind_password = "secret"

[[directory.sources]]
addr = "ldap://replica:389"
base = "dc=example,dc=org"

[logging]
level = "debug"
"#
        )
        .unwrap();

        let cfg = loader::load_config(file.path().to_str()).unwrap();
        assert_eq!(cfg.postgres.host, "db.internal");
        assert_eq!(cfg.postgres.pool_size, 4);
        assert_eq!(cfg.directory.policy, FanOutPolicy::AllSources);
        assert_eq!(cfg.directory.sources.len(), 2);
        assert_eq!(cfg.directory.sources[0].bind_password, "secret");
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = loader::load_config(Some("/nonexistent/staffio.toml")).unwrap_err();
        assert!(err.contains("not found"));
    }
}
