//! Configuration module for spmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation and defaults. The configuration is
//! immutable once loaded; the engine only ever reads it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for spmirror.
///
/// Field aliases accept the camelCase key names of legacy JSON
/// configurations (`tenantID`, `clientID`, `localCache`, `startTime`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SharePoint host, e.g. `acme.sharepoint.com`.
    pub host: String,
    /// Azure AD tenant (directory) ID.
    #[serde(alias = "tenantID")]
    pub tenant_id: String,
    /// Azure AD application (client) ID.
    #[serde(alias = "clientID")]
    pub client_id: String,
    /// Client secret for the app registration.
    pub secret: String,
    /// Sites with the document library folders to mirror.
    pub sites: Vec<SiteConfig>,
    pub sync: ScheduleConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// One SharePoint site with the document library folders to mirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name as it appears in the site URL.
    pub site: String,
    /// Root of the local cache for this site.
    #[serde(alias = "localCache")]
    pub local_cache: PathBuf,
    /// Folders to mirror from this site.
    pub folders: Vec<FolderMapping>,
}

/// A single drive folder to mirror into the site's local cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderMapping {
    /// Drive (document library) display name, e.g. `Documents`.
    pub drive: String,
    /// Path of the folder within the drive. Empty means the drive root.
    pub path: String,
}

/// Schedule settings. Both fields must parse for scheduling to be armed;
/// parsing lives with the scheduler, this section only carries the strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Daily anchor time, `"HH"` or `"HH:MM"` (24-hour clock).
    #[serde(alias = "startTime")]
    pub start_time: Option<String>,
    /// Fixed-rate interval, `"<integer><d|h|m>"`, e.g. `"8h"`.
    pub interval: Option<String>,
}

/// Sync engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of parallel sync workers.
    pub workers: usize,
    /// Maximum download attempts for a single file.
    pub download_attempts: u32,
    /// Delay between download attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Seconds before the idle watchdog starts polling.
    pub idle_initial_delay_secs: u64,
    /// Seconds between idle watchdog polls.
    pub idle_poll_secs: u64,
    /// Seconds of inactivity after which the watchdog stops the pool.
    pub idle_threshold_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    ///
    /// YAML is a superset of JSON, so a JSON configuration file loads too.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/spmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("spmirror")
            .join("config.yaml")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            download_attempts: 5,
            retry_delay_ms: 1500,
            idle_initial_delay_secs: 2 * 60,
            idle_poll_secs: 5 * 60,
            idle_threshold_secs: 5 * 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"engine.workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- connection ---
        for (field, value) in [
            ("host", &self.host),
            ("tenant_id", &self.tenant_id),
            ("client_id", &self.client_id),
            ("secret", &self.secret),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must not be empty".into(),
                });
            }
        }

        // --- sites ---
        for (i, site) in self.sites.iter().enumerate() {
            if site.site.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("sites[{i}].site"),
                    message: "must not be empty".into(),
                });
            }
            if site.local_cache.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: format!("sites[{i}].local_cache"),
                    message: "must not be empty".into(),
                });
            }
            for (j, folder) in site.folders.iter().enumerate() {
                if folder.drive.trim().is_empty() {
                    errors.push(ValidationError {
                        field: format!("sites[{i}].folders[{j}].drive"),
                        message: "must not be empty".into(),
                    });
                }
            }
        }

        // --- engine ---
        if self.engine.workers == 0 {
            errors.push(ValidationError {
                field: "engine.workers".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.engine.download_attempts == 0 {
            errors.push(ValidationError {
                field: "engine.download_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.engine.idle_threshold_secs == 0 {
            errors.push(ValidationError {
                field: "engine.idle_threshold_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.engine.idle_poll_secs == 0 {
            errors.push(ValidationError {
                field: "engine.idle_poll_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn valid_config() -> Config {
        let mut cfg = Config::default();
        cfg.host = "acme.sharepoint.com".into();
        cfg.tenant_id = "tenant-123".into();
        cfg.client_id = "client-456".into();
        cfg.secret = "s3cret".into();
        cfg.sites.push(SiteConfig {
            site: "Personnel".into(),
            local_cache: PathBuf::from("/share/acme/personnel"),
            folders: vec![FolderMapping {
                drive: "Documents".into(),
                path: "Personnel".into(),
            }],
        });
        cfg
    }

    // -- Defaults --

    #[test]
    fn default_engine_has_spec_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.engine.workers, 4);
        assert_eq!(cfg.engine.download_attempts, 5);
        assert_eq!(cfg.engine.retry_delay_ms, 1500);
        assert_eq!(cfg.engine.idle_initial_delay_secs, 120);
        assert_eq!(cfg.engine.idle_poll_secs, 300);
        assert_eq!(cfg.engine.idle_threshold_secs, 300);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_schedule_is_unset() {
        let cfg = Config::default();
        assert!(cfg.sync.start_time.is_none());
        assert!(cfg.sync.interval.is_none());
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
host: acme.sharepoint.com
tenant_id: tenant-123
client_id: client-456
secret: s3cret
sites:
  - site: Personnel
    local_cache: /share/acme/personnel
    folders:
      - drive: Documents
        path: Personnel
      - drive: Documents
        path: Personnel/Archive
sync:
  start_time: "22:00"
  interval: 8h
engine:
  workers: 8
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.host, "acme.sharepoint.com");
        assert_eq!(cfg.sites.len(), 1);
        assert_eq!(cfg.sites[0].folders.len(), 2);
        assert_eq!(cfg.sites[0].folders[1].path, "Personnel/Archive");
        assert_eq!(cfg.sync.start_time.as_deref(), Some("22:00"));
        assert_eq!(cfg.sync.interval.as_deref(), Some("8h"));
        assert_eq!(cfg.engine.workers, 8);
        // Unspecified engine fields keep their defaults
        assert_eq!(cfg.engine.download_attempts, 5);
    }

    #[test]
    fn load_accepts_legacy_json_config() {
        // Legacy configurations are JSON with camelCase keys; both load
        // unchanged (YAML is a JSON superset, aliases cover the keys).
        let json = r#"{
            "host": "acme.sharepoint.com",
            "clientID": "client-456",
            "tenantID": "tenant-123",
            "secret": "s3cret",
            "sites": [
                {
                    "site": "Personnel",
                    "folders": [{"drive": "Documents", "path": "Personnel"}],
                    "localCache": "/share/acme/personnel"
                }
            ],
            "sync": {"startTime": "22:00", "interval": "8h"}
        }"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(json.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load JSON config");
        assert_eq!(cfg.client_id, "client-456");
        assert_eq!(cfg.tenant_id, "tenant-123");
        assert_eq!(
            cfg.sites[0].local_cache,
            PathBuf::from("/share/acme/personnel")
        );
        assert_eq!(cfg.sync.start_time.as_deref(), Some("22:00"));
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.engine.workers, 4);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn valid_config_passes_validation() {
        let errors = valid_config().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn validate_catches_empty_connection_fields() {
        let mut cfg = valid_config();
        cfg.host = String::new();
        cfg.secret = "  ".into();
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"host"));
        assert!(fields.contains(&"secret"));
    }

    #[test]
    fn validate_catches_empty_site_fields() {
        let mut cfg = valid_config();
        cfg.sites[0].site = String::new();
        cfg.sites[0].local_cache = PathBuf::new();
        cfg.sites[0].folders[0].drive = String::new();
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"sites[0].site"));
        assert!(fields.contains(&"sites[0].local_cache"));
        assert!(fields.contains(&"sites[0].folders[0].drive"));
    }

    #[test]
    fn validate_catches_zero_engine_values() {
        let mut cfg = valid_config();
        cfg.engine.workers = 0;
        cfg.engine.download_attempts = 0;
        cfg.engine.idle_threshold_secs = 0;
        cfg.engine.idle_poll_secs = 0;
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"engine.workers"));
        assert!(fields.contains(&"engine.download_attempts"));
        assert!(fields.contains(&"engine.idle_threshold_secs"));
        assert!(fields.contains(&"engine.idle_poll_secs"));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = valid_config();
        cfg.logging.level = "verbose".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let mut cfg = valid_config();
            cfg.logging.level = level.to_string();
            assert!(
                !cfg.validate().iter().any(|e| e.field == "logging.level"),
                "level '{level}' should be valid"
            );
        }
    }

    #[test]
    fn empty_folder_path_is_valid() {
        // An empty mapping path addresses the drive root.
        let mut cfg = valid_config();
        cfg.sites[0].folders[0].path = String::new();
        assert!(cfg.validate().is_empty());
    }

    // -- default_path --

    #[test]
    fn default_path_ends_with_config_yaml() {
        let p = Config::default_path();
        assert!(p.ends_with("spmirror/config.yaml"));
    }

    // -- ValidationError Display --

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "engine.workers".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(err.to_string(), "engine.workers: must be greater than 0");
    }
}
