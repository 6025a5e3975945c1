use std::collections::BTreeMap;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: std::io::Error },

    #[error("Failed to write config {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: std::io::Error },

    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("No config path available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,

    #[error("Invalid duration for {field}: '{value}'")]
    InvalidDuration { field: String, value: String },

    #[error("Duplicate target name '{0}'")]
    DuplicateTarget(String),

    #[error("Target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub check: CheckSettings,

    #[serde(default)]
    pub notifier: NotifierSettings,

    #[serde(default, rename = "http", skip_serializing_if = "Vec::is_empty")]
    pub http_targets: Vec<HttpTarget>,

    #[serde(default, rename = "backup", skip_serializing_if = "Vec::is_empty")]
    pub backup_targets: Vec<BackupTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSettings {
    /// Time between two check cycles
    pub interval: String,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self { interval: "60s".into() }
    }
}

/// Chat webhook; notifications only go to the log when unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSettings {
    /// Local time of day, HH:MM:SS
    pub start: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTarget {
    pub name: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_contain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_not_contain: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_spacing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_spacing: Option<String>,
    /// Median latency above which the target is degraded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_threshold: Option<String>,
    /// "down" (default) or "degraded"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<vigil::SeverityMode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintenance_windows: Vec<WindowSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default)]
    pub follow_redirects: bool,
    /// Reuse connections across attempts, hiding connect and TLS time
    #[serde(default)]
    pub keep_alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackupSource {
    /// Files in a local directory
    Directory {
        path: path::PathBuf,
        #[serde(default)]
        prefix: String,
    },
    /// Objects in an S3 bucket
    S3 {
        #[serde(default)]
        region: Option<String>,
        bucket: String,
        #[serde(default)]
        prefix: String,
    },
    /// Snapshots of an RDS instance
    Rds {
        #[serde(default)]
        region: Option<String>,
        instance: String,
    },
    /// Machine images by name prefix, from any owner unless `owners` is set
    Ami {
        #[serde(default)]
        region: Option<String>,
        prefix: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        owners: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupTarget {
    pub name: String,

    #[serde(flatten)]
    pub source: BackupSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age_threshold: Option<String>,
    /// Bytes; defaults to 1 MiB for buckets and directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size_threshold: Option<u64>,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/vigil/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("vigil/config.toml"))
}

/// Parse a duration field, naming the field in the error
pub fn duration_field(field: &str, value: &str) -> Result<std::time::Duration, Error> {
    vigil::monitoring::policy::parse_duration(value)
        .ok_or_else(|| Error::InvalidDuration { field: field.to_string(), value: value.to_string() })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check: CheckSettings::default(),
            notifier: NotifierSettings::default(),
            http_targets: vec![HttpTarget {
                name: "example".into(),
                url: "https://example.com".into(),
                up_status: None,
                must_contain: None,
                must_not_contain: None,
                headers: BTreeMap::new(),
                basic_auth: None,
                attempts: Some(3),
                retries: Some(1),
                attempt_spacing: Some("1s".into()),
                retry_spacing: Some("500ms".into()),
                latency_threshold: None,
                severity: None,
                maintenance_windows: Vec::new(),
                timeout: None,
                insecure_skip_verify: false,
                follow_redirects: false,
                keep_alive: false,
            }],
            backup_targets: Vec::new(),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Configuration:")?;
        write_title_1(f, "Checks")?;
        write_1(f, "Interval", &self.check.interval)?;
        write_title_1(f, "Notifier")?;
        write_1(f, "Webhook", &self.notifier.webhook.as_deref().unwrap_or("(log only)"))?;

        write_title_1(f, "HTTP targets")?;
        for target in &self.http_targets {
            write_1(f, &target.name, &target.url)?;
            write_2(f, "Attempts", &target.attempts.unwrap_or(1))?;
            write_2(f, "Retries", &target.retries.unwrap_or(0))?;
            if let Some(threshold) = &target.latency_threshold {
                write_2(f, "Latency threshold", threshold)?;
            }
            for window in &target.maintenance_windows {
                write_2(f, "Maintenance", &format!("{} for {}", window.start, window.duration))?;
            }
        }

        write_title_1(f, "Backup targets")?;
        for target in &self.backup_targets {
            let source = match &target.source {
                BackupSource::Directory { path, .. } => format!("directory {}", path.display()),
                BackupSource::S3 { bucket, prefix, .. } => format!("s3://{bucket}/{prefix}"),
                BackupSource::Rds { instance, .. } => format!("rds {instance}"),
                BackupSource::Ami { prefix, .. } => format!("ami {prefix}*"),
            };
            write_1(f, &target.name, &source)?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/vigil/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
            Self::parse(&raw_string)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Parse and validate a TOML document
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| Error::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        std::fs::write(path, config_str)
            .map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Target names are debounce keys and must be unique
    fn validate(&self) -> Result<(), Error> {
        if duration_field("check.interval", &self.check.interval)?.is_zero() {
            return Err(Error::InvalidDuration { field: "check.interval".into(), value: self.check.interval.clone() });
        }

        let mut seen = std::collections::HashSet::new();
        let names = self.http_targets.iter().map(|t| &t.name).chain(self.backup_targets.iter().map(|t| &t.name));
        for name in names {
            if name.trim().is_empty() {
                return Err(Error::InvalidTarget { target: name.clone(), reason: "empty name".into() });
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateTarget(name.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
[check]
interval = "30s"

[notifier]
webhook = "https://hooks.example.com/T000"
channel = "#ops"

[[http]]
name = "homepage"
url = "https://example.com"
attempts = 3
retries = 1
latency_threshold = "300ms"
severity = "degraded"
headers = { Authorization = "Bearer ${TOKEN}" }

[[http.maintenance_windows]]
start = "02:00:00"
duration = "30m"
timezone = "Europe/Paris"

[[backup]]
name = "db dumps"
kind = "directory"
path = "/var/backups/db"
prefix = "dump-"
min_age_threshold = "24h"

[[backup]]
name = "images"
kind = "ami"
prefix = "web-"
"##;

    #[test]
    fn test_parse_sample_config() {
        let config = Config::parse(SAMPLE).unwrap();

        assert_eq!(config.check.interval, "30s");
        assert_eq!(config.notifier.channel.as_deref(), Some("#ops"));
        assert_eq!(config.http_targets.len(), 1);

        let http = &config.http_targets[0];
        assert_eq!(http.attempts, Some(3));
        assert_eq!(http.severity, Some(vigil::SeverityMode::Degraded));
        assert_eq!(http.headers["Authorization"], "Bearer ${TOKEN}");
        assert_eq!(http.maintenance_windows[0].timezone.as_deref(), Some("Europe/Paris"));

        assert_eq!(config.backup_targets.len(), 2);
        assert!(matches!(config.backup_targets[0].source, BackupSource::Directory { .. }));
        assert!(matches!(
            &config.backup_targets[1].source,
            BackupSource::Ami { prefix, owners, .. } if prefix == "web-" && owners.is_empty()
        ));
    }

    #[test]
    fn test_ami_owners_narrow_the_search() {
        let raw = r#"
[[backup]]
name = "images"
kind = "ami"
prefix = "web-"
owners = ["123456789012", "self"]
"#;
        let config = Config::parse(raw).unwrap();
        let BackupSource::Ami { owners, .. } = &config.backup_targets[0].source else {
            panic!("expected an ami source");
        };
        assert_eq!(owners, &vec!["123456789012".to_string(), "self".to_string()]);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let raw = r#"
[[http]]
name = "same"
url = "https://a.example.com"

[[backup]]
name = "same"
kind = "directory"
path = "/tmp"
"#;
        assert!(matches!(Config::parse(raw), Err(Error::DuplicateTarget(name)) if name == "same"));
    }

    #[test]
    fn test_invalid_interval_is_rejected() {
        let raw = "[check]\ninterval = \"soon\"\n";
        assert!(matches!(Config::parse(raw), Err(Error::InvalidDuration { .. })));
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/vigil");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.http_targets[0].name, "example");

        let written = dir.path().join("nested/vigil.toml");
        assert!(written.exists());

        let reloaded = Config::from_config(Some(&written)).unwrap();
        assert_eq!(reloaded.check.interval, config.check.interval);
        assert_eq!(reloaded.http_targets[0].retry_spacing.as_deref(), Some("500ms"));
    }

    #[test]
    fn test_display_lists_targets() {
        let rendered = Config::parse(SAMPLE).unwrap().to_string();
        assert!(rendered.contains("homepage: https://example.com"));
        assert!(rendered.contains("db dumps: directory /var/backups/db"));
        assert!(rendered.contains("Maintenance: 02:00:00 for 30m"));
    }
}
