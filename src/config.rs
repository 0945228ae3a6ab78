//! Deploy settings resolved from CLI flags, environment and `deploy.toml`.
//!
//! Flags and environment variables win over the file; the file wins over
//! built-in defaults. Resolution happens before any remote call so that a
//! bad setup never touches a stack.

use serde::Deserialize;
use stackkit::backend::AwsOptions;
use stackkit::{ExistenceCheck, WaitConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cli::GlobalArgs;
use crate::topology::Topology;

/// Config file used when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("allow_ip is not set (use --allow-ip, ALLOW_IP, or allow_ip in the config file)")]
    MissingAllowIp,

    #[error("config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("could not read config file {}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not read template {}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("invalid wait settings: {0}")]
    InvalidWait(String),
}

// ============================================================================
// File Config
// ============================================================================

/// Contents of `deploy.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub allow_ip: Option<String>,
    pub templates: TemplatesConfig,
    pub aws: AwsConfig,
    pub wait: WaitSection,
    pub existence: ExistenceSection,
    pub topology: Topology,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub network: String,
    pub instance: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            network: "infrastructure/network.yaml".to_string(),
            instance: "infrastructure/instance.yaml".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WaitSection {
    pub poll_interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExistenceSection {
    pub fail_open: bool,
}

impl Default for ExistenceSection {
    fn default() -> Self {
        Self { fail_open: true }
    }
}

impl FileConfig {
    /// Load a config file.
    ///
    /// When `required` is false a missing file yields the defaults.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if required {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()));
                }
                log::debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ============================================================================
// Resolved Settings
// ============================================================================

/// Everything a stack command needs, fully resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub allow_ip: String,
    pub network_template: String,
    pub instance_template: String,
    pub aws: AwsOptions,
    pub wait: WaitConfig,
    pub existence: ExistenceCheck,
    pub topology: Topology,
}

impl Settings {
    /// Resolve settings from flags, environment and the config file.
    pub fn resolve(args: &GlobalArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path, true)?,
            None => FileConfig::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
        };

        let allow_ip = args
            .allow_ip
            .clone()
            .or(file.allow_ip)
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .ok_or(ConfigError::MissingAllowIp)?;

        file.topology.validate()?;

        let wait = resolve_wait(args, &file.wait)?;

        let existence = if args.fail_closed || !file.existence.fail_open {
            ExistenceCheck::FailClosed
        } else {
            ExistenceCheck::FailOpen
        };

        let aws = AwsOptions {
            region: args.region.clone().or(file.aws.region),
            profile: args.profile.clone().or(file.aws.profile),
        };

        let network_template = read_template(&file.templates.network)?;
        let instance_template = read_template(&file.templates.instance)?;

        Ok(Self {
            allow_ip,
            network_template,
            instance_template,
            aws,
            wait,
            existence,
            topology: file.topology,
        })
    }
}

fn resolve_wait(args: &GlobalArgs, file: &WaitSection) -> Result<WaitConfig, ConfigError> {
    let defaults = WaitConfig::default();
    let poll_interval = args
        .poll_interval
        .or(file.poll_interval_secs)
        .map_or(defaults.poll_interval, Duration::from_secs);
    let timeout = args
        .timeout
        .or(file.timeout_secs)
        .map_or(defaults.timeout, Duration::from_secs);

    if poll_interval.is_zero() {
        return Err(ConfigError::InvalidWait(
            "poll interval must be at least one second".to_string(),
        ));
    }
    if timeout < poll_interval {
        return Err(ConfigError::InvalidWait(format!(
            "timeout ({}s) is shorter than the poll interval ({}s)",
            timeout.as_secs(),
            poll_interval.as_secs()
        )));
    }

    Ok(WaitConfig::new(poll_interval, timeout))
}

/// Read a stack document, expanding `~`.
pub fn read_template(path: &str) -> Result<String, ConfigError> {
    let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());
    fs::read_to_string(&expanded).map_err(|source| ConfigError::TemplateRead {
        path: expanded,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("network.yaml"), "Resources: {}\n").unwrap();
            fs::write(dir.path().join("instance.yaml"), "Resources:\n  I: {}\n").unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> String {
            self.dir.path().join(name).to_string_lossy().to_string()
        }

        /// Write a config pointing at the fixture templates, plus `extra`.
        fn config(&self, extra: &str) -> PathBuf {
            let content = format!(
                "{extra}\n[templates]\nnetwork = \"{}\"\ninstance = \"{}\"\n",
                self.path("network.yaml"),
                self.path("instance.yaml")
            );
            let path = self.dir.path().join("deploy.toml");
            fs::write(&path, content).unwrap();
            path
        }

        fn args(&self, extra: &str) -> GlobalArgs {
            GlobalArgs {
                config: Some(self.config(extra)),
                ..GlobalArgs::default()
            }
        }
    }

    #[test]
    fn test_missing_allow_ip() {
        let fixture = Fixture::new();
        let err = Settings::resolve(&fixture.args("")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAllowIp));
    }

    #[test]
    fn test_blank_allow_ip_is_missing() {
        let fixture = Fixture::new();
        let mut args = fixture.args("");
        args.allow_ip = Some("   ".to_string());
        assert!(matches!(
            Settings::resolve(&args).unwrap_err(),
            ConfigError::MissingAllowIp
        ));
    }

    #[test]
    fn test_defaults() {
        let fixture = Fixture::new();
        let settings = Settings::resolve(&fixture.args("allow_ip = \"10.0.0.0/8\"")).unwrap();

        assert_eq!(settings.allow_ip, "10.0.0.0/8");
        assert_eq!(settings.network_template, "Resources: {}\n");
        assert_eq!(settings.wait, WaitConfig::default());
        assert_eq!(settings.existence, ExistenceCheck::FailOpen);
        assert_eq!(settings.aws, AwsOptions::default());
        assert_eq!(settings.topology, Topology::default());
    }

    #[test]
    fn test_flags_override_file() {
        let fixture = Fixture::new();
        let mut args = fixture.args(
            r#"
allow_ip = "10.0.0.0/8"

[aws]
region = "eu-west-1"
profile = "ops"

[wait]
poll_interval_secs = 10
timeout_secs = 600
"#,
        );
        args.allow_ip = Some("203.0.113.7/32".to_string());
        args.region = Some("us-east-1".to_string());
        args.timeout = Some(120);
        args.fail_closed = true;

        let settings = Settings::resolve(&args).unwrap();
        assert_eq!(settings.allow_ip, "203.0.113.7/32");
        assert_eq!(settings.aws.region.as_deref(), Some("us-east-1"));
        assert_eq!(settings.aws.profile.as_deref(), Some("ops"));
        assert_eq!(settings.wait.poll_interval, Duration::from_secs(10));
        assert_eq!(settings.wait.timeout, Duration::from_secs(120));
        assert_eq!(settings.existence, ExistenceCheck::FailClosed);
    }

    #[test]
    fn test_fail_open_disabled_in_file() {
        let fixture = Fixture::new();
        let args = fixture.args("allow_ip = \"10.0.0.0/8\"\n[existence]\nfail_open = false");
        let settings = Settings::resolve(&args).unwrap();
        assert_eq!(settings.existence, ExistenceCheck::FailClosed);
    }

    #[test]
    fn test_partial_topology_override() {
        let fixture = Fixture::new();
        let args = fixture.args("allow_ip = \"10.0.0.0/8\"\n[topology]\nnetwork_stack = \"net\"");
        let settings = Settings::resolve(&args).unwrap();

        assert_eq!(settings.topology.network_stack, "net");
        assert_eq!(
            settings.topology.instance_stack_prefix,
            Topology::default().instance_stack_prefix
        );
        assert_eq!(settings.topology.instances.len(), 5);
    }

    #[test]
    fn test_invalid_topology() {
        let fixture = Fixture::new();
        let args = fixture.args("allow_ip = \"10.0.0.0/8\"\n[topology]\ninstances = []");
        assert!(matches!(
            Settings::resolve(&args).unwrap_err(),
            ConfigError::InvalidTopology(_)
        ));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let fixture = Fixture::new();
        let mut args = fixture.args("allow_ip = \"10.0.0.0/8\"");
        args.poll_interval = Some(0);
        assert!(matches!(
            Settings::resolve(&args).unwrap_err(),
            ConfigError::InvalidWait(_)
        ));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let fixture = Fixture::new();
        let args = GlobalArgs {
            config: Some(fixture.dir.path().join("nope.toml")),
            allow_ip: Some("10.0.0.0/8".to_string()),
            ..GlobalArgs::default()
        };
        assert!(matches!(
            Settings::resolve(&args).unwrap_err(),
            ConfigError::FileNotFound(_)
        ));
    }

    #[test]
    fn test_optional_config_may_be_missing() {
        let fixture = Fixture::new();
        let config = FileConfig::load(&fixture.dir.path().join("nope.toml"), false).unwrap();
        assert!(config.allow_ip.is_none());
        assert!(config.existence.fail_open);
    }

    #[test]
    fn test_parse_error() {
        let fixture = Fixture::new();
        let path = fixture.dir.path().join("bad.toml");
        fs::write(&path, "allow_ip = [").unwrap();
        assert!(matches!(
            FileConfig::load(&path, true).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let fixture = Fixture::new();
        let path = fixture.dir.path().join("typo.toml");
        fs::write(&path, "allow_ips = \"10.0.0.0/8\"").unwrap();
        assert!(FileConfig::load(&path, true).is_err());
    }

    #[test]
    fn test_missing_template() {
        let fixture = Fixture::new();
        let err = read_template(&fixture.path("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::TemplateRead { .. }));
    }
}
