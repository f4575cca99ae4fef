//! Configuration loading for dropzone
//!
//! All configuration comes from environment variables, resolved once at
//! startup into an immutable [`Config`] shared read-only with every
//! handler. Nothing mutates it after `main` constructs it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Configuration errors abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{uid_var} and {gid_var} must be set together")]
    PartialRunAs {
        uid_var: &'static str,
        gid_var: &'static str,
    },
}

/// HTTP Basic credentials guarding every route except `/health`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Unprivileged identity the tagger runs as and extracted trees are
/// chowned to.
#[derive(Debug, Clone, Copy)]
pub struct RunAs {
    pub uid: u32,
    pub gid: u32,
}

/// External tagger (beets) invocation parameters.
#[derive(Debug, Clone)]
pub struct BeetsConfig {
    /// Binary to invoke (`beet` unless overridden for tests/containers).
    pub command: String,
    /// Template config with `{{music_dir}}` / `{{beets_dir}}` placeholders.
    pub config_template: PathBuf,
    /// beets state directory (library database, logs).
    pub data_dir: PathBuf,
    /// Drop privileges to this identity when set.
    pub run_as: Option<RunAs>,
}

/// Navidrome connection parameters for the post-import rescan.
#[derive(Debug, Clone)]
pub struct NavidromeConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub credentials: Credentials,
    pub music_dir: PathBuf,
    pub books_dir: PathBuf,
    pub inbox_dir: PathBuf,
    pub snippets_file: PathBuf,
    pub beets: BeetsConfig,
    pub navidrome: NavidromeConfig,
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_path_or(var: &str, default: &str) -> PathBuf {
    PathBuf::from(env_or(var, default))
}

fn env_u32(var: &'static str) -> Result<Option<u32>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = env_or("DROPZONE_BIND", "0.0.0.0:8080")
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "DROPZONE_BIND",
                reason: e.to_string(),
            })?;

        let run_as = match (env_u32("DROPZONE_UID")?, env_u32("DROPZONE_GID")?) {
            (Some(uid), Some(gid)) => Some(RunAs { uid, gid }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::PartialRunAs {
                    uid_var: "DROPZONE_UID",
                    gid_var: "DROPZONE_GID",
                })
            }
        };

        let config_template = env_path_or("BEETS_CONFIG_TEMPLATE", "/config/beets/config.yaml");
        let data_dir = match std::env::var("BEETS_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_beets_dir(&config_template),
        };

        Ok(Config {
            bind,
            credentials: Credentials {
                username: env_or("DROPZONE_USER", "admin"),
                password: env_or("DROPZONE_PASSWORD", "changeme"),
            },
            music_dir: env_path_or("MUSIC_DIR", "/data/music"),
            books_dir: env_path_or("BOOKS_DIR", "/data/books"),
            inbox_dir: env_path_or("INBOX_DIR", "/data/inbox"),
            snippets_file: env_path_or("SNIPPETS_FILE", "/data/snippets.txt"),
            beets: BeetsConfig {
                command: env_or("BEET_COMMAND", "beet"),
                config_template,
                data_dir,
                run_as,
            },
            navidrome: NavidromeConfig {
                base_url: env_or("NAVIDROME_URL", "http://navidrome:4533"),
                username: env_or("NAVIDROME_USER", "admin"),
                password: env_or("NAVIDROME_PASSWORD", ""),
            },
        })
    }
}

/// Default beets state directory: sibling of the config template.
fn default_beets_dir(config_template: &Path) -> PathBuf {
    config_template
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_beets_dir_is_template_directory() {
        assert_eq!(
            default_beets_dir(Path::new("/config/beets/config.yaml")),
            PathBuf::from("/config/beets")
        );
        assert_eq!(default_beets_dir(Path::new("config.yaml")), PathBuf::from("."));
    }
}
