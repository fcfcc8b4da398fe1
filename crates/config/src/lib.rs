//! Layered configuration.
//!
//! Values are resolved from, lowest priority first:
//!
//! 1. built-in defaults,
//! 2. a TOML file (an explicit path, or `config.toml` in the platform
//!    configuration directory if it exists),
//! 3. environment variables prefixed with `PACSTAGE_` (`PACSTAGE_ARCH=i686`).
//!
//! Command-line flags are applied on top by the binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use pacstage_library::SymlinkPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

const ENV_PREFIX: &str = "PACSTAGE_";
/// `arch` value that turns the architecture filter off.
pub const ARCH_NONE: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of package archives to scan.
    pub pool: PathBuf,
    /// Only keep packages for this architecture (plus `any`); `none` keeps all.
    pub arch: String,
    pub symlinks: SymlinkPolicy,
    /// Collect each package's file list while scanning.
    pub files: bool,
    /// File listing one target per line, used when no targets are given.
    pub manifest: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool: PathBuf::from("."),
            arch: std::env::consts::ARCH.to_string(),
            symlinks: SymlinkPolicy::default(),
            files: false,
            manifest: None,
        }
    }
}

impl Config {
    /// Location of the per-user configuration file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pacstage").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolve configuration from all layers.
    ///
    /// # Errors
    ///
    /// An explicit `path` that does not exist is an error; a missing default
    /// file is not. Values of the wrong type in any layer are an error.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "reading configuration file");
            figment = figment.merge(Toml::file(file));
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["log"])))
    }

    /// Extract configuration from an already assembled figment.
    pub fn extract(figment: Figment) -> Result<Self> {
        figment.extract().or_raise(|| ErrorKind::Invalid)
    }

    /// The architecture filter to apply, if any.
    pub fn arch_filter(&self) -> Option<&str> {
        match self.arch.trim() {
            "" | ARCH_NONE => None,
            arch => Some(arch),
        }
    }
}
