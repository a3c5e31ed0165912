//! Default on-disk locations
//!
//! When `KSYNC_HOME` is set, everything lives under it: `config.toml`,
//! `sync_state.json` and `lancedb/`. Otherwise data goes under the platform
//! data directory (`%LOCALAPPDATA%`, `~/Library/Application Support`,
//! `$XDG_DATA_HOME`) and the config file under the platform config directory.
use std::path::{Path, PathBuf};

const APP_DIR: &str = "knowledge-sync";
const HOME_VAR: &str = "KSYNC_HOME";

/// Resolved roots for one process
#[derive(Debug, Clone, PartialEq, Eq)]
struct Roots {
    data: PathBuf,
    config: PathBuf,
}

impl Roots {
    fn resolve(home: Option<PathBuf>, data: Option<PathBuf>, config: Option<PathBuf>) -> Self {
        match home.filter(|h| !h.as_os_str().is_empty()) {
            Some(home) => Self {
                data: home.clone(),
                config: home,
            },
            None => Self {
                data: app_dir(data.as_deref()),
                config: app_dir(config.as_deref()),
            },
        }
    }

    fn current() -> Self {
        Self::resolve(
            std::env::var_os(HOME_VAR).map(PathBuf::from),
            dirs::data_local_dir(),
            dirs::config_dir(),
        )
    }
}

/// `<base>/knowledge-sync`, or a relative `knowledge-sync` when the platform has no such base
fn app_dir(base: Option<&Path>) -> PathBuf {
    base.unwrap_or_else(|| Path::new(".")).join(APP_DIR)
}

pub struct PlatformPaths;

impl PlatformPaths {
    pub fn default_lancedb_path() -> PathBuf {
        Roots::current().data.join("lancedb")
    }

    pub fn default_state_path() -> PathBuf {
        Roots::current().data.join("sync_state.json")
    }

    pub fn default_config_path() -> PathBuf {
        Roots::current().config.join("config.toml")
    }
}
