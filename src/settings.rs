//! Launcher settings: defaults, then `<install-root>/launcher.toml`, then
//! `CLIENT_LAUNCHER_*` environment variables.

use std::{collections::BTreeMap, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::constants;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub log_level: String,
    pub grace_period_ms: u64,
    pub document_base: String,
    pub state_holder: String,
    pub entry_component: String,
    pub archives: Vec<String>,
    pub native_path_vars: Vec<String>,
    /// Secondary source for parameters the host did not set.
    pub default_parameters: BTreeMap<String, String>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            grace_period_ms: constants::DEFAULT_GRACE_PERIOD.as_millis() as u64,
            document_base: constants::DEFAULT_DOCUMENT_BASE.to_string(),
            state_holder: constants::STATE_HOLDER_TYPE.to_string(),
            entry_component: constants::ENTRY_COMPONENT_TYPE.to_string(),
            archives: constants::ARCHIVE_STEMS.iter().map(|s| s.to_string()).collect(),
            native_path_vars: constants::NATIVE_PATH_VARS.iter().map(|s| s.to_string()).collect(),
            default_parameters: BTreeMap::new(),
        }
    }
}

impl LauncherSettings {
    pub fn figment(install_root: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(LauncherSettings::default()))
            .merge(Toml::file(install_root.join(constants::SETTINGS_FILE)))
            .merge(Env::prefixed(constants::SETTINGS_ENV_PREFIX))
    }

    /// A broken layer never stops the launch: the defaults are returned
    /// together with the error, which the caller reports once logging is up.
    pub fn load(install_root: &Path) -> (Self, Option<figment::Error>) {
        Self::from_figment(Self::figment(install_root))
    }

    pub fn from_figment(figment: Figment) -> (Self, Option<figment::Error>) {
        match figment.extract() {
            Ok(settings) => (settings, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}
