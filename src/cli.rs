//! Positional command line: `<install-root> <username> <session> <title> [mode]`.

use std::{ffi::OsString, path::PathBuf};

use clap::{Parser, error::ErrorKind};
use thiserror::Error;

use crate::{
    constants::{DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, MODE_COMPAT, MODE_MAXIMIZE},
    host::Dimension,
};

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "client-launcher", version, about = "Loads and hosts the game client")]
pub struct LaunchArgs {
    /// Install root; archives are read from `<install-root>/bin`.
    pub install_root: PathBuf,
    pub username: String,
    #[arg(allow_hyphen_values = true)]
    pub session_token: String,
    pub title: String,
    /// `compatmode`, `max` or `<W>x<H>`.
    #[arg(allow_hyphen_values = true)]
    pub mode: Option<String>,
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub ignored: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ArgsError {
    /// Help or version output was requested; not a failure.
    #[error("{0}")]
    Informational(clap::Error),

    #[error("{0}")]
    Insufficient(String),
}

pub fn parse_args<I, T>(argv: I) -> Result<LaunchArgs, ArgsError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    LaunchArgs::try_parse_from(argv).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ArgsError::Informational(e),
        _ => ArgsError::Insufficient(e.to_string()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Hosted { size: Dimension, maximize: bool },
    Compat,
}

/// Result of reading the mode token. An unusable token is not an error: the
/// default size is used and `warning` says why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSelection {
    pub mode: LaunchMode,
    pub warning: Option<String>,
}

pub fn parse_mode(token: Option<&str>) -> ModeSelection {
    let default_size = Dimension::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT);
    let hosted = |size, maximize| LaunchMode::Hosted { size, maximize };

    let Some(token) = token else {
        return ModeSelection { mode: hosted(default_size, false), warning: None };
    };
    if token.eq_ignore_ascii_case(MODE_COMPAT) {
        return ModeSelection { mode: LaunchMode::Compat, warning: None };
    }
    if token.eq_ignore_ascii_case(MODE_MAXIMIZE) {
        return ModeSelection { mode: hosted(default_size, true), warning: None };
    }
    match parse_dimension(token) {
        Some(size) => ModeSelection { mode: hosted(size, false), warning: None },
        None => ModeSelection {
            mode: hosted(default_size, false),
            warning: Some(format!(
                "invalid window size argument `{}`, using default {}x{}",
                token, DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT
            )),
        },
    }
}

fn parse_dimension(token: &str) -> Option<Dimension> {
    let (w, h) = token.split_once('x')?;
    let (width, height) = (w.trim().parse::<i32>().ok()?, h.trim().parse::<i32>().ok()?);
    (width > 0 && height > 0).then(|| Dimension::new(width, height))
}
