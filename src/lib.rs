//! Bootstrapper for a closed game client shipped as a set of archives plus a
//! directory of native libraries.
//!
//! - Exports the native search variables and home directory the client reads
//! - Opens the archives into one loading context and resolves its types
//! - Points the client's private static working-directory field at the install root
//! - Hosts the client's applet-like entry component in a native window
//! - Falls back to the client's own `main` when the component cannot be built
//! - Bounds shutdown with a watchdog so a hung `stop`/`destroy` cannot keep the process alive

pub mod cli;
pub mod constants;
pub mod error;
pub mod host;
pub mod launcher;
pub mod logging;
pub mod runtime;
pub mod settings;
pub mod watchdog;
pub mod window;

use std::{ffi::OsString, sync::Arc};

use log::{error, info, warn};

use cli::ArgsError;
use error::LoadError;
use launcher::{LaunchConfig, Launcher, NativeArchives};
use settings::LauncherSettings;
use watchdog::ProcessTerminator;

/// Native window backend of the current target.
#[cfg(windows)]
pub type PlatformWindowFactory = window::win32::Win32WindowFactory;
#[cfg(not(windows))]
pub type PlatformWindowFactory = window::headless::HeadlessWindowFactory;

/// Program entry point; returns the process exit code.
///
/// 1. Parse the positional arguments.
/// 2. Load settings from the install root and initialize logging.
/// 3. Export process properties while still single-threaded.
/// 4. Load, patch and host (or invoke) the client.
pub fn run<I, T>(argv: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match cli::parse_args(argv) {
        Ok(args) => args,
        Err(ArgsError::Informational(e)) => {
            let _ = e.print();
            return 0;
        }
        Err(ArgsError::Insufficient(reason)) => {
            logging::init_logging("info");
            let e = LoadError::InsufficientArguments(reason);
            error!("[Launcher] {}", e);
            return e.exit_code();
        }
    };

    let (settings, settings_error) = LauncherSettings::load(&args.install_root);
    logging::init_logging(&settings.log_level);
    if let Some(e) = settings_error {
        warn!("[Settings] ignoring invalid settings: {}", e);
    }
    info!("[Launcher] starting from {}", args.install_root.display());

    let config = LaunchConfig::new(args, &settings);
    if let Err(e) = config.process_properties(&settings).apply() {
        error!("[Launcher] {}", e);
        return e.exit_code();
    }

    let launcher = Launcher::new(
        settings,
        PlatformWindowFactory::default(),
        NativeArchives,
        Arc::new(ProcessTerminator),
    );
    launcher.run(&config)
}
