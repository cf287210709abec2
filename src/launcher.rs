//! Launch sequence: open the client's archives, patch its working directory,
//! then either host its entry component in a window or hand control to its
//! own entry point.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, error, info, warn};

use crate::{
    cli::{LaunchArgs, LaunchMode, parse_mode},
    constants::{APPLICATION_DIR_NAME, BIN_DIR, ENTRY_POINT_METHOD, HOME_VAR, NATIVES_DIR},
    error::{LoadError, LoadResult},
    runtime::{Archive, NativeArchive, ProcessProperties, RuntimeHandle, RuntimeLoader},
    settings::LauncherSettings,
    watchdog::{ExitLatch, ShutdownWatchdog, Terminator},
    window::{HostingOptions, NativeWindow, WindowController, WindowFactory},
};

/// Everything derived from the command line before anything is loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub install_root: PathBuf,
    pub archive_paths: Vec<PathBuf>,
    pub native_lib_dir: PathBuf,
    /// Value written into the client's working-directory field.
    pub working_dir: PathBuf,
    pub username: String,
    pub session_token: String,
    pub title: String,
    pub mode: LaunchMode,
}

impl LaunchConfig {
    pub fn new(args: LaunchArgs, settings: &LauncherSettings) -> Self {
        let selection = parse_mode(args.mode.as_deref());
        if let Some(warning) = &selection.warning {
            warn!("[Launcher] {}", warning);
        }
        let bin = args.install_root.join(BIN_DIR);
        let archive_paths = settings
            .archives
            .iter()
            .map(|stem| bin.join(libloading::library_filename(stem)))
            .collect();

        Self {
            native_lib_dir: bin.join(NATIVES_DIR),
            archive_paths,
            working_dir: args.install_root.clone(),
            install_root: args.install_root,
            username: args.username,
            session_token: args.session_token,
            title: args.title,
            mode: selection.mode,
        }
    }

    /// Library search variables point at the natives directory; the home
    /// variable at the install root's parent, where the client looks for
    /// its data directory.
    pub fn process_properties(&self, settings: &LauncherSettings) -> ProcessProperties {
        ProcessProperties {
            native_path_vars: settings.native_path_vars.clone(),
            natives_dir: self.native_lib_dir.clone(),
            home_var: HOME_VAR.to_string(),
            home_dir: self.install_root.parent().map(Path::to_path_buf),
        }
    }

    /// Arguments handed to the compatibility entry point.
    pub fn entry_point_args(&self) -> Vec<String> {
        vec![self.username.clone(), self.session_token.clone()]
    }
}

impl fmt::Debug for LaunchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchConfig")
            .field("install_root", &self.install_root)
            .field("archive_paths", &self.archive_paths)
            .field("native_lib_dir", &self.native_lib_dir)
            .field("username", &self.username)
            .field("title", &self.title)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Maps an archive path to the archive implementation that reads it.
pub trait ArchiveSource {
    fn archive(&self, path: &Path) -> Box<dyn Archive>;
}

/// Archives are shared libraries on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeArchives;

impl ArchiveSource for NativeArchives {
    fn archive(&self, path: &Path) -> Box<dyn Archive> {
        Box::new(NativeArchive::new(path))
    }
}

pub enum LaunchOutcome<W: NativeWindow> {
    /// The component is running inside the window. The runtime is kept
    /// alongside because the component's code lives in it.
    Hosted { controller: WindowController<W>, runtime: RuntimeHandle },
    /// The entry point ran and returned.
    Compat { runtime: RuntimeHandle, fell_back: bool },
}

impl<W: NativeWindow> fmt::Debug for LaunchOutcome<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchOutcome::Hosted { controller, .. } => {
                f.debug_struct("Hosted").field("phase", &controller.phase()).finish()
            }
            LaunchOutcome::Compat { fell_back, .. } => {
                f.debug_struct("Compat").field("fell_back", fell_back).finish()
            }
        }
    }
}

pub struct Launcher<F, A> {
    settings: LauncherSettings,
    windows: F,
    archives: A,
    latch: ExitLatch,
}

impl<F, A> Launcher<F, A>
where
    F: WindowFactory,
    A: ArchiveSource,
{
    pub fn new(
        settings: LauncherSettings,
        windows: F,
        archives: A,
        terminator: Arc<dyn Terminator>,
    ) -> Self {
        Self { settings, windows, archives, latch: ExitLatch::new(terminator) }
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    pub fn latch(&self) -> &ExitLatch {
        &self.latch
    }

    /// Runs the whole session and returns the process exit code. In hosted
    /// mode the exit normally happens through the terminator while the
    /// window is closing.
    pub fn run(&self, config: &LaunchConfig) -> i32 {
        match self.launch(config) {
            Ok(LaunchOutcome::Hosted { mut controller, runtime }) => {
                let phase = controller.run();
                debug!("[Launcher] window loop left in {:?} ({:?})", phase, runtime);
                0
            }
            Ok(LaunchOutcome::Compat { .. }) => {
                info!("[Launcher] entry point returned");
                0
            }
            Err(e) => {
                error!("[Launcher] {}", e);
                e.exit_code()
            }
        }
    }

    /// Loads and starts the client, stopping short of the window event loop.
    pub fn launch(&self, config: &LaunchConfig) -> LoadResult<LaunchOutcome<F::Window>> {
        let archives =
            config.archive_paths.iter().map(|path| self.archives.archive(path)).collect();
        let mut runtime = RuntimeLoader::build_context_from(archives, &config.native_lib_dir);

        runtime.resolve_state_holder(&self.settings.state_holder)?;
        runtime.patch_working_directory(&config.working_dir)?;
        match runtime.working_directory(APPLICATION_DIR_NAME) {
            Some(dir) => info!("[Launcher] client working directory: {}", dir.display()),
            None => debug!("[Launcher] client does not report its working directory"),
        }

        let (size, maximize) = match config.mode {
            LaunchMode::Compat => {
                info!("[Launcher] compatibility mode");
                runtime.invoke_entry_point(ENTRY_POINT_METHOD, &config.entry_point_args())?;
                return Ok(LaunchOutcome::Compat { runtime, fell_back: false });
            }
            LaunchMode::Hosted { size, maximize } => (size, maximize),
        };

        let component = match runtime.instantiate_applet_like(&self.settings.entry_component) {
            Ok(component) => component,
            Err(e) if e.is_recoverable() => {
                warn!("[Launcher] {}; falling back to compatibility mode", e);
                runtime.invoke_entry_point(ENTRY_POINT_METHOD, &config.entry_point_args())?;
                return Ok(LaunchOutcome::Compat { runtime, fell_back: true });
            }
            Err(e) => return Err(e),
        };

        let mut controller = self.create_window(&config.title)?;
        controller
            .start(component, &config.username, &config.session_token, size, maximize)
            .map_err(|e| LoadError::InvocationFailed {
                target: self.settings.entry_component.clone(),
                reason: e.to_string(),
            })?;
        Ok(LaunchOutcome::Hosted { controller, runtime })
    }

    fn create_window(&self, title: &str) -> LoadResult<WindowController<F::Window>> {
        let options = HostingOptions {
            document_base: self.settings.document_base.clone(),
            default_parameters: self.settings.default_parameters.clone(),
        };
        let watchdog = ShutdownWatchdog::new(self.settings.grace_period(), self.latch.clone());
        WindowController::create(&self.windows, title, options, watchdog, self.latch.clone())
            .map_err(|e| LoadError::WindowUnavailable(format!("{e:#}")))
    }
}
