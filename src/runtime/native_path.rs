//! Native-library resolution and the process properties the client's native
//! subsystems read at load time.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::error::{LoadError, LoadResult};

/// Directory searched for native libraries before the process default.
#[derive(Debug, Clone)]
pub struct NativeSearchPath {
    dir: PathBuf,
}

impl NativeSearchPath {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Makes libraries in the natives directory win over any other copy.
    ///
    /// A missing directory or a library that fails to load is only logged:
    /// natives are shipped for several platforms side by side.
    pub fn install(&self) -> LoadResult<()> {
        if !self.dir.is_dir() {
            warn!("[Loader] natives directory {} does not exist", self.dir.display());
            return Ok(());
        }
        self.install_platform()
    }

    #[cfg(windows)]
    fn install_platform(&self) -> LoadResult<()> {
        use std::os::windows::ffi::OsStrExt;
        use windows::{Win32::System::LibraryLoader::SetDllDirectoryW, core::PCWSTR};

        let wide: Vec<u16> = self.dir.as_os_str().encode_wide().chain(Some(0)).collect();
        unsafe { SetDllDirectoryW(PCWSTR(wide.as_ptr())) }
            .map_err(|e| LoadError::AccessDenied(format!("SetDllDirectoryW: {e}")))?;
        info!("[Loader] DLL search directory set to {}", self.dir.display());
        Ok(())
    }

    #[cfg(unix)]
    fn install_platform(&self) -> LoadResult<()> {
        use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_NOW};

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            LoadError::AccessDenied(format!("reading {}: {e}", self.dir.display()))
        })?;
        let mut loaded = 0usize;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !is_shared_library(&path) {
                continue;
            }
            // global binding lets later dependants resolve against this copy
            match unsafe { Library::open(Some(&path), RTLD_NOW | RTLD_GLOBAL) } {
                Ok(lib) => {
                    debug!("[Loader] preloaded native {}", path.display());
                    std::mem::forget(lib);
                    loaded += 1;
                }
                Err(e) => warn!("[Loader] skipping native {}: {}", path.display(), e),
            }
        }
        info!("[Loader] {} natives preloaded from {}", loaded, self.dir.display());
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn install_platform(&self) -> LoadResult<()> {
        warn!("[Loader] no native search path support on this platform");
        Ok(())
    }
}

fn is_shared_library(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.is_file()
        && (name.ends_with(".so") || name.contains(".so.") || name.ends_with(".dylib")
            || name.ends_with(".jnilib") || name.ends_with(".dll"))
}

/// Values exported to the environment before any archive is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessProperties {
    pub native_path_vars: Vec<String>,
    pub natives_dir: PathBuf,
    pub home_var: String,
    pub home_dir: Option<PathBuf>,
}

impl ProcessProperties {
    pub fn pairs(&self) -> LoadResult<Vec<(String, String)>> {
        let natives = location_str(&self.natives_dir)?;
        let mut pairs: Vec<(String, String)> = self
            .native_path_vars
            .iter()
            .map(|var| (var.clone(), natives.to_string()))
            .collect();
        if let Some(home) = &self.home_dir {
            pairs.push((self.home_var.clone(), location_str(home)?.to_string()));
        }
        Ok(pairs)
    }

    /// Exports the properties to the process environment.
    ///
    /// Must run on the launcher thread before any other thread exists and
    /// before the client is loaded; nothing else injects these values.
    pub fn apply(&self) -> LoadResult<()> {
        for (key, value) in self.pairs()? {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return Err(LoadError::MalformedLocation(key));
            }
            info!("[Loader] {}={}", key, value);
            // SAFETY: called once during startup while the process is single-threaded.
            unsafe { std::env::set_var(&key, &value) };
        }
        Ok(())
    }
}

/// Archive and directory locations must be handed to C code verbatim.
pub fn location_str(path: &Path) -> LoadResult<&str> {
    match path.to_str() {
        Some(s) if !s.contains('\0') => Ok(s),
        _ => Err(LoadError::MalformedLocation(path.to_string_lossy().into_owned())),
    }
}
