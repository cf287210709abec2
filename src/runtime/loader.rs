//! Builds the isolated loading context and performs the three privileged
//! operations on it: the working-directory patch, instantiation of the
//! entry component and the compatibility entry-point call.
//!
//! Ordering is enforced here rather than trusted to callers: the patch needs
//! a resolved state holder, must come before any instantiation and runs
//! exactly once.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use once_cell::unsync::OnceCell;

use crate::{
    error::{LoadError, LoadResult},
    host::HostedComponent,
};

use super::{
    abi::HOST_ABI_VERSION,
    archive::{Archive, TypeHandle},
    native_archive::NativeArchive,
    native_path::{NativeSearchPath, location_str},
    registry::TypeRegistry,
};

pub struct RuntimeLoader;

impl RuntimeLoader {
    /// Context over native archives. Nothing is opened until first use, so a
    /// missing archive surfaces from the first resolution.
    pub fn build_context(archive_paths: &[PathBuf], native_lib_dir: &Path) -> RuntimeHandle {
        let archives = archive_paths
            .iter()
            .map(|path| Box::new(NativeArchive::new(path)) as Box<dyn Archive>)
            .collect();
        Self::build_context_from(archives, native_lib_dir)
    }

    pub fn build_context_from(
        archives: Vec<Box<dyn Archive>>,
        native_lib_dir: &Path,
    ) -> RuntimeHandle {
        RuntimeHandle {
            archives,
            natives: NativeSearchPath::new(native_lib_dir),
            registry: OnceCell::new(),
            state_holder: None,
            patched: false,
            instantiated: false,
        }
    }
}

pub struct RuntimeHandle {
    archives: Vec<Box<dyn Archive>>,
    natives: NativeSearchPath,
    registry: OnceCell<TypeRegistry>,
    state_holder: Option<TypeHandle>,
    patched: bool,
    instantiated: bool,
}

impl RuntimeHandle {
    pub fn resolve_type(&self, qualified_name: &str) -> LoadResult<TypeHandle> {
        self.registry()?
            .get(qualified_name)
            .ok_or_else(|| LoadError::TypeNotFound(qualified_name.to_string()))
    }

    /// Resolves and remembers the type holding the application's static state.
    pub fn resolve_state_holder(&mut self, qualified_name: &str) -> LoadResult<TypeHandle> {
        let ty = self.resolve_type(qualified_name)?;
        self.state_holder = Some(ty.clone());
        Ok(ty)
    }

    pub fn state_holder(&self) -> Option<&TypeHandle> {
        self.state_holder.as_ref()
    }

    pub fn is_patched(&self) -> bool {
        self.patched
    }

    /// Points the state holder's single private static directory field at
    /// `new_path`. Returns the name of the patched field.
    pub fn patch_working_directory(&mut self, new_path: &Path) -> LoadResult<String> {
        let Some(holder) = self.state_holder.clone() else {
            return Err(LoadError::PatchOrder("state holder has not been resolved"));
        };
        if self.instantiated {
            return Err(LoadError::PatchOrder("a component has already been instantiated"));
        }
        if self.patched {
            return Err(LoadError::PatchOrder("working directory was already patched"));
        }

        let candidates: Vec<_> =
            holder.fields().iter().filter(|f| f.is_working_directory_candidate()).collect();
        let [field] = candidates.as_slice() else {
            return Err(LoadError::PatchTargetAmbiguous {
                type_name: holder.name().to_string(),
                candidates: candidates.len(),
            });
        };

        field.set_path(new_path).map_err(|reason| LoadError::FieldWrite {
            field: format!("{}.{}", holder.name(), field.name),
            reason,
        })?;
        self.patched = true;
        info!("[Loader] fixed working directory: field was {}.{}", holder.name(), field.name);
        Ok(field.name.clone())
    }

    /// Directory the application resolves for `app_name`, if the state
    /// holder can report it.
    pub fn working_directory(&self, app_name: &str) -> Option<PathBuf> {
        let probe = self.state_holder.as_ref()?.directory_probe()?;
        probe(app_name)
    }

    /// Constructs the entry component through its no-argument constructor.
    ///
    /// `InstantiationFailed` is the one recoverable outcome: callers fall back
    /// to [`RuntimeHandle::invoke_entry_point`].
    pub fn instantiate_applet_like(
        &mut self,
        qualified_name: &str,
    ) -> LoadResult<Box<dyn HostedComponent>> {
        let ty = self.resolve_type(qualified_name)?;
        let constructor = ty.constructor().ok_or_else(|| LoadError::InstantiationFailed {
            type_name: qualified_name.to_string(),
            reason: "type has no applet-like shape".to_string(),
        })?;
        self.instantiated = true;
        let component = constructor().map_err(|reason| LoadError::InstantiationFailed {
            type_name: qualified_name.to_string(),
            reason,
        })?;
        debug!("[Loader] instantiated `{}`", qualified_name);
        Ok(component)
    }

    /// Calls a static method of the state holder with the raw argument vector.
    /// The argument shape is defined by the client and not checked here.
    pub fn invoke_entry_point(&self, method: &str, args: &[String]) -> LoadResult<()> {
        let Some(holder) = self.state_holder.as_ref() else {
            return Err(LoadError::InvocationFailed {
                target: method.to_string(),
                reason: "state holder has not been resolved".to_string(),
            });
        };
        let target = format!("{}::{}", holder.name(), method);
        let entry = holder.method(method).ok_or_else(|| LoadError::InvocationFailed {
            target: target.clone(),
            reason: "no such method".to_string(),
        })?;
        info!("[Loader] invoking {} with {} arguments", target, args.len());
        entry(args).map_err(|reason| LoadError::InvocationFailed { target, reason })
    }

    fn registry(&self) -> LoadResult<&TypeRegistry> {
        self.registry.get_or_try_init(|| self.open_archives())
    }

    fn open_archives(&self) -> LoadResult<TypeRegistry> {
        self.natives.install()?;
        let mut registry = TypeRegistry::default();
        for archive in &self.archives {
            let location = archive.location();
            check_archive_present(location)?;
            let origin = location_str(location)?;
            info!("[Loader] loading archive {}", origin);

            let manifest = archive.open()?;
            if manifest.abi_version != HOST_ABI_VERSION {
                return Err(LoadError::ShapeMismatch {
                    name: origin.to_string(),
                    expected: HOST_ABI_VERSION,
                    found: manifest.abi_version,
                });
            }
            for ty in manifest.types {
                registry.register(origin, ty);
            }
        }
        info!("[Loader] {} types available from {} archives", registry.len(), self.archives.len());
        Ok(registry)
    }
}

fn check_archive_present(location: &Path) -> LoadResult<()> {
    match location.metadata() {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            Err(LoadError::AccessDenied(format!("{}: {e}", location.display())))
        }
        Err(_) => Err(LoadError::MissingArchive(location.to_path_buf())),
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("archives", &self.archives.iter().map(|a| a.location()).collect::<Vec<_>>())
            .field("natives", &self.natives.dir())
            .field("loaded", &self.registry.get().is_some())
            .field("patched", &self.patched)
            .field("instantiated", &self.instantiated)
            .finish()
    }
}
