// src/runtime/native_archive.rs

//! Shared-library archives: export scanning, manifest decoding and the
//! adapter that drives a foreign component through its vtable.

use anyhow::{Context, Result, anyhow};
use goblin::{Object, mach::Mach};
use libloading::{Library, Symbol};
use log::{debug, info, warn};
use std::{
    cell::RefCell,
    collections::HashMap,
    ffi::{CString, c_char, c_void},
    fs, io,
    path::{Path, PathBuf},
    ptr,
    rc::Rc,
};

use crate::{
    constants::MANIFEST_SYMBOL,
    error::{LoadError, LoadResult},
    host::{HostedComponent, StubHandle},
};

use super::{
    abi::{
        FIELD_KIND_DIRECTORY, HOST_ABI_VERSION, ManifestFn, RawFieldDescriptor,
        RawHostCallbacks, RawLifecycleVTable, RawMethodDescriptor, RawSurfaceInfo,
        RawTypeDescriptor, owned_string, raw_slice,
    },
    archive::{
        Archive, ConfigSlot, Constructor, EntryPoint, FieldDef, FieldKind, ModuleManifest,
        Modifiers, TypeDef,
    },
};

/// A platform shared library under `<install-root>/bin`.
#[derive(Debug, Clone)]
pub struct NativeArchive {
    path: PathBuf,
}

impl NativeArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Archive for NativeArchive {
    fn location(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> LoadResult<ModuleManifest> {
        let exported = exports_symbol(&self.path, MANIFEST_SYMBOL).map_err(|e| {
            match e.downcast_ref::<io::Error>().map(io::Error::kind) {
                Some(io::ErrorKind::NotFound) => LoadError::MissingArchive(self.path.clone()),
                Some(io::ErrorKind::PermissionDenied) => {
                    LoadError::AccessDenied(format!("{:#}", e))
                }
                _ => LoadError::ArchiveUnreadable { path: self.path.clone(), reason: format!("{:#}", e) },
            }
        })?;

        let lib = unsafe { Library::new(&self.path) }.map_err(|e| LoadError::ArchiveUnreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        // keep the library alive for the life of the process
        let lib: &'static Library = Box::leak(Box::new(lib));

        if !exported {
            info!("[Loader] {} provides no types", self.path.display());
            return Ok(ModuleManifest { abi_version: HOST_ABI_VERSION, types: Vec::new() });
        }

        let symbol_name = format!("{MANIFEST_SYMBOL}\0");
        let manifest_fn: Symbol<'static, ManifestFn> = unsafe { lib.get(symbol_name.as_bytes()) }
            .map_err(|e| LoadError::ArchiveUnreadable {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let raw = unsafe { manifest_fn() };
        let Some(raw) = (unsafe { raw.as_ref() }) else {
            return Err(LoadError::ArchiveUnreadable {
                path: self.path.clone(),
                reason: format!("`{MANIFEST_SYMBOL}` returned null"),
            });
        };

        if raw.abi_version != HOST_ABI_VERSION {
            // layouts beyond the version word cannot be trusted
            return Ok(ModuleManifest { abi_version: raw.abi_version, types: Vec::new() });
        }

        let descriptors = unsafe { raw_slice(raw.types, raw.type_count) };
        let mut types = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match unsafe { decode_type(descriptor) } {
                Some(ty) => {
                    debug!("[Loader] {} declares `{}`", self.path.display(), ty.name());
                    types.push(ty);
                }
                None => warn!("[Loader] skipping unnamed type in {}", self.path.display()),
            }
        }
        Ok(ModuleManifest { abi_version: raw.abi_version, types })
    }
}

/// Scans the export table of `path` for `symbol` without loading it.
pub fn exports_symbol(path: &Path, symbol: &str) -> Result<bool> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let object = Object::parse(&data).with_context(|| format!("parsing {}", path.display()))?;
    match object {
        Object::Elf(elf) => Ok(elf.dynsyms.iter().any(|sym| {
            !sym.is_import() && elf.dynstrtab.get_at(sym.st_name) == Some(symbol)
        })),
        Object::PE(pe) => Ok(pe.exports.iter().filter_map(|e| e.name).any(|n| n == symbol)),
        Object::Mach(Mach::Binary(macho)) => {
            let exports = macho.exports().with_context(|| format!("exports of {}", path.display()))?;
            Ok(exports.iter().any(|e| e.name.strip_prefix('_').unwrap_or(&e.name) == symbol))
        }
        // universal binaries: let the dynamic loader pick the slice
        Object::Mach(Mach::Fat(_)) => Ok(true),
        _ => Err(anyhow!("{} is not a shared library", path.display())),
    }
}

unsafe fn decode_type(descriptor: &RawTypeDescriptor) -> Option<TypeDef> {
    let name = unsafe { owned_string(descriptor.qualified_name) }?;
    let mut ty = TypeDef::new(name.clone());

    for field in unsafe { raw_slice(descriptor.fields, descriptor.field_count) } {
        if let Some(def) = unsafe { decode_field(field) } {
            ty = ty.with_field(def);
        }
    }

    for method in unsafe { raw_slice(descriptor.methods, descriptor.method_count) } {
        if let Some(method_name) = unsafe { owned_string(method.name) } {
            ty = ty.with_method(method_name, foreign_entry_point(method));
        }
    }

    if let (Some(construct), Some(vtable)) =
        (descriptor.construct, unsafe { descriptor.lifecycle.as_ref() })
    {
        let constructor: Constructor = Rc::new(move || {
            let instance = unsafe { construct() };
            if instance.is_null() {
                return Err("constructor returned null".to_string());
            }
            Ok(Box::new(ForeignComponent::new(instance, vtable)) as Box<dyn HostedComponent>)
        });
        ty = ty.with_constructor(constructor);
    }

    if let Some(locate) = descriptor.working_directory {
        ty = ty.with_directory_probe(Rc::new(move |app_name: &str| {
            let app_name = CString::new(app_name).ok()?;
            unsafe { owned_string(locate(app_name.as_ptr())) }.map(PathBuf::from)
        }));
    }

    Some(ty)
}

unsafe fn decode_field(field: &RawFieldDescriptor) -> Option<FieldDef> {
    let name = unsafe { owned_string(field.name) }?;
    let kind = if field.kind == FIELD_KIND_DIRECTORY { FieldKind::Directory } else { FieldKind::Other };
    let slot = Rc::new(ForeignSlot { setter: field.set_path });
    Some(FieldDef::new(name, kind, Modifiers(field.modifiers), slot))
}

struct ForeignSlot {
    setter: Option<unsafe extern "C" fn(*const c_char) -> bool>,
}

impl ConfigSlot for ForeignSlot {
    fn set_path(&self, path: &Path) -> Result<(), String> {
        let setter = self.setter.ok_or("field has no setter")?;
        let path = path.to_str().ok_or("path is not valid UTF-8")?;
        let path = CString::new(path).map_err(|e| e.to_string())?;
        if unsafe { setter(path.as_ptr()) } {
            Ok(())
        } else {
            Err("setter rejected the value".to_string())
        }
    }
}

fn foreign_entry_point(method: &RawMethodDescriptor) -> EntryPoint {
    let invoke = method.invoke;
    Rc::new(move |args: &[String]| {
        let owned = args
            .iter()
            .map(|a| CString::new(a.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;
        let argv: Vec<*const c_char> = owned.iter().map(|c| c.as_ptr()).collect();
        match unsafe { invoke(argv.len(), argv.as_ptr()) } {
            0 => Ok(()),
            code => Err(format!("returned {code}")),
        }
    })
}

/// Host side of the callback table. Boxed so `callbacks.context` stays valid.
struct ForeignHost {
    callbacks: RawHostCallbacks,
    stub: StubHandle,
    strings: RefCell<HashMap<String, CString>>,
    // superseded values, kept so pointers already handed out stay valid
    retired: RefCell<Vec<CString>>,
}

impl ForeignHost {
    fn new(stub: StubHandle) -> Box<Self> {
        let mut host = Box::new(Self {
            callbacks: RawHostCallbacks {
                context: ptr::null_mut(),
                get_parameter: host_get_parameter,
                is_active: host_is_active,
                document_base: host_document_base,
                code_base: host_code_base,
                surface: host_surface,
                request_resize: host_request_resize,
            },
            stub,
            strings: RefCell::new(HashMap::new()),
            retired: RefCell::new(Vec::new()),
        });
        host.callbacks.context = &mut *host as *mut ForeignHost as *mut c_void;
        host
    }

    /// Returned pointers stay valid for the lifetime of the host table.
    fn intern(&self, key: &str, value: &str) -> *const c_char {
        let mut strings = self.strings.borrow_mut();
        if let Some(existing) = strings.get(key) {
            if existing.as_bytes() == value.as_bytes() {
                return existing.as_ptr();
            }
        }
        match CString::new(value) {
            Ok(c) => {
                let ptr = c.as_ptr();
                if let Some(previous) = strings.insert(key.to_string(), c) {
                    self.retired.borrow_mut().push(previous);
                }
                ptr
            }
            Err(_) => ptr::null(),
        }
    }
}

unsafe fn host_from<'a>(context: *mut c_void) -> &'a ForeignHost {
    unsafe { &*(context as *const ForeignHost) }
}

unsafe extern "C" fn host_get_parameter(context: *mut c_void, name: *const c_char) -> *const c_char {
    let host = unsafe { host_from(context) };
    let Some(name) = (unsafe { owned_string(name) }) else {
        return ptr::null();
    };
    match host.stub.parameter(&name) {
        Some(value) => host.intern(&format!("param:{name}"), &value),
        None => ptr::null(),
    }
}

unsafe extern "C" fn host_is_active(context: *mut c_void) -> bool {
    unsafe { host_from(context) }.stub.is_active()
}

unsafe extern "C" fn host_document_base(context: *mut c_void) -> *const c_char {
    let host = unsafe { host_from(context) };
    host.intern("document_base", host.stub.document_base())
}

unsafe extern "C" fn host_code_base(context: *mut c_void) -> *const c_char {
    let host = unsafe { host_from(context) };
    match host.stub.code_base() {
        Some(code_base) => host.intern("code_base", code_base),
        None => ptr::null(),
    }
}

unsafe extern "C" fn host_surface(context: *mut c_void, out: *mut RawSurfaceInfo) -> bool {
    let host = unsafe { host_from(context) };
    match (host.stub.surface(), unsafe { out.as_mut() }) {
        (Some(surface), Some(out)) => {
            *out = RawSurfaceInfo {
                handle: surface.handle.0,
                width: surface.width,
                height: surface.height,
            };
            true
        }
        _ => false,
    }
}

unsafe extern "C" fn host_request_resize(context: *mut c_void, width: i32, height: i32) {
    unsafe { host_from(context) }.stub.request_resize(width, height);
}

/// A component instance living inside a shared library.
pub struct ForeignComponent {
    instance: *mut c_void,
    vtable: &'static RawLifecycleVTable,
    host: Option<Box<ForeignHost>>,
}

impl ForeignComponent {
    fn new(instance: *mut c_void, vtable: &'static RawLifecycleVTable) -> Self {
        Self { instance, vtable, host: None }
    }
}

impl HostedComponent for ForeignComponent {
    fn set_stub(&mut self, stub: StubHandle) {
        let host = ForeignHost::new(stub);
        unsafe { (self.vtable.set_stub)(self.instance, &host.callbacks) };
        // replacing drops the previous table only after the component has the new one
        self.host = Some(host);
    }

    fn init(&mut self) {
        unsafe { (self.vtable.init)(self.instance) }
    }

    fn start(&mut self) {
        unsafe { (self.vtable.start)(self.instance) }
    }

    fn stop(&mut self) {
        unsafe { (self.vtable.stop)(self.instance) }
    }

    fn destroy(&mut self) {
        unsafe { (self.vtable.destroy)(self.instance) }
    }

    fn resize(&mut self, width: i32, height: i32) {
        unsafe { (self.vtable.resize)(self.instance, width, height) }
    }

    fn set_visible(&mut self, visible: bool) {
        unsafe { (self.vtable.set_visible)(self.instance, visible) }
    }

    fn code_base(&self) -> Option<String> {
        unsafe { owned_string((self.vtable.code_base)(self.instance)) }
    }
}

impl Drop for ForeignComponent {
    fn drop(&mut self) {
        unsafe { (self.vtable.release)(self.instance) };
    }
}
