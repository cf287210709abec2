//! C layout of the module manifest a native archive exports, and of the
//! host callbacks handed to foreign components.
//!
//! Every archive that provides types exports `client_module_manifest`
//! (see [`crate::constants::MANIFEST_SYMBOL`]) with the [`ManifestFn`]
//! signature. All pointers reachable from the manifest must stay valid for
//! the lifetime of the library; the host never frees them.

use std::ffi::{CStr, c_char, c_void};

/// Layout version of everything in this module.
pub const HOST_ABI_VERSION: u32 = 1;

pub const FIELD_KIND_OTHER: u32 = 0;
pub const FIELD_KIND_DIRECTORY: u32 = 1;

pub type ManifestFn = unsafe extern "C" fn() -> *const RawModuleManifest;

#[repr(C)]
pub struct RawModuleManifest {
    pub abi_version: u32,
    pub type_count: usize,
    pub types: *const RawTypeDescriptor,
}

#[repr(C)]
pub struct RawTypeDescriptor {
    pub qualified_name: *const c_char,
    pub field_count: usize,
    pub fields: *const RawFieldDescriptor,
    pub method_count: usize,
    pub methods: *const RawMethodDescriptor,
    /// No-argument constructor. Only meaningful together with `lifecycle`.
    pub construct: Option<unsafe extern "C" fn() -> *mut c_void>,
    pub lifecycle: *const RawLifecycleVTable,
    /// Resolves the data directory for an application name; the returned
    /// string is owned by the library.
    pub working_directory: Option<unsafe extern "C" fn(app_name: *const c_char) -> *const c_char>,
}

#[repr(C)]
pub struct RawFieldDescriptor {
    pub name: *const c_char,
    pub kind: u32,
    pub modifiers: u32,
    pub set_path: Option<unsafe extern "C" fn(path: *const c_char) -> bool>,
}

#[repr(C)]
pub struct RawMethodDescriptor {
    pub name: *const c_char,
    pub invoke: unsafe extern "C" fn(argc: usize, argv: *const *const c_char) -> i32,
}

#[repr(C)]
pub struct RawLifecycleVTable {
    pub set_stub: unsafe extern "C" fn(instance: *mut c_void, host: *const RawHostCallbacks),
    pub init: unsafe extern "C" fn(instance: *mut c_void),
    pub start: unsafe extern "C" fn(instance: *mut c_void),
    pub stop: unsafe extern "C" fn(instance: *mut c_void),
    pub destroy: unsafe extern "C" fn(instance: *mut c_void),
    pub resize: unsafe extern "C" fn(instance: *mut c_void, width: i32, height: i32),
    pub set_visible: unsafe extern "C" fn(instance: *mut c_void, visible: bool),
    /// May return null.
    pub code_base: unsafe extern "C" fn(instance: *mut c_void) -> *const c_char,
    pub release: unsafe extern "C" fn(instance: *mut c_void),
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSurfaceInfo {
    pub handle: isize,
    pub width: i32,
    pub height: i32,
}

/// Host services a foreign component may call back into. Returned strings
/// stay valid until the component is released.
#[repr(C)]
pub struct RawHostCallbacks {
    pub context: *mut c_void,
    pub get_parameter:
        unsafe extern "C" fn(context: *mut c_void, name: *const c_char) -> *const c_char,
    pub is_active: unsafe extern "C" fn(context: *mut c_void) -> bool,
    pub document_base: unsafe extern "C" fn(context: *mut c_void) -> *const c_char,
    pub code_base: unsafe extern "C" fn(context: *mut c_void) -> *const c_char,
    pub surface: unsafe extern "C" fn(context: *mut c_void, out: *mut RawSurfaceInfo) -> bool,
    pub request_resize: unsafe extern "C" fn(context: *mut c_void, width: i32, height: i32),
}

/// Copies a library-owned C string. Null and non-UTF-8 strings yield `None`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(str::to_owned)
}

/// Views a C array as a slice, treating null as empty.
///
/// # Safety
/// When non-null, `ptr` must point to `len` initialised elements that
/// outlive `'a`.
pub unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}
