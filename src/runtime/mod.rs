//! Loading the client: archives, their type manifests and the isolated
//! context types are resolved from.

pub mod abi;
pub mod archive;
pub mod loader;
pub mod native_archive;
pub mod native_path;
pub mod registry;

pub use archive::{
    Archive, ConfigSlot, Constructor, DirectoryProbe, EntryPoint, FieldDef, FieldKind,
    ModuleManifest, Modifiers, StaticArchive, TypeDef, TypeHandle,
};
pub use loader::{RuntimeHandle, RuntimeLoader};
pub use native_archive::NativeArchive;
pub use native_path::{NativeSearchPath, ProcessProperties};
pub use registry::TypeRegistry;
