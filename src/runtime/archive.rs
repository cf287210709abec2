//! What an archive contributes to the loading context: named types with their
//! declared fields, constructors, static methods and directory probe.
//!
//! Native shared libraries and in-process modules describe themselves the
//! same way, so the registry never cares where a type came from.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{error::LoadResult, host::HostedComponent};

use super::abi::HOST_ABI_VERSION;

pub type Constructor = Rc<dyn Fn() -> Result<Box<dyn HostedComponent>, String>>;
pub type EntryPoint = Rc<dyn Fn(&[String]) -> Result<(), String>>;
pub type DirectoryProbe = Rc<dyn Fn(&str) -> Option<PathBuf>>;

/// Settable storage behind a declared field. This is the only way the host
/// writes into component state.
pub trait ConfigSlot {
    fn set_path(&self, path: &Path) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Directory,
    Other,
}

/// Declared field modifiers, using the conventional access-flag bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(pub u32);

impl Modifiers {
    pub const PUBLIC: u32 = 0x0001;
    pub const PRIVATE: u32 = 0x0002;
    pub const STATIC: u32 = 0x0008;
    pub const FINAL: u32 = 0x0010;

    pub const fn private_static() -> Self {
        Self(Self::PRIVATE | Self::STATIC)
    }

    /// Exactly private and static, nothing else.
    pub const fn is_private_static(self) -> bool {
        self.0 == Self::PRIVATE | Self::STATIC
    }
}

#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub modifiers: Modifiers,
    slot: Rc<dyn ConfigSlot>,
}

impl FieldDef {
    pub fn new(
        name: impl Into<String>,
        kind: FieldKind,
        modifiers: Modifiers,
        slot: Rc<dyn ConfigSlot>,
    ) -> Self {
        Self { name: name.into(), kind, modifiers, slot }
    }

    pub fn is_working_directory_candidate(&self) -> bool {
        self.kind == FieldKind::Directory && self.modifiers.is_private_static()
    }

    pub fn set_path(&self, path: &Path) -> Result<(), String> {
        self.slot.set_path(path)
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("modifiers", &format_args!("{:#06x}", self.modifiers.0))
            .finish()
    }
}

#[derive(Clone)]
pub struct TypeDef {
    name: String,
    fields: Vec<FieldDef>,
    constructor: Option<Constructor>,
    methods: BTreeMap<String, EntryPoint>,
    directory_probe: Option<DirectoryProbe>,
}

/// Resolved reference to a type inside the loading context.
pub type TypeHandle = Rc<TypeDef>;

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            constructor: None,
            methods: BTreeMap::new(),
            directory_probe: None,
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn with_method(mut self, name: impl Into<String>, entry: EntryPoint) -> Self {
        self.methods.insert(name.into(), entry);
        self
    }

    pub fn with_directory_probe(mut self, probe: DirectoryProbe) -> Self {
        self.directory_probe = Some(probe);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn method(&self, name: &str) -> Option<&EntryPoint> {
        self.methods.get(name)
    }

    pub fn directory_probe(&self) -> Option<&DirectoryProbe> {
        self.directory_probe.as_ref()
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("constructible", &self.constructor.is_some())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything one archive declares.
#[derive(Debug, Clone)]
pub struct ModuleManifest {
    pub abi_version: u32,
    pub types: Vec<TypeDef>,
}

/// A packaged bundle of the application's types, loaded by path.
pub trait Archive {
    fn location(&self) -> &Path;

    /// Loads the archive and describes the types it provides.
    fn open(&self) -> LoadResult<ModuleManifest>;
}

/// Archive whose types are compiled into the current process.
#[derive(Debug, Clone)]
pub struct StaticArchive {
    location: PathBuf,
    manifest: ModuleManifest,
}

impl StaticArchive {
    pub fn new(location: impl Into<PathBuf>, types: Vec<TypeDef>) -> Self {
        Self::with_abi(location, HOST_ABI_VERSION, types)
    }

    pub fn with_abi(location: impl Into<PathBuf>, abi_version: u32, types: Vec<TypeDef>) -> Self {
        Self { location: location.into(), manifest: ModuleManifest { abi_version, types } }
    }
}

impl Archive for StaticArchive {
    fn location(&self) -> &Path {
        &self.location
    }

    fn open(&self) -> LoadResult<ModuleManifest> {
        Ok(self.manifest.clone())
    }
}
