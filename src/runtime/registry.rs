use std::collections::HashMap;

use log::warn;

use super::archive::{TypeDef, TypeHandle};

/// Types of every opened archive, keyed by qualified name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeHandle>,
}

impl TypeRegistry {
    /// The first archive to declare a name owns it, matching search order.
    pub fn register(&mut self, origin: &str, ty: TypeDef) {
        if self.types.contains_key(ty.name()) {
            warn!("[Loader] `{}` from {} shadowed by an earlier archive", ty.name(), origin);
            return;
        }
        self.types.insert(ty.name().to_string(), TypeHandle::new(ty));
    }

    pub fn get(&self, name: &str) -> Option<TypeHandle> {
        self.types.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
