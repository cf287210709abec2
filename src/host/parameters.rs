use std::{collections::BTreeMap, fmt, rc::Rc};

/// Secondary source consulted when a key has no local entry.
pub type ParameterFallback = Rc<dyn Fn(&str) -> Option<String>>;

/// Ordered parameter name → value mapping queried by the component during init.
///
/// Keys are unique and the last write wins. Lookups never fail: a missing key
/// falls back to the secondary source and finally to `None`.
#[derive(Default, Clone)]
pub struct ParameterStore {
    values: BTreeMap<String, String>,
    fallback: Option<ParameterFallback>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: ParameterFallback) -> Self {
        Self { values: BTreeMap::new(), fallback: Some(fallback) }
    }

    /// Fallback backed by a fixed map, e.g. the configured default parameters.
    pub fn with_defaults(defaults: BTreeMap<String, String>) -> Self {
        Self::with_fallback(Rc::new(move |name| defaults.get(name).cloned()))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        self.fallback.as_ref().and_then(|fallback| fallback(name))
    }

    /// Locally set parameters, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // values may hold a session token
        f.debug_struct("ParameterStore")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut store = ParameterStore::new();
        store.set("sessionid", "first");
        store.set("sessionid", "abc");
        assert_eq!(store.get("sessionid").as_deref(), Some("abc"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn local_entries_shadow_fallback() {
        let mut defaults = BTreeMap::new();
        defaults.insert("fullscreen".to_string(), "false".to_string());
        defaults.insert("username".to_string(), "fallback".to_string());
        let mut store = ParameterStore::with_defaults(defaults);
        store.set("username", "alice");

        assert_eq!(store.get("username").as_deref(), Some("alice"));
        assert_eq!(store.get("fullscreen").as_deref(), Some("false"));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn debug_output_hides_values() {
        let mut store = ParameterStore::new();
        store.set("sessionid", "secret-token");
        let rendered = format!("{store:?}");
        assert!(rendered.contains("sessionid"));
        assert!(!rendered.contains("secret-token"));
    }
}
