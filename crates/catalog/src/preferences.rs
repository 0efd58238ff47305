use std::collections::BTreeMap;

use tracing::debug;

use crate::CatalogError;

pub const DARK_MODE_KEY: &str = "sh-dark-mode-enabled";

/// Minimal string key/value storage, shaped after browser `localStorage`.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, CatalogError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), CatalogError>;
}

#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, CatalogError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CatalogError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Persisted dark-mode toggle.
///
/// The stored value is `"true"` / `"false"`. When nothing is stored yet, the
/// OS color-scheme preference seeds it and is written back immediately.
#[derive(Debug)]
pub struct DarkMode<S> {
    store: S,
    is_dark: bool,
}

impl<S: PreferenceStore> DarkMode<S> {
    pub fn load(mut store: S, os_prefers_dark: bool) -> Result<Self, CatalogError> {
        let stored = store.get(DARK_MODE_KEY)?.filter(|v| !v.is_empty());
        let raw = match stored {
            Some(v) => v,
            None => {
                let seeded = os_prefers_dark.to_string();
                store.set(DARK_MODE_KEY, &seeded)?;
                debug!(seeded = %seeded, "dark mode preference initialized");
                seeded
            }
        };
        Ok(Self {
            store,
            is_dark: raw == "true",
        })
    }

    pub fn is_dark(&self) -> bool {
        self.is_dark
    }

    pub fn is_light(&self) -> bool {
        !self.is_dark
    }

    pub fn toggle(&mut self) -> Result<bool, CatalogError> {
        let next = !self.is_dark;
        self.store.set(DARK_MODE_KEY, &next.to_string())?;
        self.is_dark = next;
        Ok(next)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::PreferenceStore;
    use crate::CatalogError;

    #[derive(Debug, Default)]
    pub struct LocalStoragePreferenceStore;

    impl LocalStoragePreferenceStore {
        pub fn new() -> Result<Self, CatalogError> {
            window_local_storage()?;
            Ok(Self)
        }
    }

    impl PreferenceStore for LocalStoragePreferenceStore {
        fn get(&self, key: &str) -> Result<Option<String>, CatalogError> {
            window_local_storage()?
                .get_item(key)
                .map_err(|e| CatalogError::Io(format!("get_item({key}) failed: {:?}", e)))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), CatalogError> {
            window_local_storage()?
                .set_item(key, value)
                .map_err(|e| CatalogError::Io(format!("set_item({key}) failed: {:?}", e)))
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, CatalogError> {
        let win = web_sys::window().ok_or(CatalogError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| CatalogError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(CatalogError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStoragePreferenceStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStoragePreferenceStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStoragePreferenceStore {
    pub fn new() -> Result<Self, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl PreferenceStore for LocalStoragePreferenceStore {
    fn get(&self, _key: &str) -> Result<Option<String>, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }
}
