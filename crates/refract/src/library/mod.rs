//! Dynamic library lifecycle
//!
//! A [`Library`] pairs a native library with the registration transaction
//! that recorded everything the library registered while it was opened.
//! Loading is reference counted; the final unload releases the native
//! handle and rolls the transaction back, removing the library's types,
//! members and conversions from the registry.
//!
//! Every `Library` value created for the same file name on the same
//! registry shares one state, so two plugins loading the same helper library
//! keep it alive until both have unloaded it. An entry point may load the
//! libraries it depends on; what those register belongs to them and stays
//! registered when the dependent library unloads.
//!
//! Variants and handles of types registered by a library must not be used
//! after its final unload: handles then report `is_valid() == false`, but
//! values held in variants are owned by code from the library.

mod candidates;
mod loader;

pub use candidates::candidate_paths;
pub use loader::{DylibLoader, NativeHandle, NativeLoader, RegisterFn, ResolvedLibrary};

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use rustc_hash::FxHashMap;

use crate::config::LoaderConfig;
use crate::error::LibraryError;
use crate::registry::{Method, Property, RegistrationTransaction, Registry, SequenceRange};
use crate::types::Type;

/// Shared state of one library file
struct LibraryState {
    file_name: String,
    version: Option<String>,
    qualified_path: Option<String>,
    handle: Option<NativeHandle>,
    load_count: usize,
    transaction: RegistrationTransaction,
    error: String,
    config: LoaderConfig,
    loader: Arc<dyn NativeLoader>,
}

/// Map entry: the shared state and the number of live `Library` handles
struct LibraryEntry {
    state: Arc<Mutex<LibraryState>>,
    handles: usize,
}

/// Per-registry table of library states
pub(crate) struct LibraryManager {
    libraries: Mutex<FxHashMap<String, LibraryEntry>>,
    /// Held while a load runs, so transactions of concurrent loads don't
    /// overlap. An entry point may load further libraries from the same
    /// thread; every open load has a frame collecting the spans its nested
    /// loads recorded.
    loading: ReentrantMutex<RefCell<Vec<Vec<SequenceRange>>>>,
}

impl LibraryManager {
    pub(crate) fn new() -> Self {
        Self {
            libraries: Mutex::new(FxHashMap::default()),
            loading: ReentrantMutex::new(RefCell::new(Vec::new())),
        }
    }
}

/// Handle to a dynamically loaded library
pub struct Library {
    registry: &'static Registry,
    key: String,
    state: Arc<Mutex<LibraryState>>,
}

impl Library {
    /// Library `file_name` in the process-wide registry.
    ///
    /// Resolution uses [`LoaderConfig::from_env`]; nothing is loaded yet.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self::open_in(Registry::global(), file_name, None)
    }

    /// Library `file_name` at `version` in the process-wide registry
    pub fn with_version(file_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::open_in(Registry::global(), file_name, Some(version.into()))
    }

    /// Library `file_name` registering into `registry`
    pub fn open_in(registry: &'static Registry, file_name: impl Into<String>, version: Option<String>) -> Self {
        let config = LoaderConfig::from_env();
        let loader = Arc::new(DylibLoader::from_config(registry, &config));
        Self::with_loader(registry, file_name, version, config, loader)
    }

    /// Library `file_name` opened through a custom loader
    pub fn with_loader(
        registry: &'static Registry,
        file_name: impl Into<String>,
        version: Option<String>,
        config: LoaderConfig,
        loader: Arc<dyn NativeLoader>,
    ) -> Self {
        let file_name = file_name.into();
        let key = file_name.clone();
        let mut libraries = registry.libraries().libraries.lock();
        let entry = libraries.entry(key.clone()).or_insert_with(|| LibraryEntry {
            state: Arc::new(Mutex::new(LibraryState {
                file_name,
                version,
                qualified_path: None,
                handle: None,
                load_count: 0,
                transaction: RegistrationTransaction::new(registry),
                error: String::new(),
                config,
                loader,
            })),
            handles: 0,
        });
        entry.handles += 1;
        let state = entry.state.clone();
        drop(libraries);

        Self {
            registry,
            key,
            state,
        }
    }

    /// Load the library; true when it is loaded afterwards
    pub fn load(&self) -> bool {
        self.try_load().is_ok()
    }

    /// Load the library, or take another reference if it is already loaded
    pub fn try_load(&self) -> Result<(), LibraryError> {
        // always before the state lock: a nested load takes it again
        let loading = self.registry.libraries().loading.lock();
        let mut state = self.state.lock();
        if state.load_count > 0 {
            state.load_count += 1;
            return Ok(());
        }

        if state.file_name.is_empty() || state.file_name.contains('\0') {
            state.error = format!("Invalid library name {:?}", state.file_name);
            return Err(LibraryError::InvalidPath(state.file_name.clone()));
        }

        let candidates = candidate_paths(&state.file_name, state.version.as_deref(), &state.config);
        let loader = state.loader.clone();

        loading.borrow_mut().push(Vec::new());
        state.transaction.begin();
        let resolved = loader.resolve(&candidates);
        let nested = loading.borrow_mut().pop().unwrap_or_default();
        match &resolved {
            Ok(_) => {
                let span = state.transaction.end_excluding(&nested);
                if let (Some(span), Some(parent)) = (span, loading.borrow_mut().last_mut()) {
                    parent.push(span);
                }
            }
            Err(_) => state.transaction.abandon(),
        }
        drop(loading);

        match resolved {
            Ok(resolved) => {
                log::debug!(
                    "Loaded library '{}' from {} ({} types)",
                    state.file_name,
                    resolved.path,
                    state.transaction.types().len()
                );
                state.handle = Some(resolved.handle);
                state.qualified_path = Some(resolved.path);
                state.load_count = 1;
                state.error.clear();
                Ok(())
            }
            Err(message) => {
                log::warn!("Cannot load library '{}': {}", state.file_name, message);
                state.error = message.clone();
                Err(LibraryError::NotFound {
                    name: state.file_name.clone(),
                    message,
                })
            }
        }
    }

    /// Drop one reference; true on success
    pub fn unload(&self) -> bool {
        self.try_unload().is_ok()
    }

    /// Drop one reference; the last one releases the library and removes
    /// everything it registered
    pub fn try_unload(&self) -> Result<(), LibraryError> {
        let mut state = self.state.lock();
        if state.load_count == 0 {
            return Err(LibraryError::NotLoaded(state.file_name.clone()));
        }
        state.load_count -= 1;
        if state.load_count > 0 {
            return Ok(());
        }

        let Some(handle) = state.handle else {
            return Err(LibraryError::NotLoaded(state.file_name.clone()));
        };
        match state.loader.release(handle) {
            Ok(()) => {
                state.handle = None;
                state.qualified_path = None;
                state.error.clear();
                state.transaction.rollback();
                log::debug!("Unloaded library '{}'", state.file_name);
                Ok(())
            }
            Err(message) => {
                // still loaded: keep "handle set iff count > 0"
                state.load_count = 1;
                log::warn!("Cannot unload library '{}': {}", state.file_name, message);
                state.error = message.clone();
                Err(LibraryError::UnloadFailed(message))
            }
        }
    }

    /// Whether the library is loaded
    pub fn is_loaded(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    /// Number of outstanding loads
    pub fn load_count(&self) -> usize {
        self.state.lock().load_count
    }

    /// Requested file name
    pub fn file_name(&self) -> String {
        self.state.lock().file_name.clone()
    }

    /// Requested version
    pub fn version(&self) -> Option<String> {
        self.state.lock().version.clone()
    }

    /// Path the library was opened from, while loaded
    pub fn qualified_file_name(&self) -> Option<String> {
        self.state.lock().qualified_path.clone()
    }

    /// Message of the most recent failure; empty after a success
    pub fn error_string(&self) -> String {
        self.state.lock().error.clone()
    }

    /// Types the library registered
    pub fn types(&self) -> Vec<Type> {
        self.state.lock().transaction.types()
    }

    /// Global properties the library registered
    pub fn global_properties(&self) -> Vec<Property> {
        self.state.lock().transaction.global_properties()
    }

    /// Global methods the library registered
    pub fn global_methods(&self) -> Vec<Method> {
        self.state.lock().transaction.global_methods()
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        let mut libraries = self.registry.libraries().libraries.lock();
        let Some(entry) = libraries.get_mut(&self.key) else {
            return;
        };
        entry.handles -= 1;
        if entry.handles > 0 {
            return;
        }
        // no other handle can hold the state lock now
        let unloaded = self.state.lock().load_count == 0;
        if unloaded {
            libraries.remove(&self.key);
        }
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Library")
            .field("file_name", &state.file_name)
            .field("version", &state.version)
            .field("load_count", &state.load_count)
            .field("qualified_path", &state.qualified_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    impl NativeLoader for Unavailable {
        fn resolve(&self, candidates: &[String]) -> Result<ResolvedLibrary, String> {
            Err(format!("tried {}", candidates.len()))
        }

        fn release(&self, _handle: NativeHandle) -> Result<(), String> {
            Ok(())
        }
    }

    fn unavailable(registry: &'static Registry, name: &str) -> Library {
        Library::with_loader(registry, name, None, LoaderConfig::default(), Arc::new(Unavailable))
    }

    #[test]
    fn test_failed_load_records_error() {
        let registry = Registry::isolated();
        let library = unavailable(registry, "missing");
        assert!(!library.load());
        assert!(!library.is_loaded());
        assert!(library.error_string().starts_with("tried"));
        assert_eq!(library.load_count(), 0);
        assert!(library.qualified_file_name().is_none());
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let registry = Registry::isolated();
        let library = unavailable(registry, "");
        assert_eq!(library.try_load(), Err(LibraryError::InvalidPath(String::new())));
        assert!(!library.error_string().is_empty());
    }

    #[test]
    fn test_unload_without_load_fails() {
        let registry = Registry::isolated();
        let library = unavailable(registry, "missing");
        assert_eq!(
            library.try_unload(),
            Err(LibraryError::NotLoaded("missing".to_string()))
        );
    }

    fn entries(registry: &'static Registry) -> usize {
        registry.libraries().libraries.lock().len()
    }

    #[test]
    fn test_handles_share_state_and_map_entry_is_dropped() {
        let registry = Registry::isolated();
        let first = unavailable(registry, "shared");
        let second = unavailable(registry, "shared");
        assert!(Arc::ptr_eq(&first.state, &second.state));
        assert_eq!(entries(registry), 1);

        drop(first);
        assert_eq!(entries(registry), 1);
        drop(second);
        assert_eq!(entries(registry), 0);
    }

    #[test]
    fn test_concurrent_handles_leave_no_entry_behind() {
        let registry = Registry::isolated();
        let workers: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let library = unavailable(registry, "contended");
                        let _ = library.load_count();
                        drop(library);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker");
        }
        assert_eq!(entries(registry), 0);
    }

    #[test]
    fn test_dropping_last_handle_of_loaded_library_keeps_state() {
        struct Opened;

        impl NativeLoader for Opened {
            fn resolve(&self, candidates: &[String]) -> Result<ResolvedLibrary, String> {
                Ok(ResolvedLibrary {
                    path: candidates.first().cloned().unwrap_or_default(),
                    handle: NativeHandle::new(1).expect("non-null"),
                })
            }

            fn release(&self, _handle: NativeHandle) -> Result<(), String> {
                Ok(())
            }
        }

        let registry = Registry::isolated();
        let open = || Library::with_loader(registry, "kept", None, LoaderConfig::default(), Arc::new(Opened));
        let library = open();
        assert!(library.load());
        drop(library);
        assert_eq!(entries(registry), 1);

        let again = open();
        assert!(again.is_loaded());
        assert_eq!(again.load_count(), 1);
        assert!(again.unload());
        drop(again);
        assert_eq!(entries(registry), 0);
    }
}
