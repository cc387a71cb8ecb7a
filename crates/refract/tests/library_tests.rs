//! Integration tests for the library lifecycle
//!
//! A scripted loader stands in for the operating system: "opening" a
//! library runs a registration function against the registry, the way a
//! real plugin's entry point would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use refract::{
    reflect_class, Instance, Library, LibraryError, LoaderConfig, NativeHandle, NativeLoader,
    Registration, Registry, ResolvedLibrary, Variant,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

#[derive(Debug, Clone, Default)]
struct HostBase {
    id: u32,
}

#[derive(Debug, Clone, Default)]
struct PluginWidget {
    size: u32,
}

#[derive(Debug, Clone, Default)]
struct PluginGadget {
    base: HostBase,
    power: f64,
}

reflect_class!(HostBase);
reflect_class!(PluginWidget);
reflect_class!(PluginGadget: HostBase => base);

type RegisterHook = Box<dyn Fn(&'static Registry) + Send + Sync>;

/// Loader whose "libraries" are registration closures
struct ScriptedLoader {
    registry: &'static Registry,
    register: RegisterHook,
    available: AtomicBool,
    release_error: Mutex<Option<String>>,
    opened: AtomicUsize,
    released: AtomicUsize,
    last_candidates: Mutex<Vec<String>>,
}

impl ScriptedLoader {
    fn new(registry: &'static Registry, register: impl Fn(&'static Registry) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            registry,
            register: Box::new(register),
            available: AtomicBool::new(true),
            release_error: Mutex::new(None),
            opened: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            last_candidates: Mutex::new(Vec::new()),
        })
    }
}

impl NativeLoader for ScriptedLoader {
    fn resolve(&self, candidates: &[String]) -> Result<ResolvedLibrary, String> {
        *self.last_candidates.lock() = candidates.to_vec();
        if !self.available.load(Ordering::SeqCst) {
            return Err(format!("none of {} candidates could be opened", candidates.len()));
        }
        let opened = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        (self.register)(self.registry);
        Ok(ResolvedLibrary {
            handle: NativeHandle::new(0x1000 + opened).ok_or("null handle")?,
            path: candidates.first().cloned().unwrap_or_default(),
        })
    }

    fn release(&self, _handle: NativeHandle) -> Result<(), String> {
        if let Some(message) = self.release_error.lock().clone() {
            return Err(message);
        }
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unix_config() -> LoaderConfig {
    LoaderConfig {
        prefixes: vec!["lib".into()],
        suffixes: vec![".so".into()],
        versioned_suffixes: vec![".so.{version}".into()],
        search_paths: Vec::new(),
        entry_symbol: None,
    }
}

fn register_plugin(registry: &'static Registry) {
    Registration::class_in::<PluginWidget>(registry)
        .default_constructor()
        .property("size", |w: &PluginWidget| w.size, |w: &mut PluginWidget, v| w.size = v);
    Registration::class_in::<PluginGadget>(registry)
        .property_readonly("power", |g: &PluginGadget| g.power);
    Registration::class_in::<HostBase>(registry).method("plugin_id", |b: &HostBase| b.id + 1000);
    Registration::global_in(registry)
        .function("plugin_version", || 3_u32)
        .property_readonly("plugin_name", || "widgets".to_string());
    Registration::converter_in(registry, |w: &PluginWidget| Some(w.size as i64));
}

#[derive(Debug, Clone, Default)]
struct HelperCodec {
    level: u8,
}

reflect_class!(HelperCodec);

fn register_helper(registry: &'static Registry) {
    Registration::class_in::<HelperCodec>(registry)
        .default_constructor()
        .property("level", |c: &HelperCodec| c.level, |c: &mut HelperCodec, v| c.level = v);
    Registration::global_in(registry).function("helper_version", || 7_u32);
}

fn helper_library(registry: &'static Registry, loader: Arc<ScriptedLoader>) -> Library {
    Library::with_loader(registry, "helper", None, unix_config(), loader)
}

fn plugin_library(registry: &'static Registry, loader: Arc<ScriptedLoader>) -> Library {
    Library::with_loader(registry, "widgets", None, unix_config(), loader)
}

// =============================================================================
// LOAD / UNLOAD TESTS
// =============================================================================

#[test]
fn test_load_unload_round_trip() {
    init_logging();
    let registry = Registry::isolated();
    let host_base = registry.type_of::<HostBase>();
    let before = registry.type_count();

    let loader = ScriptedLoader::new(registry, register_plugin);
    let library = plugin_library(registry, loader.clone());

    assert!(library.load());
    assert!(library.is_loaded());
    assert_eq!(library.load_count(), 1);
    assert_eq!(library.qualified_file_name().as_deref(), Some("libwidgets.so"));
    assert!(library.error_string().is_empty());

    let types = library.types();
    assert_eq!(registry.type_count() - before, types.len());
    assert!(types.contains(&registry.type_of::<PluginWidget>()));
    assert!(types.contains(&registry.type_of::<PluginGadget>()));
    assert!(!types.contains(&host_base));
    assert_eq!(library.global_methods().len(), 1);
    assert_eq!(library.global_properties().len(), 1);

    let widget = Variant::new_in(registry, PluginWidget { size: 4 });
    assert_eq!(widget.to_i64(), Some(4));
    assert!(host_base.method("plugin_id").is_some());
    assert_eq!(host_base.derived_classes().len(), 1);

    assert!(library.unload());
    assert!(!library.is_loaded());
    assert_eq!(loader.released.load(Ordering::SeqCst), 1);

    assert_eq!(registry.type_count(), before);
    assert!(registry.lookup::<PluginWidget>().is_none());
    assert!(registry.lookup::<PluginGadget>().is_none());
    assert!(types.iter().all(|ty| !ty.is_valid()));
    assert!(registry.global_methods_named("plugin_version").is_empty());
    assert!(registry.global_property("plugin_name").is_none());
    assert!(host_base.method("plugin_id").is_none());
    assert!(host_base.derived_classes().is_empty());
    assert!(host_base.is_valid());
}

#[test]
fn test_reload_registers_again() {
    let registry = Registry::isolated();
    let loader = ScriptedLoader::new(registry, register_plugin);
    let library = plugin_library(registry, loader.clone());

    assert!(library.load());
    let first = registry.lookup::<PluginWidget>().unwrap();
    assert!(library.unload());

    assert!(library.load());
    let second = registry.lookup::<PluginWidget>().unwrap();
    assert_ne!(first, second);
    assert!(second.property("size").is_some());
    assert!(registry.global_method("plugin_version", &[]).is_some());
    assert_eq!(loader.opened.load(Ordering::SeqCst), 2);
    assert!(library.unload());
}

#[test]
fn test_load_is_reference_counted() {
    let registry = Registry::isolated();
    let loader = ScriptedLoader::new(registry, register_plugin);
    let library = plugin_library(registry, loader.clone());

    assert!(library.load());
    assert!(library.load());
    assert_eq!(library.load_count(), 2);
    assert_eq!(loader.opened.load(Ordering::SeqCst), 1);

    assert!(library.unload());
    assert!(library.is_loaded());
    assert!(registry.lookup::<PluginWidget>().is_some());

    assert!(library.unload());
    assert!(!library.is_loaded());
    assert!(registry.lookup::<PluginWidget>().is_none());

    assert_eq!(
        library.try_unload(),
        Err(LibraryError::NotLoaded("widgets".to_string()))
    );
}

#[test]
fn test_handles_for_same_file_share_state() {
    let registry = Registry::isolated();
    let loader = ScriptedLoader::new(registry, register_plugin);
    let first = plugin_library(registry, loader.clone());
    let second = plugin_library(registry, loader.clone());

    assert!(first.load());
    assert!(second.load());
    assert_eq!(first.load_count(), 2);
    assert_eq!(loader.opened.load(Ordering::SeqCst), 1);
    assert_eq!(second.types(), first.types());

    assert!(first.unload());
    assert!(second.is_loaded());
    assert!(second.unload());
    assert!(!first.is_loaded());
}

#[test]
fn test_release_failure_keeps_registrations() {
    init_logging();
    let registry = Registry::isolated();
    let loader = ScriptedLoader::new(registry, register_plugin);
    let library = plugin_library(registry, loader.clone());
    assert!(library.load());
    assert!(library.load());

    *loader.release_error.lock() = Some("library is busy".to_string());
    assert!(library.unload());
    assert_eq!(
        library.try_unload(),
        Err(LibraryError::UnloadFailed("library is busy".to_string()))
    );
    assert!(library.is_loaded());
    assert_eq!(library.load_count(), 1);
    assert_eq!(library.error_string(), "library is busy");
    assert!(registry.lookup::<PluginWidget>().is_some());

    *loader.release_error.lock() = None;
    assert!(library.unload());
    assert!(registry.lookup::<PluginWidget>().is_none());
    assert!(library.error_string().is_empty());
}

#[test]
fn test_failed_load_changes_nothing() {
    init_logging();
    let registry = Registry::isolated();
    let before = registry.type_count();
    let loader = ScriptedLoader::new(registry, register_plugin);
    loader.available.store(false, Ordering::SeqCst);
    let library = plugin_library(registry, loader.clone());

    let error = library.try_load().unwrap_err();
    assert!(matches!(error, LibraryError::NotFound { ref name, .. } if name == "widgets"));
    assert!(!library.is_loaded());
    assert!(library.error_string().contains("candidates"));
    assert!(library.types().is_empty());
    assert_eq!(registry.type_count(), before);
    assert_eq!(library.load_count(), 0);
    assert!(!library.unload());

    loader.available.store(true, Ordering::SeqCst);
    assert!(library.load());
    assert!(!library.types().is_empty());
    assert!(library.unload());
}

#[test]
fn test_host_registrations_survive_unload() {
    let registry = Registry::isolated();
    let loader = ScriptedLoader::new(registry, register_plugin);
    let library = plugin_library(registry, loader);
    assert!(library.load());

    // registered by the host while the library is loaded
    Registration::class_in::<HostBase>(registry).method("host_id", |b: &HostBase| b.id);
    let gadget = registry.lookup::<PluginGadget>().unwrap();
    assert!(gadget.method("host_id").is_some());

    assert!(library.unload());
    let host_base = registry.type_of::<HostBase>();
    let host_id = host_base.method("host_id").unwrap();
    let base = HostBase { id: 8 };
    let result = host_id.invoke(&mut Instance::from_ref(&base), &[]);
    assert_eq!(result.get_value::<u32>(), Some(&8));
}

#[test]
fn test_versioned_candidates_passed_to_loader() {
    let registry = Registry::isolated();
    let loader = ScriptedLoader::new(registry, |_| {});
    let library = Library::with_loader(registry, "widgets", Some("2".to_string()), unix_config(), loader.clone());

    assert!(library.load());
    assert_eq!(library.version().as_deref(), Some("2"));
    let candidates = loader.last_candidates.lock().clone();
    assert_eq!(candidates.first().map(String::as_str), Some("libwidgets.so.2"));
    assert_eq!(candidates.last().map(String::as_str), Some("widgets"));
    assert!(library.types().is_empty());
    assert!(library.unload());
}

#[test]
fn test_invalid_names_rejected() {
    let registry = Registry::isolated();
    let loader = ScriptedLoader::new(registry, register_plugin);
    let library = Library::with_loader(registry, "bad\0name", None, unix_config(), loader.clone());
    assert_eq!(
        library.try_load(),
        Err(LibraryError::InvalidPath("bad\0name".to_string()))
    );
    assert_eq!(loader.opened.load(Ordering::SeqCst), 0);
}

// =============================================================================
// NESTED LOAD TESTS
// =============================================================================

#[test]
fn test_entry_point_loads_dependency() {
    init_logging();
    let registry = Registry::isolated();
    let helper_loader = ScriptedLoader::new(registry, register_helper);

    let dependency = helper_loader.clone();
    let plugin_loader = ScriptedLoader::new(registry, move |registry| {
        register_plugin(registry);
        // the plugin keeps its dependency loaded past this handle
        let helper = helper_library(registry, dependency.clone());
        assert!(helper.load());
    });
    let plugin = plugin_library(registry, plugin_loader);

    assert!(plugin.load());
    let helper = helper_library(registry, helper_loader.clone());
    assert!(helper.is_loaded());
    assert_eq!(helper.load_count(), 1);

    let codec = registry.lookup::<HelperCodec>().expect("helper type registered");
    let widget = registry.lookup::<PluginWidget>().expect("plugin type registered");
    assert!(plugin.types().contains(&widget));
    assert!(!plugin.types().contains(&codec));
    assert!(helper.types().contains(&codec));
    assert!(plugin.global_methods().iter().all(|m| m.name() != "helper_version"));

    assert!(plugin.unload());
    assert!(!widget.is_valid());
    assert!(codec.is_valid());
    assert!(codec.property("level").is_some());
    assert!(registry.global_method("helper_version", &[]).is_some());
    assert!(helper.is_loaded());

    assert!(helper.unload());
    assert!(!codec.is_valid());
    assert!(registry.global_method("helper_version", &[]).is_none());
    assert_eq!(helper_loader.released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nested_and_concurrent_loads_complete() {
    let registry = Registry::isolated();
    let helper_loader = ScriptedLoader::new(registry, register_helper);
    let dependency = helper_loader.clone();
    let plugin_loader = ScriptedLoader::new(registry, move |registry| {
        register_plugin(registry);
        let helper = helper_library(registry, dependency.clone());
        assert!(helper.load());
    });

    let helper_users: Vec<_> = (0..4)
        .map(|_| {
            let loader = helper_loader.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let helper = helper_library(registry, loader.clone());
                    assert!(helper.load());
                    assert!(helper.unload());
                }
            })
        })
        .collect();

    let plugin = plugin_library(registry, plugin_loader);
    for _ in 0..20 {
        assert!(plugin.load());
        assert!(plugin.unload());
    }
    for user in helper_users {
        user.join().expect("helper user");
    }

    // one outstanding load per plugin load remains on the helper
    let helper = helper_library(registry, helper_loader);
    assert_eq!(helper.load_count(), 20);
    assert!(registry.lookup::<PluginWidget>().is_none());
}
