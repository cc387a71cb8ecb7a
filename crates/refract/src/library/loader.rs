//! Native library loading
//!
//! [`NativeLoader`] is the seam between the library lifecycle and the
//! operating system: it opens the first loadable candidate and releases a
//! handle again. [`DylibLoader`] implements it with `dlopen`/`dlclose` on
//! Unix and `LoadLibraryW`/`FreeLibrary` on Windows, and calls the
//! library's registration entry point once it is open.

use std::num::NonZeroUsize;
use std::path::Path;

use crate::config::LoaderConfig;
use crate::registry::Registry;

/// Opaque handle of an opened native library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(NonZeroUsize);

impl NativeHandle {
    /// Wrap a raw handle; `None` for null
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// Raw handle value
    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// A successfully opened library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLibrary {
    /// Handle to pass back to [`NativeLoader::release`]
    pub handle: NativeHandle,
    /// Candidate that was opened
    pub path: String,
}

/// Opens and releases native libraries
pub trait NativeLoader: Send + Sync {
    /// Open the first loadable candidate, in order
    fn resolve(&self, candidates: &[String]) -> Result<ResolvedLibrary, String>;

    /// Release a handle returned by `resolve`
    fn release(&self, handle: NativeHandle) -> Result<(), String>;
}

/// Signature of a library's registration entry point
pub type RegisterFn = unsafe extern "C" fn(*const Registry);

/// Export `$register` (a `fn(&'static Registry)`) as the library's
/// registration entry point.
///
/// ```ignore
/// fn register(registry: &'static refract::Registry) {
///     refract::Registration::class_in::<Widget>(registry).default_constructor();
/// }
///
/// refract::export_registration!(register);
/// ```
#[macro_export]
macro_rules! export_registration {
    ($register:path) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C" fn refract_register(registry: *const $crate::Registry) {
            if registry.is_null() {
                return;
            }
            // the host passes a registry that lives for the rest of the process
            let registry: &'static $crate::Registry = unsafe { &*registry };
            $register(registry);
        }
    };
}

/// Operating-system loader
pub struct DylibLoader {
    registry: &'static Registry,
    entry_symbol: Option<String>,
}

impl DylibLoader {
    /// Loader registering into `registry` through `entry_symbol`
    pub fn new(registry: &'static Registry, entry_symbol: Option<String>) -> Self {
        Self {
            registry,
            entry_symbol,
        }
    }

    /// Loader using the entry symbol from `config`
    pub fn from_config(registry: &'static Registry, config: &LoaderConfig) -> Self {
        Self::new(registry, config.entry_symbol.clone())
    }

    fn run_entry(&self, handle: usize, path: &str) {
        let Some(symbol) = &self.entry_symbol else {
            return;
        };
        // SAFETY: `handle` was just returned by a successful open
        match unsafe { platform::symbol(handle, symbol) } {
            Some(address) => {
                log::debug!("Running {} from {}", symbol, path);
                // SAFETY: the entry symbol is exported with the `RegisterFn`
                // signature (see `export_registration!`)
                unsafe {
                    let entry: RegisterFn = std::mem::transmute::<usize, RegisterFn>(address);
                    entry(self.registry as *const Registry);
                }
            }
            None => log::trace!("{} has no {} symbol", path, symbol),
        }
    }
}

impl NativeLoader for DylibLoader {
    fn resolve(&self, candidates: &[String]) -> Result<ResolvedLibrary, String> {
        let mut last_error = String::from("no candidate paths");
        for candidate in candidates {
            log::trace!("Trying to load {}", candidate);
            match platform::open(candidate) {
                Ok(raw) => {
                    let Some(handle) = NativeHandle::new(raw) else {
                        last_error = format!("Cannot load library {}: null handle", candidate);
                        continue;
                    };
                    self.run_entry(raw, candidate);
                    return Ok(ResolvedLibrary {
                        handle,
                        path: candidate.clone(),
                    });
                }
                Err(message) => {
                    last_error = message;
                    // the file is there but cannot be opened; report that error
                    let path = Path::new(candidate);
                    if path.is_absolute() && path.exists() {
                        break;
                    }
                }
            }
        }
        Err(last_error)
    }

    fn release(&self, handle: NativeHandle) -> Result<(), String> {
        platform::close(handle.get())
    }
}

impl std::fmt::Debug for DylibLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DylibLoader")
            .field("entry_symbol", &self.entry_symbol)
            .finish()
    }
}

// ============================================================================
// Unix Implementation (Linux, macOS, BSD)
// ============================================================================

#[cfg(unix)]
mod platform {
    use std::ffi::{c_void, CStr, CString};

    fn last_error() -> String {
        // SAFETY: dlerror returns null or a valid C string
        unsafe {
            let message = libc::dlerror();
            if message.is_null() {
                "Unknown error".to_string()
            } else {
                CStr::from_ptr(message).to_string_lossy().into_owned()
            }
        }
    }

    pub(super) fn open(path: &str) -> Result<usize, String> {
        let c_path = CString::new(path).map_err(|e| format!("Invalid path: {}", e))?;

        // RTLD_NODELETE keeps the code mapped after dlclose: closures the
        // library registered may still be dropped during rollback
        let handle = unsafe {
            libc::dlopen(
                c_path.as_ptr(),
                libc::RTLD_NOW | libc::RTLD_LOCAL | libc::RTLD_NODELETE,
            )
        };
        if handle.is_null() {
            return Err(format!("Cannot load library {}: {}", path, last_error()));
        }
        Ok(handle as usize)
    }

    pub(super) unsafe fn symbol(handle: usize, name: &str) -> Option<usize> {
        let c_name = CString::new(name).ok()?;
        libc::dlerror();
        let symbol = libc::dlsym(handle as *mut c_void, c_name.as_ptr());
        if symbol.is_null() || !libc::dlerror().is_null() {
            return None;
        }
        Some(symbol as usize)
    }

    pub(super) fn close(handle: usize) -> Result<(), String> {
        if unsafe { libc::dlclose(handle as *mut c_void) } != 0 {
            return Err(format!("Cannot unload library: {}", last_error()));
        }
        Ok(())
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod platform {
    use std::ffi::{c_char, c_void, CString, OsStr};
    use std::os::windows::ffi::OsStrExt;

    extern "system" {
        fn LoadLibraryW(filename: *const u16) -> *mut c_void;
        fn GetProcAddress(module: *mut c_void, procname: *const c_char) -> *mut c_void;
        fn FreeLibrary(module: *mut c_void) -> i32;
        fn GetLastError() -> u32;
    }

    pub(super) fn open(path: &str) -> Result<usize, String> {
        let wide: Vec<u16> = OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        if handle.is_null() {
            let code = unsafe { GetLastError() };
            return Err(format!("Cannot load library {} (error code: {})", path, code));
        }
        Ok(handle as usize)
    }

    pub(super) unsafe fn symbol(handle: usize, name: &str) -> Option<usize> {
        let c_name = CString::new(name).ok()?;
        let symbol = GetProcAddress(handle as *mut c_void, c_name.as_ptr());
        if symbol.is_null() {
            return None;
        }
        Some(symbol as usize)
    }

    pub(super) fn close(handle: usize) -> Result<(), String> {
        if unsafe { FreeLibrary(handle as *mut c_void) } == 0 {
            let code = unsafe { GetLastError() };
            return Err(format!("Cannot unload library (error code: {})", code));
        }
        Ok(())
    }
}
