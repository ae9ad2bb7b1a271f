//! Device-server lifecycle FFI surface, presented to a hosting C process the
//! way the original system exposes CUSE device registration. Grounded in the
//! teacher's `create_service`/`start_service`/`stop_service`/`destroy_service`
//! opaque-handle pattern (same `Box::into_raw`/`from_raw` lifecycle, same
//! `# Safety` doc-comment convention).

use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use libc::c_char;
use log::{error, info};

use crate::config::VirtualMidiConfig;
use crate::worker::{default_worker_count, WorkerPool};

/// Opaque handle for a running (or not-yet-started) device server instance.
pub struct ServiceHandle {
    config: VirtualMidiConfig,
    running: Arc<AtomicBool>,
    pool: Mutex<Option<WorkerPool>>,
}

/// Creates a device server handle, loading configuration from `config_path`
/// if non-null, falling back to defaults otherwise. Does not start it.
///
/// # Safety
/// `config_path`, if non-null, must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn create_service(config_path: *const c_char) -> *mut ServiceHandle {
    let _ = env_logger::try_init();

    let config = if config_path.is_null() {
        VirtualMidiConfig::default()
    } else {
        match CStr::from_ptr(config_path).to_str() {
            Ok(path) if !path.is_empty() => {
                VirtualMidiConfig::load_from_file(path).unwrap_or_else(|e| {
                    error!("failed to load config from {path}: {e}");
                    VirtualMidiConfig::default()
                })
            }
            _ => VirtualMidiConfig::default(),
        }
    };

    Box::into_raw(Box::new(ServiceHandle {
        config,
        running: Arc::new(AtomicBool::new(false)),
        pool: Mutex::new(None),
    }))
}

/// Starts the worker pool backing `handle`'s device server. A no-op if
/// already running.
///
/// # Safety
/// `handle` must be a valid pointer returned by [`create_service`].
#[no_mangle]
pub unsafe extern "C" fn start_service(handle: *mut ServiceHandle) {
    if handle.is_null() {
        return;
    }
    let handle_ref = &*handle;
    let mut pool_guard = handle_ref.pool.lock().unwrap();
    if pool_guard.is_some() {
        info!("service already running");
        return;
    }

    handle_ref.running.store(true, Ordering::SeqCst);
    let pool = WorkerPool::spawn(
        default_worker_count(),
        Arc::clone(&handle_ref.running),
        || {
            // Placeholder wait-and-process tick: the concrete device engine
            // (MidiDeviceHandle / SequencerHandle) is wired in by the binary
            // entrypoints, which own the kernel-proxy connection this handle
            // is a stand-in for.
            std::thread::sleep(std::time::Duration::from_millis(50));
        },
    );
    *pool_guard = Some(pool);
    info!("service started via FFI");
}

/// Stops `handle`'s worker pool, joining all worker threads.
///
/// # Safety
/// `handle` must be a valid pointer returned by [`create_service`].
#[no_mangle]
pub unsafe extern "C" fn stop_service(handle: *mut ServiceHandle) {
    if handle.is_null() {
        return;
    }
    let handle_ref = &*handle;
    let pool = handle_ref.pool.lock().unwrap().take();
    match pool {
        Some(pool) => {
            pool.stop_and_join();
            info!("service stopped via FFI");
        }
        None => info!("service was not running"),
    }
}

/// Stops (if necessary) and frees `handle`. `handle` is invalid afterwards.
///
/// # Safety
/// `handle` must be a valid pointer returned by [`create_service`], not
/// already destroyed.
#[no_mangle]
pub unsafe extern "C" fn destroy_service(handle: *mut ServiceHandle) {
    if handle.is_null() {
        return;
    }
    stop_service(handle);
    let _ = Box::from_raw(handle);
    info!("service handle destroyed");
}

/// Returns the configured synth driver name, or null if unset. The returned
/// string must be freed with [`free_string`].
///
/// # Safety
/// `handle` must be a valid pointer returned by [`create_service`].
#[no_mangle]
pub unsafe extern "C" fn get_driver_name(handle: *mut ServiceHandle) -> *mut c_char {
    if handle.is_null() {
        return std::ptr::null_mut();
    }
    let handle_ref = &*handle;
    match handle_ref.config.driver.as_deref().and_then(|s| CString::new(s).ok()) {
        Some(s) => s.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Frees a C string previously returned by this module.
///
/// # Safety
/// `s` must have been allocated by this module (e.g. via `CString::into_raw`),
/// or null.
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    let _ = CString::from_raw(s);
}
