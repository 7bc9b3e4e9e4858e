//! libmpv backend
//!
//! Thin FFI layer over libmpv's client API (`mpv/client.h`) via
//! `libmpv2-sys`. The client API is thread-safe; the only restriction is that
//! `mpv_wait_event` must not be called concurrently on the same handle, which
//! the player core guarantees by owning a single event loop thread.

use super::{Engine, EngineError, EngineHandle, OptionValue, RawEvent, ERROR_NOMEM};
use libmpv2_sys as sys;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::ptr::{self, NonNull};
use tracing::debug;

/// `MPV_FORMAT_STRING` from `mpv_format`
const MPV_FORMAT_STRING: sys::mpv_format = 1;

/// Creates libmpv client handles
#[derive(Debug, Default)]
pub struct LibMpvEngine;

impl LibMpvEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for LibMpvEngine {
    fn name(&self) -> &'static str {
        "libmpv"
    }

    fn create(&self) -> Result<Box<dyn EngineHandle>, EngineError> {
        // SAFETY: mpv_create has no preconditions; it returns NULL on failure.
        let ctx = unsafe { sys::mpv_create() };
        let ctx = NonNull::new(ctx)
            .ok_or_else(|| EngineError::rejected(ERROR_NOMEM, "mpv_create returned NULL"))?;

        debug!("Created mpv handle {:p}", ctx.as_ptr());
        Ok(Box::new(MpvHandle { ctx }))
    }
}

/// One `mpv_handle`, destroyed with `mpv_terminate_destroy` on drop
struct MpvHandle {
    ctx: NonNull<sys::mpv_handle>,
}

// SAFETY: every libmpv client API function may be called from any thread.
unsafe impl Send for MpvHandle {}
// SAFETY: see above; concurrent mpv_wait_event is prevented by the caller.
unsafe impl Sync for MpvHandle {}

fn cstring(value: &str) -> Result<CString, EngineError> {
    CString::new(value)
        .map_err(|e| EngineError::Allocation(format!("cannot marshal {:?}: {}", value, e)))
}

fn check(code: i32) -> Result<(), EngineError> {
    if code >= 0 {
        return Ok(());
    }
    // SAFETY: mpv_error_string returns a static string for any code.
    let message = unsafe { CStr::from_ptr(sys::mpv_error_string(code)) }
        .to_string_lossy()
        .into_owned();
    Err(EngineError::rejected(code, message))
}

impl EngineHandle for MpvHandle {
    fn set_option(&self, name: &str, value: &OptionValue) -> Result<(), EngineError> {
        let name = cstring(name)?;
        let value = cstring(&value.to_string())?;
        // SAFETY: ctx is live, both strings outlive the call.
        check(unsafe {
            sys::mpv_set_option_string(self.ctx.as_ptr(), name.as_ptr(), value.as_ptr())
        })
    }

    fn initialize(&self) -> Result<(), EngineError> {
        // SAFETY: ctx is live and not yet initialized.
        check(unsafe { sys::mpv_initialize(self.ctx.as_ptr()) })
    }

    fn command_async(&self, reply_id: u64, args: &[String]) -> Result<(), EngineError> {
        let owned = args
            .iter()
            .map(|arg| cstring(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let mut argv: Vec<*const c_char> = Vec::new();
        argv.try_reserve_exact(owned.len() + 1)
            .map_err(|e| EngineError::Allocation(format!("argument vector: {}", e)))?;
        argv.extend(owned.iter().map(|s| s.as_ptr()));
        argv.push(ptr::null());

        // SAFETY: argv is NULL-terminated and its strings outlive the call;
        // mpv copies the arguments before returning.
        check(unsafe { sys::mpv_command_async(self.ctx.as_ptr(), reply_id, argv.as_mut_ptr()) })
    }

    fn set_property_async(
        &self,
        reply_id: u64,
        name: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        let name = cstring(name)?;
        let value = cstring(value)?;
        let mut data: *const c_char = value.as_ptr();

        // SAFETY: data points at a char* as MPV_FORMAT_STRING requires; mpv
        // copies the value before returning.
        check(unsafe {
            sys::mpv_set_property_async(
                self.ctx.as_ptr(),
                reply_id,
                name.as_ptr(),
                MPV_FORMAT_STRING,
                &mut data as *mut *const c_char as *mut c_void,
            )
        })
    }

    fn wait_event(&self, timeout: f64) -> RawEvent {
        // SAFETY: ctx is live; the returned event stays valid until the next
        // wait on this handle, and is copied out immediately.
        let event = unsafe { &*sys::mpv_wait_event(self.ctx.as_ptr(), timeout) };
        RawEvent {
            id: event.event_id as u32,
            error: event.error,
            reply_id: event.reply_userdata,
        }
    }

    fn wakeup(&self) {
        // SAFETY: ctx is live.
        unsafe { sys::mpv_wakeup(self.ctx.as_ptr()) }
    }
}

impl Drop for MpvHandle {
    fn drop(&mut self) {
        debug!("Destroying mpv handle {:p}", self.ctx.as_ptr());
        // SAFETY: the owner guarantees no thread is inside mpv_wait_event.
        unsafe { sys::mpv_terminate_destroy(self.ctx.as_ptr()) }
    }
}
