// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! libairspy bindings for the Airspy R2 / Mini (12-bit) family.

use std::ffi::{c_char, c_int, c_void};
use std::sync::OnceLock;

use libloading::{Library, Symbol};

/// Opaque libairspy device handle.
pub type Handle = *mut c_void;

pub const AIRSPY_SUCCESS: c_int = 0;
pub const AIRSPY_TRUE: c_int = 1;
/// `airspy_sample_type` value for interleaved float32 IQ.
pub const SAMPLE_FLOAT32_IQ: c_int = 0;

/// One sample block handed to the RX callback, mirroring
/// `airspy_transfer_t`.
#[repr(C)]
pub struct Transfer {
    pub device: Handle,
    pub ctx: *mut c_void,
    pub samples: *mut c_void,
    pub sample_count: c_int,
    pub dropped_samples: u64,
    pub sample_type: c_int,
}

/// RX callback; return 0 to keep streaming, anything else stops the stream.
pub type SampleBlockCallback = unsafe extern "C" fn(*mut Transfer) -> c_int;

struct Lib {
    _lib: Library,
    list_devices: Symbol<'static, unsafe extern "C" fn(*mut u64, c_int) -> c_int>,
    open_sn: Symbol<'static, unsafe extern "C" fn(*mut Handle, u64) -> c_int>,
    close: Symbol<'static, unsafe extern "C" fn(Handle) -> c_int>,
    set_sample_type: Symbol<'static, unsafe extern "C" fn(Handle, c_int) -> c_int>,
    set_packing: Symbol<'static, unsafe extern "C" fn(Handle, u8) -> c_int>,
    set_samplerate: Symbol<'static, unsafe extern "C" fn(Handle, u32) -> c_int>,
    set_freq: Symbol<'static, unsafe extern "C" fn(Handle, u32) -> c_int>,
    set_lna_gain: Symbol<'static, unsafe extern "C" fn(Handle, u8) -> c_int>,
    set_mixer_gain: Symbol<'static, unsafe extern "C" fn(Handle, u8) -> c_int>,
    set_vga_gain: Symbol<'static, unsafe extern "C" fn(Handle, u8) -> c_int>,
    start_rx:
        Symbol<'static, unsafe extern "C" fn(Handle, SampleBlockCallback, *mut c_void) -> c_int>,
    stop_rx: Symbol<'static, unsafe extern "C" fn(Handle) -> c_int>,
    is_streaming: Symbol<'static, unsafe extern "C" fn(Handle) -> c_int>,
    version_string_read: Symbol<'static, unsafe extern "C" fn(Handle, *mut c_char, u8) -> c_int>,
    get_samplerates: Symbol<'static, unsafe extern "C" fn(Handle, *mut u32, u32) -> c_int>,
}

#[cfg(target_os = "linux")]
const LIB_NAMES: &[&str] = &["libairspy.so.0", "libairspy.so"];

#[cfg(target_os = "macos")]
const LIB_NAMES: &[&str] = &["libairspy.dylib", "libairspy.0.dylib"];

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
const LIB_NAMES: &[&str] = &["airspy.dll", "libairspy.dll"];

static LIB: OnceLock<Option<Lib>> = OnceLock::new();

fn load_library() -> Option<Lib> {
    for name in LIB_NAMES {
        let Ok(lib) = (unsafe { Library::new(name) }) else {
            continue;
        };
        let lib_ref: &'static Library = unsafe { std::mem::transmute(&lib) };
        let result = (|| {
            unsafe {
                Some(Lib {
                    list_devices: lib_ref.get(b"airspy_list_devices\0").ok()?,
                    open_sn: lib_ref.get(b"airspy_open_sn\0").ok()?,
                    close: lib_ref.get(b"airspy_close\0").ok()?,
                    set_sample_type: lib_ref.get(b"airspy_set_sample_type\0").ok()?,
                    set_packing: lib_ref.get(b"airspy_set_packing\0").ok()?,
                    set_samplerate: lib_ref.get(b"airspy_set_samplerate\0").ok()?,
                    set_freq: lib_ref.get(b"airspy_set_freq\0").ok()?,
                    set_lna_gain: lib_ref.get(b"airspy_set_lna_gain\0").ok()?,
                    set_mixer_gain: lib_ref.get(b"airspy_set_mixer_gain\0").ok()?,
                    set_vga_gain: lib_ref.get(b"airspy_set_vga_gain\0").ok()?,
                    start_rx: lib_ref.get(b"airspy_start_rx\0").ok()?,
                    stop_rx: lib_ref.get(b"airspy_stop_rx\0").ok()?,
                    is_streaming: lib_ref.get(b"airspy_is_streaming\0").ok()?,
                    version_string_read: lib_ref.get(b"airspy_version_string_read\0").ok()?,
                    get_samplerates: lib_ref.get(b"airspy_get_samplerates\0").ok()?,
                    _lib: lib,
                })
            }
        })();
        if result.is_some() {
            tracing::debug!("loaded {}", name);
            return result;
        }
    }
    tracing::debug!("libairspy not found");
    None
}

fn lib() -> Option<&'static Lib> {
    LIB.get_or_init(load_library).as_ref()
}

pub fn is_available() -> bool {
    lib().is_some()
}

/// Serial numbers of all attached Airspy devices.
pub fn list_devices() -> Vec<u64> {
    let Some(l) = lib() else { return Vec::new() };
    let mut serials = [0u64; 32];
    let count = unsafe { (l.list_devices)(serials.as_mut_ptr(), serials.len() as c_int) };
    if count <= 0 {
        return Vec::new();
    }
    serials[..(count as usize).min(serials.len())].to_vec()
}

/// Open by serial; 0 means first device.
pub fn open_sn(serial: u64) -> Option<Handle> {
    let l = lib()?;
    let mut handle: Handle = std::ptr::null_mut();
    let ret = unsafe { (l.open_sn)(&mut handle, serial) };
    (ret == AIRSPY_SUCCESS && !handle.is_null()).then_some(handle)
}

pub fn close(handle: Handle) {
    if let Some(l) = lib() {
        unsafe { (l.close)(handle) };
    }
}

pub fn set_sample_type(handle: Handle, sample_type: c_int) -> c_int {
    lib().map(|l| unsafe { (l.set_sample_type)(handle, sample_type) }).unwrap_or(-1)
}

pub fn set_packing(handle: Handle, enabled: bool) -> c_int {
    lib().map(|l| unsafe { (l.set_packing)(handle, enabled as u8) }).unwrap_or(-1)
}

pub fn set_samplerate(handle: Handle, rate: u32) -> c_int {
    lib().map(|l| unsafe { (l.set_samplerate)(handle, rate) }).unwrap_or(-1)
}

pub fn set_freq(handle: Handle, fq: u32) -> c_int {
    lib().map(|l| unsafe { (l.set_freq)(handle, fq) }).unwrap_or(-1)
}

pub fn set_lna_gain(handle: Handle, idx: u8) -> c_int {
    lib().map(|l| unsafe { (l.set_lna_gain)(handle, idx) }).unwrap_or(-1)
}

pub fn set_mixer_gain(handle: Handle, idx: u8) -> c_int {
    lib().map(|l| unsafe { (l.set_mixer_gain)(handle, idx) }).unwrap_or(-1)
}

pub fn set_vga_gain(handle: Handle, idx: u8) -> c_int {
    lib().map(|l| unsafe { (l.set_vga_gain)(handle, idx) }).unwrap_or(-1)
}

/// Start the vendor RX stream.
///
/// # Safety
/// `ctx` must stay valid until the stream is stopped and `callback` must
/// tolerate being invoked from libairspy's USB thread.
pub unsafe fn start_rx(handle: Handle, callback: SampleBlockCallback, ctx: *mut c_void) -> c_int {
    lib().map(|l| (l.start_rx)(handle, callback, ctx)).unwrap_or(-1)
}

pub fn stop_rx(handle: Handle) -> c_int {
    lib().map(|l| unsafe { (l.stop_rx)(handle) }).unwrap_or(-1)
}

pub fn is_streaming(handle: Handle) -> bool {
    lib().map(|l| unsafe { (l.is_streaming)(handle) } == AIRSPY_TRUE).unwrap_or(false)
}

pub fn version_string(handle: Handle) -> String {
    let Some(l) = lib() else {
        return String::new();
    };
    let mut buf = [0u8; 256];
    unsafe { (l.version_string_read)(handle, buf.as_mut_ptr() as *mut c_char, 255) };
    let end = buf.iter().position(|&b| b == 0).unwrap_or(0);
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Native sample rates advertised by an open device.
pub fn samplerates(handle: Handle) -> Vec<u32> {
    let Some(l) = lib() else { return Vec::new() };
    let mut count: u32 = 0;
    unsafe { (l.get_samplerates)(handle, &mut count as *mut u32, 0) };
    if count == 0 || count > 64 {
        return Vec::new();
    }
    let mut rates = vec![0u32; count as usize];
    unsafe { (l.get_samplerates)(handle, rates.as_mut_ptr(), count) };
    rates
}
