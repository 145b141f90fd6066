// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! librtlsdr bindings for the RTL-class (8-bit) dongle family.
//!
//! `rtlsdr_set_tuner_gain_ext` takes the three R820 gain stages as register
//! indices; it only exists in librtlsdr forks with the extended tuner API,
//! so it is loaded as an optional symbol with a composite-gain fallback for
//! stock builds.

use std::ffi::{c_char, c_int, c_uint, c_void, CString};
use std::sync::OnceLock;

use libloading::{Library, Symbol};

/// Opaque librtlsdr device handle.
pub type Handle = *mut c_void;

/// Asynchronous read callback: raw interleaved 8-bit IQ bytes plus the
/// context pointer given to [`read_async`].
pub type ReadCallback = unsafe extern "C" fn(*mut u8, u32, *mut c_void);

pub const TUNER_R820T: c_int = 5;

struct Lib {
    _lib: Library,
    get_device_count: Symbol<'static, unsafe extern "C" fn() -> c_uint>,
    get_device_usb_strings:
        Symbol<'static, unsafe extern "C" fn(c_uint, *mut c_char, *mut c_char, *mut c_char) -> c_int>,
    get_index_by_serial: Symbol<'static, unsafe extern "C" fn(*const c_char) -> c_int>,
    open: Symbol<'static, unsafe extern "C" fn(*mut Handle, c_uint) -> c_int>,
    close: Symbol<'static, unsafe extern "C" fn(Handle) -> c_int>,
    set_center_freq: Symbol<'static, unsafe extern "C" fn(Handle, c_uint) -> c_int>,
    set_freq_correction: Symbol<'static, unsafe extern "C" fn(Handle, c_int) -> c_int>,
    set_sample_rate: Symbol<'static, unsafe extern "C" fn(Handle, c_uint) -> c_int>,
    set_tuner_gain_mode: Symbol<'static, unsafe extern "C" fn(Handle, c_int) -> c_int>,
    set_tuner_gain: Symbol<'static, unsafe extern "C" fn(Handle, c_int) -> c_int>,
    set_tuner_gain_ext:
        Option<Symbol<'static, unsafe extern "C" fn(Handle, c_int, c_int, c_int) -> c_int>>,
    get_tuner_type: Symbol<'static, unsafe extern "C" fn(Handle) -> c_int>,
    get_xtal_freq: Symbol<'static, unsafe extern "C" fn(Handle, *mut c_uint, *mut c_uint) -> c_int>,
    reset_buffer: Symbol<'static, unsafe extern "C" fn(Handle) -> c_int>,
    read_async: Symbol<
        'static,
        unsafe extern "C" fn(Handle, ReadCallback, *mut c_void, c_uint, c_uint) -> c_int,
    >,
    cancel_async: Symbol<'static, unsafe extern "C" fn(Handle) -> c_int>,
}

#[cfg(target_os = "linux")]
const LIB_NAMES: &[&str] = &["librtlsdr.so.2", "librtlsdr.so.0", "librtlsdr.so"];

#[cfg(target_os = "macos")]
const LIB_NAMES: &[&str] = &["librtlsdr.dylib", "librtlsdr.2.dylib", "librtlsdr.0.dylib"];

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
const LIB_NAMES: &[&str] = &["rtlsdr.dll", "librtlsdr.dll"];

static LIB: OnceLock<Option<Lib>> = OnceLock::new();

fn load_library() -> Option<Lib> {
    for name in LIB_NAMES {
        let Ok(lib) = (unsafe { Library::new(name) }) else {
            continue;
        };
        // The 'static transmute is sound because the Library is stored next
        // to the symbols and outlives them.
        let lib_ref: &'static Library = unsafe { std::mem::transmute(&lib) };
        let result = (|| {
            unsafe {
                Some(Lib {
                    get_device_count: lib_ref.get(b"rtlsdr_get_device_count\0").ok()?,
                    get_device_usb_strings: lib_ref.get(b"rtlsdr_get_device_usb_strings\0").ok()?,
                    get_index_by_serial: lib_ref.get(b"rtlsdr_get_index_by_serial\0").ok()?,
                    open: lib_ref.get(b"rtlsdr_open\0").ok()?,
                    close: lib_ref.get(b"rtlsdr_close\0").ok()?,
                    set_center_freq: lib_ref.get(b"rtlsdr_set_center_freq\0").ok()?,
                    set_freq_correction: lib_ref.get(b"rtlsdr_set_freq_correction\0").ok()?,
                    set_sample_rate: lib_ref.get(b"rtlsdr_set_sample_rate\0").ok()?,
                    set_tuner_gain_mode: lib_ref.get(b"rtlsdr_set_tuner_gain_mode\0").ok()?,
                    set_tuner_gain: lib_ref.get(b"rtlsdr_set_tuner_gain\0").ok()?,
                    set_tuner_gain_ext: lib_ref.get(b"rtlsdr_set_tuner_gain_ext\0").ok(),
                    get_tuner_type: lib_ref.get(b"rtlsdr_get_tuner_type\0").ok()?,
                    get_xtal_freq: lib_ref.get(b"rtlsdr_get_xtal_freq\0").ok()?,
                    reset_buffer: lib_ref.get(b"rtlsdr_reset_buffer\0").ok()?,
                    read_async: lib_ref.get(b"rtlsdr_read_async\0").ok()?,
                    cancel_async: lib_ref.get(b"rtlsdr_cancel_async\0").ok()?,
                    _lib: lib,
                })
            }
        })();
        if result.is_some() {
            tracing::debug!("loaded {}", name);
            return result;
        }
    }
    tracing::debug!("librtlsdr not found");
    None
}

fn lib() -> Option<&'static Lib> {
    LIB.get_or_init(load_library).as_ref()
}

pub fn is_available() -> bool {
    lib().is_some()
}

pub fn device_count() -> u32 {
    lib().map(|l| unsafe { (l.get_device_count)() }).unwrap_or(0)
}

/// Manufacturer, product and serial strings of a device by index.
pub fn usb_strings(index: u32) -> Option<(String, String, String)> {
    let l = lib()?;
    let mut manufact = [0u8; 257];
    let mut product = [0u8; 257];
    let mut serial = [0u8; 257];
    let ret = unsafe {
        (l.get_device_usb_strings)(
            index,
            manufact.as_mut_ptr() as *mut c_char,
            product.as_mut_ptr() as *mut c_char,
            serial.as_mut_ptr() as *mut c_char,
        )
    };
    if ret < 0 {
        return None;
    }
    let to_string = |buf: &[u8]| {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(0);
        String::from_utf8_lossy(&buf[..end]).into_owned()
    };
    Some((to_string(&manufact), to_string(&product), to_string(&serial)))
}

pub fn index_by_serial(serial: &str) -> Option<u32> {
    let l = lib()?;
    let c_serial = CString::new(serial).ok()?;
    let ret = unsafe { (l.get_index_by_serial)(c_serial.as_ptr()) };
    (ret >= 0).then_some(ret as u32)
}

pub fn open(index: u32) -> Option<Handle> {
    let l = lib()?;
    let mut handle: Handle = std::ptr::null_mut();
    let ret = unsafe { (l.open)(&mut handle, index) };
    (ret == 0 && !handle.is_null()).then_some(handle)
}

pub fn close(handle: Handle) {
    if let Some(l) = lib() {
        unsafe { (l.close)(handle) };
    }
}

pub fn set_center_freq(handle: Handle, fq: u32) -> c_int {
    lib().map(|l| unsafe { (l.set_center_freq)(handle, fq) }).unwrap_or(-1)
}

pub fn set_freq_correction(handle: Handle, ppm: i32) -> c_int {
    // librtlsdr returns -2 ("already set") for a zero correction; that is
    // not an error for us.
    let ret = lib().map(|l| unsafe { (l.set_freq_correction)(handle, ppm) }).unwrap_or(-1);
    if ret == -2 {
        0
    } else {
        ret
    }
}

pub fn set_sample_rate(handle: Handle, rate: u32) -> c_int {
    lib().map(|l| unsafe { (l.set_sample_rate)(handle, rate) }).unwrap_or(-1)
}

/// Program the three R820 gain stages by register index. Returns false when
/// the loaded librtlsdr lacks the extended tuner API; the caller is expected
/// to fall back to [`set_tuner_gain`].
pub fn set_tuner_gain_ext(handle: Handle, lna: u8, mix: u8, vga: u8) -> Option<c_int> {
    let l = lib()?;
    let ext = l.set_tuner_gain_ext.as_ref()?;
    Some(unsafe { ext(handle, lna as c_int, mix as c_int, vga as c_int) })
}

/// Stock-API manual gain in tenths of a dB.
pub fn set_tuner_gain(handle: Handle, tenth_db: i32) -> c_int {
    let Some(l) = lib() else { return -1 };
    let ret = unsafe { (l.set_tuner_gain_mode)(handle, 1) };
    if ret < 0 {
        return ret;
    }
    unsafe { (l.set_tuner_gain)(handle, tenth_db) }
}

pub fn tuner_type(handle: Handle) -> c_int {
    lib().map(|l| unsafe { (l.get_tuner_type)(handle) }).unwrap_or(0)
}

/// (RTL2832 clock, tuner clock) in Hz.
pub fn xtal_freq(handle: Handle) -> (u32, u32) {
    let Some(l) = lib() else { return (0, 0) };
    let mut rtl_clk: c_uint = 0;
    let mut tuner_clk: c_uint = 0;
    unsafe { (l.get_xtal_freq)(handle, &mut rtl_clk, &mut tuner_clk) };
    (rtl_clk, tuner_clk)
}

pub fn reset_buffer(handle: Handle) -> c_int {
    lib().map(|l| unsafe { (l.reset_buffer)(handle) }).unwrap_or(-1)
}

/// Blocks inside librtlsdr delivering USB transfers to `callback` until
/// [`cancel_async`] is called or the device disappears.
///
/// # Safety
/// `ctx` must stay valid for the whole duration of the call and `callback`
/// must tolerate being invoked from librtlsdr's USB thread.
pub unsafe fn read_async(
    handle: Handle,
    callback: ReadCallback,
    ctx: *mut c_void,
    buf_num: u32,
    buf_len: u32,
) -> c_int {
    lib().map(|l| (l.read_async)(handle, callback, ctx, buf_num, buf_len)).unwrap_or(-1)
}

pub fn cancel_async(handle: Handle) -> c_int {
    lib().map(|l| unsafe { (l.cancel_async)(handle) }).unwrap_or(-1)
}
