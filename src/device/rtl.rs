// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! RTL-class (8-bit) device worker.
//!
//! The worker thread owns the librtlsdr handle for its whole lifetime. It
//! opens and configures the dongle, then parks inside `rtlsdr_read_async`,
//! which delivers packed 8-bit IQ transfers on librtlsdr's USB thread. The
//! transfer size is chosen so one transfer is exactly one 32 ms block, which
//! gives the 31.25 Hz cadence without any host-side timing.

use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use super::ffi::rtlsdr;
use super::{
    block_power_dbfs, composite_gain_to_indices, indices_to_gain_db, AtomicState, BlockInfo,
    DataFn, DeviceError, DeviceInfo, DeviceState, DeviceType, StreamState, MAX_FQ, MAX_GAIN,
    MIN_FQ, MIN_GAIN,
};
use crate::rates::SampleRate;
use crate::IqSample;

/// Cycle this many USB transfers inside librtlsdr.
const NUM_TRANSFERS: u32 = 16;

const RETRY_DELAY: Duration = Duration::from_secs(1);

// Fixed menu for RTL dongles with a 28.8 MHz crystal.
const SUPPORTED_RATES: [SampleRate; 6] = [
    SampleRate::Fs1200,
    SampleRate::Fs1440,
    SampleRate::Fs1600,
    SampleRate::Fs1920,
    SampleRate::Fs2400,
    SampleRate::Fs2560,
];

pub(super) const DEFAULT_SAMPLE_RATE: SampleRate = SampleRate::Fs1440;

#[derive(Debug, Clone, Copy)]
struct Tuning {
    fq: u32,
    lna: u8,
    mix: u8,
    vga: u8,
}

struct Inner {
    run: AtomicBool,
    state: AtomicState,
    tuning: Mutex<Tuning>,
    /// Set by the control side after changing `tuning`; the data callback
    /// re-applies the tuning on the fly when it sees the flag.
    dirty: AtomicBool,
}

/// Device manager for one RTL dongle.
pub struct RtlDev {
    serial: String,
    rate: SampleRate,
    fq_corr: i32,
    inner: Arc<Inner>,
    data_fn: Option<DataFn>,
    worker: Option<JoinHandle<()>>,
}

impl RtlDev {
    pub fn new(serial: &str, rate: SampleRate, fq_corr: i32) -> Self {
        RtlDev {
            serial: serial.to_string(),
            rate,
            fq_corr,
            inner: Arc::new(Inner {
                run: AtomicBool::new(false),
                state: AtomicState::new(DeviceState::Idle),
                tuning: Mutex::new(Tuning {
                    fq: 100_000_000,
                    lna: 9,
                    mix: 8,
                    vga: 12,
                }),
                dirty: AtomicBool::new(false),
            }),
            data_fn: None,
            worker: None,
        }
    }

    pub fn set_data_fn(&mut self, data_fn: DataFn) {
        self.data_fn = Some(data_fn);
    }

    pub fn state(&self) -> DeviceState {
        self.inner.state.load()
    }

    pub fn start(&mut self) -> Result<(), DeviceError> {
        if self.worker.is_some() {
            return Err(DeviceError::AlreadyStarted);
        }
        if !SUPPORTED_RATES.contains(&self.rate) {
            return Err(DeviceError::InvalidSampleRate);
        }

        let data_fn = self.data_fn.take().unwrap_or_else(|| Box::new(|_, _| {}));

        self.inner.state.store(DeviceState::Starting);
        self.inner.run.store(true, Ordering::Release);

        let inner = self.inner.clone();
        let serial = self.serial.clone();
        let rate = self.rate;
        let fq_corr = self.fq_corr;
        let handle = std::thread::Builder::new()
            .name("rtl-worker".to_string())
            .spawn(move || worker(inner, serial, rate, fq_corr, data_fn))
            .map_err(|_| DeviceError::OpenFailed)?;
        self.worker = Some(handle);

        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), DeviceError> {
        let Some(worker) = self.worker.take() else {
            return Err(DeviceError::AlreadyStopped);
        };

        self.inner.run.store(false, Ordering::Release);
        self.inner.state.store(DeviceState::Stopping);
        let _ = worker.join();

        Ok(())
    }

    pub fn set_fq(&mut self, fq: u32) -> Result<(), DeviceError> {
        if !(MIN_FQ..=MAX_FQ).contains(&fq) {
            return Err(DeviceError::InvalidFq);
        }
        let mut tuning = self.inner.tuning.lock().unwrap();
        tuning.fq = fq;
        drop(tuning);
        self.inner.dirty.store(true, Ordering::Release);
        Ok(())
    }

    pub fn set_gain(&mut self, gain: f32) -> Result<(), DeviceError> {
        if !(MIN_GAIN..=MAX_GAIN).contains(&gain) {
            return Err(DeviceError::InvalidGain);
        }
        let (lna, mix, vga) = composite_gain_to_indices(gain);
        info!("gain {gain} dB -> lna {lna}, mix {mix}, vga {vga}");
        let mut tuning = self.inner.tuning.lock().unwrap();
        tuning.lna = lna;
        tuning.mix = mix;
        tuning.vga = vga;
        drop(tuning);
        self.inner.dirty.store(true, Ordering::Release);
        Ok(())
    }

    pub fn set_lna_gain(&mut self, idx: u8) -> Result<(), DeviceError> {
        if idx > 15 {
            return Err(DeviceError::InvalidGain);
        }
        self.inner.tuning.lock().unwrap().lna = idx;
        self.inner.dirty.store(true, Ordering::Release);
        Ok(())
    }

    pub fn set_mix_gain(&mut self, idx: u8) -> Result<(), DeviceError> {
        if idx > 15 {
            return Err(DeviceError::InvalidGain);
        }
        self.inner.tuning.lock().unwrap().mix = idx;
        self.inner.dirty.store(true, Ordering::Release);
        Ok(())
    }

    pub fn set_vga_gain(&mut self, idx: u8) -> Result<(), DeviceError> {
        if idx > 15 {
            return Err(DeviceError::InvalidGain);
        }
        self.inner.tuning.lock().unwrap().vga = idx;
        self.inner.dirty.store(true, Ordering::Release);
        Ok(())
    }
}

impl Drop for RtlDev {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

fn apply_tuning(handle: rtlsdr::Handle, tuning: Tuning) -> Result<(), DeviceError> {
    if rtlsdr::set_center_freq(handle, tuning.fq) < 0 {
        return Err(DeviceError::ConfigFailed);
    }
    apply_gain(handle, tuning)
}

fn apply_gain(handle: rtlsdr::Handle, tuning: Tuning) -> Result<(), DeviceError> {
    match rtlsdr::set_tuner_gain_ext(handle, tuning.lna, tuning.mix, tuning.vga) {
        Some(ret) if ret >= 0 => Ok(()),
        Some(_) => Err(DeviceError::ConfigFailed),
        None => {
            // Stock librtlsdr without the extended tuner API: fall back to
            // the nearest composite gain.
            let tenth_db =
                (indices_to_gain_db(tuning.lna, tuning.mix, tuning.vga) * 10.0).round() as i32;
            if rtlsdr::set_tuner_gain(handle, tenth_db) < 0 {
                Err(DeviceError::ConfigFailed)
            } else {
                Ok(())
            }
        }
    }
}

fn open_and_configure(
    serial: &str,
    rate: SampleRate,
    fq_corr: i32,
    inner: &Inner,
) -> Result<rtlsdr::Handle, DeviceError> {
    let index = if serial.is_empty() {
        0
    } else {
        rtlsdr::index_by_serial(serial).ok_or(DeviceError::NotFound)?
    };

    let handle = rtlsdr::open(index).ok_or(DeviceError::OpenFailed)?;

    let tuning = *inner.tuning.lock().unwrap();
    let result = (|| {
        apply_tuning(handle, tuning)?;
        if rtlsdr::set_freq_correction(handle, fq_corr) < 0 {
            return Err(DeviceError::ConfigFailed);
        }
        if rtlsdr::set_sample_rate(handle, rate.hz()) < 0 {
            return Err(DeviceError::ConfigFailed);
        }
        Ok(())
    })();

    if let Err(err) = result {
        rtlsdr::close(handle);
        return Err(err);
    }

    Ok(handle)
}

struct CbCtx<'a> {
    inner: &'a Inner,
    handle: rtlsdr::Handle,
    iq_buf: &'a mut [IqSample],
    data_fn: &'a mut DataFn,
    rate: SampleRate,
}

/// librtlsdr transfer callback, invoked on the vendor USB thread. The
/// context pointer is cast straight back to the typed state owned by the
/// worker's stack frame.
unsafe extern "C" fn rtl_data_cb(buf: *mut u8, len: u32, ctx: *mut c_void) {
    let ctx = &mut *(ctx as *mut CbCtx);

    // Stop is requested from the control thread but acted on here.
    if !ctx.inner.run.load(Ordering::Acquire) {
        rtlsdr::cancel_async(ctx.handle);
        return;
    }

    if ctx.inner.dirty.swap(false, Ordering::AcqRel) {
        let tuning = *ctx.inner.tuning.lock().unwrap();
        if apply_tuning(ctx.handle, tuning).is_err() {
            warn!("retune failed; keeping previous device settings");
        }
    }

    let bytes = std::slice::from_raw_parts(buf as *const u8, len as usize);
    let n = (bytes.len() / 2).min(ctx.iq_buf.len());

    // Unpack 8-bit IQ into floats in [-1, 1].
    for (iq, pair) in ctx.iq_buf[..n].iter_mut().zip(bytes.chunks_exact(2)) {
        *iq = IqSample::new(
            (pair[0] as f32 - 127.5) / 127.5,
            (pair[1] as f32 - 127.5) / 127.5,
        );
    }

    let block = &ctx.iq_buf[..n];
    let block_info = BlockInfo {
        stream_state: StreamState::Streaming,
        rate: ctx.rate,
        pwr_dbfs: block_power_dbfs(block),
        ts: SystemTime::now(),
    };
    (ctx.data_fn)(block, &block_info);
}

fn worker(inner: Arc<Inner>, serial: String, rate: SampleRate, fq_corr: i32, mut data_fn: DataFn) {
    // One USB transfer carries exactly one 32 ms block: 512 bytes per
    // 16 kS/s of sample rate, times two for the interleaved I/Q bytes.
    let transfer_bytes = 512 * (rate.hz() / 16_000) * 2;
    let mut iq_buf = vec![IqSample::new(0.0, 0.0); rate.block_size()];

    while inner.run.load(Ordering::Acquire) {
        match open_and_configure(&serial, rate, fq_corr, &inner) {
            Ok(handle) => {
                info!("device {serial} opened");
                rtlsdr::reset_buffer(handle);
                inner.state.store(DeviceState::Running);

                {
                    let mut ctx = CbCtx {
                        inner: &inner,
                        handle,
                        iq_buf: &mut iq_buf,
                        data_fn: &mut data_fn,
                        rate,
                    };
                    unsafe {
                        rtlsdr::read_async(
                            handle,
                            rtl_data_cb,
                            &mut ctx as *mut CbCtx as *mut c_void,
                            NUM_TRANSFERS,
                            transfer_bytes,
                        );
                    }
                }

                rtlsdr::close(handle);

                // Tell the subscriber the stream is gone.
                let block_info = BlockInfo {
                    stream_state: StreamState::Idle,
                    rate,
                    pwr_dbfs: f32::NEG_INFINITY,
                    ts: SystemTime::now(),
                };
                (data_fn)(&[], &block_info);

                if inner.run.load(Ordering::Acquire) {
                    warn!("device {serial} disappeared, trying to reopen");
                    inner.state.store(DeviceState::Restarting);
                    std::thread::sleep(RETRY_DELAY);
                    inner.state.store(DeviceState::Starting);
                }
            }
            Err(err) => {
                warn!("unable to open device {serial}: {err}");
                std::thread::sleep(RETRY_DELAY);
            }
        }
    }

    inner.state.store(DeviceState::Idle);
}

pub(super) fn rate_supported(rate: SampleRate) -> bool {
    SUPPORTED_RATES.contains(&rate)
}

pub(super) fn is_present(serial: &str) -> bool {
    for index in 0..rtlsdr::device_count() {
        if let Some((_, _, dev_serial)) = rtlsdr::usb_strings(index) {
            if dev_serial == serial {
                return true;
            }
        }
    }
    false
}

pub(super) fn list() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for index in 0..rtlsdr::device_count() {
        let Some((manufacturer, product, serial)) = rtlsdr::usb_strings(index) else {
            break;
        };

        let mut info = DeviceInfo {
            device_type: DeviceType::Rtl,
            index,
            serial,
            available: false,
            supported: false,
            description: format!("{manufacturer} {product}"),
            sample_rates: Vec::new(),
            default_sample_rate: DEFAULT_SAMPLE_RATE,
        };

        // The tuner model and crystal can only be checked with the device
        // open; a busy device stays listed as "in use".
        if let Some(handle) = rtlsdr::open(index) {
            info.available = true;

            let (rtl_clk, _tuner_clk) = rtlsdr::xtal_freq(handle);
            if rtlsdr::tuner_type(handle) == rtlsdr::TUNER_R820T && rtl_clk == 28_800_000 {
                info.supported = true;
                info.sample_rates = SUPPORTED_RATES.to_vec();
            }

            rtlsdr::close(handle);
        }

        devices.push(info);
    }

    devices
}
