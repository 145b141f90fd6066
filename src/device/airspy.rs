// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Airspy-class (12-bit) device worker.
//!
//! The vendor stream already delivers float IQ, but its callback payloads
//! are sized by USB timing, not by our 32 ms cadence. The callback therefore
//! concatenates payloads into a double buffer of two block halves and emits
//! whenever one half fills; the half not being written stays stable for the
//! subscriber while the next block assembles.

use std::ffi::{c_int, c_void};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use super::ffi::airspy;
use super::{
    block_power_dbfs, composite_gain_to_indices, AtomicState, BlockInfo, DataFn, DeviceError,
    DeviceInfo, DeviceState, DeviceType, StreamState, MAX_FQ, MAX_GAIN, MIN_FQ, MIN_GAIN,
};
use crate::rates::SampleRate;
use crate::IqSample;

const RETRY_DELAY: Duration = Duration::from_secs(1);

pub(super) const DEFAULT_SAMPLE_RATE: SampleRate = SampleRate::Fs6000;

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
    dirty: AtomicBool,
}

/// Device manager for one Airspy R2 or Mini.
pub struct AirspyDev {
    serial: String,
    rate: SampleRate,
    inner: Arc<Inner>,
    data_fn: Option<DataFn>,
    worker: Option<JoinHandle<()>>,
}

impl AirspyDev {
    pub fn new(serial: &str, rate: SampleRate) -> Self {
        AirspyDev {
            serial: serial.to_string(),
            rate,
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
        if self.rate.hz() * 4 % 125 != 0 {
            return Err(DeviceError::InvalidSampleRate);
        }
        if !rate_supported(&self.serial, self.rate) {
            return Err(DeviceError::InvalidSampleRate);
        }

        let data_fn = self.data_fn.take().unwrap_or_else(|| Box::new(|_, _| {}));

        self.inner.state.store(DeviceState::Starting);
        self.inner.run.store(true, Ordering::Release);

        let inner = self.inner.clone();
        let serial = self.serial.clone();
        let rate = self.rate;
        let handle = std::thread::Builder::new()
            .name("airspy-worker".to_string())
            .spawn(move || worker(inner, serial, rate, data_fn))
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
        self.inner.tuning.lock().unwrap().fq = fq;
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

impl Drop for AirspyDev {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

fn parse_serial(serial: &str) -> Result<u64, DeviceError> {
    if serial.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(serial, 16).map_err(|_| DeviceError::InvalidSerial)
}

fn apply_tuning(handle: airspy::Handle, tuning: Tuning) -> Result<(), DeviceError> {
    if airspy::set_freq(handle, tuning.fq) != airspy::AIRSPY_SUCCESS {
        return Err(DeviceError::ConfigFailed);
    }
    if airspy::set_lna_gain(handle, tuning.lna) != airspy::AIRSPY_SUCCESS
        || airspy::set_mixer_gain(handle, tuning.mix) != airspy::AIRSPY_SUCCESS
        || airspy::set_vga_gain(handle, tuning.vga) != airspy::AIRSPY_SUCCESS
    {
        return Err(DeviceError::ConfigFailed);
    }
    Ok(())
}

fn open_and_configure(
    serial: &str,
    rate: SampleRate,
    inner: &Inner,
) -> Result<airspy::Handle, DeviceError> {
    let serial_num = parse_serial(serial)?;
    let handle = airspy::open_sn(serial_num).ok_or(DeviceError::OpenFailed)?;

    let tuning = *inner.tuning.lock().unwrap();
    let result = (|| {
        if airspy::set_sample_type(handle, airspy::SAMPLE_FLOAT32_IQ) != airspy::AIRSPY_SUCCESS {
            return Err(DeviceError::ConfigFailed);
        }
        if airspy::set_packing(handle, true) != airspy::AIRSPY_SUCCESS {
            return Err(DeviceError::ConfigFailed);
        }
        if airspy::set_samplerate(handle, rate.hz()) != airspy::AIRSPY_SUCCESS {
            return Err(DeviceError::InvalidSampleRate);
        }
        apply_tuning(handle, tuning)
    })();

    if let Err(err) = result {
        airspy::close(handle);
        return Err(err);
    }

    Ok(handle)
}

struct CbCtx<'a> {
    inner: &'a Inner,
    data_fn: &'a mut DataFn,
    rate: SampleRate,
    /// Two block halves back to back.
    iq_buf: &'a mut [IqSample],
    block_size: usize,
    /// Start of the half currently being filled (0 or `block_size`).
    part_pos: usize,
    /// Fill level inside the current half.
    iq_pos: usize,
}

/// libairspy RX callback, invoked on the vendor USB thread.
unsafe extern "C" fn airspy_data_cb(transfer: *mut airspy::Transfer) -> c_int {
    let transfer = &mut *transfer;
    let ctx = &mut *(transfer.ctx as *mut CbCtx);

    if !ctx.inner.run.load(Ordering::Acquire) {
        // The worker thread notices and stops the stream.
        return 0;
    }

    if transfer.dropped_samples > 0 {
        warn!(
            "{} samples dropped, the system is probably overloaded",
            transfer.dropped_samples
        );
    }

    if ctx.inner.dirty.swap(false, Ordering::AcqRel) {
        let tuning = *ctx.inner.tuning.lock().unwrap();
        if apply_tuning(transfer.device, tuning).is_err() {
            warn!("retune failed; keeping previous device settings");
        }
    }

    let sample_count = transfer.sample_count.max(0) as usize;
    let data = std::slice::from_raw_parts(transfer.samples as *const f32, sample_count * 2);

    for pair in data.chunks_exact(2) {
        ctx.iq_buf[ctx.part_pos + ctx.iq_pos] = IqSample::new(pair[0], pair[1]);
        ctx.iq_pos += 1;

        if ctx.iq_pos == ctx.block_size {
            // One half is full: stamp it and hand it out, then flip halves.
            let block = &ctx.iq_buf[ctx.part_pos..ctx.part_pos + ctx.block_size];
            let block_info = BlockInfo {
                stream_state: StreamState::Streaming,
                rate: ctx.rate,
                pwr_dbfs: block_power_dbfs(block),
                ts: SystemTime::now(),
            };
            (ctx.data_fn)(block, &block_info);

            ctx.part_pos = if ctx.part_pos == 0 { ctx.block_size } else { 0 };
            ctx.iq_pos = 0;
        }
    }

    0
}

fn worker(inner: Arc<Inner>, serial: String, rate: SampleRate, mut data_fn: DataFn) {
    let block_size = rate.block_size();
    let mut iq_buf = vec![IqSample::new(0.0, 0.0); block_size * 2];

    while inner.run.load(Ordering::Acquire) {
        match open_and_configure(&serial, rate, &inner) {
            Ok(handle) => {
                info!("device {serial} opened");

                let mut ctx = CbCtx {
                    inner: &inner,
                    data_fn: &mut data_fn,
                    rate,
                    iq_buf: &mut iq_buf,
                    block_size,
                    part_pos: 0,
                    iq_pos: 0,
                };
                let ret = unsafe {
                    airspy::start_rx(handle, airspy_data_cb, &mut ctx as *mut CbCtx as *mut c_void)
                };

                if ret == airspy::AIRSPY_SUCCESS {
                    inner.state.store(DeviceState::Running);
                    while inner.run.load(Ordering::Acquire) && airspy::is_streaming(handle) {
                        std::thread::sleep(Duration::from_millis(100));
                    }
                    airspy::stop_rx(handle);
                    drop(ctx);

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
                    }
                }

                airspy::close(handle);
                if inner.run.load(Ordering::Acquire) {
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

/// Native rates plus the firmware-specific alternates, from an open handle.
fn rates_of(handle: airspy::Handle, description: &str) -> Vec<SampleRate> {
    let mut rates: Vec<SampleRate> = airspy::samplerates(handle)
        .into_iter()
        .map(SampleRate::from_hz)
        .filter(|r| *r != SampleRate::Unspecified)
        .collect();

    if !rates.is_empty() {
        if description.starts_with("AirSpy MINI") {
            // The Mini takes 10 MS/s as an alternative rate.
            rates.push(SampleRate::Fs10000);
        }
        if description.starts_with("AirSpy NOS") {
            // The R2 takes 6 MS/s as an alternative rate.
            rates.push(SampleRate::Fs6000);
        }
        rates.sort();
        rates.dedup();
    }

    rates
}

pub(super) fn rate_supported(serial: &str, rate: SampleRate) -> bool {
    let Ok(serial_num) = parse_serial(serial) else {
        return false;
    };
    let Some(handle) = airspy::open_sn(serial_num) else {
        return false;
    };
    let description = airspy::version_string(handle);
    let supported = rates_of(handle, &description).contains(&rate);
    airspy::close(handle);
    supported
}

pub(super) fn is_present(serial: &str) -> bool {
    airspy::list_devices()
        .into_iter()
        .any(|s| format!("{s:016X}") == serial)
}

pub(super) fn list() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for (index, serial_num) in airspy::list_devices().into_iter().enumerate() {
        let mut info = DeviceInfo {
            device_type: DeviceType::Airspy,
            index: index as u32,
            serial: format!("{serial_num:016X}"),
            available: false,
            supported: false,
            description: String::new(),
            sample_rates: Vec::new(),
            default_sample_rate: DEFAULT_SAMPLE_RATE,
        };

        if let Some(handle) = airspy::open_sn(serial_num) {
            info.available = true;
            info.description = airspy::version_string(handle);
            info.sample_rates = rates_of(handle, &info.description);
            info.supported = !info.sample_rates.is_empty();
            airspy::close(handle);
        }

        devices.push(info);
    }

    devices
}
