// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Startup, validation and thread orchestration.
//!
//! main owns no signal processing: it resolves the device, builds the
//! channel plans and the ring buffer, wires the producer callback (device ->
//! channelizers -> ring) and the consumer thread (ring -> ALSA), then parks
//! until a termination signal flips the run flag.

mod args;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use airrx::channel::{
    build_translator, channel_to_offset, parse_fq, tuner_center, verify_requested_bandwidth,
    ChannelPlan,
};
use airrx::crb::chunked_ring;
use airrx::device::{BlockInfo, DeviceManager, DeviceType, StreamState};
use airrx::filters::stage_plan;
use airrx::msd::Msd;
use airrx::rates::SampleRate;
use airrx::settings::{GainMode, Settings};
use airrx::{audio, ChunkMeta, DynResult, IqSample, CH_IQ_BUF_SIZE};

/// Ring depth: 8 chunks of one period each, i.e. 256 ms of buffering.
const RING_CHUNKS: usize = 8;

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = args::Cli::parse();

    if cli.list {
        list_available_devices();
        return ExitCode::SUCCESS;
    }

    let settings = match args::into_settings(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {err}. Use --help to learn how to use airrx.");
            return ExitCode::FAILURE;
        }
    };

    match run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Fill in the device serial, family and default sample rate against the
/// hardware actually present.
fn resolve_device(settings: &mut Settings) -> DynResult<()> {
    if settings.device_serial.is_empty() {
        info!("searching for first available device");
        let Some(info) = DeviceManager::first_available() else {
            return Err("no device available".into());
        };
        info!("found device {} ({})", info.serial, info.device_type);
        settings.device_serial = info.serial;
        if settings.rate == SampleRate::Unspecified {
            settings.rate = info.default_sample_rate;
        }
    }

    settings.device_type = DeviceManager::type_of(&settings.device_serial);
    if settings.device_type == DeviceType::Unknown {
        return Err(format!("device {} is not available", settings.device_serial).into());
    }

    if settings.rate == SampleRate::Unspecified {
        settings.rate = match settings.device_type {
            DeviceType::Rtl => SampleRate::Fs1440,
            _ => SampleRate::Fs6000,
        };
    }

    if !DeviceManager::rate_supported(&settings.device_serial, settings.rate) {
        return Err(format!(
            "sample rate {} MS/s is not supported by device {}",
            settings.rate, settings.device_serial
        )
        .into());
    }

    Ok(())
}

/// Parse and validate the channel list into plans sorted by frequency, with
/// the tuner center already applied.
fn build_channel_plans(settings: &mut Settings) -> DynResult<Vec<ChannelPlan>> {
    let mut fqs = Vec::with_capacity(settings.channels.len());
    for name in &settings.channels {
        let fq = parse_fq(name, true);
        if fq == 0 {
            return Err(format!(
                "invalid channel given: {name}. Use --help to learn how to use airrx"
            )
            .into());
        }
        if !(45_000_000..=1_800_000_000).contains(&fq) {
            return Err(format!("invalid frequency given: {fq} Hz").into());
        }
        fqs.push(fq);
    }

    settings.tuner_fq = tuner_center(&fqs);

    if !verify_requested_bandwidth(&fqs, settings.tuner_fq, settings.rate) {
        let available_khz = settings.rate.hz() * 8 / 10 / 1000;
        return Err(format!(
            "requested channels do not fit inside the available bandwidth ({available_khz} kHz)"
        )
        .into());
    }

    // Low to high in frequency; the pan positions spread over that order.
    let mut plans: Vec<ChannelPlan> = settings
        .channels
        .iter()
        .zip(fqs.iter())
        .map(|(name, &fq)| ChannelPlan {
            name: name.clone(),
            fq,
            offset: 0,
            pos: 0,
            sql_level: settings.sql_level,
        })
        .collect();
    plans.sort_by_key(|p| p.fq);

    let count = plans.len();
    for (index, plan) in plans.iter_mut().enumerate() {
        plan.offset = channel_to_offset(&plan.name, settings.tuner_fq)
            .ok_or_else(|| format!("invalid channel given: {}", plan.name))?;
        plan.pos = airrx::channel::audio_position(index, count);
    }

    Ok(plans)
}

fn log_settings(settings: &Settings, plans: &[ChannelPlan]) {
    info!("using device {} ({})", settings.device_serial, settings.device_type);
    if settings.device_type == DeviceType::Rtl {
        info!("frequency correction: {} ppm", settings.fq_corr);
    }
    info!("sampling frequency: {} MS/s", settings.rate);
    match settings.gain {
        GainMode::Composite(gain) => info!("RF gain: {gain} dB"),
        GainMode::Split { lna, mix, vga } => info!("RF gain indexes: {lna}:{mix}:{vga}"),
    }
    info!("modulation: {}", settings.modulation);
    info!("volume: {} dB", settings.lf_gain);
    info!("squelch level: {} dB", settings.sql_level);
    info!("ALSA device: {}", settings.audio_device);
    info!("tuner center frequency: {} kHz", settings.tuner_fq / 1000);
    info!(
        "available bandwidth: +/- {} kHz relative to the center frequency",
        settings.rate.hz() * 8 / 20 / 1000
    );
    let channels: Vec<String> = plans
        .iter()
        .map(|p| format!("{}({})", p.name, p.pos))
        .collect();
    info!("channels: {}", channels.join(" "));
}

fn run(mut settings: Settings) -> DynResult<()> {
    resolve_device(&mut settings)?;
    let plans = build_channel_plans(&mut settings)?;

    let plan = stage_plan(settings.rate).ok_or_else(|| {
        format!(
            "sample rate {} MS/s is not supported yet (no downsampling chain)",
            settings.rate
        )
    })?;

    log_settings(&settings, &plans);

    // One channelizer per channel, all fed from the same wideband block on
    // the producer thread.
    let mut msds: Vec<Msd> = plans
        .iter()
        .map(|p| Msd::new(&build_translator(&plan, p.offset), &plan.stages))
        .collect();

    let (mut writer, reader) = chunked_ring::<IqSample, ChunkMeta>(
        CH_IQ_BUF_SIZE * plans.len(),
        RING_CHUNKS,
    );

    // Open the sound card before any thread starts so a bad audio device is
    // still a plain startup error.
    let mut output = audio::AudioOutput::new(&settings, &plans, &plan)?;

    let run = Arc::new(AtomicBool::new(true));

    // SIGINT/SIGTERM/SIGQUIT/SIGPIPE all mean "wind down".
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGQUIT,
        signal_hook::consts::SIGPIPE,
    ])?;
    {
        let run = run.clone();
        std::thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    info!("signal {signal} received, stopping");
                    run.store(false, Ordering::Release);
                }
            })?;
    }

    let mut device = DeviceManager::create(
        settings.device_type,
        &settings.device_serial,
        settings.rate,
        settings.fq_corr,
    )?;
    device.set_fq(settings.tuner_fq)?;
    match settings.gain {
        GainMode::Composite(gain) => device.set_gain(gain)?,
        GainMode::Split { lna, mix, vga } => {
            device.set_lna_gain(lna)?;
            device.set_mix_gain(mix)?;
            device.set_vga_gain(vga)?;
        }
    }

    // Producer: runs on the device worker thread at every 32 ms block.
    let mut streaming = false;
    device.set_data_fn(Box::new(move |samples: &[IqSample], info: &BlockInfo| {
        if info.stream_state == StreamState::Idle {
            streaming = false;
            writer.set_streaming(false);
            info!("device stopped streaming");
            return;
        }

        if let Some((chunk, meta)) = writer.acquire_write() {
            for (idx, msd) in msds.iter_mut().enumerate() {
                let slot = &mut chunk[idx * CH_IQ_BUF_SIZE..(idx + 1) * CH_IQ_BUF_SIZE];
                msd.decimate(samples, slot);
            }
            *meta = ChunkMeta {
                ts: info.ts,
                pwr_dbfs: info.pwr_dbfs,
            };
            if !writer.commit_write() {
                error!("unable to commit ring buffer write");
            }

            // Kicks in for the first block only.
            if !streaming {
                streaming = true;
                writer.set_streaming(true);
            }
        } else {
            warn!("ring buffer full, dropping one block of samples");
        }
    }));

    // Consumer: blocks on the sound card's period clock.
    let audio_run = run.clone();
    let audio_thread = std::thread::Builder::new()
        .name("audio".to_string())
        .spawn(move || output.run(reader, audio_run))?;

    let result = device.start().map_err(|err| {
        format!("unable to start device: {err}")
    });

    if result.is_ok() {
        while run.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_secs(1));
        }

        if let Err(err) = device.stop() {
            error!("unable to stop device: {err}");
        }
    }

    run.store(false, Ordering::Release);
    let _ = audio_thread.join();

    result?;
    info!("stopped");

    Ok(())
}

/// `--list`: one row per device with its family, state and rate menu.
fn list_available_devices() {
    println!("Searching for available devices...");
    let devices = DeviceManager::list();

    let hdr_serial = "Serial:";
    let hdr_type = "Type:";
    let hdr_state = "State:";
    let hdr_rate = "Sample rates (MS/s):";
    let hdr_desc = "Description:";

    let rate_string = |info: &airrx::device::DeviceInfo| -> String {
        if !(info.available && info.supported) {
            return String::new();
        }
        info.sample_rates
            .iter()
            // No downsampling chains for the native Airspy-only rates.
            .filter(|r| !matches!(r, SampleRate::Fs2500 | SampleRate::Fs3000))
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut serial_w = hdr_serial.len();
    let mut type_w = hdr_type.len();
    let mut state_w = hdr_state.len();
    let mut rate_w = hdr_rate.len();
    let mut desc_w = hdr_desc.len();

    for dev in &devices {
        serial_w = serial_w.max(dev.serial.len());
        type_w = type_w.max(dev.device_type.to_string().len());
        state_w = state_w.max(if dev.available { 9 } else { 6 });
        rate_w = rate_w.max(rate_string(dev).len());
        desc_w = desc_w.max(dev.description.len());
    }
    serial_w += 2;
    type_w += 2;
    state_w += 2;
    rate_w += 2;

    if !devices.is_empty() {
        println!(
            "{hdr_serial:<serial_w$}{hdr_type:<type_w$}{hdr_state:<state_w$}{hdr_rate:<rate_w$}{hdr_desc}"
        );
        println!("{}", "-".repeat(serial_w + type_w + state_w + rate_w + desc_w));
    }

    let mut seen_serials: Vec<&str> = Vec::new();
    let mut duplicate_serials = false;

    for dev in &devices {
        if seen_serials.contains(&dev.serial.as_str()) {
            duplicate_serials = true;
        } else {
            seen_serials.push(&dev.serial);
        }

        if dev.available {
            println!(
                "{:<serial_w$}{:<type_w$}{:<state_w$}{:<rate_w$}{}",
                dev.serial,
                dev.device_type.to_string(),
                "Available",
                rate_string(dev),
                dev.description
            );
        } else {
            println!(
                "{:<serial_w$}{:<type_w$}{}",
                dev.serial,
                dev.device_type.to_string(),
                "In use"
            );
        }
    }

    if duplicate_serials {
        println!(
            "Warning: Duplicate serials found. airrx may show inconsistent behaviour. \
             Please rename RTL dongles using rtl_eeprom -s NEW_SERIAL."
        );
    }
}
