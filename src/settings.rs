// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Receiver-wide settings, immutable once startup validation has passed.

use std::fmt;
use std::str::FromStr;

use crate::device::DeviceType;
use crate::rates::SampleRate;

/// Demodulation mode. FM support is experimental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modulation {
    #[default]
    Am,
    Fm,
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modulation::Am => "AM",
            Modulation::Fm => "FM",
        })
    }
}

impl FromStr for Modulation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AM" => Ok(Modulation::Am),
            "FM" => Ok(Modulation::Fm),
            _ => Err(()),
        }
    }
}

/// How the RF gain was given on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainMode {
    /// One composite dB figure, mapped onto LNA/MIX indices greedily.
    Composite(f32),
    /// Explicit LNA:MIX:VGA register indices, 0..=15 each.
    Split { lna: u8, mix: u8, vga: u8 },
}

impl Default for GainMode {
    fn default() -> Self {
        GainMode::Composite(30.0)
    }
}

/// Global settings assembled from the command line, read-only after startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub device_type: DeviceType,
    pub device_serial: String,
    pub rate: SampleRate,
    /// Frequency correction in ppm, RTL dongles only.
    pub fq_corr: i32,
    /// Tuner center frequency in Hz.
    pub tuner_fq: u32,
    /// Squelch level in dB over the per-channel noise floor.
    pub sql_level: f32,
    /// Channel names in command-line order, duplicates removed.
    pub channels: Vec<String>,
    /// ALSA playback device.
    pub audio_device: String,
    /// Audio volume in dB applied to the post-mix filter.
    pub lf_gain: f32,
    pub gain: GainMode,
    pub modulation: Modulation,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            device_type: DeviceType::Unknown,
            device_serial: String::new(),
            rate: SampleRate::Unspecified,
            fq_corr: 0,
            tuner_fq: 0,
            sql_level: 9.0,
            channels: Vec::new(),
            audio_device: "default".to_string(),
            lf_gain: 0.0,
            gain: GainMode::default(),
            modulation: Modulation::Am,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulation_parses() {
        assert_eq!("AM".parse::<Modulation>(), Ok(Modulation::Am));
        assert_eq!("FM".parse::<Modulation>(), Ok(Modulation::Fm));
        assert!("SSB".parse::<Modulation>().is_err());
    }
}
