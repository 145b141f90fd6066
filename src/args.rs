// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Command line surface.

use clap::Parser;

use airrx::rates::SampleRate;
use airrx::settings::{GainMode, Modulation, Settings};
use airrx::DynResult;

const LONG_ABOUT: &str = "\
airrx is a software defined narrowband AM receiver using a R820T(2)/R860 based \
RTL-SDR or Airspy Mini/R2 dongle as its hardware backend. It is mainly designed \
for use in the 118 to 138 MHz airband. The channels to listen to are given as \
arguments in the standard six digit aeronautical notation. Both the legacy 25 kHz \
channel separation and the newer 8.33 kHz channel separation notations are \
supported, i.e. 118.275 and 118.280 both mean the frequency 118.275 MHz.

If multiple channels are given, they must all fit within a bandwidth of 80% of \
the sampling frequency.

The squelch is adaptive with respect to the current per-channel noise floor and \
the squelch level is given as a SNR value in dB. Audio is played using ALSA.

Examples:

List available devices:

    $ airrx --list

Listen to the channel 122.450 with 40 dB of RF gain and +3 dB volume:

    $ airrx --device MY-DEVICE --gain 40 --volume 3 122.450

Listen to 118.105 and 118.505 with 34 dB of RF gain, 5 dB squelch and a sample \
rate of 1.2 MS/s:

    $ airrx --gain 34 --sql-level 5 --sample-rate 1.2 118.105 118.505";

#[derive(Debug, Parser)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = concat!(env!("CARGO_PKG_NAME"), " - ", env!("CARGO_PKG_DESCRIPTION")),
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// List available devices and their sample rates, then quit
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Serial of the device to use. Defaults to the first available device
    #[arg(short = 'd', long = "device", value_name = "SERIAL")]
    pub device: Option<String>,

    /// Frequency correction in ppm for RTL dongles
    #[arg(short = 'c', long = "fq-corr", value_name = "FQCORR", default_value_t = 0)]
    pub fq_corr: i32,

    /// RF gain in dB (0 to 49) or as LNA:MIX:VGA indices (0 to 15 each)
    #[arg(short = 'g', long = "gain", value_name = "RFGAIN")]
    pub gain: Option<String>,

    /// Audio volume (+/-) in dB relative to the system level
    #[arg(short = 'v', long = "volume", value_name = "VOLUME", default_value_t = 0.0)]
    pub volume: f32,

    /// Squelch level in dB over the current channel noise floor
    #[arg(short = 's', long = "sql-level", value_name = "SQLLEVEL", default_value_t = 9.0)]
    pub sql_level: f32,

    /// ALSA playback device
    #[arg(long = "audio-dev", value_name = "AUDIODEV", default_value = "default")]
    pub audio_dev: String,

    /// Sample rate in MS/s. Defaults to 1.44 (RTL) or 6 (Airspy). Use --list
    /// to see the valid rates per device
    #[arg(long = "sample-rate", value_name = "RATE")]
    pub sample_rate: Option<String>,

    /// Modulation, AM or FM. FM is experimental
    #[arg(long = "modulation", value_name = "MOD", default_value = "AM")]
    pub modulation: String,

    /// Channels in 6-digit aeronautical notation, e.g. 118.105
    #[arg(value_name = "CHANNEL", required_unless_present = "list")]
    pub channels: Vec<String>,
}

/// Parse a `--gain` argument: either `LNA:MIX:VGA` indices or one composite
/// dB figure.
fn parse_gain(s: &str) -> Result<GainMode, String> {
    if s.contains(':') {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(format!("invalid gain indexes given: {s}"));
        }
        let idx = |p: &str| -> Result<u8, String> {
            match p.parse::<u8>() {
                Ok(v) if v <= 15 => Ok(v),
                _ => Err(format!("invalid gain indexes given: {s}")),
            }
        };
        Ok(GainMode::Split {
            lna: idx(parts[0])?,
            mix: idx(parts[1])?,
            vga: idx(parts[2])?,
        })
    } else {
        let gain: f32 = s.parse().map_err(|_| format!("invalid RF gain given: {s}"))?;
        if !(0.0..=50.0).contains(&gain) {
            return Err(format!("invalid RF gain given: {gain:.4}"));
        }
        Ok(GainMode::Composite(gain))
    }
}

/// Validate the parsed command line into the immutable [`Settings`]. Device
/// resolution (serial and default sample rate) happens later against the
/// hardware actually present.
pub fn into_settings(cli: &Cli) -> DynResult<Settings> {
    let mut settings = Settings {
        fq_corr: cli.fq_corr,
        lf_gain: cli.volume,
        sql_level: cli.sql_level,
        audio_device: cli.audio_dev.clone(),
        ..Settings::default()
    };

    if let Some(ref device) = cli.device {
        settings.device_serial = device.clone();
    }

    if let Some(ref rate_str) = cli.sample_rate {
        settings.rate = rate_str
            .parse::<SampleRate>()
            .map_err(|_| format!("invalid sample rate given: {rate_str}"))?;
    }

    settings.modulation = cli
        .modulation
        .parse::<Modulation>()
        .map_err(|_| "invalid modulation given".to_string())?;

    if let Some(ref gain) = cli.gain {
        settings.gain = parse_gain(gain)?;
    }

    if !(-10.0..=50.0).contains(&settings.sql_level) {
        return Err(format!("invalid SQL level given: {:.4}", settings.sql_level).into());
    }

    // Keep command line order but drop duplicates.
    for channel in &cli.channels {
        if !settings.channels.contains(channel) {
            settings.channels.push(channel.clone());
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_modes_parse() {
        assert_eq!(parse_gain("30"), Ok(GainMode::Composite(30.0)));
        assert_eq!(
            parse_gain("9:8:12"),
            Ok(GainMode::Split {
                lna: 9,
                mix: 8,
                vga: 12
            })
        );
        assert!(parse_gain("16:0:0").is_err());
        assert!(parse_gain("60").is_err());
        assert!(parse_gain("1:2").is_err());
    }

    #[test]
    fn settings_from_cli_dedupes_channels() {
        let cli = Cli::parse_from([
            "airrx",
            "--sample-rate",
            "1.2",
            "118.105",
            "118.305",
            "118.105",
        ]);
        let settings = into_settings(&cli).unwrap();
        assert_eq!(settings.channels, vec!["118.105", "118.305"]);
        assert_eq!(settings.rate, SampleRate::Fs1200);
        assert_eq!(settings.sql_level, 9.0);
    }

    #[test]
    fn bad_values_are_rejected() {
        let cli = Cli::parse_from(["airrx", "--sample-rate", "1.5", "118.105"]);
        assert!(into_settings(&cli).is_err());

        let cli = Cli::parse_from(["airrx", "--modulation", "SSB", "118.105"]);
        assert!(into_settings(&cli).is_err());

        let cli = Cli::parse_from(["airrx", "--sql-level", "99", "118.105"]);
        assert!(into_settings(&cli).is_err());
    }
}
