// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Aeronautical channel arithmetic.
//!
//! Channels are named with the 6-digit `MMM.fff` notation in which the last
//! two fractional digits identify the channel inside its 100 kHz band for
//! both the 25 kHz and the 8.33 kHz grids, e.g. `118.275` and `118.280` are
//! the same 118.275 MHz carrier. Internally everything is handled in
//! 8.33 kHz steps relative to the tuner center.

use std::f64::consts::TAU;

use crate::filters::StagePlan;
use crate::rates::SampleRate;
use crate::IqSample;

/// Squelch state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlState {
    #[default]
    Closed,
    Open,
}

/// Static description of one configured channel, shared by the producer and
/// consumer sides; all per-thread DSP state is built from this.
#[derive(Debug, Clone)]
pub struct ChannelPlan {
    /// Channel name, e.g. "118.105".
    pub name: String,
    /// Carrier frequency in Hz.
    pub fq: u32,
    /// Offset from the tuner center in 8.33 kHz steps.
    pub offset: i32,
    /// Stereo pan position, -2 (left) .. 2 (right).
    pub pos: i32,
    /// Squelch level in dB over the channel noise floor.
    pub sql_level: f32,
}

/// Sub-channel lookup: last two digits of the fractional part to Hz within
/// the 100 kHz band. Each pair is unique across both channel grids.
const SUB_CH_HZ: [(&str, u32); 16] = [
    ("00", 0),
    ("05", 0),
    ("10", 8_333),
    ("15", 16_667),
    ("25", 25_000),
    ("30", 25_000),
    ("35", 33_333),
    ("40", 41_667),
    ("50", 50_000),
    ("55", 50_000),
    ("60", 58_333),
    ("65", 66_667),
    ("75", 75_000),
    ("80", 75_000),
    ("85", 83_333),
    ("90", 91_667),
];

/// Same lookup in 8.33 kHz steps.
const SUB_CH_STEP: [(&str, i32); 16] = [
    ("00", 0),
    ("05", 0),
    ("10", 1),
    ("15", 2),
    ("25", 3),
    ("30", 3),
    ("35", 4),
    ("40", 5),
    ("50", 6),
    ("55", 6),
    ("60", 7),
    ("65", 8),
    ("75", 9),
    ("80", 9),
    ("85", 10),
    ("90", 11),
];

/// Parse a frequency in MHz with `.` as decimal separator into Hz. With
/// `aeronautical` set the fractional part must be a valid 3-digit channel
/// number. Returns 0 for anything invalid.
pub fn parse_fq(s: &str, aeronautical: bool) -> u32 {
    let Some((int_str, frac_str)) = s.split_once('.') else {
        return 0;
    };

    if !int_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
        || int_str.len() < 2
        || int_str.len() > 4
        || frac_str.is_empty()
        || frac_str.len() > 6
    {
        return 0;
    }

    if aeronautical && frac_str.len() != 3 {
        return 0;
    }

    let mhz: u32 = int_str.parse().unwrap_or(0);
    if mhz >= 4000 {
        return 0;
    }

    let hz = if aeronautical {
        let sub = &frac_str[1..];
        let Some(&(_, sub_hz)) = SUB_CH_HZ.iter().find(|(code, _)| *code == sub) else {
            return 0;
        };
        (frac_str.as_bytes()[0] - b'0') as u32 * 100_000 + sub_hz
    } else {
        frac_str
            .bytes()
            .zip([100_000u32, 10_000, 1_000, 100, 10, 1])
            .map(|(digit, mult)| (digit - b'0') as u32 * mult)
            .sum()
    };

    mhz * 1_000_000 + hz
}

/// Number of 8.33 kHz steps between an aeronautical channel and the tuner
/// center frequency. Returns `None` for an invalid channel number.
pub fn channel_to_offset(channel: &str, tuner_fq: u32) -> Option<i32> {
    let (int_str, frac_str) = channel.split_once('.')?;
    if frac_str.len() != 3 {
        return None;
    }

    let sub = &frac_str[1..];
    let &(_, sub_steps) = SUB_CH_STEP.iter().find(|(code, _)| *code == sub)?;

    let mhz: i64 = int_str.parse().ok()?;
    let fq_base = mhz * 1_000_000 + (frac_str.as_bytes()[0] - b'0') as i64 * 100_000;
    let fq_diff = fq_base - tuner_fq as i64;

    // Whole 100 kHz bands are 12 steps each; the sub-channel adds 0..11.
    Some((fq_diff / 100_000) as i32 * 12 + sub_steps)
}

/// Stereo position for channel `index` of `count` channels in frequency
/// order: a contiguous symmetric subset of the five pan positions, low
/// frequencies to the left.
pub fn audio_position(index: usize, count: usize) -> i32 {
    const NUM_POSITIONS: usize = 5;

    if index >= count {
        return 0;
    }

    let half = count / 2;
    let odd = count % 2 == 1;

    if index < half {
        (index * NUM_POSITIONS / count) as i32 - (NUM_POSITIONS / 2) as i32
    } else if index == half && odd {
        0
    } else {
        (NUM_POSITIONS / 2) as i32 - ((count - 1 - index) * NUM_POSITIONS / count) as i32
    }
}

/// Pan weights (left, right) for a position.
pub fn pan_weights(pos: i32) -> (f32, f32) {
    match pos {
        -2 => (0.8, 0.2),
        -1 => (0.6, 0.4),
        1 => (0.4, 0.6),
        2 => (0.2, 0.8),
        _ => (0.5, 0.5),
    }
}

/// Tuner center for a set of channels: the midpoint between the lowest and
/// highest carrier, truncated to 100 kHz.
pub fn tuner_center(channel_fqs: &[u32]) -> u32 {
    let lo = channel_fqs.iter().copied().min().unwrap_or(0);
    let hi = channel_fqs.iter().copied().max().unwrap_or(0);
    let mid = lo + (hi - lo) / 2;
    mid / 100_000 * 100_000
}

/// Check that every channel fits inside 80 % of the sampled bandwidth
/// around the tuner center.
pub fn verify_requested_bandwidth(channel_fqs: &[u32], tuner_fq: u32, rate: SampleRate) -> bool {
    let max_offset = rate.hz() * 8 / 20;

    channel_fqs.iter().all(|&fq| {
        fq >= tuner_fq.saturating_sub(max_offset) && fq <= tuner_fq + max_offset
    })
}

/// Build the translator sequence for a channel offset, or an empty vector
/// for a channel sitting exactly at the tuner center.
///
/// The sequence is the complex exponential for `offset * z` 8.33 kHz steps
/// over the plan's cycle length, stored at half amplitude; the translating
/// first stage doubles its coefficient sets to compensate.
pub fn build_translator(plan: &StagePlan, offset: i32) -> Vec<IqSample> {
    if offset == 0 {
        return Vec::new();
    }

    let n = plan.n as f64;
    (0..plan.n)
        .map(|i| {
            let phase = -TAU * i as f64 * offset as f64 * plan.z as f64 / n;
            IqSample::new(
                (0.5 * phase.cos()) as f32,
                (0.5 * phase.sin()) as f32,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_channel_grids() {
        // 25 kHz grid name and its 8.33 kHz twin mean the same carrier.
        assert_eq!(parse_fq("118.275", true), 118_275_000);
        assert_eq!(parse_fq("118.280", true), 118_275_000);
        assert_eq!(parse_fq("118.105", true), 118_100_000);
        assert_eq!(parse_fq("118.110", true), 118_108_333);
    }

    #[test]
    fn rejects_malformed_channels() {
        assert_eq!(parse_fq("118", true), 0);
        assert_eq!(parse_fq("118.1", true), 0);
        assert_eq!(parse_fq("118.1234", true), 0);
        assert_eq!(parse_fq("118.1a5", true), 0);
        assert_eq!(parse_fq("118.120", true), 0); // no such sub-channel
        assert_eq!(parse_fq("5000.105", true), 0);
    }

    #[test]
    fn plain_frequency_mode() {
        assert_eq!(parse_fq("118.1", false), 118_100_000);
        assert_eq!(parse_fq("118.123456", false), 118_123_456);
        assert_eq!(parse_fq("28.5", false), 28_500_000);
    }

    #[test]
    fn offsets_follow_the_833_grid() {
        // "05" maps to sub-step 0 and each 100 kHz band is 12 steps.
        assert_eq!(channel_to_offset("118.105", 118_000_000), Some(12));
        assert_eq!(channel_to_offset("118.110", 118_000_000), Some(13));
        assert_eq!(channel_to_offset("118.105", 118_200_000), Some(-12));
        assert_eq!(channel_to_offset("118.110", 118_200_000), Some(-11));
        assert_eq!(channel_to_offset("118.305", 118_200_000), Some(12));
        assert_eq!(channel_to_offset("118.000", 118_000_000), Some(0));
        assert_eq!(channel_to_offset("118.xyz", 118_000_000), None);
    }

    #[test]
    fn tuner_center_truncates_to_100khz() {
        // S2: 118.000 and 119.000 put the tuner at 118.5 MHz.
        assert_eq!(tuner_center(&[118_000_000, 119_000_000]), 118_500_000);
        assert_eq!(tuner_center(&[118_100_000, 118_305_000]), 118_200_000);
    }

    #[test]
    fn bandwidth_check_uses_80_percent_of_rate() {
        // S2: both channels inside +/- 960 kHz at 2.4 MS/s.
        let fqs = [118_000_000, 119_000_000];
        let center = tuner_center(&fqs);
        assert!(verify_requested_bandwidth(&fqs, center, SampleRate::Fs2400));

        // S3: 118.1 and 119.0 do not fit +/- 576 kHz at 1.44 MS/s.
        let fqs = [118_100_000, 119_000_000];
        let center = tuner_center(&fqs);
        assert!(!verify_requested_bandwidth(&fqs, center, SampleRate::Fs1440));
    }

    #[test]
    fn positions_are_symmetric_and_contiguous() {
        for count in 1..=9 {
            let positions: Vec<i32> = (0..count).map(|i| audio_position(i, count)).collect();
            // Mirror symmetry around the middle.
            for i in 0..count {
                assert_eq!(
                    positions[i],
                    -positions[count - 1 - i],
                    "count {count}: {positions:?}"
                );
            }
            // Non-decreasing left to right, within the pan range.
            for w in positions.windows(2) {
                assert!(w[0] <= w[1], "count {count}: {positions:?}");
            }
            assert!(positions.iter().all(|p| (-2..=2).contains(p)));
        }

        assert_eq!(audio_position(0, 1), 0);
        assert_eq!(audio_position(0, 2), -2);
        assert_eq!(audio_position(1, 2), 2);
        assert_eq!(audio_position(1, 3), 0);
    }

    #[test]
    fn translator_covers_full_cycles() {
        let plan = crate::filters::stage_plan(SampleRate::Fs1200).unwrap();
        let translator = build_translator(&plan, -11);
        assert_eq!(translator.len(), 144);
        // Half amplitude everywhere.
        for t in &translator {
            assert!((t.norm() - 0.5).abs() < 1e-6);
        }
        // Zero offset needs no translator.
        assert!(build_translator(&plan, 0).is_empty());
    }
}
