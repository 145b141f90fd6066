// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Supported IQ sample rates.
//!
//! The menu is the intersection of what RTL dongles and Airspy devices can
//! produce and what the downsampling chains in [`crate::filters`] can take
//! down to 16 kS/s. 2.5 and 3 MS/s are native Airspy rates that have no
//! decimation chain yet and are rejected at startup.

use std::fmt;
use std::str::FromStr;

/// Closed enumeration of sample rates known to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SampleRate {
    /// 0.96 MS/s, RTL, M = 60
    Fs0960,
    /// 1.2 MS/s, RTL, M = 75
    Fs1200,
    /// 1.44 MS/s, RTL, M = 90
    Fs1440,
    /// 1.6 MS/s, RTL, M = 100
    Fs1600,
    /// 1.92 MS/s, RTL, M = 120
    Fs1920,
    /// 2.4 MS/s, RTL, M = 150
    Fs2400,
    /// 2.5 MS/s, Airspy R2 native (no decimation chain)
    Fs2500,
    /// 2.56 MS/s, RTL, M = 160
    Fs2560,
    /// 3.0 MS/s, Airspy Mini native (no decimation chain)
    Fs3000,
    /// 6.0 MS/s, Airspy Mini (and R2 alternative), M = 375
    Fs6000,
    /// 10.0 MS/s, Airspy R2 (and Mini alternative), M = 625
    Fs10000,
    #[default]
    Unspecified,
}

impl SampleRate {
    /// Sample rate in Hz, or 0 for [`SampleRate::Unspecified`].
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Fs0960 => 960_000,
            SampleRate::Fs1200 => 1_200_000,
            SampleRate::Fs1440 => 1_440_000,
            SampleRate::Fs1600 => 1_600_000,
            SampleRate::Fs1920 => 1_920_000,
            SampleRate::Fs2400 => 2_400_000,
            SampleRate::Fs2500 => 2_500_000,
            SampleRate::Fs2560 => 2_560_000,
            SampleRate::Fs3000 => 3_000_000,
            SampleRate::Fs6000 => 6_000_000,
            SampleRate::Fs10000 => 10_000_000,
            SampleRate::Unspecified => 0,
        }
    }

    /// Reverse of [`SampleRate::hz`].
    pub fn from_hz(hz: u32) -> Self {
        match hz {
            960_000 => SampleRate::Fs0960,
            1_200_000 => SampleRate::Fs1200,
            1_440_000 => SampleRate::Fs1440,
            1_600_000 => SampleRate::Fs1600,
            1_920_000 => SampleRate::Fs1920,
            2_400_000 => SampleRate::Fs2400,
            2_500_000 => SampleRate::Fs2500,
            2_560_000 => SampleRate::Fs2560,
            3_000_000 => SampleRate::Fs3000,
            6_000_000 => SampleRate::Fs6000,
            10_000_000 => SampleRate::Fs10000,
            _ => SampleRate::Unspecified,
        }
    }

    /// Number of complex samples in one 32 ms block (the 31.25 Hz cadence).
    pub fn block_size(self) -> usize {
        (self.hz() as usize) * 4 / 125
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SampleRate::Fs0960 => "0.96",
            SampleRate::Fs1200 => "1.2",
            SampleRate::Fs1440 => "1.44",
            SampleRate::Fs1600 => "1.6",
            SampleRate::Fs1920 => "1.92",
            SampleRate::Fs2400 => "2.4",
            SampleRate::Fs2500 => "2.5",
            SampleRate::Fs2560 => "2.56",
            SampleRate::Fs3000 => "3",
            SampleRate::Fs6000 => "6",
            SampleRate::Fs10000 => "10",
            SampleRate::Unspecified => "Unspecified",
        };
        f.write_str(s)
    }
}

impl FromStr for SampleRate {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0.96" => Ok(SampleRate::Fs0960),
            "1.2" => Ok(SampleRate::Fs1200),
            "1.44" => Ok(SampleRate::Fs1440),
            "1.6" => Ok(SampleRate::Fs1600),
            "1.92" => Ok(SampleRate::Fs1920),
            "2.4" => Ok(SampleRate::Fs2400),
            "2.5" => Ok(SampleRate::Fs2500),
            "2.56" => Ok(SampleRate::Fs2560),
            "3" => Ok(SampleRate::Fs3000),
            "6" => Ok(SampleRate::Fs6000),
            "10" => Ok(SampleRate::Fs10000),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SampleRate; 11] = [
        SampleRate::Fs0960,
        SampleRate::Fs1200,
        SampleRate::Fs1440,
        SampleRate::Fs1600,
        SampleRate::Fs1920,
        SampleRate::Fs2400,
        SampleRate::Fs2500,
        SampleRate::Fs2560,
        SampleRate::Fs3000,
        SampleRate::Fs6000,
        SampleRate::Fs10000,
    ];

    #[test]
    fn hz_round_trips() {
        for rate in ALL {
            assert_eq!(SampleRate::from_hz(rate.hz()), rate);
        }
        assert_eq!(SampleRate::from_hz(12345), SampleRate::Unspecified);
    }

    #[test]
    fn str_round_trips() {
        for rate in ALL {
            assert_eq!(rate.to_string().parse::<SampleRate>(), Ok(rate));
        }
        assert!("1.5".parse::<SampleRate>().is_err());
    }

    #[test]
    fn block_size_is_32ms() {
        assert_eq!(SampleRate::Fs1200.block_size(), 38_400);
        assert_eq!(SampleRate::Fs10000.block_size(), 320_000);
        // 512 channel samples after decimation to 16 kS/s
        for rate in ALL {
            if rate.hz() % 16_000 == 0 {
                let m = rate.hz() as usize / 16_000;
                assert_eq!(rate.block_size() / m, 512);
            }
        }
    }
}
