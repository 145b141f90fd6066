// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Static FIR coefficient tables and the per-rate downsampling plans.
//!
//! One module per input sample rate. Each chain takes the wideband stream
//! down to the common 16 kS/s channel rate in small decimation steps; the
//! tables were designed as Blackman-Harris windowed sincs with the care band
//! at 0..10 kHz and enough stopband attenuation in every folding zone to
//! keep the stream's dynamic range growing by 10*log10(M) per stage.

pub mod fs_00016;
pub mod fs_00960;
pub mod fs_01200;
pub mod fs_01440;
pub mod fs_01600;
pub mod fs_01920;
pub mod fs_02400;
pub mod fs_02560;
pub mod fs_06000;
pub mod fs_10000;

use crate::msd::Stage;
use crate::rates::SampleRate;

/// Downsampling plan for one input rate: the translator cycle length `n`,
/// the channel step multiplier `z` and the ordered stage list.
///
/// The translator length follows `n = rate * z / 8333.33..` with `z` chosen
/// so that `n` is even and divides by the first stage factor; a channel
/// offset in 8.33 kHz steps must be scaled by `z` when the translator is
/// generated.
#[derive(Debug, Clone)]
pub struct StagePlan {
    pub n: usize,
    pub z: u32,
    pub stages: Vec<Stage>,
}

/// Look up the downsampling plan for `rate`. Returns `None` for rates
/// without a chain (2.5 and 3 MS/s, or [`SampleRate::Unspecified`]).
pub fn stage_plan(rate: SampleRate) -> Option<StagePlan> {
    let (n, z, stages) = match rate {
        SampleRate::Fs0960 => (
            576,
            5,
            vec![
                Stage { m: 3, coeffs: fs_00960::LPF1_00960_TO_00320 },
                Stage { m: 4, coeffs: fs_00960::LPF2_00320_TO_00080 },
                Stage { m: 5, coeffs: fs_00960::LPF3_00080_TO_00016 },
            ],
        ),
        SampleRate::Fs1200 => (
            144,
            1,
            vec![
                Stage { m: 3, coeffs: fs_01200::LPF1_01200_TO_00400 },
                Stage { m: 5, coeffs: fs_01200::LPF2_00400_TO_00080 },
                Stage { m: 5, coeffs: fs_01200::LPF3_00080_TO_00016 },
            ],
        ),
        SampleRate::Fs1440 => (
            1728,
            10,
            vec![
                Stage { m: 3, coeffs: fs_01440::LPF1_01440_TO_00480 },
                Stage { m: 6, coeffs: fs_01440::LPF2_00480_TO_00080 },
                Stage { m: 5, coeffs: fs_01440::LPF3_00080_TO_00016 },
            ],
        ),
        SampleRate::Fs1600 => (
            192,
            1,
            vec![
                Stage { m: 4, coeffs: fs_01600::LPF1_01600_TO_00400 },
                Stage { m: 5, coeffs: fs_01600::LPF2_00400_TO_00080 },
                Stage { m: 5, coeffs: fs_01600::LPF3_00080_TO_00016 },
            ],
        ),
        SampleRate::Fs1920 => (
            1152,
            5,
            vec![
                Stage { m: 4, coeffs: fs_01920::LPF1_01920_TO_00480 },
                Stage { m: 6, coeffs: fs_01920::LPF2_00480_TO_00080 },
                Stage { m: 5, coeffs: fs_01920::LPF3_00080_TO_00016 },
            ],
        ),
        SampleRate::Fs2400 => (
            288,
            1,
            vec![
                Stage { m: 2, coeffs: fs_02400::LPF1_02400_TO_01200 },
                Stage { m: 3, coeffs: fs_02400::LPF2_01200_TO_00400 },
                Stage { m: 5, coeffs: fs_02400::LPF3_00400_TO_00080 },
                Stage { m: 5, coeffs: fs_02400::LPF4_00080_TO_00016 },
            ],
        ),
        SampleRate::Fs2560 => (
            1536,
            5,
            vec![
                Stage { m: 4, coeffs: fs_02560::LPF1_02560_TO_00640 },
                Stage { m: 4, coeffs: fs_02560::LPF2_00640_TO_00160 },
                Stage { m: 5, coeffs: fs_02560::LPF3_00160_TO_00032 },
                Stage { m: 2, coeffs: fs_02560::LPF4_00032_TO_00016 },
            ],
        ),
        SampleRate::Fs6000 => (
            720,
            1,
            vec![
                Stage { m: 3, coeffs: fs_06000::LPF1_06000_TO_02000 },
                Stage { m: 5, coeffs: fs_06000::LPF2_02000_TO_00400 },
                Stage { m: 5, coeffs: fs_06000::LPF3_00400_TO_00080 },
                Stage { m: 5, coeffs: fs_06000::LPF4_00080_TO_00016 },
            ],
        ),
        SampleRate::Fs10000 => (
            1200,
            1,
            vec![
                Stage { m: 5, coeffs: fs_10000::LPF1_10000_TO_02000 },
                Stage { m: 5, coeffs: fs_10000::LPF2_02000_TO_00400 },
                Stage { m: 5, coeffs: fs_10000::LPF3_00400_TO_00080 },
                Stage { m: 5, coeffs: fs_10000::LPF4_00080_TO_00016 },
            ],
        ),
        SampleRate::Fs2500 | SampleRate::Fs3000 | SampleRate::Unspecified => return None,
    };

    Some(StagePlan { n, z, stages })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_active_rate_has_a_plan() {
        for rate in [
            SampleRate::Fs0960,
            SampleRate::Fs1200,
            SampleRate::Fs1440,
            SampleRate::Fs1600,
            SampleRate::Fs1920,
            SampleRate::Fs2400,
            SampleRate::Fs2560,
            SampleRate::Fs6000,
            SampleRate::Fs10000,
        ] {
            let plan = stage_plan(rate).expect("plan must exist");
            let m: usize = plan.stages.iter().map(|s| s.m).product();
            assert_eq!(
                rate.hz() as usize / 16_000,
                m,
                "{rate}: chain must end at 16 kS/s"
            );
            assert_eq!(
                plan.n % plan.stages[0].m,
                0,
                "{rate}: translator length must divide by the first stage factor"
            );
            assert_eq!(plan.n % 2, 0, "{rate}: translator length must be even");
            for stage in &plan.stages {
                assert!(stage.coeffs.len() % 2 == 1, "{rate}: odd filter lengths");
                let mid = stage.coeffs.len() / 2;
                for i in 0..=mid {
                    assert_eq!(
                        stage.coeffs[i],
                        stage.coeffs[stage.coeffs.len() - 1 - i],
                        "{rate}: filters must be symmetric"
                    );
                }
            }
        }
    }

    #[test]
    fn rates_without_chain_have_no_plan() {
        assert!(stage_plan(SampleRate::Fs2500).is_none());
        assert!(stage_plan(SampleRate::Fs3000).is_none());
        assert!(stage_plan(SampleRate::Unspecified).is_none());
    }

    #[test]
    fn translator_length_follows_rate() {
        // n = rate * z / 8333.33.. for every plan.
        for rate in [SampleRate::Fs1200, SampleRate::Fs1440, SampleRate::Fs10000] {
            let plan = stage_plan(rate).unwrap();
            let n = (rate.hz() as f64 * plan.z as f64 / 8333.333333333334).round() as usize;
            assert_eq!(plan.n, n, "{rate}");
        }
    }
}
