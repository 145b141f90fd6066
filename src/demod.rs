// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Per-sample AM and narrow-band FM demodulation.

use crate::settings::Modulation;
use crate::IqSample;

/// Stateful demodulator for one channel.
///
/// AM is a plain envelope detector. FM is a quadrature discriminator on
/// amplitude-normalised samples: the angle of `s[n] * conj(s[n-1])`.
#[derive(Debug, Clone)]
pub struct Demod {
    modulation: Modulation,
    prev: IqSample,
}

impl Demod {
    pub fn new(modulation: Modulation) -> Self {
        Demod {
            modulation,
            prev: IqSample::new(0.0, 0.0),
        }
    }

    pub fn demod(&mut self, sample: IqSample) -> f32 {
        match self.modulation {
            Modulation::Am => sample.norm(),
            Modulation::Fm => {
                let norm = sample.norm();
                if norm == 0.0 {
                    return 0.0;
                }
                let sample = sample / norm;

                let i = sample.re;
                let q = sample.im;
                let audio = (q * self.prev.re - i * self.prev.im)
                    .atan2(i * self.prev.re + q * self.prev.im);

                self.prev = sample;

                audio
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn tone(freq_norm: f32, len: usize) -> Vec<IqSample> {
        (0..len)
            .map(|n| IqSample::from_polar(1.0, TAU * freq_norm * n as f32))
            .collect()
    }

    #[test]
    fn am_is_envelope() {
        let mut demod = Demod::new(Modulation::Am);
        assert!((demod.demod(IqSample::new(3.0, 4.0)) - 5.0).abs() < 1e-6);
        assert_eq!(demod.demod(IqSample::new(0.0, 0.0)), 0.0);
    }

    #[test]
    fn fm_tone_gives_constant_frequency() {
        let mut demod = Demod::new(Modulation::Fm);
        let samples = tone(0.1, 32);
        let out: Vec<f32> = samples.iter().map(|&s| demod.demod(s)).collect();
        // Skip the first output; prev starts at zero.
        for (idx, &v) in out.iter().enumerate().skip(2) {
            assert!(
                (v - TAU * 0.1).abs() < 1e-3,
                "sample {idx}: {v} != {}",
                TAU * 0.1
            );
        }
    }

    #[test]
    fn fm_amplitude_is_normalised_away() {
        let mut a = Demod::new(Modulation::Fm);
        let mut b = Demod::new(Modulation::Fm);
        let samples = tone(0.05, 16);
        for &s in samples.iter().skip(1) {
            let va = a.demod(s);
            let vb = b.demod(s * 7.5);
            assert!((va - vb).abs() < 1e-5);
        }
    }
}
