// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Fixed-coefficient FIR filters with a dB gain applied to the coefficients.
//!
//! Each filter keeps a ring-buffer delay line, zero-initialised at
//! construction. Filtering is linear phase; the fractional group delay is
//! ignored. In-place filtering (`filter_in_place`) is the common case on the
//! audio path.

use crate::IqSample;

fn db_to_lin(gain_db: f32) -> f32 {
    10.0_f32.powf(gain_db / 20.0)
}

/// FIR for real samples.
#[derive(Debug, Clone, Default)]
pub struct Fir {
    coeffs: Vec<f32>,
    adjusted: Vec<f32>,
    delay: Vec<f32>,
    pos: usize,
    gain: f32,
}

impl Fir {
    pub fn new(coeffs: &[f32]) -> Self {
        Fir {
            coeffs: coeffs.to_vec(),
            adjusted: coeffs.to_vec(),
            delay: vec![0.0; coeffs.len()],
            pos: 0,
            gain: 0.0,
        }
    }

    /// Filter `input` into `out`. The two slices may be the same buffer;
    /// each output sample only depends on the delay line, never on earlier
    /// output positions.
    pub fn filter(&mut self, input: &[f32], out: &mut [f32]) {
        debug_assert_eq!(input.len(), out.len());
        for (dst, &src) in out.iter_mut().zip(input.iter()) {
            *dst = self.feed(src);
        }
    }

    /// Filter `data` in place.
    pub fn filter_in_place(&mut self, data: &mut [f32]) {
        for sample in data.iter_mut() {
            *sample = self.feed(*sample);
        }
    }

    /// Push one sample through the filter.
    pub fn feed(&mut self, sample: f32) -> f32 {
        let size = self.delay.len();
        self.delay[self.pos] = sample;
        self.pos += 1;
        if self.pos == size {
            self.pos = 0;
        }

        // Walk the delay line from the oldest sample; the adjusted
        // coefficients already carry the gain.
        let mut acc = 0.0f32;
        let mut idx = self.pos;
        for &c in &self.adjusted {
            acc += c * self.delay[idx];
            idx += 1;
            if idx == size {
                idx = 0;
            }
        }
        acc
    }

    /// Set the filter gain in dB by rescaling the coefficient copy.
    pub fn set_gain(&mut self, gain_db: f32) {
        self.gain = gain_db;
        let lin = db_to_lin(gain_db);
        for (adj, &c) in self.adjusted.iter_mut().zip(self.coeffs.iter()) {
            *adj = c * lin;
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

/// FIR for complex (IQ) samples with real coefficients.
#[derive(Debug, Clone, Default)]
pub struct QuadratureFir {
    coeffs: Vec<f32>,
    adjusted: Vec<f32>,
    delay: Vec<IqSample>,
    pos: usize,
    gain: f32,
}

impl QuadratureFir {
    pub fn new(coeffs: &[f32]) -> Self {
        QuadratureFir {
            coeffs: coeffs.to_vec(),
            adjusted: coeffs.to_vec(),
            delay: vec![IqSample::new(0.0, 0.0); coeffs.len()],
            pos: 0,
            gain: 0.0,
        }
    }

    /// Push one sample and get the filtered output.
    pub fn feed(&mut self, sample: IqSample) -> IqSample {
        let size = self.delay.len();
        self.delay[self.pos] = sample;
        self.pos += 1;
        if self.pos == size {
            self.pos = 0;
        }

        let mut acc = IqSample::new(0.0, 0.0);
        let mut idx = self.pos;
        for &c in &self.adjusted {
            acc += self.delay[idx] * c;
            idx += 1;
            if idx == size {
                idx = 0;
            }
        }
        acc
    }

    pub fn set_gain(&mut self, gain_db: f32) {
        self.gain = gain_db;
        let lin = db_to_lin(gain_db);
        for (adj, &c) in self.adjusted.iter_mut().zip(self.coeffs.iter()) {
            *adj = c * lin;
        }
    }
}

/// Stereo FIR over interleaved L/R samples. Left and right run through the
/// same coefficients but keep independent delay lines.
#[derive(Debug, Clone, Default)]
pub struct StereoFir {
    coeffs: Vec<f32>,
    adjusted: Vec<f32>,
    delay_l: Vec<f32>,
    delay_r: Vec<f32>,
    pos: usize,
    gain: f32,
}

impl StereoFir {
    pub fn new(coeffs: &[f32]) -> Self {
        StereoFir {
            coeffs: coeffs.to_vec(),
            adjusted: coeffs.to_vec(),
            delay_l: vec![0.0; coeffs.len()],
            delay_r: vec![0.0; coeffs.len()],
            pos: 0,
            gain: 0.0,
        }
    }

    /// Filter an interleaved stereo buffer in place. `data.len()` must be
    /// even.
    pub fn filter_in_place(&mut self, data: &mut [f32]) {
        debug_assert!(data.len() % 2 == 0);
        let size = self.delay_l.len();
        for frame in data.chunks_exact_mut(2) {
            self.delay_l[self.pos] = frame[0];
            self.delay_r[self.pos] = frame[1];
            self.pos += 1;
            if self.pos == size {
                self.pos = 0;
            }

            let mut acc_l = 0.0f32;
            let mut acc_r = 0.0f32;
            let mut idx = self.pos;
            for &c in &self.adjusted {
                acc_l += c * self.delay_l[idx];
                acc_r += c * self.delay_r[idx];
                idx += 1;
                if idx == size {
                    idx = 0;
                }
            }
            frame[0] = acc_l;
            frame[1] = acc_r;
        }
    }

    pub fn set_gain(&mut self, gain_db: f32) {
        self.gain = gain_db;
        let lin = db_to_lin(gain_db);
        for (adj, &c) in self.adjusted.iter_mut().zip(self.coeffs.iter()) {
            *adj = c * lin;
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_passes_at_unity_gain() {
        // Simple 5-tap moving average: DC should come through at 1.0 once
        // the delay line has filled.
        let mut fir = Fir::new(&[0.2; 5]);
        let mut buf = [1.0f32; 16];
        fir.filter_in_place(&mut buf);
        assert!((buf[15] - 1.0).abs() < 1e-6, "got {}", buf[15]);
    }

    #[test]
    fn gain_scales_output() {
        let mut fir = Fir::new(&[0.2; 5]);
        fir.set_gain(6.0);
        let mut buf = [1.0f32; 32];
        fir.filter_in_place(&mut buf);
        let expected = 10.0f32.powf(6.0 / 20.0);
        assert!((buf[31] - expected).abs() < 1e-4, "got {}", buf[31]);
    }

    #[test]
    fn impulse_reproduces_coefficients() {
        let coeffs = [0.1, 0.2, 0.4, 0.2, 0.1];
        let mut fir = Fir::new(&coeffs);
        let mut buf = [0.0f32; 8];
        buf[0] = 1.0;
        fir.filter_in_place(&mut buf);
        for (i, &c) in coeffs.iter().enumerate() {
            assert!((buf[i] - c).abs() < 1e-7, "tap {}: {} != {}", i, buf[i], c);
        }
    }

    #[test]
    fn stereo_channels_are_independent() {
        let coeffs = [0.5, 0.5];
        let mut fir = StereoFir::new(&coeffs);
        // Left gets an impulse, right stays silent.
        let mut buf = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        fir.filter_in_place(&mut buf);
        assert!((buf[0] - 0.5).abs() < 1e-7);
        assert!((buf[2] - 0.5).abs() < 1e-7);
        assert_eq!(buf[1], 0.0);
        assert_eq!(buf[3], 0.0);
        assert_eq!(buf[4], 0.0);
    }

    #[test]
    fn quadrature_filters_both_axes() {
        let mut fir = QuadratureFir::new(&[1.0]);
        let out = fir.feed(IqSample::new(0.25, -0.5));
        assert_eq!(out, IqSample::new(0.25, -0.5));
    }
}
