// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! AVX2 inner loops for the downsampler stages.
//!
//! Complex samples are laid out `[re, im, re, im, ...]`, so one 256-bit
//! register holds four of them. The delay line window passed in here is
//! contiguous (the stages double their delay storage for exactly this
//! reason), so every load is a plain unaligned load with no wraparound
//! handling.

#![allow(clippy::missing_safety_doc)]

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use crate::IqSample;

/// Horizontal reduction of an accumulator holding four partial (re, im)
/// pairs into one complex value.
#[inline]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn reduce_pairs(acc: __m256) -> IqSample {
    let lo = _mm256_castps256_ps128(acc);
    let hi = _mm256_extractf128_ps(acc, 1);
    let sum = _mm_add_ps(lo, hi);
    // [re0+re1, im0+im1]
    let sum = _mm_add_ps(sum, _mm_movehl_ps(sum, sum));
    let re = _mm_cvtss_f32(sum);
    let im = _mm_cvtss_f32(_mm_shuffle_ps(sum, sum, 0b01));
    IqSample::new(re, im)
}

/// Folded symmetric FIR over a contiguous window.
///
/// Loads four complex samples from each end of the window, reverses the
/// high end (swap the complex pairs inside each lane, then swap lanes),
/// adds the halves and runs a fused multiply-add against the coefficients
/// duplicated across re/im lanes.
#[target_feature(enable = "avx2", enable = "fma")]
pub unsafe fn folded_fir_avx2(window: &[IqSample], coeffs: &[f32]) -> IqSample {
    let len = coeffs.len();
    let half = len / 2;
    let wp = window.as_ptr() as *const f32;

    let mut acc = _mm256_setzero_ps();
    let mut i = 0usize;

    while i + 4 <= half {
        let lo = _mm256_loadu_ps(wp.add(2 * i));
        let hi = _mm256_loadu_ps(wp.add(2 * (len - 4 - i)));

        // Reverse the complex order of the high window.
        let hi = _mm256_permute_ps(hi, 0b0100_1110);
        let hi = _mm256_permute2f128_ps(hi, hi, 1);

        let pair_sum = _mm256_add_ps(lo, hi);

        // h0 h0 h1 h1 | h2 h2 h3 h3
        let h4 = _mm_loadu_ps(coeffs.as_ptr().add(i));
        let h_lo = _mm_unpacklo_ps(h4, h4);
        let h_hi = _mm_unpackhi_ps(h4, h4);
        let h = _mm256_insertf128_ps(_mm256_castps128_ps256(h_lo), h_hi, 1);

        acc = _mm256_fmadd_ps(pair_sum, h, acc);

        i += 4;
    }

    let mut out = reduce_pairs(acc);

    while i < half {
        let a = window[i];
        let b = window[len - 1 - i];
        out.re += (a.re + b.re) * coeffs[i];
        out.im += (a.im + b.im) * coeffs[i];
        i += 1;
    }

    out.re += window[half].re * coeffs[half];
    out.im += window[half].im * coeffs[half];

    out
}

/// Complex-coefficient FIR (translating first stage) over a contiguous
/// window: four complex MACs per iteration using a sign mask on the real
/// lanes and an imaginary-lane permute of the window.
#[target_feature(enable = "avx2", enable = "fma")]
pub unsafe fn complex_fir_avx2(window: &[IqSample], coeffs: &[IqSample]) -> IqSample {
    let len = coeffs.len();
    let wp = window.as_ptr() as *const f32;
    let cp = coeffs.as_ptr() as *const f32;

    // Negates the real lanes, turning ci*wi into the subtraction of the
    // complex product's real part.
    let conj_mask = _mm256_castsi256_ps(_mm256_setr_epi32(
        i32::MIN,
        0,
        i32::MIN,
        0,
        i32::MIN,
        0,
        i32::MIN,
        0,
    ));

    let mut acc = _mm256_setzero_ps();
    let mut i = 0usize;

    while i + 4 <= len {
        let w = _mm256_loadu_ps(wp.add(2 * i));
        let c = _mm256_loadu_ps(cp.add(2 * i));

        let c_re = _mm256_moveldup_ps(c);
        let c_im = _mm256_movehdup_ps(c);
        // [wi, wr] per complex
        let w_swap = _mm256_permute_ps(w, 0b1011_0001);

        // c_im * [wi, wr] with the real lane negated, then fma with
        // c_re * [wr, wi]:
        //   re: cr*wr - ci*wi, im: cr*wi + ci*wr
        let cross = _mm256_xor_ps(_mm256_mul_ps(c_im, w_swap), conj_mask);
        acc = _mm256_add_ps(acc, cross);
        acc = _mm256_fmadd_ps(c_re, w, acc);

        i += 4;
    }

    let mut out = reduce_pairs(acc);

    while i < len {
        let w = window[i];
        let c = coeffs[i];
        out.re += c.re * w.re - c.im * w.im;
        out.im += c.re * w.im + c.im * w.re;
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(len: usize) -> Vec<IqSample> {
        (0..len)
            .map(|i| IqSample::new((i as f32 * 0.631).sin(), (i as f32 * 0.177).cos()))
            .collect()
    }

    #[test]
    fn folded_matches_scalar() {
        if !std::arch::is_x86_feature_detected!("avx2")
            || !std::arch::is_x86_feature_detected!("fma")
        {
            return;
        }
        // Odd symmetric filter long enough to hit the vector loop and the
        // scalar tail.
        let half: Vec<f32> = (0..22).map(|i| (i as f32 * 0.05).cos() * 0.01).collect();
        let mut coeffs = half.clone();
        coeffs.push(0.123);
        coeffs.extend(half.iter().rev());
        let w = window(coeffs.len());

        let simd = unsafe { folded_fir_avx2(&w, &coeffs) };
        let scalar = super::super::folded_fir_scalar(&w, &coeffs);
        assert!(
            (simd - scalar).norm() < 1e-4,
            "{simd:?} != {scalar:?}"
        );
    }

    #[test]
    fn complex_matches_scalar() {
        if !std::arch::is_x86_feature_detected!("avx2")
            || !std::arch::is_x86_feature_detected!("fma")
        {
            return;
        }
        let coeffs: Vec<IqSample> = (0..45)
            .map(|i| IqSample::new((i as f32 * 0.3).cos(), (i as f32 * 0.4).sin()) * 0.05)
            .collect();
        let w = window(coeffs.len());

        let simd = unsafe { complex_fir_avx2(&w, &coeffs) };
        let scalar = super::super::complex_fir_scalar(&w, &coeffs);
        assert!(
            (simd - scalar).norm() < 1e-4,
            "{simd:?} != {scalar:?}"
        );
    }
}
