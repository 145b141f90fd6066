// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! airrx - multichannel narrowband AM/FM receiver for the VHF airband.
//!
//! One R820-family USB dongle is tuned once; every requested channel inside
//! the captured bandwidth is translated and decimated to a common 16 kS/s
//! baseband, squelched, demodulated and mixed into a stereo ALSA stream.
//!
//! The crate is a binary first, but the DSP and transport pieces are exposed
//! as a library so the integration tests can drive them without hardware.

pub mod agc;
pub mod audio;
pub mod channel;
pub mod crb;
pub mod demod;
pub mod device;
pub mod filters;
pub mod fir;
pub mod meter;
pub mod msd;
pub mod rates;
pub mod settings;

/// One complex baseband sample, I in `re` and Q in `im`, nominally in
/// [-1.0, 1.0] on both axes.
pub type IqSample = num_complex::Complex<f32>;

/// Boxed-error result used at the application boundary.
pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Channel-rate IQ chunk length: 512 samples at 16 kS/s, i.e. 32 ms.
pub const CH_IQ_BUF_SIZE: usize = 512;

/// Metadata travelling with each channelized chunk through the ring buffer.
#[derive(Debug, Clone, Copy)]
pub struct ChunkMeta {
    /// Producer-side timestamp of the source block.
    pub ts: std::time::SystemTime,
    /// Wideband block power in dBFS (full-scale sine reference).
    pub pwr_dbfs: f32,
}

impl Default for ChunkMeta {
    fn default() -> Self {
        ChunkMeta {
            ts: std::time::SystemTime::UNIX_EPOCH,
            pwr_dbfs: f32::NEG_INFINITY,
        }
    }
}

/// Common channel sample rate that every downsampling chain terminates at.
pub const CH_SAMPLE_RATE: u32 = 16_000;
