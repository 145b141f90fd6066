// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Runtime bindings to the vendor USB libraries.
//!
//! Both librtlsdr and libairspy are loaded with `libloading` on first use
//! instead of being linked at build time, so one binary runs on machines
//! with either library, both, or neither; a missing library simply means no
//! devices of that family are found.

pub mod airspy;
pub mod rtlsdr;
