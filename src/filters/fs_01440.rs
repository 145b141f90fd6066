// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Downsampling chain 1.44 MS/s -> 16 kS/s for 8-bit RTL streams, M = 3 * 6 * 5.

pub const LPF1_01440_TO_00480: &[f32] = &[
    0.0000137905085407,
    0.0015034725665646,
    0.0128712414255828,
    0.0504150055671368,
    0.1208741328464410,
    0.1980781199857339,
    0.2324884742000007,
    0.1980781199857339,
    0.1208741328464410,
    0.0504150055671368,
    0.0128712414255828,
    0.0015034725665646,
    0.0000137905085407,
];

pub const LPF2_00480_TO_00080: &[f32] = &[
    -0.0013194377234479,
    -0.0019856318103831,
    -0.0021156536696882,
    0.0000000000000000,
    0.0062341329167304,
    0.0182037153447238,
    0.0364705976129807,
    0.0598867141176697,
    0.0854254172320777,
    0.1086928325547520,
    0.1250414675774529,
    0.1309316916942647,
    0.1250414675774529,
    0.1086928325547520,
    0.0854254172320777,
    0.0598867141176697,
    0.0364705976129807,
    0.0182037153447238,
    0.0062341329167304,
    0.0000000000000000,
    -0.0021156536696882,
    -0.0019856318103831,
    -0.0013194377234479,
];

pub const LPF3_00080_TO_00016: &[f32] = &[
    -0.0001088165129735,
    -0.0002922217387049,
    -0.0005887023450137,
    -0.0008045434010244,
    -0.0006527503605381,
    0.0001652849383831,
    0.0017579005715384,
    0.0038218611111694,
    0.0055297942065796,
    0.0056573665307528,
    0.0030087113881180,
    -0.0029373562717237,
    -0.0113854047030713,
    -0.0198953063408979,
    -0.0246359672946174,
    -0.0213062868068592,
    -0.0065377910951878,
    0.0206586797936201,
    0.0579535316993348,
    0.0997172140488533,
    0.1381448424280100,
    0.1652312621394781,
    0.1749973960295491,
    0.1652312621394781,
    0.1381448424280100,
    0.0997172140488532,
    0.0579535316993347,
    0.0206586797936201,
    -0.0065377910951878,
    -0.0213062868068592,
    -0.0246359672946174,
    -0.0198953063408979,
    -0.0113854047030713,
    -0.0029373562717237,
    0.0030087113881180,
    0.0056573665307528,
    0.0055297942065796,
    0.0038218611111694,
    0.0017579005715384,
    0.0001652849383831,
    -0.0006527503605381,
    -0.0008045434010244,
    -0.0005887023450137,
    -0.0002922217387049,
    -0.0001088165129735,
];
