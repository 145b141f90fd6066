// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Downsampling chain 0.96 MS/s -> 16 kS/s for 8-bit RTL streams, M = 3 * 4 * 5.
//! Blackman-Harris windowed sinc stages; > 50 dB in every folding zone.

pub const LPF1_00960_TO_00320: &[f32] = &[
    0.0000136084274465,
    0.0014901918539973,
    0.0128035578359307,
    0.0502900545772244,
    0.1208145560802456,
    0.1982164537963480,
    0.2327431548576149,
    0.1982164537963480,
    0.1208145560802456,
    0.0502900545772244,
    0.0128035578359307,
    0.0014901918539973,
    0.0000136084274465,
];

pub const LPF2_00320_TO_00080: &[f32] = &[
    0.0000011642736843,
    0.0000069567431557,
    -0.0000821456265014,
    -0.0006612722773313,
    -0.0022905313202014,
    -0.0046265054070125,
    -0.0045675976360009,
    0.0045551605527686,
    0.0303045886595260,
    0.0749056910609844,
    0.1296457599623095,
    0.1758200118795406,
    0.1939774382701567,
    0.1758200118795406,
    0.1296457599623095,
    0.0749056910609844,
    0.0303045886595261,
    0.0045551605527686,
    -0.0045675976360009,
    -0.0046265054070125,
    -0.0022905313202014,
    -0.0006612722773313,
    -0.0000821456265014,
    0.0000069567431557,
    0.0000011642736843,
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
