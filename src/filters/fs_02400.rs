// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Downsampling chain 2.4 MS/s -> 16 kS/s for 8-bit RTL streams, M = 2 * 3 * 5 * 5.

pub const LPF1_02400_TO_01200: &[f32] = &[
    0.0000208702254657,
    0.0075665817541964,
    0.0757479421225900,
    0.2424277814848310,
    0.3484736488258336,
    0.2424277814848310,
    0.0757479421225901,
    0.0075665817541964,
    0.0000208702254657,
];

pub const LPF2_01200_TO_00400: &[f32] = &[
    0.0000137262713506,
    0.0014987912638232,
    0.0128474010569802,
    0.0503710213693594,
    0.1208531831464377,
    0.1981268215399144,
    0.2325781107042688,
    0.1981268215399144,
    0.1208531831464378,
    0.0503710213693595,
    0.0128474010569802,
    0.0014987912638232,
    0.0000137262713506,
];

pub const LPF3_00400_TO_00080: &[f32] = &[
    -0.0007688947906962,
    -0.0008552256209725,
    0.0013755646551764,
    0.0090509083036270,
    0.0251867984797878,
    0.0508151453065983,
    0.0833037373908732,
    0.1161405747825238,
    0.1407793252320492,
    0.1499441325220660,
    0.1407793252320492,
    0.1161405747825238,
    0.0833037373908732,
    0.0508151453065983,
    0.0251867984797878,
    0.0090509083036270,
    0.0013755646551764,
    -0.0008552256209725,
    -0.0007688947906962,
];

pub const LPF4_00080_TO_00016: &[f32] = &[
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
