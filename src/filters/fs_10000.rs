// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Downsampling chain 10.0 MS/s -> 16 kS/s for 12-bit Airspy streams, M = 5 * 5 * 5 * 5.

pub const LPF1_10000_TO_02000: &[f32] = &[
    0.0006010422685723,
    0.0033957076704768,
    0.0110733983769332,
    0.0265021642868470,
    0.0509173861254797,
    0.0821071533715370,
    0.1139299811668848,
    0.1379872512305464,
    0.1469718310054457,
    0.1379872512305464,
    0.1139299811668848,
    0.0821071533715370,
    0.0509173861254797,
    0.0265021642868470,
    0.0110733983769332,
    0.0033957076704768,
    0.0006010422685723,
];

pub const LPF2_02000_TO_00400: &[f32] = &[
    0.0004210386765231,
    0.0022596844880346,
    0.0072099969478580,
    0.0172569741708360,
    0.0337872005314587,
    0.0565100596224642,
    0.0827646210746004,
    0.1077504439555591,
    0.1258243269974909,
    0.1324313070703500,
    0.1258243269974909,
    0.1077504439555591,
    0.0827646210746004,
    0.0565100596224642,
    0.0337872005314587,
    0.0172569741708360,
    0.0072099969478580,
    0.0022596844880346,
    0.0004210386765231,
];

pub const LPF3_00400_TO_00080: &[f32] = &[
    0.0001748744558828,
    0.0009842833658397,
    0.0034403805150893,
    0.0090638480673209,
    0.0195195775455838,
    0.0358506948752110,
    0.0575856472944005,
    0.0821901120091661,
    0.1053080134685091,
    0.1219061709211306,
    0.1279527949637326,
    0.1219061709211306,
    0.1053080134685091,
    0.0821901120091661,
    0.0575856472944005,
    0.0358506948752110,
    0.0195195775455838,
    0.0090638480673209,
    0.0034403805150893,
    0.0009842833658397,
    0.0001748744558828,
];

pub const LPF4_00080_TO_00016: &[f32] = &[
    -0.0000064471239389,
    -0.0000176961232757,
    -0.0000348774319277,
    -0.0000447046683118,
    -0.0000244229288813,
    0.0000509930097215,
    0.0001904865352041,
    0.0003639109145100,
    0.0004874307139512,
    0.0004339065220899,
    0.0000794157943688,
    -0.0006188871674095,
    -0.0015405779778606,
    -0.0023606684964849,
    -0.0025959847790922,
    -0.0017620690079488,
    0.0003841545852356,
    0.0035966197528846,
    0.0070064486427414,
    0.0092166561548568,
    0.0086781161449435,
    0.0042921835730552,
    -0.0039326979156883,
    -0.0144213419005686,
    -0.0240132679357701,
    -0.0285194086991557,
    -0.0237979767660383,
    -0.0070847784871680,
    0.0218328631707456,
    0.0600248125877290,
    0.1016952657598081,
    0.1393518194612640,
    0.1655912338474367,
    0.1749989804779492,
    0.1655912338474367,
    0.1393518194612638,
    0.1016952657598078,
    0.0600248125877290,
    0.0218328631707456,
    -0.0070847784871680,
    -0.0237979767660384,
    -0.0285194086991557,
    -0.0240132679357701,
    -0.0144213419005686,
    -0.0039326979156883,
    0.0042921835730552,
    0.0086781161449435,
    0.0092166561548568,
    0.0070064486427414,
    0.0035966197528846,
    0.0003841545852356,
    -0.0017620690079488,
    -0.0025959847790922,
    -0.0023606684964849,
    -0.0015405779778606,
    -0.0006188871674095,
    0.0000794157943688,
    0.0004339065220899,
    0.0004874307139512,
    0.0003639109145100,
    0.0001904865352041,
    0.0000509930097215,
    -0.0000244229288813,
    -0.0000447046683118,
    -0.0000348774319277,
    -0.0000176961232757,
    -0.0000064471239389,
];
