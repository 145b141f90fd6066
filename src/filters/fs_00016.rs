// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! 16 kS/s channel-rate filters: the channelization low pass applied to each
//! channel just before demodulation (care band 0..3.2 kHz, > 99 dB above
//! 5 kHz) and the aeronautical AM audio band shape applied to the mixed
//! stereo output (passband roughly 300 Hz .. 4.3 kHz).

pub const CH_AMDEMOD_LPF1: &[f32] = &[
    0.0000007540982051,
    0.0000025392425633,
    -0.0000155611362083,
    -0.0000383153030636,
    0.0000761351508689,
    0.0002125357138395,
    -0.0001950754548092,
    -0.0007775988191939,
    0.0002657955154443,
    0.0021673267756859,
    0.0001312705721833,
    -0.0049212714221154,
    -0.0019615779475231,
    0.0094627979324318,
    0.0069591723947720,
    -0.0157842697297487,
    -0.0179577598534563,
    0.0231991872188193,
    0.0402763406885340,
    -0.0303526455262817,
    -0.0902832785096816,
    0.0355793074975081,
    0.3127041682585321,
    0.4625000452853876,
    0.3127041682585321,
    0.0355793074975091,
    -0.0902832785096816,
    -0.0303526455262821,
    0.0402763406885340,
    0.0231991872188193,
    -0.0179577598534562,
    -0.0157842697297488,
    0.0069591723947720,
    0.0094627979324318,
    -0.0019615779475231,
    -0.0049212714221154,
    0.0001312705721833,
    0.0021673267756859,
    0.0002657955154444,
    -0.0007775988191939,
    -0.0001950754548092,
    0.0002125357138396,
    0.0000761351508689,
    -0.0000383153030636,
    -0.0000155611362083,
    0.0000025392425633,
    0.0000007540982051,
];

pub const BP4AM_CHANNEL: &[f32] = &[
    0.0000006707636138,
    0.0000013362158987,
    0.0000002697900738,
    0.0000037495686606,
    0.0000204681341915,
    0.0000208640189707,
    0.0000033760841139,
    0.0000512542612087,
    0.0001270312481458,
    0.0000627917620543,
    0.0000138379899531,
    0.0002562583892425,
    0.0003763893642642,
    0.0000090333565051,
    0.0000299429060508,
    0.0007548436716440,
    0.0005538625240015,
    -0.0005683440514341,
    0.0000211896452500,
    0.0014125493603590,
    -0.0002786845007562,
    -0.0024583539117637,
    -0.0000959324974482,
    0.0013161825263462,
    -0.0040111278250235,
    -0.0063899933075969,
    -0.0004512479251733,
    -0.0015982051827346,
    -0.0129003482730197,
    -0.0120210457335207,
    -0.0011561100332234,
    -0.0103231353335982,
    -0.0280168556452518,
    -0.0166703504411560,
    -0.0021982357989649,
    -0.0281237909775558,
    -0.0475411153436333,
    -0.0139695406606609,
    -0.0033700273481738,
    -0.0598919642295386,
    -0.0663912301747372,
    0.0122953368577392,
    -0.0043110692370196,
    -0.1374589749940492,
    -0.0780890487576117,
    0.2732893187548034,
    0.4953283499811091,
    0.2732893187548034,
    -0.0780890487576117,
    -0.1374589749940492,
    -0.0043110692370196,
    0.0122953368577392,
    -0.0663912301747372,
    -0.0598919642295386,
    -0.0033700273481738,
    -0.0139695406606609,
    -0.0475411153436333,
    -0.0281237909775558,
    -0.0021982357989649,
    -0.0166703504411560,
    -0.0280168556452518,
    -0.0103231353335982,
    -0.0011561100332234,
    -0.0120210457335207,
    -0.0129003482730197,
    -0.0015982051827346,
    -0.0004512479251733,
    -0.0063899933075969,
    -0.0040111278250235,
    0.0013161825263462,
    -0.0000959324974482,
    -0.0024583539117637,
    -0.0002786845007562,
    0.0014125493603590,
    0.0000211896452500,
    -0.0005683440514341,
    0.0005538625240015,
    0.0007548436716440,
    0.0000299429060508,
    0.0000090333565051,
    0.0003763893642642,
    0.0002562583892425,
    0.0000138379899531,
    0.0000627917620543,
    0.0001270312481458,
    0.0000512542612087,
    0.0000033760841139,
    0.0000208640189707,
    0.0000204681341915,
    0.0000037495686606,
    0.0000002697900738,
    0.0000013362158987,
    0.0000006707636138,
];
