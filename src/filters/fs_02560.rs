// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Downsampling chain 2.56 MS/s -> 16 kS/s for 8-bit RTL streams, M = 4 * 4 * 5 * 2.

pub const LPF1_02560_TO_00640: &[f32] = &[
    0.0000118919050313,
    0.0008540640039329,
    0.0066341767673193,
    0.0258690590971228,
    0.0662328374028934,
    0.1236854871212659,
    0.1771240683179702,
    0.1991768307689284,
    0.1771240683179702,
    0.1236854871212659,
    0.0662328374028934,
    0.0258690590971229,
    0.0066341767673193,
    0.0008540640039329,
    0.0000118919050313,
];

pub const LPF2_00640_TO_00160: &[f32] = &[
    0.0000094852282211,
    0.0004958669791918,
    0.0035996941838971,
    0.0139587159381900,
    0.0372117884179930,
    0.0752685051323650,
    0.1213861968411337,
    0.1602744168034998,
    0.1755906609510169,
    0.1602744168034998,
    0.1213861968411337,
    0.0752685051323651,
    0.0372117884179930,
    0.0139587159381900,
    0.0035996941838971,
    0.0004958669791918,
    0.0000094852282211,
];

pub const LPF3_00160_TO_00032: &[f32] = &[
    0.0001840359044440,
    0.0006409912293569,
    0.0013774575329339,
    0.0018053177501983,
    0.0008400576094489,
    -0.0026279207336757,
    -0.0087212415427194,
    -0.0154956721389694,
    -0.0185683867043005,
    -0.0121197466222812,
    0.0087122316413160,
    0.0449303707754600,
    0.0917672243328019,
    0.1390898117116958,
    0.1744245369577410,
    0.1875218645930988,
    0.1744245369577410,
    0.1390898117116958,
    0.0917672243328019,
    0.0449303707754600,
    0.0087122316413160,
    -0.0121197466222812,
    -0.0185683867043005,
    -0.0154956721389694,
    -0.0087212415427194,
    -0.0026279207336757,
    0.0008400576094489,
    0.0018053177501983,
    0.0013774575329339,
    0.0006409912293569,
    0.0001840359044440,
];

pub const LPF4_00032_TO_00016: &[f32] = &[
    0.0003683349209640,
    -0.0002660820012386,
    -0.0035421569940826,
    -0.0015090523618990,
    0.0139246923242476,
    0.0150906249368290,
    -0.0329691913193094,
    -0.0655928956025126,
    0.0534609124936431,
    0.3022619448294557,
    0.4375457375478052,
    0.3022619448294557,
    0.0534609124936431,
    -0.0655928956025126,
    -0.0329691913193094,
    0.0150906249368290,
    0.0139246923242476,
    -0.0015090523618990,
    -0.0035421569940826,
    -0.0002660820012386,
    0.0003683349209640,
];
