//! Quantization tables and coefficient dequantization for JPEG 1.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use crate::jpeg1::dct::{BLOCK_DIM, BLOCK_SIZE};

/// Natural (row-major) index of the `k`-th coefficient in zig-zag order.
pub const ZIGZAG_ORDER: [usize; BLOCK_DIM] = [
    0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// An 8x8 quantization table in natural order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    /// 0 for 8-bit entries, 1 for 16-bit entries.
    pub precision: u8,
    pub values: [u16; BLOCK_DIM],
}

impl QuantizationTable {
    /// Builds a table from entries stored in zig-zag order, as in DQT.
    pub fn from_zigzag(precision: u8, zigzag: &[u16; BLOCK_DIM]) -> Self {
        let mut values = [0u16; BLOCK_DIM];
        for (k, &value) in zigzag.iter().enumerate() {
            values[ZIGZAG_ORDER[k]] = value;
        }
        Self { precision, values }
    }

    /// Quantizer steps premultiplied by the IDCT input scale factors.
    pub fn idct_multipliers(&self) -> [f32; BLOCK_DIM] {
        let scale = idct_scale_factors();
        let mut multipliers = [0.0f32; BLOCK_DIM];
        for row in 0..BLOCK_SIZE {
            for col in 0..BLOCK_SIZE {
                let i = row * BLOCK_SIZE + col;
                multipliers[i] = self.values[i] as f32 * scale[row] * scale[col];
            }
        }
        multipliers
    }
}

/// Per-frequency factors the butterfly IDCT expects its inputs to carry.
pub fn idct_scale_factors() -> [f32; BLOCK_SIZE] {
    let mut scale = [0.0f32; BLOCK_SIZE];
    scale[0] = FRAC_1_SQRT_2 / 2.0;
    for (k, factor) in scale.iter_mut().enumerate().skip(1) {
        *factor = (k as f32 * PI / 16.0).cos() / 2.0;
    }
    scale
}

/// De-quantizes coefficients (natural order) into IDCT input.
pub fn dequantize_block(
    coefficients: &[i32; BLOCK_DIM],
    multipliers: &[f32; BLOCK_DIM],
    output: &mut [f32; BLOCK_DIM],
) {
    for i in 0..BLOCK_DIM {
        output[i] = coefficients[i] as f32 * multipliers[i];
    }
}
