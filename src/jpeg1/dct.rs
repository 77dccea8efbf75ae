//! Inverse Discrete Cosine Transform (IDCT) for JPEG 1.
//!
//! Separable 8x8 transform built from the Arai-Agui-Nakajima 8-point
//! butterfly: one pass over rows, then the same butterfly over columns.
//! Inputs must already carry the per-frequency scale factors from
//! [`crate::jpeg1::quantization::idct_scale_factors`].

use std::f32::consts::PI;
use std::sync::LazyLock;

pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

struct ButterflyConstants {
    c4: f32,
    c6: f32,
    q: f32,
    r: f32,
}

static CONSTANTS: LazyLock<ButterflyConstants> = LazyLock::new(|| {
    let c2 = 2.0 * (PI / 8.0).cos();
    let c4 = 2.0 * (2.0 * PI / 8.0).cos();
    let c6 = 2.0 * (3.0 * PI / 8.0).cos();
    ButterflyConstants {
        c4,
        c6,
        q: c2 - c6,
        r: c2 + c6,
    }
});

/// 8-point butterfly over `block[base + k * stride]` for `k` in `0..8`.
#[inline]
fn butterfly(block: &mut [f32; BLOCK_DIM], base: usize, stride: usize, k: &ButterflyConstants) {
    let at = |i: usize| base + i * stride;
    let m = |block: &[f32; BLOCK_DIM], i: usize| block[at(i)];

    let a2 = m(block, 2) - m(block, 6);
    let a3 = m(block, 2) + m(block, 6);
    let a4 = m(block, 5) - m(block, 3);
    let tmp1 = m(block, 1) + m(block, 7);
    let tmp2 = m(block, 3) + m(block, 5);
    let a5 = tmp1 - tmp2;
    let a6 = m(block, 1) - m(block, 7);
    let a7 = tmp1 + tmp2;

    let b2 = a2 * k.c4;
    let tmp4 = k.c6 * (a4 + a6);
    let neg_b4 = k.q * a4 + tmp4;
    let b5 = a5 * k.c4;
    let b6 = k.r * a6 - tmp4;

    let tmp3 = b6 - a7;
    let n0 = tmp3 - b5;
    let n1 = m(block, 0) - m(block, 4);
    let n2 = b2 - a3;
    let n3 = m(block, 0) + m(block, 4);
    let neg_n5 = neg_b4;

    let m3 = n1 + n2;
    let m4 = n3 + a3;
    let m5 = n1 - n2;
    let m6 = n3 - a3;
    let neg_m7 = neg_n5 + n0;

    block[at(0)] = m4 + a7;
    block[at(1)] = m3 + tmp3;
    block[at(2)] = m5 - n0;
    block[at(3)] = m6 + neg_m7;
    block[at(4)] = m6 - neg_m7;
    block[at(5)] = m5 + n0;
    block[at(6)] = m3 - tmp3;
    block[at(7)] = m4 - a7;
}

/// In-place 8x8 IDCT of a row-major coefficient block.
///
/// The output is not level shifted or clamped.
pub fn idct_8x8(block: &mut [f32; BLOCK_DIM]) {
    let constants = &*CONSTANTS;
    for row in 0..BLOCK_SIZE {
        butterfly(block, row * BLOCK_SIZE, 1, constants);
    }
    for col in 0..BLOCK_SIZE {
        butterfly(block, col, BLOCK_SIZE, constants);
    }
}
