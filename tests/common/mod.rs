// In-memory BMP and baseline JPEG builders shared by the integration tests.
#![allow(dead_code)]

use rasterdec_rs::jpeg1::huffman::HuffmanTable;
use rasterdec_rs::jpeg1::quantization::ZIGZAG_ORDER;

/// 24-bit BITMAPINFOHEADER file; `rows[0]` is the top row, pixels are (r, g, b).
///
/// Pixel bytes are placed at `(cWidth * y + x) * 3 + 54` with `y` counted from
/// the bottom and `cWidth = (width + 3) & !3`.
pub fn bmp_24bit(rows: &[Vec<(u8, u8, u8)>]) -> Vec<u8> {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.len());
    let padded = (width + 3) & !3;
    let size = 54 + padded * height * 3;

    let mut data = vec![0u8; size];
    data[0..2].copy_from_slice(b"BM");
    data[2..6].copy_from_slice(&(size as u32).to_le_bytes());
    data[10..14].copy_from_slice(&54u32.to_le_bytes());
    data[14..18].copy_from_slice(&40u32.to_le_bytes());
    data[18..22].copy_from_slice(&(width as i32).to_le_bytes());
    data[22..26].copy_from_slice(&(height as i32).to_le_bytes());
    data[26] = 1;
    data[28] = 24;
    data[38..42].copy_from_slice(&2835u32.to_le_bytes());
    data[42..46].copy_from_slice(&2835u32.to_le_bytes());

    for (top_y, row) in rows.iter().enumerate() {
        let y = height - 1 - top_y;
        for (x, &(r, g, b)) in row.iter().enumerate() {
            let index = (padded * y + x) * 3 + 54;
            data[index..index + 3].copy_from_slice(&[b, g, r]);
        }
    }
    data
}

/// Segment-by-segment JPEG stream writer. Starts with SOI.
pub struct JpegStreamBuilder {
    bytes: Vec<u8>,
}

impl JpegStreamBuilder {
    pub fn new() -> Self {
        Self {
            bytes: vec![0xFF, 0xD8],
        }
    }

    pub fn segment(mut self, code: u8, payload: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0xFF, code]);
        self.bytes
            .extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    pub fn marker(mut self, code: u8) -> Self {
        self.bytes.extend_from_slice(&[0xFF, code]);
        self
    }

    /// JFIF 1.02, 72x72 dpi, with an optional uncompressed RGB thumbnail.
    pub fn jfif(self, thumbnail: Option<(u8, u8, &[u8])>) -> Self {
        let mut payload = b"JFIF\0".to_vec();
        payload.extend_from_slice(&[1, 2, 1, 0, 72, 0, 72]);
        match thumbnail {
            Some((w, h, rgb)) => {
                payload.extend_from_slice(&[w, h]);
                payload.extend_from_slice(rgb);
            }
            None => payload.extend_from_slice(&[0, 0]),
        }
        self.segment(0xE0, &payload)
    }

    pub fn comment(self, text: &str) -> Self {
        self.segment(0xFE, text.as_bytes())
    }

    /// 8-bit quantization table with every step equal to `step`.
    pub fn flat_dqt(self, index: u8, step: u8) -> Self {
        let mut payload = vec![index];
        payload.extend_from_slice(&[step; 64]);
        self.segment(0xDB, &payload)
    }

    pub fn dht(self, class: u8, index: u8, (counts, symbols): &(Vec<u8>, Vec<u8>)) -> Self {
        let mut payload = vec![(class << 4) | index];
        payload.extend_from_slice(counts);
        payload.extend_from_slice(symbols);
        self.segment(0xC4, &payload)
    }

    /// DC and AC tables from [`dc_table_spec`] / [`ac_table_spec`] under `index`.
    pub fn coding_tables(self, index: u8) -> Self {
        self.dht(0, index, &dc_table_spec())
            .dht(1, index, &ac_table_spec())
    }

    pub fn dri(self, interval: u16) -> Self {
        self.segment(0xDD, &interval.to_be_bytes())
    }

    /// Frame header; components are `(id, hv sampling byte, quantization table)`.
    pub fn sof(self, code: u8, width: u16, height: u16, components: &[(u8, u8, u8)]) -> Self {
        let mut payload = vec![8];
        payload.extend_from_slice(&height.to_be_bytes());
        payload.extend_from_slice(&width.to_be_bytes());
        payload.push(components.len() as u8);
        for &(id, hv, tq) in components {
            payload.extend_from_slice(&[id, hv, tq]);
        }
        self.segment(code, &payload)
    }

    /// Sequential scan header; components are `(id, dc/ac table byte)`.
    pub fn sos(self, components: &[(u8, u8)]) -> Self {
        self.sos_with_spectral(components, 0, 63, 0)
    }

    pub fn sos_with_spectral(self, components: &[(u8, u8)], ss: u8, se: u8, ah_al: u8) -> Self {
        let mut payload = vec![components.len() as u8];
        for &(id, tables) in components {
            payload.extend_from_slice(&[id, tables]);
        }
        payload.extend_from_slice(&[ss, se, ah_al]);
        self.segment(0xDA, &payload)
    }

    pub fn entropy(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn eoi(self) -> Vec<u8> {
        self.marker(0xD9).bytes
    }
}

/// Twelve DC categories, all with 4-bit codes.
pub fn dc_table_spec() -> (Vec<u8>, Vec<u8>) {
    let mut counts = vec![0u8; 16];
    counts[3] = 12;
    (counts, (0..12).collect())
}

/// EOB, ZRL and every (run, size) pair with size 1..=10, all with 8-bit codes.
pub fn ac_table_spec() -> (Vec<u8>, Vec<u8>) {
    let mut symbols = vec![0x00, 0xF0];
    for run in 0..16u8 {
        for size in 1..=10u8 {
            symbols.push((run << 4) | size);
        }
    }
    let mut counts = vec![0u8; 16];
    counts[7] = symbols.len() as u8;
    (counts, symbols)
}

pub fn build_table((counts, symbols): &(Vec<u8>, Vec<u8>)) -> HuffmanTable {
    let counts: [u8; 16] = counts.as_slice().try_into().unwrap();
    HuffmanTable::build(&counts, symbols).unwrap()
}

/// MSB-first bit writer with 0xFF00 byte stuffing.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    accumulator: u8,
    bit_count: u8,
}

impl BitWriter {
    pub fn write_bits(&mut self, value: u32, length: u8) {
        for i in (0..length).rev() {
            self.push_bit(((value >> i) & 1) as u8);
        }
    }

    fn push_bit(&mut self, bit: u8) {
        self.accumulator = (self.accumulator << 1) | bit;
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.bytes.push(self.accumulator);
            if self.accumulator == 0xFF {
                self.bytes.push(0x00);
            }
            self.accumulator = 0;
            self.bit_count = 0;
        }
    }

    /// Pads the last byte with one bits.
    pub fn flush(&mut self) {
        while self.bit_count != 0 {
            self.push_bit(1);
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.bytes
    }

    pub fn take(&mut self) -> Vec<u8> {
        self.flush();
        std::mem::take(&mut self.bytes)
    }
}

fn category(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

fn diff_bits(value: i32, category: u8) -> u32 {
    if value < 0 {
        (value + (1 << category) - 1) as u32
    } else {
        value as u32
    }
}

/// Huffman-encodes quantized blocks given in zig-zag order.
pub struct BlockEncoder {
    dc: HuffmanTable,
    ac: HuffmanTable,
    pub predictor: i32,
}

impl BlockEncoder {
    pub fn new() -> Self {
        Self {
            dc: build_table(&dc_table_spec()),
            ac: build_table(&ac_table_spec()),
            predictor: 0,
        }
    }

    fn write_symbol(writer: &mut BitWriter, table: &HuffmanTable, symbol: u8) {
        let code = table.code_for(symbol).unwrap();
        writer.write_bits(code.code as u32, code.length);
    }

    pub fn encode(&mut self, writer: &mut BitWriter, zigzag: &[i32; 64]) {
        let diff = zigzag[0] - self.predictor;
        self.predictor = zigzag[0];
        let dc_category = category(diff);
        Self::write_symbol(writer, &self.dc, dc_category);
        writer.write_bits(diff_bits(diff, dc_category), dc_category);

        let mut run = 0u8;
        for &value in &zigzag[1..] {
            if value == 0 {
                run += 1;
                continue;
            }
            while run > 15 {
                Self::write_symbol(writer, &self.ac, 0xF0);
                run -= 16;
            }
            let size = category(value);
            Self::write_symbol(writer, &self.ac, (run << 4) | size);
            writer.write_bits(diff_bits(value, size), size);
            run = 0;
        }
        if run > 0 {
            Self::write_symbol(writer, &self.ac, 0x00);
        }
    }
}

/// Zig-zag ordered block with the given DC and `(zig-zag index, value)` AC terms.
pub fn block(dc: i32, ac: &[(usize, i32)]) -> [i32; 64] {
    let mut zigzag = [0i32; 64];
    zigzag[0] = dc;
    for &(k, value) in ac {
        zigzag[k] = value;
    }
    zigzag
}

/// Samples a conforming decoder produces for one block under a flat quantizer.
pub fn reference_samples(zigzag: &[i32; 64], step: u16) -> [u8; 64] {
    let mut natural = [0f64; 64];
    for (k, &value) in zigzag.iter().enumerate() {
        natural[ZIGZAG_ORDER[k]] = (value * step as i32) as f64;
    }
    let c = |u: usize| if u == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
    let mut out = [0u8; 64];
    for y in 0..8 {
        for x in 0..8 {
            let mut sum = 0.0;
            for v in 0..8 {
                for u in 0..8 {
                    sum += c(u)
                        * c(v)
                        * natural[v * 8 + u]
                        * (((2 * x + 1) * u) as f64 * std::f64::consts::PI / 16.0).cos()
                        * (((2 * y + 1) * v) as f64 * std::f64::consts::PI / 16.0).cos();
                }
            }
            out[y * 8 + x] = (sum / 4.0 + 128.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
