//! Canonical Huffman tables and the entropy-coded bit stream reader.

use crate::constants::{MAXIMUM_HUFFMAN_CODE_LENGTH, MAXIMUM_HUFFMAN_SYMBOLS};
use crate::error::{DecodeError, MalformedCheck};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JPEG_RESTART_MARKER_BASE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    Dc,
    Ac,
}

/// One assigned code: `length` bits holding `code`, decoding to `symbol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanCode {
    pub length: u8,
    pub code: u16,
    pub symbol: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    /// Codes in table order: grouped by increasing length, consecutive within a length.
    pub codes: Vec<HuffmanCode>,

    // Decoding fields, indexed by code length - 1.
    min_code: [i32; MAXIMUM_HUFFMAN_CODE_LENGTH],
    max_code: [i32; MAXIMUM_HUFFMAN_CODE_LENGTH],
    val_ptr: [usize; MAXIMUM_HUFFMAN_CODE_LENGTH],
}

impl HuffmanTable {
    /// Builds the canonical code from DHT data.
    ///
    /// `counts[i]` is the number of codes of bit length `i + 1`; `symbols`
    /// lists the symbols in table order.
    pub fn build(
        counts: &[u8; MAXIMUM_HUFFMAN_CODE_LENGTH],
        symbols: &[u8],
    ) -> Result<Self, MalformedCheck> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total > MAXIMUM_HUFFMAN_SYMBOLS || total != symbols.len() {
            return Err(MalformedCheck::HuffmanTable);
        }

        let lengths = counts
            .iter()
            .enumerate()
            .flat_map(|(i, &count)| std::iter::repeat_n(i as u8 + 1, count as usize));

        let mut codes = Vec::with_capacity(total);
        let mut code = 0u32;
        let mut length_counter = 0u8;
        for (length, &symbol) in lengths.zip(symbols) {
            while length > length_counter {
                code <<= 1;
                length_counter += 1;
            }
            if code >= 1 << length {
                // More codes of this length than the code space allows.
                return Err(MalformedCheck::HuffmanTable);
            }
            codes.push(HuffmanCode {
                length,
                code: code as u16,
                symbol,
            });
            code += 1;
        }

        let mut table = Self {
            codes,
            min_code: [0; MAXIMUM_HUFFMAN_CODE_LENGTH],
            max_code: [-1; MAXIMUM_HUFFMAN_CODE_LENGTH],
            val_ptr: [0; MAXIMUM_HUFFMAN_CODE_LENGTH],
        };
        let mut index = 0;
        for (i, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let first = table.codes[index];
            table.val_ptr[i] = index;
            table.min_code[i] = first.code as i32;
            table.max_code[i] = first.code as i32 + count as i32 - 1;
            index += count as usize;
        }
        Ok(table)
    }

    pub fn max_length(&self) -> u8 {
        self.codes.last().map_or(0, |c| c.length)
    }

    pub fn code_for(&self, symbol: u8) -> Option<HuffmanCode> {
        self.codes.iter().copied().find(|c| c.symbol == symbol)
    }

    /// Reads the shortest matching code from `reader` and returns its symbol.
    pub fn lookup(&self, reader: &mut JpegBitReader<'_>) -> Result<u8, DecodeError> {
        let start = reader.position();
        let mut code = 0i32;
        for i in 0..MAXIMUM_HUFFMAN_CODE_LENGTH {
            code = (code << 1) | reader.read_bit()? as i32;
            if code <= self.max_code[i] {
                let index = self.val_ptr[i] + (code - self.min_code[i]) as usize;
                return Ok(self.codes[index].symbol);
            }
        }
        Err(DecodeError::InvalidCode { offset: start })
    }
}

/// Reads entropy-coded bits MSB first, removing 0xFF00 byte stuffing.
///
/// Reaching a marker or the end of the buffer while bits are still needed
/// means the scan is truncated.
pub struct JpegBitReader<'a> {
    source: &'a [u8],
    position: usize,
    bit_buffer: u32,
    bits_in_buffer: u32,
}

impl<'a> JpegBitReader<'a> {
    /// Starts reading `source` at `position`, the first byte after SOS.
    pub fn new(source: &'a [u8], position: usize) -> Self {
        Self {
            source,
            position,
            bit_buffer: 0,
            bits_in_buffer: 0,
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn read_bit(&mut self) -> Result<u16, DecodeError> {
        self.read_bits(1)
    }

    pub fn read_bits(&mut self, count: u8) -> Result<u16, DecodeError> {
        if count == 0 {
            return Ok(0);
        }
        let count = count as u32;
        while self.bits_in_buffer < count {
            let byte = self.read_byte_unstuffed()?;
            self.bit_buffer = (self.bit_buffer << 8) | byte as u32;
            self.bits_in_buffer += 8;
        }

        let shift = self.bits_in_buffer - count;
        let value = (self.bit_buffer >> shift) & ((1 << count) - 1);
        self.bits_in_buffer -= count;
        self.bit_buffer &= (1 << self.bits_in_buffer) - 1;
        Ok(value as u16)
    }

    /// Reads `magnitude` bits and sign-extends them (ISO/IEC 10918-1 F.2.2.1).
    pub fn receive_extend(&mut self, magnitude: u8) -> Result<i32, DecodeError> {
        let bits = self.read_bits(magnitude)? as i32;
        Ok(extend(bits, magnitude))
    }

    /// Drops the unread bits of the current byte.
    pub fn align_to_byte(&mut self) {
        self.bit_buffer = 0;
        self.bits_in_buffer = 0;
    }

    /// Consumes the restart marker RST`index`, which must come next.
    pub fn read_restart_marker(&mut self, index: u8) -> Result<(), DecodeError> {
        self.align_to_byte();
        let marker_offset = self.position;
        let mut position = self.position;
        if self.source.get(position) != Some(&JPEG_MARKER_START_BYTE) {
            return Err(DecodeError::malformed(marker_offset, MalformedCheck::RestartMarker));
        }
        while self.source.get(position) == Some(&JPEG_MARKER_START_BYTE) {
            position += 1;
        }
        if self.source.get(position) != Some(&(JPEG_RESTART_MARKER_BASE + index)) {
            return Err(DecodeError::malformed(marker_offset, MalformedCheck::RestartMarker));
        }
        self.position = position + 1;
        Ok(())
    }

    fn read_byte_unstuffed(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .source
            .get(self.position)
            .ok_or(DecodeError::malformed(self.position, MalformedCheck::TruncatedScan))?;
        if byte == JPEG_MARKER_START_BYTE {
            if self.source.get(self.position + 1) != Some(&0x00) {
                return Err(DecodeError::malformed(
                    self.position,
                    MalformedCheck::TruncatedScan,
                ));
            }
            self.position += 2;
        } else {
            self.position += 1;
        }
        Ok(byte)
    }
}

/// Maps a `magnitude`-bit value onto the signed range it encodes.
pub fn extend(bits: i32, magnitude: u8) -> i32 {
    if magnitude == 0 {
        return 0;
    }
    if bits < 1 << (magnitude - 1) {
        bits - (1 << magnitude) + 1
    } else {
        bits
    }
}
