//! BMP file header and info header parsing.

use num_enum::TryFromPrimitive;
use tracing::debug;

use crate::byte_cursor::ByteCursor;
use crate::constants::*;
use crate::error::{DecodeError, MalformedCheck, Unsupported};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum BmpCompression {
    None = 0,
    Rle8 = 1,
    Rle4 = 2,
}

impl BmpCompression {
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Rle8 => "RLE-8",
            Self::Rle4 => "RLE-4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BmpHeader {
    pub signature: [u8; 2],
    /// Bytes actually supplied, which may differ from `file_size`.
    pub stream_length: usize,
    pub file_size: u32,
    /// Pixel array offset as declared; decoding always starts at byte 54.
    pub data_offset: u32,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub compression: BmpCompression,
    /// Row width rounded up to a multiple of four.
    pub padded_width: u32,
    /// Pixels per meter.
    pub horizontal_resolution: u32,
    /// Pixels per meter.
    pub vertical_resolution: u32,
    pub colors_used: u8,
    pub colors_important: u8,
}

/// Row width rounded up to the next multiple of four.
pub fn padded_row_width(width: u32) -> u32 {
    (width + 3) & !3
}

impl BmpHeader {
    /// Validates the fixed header layout and extracts its fields.
    ///
    /// Checks run in order (signature, reserved bytes, info header size,
    /// plane count) and the first failure aborts the parse.
    pub fn parse(cursor: &ByteCursor<'_>) -> Result<Self, DecodeError> {
        let signature = cursor.slice(0, 2)?;
        if signature != BMP_SIGNATURE {
            return Err(DecodeError::SignatureMismatch { expected: "BMP" });
        }

        let reserved = cursor.slice(BMP_RESERVED_OFFSET, BMP_RESERVED_SIZE)?;
        if let Some(position) = reserved.iter().position(|&b| b != 0) {
            return Err(DecodeError::malformed(
                BMP_RESERVED_OFFSET + position,
                MalformedCheck::ReservedBytes,
            ));
        }

        if cursor.at(BMP_HEADER_SIZE_OFFSET)? != BMP_INFO_HEADER_SIZE {
            return Err(DecodeError::malformed(
                BMP_HEADER_SIZE_OFFSET,
                MalformedCheck::HeaderSize,
            ));
        }

        if cursor.at(BMP_PLANES_OFFSET)? != BMP_PLANE_COUNT {
            return Err(DecodeError::malformed(
                BMP_PLANES_OFFSET,
                MalformedCheck::PlaneCount,
            ));
        }

        let width = read_dimension(cursor, BMP_WIDTH_OFFSET)?;
        let height = read_dimension(cursor, BMP_HEIGHT_OFFSET)?;
        let bit_depth = cursor.at(BMP_BIT_DEPTH_OFFSET)?;

        let compression_code = cursor.at(BMP_COMPRESSION_OFFSET)?;
        let compression = BmpCompression::try_from(compression_code).map_err(|_| {
            DecodeError::UnsupportedCompression(Unsupported::BmpCompression(compression_code))
        })?;

        let header = Self {
            signature: BMP_SIGNATURE,
            stream_length: cursor.len(),
            file_size: cursor.u32le(BMP_FILE_SIZE_OFFSET)?,
            data_offset: cursor.u32le(BMP_DATA_OFFSET_OFFSET)?,
            width,
            height,
            bit_depth,
            compression,
            padded_width: padded_row_width(width),
            horizontal_resolution: cursor.u32le(BMP_HORIZONTAL_RESOLUTION_OFFSET)?,
            vertical_resolution: cursor.u32le(BMP_VERTICAL_RESOLUTION_OFFSET)?,
            colors_used: cursor.at(BMP_COLORS_USED_OFFSET)?,
            colors_important: cursor.at(BMP_COLORS_IMPORTANT_OFFSET)?,
        };
        debug!(
            width = header.width,
            height = header.height,
            bit_depth = header.bit_depth,
            compression = header.compression.name(),
            "parsed BMP header"
        );
        Ok(header)
    }

    pub fn summary(&self) -> Vec<String> {
        vec![
            "Format: Bitmap".to_string(),
            format!("Size: {} bytes", self.stream_length),
            format!("Dimensions: {} x {}", self.width, self.height),
            format!("Width: {} px", self.width),
            format!("Height: {} px", self.height),
            format!("Bit depth: {}", self.bit_depth),
            format!("Compression type: {}", self.compression.name()),
            format!(
                "Horizontal Resolution (ppm): {}",
                self.horizontal_resolution
            ),
            format!("Vertical Resolution (ppm): {}", self.vertical_resolution),
        ]
    }
}

fn read_dimension(cursor: &ByteCursor<'_>, offset: usize) -> Result<u32, DecodeError> {
    let value = cursor.i32le(offset)?;
    u32::try_from(value).map_err(|_| DecodeError::malformed(offset, MalformedCheck::Dimensions))
}
