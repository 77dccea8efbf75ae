//! Uncompressed 24-bit BMP pixel array decoding.

use tracing::debug;

use crate::ImageDecoder;
use crate::bmp::header::{BmpCompression, BmpHeader};
use crate::byte_cursor::ByteCursor;
use crate::constants::{BMP_PIXEL_DATA_OFFSET, BMP_SUPPORTED_BIT_DEPTH};
use crate::error::{DecodeError, MalformedCheck, Unsupported};
use crate::raster::{RasterImage, rgb_to_u32};

pub struct BmpDecoder<'a> {
    cursor: ByteCursor<'a>,
}

impl<'a> BmpDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(source),
        }
    }

    /// Walks the bottom-up BGR pixel array into a top-down RGB raster.
    fn decode_pixels(&self, header: &BmpHeader) -> Result<RasterImage, DecodeError> {
        match header.compression {
            BmpCompression::None => {}
            BmpCompression::Rle8 => {
                return Err(DecodeError::UnsupportedCompression(Unsupported::BmpRle8));
            }
            BmpCompression::Rle4 => {
                return Err(DecodeError::UnsupportedCompression(Unsupported::BmpRle4));
            }
        }
        if header.bit_depth != BMP_SUPPORTED_BIT_DEPTH {
            return Err(DecodeError::UnsupportedCompression(
                Unsupported::BmpBitDepth(header.bit_depth),
            ));
        }
        if header.width == 0 || header.height == 0 {
            return Err(DecodeError::malformed(
                BMP_PIXEL_DATA_OFFSET,
                MalformedCheck::Dimensions,
            ));
        }

        let width = header.width as usize;
        let height = header.height as usize;
        let padded_width = header.padded_width as usize;

        // The top row holds the furthest pixel; checking it first avoids
        // allocating a raster for a truncated file.
        let last = pixel_offset(padded_width, width - 1, height - 1).ok_or(
            DecodeError::malformed(BMP_PIXEL_DATA_OFFSET, MalformedCheck::Dimensions),
        )?;
        self.cursor.slice(last, 3)?;

        let mut image = RasterImage::new(header.width, header.height);
        for y in 0..height {
            let row = &mut image.pixels[(height - 1 - y) * width..(height - y) * width];
            for (x, pixel) in row.iter_mut().enumerate() {
                let index = (padded_width * y + x) * 3 + BMP_PIXEL_DATA_OFFSET;
                let bgr = self.cursor.slice(index, 3)?;
                *pixel = rgb_to_u32(bgr[2], bgr[1], bgr[0]);
            }
        }
        debug!(width, height, "decoded BMP pixel array");
        Ok(image)
    }
}

fn pixel_offset(padded_width: usize, x: usize, y: usize) -> Option<usize> {
    padded_width
        .checked_mul(y)?
        .checked_add(x)?
        .checked_mul(3)?
        .checked_add(BMP_PIXEL_DATA_OFFSET)
}

impl ImageDecoder for BmpDecoder<'_> {
    type Header = BmpHeader;

    fn read_header(&mut self) -> Result<BmpHeader, DecodeError> {
        BmpHeader::parse(&self.cursor)
    }

    fn decode(&mut self) -> Result<(BmpHeader, RasterImage), DecodeError> {
        let header = self.read_header()?;
        let image = self.decode_pixels(&header)?;
        Ok((header, image))
    }
}
