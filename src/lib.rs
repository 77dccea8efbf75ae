//! Decoders for Windows Bitmap and baseline JPEG images.
//!
//! Every decoder works on a byte buffer that is already in memory and
//! produces a [`RasterImage`] of packed 24-bit RGB pixels together with the
//! header it parsed. Writing the raster to any file format is left to the
//! caller.

pub mod bmp;
pub mod byte_cursor;
pub mod constants;
pub mod error;
pub mod jpeg1;
pub mod jpeg_marker_code;
pub mod raster;

pub use bmp::{BmpDecoder, BmpHeader};
pub use error::{DecodeError, MalformedCheck, Unsupported};
pub use jpeg1::{JpegDecoder, JpegHeader};
pub use raster::{Effect, RasterImage};

use constants::{BMP_SIGNATURE, JPEG_SIGNATURE};

/// Decodes one container format from an in-memory buffer.
pub trait ImageDecoder {
    type Header;

    /// Parses and validates the header without touching pixel data.
    fn read_header(&mut self) -> Result<Self::Header, DecodeError>;

    /// Decodes the whole image. Either everything is valid or nothing is returned.
    fn decode(&mut self) -> Result<(Self::Header, RasterImage), DecodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Bmp,
    Jpeg,
}

impl ImageFormat {
    /// Identifies the container from its leading signature bytes.
    pub fn sniff(source: &[u8]) -> Result<Self, DecodeError> {
        if source.starts_with(&BMP_SIGNATURE) {
            Ok(Self::Bmp)
        } else if source.starts_with(&JPEG_SIGNATURE) {
            Ok(Self::Jpeg)
        } else {
            Err(DecodeError::SignatureMismatch {
                expected: "BMP or JPEG",
            })
        }
    }

    /// File extension conventionally used for the format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Bmp => "bmp",
            Self::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerHeader {
    Bmp(BmpHeader),
    Jpeg(JpegHeader),
}

impl ContainerHeader {
    pub fn format(&self) -> ImageFormat {
        match self {
            Self::Bmp(_) => ImageFormat::Bmp,
            Self::Jpeg(_) => ImageFormat::Jpeg,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Self::Bmp(header) => header.width,
            Self::Jpeg(header) => header.width() as u32,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Bmp(header) => header.height,
            Self::Jpeg(header) => header.height() as u32,
        }
    }

    /// Human-readable description, one property per line.
    pub fn summary(&self) -> Vec<String> {
        match self {
            Self::Bmp(header) => header.summary(),
            Self::Jpeg(header) => header.summary(),
        }
    }
}

/// Reads only the header of a BMP or JPEG buffer.
pub fn read_header(source: &[u8]) -> Result<ContainerHeader, DecodeError> {
    match ImageFormat::sniff(source)? {
        ImageFormat::Bmp => BmpDecoder::new(source).read_header().map(ContainerHeader::Bmp),
        ImageFormat::Jpeg => JpegDecoder::new(source).read_header().map(ContainerHeader::Jpeg),
    }
}

/// Decodes a BMP or JPEG buffer, picking the decoder from its signature.
pub fn decode(source: &[u8]) -> Result<(ContainerHeader, RasterImage), DecodeError> {
    match ImageFormat::sniff(source)? {
        ImageFormat::Bmp => {
            let (header, image) = BmpDecoder::new(source).decode()?;
            Ok((ContainerHeader::Bmp(header), image))
        }
        ImageFormat::Jpeg => {
            let (header, image) = JpegDecoder::new(source).decode()?;
            Ok((ContainerHeader::Jpeg(header), image))
        }
    }
}
