//! Windows Bitmap (BMP) container.
//!
//! Only the `BITMAPINFOHEADER` variant is accepted, and only uncompressed
//! 24-bit pixel arrays are decoded. RLE-compressed files are parsed far enough
//! to report their compression kind.

pub mod decoder;
pub mod header;

pub use decoder::BmpDecoder;
pub use header::{BmpCompression, BmpHeader};
