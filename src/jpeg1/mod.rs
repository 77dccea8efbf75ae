//! JPEG 1 sequential DCT decoding (ISO/IEC 10918-1 / ITU-T T.81).
//!
//! Features:
//! - Baseline (SOF0) and 8-bit extended sequential (SOF1) Huffman frames.
//! - Grayscale and YCbCr with any sampling factors up to 4x4.
//! - Restart markers (DRI/RSTm), multiple scans, 8- and 16-bit quantization tables.
//! - JFIF APP0 metadata including the uncompressed RGB thumbnail.

pub mod dct;
pub mod decoder;
pub mod header;
pub mod huffman;
pub mod marker_scanner;
pub mod quantization;

pub use decoder::JpegDecoder;
pub use header::{JpegHeader, JpegHeaderAssembler};
pub use marker_scanner::{MarkerScanner, MarkerSegment};
