pub const BMP_SIGNATURE: [u8; 2] = *b"BM";
pub const JPEG_SIGNATURE: [u8; 2] = [0xFF, 0xD8];

// Offsets into the fixed BITMAPFILEHEADER + BITMAPINFOHEADER layout.
pub const BMP_FILE_SIZE_OFFSET: usize = 2;
pub const BMP_RESERVED_OFFSET: usize = 6;
pub const BMP_RESERVED_SIZE: usize = 4;
pub const BMP_DATA_OFFSET_OFFSET: usize = 10;
pub const BMP_HEADER_SIZE_OFFSET: usize = 14;
pub const BMP_WIDTH_OFFSET: usize = 18;
pub const BMP_HEIGHT_OFFSET: usize = 22;
pub const BMP_PLANES_OFFSET: usize = 26;
pub const BMP_BIT_DEPTH_OFFSET: usize = 28;
pub const BMP_COMPRESSION_OFFSET: usize = 30;
pub const BMP_HORIZONTAL_RESOLUTION_OFFSET: usize = 38;
pub const BMP_VERTICAL_RESOLUTION_OFFSET: usize = 42;
pub const BMP_COLORS_USED_OFFSET: usize = 46;
pub const BMP_COLORS_IMPORTANT_OFFSET: usize = 50;
pub const BMP_PIXEL_DATA_OFFSET: usize = 54;

/// BITMAPINFOHEADER, the only info header variant accepted.
pub const BMP_INFO_HEADER_SIZE: u8 = 40;
pub const BMP_PLANE_COUNT: u8 = 1;
pub const BMP_SUPPORTED_BIT_DEPTH: u8 = 24;

// The size in bytes of a marker (0xFF + code) and of a segment length field.
pub const MARKER_SIZE: usize = 2;
pub const SEGMENT_LENGTH_SIZE: usize = 2;

pub const JFIF_IDENTIFIER: [u8; 5] = *b"JFIF\0";
// Identifier, version, units, densities and thumbnail size.
pub const JFIF_FIXED_PAYLOAD_SIZE: usize = 14;

pub const MAXIMUM_TABLE_INDEX: usize = 3;
pub const MAXIMUM_COMPONENT_COUNT: usize = 4;
pub const MAXIMUM_SAMPLING_FACTOR: u8 = 4;
pub const MAXIMUM_HUFFMAN_CODE_LENGTH: usize = 16;
pub const MAXIMUM_HUFFMAN_SYMBOLS: usize = 256;

// Largest DC difference category for 8-bit samples.
pub const MAXIMUM_DC_MAGNITUDE: u8 = 11;
// A coded block takes at least one DC code bit and one EOB code bit.
pub const MINIMUM_CODED_BLOCK_BITS: usize = 2;
