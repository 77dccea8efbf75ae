use thiserror::Error;

/// Structural checks whose failure is reported as [`DecodeError::Malformed`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedCheck {
    #[error("reserved bytes must be zero")]
    ReservedBytes,
    #[error("unexpected header size field")]
    HeaderSize,
    #[error("plane count must be 1")]
    PlaneCount,
    #[error("invalid image dimensions")]
    Dimensions,
    #[error("segment length inconsistent with buffer")]
    SegmentLength,
    #[error("marker out of order")]
    MarkerOrder,
    #[error("duplicate marker")]
    DuplicateMarker,
    #[error("table index or class out of range")]
    TableSelector,
    #[error("Huffman table has an invalid shape")]
    HuffmanTable,
    #[error("table referenced before it was defined")]
    UndefinedTable,
    #[error("invalid component count")]
    ComponentCount,
    #[error("scan references an unknown component")]
    UnknownComponent,
    #[error("component identifier used twice")]
    DuplicateComponent,
    #[error("frame component not covered by any scan")]
    MissingComponentScan,
    #[error("sampling factor out of range")]
    SamplingFactor,
    #[error("coefficient index beyond block end")]
    CoefficientOverflow,
    #[error("restart marker not found")]
    RestartMarker,
    #[error("scan data ends before all blocks were decoded")]
    TruncatedScan,
    #[error("thumbnail does not fit its segment")]
    Thumbnail,
}

/// Features that are recognised but not decoded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    #[error("BMP RLE8 compression")]
    BmpRle8,
    #[error("BMP RLE4 compression")]
    BmpRle4,
    #[error("BMP compression type {0}")]
    BmpCompression(u8),
    #[error("BMP bit depth {0}")]
    BmpBitDepth(u8),
    #[error("JPEG process with frame marker 0x{0:02X}")]
    JpegProcess(u8),
    #[error("sample precision of {0} bits")]
    SamplePrecision(u8),
    #[error("progressive scan parameters")]
    ProgressiveScan,
    #[error("{0} color components")]
    ComponentLayout(usize),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("signature mismatch at offset 0: not a {expected} stream")]
    SignatureMismatch { expected: &'static str },
    #[error("malformed data at offset {offset}: {check}")]
    Malformed { offset: usize, check: MalformedCheck },
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(Unsupported),
    #[error("missing marker 0x{0:02X}")]
    MissingMarker(u8),
    #[error("read of {width} bytes at offset {offset} exceeds buffer length {length}")]
    OutOfRange {
        offset: usize,
        width: usize,
        length: usize,
    },
    #[error("no Huffman code matched at scan offset {offset}")]
    InvalidCode { offset: usize },
}

impl DecodeError {
    pub(crate) fn malformed(offset: usize, check: MalformedCheck) -> Self {
        Self::Malformed { offset, check }
    }
}
