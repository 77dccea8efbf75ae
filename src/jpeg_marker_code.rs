use num_enum::TryFromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOF0: Marks the start of a baseline DCT frame.
    StartOfFrameBaseline = 0xC0,
    /// SOF1: Marks the start of an extended sequential DCT frame.
    StartOfFrameExtendedSequential = 0xC1,
    /// SOF2: Marks the start of a progressive DCT frame.
    StartOfFrameProgressive = 0xC2,
    /// SOF3: Marks the start of a lossless (sequential) frame.
    StartOfFrameLossless = 0xC3,

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable = 0xC4,

    /// SOF5-SOF7: Differential Huffman frames.
    StartOfFrameDifferentialSequential = 0xC5,
    StartOfFrameDifferentialProgressive = 0xC6,
    StartOfFrameDifferentialLossless = 0xC7,

    /// SOF9-SOF15: Arithmetic-coded frames.
    StartOfFrameArithmeticSequential = 0xC9,
    StartOfFrameArithmeticProgressive = 0xCA,
    StartOfFrameArithmeticLossless = 0xCB,
    /// DAC: Defines arithmetic coding conditioning.
    DefineArithmeticConditioning = 0xCC,
    StartOfFrameArithmeticDifferentialSequential = 0xCD,
    StartOfFrameArithmeticDifferentialProgressive = 0xCE,
    StartOfFrameArithmeticDifferentialLossless = 0xCF,

    /// RST0-RST7: Restart markers inside entropy-coded data.
    Restart0 = 0xD0,
    Restart1 = 0xD1,
    Restart2 = 0xD2,
    Restart3 = 0xD3,
    Restart4 = 0xD4,
    Restart5 = 0xD5,
    Restart6 = 0xD6,
    Restart7 = 0xD7,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,
    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,
    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,
    /// DQT: Defines one or more quantization tables.
    DefineQuantizationTable = 0xDB,
    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,
    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: Application data 1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: Application data 2: used for ICC profile.
    ApplicationData2 = 0xE2,
    ApplicationData3 = 0xE3,
    ApplicationData4 = 0xE4,
    ApplicationData5 = 0xE5,
    ApplicationData6 = 0xE6,
    ApplicationData7 = 0xE7,
    ApplicationData8 = 0xE8,
    ApplicationData9 = 0xE9,
    ApplicationData10 = 0xEA,
    ApplicationData11 = 0xEB,
    ApplicationData12 = 0xEC,
    ApplicationData13 = 0xED,
    /// APP14: Application data 14: used by Adobe
    ApplicationData14 = 0xEE,
    ApplicationData15 = 0xEF,

    /// COM: Comment block.
    Comment = 0xFE,
}

impl JpegMarkerCode {
    /// Markers that stand alone, without a length field or payload.
    pub fn is_standalone(code: u8) -> bool {
        code == 0x01 || (JPEG_RESTART_MARKER_BASE..=JpegMarkerCode::EndOfImage as u8).contains(&code)
    }

    pub fn is_restart(code: u8) -> bool {
        (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE)
            .contains(&code)
    }

    /// Frame markers of any coding process; only SOF0 and SOF1 are decoded.
    pub fn is_start_of_frame(code: u8) -> bool {
        matches!(code, 0xC0..=0xCF) && !matches!(code, 0xC4 | 0xC8 | 0xCC)
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;
