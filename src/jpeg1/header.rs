//! Assembles the frame description of a JPEG stream from its marker segments.

use num_enum::TryFromPrimitive;
use tracing::{debug, warn};

use crate::byte_cursor::ByteCursor;
use crate::constants::*;
use crate::error::{DecodeError, MalformedCheck, Unsupported};
use crate::jpeg1::dct::BLOCK_DIM;
use crate::jpeg1::huffman::{HuffmanTable, TableClass};
use crate::jpeg1::marker_scanner::{MarkerScanner, MarkerSegment};
use crate::jpeg1::quantization::QuantizationTable;
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::raster::{RasterImage, rgb_to_u32};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, TryFromPrimitive)]
#[repr(u8)]
pub enum DensityUnits {
    /// X and Y only give the pixel aspect ratio.
    #[default]
    AspectRatio = 0,
    DotsPerInch = 1,
    DotsPerCentimeter = 2,
}

impl DensityUnits {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::AspectRatio => "",
            Self::DotsPerInch => " dpi",
            Self::DotsPerCentimeter => " dpcm",
        }
    }
}

/// Contents of the JFIF APP0 segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JfifHeader {
    pub version: (u8, u8),
    pub units: DensityUnits,
    pub x_density: u16,
    pub y_density: u16,
    pub thumbnail_width: u8,
    pub thumbnail_height: u8,
    pub thumbnail: Option<RasterImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameComponent {
    pub id: u8,
    pub horizontal_sampling: u8,
    pub vertical_sampling: u8,
    pub quantization_table: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// SOF marker code the frame was declared with.
    pub marker: u8,
    pub precision: u8,
    pub height: u16,
    pub width: u16,
    pub components: Vec<FrameComponent>,
    pub max_horizontal_sampling: u8,
    pub max_vertical_sampling: u8,
}

impl FrameHeader {
    /// MCU grid of an interleaved scan: `(across, down)`.
    pub fn mcu_grid(&self) -> (usize, usize) {
        let mcu_width = 8 * self.max_horizontal_sampling as usize;
        let mcu_height = 8 * self.max_vertical_sampling as usize;
        (
            (self.width as usize).div_ceil(mcu_width),
            (self.height as usize).div_ceil(mcu_height),
        )
    }

    /// Block grid of a non-interleaved scan over `component`: `(across, down)`.
    pub fn component_blocks(&self, component: &FrameComponent) -> (usize, usize) {
        let width = (self.width as usize * component.horizontal_sampling as usize)
            .div_ceil(self.max_horizontal_sampling as usize);
        let height = (self.height as usize * component.vertical_sampling as usize)
            .div_ceil(self.max_vertical_sampling as usize);
        (width.div_ceil(8), height.div_ceil(8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponent {
    /// Index into [`FrameHeader::components`].
    pub component_index: usize,
    pub dc_table: u8,
    pub ac_table: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub approximation_high: u8,
    pub approximation_low: u8,
    /// Offset of the first entropy-coded byte.
    pub data_offset: usize,
}

/// Everything the header segments of a JPEG stream declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegHeader {
    /// Size of the whole stream in bytes.
    pub stream_length: usize,
    pub jfif: Option<JfifHeader>,
    pub comment: Option<String>,
    /// MCUs between restart markers; 0 disables restarts.
    pub restart_interval: u16,
    pub frame: FrameHeader,
    pub quantization_tables: [Option<QuantizationTable>; 4],
    pub dc_tables: [Option<HuffmanTable>; 4],
    pub ac_tables: [Option<HuffmanTable>; 4],
}

impl JpegHeader {
    pub fn width(&self) -> u16 {
        self.frame.width
    }

    pub fn height(&self) -> u16 {
        self.frame.height
    }

    pub fn component_count(&self) -> usize {
        self.frame.components.len()
    }

    pub fn summary(&self) -> Vec<String> {
        let version = self
            .jfif
            .as_ref()
            .map_or("unknown".to_string(), |j| format!("{}.{:02}", j.version.0, j.version.1));
        let mut lines = vec![
            format!("Format: JPEG, version {version}"),
            format!("Size: {} bytes", self.stream_length),
            format!("Dimensions: {} x {}", self.frame.width, self.frame.height),
            format!("Width: {} px", self.frame.width),
            format!("Height: {} px", self.frame.height),
            format!("Bit depth: {}", self.frame.precision),
            format!("Components: {}", self.component_count()),
        ];
        if let Some(jfif) = &self.jfif {
            lines.push(format!("X Density: {}{}", jfif.x_density, jfif.units.suffix()));
            lines.push(format!("Y Density: {}{}", jfif.y_density, jfif.units.suffix()));
        }
        if self.restart_interval > 0 {
            lines.push(format!("Restart interval: {} MCUs", self.restart_interval));
        }
        lines.push(format!(
            "Comments: {}",
            self.comment.as_deref().unwrap_or("")
        ));
        lines
    }
}

/// What the caller should do after a segment was consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    Continue,
    StartOfScan(ScanHeader),
    EndOfImage,
}

/// Reads big-endian fields out of one segment payload.
///
/// Running past the payload is reported as an inconsistent segment length.
struct SegmentReader<'a> {
    payload: ByteCursor<'a>,
    position: usize,
    segment_offset: usize,
}

impl<'a> SegmentReader<'a> {
    fn new(segment: &MarkerSegment<'a>) -> Self {
        Self {
            payload: ByteCursor::new(segment.payload),
            position: 0,
            segment_offset: segment.offset,
        }
    }

    fn remaining(&self) -> usize {
        self.payload.len() - self.position
    }

    fn length_error(&self) -> DecodeError {
        DecodeError::malformed(self.segment_offset, MalformedCheck::SegmentLength)
    }

    fn malformed(&self, check: MalformedCheck) -> DecodeError {
        DecodeError::malformed(self.segment_offset, check)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let value = self.payload.at(self.position).map_err(|_| self.length_error())?;
        self.position += 1;
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let value = self.payload.u16be(self.position).map_err(|_| self.length_error())?;
        self.position += 2;
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self
            .payload
            .slice(self.position, len)
            .map_err(|_| self.length_error())?;
        self.position += len;
        Ok(bytes)
    }

    fn expect_exhausted(&self) -> Result<(), DecodeError> {
        if self.remaining() != 0 {
            return Err(self.length_error());
        }
        Ok(())
    }
}

/// Incrementally builds a [`JpegHeader`] from marker segments.
///
/// Table segments may appear in any order; SOF must precede SOS.
#[derive(Debug, Default)]
pub struct JpegHeaderAssembler {
    stream_length: usize,
    jfif: Option<JfifHeader>,
    comment: Option<String>,
    restart_interval: u16,
    frame: Option<FrameHeader>,
    quantization_tables: [Option<QuantizationTable>; 4],
    dc_tables: [Option<HuffmanTable>; 4],
    ac_tables: [Option<HuffmanTable>; 4],
}

impl JpegHeaderAssembler {
    pub fn new(stream_length: usize) -> Self {
        Self {
            stream_length,
            ..Self::default()
        }
    }

    pub fn frame(&self) -> Result<&FrameHeader, DecodeError> {
        self.frame.as_ref().ok_or(DecodeError::MissingMarker(
            JpegMarkerCode::StartOfFrameBaseline as u8,
        ))
    }

    pub fn restart_interval(&self) -> u16 {
        self.restart_interval
    }

    pub fn quantization_table(&self, index: u8) -> Option<&QuantizationTable> {
        self.quantization_tables.get(index as usize)?.as_ref()
    }

    pub fn huffman_table(&self, class: TableClass, index: u8) -> Option<&HuffmanTable> {
        let tables = match class {
            TableClass::Dc => &self.dc_tables,
            TableClass::Ac => &self.ac_tables,
        };
        tables.get(index as usize)?.as_ref()
    }

    /// Snapshot of the header assembled so far; requires a frame.
    pub fn header(&self) -> Result<JpegHeader, DecodeError> {
        Ok(JpegHeader {
            stream_length: self.stream_length,
            jfif: self.jfif.clone(),
            comment: self.comment.clone(),
            restart_interval: self.restart_interval,
            frame: self.frame()?.clone(),
            quantization_tables: self.quantization_tables.clone(),
            dc_tables: self.dc_tables.clone(),
            ac_tables: self.ac_tables.clone(),
        })
    }

    pub fn consume(&mut self, segment: &MarkerSegment<'_>) -> Result<SegmentOutcome, DecodeError> {
        let code = segment.code;
        if JpegMarkerCode::is_start_of_frame(code) {
            self.read_start_of_frame(segment)?;
            return Ok(SegmentOutcome::Continue);
        }
        match segment.marker() {
            Some(JpegMarkerCode::StartOfImage) => {
                return Err(DecodeError::malformed(
                    segment.offset,
                    MalformedCheck::DuplicateMarker,
                ));
            }
            Some(JpegMarkerCode::EndOfImage) => return Ok(SegmentOutcome::EndOfImage),
            Some(JpegMarkerCode::StartOfScan) => {
                return Ok(SegmentOutcome::StartOfScan(self.read_start_of_scan(segment)?));
            }
            Some(JpegMarkerCode::ApplicationData0) => self.read_app0(segment)?,
            Some(JpegMarkerCode::Comment) => self.read_comment(segment),
            Some(JpegMarkerCode::DefineQuantizationTable) => self.read_dqt(segment)?,
            Some(JpegMarkerCode::DefineHuffmanTable) => self.read_dht(segment)?,
            Some(JpegMarkerCode::DefineRestartInterval) => self.read_dri(segment)?,
            _ if JpegMarkerCode::is_restart(code) => {
                return Err(DecodeError::malformed(
                    segment.offset,
                    MalformedCheck::MarkerOrder,
                ));
            }
            _ => {
                debug!(marker = code, length = segment.length, "skipping segment");
            }
        }
        Ok(SegmentOutcome::Continue)
    }

    fn read_app0(&mut self, segment: &MarkerSegment<'_>) -> Result<(), DecodeError> {
        if !segment.payload.starts_with(&JFIF_IDENTIFIER)
            || segment.payload.len() < JFIF_FIXED_PAYLOAD_SIZE
        {
            warn!(offset = segment.offset, "ignoring APP0 segment without JFIF identifier");
            return Ok(());
        }
        if self.jfif.is_some() {
            debug!(offset = segment.offset, "ignoring repeated JFIF segment");
            return Ok(());
        }

        let mut reader = SegmentReader::new(segment);
        reader.read_bytes(JFIF_IDENTIFIER.len())?;
        let version = (reader.read_u8()?, reader.read_u8()?);
        let units_code = reader.read_u8()?;
        let units = DensityUnits::try_from(units_code).unwrap_or_else(|_| {
            warn!(units = units_code, "unknown JFIF density units");
            DensityUnits::AspectRatio
        });
        let x_density = reader.read_u16()?;
        let y_density = reader.read_u16()?;
        let thumbnail_width = reader.read_u8()?;
        let thumbnail_height = reader.read_u8()?;

        let thumbnail = if thumbnail_width != 0 && thumbnail_height != 0 {
            let len = 3 * thumbnail_width as usize * thumbnail_height as usize;
            let bytes = reader
                .read_bytes(len)
                .map_err(|_| reader.malformed(MalformedCheck::Thumbnail))?;
            let mut image = RasterImage::new(thumbnail_width as u32, thumbnail_height as u32);
            for (pixel, rgb) in image.pixels.iter_mut().zip(bytes.chunks_exact(3)) {
                *pixel = rgb_to_u32(rgb[0], rgb[1], rgb[2]);
            }
            Some(image)
        } else {
            None
        };

        debug!(
            version = ?version,
            units = ?units,
            x_density,
            y_density,
            thumbnail_width,
            thumbnail_height,
            "read JFIF segment"
        );
        self.jfif = Some(JfifHeader {
            version,
            units,
            x_density,
            y_density,
            thumbnail_width,
            thumbnail_height,
            thumbnail,
        });
        Ok(())
    }

    fn read_comment(&mut self, segment: &MarkerSegment<'_>) {
        let text: String = segment.payload.iter().map(|&b| b as char).collect();
        debug!(length = text.len(), "read comment");
        match &mut self.comment {
            Some(comment) => {
                comment.push('\n');
                comment.push_str(&text);
            }
            None => self.comment = Some(text),
        }
    }

    fn read_dqt(&mut self, segment: &MarkerSegment<'_>) -> Result<(), DecodeError> {
        let mut reader = SegmentReader::new(segment);
        while reader.remaining() > 0 {
            let pq_tq = reader.read_u8()?;
            let precision = pq_tq >> 4;
            let index = (pq_tq & 0x0F) as usize;
            if index > MAXIMUM_TABLE_INDEX || precision > 1 {
                return Err(reader.malformed(MalformedCheck::TableSelector));
            }
            let mut zigzag = [0u16; BLOCK_DIM];
            for value in zigzag.iter_mut() {
                *value = if precision == 0 {
                    reader.read_u8()? as u16
                } else {
                    reader.read_u16()?
                };
            }
            debug!(index, precision, "read quantization table");
            self.quantization_tables[index] = Some(QuantizationTable::from_zigzag(precision, &zigzag));
        }
        Ok(())
    }

    fn read_dht(&mut self, segment: &MarkerSegment<'_>) -> Result<(), DecodeError> {
        let mut reader = SegmentReader::new(segment);
        while reader.remaining() > 0 {
            let tc_th = reader.read_u8()?;
            let class = match tc_th >> 4 {
                0 => TableClass::Dc,
                1 => TableClass::Ac,
                _ => return Err(reader.malformed(MalformedCheck::TableSelector)),
            };
            let index = (tc_th & 0x0F) as usize;
            if index > MAXIMUM_TABLE_INDEX {
                return Err(reader.malformed(MalformedCheck::TableSelector));
            }

            let mut counts = [0u8; MAXIMUM_HUFFMAN_CODE_LENGTH];
            counts.copy_from_slice(reader.read_bytes(MAXIMUM_HUFFMAN_CODE_LENGTH)?);
            let symbol_count: usize = counts.iter().map(|&c| c as usize).sum();
            let symbols = reader.read_bytes(symbol_count)?;

            let table = HuffmanTable::build(&counts, symbols).map_err(|check| reader.malformed(check))?;
            debug!(?class, index, symbol_count, "read Huffman table");
            match class {
                TableClass::Dc => self.dc_tables[index] = Some(table),
                TableClass::Ac => self.ac_tables[index] = Some(table),
            }
        }
        Ok(())
    }

    fn read_dri(&mut self, segment: &MarkerSegment<'_>) -> Result<(), DecodeError> {
        let mut reader = SegmentReader::new(segment);
        self.restart_interval = reader.read_u16()?;
        reader.expect_exhausted()?;
        debug!(restart_interval = self.restart_interval, "read restart interval");
        Ok(())
    }

    fn read_start_of_frame(&mut self, segment: &MarkerSegment<'_>) -> Result<(), DecodeError> {
        if self.frame.is_some() {
            return Err(DecodeError::malformed(
                segment.offset,
                MalformedCheck::DuplicateMarker,
            ));
        }
        let code = segment.code;
        if code != JpegMarkerCode::StartOfFrameBaseline as u8
            && code != JpegMarkerCode::StartOfFrameExtendedSequential as u8
        {
            return Err(DecodeError::UnsupportedCompression(Unsupported::JpegProcess(code)));
        }

        let mut reader = SegmentReader::new(segment);
        let precision = reader.read_u8()?;
        let height = reader.read_u16()?;
        let width = reader.read_u16()?;
        let component_count = reader.read_u8()? as usize;

        if precision != 8 {
            return Err(DecodeError::UnsupportedCompression(
                Unsupported::SamplePrecision(precision),
            ));
        }
        if width == 0 || height == 0 {
            return Err(reader.malformed(MalformedCheck::Dimensions));
        }
        if component_count == 0 || component_count > MAXIMUM_COMPONENT_COUNT {
            return Err(reader.malformed(MalformedCheck::ComponentCount));
        }
        if reader.remaining() != 3 * component_count {
            return Err(reader.length_error());
        }

        let mut components: Vec<FrameComponent> = Vec::with_capacity(component_count);
        for _ in 0..component_count {
            let id = reader.read_u8()?;
            let sampling = reader.read_u8()?;
            let quantization_table = reader.read_u8()?;
            let horizontal_sampling = sampling >> 4;
            let vertical_sampling = sampling & 0x0F;
            if !(1..=MAXIMUM_SAMPLING_FACTOR).contains(&horizontal_sampling)
                || !(1..=MAXIMUM_SAMPLING_FACTOR).contains(&vertical_sampling)
            {
                return Err(reader.malformed(MalformedCheck::SamplingFactor));
            }
            if quantization_table as usize > MAXIMUM_TABLE_INDEX {
                return Err(reader.malformed(MalformedCheck::TableSelector));
            }
            if components.iter().any(|c| c.id == id) {
                return Err(reader.malformed(MalformedCheck::DuplicateComponent));
            }
            components.push(FrameComponent {
                id,
                horizontal_sampling,
                vertical_sampling,
                quantization_table,
            });
        }

        let max_horizontal_sampling = components
            .iter()
            .map(|c| c.horizontal_sampling)
            .max()
            .unwrap_or(1);
        let max_vertical_sampling = components
            .iter()
            .map(|c| c.vertical_sampling)
            .max()
            .unwrap_or(1);

        debug!(
            marker = code,
            width,
            height,
            component_count,
            max_horizontal_sampling,
            max_vertical_sampling,
            "read start of frame"
        );
        self.frame = Some(FrameHeader {
            marker: code,
            precision,
            height,
            width,
            components,
            max_horizontal_sampling,
            max_vertical_sampling,
        });
        Ok(())
    }

    fn read_start_of_scan(&mut self, segment: &MarkerSegment<'_>) -> Result<ScanHeader, DecodeError> {
        let frame = self.frame()?;
        let mut reader = SegmentReader::new(segment);
        let component_count = reader.read_u8()? as usize;
        if component_count == 0 || component_count > MAXIMUM_COMPONENT_COUNT {
            return Err(reader.malformed(MalformedCheck::ComponentCount));
        }
        if reader.remaining() != 2 * component_count + 3 {
            return Err(reader.length_error());
        }

        let mut components: Vec<ScanComponent> = Vec::with_capacity(component_count);
        for _ in 0..component_count {
            let id = reader.read_u8()?;
            let selector = reader.read_u8()?;
            let component_index = frame
                .components
                .iter()
                .position(|c| c.id == id)
                .ok_or(reader.malformed(MalformedCheck::UnknownComponent))?;
            if components.iter().any(|c| c.component_index == component_index) {
                return Err(reader.malformed(MalformedCheck::DuplicateComponent));
            }
            let dc_table = selector >> 4;
            let ac_table = selector & 0x0F;
            if dc_table as usize > MAXIMUM_TABLE_INDEX || ac_table as usize > MAXIMUM_TABLE_INDEX {
                return Err(reader.malformed(MalformedCheck::TableSelector));
            }
            components.push(ScanComponent {
                component_index,
                dc_table,
                ac_table,
            });
        }
        let spectral_start = reader.read_u8()?;
        let spectral_end = reader.read_u8()?;
        let approximation = reader.read_u8()?;

        if spectral_start != 0 || spectral_end != 63 || approximation != 0 {
            return Err(DecodeError::UnsupportedCompression(Unsupported::ProgressiveScan));
        }
        if component_count > 1 {
            let blocks_per_mcu: usize = components
                .iter()
                .map(|c| {
                    let component = &frame.components[c.component_index];
                    component.horizontal_sampling as usize * component.vertical_sampling as usize
                })
                .sum();
            if blocks_per_mcu > 10 {
                return Err(reader.malformed(MalformedCheck::SamplingFactor));
            }
        }
        for scan_component in &components {
            let component = &frame.components[scan_component.component_index];
            if self.quantization_table(component.quantization_table).is_none()
                || self.huffman_table(TableClass::Dc, scan_component.dc_table).is_none()
                || self.huffman_table(TableClass::Ac, scan_component.ac_table).is_none()
            {
                return Err(reader.malformed(MalformedCheck::UndefinedTable));
            }
        }

        debug!(component_count, offset = segment.offset, "read start of scan");
        Ok(ScanHeader {
            components,
            spectral_start,
            spectral_end,
            approximation_high: approximation >> 4,
            approximation_low: approximation & 0x0F,
            data_offset: segment.end_offset(),
        })
    }
}

/// Consumes header segments up to the first SOS (or EOI / end of data).
///
/// Returns the assembler together with the first scan, if there is one.
pub fn read_header(
    scanner: &mut MarkerScanner<'_>,
) -> Result<(JpegHeaderAssembler, Option<ScanHeader>), DecodeError> {
    let mut assembler = JpegHeaderAssembler::new(scanner.stream_length());
    while let Some(segment) = scanner.next_segment()? {
        match assembler.consume(&segment)? {
            SegmentOutcome::Continue => {}
            SegmentOutcome::StartOfScan(scan) => return Ok((assembler, Some(scan))),
            SegmentOutcome::EndOfImage => break,
        }
    }
    assembler.frame()?;
    Ok((assembler, None))
}
