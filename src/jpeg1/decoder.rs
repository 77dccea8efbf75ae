//! Baseline (SOF0/SOF1) JPEG decoding: entropy-coded scans to an RGB raster.

use tracing::{debug, trace, warn};

use crate::ImageDecoder;
use crate::constants::{MAXIMUM_DC_MAGNITUDE, MINIMUM_CODED_BLOCK_BITS};
use crate::error::{DecodeError, MalformedCheck, Unsupported};
use crate::jpeg1::dct::{BLOCK_DIM, BLOCK_SIZE, idct_8x8};
use crate::jpeg1::header::{
    FrameHeader, JpegHeader, JpegHeaderAssembler, ScanHeader, SegmentOutcome, read_header,
};
use crate::jpeg1::huffman::{HuffmanTable, JpegBitReader, TableClass};
use crate::jpeg1::marker_scanner::MarkerScanner;
use crate::jpeg1::quantization::{ZIGZAG_ORDER, dequantize_block};
use crate::jpeg_marker_code::{JPEG_RESTART_MARKER_RANGE, JpegMarkerCode};
use crate::raster::{RasterImage, rgb_to_u32};

/// Decodes a JPEG stream held entirely in memory.
pub struct JpegDecoder<'a> {
    source: &'a [u8],
}

impl<'a> JpegDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source }
    }
}

impl ImageDecoder for JpegDecoder<'_> {
    type Header = JpegHeader;

    fn read_header(&mut self) -> Result<JpegHeader, DecodeError> {
        let mut scanner = MarkerScanner::new(self.source)?;
        let (assembler, _) = read_header(&mut scanner)?;
        assembler.header()
    }

    fn decode(&mut self) -> Result<(JpegHeader, RasterImage), DecodeError> {
        let mut scanner = MarkerScanner::new(self.source)?;
        let mut assembler = JpegHeaderAssembler::new(scanner.stream_length());
        let mut planes: Option<ComponentPlanes> = None;

        while let Some(segment) = scanner.next_segment()? {
            let scan = match assembler.consume(&segment)? {
                SegmentOutcome::Continue => continue,
                SegmentOutcome::EndOfImage => {
                    let trailing = scanner.stream_length() - scanner.position();
                    if trailing > 0 {
                        warn!(trailing, "ignoring bytes after end of image");
                    }
                    break;
                }
                SegmentOutcome::StartOfScan(scan) => scan,
            };
            let target = match planes {
                Some(ref mut existing) => existing,
                None => planes.insert(ComponentPlanes::new(
                    assembler.frame()?,
                    &self.source[scan.data_offset.min(self.source.len())..],
                    scan.data_offset,
                )?),
            };
            let end = decode_scan(self.source, &assembler, &scan, target)?;
            scanner.seek(end);
        }

        let Some(planes) = planes else {
            assembler.frame()?;
            return Err(DecodeError::MissingMarker(JpegMarkerCode::StartOfScan as u8));
        };
        if !planes.all_scanned() {
            return Err(DecodeError::malformed(
                scanner.position(),
                MalformedCheck::MissingComponentScan,
            ));
        }

        let header = assembler.header()?;
        let image = planes.to_raster(&header.frame);
        Ok((header, image))
    }
}

/// Sample plane of one component, padded out to whole MCUs.
#[derive(Debug)]
struct Plane {
    width: usize,
    height: usize,
    samples: Vec<u8>,
    horizontal_sampling: usize,
    vertical_sampling: usize,
    scanned: bool,
}

impl Plane {
    fn store_block(&mut self, block_x: usize, block_y: usize, block: &[f32; BLOCK_DIM]) {
        for row in 0..BLOCK_SIZE {
            let y = block_y * BLOCK_SIZE + row;
            if y >= self.height {
                break;
            }
            let start = y * self.width + block_x * BLOCK_SIZE;
            let Some(line) = self.samples.get_mut(start..start + BLOCK_SIZE) else {
                break;
            };
            for (sample, value) in line.iter_mut().zip(&block[row * BLOCK_SIZE..]) {
                *sample = (value + 128.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    fn sample(&self, x: usize, y: usize) -> u8 {
        self.samples[y * self.width + x]
    }
}

#[derive(Debug)]
struct ComponentPlanes {
    planes: Vec<Plane>,
}

impl ComponentPlanes {
    /// Allocates one plane per frame component.
    ///
    /// `entropy_data` is everything from the first scan's data onwards. Every
    /// component has to be coded somewhere in it, so a frame whose blocks
    /// cannot fit is rejected before anything is allocated.
    fn new(
        frame: &FrameHeader,
        entropy_data: &[u8],
        data_offset: usize,
    ) -> Result<Self, DecodeError> {
        let count = frame.components.len();
        if count != 1 && count != 3 {
            return Err(DecodeError::UnsupportedCompression(
                Unsupported::ComponentLayout(count),
            ));
        }
        let coded_blocks: usize = frame
            .components
            .iter()
            .map(|component| {
                let (across, down) = frame.component_blocks(component);
                across * down
            })
            .sum();
        let available_bits = entropy_data.len().saturating_mul(8);
        if available_bits / MINIMUM_CODED_BLOCK_BITS < coded_blocks {
            return Err(DecodeError::malformed(
                data_offset,
                MalformedCheck::TruncatedScan,
            ));
        }
        let (mcus_across, mcus_down) = frame.mcu_grid();
        let planes = frame
            .components
            .iter()
            .map(|component| {
                let h = component.horizontal_sampling as usize;
                let v = component.vertical_sampling as usize;
                let width = mcus_across * h * BLOCK_SIZE;
                let height = mcus_down * v * BLOCK_SIZE;
                Plane {
                    width,
                    height,
                    samples: vec![0; width * height],
                    horizontal_sampling: h,
                    vertical_sampling: v,
                    scanned: false,
                }
            })
            .collect();
        Ok(Self { planes })
    }

    fn all_scanned(&self) -> bool {
        self.planes.iter().all(|p| p.scanned)
    }

    /// Upsamples every plane to full resolution and converts to RGB.
    fn to_raster(&self, frame: &FrameHeader) -> RasterImage {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let max_h = frame.max_horizontal_sampling as usize;
        let max_v = frame.max_vertical_sampling as usize;
        let mut image = RasterImage::new(width as u32, height as u32);

        let sample = |plane: &Plane, x: usize, y: usize| {
            plane.sample(
                x * plane.horizontal_sampling / max_h,
                y * plane.vertical_sampling / max_v,
            )
        };

        for y in 0..height {
            for x in 0..width {
                let rgb = match self.planes.as_slice() {
                    [luma] => {
                        let l = sample(luma, x, y);
                        rgb_to_u32(l, l, l)
                    }
                    [luma, cb, cr] => ycbcr_to_rgb(
                        sample(luma, x, y),
                        sample(cb, x, y),
                        sample(cr, x, y),
                    ),
                    _ => 0,
                };
                image.pixels[y * width + x] = rgb;
            }
        }
        image
    }
}

/// JFIF YCbCr to packed RGB.
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> u32 {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    rgb_to_u32(
        clamp(y + 1.402 * cr),
        clamp(y - 0.344_136 * cb - 0.714_136 * cr),
        clamp(y + 1.772 * cb),
    )
}

/// Per-scan-component decoding state.
struct ScanUnit<'t> {
    plane: usize,
    dc_table: &'t HuffmanTable,
    ac_table: &'t HuffmanTable,
    multipliers: [f32; BLOCK_DIM],
    predictor: i32,
}

/// Decodes one scan into `planes` and returns the offset just past its data.
fn decode_scan(
    source: &[u8],
    assembler: &JpegHeaderAssembler,
    scan: &ScanHeader,
    planes: &mut ComponentPlanes,
) -> Result<usize, DecodeError> {
    let frame = assembler.frame()?;
    let undefined = DecodeError::malformed(scan.data_offset, MalformedCheck::UndefinedTable);

    let mut units = Vec::with_capacity(scan.components.len());
    for scan_component in &scan.components {
        let component = &frame.components[scan_component.component_index];
        let quantization = assembler
            .quantization_table(component.quantization_table)
            .ok_or(undefined)?;
        units.push(ScanUnit {
            plane: scan_component.component_index,
            dc_table: assembler
                .huffman_table(TableClass::Dc, scan_component.dc_table)
                .ok_or(undefined)?,
            ac_table: assembler
                .huffman_table(TableClass::Ac, scan_component.ac_table)
                .ok_or(undefined)?,
            multipliers: quantization.idct_multipliers(),
            predictor: 0,
        });
    }

    let interleaved = units.len() > 1;
    let (mcus_across, mcu_count) = if interleaved {
        let (across, down) = frame.mcu_grid();
        (across, across * down)
    } else {
        let component = &frame.components[units[0].plane];
        let (across, down) = frame.component_blocks(component);
        (across, across * down)
    };
    debug!(
        components = units.len(),
        mcus_across,
        mcu_count,
        offset = scan.data_offset,
        "decoding scan"
    );

    let restart_interval = assembler.restart_interval() as usize;
    let mut next_restart = 0u8;
    let mut reader = JpegBitReader::new(source, scan.data_offset);
    let mut coefficients = [0i32; BLOCK_DIM];
    let mut block = [0.0f32; BLOCK_DIM];

    for mcu in 0..mcu_count {
        if restart_interval > 0 && mcu > 0 && mcu % restart_interval == 0 {
            reader.read_restart_marker(next_restart)?;
            trace!(mcu, marker = next_restart, "restart");
            next_restart = (next_restart + 1) % JPEG_RESTART_MARKER_RANGE;
            for unit in &mut units {
                unit.predictor = 0;
            }
        }

        let mcu_x = mcu % mcus_across;
        let mcu_y = mcu / mcus_across;
        for unit in &mut units {
            let plane = &mut planes.planes[unit.plane];
            let (blocks_h, blocks_v) = if interleaved {
                (plane.horizontal_sampling, plane.vertical_sampling)
            } else {
                (1, 1)
            };
            for v in 0..blocks_v {
                for h in 0..blocks_h {
                    decode_block(&mut reader, unit, &mut coefficients)?;
                    dequantize_block(&coefficients, &unit.multipliers, &mut block);
                    idct_8x8(&mut block);
                    plane.store_block(mcu_x * blocks_h + h, mcu_y * blocks_v + v, &block);
                }
            }
        }
    }

    for unit in &units {
        planes.planes[unit.plane].scanned = true;
    }
    reader.align_to_byte();
    Ok(reader.position())
}

/// Huffman-decodes one 8x8 block into natural-order coefficients.
fn decode_block(
    reader: &mut JpegBitReader<'_>,
    unit: &mut ScanUnit<'_>,
    coefficients: &mut [i32; BLOCK_DIM],
) -> Result<(), DecodeError> {
    coefficients.fill(0);

    let overflow = |reader: &JpegBitReader<'_>| {
        DecodeError::malformed(reader.position(), MalformedCheck::CoefficientOverflow)
    };
    let magnitude = unit.dc_table.lookup(reader)?;
    if magnitude > MAXIMUM_DC_MAGNITUDE {
        return Err(overflow(reader));
    }
    let difference = reader.receive_extend(magnitude)?;
    unit.predictor = unit
        .predictor
        .checked_add(difference)
        .ok_or_else(|| overflow(reader))?;
    coefficients[0] = unit.predictor;

    let mut k = 1;
    while k < BLOCK_DIM {
        let symbol = unit.ac_table.lookup(reader)?;
        let run = (symbol >> 4) as usize;
        let size = symbol & 0x0F;
        if size == 0 {
            if run != 15 {
                // EOB
                break;
            }
            k += 16;
            continue;
        }
        k += run;
        if k >= BLOCK_DIM {
            return Err(DecodeError::malformed(
                reader.position(),
                MalformedCheck::CoefficientOverflow,
            ));
        }
        coefficients[ZIGZAG_ORDER[k]] = reader.receive_extend(size)?;
        k += 1;
    }
    if k > BLOCK_DIM {
        return Err(DecodeError::malformed(
            reader.position(),
            MalformedCheck::CoefficientOverflow,
        ));
    }
    Ok(())
}
