mod common;

use common::{BitWriter, BlockEncoder, JpegStreamBuilder, block, reference_samples};
use rasterdec_rs::raster::rgb_to_u32;
use rasterdec_rs::{
    ContainerHeader, DecodeError, ImageDecoder, JpegDecoder, MalformedCheck, Unsupported,
};
use test_log::test;

fn gray_frame(width: u16, height: u16, step: u8) -> JpegStreamBuilder {
    JpegStreamBuilder::new()
        .jfif(None)
        .flat_dqt(0, step)
        .coding_tables(0)
        .sof(0xC0, width, height, &[(1, 0x11, 0)])
}

fn encode_blocks(blocks: &[[i32; 64]]) -> Vec<u8> {
    let mut encoder = BlockEncoder::new();
    let mut writer = BitWriter::default();
    for b in blocks {
        encoder.encode(&mut writer, b);
    }
    writer.finish()
}

#[test]
fn test_header_only_stream() -> Result<(), DecodeError> {
    let data = JpegStreamBuilder::new()
        .jfif(None)
        .sof(0xC0, 8, 8, &[(1, 0x11, 0)])
        .eoi();
    let header = JpegDecoder::new(&data).read_header()?;
    assert_eq!(header.width(), 8);
    assert_eq!(header.height(), 8);
    assert_eq!(header.component_count(), 1);
    assert_eq!(header.frame.max_horizontal_sampling, 1);

    let summary = ContainerHeader::Jpeg(header).summary();
    assert_eq!(summary[0], "Format: JPEG, version 1.02");
    assert!(summary.contains(&format!("Size: {} bytes", data.len())));
    Ok(())
}

#[test]
fn test_dc_only_grayscale() -> Result<(), DecodeError> {
    // 80 * 1 / 8 = 10 above mid-gray.
    let data = gray_frame(8, 8, 1)
        .sos(&[(1, 0x00)])
        .entropy(&encode_blocks(&[block(80, &[])]))
        .eoi();
    let (header, image) = JpegDecoder::new(&data).decode()?;
    assert_eq!(header.width(), 8);
    assert_eq!((image.width, image.height), (8, 8));
    assert!(image.pixels.iter().all(|&p| p == rgb_to_u32(138, 138, 138)));
    Ok(())
}

#[test]
fn test_ac_coefficients_match_reference_idct() -> Result<(), DecodeError> {
    // Index 40 forces two ZRL symbols.
    let coefficients = block(40, &[(1, 10), (2, -5), (5, 3), (40, -2), (63, 1)]);
    let data = gray_frame(8, 8, 2)
        .sos(&[(1, 0x00)])
        .entropy(&encode_blocks(&[coefficients]))
        .eoi();
    let (_, image) = JpegDecoder::new(&data).decode()?;

    let expected = reference_samples(&coefficients, 2);
    for (i, &pixel) in image.pixels.iter().enumerate() {
        let (r, g, b) = rasterdec_rs::raster::u32_to_rgb(pixel);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!(
            (r as i32 - expected[i] as i32).abs() <= 1,
            "sample {i}: {r} vs {}",
            expected[i]
        );
    }
    Ok(())
}

#[test]
fn test_partial_blocks_are_cropped() -> Result<(), DecodeError> {
    let data = gray_frame(10, 3, 1)
        .sos(&[(1, 0x00)])
        .entropy(&encode_blocks(&[block(80, &[]), block(-80, &[])]))
        .eoi();
    let (_, image) = JpegDecoder::new(&data).decode()?;
    assert_eq!((image.width, image.height), (10, 3));
    assert_eq!(image.pixel(7, 2), rgb_to_u32(138, 138, 138));
    assert_eq!(image.pixel(8, 0), rgb_to_u32(118, 118, 118));
    assert_eq!(image.pixel(9, 2), rgb_to_u32(118, 118, 118));
    Ok(())
}

#[test]
fn test_color_420_interleaved() -> Result<(), DecodeError> {
    let mut encoder_y = BlockEncoder::new();
    let mut encoder_cb = BlockEncoder::new();
    let mut encoder_cr = BlockEncoder::new();
    let mut writer = BitWriter::default();
    // One MCU: four luma blocks then Cb and Cr.
    for _ in 0..4 {
        encoder_y.encode(&mut writer, &block(-224, &[]));
    }
    encoder_cb.encode(&mut writer, &block(0, &[]));
    encoder_cr.encode(&mut writer, &block(80, &[]));

    let data = JpegStreamBuilder::new()
        .jfif(None)
        .flat_dqt(0, 1)
        .coding_tables(0)
        .sof(0xC0, 16, 16, &[(1, 0x22, 0), (2, 0x11, 0), (3, 0x11, 0)])
        .sos(&[(1, 0x00), (2, 0x00), (3, 0x00)])
        .entropy(&writer.finish())
        .eoi();
    let (header, image) = JpegDecoder::new(&data).decode()?;
    assert_eq!(header.frame.max_horizontal_sampling, 2);
    assert_eq!(header.frame.mcu_grid(), (1, 1));
    // Y = 100, Cb = 128, Cr = 138.
    let expected = rgb_to_u32(114, 93, 100);
    assert!(image.pixels.iter().all(|&p| p == expected), "{:06X}", image.pixels[0]);
    Ok(())
}

#[test]
fn test_non_interleaved_scans_with_table_between() -> Result<(), DecodeError> {
    let scan = |dc: i32| encode_blocks(&[block(dc, &[])]);
    let data = JpegStreamBuilder::new()
        .flat_dqt(0, 1)
        .coding_tables(0)
        .sof(0xC1, 8, 8, &[(1, 0x11, 0), (2, 0x11, 1), (3, 0x11, 1)])
        .sos(&[(1, 0x00)])
        .entropy(&scan(-224))
        .flat_dqt(1, 1)
        .sos(&[(2, 0x00)])
        .entropy(&scan(0))
        .coding_tables(2)
        .sos(&[(3, 0x22)])
        .entropy(&scan(80))
        .eoi();

    // Table 1 is defined only after the first scan.
    let (_, image) = JpegDecoder::new(&data).decode()?;
    assert!(image.pixels.iter().all(|&p| p == rgb_to_u32(114, 93, 100)));
    Ok(())
}

#[test]
fn test_missing_component_scan() {
    let data = JpegStreamBuilder::new()
        .flat_dqt(0, 1)
        .coding_tables(0)
        .sof(0xC0, 8, 8, &[(1, 0x11, 0), (2, 0x11, 0), (3, 0x11, 0)])
        .sos(&[(1, 0x00)])
        .entropy(&encode_blocks(&[block(0, &[])]))
        .eoi();
    assert!(matches!(
        JpegDecoder::new(&data).decode(),
        Err(DecodeError::Malformed {
            check: MalformedCheck::MissingComponentScan,
            ..
        })
    ));
}

#[test]
fn test_restart_interval_resets_predictor() -> Result<(), DecodeError> {
    let mut encoder = BlockEncoder::new();
    let mut writer = BitWriter::default();
    encoder.encode(&mut writer, &block(80, &[]));
    let first = writer.take();
    encoder.predictor = 0;
    encoder.encode(&mut writer, &block(-80, &[]));
    let second = writer.take();

    let data = gray_frame(16, 8, 1)
        .dri(1)
        .sos(&[(1, 0x00)])
        .entropy(&first)
        .marker(0xD0)
        .entropy(&second)
        .eoi();
    let (header, image) = JpegDecoder::new(&data).decode()?;
    assert_eq!(header.restart_interval, 1);
    assert_eq!(image.pixel(0, 0), rgb_to_u32(138, 138, 138));
    assert_eq!(image.pixel(15, 7), rgb_to_u32(118, 118, 118));

    // RST1 where RST0 is due.
    let data = gray_frame(16, 8, 1)
        .dri(1)
        .sos(&[(1, 0x00)])
        .entropy(&first)
        .marker(0xD1)
        .entropy(&second)
        .eoi();
    assert!(matches!(
        JpegDecoder::new(&data).decode(),
        Err(DecodeError::Malformed {
            check: MalformedCheck::RestartMarker,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_jfif_thumbnail_and_comments() -> Result<(), DecodeError> {
    let thumbnail: [u8; 6] = [255, 0, 0, 0, 255, 0];
    let data = JpegStreamBuilder::new()
        .jfif(Some((1, 2, &thumbnail[..])))
        .comment("first")
        .comment("second")
        .flat_dqt(0, 1)
        .coding_tables(0)
        .sof(0xC0, 8, 8, &[(1, 0x11, 0)])
        .sos(&[(1, 0x00)])
        .entropy(&encode_blocks(&[block(0, &[])]))
        .eoi();
    let (header, image) = rasterdec_rs::decode(&data)?;
    assert_eq!(image.pixel(3, 3), rgb_to_u32(128, 128, 128));

    let ContainerHeader::Jpeg(header) = header else {
        panic!("expected a JPEG header");
    };
    assert_eq!(header.comment.as_deref(), Some("first\nsecond"));
    let jfif = header.jfif.unwrap();
    let thumbnail = jfif.thumbnail.unwrap();
    assert_eq!((thumbnail.width, thumbnail.height), (1, 2));
    assert_eq!(thumbnail.pixels, vec![0x00FF_0000, 0x0000_FF00]);
    Ok(())
}

#[test]
fn test_missing_scan() {
    let data = gray_frame(8, 8, 1).eoi();
    assert_eq!(
        JpegDecoder::new(&data).decode().err(),
        Some(DecodeError::MissingMarker(0xDA))
    );

    let data = JpegStreamBuilder::new().jfif(None).eoi();
    assert_eq!(
        JpegDecoder::new(&data).decode().err(),
        Some(DecodeError::MissingMarker(0xC0))
    );
}

#[test]
fn test_progressive_is_unsupported() {
    let data = JpegStreamBuilder::new()
        .sof(0xC2, 8, 8, &[(1, 0x11, 0)])
        .eoi();
    assert_eq!(
        JpegDecoder::new(&data).decode().err(),
        Some(DecodeError::UnsupportedCompression(Unsupported::JpegProcess(0xC2)))
    );

    let data = gray_frame(8, 8, 1)
        .sos_with_spectral(&[(1, 0x00)], 0, 0, 0)
        .eoi();
    assert_eq!(
        JpegDecoder::new(&data).decode().err(),
        Some(DecodeError::UnsupportedCompression(Unsupported::ProgressiveScan))
    );
}

#[test]
fn test_two_component_frame_is_unsupported() {
    let data = JpegStreamBuilder::new()
        .flat_dqt(0, 1)
        .coding_tables(0)
        .sof(0xC0, 8, 8, &[(1, 0x11, 0), (2, 0x11, 0)])
        .sos(&[(1, 0x00), (2, 0x00)])
        .eoi();
    assert_eq!(
        JpegDecoder::new(&data).decode().err(),
        Some(DecodeError::UnsupportedCompression(Unsupported::ComponentLayout(2)))
    );
}

#[test]
fn test_truncated_scan() {
    let data = gray_frame(8, 8, 1).sos(&[(1, 0x00)]).eoi();
    let eoi_offset = data.len() - 2;
    assert_eq!(
        JpegDecoder::new(&data).decode().err(),
        Some(DecodeError::Malformed {
            offset: eoi_offset,
            check: MalformedCheck::TruncatedScan
        })
    );
}

#[test]
fn test_invalid_code() {
    // 0b1111 is not one of the twelve 4-bit DC codes.
    let data = gray_frame(8, 8, 1)
        .sos(&[(1, 0x00)])
        .entropy(&[0xF0, 0x00, 0x00])
        .eoi();
    assert!(matches!(
        JpegDecoder::new(&data).decode(),
        Err(DecodeError::InvalidCode { .. })
    ));
}

#[test]
fn test_oversized_frame_with_tiny_scan() {
    let entropy = encode_blocks(&[block(0, &[]); 3]);
    let data = JpegStreamBuilder::new()
        .flat_dqt(0, 1)
        .coding_tables(0)
        .sof(
            0xC0,
            u16::MAX,
            u16::MAX,
            &[(1, 0x11, 0), (2, 0x11, 0), (3, 0x11, 0)],
        )
        .sos(&[(1, 0x00), (2, 0x00), (3, 0x00)])
        .entropy(&entropy)
        .eoi();
    let scan_data_offset = data.len() - 2 - entropy.len();
    assert_eq!(
        JpegDecoder::new(&data).decode().err(),
        Some(DecodeError::Malformed {
            offset: scan_data_offset,
            check: MalformedCheck::TruncatedScan
        })
    );
}

#[test]
fn test_saturated_dc_stream_fails_cleanly() {
    // Every block codes the largest 15-bit DC difference, which 8-bit data never needs.
    let mut counts = vec![0u8; 16];
    counts[0] = 1;
    let mut entropy = vec![0u8; 16];
    entropy[..2].copy_from_slice(&[0x7F, 0xFE]);
    let data = JpegStreamBuilder::new()
        .flat_dqt(0, 1)
        .dht(0, 0, &(counts.clone(), vec![15]))
        .dht(1, 0, &(counts, vec![0x00]))
        .sof(0xC0, 64, 64, &[(1, 0x11, 0)])
        .sos(&[(1, 0x00)])
        .entropy(&entropy)
        .eoi();
    assert!(matches!(
        JpegDecoder::new(&data).decode(),
        Err(DecodeError::Malformed {
            check: MalformedCheck::CoefficientOverflow,
            ..
        })
    ));
}
