//! rasterdec CLI - decode BMP and baseline JPEG files and inspect their headers.

use clap::{Parser, Subcommand, ValueEnum};
use rasterdec_rs::{ContainerHeader, Effect, ImageFormat, RasterImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Byte-level decoder for BMP and baseline JPEG/JFIF images
#[derive(Parser)]
#[command(name = "rasterdec")]
#[command(version)]
#[command(about = "Decode BMP and baseline JPEG images and inspect their headers", long_about = None)]
#[command(after_help = "EXAMPLES:
    rasterdec decode -i photo.jpg -o photo.png
    rasterdec decode -i scan.bmp -o scan --effect noir
    rasterdec info -i photo.jpg

Set RUST_LOG=rasterdec_rs=debug to trace marker segments and scans.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an image and write it through the image crate
    ///
    /// The output container follows the output extension. Without an
    /// extension the input's own container extension is appended.
    #[command(visible_alias = "d")]
    Decode {
        /// Input file path (BMP or JPEG)
        #[arg(short, long, help = "Path to the input image file")]
        input: PathBuf,

        /// Output file path
        #[arg(short, long, help = "Path for the output file")]
        output: PathBuf,

        /// Effect applied to the decoded pixels
        #[arg(short, long, default_value = "none", value_enum)]
        effect: EffectArg,
    },

    /// Display header fields of an image
    #[command(visible_alias = "i")]
    Info {
        /// Input file path
        #[arg(short, long, help = "Path to the image file to inspect")]
        input: PathBuf,
    },

    /// List supported containers and their limits
    #[command(visible_alias = "l")]
    List,
}

#[derive(Clone, ValueEnum)]
enum EffectArg {
    /// Keep the decoded colors
    None,
    /// Black and white
    Noir,
}

impl From<EffectArg> for Effect {
    fn from(arg: EffectArg) -> Self {
        match arg {
            EffectArg::None => Effect::NoEffect,
            EffectArg::Noir => Effect::Noir,
        }
    }
}

fn main() {
    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            input,
            output,
            effect,
        } => decode_image(&input, &output, effect.into()),
        Commands::Info { input } => show_info(&input),
        Commands::List => list_formats(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn decode_image(input: &Path, output: &Path, effect: Effect) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let (header, mut image) = rasterdec_rs::decode(&data)?;
    image.apply_effect(effect);

    let output = output_path(output, header.format());
    write_image(&output, &image)?;

    println!(
        "✓ Decoded {}x{} {} image to {:?}",
        image.width,
        image.height,
        header.format().extension(),
        output
    );
    Ok(())
}

fn show_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let header = rasterdec_rs::read_header(&data)?;

    println!("File: {:?}", input);
    for line in header.summary() {
        println!("  {line}");
    }
    if let ContainerHeader::Jpeg(jpeg) = &header {
        for (index, component) in jpeg.frame.components.iter().enumerate() {
            println!(
                "  Component {}: id {}, sampling {}x{}, quantization table {}",
                index,
                component.id,
                component.horizontal_sampling,
                component.vertical_sampling,
                component.quantization_table
            );
        }
        if let Some(jfif) = &jpeg.jfif {
            if jfif.thumbnail.is_some() {
                println!(
                    "  Thumbnail: {} x {}",
                    jfif.thumbnail_width, jfif.thumbnail_height
                );
            }
        }
    }
    Ok(())
}

fn list_formats() -> Result<(), Box<dyn std::error::Error>> {
    println!("Supported Containers:");
    println!();
    println!("  BMP (bmp)");
    println!("    Header:   BITMAPINFOHEADER (40 bytes), 1 plane");
    println!("    Pixels:   24-bit uncompressed");
    println!("    Rejected: RLE-8, RLE-4, other bit depths");
    println!();
    println!("  JPEG (jpg)");
    println!("    Standard: ISO/IEC 10918-1 / ITU-T T.81, JFIF APP0");
    println!("    Modes:    Baseline (SOF0), Extended sequential 8-bit (SOF1)");
    println!("    Colors:   Grayscale, YCbCr with any sampling factors");
    println!("    Rejected: Progressive, Lossless, Arithmetic, Hierarchical");
    println!();
    Ok(())
}

// Internal helpers

/// Appends the source container's extension when `output` has none.
fn output_path(output: &Path, format: ImageFormat) -> PathBuf {
    if output.extension().is_some() {
        output.to_path_buf()
    } else {
        output.with_extension(format.extension())
    }
}

fn write_image(output: &Path, image: &RasterImage) -> Result<(), Box<dyn std::error::Error>> {
    let buffer = image::RgbImage::from_raw(image.width, image.height, image.to_rgb_bytes())
        .ok_or("raster size does not match its dimensions")?;
    buffer.save(output)?;
    Ok(())
}
