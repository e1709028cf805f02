use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageFormat};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Cursor, Seek, Write};
use std::path::Path;

use crate::canvas::PixelSurface;
use crate::error::IoError;

/// Encode `surface` as an RGBA8 PNG into `writer`.
pub fn encode_png<W: Write>(surface: &PixelSurface, writer: W) -> Result<(), IoError> {
    let image = surface.as_image();
    let encoder = PngEncoder::new(writer);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(())
}

/// Decode a PNG stream into a surface (always converted to RGBA8).
pub fn decode_png<R: BufRead + Seek>(reader: R) -> Result<PixelSurface, IoError> {
    let decoded = image::load(reader, ImageFormat::Png)?;
    Ok(PixelSurface::from_image(decoded.into_rgba8())?)
}

pub fn decode_png_bytes(bytes: &[u8]) -> Result<PixelSurface, IoError> {
    decode_png(Cursor::new(bytes))
}

pub fn save_png_file(surface: &PixelSurface, path: &Path) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_png(surface, &mut writer)?;
    writer.flush()?;
    log::info!("saved {} to {}", surface.size(), path.display());
    Ok(())
}

pub fn load_png_file(path: &Path) -> Result<PixelSurface, IoError> {
    let file = File::open(path)?;
    let surface = decode_png(BufReader::new(file))?;
    log::info!("loaded {} from {}", surface.size(), path.display());
    Ok(surface)
}
