// ---------------------------------------------------------------------------
//  System clipboard helpers (OS-level copy/paste via arboard)
// ---------------------------------------------------------------------------

use std::borrow::Cow;

use image::RgbaImage;
use paintring::canvas::PixelSurface;

/// Put a copied selection on the system clipboard.
pub fn copy_to_system_clipboard(surface: &PixelSurface) -> bool {
    let image = surface.as_image();
    let data = arboard::ImageData {
        width: image.width() as usize,
        height: image.height() as usize,
        bytes: Cow::Borrowed(image.as_raw()),
    };
    match arboard::Clipboard::new().and_then(|mut clip| clip.set_image(data)) {
        Ok(()) => {
            log::info!("copied {} to clipboard", surface.size());
            true
        }
        Err(e) => {
            log::warn!("clipboard copy failed: {e}");
            false
        }
    }
}

/// Read an image from the system clipboard. Returns None if nothing usable
/// is there.
///
/// Accepts raw image data, or text that is the path of a PNG file.
pub fn get_from_system_clipboard() -> Option<PixelSurface> {
    let mut clip = match arboard::Clipboard::new() {
        Ok(clip) => clip,
        Err(e) => {
            log::warn!("clipboard unavailable: {e}");
            return None;
        }
    };

    if let Ok(data) = clip.get_image() {
        let image = RgbaImage::from_raw(
            data.width as u32,
            data.height as u32,
            data.bytes.into_owned(),
        )?;
        return match PixelSurface::from_image(image) {
            Ok(surface) => Some(surface),
            Err(e) => {
                log::warn!("clipboard image rejected: {e}");
                None
            }
        };
    }

    let text = clip.get_text().ok()?;
    let path = std::path::Path::new(text.trim());
    if !path.is_file() {
        return None;
    }
    match paintring::io::load_png_file(path) {
        Ok(surface) => Some(surface),
        Err(e) => {
            log::warn!("clipboard path {} is not a PNG: {e}", path.display());
            None
        }
    }
}
