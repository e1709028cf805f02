use std::fmt;

use bytemuck::{Pod, Zeroable};
use image::{Rgba, RgbaImage};

use crate::error::SurfaceError;

/// Largest edge a surface may have, matching common GPU texture limits.
pub const MAX_SURFACE_DIM: u32 = 16_384;

/// Sanity cap on total pixel count (~1 GB of RGBA).
const MAX_SURFACE_PIXELS: u64 = 256_000_000;

// ============================================================================
// COLOR
// ============================================================================

/// 8-bit-per-channel straight-alpha RGBA color.
///
/// `#[repr(C)]` + `Pod` so a surface's raw byte buffer can be viewed as
/// `&[Color]` without copying.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const BROWN: Color = Color::rgb(165, 42, 42);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const PURPLE: Color = Color::rgb(128, 0, 128);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const DARK_GRAY: Color = Color::rgb(169, 169, 169);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Composite `self` over `dst` (Porter-Duff source-over, straight alpha).
    #[inline]
    pub fn over(self, dst: Color) -> Color {
        let sa = self.a as u32;
        if sa == 255 {
            return self;
        }
        if sa == 0 {
            return dst;
        }
        let da = dst.a as u32 * (255 - sa) / 255;
        let out_a = sa + da;
        let mix = |s: u8, d: u8| ((s as u32 * sa + d as u32 * da + out_a / 2) / out_a) as u8;
        Color {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: out_a as u8,
        }
    }
}

impl From<Rgba<u8>> for Color {
    fn from(p: Rgba<u8>) -> Self {
        Color::rgba(p[0], p[1], p[2], p[3])
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba([c.r, c.g, c.b, c.a])
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Pointer position in canvas pixel space (sub-pixel precision).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Integer pixel containing this point.
    pub fn floor(self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Elementwise maximum, used to grow a canvas to fit incoming content.
    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }

    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer rectangle; `x`/`y` may be negative before clipping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Smallest rect covering both inclusive corner pixels, in any order.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let (min_x, max_x) = (x0.min(x1), x0.max(x1));
        let (min_y, max_y) = (y0.min(y1), y0.max(y1));
        Self::new(
            min_x,
            min_y,
            (max_x - min_x) as u32 + 1,
            (max_y - min_y) as u32 + 1,
        )
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    pub fn union(&self, other: &PixelRect) -> PixelRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        PixelRect::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

// ============================================================================
// PIXEL SURFACE
// ============================================================================

fn validate_size(size: Size) -> Result<(), SurfaceError> {
    if size.is_empty() {
        return Err(SurfaceError::ZeroSized(size));
    }
    if size.width > MAX_SURFACE_DIM
        || size.height > MAX_SURFACE_DIM
        || (size.width as u64) * (size.height as u64) > MAX_SURFACE_PIXELS
    {
        return Err(SurfaceError::TooLarge {
            size,
            limit: MAX_SURFACE_DIM,
        });
    }
    Ok(())
}

/// A fixed-size RGBA pixel buffer.
///
/// Pixels are only ever changed through a [`DrawingSession`] or one of the
/// bulk operations below; the size never changes after creation.
#[derive(Clone)]
pub struct PixelSurface {
    image: RgbaImage,
}

impl fmt::Debug for PixelSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelSurface")
            .field("size", &self.size())
            .finish()
    }
}

impl PixelSurface {
    /// Allocate a fully transparent surface.
    ///
    /// Allocation is fallible: an oversized or unsatisfiable request is an
    /// error rather than an abort.
    pub fn new(size: Size) -> Result<Self, SurfaceError> {
        validate_size(size)?;
        let bytes = size.pixel_count() * 4;
        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(bytes)
            .map_err(|_| SurfaceError::Allocation { size, bytes })?;
        buf.resize(bytes, 0);
        let image = RgbaImage::from_raw(size.width, size.height, buf)
            .ok_or(SurfaceError::Allocation { size, bytes })?;
        Ok(Self { image })
    }

    pub fn filled(size: Size, color: Color) -> Result<Self, SurfaceError> {
        let mut surface = Self::new(size)?;
        surface.clear(color);
        Ok(surface)
    }

    /// Build a surface from a row-major pixel array.
    pub fn from_pixels(size: Size, pixels: &[Color]) -> Result<Self, SurfaceError> {
        let mut surface = Self::new(size)?;
        surface.write_pixels(pixels)?;
        Ok(surface)
    }

    /// Adopt a decoded image.
    pub fn from_image(image: RgbaImage) -> Result<Self, SurfaceError> {
        validate_size(Size::new(image.width(), image.height()))?;
        Ok(Self { image })
    }

    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::from_size(self.size())
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if !self.size().contains(x, y) {
            return None;
        }
        Some(self.pixels()[self.index(x, y)])
    }

    /// Borrow the pixels as a row-major slice.
    pub fn pixels(&self) -> &[Color] {
        bytemuck::cast_slice(self.image.as_raw().as_slice())
    }

    /// Copy out every pixel, row-major.
    pub fn read_pixels(&self) -> Vec<Color> {
        self.pixels().to_vec()
    }

    /// Replace every pixel in one bulk copy. The length must match exactly;
    /// a mismatched array leaves the surface untouched.
    pub fn write_pixels(&mut self, pixels: &[Color]) -> Result<(), SurfaceError> {
        let expected = self.size().pixel_count();
        if pixels.len() != expected {
            return Err(SurfaceError::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        self.pixels_mut().copy_from_slice(pixels);
        Ok(())
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels_mut().fill(color);
    }

    /// Detached copy of `rect`. Parts of `rect` outside the surface come back
    /// transparent.
    pub fn copy_region(&self, rect: PixelRect) -> Result<PixelSurface, SurfaceError> {
        let mut copy = PixelSurface::new(rect.size())?;
        if let Some(src) = rect.intersect(&self.bounds()) {
            let dst_x = (src.x - rect.x) as usize;
            let dst_y = (src.y - rect.y) as usize;
            let w = src.width as usize;
            let src_stride = self.width() as usize;
            let dst_stride = copy.width() as usize;
            let src_pixels = self.pixels();
            let dst_pixels = copy.pixels_mut();
            for row in 0..src.height as usize {
                let s = (src.y as usize + row) * src_stride + src.x as usize;
                let d = (dst_y + row) * dst_stride + dst_x;
                dst_pixels[d..d + w].copy_from_slice(&src_pixels[s..s + w]);
            }
        }
        Ok(copy)
    }

    /// Open a scoped drawing session. It tracks the area it touches until it
    /// is finished or dropped.
    pub fn session(&mut self) -> DrawingSession<'_> {
        DrawingSession {
            surface: self,
            dirty: None,
        }
    }

    fn pixels_mut(&mut self) -> &mut [Color] {
        bytemuck::cast_slice_mut(&mut *self.image)
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width() as usize + x as usize
    }
}

// ============================================================================
// DRAWING SESSION
// ============================================================================

/// Scoped mutable access to a [`PixelSurface`].
///
/// All coordinates are clipped to the surface; nothing here fails.
pub struct DrawingSession<'a> {
    surface: &'a mut PixelSurface,
    dirty: Option<PixelRect>,
}

impl DrawingSession<'_> {
    pub fn size(&self) -> Size {
        self.surface.size()
    }

    pub fn clear(&mut self, color: Color) {
        self.surface.pixels_mut().fill(color);
        self.mark(self.surface.bounds());
    }

    /// Overwrite `rect` with `color` (no blending).
    pub fn fill_rect(&mut self, rect: PixelRect, color: Color) {
        let Some(clip) = rect.intersect(&self.surface.bounds()) else {
            return;
        };
        let stride = self.surface.width() as usize;
        let pixels = self.surface.pixels_mut();
        for y in clip.y..clip.bottom() {
            let row = y as usize * stride;
            pixels[row + clip.x as usize..row + clip.right() as usize].fill(color);
        }
        self.mark(clip);
    }

    /// Composite `src` over the surface with its top-left at (`x`, `y`).
    pub fn draw_image(&mut self, src: &PixelSurface, x: i32, y: i32) {
        self.blit(src, src.bounds(), x, y, true);
    }

    /// Copy `src_rect` of `src` to the same coordinates on this surface,
    /// replacing what was there.
    pub fn copy_region_from(&mut self, src: &PixelSurface, src_rect: PixelRect) {
        self.blit(src, src_rect, src_rect.x, src_rect.y, false);
    }

    /// Stamp `brush` at every pixel of the line from `from` to `to`
    /// (Bresenham walk, both endpoints included).
    pub fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), brush: &PixelSurface) {
        let (mut x0, mut y0) = from;
        let (x1, y1) = to;
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            self.draw_image(brush, x0, y0);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x0 += sx;
            }
            if e2 < dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Bounding rect of everything touched so far.
    pub fn dirty(&self) -> Option<PixelRect> {
        self.dirty
    }

    /// End the session and return the touched area.
    pub fn finish(self) -> Option<PixelRect> {
        self.dirty
    }

    fn blit(&mut self, src: &PixelSurface, src_rect: PixelRect, x: i32, y: i32, blend: bool) {
        let Some(clipped) = src_rect.intersect(&src.bounds()) else {
            return;
        };
        let x = x + (clipped.x - src_rect.x);
        let y = y + (clipped.y - src_rect.y);
        let src_rect = clipped;
        let dst_rect = PixelRect::new(x, y, src_rect.width, src_rect.height);
        let Some(clip) = dst_rect.intersect(&self.surface.bounds()) else {
            return;
        };

        let src_stride = src.width() as usize;
        let dst_stride = self.surface.width() as usize;
        let off_x = src_rect.x - x;
        let off_y = src_rect.y - y;
        let w = clip.width as usize;
        let src_pixels = src.pixels();
        let dst_pixels = self.surface.pixels_mut();

        for dy in clip.y..clip.bottom() {
            let s = (dy + off_y) as usize * src_stride + (clip.x + off_x) as usize;
            let d = dy as usize * dst_stride + clip.x as usize;
            let src_row = &src_pixels[s..s + w];
            let dst_row = &mut dst_pixels[d..d + w];
            if blend {
                for (dst, src) in dst_row.iter_mut().zip(src_row) {
                    *dst = src.over(*dst);
                }
            } else {
                dst_row.copy_from_slice(src_row);
            }
        }
        self.mark(clip);
    }

    fn mark(&mut self, rect: PixelRect) {
        self.dirty = Some(match self.dirty {
            Some(existing) => existing.union(&rect),
            None => rect,
        });
    }
}
