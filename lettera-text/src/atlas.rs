//! Glyph atlas: CPU-side RGBA image with shelf packing.
//!
//! Glyphs are placed left to right on horizontal shelves. A shelf is as
//! tall as the tallest glyph placed on it. When a glyph doesn't fit the
//! width remaining on any shelf, a new shelf is started below the last one;
//! when the image runs out of rows, its height doubles (width never changes).
//! Entries are never evicted.

use crate::glyph::GlyphImage;

/// Upper bound on atlas width in pixels. Matches wgpu's default
/// `max_texture_dimension_2d`.
pub const MAX_ATLAS_WIDTH: u32 = 8192;
/// Upper bound on atlas height in pixels.
pub const MAX_ATLAS_HEIGHT: u32 = 8192;
/// Lower bound on the initial atlas height.
const MIN_ATLAS_HEIGHT: u32 = 64;

/// Pixel-space rectangle within the atlas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureRegion {
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the two regions share at least one pixel.
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }
}

/// Shelf (row) in the atlas.
#[derive(Clone, Copy, Debug)]
struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

/// Growable glyph atlas image.
pub struct GlyphAtlas {
    width: u32,
    height: u32,
    /// RGBA pixel data (width * height * 4 bytes).
    data: Vec<u8>,
    shelves: Vec<Shelf>,
    /// Padding between glyphs in pixels.
    padding: u32,
    /// Whether pixels changed since the last [`GlyphAtlas::mark_clean`].
    dirty: bool,
}

impl GlyphAtlas {
    /// Create an empty atlas `width` pixels wide.
    pub fn new(width: u32) -> Self {
        let width = width.clamp(1, MAX_ATLAS_WIDTH);
        let height = (width / 2).clamp(MIN_ATLAS_HEIGHT, MAX_ATLAS_HEIGHT);
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
            shelves: Vec::new(),
            padding: 1,
            dirty: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Number of shelves started so far.
    pub fn shelf_count(&self) -> usize {
        self.shelves.len()
    }

    /// Copy of the current pixels, for upload.
    pub fn snapshot(&self) -> GlyphImage {
        GlyphImage {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
        }
    }

    /// Pack `image` and return where it landed.
    ///
    /// Empty images get an empty region and don't touch the pixels.
    /// Returns `None` when the image is wider than the atlas or the atlas
    /// can't grow tall enough.
    pub fn pack(&mut self, image: &GlyphImage) -> Option<TextureRegion> {
        if image.is_empty() {
            return Some(TextureRegion::default());
        }
        let region = self.allocate(image.width, image.height)?;
        self.blit(&region, image);
        self.dirty = true;
        Some(region)
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    fn allocate(&mut self, width: u32, height: u32) -> Option<TextureRegion> {
        if width > self.width {
            return None;
        }
        let padded_w = width + self.padding;
        let padded_h = height + self.padding;
        let atlas_w = self.width;

        // Closed shelves: anything tall enough with room left.
        let last = self.shelves.len().checked_sub(1);
        for (i, shelf) in self.shelves.iter_mut().enumerate() {
            if Some(i) != last && shelf.height >= padded_h && shelf.cursor_x + width <= atlas_w {
                let region = TextureRegion {
                    left: shelf.cursor_x,
                    top: shelf.y,
                    width,
                    height,
                };
                shelf.cursor_x += padded_w;
                return Some(region);
            }
        }

        // The open shelf can grow downwards.
        if let Some(shelf) = self.shelves.last().copied() {
            if shelf.cursor_x + width <= atlas_w {
                let shelf_h = shelf.height.max(padded_h);
                self.ensure_height(shelf.y + shelf_h)?;
                let open = self.shelves.last_mut()?;
                open.height = shelf_h;
                open.cursor_x += padded_w;
                return Some(TextureRegion {
                    left: shelf.cursor_x,
                    top: shelf.y,
                    width,
                    height,
                });
            }
        }

        // Start a new shelf.
        let shelf_y = self.shelves.last().map_or(0, |s| s.y + s.height);
        self.ensure_height(shelf_y + padded_h)?;
        self.shelves.push(Shelf {
            y: shelf_y,
            height: padded_h,
            cursor_x: padded_w,
        });
        Some(TextureRegion {
            left: 0,
            top: shelf_y,
            width,
            height,
        })
    }

    /// Grow (by doubling) until at least `required` rows exist.
    fn ensure_height(&mut self, required: u32) -> Option<()> {
        if required <= self.height {
            return Some(());
        }
        if required > MAX_ATLAS_HEIGHT {
            log::warn!(
                "GlyphAtlas: cannot grow past {}x{} (need {} rows)",
                self.width,
                MAX_ATLAS_HEIGHT,
                required
            );
            return None;
        }
        let mut height = self.height;
        while height < required {
            height = (height * 2).min(MAX_ATLAS_HEIGHT);
        }
        // Row-major with fixed width: growing only appends rows.
        self.data.resize(self.width as usize * height as usize * 4, 0);
        log::debug!(
            "GlyphAtlas: grew {}x{} -> {}x{}",
            self.width,
            self.height,
            self.width,
            height
        );
        self.height = height;
        Some(())
    }

    fn blit(&mut self, region: &TextureRegion, image: &GlyphImage) {
        let row_bytes = image.width as usize * 4;
        for row in 0..image.height as usize {
            let src = row * row_bytes;
            let dst = ((region.top as usize + row) * self.width as usize + region.left as usize) * 4;
            self.data[dst..dst + row_bytes].copy_from_slice(&image.data[src..src + row_bytes]);
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
