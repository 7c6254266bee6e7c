//! GPU-mirror handle for a glyph atlas.
//!
//! An [`AtlasTexture`] holds the last uploaded atlas image behind an `Arc`.
//! Uploading swaps the whole image at once and bumps the revision, so a
//! reader sees either the old contents or the new, never a mix. GPU
//! consumers compare `(id, revision)` to know when to re-upload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::atlas::TextureRegion;
use crate::glyph::GlyphImage;
use crate::renderer::RenderMethod;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug)]
pub struct AtlasTexture {
    id: u64,
    revision: u64,
    image: Arc<GlyphImage>,
    method: RenderMethod,
}

impl AtlasTexture {
    /// An empty texture with a process-unique id.
    pub fn new(method: RenderMethod) -> Self {
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            revision: 0,
            image: Arc::new(GlyphImage::default()),
            method,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of uploads so far; `0` means never uploaded.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn image(&self) -> &Arc<GlyphImage> {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }

    /// How texels should be decoded.
    pub fn method(&self) -> RenderMethod {
        self.method
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    /// Normalized `[u_min, v_min, u_max, v_max]` for a region of this texture.
    pub fn uv(&self, region: &TextureRegion) -> [f32; 4] {
        if self.image.is_empty() {
            return [0.0; 4];
        }
        let w = self.image.width as f32;
        let h = self.image.height as f32;
        [
            region.left as f32 / w,
            region.top as f32 / h,
            region.right() as f32 / w,
            region.bottom() as f32 / h,
        ]
    }

    /// Replace the contents with `image`.
    pub(crate) fn upload(&mut self, image: GlyphImage) {
        self.image = Arc::new(image);
        self.revision += 1;
        log::debug!(
            "AtlasTexture {}: uploaded revision {} ({}x{})",
            self.id,
            self.revision,
            self.image.width,
            self.image.height
        );
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_unique() {
        let a = AtlasTexture::new(RenderMethod::Bitmap);
        let b = AtlasTexture::new(RenderMethod::Bitmap);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.revision(), 0);
        assert!(a.is_empty());
    }

    #[test]
    fn test_upload_replaces_contents() {
        let mut tex = AtlasTexture::new(RenderMethod::Sdf);
        let before = Arc::clone(tex.image());
        tex.upload(GlyphImage::new(4, 2));
        assert_eq!(tex.revision(), 1);
        assert_eq!((tex.width(), tex.height()), (4, 2));
        // Earlier readers keep the old image intact.
        assert!(before.is_empty());
        assert_eq!(tex.method(), RenderMethod::Sdf);
    }

    #[test]
    fn test_uv() {
        let mut tex = AtlasTexture::new(RenderMethod::Bitmap);
        tex.upload(GlyphImage::new(100, 50));
        let uv = tex.uv(&TextureRegion {
            left: 10,
            top: 5,
            width: 20,
            height: 10,
        });
        assert_eq!(uv, [0.1, 0.1, 0.3, 0.3]);
    }
}
