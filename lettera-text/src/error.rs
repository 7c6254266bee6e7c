//! Errors for font loading and selection.
//!
//! Shaping, rendering, packing and layout never fail with an error value:
//! they report through `bool`, `Option` or an empty [`crate::TextRect`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("Failed to read font data: {0}")]
    Io(#[from] std::io::Error),
    #[error("No valid font face at index {index}")]
    InvalidFont { index: u32 },
    #[error("Font family not found: {0}")]
    FamilyNotFound(String),
    #[error("Font selection failed: {0}")]
    Selection(String),
}

// ===================================================================
// Tests
// ===================================================================
