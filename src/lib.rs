//! Octree color quantization.
//!
//! Reduces a full-color pixel stream to a palette of at most 256 entries and
//! maps each pixel to its palette index, for indexed-color formats such as GIF.
//!
//! ```
//! use octquant::{OctreeQuantizer, Quantizer};
//!
//! // Two pixels, packed as (blue, green, red).
//! let pixels = [0, 0, 255, 0, 255, 0];
//! let mut quantizer = OctreeQuantizer::new();
//! let palette = quantizer.process(&pixels, 1).unwrap();
//! assert_eq!(palette.len(), 6);
//! assert_ne!(quantizer.map(0, 0, 255).unwrap(), quantizer.map(0, 255, 0).unwrap());
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod octree;
pub mod palette;
pub mod quantizer;
pub mod remap;

pub use error::QuantizeError;
pub use octree::{Octree, MAX_COLOR_BITS};
pub use palette::Palette;
pub use quantizer::{OctreeQuantizer, Quantizer};

use alloc::vec::Vec;

/// Configuration for octree quantization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizeConfig {
    /// Significant bits per channel, which is also the tree depth (1..=8).
    pub max_color_bits: u8,
    /// Maximum number of palette colors (1..=256).
    pub max_colors: u32,
    /// Short-circuit runs of identical pixels while building and mapping.
    pub run_cache: bool,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            max_color_bits: MAX_COLOR_BITS,
            max_colors: 256,
            run_cache: true,
        }
    }
}

impl QuantizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_color_bits(mut self, bits: u8) -> Self {
        self.max_color_bits = bits;
        self
    }

    pub fn max_colors(mut self, n: u32) -> Self {
        self.max_colors = n;
        self
    }

    pub fn run_cache(mut self, enabled: bool) -> Self {
        self.run_cache = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), QuantizeError> {
        if !(1..=MAX_COLOR_BITS).contains(&self.max_color_bits) {
            return Err(QuantizeError::InvalidMaxColorBits(self.max_color_bits));
        }
        if !(1..=256).contains(&self.max_colors) {
            return Err(QuantizeError::InvalidMaxColors(self.max_colors));
        }
        Ok(())
    }
}

/// Quantization result.
#[derive(Debug, Clone)]
pub struct QuantizeResult {
    palette: Palette,
    indices: Vec<u8>,
}

impl QuantizeResult {
    /// Palette entries in index order.
    pub fn palette(&self) -> &[rgb::RGB<u8>] {
        self.palette.entries()
    }

    /// Get the palette index for each pixel.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Number of colors in the palette.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }
}

/// Quantize an RGB image to a palette and per-pixel indices.
pub fn quantize(
    pixels: &[rgb::RGB<u8>],
    config: &QuantizeConfig,
) -> Result<QuantizeResult, QuantizeError> {
    let mut quantizer = OctreeQuantizer::with_config(config)?;

    // 1. Build the tree
    for &pixel in pixels {
        quantizer.add_pixel(pixel)?;
    }

    // 2. Reduce to budget and assign indices
    let palette = quantizer.palettize()?.clone();

    // 3. Map every pixel
    let indices = remap::remap_pixels(pixels, &mut quantizer)?;

    Ok(QuantizeResult { palette, indices })
}
