extern crate alloc;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::error::QuantizeError;
use crate::octree::{Octree, MAX_COLOR_BITS};
use crate::palette::Palette;
use crate::QuantizeConfig;

/// Two-pass palette quantizer consumed by indexed-color encoders.
///
/// `process` sees the whole image and returns the palette, `map` is then
/// asked for the index of each pixel.
pub trait Quantizer {
    /// Build a palette from packed (blue, green, red) byte triples and return
    /// it flattened in the same byte order.
    ///
    /// `sample_stride` exists for sampling quantizers; the octree reads every pixel.
    fn process(&mut self, pixels: &[u8], sample_stride: usize) -> Result<Vec<u8>, QuantizeError>;

    /// Palette index for one pixel of the processed image.
    fn map(&mut self, blue: u8, green: u8, red: u8) -> Result<u8, QuantizeError>;
}

/// Octree implementation of [`Quantizer`].
#[derive(Debug, Clone)]
pub struct OctreeQuantizer {
    config: QuantizeConfig,
    octree: Octree,
    palette: Option<Palette>,
    /// Last looked-up color and its index.
    previous: Option<(RGB8, u8)>,
}

impl Default for OctreeQuantizer {
    fn default() -> Self {
        Self::new()
    }
}

impl OctreeQuantizer {
    /// 8 significant bits per channel, up to 256 colors.
    pub fn new() -> Self {
        let config = QuantizeConfig::default();
        let octree = Octree::with_depth(MAX_COLOR_BITS);
        Self {
            config,
            octree,
            palette: None,
            previous: None,
        }
    }

    pub fn with_config(config: &QuantizeConfig) -> Result<Self, QuantizeError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            octree: Self::fresh_tree(config)?,
            palette: None,
            previous: None,
        })
    }

    fn fresh_tree(config: &QuantizeConfig) -> Result<Octree, QuantizeError> {
        Ok(Octree::new(config.max_color_bits)?.with_run_cache(config.run_cache))
    }

    pub fn config(&self) -> &QuantizeConfig {
        &self.config
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// The palette built by the last [`OctreeQuantizer::palettize`] or `process` call.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Discard the current tree and palette.
    pub fn reset(&mut self) -> Result<(), QuantizeError> {
        self.octree = Self::fresh_tree(&self.config)?;
        self.palette = None;
        self.previous = None;
        Ok(())
    }

    /// First pass: fold a single pixel into the tree.
    pub fn add_pixel(&mut self, pixel: RGB8) -> Result<(), QuantizeError> {
        self.octree.add_color(pixel)
    }

    /// Reduce the tree to the configured budget and freeze it.
    pub fn palettize(&mut self) -> Result<&Palette, QuantizeError> {
        let palette = self.octree.palletize(self.config.max_colors as usize)?;
        self.previous = None;
        Ok(self.palette.insert(palette))
    }

    /// Palette index for `pixel`, answering repeated queries from a one-entry cache.
    pub fn index_of(&mut self, pixel: RGB8) -> Result<u8, QuantizeError> {
        if self.config.run_cache {
            if let Some((prev, index)) = self.previous {
                if prev == pixel {
                    return Ok(index);
                }
            }
        }
        // Palettes never exceed 256 entries.
        let index = self.octree.get_palette_index(pixel)? as u8;
        self.previous = Some((pixel, index));
        Ok(index)
    }
}

impl Quantizer for OctreeQuantizer {
    fn process(&mut self, pixels: &[u8], _sample_stride: usize) -> Result<Vec<u8>, QuantizeError> {
        if pixels.len() % 3 != 0 {
            return Err(QuantizeError::MalformedPixelBuffer { len: pixels.len() });
        }
        self.reset()?;
        for bgr in pixels.chunks_exact(3) {
            self.add_pixel(RGB8 {
                r: bgr[2],
                g: bgr[1],
                b: bgr[0],
            })?;
        }
        Ok(self.palettize()?.to_bgr_bytes())
    }

    fn map(&mut self, blue: u8, green: u8, red: u8) -> Result<u8, QuantizeError> {
        self.index_of(RGB8 {
            r: red,
            g: green,
            b: blue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn identical_pixels_give_single_entry() {
        let mut q = OctreeQuantizer::new();
        let palette = q.process(&[0; 12], 10).unwrap();
        assert_eq!(palette, vec![0, 0, 0]);
        assert_eq!(q.map(0, 0, 0), Ok(0));
    }

    #[test]
    fn input_is_bgr_ordered() {
        let mut q = OctreeQuantizer::new();
        // One pure-red pixel given as (b, g, r).
        let palette = q.process(&[0, 0, 255], 1).unwrap();
        assert_eq!(palette, vec![0, 0, 255]);
        assert_eq!(q.palette().unwrap().entries(), &[RGB8 { r: 255, g: 0, b: 0 }]);
    }

    #[test]
    fn malformed_buffer_is_rejected() {
        let mut q = OctreeQuantizer::new();
        assert_eq!(
            q.process(&[1, 2, 3, 4], 1),
            Err(QuantizeError::MalformedPixelBuffer { len: 4 })
        );
    }

    #[test]
    fn map_before_process_fails() {
        let mut q = OctreeQuantizer::new();
        assert_eq!(q.map(1, 2, 3), Err(QuantizeError::NotPalettized));
    }

    #[test]
    fn unknown_color_is_reported() {
        let mut q = OctreeQuantizer::new();
        q.process(&[0, 0, 0], 1).unwrap();
        assert_eq!(
            q.map(255, 255, 255),
            Err(QuantizeError::ColorNotInPalette {
                r: 255,
                g: 255,
                b: 255
            })
        );
        // A failed lookup must not poison the cache.
        assert_eq!(q.map(0, 0, 0), Ok(0));
    }

    #[test]
    fn process_starts_a_fresh_tree() {
        let mut q = OctreeQuantizer::new();
        q.process(&[0, 0, 0, 255, 255, 255], 1).unwrap();
        assert_eq!(q.palette().unwrap().len(), 2);
        let palette = q.process(&[9, 9, 9], 1).unwrap();
        assert_eq!(palette, vec![9, 9, 9]);
        assert!(q.map(255, 255, 255).is_err());
    }

    #[test]
    fn default_uses_full_depth_and_budget() {
        let q = OctreeQuantizer::default();
        assert_eq!(q.octree().max_depth(), MAX_COLOR_BITS);
        assert_eq!(q.config(), &QuantizeConfig::default());
        assert!(q.palette().is_none());
    }

    #[test]
    fn with_config_validates() {
        assert_eq!(
            OctreeQuantizer::with_config(&QuantizeConfig::new().max_color_bits(0)).unwrap_err(),
            QuantizeError::InvalidMaxColorBits(0)
        );
        assert_eq!(
            OctreeQuantizer::with_config(&QuantizeConfig::new().max_colors(300)).unwrap_err(),
            QuantizeError::InvalidMaxColors(300)
        );
    }

    #[test]
    fn works_as_trait_object() {
        let mut q: alloc::boxed::Box<dyn Quantizer> = alloc::boxed::Box::new(OctreeQuantizer::new());
        let palette = q.process(&[10, 20, 30], 1).unwrap();
        assert_eq!(palette, vec![10, 20, 30]);
        assert_eq!(q.map(10, 20, 30), Ok(0));
    }
}
