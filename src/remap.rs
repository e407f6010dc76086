extern crate alloc;
use alloc::vec::Vec;

use crate::error::QuantizeError;
use crate::quantizer::OctreeQuantizer;

/// Map RGB pixels to palette indices through a palettized quantizer.
///
/// Consecutive identical pixels are answered from the quantizer's lookup
/// cache, so long runs cost one tree walk.
pub fn remap_pixels(
    pixels: &[rgb::RGB<u8>],
    quantizer: &mut OctreeQuantizer,
) -> Result<Vec<u8>, QuantizeError> {
    pixels.iter().map(|&p| quantizer.index_of(p)).collect()
}

/// Map packed (blue, green, red) triples to palette indices.
pub fn remap_bgr(pixels: &[u8], quantizer: &mut OctreeQuantizer) -> Result<Vec<u8>, QuantizeError> {
    if pixels.len() % 3 != 0 {
        return Err(QuantizeError::MalformedPixelBuffer { len: pixels.len() });
    }
    pixels
        .chunks_exact(3)
        .map(|bgr| {
            quantizer.index_of(rgb::RGB {
                r: bgr[2],
                g: bgr[1],
                b: bgr[0],
            })
        })
        .collect()
}
