use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantizeError {
    #[error("max_color_bits must be between 1 and 8, got {0}")]
    InvalidMaxColorBits(u8),

    #[error("max_colors must be between 1 and 256, got {0}")]
    InvalidMaxColors(u32),

    #[error("pixel buffer length {len} is not a multiple of 3")]
    MalformedPixelBuffer { len: usize },

    #[error("color ({r}, {g}, {b}) was never added to the octree")]
    ColorNotInPalette { r: u8, g: u8, b: u8 },

    #[error("palette has not been built yet")]
    NotPalettized,

    #[error("octree is frozen once the palette is built")]
    TreeFrozen,
}
