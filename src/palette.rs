extern crate alloc;
use alloc::vec::Vec;

use rgb::RGB8;

/// An ordered color palette. Entry `i` is the representative color of the
/// leaf that was assigned palette index `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<RGB8>,
}

impl Palette {
    pub(crate) fn from_entries(entries: Vec<RGB8>) -> Self {
        Self { entries }
    }

    /// Get palette entries in index order.
    pub fn entries(&self) -> &[RGB8] {
        &self.entries
    }

    /// Number of palette entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the palette is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<RGB8> {
        self.entries.get(index).copied()
    }

    /// Flatten to repeating (blue, green, red) byte triples, the layout
    /// GIF-style encoders feed back into a color table.
    pub fn to_bgr_bytes(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|c| [c.b, c.g, c.r]).collect()
    }

    /// Flatten to repeating (red, green, blue) byte triples.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn empty_palette() {
        let p = Palette::default();
        assert!(p.is_empty());
        assert_eq!(p.len(), 0);
        assert!(p.to_bgr_bytes().is_empty());
        assert_eq!(p.get(0), None);
    }

    #[test]
    fn byte_layouts() {
        let p = Palette::from_entries(vec![
            RGB8 { r: 1, g: 2, b: 3 },
            RGB8 { r: 4, g: 5, b: 6 },
        ]);
        assert_eq!(p.to_bgr_bytes(), vec![3, 2, 1, 6, 5, 4]);
        assert_eq!(p.to_rgb_bytes(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(p.get(1), Some(RGB8 { r: 4, g: 5, b: 6 }));
    }
}
