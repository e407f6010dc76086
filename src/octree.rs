//! Arena-backed color octree.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Each
//! level keeps an intrusive LIFO list of internal nodes (threaded through
//! `next_reducible`) so that reduction always collapses the deepest, most
//! recently created internal node first.

extern crate alloc;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::error::QuantizeError;
use crate::palette::Palette;

/// Deepest tree supported: one level per bit of an 8-bit channel.
pub const MAX_COLOR_BITS: u8 = 8;

/// Index of a node inside its [`Octree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Child slot (0..8) selected by `color` at tree level `level`.
///
/// Takes bit `7 - level` of each channel: red becomes the most significant
/// bit of the result, green the middle and blue the least significant.
#[inline]
pub fn branch_index(color: RGB8, level: u8) -> usize {
    debug_assert!(level < MAX_COLOR_BITS);
    let shift = 7 - level;
    let r = (color.r >> shift) & 1;
    let g = (color.g >> shift) & 1;
    let b = (color.b >> shift) & 1;
    usize::from((r << 2) | (g << 1) | b)
}

/// A single octree node. Leaves aggregate the colors routed into them,
/// internal nodes only own child slots until they are reduced.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    level: u8,
    /// `None` for leaves.
    children: Option<[Option<NodeId>; 8]>,
    pixel_count: u64,
    red: u64,
    green: u64,
    blue: u64,
    palette_index: Option<usize>,
    next_reducible: Option<NodeId>,
}

impl OctreeNode {
    fn new(level: u8, max_depth: u8) -> Self {
        Self {
            level,
            children: if level == max_depth { None } else { Some([None; 8]) },
            pixel_count: 0,
            red: 0,
            green: 0,
            blue: 0,
            palette_index: None,
            next_reducible: None,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Number of pixels folded into this node (zero for internal nodes).
    pub fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    /// Palette slot, assigned once the tree has been palletized.
    pub fn palette_index(&self) -> Option<usize> {
        self.palette_index
    }

    /// Present children in ascending slot order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().flatten().flatten().copied()
    }

    /// Truncated mean of every color aggregated here.
    pub fn average_color(&self) -> RGB8 {
        let n = self.pixel_count.max(1);
        RGB8 {
            r: (self.red / n) as u8,
            g: (self.green / n) as u8,
            b: (self.blue / n) as u8,
        }
    }

    fn increment(&mut self, color: RGB8) {
        self.pixel_count += 1;
        self.red += u64::from(color.r);
        self.green += u64::from(color.g);
        self.blue += u64::from(color.b);
    }
}

/// Color octree with deepest-first reduction.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    /// Heads of the per-level reducible lists, indexed by level.
    reducible: [Option<NodeId>; MAX_COLOR_BITS as usize + 1],
    leaf_count: usize,
    max_depth: u8,
    run_cache: bool,
    /// Last inserted color and the leaf it landed in.
    previous: Option<(RGB8, NodeId)>,
    palettized: bool,
}

impl Octree {
    /// Create an empty tree whose leaves sit at depth `max_color_bits`.
    pub fn new(max_color_bits: u8) -> Result<Self, QuantizeError> {
        if !(1..=MAX_COLOR_BITS).contains(&max_color_bits) {
            return Err(QuantizeError::InvalidMaxColorBits(max_color_bits));
        }
        Ok(Self::with_depth(max_color_bits))
    }

    /// Caller guarantees `1 <= max_color_bits <= MAX_COLOR_BITS`.
    pub(crate) fn with_depth(max_color_bits: u8) -> Self {
        debug_assert!((1..=MAX_COLOR_BITS).contains(&max_color_bits));
        let mut tree = Self {
            nodes: Vec::new(),
            reducible: [None; MAX_COLOR_BITS as usize + 1],
            leaf_count: 0,
            max_depth: max_color_bits,
            run_cache: true,
            previous: None,
            palettized: false,
        };
        tree.alloc_node(0);
        tree
    }

    /// Enable or disable the repeated-color fast path in [`Octree::add_color`].
    pub fn with_run_cache(mut self, enabled: bool) -> Self {
        self.run_cache = enabled;
        self
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Number of leaves reachable from the root.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn is_palettized(&self) -> bool {
        self.palettized
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id.index()]
    }

    /// Deepest level of any node reachable from the root.
    pub fn depth(&self) -> u8 {
        let mut deepest = 0;
        let mut stack = alloc::vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            deepest = deepest.max(node.level);
            stack.extend(node.children());
        }
        deepest
    }

    fn alloc_node(&mut self, level: u8) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut node = OctreeNode::new(level, self.max_depth);
        if node.is_leaf() {
            self.leaf_count += 1;
        } else {
            node.next_reducible = self.reducible[usize::from(level)].replace(id);
        }
        self.nodes.push(node);
        id
    }

    /// Fold one color into the tree.
    pub fn add_color(&mut self, color: RGB8) -> Result<(), QuantizeError> {
        if self.palettized {
            return Err(QuantizeError::TreeFrozen);
        }
        if self.run_cache {
            if let Some((prev, id)) = self.previous {
                if prev == color {
                    self.nodes[id.index()].increment(color);
                    return Ok(());
                }
            }
        }
        let leaf = self.insert(color);
        self.previous = Some((color, leaf));
        Ok(())
    }

    /// Root-to-leaf descent, creating missing children on the way.
    fn insert(&mut self, color: RGB8) -> NodeId {
        let mut id = NodeId::ROOT;
        loop {
            let node = &self.nodes[id.index()];
            let level = node.level;
            let Some(children) = node.children else {
                self.nodes[id.index()].increment(color);
                return id;
            };
            let slot = branch_index(color, level);
            id = match children[slot] {
                Some(child) => child,
                None => {
                    let child = self.alloc_node(level + 1);
                    if let Some(children) = self.nodes[id.index()].children.as_mut() {
                        children[slot] = Some(child);
                    }
                    child
                }
            };
        }
    }

    /// Merge every child of `id` into it, turning it into a leaf.
    /// Returns the number of children merged.
    fn reduce_node(&mut self, id: NodeId) -> usize {
        let Some(children) = self.nodes[id.index()].children.take() else {
            return 0;
        };
        let (mut count, mut red, mut green, mut blue) = (0, 0, 0, 0);
        let mut merged = 0;
        for child in children.iter().flatten() {
            let child = &self.nodes[child.index()];
            count += child.pixel_count;
            red += child.red;
            green += child.green;
            blue += child.blue;
            merged += 1;
        }
        let node = &mut self.nodes[id.index()];
        node.pixel_count = count;
        node.red = red;
        node.green = green;
        node.blue = blue;
        merged
    }

    /// Collapse the most recently registered internal node on the deepest
    /// level that has one. Returns `false` when nothing is left to reduce.
    pub fn reduce(&mut self) -> Result<bool, QuantizeError> {
        if self.palettized {
            return Err(QuantizeError::TreeFrozen);
        }
        let level = (1..self.max_depth)
            .rev()
            .find(|&l| self.reducible[usize::from(l)].is_some())
            .unwrap_or(0);
        let Some(id) = self.reducible[usize::from(level)] else {
            return Ok(false);
        };
        // Only a root that never received a color can be childless.
        if self.nodes[id.index()].children().next().is_none() {
            return Ok(false);
        }
        self.reducible[usize::from(level)] = self.nodes[id.index()].next_reducible.take();

        let merged = self.reduce_node(id);
        self.leaf_count = self.leaf_count + 1 - merged;
        // The cached leaf may have just been merged away.
        self.previous = None;

        log::trace!(
            "reduced node at level {level}: merged {merged} children, {} leaves left",
            self.leaf_count
        );
        Ok(true)
    }

    /// Reduce until at most `color_budget` leaves remain, then number the
    /// leaves in ascending branch order and return their average colors.
    pub fn palletize(&mut self, color_budget: usize) -> Result<Palette, QuantizeError> {
        if color_budget == 0 {
            return Err(QuantizeError::InvalidMaxColors(0));
        }
        if self.palettized {
            return Err(QuantizeError::TreeFrozen);
        }

        let initial_leaves = self.leaf_count;
        let mut reductions = 0usize;
        while self.leaf_count > color_budget && self.reduce()? {
            reductions += 1;
        }

        let mut entries = Vec::with_capacity(self.leaf_count);
        self.construct_palette(NodeId::ROOT, &mut entries);
        self.palettized = true;

        log::debug!(
            "palletized octree: {initial_leaves} leaves, {reductions} reductions, {} colors",
            entries.len()
        );
        Ok(Palette::from_entries(entries))
    }

    fn construct_palette(&mut self, id: NodeId, entries: &mut Vec<RGB8>) {
        let children = self.nodes[id.index()].children;
        match children {
            None => {
                let node = &mut self.nodes[id.index()];
                node.palette_index = Some(entries.len());
                entries.push(node.average_color());
            }
            Some(children) => {
                for child in children.into_iter().flatten() {
                    self.construct_palette(child, entries);
                }
            }
        }
    }

    /// Palette index of the leaf `color` descends into.
    pub fn get_palette_index(&self, color: RGB8) -> Result<usize, QuantizeError> {
        if !self.palettized {
            return Err(QuantizeError::NotPalettized);
        }
        let mut node = self.node(NodeId::ROOT);
        loop {
            match node.children {
                None => return node.palette_index.ok_or(QuantizeError::NotPalettized),
                Some(children) => {
                    let child = children[branch_index(color, node.level)].ok_or(
                        QuantizeError::ColorNotInPalette {
                            r: color.r,
                            g: color.g,
                            b: color.b,
                        },
                    )?;
                    node = self.node(child);
                }
            }
        }
    }
}
