//! Hierarchy nodes
//!
//! Nodes live in an implicit binary tree: index 0 is unused, the root is 1,
//! and the children of node `i` are `2i` and `2i + 1`. A node is either
//! empty, a leaf holding one primitive, or a split along one axis.

use tina_math::{Vec3, AABB};

use crate::error::{AccelError, Result};

/// Node id of the root
pub const ROOT: u32 = 1;

/// Left child id of `node`
#[inline]
pub fn left_child(node: u32) -> u32 {
    node * 2
}

/// Right child id of `node`
#[inline]
pub fn right_child(node: u32) -> u32 {
    node * 2 + 1
}

/// What a node slot holds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeTag {
    /// Unused slot
    #[default]
    Empty,
    /// Leaf referencing a single primitive
    Leaf,
    /// Internal node; its children were partitioned along this axis (0..3)
    Split(u8),
}

/// A node of the implicit tree
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhNode {
    pub tag: NodeTag,
    /// Exact box of the primitive for leaves, union of the subtree for splits
    pub bounds: AABB,
    /// Primitive id, meaningful only for leaves
    pub primitive: u32,
}

impl BvhNode {
    /// An unused slot
    pub const EMPTY: Self = Self {
        tag: NodeTag::Empty,
        bounds: AABB::EMPTY,
        primitive: 0,
    };

    /// Create a leaf
    pub fn leaf(primitive: u32, bounds: AABB) -> Self {
        Self {
            tag: NodeTag::Leaf,
            bounds,
            primitive,
        }
    }

    /// Create a split along `axis`
    pub fn split(axis: usize, bounds: AABB) -> Self {
        debug_assert!(axis < 3);
        Self {
            tag: NodeTag::Split(axis as u8),
            bounds,
            primitive: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tag == NodeTag::Empty
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.tag == NodeTag::Leaf
    }

    #[inline]
    pub fn is_split(&self) -> bool {
        matches!(self.tag, NodeTag::Split(_))
    }

    /// Split axis, if this is an internal node
    #[inline]
    pub fn split_axis(&self) -> Option<usize> {
        match self.tag {
            NodeTag::Split(axis) => Some(axis as usize),
            _ => None,
        }
    }
}

impl Default for BvhNode {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// GPU-ready node
///
/// Two 16-byte rows: `min` + tag, `max` + primitive. Tag values are
/// `0` empty, `1` leaf, `2 + axis` split, so a zeroed buffer is an empty tree.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedNode {
    pub min: [f32; 3],
    pub tag: u32,
    pub max: [f32; 3],
    pub primitive: u32,
}

impl PackedNode {
    /// Size in bytes
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub const TAG_EMPTY: u32 = 0;
    pub const TAG_LEAF: u32 = 1;
    pub const TAG_SPLIT: u32 = 2;

    /// Restore the node stored at slot `node`
    pub fn unpack(&self, node: usize) -> Result<BvhNode> {
        let bounds = AABB::new(Vec3::from_array(self.min), Vec3::from_array(self.max));
        match self.tag {
            Self::TAG_EMPTY => Ok(BvhNode::EMPTY),
            Self::TAG_LEAF | Self::TAG_SPLIT..=4 if !bounds.is_valid() => {
                Err(AccelError::MalformedNode {
                    node,
                    reason: "bounds have min > max".into(),
                })
            }
            Self::TAG_LEAF => Ok(BvhNode::leaf(self.primitive, bounds)),
            axis @ Self::TAG_SPLIT..=4 => Ok(BvhNode::split((axis - Self::TAG_SPLIT) as usize, bounds)),
            tag => Err(AccelError::MalformedNode {
                node,
                reason: format!("unknown tag {}", tag),
            }),
        }
    }
}

impl From<&BvhNode> for PackedNode {
    fn from(node: &BvhNode) -> Self {
        let tag = match node.tag {
            NodeTag::Empty => return Self::default(),
            NodeTag::Leaf => Self::TAG_LEAF,
            NodeTag::Split(axis) => Self::TAG_SPLIT + axis as u32,
        };
        Self {
            min: node.bounds.min.to_array(),
            tag,
            max: node.bounds.max.to_array(),
            primitive: node.primitive,
        }
    }
}
