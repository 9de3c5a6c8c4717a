//! Bounding Volume Hierarchy over triangle boxes
//!
//! Median-split build into a fixed, implicitly indexed node array. The array
//! is sized once at construction and never grows; a build that would need
//! more slots fails with [`AccelError::TreeTooSmall`] and leaves the current
//! tree untouched.

use tina_math::AABB;

use crate::error::{AccelError, Result};
use crate::node::{left_child, right_child, BvhNode, PackedNode, ROOT};

/// Largest supported node array, keeping every child id inside u32
pub const MAX_CAPACITY: usize = 1 << 31;

/// Statistics for a finished build
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Primitives in the tree
    pub primitives: usize,
    pub leaves: usize,
    pub splits: usize,
    /// Depth of the deepest node, root at 0
    pub depth: u32,
}

impl BuildStats {
    /// Occupied node slots
    pub fn nodes(&self) -> usize {
        self.leaves + self.splits
    }
}

/// Node slots a median-split tree over `primitives` boxes needs
///
/// The right half always receives the larger share, so the right spine
/// reaches depth `ceil(log2 n)` and the largest id used is
/// `2^(ceil(log2 n) + 1) - 1`.
pub fn required_capacity(primitives: usize) -> usize {
    if primitives <= 1 {
        2
    } else {
        primitives.next_power_of_two() * 2
    }
}

/// Bounding Volume Hierarchy with a fixed node budget
#[derive(Clone, Debug)]
pub struct Bvh {
    pub(crate) nodes: Vec<BvhNode>,
    stats: BuildStats,
    version: u32,
}

impl Bvh {
    /// Create an empty hierarchy with `capacity` node slots
    ///
    /// Capacity must be a power of two, at least 2, and at most
    /// [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 2 || !capacity.is_power_of_two() || capacity > MAX_CAPACITY {
            return Err(AccelError::InvalidCapacity(capacity));
        }

        Ok(Self {
            nodes: vec![BvhNode::EMPTY; capacity],
            stats: BuildStats::default(),
            version: 0,
        })
    }

    /// Build over `bounds`, using each box's position as its primitive id
    pub fn build(&mut self, bounds: &[AABB]) -> Result<BuildStats> {
        let primitives: Vec<(u32, AABB)> = bounds
            .iter()
            .enumerate()
            .map(|(i, b)| (i as u32, *b))
            .collect();
        self.build_indexed(&primitives)
    }

    /// Build over explicitly numbered primitives
    ///
    /// Leaves store the given ids, so traversal reports them unchanged.
    /// Equal centroids keep their input order, which makes the layout a pure
    /// function of the input.
    pub fn build_indexed(&mut self, primitives: &[(u32, AABB)]) -> Result<BuildStats> {
        if let Some(&(primitive, _)) = primitives.iter().find(|(_, b)| !b.is_valid()) {
            return Err(AccelError::InvalidBounds { primitive });
        }

        let required = required_capacity(primitives.len());
        if required > self.capacity() {
            return Err(AccelError::TreeTooSmall {
                primitives: primitives.len(),
                required,
                capacity: self.capacity(),
            });
        }

        let mut builder = Builder {
            capacity: self.capacity(),
            primitives: primitives.len(),
            staged: Vec::with_capacity(primitives.len() * 2),
            depth: 0,
        };
        let mut items = primitives.to_vec();
        if !items.is_empty() {
            builder.build(&mut items, ROOT, 0)?;
        }

        // Commit: nothing above touched the live array
        self.nodes.fill(BvhNode::EMPTY);
        let mut stats = BuildStats {
            primitives: primitives.len(),
            depth: builder.depth,
            ..Default::default()
        };
        for (id, node) in builder.staged {
            if node.is_leaf() {
                stats.leaves += 1;
            } else {
                stats.splits += 1;
            }
            self.nodes[id as usize] = node;
        }

        self.stats = stats;
        self.version = self.version.wrapping_add(1);

        log::debug!(
            "BVH built: {} primitives, {} nodes, depth {}",
            stats.primitives,
            stats.nodes(),
            stats.depth
        );

        Ok(stats)
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.fill(BvhNode::EMPTY);
        self.stats = BuildStats::default();
        self.version = self.version.wrapping_add(1);
    }

    /// Get a node by id
    pub fn node(&self, id: u32) -> Option<&BvhNode> {
        self.nodes.get(id as usize)
    }

    /// All node slots, index 0 included
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Bounds of the whole tree
    pub fn root_bounds(&self) -> Option<AABB> {
        let root = &self.nodes[ROOT as usize];
        (!root.is_empty()).then_some(root.bounds)
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.stats.leaves
    }

    pub fn split_count(&self) -> usize {
        self.stats.splits
    }

    pub fn depth(&self) -> u32 {
        self.stats.depth
    }

    /// Statistics of the current tree
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Check if the tree holds no primitives
    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT as usize].is_empty()
    }

    /// Get the version (incremented on each build)
    pub fn version(&self) -> u32 {
        self.version
    }
}

/// Recursive median-split builder writing into a staging list
struct Builder {
    capacity: usize,
    primitives: usize,
    staged: Vec<(u32, BvhNode)>,
    depth: u32,
}

impl Builder {
    fn build(&mut self, items: &mut [(u32, AABB)], node: u32, depth: u32) -> Result<()> {
        if node as usize >= self.capacity {
            return Err(AccelError::TreeTooSmall {
                primitives: self.primitives,
                required: required_capacity(self.primitives),
                capacity: self.capacity,
            });
        }
        self.depth = self.depth.max(depth);

        match items {
            [] => Ok(()),
            [(primitive, bounds)] => {
                self.staged.push((node, BvhNode::leaf(*primitive, *bounds)));
                Ok(())
            }
            _ => {
                let bounds: AABB = items.iter().map(|(_, b)| *b).collect();
                let axis = bounds.largest_axis();

                // Stable sort keeps ties in input order
                items.sort_by(|a, b| {
                    a.1.centroid_axis(axis).total_cmp(&b.1.centroid_axis(axis))
                });

                self.staged.push((node, BvhNode::split(axis, bounds)));

                let mid = items.len() / 2;
                let (left, right) = items.split_at_mut(mid);
                self.build(left, left_child(node), depth + 1)?;
                self.build(right, right_child(node), depth + 1)
            }
        }
    }
}

// ============================================================================
// GPU upload
// ============================================================================

impl Bvh {
    /// Export every node slot in upload layout
    pub fn packed_nodes(&self) -> Vec<PackedNode> {
        self.nodes.iter().map(PackedNode::from).collect()
    }

    /// Restore a hierarchy from packed nodes
    ///
    /// The slice length becomes the capacity. Every tag is validated and slot
    /// 0 must be empty.
    pub fn from_packed(packed: &[PackedNode]) -> Result<Self> {
        let mut bvh = Self::new(packed.len())?;
        let mut stats = BuildStats::default();

        for (id, raw) in packed.iter().enumerate() {
            let node = raw.unpack(id)?;
            if node.is_empty() {
                continue;
            }
            if id == 0 {
                return Err(AccelError::MalformedNode {
                    node: 0,
                    reason: "slot 0 is reserved".into(),
                });
            }

            if node.is_leaf() {
                stats.leaves += 1;
            } else {
                stats.splits += 1;
            }
            stats.depth = stats.depth.max(31 - (id as u32).leading_zeros());
            bvh.nodes[id] = node;
        }

        stats.primitives = stats.leaves;
        bvh.stats = stats;
        bvh.version = 1;
        Ok(bvh)
    }
}
