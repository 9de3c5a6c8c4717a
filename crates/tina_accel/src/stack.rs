//! Fixed-size traversal stack

/// Maximum number of pending nodes
///
/// Node ids are u32 and the tree is implicit, so depth never exceeds 32 and
/// a depth-first walk holds at most one pending sibling per level.
pub const STACK_SIZE: usize = 64;

/// Array-backed stack of node ids
///
/// Lives entirely on the caller's stack so a traversal performs no heap
/// allocation.
#[derive(Clone, Debug)]
pub struct TraversalStack {
    items: [u32; STACK_SIZE],
    len: usize,
}

impl TraversalStack {
    /// Create an empty stack
    #[inline]
    pub const fn new() -> Self {
        Self {
            items: [0; STACK_SIZE],
            len: 0,
        }
    }

    /// Push a node id; returns false when full
    #[inline]
    pub fn push(&mut self, node: u32) -> bool {
        if self.len == STACK_SIZE {
            return false;
        }
        self.items[self.len] = node;
        self.len += 1;
        true
    }

    #[inline]
    pub fn pop(&mut self) -> Option<u32> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.items[self.len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for TraversalStack {
    fn default() -> Self {
        Self::new()
    }
}
