//! Block allocator - contiguous ranges over a fixed-capacity buffer

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::error::{MemoryError, Result};
use crate::Allocator;

/// Placement policy for choosing free blocks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlacementPolicy {
    /// First block that fits
    #[default]
    FirstFit,
    /// Best fitting block (smallest that fits)
    BestFit,
    /// Worst fitting block (largest)
    WorstFit,
}

/// Block allocator
///
/// Hands out `(offset, length)` ranges of a buffer with `capacity` elements.
/// Released ranges go to a free list and are reused by later allocations;
/// the remainder of the buffer past `high_water` has never been touched.
/// Offsets never move: there is no compaction.
#[derive(Clone, Debug)]
pub struct BlockAllocator {
    /// Total capacity in elements
    capacity: usize,
    /// Released ranges below the frontier (offset, length), sorted by offset
    free_blocks: Vec<(usize, usize)>,
    /// Live ranges, offset -> length
    live: BTreeMap<usize, usize>,
    /// Start of untouched capacity
    frontier: usize,
    /// Elements currently handed out
    used: usize,
    /// Placement policy
    policy: PlacementPolicy,
}

impl BlockAllocator {
    /// Create a new block allocator
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, PlacementPolicy::FirstFit)
    }

    /// Create with a specific placement policy
    pub fn with_policy(capacity: usize, policy: PlacementPolicy) -> Self {
        Self {
            capacity,
            free_blocks: Vec::new(),
            live: BTreeMap::new(),
            frontier: 0,
            used: 0,
            policy,
        }
    }

    /// Index into `free_blocks` of the run `policy` picks for `length`
    ///
    /// Equal candidates resolve to the lowest offset, since the list is kept
    /// sorted by offset.
    fn find_block(&self, length: usize) -> Option<usize> {
        let mut fits = self
            .free_blocks
            .iter()
            .enumerate()
            .filter(|&(_, &(_, size))| size >= length);

        match self.policy {
            PlacementPolicy::FirstFit => fits.next(),
            PlacementPolicy::BestFit => fits.min_by_key(|&(_, &(_, size))| size),
            PlacementPolicy::WorstFit => fits.min_by_key(|&(_, &(_, size))| Reverse(size)),
        }
        .map(|(index, _)| index)
    }

    /// Reserve `length` contiguous elements and return the range offset
    pub fn allocate(&mut self, length: usize) -> Result<usize> {
        if length == 0 {
            return Err(MemoryError::ZeroLength);
        }

        let offset = if let Some(idx) = self.find_block(length) {
            let (offset, size) = self.free_blocks[idx];
            if size > length {
                // Split: keep the tail on the free list
                self.free_blocks[idx] = (offset + length, size - length);
            } else {
                self.free_blocks.remove(idx);
            }
            offset
        } else if self.capacity - self.frontier >= length {
            let offset = self.frontier;
            self.frontier += length;
            offset
        } else {
            return Err(MemoryError::OutOfSpace {
                requested: length,
                largest_free: self.largest_free_block(),
                capacity: self.capacity,
            });
        };

        self.live.insert(offset, length);
        self.used += length;

        Ok(offset)
    }

    /// Release the block starting at `offset`, returning its length
    pub fn release(&mut self, offset: usize) -> Result<usize> {
        let Some(length) = self.live.remove(&offset) else {
            log::warn!("Block allocator: release of unknown offset {}", offset);
            return Err(MemoryError::InvalidOffset(offset));
        };

        self.free_blocks.push((offset, length));
        self.coalesce();
        self.used -= length;

        Ok(length)
    }

    /// Re-sort the free list, fuse touching runs, and hand a run that ends at
    /// the frontier back to untouched space
    fn coalesce(&mut self) {
        self.free_blocks.sort_unstable_by_key(|&(offset, _)| offset);

        let mut fused: Vec<(usize, usize)> = Vec::with_capacity(self.free_blocks.len());
        for (offset, length) in self.free_blocks.drain(..) {
            match fused.last_mut() {
                Some((start, run)) if *start + *run == offset => *run += length,
                _ => fused.push((offset, length)),
            }
        }

        if let Some(&(offset, length)) = fused.last() {
            if offset + length == self.frontier {
                fused.pop();
                self.frontier = offset;
            }
        }
        self.free_blocks = fused;
    }

    /// Length of the live block at `offset`
    pub fn length_of(&self, offset: usize) -> Option<usize> {
        self.live.get(&offset).copied()
    }

    /// Check whether `offset` starts a live block
    pub fn is_live(&self, offset: usize) -> bool {
        self.live.contains_key(&offset)
    }

    /// Live block covering element `index`, as (offset, length)
    pub fn block_containing(&self, index: usize) -> Option<(usize, usize)> {
        self.live
            .range(..=index)
            .next_back()
            .map(|(&offset, &length)| (offset, length))
            .filter(|&(offset, length)| index < offset + length)
    }

    /// Iterate over live blocks as (offset, length), ascending by offset
    pub fn live_blocks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.live.iter().map(|(&offset, &length)| (offset, length))
    }

    /// Number of live blocks
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Start of the never-used tail of the buffer
    ///
    /// Every live block ends at or before this point.
    pub fn high_water(&self) -> usize {
        self.frontier
    }

    /// Largest contiguous range an allocation could get right now
    pub fn largest_free_block(&self) -> usize {
        let listed = self.free_blocks.iter().map(|(_, s)| *s).max().unwrap_or(0);
        listed.max(self.capacity - self.frontier)
    }

    /// Get allocation statistics
    pub fn stats(&self) -> BlockStats {
        BlockStats {
            capacity: self.capacity,
            used: self.used,
            free: self.capacity - self.used,
            live_blocks: self.live.len(),
            free_blocks: self.free_blocks.len(),
            largest_free_block: self.largest_free_block(),
            high_water: self.frontier,
        }
    }
}

impl Allocator for BlockAllocator {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn used(&self) -> usize {
        self.used
    }

    fn reset(&mut self) {
        self.free_blocks.clear();
        self.live.clear();
        self.frontier = 0;
        self.used = 0;
    }
}

/// Block allocator statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockStats {
    pub capacity: usize,
    pub used: usize,
    pub free: usize,
    pub live_blocks: usize,
    pub free_blocks: usize,
    pub largest_free_block: usize,
    pub high_water: usize,
}
