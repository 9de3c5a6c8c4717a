//! Slot allocator - fixed pool of integer handles

use crate::error::{MemoryError, Result};
use crate::Allocator;

/// Slot allocator
///
/// Issues handles in `[0, capacity)` independent of any storage layout.
/// Allocation always returns the lowest unused slot, so the issue order is
/// deterministic. Occupancy is tracked one bit per slot.
#[derive(Clone, Debug)]
pub struct SlotAllocator {
    /// Occupancy bits, one per slot
    words: Vec<u64>,
    /// Number of slots
    capacity: usize,
    /// Number of issued slots
    live: usize,
}

impl SlotAllocator {
    /// Bits per word
    const BITS_PER_WORD: usize = 64;

    /// Create a new slot allocator with `capacity` handles
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity <= u32::MAX as usize);
        let words = (capacity + Self::BITS_PER_WORD - 1) / Self::BITS_PER_WORD;
        Self {
            words: vec![0; words],
            capacity,
            live: 0,
        }
    }

    #[inline]
    fn locate(slot: usize) -> (usize, u64) {
        (slot / Self::BITS_PER_WORD, 1u64 << (slot % Self::BITS_PER_WORD))
    }

    /// Issue the lowest unused slot
    pub fn allocate(&mut self) -> Result<u32> {
        for (word_idx, word) in self.words.iter_mut().enumerate() {
            if *word == u64::MAX {
                continue;
            }

            let bit = (!*word).trailing_zeros() as usize;
            let slot = word_idx * Self::BITS_PER_WORD + bit;
            if slot >= self.capacity {
                break;
            }

            *word |= 1u64 << bit;
            self.live += 1;
            return Ok(slot as u32);
        }

        Err(MemoryError::OutOfSlots {
            capacity: self.capacity,
        })
    }

    /// Return a slot to the unused set
    pub fn release(&mut self, slot: u32) -> Result<()> {
        if !self.is_live(slot) {
            log::warn!("Slot allocator: release of slot {} that is not live", slot);
            return Err(MemoryError::InvalidHandle(slot));
        }

        let (word, mask) = Self::locate(slot as usize);
        self.words[word] &= !mask;
        self.live -= 1;
        Ok(())
    }

    /// Check whether a slot is currently issued
    pub fn is_live(&self, slot: u32) -> bool {
        let slot = slot as usize;
        if slot >= self.capacity {
            return false;
        }
        let (word, mask) = Self::locate(slot);
        self.words[word] & mask != 0
    }

    /// Number of issued slots
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if no slots are issued
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over issued slots in ascending order
    pub fn iter_live(&self) -> impl Iterator<Item = u32> + '_ {
        let capacity = self.capacity;
        self.words.iter().enumerate().flat_map(move |(word_idx, &word)| {
            (0..Self::BITS_PER_WORD).filter_map(move |bit| {
                let slot = word_idx * Self::BITS_PER_WORD + bit;
                if slot < capacity && (word & (1u64 << bit)) != 0 {
                    Some(slot as u32)
                } else {
                    None
                }
            })
        })
    }

    /// Get statistics
    pub fn stats(&self) -> SlotStats {
        SlotStats {
            capacity: self.capacity,
            live: self.live,
            free: self.capacity - self.live,
        }
    }
}

impl Allocator for SlotAllocator {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn used(&self) -> usize {
        self.live
    }

    fn reset(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
        self.live = 0;
    }
}

/// Slot allocator statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotStats {
    pub capacity: usize,
    pub live: usize,
    pub free: usize,
}
