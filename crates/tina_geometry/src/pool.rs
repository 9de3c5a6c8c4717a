//! Geometry pool
//!
//! All objects share one fixed-capacity array of [`VertexRecord`]s. Each
//! object owns a contiguous block of it (from the block allocator) and an
//! identity (from the slot allocator). Triangles are addressed globally:
//! triangle `i` is records `[3i, 3i + 3)` of the shared array, whatever
//! object they belong to. Blocks are always whole triangles, so object
//! boundaries never split a triangle.

use core::ops::Range;

use tina_accel::TriangleSource;
use tina_math::{Vec3, AABB};
use tina_memory::{Allocator, BlockAllocator, BlockStats, PlacementPolicy, SlotAllocator, SlotStats};

use crate::error::{GeometryError, Result};
use crate::handle::ObjectHandle;
use crate::vertex::{Triangle, VertexRecord};

/// Per-slot bookkeeping
#[derive(Clone, Copy, Debug, Default)]
struct ObjectEntry {
    offset: usize,
    count: usize,
    generation: u32,
}

/// Shared vertex storage for every loaded object
#[derive(Clone, Debug)]
pub struct GeometryPool {
    records: Vec<VertexRecord>,
    blocks: BlockAllocator,
    slots: SlotAllocator,
    objects: Vec<ObjectEntry>,
}

impl GeometryPool {
    /// Create a pool holding up to `vertex_capacity` records and
    /// `object_capacity` objects
    pub fn new(vertex_capacity: usize, object_capacity: usize) -> Self {
        Self::with_policy(vertex_capacity, object_capacity, PlacementPolicy::default())
    }

    /// Create with a specific block placement policy
    pub fn with_policy(
        vertex_capacity: usize,
        object_capacity: usize,
        policy: PlacementPolicy,
    ) -> Self {
        Self {
            records: vec![VertexRecord::default(); vertex_capacity],
            blocks: BlockAllocator::with_policy(vertex_capacity, policy),
            slots: SlotAllocator::new(object_capacity),
            objects: vec![ObjectEntry::default(); object_capacity],
        }
    }

    // ========================================================================
    // Object lifecycle
    // ========================================================================

    /// Allocate a slot and a block, all or nothing
    fn allocate_object(&mut self, count: usize) -> Result<ObjectHandle> {
        if count == 0 || count % 3 != 0 {
            return Err(GeometryError::InvalidVertexCount(count));
        }

        let offset = self.blocks.allocate(count)?;
        let slot = match self.slots.allocate() {
            Ok(slot) => slot,
            Err(err) => {
                self.blocks.release(offset)?;
                return Err(err.into());
            }
        };

        let entry = &mut self.objects[slot as usize];
        entry.offset = offset;
        entry.count = count;
        Ok(ObjectHandle::new(slot, entry.generation))
    }

    /// Store a new object and return its handle
    ///
    /// `records` must be a non-zero multiple of 3 long. On failure nothing is
    /// allocated and the pool is unchanged.
    pub fn load(&mut self, records: &[VertexRecord]) -> Result<ObjectHandle> {
        let handle = self.allocate_object(records.len())?;
        let range = self.vertex_range(handle);
        self.records[range.clone()].copy_from_slice(records);

        log::debug!(
            "Loaded object {} ({} triangles at vertex {})",
            handle,
            records.len() / 3,
            range.start
        );
        Ok(handle)
    }

    /// Store a new object from packed floats, eight per vertex
    pub fn load_floats(&mut self, floats: &[f32]) -> Result<ObjectHandle> {
        let records: &[VertexRecord] = bytemuck::try_cast_slice(floats)
            .map_err(|_| GeometryError::InvalidFloatCount(floats.len()))?;
        self.load(records)
    }

    /// Allocate an object of `vertex_count` zeroed records
    ///
    /// Fill it afterwards with [`import`](Self::import).
    pub fn reserve(&mut self, vertex_count: usize) -> Result<ObjectHandle> {
        let handle = self.allocate_object(vertex_count)?;
        let range = self.vertex_range(handle);
        self.records[range.clone()].fill(VertexRecord::default());

        log::debug!("Reserved object {} ({} vertices at {})", handle, vertex_count, range.start);
        Ok(handle)
    }

    /// Overwrite an object's records in bulk
    pub fn import(&mut self, handle: ObjectHandle, records: &[VertexRecord]) -> Result<()> {
        let range = self.object_range(handle)?;
        if records.len() != range.len() {
            return Err(GeometryError::LengthMismatch {
                expected: range.len(),
                found: records.len(),
            });
        }
        self.records[range].copy_from_slice(records);
        Ok(())
    }

    /// Borrow an object's records
    pub fn records_of(&self, handle: ObjectHandle) -> Result<&[VertexRecord]> {
        let range = self.object_range(handle)?;
        Ok(&self.records[range])
    }

    /// Copy an object's records out
    pub fn export(&self, handle: ObjectHandle) -> Result<Vec<VertexRecord>> {
        self.records_of(handle).map(<[VertexRecord]>::to_vec)
    }

    /// Free an object's block and slot
    ///
    /// The handle, and any copy of it, is stale afterwards.
    pub fn delete(&mut self, handle: ObjectHandle) -> Result<()> {
        let range = self.object_range(handle)?;
        self.blocks.release(range.start)?;
        self.slots.release(handle.slot())?;

        let entry = &mut self.objects[handle.slot() as usize];
        entry.generation = entry.generation.wrapping_add(1);
        entry.count = 0;

        log::debug!("Deleted object {} ({} vertices at {})", handle, range.len(), range.start);
        Ok(())
    }

    /// Delete every object
    pub fn clear(&mut self) {
        for slot in self.slots.iter_live().collect::<Vec<_>>() {
            let entry = &mut self.objects[slot as usize];
            entry.generation = entry.generation.wrapping_add(1);
            entry.count = 0;
        }
        self.blocks.reset();
        self.slots.reset();
    }

    // ========================================================================
    // Object queries
    // ========================================================================

    /// Check whether a handle still refers to a live object
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.slots.is_live(handle.slot())
            && self.objects[handle.slot() as usize].generation == handle.generation()
    }

    /// Vertex range of a live object in the shared array
    pub fn object_range(&self, handle: ObjectHandle) -> Result<Range<usize>> {
        if !self.contains(handle) {
            log::warn!("Stale object handle {}", handle);
            return Err(GeometryError::StaleHandle(handle));
        }
        Ok(self.vertex_range(handle))
    }

    /// Global triangle indices of a live object
    pub fn triangle_range(&self, handle: ObjectHandle) -> Result<Range<u32>> {
        let range = self.object_range(handle)?;
        Ok((range.start / 3) as u32..(range.end / 3) as u32)
    }

    fn vertex_range(&self, handle: ObjectHandle) -> Range<usize> {
        let entry = &self.objects[handle.slot() as usize];
        entry.offset..entry.offset + entry.count
    }

    /// Iterate over live objects with their vertex ranges, by slot
    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, Range<usize>)> + '_ {
        self.slots.iter_live().map(move |slot| {
            let entry = &self.objects[slot as usize];
            (
                ObjectHandle::new(slot, entry.generation),
                entry.offset..entry.offset + entry.count,
            )
        })
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.slots.len()
    }

    // ========================================================================
    // Triangle access
    // ========================================================================

    /// Read triangle `index` with all attributes
    pub fn triangle_at(&self, index: u32) -> Result<Triangle> {
        let base = self.checked_base(index)?;
        let [v0, v1, v2] = [base, base + 1, base + 2].map(|i| self.records[i]);
        Ok(Triangle::new(v0, v1, v2))
    }

    /// Axis-aligned box of triangle `index`
    pub fn bounding_box_of(&self, index: u32) -> Result<AABB> {
        let base = self.checked_base(index)?;
        Ok(self.bounds_at(base))
    }

    fn checked_base(&self, index: u32) -> Result<usize> {
        let span = self.triangle_span();
        if index >= span {
            return Err(GeometryError::TriangleOutOfRange { index, span });
        }
        let base = index as usize * 3;
        if self.blocks.block_containing(base).is_none() {
            return Err(GeometryError::TriangleNotLive(index));
        }
        Ok(base)
    }

    #[inline]
    fn bounds_at(&self, base: usize) -> AABB {
        AABB::from_points(&[
            self.records[base].position(),
            self.records[base + 1].position(),
            self.records[base + 2].position(),
        ])
    }

    /// Number of live triangles
    pub fn total_triangle_count(&self) -> usize {
        self.blocks.used() / 3
    }

    /// Number of live vertex records
    pub fn total_vertex_count(&self) -> usize {
        self.blocks.used()
    }

    /// One past the highest triangle index that has ever been live
    ///
    /// Equal to [`total_triangle_count`](Self::total_triangle_count) until
    /// something below the top is deleted.
    pub fn triangle_span(&self) -> u32 {
        (self.blocks.high_water() / 3) as u32
    }

    /// Global indices of every live triangle, ascending
    pub fn live_triangle_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.blocks
            .live_blocks()
            .flat_map(|(offset, length)| (offset / 3) as u32..((offset + length) / 3) as u32)
    }

    /// `(index, box)` of every live triangle, ascending by index
    ///
    /// This is the input the hierarchy build expects. With the `parallel`
    /// feature the boxes are computed one task per triangle.
    pub fn triangle_bounds(&self) -> Vec<(u32, AABB)> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            let indices: Vec<u32> = self.live_triangle_indices().collect();
            indices
                .into_par_iter()
                .map(|index| (index, self.bounds_at(index as usize * 3)))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.live_triangle_indices()
                .map(|index| (index, self.bounds_at(index as usize * 3)))
                .collect()
        }
    }

    // ========================================================================
    // Storage
    // ========================================================================

    /// The whole backing array as packed floats, eight per record
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.records)
    }

    /// The whole backing array
    pub fn records(&self) -> &[VertexRecord] {
        &self.records
    }

    pub fn vertex_capacity(&self) -> usize {
        self.records.len()
    }

    pub fn object_capacity(&self) -> usize {
        self.objects.len()
    }

    pub fn block_stats(&self) -> BlockStats {
        self.blocks.stats()
    }

    pub fn slot_stats(&self) -> SlotStats {
        self.slots.stats()
    }
}

impl TriangleSource for GeometryPool {
    /// Positions of triangle `index`
    ///
    /// Only checks that the records exist; liveness is the caller's concern,
    /// since the hierarchy is rebuilt after every delete.
    fn triangle_positions(&self, index: u32) -> Option<[Vec3; 3]> {
        let base = index as usize * 3;
        let tri = self.records.get(base..base + 3)?;
        Some([tri[0].position(), tri[1].position(), tri[2].position()])
    }
}
