use hashbrown::{HashMap, HashSet};

use strata_blocks::{BlockId, AIR};
use strata_chunk::ChunkVolume;
use strata_world::{ChunkCoord, NoiseSource, WORLD_HEIGHT};

/// One resident chunk. `rev` counts edits so a save completion can tell
/// whether the entry changed after its snapshot was taken.
pub struct ChunkEntry {
    pub volume: ChunkVolume,
    pub dirty: bool,
    pub mesh_attached: bool,
    pub rev: u64,
}

#[derive(Default, Clone, Copy, Debug)]
pub struct ResidencyStats {
    pub resident: usize,
    pub dirty: usize,
}

/// Owner of every resident chunk volume. All voxel reads and writes route
/// through here; the mesh extractor borrows volumes immutably during a
/// build.
pub struct VoxelResidency {
    slots: HashMap<ChunkCoord, ChunkEntry>,
    dirty: HashSet<ChunkCoord>,
}

impl Default for VoxelResidency {
    fn default() -> Self {
        Self::new()
    }
}

impl VoxelResidency {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            dirty: HashSet::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.slots.contains_key(&coord)
    }

    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkVolume> {
        self.slots.get(&coord).map(|e| &e.volume)
    }

    #[inline]
    pub fn entry_mut(&mut self, coord: ChunkCoord) -> Option<&mut ChunkEntry> {
        self.slots.get_mut(&coord)
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.slots.keys().copied()
    }

    pub fn put(&mut self, coord: ChunkCoord, volume: ChunkVolume, dirty: bool) {
        debug_assert_eq!(volume.coord, coord);
        if dirty {
            self.dirty.insert(coord);
        } else {
            self.dirty.remove(&coord);
        }
        self.slots.insert(
            coord,
            ChunkEntry {
                volume,
                dirty,
                mesh_attached: false,
                rev: 0,
            },
        );
    }

    /// Removes the entry; the caller is responsible for having persisted a
    /// dirty chunk first.
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<ChunkEntry> {
        self.dirty.remove(&coord);
        self.slots.remove(&coord)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.dirty.clear();
    }

    /// Voxel read at world coordinates. Air for out-of-range `y` and for
    /// columns whose chunk is not resident.
    pub fn get_block(&self, wx: i32, wy: i32, wz: i32) -> BlockId {
        if wy < 0 || wy >= WORLD_HEIGHT as i32 {
            return AIR;
        }
        let coord = ChunkCoord::containing(wx, wz);
        match self.slots.get(&coord) {
            Some(entry) => entry.volume.get_world(wx, wy, wz).unwrap_or(AIR),
            None => AIR,
        }
    }

    #[inline]
    pub fn has_block(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self.get_block(wx, wy, wz) != AIR
    }

    /// Voxel write at world coordinates. Out-of-range `y` is a no-op, and a
    /// write into a non-resident chunk is rejected; both return `false`.
    /// A successful write marks the chunk dirty and bumps its revision.
    pub fn set_block(&mut self, wx: i32, wy: i32, wz: i32, block: BlockId) -> bool {
        if wy < 0 || wy >= WORLD_HEIGHT as i32 {
            return false;
        }
        let coord = ChunkCoord::containing(wx, wz);
        let Some(entry) = self.slots.get_mut(&coord) else {
            return false;
        };
        let (base_x, base_z) = coord.base();
        entry.volume.set_local(
            (wx - base_x) as usize,
            wy as usize,
            (wz - base_z) as usize,
            block,
        );
        entry.dirty = true;
        entry.rev += 1;
        self.dirty.insert(coord);
        true
    }

    /// Highest non-air `y` of a column, scanning down from the top. For a
    /// column whose chunk is not resident, answers with the terrain formula
    /// so physics over ungenerated ground still get a plausible height.
    pub fn top_y(&self, wx: i32, wz: i32, noise: &NoiseSource) -> i32 {
        let coord = ChunkCoord::containing(wx, wz);
        let Some(entry) = self.slots.get(&coord) else {
            return noise.surface_height(wx, wz);
        };
        let (base_x, base_z) = coord.base();
        entry
            .volume
            .top_y_local((wx - base_x) as usize, (wz - base_z) as usize)
            .unwrap_or(0) as i32
    }

    #[inline]
    pub fn is_dirty(&self, coord: ChunkCoord) -> bool {
        self.dirty.contains(&coord)
    }

    pub fn dirty_keys(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.dirty.iter().copied()
    }

    /// Byte snapshot of every dirty chunk plus the revision it was taken at.
    pub fn snapshot_dirty(&self) -> Vec<(ChunkCoord, Vec<u8>, u64)> {
        self.dirty
            .iter()
            .filter_map(|coord| {
                self.slots
                    .get(coord)
                    .map(|e| (*coord, e.volume.blocks.clone(), e.rev))
            })
            .collect()
    }

    /// Clears the dirty flag unless the entry was edited after the given
    /// revision was snapshotted.
    pub fn mark_clean_at(&mut self, coord: ChunkCoord, rev: u64) {
        if let Some(entry) = self.slots.get_mut(&coord) {
            if entry.rev <= rev {
                entry.dirty = false;
                self.dirty.remove(&coord);
            }
        }
    }

    pub fn stats(&self) -> ResidencyStats {
        ResidencyStats {
            resident: self.slots.len(),
            dirty: self.dirty.len(),
        }
    }

    /// Farthest resident chunks beyond the soft cap, bounded to one
    /// eviction batch. The caller routes dirty candidates through the store
    /// before removing them.
    pub fn eviction_candidates(
        &self,
        center: ChunkCoord,
        soft_cap: usize,
        batch: usize,
    ) -> Vec<ChunkCoord> {
        if self.slots.len() <= soft_cap {
            return Vec::new();
        }
        let mut coords: Vec<ChunkCoord> = self.slots.keys().copied().collect();
        coords.sort_by_key(|c| std::cmp::Reverse(c.distance_sq(center)));
        let overflow = self.slots.len() - soft_cap;
        coords.truncate(overflow.min(batch));
        coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_blocks::STONE;

    fn resident(res: &mut VoxelResidency, cx: i32, cz: i32) {
        let coord = ChunkCoord::new(cx, cz);
        res.put(coord, ChunkVolume::new_empty(coord), false);
    }

    #[test]
    fn set_then_get_round_trips_and_marks_dirty() {
        let mut res = VoxelResidency::new();
        resident(&mut res, 0, 0);
        assert!(res.set_block(5, 25, 5, STONE));
        assert_eq!(res.get_block(5, 25, 5), STONE);
        assert!(res.is_dirty(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn writes_outside_height_or_residency_are_rejected() {
        let mut res = VoxelResidency::new();
        resident(&mut res, 0, 0);
        assert!(!res.set_block(5, -1, 5, STONE));
        assert!(!res.set_block(5, WORLD_HEIGHT as i32, 5, STONE));
        assert!(!res.set_block(100, 25, 5, STONE));
        assert_eq!(res.stats().dirty, 0);
    }

    #[test]
    fn reads_fall_back_to_air() {
        let res = VoxelResidency::new();
        assert_eq!(res.get_block(0, 10, 0), AIR);
        assert_eq!(res.get_block(0, -5, 0), AIR);
        assert!(!res.has_block(0, 10, 0));
    }

    #[test]
    fn top_y_scans_resident_columns_and_falls_back_to_terrain() {
        let noise = NoiseSource::new(99);
        let mut res = VoxelResidency::new();
        resident(&mut res, 0, 0);
        assert_eq!(res.top_y(3, 3, &noise), 0);
        res.set_block(3, 70, 3, STONE);
        assert_eq!(res.top_y(3, 3, &noise), 70);
        // Chunk (10,10) is absent: formula answer.
        assert_eq!(res.top_y(320, 320, &noise), noise.surface_height(320, 320));
    }

    #[test]
    fn mark_clean_respects_later_edits() {
        let mut res = VoxelResidency::new();
        resident(&mut res, 0, 0);
        res.set_block(1, 1, 1, STONE);
        let snap = res.snapshot_dirty();
        assert_eq!(snap.len(), 1);
        let (coord, _, rev) = (snap[0].0, &snap[0].1, snap[0].2);

        // Edit after the snapshot: the flag must survive mark_clean_at.
        res.set_block(2, 1, 1, STONE);
        res.mark_clean_at(coord, rev);
        assert!(res.is_dirty(coord));

        let snap2 = res.snapshot_dirty();
        res.mark_clean_at(coord, snap2[0].2);
        assert!(!res.is_dirty(coord));
    }

    #[test]
    fn eviction_prefers_the_farthest_chunks() {
        let mut res = VoxelResidency::new();
        for i in 0..6 {
            resident(&mut res, i, 0);
        }
        let center = ChunkCoord::new(0, 0);
        assert!(res.eviction_candidates(center, 6, 50).is_empty());
        let victims = res.eviction_candidates(center, 4, 50);
        assert_eq!(victims.len(), 2);
        assert!(victims.contains(&ChunkCoord::new(5, 0)));
        assert!(victims.contains(&ChunkCoord::new(4, 0)));
        let bounded = res.eviction_candidates(center, 4, 1);
        assert_eq!(bounded, vec![ChunkCoord::new(5, 0)]);
    }
}
