use proptest::prelude::*;
use strata::blocks::{AIR, STONE};
use strata::{ChunkCoord, ChunkVolume, VoxelResidency, WORLD_HEIGHT};

proptest! {
    // set_block/get_block round-trip over arbitrary world coordinates
    #[test]
    fn set_then_get_round_trips(
        wx in -512i32..=512,
        wy in 0i32..WORLD_HEIGHT as i32,
        wz in -512i32..=512,
        block in 1u8..9,
    ) {
        let mut res = VoxelResidency::new();
        let coord = ChunkCoord::containing(wx, wz);
        res.put(coord, ChunkVolume::new_empty(coord), false);
        prop_assert!(res.set_block(wx, wy, wz, block));
        prop_assert_eq!(res.get_block(wx, wy, wz), block);
        prop_assert!(res.is_dirty(coord));
    }

    // heights outside [0, H) read air and drop writes
    #[test]
    fn out_of_range_heights_are_inert(
        wx in -512i32..=512,
        wz in -512i32..=512,
        wy in prop_oneof![-64i32..0, WORLD_HEIGHT as i32..WORLD_HEIGHT as i32 + 64],
    ) {
        let mut res = VoxelResidency::new();
        let coord = ChunkCoord::containing(wx, wz);
        res.put(coord, ChunkVolume::new_empty(coord), false);
        prop_assert_eq!(res.get_block(wx, wy, wz), AIR);
        prop_assert!(!res.set_block(wx, wy, wz, STONE));
        prop_assert!(!res.is_dirty(coord));
    }
}
