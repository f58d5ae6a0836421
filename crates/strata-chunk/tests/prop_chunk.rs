use proptest::prelude::*;
use strata_blocks::AIR;
use strata_chunk::{generate_chunk_volume, ChunkVolume, VOLUME_LEN};
use strata_world::{ChunkCoord, NoiseSource, CHUNK_SIZE, WORLD_HEIGHT};

fn small_i32() -> impl Strategy<Value = i32> {
    -1_000_000i32..=1_000_000
}

// idx maps each (x,y,z) within bounds to unique in-range indices
#[test]
fn idx_is_unique_and_in_range() {
    let mut seen = vec![false; VOLUME_LEN];
    for z in 0..CHUNK_SIZE {
        for y in 0..WORLD_HEIGHT {
            for x in 0..CHUNK_SIZE {
                let i = ChunkVolume::idx(x, y, z);
                assert!(i < VOLUME_LEN);
                assert!(!seen[i]);
                seen[i] = true;
            }
        }
    }
    assert!(seen.into_iter().all(|b| b));
}

proptest! {
    // contains_world matches the bounds check and agrees with get_world
    #[test]
    fn contains_world_and_get_world_agree(cx in small_i32(), cz in small_i32()) {
        let coord = ChunkCoord::new(cx, cz);
        let blocks = (0..VOLUME_LEN).map(|i| (i % 251) as u8).collect();
        let vol = ChunkVolume::from_bytes(coord, blocks);
        let (x0, z0) = coord.base();
        let s = CHUNK_SIZE as i32;
        let h = WORLD_HEIGHT as i32;

        let candidates = [
            (x0, 0, z0),
            (x0 + s - 1, h - 1, z0 + s - 1),
            (x0 - 1, 0, z0),
            (x0 + s, 0, z0),
            (x0, -1, z0),
            (x0, h, z0),
            (x0, 0, z0 - 1),
            (x0, 0, z0 + s),
        ];
        for (wx, wy, wz) in candidates {
            let inside = wy >= 0 && wy < h && wx >= x0 && wx < x0 + s && wz >= z0 && wz < z0 + s;
            prop_assert_eq!(vol.contains_world(wx, wy, wz), inside);
            match vol.get_world(wx, wy, wz) {
                None => prop_assert!(!inside),
                Some(b) => {
                    prop_assert!(inside);
                    let (lx, ly, lz) = ((wx - x0) as usize, wy as usize, (wz - z0) as usize);
                    prop_assert_eq!(b, vol.get_local(lx, ly, lz));
                }
            }
        }
    }

    // from_bytes pads or truncates to the exact volume length
    #[test]
    fn from_bytes_normalizes_length(len in 0usize..(2 * VOLUME_LEN)) {
        let vol = ChunkVolume::from_bytes(ChunkCoord::new(0, 0), vec![AIR; len]);
        prop_assert_eq!(vol.blocks.len(), VOLUME_LEN);
    }

    // generation is a pure function of (seed, coord)
    #[test]
    fn generation_is_deterministic(seed in any::<u32>(), cx in -64i32..64, cz in -64i32..64) {
        let coord = ChunkCoord::new(cx, cz);
        let a = generate_chunk_volume(coord, &NoiseSource::new(seed));
        let b = generate_chunk_volume(coord, &NoiseSource::new(seed));
        prop_assert_eq!(a.blocks, b.blocks);
    }
}
