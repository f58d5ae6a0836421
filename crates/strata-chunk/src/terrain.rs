use strata_blocks::{BEDROCK, DIRT, GRASS, STONE};
use strata_world::{NoiseSource, CHUNK_SIZE};

use crate::ChunkVolume;

/// Fills a zeroed volume with the terrain column stack: bedrock floor,
/// stone body, a three-voxel dirt band, and a grass cap at the surface
/// height. Cells above the surface stay air.
pub fn fill_terrain(vol: &mut ChunkVolume, noise: &NoiseSource) {
    let (base_x, base_z) = vol.coord.base();
    for z in 0..CHUNK_SIZE {
        let wz = base_z + z as i32;
        for x in 0..CHUNK_SIZE {
            let wx = base_x + x as i32;
            let h = noise.surface_height(wx, wz);
            for y in 0..=h {
                let block = if y == 0 {
                    BEDROCK
                } else if y == h {
                    GRASS
                } else if y >= h - 3 {
                    DIRT
                } else {
                    STONE
                };
                vol.set_local(x, y as usize, z, block);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_blocks::AIR;
    use strata_world::{ChunkCoord, WORLD_HEIGHT};

    #[test]
    fn bedrock_floor_and_grass_cap() {
        let noise = NoiseSource::new(1234567);
        let mut vol = ChunkVolume::new_empty(ChunkCoord::new(0, 0));
        fill_terrain(&mut vol, &noise);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                assert_eq!(vol.get_local(x, 0, z), BEDROCK);
                let top = vol.top_y_local(x, z).unwrap();
                assert_eq!(vol.get_local(x, top, z), GRASS);
                let h = noise.surface_height(x as i32, z as i32);
                assert_eq!(top as i32, h);
            }
        }
    }

    #[test]
    fn column_stack_order() {
        let noise = NoiseSource::new(42);
        let mut vol = ChunkVolume::new_empty(ChunkCoord::new(-2, 3));
        fill_terrain(&mut vol, &noise);
        let h = vol.top_y_local(7, 7).unwrap();
        for y in 1..h {
            let b = vol.get_local(7, y, 7);
            if y as i32 >= h as i32 - 3 {
                assert_eq!(b, DIRT);
            } else {
                assert_eq!(b, STONE);
            }
        }
        for y in (h + 1)..WORLD_HEIGHT {
            assert_eq!(vol.get_local(7, y, 7), AIR);
        }
    }
}
