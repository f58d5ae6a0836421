use strata_blocks::{BlockId, AIR, COAL_ORE, GRASS, IRON_ORE, LEAVES, STONE, WOOD};
use strata_world::{mix_chunk_seed, rand01, DecorRng, NoiseSource, CHUNK_SIZE, WORLD_HEIGHT};

use crate::ChunkVolume;

const TREE_PROBABILITY: f32 = 0.01;
const TREE_SALT: u32 = 0xA53F9;
const TRUNK_SALT: u32 = 0x0051_F0A7;
const CORNER_SALT: u32 = 0x5EAF_00D5;

/// Trees never root closer than this to the chunk edge, so canopies stay
/// inside the volume and never cross chunk seams.
const TREE_MARGIN: usize = 2;

const VEIN_DIRS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Runs the decoration passes on a terrain-filled volume: ore veins first,
/// then trees. All randomness derives from `(seed, cx, cz)`, so decoration
/// replays identically for a given world seed.
pub fn decorate(vol: &mut ChunkVolume, noise: &NoiseSource) {
    let seed = noise.seed();
    let mut rng = DecorRng::new(seed, vol.coord.cx, vol.coord.cz);
    generate_vein(vol, noise, &mut rng, COAL_ORE, 8, 80);
    generate_vein(vol, noise, &mut rng, IRON_ORE, 6, 50);
    plant_trees(vol, seed);
}

/// Seeds `attempts` vein walks, each replacing up to `target_length` stone
/// voxels with `ore`. A step landing outside stone counts as a failure;
/// ten failures abort that vein.
fn generate_vein(
    vol: &mut ChunkVolume,
    noise: &NoiseSource,
    rng: &mut DecorRng,
    ore: BlockId,
    target_length: u32,
    attempts: u32,
) {
    let (base_x, base_z) = vol.coord.base();
    let s = CHUNK_SIZE as i32;
    for _ in 0..attempts {
        let col_x = rng.next_below(CHUNK_SIZE as u32) as i32;
        let col_z = rng.next_below(CHUNK_SIZE as u32) as i32;
        let h = noise.surface_height(base_x + col_x, base_z + col_z);
        let y_max = (h - 3).max(2);
        let mut x = col_x;
        let mut z = col_z;
        let mut y = 2 + rng.next_below((y_max - 2 + 1) as u32) as i32;
        let mut placed = 0u32;
        let mut failures = 0u32;
        while placed < target_length && failures < 10 {
            let in_bounds =
                x >= 0 && x < s && z >= 0 && z < s && y >= 1 && y < WORLD_HEIGHT as i32;
            if in_bounds && vol.get_local(x as usize, y as usize, z as usize) == STONE {
                vol.set_local(x as usize, y as usize, z as usize, ore);
                placed += 1;
            } else {
                failures += 1;
            }
            let (dx, dy, dz) = VEIN_DIRS[rng.next_below(6) as usize];
            x += dx;
            y += dy;
            z += dz;
        }
    }
}

fn trunk_height(seed: u32, wx: i32, wz: i32) -> i32 {
    4 + (mix_chunk_seed(seed ^ TRUNK_SALT, wx, wz) & 1) as i32
}

fn plant_trees(vol: &mut ChunkVolume, seed: u32) {
    let (base_x, base_z) = vol.coord.base();
    for z in TREE_MARGIN..CHUNK_SIZE - TREE_MARGIN {
        for x in TREE_MARGIN..CHUNK_SIZE - TREE_MARGIN {
            let wx = base_x + x as i32;
            let wz = base_z + z as i32;
            let Some(top) = vol.top_y_local(x, z) else {
                continue;
            };
            if vol.get_local(x, top, z) != GRASS {
                continue;
            }
            if rand01(seed, wx, wz, TREE_SALT) >= TREE_PROBABILITY {
                continue;
            }
            let trunk_top = top as i32 + trunk_height(seed, wx, wz);
            for y in (top as i32 + 1)..=trunk_top {
                if y >= WORLD_HEIGHT as i32 {
                    break;
                }
                vol.set_local(x, y as usize, z, WOOD);
            }
            for wy in (trunk_top - 2)..=(trunk_top + 1) {
                if wy < 0 || wy >= WORLD_HEIGHT as i32 {
                    continue;
                }
                let r: i32 = if wy == trunk_top + 1 { 1 } else { 2 };
                for dz in -r..=r {
                    for dx in -r..=r {
                        if dx == 0 && dz == 0 && wy <= trunk_top {
                            continue;
                        }
                        // Knock ~40% of the corner voxels off for round-off.
                        if dx.abs() == r && dz.abs() == r {
                            let salt = CORNER_SALT ^ (wy as u32).wrapping_mul(0x9E37_79B9);
                            if rand01(seed, wx + dx, wz + dz, salt) < 0.4 {
                                continue;
                            }
                        }
                        let lx = (x as i32 + dx) as usize;
                        let lz = (z as i32 + dz) as usize;
                        if vol.get_local(lx, wy as usize, lz) == AIR {
                            vol.set_local(lx, wy as usize, lz, LEAVES);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fill_terrain, generate_chunk_volume};
    use strata_blocks::BEDROCK;
    use strata_world::ChunkCoord;

    fn generated(seed: u32, cx: i32, cz: i32) -> ChunkVolume {
        generate_chunk_volume(ChunkCoord::new(cx, cz), &NoiseSource::new(seed))
    }

    #[test]
    fn decoration_is_deterministic() {
        let a = generated(42, 0, 0);
        let b = generated(42, 0, 0);
        assert_eq!(a.blocks, b.blocks);
    }

    #[test]
    fn ores_only_replace_stone_body() {
        let noise = NoiseSource::new(9001);
        let mut plain = ChunkVolume::new_empty(ChunkCoord::new(1, -4));
        fill_terrain(&mut plain, &noise);
        let mut decorated = plain.clone();
        decorate(&mut decorated, &noise);
        for i in 0..plain.blocks.len() {
            let (before, after) = (plain.blocks[i], decorated.blocks[i]);
            if after == COAL_ORE || after == IRON_ORE {
                assert_eq!(before, STONE);
            }
        }
    }

    #[test]
    fn bedrock_survives_decoration() {
        let vol = generated(7, 3, 3);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                assert_eq!(vol.get_local(x, 0, z), BEDROCK);
            }
        }
    }

    #[test]
    fn trunks_never_root_near_the_chunk_border() {
        for cc in 0..8 {
            let vol = generated(1234567, cc, -cc);
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    for y in 0..WORLD_HEIGHT {
                        if vol.get_local(x, y, z) == WOOD {
                            assert!((TREE_MARGIN..CHUNK_SIZE - TREE_MARGIN).contains(&x));
                            assert!((TREE_MARGIN..CHUNK_SIZE - TREE_MARGIN).contains(&z));
                        }
                    }
                }
            }
        }
    }
}
