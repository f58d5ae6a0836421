use std::time::Instant;

use strata_blocks::{transparent_for_culling, BlockId, AIR};
use strata_chunk::ChunkVolume;
use strata_world::{CHUNK_SIZE, WORLD_HEIGHT};

use crate::face::ALL_FACES;
use crate::mesh_build::MeshBuild;

/// Block at an arbitrary world coordinate. `None` means the owning chunk is
/// not resident, which makes the extractor emit the face conservatively so
/// unloaded neighbours never leave visible holes.
pub type NeighborLookup<'a> = dyn Fn(i32, i32, i32) -> Option<BlockId> + 'a;

/// Builds the occlusion-culled face mesh for one chunk volume. A face is
/// emitted when the voxel on its far side is transparent for culling (air or
/// leaves), unknown (neighbour chunk absent), or outside the world's vertical
/// range.
pub fn build_chunk_mesh(vol: &ChunkVolume, lookup: &NeighborLookup) -> MeshBuild {
    let t_start = Instant::now();
    let mut mb = MeshBuild::default();
    let Some((y_min, y_max)) = occupied_y_window(vol) else {
        return mb;
    };
    mb.reserve_faces(CHUNK_SIZE * CHUNK_SIZE * 2);

    let (base_x, base_z) = vol.coord.base();
    let s = CHUNK_SIZE as i32;
    for z in 0..CHUNK_SIZE {
        for y in y_min..=y_max {
            for x in 0..CHUNK_SIZE {
                let here = vol.get_local(x, y, z);
                if here == AIR {
                    continue;
                }
                for face in ALL_FACES {
                    let (dx, dy, dz) = face.delta();
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    let nz = z as i32 + dz;
                    let open = if ny < 0 || ny >= WORLD_HEIGHT as i32 {
                        // Outside the vertical range reads as air.
                        true
                    } else if nx >= 0 && nx < s && nz >= 0 && nz < s {
                        transparent_for_culling(vol.get_local(
                            nx as usize,
                            ny as usize,
                            nz as usize,
                        ))
                    } else {
                        match lookup(base_x + nx, ny, base_z + nz) {
                            Some(nb) => transparent_for_culling(nb),
                            None => true,
                        }
                    };
                    if open {
                        mb.add_face(face, here, x as f32, y as f32, z as f32);
                    }
                }
            }
        }
    }

    log::debug!(
        target: "mesh",
        "built cx={} cz={} faces={} in {}us",
        vol.coord.cx,
        vol.coord.cz,
        mb.face_count(),
        t_start.elapsed().as_micros()
    );
    mb
}

/// Vertical span `[y_min, y_max]` containing every non-air voxel, or `None`
/// for an all-air volume. Keeps the emission loop off empty slabs.
fn occupied_y_window(vol: &ChunkVolume) -> Option<(usize, usize)> {
    let layer_occupied = |y: usize| {
        (0..CHUNK_SIZE)
            .any(|z| (0..CHUNK_SIZE).any(|x| vol.get_local(x, y, z) != AIR))
    };
    let y_min = (0..WORLD_HEIGHT).find(|&y| layer_occupied(y))?;
    let y_max = (y_min..WORLD_HEIGHT).rev().find(|&y| layer_occupied(y))?;
    Some((y_min, y_max))
}
