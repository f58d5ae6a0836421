use strata_blocks::BlockId;

use crate::face::Face;

/// Quad corner templates per face: `(origin, u, v)` offsets from the voxel
/// min corner, chosen so `u x v` equals the face normal. The four corners
/// `origin, origin+u, origin+v, origin+u+v` wind counter-clockwise when
/// viewed along the normal with triangles `(0,1,2)` and `(2,1,3)`.
const FACE_QUADS: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]), // +X
    ([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]), // -X
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]), // +Y
    ([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]), // -Y
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), // +Z
    ([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]), // -Z
];

/// Flat attribute streams for one chunk mesh, ready for direct upload.
/// Per face: four vertices in `pos`/`norm`, one entry in `face_block` and
/// `face_dir`, and six indices. Positions are chunk-local; the renderer
/// applies the `(cx*S, 0, cz*S)` world offset.
#[derive(Default, Clone, Debug)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub face_block: Vec<u8>,
    pub face_dir: Vec<u8>,
    pub idx: Vec<u32>,
}

impl MeshBuild {
    /// Clears all arrays but retains capacity for reuse across rebuilds.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.pos.clear();
        self.norm.clear();
        self.face_block.clear();
        self.face_dir.clear();
        self.idx.clear();
    }

    /// Pre-reserve capacity for approximately `n` faces worth of data.
    #[inline]
    pub fn reserve_faces(&mut self, n: usize) {
        self.pos.reserve(n * 4 * 3);
        self.norm.reserve(n * 4 * 3);
        self.face_block.reserve(n);
        self.face_dir.reserve(n);
        self.idx.reserve(n * 6);
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_block.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.face_block.is_empty()
    }

    /// Appends one voxel face at local voxel min corner `(x, y, z)`.
    pub fn add_face(&mut self, face: Face, block: BlockId, x: f32, y: f32, z: f32) {
        let base = (self.pos.len() / 3) as u32;
        let (origin, u, v) = FACE_QUADS[face.index()];
        let n = face.normal();
        let corners = [
            [origin[0], origin[1], origin[2]],
            [origin[0] + u[0], origin[1] + u[1], origin[2] + u[2]],
            [origin[0] + v[0], origin[1] + v[1], origin[2] + v[2]],
            [
                origin[0] + u[0] + v[0],
                origin[1] + u[1] + v[1],
                origin[2] + u[2] + v[2],
            ],
        ];
        for c in corners {
            self.pos.extend_from_slice(&[x + c[0], y + c[1], z + c[2]]);
            self.norm.extend_from_slice(&n);
        }
        self.face_block.push(block);
        self.face_dir.push(face.index() as u8);
        self.idx.extend_from_slice(&[
            base,
            base + 1,
            base + 2,
            base + 2,
            base + 1,
            base + 3,
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_stay_aligned() {
        let mut mb = MeshBuild::default();
        mb.add_face(Face::PosX, 3, 0.0, 0.0, 0.0);
        mb.add_face(Face::NegZ, 6, 1.0, 2.0, 3.0);
        assert_eq!(mb.face_count(), 2);
        assert_eq!(mb.pos.len(), 2 * 12);
        assert_eq!(mb.norm.len(), 2 * 12);
        assert_eq!(mb.idx.len(), 2 * 6);
        assert_eq!(mb.face_dir, vec![0, 5]);
        assert_eq!(mb.face_block, vec![3, 6]);
    }

    #[test]
    fn triangles_wind_along_the_normal() {
        for face in crate::face::ALL_FACES {
            let mut mb = MeshBuild::default();
            mb.add_face(face, 1, 0.0, 0.0, 0.0);
            let n = face.normal();
            for tri in mb.idx.chunks(3) {
                let p = |i: u32| {
                    let i = i as usize * 3;
                    [mb.pos[i], mb.pos[i + 1], mb.pos[i + 2]]
                };
                let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
                let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
                let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
                let cross = [
                    e1[1] * e2[2] - e1[2] * e2[1],
                    e1[2] * e2[0] - e1[0] * e2[2],
                    e1[0] * e2[1] - e1[1] * e2[0],
                ];
                let dot = cross[0] * n[0] + cross[1] * n[1] + cross[2] * n[2];
                assert!(dot > 0.0, "face {:?} winds against its normal", face);
            }
        }
    }
}
