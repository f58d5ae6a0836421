use serde::{Deserialize, Serialize};

use super::CHUNK_SIZE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Chunk containing the given world column.
    #[inline]
    pub fn containing(wx: i32, wz: i32) -> Self {
        let s = CHUNK_SIZE as i32;
        Self {
            cx: wx.div_euclid(s),
            cz: wz.div_euclid(s),
        }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// World coordinate of this chunk's minimum corner.
    #[inline]
    pub fn base(self) -> (i32, i32) {
        let s = CHUNK_SIZE as i32;
        (self.cx * s, self.cz * s)
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dz * dz
    }

    /// Manhattan distance in chunk units; the generation queue's priority.
    #[inline]
    pub fn manhattan(self, other: ChunkCoord) -> u32 {
        self.cx.abs_diff(other.cx) + self.cz.abs_diff(other.cz)
    }

    /// Canonical store key: decimal, no padding, comma separator.
    pub fn key(self) -> String {
        format!("{},{}", self.cx, self.cz)
    }

    pub fn parse_key(key: &str) -> Option<Self> {
        let (cx, cz) = key.split_once(',')?;
        Some(Self {
            cx: cx.parse().ok()?,
            cz: cz.parse().ok()?,
        })
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips() {
        for coord in [
            ChunkCoord::new(0, 0),
            ChunkCoord::new(-3, 17),
            ChunkCoord::new(i32::MIN, i32::MAX),
        ] {
            assert_eq!(ChunkCoord::parse_key(&coord.key()), Some(coord));
        }
        assert_eq!(ChunkCoord::new(-3, 17).key(), "-3,17");
    }

    #[test]
    fn containing_uses_floor_division() {
        assert_eq!(ChunkCoord::containing(0, 0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::containing(31, 31), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::containing(32, -1), ChunkCoord::new(1, -1));
        assert_eq!(ChunkCoord::containing(-32, -33), ChunkCoord::new(-1, -2));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert_eq!(ChunkCoord::parse_key("1;2"), None);
        assert_eq!(ChunkCoord::parse_key("1,2,3"), None);
        assert_eq!(ChunkCoord::parse_key("a,b"), None);
    }
}
