use fastnoise_lite::{FastNoiseLite, NoiseType};

use super::WORLD_HEIGHT;

/// World-units-per-noise-unit divisor applied before sampling.
pub const HEIGHT_SCALE: f32 = 50.0;
/// Height amplitude in voxels around the base level.
pub const HEIGHT_AMP: f32 = 8.0;
/// Base surface level in voxels.
pub const HEIGHT_BASE: i32 = 20;

/// Deterministic seeded 2D sampler. Workers construct their own instance
/// from the task's seed; two instances with the same seed are sample-for-
/// sample identical on any thread.
pub struct NoiseSource {
    seed: u32,
    noise: FastNoiseLite,
}

impl NoiseSource {
    pub fn new(seed: u32) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(1.0));
        Self { seed, noise }
    }

    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Scalar noise in `[-1, 1]`.
    #[inline]
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        self.noise.get_noise_2d(x, z).clamp(-1.0, 1.0)
    }

    /// Terrain surface height for a world column, clamped to `[1, H-1]`.
    /// Also the answer for `top_y` over columns that were never generated.
    #[inline]
    pub fn surface_height(&self, wx: i32, wz: i32) -> i32 {
        let n = self.sample(wx as f32 / HEIGHT_SCALE, wz as f32 / HEIGHT_SCALE);
        let h = (n * HEIGHT_AMP).floor() as i32 + HEIGHT_BASE;
        h.clamp(1, WORLD_HEIGHT as i32 - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_samples() {
        let a = NoiseSource::new(0xDEAD_BEEF);
        let b = NoiseSource::new(0xDEAD_BEEF);
        for i in -40..40 {
            let (x, z) = (i as f32 * 0.37, i as f32 * -1.13);
            assert_eq!(a.sample(x, z).to_bits(), b.sample(x, z).to_bits());
        }
    }

    #[test]
    fn surface_height_stays_in_band() {
        let noise = NoiseSource::new(1234567);
        for wx in -200..200 {
            let h = noise.surface_height(wx, wx / 3);
            assert!(h >= HEIGHT_BASE - HEIGHT_AMP as i32);
            assert!(h <= HEIGHT_BASE + HEIGHT_AMP as i32);
        }
    }
}
