//! Coherent gradient noise for seeding bedrock heightfields.
//!
//! Terrain is generated as fractal Brownian motion: several octaves of 2D
//! Perlin-style gradient noise, each at twice the frequency and half the
//! amplitude of the previous one. The base octave spans six noise periods
//! across the grid so a freshly seeded terrain has a handful of ridges and
//! valleys for water to collect in.
//!
//! # References
//!
//! - Perlin, K. (2002). Improving noise. ACM Transactions on Graphics, 21(3), 681-682.

/// Permutation table size (must be power of 2).
const PERM_SIZE: usize = 256;

/// Noise periods covered by the base octave across the whole grid.
pub const BASE_PERIODS: f32 = 6.0;

/// Frequency/amplitude pair of one noise octave.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseOctave {
    /// Spatial frequency in periods per unit of input coordinate
    pub frequency: f32,
    /// Weight of this octave in the sum
    pub amplitude: f32,
}

impl NoiseOctave {
    /// Create a new noise octave.
    #[must_use]
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

/// Multi-octave gradient noise generator.
///
/// Deterministic for a given seed, so a terrain can be regenerated exactly.
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    /// Seed the permutation table was shuffled with.
    pub seed: u64,

    /// Octaves summed by [`sample`](Self::sample).
    pub octaves: Vec<NoiseOctave>,

    perm: Vec<u8>,
    gradients: [(f32, f32); 8],
}

impl NoiseGenerator {
    /// Fractal generator with `octave_count` octaves.
    ///
    /// Octave `i` has frequency `2^i` and amplitude `0.5^i`, so
    /// `sample(x, y)` with `x, y ∈ [0, 1)` covers one period of the base octave.
    #[must_use]
    pub fn fractal(seed: u64, octave_count: u32) -> Self {
        let octaves = (0..octave_count)
            .map(|i| {
                let scale = 2.0_f32.powi(i as i32);
                NoiseOctave::new(scale, 1.0 / scale)
            })
            .collect();
        Self::with_octaves(seed, octaves)
    }

    /// Create generator with custom octaves.
    #[must_use]
    pub fn with_octaves(seed: u64, octaves: Vec<NoiseOctave>) -> Self {
        Self {
            seed,
            octaves,
            perm: Self::generate_permutation(seed),
            gradients: Self::generate_gradients(),
        }
    }

    /// Seeded Fisher-Yates shuffle of 0..=255, doubled to skip a wrap on lookup.
    fn generate_permutation(seed: u64) -> Vec<u8> {
        let mut perm: Vec<u8> = (0..=255).collect();

        // MINSTD LCG; a zero state would never advance, so force it odd
        let mut rng_state = seed | 1;
        for i in (1..PERM_SIZE).rev() {
            rng_state = rng_state.wrapping_mul(48_271).wrapping_rem(2_147_483_647);
            let j = (rng_state as usize) % (i + 1);
            perm.swap(i, j);
        }

        let mut doubled = perm.clone();
        doubled.extend_from_slice(&perm);
        doubled
    }

    fn generate_gradients() -> [(f32, f32); 8] {
        use std::f32::consts::FRAC_1_SQRT_2;
        [
            (1.0, 0.0),
            (FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            (0.0, 1.0),
            (-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            (-1.0, 0.0),
            (-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
            (0.0, -1.0),
            (FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
        ]
    }

    /// Sample noise at a position, returns value in range [-1, 1].
    ///
    /// The octave sum is normalized by the total amplitude.
    #[must_use]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let mut total = 0.0_f32;
        let mut amplitude_sum = 0.0_f32;

        for octave in &self.octaves {
            total += self.gradient_noise_2d(x * octave.frequency, y * octave.frequency)
                * octave.amplitude;
            amplitude_sum += octave.amplitude;
        }

        if amplitude_sum > 0.0 {
            (total / amplitude_sum).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }

    fn gradient_noise_2d(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor() as i32;
        let y0 = y.floor() as i32;

        let fx = x - x.floor();
        let fy = y - y.floor();

        let sx = Self::fade(fx);
        let sy = Self::fade(fy);

        let n00 = self.gradient_dot(x0, y0, fx, fy);
        let n10 = self.gradient_dot(x0 + 1, y0, fx - 1.0, fy);
        let n01 = self.gradient_dot(x0, y0 + 1, fx, fy - 1.0);
        let n11 = self.gradient_dot(x0 + 1, y0 + 1, fx - 1.0, fy - 1.0);

        let nx0 = Self::lerp(n00, n10, sx);
        let nx1 = Self::lerp(n01, n11, sx);
        Self::lerp(nx0, nx1, sy)
    }

    fn gradient_dot(&self, ix: i32, iy: i32, dx: f32, dy: f32) -> f32 {
        let (gx, gy) = self.gradients[self.hash(ix, iy)];
        gx * dx + gy * dy
    }

    fn hash(&self, x: i32, y: i32) -> usize {
        let px = (x & 0xFF) as usize;
        let py = (y & 0xFF) as usize;
        (self.perm[self.perm[px] as usize + py] as usize) & 0x07
    }

    /// 6t^5 - 15t^4 + 10t^3
    #[inline]
    fn fade(t: f32) -> f32 {
        t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
    }

    #[inline]
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + t * (b - a)
    }

    /// Bedrock heightfield for a `width`×`width` grid.
    ///
    /// Cell `(x, y)` samples the noise at `(x / width, y / width) * BASE_PERIODS`,
    /// remapped from [-1, 1] to [0, 1] and scaled by `relief` times the grid's
    /// spatial extent (`width * cell_size`). All heights are non-negative.
    ///
    /// # Returns
    ///
    /// Heights in row-major order (`y * width + x`)
    #[must_use]
    pub fn generate_heightfield(&self, width: usize, cell_size: f32, relief: f32) -> Vec<f32> {
        let extent = width as f32 * cell_size;
        let peak = extent * relief;
        let inv_width = 1.0 / width.max(1) as f32;

        (0..width * width)
            .map(|idx| {
                let x = (idx % width) as f32 * inv_width * BASE_PERIODS;
                let y = (idx / width) as f32 * inv_width * BASE_PERIODS;
                (self.sample(x, y) * 0.5 + 0.5) * peak
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_generator_produces_valid_range() {
        let gen = NoiseGenerator::fractal(12345, 4);

        for i in 0..1000 {
            let x = (i as f32) * 0.073;
            let y = (i as f32) * 0.117;
            let value = gen.sample(x, y);

            assert!(
                (-1.0..=1.0).contains(&value),
                "Noise value {value} at ({x}, {y}) is outside [-1, 1] range"
            );
        }
    }

    #[test]
    fn noise_deterministic_with_seed() {
        let gen1 = NoiseGenerator::fractal(99999, 4);
        let gen2 = NoiseGenerator::fractal(99999, 4);
        let gen3 = NoiseGenerator::fractal(11111, 4);

        let mut any_differs = false;
        for i in 0..100 {
            let x = (i as f32) * 0.137 + 0.05;
            let y = (i as f32) * 0.193 + 0.05;
            assert_eq!(gen1.sample(x, y), gen2.sample(x, y));
            if (gen1.sample(x, y) - gen3.sample(x, y)).abs() > f32::EPSILON {
                any_differs = true;
            }
        }
        assert!(any_differs, "Different seeds should produce different noise");
    }

    #[test]
    fn fractal_octaves_halve_amplitude() {
        let gen = NoiseGenerator::fractal(1, 3);
        assert_eq!(
            gen.octaves,
            vec![
                NoiseOctave::new(1.0, 1.0),
                NoiseOctave::new(2.0, 0.5),
                NoiseOctave::new(4.0, 0.25),
            ]
        );
    }

    #[test]
    fn heightfield_is_non_negative_and_bounded() {
        let gen = NoiseGenerator::fractal(7, 4);
        let width = 32;
        let field = gen.generate_heightfield(width, 2.0, 0.25);

        assert_eq!(field.len(), width * width);
        let peak = width as f32 * 2.0 * 0.25;
        assert!(field.iter().all(|h| (0.0..=peak).contains(h)));

        let min = field.iter().copied().fold(f32::INFINITY, f32::min);
        let max = field.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(max - min > 0.0, "Terrain should not be flat");
    }

    #[test]
    fn heightfield_matches_samples() {
        let gen = NoiseGenerator::fractal(54321, 2);
        let field = gen.generate_heightfield(16, 1.0, 1.0);

        let x = 5.0 / 16.0 * BASE_PERIODS;
        let y = 9.0 / 16.0 * BASE_PERIODS;
        let expected = (gen.sample(x, y) * 0.5 + 0.5) * 16.0;
        assert!((field[9 * 16 + 5] - expected).abs() < 1e-5);
    }

    #[test]
    fn noise_empty_octaves_returns_zero() {
        let gen = NoiseGenerator::with_octaves(123, vec![]);
        assert_eq!(gen.sample(0.3, 0.7), 0.0);
        // Zero noise maps to mid-relief
        let field = gen.generate_heightfield(16, 1.0, 0.5);
        assert!(field.iter().all(|h| (*h - 4.0).abs() < 1e-6));
    }
}
