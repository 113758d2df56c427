//! Seamless noise fields over a toroidal map.
//!
//! Wraparound is obtained by embedding the 2D map onto a torus in 4D and
//! sampling a 4D noise primitive there: each axis maps to an angle, and the
//! sine/cosine pair of that angle forms two of the four noise coordinates.
//! Opposite map edges land on the same 4D point, so the sampled field has no
//! seam at all.

use std::f64::consts::TAU;

use noise::{NoiseFn, Perlin, Seedable};

/// Angular embedding of toroidal map coordinates into 4D.
#[derive(Clone, Copy, Debug)]
pub struct TorusMapping {
    width: f64,
    height: f64,
    angle_x: f64,
    angle_y: f64,
}

impl TorusMapping {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
            angle_x: TAU / width as f64,
            angle_y: TAU / height as f64,
        }
    }

    /// Map (x, y) to its 4D torus point `[cos p, sin p, cos q, sin q]`.
    ///
    /// Coordinates are reduced modulo the map size before the angle is
    /// computed, so `embed(x + width, y)` is bit-identical to `embed(x, y)`.
    pub fn embed(&self, x: f64, y: f64) -> [f64; 4] {
        let p = x.rem_euclid(self.width) * self.angle_x;
        let q = y.rem_euclid(self.height) * self.angle_y;
        [p.cos(), p.sin(), q.cos(), q.sin()]
    }
}

/// Fractal sum of 4D noise octaves: frequency doubles and amplitude halves
/// per octave, and the total is normalized back into roughly [-1, 1].
#[derive(Clone)]
pub struct Layered4<N = Perlin> {
    noise: N,
    octaves: u32,
    frequency: f64,
}

impl<N: NoiseFn<f64, 4> + Seedable> Layered4<N> {
    pub fn new(noise: N, octaves: u32, frequency: f64, seed: u32) -> Self {
        Self {
            noise: noise.set_seed(seed),
            octaves,
            frequency,
        }
    }

    pub fn sample(&self, x: f64, y: f64, z: f64, w: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut max_value = 0.0;

        for _ in 0..self.octaves {
            total += amplitude
                * self
                    .noise
                    .get([x * frequency, y * frequency, z * frequency, w * frequency]);
            max_value += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        total / max_value
    }

    /// Sample at toroidal map coordinates; wraps seamlessly on both axes.
    pub fn sample_torus(&self, mapping: &TorusMapping, x: f64, y: f64) -> f64 {
        let [pc, ps, qc, qs] = mapping.embed(x, y);
        self.sample(pc, ps, qc, qs)
    }
}

/// Ridged variant: each octave's magnitude is inverted and squared, which
/// turns the zero crossings of the base noise into sharp crests. Useful for
/// mountain chains and for warping the other fields.
#[derive(Clone)]
pub struct Ridged4<N = Perlin> {
    noise: N,
    octaves: u32,
    frequency: f64,
}

impl<N: NoiseFn<f64, 4> + Seedable> Ridged4<N> {
    pub fn new(noise: N, octaves: u32, frequency: f64, seed: u32) -> Self {
        Self {
            noise: noise.set_seed(seed),
            octaves,
            frequency,
        }
    }

    pub fn sample(&self, x: f64, y: f64, z: f64, w: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut max_value = 0.0;

        for _ in 0..self.octaves {
            let n = self
                .noise
                .get([x * frequency, y * frequency, z * frequency, w * frequency]);
            // Ridge function: crests where the base noise crosses zero.
            let ridge = 1.0 - n.abs();
            let ridge = ridge * ridge;

            total += amplitude * ridge;
            max_value += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        (total / max_value) * 2.0 - 1.0
    }

    /// Sample at toroidal map coordinates; wraps seamlessly on both axes.
    pub fn sample_torus(&self, mapping: &TorusMapping, x: f64, y: f64) -> f64 {
        let [pc, ps, qc, qs] = mapping.embed(x, y);
        self.sample(pc, ps, qc, qs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_wraps_exactly() {
        let mapping = TorusMapping::new(64, 48);
        assert_eq!(mapping.embed(3.0, 5.0), mapping.embed(3.0 + 64.0, 5.0));
        assert_eq!(mapping.embed(3.0, 5.0), mapping.embed(3.0, 5.0 + 48.0));
        assert_eq!(mapping.embed(0.0, 0.0), mapping.embed(64.0, 48.0));
    }

    #[test]
    fn test_layered_field_is_seamless() {
        let mapping = TorusMapping::new(32, 32);
        let field = Layered4::new(Perlin::new(1), 8, 1.75, 12345);
        for y in 0..32 {
            let a = field.sample_torus(&mapping, 0.0, y as f64);
            let b = field.sample_torus(&mapping, 32.0, y as f64);
            assert_eq!(a, b, "seam at row {}", y);
        }
    }

    #[test]
    fn test_layered_output_bounded() {
        let mapping = TorusMapping::new(40, 40);
        let field = Layered4::new(Perlin::new(1), 8, 1.75, 99);
        for y in 0..40 {
            for x in 0..40 {
                let v = field.sample_torus(&mapping, x as f64, y as f64);
                assert!(v.abs() <= 1.5, "layered sample {} out of range", v);
            }
        }
    }

    #[test]
    fn test_ridged_output_bounded() {
        let mapping = TorusMapping::new(40, 40);
        let field = Ridged4::new(Perlin::new(1), 10, 1.1, 7);
        for y in 0..40 {
            for x in 0..40 {
                let v = field.sample_torus(&mapping, x as f64, y as f64);
                assert!((-1.0..=1.0).contains(&v), "ridged sample {} out of range", v);
            }
        }
    }

    #[test]
    fn test_distinct_seeds_give_distinct_fields() {
        let mapping = TorusMapping::new(32, 32);
        let a = Layered4::new(Perlin::new(1), 3, 5.05, 1);
        let b = Layered4::new(Perlin::new(1), 3, 5.05, 2);
        let differs = (0..32).any(|x| {
            a.sample_torus(&mapping, x as f64, 7.0) != b.sample_torus(&mapping, x as f64, 7.0)
        });
        assert!(differs);
    }
}
