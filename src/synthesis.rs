//! Field synthesis: turns seamless noise into height, heat and moisture
//! grids plus a discrete elevation band per cell.
//!
//! A "fresh" pass (new seed or modifiers) computes and caches normalization
//! extrema in a [`NormalizationState`]; zoom passes re-synthesize a denser
//! viewport but scale with the cached extrema, so band thresholds and colors
//! do not shift between zoom levels. That stability is a contract, not an
//! optimization.

use std::f64::consts::TAU;

use noise::{NoiseFn, Seedable};

use crate::grid::Grid;
use crate::noise_fields::{Layered4, Ridged4};

// =============================================================================
// FIELD PARAMETERS
// =============================================================================

/// Base frequency of the layered terrain field.
pub const TERRAIN_FREQ: f64 = 1.75;
/// Base frequency of the ridged terrain field used to warp the terrain.
pub const TERRAIN_RIDGED_FREQ: f64 = 1.1;
/// Base frequency of the layered heat field.
pub const HEAT_FREQ: f64 = 5.05;
/// Base frequency of the layered moisture field.
pub const MOISTURE_FREQ: f64 = 5.2;
/// Base frequency of the ridged field that warps heat and moisture.
pub const WARP_FREQ: f64 = 5.5;

// =============================================================================
// ELEVATION BANDS
// =============================================================================

pub const DEEP_WATER_UPPER: f64 = -0.7; // 0
pub const MEDIUM_WATER_UPPER: f64 = -0.3; // 1
pub const SHALLOW_WATER_UPPER: f64 = -0.1; // 2
pub const COASTAL_WATER_UPPER: f64 = 0.1; // 3
pub const SAND_UPPER: f64 = 0.18; // 4
pub const GRASS_UPPER: f64 = 0.35; // 5
pub const FOREST_UPPER: f64 = 0.6; // 6
pub const ROCK_UPPER: f64 = 0.8; // 7
pub const SNOW_UPPER: f64 = 1.0; // 8

pub const FOREST_LOWER: f64 = 0.35;

/// Lower bound of each elevation band, indexed by height code.
pub const HEIGHT_BAND_LOWERS: [f64; 9] = [
    -1.0,
    DEEP_WATER_UPPER,
    MEDIUM_WATER_UPPER,
    SHALLOW_WATER_UPPER,
    COASTAL_WATER_UPPER,
    SAND_UPPER,
    GRASS_UPPER,
    FOREST_UPPER,
    ROCK_UPPER,
];

/// Lowest height code counted as land.
pub const LAND_CODE: u8 = 4;

/// Classify a normalized height into its elevation band code (0-8).
pub fn code_height(high: f64) -> u8 {
    if high < DEEP_WATER_UPPER {
        return 0;
    }
    if high < MEDIUM_WATER_UPPER {
        return 1;
    }
    if high < SHALLOW_WATER_UPPER {
        return 2;
    }
    if high < COASTAL_WATER_UPPER {
        return 3;
    }
    if high < SAND_UPPER {
        return 4;
    }
    if high < GRASS_UPPER {
        return 5;
    }
    if high < FOREST_UPPER {
        return 6;
    }
    if high < ROCK_UPPER {
        return 7;
    }
    8
}

// =============================================================================
// NORMALIZATION STATE
// =============================================================================

/// Normalization extrema threaded through every synthesis pass.
///
/// Height extrema are reset on fresh passes and merged on every pass; the
/// raw/mid heat and raw moisture extrema are captured only on fresh passes
/// and reused verbatim while zooming. `min_heat`/`max_heat` and
/// `min_wet`/`max_wet` are the published post-scale extents that the biome
/// classifier calibrates against.
#[derive(Clone, Debug)]
pub struct NormalizationState {
    pub min_height: f64,
    pub max_height: f64,
    pub min_heat_raw: f64,
    pub max_heat_raw: f64,
    pub min_heat_mid: f64,
    pub max_heat_mid: f64,
    pub min_wet_raw: f64,
    pub max_wet_raw: f64,
    pub min_heat: f64,
    pub max_heat: f64,
    pub min_wet: f64,
    pub max_wet: f64,
}

impl NormalizationState {
    pub fn new() -> Self {
        Self {
            min_height: f64::INFINITY,
            max_height: f64::NEG_INFINITY,
            min_heat_raw: f64::INFINITY,
            max_heat_raw: f64::NEG_INFINITY,
            min_heat_mid: f64::INFINITY,
            max_heat_mid: f64::NEG_INFINITY,
            min_wet_raw: f64::INFINITY,
            max_wet_raw: f64::NEG_INFINITY,
            min_heat: f64::INFINITY,
            max_heat: f64::NEG_INFINITY,
            min_wet: f64::INFINITY,
            max_wet: f64::NEG_INFINITY,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for NormalizationState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SYNTHESIS
// =============================================================================

/// Synthesize the height, heat and moisture fields for a viewport.
///
/// The viewport starts at (`start_x`, `start_y`) in full-map cells and spans
/// `used_width` x `used_height` of them; the output grids keep their full
/// size, so a smaller viewport means a denser sampling of a smaller world
/// region. `fresh` selects between computing new extrema and reusing the
/// cached ones in `norm`.
#[allow(clippy::too_many_arguments)]
pub fn synthesize<N>(
    noise: &N,
    seed_a: u32,
    seed_b: u32,
    seed_c: u32,
    start_x: usize,
    start_y: usize,
    used_width: usize,
    used_height: usize,
    water_modifier: f64,
    cooling_modifier: f64,
    fresh: bool,
    norm: &mut NormalizationState,
    height_data: &mut Grid<f64>,
    heat_data: &mut Grid<f64>,
    moisture_data: &mut Grid<f64>,
    height_codes: &mut Grid<u8>,
) where
    N: NoiseFn<f64, 4> + Seedable + Clone,
{
    let width = height_data.width;
    let height = height_data.height;

    let terrain = Layered4::new(noise.clone(), 8, TERRAIN_FREQ, seed_a);
    let terrain_ridged = Ridged4::new(
        noise.clone(),
        10,
        TERRAIN_RIDGED_FREQ,
        seed_a.wrapping_add(seed_b),
    );
    let heat = Layered4::new(noise.clone(), 3, HEAT_FREQ, seed_b);
    let moisture = Layered4::new(noise.clone(), 4, MOISTURE_FREQ, seed_c);
    let heat_warp = Ridged4::new(noise.clone(), 6, WARP_FREQ, seed_b.wrapping_add(seed_c));
    let moisture_warp = Ridged4::new(noise.clone(), 6, WARP_FREQ, seed_c.wrapping_add(seed_a));

    let i_w = TAU / width as f64;
    let i_h = TAU / height as f64;
    let i_uw = used_width as f64 / width as f64;
    let i_uh = used_height as f64 / height as f64;

    // Column angles repeat every row; cache their sin/cos once.
    let mut trig = vec![0.0f64; width * 2];
    let mut x_pos = start_x as f64;
    for x in 0..width {
        let p = x_pos * i_w;
        trig[x << 1] = p.sin();
        trig[(x << 1) | 1] = p.cos();
        x_pos += i_uw;
    }

    // Pass 1: raw fields with domain warping between them.
    let mut y_pos = start_y as f64;
    for y in 0..height {
        let q = y_pos * i_h;
        let qs = q.sin();
        let qc = q.cos();
        for x in 0..width {
            let ps = trig[x << 1];
            let pc = trig[(x << 1) | 1];

            let warp = terrain_ridged.sample(pc, ps, qc, qs);
            let h = terrain.sample(pc + warp, ps, qc, qs) * water_modifier;
            height_data.set(x, y, h);

            let heat_raw = heat.sample(pc, ps, qc + heat_warp.sample(pc, ps, qc, qs), qs);
            heat_data.set(x, y, heat_raw);

            let wet_raw =
                moisture.sample(pc, ps, qc, qs + moisture_warp.sample(pc, ps, qc, qs));
            moisture_data.set(x, y, wet_raw);

            norm.min_height = norm.min_height.min(h);
            norm.max_height = norm.max_height.max(h);
            if fresh {
                norm.min_heat_raw = norm.min_heat_raw.min(heat_raw);
                norm.max_heat_raw = norm.max_heat_raw.max(heat_raw);
                norm.min_wet_raw = norm.min_wet_raw.min(wet_raw);
                norm.max_wet_raw = norm.max_wet_raw.max(wet_raw);
            }
        }
        y_pos += i_uh;
    }

    // Pass 2: normalize height into [-1, 1], code the bands, and fold the
    // latitude falloff plus per-band height adjustment into heat.
    let height_diff = 2.0 / (norm.max_height - norm.min_height);
    let heat_diff = 0.8 / (norm.max_heat_raw - norm.min_heat_raw);
    let wet_diff = 1.0 / (norm.max_wet_raw - norm.min_wet_raw);
    let half_height = (height - 1) as f64 * 0.5;
    let i_half = 1.0 / half_height;

    let mut min_heat_mid = f64::INFINITY;
    let mut max_heat_mid = f64::NEG_INFINITY;
    let mut y_pos = start_y as f64;
    for y in 0..height {
        // Peaks at the map's vertical center and decays toward the poles.
        let mut lat = (y_pos - half_height).abs() * i_half;
        lat *= 2.4 - lat;
        lat = 2.2 - lat;
        for x in 0..width {
            let h = (*height_data.get(x, y) - norm.min_height) * height_diff - 1.0;
            height_data.set(x, y, h);
            let code = code_height(h);
            height_codes.set(x, y, code);

            // Water and extreme elevations skew heat toward fixed offsets.
            let (h_adj, h_mod) = match code {
                0..=3 => (0.4, 0.2),
                6 => (-0.1 * (h - FOREST_LOWER - 0.08), 1.0),
                7 => (h * -0.25, 1.0),
                8 => (h * -0.4, 1.0),
                _ => (h * 0.05, 1.0),
            };
            let heat_mid =
                (((*heat_data.get(x, y) - norm.min_heat_raw) * heat_diff * h_mod) + h_adj + 0.6)
                    * lat;
            heat_data.set(x, y, heat_mid);
            if fresh {
                min_heat_mid = min_heat_mid.min(heat_mid);
                max_heat_mid = max_heat_mid.max(heat_mid);
            }
        }
        y_pos += i_uh;
    }
    if fresh {
        norm.min_heat_mid = min_heat_mid;
        norm.max_heat_mid = max_heat_mid;
    }

    // Pass 3: final heat scaling under the cooling modifier, and moisture
    // into [0, 1].
    let heat_scale = cooling_modifier / (norm.max_heat_mid - norm.min_heat_mid);
    let mut min_heat = f64::INFINITY;
    let mut max_heat = f64::NEG_INFINITY;
    let mut min_wet = f64::INFINITY;
    let mut max_wet = f64::NEG_INFINITY;
    for y in 0..height {
        for x in 0..width {
            let hot = (*heat_data.get(x, y) - norm.min_heat_mid) * heat_scale;
            heat_data.set(x, y, hot);
            let wet = (*moisture_data.get(x, y) - norm.min_wet_raw) * wet_diff;
            moisture_data.set(x, y, wet);
            if fresh {
                min_heat = min_heat.min(hot);
                max_heat = max_heat.max(hot);
                min_wet = min_wet.min(wet);
                max_wet = max_wet.max(wet);
            }
        }
    }
    if fresh {
        norm.min_heat = min_heat;
        norm.max_heat = max_heat;
        norm.min_wet = min_wet;
        norm.max_wet = max_wet;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_height_thresholds() {
        assert_eq!(code_height(-1.0), 0);
        assert_eq!(code_height(-0.7), 1);
        assert_eq!(code_height(-0.3), 2);
        assert_eq!(code_height(-0.1), 3);
        assert_eq!(code_height(0.1), 4);
        assert_eq!(code_height(0.18), 5);
        assert_eq!(code_height(0.35), 6);
        assert_eq!(code_height(0.6), 7);
        assert_eq!(code_height(0.8), 8);
        assert_eq!(code_height(1.0), 8);
    }

    #[test]
    fn test_band_lowers_match_codes() {
        for (code, &lower) in HEIGHT_BAND_LOWERS.iter().enumerate() {
            assert_eq!(code_height(lower) as usize, code);
        }
    }

    #[test]
    fn test_normalization_state_resets() {
        let mut norm = NormalizationState::new();
        norm.min_height = -0.5;
        norm.max_heat = 1.2;
        norm.reset();
        assert!(norm.min_height.is_infinite());
        assert!(norm.max_heat.is_infinite());
    }
}
