//! Biome classification from the synthesized grids.
//!
//! A pure function of heat, moisture, elevation band and river/lake
//! membership: heat and moisture are each cut into six overlapping bands,
//! and the pair indexes a fixed 54-entry biome table (six moisture groups
//! of six heat bands, then a coast group, a river group and a lake group).

use crate::generator::WorldGenerator;
use crate::grid::Grid;
use crate::synthesis::LAND_CODE;

// =============================================================================
// HEAT AND MOISTURE BANDS
// =============================================================================

pub const COLDEST_LOWER: f64 = 0.0;
pub const COLDEST_UPPER: f64 = 0.15; // 0
pub const COLDER_LOWER: f64 = 0.15;
pub const COLDER_UPPER: f64 = 0.31; // 1
pub const COLD_LOWER: f64 = 0.31;
pub const COLD_UPPER: f64 = 0.5; // 2
pub const WARM_LOWER: f64 = 0.5;
pub const WARM_UPPER: f64 = 0.69; // 3
pub const WARMER_LOWER: f64 = 0.69;
pub const WARMER_UPPER: f64 = 0.85; // 4
pub const WARMEST_LOWER: f64 = 0.85;
pub const WARMEST_UPPER: f64 = 1.0; // 5

pub const DRIEST_LOWER: f64 = 0.0;
pub const DRIEST_UPPER: f64 = 0.27; // 0
pub const DRIER_LOWER: f64 = 0.27;
pub const DRIER_UPPER: f64 = 0.4; // 1
pub const DRY_LOWER: f64 = 0.4;
pub const DRY_UPPER: f64 = 0.6; // 2
pub const WET_LOWER: f64 = 0.6;
pub const WET_UPPER: f64 = 0.8; // 3
pub const WETTER_LOWER: f64 = 0.8;
pub const WETTER_UPPER: f64 = 0.9; // 4
pub const WETTEST_LOWER: f64 = 0.9;
pub const WETTEST_UPPER: f64 = 1.0; // 5

/// Biome names indexed by biome code: six moisture groups from driest to
/// wettest, each running coldest to hottest, then coasts, rivers and lakes.
#[rustfmt::skip]
pub const BIOME_TABLE: [&str; 54] = [
    // COLDEST  COLDER        COLD             HOT                    HOTTER                HOTTEST
    "Ice",   "Ice",          "Grassland",      "Desert",              "Desert",             "Desert",             // DRIEST
    "Ice",   "Tundra",       "Grassland",      "Grassland",           "Desert",             "Desert",             // DRIER
    "Ice",   "Tundra",       "Woodland",       "Woodland",            "Savanna",            "Desert",             // DRY
    "Ice",   "Tundra",       "SeasonalForest", "SeasonalForest",      "Savanna",            "Savanna",            // WET
    "Ice",   "Tundra",       "BorealForest",   "TemperateRainforest", "TropicalRainforest", "Savanna",            // WETTER
    "Ice",   "BorealForest", "BorealForest",   "TemperateRainforest", "TropicalRainforest", "TropicalRainforest", // WETTEST
    "Rocky", "Rocky",        "Beach",          "Beach",               "Beach",              "Beach",              // COASTS
    "Ice",   "River",        "River",          "River",               "River",              "River",              // RIVERS
    "Ice",   "River",        "River",          "River",               "River",              "River",              // LAKES
];

/// Look up the display name for a biome code.
pub fn biome_name(code: u8) -> &'static str {
    BIOME_TABLE[code as usize]
}

/// Moisture band 0 (driest) to 5 (wettest). Band edges overlap slightly:
/// each threshold sits 20% of the next-lower band's width below the upper
/// bound, which softens the transitions.
pub fn moisture_code(moist: f64) -> u8 {
    if moist >= WETTEST_UPPER - (WETTER_UPPER - WETTER_LOWER) * 0.2 {
        5
    } else if moist >= WETTER_UPPER - (WET_UPPER - WET_LOWER) * 0.2 {
        4
    } else if moist >= WET_UPPER - (DRY_UPPER - DRY_LOWER) * 0.2 {
        3
    } else if moist >= DRY_UPPER - (DRIER_UPPER - DRIER_LOWER) * 0.2 {
        2
    } else if moist >= DRIER_UPPER - DRIEST_UPPER * 0.2 {
        1
    } else {
        0
    }
}

/// Heat band 0 (coldest) to 5 (hottest), calibrated against the
/// generator's tracked global heat maximum via `i_hot = 1 / max_heat`.
pub fn heat_code(hot: f64, i_hot: f64) -> u8 {
    if hot >= (WARMEST_UPPER - (WARMER_UPPER - WARMER_LOWER) * 0.2) * i_hot {
        5
    } else if hot >= (WARMER_UPPER - (WARM_UPPER - WARM_LOWER) * 0.2) * i_hot {
        4
    } else if hot >= (WARM_UPPER - (COLD_UPPER - COLD_LOWER) * 0.2) * i_hot {
        3
    } else if hot >= (COLD_UPPER - (COLDER_UPPER - COLDER_LOWER) * 0.2) * i_hot {
        2
    } else if hot >= (COLDER_UPPER - COLDEST_UPPER * 0.2) * i_hot {
        1
    } else {
        0
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Heat, moisture and biome codes for one classified world.
pub struct BiomeMaps {
    /// Heat band per cell, 0 coldest to 5 hottest.
    pub heat_codes: Grid<u8>,
    /// Moisture band per cell, 0 driest to 5 wettest.
    pub moisture_codes: Grid<u8>,
    /// Biome code per cell, an index into [`BIOME_TABLE`].
    pub biome_codes: Grid<u8>,
}

/// Classify every cell of the generator's current viewport.
///
/// Stateless with respect to the generator: recomputed on demand, never
/// stored back. River and lake overrides only apply on land (height code
/// 4 or higher); a coast cell is exactly height code 4.
pub fn classify<N>(world: &WorldGenerator<N>) -> BiomeMaps {
    let width = world.width;
    let height = world.height;
    let mut maps = BiomeMaps {
        heat_codes: Grid::new_with(width, height, 0),
        moisture_codes: Grid::new_with(width, height, 0),
        biome_codes: Grid::new_with(width, height, 0),
    };

    let max_heat = world.normalization().max_heat;
    let i_hot = if max_heat == 0.0 { 1.0 } else { 1.0 / max_heat };

    for y in 0..height {
        for x in 0..width {
            let hot = *world.heat_data().get(x, y);
            let moist = *world.moisture_data().get(x, y);
            let height_code = *world.height_codes().get(x, y);
            let on_land = height_code >= LAND_CODE;
            let is_lake =
                world.generate_rivers && on_land && world.lakes().contains(x as i32, y as i32);
            let is_river =
                world.generate_rivers && on_land && world.rivers().contains(x as i32, y as i32);

            let hc = heat_code(hot, i_hot);
            let mc = moisture_code(moist);
            maps.heat_codes.set(x, y, hc);
            maps.moisture_codes.set(x, y, mc);

            let biome = if is_lake {
                hc + 48
            } else if is_river {
                hc + 42
            } else if height_code == LAND_CODE {
                hc + 36
            } else {
                hc + mc * 6
            };
            maps.biome_codes.set(x, y, biome);
        }
    }

    maps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_functions_cover_extremes() {
        assert_eq!(moisture_code(0.0), 0);
        assert_eq!(moisture_code(0.5), 2);
        assert_eq!(moisture_code(0.99), 5);
        assert_eq!(heat_code(0.0, 1.0), 0);
        assert_eq!(heat_code(0.4, 1.0), 2);
        assert_eq!(heat_code(0.99, 1.0), 5);
    }

    #[test]
    fn test_heat_code_scales_with_global_maximum() {
        // With a global heat maximum of 2.0 every threshold doubles.
        assert_eq!(heat_code(1.0, 0.5), 2);
        assert_eq!(heat_code(1.99, 0.5), 5);
    }

    #[test]
    fn test_biome_codes_in_range() {
        let mut world = WorldGenerator::new(42, 64, 64);
        world.generate_with(1.0, 1.0, 42);
        let maps = classify(&world);
        for (_, _, &code) in maps.biome_codes.iter() {
            assert!(code <= 53, "biome code {} out of range", code);
        }
    }

    #[test]
    fn test_river_and_lake_codes_only_on_land() {
        let mut world = WorldGenerator::new(42, 128, 128);
        world.generate_with(1.0, 1.0, 42);
        let maps = classify(&world);
        for (x, y, &code) in maps.biome_codes.iter() {
            if code >= 42 {
                assert!(
                    *world.height_codes().get(x, y) >= LAND_CODE,
                    "water cell ({}, {}) classified as river/lake",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_coast_cells_use_coast_group() {
        let mut world = WorldGenerator::new(42, 64, 64);
        world.generate_with(1.0, 1.0, 42);
        let maps = classify(&world);
        for (x, y, &code) in maps.biome_codes.iter() {
            let height_code = *world.height_codes().get(x, y);
            let on_water_feature = world.rivers().contains(x as i32, y as i32)
                || world.lakes().contains(x as i32, y as i32);
            if height_code == LAND_CODE && !on_water_feature {
                assert!((36..42).contains(&code), "coast cell got code {}", code);
            }
        }
    }

    #[test]
    fn test_biome_names_resolve() {
        assert_eq!(biome_name(0), "Ice");
        assert_eq!(biome_name(36), "Rocky");
        assert_eq!(biome_name(43), "River");
        assert_eq!(biome_name(53), "River");
    }
}
