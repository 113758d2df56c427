//! PNG and JSON export of generated worlds.
//!
//! Snapshots for downstream tooling: colored maps of the height bands,
//! heat, moisture and biomes, and a JSON dump of the raw grids.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;

use image::{ImageBuffer, Rgb, RgbImage};
use serde::Serialize;

use crate::biomes::BiomeMaps;
use crate::generator::WorldGenerator;

/// Color for an elevation band code, deep water to snow.
fn height_band_color(code: u8) -> [u8; 3] {
    match code {
        0 => [8, 28, 84],
        1 => [18, 52, 120],
        2 => [36, 84, 156],
        3 => [66, 122, 184],
        4 => [214, 197, 140],
        5 => [114, 164, 78],
        6 => [54, 118, 56],
        7 => [128, 116, 100],
        _ => [240, 244, 248],
    }
}

/// Color for a biome code, grouped the way the biome table is.
fn biome_color(code: u8) -> [u8; 3] {
    let heat = (code % 6) as u32;
    match code {
        48..=53 => [70, 130, 180],  // lakes
        42..=47 => [90, 150, 200],  // rivers
        36..=41 => [210, 190, 140], // coasts
        _ => {
            let moisture = (code / 6) as u32;
            // Dry and hot pushes toward tan, wet and cold toward deep green.
            let r = (90 + heat * 26 - moisture * 8) as u8;
            let g = (110 + moisture * 18) as u8;
            let b = (60 + moisture * 10) as u8;
            [r, g, b]
        }
    }
}

/// Blue-to-red gradient for normalized climate values.
fn gradient_color(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        (40.0 + 200.0 * t) as u8,
        (60.0 + 80.0 * (1.0 - (2.0 * t - 1.0).abs())) as u8,
        (220.0 - 190.0 * t) as u8,
    ]
}

/// Export the elevation bands with rivers and lakes overlaid.
pub fn export_height_bands<N>(
    world: &WorldGenerator<N>,
    path: &str,
) -> Result<(), image::ImageError> {
    let mut img: RgbImage = ImageBuffer::new(world.width as u32, world.height as u32);
    for y in 0..world.height {
        for x in 0..world.width {
            let code = *world.height_codes().get(x, y);
            let color = if code >= 4 && world.rivers().contains(x as i32, y as i32) {
                [24, 110, 200]
            } else if code >= 4 && world.lakes().contains(x as i32, y as i32) {
                [60, 140, 210]
            } else {
                height_band_color(code)
            };
            img.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }
    img.save(path)
}

/// Export a normalized climate field (heat or moisture) as a gradient map.
pub fn export_gradient(
    field: &crate::grid::Grid<f64>,
    path: &str,
) -> Result<(), image::ImageError> {
    let mut img: RgbImage = ImageBuffer::new(field.width as u32, field.height as u32);
    for (x, y, &v) in field.iter() {
        img.put_pixel(x as u32, y as u32, Rgb(gradient_color(v)));
    }
    img.save(path)
}

/// Export classified biomes; water keeps its elevation band color.
pub fn export_biomes<N>(
    world: &WorldGenerator<N>,
    biomes: &BiomeMaps,
    path: &str,
) -> Result<(), image::ImageError> {
    let mut img: RgbImage = ImageBuffer::new(world.width as u32, world.height as u32);
    for y in 0..world.height {
        for x in 0..world.width {
            let code = *world.height_codes().get(x, y);
            let color = if code < 4 {
                height_band_color(code)
            } else {
                biome_color(*biomes.biome_codes.get(x, y))
            };
            img.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }
    img.save(path)
}

/// Serializable snapshot of one generated world.
#[derive(Serialize)]
pub struct WorldSnapshot {
    pub seed: u64,
    pub width: usize,
    pub height: usize,
    pub zoom: usize,
    pub viewport_origin: (usize, usize),
    pub water_modifier: f64,
    pub cooling_modifier: f64,
    /// Row-major normalized heights.
    pub heights: Vec<f64>,
    /// Row-major heat values.
    pub heat: Vec<f64>,
    /// Row-major moisture values.
    pub moisture: Vec<f64>,
    /// Row-major elevation band codes.
    pub height_codes: Vec<u8>,
    /// River cells of the current viewport.
    pub rivers: Vec<(usize, usize)>,
    /// Lake cells of the current viewport.
    pub lakes: Vec<(usize, usize)>,
}

/// Build a snapshot of the generator's current viewport.
pub fn snapshot<N>(world: &WorldGenerator<N>) -> WorldSnapshot {
    WorldSnapshot {
        seed: world.seed(),
        width: world.width,
        height: world.height,
        zoom: world.zoom_level(),
        viewport_origin: world.viewport_origin(),
        water_modifier: world.water_modifier(),
        cooling_modifier: world.cooling_modifier(),
        heights: world.height_data().iter().map(|(_, _, &v)| v).collect(),
        heat: world.heat_data().iter().map(|(_, _, &v)| v).collect(),
        moisture: world.moisture_data().iter().map(|(_, _, &v)| v).collect(),
        height_codes: world.height_codes().iter().map(|(_, _, &v)| v).collect(),
        rivers: world.rivers().members(),
        lakes: world.lakes().members(),
    }
}

/// Write the snapshot as JSON.
pub fn export_json<N>(world: &WorldGenerator<N>, path: &str) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &snapshot(world))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_shape() {
        let mut world = WorldGenerator::new(42, 32, 16);
        world.generate_with(1.0, 1.0, 42);
        let snap = snapshot(&world);
        assert_eq!(snap.heights.len(), 32 * 16);
        assert_eq!(snap.height_codes.len(), 32 * 16);
        assert_eq!(snap.seed, 42);
        assert_eq!(snap.zoom, 0);
    }

    #[test]
    fn test_band_colors_distinct() {
        for a in 0..9u8 {
            for b in (a + 1)..9 {
                assert_ne!(height_band_color(a), height_band_color(b));
            }
        }
    }
}
