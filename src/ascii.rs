//! ASCII rendering and export for generated worlds.
//!
//! Text previews of the grids for terminals and debug files.

use std::fs::File;
use std::io::{self, Write};

use chrono::Local;

use crate::biomes::{biome_name, BiomeMaps};
use crate::generator::WorldGenerator;

/// ASCII rendering modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AsciiMode {
    /// Elevation band glyphs with rivers and lakes overlaid
    HeightBands,
    /// Biome glyphs
    Biomes,
    /// Heat gradient
    Heat,
    /// Moisture gradient
    Moisture,
}

impl AsciiMode {
    pub fn name(&self) -> &'static str {
        match self {
            AsciiMode::HeightBands => "Height bands",
            AsciiMode::Biomes => "Biomes",
            AsciiMode::Heat => "Heat",
            AsciiMode::Moisture => "Moisture",
        }
    }
}

/// Glyph for an elevation band code (0 deepest water to 8 snow).
pub fn height_band_char(code: u8) -> char {
    match code {
        0 => '~',
        1 => '=',
        2 => '-',
        3 => ',',
        4 => '.',
        5 => '"',
        6 => 't',
        7 => '^',
        _ => 'A',
    }
}

/// Glyph for a biome name.
pub fn biome_char(name: &str) -> char {
    match name {
        "Ice" => '#',
        "Tundra" => ':',
        "Grassland" => '"',
        "Woodland" => 'w',
        "SeasonalForest" => 'f',
        "BorealForest" => 'B',
        "TemperateRainforest" => 'F',
        "TropicalRainforest" => 'R',
        "Savanna" => ';',
        "Desert" => 'd',
        "Beach" => '.',
        "Rocky" => '^',
        "River" => '|',
        _ => '?',
    }
}

fn gradient_char(value: f64) -> char {
    const RAMP: [char; 10] = [' ', '.', ':', '-', '=', '+', '*', '%', '#', '@'];
    let idx = (value.clamp(0.0, 1.0) * 9.999) as usize;
    RAMP[idx.min(9)]
}

/// Render the world as ASCII text, one row per line.
///
/// Water cells always show their elevation band glyph so coastlines stay
/// readable in every mode; biome mode needs a classification to draw from.
pub fn render<N>(world: &WorldGenerator<N>, mode: AsciiMode, biomes: Option<&BiomeMaps>) -> String {
    let mut out = String::with_capacity((world.width + 1) * world.height);
    for y in 0..world.height {
        for x in 0..world.width {
            let code = *world.height_codes().get(x, y);
            let ch = match mode {
                AsciiMode::HeightBands => {
                    if code >= 4 && world.rivers().contains(x as i32, y as i32) {
                        '|'
                    } else if code >= 4 && world.lakes().contains(x as i32, y as i32) {
                        'o'
                    } else {
                        height_band_char(code)
                    }
                }
                AsciiMode::Biomes => match biomes {
                    Some(maps) => {
                        if code < 4 {
                            height_band_char(code)
                        } else {
                            biome_char(biome_name(*maps.biome_codes.get(x, y)))
                        }
                    }
                    None => height_band_char(code),
                },
                AsciiMode::Heat => gradient_char(*world.heat_data().get(x, y)),
                AsciiMode::Moisture => gradient_char(*world.moisture_data().get(x, y)),
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

/// Write an ASCII rendering with a timestamped header to a text file.
pub fn export_ascii<N>(
    world: &WorldGenerator<N>,
    mode: AsciiMode,
    biomes: Option<&BiomeMaps>,
    path: &str,
) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(
        file,
        "=== {} map {}x{} seed={} zoom={} ===",
        mode.name(),
        world.width,
        world.height,
        world.seed(),
        world.zoom_level()
    )?;
    writeln!(file, "Exported: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(
        file,
        "Modifiers: water={:.3} cooling={:.3}",
        world.water_modifier(),
        world.cooling_modifier()
    )?;
    writeln!(file)?;
    file.write_all(render(world, mode, biomes).as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biomes::classify;

    #[test]
    fn test_render_dimensions() {
        let mut world = WorldGenerator::new(42, 32, 24);
        world.generate_with(1.0, 1.0, 42);
        let text = render(&world, AsciiMode::HeightBands, None);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 24);
        assert!(lines.iter().all(|l| l.chars().count() == 32));
    }

    #[test]
    fn test_biome_mode_uses_classification() {
        let mut world = WorldGenerator::new(42, 32, 24);
        world.generate_with(1.0, 1.0, 42);
        let maps = classify(&world);
        let text = render(&world, AsciiMode::Biomes, Some(&maps));
        assert!(!text.contains('?'), "unmapped biome glyph in output");
    }
}
