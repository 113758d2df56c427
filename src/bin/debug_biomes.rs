//! Debug tool: per-band and per-biome census for a fixed seed.

use std::collections::BTreeMap;

use world_mapper::biomes::{self, biome_name};
use world_mapper::WorldGenerator;

fn main() {
    let width = 128;
    let height = 64;
    let seed = 12345u64;

    let mut world = WorldGenerator::new(seed, width, height);
    world.generate_with(1.0, 1.0, seed);

    println!(
        "=== BIOME CENSUS {}x{} seed={} water={:.3} cooling={:.3} ===",
        width,
        height,
        seed,
        world.water_modifier(),
        world.cooling_modifier()
    );
    println!();

    let mut band_counts = [0usize; 9];
    for (_, _, &code) in world.height_codes().iter() {
        band_counts[code as usize] += 1;
    }
    let total = (width * height) as f64;
    println!("Elevation bands:");
    let names = [
        "deep water",
        "medium water",
        "shallow water",
        "coastal water",
        "sand",
        "grass",
        "forest",
        "rock",
        "snow",
    ];
    for (code, (&count, name)) in band_counts.iter().zip(names).enumerate() {
        println!(
            "  {} {:<14} {:>6} ({:>5.1}%)",
            code,
            name,
            count,
            100.0 * count as f64 / total
        );
    }
    println!();
    println!(
        "River cells: {}  Lake cells: {}",
        world.rivers().len(),
        world.lakes().len()
    );
    println!();

    let maps = biomes::classify(&world);
    let mut biome_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for (_, _, &code) in maps.biome_codes.iter() {
        *biome_counts.entry(biome_name(code)).or_insert(0) += 1;
    }
    println!("Biomes:");
    for (name, count) in &biome_counts {
        println!(
            "  {:<22} {:>6} ({:>5.1}%)",
            name,
            count,
            100.0 * *count as f64 / total
        );
    }
}
