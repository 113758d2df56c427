use clap::Parser;

use world_mapper::ascii::{self, AsciiMode};
use world_mapper::biomes;
use world_mapper::export;
use world_mapper::WorldGenerator;

#[derive(Parser, Debug)]
#[command(name = "world_mapper")]
#[command(about = "Generate seamless toroidal world maps with rivers and biomes")]
struct Args {
    /// Width of the map in cells
    #[arg(short = 'W', long, default_value = "256")]
    width: usize,

    /// Height of the map in cells
    #[arg(short = 'H', long, default_value = "128")]
    height: usize,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Water modifier; shifts the land/water ratio (negative = randomized)
    #[arg(long, default_value = "-1.0", allow_hyphen_values = true)]
    water_mod: f64,

    /// Cooling modifier; shifts the average temperature (negative = randomized)
    #[arg(long, default_value = "-1.0", allow_hyphen_values = true)]
    cool_mod: f64,

    /// Skip river and lake generation
    #[arg(long)]
    no_rivers: bool,

    /// Zoom in at "x,y" (repeatable; applied in order after generation)
    #[arg(long, value_name = "X,Y")]
    zoom: Vec<String>,

    /// Zoom back out this many times after the zoom-ins
    #[arg(long, default_value = "0")]
    zoom_out: usize,

    /// Print an ASCII preview of the height bands
    #[arg(long)]
    ascii: bool,

    /// Print an ASCII preview of the biomes
    #[arg(long)]
    ascii_biomes: bool,

    /// Export the height band map to a PNG
    #[arg(long)]
    export_png: Option<String>,

    /// Export the biome map to a PNG
    #[arg(long)]
    export_biomes: Option<String>,

    /// Export heat and moisture gradient PNGs with this path prefix
    #[arg(long)]
    export_climate: Option<String>,

    /// Export the full grid snapshot as JSON
    #[arg(long)]
    export_json: Option<String>,
}

fn parse_center(spec: &str) -> Option<(usize, usize)> {
    let (x, y) = spec.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn main() {
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(rand::random);
    println!("Generating world with seed: {}", seed);
    println!("Map size: {}x{}", args.width, args.height);

    let mut world = WorldGenerator::new(seed, args.width, args.height);
    world.generate_rivers = !args.no_rivers;
    world.generate_with(args.water_mod, args.cool_mod, seed);
    println!(
        "Modifiers: water={:.3} cooling={:.3}",
        world.water_modifier(),
        world.cooling_modifier()
    );

    let land = world
        .height_codes()
        .iter()
        .filter(|&(_, _, &code)| code >= 4)
        .count();
    println!(
        "Land: {} cells ({:.1}%)",
        land,
        100.0 * land as f64 / (args.width * args.height) as f64
    );
    println!(
        "Rivers: {} cells, lakes: {} cells",
        world.rivers().len(),
        world.lakes().len()
    );

    for spec in &args.zoom {
        match parse_center(spec) {
            Some((x, y)) => {
                world.zoom_in_at(x, y);
                println!(
                    "Zoomed in to level {} at origin {:?}",
                    world.zoom_level(),
                    world.viewport_origin()
                );
            }
            None => eprintln!("Ignoring malformed zoom center '{}' (expected X,Y)", spec),
        }
    }
    for _ in 0..args.zoom_out {
        world.zoom_out();
        println!(
            "Zoomed out to level {} at origin {:?}",
            world.zoom_level(),
            world.viewport_origin()
        );
    }

    let maps = biomes::classify(&world);

    if args.ascii {
        print!("{}", ascii::render(&world, AsciiMode::HeightBands, None));
    }
    if args.ascii_biomes {
        print!("{}", ascii::render(&world, AsciiMode::Biomes, Some(&maps)));
    }

    if let Some(path) = &args.export_png {
        match export::export_height_bands(&world, path) {
            Ok(()) => println!("Wrote height band map to {}", path),
            Err(e) => eprintln!("Failed to write {}: {}", path, e),
        }
    }
    if let Some(path) = &args.export_biomes {
        match export::export_biomes(&world, &maps, path) {
            Ok(()) => println!("Wrote biome map to {}", path),
            Err(e) => eprintln!("Failed to write {}: {}", path, e),
        }
    }
    if let Some(prefix) = &args.export_climate {
        let heat_path = format!("{}_heat.png", prefix);
        let wet_path = format!("{}_moisture.png", prefix);
        match export::export_gradient(world.heat_data(), &heat_path)
            .and_then(|_| export::export_gradient(world.moisture_data(), &wet_path))
        {
            Ok(()) => println!("Wrote climate maps to {} / {}", heat_path, wet_path),
            Err(e) => eprintln!("Failed to write climate maps: {}", e),
        }
    }
    if let Some(path) = &args.export_json {
        match export::export_json(&world, path) {
            Ok(()) => println!("Wrote snapshot to {}", path),
            Err(e) => eprintln!("Failed to write {}: {}", path, e),
        }
    }
}
