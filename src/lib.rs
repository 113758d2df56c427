//! Toroidal world map generation library
//!
//! Seamless height/heat/moisture fields over a torus embedding, discrete
//! elevation bands, a carved river/lake network, multi-resolution zoom and
//! biome classification. Re-exports modules for use by binaries and tools.

pub mod ascii;
pub mod biomes;
pub mod export;
pub mod generator;
pub mod grid;
pub mod noise_fields;
pub mod region;
pub mod rivers;
pub mod synthesis;

pub use generator::WorldGenerator;
