//! River and lake carving.
//!
//! Runs once per fresh generation at full resolution, in two phases: trunk
//! rivers grown by greedy descent walks from high-elevation sources, then
//! short tributaries grown by ascent walks away from the committed network.
//! Zoom levels never re-simulate; the finished regions are geometrically
//! rescaled and touched up per level instead.
//!
//! Every boundary condition inside a walk resolves to an abort or merge
//! rule, so the simulation always terminates and never corrupts committed
//! river state: paths are folded into the network only at those
//! well-defined end points.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grid::Grid;
use crate::region::{van_der_corput, Region};
use crate::synthesis::HEIGHT_BAND_LOWERS;

// =============================================================================
// DIRECTIONS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Direction {
    pub dx: i32,
    pub dy: i32,
}

impl Direction {
    pub const fn is_diagonal(self) -> bool {
        self.dx != 0 && self.dy != 0
    }
}

const UP: Direction = Direction { dx: 0, dy: -1 };
const DOWN: Direction = Direction { dx: 0, dy: 1 };
const LEFT: Direction = Direction { dx: -1, dy: 0 };
const RIGHT: Direction = Direction { dx: 1, dy: 0 };

pub const CARDINALS: [Direction; 4] = [UP, DOWN, LEFT, RIGHT];
pub const DIAGONALS: [Direction; 4] = [
    Direction { dx: -1, dy: -1 },
    Direction { dx: 1, dy: -1 },
    Direction { dx: -1, dy: 1 },
    Direction { dx: 1, dy: 1 },
];
pub const OUTWARDS: [Direction; 8] = [
    UP,
    DOWN,
    LEFT,
    RIGHT,
    Direction { dx: -1, dy: -1 },
    Direction { dx: 1, dy: -1 },
    Direction { dx: -1, dy: 1 },
    Direction { dx: 1, dy: 1 },
];

/// Candidate directions for one walk step: the four cardinals shuffled with
/// one of them replaced by a random diagonal, then a random diagonal in slot
/// 4 and a random outward direction in slot 5. Trunk walks read slots 0..5,
/// tributary ascents read all six.
fn direction_deck(rng: &mut ChaCha8Rng) -> [Direction; 6] {
    let mut cardinals = CARDINALS;
    cardinals.shuffle(rng);
    let mut deck = [
        cardinals[0],
        cardinals[1],
        cardinals[2],
        cardinals[3],
        DIAGONALS[0],
        OUTWARDS[0],
    ];
    deck[rng.gen_range(0..4)] = DIAGONALS[rng.gen_range(0..4)];
    deck[4] = DIAGONALS[rng.gen_range(0..4)];
    deck[5] = OUTWARDS[rng.gen_range(0..8)];
    deck
}

/// Height at signed coordinates; out-of-map reads as +infinity so it never
/// wins a "lower" comparison.
fn height_at(height_data: &Grid<f64>, x: i32, y: i32) -> f64 {
    if height_data.in_bounds(x, y) {
        *height_data.get(x as usize, y as usize)
    } else {
        f64::INFINITY
    }
}

// =============================================================================
// CARVING
// =============================================================================

/// Margin excluded from river sources, in cells from each map edge.
const SOURCE_MARGIN: i32 = 8;
/// Source density per cell of the larger map dimension.
const SOURCE_DENSITY: f64 = 0.000003;
/// Height drained low enough to count as reaching water.
const MOUTH_HEIGHT: f64 = 0.075;
/// Erosion applied to a lake's diagonal neighbor when trying to open a
/// downhill escape from a local minimum.
const EROSION_STEP: f64 = 0.0002;

/// Grow the full-resolution river and lake network.
///
/// Mutates `height_data` (lake-escape erosion) but not `height_codes`. The
/// generator's RNG is restored to a state drawn up front, so later consumers
/// of the same RNG are unaffected by however many draws the walks made.
pub fn carve(
    rng: &mut ChaCha8Rng,
    height_data: &mut Grid<f64>,
    height_codes: &Grid<u8>,
    rivers: &mut Region,
    lakes: &mut Region,
) {
    let width = height_data.width as i32;
    let height = height_data.height as i32;
    let rebuild_state = rng.next_u64();

    // Sources: high ground, away from the edges, spread out evenly.
    let mut margin = Region::new(width as usize, height as usize);
    margin.insert_rect(
        SOURCE_MARGIN,
        SOURCE_MARGIN,
        width - SOURCE_MARGIN * 2,
        height - SOURCE_MARGIN * 2,
    );
    let mut sources = Region::new(width as usize, height as usize);
    sources.refill_band(height_codes, 6, 100);
    sources.quasi_random_subset(SOURCE_DENSITY * width.max(height) as f64);
    sources.intersect_with(&margin);
    let starts = sources.members();

    rivers.clear();
    lakes.clear();

    let mut working = Region::new(width as usize, height as usize);

    // Phase 1: trunk rivers, one greedy descent walk per source.
    'per_river: for &(sx, sy) in &starts {
        working.clear();
        let mut curr_x = sx as i32;
        let mut curr_y = sy as i32;
        loop {
            let mut best = 999999.0;
            let mut choice: Option<Direction> = None;
            let deck = direction_deck(rng);
            let mut tx = curr_x;
            let mut ty = curr_y;

            for dir in &deck[..5] {
                let adj_x = curr_x + dir.dx;
                if adj_x < 0 || adj_x >= width {
                    // Walked off the map; rarely keep the path anyway.
                    if rng.gen_range(0..16) == 0 {
                        rivers.union_with(&working);
                    }
                    continue 'per_river;
                }
                let adj_y = curr_y + dir.dy;
                if adj_y < 0 || adj_y >= height {
                    if rng.gen_range(0..16) == 0 {
                        rivers.union_with(&working);
                    }
                    continue 'per_river;
                }
                let h = *height_data.get(adj_x as usize, adj_y as usize);
                if h < best && !working.contains(adj_x, adj_y) {
                    best = h;
                    choice = Some(*dir);
                    tx = adj_x;
                    ty = adj_y;
                }
            }
            curr_x = tx;
            curr_y = ty;

            if best >= *height_data.get(sx, sy) {
                // Local minimum: pool a small lake, then try twice to erode
                // a random diagonal neighbor into a downhill escape.
                let pick = rng.gen_range(0..4u32) as i32;
                let mut adj_x = curr_x + ((pick & 1) << 1) - 1;
                let mut adj_y = curr_y + (pick & 2) - 1;
                lakes.insert(curr_x, curr_y);
                lakes.insert(curr_x + 1, curr_y);
                lakes.insert(curr_x - 1, curr_y);
                lakes.insert(curr_x, curr_y + 1);
                lakes.insert(curr_x, curr_y - 1);
                if height_data.in_bounds(adj_x, adj_y) {
                    let (ax, ay) = (adj_x as usize, adj_y as usize);
                    let code = *height_codes.get(ax, ay);
                    if code <= 3 {
                        rivers.union_with(&working);
                        continue 'per_river;
                    }
                    let eroded = *height_data.get(ax, ay) - EROSION_STEP;
                    height_data.set(ax, ay, eroded);
                    if eroded < HEIGHT_BAND_LOWERS[code as usize - 1] {
                        if rng.gen_range(0..8) == 0 {
                            rivers.union_with(&working);
                        }
                        continue 'per_river;
                    }
                } else {
                    if rng.gen_range(0..32) == 0 {
                        rivers.union_with(&working);
                    }
                    continue 'per_river;
                }
                let pick = rng.gen_range(0..4u32) as i32;
                adj_x = curr_x + ((pick & 1) << 1) - 1;
                adj_y = curr_y + (pick & 2) - 1;
                if height_data.in_bounds(adj_x, adj_y) {
                    let (ax, ay) = (adj_x as usize, adj_y as usize);
                    let code = *height_codes.get(ax, ay);
                    if code <= 3 {
                        rivers.union_with(&working);
                        continue 'per_river;
                    }
                    let eroded = *height_data.get(ax, ay) - EROSION_STEP;
                    height_data.set(ax, ay, eroded);
                    if eroded < HEIGHT_BAND_LOWERS[code as usize - 1] {
                        if rng.gen_range(0..8) == 0 {
                            rivers.union_with(&working);
                        }
                        continue 'per_river;
                    }
                } else {
                    if rng.gen_range(0..32) == 0 {
                        rivers.union_with(&working);
                    }
                    continue 'per_river;
                }
            }

            if let Some(dir) = choice {
                if dir.is_diagonal() {
                    // Keep diagonal steps 4-connected by adding the lower of
                    // the two orthogonal shoulder cells.
                    let ox = curr_x - dir.dx;
                    let oy = curr_y - dir.dy;
                    if height_at(height_data, ox, curr_y) <= height_at(height_data, curr_x, oy)
                        && !working.contains(ox, curr_y)
                    {
                        if rivers.contains(ox, curr_y) {
                            rivers.union_with(&working);
                            continue 'per_river;
                        }
                        working.insert(ox, curr_y);
                        if height_at(height_data, ox, curr_y) <= MOUTH_HEIGHT {
                            rivers.union_with(&working);
                            continue 'per_river;
                        }
                    } else if !working.contains(curr_x, oy) {
                        if rivers.contains(curr_x, oy) {
                            rivers.union_with(&working);
                            continue 'per_river;
                        }
                        working.insert(curr_x, oy);
                        if height_at(height_data, curr_x, oy) <= MOUTH_HEIGHT {
                            rivers.union_with(&working);
                            continue 'per_river;
                        }
                    }
                }
            }

            if rivers.contains(curr_x, curr_y) {
                // Reached an existing river: merge.
                rivers.union_with(&working);
                continue 'per_river;
            }
            working.insert(curr_x, curr_y);
            if *height_data.get(curr_x as usize, curr_y as usize) <= MOUTH_HEIGHT {
                rivers.union_with(&working);
                continue 'per_river;
            }
        }
    }

    // Phase 2: tributaries, seeded on the committed network band by band.
    let mut branch = Region::new(width as usize, height as usize);
    let river_count = rivers.len() >> 3;
    let per_band_max = river_count >> 2;
    let mut idx = 0usize;
    for band in 5u8..9 {
        working.refill_band(height_codes, band, band + 1);
        working.intersect_with(rivers);
        let mut grown = 0usize;
        'branch: while grown < per_band_max && idx < river_count {
            grown += 1;
            let fraction = van_der_corput(idx);
            idx += 1;
            let Some((sx, sy)) = working.member_at_fraction(fraction) else {
                break;
            };

            // Pick the start of the branch: the runner-up among the highest
            // neighbors of the seed point.
            let deck = direction_deck(rng);
            let mut best = -999999.0;
            let mut choice: Option<Direction> = None;
            let mut prev_choice: Option<Direction> = None;
            let mut tx = sx as i32;
            let mut ty = sy as i32;
            let mut curr_x = sx as i32;
            let mut curr_y = sy as i32;
            for dir in &deck[..5] {
                let adj_x = sx as i32 + dir.dx;
                let adj_y = sy as i32 + dir.dy;
                if !height_data.in_bounds(adj_x, adj_y) {
                    continue;
                }
                let h = *height_data.get(adj_x as usize, adj_y as usize);
                if h > best {
                    best = h;
                    prev_choice = choice;
                    choice = Some(*dir);
                    curr_x = tx;
                    curr_y = ty;
                    tx = adj_x;
                    ty = adj_y;
                }
            }
            if let Some(dir) = prev_choice {
                if height_codes.in_bounds(curr_x, curr_y)
                    && *height_codes.get(curr_x as usize, curr_y as usize) >= 4
                {
                    if dir.is_diagonal() {
                        let ox = curr_x - dir.dx;
                        let oy = curr_y - dir.dy;
                        if height_at(height_data, ox, curr_y)
                            <= height_at(height_data, curr_x, oy)
                        {
                            branch.insert(ox, curr_y);
                        } else {
                            branch.insert(curr_x, oy);
                        }
                    }
                    branch.insert(curr_x, curr_y);
                }
            }

            // Ascend away from the river until it peters out, then pool.
            loop {
                let deck = direction_deck(rng);
                let mut best = -999999.0;
                let mut choice: Option<Direction> = None;
                let mut nx = curr_x;
                let mut ny = curr_y;
                for dir in &deck {
                    let adj_x = curr_x + dir.dx;
                    let adj_y = curr_y + dir.dy;
                    if !height_data.in_bounds(adj_x, adj_y) {
                        continue;
                    }
                    let h = *height_data.get(adj_x as usize, adj_y as usize);
                    if h > best && !rivers.contains(adj_x, adj_y) {
                        best = h;
                        choice = Some(*dir);
                        nx = adj_x;
                        ny = adj_y;
                    }
                }
                curr_x = nx;
                curr_y = ny;
                if let Some(dir) = choice {
                    if *height_codes.get(curr_x as usize, curr_y as usize) >= 4 {
                        if dir.is_diagonal() {
                            let ox = curr_x - dir.dx;
                            let oy = curr_y - dir.dy;
                            if height_at(height_data, ox, curr_y)
                                <= height_at(height_data, curr_x, oy)
                            {
                                branch.insert(ox, curr_y);
                            } else {
                                branch.insert(curr_x, oy);
                            }
                        }
                        branch.insert(curr_x, curr_y);
                    }
                }
                // Cutoff: below the seed height, or a random stop whose
                // odds rise with elevation.
                if best <= *height_data.get(sx, sy)
                    || *height_data.get(curr_x as usize, curr_y as usize)
                        > rng.gen::<f64>() * 280.0
                {
                    rivers.union_with(&branch);
                    branch.clear();

                    lakes.insert(curr_x, curr_y);
                    let spread = {
                        let r: u32 = rng.gen_range(0..256);
                        r & (r >> 4)
                    };
                    if spread & 1 == 0 {
                        lakes.insert(curr_x + 1, curr_y);
                    }
                    if spread & 2 == 0 {
                        lakes.insert(curr_x - 1, curr_y);
                    }
                    if spread & 4 == 0 {
                        lakes.insert(curr_x, curr_y + 1);
                    }
                    if spread & 8 == 0 {
                        lakes.insert(curr_x, curr_y - 1);
                    }
                    let pick = rng.gen_range(0..4u32) as i32;
                    let diag_x = curr_x + (-(pick & 1) | 1);
                    let diag_y = curr_y + ((pick & 2) - 1);
                    lakes.insert(diag_x, diag_y);
                    lakes.insert(curr_x, diag_y);
                    lakes.insert(diag_x, curr_y);

                    continue 'branch;
                }
            }
        }
    }

    *rng = ChaCha8Rng::seed_from_u64(rebuild_state);
}

// =============================================================================
// ZOOM REFINEMENT
// =============================================================================

/// Map the finished full-resolution regions into the current zoom viewport.
///
/// Each level rescales by 2x around the viewport origin delta, bridges
/// diagonal gaps, and corrects the visual line density: most levels thin and
/// then dilate a quasi-random half of the fringe, while every fourth level
/// skips the thinning and dilates a smaller fringe share.
pub fn refine_into_viewport(
    partial_rivers: &mut Region,
    partial_lakes: &mut Region,
    origins: &[(usize, usize)],
    zoom: usize,
) {
    for i in 1..=zoom {
        let sx = ((origins[i].0 as i64 - origins[i - 1].0 as i64) << (i - 1)) as i32;
        let sy = ((origins[i].1 as i64 - origins[i - 1].1 as i64) << (i - 1)) as i32;
        if i & 3 == 3 {
            partial_rivers.rescale_double(sx, sy);
            partial_rivers.connect_8way();
            dilate_fringe(partial_rivers, 0.4);
            partial_lakes.rescale_double(sx, sy);
            partial_lakes.connect_8way();
            dilate_fringe(partial_lakes, 0.55);
        } else {
            partial_rivers.rescale_double(sx, sy);
            partial_rivers.connect_8way();
            partial_rivers.thin();
            dilate_fringe(partial_rivers, 0.5);
            partial_lakes.rescale_double(sx, sy);
            partial_lakes.connect_8way();
            partial_lakes.thin();
            dilate_fringe(partial_lakes, 0.7);
        }
    }
}

/// Grow a region by a quasi-random fraction of its fringe cells.
fn dilate_fringe(region: &mut Region, fraction: f64) {
    let mut halo = region.clone();
    halo.fringe();
    halo.quasi_random_subset(fraction);
    region.union_with(&halo);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::code_height;

    fn hill_world(size: usize) -> (Grid<f64>, Grid<u8>) {
        // A radial island: high in the middle, deep water at the edges.
        let mut height_data = Grid::new_with(size, size, 0.0f64);
        let mut height_codes = Grid::new_with(size, size, 0u8);
        let half = size as f64 / 2.0;
        for y in 0..size {
            for x in 0..size {
                let dx = (x as f64 - half) / half;
                let dy = (y as f64 - half) / half;
                let d = (dx * dx + dy * dy).sqrt();
                let h = (1.0 - d * 1.6).clamp(-1.0, 1.0);
                height_data.set(x, y, h);
                height_codes.set(x, y, code_height(h));
            }
        }
        (height_data, height_codes)
    }

    #[test]
    fn test_direction_deck_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..64 {
            let deck = direction_deck(&mut rng);
            let diagonals_up_front = deck[..4].iter().filter(|d| d.is_diagonal()).count();
            assert_eq!(diagonals_up_front, 1);
            assert!(deck[4].is_diagonal());
            assert!(OUTWARDS.contains(&deck[5]));
        }
    }

    #[test]
    fn test_carve_is_deterministic() {
        let (height_a, codes) = hill_world(64);
        let mut height_b = height_a.clone();
        let mut height_a = height_a;

        let mut rivers_a = Region::new(64, 64);
        let mut lakes_a = Region::new(64, 64);
        let mut rng = ChaCha8Rng::seed_from_u64(4242);
        carve(&mut rng, &mut height_a, &codes, &mut rivers_a, &mut lakes_a);

        let mut rivers_b = Region::new(64, 64);
        let mut lakes_b = Region::new(64, 64);
        let mut rng = ChaCha8Rng::seed_from_u64(4242);
        carve(&mut rng, &mut height_b, &codes, &mut rivers_b, &mut lakes_b);

        assert_eq!(rivers_a.members(), rivers_b.members());
        assert_eq!(lakes_a.members(), lakes_b.members());
    }

    #[test]
    fn test_carve_restores_rng_stream() {
        let (mut height_data, codes) = hill_world(64);
        let mut rivers = Region::new(64, 64);
        let mut lakes = Region::new(64, 64);

        let mut carving_rng = ChaCha8Rng::seed_from_u64(7);
        carve(&mut carving_rng, &mut height_data, &codes, &mut rivers, &mut lakes);

        // The post-carve stream only depends on the single state draw made
        // up front, not on how many draws the walks consumed.
        let mut control = ChaCha8Rng::seed_from_u64(7);
        let expected = ChaCha8Rng::seed_from_u64(control.next_u64()).next_u64();
        assert_eq!(carving_rng.next_u64(), expected);
    }

    #[test]
    fn test_refine_identity_at_zoom_zero() {
        let mut rivers = Region::new(16, 16);
        rivers.insert(4, 4);
        rivers.insert(5, 4);
        let mut lakes = Region::new(16, 16);
        let before = rivers.members();
        refine_into_viewport(&mut rivers, &mut lakes, &[(0, 0)], 0);
        assert_eq!(rivers.members(), before);
        assert!(lakes.is_empty());
    }

    #[test]
    fn test_refine_scales_into_viewport() {
        let mut rivers = Region::new(16, 16);
        for x in 0..16 {
            rivers.insert(x, 8);
        }
        let mut lakes = Region::new(16, 16);
        refine_into_viewport(&mut rivers, &mut lakes, &[(0, 0), (4, 4)], 1);
        assert!(!rivers.is_empty());
        // The source row at y=8 sits at (8-4)*2 = 8 after rescaling; all its
        // cells come from in-viewport sources.
        assert!(rivers.members().iter().any(|&(_, y)| y == 8 || y == 9));
    }
}
