//! CPU reference implementation of the doublet counting stage.
//!
//! Mirrors [`count_doublets_kernel`](super::kernels::count_doublets_kernel)
//! exactly: same enumeration order, same predicate, same flat indexing. The
//! GPU pipeline is validated against this path.

use rayon::prelude::*;

use crate::config::SeedFinderConfig;
use crate::container::Container;
use crate::grid::{DeviceGridData, SpacepointGrid};
use crate::spacepoint::InternalSpacepoint;

use super::compat::{doublet_compatible, PartnerSide};
use super::DoubletCounter;

/// Per-bin candidate enumeration shared by both passes.
///
/// Calls `visit(candidate_flat_index, candidate)` for every spacepoint of
/// every neighbor bin of `bin`, excluding the middle spacepoint itself.
pub(super) fn for_each_candidate<'a>(
    grid: &'a SpacepointGrid,
    bin_starts: &[u32],
    bin: usize,
    middle_flat: usize,
    mut visit: impl FnMut(usize, &'a InternalSpacepoint),
) {
    for neighbor in grid.neighbor_bins(bin) {
        let start = bin_starts[neighbor] as usize;
        for (local, candidate) in grid.bin(neighbor).iter().enumerate() {
            let flat = start + local;
            if flat != middle_flat {
                visit(flat, candidate);
            }
        }
    }
}

/// Count compatible bottom/top partners for every middle spacepoint.
///
/// Returns one [`DoubletCounter`] per spacepoint in grid flat order (zero
/// counts included), plus the per-bin container of candidate middles: flat
/// indices of spacepoints with at least one partner on each side, the rows
/// the GPU path fills through the elastic append protocol.
pub fn count_doublets_cpu(
    grid: &SpacepointGrid,
    config: &SeedFinderConfig,
) -> (Vec<DoubletCounter>, Container<u32, u32>) {
    let data = DeviceGridData::flatten(grid);
    let bin_starts = &data.bin_offsets;

    // Flat list of (bin, spacepoint) in flat-index order.
    let flat: Vec<(usize, &InternalSpacepoint)> = grid
        .iter_bins()
        .enumerate()
        .flat_map(|(bin, sps)| sps.iter().map(move |sp| (bin, sp)))
        .collect();

    let counters: Vec<DoubletCounter> = flat
        .par_iter()
        .enumerate()
        .map(|(m, &(bin, middle))| {
            let mut counter = DoubletCounter::default();
            for_each_candidate(grid, bin_starts, bin, m, |_, candidate| {
                if doublet_compatible(config, middle, candidate, PartnerSide::Bottom) {
                    counter.bottom += 1;
                }
                if doublet_compatible(config, middle, candidate, PartnerSide::Top) {
                    counter.top += 1;
                }
            });
            counter
        })
        .collect();

    let mut candidates = Container::with_capacity(grid.n_bins());
    for bin in 0..grid.n_bins() {
        let start = bin_starts[bin] as usize;
        let end = bin_starts[bin + 1] as usize;
        let row: Vec<u32> = (start..end)
            .filter(|&m| counters[m].bottom > 0 && counters[m].top > 0)
            .map(|m| m as u32)
            .collect();
        candidates.push_row(bin as u32, row);
    }

    (counters, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridAxis;
    use crate::spacepoint::Spacepoint;
    use nalgebra::{Vector2, Vector3};
    use std::f32::consts::PI;

    fn sp(x: f32, y: f32, z: f32) -> Spacepoint {
        Spacepoint::new(Vector3::new(x, y, z), Vector2::zeros(), 0)
    }

    /// Grid whose neighborhoods cover every bin (3 phi bins wrapping, one z
    /// bin), so every pair of spacepoints is bin-reachable and a brute-force
    /// reference over all pairs is valid.
    fn one_region_grid(positions: &[[f32; 3]]) -> SpacepointGrid {
        let mut grid = SpacepointGrid::new(
            GridAxis::new(-PI, PI, 3),
            GridAxis::new(-300.0, 300.0, 1),
        );
        for (link, p) in positions.iter().enumerate() {
            grid.insert(link as u32, &sp(p[0], p[1], p[2]))
                .expect("test spacepoints are in range");
        }
        grid
    }

    /// Independent brute-force count over all pairs, using raw positions.
    fn brute_force_counters(
        grid: &SpacepointGrid,
        config: &SeedFinderConfig,
    ) -> Vec<DoubletCounter> {
        let all: Vec<_> = grid.iter_bins().flatten().collect();
        all.iter()
            .enumerate()
            .map(|(m, middle)| {
                let mut counter = DoubletCounter::default();
                for (p, partner) in all.iter().enumerate() {
                    if p == m {
                        continue;
                    }
                    let dr_bot = middle.radius - partner.radius;
                    if dr_bot >= config.delta_r_min && dr_bot <= config.delta_r_max {
                        let cot = (middle.z - partner.z) / dr_bot;
                        let zo = middle.z - middle.radius * cot;
                        if cot.abs() <= config.cot_theta_max
                            && zo >= config.collision_region_min
                            && zo <= config.collision_region_max
                        {
                            counter.bottom += 1;
                        }
                    }
                    let dr_top = partner.radius - middle.radius;
                    if dr_top >= config.delta_r_min && dr_top <= config.delta_r_max {
                        let cot = (partner.z - middle.z) / dr_top;
                        let zo = middle.z - middle.radius * cot;
                        if cot.abs() <= config.cot_theta_max
                            && zo >= config.collision_region_min
                            && zo <= config.collision_region_max
                        {
                            counter.top += 1;
                        }
                    }
                }
                counter
            })
            .collect()
    }

    #[test]
    fn test_counts_match_brute_force() {
        // Three radial layers with several phi positions and z spread.
        let mut positions = Vec::new();
        for &r in &[30.0f32, 60.0, 90.0] {
            for k in 0..6 {
                let phi = k as f32 * PI / 3.0 + 0.1;
                let z = (k as f32 - 2.5) * 15.0 * (r / 60.0);
                positions.push([r * phi.cos(), r * phi.sin(), z]);
            }
        }
        let grid = one_region_grid(&positions);
        let config = SeedFinderConfig::default();

        let (counters, _) = count_doublets_cpu(&grid, &config);
        // Brute force walks the same flat (bin-major) order.
        let brute = brute_force_counters(&grid, &config);
        assert_eq!(counters.len(), brute.len());
        assert_eq!(counters, brute);

        let total: u32 = counters.iter().map(|c| c.bottom + c.top).sum();
        assert!(total > 0, "test geometry should produce doublets");
    }

    #[test]
    fn test_counts_match_brute_force_random_event() {
        use rand::prelude::*;
        use rand_distr::{Normal, Uniform};

        let mut rng = StdRng::seed_from_u64(42);
        let radius_dist = Uniform::new(25.0f32, 110.0);
        let phi_dist = Uniform::new(-PI, PI);
        let z_dist = Normal::new(0.0f32, 60.0).unwrap();

        let positions: Vec<[f32; 3]> = (0..80)
            .map(|_| {
                let r = radius_dist.sample(&mut rng);
                let phi = phi_dist.sample(&mut rng);
                [r * phi.cos(), r * phi.sin(), z_dist.sample(&mut rng)]
            })
            .collect();
        let grid = one_region_grid(&positions);
        let config = SeedFinderConfig::default();

        let (counters, _) = count_doublets_cpu(&grid, &config);
        assert_eq!(counters, brute_force_counters(&grid, &config));
    }

    #[test]
    fn test_worked_example_counts() {
        // Middle M with one compatible bottom (B1), one incompatible
        // spacepoint below (B2, radial gap under delta_r_min), and one
        // compatible top (T1).
        let grid = one_region_grid(&[
            [60.0, 0.0, 0.0],   // M
            [30.0, 0.0, -10.0], // B1
            [59.5, 0.0, 0.0],   // B2
            [90.0, 0.0, 10.0],  // T1
        ]);
        let (counters, candidates) = count_doublets_cpu(&grid, &SeedFinderConfig::default());

        // All four share one bin, so flat order is insertion order.
        let m = 0;
        assert_eq!(counters[m], DoubletCounter { bottom: 1, top: 1 });

        // Candidate middles: M, and B2 (which pairs with B1 below and T1
        // above even though it is too close to M itself).
        let all_candidates: Vec<u32> = candidates.rows().iter().flatten().copied().collect();
        assert_eq!(all_candidates, vec![0, 2]);
    }

    #[test]
    fn test_isolated_middle_counts_zero() {
        let mut grid = SpacepointGrid::new(
            GridAxis::new(-PI, PI, 8),
            GridAxis::new(-300.0, 300.0, 4),
        );
        grid.insert(0, &sp(60.0, 0.0, 0.0)).unwrap();
        // Far away in phi and z: not reachable through neighbor bins.
        grid.insert(1, &sp(-30.0, 0.0, -250.0)).unwrap();

        let (counters, candidates) = count_doublets_cpu(&grid, &SeedFinderConfig::default());
        assert_eq!(counters.len(), 2);
        assert!(counters.iter().all(|c| *c == DoubletCounter::default()));
        assert!(candidates.rows().iter().all(|r| r.is_empty()));
    }

    #[test]
    fn test_empty_grid_counts_nothing() {
        let grid = one_region_grid(&[]);
        let (counters, candidates) = count_doublets_cpu(&grid, &SeedFinderConfig::default());
        assert!(counters.is_empty());
        assert_eq!(candidates.len(), grid.n_bins());
        assert_eq!(candidates.total_items(), 0);
    }
}
