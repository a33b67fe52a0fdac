//! CPU reference implementation of the doublet finding stage.
//!
//! Runs the counting pass, sizes every output row exactly, then re-runs the
//! same enumeration to fill the rows. Row order is enumeration order and is
//! reproducible for identical input; no ordering beyond that is promised.

use crate::config::SeedFinderConfig;
use crate::container::Container;
use crate::grid::{DeviceGridData, SpacepointGrid};

use super::compat::{doublet_compatible, PartnerSide};
use super::counting::{count_doublets_cpu, for_each_candidate};
use super::{Doublet, DoubletOutput};

/// Find all mid-bottom and mid-top doublets.
///
/// Output containers have one row per spacepoint in grid flat order; row
/// `m`'s header is the middle spacepoint's event link and its length equals
/// the counting result exactly.
pub fn find_doublets_cpu(grid: &SpacepointGrid, config: &SeedFinderConfig) -> DoubletOutput {
    let (counters, candidates) = count_doublets_cpu(grid, config);
    let data = DeviceGridData::flatten(grid);
    let bin_starts = &data.bin_offsets;

    let n = counters.len();
    let mut mid_bottom = Container::with_capacity(n);
    let mut mid_top = Container::with_capacity(n);

    let mut m = 0usize;
    for (bin, spacepoints) in grid.iter_bins().enumerate() {
        for middle in spacepoints {
            let mut bottom_row = Vec::with_capacity(counters[m].bottom as usize);
            let mut top_row = Vec::with_capacity(counters[m].top as usize);
            for_each_candidate(grid, bin_starts, bin, m, |_, candidate| {
                if doublet_compatible(config, middle, candidate, PartnerSide::Bottom) {
                    bottom_row.push(Doublet {
                        middle: middle.link,
                        partner: candidate.link,
                    });
                }
                if doublet_compatible(config, middle, candidate, PartnerSide::Top) {
                    top_row.push(Doublet {
                        middle: middle.link,
                        partner: candidate.link,
                    });
                }
            });
            debug_assert_eq!(bottom_row.len(), counters[m].bottom as usize);
            debug_assert_eq!(top_row.len(), counters[m].top as usize);
            mid_bottom.push_row(middle.link, bottom_row);
            mid_top.push_row(middle.link, top_row);
            m += 1;
        }
    }

    DoubletOutput {
        counters,
        candidates,
        mid_bottom,
        mid_top,
    }
}
