//! Doublet finding: the first combinatorial stage of seed construction.
//!
//! Two passes over the spacepoint grid:
//! 1. Counting ([`counting`], [`kernels::count_doublets_kernel`]): per
//!    middle spacepoint, count compatible bottom and top partners in the
//!    neighbor bins.
//! 2. Finding ([`finding`], [`kernels::find_doublets_kernel`]): with exact
//!    row sizes known, materialize every compatible pair into two
//!    pre-sized containers.
//!
//! Counting first makes the fill pass race-free: each work item writes only
//! into its own exactly-sized row.

pub mod compat;
pub mod counting;
pub mod finding;
pub mod kernels;
pub mod pipeline;

pub use compat::{doublet_compatible, PartnerSide};
pub use counting::count_doublets_cpu;
pub use finding::find_doublets_cpu;
pub use pipeline::DoubletFinder;

use crate::container::record::DeviceRecord;
use crate::container::Container;

/// A compatible (middle, partner) spacepoint pair.
///
/// Both members are event-collection links, so doublets stay meaningful
/// after the grid is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Doublet {
    /// Link of the middle spacepoint.
    pub middle: u32,
    /// Link of the bottom or top partner.
    pub partner: u32,
}

impl DeviceRecord for Doublet {
    const WORDS: usize = 2;

    fn pack(&self, dst: &mut [u32]) {
        dst[0] = self.middle;
        dst[1] = self.partner;
    }

    fn unpack(src: &[u32]) -> Self {
        Self {
            middle: src[0],
            partner: src[1],
        }
    }
}

/// Compatible-partner counts for one middle spacepoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoubletCounter {
    /// Number of compatible bottom partners.
    pub bottom: u32,
    /// Number of compatible top partners.
    pub top: u32,
}

impl DeviceRecord for DoubletCounter {
    const WORDS: usize = 2;

    fn pack(&self, dst: &mut [u32]) {
        dst[0] = self.bottom;
        dst[1] = self.top;
    }

    fn unpack(src: &[u32]) -> Self {
        Self {
            bottom: src[0],
            top: src[1],
        }
    }
}

/// Everything the doublet stages produce for one event.
#[derive(Debug, Clone)]
pub struct DoubletOutput {
    /// One counter per middle spacepoint, in grid flat order, zero counts
    /// included.
    pub counters: Vec<DoubletCounter>,
    /// Per-bin rows of middle spacepoints (flat indices) with at least one
    /// bottom and one top partner; header is the bin index. Filled through
    /// the elastic append protocol on the GPU path.
    pub candidates: Container<u32, u32>,
    /// Mid-bottom doublets: row per middle spacepoint (flat order), header
    /// is the middle spacepoint's event link.
    pub mid_bottom: Container<u32, Doublet>,
    /// Mid-top doublets, same shape as `mid_bottom`.
    pub mid_top: Container<u32, Doublet>,
}
