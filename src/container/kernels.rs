//! Device-side append protocol for elastic container rows.
//!
//! Elastic rows are reserved but unfilled at allocation time. Concurrent
//! work items claim slots through an atomic cursor per row; a claim past the
//! row's reserved capacity is dropped, leaving the cursor above the capacity
//! so the overflow is detectable on download.

use cubecl::prelude::*;

/// Append one single-word item to an elastic container row.
///
/// `items`, `offsets`, and `sizes` are the flat arrays of a container view
/// with single-word items. Rows holding wider records multiply the claimed
/// slot by the record width at the call site.
#[cube]
pub fn append_row(
    items: &mut Array<u32>,
    sizes: &mut Array<Atomic<u32>>,
    offsets: &Array<u32>,
    row: u32,
    value: u32,
) {
    let start = offsets[row];
    let cap = offsets[row + 1] - start;
    let slot = Atomic::add(&sizes[row], 1u32);
    if slot < cap {
        items[start + slot] = value;
    }
}

/// Append each value to its target row.
///
/// One work item per value; exercises the append protocol under full
/// contention when many values target the same row.
#[cube(launch_unchecked)]
pub fn scatter_append_kernel(
    values: &Array<u32>,
    target_rows: &Array<u32>,
    num_values: u32,
    items: &mut Array<u32>,
    offsets: &Array<u32>,
    sizes: &mut Array<Atomic<u32>>,
) {
    let idx = ABSOLUTE_POS;

    if idx >= num_values {
        terminate!();
    }

    append_row(items, sizes, offsets, target_rows[idx], values[idx]);
}
