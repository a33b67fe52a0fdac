//! Non-owning container view.

use std::marker::PhantomData;

use cubecl::server::Handle;

use super::record::DeviceRecord;

/// Borrowed, launch-ready view of a [`ContainerBuffer`].
///
/// Holds references to the buffer's device handles plus the shape
/// information needed to build kernel arguments. Cheap to copy, and tied to
/// the buffer's lifetime so it can never outlive the storage it points at.
///
/// Kernels consume the view as four flat arrays:
/// - `headers`: `n_rows * H::WORDS` words
/// - `items`: `item_capacity * I::WORDS` words
/// - `offsets`: `n_rows + 1` row starts, in item units
/// - `sizes`: `n_rows` fill counts, in item units
///
/// [`ContainerBuffer`]: super::ContainerBuffer
#[derive(Debug)]
pub struct ContainerView<'a, H: DeviceRecord, I: DeviceRecord> {
    /// Packed header words.
    pub headers: &'a Handle,
    /// Packed item words for every row, laid out back to back.
    pub items: &'a Handle,
    /// Row start positions in item units, one past the end included.
    pub offsets: &'a Handle,
    /// Current row fill counts in item units.
    pub sizes: &'a Handle,
    /// Number of rows.
    pub n_rows: u32,
    /// Total item capacity across all rows.
    pub item_capacity: u32,
    _marker: PhantomData<(H, I)>,
}

impl<H: DeviceRecord, I: DeviceRecord> Clone for ContainerView<'_, H, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: DeviceRecord, I: DeviceRecord> Copy for ContainerView<'_, H, I> {}

impl<'a, H: DeviceRecord, I: DeviceRecord> ContainerView<'a, H, I> {
    pub(super) fn new(
        headers: &'a Handle,
        items: &'a Handle,
        offsets: &'a Handle,
        sizes: &'a Handle,
        n_rows: u32,
        item_capacity: u32,
    ) -> Self {
        Self {
            headers,
            items,
            offsets,
            sizes,
            n_rows,
            item_capacity,
            _marker: PhantomData,
        }
    }

    /// Length of the header word array.
    pub fn header_words(&self) -> usize {
        self.n_rows as usize * H::WORDS
    }

    /// Length of the item word array.
    pub fn item_words(&self) -> usize {
        self.item_capacity as usize * I::WORDS
    }

    /// Length of the offsets array.
    pub fn offset_len(&self) -> usize {
        self.n_rows as usize + 1
    }

    /// Length of the sizes array.
    pub fn size_len(&self) -> usize {
        self.n_rows as usize
    }
}
