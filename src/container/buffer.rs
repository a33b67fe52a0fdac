//! Device-owning container storage and host/device transfer.
//!
//! A [`ContainerBuffer`] owns accelerator-resident storage for a jagged
//! container. Rows are laid out back to back in one flat item array with a
//! CSR-style offset table, so a kernel can address row `i` as
//! `items[offsets[i] .. offsets[i + 1]]` without indirection.
//!
//! Two allocation modes exist:
//! - exact: one capacity per row, rows considered full (the fill kernel
//!   writes every reserved slot)
//! - elastic: reserved capacity with rows starting empty, filled through the
//!   atomic append protocol in [`kernels`](super::kernels)
//!
//! Transfers are synchronous and caller-sequenced: uploads happen at
//! construction, downloads through [`ContainerBuffer::to_host`].

use std::marker::PhantomData;

use cubecl::prelude::*;
use cubecl::server::Handle;

use crate::runtime::CudaClient;

use super::record::{pack_slice, unpack_slice, DeviceRecord};
use super::view::ContainerView;
use super::{Container, ContainerData, ContainerError};

/// Device-owning jagged container storage.
pub struct ContainerBuffer<H: DeviceRecord, I: DeviceRecord> {
    headers: Handle,
    items: Handle,
    offsets: Handle,
    sizes: Handle,
    /// Host copy of the offset table, in item units.
    host_offsets: Vec<u32>,
    n_rows: usize,
    item_capacity: usize,
    _marker: PhantomData<(H, I)>,
}

impl<H: DeviceRecord, I: DeviceRecord> ContainerBuffer<H, I> {
    /// Allocate an exactly-sized buffer: one capacity per row, rows full.
    ///
    /// This is the shape of the doublet-finding outputs, where every row
    /// length is known before the fill kernel launches.
    pub fn with_row_capacities(
        client: &CudaClient,
        headers: &[H],
        capacities: &[u32],
    ) -> Result<Self, ContainerError> {
        Self::alloc(client, headers, capacities, RowFill::Full, None)
    }

    /// Allocate an elastic buffer: reserved capacity per row, rows empty.
    ///
    /// Rows are filled through the atomic append protocol; appends past a
    /// row's capacity are dropped and show up as a raw cursor value above
    /// the capacity (see [`Self::raw_sizes`]).
    pub fn elastic(
        client: &CudaClient,
        headers: &[H],
        capacities: &[u32],
    ) -> Result<Self, ContainerError> {
        Self::alloc(client, headers, capacities, RowFill::Empty, None)
    }

    /// Allocate an elastic buffer with the same capacity for every row.
    pub fn elastic_uniform(
        client: &CudaClient,
        headers: &[H],
        cap_per_row: u32,
    ) -> Result<Self, ContainerError> {
        let capacities = vec![cap_per_row; headers.len()];
        Self::alloc(client, headers, &capacities, RowFill::Empty, None)
    }

    /// Upload a host container description.
    pub fn from_data(
        client: &CudaClient,
        data: &ContainerData<'_, H, I>,
    ) -> Result<Self, ContainerError> {
        if data.headers.len() != data.rows.len() {
            return Err(ContainerError::RowCountMismatch {
                headers: data.headers.len(),
                rows: data.rows.len(),
            });
        }
        let capacities = data.row_capacities();
        let mut item_words = Vec::new();
        for row in &data.rows {
            item_words.extend(pack_slice(row));
        }
        Self::alloc(
            client,
            data.headers,
            &capacities,
            RowFill::Full,
            Some(item_words),
        )
    }

    /// Upload a host container.
    pub fn from_host(
        client: &CudaClient,
        container: &Container<H, I>,
    ) -> Result<Self, ContainerError> {
        Self::from_data(client, &container.data())
    }

    fn alloc(
        client: &CudaClient,
        headers: &[H],
        capacities: &[u32],
        fill: RowFill,
        item_words: Option<Vec<u32>>,
    ) -> Result<Self, ContainerError> {
        if headers.len() != capacities.len() {
            return Err(ContainerError::RowCountMismatch {
                headers: headers.len(),
                rows: capacities.len(),
            });
        }

        let n_rows = headers.len();
        let mut host_offsets = Vec::with_capacity(n_rows + 1);
        let mut total: u64 = 0;
        host_offsets.push(0u32);
        for &cap in capacities {
            total += u64::from(cap);
            if total * I::WORDS as u64 > u64::from(u32::MAX) {
                return Err(ContainerError::CapacityOverflow {
                    words: total * I::WORDS as u64,
                });
            }
            host_offsets.push(total as u32);
        }
        let item_capacity = total as usize;

        let header_handle = create_words(client, &pack_slice(headers));
        let offsets_handle = create_words(client, &host_offsets);

        let sizes = match fill {
            RowFill::Full => capacities.to_vec(),
            RowFill::Empty => vec![0u32; n_rows],
        };
        let sizes_handle = create_words(client, &sizes);

        let items_handle = match item_words {
            Some(words) => {
                debug_assert_eq!(words.len(), item_capacity * I::WORDS);
                create_words(client, &words)
            }
            None => client.empty((item_capacity * I::WORDS).max(1) * std::mem::size_of::<u32>()),
        };

        Ok(Self {
            headers: header_handle,
            items: items_handle,
            offsets: offsets_handle,
            sizes: sizes_handle,
            host_offsets,
            n_rows,
            item_capacity,
            _marker: PhantomData,
        })
    }

    /// Borrowed, launch-ready view of this buffer.
    pub fn view(&self) -> ContainerView<'_, H, I> {
        ContainerView::new(
            &self.headers,
            &self.items,
            &self.offsets,
            &self.sizes,
            self.n_rows as u32,
            self.item_capacity as u32,
        )
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Total reserved item capacity across all rows.
    pub fn item_capacity(&self) -> usize {
        self.item_capacity
    }

    /// Reserved capacity of one row, in items.
    pub fn row_capacity(&self, i: usize) -> u32 {
        self.host_offsets[i + 1] - self.host_offsets[i]
    }

    /// Host copy of the row offset table, in item units.
    pub fn offsets(&self) -> &[u32] {
        &self.host_offsets
    }

    /// Download the raw per-row size cursors.
    ///
    /// For elastic rows a cursor above the row capacity means appends were
    /// dropped; the stored items are still the first `capacity` appends.
    pub fn raw_sizes(&self, client: &CudaClient) -> Vec<u32> {
        let mut sizes = read_words(client, &self.sizes);
        sizes.truncate(self.n_rows);
        sizes
    }

    /// Download the buffer into a host container.
    ///
    /// Row lengths are the current fill counts, clamped to each row's
    /// capacity.
    pub fn to_host(&self, client: &CudaClient) -> Container<H, I> {
        let mut header_words = read_words(client, &self.headers);
        header_words.truncate(self.n_rows * H::WORDS);
        let headers = unpack_slice::<H>(&header_words);

        let sizes = self.raw_sizes(client);
        let item_words = read_words(client, &self.items);

        let mut rows = Vec::with_capacity(self.n_rows);
        for i in 0..self.n_rows {
            let cap = self.row_capacity(i);
            let len = Ord::min(sizes[i], cap) as usize;
            let start = self.host_offsets[i] as usize * I::WORDS;
            let end = start + len * I::WORDS;
            rows.push(unpack_slice::<I>(&item_words[start..end]));
        }

        // Construction cannot mismatch: headers and rows both have n_rows
        // entries by this point.
        Container::from_parts(headers, rows).expect("per-row download preserves the row count")
    }
}

enum RowFill {
    Full,
    Empty,
}

/// Upload a word vector, padding zero-sized allocations to one word.
fn create_words(client: &CudaClient, words: &[u32]) -> Handle {
    if words.is_empty() {
        client.create(u32::as_bytes(&[0u32]))
    } else {
        client.create(u32::as_bytes(words))
    }
}

/// Download a handle as words.
fn read_words(client: &CudaClient, handle: &Handle) -> Vec<u32> {
    let bytes = client.read_one(handle.clone());
    u32::from_bytes(&bytes).to_vec()
}
