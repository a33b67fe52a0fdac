//! Jagged container primitive.
//!
//! A container pairs a fixed-length header sequence with one variable-length
//! item row per header. It exists in three faces:
//!
//! - [`Container`]: the host-resident form, owning its rows
//! - [`ContainerBuffer`]: device-owning storage, allocated either exactly
//!   (one capacity per row) or elastically (reserved capacity filled through
//!   an atomic append protocol)
//! - [`ContainerView`]: a borrowed, launch-ready handle set, the only face
//!   kernels consume
//!
//! The invariant `headers.len() == rows.len()` holds after every
//! construction path; constructors that could violate it fail instead.

pub mod buffer;
pub mod kernels;
pub mod record;
pub mod view;

pub use buffer::ContainerBuffer;
pub use record::DeviceRecord;
pub use view::ContainerView;

use thiserror::Error;

/// Errors raised by container construction and transfer.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Header and row counts disagree. This is a caller bug.
    #[error("header count {headers} does not match row count {rows}")]
    RowCountMismatch {
        /// Number of headers supplied.
        headers: usize,
        /// Number of rows supplied.
        rows: usize,
    },
    /// The requested allocation does not fit 32-bit device addressing.
    #[error("container capacity of {words} words overflows device addressing")]
    CapacityOverflow {
        /// Total words requested.
        words: u64,
    },
}

/// Host-resident jagged container.
#[derive(Debug, Clone, Default)]
pub struct Container<H, I> {
    headers: Vec<H>,
    rows: Vec<Vec<I>>,
}

impl<H, I> Container<H, I> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Create an empty container with pre-reserved space for `n` rows.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            headers: Vec::with_capacity(n),
            rows: Vec::with_capacity(n),
        }
    }

    /// Build a container from matching header and row sequences.
    pub fn from_parts(headers: Vec<H>, rows: Vec<Vec<I>>) -> Result<Self, ContainerError> {
        if headers.len() != rows.len() {
            return Err(ContainerError::RowCountMismatch {
                headers: headers.len(),
                rows: rows.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Append one header together with its item row.
    pub fn push_row(&mut self, header: H, row: Vec<I>) {
        self.headers.push(header);
        self.rows.push(row);
    }

    /// Number of rows (equal to the number of headers).
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether the container has no rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Total number of items across all rows.
    pub fn total_items(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// The header sequence.
    pub fn headers(&self) -> &[H] {
        &self.headers
    }

    /// All item rows.
    pub fn rows(&self) -> &[Vec<I>] {
        &self.rows
    }

    /// One item row.
    pub fn row(&self, i: usize) -> &[I] {
        &self.rows[i]
    }

    /// One header.
    pub fn header(&self, i: usize) -> &H {
        &self.headers[i]
    }

    /// Borrowed description of this container, used to prepare a transfer.
    pub fn data(&self) -> ContainerData<'_, H, I> {
        ContainerData {
            headers: &self.headers,
            rows: self.rows.iter().map(Vec::as_slice).collect(),
        }
    }
}

/// Borrowed description of a host container.
///
/// Holds no storage of its own; must not outlive the container it was taken
/// from, which the borrow checker enforces.
#[derive(Debug, Clone)]
pub struct ContainerData<'a, H, I> {
    /// View of the header sequence.
    pub headers: &'a [H],
    /// View of each item row.
    pub rows: Vec<&'a [I]>,
}

impl<H, I> ContainerData<'_, H, I> {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether the described container has no rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Per-row item counts.
    pub fn row_capacities(&self) -> Vec<u32> {
        self.rows.iter().map(|r| r.len() as u32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_keeps_invariant() {
        let mut c: Container<u32, u32> = Container::new();
        c.push_row(0, vec![1, 2, 3]);
        c.push_row(1, Vec::new());
        c.push_row(2, vec![9]);
        assert_eq!(c.headers().len(), c.rows().len());
        assert_eq!(c.len(), 3);
        assert_eq!(c.total_items(), 4);
        assert!(c.row(1).is_empty());
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        let result: Result<Container<u32, u32>, _> =
            Container::from_parts(vec![0, 1], vec![vec![1]]);
        assert!(matches!(
            result,
            Err(ContainerError::RowCountMismatch { headers: 2, rows: 1 })
        ));
    }

    #[test]
    fn test_from_parts_accepts_empty() {
        let c: Container<u32, u32> = Container::from_parts(Vec::new(), Vec::new()).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.total_items(), 0);
    }

    #[test]
    fn test_data_mirrors_rows() {
        let c: Container<u32, u32> =
            Container::from_parts(vec![5, 6], vec![vec![1, 2], vec![]]).unwrap();
        let data = c.data();
        assert_eq!(data.len(), 2);
        assert_eq!(data.headers, &[5, 6]);
        assert_eq!(data.rows[0], &[1, 2]);
        assert!(data.rows[1].is_empty());
        assert_eq!(data.row_capacities(), vec![2, 0]);
    }
}
