//! Word packing for records crossing the host/device boundary.
//!
//! Device buffers store headers and items as flat `u32` word arrays, the
//! same flattening kernels use for multi-component per-entry data. A
//! [`DeviceRecord`] describes how one record maps onto its fixed number of
//! words.

/// A fixed-width record that can be flattened into `u32` words.
pub trait DeviceRecord: Copy {
    /// Number of `u32` words one record occupies.
    const WORDS: usize;

    /// Write this record into `dst`, which has exactly `WORDS` elements.
    fn pack(&self, dst: &mut [u32]);

    /// Read one record from `src`, which has exactly `WORDS` elements.
    fn unpack(src: &[u32]) -> Self;
}

impl DeviceRecord for u32 {
    const WORDS: usize = 1;

    fn pack(&self, dst: &mut [u32]) {
        dst[0] = *self;
    }

    fn unpack(src: &[u32]) -> Self {
        src[0]
    }
}

impl DeviceRecord for f32 {
    const WORDS: usize = 1;

    fn pack(&self, dst: &mut [u32]) {
        dst[0] = self.to_bits();
    }

    fn unpack(src: &[u32]) -> Self {
        f32::from_bits(src[0])
    }
}

/// Pack a slice of records into a contiguous word vector.
pub fn pack_slice<T: DeviceRecord>(records: &[T]) -> Vec<u32> {
    let mut words = vec![0u32; records.len() * T::WORDS];
    for (record, chunk) in records.iter().zip(words.chunks_mut(T::WORDS.max(1))) {
        record.pack(chunk);
    }
    words
}

/// Unpack a contiguous word slice into records.
///
/// # Panics
///
/// Panics if `words.len()` is not a multiple of `T::WORDS`.
pub fn unpack_slice<T: DeviceRecord>(words: &[u32]) -> Vec<T> {
    assert_eq!(
        words.len() % T::WORDS.max(1),
        0,
        "word slice length {} is not a multiple of the record width {}",
        words.len(),
        T::WORDS
    );
    words.chunks(T::WORDS.max(1)).map(T::unpack).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_round_trip() {
        let values = [0u32, 1, 7, u32::MAX];
        let words = pack_slice(&values);
        assert_eq!(words.len(), values.len());
        assert_eq!(unpack_slice::<u32>(&words), values);
    }

    #[test]
    fn test_f32_round_trip_is_bit_exact() {
        let values = [0.0f32, -1.5, f32::MIN_POSITIVE, 1.0e30];
        let words = pack_slice(&values);
        let back = unpack_slice::<f32>(&words);
        for (a, b) in values.iter().zip(&back) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_empty_slice() {
        let words = pack_slice::<u32>(&[]);
        assert!(words.is_empty());
        assert!(unpack_slice::<u32>(&words).is_empty());
    }
}
