/// Validity bitmap over buffer offsets: one bit per slot, bit set = valid (not null).
///
/// Bits are packed into `u32` words, least significant bit first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NullBitmap {
    words: Vec<u32>,
    len: usize,
}

impl NullBitmap {
    /// `len` slots, all valid.
    pub fn new_valid(len: usize) -> Self {
        let mut bitmap = Self::default();
        bitmap.ensure_len(len);
        bitmap
    }

    /// Build a bitmap from a null predicate.
    /// Returns `None` if no slot is null (defers allocation until the first null).
    pub fn from_fn(len: usize, is_null: impl Fn(usize) -> bool) -> Option<Self> {
        let mut words: Option<Vec<u32>> = None;
        for i in 0..len {
            if is_null(i) {
                words.get_or_insert_with(|| {
                    // First null: allocate and backfill all prior slots as valid.
                    let mut v = vec![0u32; len.div_ceil(32)];
                    for j in 0..i {
                        v[j / 32] |= 1 << (j % 32);
                    }
                    v
                });
            } else if let Some(ref mut w) = words {
                w[i / 32] |= 1 << (i % 32);
            }
        }
        words.map(|words| Self { words, len })
    }

    /// One flag per slot, `true` = null.
    pub fn from_nulls(nulls: &[bool]) -> Option<Self> {
        Self::from_fn(nulls.len(), |i| nulls[i])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "slot {idx} out of {} slots", self.len);
        (self.words[idx / 32] >> (idx % 32)) & 1 == 1
    }

    #[inline]
    pub fn is_null(&self, idx: usize) -> bool {
        !self.is_valid(idx)
    }

    #[inline]
    pub fn set_null(&mut self, idx: usize, null: bool) {
        debug_assert!(idx < self.len, "slot {idx} out of {} slots", self.len);
        let mask = 1u32 << (idx % 32);
        if null {
            self.words[idx / 32] &= !mask;
        } else {
            self.words[idx / 32] |= mask;
        }
    }

    /// Grow to at least `len` slots; new slots are valid. Never shrinks.
    pub fn ensure_len(&mut self, len: usize) {
        if len <= self.len {
            return;
        }
        for i in self.len..len.min(self.words.len() * 32) {
            self.words[i / 32] |= 1 << (i % 32);
        }
        self.words.resize(len.div_ceil(32), u32::MAX);
        self.len = len;
    }

    pub fn null_count(&self) -> usize {
        (0..self.len).filter(|&i| self.is_null(i)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_without_nulls_allocates_nothing() {
        assert_eq!(NullBitmap::from_fn(100, |_| false), None);
    }

    #[test]
    fn test_from_fn_backfills_valid_prefix() {
        let bitmap = NullBitmap::from_fn(40, |i| i == 35).unwrap();
        assert_eq!(bitmap.len(), 40);
        assert!((0..35).all(|i| bitmap.is_valid(i)));
        assert!(bitmap.is_null(35));
        assert!((36..40).all(|i| bitmap.is_valid(i)));
        assert_eq!(bitmap.null_count(), 1);
    }

    #[test]
    fn test_spans_multiple_words() {
        let bitmap = NullBitmap::from_fn(64, |i| i % 3 == 0).unwrap();
        for i in 0..64 {
            assert_eq!(bitmap.is_null(i), i % 3 == 0, "slot {i}");
        }
    }

    #[test]
    fn test_set_null_and_grow() {
        let mut bitmap = NullBitmap::new_valid(3);
        bitmap.set_null(1, true);
        bitmap.ensure_len(70);
        assert_eq!(bitmap.len(), 70);
        assert!(bitmap.is_null(1));
        assert!(bitmap.is_valid(2));
        assert!(bitmap.is_valid(69));
        bitmap.set_null(1, false);
        assert_eq!(bitmap.null_count(), 0);
        bitmap.ensure_len(10);
        assert_eq!(bitmap.len(), 70);
    }
}
