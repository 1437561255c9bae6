use std::sync::Arc;

use log::debug;

use crate::batch::NullBitmap;

/// A buffer that can be grown in place to hold a number of slots.
pub trait Reusable: Clone + Default {
    fn slots(&self) -> usize;

    /// Grow to at least `size` slots. Never shrinks.
    fn grow_to(&mut self, size: usize);
}

impl<T: Clone + Default> Reusable for Vec<T> {
    fn slots(&self) -> usize {
        self.len()
    }

    fn grow_to(&mut self, size: usize) {
        if self.len() < size {
            self.resize(size, T::default());
        }
    }
}

impl Reusable for NullBitmap {
    fn slots(&self) -> usize {
        self.len()
    }

    fn grow_to(&mut self, size: usize) {
        self.ensure_len(size);
    }
}

/// Get exclusive access to `buffer` with room for at least `size` slots.
///
/// The allocation is reused while this owner holds the only reference to it.
/// If a batch handed out earlier still shares it, a fresh buffer replaces it
/// and the old one stays alive for that batch.
pub fn allocate_to_size<B: Reusable>(buffer: &mut Arc<B>, size: usize) -> &mut B {
    if Arc::strong_count(buffer) != 1 || Arc::weak_count(buffer) != 0 {
        debug!("buffer still shared by an earlier batch, allocating {size} slots");
        *buffer = Arc::new(B::default());
    }
    let owned = Arc::make_mut(buffer);
    if owned.slots() < size {
        owned.grow_to(size);
    }
    owned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_but_never_shrinks() {
        let mut buffer: Arc<Vec<i32>> = Arc::default();
        allocate_to_size(&mut buffer, 8)[7] = 1;
        assert_eq!(buffer.len(), 8);
        allocate_to_size(&mut buffer, 3);
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer[7], 1);
    }

    #[test]
    fn test_reuses_unshared_allocation() {
        let mut buffer: Arc<Vec<u64>> = Arc::new(vec![0; 16]);
        let before = buffer.as_ptr();
        allocate_to_size(&mut buffer, 16);
        assert_eq!(buffer.as_ptr(), before);
    }

    #[test]
    fn test_shared_buffer_is_left_untouched() {
        let mut buffer: Arc<Vec<i32>> = Arc::new(vec![5, 6]);
        let held = Arc::clone(&buffer);
        allocate_to_size(&mut buffer, 2)[0] = 9;
        assert_eq!(*held, vec![5, 6]);
        assert_eq!(*buffer, vec![9, 0]);
    }

    #[test]
    fn test_bitmap_buffer() {
        let mut nulls: Arc<NullBitmap> = Arc::default();
        allocate_to_size(&mut nulls, 33).set_null(32, true);
        assert_eq!(nulls.len(), 33);
        assert!(nulls.is_null(32));
    }
}
