//! General utility functions and types.
use std::collections::vec_deque::Iter;
use std::collections::VecDeque;

/// Fixed capacity FIFO. Pushing into a full buffer drops the oldest entry.
#[derive(Clone)]
pub struct RingBuffer<T, const N: usize> {
    pub stack: VecDeque<T>,
}

impl<T, const N: usize> RingBuffer<T, N> {
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn pop(&mut self) -> Option<T> {
        self.stack.pop_front()
    }

    pub fn push(&mut self, data: T) {
        if self.stack.len() == N {
            self.stack.pop_front();
        }
        self.stack.push_back(data);
    }

    /// Removes up to `max` of the oldest entries.
    pub fn drain(&mut self, max: usize) -> impl Iterator<Item = T> + '_ {
        let count = max.min(self.stack.len());
        self.stack.drain(0..count)
    }

    pub fn back(&self) -> Option<&T> {
        self.stack.back()
    }

    pub fn clear(&mut self) {
        self.stack.clear()
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> Iter<'_, T> {
        self.stack.iter()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self {
            stack: VecDeque::with_capacity(N),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut ring: RingBuffer<u32, 3> = RingBuffer::default();
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(ring.drain(2).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.back(), Some(&4));
        assert_eq!(ring.drain(10).collect::<Vec<_>>(), vec![4]);
        assert!(ring.is_empty());
        assert_eq!(ring.pop(), None);
    }
}
