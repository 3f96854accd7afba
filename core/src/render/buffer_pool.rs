use crate::prelude::{RenderError, RenderResult};

/// Scoped pool of channel buffers that bounds the number of live allocations.
pub struct BufferPool {
    buffers: Vec<Vec<f32>>,
    max_capacity: usize,
    outstanding: usize,
}

impl BufferPool {
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            buffers: Vec::with_capacity(max_capacity),
            max_capacity,
            outstanding: 0,
        }
    }

    /// Hands out a zeroed buffer of `length` samples, reusing a released one when possible.
    pub fn checkout(&mut self, length: usize) -> RenderResult<Vec<f32>> {
        if self.outstanding >= self.max_capacity {
            return Err(RenderError::Internal("buffer pool depleted".to_string()));
        }
        self.outstanding += 1;
        if let Some(mut buffer) = self.buffers.pop() {
            buffer.clear();
            buffer.resize(length, 0.0);
            Ok(buffer)
        } else {
            Ok(vec![0.0; length])
        }
    }

    /// Returns a buffer back to the pool for reuse.
    pub fn release(&mut self, mut buffer: Vec<f32>) {
        self.outstanding = self.outstanding.saturating_sub(1);
        buffer.clear();
        if self.buffers.len() < self.max_capacity {
            self.buffers.push(buffer);
        }
    }

    /// Grows the pool so that `capacity` buffers may be checked out at once.
    pub fn reserve(&mut self, capacity: usize) {
        self.max_capacity = self.max_capacity.max(capacity);
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_enforces_capacity_and_reuses_buffers() {
        let mut pool = BufferPool::with_capacity(2);
        let a = pool.checkout(4).unwrap();
        let b = pool.checkout(8).unwrap();
        assert!(pool.checkout(1).is_err());

        pool.release(a);
        let c = pool.checkout(3).unwrap();
        assert_eq!(c, vec![0.0; 3]);
        pool.release(b);
        pool.release(c);
        assert_eq!(pool.outstanding(), 0);
    }
}
