//! Reusable copy buffers for tunnelled connections.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

/// Size of every pooled buffer.
pub const BUFFER_SIZE: usize = 32 * 1024;

/// Buffers kept around when idle; extra buffers are dropped on return.
const MAX_IDLE: usize = 256;

/// A pool of fixed-size byte buffers.
#[derive(Debug, Clone, Default)]
pub struct BufferPool {
    idle: Arc<Mutex<Vec<Box<[u8]>>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a buffer; it returns to the pool when the guard drops.
    pub fn get(&self) -> PooledBuffer {
        let buf = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| vec![0u8; BUFFER_SIZE].into_boxed_slice());

        PooledBuffer {
            buf: Some(buf),
            pool: self.clone(),
        }
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn put(&self, buf: Box<[u8]>) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE {
            idle.push(buf);
        }
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// The buffer is owned exclusively by the guard, so it can never be handed
/// out twice.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<Box<[u8]>>,
    pool: BufferPool,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_reused() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.get();
            assert_eq!(buf.len(), BUFFER_SIZE);
            buf[0] = 7;
        }
        assert_eq!(pool.idle(), 1);

        let _buf = pool.get();
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn concurrent_loans_are_distinct() {
        let pool = BufferPool::new();
        let mut a = pool.get();
        let mut b = pool.get();
        a[0] = 1;
        b[0] = 2;
        assert_eq!(a[0], 1);
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 2);
    }
}
