//! Reusable encode buffers.
//!
//! [BufferPool] is `Send + Sync` and can be shared by every encoder in a process. A buffer checked
//! out with [BufferPool::acquire] is owned exclusively by the caller and goes back to the pool
//! (cleared) when its [PooledBuffer] guard drops, whether the encode succeeded or not.
//!
//! Checkout and return are lock-free ([crossbeam_queue::ArrayQueue]). Buffers that grew past
//! [OVERSIZED_FACTOR] times the pool's buffer capacity are freed instead of retained.

use bytes::BytesMut;
use crossbeam_queue::ArrayQueue;
use std::{
    fmt, mem,
    ops::{Deref, DerefMut},
};

/// Capacity of buffers allocated by [BufferPool::default].
pub const DEFAULT_BUFFER_CAPACITY: usize = 512;

/// Idle buffers retained by [BufferPool::default].
pub const DEFAULT_MAX_IDLE: usize = 64;

/// A returned buffer whose capacity exceeds this multiple of the pool's buffer capacity is
/// dropped.
pub const OVERSIZED_FACTOR: usize = 4;

/// A pool of byte buffers.
pub struct BufferPool {
    capacity: usize,
    max_idle: usize,
    // `None` when `max_idle` is zero (an `ArrayQueue` cannot be empty-sized).
    idle: Option<ArrayQueue<BytesMut>>,
}

impl BufferPool {
    /// Creates a pool that allocates buffers of `capacity` bytes and keeps at most `max_idle`
    /// of them between uses.
    pub fn new(capacity: usize, max_idle: usize) -> Self {
        Self {
            capacity,
            max_idle,
            idle: (max_idle > 0).then(|| ArrayQueue::new(max_idle)),
        }
    }

    /// Checks out a cleared buffer, allocating one if none are idle.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self
            .idle
            .as_ref()
            .and_then(ArrayQueue::pop)
            .unwrap_or_else(|| BytesMut::with_capacity(self.capacity));
        PooledBuffer { pool: self, buf }
    }

    /// The number of buffers waiting to be reused.
    pub fn idle(&self) -> usize {
        self.idle.as_ref().map_or(0, ArrayQueue::len)
    }

    fn release(&self, mut buf: BytesMut) {
        let Some(idle) = &self.idle else {
            return;
        };
        if buf.capacity() > self.capacity.saturating_mul(OVERSIZED_FACTOR) {
            return;
        }
        buf.clear();
        // Freelist full, buffer is dropped.
        let _ = idle.push(buf);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_IDLE)
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.capacity)
            .field("max_idle", &self.max_idle)
            .field("idle", &self.idle())
            .finish()
    }
}

/// A buffer checked out of a [BufferPool], returned on drop.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: BytesMut,
}

impl Deref for PooledBuffer<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn test_reuse() {
        let pool = BufferPool::new(16, 2);
        assert_eq!(pool.idle(), 0);
        {
            let mut buf = pool.acquire();
            assert!(buf.capacity() >= 16);
            buf.put_slice(b"hello");
        }
        assert_eq!(pool.idle(), 1);

        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_max_idle() {
        let pool = BufferPool::new(8, 2);
        let buffers: Vec<_> = (0..4).map(|_| pool.acquire()).collect();
        drop(buffers);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_no_idle() {
        let pool = BufferPool::new(8, 0);
        drop(pool.acquire());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_oversized_dropped() {
        let pool = BufferPool::new(8, 2);
        {
            let mut buf = pool.acquire();
            buf.put_slice(&[0; 8 * OVERSIZED_FACTOR + 1]);
        }
        assert_eq!(pool.idle(), 0);

        // Growth within the limit is kept.
        {
            let mut buf = pool.acquire();
            buf.put_slice(&[0; 16]);
        }
        assert_eq!(pool.idle(), 1);
        assert!(pool.acquire().capacity() >= 16);
    }

    #[test]
    fn test_release_on_early_return() {
        fn fails(pool: &BufferPool) -> Result<(), &'static str> {
            let mut buf = pool.acquire();
            buf.put_u8(1);
            let parsed: Result<u8, &'static str> = Err("failed");
            parsed?;
            Ok(())
        }

        let pool = BufferPool::default();
        assert!(fails(&pool).is_err());
        assert_eq!(pool.idle(), 1);
        assert!(pool.acquire().is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let pool = BufferPool::default();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let mut buf = pool.acquire();
                    buf.put_u32_le(7);
                    assert_eq!(buf.len(), 4);
                });
            }
        });
        assert!(pool.idle() >= 1);
    }
}
