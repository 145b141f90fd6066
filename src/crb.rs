// SPDX-FileCopyrightText: 2025 The airrx developers
//
// SPDX-License-Identifier: BSD-2-Clause

//! Lock-free single-producer single-consumer chunked ring buffer.
//!
//! Each slot carries one preallocated chunk of samples plus one metadata
//! record; the metadata is published together with the chunk by the release
//! store on the write cursor. The buffer has two states: state 1 when the
//! write cursor leads the read cursor and state 2 when the read cursor leads
//! the write cursor. Only the writer transitions 1 -> 2 (wrap on commit) and
//! only the reader transitions 2 -> 1 (wrap on commit).
//!
//! `end` marks the high-water slot latched by the writer when it wraps; it is
//! deliberately not atomic. The reader only inspects it in state 2, which it
//! can only observe through an acquire load of the write cursor that
//! synchronizes with the release store publishing `end`.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

struct Chunk<T, M> {
    buf: UnsafeCell<Box<[T]>>,
    meta: UnsafeCell<M>,
}

struct Shared<T, M> {
    chunks: Box<[Chunk<T, M>]>,
    write_ptr: CachePadded<AtomicUsize>,
    read_ptr: CachePadded<AtomicUsize>,
    end_ptr: CachePadded<UnsafeCell<usize>>,
    /// True while the producer is delivering blocks; lets the consumer tell
    /// an expectedly silent stream from starvation.
    streaming: AtomicBool,
    /// Slot count including the sentinel slot.
    capacity: usize,
}

// The acquire/commit discipline hands each chunk to exactly one side at a
// time, and end_ptr is ordered by the write_ptr release store.
unsafe impl<T: Send, M: Send> Send for Shared<T, M> {}
unsafe impl<T: Send, M: Send> Sync for Shared<T, M> {}

/// Create a chunked ring with `num_chunks` usable chunks of `chunk_size`
/// elements each and return the two endpoints. All chunk buffers are
/// allocated here; the hot-path operations never allocate.
pub fn chunked_ring<T, M>(chunk_size: usize, num_chunks: usize) -> (Writer<T, M>, Reader<T, M>)
where
    T: Default + Clone + Send,
    M: Default + Send,
{
    assert!(num_chunks >= 1, "ring needs at least one chunk");

    let chunks: Box<[Chunk<T, M>]> = (0..num_chunks + 1)
        .map(|_| Chunk {
            buf: UnsafeCell::new(vec![T::default(); chunk_size].into_boxed_slice()),
            meta: UnsafeCell::new(M::default()),
        })
        .collect();

    let shared = Arc::new(Shared {
        chunks,
        write_ptr: CachePadded::new(AtomicUsize::new(0)),
        read_ptr: CachePadded::new(AtomicUsize::new(0)),
        end_ptr: CachePadded::new(UnsafeCell::new(num_chunks)),
        streaming: AtomicBool::new(false),
        capacity: num_chunks + 1,
    });

    (
        Writer {
            shared: shared.clone(),
            acquired: None,
        },
        Reader {
            shared,
            acquired: None,
        },
    )
}

struct AcquiredWrite {
    slot: usize,
    /// New end cursor to latch on commit. `None` for state 2 acquisitions:
    /// the reader may be loading `end` concurrently there, and it cannot
    /// have changed since the wrap that entered state 2.
    end: Option<usize>,
}

/// Producer endpoint.
pub struct Writer<T, M> {
    shared: Arc<Shared<T, M>>,
    acquired: Option<AcquiredWrite>,
}

impl<T, M> Writer<T, M> {
    /// Reserve the next chunk for writing. Returns `None` when the ring is
    /// full. The returned buffer and metadata slots are exclusively owned by
    /// the caller until [`Writer::commit_write`].
    pub fn acquire_write(&mut self) -> Option<(&mut [T], &mut M)> {
        let rd_ptr = self.shared.read_ptr.load(Ordering::Acquire);
        let wr_ptr = self.shared.write_ptr.load(Ordering::Relaxed);

        self.acquired = None;

        if wr_ptr >= rd_ptr {
            // State 1: write may go up to, but not including, capacity.
            if wr_ptr + 1 < self.shared.capacity {
                self.acquired = Some(AcquiredWrite {
                    slot: wr_ptr,
                    end: Some(self.shared.capacity - 1),
                });
            } else if 1 < rd_ptr {
                // Wrap around: latch the high-water mark so the reader knows
                // where the valid region ends.
                self.acquired = Some(AcquiredWrite {
                    slot: 0,
                    end: Some(wr_ptr),
                });
            }
        } else {
            // State 2: write may go up to, but not including, the read cursor.
            if wr_ptr + 1 < rd_ptr {
                self.acquired = Some(AcquiredWrite {
                    slot: wr_ptr,
                    end: None,
                });
            }
        }

        let slot = self.acquired.as_ref()?.slot;
        let chunk = &self.shared.chunks[slot];
        // Safety: the slot is outside the readable region until commit_write
        // publishes it, so the writer holds the only reference.
        unsafe { Some((&mut *chunk.buf.get(), &mut *chunk.meta.get())) }
    }

    /// Publish the chunk reserved by the last [`Writer::acquire_write`].
    /// Returns false if no chunk is currently acquired.
    pub fn commit_write(&mut self) -> bool {
        let Some(acquired) = self.acquired.take() else {
            return false;
        };

        // Ordered by the release store below.
        if let Some(end) = acquired.end {
            unsafe { *self.shared.end_ptr.get() = end };
        }

        // A slot of 0 here is the state 1 -> 2 transition.
        self.shared
            .write_ptr
            .store(acquired.slot + 1, Ordering::Release);

        true
    }

    pub fn set_streaming(&self, streaming: bool) {
        self.shared.streaming.store(streaming, Ordering::Release);
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.streaming.load(Ordering::Acquire)
    }
}

/// Consumer endpoint.
pub struct Reader<T, M> {
    shared: Arc<Shared<T, M>>,
    acquired: Option<usize>,
}

impl<T, M> Reader<T, M> {
    /// Fetch the oldest committed chunk. Returns `None` when the ring is
    /// empty. The chunk stays owned by the reader until
    /// [`Reader::commit_read`].
    pub fn acquire_read(&mut self) -> Option<(&[T], &M)> {
        let wr_ptr = self.shared.write_ptr.load(Ordering::Acquire);
        let rd_ptr = self.shared.read_ptr.load(Ordering::Relaxed);

        self.acquired = None;

        if wr_ptr >= rd_ptr {
            // State 1: read up to, but not including, the write cursor.
            // wr_ptr == rd_ptr is the empty buffer.
            if wr_ptr - rd_ptr > 0 {
                self.acquired = Some(rd_ptr);
            }
        } else {
            // State 2: read up to end, then wrap to slot 0.
            let end = unsafe { *self.shared.end_ptr.get() };
            if rd_ptr < end {
                self.acquired = Some(rd_ptr);
            } else if wr_ptr > 0 {
                self.acquired = Some(0);
            }
        }

        let slot = self.acquired?;
        let chunk = &self.shared.chunks[slot];
        // Safety: the slot was published by a write_ptr release store that
        // our acquire load above synchronized with; the writer will not touch
        // it again until we advance read_ptr past it.
        unsafe { Some((&*chunk.buf.get(), &*chunk.meta.get())) }
    }

    /// Release the chunk fetched by the last [`Reader::acquire_read`].
    /// Returns false if no chunk is currently acquired.
    pub fn commit_read(&mut self) -> bool {
        let Some(slot) = self.acquired.take() else {
            return false;
        };

        // A slot of 0 here is the state 2 -> 1 transition.
        self.shared.read_ptr.store(slot + 1, Ordering::Release);

        true
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.streaming.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_has_nothing_to_read() {
        let (_w, mut r) = chunked_ring::<f32, u32>(4, 3);
        assert!(r.acquire_read().is_none());
        assert!(!r.commit_read());
    }

    #[test]
    fn commit_without_acquire_fails() {
        let (mut w, mut r) = chunked_ring::<f32, u32>(4, 3);
        assert!(!w.commit_write());
        assert!(!r.commit_read());
    }

    #[test]
    fn full_ring_rejects_writes_until_read() {
        // Matches the sizing used by the IQ path: the writer may fill
        // exactly num_chunks chunks back to back.
        let (mut w, mut r) = chunked_ring::<f32, u32>(512, 3);

        for n in 0..3 {
            let (buf, meta) = w.acquire_write().expect("chunk should be free");
            buf[0] = n as f32;
            *meta = n;
            assert!(w.commit_write());
        }
        assert!(w.acquire_write().is_none(), "4th chunk must be refused");

        let (buf, meta) = r.acquire_read().expect("chunk committed");
        assert_eq!(buf[0], 0.0);
        assert_eq!(*meta, 0);
        assert!(r.commit_read());

        // Wrapping to slot 0 needs the read cursor clear of it; one read is
        // not enough yet.
        assert!(w.acquire_write().is_none());

        assert!(r.acquire_read().is_some());
        assert!(r.commit_read());
        assert!(w.acquire_write().is_some(), "space freed by the reads");
    }

    #[test]
    fn fifo_order_is_kept_across_wraps() {
        let (mut w, mut r) = chunked_ring::<u32, u32>(1, 4);
        let mut next_write = 0u32;
        let mut next_read = 0u32;

        // Exercise every wrap position of the cycle a few times over with a
        // mixed fill level.
        for step in 0..1000 {
            let writes = step % 4 + 1;
            for _ in 0..writes {
                if let Some((buf, meta)) = w.acquire_write() {
                    buf[0] = next_write;
                    *meta = next_write;
                    assert!(w.commit_write());
                    next_write += 1;
                }
            }
            let reads = step % 3 + 1;
            for _ in 0..reads {
                if let Some((buf, meta)) = r.acquire_read() {
                    assert_eq!(buf[0], next_read);
                    assert_eq!(*meta, next_read);
                    assert!(r.commit_read());
                    next_read += 1;
                }
            }
        }
        assert!(next_read > 500, "test should have moved data");
    }

    #[test]
    fn streaming_flag_crosses_endpoints() {
        let (w, r) = chunked_ring::<f32, u32>(4, 3);
        assert!(!r.is_streaming());
        w.set_streaming(true);
        assert!(r.is_streaming());
        w.set_streaming(false);
        assert!(!r.is_streaming());
    }

    #[test]
    fn two_thread_fifo() {
        const COUNT: u32 = 200_000;
        let (mut w, mut r) = chunked_ring::<u32, u32>(8, 4);

        let producer = std::thread::spawn(move || {
            let mut n = 0;
            while n < COUNT {
                if let Some((buf, meta)) = w.acquire_write() {
                    buf.fill(n);
                    *meta = n;
                    assert!(w.commit_write());
                    n += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        });

        let mut expected = 0;
        while expected < COUNT {
            if let Some((buf, meta)) = r.acquire_read() {
                assert_eq!(*meta, expected, "chunks must arrive in order");
                assert!(buf.iter().all(|&v| v == expected), "no torn chunks");
                assert!(r.commit_read());
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }

        producer.join().unwrap();
    }
}
