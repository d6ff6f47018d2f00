/// Single-writer / multi-reader sequenced publication (seqlock)
///
/// The writer bumps the counter to odd, stores the payload, then bumps it to
/// even. A reader copies the payload between two counter loads and retries if
/// the counter was odd or moved. Neither side blocks; the payload must be
/// plain `Copy` data.
///
/// Write access is only reachable through the unique, non-cloneable
/// [`Publisher`], so the single-writer rule is enforced by ownership.

use std::cell::UnsafeCell;
use std::hint;
use std::ptr;
use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::sync::Arc;

#[repr(C, align(64))]
pub struct SequencedValue<T: Copy> {
    seq: AtomicU64,
    value: UnsafeCell<T>,
}

// SAFETY: readers only ever copy `value` out and discard copies taken while the
// counter moved; mutation is confined to the single `Publisher`.
unsafe impl<T: Copy + Send> Sync for SequencedValue<T> {}
unsafe impl<T: Copy + Send> Send for SequencedValue<T> {}

impl<T: Copy> SequencedValue<T> {
    pub fn new(initial: T) -> Self {
        SequencedValue {
            seq: AtomicU64::new(0),
            value: UnsafeCell::new(initial),
        }
    }

    /// Latest fully published value. Spins only while a write overlaps the copy.
    #[inline]
    pub fn read(&self) -> T {
        loop {
            let s1 = self.seq.load(Ordering::Acquire);
            if s1 & 1 == 1 {
                hint::spin_loop();
                continue;
            }

            // SAFETY: a copy racing with the writer is detected below and dropped
            let value = unsafe { ptr::read_volatile(self.value.get()) };

            fence(Ordering::Acquire);
            let s2 = self.seq.load(Ordering::Relaxed);
            if s1 == s2 {
                return value;
            }
            hint::spin_loop();
        }
    }

    /// Number of completed publications
    pub fn version(&self) -> u64 {
        self.seq.load(Ordering::Acquire) / 2
    }

    /// SAFETY: caller must be the only writer for the lifetime of this call.
    #[inline]
    unsafe fn write(&self, value: T) {
        let s = self.seq.load(Ordering::Relaxed);
        self.seq.store(s.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        ptr::write_volatile(self.value.get(), value);

        self.seq.store(s.wrapping_add(2), Ordering::Release);
    }
}

/// The single write handle. Not `Clone`.
pub struct Publisher<T: Copy> {
    inner: Arc<SequencedValue<T>>,
}

impl<T: Copy + Send> Publisher<T> {
    /// Publish a new value; never blocks, never allocates.
    #[inline]
    pub fn write(&mut self, value: T) {
        // SAFETY: `Publisher` is unique per value and `write` takes `&mut self`
        unsafe { self.inner.write(value) }
    }

    pub fn read(&self) -> T {
        self.inner.read()
    }

    pub fn subscribe(&self) -> Subscriber<T> {
        Subscriber {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Cloneable read handle, safe to share across threads
pub struct Subscriber<T: Copy> {
    inner: Arc<SequencedValue<T>>,
}

impl<T: Copy> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Subscriber {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Copy + Send> Subscriber<T> {
    #[inline]
    pub fn read(&self) -> T {
        self.inner.read()
    }

    pub fn version(&self) -> u64 {
        self.inner.version()
    }
}

/// Create a publication slot holding `initial`
pub fn sequenced<T: Copy + Send>(initial: T) -> (Publisher<T>, Subscriber<T>) {
    let inner = Arc::new(SequencedValue::new(initial));
    let reader = Subscriber {
        inner: Arc::clone(&inner),
    };
    (Publisher { inner }, reader)
}
