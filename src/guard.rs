use core::{
    fmt,
    future::Future,
    mem,
    pin::Pin,
    task::{Context, Poll},
};
use futures::task::AtomicWaker;
use parking_lot::Mutex;

/// Value protected by its own lock, with atomic-style operations.
///
/// Every operation holds the lock for its whole duration, so concurrent operations on one guard
/// behave as if executed in some total order. Unlike hardware atomics this works for any `T`.
///
/// Each mutation also wakes the future returned by [`wait`](Self::wait) or
/// [`wait_and_update`](Self::wait_and_update), if any.
///
/// # Deadlocks
///
/// The lock is not re-entrant. Calling any method of a guard from inside a closure passed to
/// [`update`](Self::update) or [`fetch_update`](Self::fetch_update) of the same guard blocks forever.
/// This is a contract violation of the caller, not an error.
pub struct AtomicGuard<T> {
    value: Mutex<T>,
    waker: AtomicWaker,
}

impl<T> AtomicGuard<T> {
    /// Create guard holding `value`.
    pub const fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            waker: AtomicWaker::new(),
        }
    }

    /// Consume the guard and return the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
    /// Exclusive access needs no locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    pub fn load(&self) -> T
    where
        T: Clone,
    {
        self.value.lock().clone()
    }
    pub fn store(&self, val: T) {
        self.modify(|value| *value = val);
    }
    /// Store `val` and return the value it replaced.
    pub fn exchange(&self, val: T) -> T {
        self.modify(|value| mem::replace(value, val))
    }
    /// Set value to `T::default()`.
    pub fn reset(&self)
    where
        T: Default,
    {
        self.store(T::default());
    }

    /// Run `f` on the value while holding the lock.
    ///
    /// `f` must not touch this guard.
    pub fn update<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        self.modify(f)
    }

    /// Replace value with `f(current)` if it returns `Some`.
    ///
    /// Returns `Ok(previous)` if the value was replaced, `Err(current)` otherwise.
    pub fn fetch_update<F: FnOnce(&T) -> Option<T>>(&self, f: F) -> Result<T, T>
    where
        T: Clone,
    {
        let mut value = self.value.lock();
        match f(&*value) {
            Some(new) => {
                let old = mem::replace(&mut *value, new);
                drop(value);
                self.waker.wake();
                Ok(old)
            }
            None => Err(value.clone()),
        }
    }

    /// Asynchronously wait for predicate to be `true`.
    ///
    /// *If there are multiple waiting futures for a single guard then only the last polled one is notified.*
    pub fn wait<F: FnMut(&T) -> bool>(&self, pred: F) -> Wait<'_, T, F> {
        Wait { owner: self, pred }
    }

    /// Asynchronously wait until `map` returned `Some(x)` and then store `x`.
    ///
    /// This is an asynchronous version of [`fetch_update`](Self::fetch_update).
    pub fn wait_and_update<F: FnMut(&T) -> Option<T>>(&self, map: F) -> WaitAndUpdate<'_, T, F> {
        WaitAndUpdate { owner: self, map }
    }

    fn modify<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        let ret = f(&mut *self.value.lock());
        self.waker.wake();
        ret
    }
    fn fetch_map<F: FnOnce(T) -> T>(&self, f: F) -> T
    where
        T: Copy,
    {
        self.modify(|value| {
            let old = *value;
            *value = f(old);
            old
        })
    }
}

macro_rules! impl_guard_bitwise {
    ($T:ty) => {
        impl AtomicGuard<$T> {
            /// Returns the previous value.
            pub fn bitwise_and(&self, mask: $T) -> $T {
                self.fetch_map(|value| value & mask)
            }
            /// Returns the previous value.
            pub fn bitwise_or(&self, mask: $T) -> $T {
                self.fetch_map(|value| value | mask)
            }
            /// Returns the previous value.
            pub fn bitwise_xor(&self, mask: $T) -> $T {
                self.fetch_map(|value| value ^ mask)
            }
        }
    };
}

macro_rules! impl_guard_int {
    ($T:ty) => {
        impl_guard_bitwise!($T);

        impl AtomicGuard<$T> {
            /// Add `delta` wrapping around on overflow. Returns the previous value.
            pub fn increment(&self, delta: $T) -> $T {
                self.fetch_map(|value| value.wrapping_add(delta))
            }
            /// Subtract `delta` wrapping around on overflow. Returns the previous value.
            pub fn decrement(&self, delta: $T) -> $T {
                self.fetch_map(|value| value.wrapping_sub(delta))
            }
        }
    };
}

macro_rules! impl_guard_float {
    ($T:ty) => {
        impl AtomicGuard<$T> {
            pub fn increment(&self, delta: $T) -> $T {
                self.fetch_map(|value| value + delta)
            }
            pub fn decrement(&self, delta: $T) -> $T {
                self.fetch_map(|value| value - delta)
            }
        }
    };
}

impl_guard_bitwise!(bool);

impl_guard_int!(u8);
impl_guard_int!(u16);
impl_guard_int!(u32);
impl_guard_int!(u64);
impl_guard_int!(u128);
impl_guard_int!(usize);

impl_guard_int!(i8);
impl_guard_int!(i16);
impl_guard_int!(i32);
impl_guard_int!(i64);
impl_guard_int!(i128);
impl_guard_int!(isize);

impl_guard_float!(f32);
impl_guard_float!(f64);

impl<T: Default> Default for AtomicGuard<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for AtomicGuard<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for AtomicGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("AtomicGuard");
        match self.value.try_lock() {
            Some(value) => d.field("value", &&*value),
            None => d.field("value", &Locked),
        };
        d.finish_non_exhaustive()
    }
}

struct Locked;

impl fmt::Debug for Locked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<locked>")
    }
}

/// Future to wait for specific value.
pub struct Wait<'a, T, F: FnMut(&T) -> bool> {
    owner: &'a AtomicGuard<T>,
    pred: F,
}
impl<'a, T, F: FnMut(&T) -> bool> Unpin for Wait<'a, T, F> {}
impl<'a, T: Clone, F: FnMut(&T) -> bool> Future for Wait<'a, T, F> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.owner.waker.register(cx.waker());
        let value = this.owner.value.lock();
        if (this.pred)(&*value) {
            Poll::Ready(value.clone())
        } else {
            Poll::Pending
        }
    }
}

/// Future to wait and update a guarded value.
///
/// Resolves to the value that was replaced.
pub struct WaitAndUpdate<'a, T, F: FnMut(&T) -> Option<T>> {
    owner: &'a AtomicGuard<T>,
    map: F,
}
impl<'a, T, F: FnMut(&T) -> Option<T>> Unpin for WaitAndUpdate<'a, T, F> {}
impl<'a, T, F: FnMut(&T) -> Option<T>> Future for WaitAndUpdate<'a, T, F> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.owner.waker.register(cx.waker());
        let mut value = this.owner.value.lock();
        match (this.map)(&*value) {
            Some(new) => Poll::Ready(mem::replace(&mut *value, new)),
            None => Poll::Pending,
        }
    }
}
