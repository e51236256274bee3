//! Asynchronous mutual exclusion that owns the value it protects.
//!
//! [`Mutex<V>`] wraps a value and grants exclusive access through a scoped
//! [`MutexGuard`]. Contending tasks queue up in FIFO order, and on release
//! ownership is handed directly to the next queued task: the lock flag never
//! clears while waiters exist, so a concurrent [`try_lock`](Mutex::try_lock)
//! cannot steal the lock between a release and the queued task's resumption.
//! Acquisition order therefore equals request order.
//!
//! 拥有所保护值的异步互斥锁。
//!
//! [`Mutex<V>`] 包装一个值，并通过作用域化的 [`MutexGuard`] 授予独占访问。
//! 竞争的任务按 FIFO 顺序排队；释放时所有权直接移交给队列中的下一个任务：
//! 只要还有等待者，锁标志就不会清除，因此并发的 [`try_lock`](Mutex::try_lock)
//! 无法在释放与排队任务恢复之间抢走锁。获取顺序等于请求顺序。
//!
//! # Examples
//!
//! ```
//! use coop_sync::mutex::Mutex;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let counter = Arc::new(Mutex::new(0u32));
//! let mut tasks = Vec::new();
//!
//! for _ in 0..4 {
//!     let counter = counter.clone();
//!     tasks.push(tokio::spawn(async move {
//!         for _ in 0..100 {
//!             *counter.lock().await += 1;
//!         }
//!     }));
//! }
//!
//! for task in tasks {
//!     task.await.unwrap();
//! }
//! assert_eq!(*counter.lock().await, 400);
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::shim::cell::UnsafeCell;
use crate::shim::sync::Mutex as StateLock;
use crate::wait_queue::WaitQueue;

/// An async mutex protecting a value of type `V`.
///
/// 保护类型为 `V` 的值的异步互斥锁。
pub struct Mutex<V> {
    state: StateLock<LockState>,
    value: UnsafeCell<V>,
}

/// Lock flag plus the FIFO queue of contenders, mutated under `state`.
struct LockState {
    held: bool,
    waiters: WaitQueue,
}

// SAFETY: the value is only ever reachable through a MutexGuard, and the
// held/hand-off protocol guarantees at most one guard exists at a time.
unsafe impl<V: Send> Send for Mutex<V> {}
unsafe impl<V: Send> Sync for Mutex<V> {}

impl<V> Mutex<V> {
    /// Create a new mutex wrapping the supplied value.
    ///
    /// 创建一个包装所给值的新互斥锁。
    pub fn new(value: V) -> Self {
        Self {
            state: StateLock::new(LockState {
                held: false,
                waiters: WaitQueue::new(),
            }),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquire the mutex, suspending the calling task while it is held
    /// elsewhere.
    ///
    /// The returned guard releases the lock on every exit path of the scope
    /// that created it. Dropping the returned future before completion gives
    /// up the queue slot; if ownership was already handed over, it is passed
    /// on to the next waiter.
    ///
    /// 获取互斥锁；当锁被其他任务持有时挂起调用任务。
    ///
    /// 返回的 guard 在创建它的作用域的任何退出路径上都会释放锁。
    /// 在完成前丢弃返回的 future 会放弃排队位置；如果所有权已经移交，
    /// 则会转交给下一个等待者。
    pub fn lock(&self) -> Acquire<'_, V> {
        Acquire {
            mutex: self,
            key: None,
        }
    }

    /// Try to acquire the mutex without suspending.
    ///
    /// Returns `None` while the lock is held, including while it is being
    /// handed off to a queued task.
    ///
    /// 尝试获取互斥锁而不挂起。当锁被持有时返回 `None`，
    /// 包括锁正在移交给排队任务期间。
    pub fn try_lock(&self) -> Option<MutexGuard<'_, V>> {
        let mut state = self.state.lock().unwrap();
        if state.held {
            None
        } else {
            state.held = true;
            Some(self.guard())
        }
    }

    /// Whether the lock is currently held.
    ///
    /// The answer is out of date the moment it is returned; use it as a
    /// heuristic only.
    ///
    /// 锁当前是否被持有。返回值在返回的瞬间即可能过时，仅作参考。
    pub fn is_locked(&self) -> bool {
        self.state.lock().unwrap().held
    }

    /// Consume the mutex and return the inner value.
    ///
    /// 消耗互斥锁并返回内部值。
    #[cfg(not(feature = "loom"))]
    pub fn into_inner(self) -> V {
        self.value.into_inner()
    }

    /// Mutable access to the inner value without locking.
    ///
    /// The exclusive borrow statically guarantees no guard exists.
    ///
    /// 不加锁地可变访问内部值。独占借用静态地保证不存在任何 guard。
    pub fn get_mut(&mut self) -> &mut V {
        self.value.with_mut(|value| unsafe { &mut *value })
    }

    /// Build a guard. Caller must have set the `held` flag.
    fn guard(&self) -> MutexGuard<'_, V> {
        MutexGuard {
            mutex: self,
            value: self.value.with_mut(|value| value),
        }
    }
}

impl<V: Default> Default for Mutex<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: fmt::Debug> fmt::Debug for Mutex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("Mutex").field("value", &&*guard).finish(),
            None => f.debug_struct("Mutex").field("value", &"<locked>").finish(),
        }
    }
}

/// Future returned by [`Mutex::lock`].
///
/// [`Mutex::lock`] 返回的 future。
pub struct Acquire<'a, V> {
    mutex: &'a Mutex<V>,
    key: Option<u64>,
}

impl<'a, V> Future for Acquire<'a, V> {
    type Output = MutexGuard<'a, V>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut state = this.mutex.state.lock().unwrap();

        if let Some(key) = this.key {
            if state.waiters.take_wake(key) {
                // The releasing task handed ownership straight to us; the
                // held flag is still set on our behalf.
                //
                // 释放方把所有权直接移交给了我们；held 标志仍为我们而置位。
                this.key = None;
                drop(state);
                return Poll::Ready(this.mutex.guard());
            }
            state.waiters.update(key, cx.waker());
            return Poll::Pending;
        }

        if !state.held {
            // Hand-off keeps the flag set while waiters exist, so an unheld
            // lock cannot have a queue.
            debug_assert!(state.waiters.is_empty());
            state.held = true;
            drop(state);
            return Poll::Ready(this.mutex.guard());
        }

        this.key = Some(state.waiters.register(cx.waker()));
        Poll::Pending
    }
}

impl<V> Drop for Acquire<'_, V> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else { return };
        let mut state = self.mutex.state.lock().unwrap();
        if state.waiters.cancel(key) {
            // Ownership was handed to us but never claimed; release it as a
            // guard drop would.
            //
            // 所有权已移交给我们但从未被认领；像 guard 释放那样再次释放它。
            if !state.waiters.wake_one() {
                state.held = false;
            }
        }
    }
}

impl<V> fmt::Debug for Acquire<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquire")
            .field("queued", &self.key.is_some())
            .finish()
    }
}

/// RAII guard granting exclusive access to the value inside a [`Mutex`].
///
/// Dropping the guard releases the lock; if tasks are queued, ownership moves
/// directly to the oldest one.
///
/// 授予对 [`Mutex`] 内部值独占访问的 RAII guard。
///
/// 丢弃 guard 即释放锁；若有任务在排队，所有权直接移交给最早的一个。
pub struct MutexGuard<'a, V> {
    mutex: &'a Mutex<V>,
    value: *mut V,
}

// SAFETY: the guard is the sole access path to the value while it exists.
unsafe impl<V: Send> Send for MutexGuard<'_, V> {}
unsafe impl<V: Send + Sync> Sync for MutexGuard<'_, V> {}

impl<V> Deref for MutexGuard<'_, V> {
    type Target = V;

    #[inline]
    fn deref(&self) -> &V {
        // SAFETY: exclusive access for the guard's lifetime
        unsafe { &*self.value }
    }
}

impl<V> DerefMut for MutexGuard<'_, V> {
    #[inline]
    fn deref_mut(&mut self) -> &mut V {
        // SAFETY: exclusive access for the guard's lifetime
        unsafe { &mut *self.value }
    }
}

impl<V> Drop for MutexGuard<'_, V> {
    fn drop(&mut self) {
        let mut state = self.mutex.state.lock().unwrap();
        if !state.waiters.wake_one() {
            state.held = false;
        }
        // When a waiter was woken the flag stays set: ownership has already
        // moved to that task.
        //
        // 唤醒等待者时标志保持置位：所有权已移交给该任务。
    }
}

impl<V: fmt::Debug> fmt::Debug for MutexGuard<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
