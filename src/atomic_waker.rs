//! Single-slot waker storage synchronized by an atomic state machine.
//!
//! A trimmed-down cousin of Tokio's `AtomicWaker`: one `Waker` slot guarded by
//! a registration/waking state word, so a register racing a wake never loses a
//! notification and never needs a `Box`.
//!
//! 由原子状态机同步的单槽 waker 存储。
//!
//! 这是 Tokio `AtomicWaker` 的精简版本：一个由注册/唤醒状态字保护的 `Waker` 槽，
//! 保证注册与唤醒竞争时既不会丢失通知，也不需要 `Box` 分配。

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::Waker;

// Slot states
const IDLE: usize = 0;
const REGISTERING: usize = 0b01;
const WAKING: usize = 0b10;

pub(crate) struct AtomicWaker {
    state: AtomicUsize,
    waker: UnsafeCell<Option<Waker>>,
}

// SAFETY: the waker slot is only touched while the REGISTERING or WAKING bit
// is held, so there is never concurrent access to the cell.
unsafe impl Sync for AtomicWaker {}
unsafe impl Send for AtomicWaker {}

impl AtomicWaker {
    #[inline]
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicUsize::new(IDLE),
            waker: UnsafeCell::new(None),
        }
    }

    /// Store a waker to be woken by a later [`wake`](Self::wake).
    ///
    /// If a wake arrives while the slot is being written, the freshly stored
    /// waker is woken immediately so the notification cannot be lost.
    ///
    /// 存储一个 waker，供之后的 [`wake`](Self::wake) 唤醒。
    ///
    /// 如果在写入槽位时有唤醒到来，刚存入的 waker 会被立即唤醒，通知不会丢失。
    #[inline]
    pub(crate) fn register(&self, waker: &Waker) {
        match self
            .state
            .compare_exchange(IDLE, REGISTERING, Ordering::Acquire, Ordering::Acquire)
        {
            Ok(_) => {
                // SAFETY: REGISTERING bit grants exclusive slot access
                unsafe {
                    let old_waker = (*self.waker.get()).replace(waker.clone());

                    match self.state.compare_exchange(
                        REGISTERING,
                        IDLE,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => {
                            drop(old_waker);
                        }
                        Err(_) => {
                            // A wake raced the registration: consume the slot
                            // ourselves and deliver the wake now.
                            //
                            // 唤醒与注册发生了竞争：由我们自己取出槽位并立即唤醒。
                            let waker = (*self.waker.get()).take();
                            self.state.store(IDLE, Ordering::Release);

                            drop(old_waker);
                            if let Some(waker) = waker {
                                waker.wake();
                            }
                        }
                    }
                }
            }
            Err(WAKING) => {
                // A wake is being delivered right now; short-circuit it.
                waker.wake_by_ref();
            }
            Err(_) => {
                // Concurrent registration; the other call wins the slot.
            }
        }
    }

    /// Remove the stored waker, if any.
    ///
    /// 取出已存储的 waker（如果有）。
    #[inline]
    pub(crate) fn take(&self) -> Option<Waker> {
        match self.state.fetch_or(WAKING, Ordering::AcqRel) {
            IDLE => {
                // SAFETY: WAKING bit grants exclusive slot access
                let waker = unsafe { (*self.waker.get()).take() };
                self.state.store(IDLE, Ordering::Release);
                waker
            }
            _ => {
                // A register or another wake is in flight; the racing
                // register path takes care of delivery.
                None
            }
        }
    }

    /// Wake the stored waker, if any.
    ///
    /// 唤醒已存储的 waker（如果有）。
    #[inline]
    pub(crate) fn wake(&self) {
        if let Some(waker) = self.take() {
            waker.wake();
        }
    }
}

impl Drop for AtomicWaker {
    fn drop(&mut self) {
        // SAFETY: exclusive access during drop
        unsafe {
            let _ = (*self.waker.get()).take();
        }
    }
}

impl std::fmt::Debug for AtomicWaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicWaker").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_register_then_take() {
        let slot = AtomicWaker::new();
        let waker = futures::task::noop_waker();

        slot.register(&waker);
        assert!(slot.take().is_some());

        // Slot is empty after take
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_wake_without_registration() {
        let slot = AtomicWaker::new();

        // Must not panic
        slot.wake();
        slot.wake();
    }

    #[test]
    fn test_reregistration_replaces_waker() {
        let slot = AtomicWaker::new();
        let waker = futures::task::noop_waker();

        slot.register(&waker);
        slot.register(&waker);

        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_concurrent_register_and_take() {
        use std::thread;

        let slot = Arc::new(AtomicWaker::new());
        let waker = futures::task::noop_waker();

        let s1 = slot.clone();
        let w1 = waker.clone();
        let h1 = thread::spawn(move || {
            for _ in 0..100 {
                s1.register(&w1);
            }
        });

        let s2 = slot.clone();
        let h2 = thread::spawn(move || {
            for _ in 0..100 {
                s2.take();
            }
        });

        h1.join().unwrap();
        h2.join().unwrap();
    }
}
