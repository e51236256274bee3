//! FIFO queue of suspended tasks, shared by the mutex and the MPMC channel.
//!
//! Each waiter registers its `Waker` and gets back a key. Wakes are delivered
//! strictly in registration order. A delivered wake stays recorded against the
//! waiter's key until the waiter either consumes it ([`WaitQueue::take_wake`])
//! or cancels ([`WaitQueue::cancel`]); cancellation reports whether a wake had
//! already been consumed so the owner can pass it on to the next waiter.
//!
//! The queue itself is plain data: callers mutate it under their own state
//! lock, which is what makes "was I woken" and "am I cancelled" a single
//! atomic question.
//!
//! 供互斥锁与 MPMC 通道共用的挂起任务 FIFO 队列。
//!
//! 每个等待者注册自己的 `Waker` 并获得一个 key。唤醒严格按注册顺序投递。
//! 已投递的唤醒会记录在等待者的 key 上，直到其被消费（[`WaitQueue::take_wake`]）
//! 或等待者取消（[`WaitQueue::cancel`]）；取消时会报告唤醒是否已被占用，
//! 以便所有者把它转交给下一个等待者。
//!
//! 队列本身是普通数据：调用者在各自的状态锁内修改它，
//! 因此"我是否被唤醒"与"我是否已取消"是同一个原子问题。

use std::collections::VecDeque;
use std::task::Waker;

pub(crate) struct WaitQueue {
    entries: VecDeque<Entry>,
    /// Keys popped by `wake_one` whose waiters have not resumed yet.
    woken: Vec<u64>,
    next_key: u64,
}

struct Entry {
    key: u64,
    waker: Waker,
}

impl WaitQueue {
    pub(crate) const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            woken: Vec::new(),
            next_key: 0,
        }
    }

    /// Append the current task to the queue, returning its key.
    ///
    /// 将当前任务追加到队列尾部，返回它的 key。
    pub(crate) fn register(&mut self, waker: &Waker) -> u64 {
        let key = self.next_key;
        self.next_key = self.next_key.wrapping_add(1);
        self.entries.push_back(Entry {
            key,
            waker: waker.clone(),
        });
        key
    }

    /// Refresh the waker stored for a still-queued waiter.
    ///
    /// 刷新仍在排队的等待者所存储的 waker。
    pub(crate) fn update(&mut self, key: u64, waker: &Waker) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            if !entry.waker.will_wake(waker) {
                entry.waker = waker.clone();
            }
        }
    }

    /// Wake the oldest waiter, recording the wake against its key.
    ///
    /// Returns whether a waiter was woken.
    ///
    /// 唤醒最早的等待者，并把唤醒记录到它的 key 上。返回是否有等待者被唤醒。
    pub(crate) fn wake_one(&mut self) -> bool {
        match self.entries.pop_front() {
            Some(entry) => {
                self.woken.push(entry.key);
                entry.waker.wake();
                true
            }
            None => false,
        }
    }

    /// Wake every queued waiter (channel close).
    ///
    /// 唤醒所有排队的等待者（通道关闭时使用）。
    pub(crate) fn wake_all(&mut self) {
        while self.wake_one() {}
    }

    /// Consume a wake addressed to `key`, if one was delivered.
    ///
    /// 消费投递给 `key` 的唤醒（若有）。
    pub(crate) fn take_wake(&mut self, key: u64) -> bool {
        match self.woken.iter().position(|&k| k == key) {
            Some(index) => {
                self.woken.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove a cancelled waiter.
    ///
    /// Returns `true` if a wake had already been consumed on behalf of this
    /// waiter; the caller must then forward it (wake the next waiter or
    /// release the handed-off resource), or the wake is lost.
    ///
    /// 移除一个已取消的等待者。
    ///
    /// 若此等待者已占用了一次唤醒则返回 `true`；调用者此时必须转发该唤醒
    /// （唤醒下一个等待者或释放已移交的资源），否则唤醒会丢失。
    #[must_use]
    pub(crate) fn cancel(&mut self, key: u64) -> bool {
        if let Some(index) = self.entries.iter().position(|e| e.key == key) {
            self.entries.remove(index);
            return false;
        }
        self.take_wake(key)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for WaitQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitQueue")
            .field("waiting", &self.entries.len())
            .field("woken", &self.woken.len())
            .finish()
    }
}
