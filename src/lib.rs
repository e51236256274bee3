//! # coop-sync
//!
//! Lightweight async synchronization primitives for cooperative task
//! concurrency in Rust.
//!
//! 面向 Rust 协作式任务并发的轻量级异步同步原语库。
//!
//! ## Overview / 概述
//!
//! `coop-sync` provides three primitives for programs built out of many
//! logical tasks multiplexed onto cooperative suspension points: a mutex that
//! owns the value it protects, a one-shot handoff channel, and a
//! multi-producer multi-consumer queue channel. They share one internal
//! building block — a FIFO wait queue with cancellation-safe hand-off — so
//! wake-up order always equals request order.
//!
//! `coop-sync` 为由大量逻辑任务通过协作式挂起点复用执行的程序提供三种原语：
//! 拥有所保护值的互斥锁、一次性移交通道、以及多生产者多消费者队列通道。
//! 它们共享同一个内部构件——带取消安全移交的 FIFO 等待队列——
//! 因此唤醒顺序始终等于请求顺序。
//!
//! ## Modules / 模块
//!
//! ### [`mutex`]
//!
//! A mutual exclusion guard that owns its value. Release hands ownership
//! directly to the oldest queued task, so `try_lock` can never steal the lock
//! out from under a waiter and acquisition order equals request order.
//!
//! 拥有自身值的互斥守卫。释放时把所有权直接移交给队列中最早的任务，
//! 因此 `try_lock` 永远无法从等待者手中抢走锁，获取顺序等于请求顺序。
//!
//! ### [`oneshot`]
//!
//! A single-use handoff between exactly one sender and one receiver, driven
//! by an atomic state machine: every race between send, receive and close is
//! settled by one state transition, and the loser fails deterministically.
//!
//! 恰好一个发送端与一个接收端之间的一次性移交，由原子状态机驱动：
//! 发送、接收与关闭之间的所有竞争都由一次状态转换裁决，失败方得到确定的错误。
//!
//! ### [`mpmc`]
//!
//! A multi-producer multi-consumer channel with optional bounded capacity,
//! backpressure on senders, FIFO fairness on both sides, and reference-counted
//! endpoint handles for close detection.
//!
//! 可选有界容量的多生产者多消费者通道：对发送端施加背压，
//! 两侧均保证 FIFO 公平性，并通过引用计数的端点句柄检测关闭。
//!
//! ## Examples / 示例
//!
//! ### Guarding shared state
//!
//! ```
//! use coop_sync::mutex::Mutex;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let shared = Arc::new(Mutex::new(Vec::new()));
//!
//! let writer = shared.clone();
//! tokio::spawn(async move {
//!     writer.lock().await.push(1);
//! })
//! .await
//! .unwrap();
//!
//! assert_eq!(*shared.lock().await, vec![1]);
//! # });
//! ```
//!
//! ### One-shot handoff
//!
//! ```
//! use coop_sync::oneshot;
//!
//! # tokio_test::block_on(async {
//! let (tx, mut rx) = oneshot::channel();
//!
//! tokio::spawn(async move {
//!     tx.send("done").unwrap();
//! });
//!
//! assert_eq!(rx.recv().await, Ok("done"));
//! # });
//! ```
//!
//! ### Bounded pipeline
//!
//! ```
//! use coop_sync::mpmc;
//! use std::num::NonZeroUsize;
//!
//! # tokio_test::block_on(async {
//! let (tx, rx) = mpmc::bounded(NonZeroUsize::new(2).unwrap());
//!
//! tokio::spawn(async move {
//!     for i in 0..10 {
//!         // Suspends whenever the buffer holds two undelivered items
//!         tx.send(i).await.unwrap();
//!     }
//! });
//!
//! let mut received = Vec::new();
//! while let Ok(value) = rx.recv().await {
//!     received.push(value);
//! }
//! assert_eq!(received, (0..10).collect::<Vec<_>>());
//! # });
//! ```
//!
//! ## Cancellation / 取消
//!
//! Dropping any pending `lock`, `send` or `recv` future leaves the primitive
//! exactly as if the call had never happened: the waiter is removed from its
//! queue, no value is lost or duplicated, and a wake-up (or lock ownership)
//! that was already handed to the cancelled waiter is forwarded to the next
//! one in line.
//!
//! 丢弃任何挂起中的 `lock`、`send` 或 `recv` future 都会让原语回到
//! 调用从未发生过的状态：等待者被移出队列，值既不会丢失也不会重复，
//! 已经移交给被取消等待者的唤醒（或锁所有权）会转交给队列中的下一位。
//!
//! ## Safety / 安全性
//!
//! The mutex value cell and the oneshot value slot use `unsafe` internally but
//! expose safe APIs. Safety rests on:
//!
//! 互斥锁的值单元与一次性通道的值槽在内部使用 `unsafe`，但暴露安全的 API。
//! 其安全性基于：
//!
//! - Atomic state machines gating every cell access to a single winner
//! - The hand-off protocol keeping the lock flag set while ownership moves
//! - Comprehensive test coverage, including loom model tests behind the
//!   `loom` feature
//!
//! - 原子状态机保证每次单元访问只有一个胜者
//! - 移交协议在所有权转移期间保持锁标志置位
//! - 全面的测试覆盖，包括 `loom` 特性下的 loom 模型测试

pub mod mpmc;
pub mod mutex;
pub mod oneshot;

mod atomic_waker;
mod shim;
mod wait_queue;
