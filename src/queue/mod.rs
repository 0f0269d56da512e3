//! 队列策略（Queue disciplines）
//!
//! 每个端口的出口由一组按优先级划分的 DropTail FIFO 组成，外加一个可替换的类间调度器。
//! 被 PFC 暂停的优先级在出队时被跳过，帧留在队列中而不是被丢弃或转发。

use crate::net::Frame;

mod drop_tail;
mod ecn;
mod pipeline;
mod policy;

pub use drop_tail::DropTailQueue;
pub use ecn::{EcnConfig, EcnConfigError, EcnMarker};
pub use pipeline::{EnqueueOutcome, TrafficControlPipeline};
pub use policy::{ClassScheduler, RoundRobin, SchedulingPolicy, StrictPriority, WeightedRoundRobin};

pub const DEFAULT_FRAME_BYTES: u64 = 1500;

pub fn mem_from_frames(frames: u64) -> u64 {
    frames.saturating_mul(DEFAULT_FRAME_BYTES)
}

/// 帧队列抽象
pub trait FrameQueue: std::fmt::Debug + Send {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(frame)
    fn enqueue(&mut self, frame: Frame) -> Result<(), Frame>;
    /// 出队：按队列策略返回下一帧
    fn dequeue(&mut self) -> Option<Frame>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn capacity_bytes(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
