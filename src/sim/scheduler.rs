//! 调度能力
//!
//! 核心逻辑只通过此 trait 与宿主事件引擎交互：读取当前时间、调度未来事件、
//! 取消尚未执行的事件。核心从不拥有事件循环。

use super::time::SimTime;

/// 已调度事件的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

/// 调度器接口
pub trait Scheduler<E> {
    /// 当前仿真时间
    fn now(&self) -> SimTime;

    /// 在 `at` 时刻调度事件；同一时刻的事件按调度顺序执行。
    fn schedule_at(&mut self, at: SimTime, ev: E) -> EventId;

    /// 取消尚未执行的事件。事件已执行或已被取消时返回 false。
    fn cancel(&mut self, id: EventId) -> bool;
}
