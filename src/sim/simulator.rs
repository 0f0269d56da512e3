//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列，并支持取消已调度事件。

use super::event::Event;
use super::scheduler::{EventId, Scheduler};
use super::time::SimTime;
use super::world::World;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 队列中的事件，按 (时间, 序列号) 排序
struct Queued {
    at: SimTime,
    seq: u64,
    ev: Box<dyn Event>,
}

impl Queued {
    fn key(&self) -> (SimTime, u64) {
        (self.at, self.seq)
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Queued {}

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<Reverse<Queued>>,
    /// 已调度且尚未执行/取消的事件序列号
    live: HashSet<u64>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 尚未执行的事件数量（不含已取消事件）
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    /// 调度事件在指定时间执行
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.live.insert(seq);
        self.q.push(Reverse(Queued {
            at,
            seq,
            ev: Box::new(ev),
        }));

        debug!(queue_size = self.q.len(), "事件已加入队列");
        EventId(seq)
    }

    /// 取消尚未执行的事件
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.live.remove(&id.0);
        trace!(seq = id.0, removed, "取消事件");
        removed
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(Reverse(top)) = self.q.peek() {
            if top.at > until {
                break;
            }
            let Some(Reverse(item)) = self.q.pop() else {
                break;
            };
            if !self.live.remove(&item.seq) {
                trace!(seq = item.seq, "跳过已取消事件");
                continue;
            }
            self.now = item.at;
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0;
        while let Some(Reverse(item)) = self.q.pop() {
            if !self.live.remove(&item.seq) {
                trace!(seq = item.seq, "跳过已取消事件");
                continue;
            }
            event_count += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                scheduled_at = ?item.at,
                seq = item.seq,
                kind = item.ev.kind(),
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}

impl<E: Event> Scheduler<E> for Simulator {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule_at(&mut self, at: SimTime, ev: E) -> EventId {
        self.schedule(at, ev)
    }

    fn cancel(&mut self, id: EventId) -> bool {
        Simulator::cancel(self, id)
    }
}
