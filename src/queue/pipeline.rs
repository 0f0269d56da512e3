//! 端口出口流量控制流水线
//!
//! 每个优先级一条 FIFO。被暂停的优先级保持帧不动，其余优先级照常出队。
//! 配置了 ECN 的优先级在入队时按队列深度给 ECT 帧打 CE。

use tracing::trace;

use super::drop_tail::DropTailQueue;
use super::ecn::EcnMarker;
use super::policy::{ClassScheduler, SchedulingPolicy};
use super::FrameQueue;
use crate::net::Frame;
use crate::pfc::PRIORITY_CLASSES;

/// 入队结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    Dropped(Frame),
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EnqueueOutcome::Accepted)
    }
}

#[derive(Debug)]
pub struct TrafficControlPipeline {
    classes: Vec<DropTailQueue>,
    paused: Vec<bool>,
    markers: Vec<Option<EcnMarker>>,
    ecn_marked: u64,
    scheduler: Box<dyn ClassScheduler>,
}

impl TrafficControlPipeline {
    /// `class_capacity_bytes` 为每个优先级队列的容量
    pub fn new(class_capacity_bytes: u64, policy: &SchedulingPolicy) -> Self {
        Self {
            classes: (0..PRIORITY_CLASSES)
                .map(|_| DropTailQueue::new(class_capacity_bytes))
                .collect(),
            paused: vec![false; PRIORITY_CLASSES],
            markers: vec![None; PRIORITY_CLASSES],
            ecn_marked: 0,
            scheduler: policy.build(),
        }
    }

    /// 交换机出口使用：丢包只由 PFC 入口计数决定
    pub fn unbounded(policy: &SchedulingPolicy) -> Self {
        Self::new(u64::MAX, policy)
    }

    /// 为某个优先级启用 ECN 标记，优先级越界直接 panic
    pub fn set_ecn(&mut self, priority: u8, marker: EcnMarker) {
        self.markers[priority as usize] = Some(marker);
    }

    pub fn ecn(&self, priority: u8) -> Option<&EcnMarker> {
        self.markers.get(priority as usize)?.as_ref()
    }

    /// 累计被打上 CE 的帧数
    pub fn ecn_marked(&self) -> u64 {
        self.ecn_marked
    }

    /// 优先级越界属于调用方错误，直接 panic
    pub fn enqueue(&mut self, mut frame: Frame) -> EnqueueOutcome {
        let class = frame.priority as usize;
        let mut marked = false;
        if frame.ecn.is_ect()
            && let Some(marker) = &mut self.markers[class]
        {
            let backlog = self.classes[class].bytes().saturating_add(frame.size_bytes as u64);
            if marker.should_mark(backlog) {
                frame.mark_ce_if_ect();
                marked = true;
            }
        }
        let id = frame.id;
        match self.classes[class].enqueue(frame) {
            Ok(()) => {
                if marked {
                    self.ecn_marked += 1;
                    trace!(frame_id = id, class, "🏷️ 帧被标记 CE");
                }
                EnqueueOutcome::Accepted
            }
            Err(frame) => {
                trace!(frame_id = frame.id, class, "出口队列已满");
                EnqueueOutcome::Dropped(frame)
            }
        }
    }

    /// 选出下一帧；全部为空或全部被暂停时返回 None
    pub fn try_dequeue(&mut self) -> Option<Frame> {
        let eligible: Vec<bool> = self
            .classes
            .iter()
            .zip(&self.paused)
            .map(|(q, &paused)| !paused && !q.is_empty())
            .collect();
        let class = self.scheduler.pick(&eligible)?;
        self.classes[class].dequeue()
    }

    /// 是否存在可立即出队的帧
    pub fn has_eligible(&self) -> bool {
        self.classes
            .iter()
            .zip(&self.paused)
            .any(|(q, &paused)| !paused && !q.is_empty())
    }

    pub fn set_paused(&mut self, priority: u8, paused: bool) {
        self.paused[priority as usize] = paused;
    }

    pub fn is_paused(&self, priority: u8) -> bool {
        self.paused
            .get(priority as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.classes.iter().map(|q| q.len()).sum()
    }

    pub fn class_len(&self, priority: u8) -> usize {
        self.classes
            .get(priority as usize)
            .map_or(0, |q| q.len())
    }

    pub fn bytes(&self) -> u64 {
        self.classes.iter().map(|q| q.bytes()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.iter().all(|q| q.is_empty())
    }
}
