//! 单个端口、单个优先级的 PFC 状态机
//!
//! 状态机本身不接触调度器：迁移结果以 [`PfcSignal`] 返回，由调用方负责发送 PAUSE 帧
//! 并通过 [`PfcState::arm_timer`] / [`PfcState::take_timer`] 登记刷新定时器。

use thiserror::Error;

use super::config::PfcConfig;
use super::frame::PauseFrame;
use crate::sim::{EventId, SimTime};

/// 状态机输出：需要发往对端的 PAUSE 帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PfcSignal {
    /// 进入 Paused，发送 PAUSE 并登记刷新定时器
    Pause(PauseFrame),
    /// 定时器到期仍需暂停，重新发送 PAUSE 并重新登记定时器
    Refresh(PauseFrame),
    /// 回到 Active，取消定时器并发送零时长 PAUSE
    Resume(PauseFrame),
}

impl PfcSignal {
    pub fn frame(&self) -> PauseFrame {
        match self {
            PfcSignal::Pause(f) | PfcSignal::Refresh(f) | PfcSignal::Resume(f) => *f,
        }
    }
}

/// 入口计数已达硬容量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("buffer overflow on priority {priority}: queue length {queue_length} reached hard capacity {hard_capacity}")]
pub struct BufferOverflow {
    pub priority: u8,
    pub queue_length: u64,
    pub hard_capacity: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PfcPhase {
    Active,
    Paused,
}

/// PFC 状态记录
#[derive(Debug, Clone)]
pub struct PfcState {
    priority: u8,
    enabled: bool,
    queue_length: u64,
    pause_threshold: u64,
    resume_threshold: u64,
    hard_capacity: u64,
    pause_duration: SimTime,
    refresh_interval: SimTime,
    phase: PfcPhase,
    pause_timer: Option<EventId>,
    enqueued: u64,
    dequeued: u64,
    dropped: u64,
}

impl PfcState {
    /// `pause_duration` 由端口按链路速率换算得到
    pub fn new(priority: u8, config: &PfcConfig, pause_duration: SimTime) -> Self {
        Self {
            priority,
            enabled: config.class_enabled(priority),
            queue_length: 0,
            pause_threshold: config.pause_threshold,
            resume_threshold: config.resume_threshold,
            hard_capacity: config.hard_capacity,
            pause_duration,
            refresh_interval: pause_duration.scale_percent(config.refresh_percent),
            phase: PfcPhase::Active,
            pause_timer: None,
            enqueued: 0,
            dequeued: 0,
            dropped: 0,
        }
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn queue_length(&self) -> u64 {
        self.queue_length
    }

    pub fn pause_threshold(&self) -> u64 {
        self.pause_threshold
    }

    pub fn resume_threshold(&self) -> u64 {
        self.resume_threshold
    }

    pub fn hard_capacity(&self) -> u64 {
        self.hard_capacity
    }

    pub fn pause_duration(&self) -> SimTime {
        self.pause_duration
    }

    pub fn refresh_interval(&self) -> SimTime {
        self.refresh_interval
    }

    pub fn phase(&self) -> PfcPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.phase == PfcPhase::Paused
    }

    pub fn pause_timer(&self) -> Option<EventId> {
        self.pause_timer
    }

    /// 累计被接纳的帧数
    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }

    pub fn dequeued(&self) -> u64 {
        self.dequeued
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// 一帧到达。超过硬容量时返回 `Err`，帧应被丢弃且不计入队列长度。
    pub fn on_enqueue(&mut self) -> Result<Option<PfcSignal>, BufferOverflow> {
        if self.queue_length >= self.hard_capacity {
            self.dropped += 1;
            return Err(BufferOverflow {
                priority: self.priority,
                queue_length: self.queue_length,
                hard_capacity: self.hard_capacity,
            });
        }
        self.queue_length += 1;
        self.enqueued += 1;

        if self.enabled
            && self.phase == PfcPhase::Active
            && self.queue_length >= self.pause_threshold
        {
            self.phase = PfcPhase::Paused;
            return Ok(Some(PfcSignal::Pause(PauseFrame::pause(
                self.priority,
                self.pause_duration,
            ))));
        }
        Ok(None)
    }

    /// 一帧离开。队列为空时出队属于调用方的逻辑错误，直接 panic。
    pub fn on_dequeue(&mut self) -> Option<PfcSignal> {
        assert!(
            self.queue_length > 0,
            "PFC queue length underflow on priority {}",
            self.priority
        );
        self.queue_length -= 1;
        self.dequeued += 1;

        if self.phase == PfcPhase::Paused && self.queue_length <= self.resume_threshold {
            self.phase = PfcPhase::Active;
            return Some(PfcSignal::Resume(PauseFrame::resume(self.priority)));
        }
        None
    }

    /// 刷新定时器到期
    pub fn on_timer_expiry(&mut self) -> Option<PfcSignal> {
        self.pause_timer = None;
        if self.phase != PfcPhase::Paused {
            return None;
        }
        if self.queue_length > self.resume_threshold {
            return Some(PfcSignal::Refresh(PauseFrame::pause(
                self.priority,
                self.pause_duration,
            )));
        }
        self.phase = PfcPhase::Active;
        None
    }

    /// 登记刷新定时器，返回被替换的旧定时器（调用方负责取消）
    pub fn arm_timer(&mut self, id: EventId) -> Option<EventId> {
        self.pause_timer.replace(id)
    }

    /// 取走当前定时器（调用方负责取消）
    pub fn take_timer(&mut self) -> Option<EventId> {
        self.pause_timer.take()
    }
}
