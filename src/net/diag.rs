//! 诊断事件
//!
//! 核心通过注入的 [`DiagnosticSink`] 上报状态迁移与丢包。输出格式与详细程度由调用方决定；
//! 默认实现 [`TracingSink`] 写入 tracing 日志。

use std::sync::{Arc, Mutex};

use super::id::PortRef;
use crate::sim::SimTime;
use tracing::{info, warn};

/// 诊断事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// 入口计数越过暂停阈值，向对端发送 PAUSE
    PauseSent {
        port: PortRef,
        priority: u8,
        duration: SimTime,
    },
    /// 定时器到期时仍高于恢复阈值，重新发送 PAUSE
    PauseRefreshed {
        port: PortRef,
        priority: u8,
        duration: SimTime,
    },
    /// 入口计数降到恢复阈值，发送零时长 PAUSE（即 RESUME）
    ResumeSent { port: PortRef, priority: u8 },
    /// 定时器到期时已不高于恢复阈值，直接回到 Active
    PauseLapsed { port: PortRef, priority: u8 },
    /// 收到对端 PAUSE，出口对应优先级被暂停
    EgressPaused {
        port: PortRef,
        priority: u8,
        duration: SimTime,
    },
    /// 出口优先级恢复；`expired` 表示由暂停时长到期而非显式 RESUME 触发
    EgressResumed {
        port: PortRef,
        priority: u8,
        expired: bool,
    },
    /// 入口计数达到硬容量，帧被丢弃
    BufferOverflow {
        port: PortRef,
        priority: u8,
        frame_id: u64,
        queue_length: u64,
        hard_capacity: u64,
    },
}

/// 诊断事件接收方
pub trait DiagnosticSink: Send {
    fn record(&mut self, at: SimTime, event: &Diagnostic);
}

/// 写入 tracing 日志的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&mut self, at: SimTime, event: &Diagnostic) {
        match event {
            Diagnostic::BufferOverflow {
                port,
                priority,
                frame_id,
                queue_length,
                hard_capacity,
            } => warn!(
                now = ?at,
                node = ?port.node,
                port = port.port.0,
                priority,
                frame_id,
                queue_length,
                hard_capacity,
                "🚨 缓冲区溢出，丢弃数据帧"
            ),
            other => info!(now = ?at, event = ?other, "PFC 状态变化"),
        }
    }
}

/// 把诊断事件记录在内存中，便于检查；克隆后共享同一份记录。
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    entries: Arc<Mutex<Vec<(SimTime, Diagnostic)>>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前记录的快照
    pub fn entries(&self) -> Vec<(SimTime, Diagnostic)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// 统计满足条件的事件数
    pub fn count(&self, pred: impl Fn(&Diagnostic) -> bool) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(_, ev)| pred(ev))
            .count()
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn record(&mut self, at: SimTime, event: &Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((at, event.clone()));
    }
}
