//! PFC 配置

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 优先级（CoS）数量
pub const PRIORITY_CLASSES: usize = 8;

/// 单个端口的 PFC 配置，对该端口所有优先级生效。阈值单位为帧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PfcConfig {
    /// 启用 PFC 的优先级位图（bit i 对应优先级 i）
    pub enabled_classes: u8,
    pub pause_threshold: u64,
    pub resume_threshold: u64,
    /// 入口计数上限，超过即丢弃
    pub hard_capacity: u64,
    /// PAUSE 帧携带的暂停量（单位 quantum = 512 bit 时间）
    pub pause_quanta: u16,
    /// 刷新定时器在暂停时长的百分之多少处触发（1..=100）
    pub refresh_percent: u8,
}

impl Default for PfcConfig {
    fn default() -> Self {
        Self {
            enabled_classes: 0xff,
            pause_threshold: 64,
            resume_threshold: 40,
            hard_capacity: 1024,
            pause_quanta: 0xffff,
            refresh_percent: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PfcConfigError {
    #[error("resume threshold {resume} is above pause threshold {pause}")]
    ResumeAbovePause { pause: u64, resume: u64 },
    #[error("pause threshold must be at least 1")]
    ZeroPauseThreshold,
    /// 零暂停量的 PAUSE 帧等同于 RESUME
    #[error("pause quanta must be at least 1")]
    ZeroPauseQuanta,
    #[error("refresh percent {0} is outside 1..=100")]
    RefreshPercentOutOfRange(u8),
}

impl PfcConfig {
    /// 主机端口使用：不发 PAUSE，也不限制入口计数
    pub fn disabled() -> Self {
        Self {
            enabled_classes: 0,
            hard_capacity: u64::MAX,
            ..Self::default()
        }
    }

    pub fn class_enabled(&self, priority: u8) -> bool {
        (priority as usize) < PRIORITY_CLASSES && self.enabled_classes & (1 << priority) != 0
    }

    pub fn validate(&self) -> Result<(), PfcConfigError> {
        if self.pause_threshold == 0 {
            return Err(PfcConfigError::ZeroPauseThreshold);
        }
        if self.pause_quanta == 0 {
            return Err(PfcConfigError::ZeroPauseQuanta);
        }
        if self.resume_threshold > self.pause_threshold {
            return Err(PfcConfigError::ResumeAbovePause {
                pause: self.pause_threshold,
                resume: self.resume_threshold,
            });
        }
        if !(1..=100).contains(&self.refresh_percent) {
            return Err(PfcConfigError::RefreshPercentOutOfRange(self.refresh_percent));
        }
        Ok(())
    }
}
