//! RED 风格的 ECN 标记
//!
//! 以入队后的优先级队列字节数为依据：不超过 `k_min_bytes` 不标记，达到 `k_max_bytes` 必标记，
//! 两者之间按 `p_max` 线性插值的概率标记。随机数来自与 ECMP 路由相同的 splitmix 散列，
//! 因此同一种子下的仿真结果可复现。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::mix64;

/// 单个优先级的标记参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcnConfig {
    pub k_min_bytes: u64,
    pub k_max_bytes: u64,
    /// 到达 `k_max_bytes` 之前的最大标记概率，取值 [0, 1]
    pub p_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EcnConfigError {
    #[error("k_min_bytes ({k_min}) must be below k_max_bytes ({k_max})")]
    InvertedThresholds { k_min: u64, k_max: u64 },
    #[error("p_max must lie in [0, 1]")]
    ProbabilityOutOfRange,
    #[error("ECN configured for priority {0}, but only classes 0..8 exist")]
    UnknownPriority(u8),
}

impl EcnConfig {
    pub fn validate(&self) -> Result<(), EcnConfigError> {
        if self.k_min_bytes >= self.k_max_bytes {
            return Err(EcnConfigError::InvertedThresholds {
                k_min: self.k_min_bytes,
                k_max: self.k_max_bytes,
            });
        }
        // NaN 也落在区间外
        if !(0.0..=1.0).contains(&self.p_max) {
            return Err(EcnConfigError::ProbabilityOutOfRange);
        }
        Ok(())
    }

    /// `backlog_bytes` 为队列已有字节数加上待入队帧的大小
    pub fn mark_probability(&self, backlog_bytes: u64) -> f64 {
        if backlog_bytes <= self.k_min_bytes {
            0.0
        } else if backlog_bytes >= self.k_max_bytes {
            1.0
        } else {
            let span = (self.k_max_bytes - self.k_min_bytes) as f64;
            self.p_max * (backlog_bytes - self.k_min_bytes) as f64 / span
        }
    }
}

/// 带独立随机流的标记器，每个（端口，优先级）一个
#[derive(Debug, Clone)]
pub struct EcnMarker {
    config: EcnConfig,
    salt: u64,
    draws: u64,
}

impl EcnMarker {
    pub fn new(config: EcnConfig, salt: u64) -> Self {
        Self {
            config,
            salt,
            draws: 0,
        }
    }

    pub fn config(&self) -> &EcnConfig {
        &self.config
    }

    /// 只有落在 (k_min, k_max) 区间内才消耗一次随机数
    pub fn should_mark(&mut self, backlog_bytes: u64) -> bool {
        let p = self.config.mark_probability(backlog_bytes);
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        let h = mix64(self.salt ^ self.draws.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.draws += 1;
        // 取高 53 位映射到 [0, 1)
        let u = (h >> 11) as f64 / (1u64 << 53) as f64;
        u < p
    }
}
