//! PAUSE 帧
//!
//! 零时长的 PAUSE 帧即为 RESUME 信号（与 802.1Qbb 中 quanta = 0 的语义一致）。

use crate::sim::SimTime;

/// 一个 quantum 对应的比特数
pub const QUANTUM_BITS: u64 = 512;

/// PFC 控制帧在线路上的长度（最小以太网帧）
pub const PFC_FRAME_BYTES: u32 = 64;

/// 相邻端口之间交换的暂停消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseFrame {
    pub priority: u8,
    pub duration: SimTime,
}

impl PauseFrame {
    pub fn pause(priority: u8, duration: SimTime) -> Self {
        Self { priority, duration }
    }

    pub fn resume(priority: u8) -> Self {
        Self {
            priority,
            duration: SimTime::ZERO,
        }
    }

    pub fn is_resume(&self) -> bool {
        self.duration == SimTime::ZERO
    }
}

/// 把暂停量换算为给定链路速率下的时长（向上取整到纳秒）。
///
/// 速率为 0（端口未接链路）时返回 0。
pub fn quanta_to_duration(quanta: u16, bandwidth_bps: u64) -> SimTime {
    if bandwidth_bps == 0 {
        return SimTime::ZERO;
    }
    let bits = quanta as u128 * QUANTUM_BITS as u128;
    let nanos = (bits * 1_000_000_000u128).div_ceil(bandwidth_bps as u128);
    SimTime(nanos.min(u64::MAX as u128) as u64)
}
