//! 链路类型
//!
//! 定义全双工网络链路及其传输时延计算。

use super::id::{LinkId, PortRef};
use crate::sim::SimTime;

/// 网络链路（全双工，两端各自独立发送）
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub a: PortRef,
    pub b: PortRef,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
}

impl Link {
    /// 创建新链路
    pub fn new(id: LinkId, a: PortRef, b: PortRef, latency: SimTime, bandwidth_bps: u64) -> Self {
        Self {
            id,
            a,
            b,
            latency,
            bandwidth_bps,
        }
    }

    /// 给定一端，返回另一端
    pub fn peer_of(&self, end: PortRef) -> Option<PortRef> {
        if end == self.a {
            Some(self.b)
        } else if end == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// 计算传输指定字节数所需的时间
    pub fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128)
            + (self.bandwidth_bps as u128 - 1))
            / self.bandwidth_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}
