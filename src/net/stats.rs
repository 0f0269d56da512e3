//! 统计信息
//!
//! 定义网络仿真统计数据结构。

/// 网络统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub delivered_frames: u64,
    pub delivered_bytes: u64,
    /// 送达时带 CE 标记的帧
    pub delivered_ce_frames: u64,
    /// 交换机缓冲区溢出导致的丢弃（唯一的网络丢包路径）
    pub dropped_frames: u64,
    /// 主机发送队列已满而被拒绝的帧
    pub rejected_frames: u64,
    pub pause_frames_sent: u64,
    pub pause_refreshes_sent: u64,
    pub resume_frames_sent: u64,
}
