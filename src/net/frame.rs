//! 数据帧类型
//!
//! 定义网络数据帧及其源路由操作。

use super::id::{NodeId, PortIndex};

/// IP 头中的 ECN 字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ecn {
    #[default]
    NotEct,
    Ect0,
    Ce,
}

impl Ecn {
    pub fn is_ect(self) -> bool {
        self == Ecn::Ect0
    }

    pub fn is_ce(self) -> bool {
        self == Ecn::Ce
    }
}

/// 网络数据帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    /// 优先级（CoS），取值 0..8
    pub priority: u8,
    pub route: Vec<NodeId>,
    pub hop: usize, // 当前所在节点在 route 中的索引
    pub ecn: Ecn,
    /// 交换机缓存该帧期间记录的入端口（用于入口计数）
    pub(crate) ingress: Option<PortIndex>,
}

impl Frame {
    /// 创建新数据帧，位于 route 的起点
    pub fn new(id: u64, flow_id: u64, size_bytes: u32, priority: u8, route: Vec<NodeId>) -> Self {
        Self {
            id,
            flow_id,
            size_bytes,
            priority,
            route,
            hop: 0,
            ecn: Ecn::NotEct,
            ingress: None,
        }
    }

    /// 获取源节点
    pub fn src(&self) -> Option<NodeId> {
        self.route.first().copied()
    }

    /// 获取目标节点
    pub fn dst(&self) -> Option<NodeId> {
        self.route.last().copied()
    }

    /// 获取当前所在节点
    pub fn at(&self) -> Option<NodeId> {
        self.route.get(self.hop).copied()
    }

    /// 检查是否有下一跳
    pub fn has_next(&self) -> bool {
        self.hop + 1 < self.route.len()
    }

    /// 获取下一跳节点（如果有）
    pub fn next(&self) -> Option<NodeId> {
        self.route.get(self.hop + 1).copied()
    }

    pub fn with_ecn(mut self, ecn: Ecn) -> Self {
        self.ecn = ecn;
        self
    }

    /// 只有 ECT 帧会被打上 CE
    pub fn mark_ce_if_ect(&mut self) {
        if self.ecn.is_ect() {
            self.ecn = Ecn::Ce;
        }
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hop += 1;
        self
    }

    /// 入端口标记
    pub fn ingress(&self) -> Option<PortIndex> {
        self.ingress
    }
}
