//! 标识符类型
//!
//! 定义节点、链路与端口的标识符。

use serde::{Deserialize, Serialize};

/// 节点标识符（拓扑描述中声明的 id）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// 链路标识符（按声明顺序编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// 节点内的端口序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortIndex(pub usize);

/// 指向某个节点上某个端口的非拥有引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub port: PortIndex,
}

impl PortRef {
    pub fn new(node: NodeId, port: usize) -> Self {
        Self {
            node,
            port: PortIndex(port),
        }
    }
}
