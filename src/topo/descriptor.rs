//! 拓扑描述（中间表示）
//!
//! 编解码与构建之间传递的不可变数据：节点列表与链路列表。也支持 JSON 形式，便于手写。

use serde::{Deserialize, Serialize};

use crate::net::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Host,
    Switch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub role: NodeRole,
    pub port_count: u32,
}

impl NodeSpec {
    pub fn host(id: u32, port_count: u32) -> Self {
        Self {
            id: NodeId(id),
            role: NodeRole::Host,
            port_count,
        }
    }

    pub fn switch(id: u32, port_count: u32) -> Self {
        Self {
            id: NodeId(id),
            role: NodeRole::Switch,
            port_count,
        }
    }
}

/// 一条全双工链路。`src_port`/`dst_port` 缺省时由构建器按声明顺序分配下一个空闲端口。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub src_id: NodeId,
    pub dst_id: NodeId,
    pub capacity_gbps: f64,
    pub latency_ns: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u32>,
}

impl LinkSpec {
    pub fn new(src_id: u32, dst_id: u32, capacity_gbps: f64, latency_ns: u64) -> Self {
        Self {
            src_id: NodeId(src_id),
            dst_id: NodeId(dst_id),
            capacity_gbps,
            latency_ns,
            src_port: None,
            dst_port: None,
        }
    }

    pub fn with_ports(mut self, src_port: u32, dst_port: u32) -> Self {
        self.src_port = Some(src_port);
        self.dst_port = Some(dst_port);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyDescriptor {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl TopologyDescriptor {
    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// 第一个引用了未声明节点的链路：(链路序号, 节点 id)
    pub fn dangling_reference(&self) -> Option<(usize, NodeId)> {
        self.links.iter().enumerate().find_map(|(i, link)| {
            [link.src_id, link.dst_id]
                .into_iter()
                .find(|&id| self.node(id).is_none())
                .map(|id| (i, id))
        })
    }

    pub fn hosts(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Host)
    }

    pub fn switches(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Switch)
    }
}
