//! 活动拓扑
//!
//! 独占所有节点与链路，在整个仿真期间存在，运行中不再修改图结构。
//! 事件处理与帧注入见 `fabric` 模块中的 `impl Topology`。

use std::collections::HashMap;

use super::builder::{self, BuildOptions};
use super::codec;
use super::descriptor::TopologyDescriptor;
use super::error::{BuildError, LoadError};
use crate::net::{
    DiagnosticSink, Frame, Link, LinkId, Node, NodeId, Port, PortRef, RoutingTable, Stats,
    TracingSink,
};
use crate::pfc::PfcState;

pub struct Topology {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    links: Vec<Link>,
    routing: RoutingTable,
    next_frame_id: u64,
    pub stats: Stats,
    pub(super) sink: Box<dyn DiagnosticSink>,
}

impl Topology {
    pub(super) fn from_parts(
        nodes: Vec<Node>,
        index: HashMap<NodeId, usize>,
        links: Vec<Link>,
        routing: RoutingTable,
    ) -> Self {
        Self {
            nodes,
            index,
            links,
            routing,
            next_frame_id: 0,
            stats: Stats::default(),
            sink: Box::new(TracingSink),
        }
    }

    /// 由拓扑描述构建
    pub fn build(desc: &TopologyDescriptor, opts: &BuildOptions) -> Result<Self, BuildError> {
        builder::build(desc, opts)
    }

    /// 解码二进制描述并构建
    pub fn from_bytes(bytes: &[u8], opts: &BuildOptions) -> Result<Self, LoadError> {
        let desc = codec::decode(bytes)?;
        Ok(builder::build(&desc, opts)?)
    }

    /// 替换诊断事件接收方（默认写入 tracing 日志）
    pub fn set_sink(&mut self, sink: impl DiagnosticSink + 'static) {
        self.sink = Box::new(sink);
    }

    /// 按声明顺序排列的节点
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn port(&self, at: PortRef) -> Option<&Port> {
        self.node(at.node)?.port(at.port)
    }

    pub fn pfc_state(&self, at: PortRef, priority: u8) -> Option<&PfcState> {
        self.port(at)?.pfc_states().get(priority as usize)
    }

    /// 按最短跳数 + ECMP 计算路由；同一 flow_id 总得到同一条路径
    pub fn route(&self, src: NodeId, dst: NodeId, flow_id: u64) -> Option<Vec<NodeId>> {
        let s = *self.index.get(&src)?;
        let d = *self.index.get(&dst)?;
        let mut path = vec![src];
        let mut cur = s;
        while cur != d {
            cur = self.routing.pick_ecmp(cur, d, flow_id)?;
            path.push(self.nodes[cur].id());
        }
        Some(path)
    }

    /// 创建数据帧并分配唯一 id
    pub fn make_frame(
        &mut self,
        flow_id: u64,
        size_bytes: u32,
        priority: u8,
        route: Vec<NodeId>,
    ) -> Frame {
        let id = self.next_frame_id;
        self.next_frame_id = self.next_frame_id.wrapping_add(1);
        Frame::new(id, flow_id, size_bytes, priority, route)
    }

    pub(super) fn node_index(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(super) fn node_mut_at(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    /// 内部事件携带的端口引用必然有效，失效即为逻辑错误
    pub(super) fn port_mut(&mut self, at: PortRef) -> &mut Port {
        let i = self
            .node_index(at.node)
            .unwrap_or_else(|| panic!("unknown node {:?}", at.node));
        self.nodes[i]
            .port_mut(at.port)
            .unwrap_or_else(|| panic!("node {:?} has no port {:?}", at.node, at.port))
    }
}
