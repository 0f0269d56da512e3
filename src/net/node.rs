//! 节点类型
//!
//! 拓扑中的节点只有主机和交换机两种，二者共享端口与邻居表的结构。

use super::host::Host;
use super::id::{NodeId, PortIndex};
use super::port::Port;
use super::switch::Switch;
use crate::topo::NodeRole;

#[derive(Debug)]
pub enum Node {
    Host(Host),
    Switch(Switch),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Host(h) => h.id(),
            Node::Switch(s) => s.id(),
        }
    }

    pub fn role(&self) -> NodeRole {
        match self {
            Node::Host(_) => NodeRole::Host,
            Node::Switch(_) => NodeRole::Switch,
        }
    }

    pub fn ports(&self) -> &[Port] {
        match self {
            Node::Host(h) => h.ports(),
            Node::Switch(s) => s.ports(),
        }
    }

    pub(crate) fn ports_mut(&mut self) -> &mut [Port] {
        match self {
            Node::Host(h) => h.ports_mut(),
            Node::Switch(s) => s.ports_mut(),
        }
    }

    pub fn port(&self, index: PortIndex) -> Option<&Port> {
        self.ports().get(index.0)
    }

    pub(crate) fn port_mut(&mut self, index: PortIndex) -> Option<&mut Port> {
        self.ports_mut().get_mut(index.0)
    }

    pub fn neighbor_port(&self, neighbor: NodeId) -> Option<PortIndex> {
        match self {
            Node::Host(h) => h.neighbor_port(neighbor),
            Node::Switch(s) => s.neighbor_port(neighbor),
        }
    }

    pub fn as_host(&self) -> Option<&Host> {
        match self {
            Node::Host(h) => Some(h),
            Node::Switch(_) => None,
        }
    }

    pub fn as_switch(&self) -> Option<&Switch> {
        match self {
            Node::Switch(s) => Some(s),
            Node::Host(_) => None,
        }
    }
}
