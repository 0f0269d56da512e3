//! 拓扑加载、构建与注入错误

use thiserror::Error;

use crate::net::NodeId;
use crate::pfc::PfcConfigError;
use crate::queue::EcnConfigError;

/// 二进制拓扑描述解码错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed topology descriptor: {0}")]
    MalformedInput(String),
    #[error("unsupported schema version {found} (expected {expected})")]
    SchemaVersionMismatch { found: u32, expected: u32 },
    #[error("link #{link} references undeclared node {node:?}")]
    ReferenceError { link: usize, node: NodeId },
}

/// 由描述构建拓扑时的错误；出错时不会产生部分构建的拓扑
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("node id {0:?} is declared more than once")]
    DuplicateId(NodeId),
    #[error("link #{link} references undeclared node {node:?}")]
    ReferenceError { link: usize, node: NodeId },
    #[error("node {node:?} declares {port_count} ports, more than the supported {max}")]
    TooManyPorts {
        node: NodeId,
        port_count: u32,
        max: u32,
    },
    #[error("link #{link} has capacity {capacity} Gbps outside the supported range")]
    CapacityOutOfRange { link: usize, capacity: f64 },
    #[error("link #{link} connects node {node:?} to itself")]
    SelfLoop { link: usize, node: NodeId },
    #[error("link #{link} uses port {port} of node {node:?}, which has only {port_count} ports")]
    PortOutOfRange {
        link: usize,
        node: NodeId,
        port: u32,
        port_count: u32,
    },
    #[error("link #{link} uses port {port} of node {node:?}, which is already connected")]
    PortInUse { link: usize, node: NodeId, port: u32 },
    #[error("link #{link} needs a free port on node {node:?}, but all {port_count} are connected")]
    PortsExhausted {
        link: usize,
        node: NodeId,
        port_count: u32,
    },
    #[error("node {node:?} is configured for {configured} ports but declares {available}")]
    PortCountMismatch {
        node: NodeId,
        configured: usize,
        available: usize,
    },
    #[error("invalid PFC configuration for port {port} of node {node:?}")]
    InvalidPfcConfig {
        node: NodeId,
        port: u32,
        #[source]
        source: PfcConfigError,
    },
    #[error("invalid ECN configuration for priority {priority} on port {port} of node {node:?}")]
    InvalidEcnConfig {
        node: NodeId,
        port: u32,
        priority: u8,
        #[source]
        source: EcnConfigError,
    },
    #[error("switch configuration override for undeclared node {0}")]
    OverrideForUnknownNode(u32),
    #[error("node {0:?} is not a switch")]
    NotASwitch(NodeId),
    #[error("node {0:?} is not a host")]
    NotAHost(NodeId),
}

/// 从字节加载拓扑（解码 + 构建）
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// 向拓扑注入数据帧时的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not a host")]
    NotAHost(NodeId),
    #[error("node {0:?} is not a switch")]
    NotASwitch(NodeId),
    #[error("priority {0} is outside 0..8")]
    InvalidPriority(u8),
    #[error("frame {0} has an empty route")]
    EmptyRoute(u64),
    #[error("frame route does not continue from node {node:?}")]
    RouteMismatch { node: NodeId },
    #[error("port {port} does not exist on node {node:?}")]
    PortOutOfRange { node: NodeId, port: usize },
    #[error("no link from {from:?} toward {to:?}")]
    NoLinkToward { from: NodeId, to: NodeId },
}
