//! 二进制拓扑描述编解码
//!
//! 布局：12 字节头部 `"DCTP" | schema_version (u32 LE) | body_len (u32 LE)`，
//! 之后是 protobuf 编码的消息体。

use prost::Message;
use tracing::{debug, trace};

use super::descriptor::{LinkSpec, NodeRole, NodeSpec, TopologyDescriptor};
use super::error::DecodeError;
use crate::net::NodeId;

pub const MAGIC: [u8; 4] = *b"DCTP";
pub const SCHEMA_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 12;

#[derive(Clone, PartialEq, ::prost::Message)]
struct WireTopology {
    #[prost(message, repeated, tag = "1")]
    nodes: Vec<WireNode>,
    #[prost(message, repeated, tag = "2")]
    links: Vec<WireLink>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct WireNode {
    #[prost(uint32, tag = "1")]
    id: u32,
    #[prost(enumeration = "WireRole", tag = "2")]
    role: i32,
    #[prost(uint32, tag = "3")]
    port_count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct WireLink {
    #[prost(uint32, tag = "1")]
    src_id: u32,
    #[prost(uint32, tag = "2")]
    dst_id: u32,
    #[prost(double, tag = "3")]
    capacity_gbps: f64,
    #[prost(uint64, tag = "4")]
    latency_ns: u64,
    #[prost(uint32, optional, tag = "5")]
    src_port: Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    dst_port: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
enum WireRole {
    Unspecified = 0,
    Host = 1,
    Switch = 2,
}

impl From<NodeRole> for WireRole {
    fn from(role: NodeRole) -> Self {
        match role {
            NodeRole::Host => WireRole::Host,
            NodeRole::Switch => WireRole::Switch,
        }
    }
}

/// 编码拓扑描述
pub fn encode(desc: &TopologyDescriptor) -> Vec<u8> {
    let wire = WireTopology {
        nodes: desc
            .nodes
            .iter()
            .map(|n| WireNode {
                id: n.id.0,
                role: WireRole::from(n.role) as i32,
                port_count: n.port_count,
            })
            .collect(),
        links: desc
            .links
            .iter()
            .map(|l| WireLink {
                src_id: l.src_id.0,
                dst_id: l.dst_id.0,
                capacity_gbps: l.capacity_gbps,
                latency_ns: l.latency_ns,
                src_port: l.src_port,
                dst_port: l.dst_port,
            })
            .collect(),
    };

    let body = wire.encode_to_vec();
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    debug!(
        nodes = desc.nodes.len(),
        links = desc.links.len(),
        bytes = out.len(),
        "📦 拓扑描述已编码"
    );
    out
}

/// 解码拓扑描述。无副作用；链路引用的节点必须已声明。
pub fn decode(bytes: &[u8]) -> Result<TopologyDescriptor, DecodeError> {
    let (header, body) = bytes.split_at_checked(HEADER_LEN).ok_or_else(|| {
        DecodeError::MalformedInput(format!(
            "input is {} bytes, shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        ))
    })?;

    if header[0..4] != MAGIC {
        return Err(DecodeError::MalformedInput(format!(
            "bad magic {:02x?}",
            &header[0..4]
        )));
    }
    let version = read_u32_le(&header[4..8]);
    if version != SCHEMA_VERSION {
        return Err(DecodeError::SchemaVersionMismatch {
            found: version,
            expected: SCHEMA_VERSION,
        });
    }
    let body_len = read_u32_le(&header[8..12]) as usize;
    if body.len() != body_len {
        return Err(DecodeError::MalformedInput(format!(
            "body is {} bytes, header declares {body_len}",
            body.len()
        )));
    }
    trace!(version, body_len, "头部校验通过");

    let wire = WireTopology::decode(body)
        .map_err(|e| DecodeError::MalformedInput(format!("protobuf body: {e}")))?;

    let nodes = wire
        .nodes
        .into_iter()
        .map(|n| {
            let role = match WireRole::try_from(n.role) {
                Ok(WireRole::Host) => NodeRole::Host,
                Ok(WireRole::Switch) => NodeRole::Switch,
                Ok(WireRole::Unspecified) | Err(_) => {
                    return Err(DecodeError::MalformedInput(format!(
                        "node {} has unknown role {}",
                        n.id, n.role
                    )));
                }
            };
            Ok(NodeSpec {
                id: NodeId(n.id),
                role,
                port_count: n.port_count,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let links = wire
        .links
        .into_iter()
        .map(|l| LinkSpec {
            src_id: NodeId(l.src_id),
            dst_id: NodeId(l.dst_id),
            capacity_gbps: l.capacity_gbps,
            latency_ns: l.latency_ns,
            src_port: l.src_port,
            dst_port: l.dst_port,
        })
        .collect();

    let desc = TopologyDescriptor { nodes, links };
    if let Some((link, node)) = desc.dangling_reference() {
        return Err(DecodeError::ReferenceError { link, node });
    }
    debug!(
        nodes = desc.nodes.len(),
        links = desc.links.len(),
        "📖 拓扑描述已解码"
    );
    Ok(desc)
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
