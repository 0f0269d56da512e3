//! 拓扑构建
//!
//! 把描述转换为活动拓扑：按声明顺序创建节点、分配端口与 MAC 地址、连接链路，
//! 最后计算 ECMP 路由表。任何错误都会使整个构建失败。

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::descriptor::{NodeRole, TopologyDescriptor};
use super::error::BuildError;
use super::topology::Topology;
use crate::net::{
    Host, HostConfig, Link, LinkId, MacAllocator, Node, NodeId, PortRef, PortWiring,
    RoutingTable, Switch, SwitchConfig,
};
use crate::sim::SimTime;

/// 单条链路容量上限（Gbps）
pub const MAX_CAPACITY_GBPS: f64 = 1.0e6;

/// 单个节点的端口数上限
pub const MAX_PORTS: u32 = 4096;

/// 构建参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// 所有交换机的默认配置
    pub switch: SwitchConfig,
    pub host: HostConfig,
    /// 按节点 id 覆盖个别交换机的配置
    pub overrides: BTreeMap<u32, SwitchConfig>,
    pub ecmp_seed: u64,
}

fn capacity_bps(capacity_gbps: f64) -> Option<u64> {
    if !capacity_gbps.is_finite() || capacity_gbps <= 0.0 || capacity_gbps > MAX_CAPACITY_GBPS {
        return None;
    }
    let bps = (capacity_gbps * 1.0e9).round() as u64;
    (bps > 0).then_some(bps)
}

/// 端口分配：显式端口必须在范围内且空闲，否则取最小的空闲端口
fn claim_port(
    slots: &[Option<PortWiring>],
    explicit: Option<u32>,
    link: usize,
    node: NodeId,
) -> Result<usize, BuildError> {
    let port_count = slots.len() as u32;
    match explicit {
        Some(port) => {
            let slot = slots
                .get(port as usize)
                .ok_or(BuildError::PortOutOfRange {
                    link,
                    node,
                    port,
                    port_count,
                })?;
            if slot.is_some() {
                return Err(BuildError::PortInUse { link, node, port });
            }
            Ok(port as usize)
        }
        None => slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(BuildError::PortsExhausted {
                link,
                node,
                port_count,
            }),
    }
}

#[tracing::instrument(skip_all, fields(nodes = desc.nodes.len(), links = desc.links.len()))]
pub fn build(desc: &TopologyDescriptor, opts: &BuildOptions) -> Result<Topology, BuildError> {
    let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(desc.nodes.len());
    for (i, spec) in desc.nodes.iter().enumerate() {
        if index.insert(spec.id, i).is_some() {
            return Err(BuildError::DuplicateId(spec.id));
        }
        if spec.port_count > MAX_PORTS {
            return Err(BuildError::TooManyPorts {
                node: spec.id,
                port_count: spec.port_count,
                max: MAX_PORTS,
            });
        }
    }

    for &id in opts.overrides.keys() {
        let &i = index
            .get(&NodeId(id))
            .ok_or(BuildError::OverrideForUnknownNode(id))?;
        if desc.nodes[i].role != NodeRole::Switch {
            return Err(BuildError::NotASwitch(NodeId(id)));
        }
    }

    // 每个节点的端口连接表
    let mut wiring: Vec<Vec<Option<PortWiring>>> = desc
        .nodes
        .iter()
        .map(|n| vec![None; n.port_count as usize])
        .collect();
    let mut links = Vec::with_capacity(desc.links.len());

    for (li, spec) in desc.links.iter().enumerate() {
        let &si = index.get(&spec.src_id).ok_or(BuildError::ReferenceError {
            link: li,
            node: spec.src_id,
        })?;
        let &di = index.get(&spec.dst_id).ok_or(BuildError::ReferenceError {
            link: li,
            node: spec.dst_id,
        })?;
        if si == di {
            return Err(BuildError::SelfLoop {
                link: li,
                node: spec.src_id,
            });
        }
        let bandwidth_bps =
            capacity_bps(spec.capacity_gbps).ok_or(BuildError::CapacityOutOfRange {
                link: li,
                capacity: spec.capacity_gbps,
            })?;
        let latency = SimTime::from_nanos(spec.latency_ns);

        let sp = claim_port(&wiring[si], spec.src_port, li, spec.src_id)?;
        let dp = claim_port(&wiring[di], spec.dst_port, li, spec.dst_id)?;
        let a = PortRef::new(spec.src_id, sp);
        let b = PortRef::new(spec.dst_id, dp);
        let id = LinkId(li);

        wiring[si][sp] = Some(PortWiring {
            peer: b,
            link: id,
            bandwidth_bps,
            latency,
        });
        wiring[di][dp] = Some(PortWiring {
            peer: a,
            link: id,
            bandwidth_bps,
            latency,
        });
        links.push(Link::new(id, a, b, latency, bandwidth_bps));
        debug!(link = li, ?a, ?b, bandwidth_bps, ?latency, "🔗 连接链路");
    }

    let mut macs = MacAllocator::default();
    let mut nodes = Vec::with_capacity(desc.nodes.len());
    for (spec, ports) in desc.nodes.iter().zip(&wiring) {
        let node = match spec.role {
            NodeRole::Host => Node::Host(Host::assemble(spec, &opts.host, ports, &mut macs)?),
            NodeRole::Switch => {
                let config = opts.overrides.get(&spec.id.0).unwrap_or(&opts.switch);
                Node::Switch(Switch::assemble(spec, config, ports, &mut macs)?)
            }
        };
        nodes.push(node);
    }

    let adj: Vec<Vec<usize>> = wiring
        .iter()
        .map(|ports| {
            ports
                .iter()
                .flatten()
                .filter_map(|w| index.get(&w.peer.node).copied())
                .collect()
        })
        .collect();
    let transit: Vec<bool> = desc
        .nodes
        .iter()
        .map(|n| n.role == NodeRole::Switch)
        .collect();
    let routing = RoutingTable::compute(&adj, &transit, opts.ecmp_seed);

    info!(
        hosts = desc.hosts().count(),
        switches = desc.switches().count(),
        links = links.len(),
        "🏗️  拓扑构建完成"
    );
    Ok(Topology::from_parts(nodes, index, links, routing))
}
