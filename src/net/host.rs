//! 主机
//!
//! 主机端口与交换机端口结构相同，但入口不做 PFC（不发 PAUSE，也不限制入口计数）；
//! 出口队列有容量上限，超出时在源端拒绝。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::frame::Frame;
use super::id::{NodeId, PortIndex};
use super::mac::MacAllocator;
use super::port::{Port, PortWiring};
use super::switch::neighbor_map;
use crate::pfc::PfcConfig;
use crate::queue::{EnqueueOutcome, SchedulingPolicy, TrafficControlPipeline, mem_from_frames};
use crate::topo::{BuildError, NodeRole, NodeSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// 每个优先级出口队列的容量（字节）
    pub egress_capacity_bytes: u64,
    pub scheduling: SchedulingPolicy,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            egress_capacity_bytes: mem_from_frames(1000),
            scheduling: SchedulingPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct Host {
    id: NodeId,
    ports: Vec<Port>,
    neighbors: HashMap<NodeId, PortIndex>,
}

impl Host {
    pub fn assemble(
        spec: &NodeSpec,
        config: &HostConfig,
        wiring: &[Option<PortWiring>],
        macs: &mut MacAllocator,
    ) -> Result<Host, BuildError> {
        if spec.role != NodeRole::Host {
            return Err(BuildError::NotAHost(spec.id));
        }
        let available = spec.port_count as usize;
        if wiring.len() != available {
            return Err(BuildError::PortCountMismatch {
                node: spec.id,
                configured: wiring.len(),
                available,
            });
        }

        let pfc = PfcConfig::disabled();
        let ports: Vec<Port> = wiring
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let pipeline =
                    TrafficControlPipeline::new(config.egress_capacity_bytes, &config.scheduling);
                Port::new(PortIndex(i), macs.allocate(), *w, &pfc, pipeline)
            })
            .collect();

        let neighbors = neighbor_map(&ports);
        debug!(host = ?spec.id, ports = ports.len(), "🖥️  主机组装完成");
        Ok(Host {
            id: spec.id,
            ports,
            neighbors,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub(crate) fn ports_mut(&mut self) -> &mut [Port] {
        &mut self.ports
    }

    pub fn neighbor_port(&self, neighbor: NodeId) -> Option<PortIndex> {
        self.neighbors.get(&neighbor).copied()
    }

    /// 放入出口队列
    pub fn enqueue(&mut self, egress: PortIndex, frame: Frame) -> EnqueueOutcome {
        self.ports[egress.0].pipeline_mut().enqueue(frame)
    }

    pub fn try_dequeue(&mut self, egress: PortIndex) -> Option<Frame> {
        self.ports[egress.0].pipeline_mut().try_dequeue()
    }
}
