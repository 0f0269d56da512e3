//! 交换机
//!
//! 每个声明的接口对应一个端口（PFC 状态 + 流水线），并按入口计数跨端口记账：
//! 帧从入端口进入后计入入端口的计数，直到它从任一出端口离开。

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::frame::Frame;
use super::id::{NodeId, PortIndex};
use super::mac::MacAllocator;
use super::routing::mix64;
use super::port::{Port, PortWiring};
use crate::pfc::{BufferOverflow, PRIORITY_CLASSES, PfcConfig, PfcSignal};
use crate::queue::{
    EcnConfig, EcnConfigError, EcnMarker, EnqueueOutcome, SchedulingPolicy, TrafficControlPipeline,
};
use crate::topo::{BuildError, NodeRole, NodeSpec};

/// 单个端口的配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub pfc: PfcConfig,
    /// 按优先级的 ECN 标记参数，未列出的优先级不标记
    pub ecn: BTreeMap<u8, EcnConfig>,
}

/// 交换机配置：`ports` 按端口序号覆盖，其余端口使用 `default_port`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub ports: BTreeMap<u32, PortConfig>,
    pub default_port: PortConfig,
    pub scheduling: SchedulingPolicy,
    /// ECN 标记随机流的种子，与端口 MAC 混合后各端口互不相关
    pub ecn_seed: u64,
}

impl SwitchConfig {
    pub fn with_pfc(pfc: PfcConfig) -> Self {
        Self {
            default_port: PortConfig {
                pfc,
                ..PortConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn port(&self, index: usize) -> &PortConfig {
        u32::try_from(index)
            .ok()
            .and_then(|i| self.ports.get(&i))
            .unwrap_or(&self.default_port)
    }
}

/// 交换机入队结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// 已缓存；可能伴随一个需要发往入端口对端的 PFC 信号
    Accepted(Option<PfcSignal>),
    /// 入口计数达到硬容量，帧被丢弃
    Dropped {
        frame: Frame,
        overflow: BufferOverflow,
    },
}

/// 出队结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dequeued {
    pub frame: Frame,
    /// 帧离开使某个入端口降到恢复阈值时产生的 RESUME
    pub resume: Option<(PortIndex, PfcSignal)>,
}

#[derive(Debug)]
pub struct Switch {
    id: NodeId,
    ports: Vec<Port>,
    neighbors: HashMap<NodeId, PortIndex>,
}

impl Switch {
    /// 按节点声明组装交换机。`wiring[i]` 为第 i 个端口的链路连接（未接线为 None）。
    pub fn assemble(
        spec: &NodeSpec,
        config: &SwitchConfig,
        wiring: &[Option<PortWiring>],
        macs: &mut MacAllocator,
    ) -> Result<Switch, BuildError> {
        if spec.role != NodeRole::Switch {
            return Err(BuildError::NotASwitch(spec.id));
        }
        let available = spec.port_count as usize;
        let configured = config
            .ports
            .keys()
            .next_back()
            .map_or(0, |&last| last as usize + 1);
        if configured > available || wiring.len() != available {
            return Err(BuildError::PortCountMismatch {
                node: spec.id,
                configured: configured.max(wiring.len()),
                available,
            });
        }

        let mut ports = Vec::with_capacity(available);
        for (i, w) in wiring.iter().enumerate() {
            let port_config = config.port(i);
            let pfc = port_config.pfc;
            pfc.validate()
                .map_err(|source| BuildError::InvalidPfcConfig {
                    node: spec.id,
                    port: i as u32,
                    source,
                })?;
            let mac = macs.allocate();
            let mut pipeline = TrafficControlPipeline::unbounded(&config.scheduling);
            for (&priority, ecn) in &port_config.ecn {
                let invalid = |source| BuildError::InvalidEcnConfig {
                    node: spec.id,
                    port: i as u32,
                    priority,
                    source,
                };
                if priority as usize >= PRIORITY_CLASSES {
                    return Err(invalid(EcnConfigError::UnknownPriority(priority)));
                }
                ecn.validate().map_err(invalid)?;
                let salt = mix64(config.ecn_seed ^ mac.as_u64() ^ ((priority as u64) << 48));
                pipeline.set_ecn(priority, EcnMarker::new(*ecn, salt));
            }
            ports.push(Port::new(PortIndex(i), mac, *w, &pfc, pipeline));
        }

        let neighbors = neighbor_map(&ports);
        debug!(switch = ?spec.id, ports = ports.len(), "🔀 交换机组装完成");
        Ok(Switch {
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

    /// 帧经 `ingress` 进入、准备从 `egress` 离开。
    ///
    /// 端口序号越界属于调用方错误，直接 panic。
    #[tracing::instrument(skip(self, frame), fields(switch = ?self.id, frame_id = frame.id, priority = frame.priority))]
    pub fn enqueue(&mut self, ingress: PortIndex, egress: PortIndex, mut frame: Frame) -> Admission {
        let priority = frame.priority;
        let signal = match self.ports[ingress.0].pfc_mut(priority).on_enqueue() {
            Ok(signal) => signal,
            Err(overflow) => return Admission::Dropped { frame, overflow },
        };

        frame.ingress = Some(ingress);
        let EnqueueOutcome::Accepted = self.ports[egress.0].pipeline_mut().enqueue(frame) else {
            unreachable!("switch egress pipelines are unbounded");
        };
        trace!(?ingress, ?egress, ?signal, "帧已缓存");
        Admission::Accepted(signal)
    }

    /// 从 `egress` 取出下一帧，并在入端口上扣减计数。
    pub fn try_dequeue(&mut self, egress: PortIndex) -> Option<Dequeued> {
        let mut frame = self.ports[egress.0].pipeline_mut().try_dequeue()?;
        let resume = frame.ingress.take().and_then(|ingress| {
            self.ports[ingress.0]
                .pfc_mut(frame.priority)
                .on_dequeue()
                .map(|signal| (ingress, signal))
        });
        Some(Dequeued { frame, resume })
    }
}

/// 由端口连接推导邻居表；多条平行链路时取序号最小的端口
pub(crate) fn neighbor_map(ports: &[Port]) -> HashMap<NodeId, PortIndex> {
    let mut neighbors = HashMap::new();
    for port in ports {
        if let Some(peer) = port.peer() {
            neighbors.entry(peer.node).or_insert(port.index());
        }
    }
    neighbors
}
