//! 端口
//!
//! 端口同时承担两个角色：作为入端口，为每个优先级维护 PFC 入口计数；作为出端口，
//! 持有流量控制流水线和对端 PAUSE 的过期定时器。

use super::id::{LinkId, PortIndex, PortRef};
use super::mac::MacAddr;
use crate::pfc::{PRIORITY_CLASSES, PfcConfig, PfcState, quanta_to_duration};
use crate::queue::TrafficControlPipeline;
use crate::sim::{EventId, SimTime};

/// 构建时为端口确定的链路连接信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortWiring {
    pub peer: PortRef,
    pub link: LinkId,
    pub bandwidth_bps: u64,
    pub latency: SimTime,
}

#[derive(Debug)]
pub struct Port {
    index: PortIndex,
    mac: MacAddr,
    wiring: Option<PortWiring>,
    pfc: Vec<PfcState>,
    pipeline: TrafficControlPipeline,
    /// 每个优先级上对端 PAUSE 的过期定时器
    egress_timers: Vec<Option<EventId>>,
    tx_busy: bool,
}

impl Port {
    /// PAUSE 时长按配置的暂停量和本端口链路速率换算；未接链路的端口时长为 0。
    pub fn new(
        index: PortIndex,
        mac: MacAddr,
        wiring: Option<PortWiring>,
        pfc: &PfcConfig,
        pipeline: TrafficControlPipeline,
    ) -> Self {
        let bandwidth = wiring.map_or(0, |w| w.bandwidth_bps);
        let pause_duration = quanta_to_duration(pfc.pause_quanta, bandwidth);
        Self {
            index,
            mac,
            wiring,
            pfc: (0..PRIORITY_CLASSES as u8)
                .map(|p| PfcState::new(p, pfc, pause_duration))
                .collect(),
            pipeline,
            egress_timers: vec![None; PRIORITY_CLASSES],
            tx_busy: false,
        }
    }

    pub fn index(&self) -> PortIndex {
        self.index
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn wiring(&self) -> Option<&PortWiring> {
        self.wiring.as_ref()
    }

    pub fn peer(&self) -> Option<PortRef> {
        self.wiring.map(|w| w.peer)
    }

    pub fn link(&self) -> Option<LinkId> {
        self.wiring.map(|w| w.link)
    }

    pub fn pfc(&self, priority: u8) -> &PfcState {
        &self.pfc[priority as usize]
    }

    pub fn pfc_mut(&mut self, priority: u8) -> &mut PfcState {
        &mut self.pfc[priority as usize]
    }

    pub fn pfc_states(&self) -> &[PfcState] {
        &self.pfc
    }

    pub fn pipeline(&self) -> &TrafficControlPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut TrafficControlPipeline {
        &mut self.pipeline
    }

    /// 登记出口过期定时器，返回被替换的旧定时器
    pub fn arm_egress_timer(&mut self, priority: u8, id: EventId) -> Option<EventId> {
        self.egress_timers[priority as usize].replace(id)
    }

    pub fn take_egress_timer(&mut self, priority: u8) -> Option<EventId> {
        self.egress_timers[priority as usize].take()
    }

    pub fn egress_timer(&self, priority: u8) -> Option<EventId> {
        self.egress_timers[priority as usize]
    }

    pub fn is_tx_busy(&self) -> bool {
        self.tx_busy
    }

    pub(crate) fn set_tx_busy(&mut self, busy: bool) {
        self.tx_busy = busy;
    }
}
