//! 数据平面事件处理
//!
//! 所有状态迁移都在处理单个事件时同步完成；需要等待的动作（链路发送完成、帧到达对端、
//! PAUSE 刷新与过期）都以未来事件的形式交给调度器。

use std::any::Any;

use tracing::{debug, trace, warn};

use super::error::InjectError;
use super::topology::Topology;
use crate::net::{Admission, Dequeued, Diagnostic, Frame, Node, NodeId, PortIndex, PortRef};
use crate::pfc::{PFC_FRAME_BYTES, PRIORITY_CLASSES, PauseFrame, PfcSignal};
use crate::queue::EnqueueOutcome;
use crate::sim::{Event, Scheduler, SimTime, Simulator, World};

/// 定时器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PfcTimer {
    /// 入端口处于 Paused 时的刷新定时器
    Refresh,
    /// 出端口收到 PAUSE 后的过期定时器
    Expiry,
}

/// 拓扑上的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FabricEvent {
    /// 数据帧经链路到达端口 `at`
    Enqueue { at: PortRef, frame: Frame },
    /// 端口 `at` 完成一帧的串行化发送，可以发送下一帧
    Dequeue { at: PortRef },
    TimerExpiry {
        at: PortRef,
        priority: u8,
        timer: PfcTimer,
    },
    /// 对端发来的 PAUSE 帧到达端口 `at`
    PauseFrameReceived { at: PortRef, frame: PauseFrame },
}

/// 持有拓扑的仿真世界
pub struct TopologyWorld {
    pub topo: Topology,
}

impl TopologyWorld {
    pub fn new(topo: Topology) -> Self {
        Self { topo }
    }
}

impl World for TopologyWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Event for FabricEvent {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = world
            .downcast_mut::<TopologyWorld>()
            .expect("world must be TopologyWorld");
        w.topo.handle(*self, sim);
    }

    fn kind(&self) -> &'static str {
        match self {
            FabricEvent::Enqueue { .. } => "enqueue",
            FabricEvent::Dequeue { .. } => "dequeue",
            FabricEvent::TimerExpiry {
                timer: PfcTimer::Refresh,
                ..
            } => "pfc_refresh",
            FabricEvent::TimerExpiry {
                timer: PfcTimer::Expiry,
                ..
            } => "pfc_expiry",
            FabricEvent::PauseFrameReceived { .. } => "pause_frame",
        }
    }
}

impl Topology {
    /// 处理一个事件
    #[tracing::instrument(skip_all, fields(now = ?sched.now()))]
    pub fn handle<S>(&mut self, ev: FabricEvent, sched: &mut S)
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        match ev {
            FabricEvent::Enqueue { at, frame } => self.on_arrival(at, frame, sched),
            FabricEvent::Dequeue { at } => {
                self.port_mut(at).set_tx_busy(false);
                self.try_transmit(at, sched);
            }
            FabricEvent::TimerExpiry {
                at,
                priority,
                timer: PfcTimer::Refresh,
            } => self.on_refresh_timer(at, priority, sched),
            FabricEvent::TimerExpiry {
                at,
                priority,
                timer: PfcTimer::Expiry,
            } => self.on_pause_expired(at, priority, sched),
            FabricEvent::PauseFrameReceived { at, frame } => {
                self.on_pause_frame(at, frame, sched)
            }
        }
    }

    /// 主机发出数据帧：放入主机出口队列，链路空闲时立即开始发送。
    ///
    /// 出口队列已满时返回 `Ok(EnqueueOutcome::Dropped)`，计入 `rejected_frames`。
    pub fn inject<S>(
        &mut self,
        host: NodeId,
        frame: Frame,
        sched: &mut S,
    ) -> Result<EnqueueOutcome, InjectError>
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let i = self
            .node_index(host)
            .ok_or(InjectError::UnknownNode(host))?;
        if !matches!(self.nodes()[i], Node::Host(_)) {
            return Err(InjectError::NotAHost(host));
        }
        if frame.route.is_empty() {
            return Err(InjectError::EmptyRoute(frame.id));
        }
        if frame.src() != Some(host) || frame.hop != 0 {
            return Err(InjectError::RouteMismatch { node: host });
        }
        let egress = self.check_route(&frame)?;

        let Node::Host(h) = self.node_mut_at(i) else {
            unreachable!("checked above");
        };
        let outcome = h.enqueue(egress, frame);
        match &outcome {
            EnqueueOutcome::Accepted => {
                self.try_transmit(
                    PortRef {
                        node: host,
                        port: egress,
                    },
                    sched,
                );
            }
            EnqueueOutcome::Dropped(frame) => {
                self.stats.rejected_frames += 1;
                debug!(?host, frame_id = frame.id, "主机出口队列已满，拒绝数据帧");
            }
        }
        Ok(outcome)
    }

    /// 把数据帧直接交给交换机的某个入端口，等同于帧经链路到达该端口。
    ///
    /// 帧当前所在节点必须是该交换机。缓冲区溢出时返回 `Ok(EnqueueOutcome::Dropped)`。
    pub fn enqueue<S>(
        &mut self,
        ingress: PortRef,
        frame: Frame,
        sched: &mut S,
    ) -> Result<EnqueueOutcome, InjectError>
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let node = self
            .node(ingress.node)
            .ok_or(InjectError::UnknownNode(ingress.node))?;
        if !matches!(node, Node::Switch(_)) {
            return Err(InjectError::NotASwitch(ingress.node));
        }
        if node.port(ingress.port).is_none() {
            return Err(InjectError::PortOutOfRange {
                node: ingress.node,
                port: ingress.port.0,
            });
        }
        if frame.route.is_empty() {
            return Err(InjectError::EmptyRoute(frame.id));
        }
        if frame.at() != Some(ingress.node) {
            return Err(InjectError::RouteMismatch { node: ingress.node });
        }
        let egress = self.check_route(&frame)?;
        Ok(self.admit(ingress, egress, frame, sched))
    }

    /// 绕过发送器直接从端口出口取出一帧（调用方接管该帧）。
    ///
    /// 交换机上会扣减入端口计数，必要时发出 RESUME。
    pub fn try_dequeue<S>(&mut self, at: PortRef, sched: &mut S) -> Option<Frame>
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let i = self.node_index(at.node)?;
        self.nodes()[i].port(at.port)?;
        match self.node_mut_at(i) {
            Node::Host(h) => h.try_dequeue(at.port),
            Node::Switch(sw) => {
                let Dequeued { frame, resume } = sw.try_dequeue(at.port)?;
                if let Some((ingress, signal)) = resume {
                    self.emit_signal(PortRef { node: at.node, port: ingress }, signal, sched);
                }
                Some(frame)
            }
        }
    }

    /// 校验帧从当前位置起的剩余路由，返回当前节点上的出端口
    fn check_route(&self, frame: &Frame) -> Result<PortIndex, InjectError> {
        if frame.priority as usize >= PRIORITY_CLASSES {
            return Err(InjectError::InvalidPriority(frame.priority));
        }
        let rest = frame.route.get(frame.hop..).unwrap_or_default();
        let (&first, &last) = match rest {
            [first, .., last] => (first, last),
            [only] => return Err(InjectError::RouteMismatch { node: *only }),
            [] => return Err(InjectError::EmptyRoute(frame.id)),
        };

        for (pos, pair) in rest.windows(2).enumerate() {
            let (from, to) = (pair[0], pair[1]);
            let node = self.node(from).ok_or(InjectError::UnknownNode(from))?;
            if pos > 0 && !matches!(node, Node::Switch(_)) {
                return Err(InjectError::NotASwitch(from));
            }
            self.node(to).ok_or(InjectError::UnknownNode(to))?;
            node.neighbor_port(to)
                .ok_or(InjectError::NoLinkToward { from, to })?;
        }
        if !matches!(self.node(last), Some(Node::Host(_))) {
            return Err(InjectError::NotAHost(last));
        }

        let next = rest[1];
        self.node(first)
            .and_then(|n| n.neighbor_port(next))
            .ok_or(InjectError::NoLinkToward { from: first, to: next })
    }

    #[tracing::instrument(skip(self, frame, sched), fields(frame_id = frame.id, flow_id = frame.flow_id))]
    fn on_arrival<S>(&mut self, at: PortRef, frame: Frame, sched: &mut S)
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        assert_eq!(
            frame.at(),
            Some(at.node),
            "frame {} arrived at {:?}, which is not on its route",
            frame.id,
            at.node
        );
        let i = self
            .node_index(at.node)
            .unwrap_or_else(|| panic!("unknown node {:?}", at.node));

        let egress = match &self.nodes()[i] {
            Node::Host(_) => {
                assert!(
                    !frame.has_next(),
                    "frame {} misdelivered to host {:?}",
                    frame.id,
                    at.node
                );
                self.stats.delivered_frames += 1;
                self.stats.delivered_bytes += frame.size_bytes as u64;
                if frame.ecn.is_ce() {
                    self.stats.delivered_ce_frames += 1;
                }
                debug!(host = ?at.node, "✅ 数据帧送达目的主机");
                return;
            }
            Node::Switch(sw) => {
                let next = frame
                    .next()
                    .unwrap_or_else(|| panic!("frame {} ends at switch {:?}", frame.id, at.node));
                sw.neighbor_port(next).unwrap_or_else(|| {
                    panic!("switch {:?} has no port toward {:?}", at.node, next)
                })
            }
        };
        debug!(?at, ?egress, "🔀 交换机收到数据帧");
        self.admit(at, egress, frame, sched);
    }

    /// 交换机入口记账并放入出口队列
    fn admit<S>(
        &mut self,
        ingress: PortRef,
        egress: PortIndex,
        frame: Frame,
        sched: &mut S,
    ) -> EnqueueOutcome
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let i = self
            .node_index(ingress.node)
            .unwrap_or_else(|| panic!("unknown node {:?}", ingress.node));
        let Node::Switch(sw) = self.node_mut_at(i) else {
            panic!("node {:?} is not a switch", ingress.node);
        };

        match sw.enqueue(ingress.port, egress, frame) {
            Admission::Accepted(signal) => {
                if let Some(signal) = signal {
                    self.emit_signal(ingress, signal, sched);
                }
                self.try_transmit(
                    PortRef {
                        node: ingress.node,
                        port: egress,
                    },
                    sched,
                );
                EnqueueOutcome::Accepted
            }
            Admission::Dropped { frame, overflow } => {
                self.stats.dropped_frames += 1;
                self.report(
                    sched.now(),
                    Diagnostic::BufferOverflow {
                        port: ingress,
                        priority: overflow.priority,
                        frame_id: frame.id,
                        queue_length: overflow.queue_length,
                        hard_capacity: overflow.hard_capacity,
                    },
                );
                EnqueueOutcome::Dropped(frame)
            }
        }
    }

    /// 端口发送器空闲时取出下一帧开始串行化
    fn try_transmit<S>(&mut self, at: PortRef, sched: &mut S)
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let now = sched.now();
        let i = self
            .node_index(at.node)
            .unwrap_or_else(|| panic!("unknown node {:?}", at.node));
        let port = self.nodes()[i]
            .port(at.port)
            .unwrap_or_else(|| panic!("node {:?} has no port {:?}", at.node, at.port));
        if port.is_tx_busy() {
            trace!(?at, "发送器忙");
            return;
        }
        if !port.pipeline().has_eligible() {
            trace!(?at, "出口无可发送的帧");
            return;
        }
        let Some(wiring) = port.wiring().copied() else {
            return;
        };

        let (frame, resume) = match self.node_mut_at(i) {
            Node::Host(h) => match h.try_dequeue(at.port) {
                Some(frame) => (frame, None),
                None => return,
            },
            Node::Switch(sw) => match sw.try_dequeue(at.port) {
                Some(Dequeued { frame, resume }) => (frame, resume),
                None => return,
            },
        };
        debug_assert_eq!(frame.next(), Some(wiring.peer.node));
        self.port_mut(at).set_tx_busy(true);

        let Some(link) = self.link(wiring.link) else {
            panic!("port {at:?} is wired to missing link {:?}", wiring.link);
        };
        let depart = now.saturating_add(link.tx_time(frame.size_bytes));
        let arrive = depart.saturating_add(link.latency);
        trace!(?at, frame_id = frame.id, ?depart, ?arrive, "🚀 开始发送数据帧");

        sched.schedule_at(depart, FabricEvent::Dequeue { at });
        sched.schedule_at(
            arrive,
            FabricEvent::Enqueue {
                at: wiring.peer,
                frame: frame.advance(),
            },
        );

        if let Some((ingress, signal)) = resume {
            self.emit_signal(
                PortRef {
                    node: at.node,
                    port: ingress,
                },
                signal,
                sched,
            );
        }
    }

    /// 执行 PFC 状态机的输出：登记/取消刷新定时器并把 PAUSE 帧发往对端
    fn emit_signal<S>(&mut self, origin: PortRef, signal: PfcSignal, sched: &mut S)
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let now = sched.now();
        let pause = signal.frame();
        let priority = pause.priority;
        let port = self.port_mut(origin);
        let wiring = port.wiring().copied();

        let diag = match signal {
            PfcSignal::Pause(_) | PfcSignal::Refresh(_) => {
                // 未接链路的端口暂停时长为 0，无需刷新
                if wiring.is_some() {
                    let refresh = port.pfc(priority).refresh_interval();
                    let id = sched.schedule_at(
                        now.saturating_add(refresh),
                        FabricEvent::TimerExpiry {
                            at: origin,
                            priority,
                            timer: PfcTimer::Refresh,
                        },
                    );
                    if let Some(old) = port.pfc_mut(priority).arm_timer(id) {
                        sched.cancel(old);
                    }
                }
                if matches!(signal, PfcSignal::Pause(_)) {
                    self.stats.pause_frames_sent += 1;
                    Diagnostic::PauseSent {
                        port: origin,
                        priority,
                        duration: pause.duration,
                    }
                } else {
                    self.stats.pause_refreshes_sent += 1;
                    Diagnostic::PauseRefreshed {
                        port: origin,
                        priority,
                        duration: pause.duration,
                    }
                }
            }
            PfcSignal::Resume(_) => {
                if let Some(old) = port.pfc_mut(priority).take_timer() {
                    sched.cancel(old);
                }
                self.stats.resume_frames_sent += 1;
                Diagnostic::ResumeSent {
                    port: origin,
                    priority,
                }
            }
        };
        self.report(now, diag);

        let Some(wiring) = wiring else {
            return;
        };
        let Some(link) = self.link(wiring.link) else {
            panic!("port {origin:?} is wired to missing link {:?}", wiring.link);
        };
        let arrive = now
            .saturating_add(link.tx_time(PFC_FRAME_BYTES))
            .saturating_add(link.latency);
        sched.schedule_at(
            arrive,
            FabricEvent::PauseFrameReceived {
                at: wiring.peer,
                frame: pause,
            },
        );
    }

    fn on_refresh_timer<S>(&mut self, at: PortRef, priority: u8, sched: &mut S)
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let pfc = self.port_mut(at).pfc_mut(priority);
        let was_paused = pfc.is_paused();
        match pfc.on_timer_expiry() {
            Some(signal) => self.emit_signal(at, signal, sched),
            None if was_paused => {
                self.report(sched.now(), Diagnostic::PauseLapsed { port: at, priority })
            }
            None => {}
        }
    }

    /// 收到对端 PAUSE：时长为 0 立即恢复，否则暂停对应优先级直到过期
    fn on_pause_frame<S>(&mut self, at: PortRef, frame: PauseFrame, sched: &mut S)
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let priority = frame.priority;
        if priority as usize >= PRIORITY_CLASSES {
            warn!(?at, priority, "忽略优先级越界的 PAUSE 帧");
            return;
        }
        let now = sched.now();
        let port = self.port_mut(at);

        if frame.is_resume() {
            if let Some(old) = port.take_egress_timer(priority) {
                sched.cancel(old);
            }
            port.pipeline_mut().set_paused(priority, false);
            self.report(
                now,
                Diagnostic::EgressResumed {
                    port: at,
                    priority,
                    expired: false,
                },
            );
            self.try_transmit(at, sched);
        } else {
            port.pipeline_mut().set_paused(priority, true);
            let id = sched.schedule_at(
                now.saturating_add(frame.duration),
                FabricEvent::TimerExpiry {
                    at,
                    priority,
                    timer: PfcTimer::Expiry,
                },
            );
            if let Some(old) = port.arm_egress_timer(priority, id) {
                sched.cancel(old);
            }
            self.report(
                now,
                Diagnostic::EgressPaused {
                    port: at,
                    priority,
                    duration: frame.duration,
                },
            );
        }
    }

    fn on_pause_expired<S>(&mut self, at: PortRef, priority: u8, sched: &mut S)
    where
        S: Scheduler<FabricEvent> + ?Sized,
    {
        let port = self.port_mut(at);
        // 显式 RESUME 或新的 PAUSE 会取消旧定时器，到期的只能是当前登记的那个
        debug_assert!(port.egress_timer(priority).is_some());
        port.take_egress_timer(priority);
        port.pipeline_mut().set_paused(priority, false);
        self.report(
            sched.now(),
            Diagnostic::EgressResumed {
                port: at,
                priority,
                expired: true,
            },
        );
        self.try_transmit(at, sched);
    }

    fn report(&mut self, at: SimTime, event: Diagnostic) {
        self.sink.record(at, &event);
    }
}
