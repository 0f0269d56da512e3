//! 基于优先级的流量控制（PFC, IEEE 802.1Qbb）
//!
//! 每个端口、每个优先级独立维护一个暂停/恢复状态机：入口计数越过暂停阈值时向上游
//! 发送 PAUSE，降到恢复阈值时发送零时长 PAUSE（RESUME）。

mod config;
mod frame;
mod state;

pub use config::{PRIORITY_CLASSES, PfcConfig, PfcConfigError};
pub use frame::{PFC_FRAME_BYTES, PauseFrame, QUANTUM_BITS, quanta_to_duration};
pub use state::{BufferOverflow, PfcPhase, PfcSignal, PfcState};
