//! 拓扑模块
//!
//! 拓扑描述的编解码、由描述构建活动拓扑、拓扑上的事件处理，以及常用拓扑描述。

mod builder;
pub mod codec;
mod descriptor;
mod error;
mod fabric;
pub mod presets;
mod topology;

pub use builder::{BuildOptions, MAX_CAPACITY_GBPS, MAX_PORTS, build};
pub use codec::{decode, encode};
pub use descriptor::{LinkSpec, NodeRole, NodeSpec, TopologyDescriptor};
pub use error::{BuildError, DecodeError, InjectError, LoadError};
pub use fabric::{FabricEvent, PfcTimer, TopologyWorld};
pub use topology::Topology;
