//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：节点（主机、交换机）、端口、链路、数据帧与路由。

// 子模块声明
mod diag;
mod frame;
mod host;
mod id;
mod link;
mod mac;
mod node;
mod port;
mod routing;
mod stats;
mod switch;

// 重新导出公共接口
pub use diag::{Diagnostic, DiagnosticLog, DiagnosticSink, TracingSink};
pub use frame::{Ecn, Frame};
pub use host::{Host, HostConfig};
pub use id::{LinkId, NodeId, PortIndex, PortRef};
pub use link::Link;
pub use mac::{MacAddr, MacAllocator};
pub use node::Node;
pub use port::{Port, PortWiring};
pub(crate) use routing::mix64;
pub use routing::RoutingTable;
pub use stats::Stats;
pub use switch::{Admission, Dequeued, PortConfig, Switch, SwitchConfig};
