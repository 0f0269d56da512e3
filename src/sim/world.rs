//! 世界 trait
//!
//! 仿真器只把世界当作不透明对象传给事件；事件再按具体类型取回自己的状态。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界，例如持有拓扑与统计的 `TopologyWorld`。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每执行完一个事件后调用
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}

impl dyn World {
    /// 按具体类型取回世界；类型不符时返回 `None`
    pub fn downcast_mut<W: World>(&mut self) -> Option<&mut W> {
        self.as_any_mut().downcast_mut::<W>()
    }
}
