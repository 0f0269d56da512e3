//! 事件 trait

use super::simulator::Simulator;
use super::world::World;

/// 可被仿真器调度的事件。`self: Box<Self>` 让事件在执行时交出所携带的帧等数据。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);

    /// 日志中显示的事件名
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
