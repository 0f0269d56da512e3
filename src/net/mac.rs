//! MAC 地址分配
//!
//! 构建拓扑时按节点声明顺序、端口顺序依次分配，保证同一描述总得到相同地址。

use std::fmt;

/// 48 位 MAC 地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    fn from_u64(v: u64) -> Self {
        let b = v.to_be_bytes();
        MacAddr([b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    pub fn as_u64(&self) -> u64 {
        self.0
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// 顺序分配器，从 00:00:00:00:00:01 开始
#[derive(Debug, Clone)]
pub struct MacAllocator {
    next: u64,
}

impl Default for MacAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl MacAllocator {
    pub fn allocate(&mut self) -> MacAddr {
        let mac = MacAddr::from_u64(self.next);
        // 48 位空间足够，溢出时回绕到 1
        self.next = (self.next + 1) & 0xffff_ffff_ffff;
        if self.next == 0 {
            self.next = 1;
        }
        mac
    }
}
