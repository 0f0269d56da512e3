//! 类间调度策略
//!
//! 出口在多个非空、未暂停的优先级队列之间选择下一个服务对象。优先级数值越大越优先。

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// 类间调度器
pub trait ClassScheduler: Debug + Send {
    /// `eligible[i]` 表示优先级 i 当前可被服务（非空且未暂停）。
    /// 没有可服务的优先级时返回 None。
    fn pick(&mut self, eligible: &[bool]) -> Option<usize>;
}

/// 严格优先级，可选防饿死上限
#[derive(Debug, Clone)]
pub struct StrictPriority {
    starvation_limit: Option<u32>,
    /// 低优先级等待期间最高优先级连续被服务的次数
    streak: u32,
    rotor: usize,
}

impl StrictPriority {
    pub fn new(starvation_limit: Option<u32>) -> Self {
        Self {
            starvation_limit,
            streak: 0,
            rotor: 0,
        }
    }
}

impl ClassScheduler for StrictPriority {
    fn pick(&mut self, eligible: &[bool]) -> Option<usize> {
        let top = eligible.iter().rposition(|&e| e)?;
        let lower_waiting = eligible[..top].iter().any(|&e| e);
        if !lower_waiting {
            self.streak = 0;
            return Some(top);
        }

        if let Some(limit) = self.starvation_limit
            && self.streak >= limit
        {
            // 轮流照顾被压住的低优先级
            for i in 0..top {
                let c = (self.rotor + i) % top;
                if eligible[c] {
                    self.rotor = c + 1;
                    self.streak = 0;
                    return Some(c);
                }
            }
        }

        self.streak = self.streak.saturating_add(1);
        Some(top)
    }
}

/// 逐帧轮转，从最高优先级开始
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    next: Option<usize>,
}

impl ClassScheduler for RoundRobin {
    fn pick(&mut self, eligible: &[bool]) -> Option<usize> {
        let n = eligible.len();
        if n == 0 {
            return None;
        }
        let start = self.next.unwrap_or(n - 1) % n;
        for i in 0..n {
            let c = (start + n - i) % n;
            if eligible[c] {
                self.next = Some((c + n - 1) % n);
                return Some(c);
            }
        }
        None
    }
}

/// 加权轮转：每轮给优先级 i 最多 `weights[i]` 帧的服务额度
#[derive(Debug, Clone)]
pub struct WeightedRoundRobin {
    weights: Vec<u32>,
    credits: u32,
    cursor: Option<usize>,
}

impl WeightedRoundRobin {
    /// 缺省或为 0 的权重按 1 处理
    pub fn new(weights: Vec<u32>) -> Self {
        Self {
            weights,
            credits: 0,
            cursor: None,
        }
    }

    fn weight(&self, class: usize) -> u32 {
        self.weights.get(class).copied().unwrap_or(1).max(1)
    }
}

impl ClassScheduler for WeightedRoundRobin {
    fn pick(&mut self, eligible: &[bool]) -> Option<usize> {
        let n = eligible.len();
        if n == 0 {
            return None;
        }

        if let Some(cur) = self.cursor
            && cur < n
            && eligible[cur]
            && self.credits > 0
        {
            self.credits -= 1;
            return Some(cur);
        }

        let (start, skip) = match self.cursor {
            Some(cur) => (cur % n, 1),
            None => (n - 1, 0),
        };
        for i in skip..skip + n {
            let c = (start + n - (i % n)) % n;
            if eligible[c] {
                self.cursor = Some(c);
                self.credits = self.weight(c) - 1;
                return Some(c);
            }
        }
        None
    }
}

fn default_starvation_limit() -> Option<u32> {
    Some(64)
}

/// 可序列化的调度策略配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulingPolicy {
    StrictPriority {
        #[serde(default = "default_starvation_limit")]
        starvation_limit: Option<u32>,
    },
    RoundRobin,
    WeightedRoundRobin {
        weights: Vec<u32>,
    },
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        SchedulingPolicy::StrictPriority {
            starvation_limit: default_starvation_limit(),
        }
    }
}

impl SchedulingPolicy {
    pub fn build(&self) -> Box<dyn ClassScheduler> {
        match self {
            SchedulingPolicy::StrictPriority { starvation_limit } => {
                Box::new(StrictPriority::new(*starvation_limit))
            }
            SchedulingPolicy::RoundRobin => Box::new(RoundRobin::default()),
            SchedulingPolicy::WeightedRoundRobin { weights } => {
                Box::new(WeightedRoundRobin::new(weights.clone()))
            }
        }
    }
}
