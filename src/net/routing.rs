//! 路由（含 ECMP）支持
//!
//! 拓扑构建后一次性计算“按最短跳数”的路由表：为每个 (from, dst) 预计算所有等价
//! 最短路径的下一跳集合，并按 flow_id 做稳定的 ECMP 选择。
//!
//! 表内使用节点在拓扑中的稠密下标（声明顺序），由 `Topology` 负责与 `NodeId` 互转。

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    /// (from, dst) -> 多个等价最短路径下一跳
    next_hops: HashMap<(usize, usize), Vec<usize>>,
    /// 用于 ECMP hashing 的盐（来自构建参数中的种子）
    hash_salt: u64,
}

impl RoutingTable {
    /// `adj[v]` 为节点 v 的邻居（链路全双工，无需反向图）；
    /// `transit[v]` 为 false 的节点（主机）只能作为路径端点，不能被穿越。
    pub fn compute(adj: &[Vec<usize>], transit: &[bool], hash_salt: u64) -> Self {
        let n = adj.len();
        let mut next_hops = HashMap::new();

        // 对每个 dst 做 BFS 得到最短跳数 dist[*]，
        // 再对每个 from 选出所有满足 dist[next] = dist[from] - 1 的 next 作为 ECMP 候选。
        let mut dist: Vec<u32> = vec![u32::MAX; n];
        let mut q: VecDeque<usize> = VecDeque::new();

        for dst in 0..n {
            dist.fill(u32::MAX);
            q.clear();
            dist[dst] = 0;
            q.push_back(dst);

            while let Some(v) = q.pop_front() {
                if v != dst && !transit[v] {
                    continue;
                }
                let dv = dist[v];
                for &u in &adj[v] {
                    if dist[u] == u32::MAX {
                        dist[u] = dv + 1;
                        q.push_back(u);
                    }
                }
            }

            for from in 0..n {
                let df = dist[from];
                if from == dst || df == u32::MAX {
                    continue;
                }
                let mut cands: Vec<usize> = adj[from]
                    .iter()
                    .copied()
                    .filter(|&nh| dist[nh] == df - 1 && (nh == dst || transit[nh]))
                    .collect();
                cands.sort_unstable();
                cands.dedup();
                if !cands.is_empty() {
                    next_hops.insert((from, dst), cands);
                }
            }
        }

        Self {
            next_hops,
            hash_salt,
        }
    }

    /// 获取 (from, dst) 的 ECMP 下一跳候选集合。
    pub fn next_hops(&self, from: usize, dst: usize) -> Option<&[usize]> {
        self.next_hops.get(&(from, dst)).map(|v| v.as_slice())
    }

    /// 基于 flow_id 的稳定 ECMP 选择。
    pub fn pick_ecmp(&self, from: usize, dst: usize, flow_id: u64) -> Option<usize> {
        let cands = self.next_hops(from, dst)?;
        let h = mix64(
            flow_id ^ (from as u64).wrapping_mul(0x9E3779B97F4A7C15) ^ (dst as u64) ^ self.hash_salt,
        );
        Some(cands[(h as usize) % cands.len()])
    }
}

/// 一个简单、确定性的 64-bit mixing（替代 RandomState，避免每次运行 hash 不稳定）。
pub(crate) fn mix64(mut x: u64) -> u64 {
    // splitmix64
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
