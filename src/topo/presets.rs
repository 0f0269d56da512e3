//! 常用拓扑描述：dumbbell 与 fat-tree

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::descriptor::{LinkSpec, NodeSpec, TopologyDescriptor};
use crate::net::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetError {
    #[error("fat-tree k must be even and >= 2, got {0}")]
    InvalidK(usize),
    #[error("dumbbell needs at least one host per side")]
    NoHosts,
}

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumbbellOpts {
    pub hosts_per_side: u32,
    pub host_link_gbps: f64,
    pub bottleneck_gbps: f64,
    pub link_latency_ns: u64,
}

impl Default for DumbbellOpts {
    fn default() -> Self {
        Self {
            hosts_per_side: 2,
            host_link_gbps: 100.0,
            bottleneck_gbps: 10.0,
            link_latency_ns: 2_000,
        }
    }
}

/// Dumbbell 描述
///
/// 先声明主机（左侧 0..n，右侧 n..2n），再声明左右两台交换机（2n、2n+1）：
/// 左侧主机 <-> s_left <-> s_right <-> 右侧主机
pub fn dumbbell(opts: &DumbbellOpts) -> Result<TopologyDescriptor, PresetError> {
    let n = opts.hosts_per_side;
    if n == 0 {
        return Err(PresetError::NoHosts);
    }
    let left = 2 * n;
    let right = 2 * n + 1;

    let mut nodes: Vec<NodeSpec> = (0..2 * n).map(|id| NodeSpec::host(id, 1)).collect();
    nodes.push(NodeSpec::switch(left, n + 1));
    nodes.push(NodeSpec::switch(right, n + 1));

    let mut links = Vec::with_capacity(2 * n as usize + 1);
    for h in 0..n {
        links.push(LinkSpec::new(h, left, opts.host_link_gbps, opts.link_latency_ns));
    }
    for h in n..2 * n {
        links.push(LinkSpec::new(h, right, opts.host_link_gbps, opts.link_latency_ns));
    }
    // 瓶颈链路
    links.push(LinkSpec::new(left, right, opts.bottleneck_gbps, opts.link_latency_ns));

    Ok(TopologyDescriptor { nodes, links })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatTreeOpts {
    pub k: usize,
    pub link_gbps: f64,
    pub link_latency_ns: u64,
}

impl Default for FatTreeOpts {
    fn default() -> Self {
        Self {
            k: 4,
            link_gbps: 100.0,
            link_latency_ns: 2_000,
        }
    }
}

/// fat-tree 中各层节点的 id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatTreeLayout {
    pub k: usize,
    pub hosts: Vec<NodeId>,
    pub edge_switches: Vec<NodeId>,
    pub agg_switches: Vec<NodeId>,
    pub core_switches: Vec<NodeId>,
}

impl FatTreeLayout {
    fn half(&self) -> usize {
        self.k / 2
    }

    pub fn host(&self, pod: usize, edge: usize, host: usize) -> NodeId {
        let half = self.half();
        self.hosts[(pod * half + edge) * half + host]
    }

    pub fn edge(&self, pod: usize, edge: usize) -> NodeId {
        self.edge_switches[pod * self.half() + edge]
    }

    pub fn agg(&self, pod: usize, agg: usize) -> NodeId {
        self.agg_switches[pod * self.half() + agg]
    }

    pub fn core(&self, group: usize, index: usize) -> NodeId {
        self.core_switches[group * self.half() + index]
    }
}

/// k 叉 fat-tree 描述：(k/2)^2 台核心交换机，k 个 pod（各 k/2 台边缘与汇聚交换机），
/// 每台边缘交换机下挂 k/2 台主机。所有交换机都有 k 个端口。
pub fn fat_tree(opts: &FatTreeOpts) -> Result<(TopologyDescriptor, FatTreeLayout), PresetError> {
    let k = opts.k;
    if k < 2 || k % 2 != 0 {
        return Err(PresetError::InvalidK(k));
    }
    let half = k / 2;
    let gbps = opts.link_gbps;
    let latency = opts.link_latency_ns;

    let mut next_id = 0u32;
    let mut alloc = || {
        let id = next_id;
        next_id += 1;
        id
    };

    let mut nodes = Vec::new();
    let mut links = Vec::new();

    let mut core_switches = Vec::with_capacity(half * half);
    for _ in 0..half * half {
        let id = alloc();
        nodes.push(NodeSpec::switch(id, k as u32));
        core_switches.push(NodeId(id));
    }

    let mut hosts = Vec::with_capacity(k * half * half);
    let mut edge_switches = Vec::with_capacity(k * half);
    let mut agg_switches = Vec::with_capacity(k * half);

    for _pod in 0..k {
        let edges: Vec<u32> = (0..half).map(|_| alloc()).collect();
        let aggs: Vec<u32> = (0..half).map(|_| alloc()).collect();
        for &id in edges.iter().chain(&aggs) {
            nodes.push(NodeSpec::switch(id, k as u32));
        }

        for &edge in &edges {
            for _ in 0..half {
                let host = alloc();
                nodes.push(NodeSpec::host(host, 1));
                links.push(LinkSpec::new(host, edge, gbps, latency));
                hosts.push(NodeId(host));
            }
        }
        for &edge in &edges {
            for &agg in &aggs {
                links.push(LinkSpec::new(edge, agg, gbps, latency));
            }
        }
        for (a, &agg) in aggs.iter().enumerate() {
            for index in 0..half {
                let core = core_switches[a * half + index];
                links.push(LinkSpec::new(agg, core.0, gbps, latency));
            }
        }

        edge_switches.extend(edges.into_iter().map(NodeId));
        agg_switches.extend(aggs.into_iter().map(NodeId));
    }

    let layout = FatTreeLayout {
        k,
        hosts,
        edge_switches,
        agg_switches,
        core_switches,
    };
    Ok((TopologyDescriptor { nodes, links }, layout))
}
