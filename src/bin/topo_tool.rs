//! 拓扑描述工具
//!
//! 生成、转换、检查二进制拓扑描述，并可在拓扑上运行一次 incast 仿真。

use clap::{Parser, Subcommand, ValueEnum};
use dcb_sim::net::{Ecn, Node, NodeId};
use dcb_sim::sim::{SimTime, Simulator};
use dcb_sim::topo::presets::{self, DumbbellOpts, FatTreeOpts};
use dcb_sim::topo::{self, BuildOptions, NodeRole, Topology, TopologyDescriptor, TopologyWorld};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "topo-tool", about = "DCB/PFC 拓扑描述工具")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// JSON 描述 -> 二进制描述
    Encode {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// 二进制描述 -> JSON（写到标准输出）
    Decode {
        #[arg(long)]
        input: PathBuf,
    },
    /// 解码并完整构建，打印拓扑摘要
    Inspect {
        #[arg(long)]
        input: PathBuf,
        /// BuildOptions JSON
        #[arg(long)]
        options: Option<PathBuf>,
    },
    /// 生成常用拓扑描述
    Preset {
        #[arg(value_enum)]
        kind: PresetKind,
        /// fat-tree 的 k
        #[arg(long, default_value_t = 4)]
        k: usize,
        /// dumbbell 每侧主机数
        #[arg(long, default_value_t = 2)]
        hosts_per_side: u32,
        #[arg(long)]
        output: PathBuf,
        /// 输出 JSON 而不是二进制
        #[arg(long)]
        json: bool,
    },
    /// 所有其他主机向第一台主机发送数据帧，打印统计
    Incast {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        options: Option<PathBuf>,
        /// 每台发送主机的帧数
        #[arg(long, default_value_t = 100)]
        frames: u64,
        #[arg(long, default_value_t = 1500)]
        frame_bytes: u32,
        #[arg(long, default_value_t = 3)]
        priority: u8,
        /// 以 ECT(0) 发送，使配置了 ECN 的交换机可以标记
        #[arg(long)]
        ect: bool,
        /// 仿真运行到多少毫秒
        #[arg(long, default_value_t = 100)]
        until_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetKind {
    Dumbbell,
    FatTree,
}

fn read(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("read {}: {e}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), String> {
    fs::write(path, bytes).map_err(|e| format!("write {}: {e}", path.display()))
}

fn load_options(path: Option<&Path>) -> Result<BuildOptions, String> {
    let Some(path) = path else {
        return Ok(BuildOptions::default());
    };
    let raw = read(path)?;
    serde_json::from_slice(&raw).map_err(|e| format!("parse {}: {e}", path.display()))
}

fn load_topology(input: &Path, options: Option<&Path>) -> Result<Topology, String> {
    let opts = load_options(options)?;
    let bytes = read(input)?;
    Topology::from_bytes(&bytes, &opts).map_err(|e| format!("load {}: {e}", input.display()))
}

fn print_summary(topo: &Topology) {
    let hosts = topo
        .nodes()
        .iter()
        .filter(|n| n.role() == NodeRole::Host)
        .count();
    println!(
        "nodes={} hosts={} switches={} links={}",
        topo.nodes().len(),
        hosts,
        topo.nodes().len() - hosts,
        topo.links().len()
    );
    for node in topo.nodes() {
        let role = match node {
            Node::Host(_) => "host",
            Node::Switch(_) => "switch",
        };
        println!("node {} {} ports={}", node.id().0, role, node.ports().len());
        for port in node.ports() {
            match port.peer() {
                Some(peer) => println!(
                    "  port {} mac={} peer={}:{}",
                    port.index().0,
                    port.mac(),
                    peer.node.0,
                    peer.port.0
                ),
                None => println!("  port {} mac={} unconnected", port.index().0, port.mac()),
            }
        }
    }
}

fn run_incast(
    mut topo: Topology,
    frames: u64,
    frame_bytes: u32,
    priority: u8,
    ecn: Ecn,
    until: SimTime,
) -> Result<(), String> {
    let hosts: Vec<NodeId> = topo
        .nodes()
        .iter()
        .filter(|n| n.role() == NodeRole::Host)
        .map(|n| n.id())
        .collect();
    let Some((&dst, senders)) = hosts.split_first() else {
        return Err("topology has no hosts".to_string());
    };

    let mut sim = Simulator::default();
    for (flow, &src) in senders.iter().enumerate() {
        let route = topo
            .route(src, dst, flow as u64)
            .ok_or_else(|| format!("no route from {src:?} to {dst:?}"))?;
        for _ in 0..frames {
            let frame = topo
                .make_frame(flow as u64, frame_bytes, priority, route.clone())
                .with_ecn(ecn);
            topo.inject(src, frame, &mut sim)
                .map_err(|e| format!("inject from {src:?}: {e}"))?;
        }
    }

    let mut world = TopologyWorld::new(topo);
    sim.run_until(until, &mut world);

    let s = &world.topo.stats;
    info!(now = ?sim.now(), "✅ incast 仿真结束");
    println!(
        "delivered_frames={} delivered_bytes={} dropped_frames={} rejected_frames={} pause_frames_sent={} pause_refreshes_sent={} resume_frames_sent={} delivered_ce_frames={}",
        s.delivered_frames,
        s.delivered_bytes,
        s.dropped_frames,
        s.rejected_frames,
        s.pause_frames_sent,
        s.pause_refreshes_sent,
        s.resume_frames_sent,
        s.delivered_ce_frames
    );
    Ok(())
}

fn run(args: Args) -> Result<(), String> {
    match args.cmd {
        Cmd::Encode { input, output } => {
            let raw = read(&input)?;
            let desc: TopologyDescriptor = serde_json::from_slice(&raw)
                .map_err(|e| format!("parse {}: {e}", input.display()))?;
            if let Some((link, node)) = desc.dangling_reference() {
                return Err(format!("link #{link} references undeclared node {}", node.0));
            }
            let bytes = topo::encode(&desc);
            write(&output, &bytes)?;
            info!(output = %output.display(), bytes = bytes.len(), "📦 已写出二进制描述");
        }
        Cmd::Decode { input } => {
            let desc = topo::decode(&read(&input)?)
                .map_err(|e| format!("decode {}: {e}", input.display()))?;
            let json = serde_json::to_string_pretty(&desc).map_err(|e| e.to_string())?;
            println!("{json}");
        }
        Cmd::Inspect { input, options } => {
            let topo = load_topology(&input, options.as_deref())?;
            print_summary(&topo);
        }
        Cmd::Preset {
            kind,
            k,
            hosts_per_side,
            output,
            json,
        } => {
            let desc = match kind {
                PresetKind::Dumbbell => presets::dumbbell(&DumbbellOpts {
                    hosts_per_side,
                    ..DumbbellOpts::default()
                }),
                PresetKind::FatTree => presets::fat_tree(&FatTreeOpts {
                    k,
                    ..FatTreeOpts::default()
                })
                .map(|(desc, _layout)| desc),
            }
            .map_err(|e| e.to_string())?;
            let bytes = if json {
                serde_json::to_vec_pretty(&desc).map_err(|e| e.to_string())?
            } else {
                topo::encode(&desc)
            };
            write(&output, &bytes)?;
            info!(
                output = %output.display(),
                nodes = desc.nodes.len(),
                links = desc.links.len(),
                "🏗️  已生成拓扑描述"
            );
        }
        Cmd::Incast {
            input,
            options,
            frames,
            frame_bytes,
            priority,
            ect,
            until_ms,
        } => {
            let topo = load_topology(&input, options.as_deref())?;
            run_incast(
                topo,
                frames,
                frame_bytes,
                priority,
                if ect { Ecn::Ect0 } else { Ecn::NotEct },
                SimTime::from_millis(until_ms),
            )?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
