//! tmorch entry point.
//!
//! Applies a TOML hierarchy description to an in-memory traffic manager
//! device and prints the resulting hierarchy as JSON. Useful to validate a
//! hierarchy before it is pushed to a real port.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use sonic_tm_device::{DeviceContext, IfIndex, NodeId, SimDevice, StaticResolver};
use sonic_tmorch::audit::{init_logging, LogFormat};
use sonic_tmorch::{
    error_log, info_log, HierarchyFile, HierarchySnapshot, NodeStats, TmError, TmOps, TmSystem,
};

/// SONiC Traffic Manager hierarchy controller
#[derive(Parser, Debug)]
#[command(name = "tmorch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hierarchy description (TOML)
    #[arg(short = 'c', long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Read the counters of every node after applying the hierarchy
    #[arg(long)]
    stats: bool,
}

#[derive(Serialize)]
struct Report {
    hierarchy: HierarchySnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_stats: Option<BTreeMap<u32, NodeStats>>,
}

const PORT: IfIndex = IfIndex::new(0);

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args.log_level, args.log_format);

    let file = match HierarchyFile::load(&args.config) {
        Ok(file) => file,
        Err(e) => {
            error_log!("tmorch", error = %e, "Failed to load hierarchy");
            eprintln!("tmorch: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match apply(&file, args.stats) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("tmorch: failed to serialize report: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error_log!("tmorch", kind = %e.kind(), error = %e, "Failed to apply hierarchy");
            eprintln!("tmorch: {}: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

fn apply(file: &HierarchyFile, read_stats: bool) -> Result<Report, TmError> {
    let device = Arc::new(SimDevice::new(file.device.tx_queues));
    let mut resolver = StaticResolver::new();
    resolver.insert(
        PORT,
        DeviceContext::new(file.device.name.clone(), file.device.tx_queues, device),
    );
    let mut system = TmSystem::new(Arc::new(resolver), file.orch.clone());

    info_log!(
        "tmorch",
        device = %file.device.name,
        profiles = file.profiles.len(),
        nodes = file.nodes.len(),
        "Applying hierarchy"
    );

    for profile in &file.profiles {
        system.shaper_profile_create(PORT, &profile.to_params())?;
    }
    for node in &file.nodes {
        system.node_add(PORT, &node.to_params())?;
    }
    if file.start {
        system.start_tm(PORT)?;
    }

    let node_stats = if read_stats {
        let mut stats = BTreeMap::new();
        for node in &file.nodes {
            let counters = system.node_read_stats(PORT, NodeId::new(node.id))?;
            stats.insert(node.id, counters);
        }
        Some(stats)
    } else {
        None
    };

    let hierarchy = system
        .snapshot(PORT)
        .ok_or_else(|| TmError::internal("no hierarchy was built"))?;
    Ok(Report {
        hierarchy,
        node_stats,
    })
}
