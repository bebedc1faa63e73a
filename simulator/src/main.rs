//! The simulation driver (component H): wires every other crate together,
//! builds the node population and topology, pumps the event queue until the
//! configured block height is reached, and flushes the propagation observer
//! to an output file.

use blocksim_config::{build_topology, default_network_model, resolve_consensus, SimConfig};
use blocksim_core::{run_until, SimError, SimRng};
use blocksim_node::tasks::schedule_initial_mining_task;
use blocksim_node::{Node, SimContext};
use blocksim_observer::PropagationObserver;
use chrono::Local;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "blocksim", version, about = "Discrete-event blockchain block-propagation simulator")]
struct Args {
    /// Path to a TOML configuration file (§6's external-interface table).
    #[arg(short, long, default_value = "blocksim.toml")]
    config: PathBuf,

    /// log4rs level filter, e.g. "info", "debug", "trace".
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    blocksim_core::log::try_init_logger(&args.log_level);
    log::info!("blocksim {} starting with config {}", env!("CARGO_PKG_VERSION"), args.config.display());

    match run(&args) {
        Ok(output_path) => {
            log::info!("propagation log written to {}", output_path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<PathBuf, SimError> {
    let config = SimConfig::load(&args.config)?;

    let mut rng = SimRng::from_seed(config.seed);
    let topology = build_topology(&config.table, config.num_of_nodes, config.topology_degree, &mut rng)?;

    let output_path = output_path(&config);
    let file = File::create(&output_path)?;
    let observer = PropagationObserver::with_window(config.observer_window, file);

    let network = default_network_model();
    let consensus = resolve_consensus(&config.algo, config.pow_params())?;
    let protocol = config.protocol_params();

    let mut ctx = SimContext::new(rng, network, consensus, observer, protocol);

    // A single shared genesis: every node's `known_blocks` must agree on its
    // id from the start, or the first real block any producer mines would
    // reference a parent no other node has ever heard of and be orphaned
    // forever instead of propagating.
    let genesis_id = ctx.alloc_block_id();
    let genesis = ctx.consensus().genesis_block(genesis_id, 0, 0);

    for node_id in 0..config.num_of_nodes {
        let (region, mining_power, use_cbr, is_churn) = {
            let (network, rng) = ctx.network_and_rng_mut();
            let region = network.sample_region(rng);
            let mining_power = rng.truncated_normal(config.average_mining_power, config.stdev_of_mining_power, 1.0).floor() as u64;
            let use_cbr = rng.bernoulli(config.cbr_usage_rate);
            let is_churn = rng.bernoulli(config.churn_node_rate);
            (region, mining_power, use_cbr, is_churn)
        };
        ctx.push_node(Node::new(node_id, region, mining_power, use_cbr, is_churn, genesis.clone()));
    }

    for (node_id, neighbors) in topology.into_iter().enumerate() {
        ctx.node_mut(node_id as u32).set_neighbors(neighbors);
    }

    for node_id in 0..config.num_of_nodes {
        schedule_initial_mining_task(&mut ctx, node_id);
    }

    log::info!("running {} nodes toward height {}", config.num_of_nodes, config.end_block_height);
    let end_height = config.end_block_height;
    run_until(&mut ctx, |ctx| ctx.max_tip_height() >= end_height);
    log::info!("reached height {} after virtual time {}ms", ctx.max_tip_height(), ctx.current_time());

    ctx.observer_mut().flush_all()?;
    Ok(output_path)
}

/// `latency_<ISO-8601-local-timestamp>.txt`, written under the configured
/// output directory. Colons are not valid in Windows file names and are
/// awkward even on Unix shells, so the timestamp uses `-` in place of `:`
/// while keeping the rest of the ISO-8601 layout.
fn output_path(config: &SimConfig) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
    PathBuf::from(&config.output_dir).join(format!("latency_{timestamp}.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("blocksim-test-{name}-{}.toml", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    fn args_for(config_path: PathBuf) -> Args {
        Args { config: config_path, log_level: "error".to_string() }
    }

    fn read_to_string(path: &PathBuf) -> String {
        let mut file = File::open(path).unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        contents
    }

    #[test]
    fn two_runs_with_the_same_seed_produce_identical_output() {
        let body = format!("num_of_nodes = 8\nend_block_height = 12\nseed = 42\noutput_dir = \"{}\"\n", std::env::temp_dir().display());
        let config_a = write_config("determinism-a", &body);
        let config_b = write_config("determinism-b", &body);

        let output_a = run(&args_for(config_a.clone())).unwrap();
        let output_b = run(&args_for(config_b.clone())).unwrap();

        assert_eq!(read_to_string(&output_a), read_to_string(&output_b));

        std::fs::remove_file(&config_a).ok();
        std::fs::remove_file(&config_b).ok();
        std::fs::remove_file(&output_a).ok();
        std::fs::remove_file(&output_b).ok();
    }

    #[test]
    fn missing_required_field_is_a_fatal_config_error() {
        let config_path = write_config("missing-field", "end_block_height = 5\n");
        let err = run(&args_for(config_path.clone())).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
        std::fs::remove_file(&config_path).ok();
    }

    #[test]
    fn single_node_with_no_neighbors_produces_an_empty_output_file() {
        let body = format!("num_of_nodes = 1\nend_block_height = 5\noutput_dir = \"{}\"\n", std::env::temp_dir().display());
        let config_path = write_config("single-node", &body);
        let output = run(&args_for(config_path.clone())).unwrap();
        assert_eq!(read_to_string(&output), "");
        std::fs::remove_file(&config_path).ok();
        std::fs::remove_file(&output).ok();
    }
}
