use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use trajcore::render::CancelToken;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline trajectory render driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Number of source frames when no workflow is given
    #[arg(long, default_value_t = 4096)]
    frames: usize,
    #[arg(long, default_value_t = 100.0)]
    source_rate: f64,
    /// Bounce sensitivities at this rate instead of the source rate
    #[arg(long)]
    target_rate: Option<f64>,
    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Cancels the job on Ctrl+C; the job notices at its next block boundary.
fn spawn_interrupt_watcher(token: CancelToken) {
    thread::spawn(move || {
        let runtime = match TokioBuilder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!("Ctrl+C handling unavailable: {}", err);
                return;
            }
        };
        runtime.block_on(async {
            if signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling render job");
                token.cancel();
            }
        });
    });
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.frames, args.source_rate, args.target_rate)
    };

    let token = CancelToken::new();
    spawn_interrupt_watcher(token.clone());

    let runner = Runner::new(workflow_config);
    let result = runner.execute(&token)?;

    println!(
        "Render job -> {:?}, blocks {}, frames {}",
        result.outcome, result.metrics.blocks, result.metrics.frames
    );
    for stream in &result.sense {
        println!(
            "  {} -> {}: {} frames, rms {:.4}, peak {:.4}",
            stream.transmitter, stream.receiver, stream.frames, stream.rms, stream.peak
        );
    }
    for change in &result.tracks {
        println!(
            "  {} moved by at most {:.4}",
            change.transmitter, change.max_deviation
        );
    }

    if let Some(report_path) = args.report {
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let report = serde_json::to_string_pretty(&result).context("serializing report")?;
        fs::write(&report_path, report)
            .with_context(|| format!("writing report {}", report_path.display()))?;
    }

    Ok(())
}
