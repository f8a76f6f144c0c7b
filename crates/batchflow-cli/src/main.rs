use std::error::Error;
use std::process::ExitCode;

use batchflow_core::domain::JobState;
use batchflow_core::impls::PassthroughAdapter;
use batchflow_core::preset::{BatchFlowPreset, PresetDependency, PresetJobDefinition, PresetVersion};
use batchflow_core::{BatchFlowReplayExecutor, ReplayLog, RunnerBuilder};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Four passthrough jobs in a line: decode -> normalize -> encode -> tag.
fn demo_preset() -> BatchFlowPreset {
    let mut preset = BatchFlowPreset::new(PresetVersion::current(), "demo", "linear passthrough workflow");
    let steps = [
        ("decode", "in.wav", "pcm"),
        ("normalize", "pcm", "pcm.norm"),
        ("encode", "pcm.norm", "out.flac"),
        ("tag", "out.flac", "out.tagged.flac"),
    ];
    for (name, input, output) in steps {
        preset.add_job(
            PresetJobDefinition::new(
                name,
                PassthroughAdapter::ENGINE,
                PassthroughAdapter::OPERATION,
                format!("{{\"step\":\"{name}\"}}"),
            )
            .with_inputs(&[input])
            .with_outputs(&[output]),
        );
    }
    for pair in steps.windows(2) {
        preset.add_dependency(PresetDependency::new(pair[0].0, pair[1].0));
    }
    preset
}

fn load_preset(path: Option<String>) -> Result<BatchFlowPreset, Box<dyn Error>> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(&path)?;
            Ok(BatchFlowPreset::from_json(&json)?)
        }
        None => Ok(demo_preset()),
    }
}

async fn run(path: Option<String>) -> Result<bool, Box<dyn Error>> {
    let preset = load_preset(path)?;
    let plan = preset.compile()?;
    info!(preset = preset.name(), jobs = plan.job_ids.len(), "plan ready");

    let runner = RunnerBuilder::new().with_builtin_adapters().build()?;
    let mut log = ReplayLog::new();
    let report = runner.run_plan(&plan, &mut log).await?;

    // The log is the only thing carried over: replay it against a graph
    // rebuilt from the preset and compare.
    let text = log.serialize();
    print!("{text}");

    let rebuilt = preset.compile()?;
    let replayed = ReplayLog::deserialize(&text)?;
    let executor = BatchFlowReplayExecutor::replay(&rebuilt.graph, replayed.events())?;
    let replay_matches =
        executor.verify_replay_correctness(&report.statuses) && executor.final_tick() == report.final_tick;

    for (name, id) in &plan.job_ids {
        let state = report.statuses.get(id).map(|s| s.state).unwrap_or(JobState::Pending);
        println!("{name:<12} {} {state}", id.short());
    }
    println!("counts: {}", report.counts);
    println!("final tick: {}", report.final_tick);
    println!("replay: {}", if replay_matches { "match" } else { "MISMATCH" });

    Ok(report.is_success() && replay_matches)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("batchflow=info,batchflow_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(std::env::args().nth(1)).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!(error = %err, "batchflow failed");
            ExitCode::from(2)
        }
    }
}
