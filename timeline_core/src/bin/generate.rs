use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use timeline_core::{build_generation_app, run_generation, InputBundle, InputPaths, ValueTimeline};
use timeline_schema::{encode_export, TimelineExport};

const TARGET: &str = "value_timeline::cli";

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate value timelines for a scenario", long_about = None)]
struct Cli {
    /// Region table JSON. Overrides VALUE_REGION_TABLE_PATH.
    #[arg(long)]
    regions: Option<PathBuf>,
    /// Sensor catalog JSON. Overrides VALUE_SENSOR_CATALOG_PATH.
    #[arg(long)]
    sensors: Option<PathBuf>,
    /// Crisis area JSON. Overrides VALUE_CRISIS_CONFIG_PATH.
    #[arg(long)]
    crises: Option<PathBuf>,
    /// Requirement deck JSON. Overrides VALUE_REQUIREMENT_DECK_PATH.
    #[arg(long)]
    deck: Option<PathBuf>,
    /// Scenario JSON. Overrides VALUE_SCENARIO_PATH.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Write the bincode export for the allocation optimizer here.
    #[arg(long)]
    export: Option<PathBuf>,
    /// Print one JSON record per line instead of the text report.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn input_paths(&self) -> InputPaths {
        InputPaths {
            region_table: self.regions.clone(),
            sensor_catalog: self.sensors.clone(),
            crisis_config: self.crises.clone(),
            requirement_deck: self.deck.clone(),
            scenario: self.scenario.clone(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: TARGET, error = %err, "run.failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let paths = InputPaths::from_env().overridden_by(cli.input_paths());
    let bundle = InputBundle::load(&paths)?;
    let context = Arc::new(bundle.build_context()?);
    let clock = context.scenario.clock;

    let mut app = build_generation_app(Arc::clone(&context));
    let timelines = run_generation(&mut app)?;

    // Nothing is written until every platform has generated.
    let export = TimelineExport::new(
        clock.time_steps,
        clock.step_seconds,
        timelines
            .iter()
            .map(ValueTimeline::to_platform_record)
            .collect(),
    );
    if let Some(path) = &cli.export {
        fs::write(path, encode_export(&export)?)?;
        info!(
            target: TARGET,
            path = %path.display(),
            hash = export.header.hash,
            "export.written"
        );
    }

    for timeline in &timelines {
        info!(
            target: TARGET,
            platform = %timeline.platform,
            user = %timeline.user,
            steps = timeline.len(),
            maximum_score = timeline.maximum_score(),
            "timeline.summary"
        );
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for platform in &export.platforms {
        for record in &platform.records {
            if cli.json {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{}", record.report_line())?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
