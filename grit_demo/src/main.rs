mod cli;
mod window;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use grit_vision::core_modules::config::FORCED_DEVICE;
use grit_vision::telemetry::init_logging;
use grit_vision::{DemoPipeline, FixedFields, JsonSink, OutputSink, SinkMode, build_predictor, collect_inputs};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

/// Where results go for the whole run.
enum Output {
    Json(JsonSink),
    Window(Box<dyn OutputSink>),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // --- 1. Logging & Argument Parsing ---
    init_logging();
    let args = Args::parse();
    info!("Arguments: {args:?}");
    if args.cpu {
        warn!("--cpu is ignored: MODEL.DEVICE is always {FORCED_DEVICE}");
    }

    // --- 2. Output Sink ---
    // Opened before the model loads.
    let mut output = match SinkMode::from_output(args.output.as_deref()) {
        SinkMode::Json { output_dir } => Output::Json(
            JsonSink::new(&output_dir)
                .with_context(|| format!("cannot use {} as output directory", output_dir.display()))?,
        ),
        SinkMode::Interactive => {
            Output::Window(window::open_window(window::WINDOW_NAME).context("cannot start interactive mode")?)
        }
    };

    // --- 3. Configuration & Model ---
    let fixed = FixedFields {
        confidence_threshold: args.confidence_threshold,
        test_task: args.test_task.clone(),
    };
    let pipeline = DemoPipeline::from_config_file(&args.config_file, args.opts.as_slice(), &fixed, build_predictor)
        .context("failed to set up the GRiT predictor")?;
    debug!("Full config:\n{}", pipeline.config().to_toml_string()?);
    let mut pipeline = pipeline.keep_going(args.keep_going);

    if args.input.is_empty() {
        warn!("no --input given, nothing to do");
        return Ok(());
    }

    // --- 4. Input Expansion ---
    let inputs = collect_inputs(args.input.as_slice()).context("failed to expand --input")?;
    info!(count = inputs.len(), "collected input images");

    // --- 5. Main Processing Loop ---
    let summary = match &mut output {
        Output::Json(sink) => {
            let progress = ProgressBar::new(inputs.len() as u64);
            progress.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                    .progress_chars("#>-"),
            );
            let summary = pipeline.run(&inputs, sink, |_| progress.inc(1))?;
            progress.finish_and_clear();
            info!(
                written = sink.written(),
                output_dir = %sink.output_dir().display(),
                "wrote JSON results"
            );
            summary
        }
        Output::Window(sink) => pipeline.run(&inputs, sink, |_| {})?,
    };

    // --- 6. Summary ---
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        instances = summary.instances,
        stopped_early = summary.stopped_early,
        "done"
    );
    Ok(())
}
