// THEORY:
// The `pipeline` module is the top-level driver of a demo run. It owns the
// predictor and walks the input list strictly one image at a time:
// decode -> predict -> hand to the sink. Nothing carries over from one image to
// the next except the frozen configuration and the predictor itself.
//
// Images are read lazily, so when a sink answers `Flow::Stop` the remaining
// files are never opened.

use crate::core_modules::config::{FixedFields, FrozenConfig, setup_cfg};
use crate::core_modules::error::{GritError, GritResult};
use crate::core_modules::image_frame::{ImageFrame, read_image};
use crate::core_modules::prediction::Prediction;
use crate::core_modules::predictor::Predictor;
use crate::core_modules::sink::{Flow, OutputSink};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// What happened to a single image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub path: PathBuf,
    pub instances: usize,
    /// Time spent inside the predictor.
    pub inference_time: Duration,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub instances: usize,
    /// True when the sink asked to stop before the inputs ran out.
    pub stopped_early: bool,
}

/// Drives a predictor over a list of images.
pub struct DemoPipeline<P: Predictor> {
    predictor: P,
    config: FrozenConfig,
    keep_going: bool,
}

impl<P: Predictor> DemoPipeline<P> {
    /// Assembles the configuration first and only then asks `make_predictor`
    /// for a predictor, so a bad config never reaches model loading.
    pub fn from_config_file<S, F>(
        config_file: &Path,
        opts: &[S],
        fixed: &FixedFields,
        make_predictor: F,
    ) -> GritResult<Self>
    where
        S: AsRef<str>,
        F: FnOnce(&FrozenConfig) -> GritResult<P>,
    {
        let config = setup_cfg(config_file, opts, fixed)?;
        let predictor = make_predictor(&config)?;
        Ok(Self::new(config, predictor))
    }

    pub fn new(config: FrozenConfig, predictor: P) -> Self {
        Self {
            predictor,
            config,
            keep_going: false,
        }
    }

    /// When set, images that cannot be decoded are logged and skipped instead
    /// of aborting the run.
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn config(&self) -> &FrozenConfig {
        &self.config
    }

    /// Decodes one image in the configured channel order and runs the predictor on it.
    pub fn run_on_path(&mut self, path: &Path) -> GritResult<(ImageFrame, Prediction, Duration)> {
        let image = read_image(path, self.config.input.format)?;
        let started = Instant::now();
        let prediction = self.predictor.run_on_image(&image)?;
        Ok((image, prediction, started.elapsed()))
    }

    /// Processes `inputs` in order, stopping early if the sink says so.
    /// `on_image` is called after each image reached the sink.
    pub fn run<S, F>(&mut self, inputs: &[PathBuf], sink: &mut S, mut on_image: F) -> GritResult<RunSummary>
    where
        S: OutputSink + ?Sized,
        F: FnMut(&ImageReport),
    {
        let mut summary = RunSummary::default();
        for path in inputs {
            let (image, prediction, inference_time) = match self.run_on_path(path) {
                Ok(result) => result,
                Err(err @ GritError::Image { .. }) if self.keep_going => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable image");
                    summary.skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let report = ImageReport {
                path: path.clone(),
                instances: prediction.len(),
                inference_time,
            };
            info!(
                "{}: detected {} instances in {:.2}s",
                path.display(),
                report.instances,
                inference_time.as_secs_f64()
            );

            let flow = sink.emit(path, &image, &prediction)?;
            summary.processed += 1;
            summary.instances += report.instances;
            on_image(&report);

            if flow == Flow::Stop {
                summary.stopped_early = summary.processed + summary.skipped < inputs.len();
                info!(processed = summary.processed, "stopped by user");
                break;
            }
        }
        Ok(summary)
    }
}
