// THEORY:
// A sink is the last stop for a processed image. The run picks exactly one sink
// at start-up and keeps it until the end:
// 1.  **File Mode** (`JsonSink`): every image becomes one JSON document in the
//     output directory. It never asks the driver to stop. Two inputs that
//     would land on the same output file (`a.png` and `a.jpg`) are an error
//     rather than a silent overwrite.
// 2.  **Interactive Mode**: the annotated image is shown in a window and the
//     user decides whether to go on. That sink needs a GUI toolkit, so it lives
//     with the binary and only implements the `OutputSink` trait defined here.

use crate::core_modules::error::{GritError, GritResult};
use crate::core_modules::image_frame::ImageFrame;
use crate::core_modules::output_record::{OutputRecord, json_path_for};
use crate::core_modules::prediction::Prediction;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the driver should do after a sink has handled an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Consumes one image's prediction and produces exactly one artifact for it.
pub trait OutputSink {
    fn emit(&mut self, source: &Path, image: &ImageFrame, prediction: &Prediction) -> GritResult<Flow>;
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn emit(&mut self, source: &Path, image: &ImageFrame, prediction: &Prediction) -> GritResult<Flow> {
        (**self).emit(source, image, prediction)
    }
}

/// The two mutually exclusive output modes, chosen once from `--output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMode {
    Json { output_dir: PathBuf },
    Interactive,
}

impl SinkMode {
    pub fn from_output(output: Option<&Path>) -> Self {
        match output {
            Some(dir) => SinkMode::Json {
                output_dir: dir.to_path_buf(),
            },
            None => SinkMode::Interactive,
        }
    }
}

/// Writes `<output_dir>/<image base name>.json` per image.
#[derive(Debug)]
pub struct JsonSink {
    output_dir: PathBuf,
    written: usize,
    /// Output file -> the input it was written for.
    claimed: HashMap<PathBuf, PathBuf>,
}

impl JsonSink {
    /// Creates the output directory (and parents) if needed. An existing
    /// directory is reused; an existing file in its place is an error.
    pub fn new(output_dir: impl Into<PathBuf>) -> GritResult<Self> {
        let output_dir = output_dir.into();
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(GritError::config(format!(
                "output {} exists and is not a directory",
                output_dir.display()
            )));
        }
        fs::create_dir_all(&output_dir).map_err(|e| GritError::io(&output_dir, e))?;
        Ok(Self {
            output_dir,
            written: 0,
            claimed: HashMap::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of JSON files written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl OutputSink for JsonSink {
    fn emit(&mut self, source: &Path, _image: &ImageFrame, prediction: &Prediction) -> GritResult<Flow> {
        let out_path = json_path_for(&self.output_dir, source)?;
        if let Some(earlier) = self.claimed.get(&out_path) {
            return Err(GritError::input(format!(
                "{} and {} both map to {}",
                earlier.display(),
                source.display(),
                out_path.display()
            )));
        }
        let body = OutputRecord::from_prediction(prediction).to_json()?;
        fs::write(&out_path, body).map_err(|e| GritError::io(&out_path, e))?;
        self.written += 1;
        self.claimed.insert(out_path.clone(), source.to_path_buf());
        debug!(path = %out_path.display(), "wrote output record");
        Ok(Flow::Continue)
    }
}
