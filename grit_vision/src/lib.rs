// THEORY:
// This file is the main entry point for the `grit_vision` library crate. It
// exposes the pieces a demo front-end needs: the configuration assembler, the
// `Predictor` seam, the output sinks and the `DemoPipeline` driver that ties
// them together. The binary crate only adds argument parsing and a window.

pub mod core_modules;
pub mod pipeline;
pub mod telemetry;

pub use core_modules::config::{ConfigBuilder, FixedFields, FrozenConfig, GritConfig, setup_cfg};
pub use core_modules::error::{GritError, GritResult};
pub use core_modules::image_frame::{ChannelOrder, ImageFrame, read_image};
pub use core_modules::inputs::collect_inputs;
pub use core_modules::prediction::{BoundingBox, Instance, Prediction};
pub use core_modules::predictor::{Predictor, build_predictor};
pub use core_modules::sink::{Flow, JsonSink, OutputSink, SinkMode};
pub use pipeline::{DemoPipeline, ImageReport, RunSummary};
