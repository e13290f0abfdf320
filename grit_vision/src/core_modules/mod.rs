pub mod config;
pub mod error;
pub mod image_frame;
pub mod inputs;
#[cfg(feature = "onnx")]
pub mod onnx_predictor;
pub mod output_record;
pub mod prediction;
pub mod predictor;
pub mod preprocess;
pub mod sink;
pub mod vocabulary;
