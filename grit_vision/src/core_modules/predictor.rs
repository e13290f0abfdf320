// THEORY:
// The `predictor` module is the seam between the demo and the model. The
// driver only needs "decoded image in, instances out", so that is the whole
// trait. The concrete backend is picked by `build_predictor` from the frozen
// configuration; tests plug in their own implementations.

use crate::core_modules::config::FrozenConfig;
use crate::core_modules::error::GritResult;
use crate::core_modules::image_frame::ImageFrame;
use crate::core_modules::prediction::Prediction;

/// The model seen from the outside: one image in, its instances out.
pub trait Predictor {
    fn run_on_image(&mut self, image: &ImageFrame) -> GritResult<Prediction>;
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn run_on_image(&mut self, image: &ImageFrame) -> GritResult<Prediction> {
        (**self).run_on_image(image)
    }
}

/// Builds the predictor the configuration asks for.
#[cfg(feature = "onnx")]
pub fn build_predictor(cfg: &FrozenConfig) -> GritResult<Box<dyn Predictor>> {
    let predictor = crate::core_modules::onnx_predictor::OnnxPredictor::new(cfg.clone())?;
    Ok(Box::new(predictor))
}

#[cfg(not(feature = "onnx"))]
pub fn build_predictor(cfg: &FrozenConfig) -> GritResult<Box<dyn Predictor>> {
    Err(crate::core_modules::error::GritError::config(format!(
        "cannot load {}: grit_vision was built without the `onnx` feature",
        cfg.model.weights
    )))
}
