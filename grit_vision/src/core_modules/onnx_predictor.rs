// THEORY:
// The `onnx_predictor` module is the one concrete `Predictor`: an ONNX Runtime
// session over an exported GRiT graph. Everything model-specific stops here;
// the driver only ever sees a `Prediction`.
//
// Graph contract: input `image` (`f32 [1, 3, S, S]`, normalised RGB) and,
// when the export kept it, input `task` (`i64 [1]`). Outputs `boxes`
// (`f32 [N, 4]`, model pixels), `scores` (`f32 [N]`) and `text_ids`
// (`i64 [N, T]`, WordPiece ids from greedy decoding).
//
// Post-processing keeps candidates at or above `SCORE_THRESH_TEST` (a NaN
// score never passes), caps them at `DETECTIONS_PER_IMAGE`, maps boxes back to
// source pixels and decodes each token sequence through the vocabulary.

use crate::core_modules::config::FrozenConfig;
use crate::core_modules::error::{GritError, GritResult};
use crate::core_modules::image_frame::ImageFrame;
use crate::core_modules::prediction::{BoundingBox, Instance, Prediction};
use crate::core_modules::predictor::Predictor;
use crate::core_modules::preprocess::prepare_input;
use crate::core_modules::vocabulary::Vocabulary;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

const IMAGE_INPUT: &str = "image";
const TASK_INPUT: &str = "task";
const BOXES_OUTPUT: &str = "boxes";
const SCORES_OUTPUT: &str = "scores";
const TEXT_OUTPUT: &str = "text_ids";

fn task_id(task: &str) -> GritResult<i64> {
    match task {
        "ObjectDet" => Ok(0),
        "DenseCap" => Ok(1),
        other => Err(GritError::config(format!(
            "unknown MODEL.TEST_TASK {other:?} (expected ObjectDet or DenseCap)"
        ))),
    }
}

/// A candidate survives only with a real score at or above `threshold`.
fn passes_threshold(score: f32, threshold: f32) -> bool {
    score >= threshold
}

pub struct OnnxPredictor {
    session: Session,
    vocabulary: Vocabulary,
    config: FrozenConfig,
    task_id: i64,
    has_task_input: bool,
}

impl OnnxPredictor {
    pub fn new(config: FrozenConfig) -> GritResult<Self> {
        if config.model.weights.is_empty() {
            return Err(GritError::config("MODEL.WEIGHTS is not set"));
        }
        if config.model.text_decoder.vocabulary.is_empty() {
            return Err(GritError::config("MODEL.TEXT_DECODER.VOCABULARY is not set"));
        }
        let task_id = task_id(&config.model.test_task)?;
        let vocabulary = Vocabulary::from_file(Path::new(&config.model.text_decoder.vocabulary))?;

        let mut builder = Session::builder()
            .map_err(|e| GritError::inference(format!("cannot create session builder: {e}")))?;
        if config.model.device.starts_with("cuda") {
            let cuda = CUDAExecutionProvider::default().build();
            match builder.clone().with_execution_providers([cuda]) {
                Ok(with_cuda) => builder = with_cuda,
                Err(e) => warn!(error = %e, "CUDA execution provider unavailable, running on CPU"),
            }
        }
        let session = builder.commit_from_file(&config.model.weights).map_err(|e| {
            GritError::config(format!("cannot load model {}: {e}", config.model.weights))
        })?;
        let has_task_input = session.inputs.iter().any(|input| input.name == TASK_INPUT);

        info!(
            weights = %config.model.weights,
            task = %config.model.test_task,
            vocabulary = vocabulary.len(),
            "loaded GRiT model"
        );
        Ok(Self {
            session,
            vocabulary,
            config,
            task_id,
            has_task_input,
        })
    }
}

impl Predictor for OnnxPredictor {
    fn run_on_image(&mut self, image: &ImageFrame) -> GritResult<Prediction> {
        let started = Instant::now();
        let model = &self.config.model;
        let input = prepare_input(image, self.config.input.max_size_test, model.pixel_mean, model.pixel_std)?;
        let side = input.side as usize;
        let scale = input.scale;

        let image_tensor = Tensor::from_array(([1usize, 3, side, side], input.tensor.into_boxed_slice()))
            .map_err(|e| GritError::inference(format!("cannot build image tensor: {e}")))?;
        let run = if self.has_task_input {
            let task = Tensor::from_array(([1usize], vec![self.task_id].into_boxed_slice()))
                .map_err(|e| GritError::inference(format!("cannot build task tensor: {e}")))?;
            self.session
                .run(ort::inputs![IMAGE_INPUT => image_tensor, TASK_INPUT => task])
        } else {
            self.session.run(ort::inputs![IMAGE_INPUT => image_tensor])
        };
        let outputs = run.map_err(|e| GritError::inference(format!("session run failed: {e}")))?;

        let (_, boxes) = outputs[BOXES_OUTPUT]
            .try_extract_tensor::<f32>()
            .map_err(|e| GritError::inference(format!("bad {BOXES_OUTPUT} output: {e}")))?;
        let (_, scores) = outputs[SCORES_OUTPUT]
            .try_extract_tensor::<f32>()
            .map_err(|e| GritError::inference(format!("bad {SCORES_OUTPUT} output: {e}")))?;
        let (text_shape, text_ids) = outputs[TEXT_OUTPUT]
            .try_extract_tensor::<i64>()
            .map_err(|e| GritError::inference(format!("bad {TEXT_OUTPUT} output: {e}")))?;

        let count = scores.len();
        if boxes.len() != count * 4 {
            return Err(GritError::inference(format!(
                "{count} scores but {} box coordinates",
                boxes.len()
            )));
        }
        let steps = text_shape.get(1).copied().unwrap_or(0).max(0) as usize;
        if text_ids.len() != count * steps {
            return Err(GritError::inference(format!(
                "{count} scores but text_ids has shape {text_shape:?}"
            )));
        }

        let threshold = model.roi_heads.score_thresh_test as f32;
        let max_length = (model.text_decoder.max_length as usize).min(steps);
        let mut instances = Vec::with_capacity(count);
        for i in 0..count {
            if !passes_threshold(scores[i], threshold) {
                continue;
            }
            let b = &boxes[i * 4..i * 4 + 4];
            let bbox = BoundingBox::new(b[0], b[1], b[2], b[3]).scaled_and_clamped(scale, image.width(), image.height());
            let text = self.vocabulary.decode(&text_ids[i * steps..i * steps + max_length]);
            let descriptions = if text.is_empty() { Vec::new() } else { vec![text] };
            instances.push(Instance {
                bbox,
                score: scores[i],
                descriptions,
            });
        }
        instances.truncate(self.config.test.detections_per_image as usize);

        debug!(
            candidates = count,
            kept = instances.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "onnx inference"
        );
        Ok(Prediction::new(instances))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tasks_map_to_ids() {
        assert_eq!(task_id("ObjectDet").unwrap(), 0);
        assert_eq!(task_id("DenseCap").unwrap(), 1);
        assert!(task_id("Captioning").is_err());
    }

    #[test]
    fn threshold_is_inclusive_and_rejects_nan() {
        assert!(passes_threshold(0.4, 0.4));
        assert!(passes_threshold(0.9, 0.4));
        assert!(!passes_threshold(0.39, 0.4));
        assert!(!passes_threshold(f32::NAN, 0.4));
        assert!(!passes_threshold(f32::NAN, f32::NEG_INFINITY));
    }
}
