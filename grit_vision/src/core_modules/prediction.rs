// THEORY:
// The `prediction` module holds the model's answer for one image in plain
// data: boxes in source pixels, a score and the generated descriptions per
// instance, in detection order. It is built by a predictor, read by a sink and
// dropped at the end of the iteration.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// The box as the flat `[x1, y1, x2, y2]` list written to JSON.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Scales both corners and clamps them into a `width` x `height` image.
    pub fn scaled_and_clamped(&self, scale: f32, width: u32, height: u32) -> Self {
        let max_x = width as f32;
        let max_y = height as f32;
        Self {
            x1: (self.x1 * scale).clamp(0.0, max_x),
            y1: (self.y1 * scale).clamp(0.0, max_y),
            x2: (self.x2 * scale).clamp(0.0, max_x),
            y2: (self.y2 * scale).clamp(0.0, max_y),
        }
    }
}

/// One detected region and what the model said about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub bbox: BoundingBox,
    pub score: f32,
    /// Generated descriptions, possibly none.
    pub descriptions: Vec<String>,
}

impl Instance {
    pub fn new(bbox: BoundingBox, score: f32, description: impl Into<String>) -> Self {
        Self {
            bbox,
            score,
            descriptions: vec![description.into()],
        }
    }
}

/// Everything the predictor returned for a single image, in detection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prediction {
    pub instances: Vec<Instance>,
}

impl Prediction {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// `(description, box)` pairs in detection order. An instance with several
    /// descriptions yields its box once per description.
    pub fn description_boxes(&self) -> impl Iterator<Item = (&str, &BoundingBox)> {
        self.instances.iter().flat_map(|instance| {
            instance
                .descriptions
                .iter()
                .map(move |text| (text.as_str(), &instance.bbox))
        })
    }
}
