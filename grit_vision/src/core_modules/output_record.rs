// THEORY:
// The `output_record` module shapes a `Prediction` into the JSON document file
// mode writes: description text mapped to every box it was generated for.
// Keys keep the order they were first seen in and a recurring description
// accumulates boxes instead of overwriting them, so the serializer walks an
// ordered list of pairs rather than a hash map.

use crate::core_modules::error::{GritError, GritResult};
use crate::core_modules::prediction::Prediction;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::{Path, PathBuf};

/// Description text mapped to every box that produced it, for one image.
/// Keys keep first-seen order; boxes keep detection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRecord {
    entries: Vec<(String, Vec<[f32; 4]>)>,
}

impl OutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_prediction(prediction: &Prediction) -> Self {
        let mut record = Self::new();
        for (text, bbox) in prediction.description_boxes() {
            record.push(text, bbox.to_array());
        }
        record
    }

    /// Appends a box under `description`; a repeated description accumulates.
    pub fn push(&mut self, description: &str, bbox: [f32; 4]) {
        match self.entries.iter_mut().find(|(text, _)| text == description) {
            Some((_, boxes)) => boxes.push(bbox),
            None => self.entries.push((description.to_string(), vec![bbox])),
        }
    }

    pub fn get(&self, description: &str) -> Option<&[[f32; 4]]> {
        self.entries
            .iter()
            .find(|(text, _)| text == description)
            .map(|(_, boxes)| boxes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> GritResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for OutputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (text, boxes) in &self.entries {
            map.serialize_entry(text, boxes)?;
        }
        map.end()
    }
}

/// `<output_dir>/<input base name>.json`.
pub fn json_path_for(output_dir: &Path, source: &Path) -> GritResult<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| GritError::input(format!("{} has no file name", source.display())))?;
    Ok(output_dir.join(file_name).with_extension("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::prediction::{BoundingBox, Instance};
    use serde_json::json;

    #[test]
    fn same_description_accumulates_in_detection_order() {
        let prediction = Prediction::new(vec![
            Instance::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.9, "cat"),
            Instance::new(BoundingBox::new(5.0, 5.0, 15.0, 15.0), 0.8, "cat"),
            Instance::new(BoundingBox::new(1.0, 1.0, 2.0, 2.0), 0.7, "dog"),
        ]);
        let record = OutputRecord::from_prediction(&prediction);
        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "cat": [[0.0, 0.0, 10.0, 10.0], [5.0, 5.0, 15.0, 15.0]],
                "dog": [[1.0, 1.0, 2.0, 2.0]],
            })
        );
        assert_eq!(record.get("cat").map(|b| b.len()), Some(2));
    }

    #[test]
    fn no_detections_is_empty_object() {
        let record = OutputRecord::from_prediction(&Prediction::default());
        assert!(record.is_empty());
        assert_eq!(record.to_json().unwrap(), "{}");
    }

    #[test]
    fn keys_keep_first_seen_order() {
        let mut record = OutputRecord::new();
        record.push("zebra", [0.0; 4]);
        record.push("apple", [1.0; 4]);
        record.push("zebra", [2.0; 4]);
        let text = record.to_json().unwrap();
        assert!(text.find("zebra").unwrap() < text.find("apple").unwrap());
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn json_path_swaps_extension() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            json_path_for(out, Path::new("/data/images/0001.jpg")).unwrap(),
            PathBuf::from("/tmp/out/0001.json")
        );
        assert_eq!(
            json_path_for(out, Path::new("street.scene.png")).unwrap(),
            PathBuf::from("/tmp/out/street.scene.json")
        );
        assert!(json_path_for(out, Path::new("/")).is_err());
    }
}
