// THEORY:
// The `config` module assembles the single run configuration every other stage
// reads. It is a one-way street: values flow in from four sources
// in a fixed order and come out as a frozen, read-only handle.
//
// Key architectural principles:
// 1.  **Layered Merging**: Defaults come first, then a TOML file (which may pull
//     in its own `_BASE_` file), then `KEY VALUE` pairs from the command line,
//     then the handful of fields the demo always pins. Later layers win.
// 2.  **Untyped Until Frozen**: While merging, the configuration lives as a raw
//     TOML table shaped like the defaults. That lets us reject unknown keys and
//     type mismatches with the full dotted key in the message.
// 3.  **Immutable Result**: `freeze` deserializes the table into `GritConfig`,
//     applies the pinned fields and wraps the result in an `Arc`. Nothing can
//     mutate it afterwards.

use crate::core_modules::error::{GritError, GritResult};
use crate::core_modules::image_frame::ChannelOrder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml::{Table, Value};

/// Key a config file uses to inherit from another file.
pub const BASE_KEY: &str = "_BASE_";
/// The device the demo always runs on, whatever the file or `--opts` say.
pub const FORCED_DEVICE: &str = "cuda";

/// The full, typed run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct GritConfig {
    /// Activation checkpointing only matters for training; always off here.
    pub use_act_checkpoint: bool,
    pub model: ModelConfig,
    pub input: InputConfig,
    pub test: TestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct ModelConfig {
    pub meta_architecture: String,
    pub device: String,
    /// Path to the exported model graph. Empty means "not configured".
    pub weights: String,
    /// `ObjectDet` or `DenseCap`.
    pub test_task: String,
    pub beam_size: u32,
    /// Per-channel mean in RGB order, subtracted before inference.
    pub pixel_mean: [f64; 3],
    /// Per-channel standard deviation in RGB order.
    pub pixel_std: [f64; 3],
    pub roi_heads: RoiHeadsConfig,
    pub panoptic_fpn: PanopticFpnConfig,
    pub text_decoder: TextDecoderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct RoiHeadsConfig {
    /// Instances scoring below this are dropped.
    pub score_thresh_test: f64,
    pub nms_thresh_test: f64,
    pub soft_nms_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct PanopticFpnConfig {
    pub combine: CombineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct CombineConfig {
    pub instances_confidence_thresh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct TextDecoderConfig {
    /// One WordPiece token per line; the line number is the token id.
    pub vocabulary: String,
    pub max_length: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct InputConfig {
    /// Channel order images are decoded into before reaching the predictor.
    pub format: ChannelOrder,
    /// Longest image side fed to the model.
    pub max_size_test: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields)]
pub struct TestConfig {
    pub detections_per_image: u32,
}

impl Default for GritConfig {
    fn default() -> Self {
        Self {
            use_act_checkpoint: false,
            model: ModelConfig {
                meta_architecture: "GRiT".to_string(),
                device: FORCED_DEVICE.to_string(),
                weights: String::new(),
                test_task: "DenseCap".to_string(),
                beam_size: 1,
                pixel_mean: [123.675, 116.28, 103.53],
                pixel_std: [58.395, 57.12, 57.375],
                roi_heads: RoiHeadsConfig {
                    score_thresh_test: 0.05,
                    nms_thresh_test: 0.5,
                    soft_nms_enabled: false,
                },
                panoptic_fpn: PanopticFpnConfig {
                    combine: CombineConfig { instances_confidence_thresh: 0.5 },
                },
                text_decoder: TextDecoderConfig {
                    vocabulary: String::new(),
                    max_length: 40,
                },
            },
            input: InputConfig {
                format: ChannelOrder::Bgr,
                max_size_test: 1024,
            },
            test: TestConfig { detections_per_image: 100 },
        }
    }
}

/// The fields the demo pins after all merging, taken from its own flags.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFields {
    pub confidence_threshold: f64,
    /// Empty keeps whatever task the file and overrides selected.
    pub test_task: String,
}

impl Default for FixedFields {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            test_task: String::new(),
        }
    }
}

impl FixedFields {
    /// Applies the pinned fields in their documented order.
    fn apply(&self, config: &mut GritConfig) {
        config.model.device = FORCED_DEVICE.to_string();
        config.model.roi_heads.score_thresh_test = self.confidence_threshold;
        config.model.panoptic_fpn.combine.instances_confidence_thresh = self.confidence_threshold;
        if !self.test_task.is_empty() {
            config.model.test_task = self.test_task.clone();
        }
        config.model.beam_size = 1;
        config.model.roi_heads.soft_nms_enabled = false;
        config.use_act_checkpoint = false;
    }
}

/// A read-only, cheaply clonable handle to the assembled configuration.
#[derive(Debug, Clone)]
pub struct FrozenConfig(Arc<GritConfig>);

impl Deref for FrozenConfig {
    type Target = GritConfig;

    fn deref(&self) -> &GritConfig {
        &self.0
    }
}

impl FrozenConfig {
    /// Renders the configuration as TOML, mostly for logging.
    pub fn to_toml_string(&self) -> GritResult<String> {
        toml::to_string_pretty(self.0.as_ref())
            .map_err(|e| GritError::config(format!("cannot render config: {e}")))
    }
}

/// Merges configuration layers in order and produces a `FrozenConfig`.
pub struct ConfigBuilder {
    table: Table,
}

impl ConfigBuilder {
    /// Starts from `GritConfig::default()`.
    pub fn new() -> GritResult<Self> {
        let table = match Value::try_from(GritConfig::default()) {
            Ok(Value::Table(table)) => table,
            Ok(_) => return Err(GritError::config("default config did not serialize to a table")),
            Err(e) => return Err(GritError::config(format!("cannot serialize default config: {e}"))),
        };
        Ok(Self { table })
    }

    /// Merges a TOML config file, following its `_BASE_` chain first.
    pub fn merge_from_file(mut self, path: impl AsRef<Path>) -> GritResult<Self> {
        let file_table = load_file_table(path.as_ref(), &mut Vec::new())?;
        merge_tables(&mut self.table, file_table, "")?;
        Ok(self)
    }

    /// Merges flat `KEY VALUE KEY VALUE ...` pairs with dotted keys.
    pub fn merge_from_list<S: AsRef<str>>(mut self, opts: &[S]) -> GritResult<Self> {
        if opts.len() % 2 != 0 {
            return Err(GritError::config(format!(
                "override list must hold KEY VALUE pairs, got {} items",
                opts.len()
            )));
        }
        for pair in opts.chunks(2) {
            set_dotted(&mut self.table, pair[0].as_ref(), pair[1].as_ref())?;
        }
        Ok(self)
    }

    /// Applies the pinned fields and freezes the result.
    pub fn freeze(self, fixed: &FixedFields) -> GritResult<FrozenConfig> {
        let mut config: GritConfig = Value::Table(self.table)
            .try_into::<GritConfig>()
            .map_err(|e| GritError::config(format!("invalid configuration: {e}")))?;
        fixed.apply(&mut config);
        Ok(FrozenConfig(Arc::new(config)))
    }
}

/// Builds the run configuration the way the demo does: defaults, file,
/// overrides, pinned fields.
pub fn setup_cfg<S: AsRef<str>>(
    config_file: &Path,
    opts: &[S],
    fixed: &FixedFields,
) -> GritResult<FrozenConfig> {
    if config_file.as_os_str().is_empty() {
        return Err(GritError::config("no config file given (use --config-file)"));
    }
    ConfigBuilder::new()?
        .merge_from_file(config_file)?
        .merge_from_list(opts)?
        .freeze(fixed)
}

fn load_file_table(path: &Path, chain: &mut Vec<PathBuf>) -> GritResult<Table> {
    let canonical = fs::canonicalize(path)
        .map_err(|e| GritError::config(format!("cannot open config file {}: {e}", path.display())))?;
    if chain.contains(&canonical) {
        return Err(GritError::config(format!(
            "config file {} includes itself through {BASE_KEY}",
            canonical.display()
        )));
    }

    let text = fs::read_to_string(&canonical)
        .map_err(|e| GritError::config(format!("cannot read config file {}: {e}", canonical.display())))?;
    let mut table: Table = toml::from_str(&text)
        .map_err(|e| GritError::config(format!("cannot parse config file {}: {e}", canonical.display())))?;

    chain.push(canonical.clone());
    let merged = match table.remove(BASE_KEY) {
        Some(Value::String(base)) => {
            let base_path = match canonical.parent() {
                Some(dir) => dir.join(&base),
                None => PathBuf::from(&base),
            };
            let mut merged = load_file_table(&base_path, chain)?;
            overlay(&mut merged, table);
            merged
        }
        Some(other) => {
            return Err(GritError::config(format!(
                "{BASE_KEY} in {} must be a string, found {}",
                canonical.display(),
                other.type_str()
            )));
        }
        None => table,
    };
    chain.pop();
    Ok(merged)
}

/// Deep merge without validation, used while resolving `_BASE_` chains.
fn overlay(base: &mut Table, top: Table) {
    for (key, value) in top {
        match value {
            Value::Table(sub) if base.get(&key).is_some_and(Value::is_table) => {
                if let Some(Value::Table(existing)) = base.get_mut(&key) {
                    overlay(existing, sub);
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// Deep merge that only accepts keys already present in `base`.
fn merge_tables(base: &mut Table, top: Table, prefix: &str) -> GritResult<()> {
    for (key, value) in top {
        let full_key = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        let existing = base
            .get_mut(&key)
            .ok_or_else(|| GritError::config(format!("non-existent config key: {full_key}")))?;
        match (existing, value) {
            (Value::Table(existing), Value::Table(sub)) => merge_tables(existing, sub, &full_key)?,
            (existing, value) => {
                let merged = coerce(existing, value, &full_key)?;
                *existing = merged;
            }
        }
    }
    Ok(())
}

fn set_dotted(table: &mut Table, key: &str, raw: &str) -> GritResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, parents)) = parts.split_last() else {
        return Err(GritError::config("empty config key"));
    };

    let mut current = table;
    for part in parents {
        current = match current.get_mut(*part) {
            Some(Value::Table(sub)) => sub,
            _ => return Err(GritError::config(format!("non-existent config key: {key}"))),
        };
    }

    let existing = current
        .get_mut(*leaf)
        .ok_or_else(|| GritError::config(format!("non-existent config key: {key}")))?;
    let value = if existing.is_str() {
        Value::String(raw.to_string())
    } else {
        parse_literal(raw)
    };
    let merged = coerce(existing, value, key)?;
    *existing = merged;
    Ok(())
}

/// Parses a command-line value as a TOML literal, falling back to a string.
fn parse_literal(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn coerce(existing: &Value, value: Value, key: &str) -> GritResult<Value> {
    match (existing, value) {
        (Value::Table(_), _) => Err(GritError::config(format!(
            "{key} is a section and cannot be replaced by a value"
        ))),
        (Value::Float(_), Value::Integer(i)) => Ok(Value::Float(i as f64)),
        (existing, value) if existing.same_type(&value) => Ok(value),
        (existing, value) => Err(GritError::config(format!(
            "type mismatch for {key}: expected {}, got {}",
            existing.type_str(),
            value.type_str()
        ))),
    }
}
