use clap::Parser;
use std::path::PathBuf;

/// Command-line surface of the demo.
#[derive(Debug, Parser)]
#[command(name = "grit_demo")]
#[command(about = "GRiT demo: detect regions and describe them, for builtin configs")]
pub struct Args {
    /// Path to config file
    #[arg(long = "config-file", value_name = "FILE", default_value = "")]
    pub config_file: PathBuf,

    /// Use CPU only. Currently ignored: MODEL.DEVICE is always forced to cuda.
    #[arg(long)]
    pub cpu: bool,

    /// A list of space separated input images, directories,
    /// or a single glob pattern such as 'directory/*.jpg'
    #[arg(long, num_args = 1.., value_name = "PATH")]
    pub input: Vec<String>,

    /// A directory to save output JSON files.
    /// If not given, results are shown in an OpenCV window.
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Minimum score for instance predictions to be shown
    #[arg(long, default_value_t = 0.4)]
    pub confidence_threshold: f64,

    /// Choose a task to have GRiT perform (ObjectDet or DenseCap)
    #[arg(long, default_value = "")]
    pub test_task: String,

    /// Skip images that cannot be read instead of aborting the batch
    #[arg(long)]
    pub keep_going: bool,

    /// Modify config options using the command-line 'KEY VALUE' pairs
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "KEY VALUE")]
    pub opts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo() {
        let args = Args::try_parse_from(["grit_demo"]).unwrap();
        assert!(args.config_file.as_os_str().is_empty());
        assert!(!args.cpu);
        assert!(args.input.is_empty());
        assert!(args.output.is_none());
        assert_eq!(args.confidence_threshold, 0.4);
        assert!(args.test_task.is_empty());
        assert!(args.opts.is_empty());
    }

    #[test]
    fn parses_inputs_and_trailing_overrides() {
        let args = Args::try_parse_from([
            "grit_demo",
            "--config-file",
            "configs/GRiT_B_DenseCap.toml",
            "--cpu",
            "--input",
            "demo_images",
            "more/*.jpg",
            "--output",
            "visualization",
            "--confidence-threshold",
            "0.5",
            "--test-task",
            "DenseCap",
            "--opts",
            "MODEL.WEIGHTS",
            "models/grit_b_densecap.onnx",
            "MODEL.ROI_HEADS.NMS_THRESH_TEST",
            "-0.5",
        ])
        .unwrap();
        assert_eq!(args.config_file, PathBuf::from("configs/GRiT_B_DenseCap.toml"));
        assert!(args.cpu);
        assert_eq!(args.input, vec!["demo_images", "more/*.jpg"]);
        assert_eq!(args.output, Some(PathBuf::from("visualization")));
        assert_eq!(args.confidence_threshold, 0.5);
        assert_eq!(args.test_task, "DenseCap");
        assert_eq!(
            args.opts,
            vec![
                "MODEL.WEIGHTS",
                "models/grit_b_densecap.onnx",
                "MODEL.ROI_HEADS.NMS_THRESH_TEST",
                "-0.5"
            ]
        );
    }

    #[test]
    fn threshold_must_be_a_number() {
        assert!(Args::try_parse_from(["grit_demo", "--confidence-threshold", "high"]).is_err());
    }
}
