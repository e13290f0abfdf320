use grit_vision::{Flow, GritResult, OutputSink};

/// Title of the single window every image is shown in.
pub const WINDOW_NAME: &str = "GRiT";

const ESCAPE: i32 = 27;

/// Escape ends the run; any other key moves on to the next image.
#[cfg_attr(not(feature = "highgui"), allow(dead_code))]
pub fn flow_for_key(key: i32) -> Flow {
    if key == ESCAPE { Flow::Stop } else { Flow::Continue }
}

/// Opens the interactive sink. Only available with the `highgui` feature.
#[cfg(feature = "highgui")]
pub fn open_window(name: &str) -> GritResult<Box<dyn OutputSink>> {
    Ok(Box::new(highgui_sink::WindowSink::open(name)?))
}

#[cfg(not(feature = "highgui"))]
pub fn open_window(name: &str) -> GritResult<Box<dyn OutputSink>> {
    Err(grit_vision::GritError::display(format!(
        "cannot open window {name:?}: grit_demo was built without the `highgui` feature; pass --output to write JSON instead"
    )))
}

#[cfg(feature = "highgui")]
mod highgui_sink {
    use super::flow_for_key;
    use grit_vision::{ChannelOrder, Flow, GritError, GritResult, ImageFrame, OutputSink, Prediction};
    use opencv::{
        core::{Mat, Point, Rect, Scalar},
        highgui, imgproc,
        prelude::*,
    };
    use std::path::Path;

    // BGR
    const PALETTE: [(f64, f64, f64); 6] = [
        (0.0, 255.0, 0.0),
        (255.0, 128.0, 0.0),
        (0.0, 128.0, 255.0),
        (255.0, 0.0, 255.0),
        (0.0, 255.0, 255.0),
        (255.0, 255.0, 0.0),
    ];

    fn cv_error(e: opencv::Error) -> GritError {
        GritError::display(e.to_string())
    }

    /// Copies the decoded frame into an owned 8-bit, 3-channel BGR `Mat`, so the
    /// window shows exactly the pixels the predictor saw.
    fn frame_to_mat(image: &ImageFrame) -> opencv::Result<Mat> {
        let bgr = image.to_order(ChannelOrder::Bgr);
        let flat = Mat::from_slice(bgr.data())?;
        flat.reshape(3, bgr.height() as i32)?.try_clone()
    }

    /// One resizable window, reused for every image. Blocks on a key press
    /// after each image; Escape ends the run.
    pub struct WindowSink {
        name: String,
    }

    impl WindowSink {
        pub fn open(name: &str) -> GritResult<Self> {
            highgui::named_window(name, highgui::WINDOW_NORMAL).map_err(cv_error)?;
            Ok(Self { name: name.to_string() })
        }

        fn annotate(frame: &mut Mat, prediction: &Prediction) -> opencv::Result<()> {
            for (i, instance) in prediction.instances.iter().enumerate() {
                let (b, g, r) = PALETTE[i % PALETTE.len()];
                let color = Scalar::new(b, g, r, 0.0);
                let bbox = instance.bbox;
                let rect = Rect::new(
                    bbox.x1 as i32,
                    bbox.y1 as i32,
                    bbox.width().max(1.0) as i32,
                    bbox.height().max(1.0) as i32,
                );
                imgproc::rectangle(frame, rect, color, 2, imgproc::LINE_8, 0)?;

                if let Some(text) = instance.descriptions.first() {
                    let origin = Point::new(rect.x, (rect.y - 5).max(12));
                    imgproc::put_text(
                        frame,
                        text,
                        origin,
                        imgproc::FONT_HERSHEY_SIMPLEX,
                        0.5,
                        color,
                        1,
                        imgproc::LINE_AA,
                        false,
                    )?;
                }
            }
            Ok(())
        }
    }

    impl OutputSink for WindowSink {
        fn emit(&mut self, source: &Path, image: &ImageFrame, prediction: &Prediction) -> GritResult<Flow> {
            let mut frame = frame_to_mat(image)
                .map_err(|e| GritError::display(format!("cannot display {}: {e}", source.display())))?;
            Self::annotate(&mut frame, prediction).map_err(cv_error)?;
            highgui::imshow(&self.name, &frame).map_err(cv_error)?;
            let key = highgui::wait_key(0).map_err(cv_error)?;
            Ok(flow_for_key(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_stops_and_other_keys_continue() {
        assert_eq!(flow_for_key(27), Flow::Stop);
        assert_eq!(flow_for_key(b' ' as i32), Flow::Continue);
        assert_eq!(flow_for_key(b'q' as i32), Flow::Continue);
        // wait_key reports -1 when no key arrived.
        assert_eq!(flow_for_key(-1), Flow::Continue);
    }

    #[cfg(not(feature = "highgui"))]
    #[test]
    fn without_highgui_the_window_points_at_output() {
        let err = open_window(WINDOW_NAME).err().unwrap();
        assert!(err.to_string().contains("--output"), "{err}");
    }
}
