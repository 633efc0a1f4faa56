//! gst-launch style descriptions for the pipelines we parse at runtime

use crate::{CaptureConfig, GStreamerConfig};

/// Element name the capture side looks up
pub const APPSINK_NAME: &str = "appsink";
/// Element name the re-injection side looks up
pub const APPSRC_NAME: &str = "appsrc";

/// Camera to appsink, converted to the configured packed format
pub fn camera_capture(capture: &CaptureConfig, gst: &GStreamerConfig) -> String {
    if let Some(custom) = &gst.custom_pipeline {
        return custom.clone();
    }

    format!(
        "v4l2src device={} ! \
         videoconvert ! \
         video/x-raw,format={},width={},height={} ! \
         appsink name={}",
        capture.device,
        capture.format.caps_name(),
        capture.width,
        capture.height,
        APPSINK_NAME
    )
}

/// Raw video caps the appsrc announces once, before the first buffer
pub fn raw_caps(capture: &CaptureConfig) -> String {
    format!(
        "video/x-raw,format={},width={},height={},framerate={}/1",
        capture.format.caps_name(),
        capture.width,
        capture.height,
        capture.fps
    )
}

/// appsrc to a video sink, for frames produced in Rust
pub fn appsrc_display(capture: &CaptureConfig, gst: &GStreamerConfig) -> String {
    format!(
        "appsrc name={} caps={} format=time is-live={} ! \
         videoconvert ! \
         {} name=videosink",
        APPSRC_NAME,
        raw_caps(capture),
        gst.is_live,
        gst.video_sink
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn test_camera_capture_pins_format_and_size() {
        let config = Config::default();
        let desc = camera_capture(&config.capture, &config.gstreamer);
        assert!(desc.starts_with("v4l2src device=/dev/video0 ! "));
        assert!(desc.contains("video/x-raw,format=BGR,width=640,height=480"));
        assert!(desc.ends_with("appsink name=appsink"));
    }

    #[test]
    fn test_custom_pipeline_wins() {
        let mut config = Config::default();
        config.gstreamer.custom_pipeline = Some("videotestsrc ! appsink name=appsink".into());
        assert_eq!(
            camera_capture(&config.capture, &config.gstreamer),
            "videotestsrc ! appsink name=appsink"
        );
    }

    #[test]
    fn test_appsrc_display_announces_caps() {
        let config = Config::default();
        let desc = appsrc_display(&config.capture, &config.gstreamer);
        assert!(desc.starts_with(
            "appsrc name=appsrc caps=video/x-raw,format=BGR,width=640,height=480,framerate=30/1 format=time"
        ));
        assert!(desc.ends_with("autovideosink name=videosink"));
    }
}
