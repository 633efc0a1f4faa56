use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use v4l::{capability::Flags, video::Capture, Device, FourCC};

/// Detected capture device info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundDevice {
    pub path: String,
    pub card: String,
}

/// Find the first V4L2 node offering a raw format videoconvert can repack
pub fn auto_detect_device() -> Result<FoundDevice> {
    use std::path::Path;

    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            debug!("{} cannot capture video", path);
            continue;
        }

        if let Ok(formats) = dev.enum_formats() {
            let usable = formats.iter().any(|fmt| {
                fmt.fourcc == FourCC::new(b"YUYV") || fmt.fourcc == FourCC::new(b"BGR3")
            });
            if usable {
                info!("Found capture device: {} - {}", path, caps.card);
                return Ok(FoundDevice {
                    path,
                    card: caps.card,
                });
            }
        }
    }

    Err(eyre!("No suitable capture device found"))
}
