//! OpenCV highgui window

use color_eyre::Result;
use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::{highgui, prelude::*};
use tracing::info;

use crate::capture::Frame;
use crate::display::sink::DisplaySurface;
use crate::error::StopReason;
use crate::DisplayConfig;

pub struct HighGuiDisplay {
    title: String,
    cancel_key: i32,
    mat: Mat,
}

impl HighGuiDisplay {
    pub fn new(config: &DisplayConfig) -> Result<Self> {
        highgui::named_window(&config.title, highgui::WINDOW_AUTOSIZE)?;
        info!("highgui window '{}'", config.title);

        Ok(Self {
            title: config.title.clone(),
            cancel_key: config.cancel_key as i32,
            mat: Mat::default(),
        })
    }

    fn render(&mut self, frame: &Frame) -> opencv::Result<()> {
        let geometry = frame.geometry();
        let (rows, cols) = (geometry.height as i32, geometry.width as i32);

        if self.mat.rows() != rows || self.mat.cols() != cols {
            self.mat = Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))?;
        }
        self.mat.data_bytes_mut()?.copy_from_slice(frame.data());

        highgui::imshow(&self.title, &self.mat)
    }
}

impl DisplaySurface for HighGuiDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), StopReason> {
        self.render(frame)
            .map_err(|e| StopReason::DeliveryFailure(e.to_string()))
    }

    fn poll_cancel_key(&mut self) -> bool {
        matches!(highgui::wait_key(1), Ok(key) if key == self.cancel_key)
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        let _ = highgui::destroy_all_windows();
    }
}
