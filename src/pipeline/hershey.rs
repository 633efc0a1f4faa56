//! Rate label through OpenCV `putText`

use opencv::core::{Mat, Point, Scalar, CV_8UC3};
use opencv::{imgproc, prelude::*};

use crate::capture::Frame;
use crate::pipeline::overlay::OverlayStyle;

/// Draw `text` with `FONT_HERSHEY_SIMPLEX`, anchored at the baseline-left corner
pub(crate) fn put_label(frame: &mut Frame, text: &str, style: &OverlayStyle) -> opencv::Result<()> {
    let geometry = frame.geometry();
    let mut mat = Mat::new_rows_cols_with_default(
        geometry.height as i32,
        geometry.width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(frame.data());

    let [c0, c1, c2] = style.color;
    imgproc::put_text(
        &mut mat,
        text,
        Point::new(style.anchor.0, style.anchor.1),
        imgproc::FONT_HERSHEY_SIMPLEX,
        style.effective_scale(),
        Scalar::new(f64::from(c0), f64::from(c1), f64::from(c2), 0.0),
        style.effective_thickness() as i32,
        imgproc::LINE_8,
        false,
    )?;

    frame.data_mut().copy_from_slice(mat.data_bytes()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameGeometry, PixelFormat};
    use crate::pipeline::overlay::OverlayFont;
    use bytes::BytesMut;

    #[test]
    fn test_put_label_paints_above_baseline_only() {
        let geometry = FrameGeometry::new(320, 120, 3);
        let mut frame = Frame::from_packed(
            0,
            geometry,
            PixelFormat::Bgr24,
            BytesMut::zeroed(geometry.byte_len()),
        )
        .unwrap();
        let style = OverlayStyle {
            font: OverlayFont::Hershey,
            ..OverlayStyle::default()
        };

        put_label(&mut frame, "FPS:30.0", &style).unwrap();

        assert_eq!(frame.data().len(), geometry.byte_len());
        let row_len = geometry.row_len();
        assert!(frame.data()[..50 * row_len].iter().any(|&b| b == 255));
        // Hershey simplex glyphs for these characters have no descenders
        assert!(frame.data()[60 * row_len..].iter().all(|&b| b == 0));
    }
}
