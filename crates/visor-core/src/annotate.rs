//! Debug overlays: detected face boxes and landmark dots.

use crate::types::DetectedFace;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const BOX_THICKNESS: i32 = 3;
const LANDMARK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LANDMARK_RADIUS: i32 = 3;

/// Copy of `image` with every face box outlined.
pub fn draw_face_boxes(image: &RgbImage, faces: &[DetectedFace]) -> RgbImage {
    let mut out = image.clone();
    for detected in faces {
        let face = &detected.face;
        let (width, height) = (face.width.round() as i64, face.height.round() as i64);
        // Nested outlines give the stroke its thickness.
        for inset in 0..BOX_THICKNESS {
            let w = width - 2 * i64::from(inset);
            let h = height - 2 * i64::from(inset);
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(face.x.round() as i32 + inset, face.y.round() as i32 + inset)
                .of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut out, rect, BOX_COLOR);
        }
    }
    out
}

/// Copy of `image` with a dot on every landmark.
pub fn draw_landmarks(image: &RgbImage, faces: &[DetectedFace]) -> RgbImage {
    let mut out = image.clone();
    for detected in faces {
        for p in detected.landmarks.points() {
            draw_filled_circle_mut(&mut out, (p.x, p.y), LANDMARK_RADIUS, LANDMARK_COLOR);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FaceBox, LandmarkSet, Point, LANDMARK_COUNT};

    fn detected(points: Vec<Point>) -> DetectedFace {
        DetectedFace {
            face: FaceBox { x: 10.0, y: 10.0, width: 20.0, height: 20.0, confidence: 0.9 },
            landmarks: LandmarkSet::new(points).unwrap(),
        }
    }

    #[test]
    fn test_draw_face_boxes_outlines_only() {
        let image = RgbImage::new(50, 50);
        let faces = vec![detected(vec![Point::new(0, 0); LANDMARK_COUNT])];
        let out = draw_face_boxes(&image, &faces);
        assert_eq!(*out.get_pixel(10, 10), BOX_COLOR);
        assert_eq!(*out.get_pixel(12, 20), BOX_COLOR);
        assert_eq!(*out.get_pixel(20, 20), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_landmarks_marks_points() {
        let image = RgbImage::new(50, 50);
        let faces = vec![detected(vec![Point::new(25, 25); LANDMARK_COUNT])];
        let out = draw_landmarks(&image, &faces);
        assert_eq!(*out.get_pixel(25, 25), LANDMARK_COLOR);
        assert_eq!(*out.get_pixel(25, 27), LANDMARK_COLOR);
        assert_eq!(*out.get_pixel(40, 40), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_landmarks_tolerates_offscreen_points() {
        let image = RgbImage::new(10, 10);
        let faces = vec![detected(vec![Point::new(-100, 500); LANDMARK_COUNT])];
        assert_eq!(draw_landmarks(&image, &faces), image);
    }

    #[test]
    fn test_no_faces_returns_copy() {
        let image = RgbImage::from_pixel(5, 5, Rgb([9, 9, 9]));
        assert_eq!(draw_face_boxes(&image, &[]), image);
    }
}
