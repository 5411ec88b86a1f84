//! ONNX Runtime layout detector backend.
//!
//! Runs a pretrained document-layout object detector over page rasters.
//! The model consumes a normalized `1×3×H×W` tensor and emits
//! `(cx, cy, w, h, class scores…)` rows in input-resolution coordinates;
//! decoding thresholds, applies per-class NMS, and scales boxes back to
//! page pixels.

// Image dimensions and coordinates cross between usize (array indexing)
// and f32 (normalized model I/O); precision loss is acceptable for page
// rasters.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use image::imageops::FilterType;
use log::debug;
use ort::session::Session;
use std::sync::Mutex;

use super::{DetectorConfig, LayoutDetector, RawDetection};
use crate::error::{IngestError, Result};
use crate::page::PageImage;

/// Model input resolution (square resize).
const INPUT_SIZE: u32 = 640;

/// ONNX-backed layout detector.
///
/// The ort session requires exclusive access per run, so it sits behind a
/// mutex; detection batches serialize through it while staying shareable
/// across threads.
pub struct OnnxLayoutDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    config: DetectorConfig,
}

impl std::fmt::Debug for OnnxLayoutDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxLayoutDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OnnxLayoutDetector {
    /// Load the model and build an inference session.
    ///
    /// The intra-op thread count defaults to the physical core count
    /// (clamped to 8) and can be overridden with `SOLSTICE_ONNX_THREADS`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Detector`] if the model file is missing or
    /// the session fails to build.
    pub fn load(config: DetectorConfig) -> Result<Self> {
        let num_threads = std::env::var("SOLSTICE_ONNX_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or_else(|| num_cpus::get_physical().clamp(1, 8));
        debug!("layout detector ONNX session using {num_threads} threads");

        let session = Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(num_threads)?))
            .and_then(|mut b| b.commit_from_file(&config.model_path))
            .map_err(|e| {
                IngestError::Detector(format!(
                    "failed to load {}: {e}",
                    config.model_path.display()
                ))
            })?;

        debug!(
            "loaded layout model, inputs: {:?}, outputs: {:?}",
            session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>()
        );
        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| IngestError::Detector("model declares no inputs".to_string()))?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| IngestError::Detector("model declares no outputs".to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            config,
        })
    }

    /// Preprocess one page: resize to the model input and normalize to
    /// `[0, 1]` in NCHW order.
    fn preprocess(page: &PageImage) -> Vec<f32> {
        let resized = page
            .image
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
            .to_rgb8();

        let hw = (INPUT_SIZE * INPUT_SIZE) as usize;
        let mut data = vec![0.0_f32; 3 * hw];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let offset = y as usize * INPUT_SIZE as usize + x as usize;
            for c in 0..3 {
                data[c * hw + offset] = f32::from(pixel.0[c]) / 255.0;
            }
        }
        data
    }

    /// Decode one page's model output rows into thresholded detections in
    /// page-pixel coordinates.
    fn decode(&self, rows_n: usize, row_len: usize, data: &[f32], page: &PageImage) -> Vec<RawDetection> {
        let scale_x = page.width_px() as f32 / INPUT_SIZE as f32;
        let scale_y = page.height_px() as f32 / INPUT_SIZE as f32;

        let mut detections = Vec::new();
        for r in 0..rows_n {
            let row = &data[r * row_len..(r + 1) * row_len];
            if row.len() < 5 {
                continue;
            }
            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            let (class_index, score) =
                row[4..]
                    .iter()
                    .enumerate()
                    .fold((0, 0.0_f32), |best, (i, &s)| {
                        if s > best.1 {
                            (i, s)
                        } else {
                            best
                        }
                    });

            if score < self.config.score_threshold {
                continue;
            }
            let Some(label) = self.config.label_map.label_for_class(class_index) else {
                continue;
            };

            let x1 = ((cx - w / 2.0) * scale_x).max(0.0);
            let y1 = ((cy - h / 2.0) * scale_y).max(0.0);
            let x2 = ((cx + w / 2.0) * scale_x).min(page.width_px() as f32);
            let y2 = ((cy + h / 2.0) * scale_y).min(page.height_px() as f32);
            if x1 >= x2 || y1 >= y2 {
                continue;
            }

            detections.push(RawDetection {
                label,
                bbox: [x1, y1, x2, y2],
                score,
            });
        }

        non_max_suppression(detections, self.config.nms_threshold)
    }
}

impl LayoutDetector for OnnxLayoutDetector {
    fn detect(&self, pages: &[PageImage]) -> Result<Vec<Vec<RawDetection>>> {
        let mut results = Vec::with_capacity(pages.len());

        for page in pages {
            let data = Self::preprocess(page);
            let shape = [1_usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
            let input_value = ort::value::Value::from_array((shape.as_slice(), data))
                .map_err(to_detector_error)?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| IngestError::Detector("detector session poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_value])
                .map_err(to_detector_error)?;

            let (out_shape, out_data) = outputs[self.output_name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(to_detector_error)?;
            let dims: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
            // Expect [1, rows, row_len]
            let (rows_n, row_len) = match dims.as_slice() {
                [1, r, c] => (*r, *c),
                other => {
                    return Err(IngestError::Detector(format!(
                        "unexpected output shape {other:?}"
                    )))
                }
            };
            let flat = out_data.to_vec();
            drop(outputs);
            drop(session);

            let detections = self.decode(rows_n, row_len, &flat, page);
            debug!(
                "page {}: {} detections after threshold/NMS",
                page.page_index,
                detections.len()
            );
            results.push(detections);
        }

        Ok(results)
    }

    fn name(&self) -> &str {
        "onnx-layout"
    }
}

fn to_detector_error(e: ort::Error) -> IngestError {
    IngestError::Detector(e.to_string())
}

/// Greedy per-class non-maximum suppression, stable for equal scores.
fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<RawDetection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.label == det.label && bbox_iou(&k.bbox, &det.bbox) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

fn bbox_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x_overlap = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let y_overlap = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = x_overlap * y_overlap;
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solstice_core::BoxLabel;

    fn det(label: BoxLabel, bbox: [f32; 4], score: f32) -> RawDetection {
        RawDetection { label, bbox, score }
    }

    #[test]
    fn test_nms_suppresses_same_label_duplicates() {
        let input = vec![
            det(BoxLabel::Text, [0.0, 0.0, 100.0, 100.0], 0.9),
            det(BoxLabel::Text, [5.0, 5.0, 105.0, 105.0], 0.7),
            det(BoxLabel::Text, [300.0, 300.0, 400.0, 400.0], 0.8),
        ];
        let kept = non_max_suppression(input, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.8);
    }

    #[test]
    fn test_nms_keeps_cross_label_overlaps() {
        let input = vec![
            det(BoxLabel::Figure, [0.0, 0.0, 100.0, 100.0], 0.9),
            det(BoxLabel::Table, [0.0, 0.0, 100.0, 100.0], 0.7),
        ];
        let kept = non_max_suppression(input, 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_bbox_iou() {
        assert!((bbox_iou(&[0.0, 0.0, 10.0, 10.0], &[0.0, 0.0, 10.0, 10.0]) - 1.0).abs() < 1e-6);
        assert_eq!(bbox_iou(&[0.0, 0.0, 10.0, 10.0], &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }
}
