//! PaddleOCR backend implementation.
//!
//! Uses paddle-ocr-rs for OCR via ONNX Runtime. The engine is loaded once
//! when the backend is constructed and reused for every request.
//!
//! Models are automatically downloaded on first use from:
//! https://github.com/RapidAI/RapidOCR

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use paddle_ocr_rs::ocr_lite::OcrLite;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::model_utils::{ensure_model_file, ModelDirConfig, ModelSpec};
use super::result::{LegacyLine, RecognitionResult};

/// Model directory configuration for PaddleOCR.
const MODEL_CONFIG: ModelDirConfig = ModelDirConfig {
    subdir: "paddle-ocr",
    required_files: &[DET_MODEL_NAME, CLS_MODEL_NAME, REC_MODEL_NAME],
};

const DET_MODEL_NAME: &str = "ch_PP-OCRv4_det_infer.onnx";
const REC_MODEL_NAME: &str = "ch_PP-OCRv4_rec_infer.onnx";
const CLS_MODEL_NAME: &str = "ch_ppocr_mobile_v2.0_cls_infer.onnx";

const DET_MODEL: ModelSpec = ModelSpec {
    url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_det_infer.onnx",
    filename: DET_MODEL_NAME,
    size_hint: "4 MB",
};

const REC_MODEL: ModelSpec = ModelSpec {
    url: "https://huggingface.co/SWHL/RapidOCR/resolve/main/PP-OCRv4/ch_PP-OCRv4_rec_infer.onnx",
    filename: REC_MODEL_NAME,
    size_hint: "10 MB",
};

const CLS_MODEL: ModelSpec = ModelSpec {
    url: "https://www.modelscope.cn/models/RapidAI/RapidOCR/resolve/v3.4.0/onnx/PP-OCRv4/cls/ch_ppocr_mobile_v2.0_cls_infer.onnx",
    filename: CLS_MODEL_NAME,
    size_hint: "1 MB",
};

/// PaddleOCR backend via ONNX Runtime.
pub struct PaddleBackend {
    config: OcrConfig,
    model_dir: PathBuf,
    /// detect_from_path needs &mut self, so calls are serialized.
    engine: Mutex<OcrLite>,
}

impl PaddleBackend {
    /// Locate (or download) the models and initialize the engine.
    pub fn load(config: OcrConfig) -> Result<Self, OcrError> {
        let model_dir = Self::ensure_models(&config)?;

        let det = model_dir.join(DET_MODEL_NAME);
        let cls = model_dir.join(CLS_MODEL_NAME);
        let rec = model_dir.join(REC_MODEL_NAME);

        let mut ocr = OcrLite::new();
        ocr.init_models(
            &det.to_string_lossy(),
            &cls.to_string_lossy(),
            &rec.to_string_lossy(),
            config.num_threads,
        )
        .map_err(|e| OcrError::OcrFailed(format!("Failed to init PaddleOCR: {}", e)))?;

        tracing::info!("PaddleOCR models loaded from {}", model_dir.display());

        Ok(Self {
            config,
            model_dir,
            engine: Mutex::new(ocr),
        })
    }

    /// Directory holding a complete model set, if one is already installed.
    pub fn installed_models(config: &OcrConfig) -> Option<PathBuf> {
        MODEL_CONFIG.find(config.model_path.as_deref())
    }

    /// Ensure models are present, downloading them if necessary.
    fn ensure_models(config: &OcrConfig) -> Result<PathBuf, OcrError> {
        if let Some(dir) = MODEL_CONFIG.find(config.model_path.as_deref()) {
            return Ok(dir);
        }

        let model_dir = config
            .model_path
            .clone()
            .unwrap_or_else(|| MODEL_CONFIG.default_dir());
        std::fs::create_dir_all(&model_dir)?;

        for spec in [&DET_MODEL, &CLS_MODEL, &REC_MODEL] {
            ensure_model_file(spec, &model_dir)?;
        }

        if !MODEL_CONFIG.has_required_files(&model_dir) {
            return Err(OcrError::ModelNotFound(format!(
                "PaddleOCR models missing from {}",
                model_dir.display()
            )));
        }
        Ok(model_dir)
    }
}

impl OcrBackend for PaddleBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::PaddleOcr
    }

    fn is_available(&self) -> bool {
        MODEL_CONFIG.has_required_files(&self.model_dir)
    }

    fn availability_hint(&self) -> String {
        format!("PaddleOCR models loaded from {:?}", self.model_dir)
    }

    fn recognize(&self, image_path: &Path) -> Result<RecognitionResult, OcrError> {
        let path = image_path
            .to_str()
            .ok_or_else(|| OcrError::OcrFailed("image path is not valid UTF-8".to_string()))?;

        let mut ocr = self
            .engine
            .lock()
            .map_err(|e| OcrError::OcrFailed(format!("Failed to lock OCR engine: {}", e)))?;

        let result = ocr
            .detect_from_path(
                path,
                50,    // padding
                1024,  // max side length
                0.5,   // box score threshold
                0.3,   // box threshold
                1.6,   // unclip ratio
                self.config.detect_orientation,
                false, // most angle
            )
            .map_err(|e| OcrError::OcrFailed(format!("PaddleOCR detection failed: {}", e)))?;

        let lines: Vec<LegacyLine> = result
            .text_blocks
            .iter()
            .map(|block| {
                let bbox = block
                    .box_points
                    .iter()
                    .map(|p| [p.x as f32, p.y as f32])
                    .collect();
                LegacyLine::new(bbox, block.text.clone(), block.text_score)
            })
            .collect();

        if lines.is_empty() {
            return Ok(RecognitionResult::Empty);
        }
        Ok(RecognitionResult::Legacy(lines))
    }
}
