//! JSON job files for grading one sheet.

use crate::grade::AnswerKey;
use crate::pipeline::gray_view;
use crate::{GradeError, GraderParams, SheetGrader, SheetReport};
use image::ImageReader;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Answer key given inline or as a path to a JSON map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySource {
    Inline(BTreeMap<String, String>),
    Path(PathBuf),
}

impl KeySource {
    /// Read and validate the key.
    pub fn load(&self) -> Result<AnswerKey, GradeError> {
        let raw = match self {
            KeySource::Inline(raw) => raw.clone(),
            KeySource::Path(path) => load_json(path)?,
        };
        Ok(AnswerKey::from_raw(&raw)?)
    }
}

/// One grading job: which photo, which key, how to grade, where to write.
///
/// Relative paths are resolved against the directory of the job file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeJobConfig {
    pub image_path: PathBuf,
    pub answer_key: KeySource,
    #[serde(flatten)]
    pub grader: GraderParams,
    /// Blank reference sheet for template rectification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    /// Where to save the annotated PNG, if wanted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl GradeJobConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, GradeError> {
        let path = path.as_ref();
        let mut cfg: Self = load_json(path)?;
        if let Some(base) = path.parent() {
            cfg.resolve_paths(base);
        }
        Ok(cfg)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), GradeError> {
        write_json(path.as_ref(), self)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.image_path);
        if let KeySource::Path(p) = &mut self.answer_key {
            join(p);
        }
        for p in [
            &mut self.template_path,
            &mut self.debug_path,
            &mut self.report_path,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
    }

    /// Run the job and write its outputs.
    ///
    /// The key and template are validated first; an invalid key aborts
    /// before any image is read. Failures on the sheet itself are recorded
    /// in the returned report rather than returned as errors.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(self)))]
    pub fn run(&self) -> Result<SheetReport, GradeError> {
        let key = self.answer_key.load()?;
        let grader = match &self.template_path {
            Some(path) => {
                let template = load_gray(path)?;
                SheetGrader::with_template(self.grader.clone(), &gray_view(&template))?
            }
            None => SheetGrader::new(self.grader.clone()),
        };

        let image_path = self.image_path.to_string_lossy().into_owned();
        let layout = &self.grader.layout;
        let report = match load_gray(&self.image_path)
            .and_then(|img| grader.grade_image(&img, &key))
        {
            Ok(outcome) => {
                if let Some(path) = &self.debug_path {
                    let annotated = grader.render_debug(&outcome);
                    annotated
                        .save(path)
                        .map_err(|e| GradeError::image(path, e))?;
                    info!("wrote debug image to {}", path.display());
                }
                SheetReport::from_outcome(&image_path, layout, &outcome)
            }
            Err(e) => {
                warn!("{image_path}: {e}");
                SheetReport::failed(&image_path, layout, &e)
            }
        };

        if let Some(path) = &self.report_path {
            write_json(path, &report)?;
            info!("wrote report to {}", path.display());
        }
        Ok(report)
    }
}

pub(crate) fn load_gray(path: &Path) -> Result<image::GrayImage, GradeError> {
    let reader = ImageReader::open(path).map_err(|e| GradeError::io(path, e))?;
    let img = reader.decode().map_err(|e| GradeError::image(path, e))?;
    Ok(img.to_luma8())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, GradeError> {
    let raw = fs::read_to_string(path).map_err(|e| GradeError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| GradeError::json(path, e))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GradeError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| GradeError::json(path, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| GradeError::io(parent, e))?;
    }
    fs::write(path, json).map_err(|e| GradeError::io(path, e))
}
