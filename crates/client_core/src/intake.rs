//! File intake: validates candidates and owns the single selected file together
//! with its preview handle.

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use shared::domain::{ImageMime, SelectionId};
use thiserror::Error;
use tracing::{debug, info};

/// A file offered by the user, before validation.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub declared_mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read image file '{}'", path.display()))?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();
        Ok(Self::new(name, bytes))
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Declared MIME type wins; without one the type is guessed from the name.
    pub fn detected_mime(&self) -> Option<String> {
        match self.declared_mime.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() => Some(declared.to_string()),
            _ => mime_guess::from_path(&self.name)
                .first()
                .map(|mime| mime.essence_str().to_string()),
        }
    }

    pub fn validate(&self) -> Result<ImageMime, IntakeRejection> {
        let detected = self.detected_mime();
        let mime = detected.as_deref().and_then(ImageMime::from_mime_str);
        let extension_ok = self
            .extension()
            .map(|ext| ImageMime::ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(true);

        match mime {
            Some(mime) if extension_ok => Ok(mime),
            _ => Err(IntakeRejection::UnsupportedType {
                name: self.name.clone(),
                detected,
            }),
        }
    }
}

/// Something that can become a [`FileCandidate`] once it is actually chosen,
/// such as a dropped item that still has to be read from disk.
pub trait CandidateSource {
    fn into_candidate(self) -> Result<FileCandidate, IntakeRejection>;
}

impl CandidateSource for FileCandidate {
    fn into_candidate(self) -> Result<FileCandidate, IntakeRejection> {
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeRejection {
    #[error("no file was provided")]
    NothingSelected,
    #[error("could not read {name}: {reason}")]
    Unreadable { name: String, reason: String },
    #[error("{name} is not a supported image (JPG, JPEG or PNG only)")]
    UnsupportedType {
        name: String,
        detected: Option<String>,
    },
}

/// A validated image. Immutable once created; a new selection replaces it.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub id: SelectionId,
    pub name: String,
    pub mime: ImageMime,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The selected file and the preview derived from it. Dropping the selection
/// releases the preview.
#[derive(Debug)]
pub struct Selection<P> {
    file: SelectedFile,
    preview: P,
}

impl<P> Selection<P> {
    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    pub fn preview(&self) -> &P {
        &self.preview
    }
}

#[derive(Debug)]
pub struct IntakeController<P> {
    current: Option<Selection<P>>,
    last_id: SelectionId,
}

impl<P> Default for IntakeController<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> IntakeController<P> {
    pub fn new() -> Self {
        Self {
            current: None,
            last_id: SelectionId(0),
        }
    }

    pub fn selection(&self) -> Option<&Selection<P>> {
        self.current.as_ref()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.current.as_ref().map(Selection::file)
    }

    /// Validates `candidate` and, on success, replaces the current selection.
    /// A rejected candidate leaves the current selection untouched.
    pub fn select_file<F>(
        &mut self,
        candidate: FileCandidate,
        acquire_preview: F,
    ) -> Result<SelectionId, IntakeRejection>
    where
        F: FnOnce(&SelectedFile) -> P,
    {
        let mime = match candidate.validate() {
            Ok(mime) => mime,
            Err(rejection) => {
                debug!(name = %candidate.name, "intake: rejected candidate");
                return Err(rejection);
            }
        };

        let id = self.last_id.next();
        self.last_id = id;
        let file = SelectedFile {
            id,
            name: candidate.name,
            mime,
            bytes: Arc::from(candidate.bytes),
        };
        let preview = acquire_preview(&file);
        info!(
            selection = id.0,
            name = %file.name,
            mime = %file.mime,
            bytes = file.len(),
            "intake: file selected"
        );
        self.current = Some(Selection { file, preview });
        Ok(id)
    }

    /// Only the first candidate of a multi-file drop is considered; the rest
    /// are never loaded.
    pub fn select_first<I, F>(
        &mut self,
        candidates: I,
        acquire_preview: F,
    ) -> Result<SelectionId, IntakeRejection>
    where
        I: IntoIterator,
        I::Item: CandidateSource,
        F: FnOnce(&SelectedFile) -> P,
    {
        let mut candidates = candidates.into_iter();
        let first = candidates
            .next()
            .ok_or(IntakeRejection::NothingSelected)?;
        let (ignored, _) = candidates.size_hint();
        if ignored > 0 {
            debug!(ignored, "intake: ignoring extra files from multi-file drop");
        }
        self.select_file(first.into_candidate()?, acquire_preview)
    }

    /// Returns whether anything was selected.
    pub fn clear_selection(&mut self) -> bool {
        let cleared = self.current.take().is_some();
        if cleared {
            info!("intake: selection cleared");
        }
        cleared
    }
}

#[cfg(test)]
#[path = "tests/intake_tests.rs"]
mod tests;
