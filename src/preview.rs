//! Measure previews
//!
//! A [`Preview`] shows one measure to the operator. Previews only read the measures
//! they are given and never block the caller on an external program.

use crate::error::MergeError;
use crate::model::Measure;
use crate::musicxml::{measure_to_score, to_musicxml};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// Something that can display a single measure
pub trait Preview: Send + Sync {
    fn show(&self, caption: &str, measure: &Measure) -> Result<(), MergeError>;
}

/// Writes a one-line text rendering, e.g. `Score 1: m.1 | C4 1 [major] |`
pub struct TextPreview<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> TextPreview<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        // A poisoned lock still holds a usable writer
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl TextPreview<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Preview for TextPreview<W> {
    fn show(&self, caption: &str, measure: &Measure) -> Result<(), MergeError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| MergeError::Preview("preview output lock poisoned".to_string()))?;
        writeln!(out, "{}: {}", caption, measure)
            .and_then(|_| out.flush())
            .map_err(|e| MergeError::Preview(e.to_string()))
    }
}

/// Writes the measure as a one-measure MusicXML file and opens it in a notation viewer
///
/// The viewer is started in the background; `show` returns as soon as it has been
/// spawned. Preview files go to a `session-*` directory of their own under the
/// preview directory, removed when the `ViewerPreview` is dropped.
pub struct ViewerPreview {
    viewer: PathBuf,
    dir: TempDir,
    shown: AtomicUsize,
}

impl ViewerPreview {
    /// # Errors
    /// [`MergeError::Io`] when the session directory cannot be created under `parent`.
    pub fn new(viewer: impl Into<PathBuf>, parent: impl AsRef<Path>) -> Result<Self, MergeError> {
        let parent = parent.as_ref();
        std::fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
        let dir = tempfile::Builder::new()
            .prefix("session-")
            .tempdir_in(parent)
            .map_err(|e| MergeError::io(parent, e))?;
        Ok(Self {
            viewer: viewer.into(),
            dir,
            shown: AtomicUsize::new(0),
        })
    }

    /// Directory holding this session's preview files
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write the preview file and return its path
    pub fn write_file(&self, caption: &str, measure: &Measure) -> Result<PathBuf, MergeError> {
        let n = self.shown.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self
            .dir
            .path()
            .join(format!("preview-{:03}-m{}.musicxml", n, measure.number));
        let xml = to_musicxml(&measure_to_score("P1", caption, measure));
        std::fs::write(&path, xml).map_err(|e| MergeError::io(&path, e))?;
        Ok(path)
    }
}

impl Preview for ViewerPreview {
    fn show(&self, caption: &str, measure: &Measure) -> Result<(), MergeError> {
        let path = self.write_file(caption, measure)?;

        let mut child = Command::new(&self.viewer)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                MergeError::Preview(format!(
                    "cannot start viewer '{}': {}",
                    self.viewer.display(),
                    e
                ))
            })?;
        tracing::debug!(viewer = %self.viewer.display(), file = %path.display(), "viewer started");

        // Reap the viewer when it exits
        std::thread::spawn(move || {
            if let Err(e) = child.wait() {
                tracing::warn!(error = %e, "viewer did not exit cleanly");
            }
        });
        Ok(())
    }
}

/// Shows each measure on every preview it holds, in order
///
/// All previews are tried even when one fails; the first error is returned.
#[derive(Default)]
pub struct PreviewSet {
    previews: Vec<Box<dyn Preview>>,
}

impl PreviewSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, preview: impl Preview + 'static) {
        self.previews.push(Box::new(preview));
    }

    pub fn len(&self) -> usize {
        self.previews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previews.is_empty()
    }
}

impl Preview for PreviewSet {
    fn show(&self, caption: &str, measure: &Measure) -> Result<(), MergeError> {
        let mut first_error = None;
        for preview in &self.previews {
            if let Err(e) = preview.show(caption, measure) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
