use std::borrow::Cow;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::diagnostics::DiagnosticsSink;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("could not read shader source '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shader text exactly as it was read from disk.
///
/// A source that could not be read is still a value: it is empty and
/// [`ShaderSource::is_loaded`] returns false, so the failure shows up later as
/// an empty-source compile error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    path: PathBuf,
    bytes: Vec<u8>,
    loaded: bool,
}

impl ShaderSource {
    /// Reads `path` and reports the attempt to `sink`. Never fails.
    pub fn load<P: AsRef<Path>>(path: P, sink: &dyn DiagnosticsSink) -> Self {
        let path = path.as_ref();

        match read_source(path) {
            Ok(bytes) => {
                sink.info(&format!("loading program '{}'...", path.display()));
                Self {
                    path: path.to_owned(),
                    bytes,
                    loaded: true,
                }
            }
            Err(err) => {
                log::debug!("{err}");
                sink.error(&format!("[error] loading program '{}'...", path.display()));
                Self {
                    path: path.to_owned(),
                    bytes: Vec::new(),
                    loaded: false,
                }
            }
        }
    }

    /// Like [`ShaderSource::load`], but an unreadable file is an error.
    pub fn load_strict<P: AsRef<Path>>(
        path: P,
        sink: &dyn DiagnosticsSink,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();

        let bytes = read_source(path).inspect_err(|_| {
            sink.error(&format!("[error] loading program '{}'...", path.display()));
        })?;
        sink.info(&format!("loading program '{}'...", path.display()));

        Ok(Self {
            path: path.to_owned(),
            bytes,
            loaded: true,
        })
    }

    pub fn from_text<P: Into<PathBuf>>(path: P, text: &str) -> Self {
        Self {
            path: path.into(),
            bytes: until_nul(text.as_bytes().to_vec()),
            loaded: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// GLSL is ASCII, so anything that is not UTF-8 is replaced rather than
    /// rejected and the driver gets to complain about it.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>, SourceError> {
    let mut bytes = Vec::new();

    std::fs::File::open(path)
        .and_then(|mut file| file.read_to_end(&mut bytes))
        .map_err(|source| SourceError::Read {
            path: path.to_owned(),
            source,
        })?;

    Ok(until_nul(bytes))
}

// A NUL byte can't appear in shader text; everything after it is dropped.
fn until_nul(mut bytes: Vec<u8>) -> Vec<u8> {
    if let Some(end) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(end);
    }
    bytes
}
