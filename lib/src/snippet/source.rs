use std::{fs, io};
use std::path::{Path, PathBuf};

use crate::snippet::{Line, SnippetError};
use crate::util::PathExt;

/// A snippet's source file, either as declared in a document or already
/// resolved and read.
#[derive(Debug)]
pub enum FileRef {
    Declared {
        file_ref: String,
        /// The declaring document, relative to the site root.
        document: PathBuf,
    },
    Resolved(SourceFile),
}

/// A source file read in full.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_ref: String,
    pub path: PathBuf,
    pub text: String,
}

impl FileRef {
    pub fn declared<P: AsRef<Path>>(file_ref: &str, document: P) -> Self {
        FileRef::Declared {
            file_ref: file_ref.to_string(),
            document: document.as_ref().to_path_buf(),
        }
    }

    pub fn file_ref(&self) -> &str {
        match self {
            FileRef::Declared { file_ref, .. } => file_ref,
            FileRef::Resolved(file) => &file.file_ref,
        }
    }

    /// Resolves `site_root / dir(document) / file_ref` and reads it.
    pub fn resolve(self, site_root: &Path) -> Result<SourceFile, SnippetError> {
        let (file_ref, document) = match self {
            FileRef::Resolved(file) => return Ok(file),
            FileRef::Declared { file_ref, document } => (file_ref, document),
        };

        let document_dir = document.parent().unwrap_or(Path::new(""));
        let joined = site_root.join_relative(document_dir).join_relative(&file_ref);
        let path = joined.expand().unwrap_or_else(|_| joined.fold_dots());
        SourceFile::read(file_ref, path)
    }
}

impl SourceFile {
    pub fn read(file_ref: String, path: PathBuf) -> Result<Self, SnippetError> {
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SnippetError::FileNotFound { file_ref, resolved: path });
            }
            Err(source) => {
                return Err(SnippetError::Unreadable { file_ref, resolved: path, source });
            }
        };

        if !metadata.is_file() {
            return Err(SnippetError::FileNotFound { file_ref, resolved: path });
        }

        match fs::read(&path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                Ok(SourceFile { file_ref, path, text })
            }
            Err(source) => Err(SnippetError::Unreadable { file_ref, resolved: path, source }),
        }
    }

    pub fn lines(&self) -> Vec<Line<'_>> {
        Line::split(&self.text)
    }
}

impl From<SourceFile> for FileRef {
    fn from(file: SourceFile) -> Self {
        FileRef::Resolved(file)
    }
}
