use std::{fmt, io};
use std::path::PathBuf;

use crate::error::ErrorDetail;

/// Why a snippet could not be verified.
#[derive(Debug)]
pub enum SnippetError {
    /// The tag's markup is not a single path argument.
    InvalidArguments {
        markup: String,
        reason: &'static str,
    },
    /// The tag body is empty after trimming, or every line of it is skipped.
    EmptyBlock {
        file_ref: String,
    },
    /// The reference does not resolve to an existing regular file.
    FileNotFound {
        file_ref: String,
        resolved: PathBuf,
    },
    /// The file exists but could not be read.
    Unreadable {
        file_ref: String,
        resolved: PathBuf,
        source: io::Error,
    },
    /// A snippet line has no match at or after the cursor.
    LineNotMatched {
        file_ref: String,
        resolved: PathBuf,
        /// The offending line, trimmed.
        line: String,
        /// 1-based line number of `line` within the block.
        block_line: usize,
        /// Source line after which the search began; `0` is the file start.
        after_line: usize,
        block: String,
    },
}

impl fmt::Display for SnippetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnippetError::InvalidArguments { markup, reason } => {
                write!(f, "invalid snippet arguments `{markup}`: {reason}")
            }
            SnippetError::EmptyBlock { file_ref } => {
                write!(f, "snippet for `{file_ref}` has no lines to verify")
            }
            SnippetError::FileNotFound { file_ref, resolved } => {
                write!(f, "snippet file `{file_ref}` not found at {}", resolved.display())
            }
            SnippetError::Unreadable { file_ref, resolved, .. } => {
                write!(f, "snippet file `{file_ref}` at {} could not be read", resolved.display())
            }
            SnippetError::LineNotMatched { file_ref, line, .. } => {
                write!(f, "snippet line `{line}` not found in order in `{file_ref}`")
            }
        }
    }
}

impl std::error::Error for SnippetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnippetError::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl ErrorDetail for SnippetError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let kv = |k: &str, v: String| (Some(k.to_string()), v);
        match self {
            SnippetError::InvalidArguments { .. } => vec![
                (None, "expected exactly one (optionally quoted) file path".into()),
            ],
            SnippetError::EmptyBlock { .. } => vec![],
            SnippetError::FileNotFound { resolved, .. } => vec![
                kv("resolved path", resolved.display().to_string()),
            ],
            SnippetError::Unreadable { resolved, source, .. } => vec![
                kv("resolved path", resolved.display().to_string()),
                kv("cause", source.to_string()),
            ],
            SnippetError::LineNotMatched { resolved, block_line, after_line, block, .. } => {
                let searched = match after_line {
                    0 => "from the start of the file".to_string(),
                    n => format!("after source line {n}"),
                };

                vec![
                    kv("resolved path", resolved.display().to_string()),
                    kv("snippet line", block_line.to_string()),
                    kv("searched", searched),
                    kv("snippet", format!("\n{block}")),
                ]
            }
        }
    }
}
