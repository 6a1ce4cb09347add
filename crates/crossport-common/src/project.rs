use serde::{Deserialize, Serialize};
use std::fmt;

/// A single source file: full path plus content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFile {
    pub file_name: String,
    pub content: String,
}

impl CodeFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// A named collection of source files plus optional read-only reference
/// files, tagged with the language the sources are written in.
///
/// Projects are passed by ownership through a workflow run; stages hand back
/// a new value rather than mutating their input. The one documented
/// exception is `source_language`, which callers overwrite in place when a
/// translation result becomes the next step's source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeProject {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub files: Vec<CodeFile>,
    #[serde(default)]
    pub reference_files: Vec<CodeFile>,
    #[serde(default)]
    pub source_language: String,
}

impl CodeProject {
    /// Build a project. When no display name is given, the first file's
    /// final path component is used.
    pub fn new(
        files: Vec<CodeFile>,
        source_language: impl Into<String>,
        display_name: Option<String>,
        reference_files: Option<Vec<CodeFile>>,
    ) -> Self {
        let mut display_name = display_name.unwrap_or_default();
        if display_name.is_empty() {
            if let Some(first) = files.first() {
                display_name = first
                    .file_name
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or_default()
                    .to_string();
            }
        }
        Self {
            display_name,
            files,
            reference_files: reference_files.unwrap_or_default(),
            source_language: source_language.into(),
        }
    }

    /// A project with no files carries no information worth sending anywhere.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl fmt::Display for CodeProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CodeProject: {} ({}) with {} files and {} reference files",
            self.display_name,
            self.source_language,
            self.files.len(),
            self.reference_files.len()
        )
    }
}
