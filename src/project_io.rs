//! Loading a project directory into a [`CodeProject`] and writing one back.

use anyhow::{Context, Result};
use crossport_common::{CodeFile, CodeProject};
use std::path::Path;
use tracing::warn;

/// Directories never worth shipping to the generators.
const SKIPPED_DIRS: [&str; 6] = ["target", "bin", "obj", "node_modules", ".git", ".vs"];

/// Read every text file under `dir` into a project tagged with
/// `source_language`. Hidden entries, build output, and non-UTF-8 files are
/// skipped (the latter with a warning).
pub fn load_project(
    dir: &Path,
    source_language: &str,
    display_name: Option<&str>,
) -> Result<CodeProject> {
    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(name.starts_with('.') && entry.depth() > 0)
                && !(entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
        });
    for entry in walker {
        let entry = entry.context("failed to walk project directory")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        match std::fs::read_to_string(entry.path()) {
            Ok(content) => files.push(CodeFile::new(relative, content)),
            Err(err) => warn!(file = %relative, error = %err, "skipping unreadable file"),
        }
    }
    anyhow::ensure!(!files.is_empty(), "no readable files in {}", dir.display());

    let display_name = display_name.map(str::to_string).or_else(|| {
        dir.file_name()
            .map(|name| name.to_string_lossy().to_string())
    });
    Ok(CodeProject::new(
        files,
        source_language,
        display_name,
        None,
    ))
}

/// Write a project's files under `out_dir`, creating directories as needed.
/// Returns the number of files written.
pub fn write_project(project: &CodeProject, out_dir: &Path) -> Result<usize> {
    for file in &project.files {
        let path = out_dir.join(&file.file_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, &file.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(project.files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_project_reads_files_relative_to_root() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/Main.cs"), "class Main {}").unwrap();
        std::fs::write(dir.path().join("App.csproj"), "<Project/>").unwrap();

        let project = load_project(dir.path(), "dotnetframework", Some("App")).unwrap();
        assert_eq!(project.source_language, "dotnetframework");
        assert_eq!(project.display_name, "App");
        let names: Vec<_> = project.files.iter().map(|f| f.file_name.as_str()).collect();
        assert!(names.contains(&"src/Main.cs"));
        assert!(names.contains(&"App.csproj"));
    }

    #[test]
    fn load_project_skips_build_output() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/App.dll"), "binary").unwrap();
        std::fs::write(dir.path().join("Main.cs"), "class Main {}").unwrap();

        let project = load_project(dir.path(), "dotnet8", None).unwrap();
        assert_eq!(project.files.len(), 1);
        assert_eq!(project.files[0].file_name, "Main.cs");
    }

    #[test]
    fn load_project_fails_on_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(load_project(dir.path(), "java8", None).is_err());
    }

    #[test]
    fn write_project_round_trips() {
        let dir = tempdir().unwrap();
        let out = tempdir().unwrap();
        std::fs::write(dir.path().join("Main.java"), "class Main {}").unwrap();
        let project = load_project(dir.path(), "java8", None).unwrap();

        let written = write_project(&project, out.path()).unwrap();
        assert_eq!(written, 1);
        let content = std::fs::read_to_string(out.path().join("Main.java")).unwrap();
        assert_eq!(content, "class Main {}");
    }
}
