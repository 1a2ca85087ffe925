//! Discovery of PDF files to ingest.
//!
//! Explicit file arguments are taken as given; directories are walked for
//! `*.pdf` (case-insensitive), top level only unless `recursive` is set.
//! Results from each directory are sorted for deterministic batch order.

use anyhow::{bail, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn pdf_matcher() -> Result<GlobMatcher> {
    Ok(GlobBuilder::new("*.pdf")
        .case_insensitive(true)
        .build()?
        .compile_matcher())
}

/// All PDF files under `root`, sorted by path.
pub fn scan_pdf_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Not a directory: {}", root.display());
    }

    let matcher = pdf_matcher()?;
    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::info!(dir = %root.display(), count = files.len(), "found PDF files");
    Ok(files)
}

/// Expand a mix of file and directory arguments into a list of files,
/// preserving argument order.
pub fn collect_inputs(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            out.extend(scan_pdf_files(path, recursive)?);
        } else if path.exists() {
            out.push(path.clone());
        } else {
            bail!("No such file or directory: {}", path.display());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("b.pdf"), b"b").unwrap();
        fs::write(root.join("A.PDF"), b"a").unwrap();
        fs::write(root.join("notes.txt"), b"n").unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/c.pdf"), b"c").unwrap();
        tmp
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_top_level_only() {
        let tmp = layout();
        let files = scan_pdf_files(tmp.path(), false).unwrap();
        assert_eq!(names(&files), vec!["A.PDF", "b.pdf"]);
    }

    #[test]
    fn test_recursive() {
        let tmp = layout();
        let files = scan_pdf_files(tmp.path(), true).unwrap();
        assert_eq!(names(&files), vec!["A.PDF", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_collect_inputs_mixed() {
        let tmp = layout();
        let inputs = vec![tmp.path().join("notes.txt"), tmp.path().join("sub")];
        let files = collect_inputs(&inputs, false).unwrap();
        assert_eq!(names(&files), vec!["notes.txt", "c.pdf"]);
    }

    #[test]
    fn test_missing_path_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(collect_inputs(&[tmp.path().join("nope.pdf")], false).is_err());
        assert!(scan_pdf_files(&tmp.path().join("nope"), false).is_err());
    }
}
