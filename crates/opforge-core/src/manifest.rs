//! Manifest reference expansion and loading
//!
//! Workload configs reference manifests as files, directories or glob
//! patterns, relative to the directory holding the config. Expansion flattens
//! those references into an ordered list of files:
//!
//! - files are taken as-is
//! - directories expand to every `.yaml`/`.yml` file beneath them, sorted
//! - glob patterns expand to their matches, sorted
//!
//! The first occurrence of a file wins, so overlapping references never yield
//! duplicates. Paths are canonicalized before comparison, which makes two
//! spellings of the same directory (`manifests`, `./manifests/`) equivalent.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{CoreError, Result};

/// Extensions recognized as manifests when expanding a directory
const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A single manifest file, optionally with its content loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Canonical path of the file
    pub path: PathBuf,

    /// Path relative to the base the reference was resolved against
    pub relative: PathBuf,

    content: Option<String>,
}

impl Manifest {
    /// Create an entry for a manifest that has not been read yet
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
            content: None,
        }
    }

    /// Create an entry with inline content, without touching the filesystem
    pub fn inline(relative: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let relative = relative.into();
        Self {
            path: relative.clone(),
            relative,
            content: Some(content.into()),
        }
    }

    /// Content of the manifest, if loaded
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    /// Read the manifest from disk, replacing any previously loaded content
    pub fn load(&mut self) -> Result<()> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CoreError::MissingManifest {
                path: self.path.clone(),
            },
            _ => CoreError::UnreadableManifest {
                path: self.path.clone(),
                message: e.to_string(),
            },
        })?;

        trace!(path = %self.path.display(), bytes = content.len(), "loaded manifest");
        self.content = Some(content);
        Ok(())
    }
}

/// Expand manifest references into an ordered, de-duplicated list of files
pub fn expand_manifests<S: AsRef<str>>(base: &Path, references: &[S]) -> Result<Vec<Manifest>> {
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut manifests = Vec::new();

    for reference in references {
        let reference = reference.as_ref().trim();
        if reference.is_empty() {
            continue;
        }

        let files = expand_reference(base, reference)?;
        debug!(reference, files = files.len(), "expanded manifest reference");

        for file in files {
            let canonical = file.canonicalize().map_err(|e| match e.kind() {
                ErrorKind::NotFound => CoreError::MissingManifest { path: file.clone() },
                _ => CoreError::UnreadableManifest {
                    path: file.clone(),
                    message: e.to_string(),
                },
            })?;

            if !seen.insert(canonical.clone()) {
                trace!(path = %canonical.display(), "skipping duplicate manifest");
                continue;
            }

            let relative = canonical
                .strip_prefix(&canonical_base)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| canonical.clone());

            manifests.push(Manifest::new(canonical, relative));
        }
    }

    Ok(manifests)
}

/// Expand references and read every resulting manifest
pub fn load_manifests<S: AsRef<str>>(base: &Path, references: &[S]) -> Result<Vec<Manifest>> {
    let mut manifests = expand_manifests(base, references)?;
    for manifest in &mut manifests {
        manifest.load()?;
    }
    Ok(manifests)
}

fn expand_reference(base: &Path, reference: &str) -> Result<Vec<PathBuf>> {
    if is_glob(reference) {
        return expand_glob(base, reference);
    }

    let path = resolve(base, reference);

    let metadata = std::fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CoreError::MissingManifest { path: path.clone() },
        _ => CoreError::UnreadableManifest {
            path: path.clone(),
            message: e.to_string(),
        },
    })?;

    if metadata.is_dir() {
        expand_directory(&path)
    } else {
        Ok(vec![path])
    }
}

fn resolve(base: &Path, reference: &str) -> PathBuf {
    let path = Path::new(reference);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn is_glob(reference: &str) -> bool {
    reference.contains(['*', '?', '['])
}

/// Only `reference` is a pattern; the base directory matches literally
fn expand_glob(base: &Path, reference: &str) -> Result<Vec<PathBuf>> {
    let pattern = resolve(base, reference);
    let pattern_str = if Path::new(reference).is_absolute() {
        reference.to_string()
    } else {
        let escaped = glob::Pattern::escape(&base.to_string_lossy());
        Path::new(&escaped).join(reference).to_string_lossy().into_owned()
    };
    let paths = glob::glob(&pattern_str).map_err(|e| CoreError::GlobPattern {
        pattern: pattern_str.clone(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let entry = entry.map_err(|e| CoreError::UnreadableManifest {
            path: e.path().to_path_buf(),
            message: e.error().to_string(),
        })?;

        if entry.is_dir() {
            files.extend(expand_directory(&entry)?);
        } else {
            files.push(entry);
        }
    }

    if files.is_empty() {
        return Err(CoreError::MissingManifest {
            path: pattern.to_path_buf(),
        });
    }

    files.sort();
    Ok(files)
}

fn expand_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::UnreadableManifest {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            message: e.to_string(),
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if MANIFEST_EXTENSIONS.contains(&ext.as_str()) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Split manifest content into YAML documents
///
/// Returns `(first_line, text)` pairs where `first_line` is the 1-based line
/// number the document starts on. Documents holding only comments or
/// whitespace are skipped.
pub fn split_documents(content: &str) -> Vec<(usize, String)> {
    let mut documents = Vec::new();
    let mut current = String::new();
    let mut start = 1;

    for (idx, line) in content.lines().enumerate() {
        if is_document_separator(line) {
            push_document(&mut documents, start, &current);
            current.clear();
            start = idx + 2;
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    push_document(&mut documents, start, &current);

    documents
}

/// `---` on its own line, optionally followed by a comment
pub(crate) fn is_document_separator(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("---") else {
        return false;
    };
    let rest = rest.trim();
    rest.is_empty() || rest.starts_with('#')
}

fn push_document(documents: &mut Vec<(usize, String)>, start: usize, text: &str) {
    let meaningful = text
        .lines()
        .any(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'));
    if meaningful {
        documents.push((start, text.to_string()));
    }
}
