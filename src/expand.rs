//! # Input Expansion
//!
//! Recursively walks the input files and directories into a flat,
//! insertion-ordered list of filesystem entries, each annotated with its
//! normalized archive name. Directories contribute their own entry (trailing
//! `/`) followed by their listing in enumeration order.
//!
//! Nonexistent inputs are collected rather than aborting the walk, so a
//! single run reports every bad path. A stream failure mid-walk (an
//! unreadable or vanishing subtree) is a hard error instead: silently
//! omitting entries would hand back an incomplete archive with a success
//! result.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::JarError;
use crate::names::NameNormalizer;

/// A single expanded input: the on-disk path plus the archive name it will
/// be written under. Immutable once created.
#[derive(Debug, Clone)]
pub struct FilesystemEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    /// Normalized archive name; directories carry a trailing `/`.
    pub name: String,
}

/// The result of expanding a set of inputs.
#[derive(Debug, Default)]
pub struct Expansion {
    pub entries: Vec<FilesystemEntry>,
    /// Input paths that did not exist. Non-empty means the overall operation
    /// must fail, but only after every input was attempted.
    pub missing: Vec<PathBuf>,
}

/// Expands `inputs` into an ordered entry list.
///
/// A path already added is not re-added (insertion-order set semantics), so
/// listing the same file twice or overlapping a directory with one of its
/// own children yields one entry.
pub fn expand(inputs: &[PathBuf], normalizer: &NameNormalizer) -> Result<Expansion, JarError> {
    let mut expansion = Expansion::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for input in inputs {
        if !input.exists() {
            warn!(path = %input.display(), "input path does not exist");
            expansion.missing.push(input.clone());
            continue;
        }
        if input.is_dir() {
            for dir_entry in WalkDir::new(input) {
                let dir_entry = dir_entry.map_err(|e| walk_error(e, input))?;
                add_entry(&mut expansion.entries, &mut seen, dir_entry.path(), normalizer);
            }
        } else {
            add_entry(&mut expansion.entries, &mut seen, input, normalizer);
        }
    }
    Ok(expansion)
}

fn walk_error(err: walkdir::Error, input: &Path) -> JarError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| input.to_path_buf());
    match err.into_io_error() {
        Some(source) => JarError::Io { source, path },
        // walkdir reports symlink loops without an underlying io::Error
        None => JarError::io(io::Error::new(io::ErrorKind::Other, "filesystem loop detected"), path),
    }
}

fn add_entry(entries: &mut Vec<FilesystemEntry>, seen: &mut HashSet<PathBuf>, path: &Path, normalizer: &NameNormalizer) {
    if !seen.insert(path.to_path_buf()) {
        return;
    }
    let is_dir = path.is_dir();
    let mut name = normalizer.normalize(path);
    if is_dir && !name.is_empty() && name != "." && !name.ends_with('/') {
        name.push('/');
    }
    entries.push(FilesystemEntry { path: path.to_path_buf(), is_dir, name });
}

/// The replacement index built for update runs: normalized name to new
/// entry, consumed as the old archive is streamed. Whatever remains when the
/// old stream ends is appended, in original insertion order.
#[derive(Debug, Default)]
pub struct PendingReplacements {
    order: Vec<FilesystemEntry>,
    by_name: HashMap<String, usize>,
    taken: Vec<bool>,
}

impl PendingReplacements {
    /// Indexes the expanded entries by normalized name, dropping entries the
    /// writer would skip anyway (empty names, `.`, the archive's own name).
    pub fn build(expansion: &Expansion, self_name: Option<&str>) -> Self {
        let mut pending = Self::default();
        for entry in &expansion.entries {
            if NameNormalizer::is_skippable(&entry.name, self_name) {
                continue;
            }
            if pending.by_name.contains_key(&entry.name) {
                continue;
            }
            pending.by_name.insert(entry.name.clone(), pending.order.len());
            pending.order.push(entry.clone());
            pending.taken.push(false);
        }
        pending
    }

    /// Consumes and returns the replacement for `name`, if one is pending.
    pub fn take(&mut self, name: &str) -> Option<&FilesystemEntry> {
        let &i = self.by_name.get(name)?;
        if self.taken[i] {
            return None;
        }
        self.taken[i] = true;
        Some(&self.order[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.get(name).map_or(false, |&i| !self.taken[i])
    }

    /// Entries never matched against the old archive, in insertion order.
    pub fn remaining(&self) -> impl Iterator<Item = &FilesystemEntry> {
        self.order.iter().zip(self.taken.iter()).filter(|(_, &t)| !t).map(|(e, _)| e)
    }
}
