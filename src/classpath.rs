//! # Transitive Classpath Index
//!
//! Computes the flattened list of archives transitively reachable from a
//! root archive through the `Class-Path` manifest attribute, depth first,
//! root first. A visited set keyed on resolved paths makes the traversal
//! safe on cyclic dependency graphs. The rendered index is grafted back into
//! the archive as `META-INF/INDEX.LIST` through the updater.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::warn;
use zip::ZipArchive;

use crate::error::JarError;
use crate::manifest::{ManifestModel, CLASS_PATH_ATTR, MANIFEST_NAME};

const INDEX_VERSION_LINE: &str = "JarIndex-Version: 1.0";

/// The computed closure, in depth-first visitation order with the root
/// first.
#[derive(Debug)]
pub struct ClasspathIndex {
    paths: Vec<PathBuf>,
}

impl ClasspathIndex {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Renders the index record: version header, blank line, one line per
    /// resolved archive path.
    pub fn render(&self) -> String {
        let mut text = String::from(INDEX_VERSION_LINE);
        text.push_str("\n\n");
        for path in &self.paths {
            text.push_str(&path.display().to_string());
            text.push('\n');
        }
        text
    }
}

/// Builds the transitive closure rooted at `root`. When the root declares no
/// `Class-Path` references and `extras` were supplied, each extra is visited
/// as an additional root. Returns the index plus non-fatal warnings.
pub fn build_index(root: &Path, extras: &[PathBuf]) -> Result<(ClasspathIndex, Vec<String>), JarError> {
    let mut traversal = Traversal::default();
    let root_declared = traversal.visit(root)?;
    if !root_declared {
        for extra in extras {
            traversal.visit(extra)?;
        }
    }
    Ok((ClasspathIndex { paths: traversal.order }, traversal.warnings))
}

/// Per-invocation traversal state; constructed fresh for every indexing run.
#[derive(Default)]
struct Traversal {
    visited: HashSet<PathBuf>,
    order: Vec<PathBuf>,
    warnings: Vec<String>,
}

impl Traversal {
    /// Visits one archive: records it, then recurses into its `Class-Path`
    /// references. Returns whether the archive declared any references.
    ///
    /// The visited set is keyed on canonicalized paths so the same archive
    /// reached through different relative spellings is still traversed once.
    fn visit(&mut self, path: &Path) -> Result<bool, JarError> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !self.visited.insert(key) {
            return Ok(false);
        }

        let file = File::open(path).map_err(|e| JarError::io(e, path))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| JarError::CorruptArchive { path: path.to_path_buf(), source: e })?;
        let manifest = read_manifest(&mut archive, path)?;

        self.order.push(path.to_path_buf());

        let class_path = match manifest.as_ref().and_then(|m| m.global().get(CLASS_PATH_ATTR)) {
            Some(value) => value.to_string(),
            None => return Ok(false),
        };

        let base = path.parent().unwrap_or(Path::new(""));
        for token in class_path.split_whitespace() {
            if token.ends_with('/') {
                continue;
            }
            let resolved = base.join(token);
            // a dangling reference poisons one edge, not the whole index
            if let Err(e) = self.visit(&resolved) {
                warn!(reference = %resolved.display(), error = %e, "skipping unreadable classpath reference");
                self.warnings.push(format!("skipping classpath reference '{}': {}", resolved.display(), e));
            }
        }
        Ok(true)
    }
}

fn read_manifest<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
) -> Result<Option<ManifestModel>, JarError> {
    use std::io::Read;
    let mut entry = match archive.by_name(MANIFEST_NAME) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(JarError::CorruptArchive { path: path.to_path_buf(), source: e }),
    };
    let mut text = Vec::new();
    entry.read_to_end(&mut text).map_err(|e| JarError::io(e, path))?;
    Ok(Some(ManifestModel::parse(text.as_slice()).map_err(|e| JarError::io(e, path))?))
}
