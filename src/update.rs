//! # Incremental Archive Update
//!
//! Rewrites an existing archive against a new input set: a state machine
//! walks the old entry stream one entry at a time and resolves each into an
//! explicit action — drop it, merge the manifest delta into it, replace it
//! with new content, or copy it byte-for-byte. New entries that matched
//! nothing in the old stream are appended afterwards.
//!
//! Output always goes to a temporary file next to the target and replaces it
//! only once the full rewrite succeeded, so every failure path leaves the
//! original archive untouched.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::ZipWriter;
use zip::ZipArchive;

use crate::builder::{write_entry, write_merged_manifest, WriteOptions};
use crate::error::JarError;
use crate::expand::{Expansion, PendingReplacements};
use crate::manifest::{ManifestModel, INDEX_NAME, MANIFEST_NAME};

/// What an update run wants changed beyond plain entry replacement.
#[derive(Debug, Default)]
pub struct UpdatePlan<'a> {
    /// New manifest content, merged over the old manifest (delta wins on
    /// conflicting keys).
    pub manifest_delta: Option<&'a ManifestModel>,
    /// Main-class override, validated for ambiguity against the merged
    /// manifest before anything is persisted.
    pub main_class: Option<&'a str>,
    /// A freshly computed classpath index; supersedes any index entry in the
    /// old archive and is written as the first entry of the new one.
    pub new_index: Option<&'a str>,
}

impl UpdatePlan<'_> {
    fn has_manifest_delta(&self) -> bool {
        self.manifest_delta.is_some() || self.main_class.is_some()
    }
}

/// The resolution for one old entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryAction {
    /// Superseded (old index, or suppressed manifest): not carried over.
    Drop,
    /// The manifest entry, with a delta pending: parse, merge, rewrite.
    MergeManifest,
    /// A new input shares this name: write the new content in this position.
    Replace,
    /// Untouched: copy byte-for-byte, preserving method, crc and extra data.
    CopyVerbatim,
}

fn classify(name: &str, pending: &PendingReplacements, plan: &UpdatePlan, opts: &WriteOptions) -> EntryAction {
    if name == INDEX_NAME && plan.new_index.is_some() {
        return EntryAction::Drop;
    }
    if name == MANIFEST_NAME {
        if opts.suppress_manifest {
            return EntryAction::Drop;
        }
        if plan.has_manifest_delta() {
            return EntryAction::MergeManifest;
        }
    }
    if pending.contains(name) {
        return EntryAction::Replace;
    }
    EntryAction::CopyVerbatim
}

/// Reconciles `target` with the expanded inputs and the plan, atomically
/// replacing the archive on success.
pub fn update_archive(
    target: &Path,
    expansion: &Expansion,
    plan: &UpdatePlan,
    opts: &WriteOptions,
) -> Result<(), JarError> {
    let file = File::open(target).map_err(|e| JarError::io(e, target))?;
    let mut old = ZipArchive::new(file).map_err(|e| JarError::CorruptArchive { path: target.to_path_buf(), source: e })?;

    let parent = target.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let temp = NamedTempFile::new_in(parent).map_err(|e| JarError::io(e, parent))?;
    let mut zip = ZipWriter::new(temp.as_file().try_clone().map_err(|e| JarError::io(e, temp.path()))?);

    if let Some(index_text) = plan.new_index {
        use std::io::Write;
        zip.start_file(INDEX_NAME, opts.entry_options(false))?;
        zip.write_all(index_text.as_bytes()).map_err(|e| JarError::io(e, target))?;
    }

    let mut pending = PendingReplacements::build(expansion, opts.self_name.as_deref());
    if plan.has_manifest_delta() {
        // the delta owns the manifest; an input expanding to the manifest
        // path must not be appended as a second entry
        if pending.take(MANIFEST_NAME).is_some() {
            debug!("input manifest superseded by the manifest delta");
        }
    }
    let mut found_manifest = false;

    for i in 0..old.len() {
        let (name, action) = {
            let entry = old.by_index_raw(i)?;
            let name = entry.name().to_string();
            let action = classify(&name, &pending, plan, opts);
            (name, action)
        };
        debug!(name = %name, ?action, "old entry");
        match action {
            EntryAction::Drop => {}
            EntryAction::MergeManifest => {
                let mut text = Vec::new();
                old.by_index(i)?.read_to_end(&mut text).map_err(|e| JarError::io(e, target))?;
                let mut merged = ManifestModel::parse(text.as_slice()).map_err(|e| JarError::io(e, target))?;
                if let Some(delta) = plan.manifest_delta {
                    merged.merge(delta);
                }
                if let Some(class) = plan.main_class {
                    merged.set_main_class(class)?;
                }
                write_merged_manifest(&mut zip, &merged, opts)?;
                found_manifest = true;
            }
            EntryAction::Replace => {
                if let Some(entry) = pending.take(&name) {
                    write_entry(&mut zip, entry, opts)?;
                }
            }
            EntryAction::CopyVerbatim => {
                let entry = old.by_index_raw(i)?;
                zip.raw_copy_file(entry)?;
            }
        }
    }

    for entry in pending.remaining() {
        write_entry(&mut zip, entry, opts)?;
    }

    if !found_manifest && plan.has_manifest_delta() && !opts.suppress_manifest {
        let mut manifest = match plan.manifest_delta {
            Some(delta) => delta.clone(),
            None => ManifestModel::default_manifest(),
        };
        if let Some(class) = plan.main_class {
            manifest.set_main_class(class)?;
        }
        write_merged_manifest(&mut zip, &manifest, opts)?;
    }

    zip.finish()?;
    temp.persist(target).map_err(|e| JarError::io(e.error, target))?;
    Ok(())
}
