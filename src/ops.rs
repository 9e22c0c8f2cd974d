//! # Operation Facade
//!
//! The public surface consumed by the CLI (or any other thin front end):
//! `create`, `update`, and `build_index`, each returning success or a
//! `JarError` plus a list of non-fatal warnings. No process-exit coupling
//! lives here.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::warn;
use zip::write::ZipWriter;

use crate::builder::{write_archive, WriteOptions};
use crate::classpath;
use crate::error::JarError;
use crate::expand::{expand, Expansion};
use crate::manifest::ManifestModel;
use crate::names::NameNormalizer;
use crate::update::{update_archive, UpdatePlan};

/// Non-fatal diagnostics accumulated by a successful operation.
#[derive(Debug, Default)]
pub struct Outcome {
    pub warnings: Vec<String>,
}

/// Options shared by `create` and `update`.
#[derive(Debug, Default, Clone)]
pub struct JarOptions {
    /// Input files and directories, expanded in order.
    pub inputs: Vec<PathBuf>,
    /// Path to a user-supplied manifest (merged over the old one on update).
    /// Mutually exclusive with `no_manifest`.
    pub manifest: Option<PathBuf>,
    /// Main-class override; ambiguity is validated before any write.
    /// Mutually exclusive with `no_manifest`.
    pub main_class: Option<String>,
    /// STORED entries only, no compression.
    pub store_only: bool,
    /// Do not emit a manifest at all.
    pub no_manifest: bool,
    /// Relocation prefixes stripped from entry names (`-C` directories).
    pub relocations: Vec<PathBuf>,
}

impl JarOptions {
    fn normalizer(&self) -> NameNormalizer {
        let mut normalizer = NameNormalizer::new();
        for prefix in &self.relocations {
            normalizer.register(prefix);
        }
        normalizer
    }

    fn write_options(&self, target: &Path, normalizer: &NameNormalizer) -> WriteOptions {
        WriteOptions {
            store_only: self.store_only,
            suppress_manifest: self.no_manifest,
            self_name: Some(normalizer.normalize(target)),
        }
    }

    /// Rejects combinations the manifest handling cannot honor. The CLI
    /// blocks them at parse time; callers driving this surface directly get
    /// an error instead of a silently ignored option.
    fn validate(&self) -> Result<(), JarError> {
        if self.no_manifest && self.main_class.is_some() {
            return Err(JarError::InvalidOptions(
                "a main-class override cannot be combined with manifest suppression".to_string(),
            ));
        }
        if self.no_manifest && self.manifest.is_some() {
            return Err(JarError::InvalidOptions(
                "a manifest file cannot be combined with manifest suppression".to_string(),
            ));
        }
        Ok(())
    }

    fn load_manifest(&self) -> Result<Option<ManifestModel>, JarError> {
        match &self.manifest {
            Some(path) => {
                let file = File::open(path).map_err(|e| JarError::io(e, path))?;
                let manifest = ManifestModel::read(BufReader::new(file)).map_err(|e| JarError::io(e, path))?;
                Ok(Some(manifest))
            }
            None => Ok(None),
        }
    }
}

fn expand_inputs(opts: &JarOptions, normalizer: &NameNormalizer) -> Result<(Expansion, Vec<String>), JarError> {
    let expansion = expand(&opts.inputs, normalizer)?;
    if !expansion.missing.is_empty() {
        return Err(JarError::MissingInput(expansion.missing));
    }
    let mut warnings = Vec::new();
    if expansion.entries.is_empty() {
        warn!("no entries found in inputs");
        warnings.push("no entries found".to_string());
    }
    Ok((expansion, warnings))
}

/// Builds a brand-new archive at `output`.
pub fn create(output: &Path, opts: &JarOptions) -> Result<Outcome, JarError> {
    opts.validate()?;
    let normalizer = opts.normalizer();
    let (expansion, warnings) = expand_inputs(opts, &normalizer)?;

    let manifest = if opts.no_manifest {
        None
    } else {
        Some(match opts.load_manifest()? {
            Some(manifest) => manifest,
            None => ManifestModel::default_manifest(),
        })
    };
    // validate the override before any output exists
    let manifest = match (manifest, &opts.main_class) {
        (Some(mut m), Some(class)) => {
            m.set_main_class(class)?;
            Some(m)
        }
        (m, _) => m,
    };

    let write_opts = opts.write_options(output, &normalizer);
    let parent = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let temp = NamedTempFile::new_in(parent).map_err(|e| JarError::io(e, parent))?;
    let mut zip = ZipWriter::new(temp.as_file().try_clone().map_err(|e| JarError::io(e, temp.path()))?);
    write_archive(&mut zip, &expansion.entries, manifest.as_ref(), &write_opts)?;
    zip.finish()?;
    temp.persist(output).map_err(|e| JarError::io(e.error, output))?;

    Ok(Outcome { warnings })
}

/// Updates `target` in place: new inputs replace same-named entries, a
/// manifest delta merges over the old manifest, everything else is copied
/// verbatim. The original archive survives any failure untouched.
pub fn update(target: &Path, opts: &JarOptions) -> Result<Outcome, JarError> {
    opts.validate()?;
    let normalizer = opts.normalizer();
    let (expansion, warnings) = expand_inputs(opts, &normalizer)?;

    let manifest_delta = opts.load_manifest()?;
    let plan = UpdatePlan {
        manifest_delta: manifest_delta.as_ref(),
        main_class: opts.main_class.as_deref(),
        new_index: None,
    };
    let write_opts = opts.write_options(target, &normalizer);
    update_archive(target, &expansion, &plan, &write_opts)?;

    Ok(Outcome { warnings })
}

/// Computes the transitive classpath closure of `target` and grafts the
/// rendered index into the archive, superseding any previous index entry.
pub fn build_index(target: &Path, extras: &[PathBuf]) -> Result<Outcome, JarError> {
    let (index, warnings) = classpath::build_index(target, extras)?;
    let rendered = index.render();
    let plan = UpdatePlan { new_index: Some(&rendered), ..Default::default() };
    update_archive(target, &Expansion::default(), &plan, &WriteOptions::default())?;
    Ok(Outcome { warnings })
}
