//! # Archive Construction
//!
//! Emits a brand-new archive from an expanded entry list and an optional
//! manifest, and hosts the single-entry write rules shared with the updater:
//! directories and zero-length files are always STORED with size 0 and crc 0,
//! non-empty files use the configured method, and store-only mode precomputes
//! size/CRC with a full single-pass read before the entry header goes out.

use std::fs::File;
use std::io::{self, Read, Seek, Write};

use tracing::debug;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::JarError;
use crate::expand::FilesystemEntry;
use crate::manifest::{ManifestModel, MANIFEST_DIR, MANIFEST_NAME};
use crate::names::NameNormalizer;

const COPY_BUF: usize = 64 * 1024;

/// Knobs shared by build and update.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Write every entry STORED instead of compressed.
    pub store_only: bool,
    /// Do not emit (and on update, drop) the manifest entry.
    pub suppress_manifest: bool,
    /// The target archive's own relocated name; entries resolving to it are
    /// skipped so an archive never embeds itself.
    pub self_name: Option<String>,
}

impl WriteOptions {
    pub(crate) fn entry_options(&self, stored: bool) -> FileOptions {
        let method = if stored || self.store_only { CompressionMethod::Stored } else { CompressionMethod::Deflated };
        FileOptions::default().compression_method(method)
    }
}

/// Writes a complete new archive: optional manifest (directory marker first),
/// then every expanded entry in order.
pub fn write_archive<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    entries: &[FilesystemEntry],
    manifest: Option<&ManifestModel>,
    opts: &WriteOptions,
) -> Result<(), JarError> {
    if let Some(manifest) = manifest {
        if !opts.suppress_manifest {
            write_manifest_entry(zip, manifest, opts)?;
        }
    }
    for entry in entries {
        if NameNormalizer::is_skippable(&entry.name, opts.self_name.as_deref()) {
            debug!(name = %entry.name, "skipping entry");
            continue;
        }
        if opts.suppress_manifest && entry.name == MANIFEST_NAME {
            debug!("manifest emission suppressed, skipping input manifest");
            continue;
        }
        write_entry(zip, entry, opts)?;
    }
    Ok(())
}

/// Writes the `META-INF/` directory marker followed by the manifest entry.
/// The manifest is always serialized to an in-memory sink first, so in
/// store-only mode its size and CRC are known before the header is emitted.
pub fn write_manifest_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    manifest: &ManifestModel,
    opts: &WriteOptions,
) -> Result<(), JarError> {
    zip.add_directory(MANIFEST_DIR, opts.entry_options(true))?;
    let bytes = manifest.to_bytes();
    zip.start_file(MANIFEST_NAME, opts.entry_options(false))?;
    zip.write_all(&bytes).map_err(|e| JarError::io(e, MANIFEST_NAME))?;
    Ok(())
}

/// Writes the manifest entry alone, without the directory marker. Used by the
/// updater when replacing a manifest mid-stream (the old archive already has
/// its own marker, or deliberately none).
pub fn write_merged_manifest<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    manifest: &ManifestModel,
    opts: &WriteOptions,
) -> Result<(), JarError> {
    let bytes = manifest.to_bytes();
    zip.start_file(MANIFEST_NAME, opts.entry_options(false))?;
    zip.write_all(&bytes).map_err(|e| JarError::io(e, MANIFEST_NAME))?;
    Ok(())
}

/// Writes one filesystem entry following the shared rules.
pub fn write_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    entry: &FilesystemEntry,
    opts: &WriteOptions,
) -> Result<(), JarError> {
    if entry.is_dir {
        zip.add_directory(entry.name.as_str(), opts.entry_options(true))?;
        return Ok(());
    }

    let len = entry
        .path
        .metadata()
        .map_err(|e| JarError::io(e, &entry.path))?
        .len();
    if len == 0 {
        // zero-length files are STORED, no payload follows
        zip.start_file(entry.name.as_str(), opts.entry_options(true))?;
        return Ok(());
    }

    let mut file = File::open(&entry.path).map_err(|e| JarError::io(e, &entry.path))?;
    let file_options = opts.entry_options(false).large_file(len > u32::MAX as u64);

    if opts.store_only {
        let (data, crc) = read_full(&mut file, &entry.path, len)?;
        debug!(name = %entry.name, crc, size = len, "stored entry precomputed");
        zip.start_file(entry.name.as_str(), file_options)?;
        zip.write_all(&data).map_err(|e| JarError::io(e, &entry.path))?;
    } else {
        zip.start_file(entry.name.as_str(), file_options)?;
        io::copy(&mut file, zip).map_err(|e| JarError::io(e, &entry.path))?;
    }
    Ok(())
}

/// STORED needs size/crc before the header: read the whole file in one pass,
/// accumulating the CRC, and fail if the byte count disagrees with the length
/// `stat` reported (the file mutated under us).
fn read_full(file: &mut File, path: &std::path::Path, expected_len: u64) -> Result<(Vec<u8>, u32), JarError> {
    let mut data = Vec::with_capacity(expected_len as usize);
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; COPY_BUF];
    loop {
        let n = file.read(&mut buf).map_err(|e| JarError::io(e, path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        data.extend_from_slice(&buf[..n]);
    }
    if data.len() as u64 != expected_len {
        return Err(JarError::LengthMismatch { path: path.to_path_buf(), expected: expected_len, actual: data.len() as u64 });
    }
    Ok((data, hasher.finalize()))
}
