//! Archive entry name normalization.
//!
//! Maps filesystem paths onto canonical archive-internal entry names:
//! forward-slash separated, relocation prefixes stripped, no leading `./`.
//! Pure string manipulation; no I/O happens here.

use std::path::Path;

/// Maps filesystem paths to archive entry names, honoring the relocation
/// prefixes registered via the `-C` directory-change mechanism.
///
/// Prefix matching is longest-match-wins; when two registered prefixes have
/// the same length the one registered first wins.
#[derive(Debug, Default, Clone)]
pub struct NameNormalizer {
    /// Registered relocation prefixes, already converted to `/` separators,
    /// in registration order.
    prefixes: Vec<String>,
}

impl NameNormalizer {
    pub fn new() -> Self {
        Self { prefixes: Vec::new() }
    }

    /// Registers a relocation prefix. Subsequent `normalize` calls strip the
    /// longest registered prefix that literally prefixes the path.
    pub fn register(&mut self, prefix: impl AsRef<Path>) {
        let converted = to_slashes(prefix.as_ref());
        if !converted.is_empty() {
            self.prefixes.push(converted);
        }
    }

    /// Converts `path` to its archive entry name.
    ///
    /// OS separators become `/`, then the longest matching relocation prefix
    /// is stripped, then a single leading `/` or `./` is removed. The result
    /// can be empty or `.`; callers must skip such entries rather than write
    /// them.
    pub fn normalize(&self, path: impl AsRef<Path>) -> String {
        let converted = to_slashes(path.as_ref());

        let mut best: Option<&str> = None;
        for prefix in &self.prefixes {
            if converted.starts_with(prefix.as_str()) {
                match best {
                    // strictly longer wins; equal length keeps the earlier one
                    Some(b) if prefix.len() <= b.len() => {}
                    _ => best = Some(prefix),
                }
            }
        }

        let mut name = match best {
            Some(prefix) => &converted[prefix.len()..],
            None => converted.as_str(),
        };

        if let Some(rest) = name.strip_prefix("./") {
            name = rest;
        } else if let Some(rest) = name.strip_prefix('/') {
            name = rest;
        }
        name.to_string()
    }

    /// True when `name` must not be written into the archive: empty names,
    /// the bare current-directory marker, and the archive's own relocated
    /// name (an archive must never embed itself).
    pub fn is_skippable(name: &str, self_name: Option<&str>) -> bool {
        if name.is_empty() || name == "." {
            return true;
        }
        matches!(self_name, Some(own) if own == name)
    }
}

fn to_slashes(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        raw.into_owned()
    } else {
        raw.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
