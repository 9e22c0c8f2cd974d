use std::path::PathBuf;

use zip::result::ZipError;

/// The primary error type for all operations in the `jarc` crate.
#[derive(Debug)]
pub enum JarError {
    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened.
    Io { source: std::io::Error, path: PathBuf },

    /// One or more input paths did not exist. Collected across all inputs of
    /// an operation so every bad path is reported at once.
    MissingInput(Vec<PathBuf>),

    /// A main-class override was requested but the manifest already declares
    /// a `Main-Class` attribute. Raised before any output is written.
    AmbiguousMainClass,

    /// Mutually exclusive options were combined, such as a main-class
    /// override together with manifest suppression.
    InvalidOptions(String),

    /// A file changed size between `stat` and the full read performed for the
    /// STORED-mode CRC precompute.
    LengthMismatch { path: PathBuf, expected: u64, actual: u64 },

    /// An existing archive could not be parsed during an update or index run.
    CorruptArchive { path: PathBuf, source: ZipError },

    /// An error from the underlying `zip` codec while reading or writing
    /// entries.
    Zip(ZipError),
}

impl std::fmt::Display for JarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JarError::Io { source, path } => write!(f, "I/O error on path '{}': {}", path.display(), source),
            JarError::MissingInput(paths) => {
                let list: Vec<String> = paths.iter().map(|p| format!("'{}'", p.display())).collect();
                write!(f, "No such file or directory: {}", list.join(", "))
            }
            JarError::AmbiguousMainClass => write!(f, "Main-Class already set in manifest, cannot override it"),
            JarError::InvalidOptions(reason) => write!(f, "Invalid options: {}", reason),
            JarError::LengthMismatch { path, expected, actual } => write!(
                f,
                "File '{}' changed during read: expected {} bytes, got {}",
                path.display(),
                expected,
                actual
            ),
            JarError::CorruptArchive { path, source } => write!(f, "Cannot parse archive '{}': {}", path.display(), source),
            JarError::Zip(e) => write!(f, "Archive codec error: {}", e),
        }
    }
}

impl std::error::Error for JarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JarError::Io { source, .. } => Some(source),
            JarError::CorruptArchive { source, .. } => Some(source),
            JarError::Zip(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ZipError> for JarError {
    fn from(err: ZipError) -> Self {
        JarError::Zip(err)
    }
}

// Generic IO error conversion that doesn't carry a path
impl From<std::io::Error> for JarError {
    fn from(err: std::io::Error) -> Self {
        JarError::Io { source: err, path: PathBuf::new() }
    }
}

impl JarError {
    /// Attach a path to a bare I/O error at the call site that knows it.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        JarError::Io { source, path: path.into() }
    }
}
