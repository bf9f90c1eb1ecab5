use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// File scanner for finding declaration files under a root directory.
///
/// The `FileScanner` recursively walks the root directory and keeps every file whose path,
/// relative to the root, matches a glob pattern. It skips `target` and hidden directories
/// (those starting with `.`). `*` does not cross directory separators; use `**` for that.
///
/// # Example
///
/// ```no_run
/// use controller_openapi::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./src/types"), "**/*.rs").unwrap();
/// let result = scanner.scan().unwrap();
/// println!("Found {} declaration files", result.files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    pattern: Pattern,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Matching files, sorted by path
    pub files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid glob.
    pub fn new(root_path: PathBuf, pattern: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern)
            .with_context(|| format!("Invalid file pattern: {}", pattern))?;
        Ok(Self { root_path, pattern })
    }

    /// Walks the directory tree and collects the matching files.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a readable directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            anyhow::bail!("Schema root is not a directory: {}", self.root_path.display());
        }

        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        let mut files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if !path.is_file() {
                        continue;
                    }
                    let relative = path.strip_prefix(&self.root_path).unwrap_or(path);
                    if self.pattern.matches_path_with(relative, options) {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        files.sort();
        debug!(
            "{} files under {} match {}",
            files.len(),
            self.root_path.display(),
            self.pattern
        );

        Ok(ScanResult { files, warnings })
    }
}
