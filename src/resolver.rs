//! Path confinement.
//!
//! Every path that reaches the filesystem goes through [`PathResolver`]:
//! `resolve` anchors an untrusted string at the base directory and
//! `contained` proves the canonical result stays inside it. Entries that do
//! not exist yet are validated through their parent with `contained_child`.

use crate::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct PathResolver {
    base: PathBuf,
    /// `base` with `/` separators and no trailing separator; empty when the
    /// base is the filesystem root.
    base_str: String,
}

impl PathResolver {
    pub fn new(root: &Path) -> anyhow::Result<Self> {
        let base = dunce::canonicalize(root)?;
        if !base.is_dir() {
            anyhow::bail!("base directory is not a directory: {}", base.display());
        }
        let base_str = slashes(&base.to_string_lossy()).trim_end_matches('/').to_string();
        Ok(Self { base, base_str })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Anchors `requested` at the base directory. Purely syntactic: the
    /// result may still escape through `..` or symlinks.
    pub fn resolve(&self, requested: &str) -> PathBuf {
        let raw = slashes(requested);
        let joined = if self.is_anchored(&raw) {
            raw
        } else {
            let decoded = urlencoding::decode_binary(requested.as_bytes());
            let decoded = slashes(&String::from_utf8_lossy(&decoded));
            if self.is_anchored(&decoded) {
                decoded
            } else if decoded.starts_with('/') {
                format!("{}{}", self.base_str, decoded)
            } else {
                format!("{}/{}", self.base_str, decoded)
            }
        };
        let trimmed = joined.trim_end_matches('/');
        if trimmed.is_empty() {
            PathBuf::from("/")
        } else {
            PathBuf::from(trimmed)
        }
    }

    /// True only when `path` canonicalizes to the base or a descendant.
    /// Missing or unreadable paths are never contained.
    pub fn is_contained(&self, path: &Path) -> bool {
        self.canonical_within(path).is_some()
    }

    /// `resolve` followed by the containment proof. Returns the canonical
    /// path, which is the one callers must hand to the filesystem.
    pub fn contained(&self, requested: &str) -> AppResult<PathBuf> {
        let resolved = self.resolve(requested);
        self.canonical_within(&resolved).ok_or_else(|| {
            warn!(requested = requested, resolved = %resolved.display(), "path rejected");
            AppError::InvalidPath
        })
    }

    pub fn contained_dir(&self, requested: &str) -> AppResult<PathBuf> {
        let path = self.contained(requested)?;
        if !path.is_dir() {
            return Err(AppError::NotADirectory);
        }
        Ok(path)
    }

    pub fn contained_file(&self, requested: &str) -> AppResult<PathBuf> {
        let path = self.contained(requested)?;
        if !path.is_file() {
            return Err(AppError::NotAFile);
        }
        Ok(path)
    }

    /// Target for a new entry `name` inside `dir`. The parent must exist and
    /// be contained; `name` must be a single plain component.
    pub fn contained_child(&self, dir: &str, name: &str) -> AppResult<PathBuf> {
        let name = validate_name(name)?;
        let parent = self.contained_dir(dir)?;
        Ok(parent.join(name))
    }

    /// The directory entry named by `requested`, for delete and rename. The
    /// entry's target must be contained and must not be the base; the entry
    /// path is rebuilt from its canonical parent so a symlink is acted on
    /// rather than followed.
    pub fn contained_entry(&self, requested: &str) -> AppResult<ContainedEntry> {
        let target = self.contained(requested)?;
        if self.is_base(&target) {
            warn!(requested = requested, "refusing to act on the base directory");
            return Err(AppError::InvalidPath);
        }
        let resolved = self.resolve(requested);
        let (Some(name), Some(parent)) = (resolved.file_name(), resolved.parent()) else {
            return Err(AppError::InvalidPath);
        };
        let parent = self.canonical_within(parent).ok_or(AppError::InvalidPath)?;
        Ok(ContainedEntry { entry: parent.join(name), target })
    }

    pub fn is_base(&self, path: &Path) -> bool {
        path == self.base
    }

    /// Renders a contained path relative to the base with `/` separators,
    /// `.` standing for the base itself. `%` is escaped as `%25` so the
    /// result fed back through `resolve` names the same entry.
    pub fn display(&self, path: &Path) -> String {
        let Ok(rel) = path.strip_prefix(&self.base) else {
            return ".".to_string();
        };
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().replace('%', "%25"))
            .collect();
        if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join("/")
        }
    }

    fn is_anchored(&self, candidate: &str) -> bool {
        !candidate.is_empty() && Path::new(candidate).starts_with(&self.base)
    }

    fn canonical_within(&self, path: &Path) -> Option<PathBuf> {
        let canonical = dunce::canonicalize(path).ok()?;
        canonical.starts_with(&self.base).then_some(canonical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainedEntry {
    /// The entry as it appears in its (canonical) parent directory.
    pub entry: PathBuf,
    /// Where the entry leads once symlinks are followed.
    pub target: PathBuf,
}

/// Accepts a single plain file name, as typed into a form or sent as an
/// upload file name.
pub fn validate_name(name: &str) -> AppResult<&str> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::InvalidName(name.to_string()));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(AppError::InvalidName(name.to_string()));
    }
    Ok(name)
}

fn slashes(s: &str) -> String {
    s.replace('\\', "/")
}
