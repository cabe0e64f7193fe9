use crate::{
    config::Limits,
    errors::{AppError, AppResult},
    resolver::PathResolver,
};
use std::{cmp::Ordering, path::PathBuf, sync::Arc};
use tokio::io::AsyncReadExt;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    /// Path relative to the base directory, as used in links.
    pub display: String,
    pub is_dir: bool,
    pub size: u64,
    /// False for symlinks that dangle or lead out of the base.
    pub reachable: bool,
}

/// Read-only operations over the confined tree.
#[derive(Clone)]
pub struct Browser {
    resolver: Arc<PathResolver>,
    limits: Limits,
}

impl Browser {
    pub fn new(resolver: Arc<PathResolver>, limits: Limits) -> Self {
        Self { resolver, limits }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub async fn list_dir(&self, dir: &str) -> AppResult<Vec<Entry>> {
        let dir_path = self.resolver.contained_dir(dir)?;
        let mut rd = tokio::fs::read_dir(&dir_path).await?;
        let mut entries = Vec::new();
        while let Some(item) = rd.next_entry().await? {
            let name = item.file_name().to_string_lossy().into_owned();
            let path = item.path();
            // a dangling symlink still gets a row
            let (is_dir, size) = match tokio::fs::metadata(&path).await {
                Ok(m) => (m.is_dir(), if m.is_dir() { 0 } else { m.len() }),
                Err(_) => (false, 0),
            };
            let reachable = self.resolver.is_contained(&path);
            entries.push(Entry { display: self.resolver.display(&path), name, is_dir, size, reachable });
        }
        entries.sort_by(listing_order);
        Ok(entries)
    }

    /// Whole-file read for the editor.
    pub async fn read_file(&self, file: &str) -> AppResult<String> {
        let path = self.resolver.contained_file(file)?;
        let meta = tokio::fs::metadata(&path).await?;
        if meta.len() > (self.limits.max_edit_kb as u64) * 1024 {
            return Err(AppError::TooLarge(self.limits.max_edit_kb));
        }
        let bytes = tokio::fs::read(&path).await?;
        String::from_utf8(bytes).map_err(|_| AppError::NotText)
    }

    pub async fn preview(&self, file: &str) -> Option<String> {
        let path = self.resolver.contained_file(file).ok()?;
        let chars = self.limits.preview_chars;
        let f = tokio::fs::File::open(&path).await.ok()?;
        let mut buf = Vec::with_capacity(chars.min(4096));
        f.take((chars as u64) * 4).read_to_end(&mut buf).await.ok()?;
        Some(String::from_utf8_lossy(&buf).chars().take(chars).collect())
    }

    /// Case-insensitive substring match on file names below `dir`.
    /// Folders and symlinks are never hits, and links are not descended.
    pub async fn search(&self, dir: &str, term: &str) -> AppResult<Vec<String>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let root = self.resolver.contained_dir(dir)?;
        let resolver = self.resolver.clone();
        let max = self.limits.max_search_results;
        tokio::task::spawn_blocking(move || walk_matches(&resolver, root, &term, max))
            .await
            .map_err(|e| AppError::Io(e.to_string()))
    }
}

fn walk_matches(resolver: &PathResolver, root: PathBuf, term: &str, max: usize) -> Vec<String> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().to_lowercase().contains(term))
        .take(max)
        .map(|e| resolver.display(e.path()))
        .collect()
}

fn listing_order(a: &Entry, b: &Entry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn browser(tmp: &assert_fs::TempDir) -> Browser {
        let resolver = Arc::new(PathResolver::new(tmp.path()).unwrap());
        Browser::new(resolver, Limits { preview_chars: 5, max_edit_kb: 1, max_search_results: 10, ..Limits::default() })
    }

    #[tokio::test]
    async fn listing_puts_folders_first_case_insensitively() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("b.txt").write_str("bb").unwrap();
        tmp.child("A.txt").write_str("a").unwrap();
        tmp.child("zeta").create_dir_all().unwrap();
        tmp.child("Alpha").create_dir_all().unwrap();
        tmp.child(".hidden").touch().unwrap();
        let names: Vec<_> = browser(&tmp).list_dir(".").await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Alpha", "zeta", ".hidden", "A.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn listing_reports_sizes_and_relative_paths() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("docs/readme.md").write_str("12345").unwrap();
        let entries = browser(&tmp).list_dir("docs").await.unwrap();
        assert_eq!(
            entries,
            vec![Entry {
                name: "readme.md".into(),
                display: "docs/readme.md".into(),
                is_dir: false,
                size: 5,
                reachable: true,
            }]
        );
    }

    #[tokio::test]
    async fn listing_outside_base_is_rejected() {
        let tmp = assert_fs::TempDir::new().unwrap();
        assert!(matches!(browser(&tmp).list_dir("..").await, Err(AppError::InvalidPath)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn escaping_symlinks_are_listed_as_unreachable() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("out")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("dangling")).unwrap();
        let entries = browser(&tmp).list_dir(".").await.unwrap();
        assert!(entries.iter().all(|e| !e.reachable));
        let out = entries.iter().find(|e| e.name == "out").unwrap();
        assert!(out.is_dir);
    }

    #[tokio::test]
    async fn read_file_enforces_text_and_size() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("ok.txt").write_str("hello").unwrap();
        tmp.child("bin.dat").write_binary(&[0xff, 0xfe, 0x00]).unwrap();
        tmp.child("big.txt").write_str(&"x".repeat(2048)).unwrap();
        let b = browser(&tmp);
        assert_eq!(b.read_file("ok.txt").await.unwrap(), "hello");
        assert!(matches!(b.read_file("bin.dat").await, Err(AppError::NotText)));
        assert!(matches!(b.read_file("big.txt").await, Err(AppError::TooLarge(1))));
        assert!(matches!(b.read_file(".").await, Err(AppError::NotAFile)));
    }

    #[tokio::test]
    async fn preview_is_truncated_by_chars() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("long.txt").write_str("héllo world").unwrap();
        let b = browser(&tmp);
        assert_eq!(b.preview("long.txt").await.as_deref(), Some("héllo"));
        assert_eq!(b.preview("missing.txt").await, None);
    }

    #[tokio::test]
    async fn search_matches_names_recursively() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("a/Report-2024.pdf").touch().unwrap();
        tmp.child("b/c/old_report.txt").touch().unwrap();
        tmp.child("b/notes.txt").touch().unwrap();
        let b = browser(&tmp);
        let hits = b.search(".", "REPORT").await.unwrap();
        assert_eq!(hits, vec!["a/Report-2024.pdf", "b/c/old_report.txt"]);
        assert!(b.search(".", "  ").await.unwrap().is_empty());
        assert_eq!(b.search("b", "notes").await.unwrap(), vec!["b/notes.txt"]);
    }

    #[tokio::test]
    async fn search_skips_matching_folders() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("reports/x.txt").touch().unwrap();
        tmp.child("reports/q1-report.txt").touch().unwrap();
        let b = browser(&tmp);
        let hits = b.search(".", "report").await.unwrap();
        assert_eq!(hits, vec!["reports/q1-report.txt"]);
        for hit in &hits {
            assert!(b.read_file(hit).await.is_ok());
        }
    }
}
