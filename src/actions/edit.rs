use crate::{
    actions::exists,
    dispatch::{
        registry::Action,
        types::{ActionRequest, Outcome},
    },
    errors::{AppError, AppResult},
    resolver::{validate_name, PathResolver},
};
use async_trait::async_trait;
use std::sync::Arc;

pub struct Rename { resolver: Arc<PathResolver> }

impl Rename { pub fn new(resolver: Arc<PathResolver>) -> Self { Self { resolver } } }

#[async_trait]
impl Action for Rename {
    fn name(&self) -> &'static str { "rename" }

    async fn call(&self, req: &ActionRequest) -> AppResult<Outcome> {
        let new_name = req.field("new").trim();
        if new_name.is_empty() {
            return Err(AppError::MissingField("New name"));
        }
        let new_name = validate_name(new_name)?;
        let found = self.resolver.contained_entry(req.field("old"))?;
        let parent = found.entry.parent().ok_or(AppError::InvalidPath)?;
        let renamed = parent.join(new_name);
        if exists(&renamed).await {
            return Err(AppError::AlreadyExists(new_name.to_string()));
        }
        tokio::fs::rename(&found.entry, &renamed).await?;
        Ok(Outcome::new("Renamed successfully", renamed))
    }
}

/// Overwrites an existing file with the editor contents.
pub struct SaveFile { resolver: Arc<PathResolver> }

impl SaveFile { pub fn new(resolver: Arc<PathResolver>) -> Self { Self { resolver } } }

#[async_trait]
impl Action for SaveFile {
    fn name(&self) -> &'static str { "save_file" }

    async fn call(&self, req: &ActionRequest) -> AppResult<Outcome> {
        let path = self.resolver.contained_file(req.field("file"))?;
        tokio::fs::write(&path, req.field("content").as_bytes()).await?;
        Ok(Outcome::new("File saved successfully", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{form, resolver};
    use assert_fs::prelude::*;

    #[tokio::test]
    async fn renames_within_the_same_folder() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("docs/a.txt").write_str("x").unwrap();
        let action = Rename::new(resolver(&tmp));
        let out = action.call(&form("rename", &[("old", "docs/a.txt"), ("new", "b.txt")])).await.unwrap();
        assert_eq!(out.path, tmp.path().canonicalize().unwrap().join("docs/b.txt"));
        tmp.child("docs/b.txt").assert("x");
        assert!(!tmp.path().join("docs/a.txt").exists());
    }

    #[tokio::test]
    async fn rename_refuses_collisions_and_moves() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("a.txt").write_str("a").unwrap();
        tmp.child("b.txt").write_str("b").unwrap();
        let action = Rename::new(resolver(&tmp));
        assert!(matches!(
            action.call(&form("rename", &[("old", "a.txt"), ("new", "b.txt")])).await,
            Err(AppError::AlreadyExists(_))
        ));
        assert!(matches!(
            action.call(&form("rename", &[("old", "a.txt"), ("new", "../a.txt")])).await,
            Err(AppError::InvalidName(_))
        ));
        assert!(matches!(
            action.call(&form("rename", &[("old", "a.txt"), ("new", "")])).await,
            Err(AppError::MissingField("New name"))
        ));
        tmp.child("b.txt").assert("b");
    }

    #[tokio::test]
    async fn base_directory_cannot_be_renamed() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let action = Rename::new(resolver(&tmp));
        assert!(matches!(
            action.call(&form("rename", &[("old", "."), ("new", "moved")])).await,
            Err(AppError::InvalidPath)
        ));
    }

    #[tokio::test]
    async fn saves_existing_files_only() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("a.txt").write_str("old").unwrap();
        let action = SaveFile::new(resolver(&tmp));
        action.call(&form("save_file", &[("file", "a.txt"), ("content", "new")])).await.unwrap();
        tmp.child("a.txt").assert("new");
        assert!(matches!(
            action.call(&form("save_file", &[("file", "missing.txt"), ("content", "x")])).await,
            Err(AppError::InvalidPath)
        ));
        assert!(!tmp.path().join("missing.txt").exists());
    }
}
