use crate::{
    dispatch::{
        registry::Action,
        types::{ActionRequest, Outcome},
    },
    errors::{AppError, AppResult},
    resolver::PathResolver,
};
use async_trait::async_trait;
use std::sync::Arc;

pub struct DeleteFile { resolver: Arc<PathResolver> }

impl DeleteFile { pub fn new(resolver: Arc<PathResolver>) -> Self { Self { resolver } } }

#[async_trait]
impl Action for DeleteFile {
    fn name(&self) -> &'static str { "delete_file" }

    async fn call(&self, req: &ActionRequest) -> AppResult<Outcome> {
        let found = self.resolver.contained_entry(req.field("target"))?;
        if !found.target.is_file() {
            return Err(AppError::NotAFile);
        }
        tokio::fs::remove_file(&found.entry).await?;
        Ok(Outcome::new("File deleted successfully", found.entry))
    }
}

pub struct DeleteDir { resolver: Arc<PathResolver> }

impl DeleteDir { pub fn new(resolver: Arc<PathResolver>) -> Self { Self { resolver } } }

#[async_trait]
impl Action for DeleteDir {
    fn name(&self) -> &'static str { "delete_dir" }

    async fn call(&self, req: &ActionRequest) -> AppResult<Outcome> {
        let found = self.resolver.contained_entry(req.field("target"))?;
        if !found.target.is_dir() {
            return Err(AppError::NotADirectory);
        }
        let meta = tokio::fs::symlink_metadata(&found.entry).await?;
        if meta.file_type().is_symlink() {
            // only the link goes; the folder it points at stays
            tokio::fs::remove_file(&found.entry).await?;
            return Ok(Outcome::new("Folder deleted successfully", found.entry));
        }
        // read_dir never yields `.` or `..`, so any entry means non-empty
        let mut rd = tokio::fs::read_dir(&found.entry).await?;
        if rd.next_entry().await?.is_some() {
            return Err(AppError::NotEmpty);
        }
        tokio::fs::remove_dir(&found.entry).await?;
        Ok(Outcome::new("Folder deleted successfully", found.entry))
    }
}
