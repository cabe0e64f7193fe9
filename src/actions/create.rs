use crate::{
    actions::create_new,
    dispatch::{
        registry::Action,
        types::{ActionRequest, Outcome},
    },
    errors::{AppError, AppResult},
    resolver::PathResolver,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

pub struct CreateFile { resolver: Arc<PathResolver> }

impl CreateFile { pub fn new(resolver: Arc<PathResolver>) -> Self { Self { resolver } } }

#[async_trait]
impl Action for CreateFile {
    fn name(&self) -> &'static str { "create_file" }

    async fn call(&self, req: &ActionRequest) -> AppResult<Outcome> {
        let name = req.field("filename").trim();
        if name.is_empty() {
            return Err(AppError::MissingField("File name"));
        }
        let target = self.resolver.contained_child(req.dir(), name)?;
        let mut file = create_new(&target, name).await?;
        file.write_all(req.field("content").as_bytes()).await?;
        file.flush().await?;
        Ok(Outcome::new("File created successfully", target))
    }
}

pub struct CreateDir { resolver: Arc<PathResolver> }

impl CreateDir { pub fn new(resolver: Arc<PathResolver>) -> Self { Self { resolver } } }

#[async_trait]
impl Action for CreateDir {
    fn name(&self) -> &'static str { "create_dir" }

    async fn call(&self, req: &ActionRequest) -> AppResult<Outcome> {
        let name = req.field("dirname").trim();
        if name.is_empty() {
            return Err(AppError::MissingField("Folder name"));
        }
        let target = self.resolver.contained_child(req.dir(), name)?;
        let mut builder = tokio::fs::DirBuilder::new();
        #[cfg(unix)]
        builder.mode(0o755);
        builder.create(&target).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => AppError::AlreadyExists(name.to_string()),
            _ => e.into(),
        })?;
        Ok(Outcome::new("Folder created successfully", target))
    }
}
