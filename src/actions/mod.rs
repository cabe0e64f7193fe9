pub mod create;
pub mod delete;
pub mod edit;
pub mod fetch;
pub mod upload;

use crate::errors::{AppError, AppResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::Path;
use tokio::{fs::File, io::AsyncWriteExt};

/// Opens `path` for writing only if nothing, not even a dangling symlink,
/// exists there yet.
pub(crate) async fn create_new(path: &Path, name: &str) -> AppResult<File> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => AppError::AlreadyExists(name.to_string()),
            _ => e.into(),
        })
}

pub(crate) async fn exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

/// Streams `body` into a freshly created file at `target`, capped at
/// `max_kb`. The partial file is removed on any failure.
pub(crate) async fn write_stream<S, E>(
    target: &Path,
    name: &str,
    body: S,
    max_kb: usize,
    on_err: impl Fn(E) -> AppError,
) -> AppResult<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut file = create_new(target, name).await?;
    let mut body = std::pin::pin!(body);
    let max_bytes = (max_kb as u64) * 1024;
    let mut written = 0u64;
    let copied: AppResult<()> = async {
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(&on_err)?;
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(AppError::TooLarge(max_kb));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
    .await;
    if let Err(e) = copied {
        drop(file);
        let _ = tokio::fs::remove_file(target).await;
        return Err(e);
    }
    Ok(written)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::{dispatch::types::ActionRequest, resolver::PathResolver};
    use std::{collections::HashMap, sync::Arc};

    pub fn resolver(tmp: &assert_fs::TempDir) -> Arc<PathResolver> {
        Arc::new(PathResolver::new(tmp.path()).unwrap())
    }

    pub fn form(action: &str, fields: &[(&str, &str)]) -> ActionRequest {
        let mut map: HashMap<String, String> =
            fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        map.insert("action".into(), action.into());
        ActionRequest::from_form(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[tokio::test]
    async fn write_stream_caps_size_and_cleans_up() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let target = tmp.path().join("big.bin");
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from(vec![0u8; 1024])), Ok(Bytes::from(vec![0u8; 1]))];
        let res = write_stream(&target, "big.bin", futures::stream::iter(chunks), 1, AppError::from).await;
        assert!(matches!(res, Err(AppError::TooLarge(1))));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn write_stream_refuses_existing_target() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("a.txt").write_str("keep").unwrap();
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from_static(b"new"))];
        let res = write_stream(&tmp.path().join("a.txt"), "a.txt", futures::stream::iter(chunks), 1, AppError::from).await;
        assert!(matches!(res, Err(AppError::AlreadyExists(n)) if n == "a.txt"));
        tmp.child("a.txt").assert("keep");
    }

    #[tokio::test]
    async fn write_stream_writes_all_chunks() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let n = write_stream(&tmp.path().join("x"), "x", futures::stream::iter(chunks), 1, AppError::from).await.unwrap();
        assert_eq!(n, 4);
        tmp.child("x").assert("abcd");
    }
}
