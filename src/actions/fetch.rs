use crate::{
    actions::{exists, write_stream},
    config::Config,
    dispatch::{
        registry::Action,
        types::{ActionRequest, Outcome},
    },
    errors::{AppError, AppResult},
    resolver::PathResolver,
};
use async_trait::async_trait;
use reqwest::Url;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::info;

/// Downloads a URL into the current folder under the name the server gives
/// it in the URL path.
pub struct FetchRemote {
    resolver: Arc<PathResolver>,
    client: reqwest::Client,
    enabled: bool,
    max_kb: usize,
}

impl FetchRemote {
    pub fn new(cfg: &Config, resolver: Arc<PathResolver>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.fetch.timeout)
            .user_agent(concat!("filemaster/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { resolver, client, enabled: cfg.fetch.enabled, max_kb: cfg.limits.max_fetch_kb })
    }
}

#[async_trait]
impl Action for FetchRemote {
    fn name(&self) -> &'static str { "fetch_remote" }

    async fn call(&self, req: &ActionRequest) -> AppResult<Outcome> {
        if !self.enabled {
            return Err(AppError::FetchDisabled);
        }
        let url = parse_url(req.field("url"))?;
        let name = remote_file_name(&url);
        let target = self.resolver.contained_child(req.dir(), &name)?;
        if exists(&target).await {
            return Err(AppError::AlreadyExists(name));
        }

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::FetchFailed(e.to_string()))?;
        if resp.content_length().is_some_and(|len| len > (self.max_kb as u64) * 1024) {
            return Err(AppError::TooLarge(self.max_kb));
        }

        // the download may have taken a while; prove the folder again
        let target = self.resolver.contained_child(req.dir(), &name)?;
        let written = write_stream(&target, &name, resp.bytes_stream(), self.max_kb, |e| {
            AppError::FetchFailed(e.to_string())
        })
        .await?;
        info!(url = %url, bytes = written, "remote file stored");
        Ok(Outcome::new("Remote file fetched successfully", target))
    }
}

fn parse_url(raw: &str) -> AppResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|_| AppError::InvalidUrl)?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::InvalidUrl);
    }
    Ok(url)
}

/// Last path segment, percent-decoded. URLs without one get a timestamped
/// name.
fn remote_file_name(url: &Url) -> String {
    let last = url.path_segments().and_then(|s| s.last()).unwrap_or("");
    let decoded = urlencoding::decode(last).map(|c| c.into_owned()).unwrap_or_else(|_| last.to_string());
    let base = decoded.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match base {
        "" | "." | ".." => {
            let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
            format!("remote_{secs}")
        }
        b => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{form, resolver};
    use assert_fs::prelude::*;
    use axum::{routing::get, Router};

    async fn serve_fixture() -> String {
        let app = Router::new()
            .route("/files/notes.txt", get(|| async { "remote notes" }))
            .route("/files/big.bin", get(|| async { vec![7u8; 4096] }))
            .route("/missing", get(|| async { (axum::http::StatusCode::NOT_FOUND, "nope") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn action(tmp: &assert_fs::TempDir, max_fetch_kb: usize) -> FetchRemote {
        let mut cfg = Config::for_tests(tmp.path());
        cfg.limits.max_fetch_kb = max_fetch_kb;
        FetchRemote::new(&cfg, resolver(tmp)).unwrap()
    }

    #[test]
    fn file_names_come_from_the_url_path() {
        let name = |u: &str| remote_file_name(&Url::parse(u).unwrap());
        assert_eq!(name("https://example.com/a/b/report%20final.pdf?x=1"), "report final.pdf");
        assert_eq!(name("https://example.com/readme.txt"), "readme.txt");
        assert_eq!(name("https://example.com/a/..%2F..%2Fpasswd"), "passwd");
        assert!(name("https://example.com/").starts_with("remote_"));
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(parse_url("https://example.com/x").is_ok());
        assert!(parse_url(" http://example.com/x ").is_ok());
        assert!(matches!(parse_url("file:///etc/passwd"), Err(AppError::InvalidUrl)));
        assert!(matches!(parse_url("not a url"), Err(AppError::InvalidUrl)));
    }

    #[tokio::test]
    async fn fetches_into_the_requested_folder_keeping_the_name() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("inbox").create_dir_all().unwrap();
        let base = serve_fixture().await;
        let out = action(&tmp, 64)
            .call(&form("fetch_remote", &[("dir", "inbox"), ("url", &format!("{base}/files/notes.txt"))]))
            .await
            .unwrap();
        assert_eq!(out.message, "Remote file fetched successfully");
        tmp.child("inbox/notes.txt").assert("remote notes");
        assert!(!tmp.path().join("inbox/notes.php").exists());
    }

    #[tokio::test]
    async fn oversized_and_failed_downloads_leave_nothing_behind() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let base = serve_fixture().await;
        let a = action(&tmp, 1);
        let err = a.call(&form("fetch_remote", &[("url", &format!("{base}/files/big.bin"))])).await.unwrap_err();
        assert!(matches!(err, AppError::TooLarge(1)));
        assert!(!tmp.path().join("big.bin").exists());

        let err = a.call(&form("fetch_remote", &[("url", &format!("{base}/missing"))])).await.unwrap_err();
        assert!(matches!(err, AppError::FetchFailed(_)));
        assert!(!tmp.path().join("missing").exists());
    }

    #[tokio::test]
    async fn existing_target_and_outside_folder_are_refused_before_download() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("notes.txt").write_str("local").unwrap();
        let a = action(&tmp, 64);
        // nothing listens here; both checks must fail before any request
        let url = "http://127.0.0.1:9/files/notes.txt";
        assert!(matches!(
            a.call(&form("fetch_remote", &[("url", url)])).await,
            Err(AppError::AlreadyExists(_))
        ));
        assert!(matches!(
            a.call(&form("fetch_remote", &[("dir", "../.."), ("url", url)])).await,
            Err(AppError::InvalidPath)
        ));
        tmp.child("notes.txt").assert("local");
    }

    #[tokio::test]
    async fn disabled_fetch_is_refused() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let mut cfg = Config::for_tests(tmp.path());
        cfg.fetch.enabled = false;
        let a = FetchRemote::new(&cfg, resolver(&tmp)).unwrap();
        assert!(matches!(
            a.call(&form("fetch_remote", &[("url", "https://example.com/x")])).await,
            Err(AppError::FetchDisabled)
        ));
    }
}
