use crate::{
    actions::write_stream,
    dispatch::types::Outcome,
    errors::{AppError, AppResult},
    resolver::PathResolver,
};
use axum::extract::{multipart::MultipartError, Multipart};
use http::StatusCode;

/// Form field carrying the file.
pub const UPLOAD_FIELD: &str = "upload";

/// Stores the first `upload` part of a multipart body in `dir`, under the
/// client-supplied file name with any directory part stripped.
pub async fn store_upload(
    resolver: &PathResolver,
    dir: &str,
    mut multipart: Multipart,
    max_kb: usize,
) -> AppResult<Outcome> {
    let on_err = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::TooLarge(max_kb)
        } else {
            AppError::Io(e.body_text())
        }
    };
    while let Some(field) = multipart.next_field().await.map_err(on_err)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = client_file_name(field.file_name().unwrap_or(""));
        if name.is_empty() {
            return Err(AppError::MissingField("Upload file"));
        }
        let target = resolver.contained_child(dir, &name)?;
        write_stream(&target, &name, field, max_kb, on_err).await?;
        return Ok(Outcome::new("File uploaded successfully", target));
    }
    Err(AppError::MissingField("Upload file"))
}

/// Browsers on some platforms send full client paths.
fn client_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_paths_are_reduced_to_base_names() {
        assert_eq!(client_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(client_file_name("C:\\Users\\me\\photo.jpg"), "photo.jpg");
        assert_eq!(client_file_name("../../etc/passwd"), "passwd");
        assert_eq!(client_file_name("dir/"), "");
    }
}
