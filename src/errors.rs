use axum::response::{Html, IntoResponse, Response};
use http::{header, HeaderValue, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("origin denied")]
    OriginDenied,
    #[error("request too large")]
    RequestTooLarge,
    #[error("too many requests")]
    RateLimited,
    #[error("Invalid path")]
    InvalidPath,
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("No such file or folder")]
    NotFound,
    #[error("Not a folder")]
    NotADirectory,
    #[error("Not a file")]
    NotAFile,
    #[error("Target already exists: {0}")]
    AlreadyExists(String),
    #[error("Folder is not empty")]
    NotEmpty,
    #[error("File is not valid UTF-8 text")]
    NotText,
    #[error("File exceeds the {0} KB limit")]
    TooLarge(usize),
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Remote fetch is disabled")]
    FetchDisabled,
    #[error("Failed to fetch remote file: {0}")]
    FetchFailed(String),
    #[error("{0} cannot be empty")]
    MissingField(&'static str),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "Unauthorized",
            AppError::OriginDenied => "OriginDenied",
            AppError::RequestTooLarge => "RequestTooLarge",
            AppError::RateLimited => "RateLimited",
            AppError::InvalidPath => "InvalidPath",
            AppError::InvalidName(_) => "InvalidName",
            AppError::NotFound => "NotFound",
            AppError::NotADirectory => "NotADirectory",
            AppError::NotAFile => "NotAFile",
            AppError::AlreadyExists(_) => "AlreadyExists",
            AppError::NotEmpty => "NotEmpty",
            AppError::NotText => "NotText",
            AppError::TooLarge(_) => "TooLarge",
            AppError::InvalidUrl => "InvalidUrl",
            AppError::FetchDisabled => "FetchDisabled",
            AppError::FetchFailed(_) => "FetchFailed",
            AppError::MissingField(_) => "MissingField",
            AppError::UnknownAction(_) => "UnknownAction",
            AppError::Io(_) => "Io",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::OriginDenied | AppError::InvalidPath | AppError::FetchDisabled => StatusCode::FORBIDDEN,
            AppError::RequestTooLarge | AppError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) | AppError::NotEmpty => StatusCode::CONFLICT,
            AppError::InvalidName(_)
            | AppError::NotADirectory
            | AppError::NotAFile
            | AppError::NotText
            | AppError::InvalidUrl
            | AppError::MissingField(_)
            | AppError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            AppError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound,
            _ => AppError::Io(e.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Html(format!(
            "<!DOCTYPE html><html><head><meta charset=\"UTF-8\"><title>{code}</title></head>\
             <body><h1>{status}</h1><p>{message}</p></body></html>",
            code = self.code(),
            status = status,
            message = html_escape::encode_text(&self.to_string()),
        ));
        let mut resp = (status, body).into_response();
        if matches!(self, AppError::Unauthorized) {
            resp.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"filemaster\", charset=\"UTF-8\""),
            );
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_domain_errors() {
        let nf = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(AppError::from(nf), AppError::NotFound));
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(AppError::from(denied).code(), "Io");
    }

    #[test]
    fn unauthorized_asks_for_basic_credentials() {
        let resp = AppError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let challenge = resp.headers().get(header::WWW_AUTHENTICATE).unwrap();
        assert!(challenge.to_str().unwrap().starts_with("Basic"));
    }

    #[test]
    fn invalid_path_is_forbidden() {
        assert_eq!(AppError::InvalidPath.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InvalidPath.to_string(), "Invalid path");
    }
}
