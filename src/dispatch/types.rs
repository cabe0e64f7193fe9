use crate::errors::AppResult;
use std::{collections::HashMap, path::PathBuf};

/// A decoded form post: the `action` selector plus its remaining fields.
#[derive(Debug, Default, Clone)]
pub struct ActionRequest {
    pub action: String,
    pub fields: HashMap<String, String>,
}

impl ActionRequest {
    pub fn from_form(mut fields: HashMap<String, String>) -> Self {
        let action = fields.remove("action").unwrap_or_default();
        Self { action, fields }
    }

    /// Missing fields read as empty.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn dir(&self) -> &str {
        match self.field("dir") {
            "" => ".",
            d => d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: &'static str,
    pub path: PathBuf,
}

impl Outcome {
    pub fn new(message: &'static str, path: PathBuf) -> Self {
        Self { message, path }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashKind {
    Success,
    Error,
    #[default]
    Info,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
            FlashKind::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "success" => FlashKind::Success,
            "error" => FlashKind::Error,
            _ => FlashKind::Info,
        }
    }
}

/// One-shot message carried through the redirect after a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub message: String,
    pub kind: FlashKind,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: FlashKind::Error }
    }

    pub fn from_result(res: &AppResult<Outcome>) -> Self {
        match res {
            Ok(o) => Self { message: o.message.to_string(), kind: FlashKind::Success },
            Err(e) => Self::error(format!("Error: {e}")),
        }
    }
}
