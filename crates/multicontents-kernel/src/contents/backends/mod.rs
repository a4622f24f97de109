//! Contents backends.
//!
//! Backends implement [`ContentsManager`](super::ContentsManager) for
//! different storage types.

mod local;
mod memory;

pub use local::FileContentsManager;
pub use memory::MemoryContentsManager;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::types::{Content, ContentFormat, ContentType, ContentsModel};
use super::{ContentsError, ContentsResult};

/// Stored payload of a file or notebook.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Body {
    Bytes(Vec<u8>),
    Notebook(serde_json::Value),
}

impl Body {
    /// Extract the payload a client sent with `save`.
    pub(crate) fn from_model(model: ContentsModel, path: &str) -> ContentsResult<Self> {
        let missing = || ContentsError::bad_request(format!("no file content provided: {}", path));
        match model.kind {
            ContentType::Notebook => match model.content {
                Some(Content::Json(nb)) => Ok(Body::Notebook(nb)),
                Some(Content::Text(raw)) => Ok(Body::Notebook(serde_json::from_str(&raw)?)),
                Some(Content::Directory(_)) => Err(ContentsError::bad_request(format!(
                    "notebook content must be a document: {}",
                    path
                ))),
                None => Err(missing()),
            },
            ContentType::File => match (model.content, model.format) {
                (Some(Content::Text(encoded)), Some(ContentFormat::Base64)) => STANDARD
                    .decode(encoded.as_bytes())
                    .map(Body::Bytes)
                    .map_err(|e| ContentsError::bad_request(format!("invalid base64 body: {}", e))),
                (Some(Content::Text(text)), _) => Ok(Body::Bytes(text.into_bytes())),
                (Some(Content::Json(value)), _) => {
                    Ok(Body::Bytes(serde_json::to_vec_pretty(&value)?))
                }
                (Some(Content::Directory(_)), _) => Err(ContentsError::bad_request(format!(
                    "file content must be text: {}",
                    path
                ))),
                (None, _) => Err(missing()),
            },
            ContentType::Directory => Err(ContentsError::is_a_directory(path.to_string())),
        }
    }

    /// Serialized form written to disk.
    pub(crate) fn into_bytes(self) -> ContentsResult<Vec<u8>> {
        match self {
            Body::Bytes(bytes) => Ok(bytes),
            Body::Notebook(nb) => Ok(serde_json::to_vec_pretty(&nb)?),
        }
    }

    /// Fill `model` with this payload in the requested format.
    pub(crate) fn fill(&self, model: &mut ContentsModel, format: Option<ContentFormat>) -> ContentsResult<()> {
        match self {
            Body::Notebook(nb) => {
                model.content = Some(Content::Json(nb.clone()));
                model.format = Some(ContentFormat::Json);
            }
            Body::Bytes(bytes) => {
                let text = match format {
                    Some(ContentFormat::Base64) => None,
                    _ => std::str::from_utf8(bytes).ok(),
                };
                match (text, format) {
                    (Some(text), _) => {
                        model.content = Some(Content::Text(text.to_string()));
                        model.format = Some(ContentFormat::Text);
                    }
                    (None, Some(ContentFormat::Text)) => {
                        return Err(ContentsError::bad_request(format!(
                            "{} is not UTF-8 encoded",
                            model.path
                        )));
                    }
                    (None, _) => {
                        model.content = Some(Content::Text(STANDARD.encode(bytes)));
                        model.format = Some(ContentFormat::Base64);
                    }
                }
                model.mimetype = Some(guess_mimetype(
                    &model.name,
                    model.format == Some(ContentFormat::Text),
                ));
            }
        }
        Ok(())
    }
}

/// Best-effort MIME type for a plain file.
pub(crate) fn guess_mimetype(name: &str, is_text: bool) -> String {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    let mime = match ext.as_deref() {
        Some("txt" | "md" | "rst" | "log" | "cfg" | "ini" | "toml" | "yaml" | "yml") => "text/plain",
        Some("py") => "text/x-python",
        Some("rs") => "text/x-rust",
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        _ if is_text => "text/plain",
        _ => "application/octet-stream",
    };
    mime.to_string()
}
