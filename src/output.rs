//! RSS 2.0 output: building the merged document and writing it to disk.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::{format_rfc1123, NormalizedItem};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Errors that can occur while serializing or writing the merged feed.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize RSS document: {0}")]
    Serialize(String),

    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An RSS 2.0 document, serialized as `<rss version="2.0">`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "rss")]
pub struct RssDocument {
    #[serde(rename = "@version")]
    pub version: String,
    pub channel: RssChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RssChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    #[serde(rename = "item")]
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    /// RFC 1123 with numeric zone in UTC, or empty when the date is unknown.
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub description: String,
}

impl From<NormalizedItem> for RssItem {
    fn from(item: NormalizedItem) -> Self {
        Self {
            title: item.title,
            link: item.link,
            pub_date: item
                .published_at
                .as_ref()
                .map(format_rfc1123)
                .unwrap_or_default(),
            description: item.description,
        }
    }
}

/// Builds the merged RSS 2.0 document.
///
/// Pure mapping: item order is preserved, the channel link is left empty and
/// an unknown item date becomes an empty `pubDate`.
pub fn build_rss(title: &str, description: &str, items: Vec<NormalizedItem>) -> RssDocument {
    RssDocument {
        version: "2.0".to_string(),
        channel: RssChannel {
            title: title.to_string(),
            link: String::new(),
            description: description.to_string(),
            items: items.into_iter().map(RssItem::from).collect(),
        },
    }
}

impl RssDocument {
    /// Serializes the document with an XML declaration and two-space indent.
    pub fn to_xml(&self) -> Result<String, OutputError> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        serializer.indent(' ', 2);
        self.serialize(serializer)
            .map_err(|e| OutputError::Serialize(e.to_string()))?;

        Ok(format!("{XML_DECLARATION}\n{body}\n"))
    }
}

/// Writes the serialized document to `path`.
///
/// Missing parent directories are created. The content goes to a temporary
/// sibling first and is renamed into place, so `path` never holds a partial
/// document.
pub fn write_document(document: &RssDocument, path: &Path) -> Result<(), OutputError> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let content = document.to_xml()?;
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

    replace_via_temp(path, &temp_path, content.as_bytes()).map_err(io_err)?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote merged feed");
    Ok(())
}

/// Writes `content` to `temp_path` and renames it over `path`.
///
/// A failed `create_new` means the name belongs to another writer; only a file
/// this call created is removed on failure.
fn replace_via_temp(path: &Path, temp_path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;

    let written = file.write_all(content).and_then(|()| file.sync_all());
    drop(file);
    let result = written.and_then(|()| std::fs::rename(temp_path, path));
    if result.is_err() {
        let _ = std::fs::remove_file(temp_path);
    }
    result
}
