//! Documents: byte sources with a path.
//!
//! A document is a local file, an in-memory string, a URL fetched on first
//! read, or a dump file holding text posted to the daemon. HTML content is
//! reduced to its text before it enters the pipeline.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use scraper::{Html, Node};

use crate::error::DocumentError;

/// Result type for document operations.
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Directory below the index directory that holds dump files.
pub const DUMP_DIR: &str = "dump";

/// Prefix of every dump file name.
pub const DUMP_PREFIX: &str = "semix-";

/// Elements whose text never reaches the pipeline.
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    PlainText,
    Html,
}

impl ContentType {
    /// Parse a MIME type; parameters such as `charset` are ignored.
    pub fn from_mime(mime: &str) -> DocumentResult<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "" | "text/plain" => Ok(ContentType::PlainText),
            "text/html" | "application/xhtml+xml" => Ok(ContentType::Html),
            _ => Err(DocumentError::UnsupportedContentType {
                content_type: mime.to_string(),
            }),
        }
    }

    /// Guess the content type from a file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
            Some(ext) if ext == "html" || ext == "htm" || ext == "xhtml" => ContentType::Html,
            _ => ContentType::PlainText,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ContentType::PlainText => "text/plain",
            ContentType::Html => "text/html",
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Text(String),
    Http,
}

/// A readable document.
#[derive(Debug, Clone)]
pub struct Document {
    path: String,
    source: Source,
    content_type: Option<ContentType>,
}

impl Document {
    /// A local file; its content type follows the extension.
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            path: path.display().to_string(),
            source: Source::File(path.to_path_buf()),
            content_type: Some(ContentType::from_path(path)),
        }
    }

    /// In-memory text addressed as `path`.
    pub fn string(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: Source::Text(text.into()),
            content_type: Some(ContentType::PlainText),
        }
    }

    /// A URL fetched when the document is read. The response's content
    /// type decides how the body is read.
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            path: url.into(),
            source: Source::Http,
            content_type: None,
        }
    }

    /// Override the content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read the whole document as text.
    pub fn read(&self) -> DocumentResult<String> {
        let (body, content_type) = match &self.source {
            Source::Text(text) => (text.clone(), self.content_type.unwrap_or(ContentType::PlainText)),
            Source::File(file) => {
                let bytes = fs::read(file).map_err(|source| DocumentError::Io {
                    path: file.display().to_string(),
                    source,
                })?;
                let content_type = self.content_type.unwrap_or_else(|| ContentType::from_path(file));
                (String::from_utf8_lossy(&bytes).into_owned(), content_type)
            }
            Source::Http => self.fetch()?,
        };
        tracing::debug!(path = %self.path, bytes = body.len(), "read document");
        Ok(match content_type {
            ContentType::PlainText => body,
            ContentType::Html => html_text(&body),
        })
    }

    fn fetch(&self) -> DocumentResult<(String, ContentType)> {
        let response = ureq::get(&self.path).call().map_err(|e| DocumentError::Fetch {
            url: self.path.clone(),
            message: e.to_string(),
        })?;
        let content_type = match self.content_type {
            Some(ct) => ct,
            None => ContentType::from_mime(response.content_type())?,
        };
        let mut data = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut data)
            .map_err(|e| DocumentError::Fetch {
                url: self.path.clone(),
                message: format!("read body: {e}"),
            })?;
        Ok((String::from_utf8_lossy(&data).into_owned(), content_type))
    }
}

/// The text content of an HTML document, one space between text nodes.
pub fn html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|el| SKIPPED_ELEMENTS.contains(&el.name()));
        if skipped {
            continue;
        }
        out.push_str(text);
        out.push(' ');
    }
    out
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SLASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/+").unwrap());
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// A fresh dump file name `semix-<pre>-<timestamp>-<random>-<content-type>`.
pub fn dump_file_name(pre: &str, content_type: &str) -> DocumentResult<String> {
    let ct = match content_type.to_ascii_lowercase().as_str() {
        "text/plain" => "text-plain",
        _ => {
            return Err(DocumentError::UnsupportedContentType {
                content_type: content_type.to_string(),
            });
        }
    };
    let pre = WHITESPACE.replace_all(pre, "-");
    let pre = SLASHES.replace_all(&pre, "-");
    let pre = DASHES.replace_all(&pre, "-").to_lowercase();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let random: u32 = rand::random();
    Ok(format!("{DUMP_PREFIX}{pre}-{timestamp}-{random}-{ct}"))
}

/// Write `text` to a new dump file below `dir` and return it as a document
/// whose path is the dump file's name.
pub fn create_dump(dir: &Path, pre: &str, content_type: &str, text: &str) -> DocumentResult<Document> {
    let name = dump_file_name(pre, content_type)?;
    let dump = dir.join(DUMP_DIR);
    let io = |source| DocumentError::Io {
        path: dump.display().to_string(),
        source,
    };
    fs::create_dir_all(&dump).map_err(io)?;
    let file = dump.join(&name);
    fs::write(&file, text).map_err(io)?;
    tracing::info!(name = %name, bytes = text.len(), "created dump file");
    Ok(open_dump(dir, &name))
}

/// The dump file `name` below `dir`.
pub fn open_dump(dir: &Path, name: &str) -> Document {
    Document {
        path: name.to_string(),
        source: Source::File(dir.join(DUMP_DIR).join(name)),
        content_type: Some(ContentType::PlainText),
    }
}

/// Whether `path` names a dump file.
pub fn is_dump(path: &str) -> bool {
    path.starts_with(DUMP_PREFIX) && !path.contains(['/', '\\'])
}

/// The raw bytes of the dump file `name` below `dir`.
pub fn read_dump(dir: &Path, name: &str) -> DocumentResult<Vec<u8>> {
    if !is_dump(name) {
        return Err(DocumentError::NotFound { path: name.to_string() });
    }
    let file = dir.join(DUMP_DIR).join(name);
    fs::read(&file).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => DocumentError::NotFound { path: name.to_string() },
        _ => DocumentError::Io {
            path: file.display().to_string(),
            source,
        },
    })
}
