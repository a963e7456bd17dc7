//! # Document ingestion
//!
//! Reads user-provided study material into plain text.
//!
//! | Extension | Handling |
//! |---|---|
//! | `.txt`, `.md` | decoded verbatim |
//! | `.pdf` | page text for pages 1..N, each followed by a blank line (needs [`Capability::PdfText`]) |
//! | `.docx` | paragraph text separated by blank lines (needs [`Capability::DocxText`]) |
//!
//! Anything else is rejected. A missing capability fails before the file is read.
//! Reads go through `tokio::fs`; PDF/DOCX parsing runs on the blocking pool.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::capabilities::{Capability, CapabilityRegistry};
use crate::error::ErrorKind;
use crate::models::ImageData;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Tipo de archivo no soportado. Por favor, sube un .pdf, .txt, .md o .docx.")]
    UnsupportedType,

    #[error("Por favor, carga un archivo de imagen válido.")]
    NotAnImage,

    #[error("{0} no está disponible; no se puede procesar el archivo.")]
    CapabilityUnavailable(Capability),

    #[error("No se pudo leer el archivo: {0}")]
    Read(#[from] std::io::Error),

    #[error("No se pudo extraer el texto del PDF: {0}")]
    Pdf(String),

    #[error("No se pudo extraer el texto del documento Word: {0}")]
    Docx(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::UnsupportedType | IngestError::NotAnImage => ErrorKind::Validation,
            IngestError::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            IngestError::Read(_) | IngestError::Pdf(_) | IngestError::Docx(_) => ErrorKind::Io,
        }
    }
}

/// `{ text }` on success, `{ text: "", error }` on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub text: String,
    pub error: Option<String>,
}

impl From<Result<String, IngestError>> for IngestOutcome {
    fn from(result: Result<String, IngestError>) -> Self {
        match result {
            Ok(text) => Self { text, error: None },
            Err(err) => Self {
                text: String::new(),
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn document_kind(path: &Path) -> Option<DocumentKind> {
    match lowercase_extension(path)?.as_str() {
        "txt" | "md" => Some(DocumentKind::PlainText),
        "pdf" => Some(DocumentKind::Pdf),
        "docx" => Some(DocumentKind::Docx),
        _ => None,
    }
}

fn require(registry: &CapabilityRegistry, capability: Capability) -> Result<(), IngestError> {
    if registry.is_available(capability) {
        Ok(())
    } else {
        warn!("{} is not available", capability);
        Err(IngestError::CapabilityUnavailable(capability))
    }
}

/// Extracts the text of a document.
///
/// # Parameters
/// - `path`: the file; its extension (case-insensitive) selects the parser.
/// - `registry`: consulted before PDF/DOCX parsing.
pub async fn ingest_file(
    path: impl AsRef<Path>,
    registry: &CapabilityRegistry,
) -> Result<String, IngestError> {
    let path = path.as_ref();
    let kind = document_kind(path).ok_or(IngestError::UnsupportedType)?;
    debug!("Ingesting {} as {:?}", path.display(), kind);

    let text = match kind {
        DocumentKind::PlainText => decode_text(tokio::fs::read(path).await?),
        DocumentKind::Pdf => {
            require(registry, Capability::PdfText)?;
            let bytes = tokio::fs::read(path).await?;
            tokio::task::spawn_blocking(move || pdf_text(&bytes))
                .await
                .map_err(|e| IngestError::Pdf(e.to_string()))??
        }
        DocumentKind::Docx => {
            require(registry, Capability::DocxText)?;
            let bytes = tokio::fs::read(path).await?;
            tokio::task::spawn_blocking(move || docx_text(&bytes))
                .await
                .map_err(|e| IngestError::Docx(e.to_string()))??
        }
    };

    info!(
        "Ingested {} ({} chars)",
        path.display(),
        text.chars().count()
    );
    Ok(text)
}

/// UTF-8 text, with invalid sequences replaced instead of rejected.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!("Text is not valid UTF-8; replacing invalid bytes");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }
}

#[cfg(feature = "pdf")]
fn pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|e| IngestError::Pdf(e.to_string()))?;
    let mut text = String::new();
    for page in document.get_pages().into_keys() {
        let page_text = document
            .extract_text(&[page])
            .map_err(|e| IngestError::Pdf(e.to_string()))?;
        text.push_str(&page_text);
        text.push_str("\n\n");
    }
    Ok(text)
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(_bytes: &[u8]) -> Result<String, IngestError> {
    Err(IngestError::CapabilityUnavailable(Capability::PdfText))
}

#[cfg(feature = "docx")]
fn docx_err(err: impl std::fmt::Display) -> IngestError {
    IngestError::Docx(err.to_string())
}

#[cfg(feature = "docx")]
fn docx_text(bytes: &[u8]) -> Result<String, IngestError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;
    use std::io::{Cursor, Read};

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(docx_err)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(docx_err)?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(false);

    let mut text = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event().map_err(docx_err)? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Empty(e) | Event::Start(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => {
                text.push_str(&t.unescape().map_err(docx_err)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

#[cfg(not(feature = "docx"))]
fn docx_text(_bytes: &[u8]) -> Result<String, IngestError> {
    Err(IngestError::CapabilityUnavailable(Capability::DocxText))
}

fn image_mime_type(path: &Path) -> Option<&'static str> {
    let mime = match lowercase_extension(path)?.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => return None,
    };
    Some(mime)
}

/// Loads a single image into memory. The media type comes from the extension.
pub async fn load_image(path: impl AsRef<Path>) -> Result<ImageData, IngestError> {
    let path = path.as_ref();
    let mime_type = image_mime_type(path).ok_or(IngestError::NotAnImage)?;
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(IngestError::NotAnImage);
    }
    debug!("Loaded image {} ({} bytes)", path.display(), bytes.len());
    Ok(ImageData {
        bytes,
        mime_type: mime_type.to_string(),
    })
}
