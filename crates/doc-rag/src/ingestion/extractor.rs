//! Text extraction from local files and web pages

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::Document;

/// Turns a source locator (URL or file path) into documents
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract one or more documents from the source
    async fn extract(&self, locator: &str) -> Result<Vec<Document>>;
}

/// Content kinds understood by the file extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Plain text or markdown
    Text,
    /// HTML page
    Html,
    /// PDF document
    Pdf,
}

impl ContentType {
    /// Detect content type from a file extension; unknown extensions are text
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "html" | "htm" | "xhtml" => Self::Html,
            "pdf" => Self::Pdf,
            _ => Self::Text,
        }
    }

    /// MIME type recorded in document metadata
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Html => "text/html",
            Self::Pdf => "application/pdf",
        }
    }
}

/// Reads documents from the local file system
#[derive(Debug, Default, Clone)]
pub struct FileExtractor;

impl FileExtractor {
    /// Create a new file extractor
    pub fn new() -> Self {
        Self
    }

    fn parse(locator: &str, content_type: ContentType, data: &[u8]) -> Result<String> {
        match content_type {
            ContentType::Text => Ok(String::from_utf8_lossy(data).into_owned()),
            ContentType::Html => Ok(html_to_text(&String::from_utf8_lossy(data))),
            ContentType::Pdf => parse_pdf(locator, data),
        }
    }
}

#[async_trait]
impl TextExtractor for FileExtractor {
    async fn extract(&self, locator: &str) -> Result<Vec<Document>> {
        let path = Path::new(locator);
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::extraction(locator, e.to_string()))?;

        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(ContentType::from_extension)
            .unwrap_or(ContentType::Text);

        let text = Self::parse(locator, content_type, &data)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| locator.to_string());

        tracing::info!(
            "Extracted {} characters from {} ({})",
            text.chars().count(),
            locator,
            content_type.mime()
        );

        Ok(vec![Document::from_source(locator, text)
            .with_metadata("file_name", file_name)
            .with_metadata("content_type", content_type.mime())])
    }
}

#[cfg(feature = "pdf")]
fn parse_pdf(locator: &str, data: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| Error::extraction(locator, format!("PDF extraction failed: {}", e)))?;

    // Blank lines mark paragraphs; the chunker joins the wrapped lines
    Ok(text
        .replace('\0', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string())
}

#[cfg(not(feature = "pdf"))]
fn parse_pdf(locator: &str, _data: &[u8]) -> Result<String> {
    Err(Error::extraction(locator, "PDF support is disabled (enable the `pdf` feature)"))
}

/// Fetches web pages and converts their HTML to text
#[derive(Debug, Clone)]
pub struct WebPageExtractor {
    client: reqwest::Client,
}

impl WebPageExtractor {
    /// Create a web extractor with a request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextExtractor for WebPageExtractor {
    async fn extract(&self, locator: &str) -> Result<Vec<Document>> {
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| Error::extraction(locator, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::extraction(
                locator,
                format!("HTTP {}", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::extraction(locator, e.to_string()))?;
        let text = html_to_text(&html);

        tracing::info!("Fetched {} characters from {}", text.chars().count(), locator);

        Ok(vec![Document::from_source(locator, text)
            .with_metadata("url", locator)
            .with_metadata("content_type", ContentType::Html.mime())])
    }
}

/// Routes URLs to the web extractor and everything else to the file extractor
pub struct SourceExtractor {
    files: FileExtractor,
    web: WebPageExtractor,
}

impl SourceExtractor {
    /// Create a routing extractor
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            files: FileExtractor::new(),
            web: WebPageExtractor::new(timeout)?,
        })
    }

    /// Whether the locator names a web resource
    pub fn is_url(locator: &str) -> bool {
        let lower = locator.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

#[async_trait]
impl TextExtractor for SourceExtractor {
    async fn extract(&self, locator: &str) -> Result<Vec<Document>> {
        if Self::is_url(locator) {
            self.web.extract(locator).await
        } else {
            self.files.extract(locator).await
        }
    }
}

/// Convert an HTML page to plain text.
///
/// Script, style and similar non-content elements are dropped. Each
/// block-level element becomes its own paragraph, separated by a blank line,
/// so sentences from separate blocks do not run together. Inline elements
/// are joined exactly as the source whitespace dictates.
pub fn html_to_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let mut collector = TextCollector::default();

    collector.collect(document.root_element());
    collector.end_block();

    collector.blocks.join("\n\n")
}

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table",
    "section", "article", "header", "footer", "blockquote", "pre",
];

#[derive(Default)]
struct TextCollector {
    blocks: Vec<String>,
    current: String,
    /// Whitespace seen since the last word
    space: bool,
}

impl TextCollector {
    fn collect(&mut self, element: scraper::ElementRef<'_>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                self.push_text(text);
            } else if let Some(child) = scraper::ElementRef::wrap(child) {
                let name = child.value().name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    self.end_block();
                }
                self.collect(child);
                if block {
                    self.end_block();
                }
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.starts_with(char::is_whitespace) {
            self.space = true;
        }
        for (i, word) in text.split_whitespace().enumerate() {
            if (i > 0 || self.space) && !self.current.is_empty() {
                self.current.push(' ');
            }
            self.current.push_str(word);
            self.space = false;
        }
        if text.ends_with(char::is_whitespace) {
            self.space = true;
        }
    }

    fn end_block(&mut self) {
        if !self.current.is_empty() {
            self.blocks.push(std::mem::take(&mut self.current));
        }
        self.space = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_drops_scripts() {
        let html = r#"<html><head><title>Ignored</title><style>p { color: red; }</style></head>
            <body><h1>What I Worked On</h1>
            <p>Before college the two main things I worked on were writing and programming.</p>
            <script>var x = 1;</script>
            <p>I wrote <b>short</b> stories.</p></body></html>"#;

        let text = html_to_text(html);

        assert_eq!(
            text,
            "What I Worked On\n\n\
             Before college the two main things I worked on were writing and programming.\n\n\
             I wrote short stories."
        );
    }

    #[test]
    fn test_html_inline_boundaries_keep_source_spacing() {
        assert_eq!(html_to_text("<p><b>foo</b>bar</p>"), "foobar");
        assert_eq!(html_to_text("<p><b>foo</b> bar</p>"), "foo bar");
        assert_eq!(html_to_text("<p>Hello <i>big</i>\n  world.</p>"), "Hello big world.");
        assert_eq!(html_to_text("<p>one<br>two</p>"), "one\n\ntwo");
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_extension("PDF"), ContentType::Pdf);
        assert_eq!(ContentType::from_extension("htm"), ContentType::Html);
        assert_eq!(ContentType::from_extension("md"), ContentType::Text);
        assert_eq!(ContentType::from_extension("log"), ContentType::Text);
    }

    #[test]
    fn test_url_routing() {
        assert!(SourceExtractor::is_url("http://paulgraham.com/worked.html"));
        assert!(SourceExtractor::is_url("HTTPS://example.com"));
        assert!(!SourceExtractor::is_url("./data/10k/lyft_2021.pdf"));
    }

    #[tokio::test]
    async fn test_file_extractor_reads_text_and_html() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        let html = dir.path().join("page.html");
        std::fs::write(&txt, "First line. Second line.").unwrap();
        std::fs::write(&html, "<p>Hello.</p><p>World.</p>").unwrap();

        let extractor = FileExtractor::new();

        let docs = extractor.extract(txt.to_str().unwrap()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].raw_text, "First line. Second line.");
        assert_eq!(docs[0].metadata.get("file_name").map(String::as_str), Some("notes.txt"));
        assert_eq!(docs[0].metadata.get("content_type").map(String::as_str), Some("text/plain"));

        let docs = extractor.extract(html.to_str().unwrap()).await.unwrap();
        assert_eq!(docs[0].raw_text, "Hello.\n\nWorld.");
    }

    #[tokio::test]
    async fn test_missing_file_is_extraction_error() {
        let err = FileExtractor::new()
            .extract("/definitely/not/here.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }
}
