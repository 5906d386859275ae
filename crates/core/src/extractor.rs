use crate::error::ExtractError;
use crate::models::FontSpan;
use crate::ocr::OcrClient;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Page text plus the font spans the structural analysis reads.
#[derive(Debug, Clone, Default)]
pub struct DocumentLayout {
    pub pages: Vec<PageText>,
    pub spans: Vec<FontSpan>,
}

impl DocumentLayout {
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A font as a page's `Tf` operator refers to it.
#[derive(Debug, Clone)]
struct PageFont {
    name: String,
    encoding: Option<String>,
}

/// Loads the PDF once and returns its page text and font spans. When lopdf
/// finds no text and an OCR client is configured, the transcribed pages are
/// used instead and spans are empty.
pub fn extract_layout(path: &Path, ocr: Option<&OcrClient>) -> Result<DocumentLayout, ExtractError> {
    let loaded = load_document(path).and_then(|document| {
        let pages = page_texts(&document, path)?;
        let spans = extract_font_spans(&document);
        Ok(DocumentLayout { pages, spans })
    });

    match (loaded, ocr) {
        (Ok(layout), _) => Ok(layout),
        (Err(ExtractError::PdfParse(reason)), Some(ocr)) => {
            warn!(
                path = %path.display(),
                endpoint = ocr.endpoint(),
                %reason,
                "no readable text, falling back to OCR"
            );
            Ok(DocumentLayout {
                pages: ocr.transcribe(path)?,
                spans: Vec::new(),
            })
        }
        (Err(error), _) => Err(error),
    }
}

fn load_document(path: &Path) -> Result<Document, ExtractError> {
    Document::load(path).map_err(|error| ExtractError::PdfParse(error.to_string()))
}

fn page_texts(document: &Document, path: &Path) -> Result<Vec<PageText>, ExtractError> {
    let mut pages = Vec::new();
    for page_no in document.get_pages().into_keys() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(PageText {
                number: page_no,
                text,
            });
        }
    }

    if pages.is_empty() {
        return Err(ExtractError::PdfParse(format!(
            "pdf had no readable page text: {}",
            path.display()
        )));
    }

    Ok(pages)
}

/// Walks every page content stream and records the text drawn by each
/// text-showing operator, attributed to the `BaseFont` selected by the
/// preceding `Tf`. Resource names like `F1` are only unique within a page,
/// so they are resolved against that page's font dictionary.
pub fn extract_font_spans(document: &Document) -> Vec<FontSpan> {
    let mut spans = Vec::new();

    for (page_no, page_id) in document.get_pages() {
        let content = match document
            .get_page_content(page_id)
            .and_then(|bytes| Content::decode(&bytes))
        {
            Ok(content) => content,
            Err(error) => {
                debug!(page = page_no, %error, "skipping page content for font stats");
                continue;
            }
        };

        let fonts = page_fonts(document, page_id);
        let mut font = PageFont {
            name: String::new(),
            encoding: None,
        };
        let mut size = 0f32;

        for operation in &content.operations {
            match operation.operator.as_str() {
                "Tf" => {
                    if let Some(Object::Name(resource)) = operation.operands.first() {
                        font = fonts.get(resource).cloned().unwrap_or_else(|| PageFont {
                            name: String::from_utf8_lossy(resource).into_owned(),
                            encoding: None,
                        });
                    }
                    if let Some(value) = operation.operands.get(1).and_then(object_number) {
                        size = value;
                    }
                }
                "Tj" | "TJ" | "'" | "\"" => {
                    let encoding = font.encoding.as_deref();
                    let text = operation
                        .operands
                        .iter()
                        .filter_map(|operand| object_text(operand, encoding))
                        .collect::<String>();

                    if !text.trim().is_empty() {
                        spans.push(FontSpan {
                            font: font.name.clone(),
                            size,
                            text,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    spans
}

fn page_fonts(document: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, PageFont> {
    document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(resource, dictionary)| {
            let name = dictionary
                .get(b"BaseFont")
                .and_then(Object::as_name_str)
                .map(str::to_string)
                .unwrap_or_else(|_| String::from_utf8_lossy(&resource).into_owned());
            let font = PageFont {
                name,
                encoding: Some(dictionary.get_font_encoding().to_string()),
            };
            (resource, font)
        })
        .collect()
}

fn object_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn object_text(object: &Object, encoding: Option<&str>) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(encoding, bytes)),
        Object::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|item| object_text(item, encoding))
                .collect::<String>();
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

fn decode_pdf_string(encoding: Option<&str>, bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect::<Vec<_>>();
            String::from_utf16_lossy(&units)
        }
        None => Document::decode_text(encoding, bytes),
    }
}
