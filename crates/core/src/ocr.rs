use crate::error::ExtractError;
use crate::extractor::PageText;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Remote transcription service used when lopdf finds no text in a PDF
/// (scanned policies). The PDF is posted as base64 JSON and the service
/// answers with per-page text or one form-feed separated string.
#[derive(Debug, Clone)]
pub struct OcrClient {
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TranscriptionRequest<'a> {
    document: &'a str,
    pdf_base64: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Transcription {
    Pages { pages: Vec<TranscribedPage> },
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct TranscribedPage {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    text: String,
}

impl OcrClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Blocks on the HTTP round trip; async callers go through a blocking pool.
    pub fn transcribe(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        let document = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let payload = TranscriptionRequest {
            document: &document,
            pdf_base64: STANDARD.encode(std::fs::read(path)?),
        };

        let mut request = Client::new().post(&self.endpoint).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(ExtractError::OcrFailed(format!(
                "{} answered {} for {document}",
                self.endpoint,
                response.status()
            )));
        }

        let pages = transcription_pages(response.json()?);
        if pages.is_empty() {
            return Err(ExtractError::OcrFailed(format!(
                "{} returned no text for {document}",
                self.endpoint
            )));
        }

        info!(document = %document, pages = pages.len(), "document transcribed");
        Ok(pages)
    }
}

fn transcription_pages(transcription: Transcription) -> Vec<PageText> {
    let numbered = match transcription {
        Transcription::Pages { pages } => pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| (page.page.unwrap_or(index as u32 + 1), page.text))
            .collect::<Vec<_>>(),
        Transcription::Text { text } => text
            .split('\u{000c}')
            .enumerate()
            .map(|(index, page)| (index as u32 + 1, page.to_string()))
            .collect(),
    };

    numbered
        .into_iter()
        .filter_map(|(number, text)| {
            let text = text.trim();
            (!text.is_empty()).then(|| PageText {
                number,
                text: text.to_string(),
            })
        })
        .collect()
}
