use crate::corpus::list_documents;
use crate::embeddings::Embedder;
use crate::error::{ExtractError, SearchError};
use crate::extractor::extract_layout;
use crate::models::{Answer, DocumentMatches, DocumentStructure, SearchOptions};
use crate::ocr::OcrClient;
use crate::ranking::rank_texts;
use crate::structure::StructureParser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answers questions from a directory of reference PDFs: pick the documents
/// whose names best match the question, then the statements inside them
/// that best match it.
///
/// Everything here blocks. Async callers should run it on a blocking pool.
pub struct StatementSearch {
    corpus_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    options: SearchOptions,
    parser: StructureParser,
    ocr: Option<OcrClient>,
}

impl StatementSearch {
    pub fn new(
        corpus_dir: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        options: SearchOptions,
    ) -> Result<Self, ExtractError> {
        let parser = StructureParser::new(&options.structure)?;
        Ok(Self {
            corpus_dir: corpus_dir.into(),
            embedder,
            options,
            parser,
            ocr: None,
        })
    }

    /// Transcribes documents lopdf cannot read through `ocr`.
    pub fn with_ocr(mut self, ocr: OcrClient) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn answer(&self, question: &str) -> Result<Answer, SearchError> {
        if question.trim().is_empty() {
            return Err(SearchError::EmptyQuestion);
        }

        let documents = list_documents(&self.corpus_dir)?;
        let names = documents
            .iter()
            .map(|document| document.name.clone())
            .collect::<Vec<_>>();

        let selected = rank_texts(
            self.embedder.as_ref(),
            question,
            &names,
            self.options.top_k_documents,
        )?;

        info!(
            corpus = documents.len(),
            selected = ?selected.iter().map(|hit| hit.text.as_str()).collect::<Vec<_>>(),
            "documents selected"
        );

        let mut matches = Vec::with_capacity(selected.len());
        for hit in selected {
            let document = &documents[hit.index];

            let structure = match self.inspect(&document.path) {
                Ok(structure) => structure,
                Err(error) => {
                    warn!(document = %document.name, %error, "skipping unreadable document");
                    continue;
                }
            };

            let statements = structure.statement_texts();
            let ranked = rank_texts(
                self.embedder.as_ref(),
                question,
                &statements,
                self.options.top_k_statements,
            )?;

            debug!(
                document = %document.name,
                statements = statements.len(),
                matched = ranked.len(),
                "statements ranked"
            );

            matches.push(DocumentMatches {
                doc: document.name.clone(),
                reps: ranked.into_iter().map(|ranked| ranked.text).collect(),
            });
        }

        Ok(Answer {
            question: question.to_string(),
            documents: matches,
        })
    }

    pub fn inspect(&self, path: &Path) -> Result<DocumentStructure, ExtractError> {
        let layout = extract_layout(path, self.ocr.as_ref())?;
        Ok(self.parser.analyze(&layout))
    }
}
