use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR failed: {0}")]
    OcrFailed(String),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding model error: {0}")]
    Model(String),

    #[error("model returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("unknown embedder kind: {0}")]
    UnknownKind(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Embed(#[from] EmbedError),
}
