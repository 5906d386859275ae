pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod models;
pub mod ocr;
pub mod ranking;
pub mod search;
pub mod structure;

pub use corpus::list_documents;
pub use embeddings::{
    cosine_similarity, create_embedder, purge_cached_model, CharacterNgramEmbedder, Embedder,
    EmbedderKind, EmbedderSettings, EmbeddingProfile, PretrainedModel, BGE_INSTRUCTION,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_MODEL,
};
#[cfg(feature = "fastembed")]
pub use embeddings::FastEmbedder;
pub use error::{EmbedError, ExtractError, SearchError};
pub use extractor::{extract_font_spans, extract_layout, DocumentLayout, PageText};
pub use models::{
    Answer, CorpusDocument, DocumentMatches, DocumentStructure, FontSpan, FontStats, FontStyle,
    RankedText, SearchOptions, Section, SectionContent, Statement, StructureOptions, TitleLevel,
    UNSECTIONED,
};
pub use ocr::OcrClient;
pub use ranking::{rank_texts, DEFAULT_TOP_K};
pub use search::StatementSearch;
pub use structure::{analyze, font_statistics, section_contents, StructureParser};
