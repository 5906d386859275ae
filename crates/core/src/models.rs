use crate::ranking::DEFAULT_TOP_K;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Group name for statements found before the first section heading.
pub const UNSECTIONED: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpan {
    pub font: String,
    pub size: f32,
    pub text: String,
}

/// A font resource name paired with a point size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontStyle {
    pub font: String,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontStats {
    pub style: FontStyle,
    pub count: usize,
    pub avg_length: f64,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleLevel {
    pub style: FontStyle,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub level: u8,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionContent {
    pub id: String,
    pub title: String,
    pub level: u8,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub id: String,
    pub text: String,
    pub line: usize,
    pub section_id: Option<String>,
    pub section_title: Option<String>,
}

impl Statement {
    /// The form that gets embedded and returned to clients.
    pub fn display_text(&self) -> String {
        format!("{} {}", self.id, self.text)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    pub sections: Vec<Section>,
    pub statements: Vec<Statement>,
    pub title_levels: Vec<TitleLevel>,
    pub font_stats: Vec<FontStats>,
}

impl DocumentStructure {
    /// Statements grouped by section title. Groups follow the order in which
    /// section titles first appear; the unsectioned group comes last.
    pub fn grouped_statements(&self) -> Vec<(String, Vec<&Statement>)> {
        let mut groups: Vec<(String, Vec<&Statement>)> = Vec::new();
        for section in &self.sections {
            if !groups.iter().any(|(title, _)| title == &section.title) {
                groups.push((section.title.clone(), Vec::new()));
            }
        }

        for statement in &self.statements {
            let title = statement
                .section_title
                .clone()
                .unwrap_or_else(|| UNSECTIONED.to_string());

            match groups.iter_mut().find(|(existing, _)| existing == &title) {
                Some((_, members)) => members.push(statement),
                None => groups.push((title, vec![statement])),
            }
        }

        groups
    }

    pub fn statement_texts(&self) -> Vec<String> {
        self.grouped_statements()
            .into_iter()
            .flat_map(|(_, members)| members.into_iter().map(Statement::display_text))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedText {
    pub index: usize,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatches {
    pub doc: String,
    pub reps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub documents: Vec<DocumentMatches>,
}

#[derive(Debug, Clone)]
pub struct StructureOptions {
    /// Restricts statements to `{prefix}-?<digits>` ids when set.
    pub statement_prefix: Option<String>,
    pub max_title_fonts: usize,
    pub max_title_avg_length: f64,
}

impl Default for StructureOptions {
    fn default() -> Self {
        Self {
            statement_prefix: None,
            max_title_fonts: 5,
            max_title_avg_length: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub top_k_documents: usize,
    pub top_k_statements: usize,
    pub structure: StructureOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k_documents: DEFAULT_TOP_K,
            top_k_statements: DEFAULT_TOP_K,
            structure: StructureOptions::default(),
        }
    }
}
