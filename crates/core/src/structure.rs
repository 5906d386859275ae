use crate::error::ExtractError;
use crate::extractor::DocumentLayout;
use crate::models::{
    DocumentStructure, FontSpan, FontStats, FontStyle, Section, SectionContent, Statement,
    StructureOptions, TitleLevel,
};
use regex::Regex;

const TITLE_BODY: &str = r"([A-Z][\w\s\-',:]+)$";

/// Numbering schemes recognised as headings, tried in order.
const SECTION_PATTERNS: [(&str, u8); 5] = [
    (r"^\s*(\d+)\.\s+", 1),
    (r"^\s*(\d+\.\d+)\s+", 2),
    (r"^\s*(\d+\.\d+\.\d+)\s+", 3),
    (r"^\s*(I{1,3}|IV|V|VI{1,3}|IX|X)\.\s+", 1),
    (r"^\s*([A-Z])\.\s+", 1),
];

const GENERIC_STATEMENT_PATTERN: &str = r"(?i)^\s*([A-Z0-9][\w\-]+)\s*[:. ]\s*(.*?)$";

pub struct StructureParser {
    section_patterns: Vec<(Regex, u8)>,
    statement_patterns: Vec<Regex>,
    max_title_fonts: usize,
    max_title_avg_length: f64,
}

impl StructureParser {
    pub fn new(options: &StructureOptions) -> Result<Self, ExtractError> {
        let section_patterns = SECTION_PATTERNS
            .iter()
            .map(|(prefix, level)| -> Result<(Regex, u8), ExtractError> {
                Ok((Regex::new(&format!("{prefix}{TITLE_BODY}"))?, *level))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let statement_pattern = match options.statement_prefix.as_deref().map(str::trim) {
            Some(prefix) if !prefix.is_empty() => format!(
                r"(?i)^\s*({}-?[0-9]+)\s*[:. ]\s*(.*?)$",
                regex::escape(prefix)
            ),
            _ => GENERIC_STATEMENT_PATTERN.to_string(),
        };

        Ok(Self {
            section_patterns,
            statement_patterns: vec![Regex::new(&statement_pattern)?],
            max_title_fonts: options.max_title_fonts,
            max_title_avg_length: options.max_title_avg_length,
        })
    }

    pub fn analyze(&self, layout: &DocumentLayout) -> DocumentStructure {
        let text = layout.full_text();
        let lines = text.split('\n').collect::<Vec<_>>();

        let font_stats = font_statistics(&layout.spans);
        let title_levels = self.title_levels(&font_stats);
        let sections = self.detect_sections(&lines);
        let statements = self.detect_statements(&lines, &sections);

        DocumentStructure {
            sections,
            statements,
            title_levels,
            font_stats,
        }
    }

    fn match_section(&self, line: &str) -> Option<(String, String, u8)> {
        self.section_patterns.iter().find_map(|(pattern, level)| {
            let captures = pattern.captures(line)?;
            let id = captures.get(1)?.as_str().to_string();
            let title = captures.get(2)?.as_str().trim().to_string();
            Some((id, title, *level))
        })
    }

    fn is_section(&self, line: &str) -> bool {
        self.section_patterns
            .iter()
            .any(|(pattern, _)| pattern.is_match(line))
    }

    fn match_statement(&self, line: &str) -> Option<(String, String)> {
        self.statement_patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(line)?;
            let id = captures.get(1)?.as_str().to_string();
            let text = captures
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some((id, text))
        })
    }

    fn is_statement(&self, line: &str) -> bool {
        self.statement_patterns
            .iter()
            .any(|pattern| pattern.is_match(line))
    }

    pub fn detect_sections(&self, lines: &[&str]) -> Vec<Section> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(line_no, raw)| {
                let line = raw.trim();
                if line.is_empty() {
                    return None;
                }
                let (id, title, level) = self.match_section(line)?;
                Some(Section {
                    id,
                    title,
                    level,
                    line: line_no,
                })
            })
            .collect()
    }

    /// A statement runs from its id line until a blank line, the next
    /// statement, or the next heading.
    pub fn detect_statements(&self, lines: &[&str], sections: &[Section]) -> Vec<Statement> {
        let mut statements = Vec::new();

        for (line_no, raw) in lines.iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let Some((id, first)) = self.match_statement(line) else {
                continue;
            };

            let mut text = first;
            for next in lines.iter().skip(line_no + 1) {
                let next = next.trim();
                // A heading ends the statement as well as a blank line, so a
                // following "2. Backups" never joins the statement text.
                if next.is_empty() || self.is_statement(next) || self.is_section(next) {
                    break;
                }
                text.push('\n');
                text.push_str(next);
            }

            let owner = sections
                .iter()
                .take_while(|section| section.line <= line_no)
                .last();

            statements.push(Statement {
                id,
                text: text.trim().to_string(),
                line: line_no,
                section_id: owner.map(|section| section.id.clone()),
                section_title: owner.map(|section| section.title.clone()),
            });
        }

        statements
    }

    /// Ranks font styles by size and keeps the largest ones whose text is
    /// short enough to be a heading. Levels keep the rank of skipped styles.
    pub fn title_levels(&self, stats: &[FontStats]) -> Vec<TitleLevel> {
        let mut by_size = stats.iter().collect::<Vec<_>>();
        by_size.sort_by(|left, right| right.style.size.total_cmp(&left.style.size));

        by_size
            .into_iter()
            .take(self.max_title_fonts)
            .enumerate()
            .filter(|(_, stat)| stat.avg_length < self.max_title_avg_length)
            .map(|(rank, stat)| TitleLevel {
                style: stat.style.clone(),
                level: u8::try_from(rank + 1).unwrap_or(u8::MAX),
            })
            .collect()
    }
}

/// Per `(font, size)` statistics in order of first appearance.
pub fn font_statistics(spans: &[FontSpan]) -> Vec<FontStats> {
    let mut grouped: Vec<(FontStyle, Vec<&str>)> = Vec::new();

    for span in spans.iter().filter(|span| !span.text.trim().is_empty()) {
        let position = grouped.iter().position(|(style, _)| {
            style.font == span.font && style.size.to_bits() == span.size.to_bits()
        });
        match position {
            Some(index) => grouped[index].1.push(span.text.as_str()),
            None => grouped.push((
                FontStyle {
                    font: span.font.clone(),
                    size: span.size,
                },
                vec![span.text.as_str()],
            )),
        }
    }

    grouped
        .into_iter()
        .map(|(style, texts)| {
            let total = texts.iter().map(|text| text.chars().count()).sum::<usize>();
            FontStats {
                style,
                count: texts.len(),
                avg_length: total as f64 / texts.len() as f64,
                examples: texts.iter().take(3).map(|text| text.to_string()).collect(),
            }
        })
        .collect()
}

/// The text between each heading and the next one.
pub fn section_contents(text: &str, sections: &[Section]) -> Vec<SectionContent> {
    let lines = text.split('\n').collect::<Vec<_>>();

    sections
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let end = sections
                .get(index + 1)
                .map(|next| next.line)
                .unwrap_or(lines.len())
                .min(lines.len());
            let start = (section.line + 1).min(end);

            SectionContent {
                id: section.id.clone(),
                title: section.title.clone(),
                level: section.level,
                content: lines[start..end].join("\n"),
            }
        })
        .collect()
}

pub fn analyze(
    layout: &DocumentLayout,
    options: &StructureOptions,
) -> Result<DocumentStructure, ExtractError> {
    Ok(StructureParser::new(options)?.analyze(layout))
}
