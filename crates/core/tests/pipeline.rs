mod common;

use common::{body, heading, write_pdf};
use statement_search_core::{
    CharacterNgramEmbedder, SearchOptions, StatementSearch, StructureOptions, UNSECTIONED,
};
use std::path::Path;
use std::sync::Arc;

fn build_corpus(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    write_pdf(
        &dir.join("vulnerability management.pdf"),
        &[
            heading("1. Patch management"),
            body("VULN-1: Patches are applied within thirty days"),
            body("VULN-2: Scanners run every week"),
            heading("2. Reporting"),
            body("VULN-3: Findings are reported to the security team"),
        ],
    )?;
    write_pdf(
        &dir.join("data backup.pdf"),
        &[
            heading("1. Backup schedule"),
            body("SAV-1: Backups are taken every night"),
            body("SAV-2: Restores are tested every quarter"),
        ],
    )?;
    write_pdf(
        &dir.join("remote access.pdf"),
        &[
            heading("1. Remote connections"),
            body("ACC-1: Remote access goes through a VPN"),
        ],
    )?;
    Ok(())
}

fn search(dir: &Path, top_k_documents: usize, top_k_statements: usize) -> StatementSearch {
    StatementSearch::new(
        dir,
        Arc::new(CharacterNgramEmbedder::default()),
        SearchOptions {
            top_k_documents,
            top_k_statements,
            structure: StructureOptions::default(),
        },
    )
    .expect("default patterns should compile")
}

#[test]
fn answer_picks_document_then_statement() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    build_corpus(dir.path())?;

    let answer = search(dir.path(), 1, 1)
        .answer("vulnerability management: patches are applied within thirty days")?;

    assert_eq!(answer.documents.len(), 1);
    assert_eq!(answer.documents[0].doc, "vulnerability management");
    assert_eq!(
        answer.documents[0].reps,
        vec!["VULN-1 Patches are applied within thirty days".to_string()]
    );
    Ok(())
}

#[test]
fn default_options_return_two_documents_with_two_statements_at_most(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    build_corpus(dir.path())?;

    let answer = search(dir.path(), 2, 2).answer("data backup restores tested")?;

    assert_eq!(answer.documents.len(), 2);
    assert_eq!(answer.documents[0].doc, "data backup");
    assert!(answer
        .documents
        .iter()
        .all(|document| !document.reps.is_empty() && document.reps.len() <= 2));
    Ok(())
}

#[test]
fn inspect_reports_sections_statements_and_title_fonts() -> Result<(), Box<dyn std::error::Error>>
{
    let dir = tempfile::tempdir()?;
    build_corpus(dir.path())?;

    let structure = search(dir.path(), 2, 2).inspect(&dir.path().join("vulnerability management.pdf"))?;

    let titles = structure
        .sections
        .iter()
        .map(|section| section.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Patch management", "Reporting"]);

    let ids = structure
        .statements
        .iter()
        .map(|statement| statement.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["VULN-1", "VULN-2", "VULN-3"]);
    assert_eq!(
        structure.statements[2].section_title.as_deref(),
        Some("Reporting")
    );
    assert!(structure
        .grouped_statements()
        .iter()
        .all(|(title, _)| title != UNSECTIONED));

    assert_eq!(structure.title_levels.len(), 2);
    assert_eq!(structure.title_levels[0].style.font, "Helvetica-Bold");
    assert_eq!(structure.title_levels[0].level, 1);
    Ok(())
}
