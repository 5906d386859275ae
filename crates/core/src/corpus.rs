use crate::error::ExtractError;
use crate::models::CorpusDocument;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// PDF files directly inside `folder`, sorted by path and named by file stem.
pub fn list_documents(folder: &Path) -> Result<Vec<CorpusDocument>, ExtractError> {
    if !folder.is_dir() {
        return Err(ExtractError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("corpus directory not found: {}", folder.display()),
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            continue;
        }

        let Some(name) = entry.path().file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        documents.push(CorpusDocument {
            name: name.to_string(),
            path: entry.path().to_path_buf(),
        });
    }

    documents.sort_unstable_by(|left, right| left.path.cmp(&right.path));
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::list_documents;
    use crate::error::ExtractError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lists_top_level_pdfs_by_stem() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        fs::create_dir(base.join("archive"))?;
        fs::write(base.join("POL-SEC Gestion des vulnerabilites 2.0.pdf"), b"%PDF-1.4")?;
        fs::write(base.join("Politique tiers.PDF"), b"%PDF-1.4")?;
        fs::write(base.join("notes.txt"), b"not a pdf")?;
        fs::write(base.join("archive").join("old.pdf"), b"%PDF-1.4")?;

        let documents = list_documents(base)?;
        let names = documents
            .iter()
            .map(|document| document.name.as_str())
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec!["POL-SEC Gestion des vulnerabilites 2.0", "Politique tiers"]
        );
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let result = list_documents(std::path::Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }

    #[test]
    fn empty_directory_lists_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        assert!(list_documents(dir.path())?.is_empty());
        Ok(())
    }
}
