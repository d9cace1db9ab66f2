//! Plain-text corpus loading for the CLI.
//!
//! Every `.txt` file under a directory is one document named after its file
//! stem. Pages are separated by form feeds, the way `pdftotext` writes them,
//! and numbered from 1.

use crate::error::Result;
use medrag_context::Document;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PAGE_SEPARATOR: char = '\x0c';

/// Split extracted text into a document, one page per form-feed section.
pub fn document_from_text(name: impl Into<String>, text: &str) -> Document {
    Document::from_page_texts(name, text.split(PAGE_SEPARATOR))
}

/// Load every `.txt` file under `dir`, honoring ignore files, in path order.
pub fn load_corpus(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in ignore::Walk::new(dir.as_ref()) {
        let entry = entry?;
        let path = entry.into_path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document = document_from_text(name, &text);
        debug!(
            "Loaded {} with {} pages",
            path.display(),
            document.pages.len()
        );
        documents.push(document);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pages_split_on_form_feed() {
        let document = document_from_text("esc", "first page\x0csecond page");
        assert_eq!(document.name, "esc");
        assert_eq!(document.pages.len(), 2);
        assert_eq!(document.pages[0].number, 1);
        assert_eq!(document.pages[1].number, 2);
        assert_eq!(document.pages[1].text, "second page");
    }

    #[test]
    fn test_load_corpus_reads_only_txt_files() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("b_guide.txt"), "page one\x0cpage two")?;
        std::fs::write(dir.path().join("a_guide.txt"), "only page")?;
        std::fs::write(dir.path().join("notes.md"), "not a guideline")?;
        std::fs::create_dir(dir.path().join("nested"))?;
        std::fs::write(dir.path().join("nested").join("c_guide.txt"), "nested page")?;

        let documents = load_corpus(dir.path())?;
        let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a_guide", "b_guide", "c_guide"]);
        assert_eq!(documents[1].pages.len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        assert!(load_corpus("/nonexistent/medrag/corpus").is_err());
    }
}
