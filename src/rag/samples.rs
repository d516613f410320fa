//! The two sample texts the vector index demos are built from.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ARTICLE_FILE: &str = "artigo1.txt";
pub const BOOK_FILE: &str = "livro1.txt";

const ARTICLE_TEXT: &str = "Este é um texto sobre algoritmos de IA em redes sociais. \
O algoritmo de recomendação é crucial.";

const BOOK_TEXT: &str = "Este é um livro sobre tendências em inteligência artificial. \
As principais tendências para estudar são IA generativa e ética em IA.";

/// Write the sample article and book into `data_dir` unless they already exist.
///
/// Returns the paths of both files, article first.
pub fn ensure_sample_corpus(data_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let data_dir = data_dir.as_ref();
    std::fs::create_dir_all(data_dir)?;

    let mut paths = Vec::new();
    for (name, text) in [(ARTICLE_FILE, ARTICLE_TEXT), (BOOK_FILE, BOOK_TEXT)] {
        let path = data_dir.join(name);
        if !path.exists() {
            std::fs::write(&path, text)?;
            info!(path = %path.display(), "Created sample document");
        }
        paths.push(path);
    }

    Ok(paths)
}
