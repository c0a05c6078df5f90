//! Pretrained word-vector models behind a uniform lookup interface.
//!
//! Two incompatible on-disk formats are supported — word2vec (`w2v`) and
//! Stanford GloVe (`glove`) — both loaded into the same structure: a flat
//! N×D row-major f32 matrix plus a token→row index.
//!
//! Out-of-vocabulary lookups return `None`; callers decide what to do with
//! missing tokens (target construction skips them).

mod glove;
mod w2v;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::WordVecError;

/// On-disk word-vector format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordVecFormat {
    /// word2vec: `count dim` header, then text or binary records (`.bin`)
    W2v,
    /// Stanford GloVe: `token v1 v2 … vD` per line, no header
    Glove,
}

impl WordVecFormat {
    /// Parse a format tag from its CLI spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "w2v" => Some(Self::W2v),
            "glove" => Some(Self::Glove),
            _ => None,
        }
    }
}

impl fmt::Display for WordVecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::W2v => write!(f, "w2v"),
            Self::Glove => write!(f, "glove"),
        }
    }
}

/// An immutable token → vector mapping.
///
/// Stores a single flat matrix (N × D, row-major) so model code can slice
/// rows without per-token allocations.
pub struct WordVectors {
    tokens: Vec<String>,
    by_token: HashMap<String, usize>,
    /// Flat matrix: N × D stored row-major.
    matrix: Vec<f32>,
    dim: usize,
}

impl WordVectors {
    /// Load word vectors from `path` using the given format.
    ///
    /// Loading is synchronous and blocking; a missing file or malformed
    /// content is a startup-terminating error.
    pub fn load(path: &Path, format: WordVecFormat) -> Result<Self, WordVecError> {
        let (tokens, matrix, dim) = match format {
            WordVecFormat::Glove => glove::load(path)?,
            WordVecFormat::W2v => w2v::load(path)?,
        };
        if tokens.is_empty() {
            return Err(WordVecError::Empty {
                path: path.to_path_buf(),
            });
        }

        let by_token: HashMap<String, usize> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        tracing::info!(
            "Loaded {} word vectors ({} dims, {} format, {:.1} MB)",
            tokens.len(),
            dim,
            format,
            (matrix.len() * 4) as f64 / 1_000_000.0
        );

        Ok(Self {
            tokens,
            by_token,
            matrix,
            dim,
        })
    }

    /// Build word vectors from parts (for tests and joint-optimization updates).
    pub fn from_raw(tokens: Vec<String>, matrix: Vec<f32>, dim: usize) -> Self {
        assert_eq!(
            matrix.len(),
            tokens.len() * dim,
            "Matrix size ({}) does not match {} tokens × {} dim",
            matrix.len(),
            tokens.len(),
            dim,
        );
        let by_token = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self {
            tokens,
            by_token,
            matrix,
            dim,
        }
    }

    /// Look up the vector for a token. `None` when out of vocabulary.
    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.by_token
            .get(token)
            .map(|&i| &self.matrix[i * self.dim..(i + 1) * self.dim])
    }

    /// Whether the vocabulary contains a token.
    pub fn contains(&self, token: &str) -> bool {
        self.by_token.contains_key(token)
    }

    /// Vector dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of tokens in the vocabulary.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// All tokens, in matrix row order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_parse() {
        assert_eq!(WordVecFormat::parse("w2v"), Some(WordVecFormat::W2v));
        assert_eq!(WordVecFormat::parse("GloVe"), Some(WordVecFormat::Glove));
        assert_eq!(WordVecFormat::parse("fasttext"), None);
    }

    #[test]
    fn test_lookup_and_oov() {
        let wv = WordVectors::from_raw(
            vec!["cat".to_string(), "dog".to_string()],
            vec![1.0, 2.0, 3.0, 4.0],
            2,
        );
        assert_eq!(wv.get("cat"), Some(&[1.0, 2.0][..]));
        assert_eq!(wv.get("dog"), Some(&[3.0, 4.0][..]));
        assert!(wv.get("ferret").is_none());
        assert_eq!(wv.dim(), 2);
        assert_eq!(wv.len(), 2);
    }

    #[test]
    fn test_load_glove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "the 0.1 0.2 0.3").unwrap();
        writeln!(f, "cat 0.4 0.5 0.6").unwrap();
        drop(f);

        let wv = WordVectors::load(&path, WordVecFormat::Glove).unwrap();
        assert_eq!(wv.len(), 2);
        assert_eq!(wv.dim(), 3);
        let cat = wv.get("cat").unwrap();
        assert!((cat[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_load_w2v_text_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "2 3").unwrap();
        writeln!(f, "the 0.1 0.2 0.3").unwrap();
        writeln!(f, "cat 0.4 0.5 0.6").unwrap();
        drop(f);

        let wv = WordVectors::load(&path, WordVecFormat::W2v).unwrap();
        assert_eq!(wv.len(), 2);
        assert_eq!(wv.dim(), 3);
        assert!(wv.contains("the"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = WordVectors::load(Path::new("/nonexistent/vectors.txt"), WordVecFormat::Glove);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "").unwrap();
        let result = WordVectors::load(&path, WordVecFormat::Glove);
        assert!(matches!(result, Err(WordVecError::Empty { .. })));
    }
}
