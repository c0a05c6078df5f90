//! Stanford GloVe text format: one `token v1 v2 … vD` line per word,
//! no header. Dimensionality is inferred from the first line and enforced
//! on every subsequent one.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::WordVecError;

pub(super) fn load(path: &Path) -> Result<(Vec<String>, Vec<f32>, usize), WordVecError> {
    let file = File::open(path).map_err(|e| WordVecError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let reader = BufReader::new(file);

    let mut tokens = Vec::new();
    let mut matrix = Vec::new();
    let mut dim = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| WordVecError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let token = fields.next().ok_or_else(|| WordVecError::Malformed {
            path: path.to_path_buf(),
            entry: line_no + 1,
            message: "missing token".to_string(),
        })?;

        let start = matrix.len();
        for field in fields {
            let value: f32 = field.parse().map_err(|_| WordVecError::Malformed {
                path: path.to_path_buf(),
                entry: line_no + 1,
                message: format!("invalid float {:?}", field),
            })?;
            matrix.push(value);
        }
        let found = matrix.len() - start;

        if dim == 0 {
            if found == 0 {
                return Err(WordVecError::Malformed {
                    path: path.to_path_buf(),
                    entry: line_no + 1,
                    message: "no vector components".to_string(),
                });
            }
            dim = found;
        } else if found != dim {
            return Err(WordVecError::Dimension {
                path: path.to_path_buf(),
                expected: dim,
                found,
            });
        }

        tokens.push(token.to_string());
    }

    Ok((tokens, matrix, dim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glove.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        (dir, path)
    }

    #[test]
    fn test_load_infers_dimension() {
        let (_dir, path) = write_file(&["a 1.0 2.0", "b 3.0 4.0"]);
        let (tokens, matrix, dim) = load(&path).unwrap();
        assert_eq!(tokens, vec!["a", "b"]);
        assert_eq!(dim, 2);
        assert_eq!(matrix, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let (_dir, path) = write_file(&["a 1.0", "", "b 2.0"]);
        let (tokens, _, _) = load(&path).unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_load_rejects_ragged_rows() {
        let (_dir, path) = write_file(&["a 1.0 2.0", "b 3.0"]);
        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            WordVecError::Dimension {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_load_rejects_non_numeric() {
        let (_dir, path) = write_file(&["a 1.0 oops"]);
        assert!(matches!(
            load(&path).unwrap_err(),
            WordVecError::Malformed { .. }
        ));
    }
}
