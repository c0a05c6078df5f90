//! word2vec format: an ASCII `count dim` header line, then one record per
//! word. Records are little-endian f32 when the file extension is `.bin`
//! (the format word2vec tools emit by default), whitespace-separated text
//! otherwise.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::WordVecError;

pub(super) fn load(path: &Path) -> Result<(Vec<String>, Vec<f32>, usize), WordVecError> {
    let binary = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("bin"))
        .unwrap_or(false);
    if binary {
        load_binary(path)
    } else {
        load_text(path)
    }
}

fn parse_header(path: &Path, line: &str) -> Result<(usize, usize), WordVecError> {
    let mut fields = line.split_whitespace();
    let count: usize = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| header_error(path, line))?;
    let dim: usize = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| header_error(path, line))?;
    if dim == 0 || fields.next().is_some() {
        return Err(header_error(path, line));
    }
    Ok((count, dim))
}

fn header_error(path: &Path, line: &str) -> WordVecError {
    WordVecError::Malformed {
        path: path.to_path_buf(),
        entry: 0,
        message: format!("invalid `count dim` header {:?}", line.trim_end()),
    }
}

fn load_text(path: &Path) -> Result<(Vec<String>, Vec<f32>, usize), WordVecError> {
    let file = File::open(path).map_err(|e| WordVecError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header = lines
        .next()
        .ok_or_else(|| WordVecError::Empty {
            path: path.to_path_buf(),
        })?
        .map_err(|e| WordVecError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let (count, dim) = parse_header(path, &header)?;

    let mut tokens = Vec::with_capacity(count);
    let mut matrix = Vec::with_capacity(count * dim);

    for (entry, line) in lines.enumerate() {
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
            entry: entry + 1,
            message: "missing token".to_string(),
        })?;

        let start = matrix.len();
        for field in fields {
            let value: f32 = field.parse().map_err(|_| WordVecError::Malformed {
                path: path.to_path_buf(),
                entry: entry + 1,
                message: format!("invalid float {:?}", field),
            })?;
            matrix.push(value);
        }
        let found = matrix.len() - start;
        if found != dim {
            return Err(WordVecError::Dimension {
                path: path.to_path_buf(),
                expected: dim,
                found,
            });
        }

        tokens.push(token.to_string());
    }

    if tokens.len() != count {
        tracing::warn!(
            "{:?} declared {} vectors but contains {}",
            path,
            count,
            tokens.len()
        );
    }

    Ok((tokens, matrix, dim))
}

fn load_binary(path: &Path) -> Result<(Vec<String>, Vec<f32>, usize), WordVecError> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| WordVecError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let header_end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| WordVecError::Empty {
            path: path.to_path_buf(),
        })?;
    let header = String::from_utf8_lossy(&bytes[..header_end]).into_owned();
    let (count, dim) = parse_header(path, &header)?;

    let mut tokens = Vec::with_capacity(count);
    let mut matrix = Vec::with_capacity(count * dim);
    let mut pos = header_end + 1;

    for entry in 0..count {
        // Token: bytes up to the separating space. Leading newlines from the
        // previous record are part of the record framing, not the token.
        while pos < bytes.len() && bytes[pos] == b'\n' {
            pos += 1;
        }
        let token_start = pos;
        while pos < bytes.len() && bytes[pos] != b' ' {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Err(truncated(path, entry));
        }
        let token = String::from_utf8_lossy(&bytes[token_start..pos]).into_owned();
        pos += 1; // skip the space

        let vec_end = pos + dim * 4;
        if vec_end > bytes.len() {
            return Err(truncated(path, entry));
        }
        for chunk in bytes[pos..vec_end].chunks_exact(4) {
            matrix.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        pos = vec_end;

        tokens.push(token);
    }

    Ok((tokens, matrix, dim))
}

fn truncated(path: &Path, entry: usize) -> WordVecError {
    WordVecError::Malformed {
        path: path.to_path_buf(),
        entry: entry + 1,
        message: "file truncated mid-record".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_text_header_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w2v.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "2 2").unwrap();
        writeln!(f, "sun 1.0 0.0").unwrap();
        writeln!(f, "moon 0.0 1.0").unwrap();
        drop(f);

        let (tokens, matrix, dim) = load(&path).unwrap();
        assert_eq!(tokens, vec!["sun", "moon"]);
        assert_eq!(dim, 2);
        assert_eq!(matrix, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_text_rejects_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w2v.txt");
        std::fs::write(&path, "sun 1.0 0.0\n").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_text_rejects_wrong_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w2v.txt");
        std::fs::write(&path, "1 3\nsun 1.0 0.0\n").unwrap();
        assert!(matches!(
            load(&path).unwrap_err(),
            WordVecError::Dimension {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_binary_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w2v.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "2 2\n").unwrap();
        f.write_all(b"sun ").unwrap();
        for v in [1.0f32, 0.5] {
            f.write_all(&v.to_le_bytes()).unwrap();
        }
        f.write_all(b"\nmoon ").unwrap();
        for v in [0.25f32, 0.125] {
            f.write_all(&v.to_le_bytes()).unwrap();
        }
        drop(f);

        let (tokens, matrix, dim) = load(&path).unwrap();
        assert_eq!(tokens, vec!["sun", "moon"]);
        assert_eq!(dim, 2);
        assert_eq!(matrix, vec![1.0, 0.5, 0.25, 0.125]);
    }

    #[test]
    fn test_binary_rejects_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w2v.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "1 4\n").unwrap();
        f.write_all(b"sun ").unwrap();
        f.write_all(&1.0f32.to_le_bytes()).unwrap(); // 3 floats short
        drop(f);

        assert!(matches!(
            load(&path).unwrap_err(),
            WordVecError::Malformed { .. }
        ));
    }
}
