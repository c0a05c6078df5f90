//! IAPR TC-12 corpus preparation.
//!
//! The corpus ships as a gzipped tar of per-image annotation documents in an
//! SGML-flavored markup (`annotations/NN/NNNN.eng`). Each document carries a
//! `DOCNO`, `TITLE`, and `DESCRIPTION` element; the unique sample id is
//! derived from the document's path (`annotations/02/2808.eng` → `02/2808`).
//!
//! Download and extraction live in the CLI; this module owns the source URL
//! constants, annotation parsing, and conversion to text-feature records.

use std::path::Path;

use walkdir::WalkDir;

use super::{tokenize, TextRecord};
use crate::error::DatasetError;

/// Primary corpus archive (annotations + images).
pub const IAPRTC12_URL: &str =
    "http://www-i6.informatik.rwth-aachen.de/imageclef/resources/iaprtc12.tgz";

/// Precomputed visual features and train/test splits from INRIA LEAR.
pub const INRIA_LEAR_URL: &str =
    "http://lear.inrialpes.fr/people/guillaumin/data/iaprtc12/iaprtc12_data.tar.gz";

/// File extensions that identify corpus files for a sample.
const KNOWN_EXTENSIONS: &[&str] = &["eng", "ger", "spa", "jpg"];

/// Derive a sample's unique id from a corpus file path.
///
/// The id is the last directory component plus the file stem: every known
/// extension for the same sample maps to the same id.
///
/// ```
/// use lumen_core::dataset::iaprtc12::id_from_path;
/// assert_eq!(id_from_path("annotations/02/2808.eng"), "02/2808");
/// assert_eq!(id_from_path("/data/images/02/2808.jpg"), "02/2808");
/// ```
pub fn id_from_path(path: &str) -> String {
    let p = Path::new(path);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    match p
        .parent()
        .and_then(|d| d.file_name())
        .and_then(|s| s.to_str())
    {
        Some(dir) => format!("{}/{}", dir, stem),
        None => stem.to_string(),
    }
}

/// A parsed annotation document.
#[derive(Debug, Clone)]
pub struct Annotation {
    /// `TITLE` element text
    pub title: String,
    /// `DESCRIPTION` element text
    pub description: String,
    /// Path-derived id from the `DOCNO` element
    pub uniq_id: String,
}

impl Annotation {
    /// Parse an annotation document.
    ///
    /// `DOCNO` is required (it carries the id); `TITLE` and `DESCRIPTION`
    /// default to empty when absent, matching documents that omit them.
    pub fn parse(document: &str) -> Result<Self, DatasetError> {
        let docno = extract_element(document, "DOCNO")
            .ok_or_else(|| DatasetError::Annotation("missing DOCNO element".to_string()))?;
        let title = extract_element(document, "TITLE").unwrap_or_default();
        let description = extract_element(document, "DESCRIPTION").unwrap_or_default();

        Ok(Self {
            title,
            description,
            uniq_id: id_from_path(&docno),
        })
    }

    /// Tag tokens for this annotation: title plus description, tokenized.
    pub fn tokens(&self) -> Vec<String> {
        tokenize(&format!("{} {}", self.title, self.description))
    }
}

/// Extract a named element's text content from an annotation document.
///
/// The corpus markup is flat and non-nested, so a single open/close tag scan
/// suffices; standard entities are decoded.
fn extract_element(document: &str, element: &str) -> Option<String> {
    let open = format!("<{}>", element);
    let close = format!("</{}>", element);

    let start = document.find(&open)? + open.len();
    let end = document[start..].find(&close)? + start;

    let value = &document[start..end];
    let decoded = value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&apos;", "'")
        .replace("&quot;", "\"");
    Some(decoded.trim().to_string())
}

/// Walk an extracted `annotations/` directory and convert every English
/// annotation document into a text-feature record.
///
/// Records come back sorted by id so conversion output is deterministic.
pub fn convert_annotations(annotations_dir: &Path) -> Result<Vec<TextRecord>, DatasetError> {
    let mut records = Vec::new();

    for entry in WalkDir::new(annotations_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let is_english = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("eng"))
            .unwrap_or(false);
        if !is_english {
            continue;
        }

        let document =
            std::fs::read_to_string(entry.path()).map_err(|e| DatasetError::Read {
                path: entry.path().to_path_buf(),
                message: e.to_string(),
            })?;
        let annotation = Annotation::parse(&document)?;
        records.push(TextRecord {
            id: annotation.uniq_id.clone(),
            tags: annotation.tokens(),
        });
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::info!(
        "Converted {} annotation document(s) from {:?}",
        records.len(),
        annotations_dir
    );
    Ok(records)
}

/// Whether a path carries one of the corpus's known extensions.
pub fn is_corpus_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| KNOWN_EXTENSIONS.iter().any(|k| e.eq_ignore_ascii_case(k)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <DOC>
        <DOCNO>annotations/02/2808.eng</DOCNO>
        <TITLE>In the Tafí del Valle in the province Tucumán</TITLE>
        <DESCRIPTION>a man on a dry slope with a few dry tussocks; a lake and a brown, bald mountain landscape in the background;</DESCRIPTION>
        <NOTES>Tafí del Valle is in the west of the province Tucumán;</NOTES>
        <LOCATION>Tucumán, Argentina</LOCATION>
        <DATE>January 2002</DATE>
        <IMAGE>images/02/2808.jpg</IMAGE>
        <THUMBNAIL>thumbnails/02/2808.jpg</THUMBNAIL>
        </DOC>
        "#;

    #[test]
    fn test_id_from_path_equivalent_extensions() {
        let uniq_id = "00/0000";
        for path in [
            format!("/test/test/{}.jpg", uniq_id),
            format!("/test/test/{}.eng", uniq_id),
        ] {
            assert_eq!(id_from_path(&path), uniq_id);
        }
    }

    #[test]
    fn test_id_from_path_relative() {
        assert_eq!(id_from_path("annotations/02/2808.eng"), "02/2808");
    }

    #[test]
    fn test_annotation_parse() {
        let a = Annotation::parse(SAMPLE).unwrap();
        assert_eq!(a.title, "In the Tafí del Valle in the province Tucumán");
        assert_eq!(
            a.description,
            "a man on a dry slope with a few dry tussocks; a lake and a brown, bald mountain landscape in the background;"
        );
        assert_eq!(a.uniq_id, "02/2808");
    }

    #[test]
    fn test_annotation_missing_docno() {
        assert!(Annotation::parse("<DOC><TITLE>t</TITLE></DOC>").is_err());
    }

    #[test]
    fn test_annotation_entity_decoding() {
        let doc = "<DOC><DOCNO>annotations/00/1.eng</DOCNO><TITLE>salt &amp; pepper</TITLE></DOC>";
        let a = Annotation::parse(doc).unwrap();
        assert_eq!(a.title, "salt & pepper");
    }

    #[test]
    fn test_annotation_tokens() {
        let a = Annotation::parse(SAMPLE).unwrap();
        let tokens = a.tokens();
        assert!(tokens.contains(&"man".to_string()));
        assert!(tokens.contains(&"lake".to_string()));
        assert!(tokens.contains(&"mountain".to_string()));
        // deduplicated
        assert_eq!(tokens.iter().filter(|t| *t == "dry").count(), 1);
    }

    #[test]
    fn test_convert_annotations_walks_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("annotations").join("02");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("2808.eng"), SAMPLE).unwrap();
        std::fs::write(
            sub.join("0001.eng"),
            "<DOC><DOCNO>annotations/02/0001.eng</DOCNO><TITLE>a grey cat</TITLE></DOC>",
        )
        .unwrap();
        // Non-English documents are skipped
        std::fs::write(sub.join("2808.ger"), SAMPLE).unwrap();

        let records = convert_annotations(dir.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "02/0001");
        assert_eq!(records[1].id, "02/2808");
        assert!(records[0].tags.contains(&"cat".to_string()));
    }

    #[test]
    fn test_is_corpus_file() {
        assert!(is_corpus_file(Path::new("a/b.eng")));
        assert!(is_corpus_file(Path::new("a/b.JPG")));
        assert!(!is_corpus_file(Path::new("a/b.txt")));
        assert!(!is_corpus_file(Path::new("a/b")));
    }

    /// Network-dependent liveness probe for the declared corpus URLs.
    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_urls_are_live() {
        let client = reqwest::Client::new();
        for url in [IAPRTC12_URL, INRIA_LEAR_URL] {
            let response = client.head(url).send().await.unwrap();
            assert!(response.status().is_success(), "{} is down", url);
        }
    }
}
