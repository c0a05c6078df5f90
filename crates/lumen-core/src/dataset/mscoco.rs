//! MSCOCO 2014 corpus preparation.
//!
//! Annotations arrive as one large JSON document with `images` and
//! `annotations` arrays. The unique sample id is the numeric image id, which
//! is also recoverable from image file names
//! (`COCO_train2014_000000318556.jpg` → `318556`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{tokenize, TextRecord};
use crate::error::DatasetError;

/// Object instance annotations for train/val 2014.
pub const TRAIN_VAL_INSTANCES_2014_URL: &str =
    "http://msvocds.blob.core.windows.net/annotations-1-0-3/instances_train-val2014.zip";

/// Image caption annotations for train/val 2014.
pub const TRAIN_VAL_IMAGE_CAPTIONS_2014_URL: &str =
    "http://msvocds.blob.core.windows.net/annotations-1-0-4/captions_train-val2014.zip";

/// Training image archive for 2014.
pub const TRAIN_IMAGE_2014_URL: &str =
    "http://msvocds.blob.core.windows.net/coco2014/train2014.zip";

/// Captions annotation document (unknown fields ignored).
#[derive(Debug, Deserialize)]
pub struct CaptionsFile {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoCaption>,
}

/// One entry of the `images` array.
#[derive(Debug, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
}

/// One entry of the `annotations` array.
#[derive(Debug, Deserialize)]
pub struct CocoCaption {
    pub image_id: u64,
    pub caption: String,
}

/// Derive the numeric image id from a COCO image file name.
///
/// ```
/// use lumen_core::dataset::mscoco::id_from_path;
/// assert_eq!(id_from_path("COCO_train2014_000000318556.jpg"), Some(318556));
/// ```
pub fn id_from_path(path: &str) -> Option<u64> {
    let stem = Path::new(path).file_stem()?.to_str()?;
    let digits = stem.rsplit('_').next()?;
    digits.parse().ok()
}

/// Parse a captions JSON file from disk.
pub fn read_captions(path: &Path) -> Result<CaptionsFile, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|e| DatasetError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| DatasetError::Parse {
        path: path.to_path_buf(),
        line: 0,
        message: e.to_string(),
    })
}

/// Convert a captions file into text-feature records, one per image, with
/// tags drawn from all of that image's captions. Records are sorted by
/// numeric id.
pub fn convert_captions(captions: &CaptionsFile) -> Vec<TextRecord> {
    let mut text_by_image: BTreeMap<u64, String> = BTreeMap::new();
    for image in &captions.images {
        text_by_image.entry(image.id).or_default();
    }
    for caption in &captions.annotations {
        let entry = text_by_image.entry(caption.image_id).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(&caption.caption);
    }

    text_by_image
        .into_iter()
        .map(|(id, text)| TextRecord {
            id: id.to_string(),
            tags: tokenize(&text),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_captions() -> CaptionsFile {
        serde_json::from_str(
            r#"{
                "info": {"year": 2014},
                "images": [
                    {"id": 318556, "file_name": "COCO_train2014_000000318556.jpg", "width": 640},
                    {"id": 42, "file_name": "COCO_train2014_000000000042.jpg"}
                ],
                "annotations": [
                    {"id": 1, "image_id": 318556, "caption": "A man riding a red bicycle."},
                    {"id": 2, "image_id": 318556, "caption": "A cyclist on a city street."}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_id_from_path() {
        assert_eq!(id_from_path("COCO_train2014_000000318556.jpg"), Some(318556));
        assert_eq!(
            id_from_path("/data/train2014/COCO_train2014_000000000042.jpg"),
            Some(42)
        );
        assert_eq!(id_from_path("notes.txt"), None);
    }

    #[test]
    fn test_convert_captions_merges_and_sorts() {
        let records = convert_captions(&sample_captions());
        assert_eq!(records.len(), 2);
        // Sorted numerically
        assert_eq!(records[0].id, "42");
        assert_eq!(records[1].id, "318556");
        // Tokens from both captions, deduplicated
        let tags = &records[1].tags;
        assert!(tags.contains(&"bicycle".to_string()));
        assert!(tags.contains(&"cyclist".to_string()));
        assert_eq!(tags.iter().filter(|t| *t == "man").count(), 1);
    }

    #[test]
    fn test_convert_captions_image_without_captions() {
        let records = convert_captions(&sample_captions());
        assert!(records[0].tags.is_empty());
    }

    #[test]
    fn test_read_captions_rejects_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.json");
        std::fs::write(&path, "{\"images\": 3}").unwrap();
        assert!(matches!(
            read_captions(&path),
            Err(DatasetError::Parse { .. })
        ));
    }

    /// Network-dependent liveness probe for the declared corpus URLs.
    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_urls_are_live() {
        let client = reqwest::Client::new();
        for url in [
            TRAIN_VAL_INSTANCES_2014_URL,
            TRAIN_VAL_IMAGE_CAPTIONS_2014_URL,
            TRAIN_IMAGE_2014_URL,
        ] {
            let response = client.head(url).send().await.unwrap();
            assert!(response.status().is_success(), "{} is down", url);
        }
    }
}
