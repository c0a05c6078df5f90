//! Paired image-feature / text-feature datasets.
//!
//! A dataset is two JSON Lines files keyed by sample id:
//!
//! ```text
//! images.jsonl:  {"id": "02/2808", "feature": [0.13, -0.5, …]}
//! text.jsonl:    {"id": "02/2808", "tags": ["man", "slope", "lake"]}
//! ```
//!
//! The two files must align one-to-one by id; loading fails otherwise.
//! Sample order follows the image-feature file. Features are either fully
//! materialized (`in_memory`) or re-read from disk per access via recorded
//! byte offsets.

pub mod iaprtc12;
pub mod mscoco;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// One line of an image-feature file.
#[derive(Debug, Serialize, Deserialize)]
struct ImageRecord {
    id: String,
    feature: Vec<f32>,
}

/// One line of a text-feature file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRecord {
    pub id: String,
    pub tags: Vec<String>,
}

#[derive(Debug)]
enum FeatureStore {
    InMemory(Vec<Vec<f32>>),
    Lazy { path: PathBuf, offsets: Vec<u64> },
}

/// A loaded dataset: aligned (image feature, tag set) pairs keyed by id.
#[derive(Debug)]
pub struct Dataset {
    ids: Vec<String>,
    tags: Vec<Vec<String>>,
    feature_dim: usize,
    features: FeatureStore,
}

impl Dataset {
    /// Load a dataset from an image-feature file and a text-feature file.
    ///
    /// With `in_memory` set, all feature vectors are materialized up front;
    /// otherwise only byte offsets are kept and each access seeks back into
    /// the file. Both modes validate every line once at load time.
    pub fn load(
        image_path: &Path,
        text_path: &Path,
        in_memory: bool,
    ) -> Result<Self, DatasetError> {
        let tags_by_id = read_text_records(text_path)?;

        let file = File::open(image_path).map_err(|e| DatasetError::Read {
            path: image_path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut reader = BufReader::new(file);

        let mut ids = Vec::new();
        let mut tags = Vec::new();
        let mut vectors = Vec::new();
        let mut offsets = Vec::new();
        let mut feature_dim = 0usize;

        let mut offset = 0u64;
        let mut buf = String::new();
        let mut line_no = 0usize;
        loop {
            buf.clear();
            let read = reader
                .read_line(&mut buf)
                .map_err(|e| DatasetError::Read {
                    path: image_path.to_path_buf(),
                    message: e.to_string(),
                })?;
            if read == 0 {
                break;
            }
            line_no += 1;
            let line_offset = offset;
            offset += read as u64;

            if buf.trim().is_empty() {
                continue;
            }

            let record: ImageRecord =
                serde_json::from_str(&buf).map_err(|e| DatasetError::Parse {
                    path: image_path.to_path_buf(),
                    line: line_no,
                    message: e.to_string(),
                })?;

            if feature_dim == 0 {
                feature_dim = record.feature.len();
            } else if record.feature.len() != feature_dim {
                return Err(DatasetError::Dimension {
                    path: image_path.to_path_buf(),
                    expected: feature_dim,
                    found: record.feature.len(),
                    line: line_no,
                });
            }

            let sample_tags =
                tags_by_id
                    .get(&record.id)
                    .ok_or_else(|| DatasetError::Misaligned {
                        path: text_path.to_path_buf(),
                        message: format!("no text record for sample {:?}", record.id),
                    })?;

            ids.push(record.id);
            tags.push(sample_tags.clone());
            if in_memory {
                vectors.push(record.feature);
            } else {
                offsets.push(line_offset);
            }
        }

        if ids.len() != tags_by_id.len() {
            let seen: HashMap<&str, ()> = ids.iter().map(|i| (i.as_str(), ())).collect();
            let orphan = tags_by_id
                .keys()
                .find(|id| !seen.contains_key(id.as_str()))
                .cloned()
                .unwrap_or_default();
            return Err(DatasetError::Misaligned {
                path: image_path.to_path_buf(),
                message: format!(
                    "text file has {} record(s) but image file has {} ({:?} has no image features)",
                    tags_by_id.len(),
                    ids.len(),
                    orphan
                ),
            });
        }

        let features = if in_memory {
            FeatureStore::InMemory(vectors)
        } else {
            FeatureStore::Lazy {
                path: image_path.to_path_buf(),
                offsets,
            }
        };

        tracing::info!(
            "Loaded dataset: {} samples, {} feature dims ({})",
            ids.len(),
            feature_dim,
            if in_memory { "in memory" } else { "lazy" },
        );

        Ok(Self {
            ids,
            tags,
            feature_dim,
            features,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the dataset has no samples.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Image feature dimensionality.
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Sample ids, in file order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Tags for the sample at `index`.
    pub fn tags(&self, index: usize) -> &[String] {
        &self.tags[index]
    }

    /// All tag lists, aligned with `ids()`.
    pub fn all_tags(&self) -> &[Vec<String>] {
        &self.tags
    }

    /// Materialize the image features for a set of sample indices as a
    /// `len(indices) × feature_dim` matrix.
    pub fn features_for(&self, indices: &[usize]) -> Result<Array2<f32>, DatasetError> {
        let mut matrix = Array2::<f32>::zeros((indices.len(), self.feature_dim));
        match &self.features {
            FeatureStore::InMemory(vectors) => {
                for (row, &i) in indices.iter().enumerate() {
                    for (col, &v) in vectors[i].iter().enumerate() {
                        matrix[[row, col]] = v;
                    }
                }
            }
            FeatureStore::Lazy { path, offsets } => {
                let mut file = File::open(path).map_err(|e| DatasetError::Read {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                for (row, &i) in indices.iter().enumerate() {
                    let feature = read_feature_at(&mut file, path, offsets[i])?;
                    for (col, &v) in feature.iter().enumerate() {
                        matrix[[row, col]] = v;
                    }
                }
            }
        }
        Ok(matrix)
    }

    /// Materialize every sample's features, in dataset order.
    pub fn all_features(&self) -> Result<Array2<f32>, DatasetError> {
        let indices: Vec<usize> = (0..self.len()).collect();
        self.features_for(&indices)
    }
}

/// Split free text into lowercase tag tokens, deduplicated in first-seen
/// order. Punctuation separates tokens; single characters are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashMap::new();
    let mut tokens = Vec::new();
    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        if raw.len() < 2 {
            continue;
        }
        let token = raw.to_lowercase();
        if seen.insert(token.clone(), ()).is_none() {
            tokens.push(token);
        }
    }
    tokens
}

fn read_text_records(path: &Path) -> Result<HashMap<String, Vec<String>>, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let reader = BufReader::new(file);

    let mut by_id = HashMap::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| DatasetError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TextRecord = serde_json::from_str(&line).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            line: line_no + 1,
            message: e.to_string(),
        })?;
        if by_id.insert(record.id.clone(), record.tags).is_some() {
            return Err(DatasetError::Misaligned {
                path: path.to_path_buf(),
                message: format!("duplicate sample id {:?}", record.id),
            });
        }
    }
    Ok(by_id)
}

fn read_feature_at(file: &mut File, path: &Path, offset: u64) -> Result<Vec<f32>, DatasetError> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| DatasetError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let mut reader = BufReader::new(file.by_ref());
    let mut line = String::new();
    reader.read_line(&mut line).map_err(|e| DatasetError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let record: ImageRecord = serde_json::from_str(&line).map_err(|e| DatasetError::Parse {
        path: path.to_path_buf(),
        line: 0,
        message: e.to_string(),
    })?;
    Ok(record.feature)
}
