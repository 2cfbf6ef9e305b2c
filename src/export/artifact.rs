//! Versioned JSON artifact envelope

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ChurnError, Result};

/// Magic string identifying pipeline artifacts
const MAGIC: &str = "CHURN";

/// Current envelope format version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// What an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Model,
    Preprocessor,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    magic: &'static str,
    format_version: u32,
    kind: ArtifactKind,
    created_at: DateTime<Utc>,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    magic: String,
    format_version: u32,
    kind: ArtifactKind,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
    payload: serde_json::Value,
}

/// Write `payload` to `path` inside an envelope, creating parent directories
pub fn save_artifact<T: Serialize>(path: impl AsRef<Path>, kind: ArtifactKind, payload: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let envelope = EnvelopeRef {
        magic: MAGIC,
        format_version: ARTIFACT_FORMAT_VERSION,
        kind,
        created_at: Utc::now(),
        payload,
    };

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &envelope)?;
    info!(path = %path.display(), kind = ?kind, "Artifact saved");
    Ok(())
}

/// Read an artifact back.
///
/// Every failure (missing file, foreign format, wrong kind or version,
/// payload that does not decode) is reported as `ArtifactUnavailable`.
pub fn load_artifact<T: DeserializeOwned>(path: impl AsRef<Path>, kind: ArtifactKind) -> Result<T> {
    let path = path.as_ref();
    let unavailable = |reason: String| ChurnError::ArtifactUnavailable {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
    let envelope: Envelope = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| unavailable(format!("not a pipeline artifact: {}", e)))?;

    if envelope.magic != MAGIC {
        return Err(unavailable(format!("unexpected magic '{}'", envelope.magic)));
    }
    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(unavailable(format!(
            "format version {} is not supported (expected {})",
            envelope.format_version, ARTIFACT_FORMAT_VERSION
        )));
    }
    if envelope.kind != kind {
        return Err(unavailable(format!(
            "expected a {:?} artifact, found {:?}",
            kind, envelope.kind
        )));
    }

    let payload = serde_json::from_value(envelope.payload)
        .map_err(|e| unavailable(format!("incompatible payload: {}", e)))?;
    debug!(path = %path.display(), kind = ?kind, "Artifact loaded");
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        weights: Vec<f64>,
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");
        let payload = Payload {
            name: "lr".into(),
            weights: vec![0.5, -1.0],
        };

        save_artifact(&path, ArtifactKind::Model, &payload).unwrap();
        let loaded: Payload = load_artifact(&path, ArtifactKind::Model).unwrap();
        assert_eq!(loaded, payload);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempdir().unwrap();
        let err = load_artifact::<Payload>(dir.path().join("absent.json"), ArtifactKind::Model)
            .unwrap_err();
        assert!(matches!(err, ChurnError::ArtifactUnavailable { .. }));
    }

    #[test]
    fn test_wrong_kind_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.json");
        save_artifact(&path, ArtifactKind::Preprocessor, &vec![1, 2, 3]).unwrap();
        let err = load_artifact::<Vec<i32>>(&path, ArtifactKind::Model).unwrap_err();
        assert!(err.is_model_unavailable());
    }

    #[test]
    fn test_foreign_json_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.json");
        std::fs::write(&path, r#"{"weights": [1.0]}"#).unwrap();
        let err = load_artifact::<Payload>(&path, ArtifactKind::Model).unwrap_err();
        assert!(matches!(err, ChurnError::ArtifactUnavailable { .. }));
    }
}
