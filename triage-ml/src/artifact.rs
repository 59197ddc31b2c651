use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use bincode::Options;
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::error::{PipelineError, PipelineResult};
use crate::model::FittedModel;

const MAGIC: &[u8; 8] = b"TRIAGEv1";

fn codec() -> impl Options {
    bincode::options()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

pub fn to_bytes(model: &FittedModel) -> PipelineResult<Vec<u8>> {
    let payload = codec()
        .serialize(model)
        .map_err(|err| PipelineError::Serialize(err.to_string()))?;
    let mut bytes = Vec::with_capacity(MAGIC.len() + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decodes and cross-checks an artifact. The error is a human-readable reason.
pub fn from_bytes(bytes: &[u8]) -> Result<FittedModel, String> {
    let payload = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| "missing artifact header".to_string())?;
    let model: FittedModel = codec()
        .deserialize(payload)
        .map_err(|err| format!("undecodable payload: {err}"))?;
    model.validate()?;
    Ok(model)
}

/// Writes the whole model bundle to `path`, replacing any existing file. The
/// bytes go to a uniquely named sibling file first and are renamed into place,
/// so concurrent writers never share a staging file.
pub fn save(model: &FittedModel, path: &Path) -> PipelineResult<()> {
    let bytes = to_bytes(model)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| PipelineError::io(parent, err))?;

    let mut staging = NamedTempFile::new_in(parent).map_err(|err| PipelineError::io(parent, err))?;
    staging
        .write_all(&bytes)
        .and_then(|()| staging.as_file().sync_all())
        .map_err(|err| PipelineError::io(staging.path(), err))?;
    staging
        .persist(path)
        .map_err(|err| PipelineError::io(path, err.error))?;

    info!(
        target: "triage_ml::artifact",
        "saved model to {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Reads a model bundle. A missing file is `Ok(None)`; anything that is not a
/// valid artifact is [`PipelineError::CorruptArtifact`].
pub fn load(path: &Path) -> PipelineResult<Option<FittedModel>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(
                target: "triage_ml::artifact",
                "no model artifact at {}",
                path.display()
            );
            return Ok(None);
        }
        Err(err) => return Err(PipelineError::io(path, err)),
    };

    let model = from_bytes(&bytes).map_err(|reason| PipelineError::corrupt(path, reason))?;
    info!(
        target: "triage_ml::artifact",
        "loaded model from {} (accuracy {:.1}%, trained {})",
        path.display(),
        model.accuracy(),
        model.metadata().training_date
    );
    Ok(Some(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{predict, FeatureRecord};
    use crate::trainer::Trainer;
    use triage_core::{encode, RawDataset, Value};

    fn fitted() -> FittedModel {
        let rows = (0..24)
            .map(|i| {
                let symptom = ["fever", "cough", "headache"][i % 3];
                let condition = ["Influenza", "Cold", "Migraine"][i % 3];
                vec![
                    Value::from(symptom),
                    Value::Number((i % 4) as f64),
                    Value::from(condition),
                ]
            })
            .collect();
        let raw = RawDataset::new(
            vec!["symptom".into(), "days".into(), "condition".into()],
            rows,
        )
        .expect("rectangular");
        Trainer::default()
            .train(&encode(&raw).expect("encodes"))
            .expect("trains")
    }

    #[test]
    fn save_then_load_preserves_the_bundle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("model.bin");
        let model = fitted();

        save(&model, &path).expect("save");
        let loaded = load(&path).expect("load").expect("artifact present");

        assert_eq!(loaded, model);
        let record: FeatureRecord = [
            ("symptom".to_string(), Value::from("cough")),
            ("days".to_string(), Value::Number(2.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            predict(&loaded, &record).expect("loaded"),
            predict(&model, &record).expect("original")
        );
        let leftovers: Vec<_> = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(leftovers, ["model.bin"]);
    }

    #[test]
    fn concurrent_saves_to_one_path_leave_a_valid_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.bin");
        let model = std::sync::Arc::new(fitted());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let model = std::sync::Arc::clone(&model);
                let path = path.clone();
                std::thread::spawn(move || save(&model, &path))
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread").expect("save");
        }

        assert_eq!(load(&path).expect("load").as_ref(), Some(&*model));
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.bin");
        fs::write(&path, b"stale").expect("seed file");

        save(&fitted(), &path).expect("save");

        assert!(load(&path).expect("load").is_some());
    }

    #[test]
    fn missing_artifact_is_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load(&dir.path().join("nope.bin")).expect("load").is_none());
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.bin");
        fs::write(&path, b"not a model").expect("write");

        let err = load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptArtifact { .. }));
    }

    #[test]
    fn truncated_payload_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.bin");
        let bytes = to_bytes(&fitted()).expect("encode");
        fs::write(&path, &bytes[..bytes.len() / 2]).expect("write");

        let err = load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptArtifact { .. }));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = to_bytes(&fitted()).expect("encode");
        bytes.push(0);
        assert!(from_bytes(&bytes).is_err());
    }
}
