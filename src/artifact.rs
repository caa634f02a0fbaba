//! Fetching the trained model from local disk or an S3 bucket.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::info;

use crate::error::ArtifactError;
use crate::model::GbdtFareModel;

/// Where the model artifact lives. `s3://bucket/key` names an object,
/// anything else is a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocation {
    Local(PathBuf),
    ObjectStore { bucket: String, key: String },
}

impl FromStr for ModelLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix("s3://") else {
            if s.is_empty() {
                return Err("model location is empty".to_string());
            }
            return Ok(ModelLocation::Local(PathBuf::from(s)));
        };
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok(ModelLocation::ObjectStore {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            _ => Err(format!("expected s3://<bucket>/<key>, got {s}")),
        }
    }
}

impl fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelLocation::Local(path) => write!(f, "{}", path.display()),
            ModelLocation::ObjectStore { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// Reads the raw artifact bytes. S3 credentials come from the usual
/// `AWS_*` environment variables.
pub async fn fetch(location: &ModelLocation, region: &str) -> Result<Vec<u8>, ArtifactError> {
    match location {
        ModelLocation::Local(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| ArtifactError::Io {
                    path: path.display().to_string(),
                    source,
                })
        }
        ModelLocation::ObjectStore { bucket, key } => {
            let wrap = |source: object_store::Error| ArtifactError::ObjectStore {
                bucket: bucket.clone(),
                key: key.clone(),
                source,
            };
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .with_region(region)
                .build()
                .map_err(wrap)?;
            let object = store
                .get(&ObjectPath::from(key.as_str()))
                .await
                .map_err(wrap)?;
            let bytes = object.bytes().await.map_err(wrap)?;
            Ok(bytes.to_vec())
        }
    }
}

/// Fetches, decodes and warms up the model.
pub async fn load_model(
    location: &ModelLocation,
    region: &str,
) -> Result<GbdtFareModel, ArtifactError> {
    let bytes = fetch(location, region).await?;
    let model = GbdtFareModel::from_bytes(&bytes)?;
    info!(%location, bytes = bytes.len(), "model artifact loaded");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locations() {
        assert_eq!(
            "gbdt.model".parse::<ModelLocation>().unwrap(),
            ModelLocation::Local(PathBuf::from("gbdt.model"))
        );
        assert_eq!(
            "s3://taxi-model-storage/models/lgb.model"
                .parse::<ModelLocation>()
                .unwrap(),
            ModelLocation::ObjectStore {
                bucket: "taxi-model-storage".into(),
                key: "models/lgb.model".into(),
            }
        );
    }

    #[test]
    fn rejects_incomplete_s3_urls() {
        assert!("s3://bucket-only".parse::<ModelLocation>().is_err());
        assert!("s3://bucket/".parse::<ModelLocation>().is_err());
        assert!("s3:///key".parse::<ModelLocation>().is_err());
        assert!("".parse::<ModelLocation>().is_err());
    }

    #[test]
    fn displays_round_trip() {
        let loc: ModelLocation = "s3://b/k.model".parse().unwrap();
        assert_eq!(loc.to_string(), "s3://b/k.model");
    }

    #[tokio::test]
    async fn missing_local_file_is_an_io_error() {
        let loc = ModelLocation::Local(PathBuf::from("/nonexistent/fare/gbdt.model"));
        let err = load_model(&loc, "ap-southeast-2").await.err().unwrap();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }
}
