use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{error, info, warn};
use url::Url;

use crate::config::AssetSettings;
use crate::errors::AppError;
use crate::models::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Video,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedAsset {
    #[serde(alias = "publicId")]
    pub public_id: String,
    pub url: String,
    /// Seconds, reported for video uploads.
    #[serde(default)]
    pub duration: Option<f64>,
}

impl UploadedAsset {
    pub fn asset(&self) -> Asset {
        Asset {
            public_id: self.public_id.clone(),
            url: self.url.clone(),
        }
    }
}

/// Remote media host. Uploads return a public id that is later used to delete.
#[async_trait]
pub trait AssetGateway: Send + Sync {
    async fn upload(&self, path: &Path, kind: AssetKind) -> Result<UploadedAsset, AppError>;
    async fn delete(&self, public_id: &str, kind: AssetKind) -> Result<(), AppError>;
}

pub struct HttpAssetGateway {
    http_client: Client,
    base_url: Url,
    api_key: Secret<String>,
}

impl HttpAssetGateway {
    pub fn new(settings: &AssetSettings) -> Self {
        Self {
            http_client: Client::new(),
            base_url: settings.base_url.clone(),
            api_key: Secret::new(settings.api_key.expose_secret().clone()),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Unexpected(anyhow::anyhow!("ASSET_BASE_URL cannot be a base")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl AssetGateway for HttpAssetGateway {
    #[tracing::instrument(name = "upload_asset", skip(self), fields(kind = kind.as_str()))]
    async fn upload(&self, path: &Path, kind: AssetKind) -> Result<UploadedAsset, AppError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            AppError::Unexpected(anyhow::Error::new(e).context("Failed to read staged upload"))
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = Form::new()
            .text("resourceType", kind.as_str())
            .part("file", Part::bytes(data).file_name(file_name));

        let url = self.endpoint(&["upload"])?;
        let response = self
            .http_client
            .post(url)
            .header("api-key", self.api_key.expose_secret())
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| error!("Failed to send upload request: {:?}", e))?
            .error_for_status()?;

        let uploaded: UploadedAsset = response.json().await?;
        info!(public_id = %uploaded.public_id, "Asset uploaded");
        Ok(uploaded)
    }

    #[tracing::instrument(name = "delete_asset", skip(self), fields(kind = kind.as_str()))]
    async fn delete(&self, public_id: &str, kind: AssetKind) -> Result<(), AppError> {
        let url = self.endpoint(&[kind.as_str(), public_id])?;
        self.http_client
            .delete(url)
            .header("api-key", self.api_key.expose_secret())
            .send()
            .await
            .inspect_err(|e| error!("Failed to send delete request: {:?}", e))?
            .error_for_status()?;
        info!("Asset deleted");
        Ok(())
    }
}

/// Writes an uploaded multipart field to a temporary file. The file is removed
/// when the returned handle is dropped, whatever happens to the request.
pub async fn stage_upload(data: Bytes, file_name: Option<String>) -> Result<NamedTempFile, AppError> {
    tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let suffix = file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| AppError::Unexpected(anyhow::Error::new(e).context("Upload staging task failed")))?
    .map_err(|e| AppError::Unexpected(anyhow::Error::new(e).context("Failed to stage upload")))
}

/// Tracks assets uploaded during one request so they can be removed again if a
/// later step fails. Call [`commit`](Self::commit) once the record is stored.
pub struct AssetLedger<'a> {
    gateway: &'a dyn AssetGateway,
    uploaded: Vec<(String, AssetKind)>,
}

impl<'a> AssetLedger<'a> {
    pub fn new(gateway: &'a dyn AssetGateway) -> Self {
        Self {
            gateway,
            uploaded: Vec::new(),
        }
    }

    pub async fn upload(&mut self, path: &Path, kind: AssetKind) -> Result<UploadedAsset, AppError> {
        let uploaded = self.gateway.upload(path, kind).await?;
        self.uploaded.push((uploaded.public_id.clone(), kind));
        Ok(uploaded)
    }

    pub fn commit(self) {}

    pub async fn rollback(self) {
        for (public_id, kind) in self.uploaded {
            if let Err(e) = self.gateway.delete(&public_id, kind).await {
                warn!(public_id = %public_id, error = %e, "Failed to remove orphaned asset");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::RecordingGateway;
    use super::*;

    fn gateway(base: &str) -> HttpAssetGateway {
        HttpAssetGateway::new(&AssetSettings {
            base_url: Url::parse(base).unwrap(),
            api_key: Secret::new("key".to_string()),
        })
    }

    #[test]
    fn delete_urls_encode_the_public_id() {
        let url = gateway("https://media.example.com/api/")
            .endpoint(&["video", "folder/clip one"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://media.example.com/api/video/folder%2Fclip%20one"
        );

        let url = gateway("https://media.example.com/api").endpoint(&["upload"]).unwrap();
        assert_eq!(url.as_str(), "https://media.example.com/api/upload");
    }

    #[test]
    fn upload_response_accepts_camel_case_ids() {
        let uploaded: UploadedAsset =
            serde_json::from_str(r#"{"publicId":"abc","url":"https://x/abc","duration":3.5}"#)
                .unwrap();
        assert_eq!(uploaded.public_id, "abc");
        assert_eq!(uploaded.duration, Some(3.5));
    }

    #[tokio::test]
    async fn staged_files_are_removed_on_drop() {
        let staged = stage_upload(Bytes::from_static(b"frames"), Some("clip.mp4".into()))
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.to_string_lossy().ends_with(".mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"frames");
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn rollback_deletes_everything_uploaded_so_far() {
        let gateway = RecordingGateway::default();
        gateway.fail_uploads_of(AssetKind::Image);
        let staged = stage_upload(Bytes::from_static(b"x"), None).await.unwrap();

        let mut ledger = AssetLedger::new(&gateway);
        let video = ledger.upload(staged.path(), AssetKind::Video).await.unwrap();
        assert!(ledger.upload(staged.path(), AssetKind::Image).await.is_err());
        ledger.rollback().await;

        assert_eq!(gateway.deleted_ids(), vec![video.public_id]);
    }

    #[tokio::test]
    async fn committed_uploads_are_kept() {
        let gateway = RecordingGateway::default();
        let staged = stage_upload(Bytes::from_static(b"x"), None).await.unwrap();

        let mut ledger = AssetLedger::new(&gateway);
        ledger.upload(staged.path(), AssetKind::Image).await.unwrap();
        ledger.commit();

        assert!(gateway.deleted_ids().is_empty());
    }
}
