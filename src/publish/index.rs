//! Upload client for the package index legacy upload API.

use super::{Credential, Uploader};
use crate::build::Artifact;
use crate::error::{PublishError, ReleaseError, Result};
use crate::metadata::ProjectDescriptor;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

/// Default upload endpoint
pub const DEFAULT_REPOSITORY_URL: &str = "https://upload.pypi.org/legacy/";

/// Core metadata version sent with each upload
const METADATA_VERSION: &str = "2.1";

/// Uploads artifacts over HTTPS with token authentication
#[derive(Debug, Clone)]
pub struct IndexUploader {
    client: reqwest::Client,
    repository: Url,
}

impl IndexUploader {
    /// Create an uploader for the given repository URL
    pub fn new(repository_url: &str) -> Result<Self> {
        let repository = Url::parse(repository_url).map_err(|e| PublishError::InvalidRepository {
            url: repository_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(repository.scheme(), "https" | "http") {
            return Err(PublishError::InvalidRepository {
                url: repository_url.to_string(),
                reason: "scheme must be http or https".to_string(),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("pyext_release/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| PublishError::Network {
                file: String::new(),
                reason: e.to_string(),
            })?;

        Ok(Self { client, repository })
    }

    /// Repository URL uploads go to
    pub fn repository(&self) -> &Url {
        &self.repository
    }

    fn form(artifact: &Artifact, project: &ProjectDescriptor, content: Vec<u8>) -> Result<Form> {
        let md5_digest = format!("{:x}", md5::compute(&content));
        let sha256_digest = hex::encode(Sha256::digest(&content));

        let part = Part::bytes(content)
            .file_name(artifact.file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| PublishError::Network {
                file: artifact.file_name.clone(),
                reason: e.to_string(),
            })?;

        let descriptor = &project.descriptor;
        let mut form = Form::new()
            .text(":action", "file_upload")
            .text("protocol_version", "1")
            .text("metadata_version", METADATA_VERSION)
            .text("name", project.name.clone())
            .text("version", project.version.clone())
            .text("filetype", artifact.kind.filetype())
            .text("pyversion", artifact.kind.pyversion().to_string())
            .text("md5_digest", md5_digest)
            .text("sha256_digest", sha256_digest);

        if let Some(summary) = &descriptor.description {
            form = form.text("summary", summary.clone());
        }
        if let Some(license) = &descriptor.license {
            form = form.text("license", license.clone());
        }
        if let Some(requires_python) = &descriptor.requires_python {
            form = form.text("requires_python", requires_python.clone());
        }
        if !descriptor.keywords.is_empty() {
            form = form.text("keywords", descriptor.keywords.join(","));
        }
        for classifier in &descriptor.classifiers {
            form = form.text("classifiers", classifier.clone());
        }
        Ok(form.part("content", part))
    }
}

impl Uploader for IndexUploader {
    async fn upload(
        &self,
        artifact: &Artifact,
        project: &ProjectDescriptor,
        credential: &Credential,
    ) -> Result<()> {
        let content = tokio::fs::read(&artifact.path).await?;
        let size = content.len();
        let form = Self::form(artifact, project, content)?;

        log::info!(
            "Uploading {} ({} bytes) to {}",
            artifact.file_name,
            size,
            self.repository
        );

        let response = self
            .client
            .post(self.repository.clone())
            .basic_auth(credential.username(), Some(credential.secret()))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PublishError::Network {
                file: artifact.file_name.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(
            status,
            &body,
            &artifact.file_name,
            self.repository.as_str(),
        ))
    }
}

/// Map an unsuccessful upload response onto a publish error
fn classify_failure(status: StatusCode, body: &str, file: &str, repository: &str) -> ReleaseError {
    let error = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::AuthenticationFailed {
            repository: repository.to_string(),
            status: status.as_u16(),
        },
        StatusCode::CONFLICT => PublishError::AlreadyPublished {
            file: file.to_string(),
        },
        StatusCode::BAD_REQUEST if body.to_ascii_lowercase().contains("already exist") => {
            PublishError::AlreadyPublished {
                file: file.to_string(),
            }
        }
        _ => PublishError::UploadRejected {
            file: file.to_string(),
            status: status.as_u16(),
            reason: body.lines().next().unwrap_or_default().trim().to_string(),
        },
    };
    error.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_repository_urls() {
        assert!(IndexUploader::new("not a url").is_err());
        assert!(IndexUploader::new("ftp://upload.example.com/").is_err());
        assert!(IndexUploader::new(DEFAULT_REPOSITORY_URL).is_ok());
    }

    #[test]
    fn test_classify_failure() {
        let repo = DEFAULT_REPOSITORY_URL;
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, "", "a.whl", repo),
            ReleaseError::Publish(PublishError::AuthenticationFailed { status: 403, .. })
        ));
        assert!(matches!(
            classify_failure(
                StatusCode::BAD_REQUEST,
                "400 File already exists. See https://pypi.org/help/#file-name-reuse",
                "a.whl",
                repo
            ),
            ReleaseError::Publish(PublishError::AlreadyPublished { .. })
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "400 Invalid classifier", "a.whl", repo),
            ReleaseError::Publish(PublishError::UploadRejected { status: 400, .. })
        ));
    }
}
