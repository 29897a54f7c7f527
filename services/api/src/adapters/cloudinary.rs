//! services/api/src/adapters/cloudinary.rs
//!
//! This module contains the adapter for the Cloudinary image host.
//! It implements the `ImageStorageService` port from the `core` crate using
//! signed upload and destroy requests.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use wanderlust_core::domain::{ImageRef, ImageUpload};
use wanderlust_core::ports::{ImageStorageService, PortError, PortResult};
use wanderlust_core::validation::validate_image_filename;

use crate::config::CloudinaryConfig;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ImageStorageService` port using Cloudinary.
#[derive(Clone)]
pub struct CloudinaryImageStore {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryImageStore {
    /// Creates a new `CloudinaryImageStore`.
    pub fn new(client: Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.config.cloud_name, action
        )
    }

    /// Cloudinary signs the alphabetically sorted `key=value` pairs followed by the secret.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha1::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

//=========================================================================================
// `ImageStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageStorageService for CloudinaryImageStore {
    async fn store_image(&self, upload: ImageUpload) -> PortResult<ImageRef> {
        validate_image_filename(&upload.filename)
            .map_err(|e| PortError::Unexpected(format!("{}: {}", upload.filename, e)))?;

        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("folder", self.config.folder.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let mut file = multipart::Part::bytes(upload.data.to_vec()).file_name(upload.filename);
        if let Some(content_type) = upload.content_type {
            file = file
                .mime_str(&content_type)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let form = multipart::Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .error_for_status()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(ImageRef {
            url: body.secure_url,
            filename: body.public_id,
        })
    }

    async fn remove_image(&self, image: &ImageRef) -> PortResult<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", image.filename.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);
        let params = [
            ("public_id", image.filename.clone()),
            ("timestamp", timestamp),
            ("api_key", self.config.api_key.clone()),
            ("signature", signature),
        ];

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .error_for_status()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(PortError::Unexpected(format!(
                "Cloudinary refused to destroy {}: {}",
                image.filename, other
            ))),
        }
    }
}
