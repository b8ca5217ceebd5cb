// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::api::routes::canonical;
use crate::api::AppState;
use crate::error::{ApiError, Required};
use crate::models::upload::UploadRecord;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    /// Base64, optionally as a `data:` URL
    pub data: Option<String>,
    pub user_address: Option<String>,
}

struct IncomingFile {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
    uploader: Option<String>,
}

/// Store an image or video, content-addressed by its sha256
pub async fn upload(State(state): State<AppState>, request: Request) -> Result<Json<Value>, ApiError> {
    let store = state.store()?.clone();
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let file = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let Json(body) = Json::<UploadBody>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_json(body)?
    };

    let max_bytes = state.config.server.upload_max_bytes;
    if !is_media(&file.content_type) {
        return Err(ApiError::BadRequest(format!(
            "Unsupported content type {:?}; only images and videos are accepted",
            file.content_type
        )));
    }
    if file.bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty file".to_string()));
    }
    if file.bytes.len() > max_bytes {
        return Err(ApiError::BadRequest(format!("File exceeds {} bytes", max_bytes)));
    }

    let hash = hex::encode(Sha256::digest(&file.bytes));
    let stored_name = format!("{}.{}", hash, extension(&file.file_name, &file.content_type));
    let dir = &state.config.server.upload_dir;
    let path = dir.join(&stored_name);

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating upload directory {}", dir.display()))?;
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        debug!("Upload {} already stored", stored_name);
    } else {
        tokio::fs::write(&path, &file.bytes)
            .await
            .with_context(|| format!("writing upload {}", path.display()))?;
        info!("Stored upload {} ({} bytes)", stored_name, file.bytes.len());
    }

    let uploader = file.uploader.filter(|u| !u.is_empty()).map(|u| canonical(&u)).transpose()?;
    let record = store
        .record_upload(UploadRecord {
            hash: hash.clone(),
            file_name: file.file_name,
            content_type: file.content_type,
            size_bytes: file.bytes.len() as i64,
            uploader,
            created_at: Utc::now(),
        })
        .await?;

    let base = state.config.server.public_base_url.trim_end_matches('/');
    Ok(Json(json!({
        "url": format!("{}/uploads/{}", base, stored_name),
        "hash": record.hash,
        "size": record.size_bytes,
        "contentType": record.content_type,
    })))
}

async fn read_multipart(mut multipart: Multipart) -> Result<IncomingFile, ApiError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut uploader = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("userAddress") => {
                uploader = Some(field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))?);
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) = file.ok_or(ApiError::MissingFields(vec!["file"]))?;
    Ok(IncomingFile {
        file_name,
        content_type,
        bytes,
        uploader,
    })
}

fn read_json(body: UploadBody) -> Result<IncomingFile, ApiError> {
    let mut required = Required::new();
    let data = required.take("data", body.data);
    required.finish()?;

    // data:image/png;base64,....
    let (declared, encoded) = match data.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((header, encoded)) => (header.split(';').next().map(str::to_string), encoded.to_string()),
        None => (None, data),
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 data: {}", e)))?;

    Ok(IncomingFile {
        file_name: body.file_name.unwrap_or_else(|| "upload".to_string()),
        content_type: body
            .content_type
            .or(declared)
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        bytes,
        uploader: body.user_address,
    })
}

fn is_media(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.starts_with("image/") || content_type.starts_with("video/")
}

/// File extension for the stored copy: the uploaded name's when it is sane, otherwise
/// the content subtype
fn extension(file_name: &str, content_type: &str) -> String {
    let from_name = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    from_name.unwrap_or_else(|| {
        content_type
            .split('/')
            .nth(1)
            .map(|sub| sub.split(['+', ';']).next().unwrap_or(sub).to_ascii_lowercase())
            .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string())
    })
}
