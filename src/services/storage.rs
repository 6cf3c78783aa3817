use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};

use crate::{config::AppConfig, error::AppError};

/// Which receipt a payment row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    Receipt,
    Ar,
}

impl ReceiptKind {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "receipt" => Ok(Self::Receipt),
            "ar" | "ar-receipt" | "ar_receipt" => Ok(Self::Ar),
            _ => Err(AppError::BadRequest(format!(
                "Unknown receipt kind '{raw}'. Use 'receipt' or 'ar'."
            ))),
        }
    }

    pub fn path_column(self) -> &'static str {
        match self {
            Self::Receipt => "receipt_path",
            Self::Ar => "ar_receipt_path",
        }
    }
}

pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Receipt images in Supabase Storage, spoken to over its S3 endpoint.
#[derive(Clone)]
pub struct ReceiptStorage {
    client: Client,
    receipt_bucket: String,
    ar_receipt_bucket: String,
}

impl ReceiptStorage {
    pub async fn from_config(config: &AppConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.storage_s3_region.clone()));

        if let Some(endpoint) = config.storage_s3_endpoint.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (
            config.storage_s3_access_key_id.as_deref(),
            config.storage_s3_secret_access_key.as_deref(),
        ) {
            let credentials = Credentials::new(access_key, secret_key, None, None, "supabase");
            loader = loader.credentials_provider(credentials);
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            receipt_bucket: config.receipt_bucket.clone(),
            ar_receipt_bucket: config.ar_receipt_bucket.clone(),
        }
    }

    pub fn bucket(&self, kind: ReceiptKind) -> &str {
        match kind {
            ReceiptKind::Receipt => &self.receipt_bucket,
            ReceiptKind::Ar => &self.ar_receipt_bucket,
        }
    }

    /// Writes `bytes` at `key`, replacing any existing object.
    pub async fn put(
        &self,
        kind: ReceiptKind,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        let bucket = self.bucket(kind);
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|error| {
                tracing::error!(bucket, key, error = %error, "Receipt upload failed");
                AppError::Dependency("Could not upload the receipt.".to_string())
            })?;
        Ok(())
    }

    pub async fn get(&self, kind: ReceiptKind, key: &str) -> Result<StoredObject, AppError> {
        let bucket = self.bucket(kind);
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| {
                let service_error = error.into_service_error();
                if service_error.is_no_such_key() {
                    return AppError::NotFound("Receipt file not found.".to_string());
                }
                tracing::error!(bucket, key, error = %service_error, "Receipt download failed");
                AppError::Dependency("Could not download the receipt.".to_string())
            })?;

        let content_type = output
            .content_type()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| content_type_for(key).to_string());
        let bytes = output.body.collect().await.map_err(|error| {
            tracing::error!(bucket, key, error = %error, "Receipt body read failed");
            AppError::Dependency("Could not download the receipt.".to_string())
        })?;

        Ok(StoredObject {
            bytes: bytes.into_bytes().to_vec(),
            content_type,
        })
    }
}

/// Extension of an uploaded file name, without the dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (stem, extension) = base.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

fn with_extension(stem: String, extension: Option<&str>) -> String {
    match extension {
        Some(extension) => format!("{stem}.{extension}"),
        None => stem,
    }
}

/// Object key for a receipt sent with a new payment submission.
pub fn submission_key(project: &str, name: &str, extension: Option<&str>, unix_ms: i64) -> String {
    with_extension(format!("{project}/{name}/{name}_{unix_ms}"), extension)
}

/// Object key for a receipt attached to an existing payment.
pub fn attachment_key(
    project: &str,
    name: &str,
    kind: ReceiptKind,
    extension: Option<&str>,
    unix_ms: i64,
) -> String {
    let file_stem = underscore_whitespace(name);
    let marker = match kind {
        ReceiptKind::Receipt => "",
        ReceiptKind::Ar => "AR_",
    };
    with_extension(
        format!("{project}/{name}/{file_stem}_{marker}{unix_ms}"),
        extension,
    )
}

/// Each run of whitespace becomes a single `_`, edges included.
fn underscore_whitespace(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    let mut in_run = false;
    for character in name.chars() {
        if character.is_whitespace() {
            if !in_run {
                stem.push('_');
            }
            in_run = true;
        } else {
            stem.push(character);
            in_run = false;
        }
    }
    stem
}

pub fn content_type_for(key: &str) -> &'static str {
    match extension_of(key).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
