// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # S3 Object Store
//!
//! Production object store with per-tenant bucket isolation
//! (`{prefix}-{tenant_id}`). On first use the bucket is provisioned:
//! created if missing, versioning enabled for immutability, default
//! encryption set to SSE-KMS (when a key is configured) or SSE-S3, and
//! public access blocked. Uploads at or under 5 MiB use a single PUT;
//! larger payloads go through multipart upload in 8 MiB parts with an
//! explicit abort on any part failure. Transient failures retry with
//! exponential backoff.
//!
//! Object user-metadata keys are lowercase-hyphen (`tenant-id`,
//! `document-id`, `object-type`, ...); the conversion from the domain's
//! generic string map happens here at the boundary.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CompletedMultipartUpload, CompletedPart,
    CreateBucketConfiguration, PublicAccessBlockConfiguration, ServerSideEncryption,
    ServerSideEncryptionByDefault, ServerSideEncryptionConfiguration, ServerSideEncryptionRule,
    StorageClass, VersioningConfiguration,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use evidence_domain::entities::custody_event::actions;
use evidence_domain::{CustodyEvent, EvidenceDocument, EvidenceError, ObjectStore};

use crate::infrastructure::config::StorageTargetConfig;
use crate::infrastructure::retry::{retry_async, RetryPolicy};

/// Single-PUT ceiling; anything larger goes multipart.
pub(crate) const MULTIPART_THRESHOLD: usize = 5 * 1024 * 1024;
/// Part size for multipart uploads.
pub(crate) const MULTIPART_CHUNK_SIZE: usize = 8 * 1024 * 1024;

const SUBJECT_METADATA_LIMIT: usize = 200;

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    tenant_id: String,
    region: String,
    kms_key_id: Option<String>,
    storage_class: StorageClass,
}

impl S3ObjectStore {
    /// Connects and provisions the tenant bucket.
    ///
    /// Required params: `tenant_id`, `bucket_prefix`. Optional: `region`
    /// (default `us-east-1`), `kms_key_id`, `endpoint_url` (for local
    /// S3-compatible stores), `storage_class`, `enable_versioning`.
    pub async fn new(config: &StorageTargetConfig) -> Result<Self, EvidenceError> {
        let tenant_id = config.require_str("tenant_id")?.to_string();
        let bucket_prefix = config.require_str("bucket_prefix")?.to_string();
        let region = config.param_str("region").unwrap_or("us-east-1").to_string();
        let kms_key_id = config.param_str("kms_key_id").map(String::from);
        let storage_class =
            StorageClass::from(config.param_str("storage_class").unwrap_or("STANDARD"));
        let enable_versioning = config.param_bool("enable_versioning", true);

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()));
        if let Some(endpoint) = config.param_str("endpoint_url") {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;
        let client = aws_sdk_s3::Client::new(&shared_config);

        let bucket = format!("{bucket_prefix}-{tenant_id}");
        let store = Self {
            client,
            bucket,
            tenant_id,
            region,
            kms_key_id,
            storage_class,
        };
        store.ensure_bucket_configured(enable_versioning).await?;

        info!(
            "initialized S3 object store for tenant={} bucket={} region={}",
            store.tenant_id, store.bucket, store.region
        );
        Ok(store)
    }

    async fn ensure_bucket_configured(&self, enable_versioning: bool) -> Result<(), EvidenceError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => debug!("bucket {} already exists", self.bucket),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    self.create_bucket().await?;
                } else {
                    return Err(EvidenceError::storage(format!(
                        "head_bucket {}: {err}",
                        self.bucket
                    )));
                }
            }
        }

        if enable_versioning {
            self.enable_versioning().await?;
        }
        Ok(())
    }

    async fn create_bucket(&self) -> Result<(), EvidenceError> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        // us-east-1 rejects an explicit location constraint.
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| EvidenceError::storage(format!("create_bucket {}: {e}", self.bucket)))?;
        info!("created S3 bucket {}", self.bucket);

        self.enable_encryption().await;
        self.block_public_access().await;
        Ok(())
    }

    /// Default-encryption and public-access settings are best-effort: a
    /// restricted IAM policy should not fail ingestion.
    async fn enable_encryption(&self) {
        let default_encryption = match &self.kms_key_id {
            Some(kms_key_id) => ServerSideEncryptionByDefault::builder()
                .sse_algorithm(ServerSideEncryption::AwsKms)
                .kms_master_key_id(kms_key_id)
                .build(),
            None => ServerSideEncryptionByDefault::builder()
                .sse_algorithm(ServerSideEncryption::Aes256)
                .build(),
        };
        let default_encryption = match default_encryption {
            Ok(value) => value,
            Err(err) => {
                warn!("encryption config for {}: {err}", self.bucket);
                return;
            }
        };

        let rule = ServerSideEncryptionRule::builder()
            .apply_server_side_encryption_by_default(default_encryption)
            .bucket_key_enabled(true)
            .build();
        let configuration = match ServerSideEncryptionConfiguration::builder().rules(rule).build() {
            Ok(value) => value,
            Err(err) => {
                warn!("encryption config for {}: {err}", self.bucket);
                return;
            }
        };

        match self
            .client
            .put_bucket_encryption()
            .bucket(&self.bucket)
            .server_side_encryption_configuration(configuration)
            .send()
            .await
        {
            Ok(_) => info!("enabled default encryption for bucket {}", self.bucket),
            Err(err) => warn!("failed to enable encryption on {}: {err}", self.bucket),
        }
    }

    async fn block_public_access(&self) {
        let configuration = PublicAccessBlockConfiguration::builder()
            .block_public_acls(true)
            .ignore_public_acls(true)
            .block_public_policy(true)
            .restrict_public_buckets(true)
            .build();
        match self
            .client
            .put_public_access_block()
            .bucket(&self.bucket)
            .public_access_block_configuration(configuration)
            .send()
            .await
        {
            Ok(_) => info!("blocked public access for bucket {}", self.bucket),
            Err(err) => warn!("failed to block public access on {}: {err}", self.bucket),
        }
    }

    async fn enable_versioning(&self) -> Result<(), EvidenceError> {
        self.client
            .put_bucket_versioning()
            .bucket(&self.bucket)
            .versioning_configuration(
                VersioningConfiguration::builder()
                    .status(BucketVersioningStatus::Enabled)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                EvidenceError::storage(format!("enable versioning on {}: {e}", self.bucket))
            })?;
        debug!("versioning enabled for bucket {}", self.bucket);
        Ok(())
    }

    async fn upload_object(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), EvidenceError> {
        retry_async(RetryPolicy::default(), "s3 upload", || async {
            if content.len() > MULTIPART_THRESHOLD {
                self.multipart_upload(key, content, content_type, metadata.clone())
                    .await
            } else {
                self.simple_upload(key, content, content_type, metadata.clone())
                    .await
            }
        })
        .await
    }

    async fn simple_upload(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), EvidenceError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content.to_vec()))
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .storage_class(self.storage_class.clone());

        if let Some(kms_key_id) = &self.kms_key_id {
            request = request
                .server_side_encryption(ServerSideEncryption::AwsKms)
                .ssekms_key_id(kms_key_id);
        }

        request
            .send()
            .await
            .map_err(|e| EvidenceError::storage(format!("put_object {key}: {e}")))?;
        debug!("uploaded {key} ({} bytes)", content.len());
        Ok(())
    }

    async fn multipart_upload(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), EvidenceError> {
        let mut request = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .storage_class(self.storage_class.clone());
        if let Some(kms_key_id) = &self.kms_key_id {
            request = request
                .server_side_encryption(ServerSideEncryption::AwsKms)
                .ssekms_key_id(kms_key_id);
        }

        let created = request
            .send()
            .await
            .map_err(|e| EvidenceError::storage(format!("create_multipart_upload {key}: {e}")))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| EvidenceError::storage("multipart upload id missing"))?
            .to_string();

        match self.upload_parts(key, &upload_id, content).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder().set_parts(Some(parts)).build(),
                    )
                    .send()
                    .await
                    .map_err(|e| {
                        EvidenceError::storage(format!("complete_multipart_upload {key}: {e}"))
                    })?;
                debug!(
                    "completed multipart upload for {key} ({} bytes)",
                    content.len()
                );
                Ok(())
            }
            Err(err) => {
                // Leave no dangling parts behind.
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!("abort_multipart_upload {key}: {abort_err}");
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        content: &[u8],
    ) -> Result<Vec<CompletedPart>, EvidenceError> {
        let mut parts = Vec::new();
        for (index, chunk) in content.chunks(MULTIPART_CHUNK_SIZE).enumerate() {
            let part_number = (index + 1) as i32;
            let response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| {
                    EvidenceError::storage(format!("upload_part {part_number} of {key}: {e}"))
                })?;
            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(response.e_tag().map(String::from))
                    .build(),
            );
        }
        Ok(parts)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn persist(&self, document: &mut EvidenceDocument) -> Result<(), EvidenceError> {
        let base_key = format!(
            "{}/{}/{}",
            document.source(),
            document.matter_id(),
            document.document_id()
        );

        if let Some(body) = document.body_text() {
            self.upload_object(
                &format!("{base_key}/body.txt"),
                body.as_bytes(),
                "text/plain",
                object_metadata(&self.tenant_id, document, "body", None),
            )
            .await?;
        }

        let metadata_json = document.to_canonical_json()?;
        self.upload_object(
            &format!("{base_key}/metadata.json"),
            metadata_json.as_bytes(),
            "application/json",
            object_metadata(&self.tenant_id, document, "metadata", None),
        )
        .await?;

        for attachment in document.attachments() {
            self.upload_object(
                &format!("{base_key}/attachments/{}", attachment.filename()),
                attachment.payload(),
                attachment.content_type().unwrap_or("application/octet-stream"),
                object_metadata(
                    &self.tenant_id,
                    document,
                    "attachment",
                    Some(attachment.filename()),
                ),
            )
            .await?;
        }

        let custody_json = document.custody_chain_json()?;
        self.upload_object(
            &format!("{base_key}/custody_chain.json"),
            custody_json.as_bytes(),
            "application/json",
            object_metadata(&self.tenant_id, document, "custody_chain", None),
        )
        .await?;

        document.record_custody_event(
            CustodyEvent::now("s3_object_store", actions::PERSISTED)
                .with_metadata("bucket", self.bucket.clone())
                .with_metadata("location", format!("s3://{}/{base_key}", self.bucket))
                .with_metadata("region", self.region.clone()),
        );
        document.set_raw_path(format!("s3://{}/{base_key}", self.bucket));

        info!("persisted document {} to s3://{}/{base_key}", document.document_id(), self.bucket);
        Ok(())
    }
}

/// Object user-metadata: lowercase-hyphen keys, string values, subject
/// truncated to stay inside S3's header budget.
pub(crate) fn object_metadata(
    tenant_id: &str,
    document: &EvidenceDocument,
    object_type: &str,
    filename: Option<&str>,
) -> HashMap<String, String> {
    let mut metadata = HashMap::from([
        ("tenant-id".to_string(), tenant_id.to_string()),
        ("document-id".to_string(), document.document_id().to_string()),
        ("source".to_string(), document.source().to_string()),
        ("object-type".to_string(), object_type.to_string()),
        ("collected-at".to_string(), document.collected_at_rfc3339()),
        (
            "custodian-id".to_string(),
            document.custodian().identifier().to_string(),
        ),
    ]);

    if let Some(email) = document.custodian().email() {
        metadata.insert("custodian-email".to_string(), email.to_string());
    }
    if let Some(subject) = document.subject() {
        let truncated: String = subject.chars().take(SUBJECT_METADATA_LIMIT).collect();
        metadata.insert("subject".to_string(), truncated);
    }
    if let Some(filename) = filename {
        metadata.insert("filename".to_string(), filename.to_string());
    }
    if object_type == "body" {
        if let Some(body) = document.body_text() {
            metadata.insert(
                "content-sha256".to_string(),
                hex::encode(Sha256::digest(body.as_bytes())),
            );
        }
    }
    metadata
}
