//! S3-compatible [`ObjectStore`] implementation.
//!
//! Works against AWS S3 proper or any S3-compatible endpoint (set
//! `AWS_ENDPOINT_URL`). Credentials come from the resolved
//! [`sitesync_config`] chain, not from the SDK's own provider chain, so
//! that the CLI's resolution order is authoritative.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::{Credentials as SdkCredentials, StalledStreamProtectionConfig};
use aws_sdk_s3::types::ObjectCannedAcl;
use sitesync_config::Credentials;
use sitesync_models::{AclPolicy, ObjectHeaders, RemoteMetadata};

use crate::{FINGERPRINT_METADATA_KEY, ObjectStore, StoreError};

/// Region used when `AWS_REGION` is not set. S3-compatible endpoints
/// generally accept any region string.
const DEFAULT_REGION: &str = "us-east-1";

/// [`ObjectStore`] backed by an S3-compatible bucket.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Creates a client for `bucket` with explicit credentials.
    ///
    /// Honors `AWS_REGION` and `AWS_ENDPOINT_URL` from the environment;
    /// path-style addressing is forced when a custom endpoint is set
    /// (R2, MinIO, and friends expect it).
    #[must_use]
    pub fn connect(bucket: &str, credentials: &Credentials) -> Self {
        let creds = SdkCredentials::new(&credentials.key, &credentials.secret, None, None, "sitesync");

        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
        let endpoint = std::env::var("AWS_ENDPOINT_URL").ok();

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(region))
            .credentials_provider(creds)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled());

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
        }
    }

    /// The bucket this store targets.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Maps the config-level ACL onto the SDK's canned ACL type.
const fn canned_acl(acl: AclPolicy) -> ObjectCannedAcl {
    match acl {
        AclPolicy::Private => ObjectCannedAcl::Private,
        AclPolicy::PublicRead => ObjectCannedAcl::PublicRead,
        AclPolicy::PublicReadWrite => ObjectCannedAcl::PublicReadWrite,
        AclPolicy::AuthenticatedRead => ObjectCannedAcl::AuthenticatedRead,
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head(&self, key: &str) -> Result<Option<RemoteMetadata>, StoreError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let fingerprint = output
                    .metadata()
                    .and_then(|m| m.get(FINGERPRINT_METADATA_KEY))
                    .cloned();
                #[allow(clippy::cast_sign_loss)] // S3 content-length is non-negative
                let size = output.content_length().map(|len| len as u64);
                Ok(Some(RemoteMetadata { fingerprint, size }))
            }
            Err(err) => {
                // NotFound is not an error — it means the object doesn't exist
                let service_err = err.as_service_error();
                if service_err
                    .is_some_and(aws_sdk_s3::operation::head_object::HeadObjectError::is_not_found)
                {
                    return Ok(None);
                }
                Err(StoreError::Head {
                    bucket: self.bucket.clone(),
                    key: key.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        log::debug!("Listing s3://{}/{prefix}*", self.bucket);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| StoreError::List {
                bucket: self.bucket.clone(),
                prefix: prefix.to_string(),
                source: Box::new(e),
            })?;

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    keys.push(key.to_string());
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        log::debug!("  found {} objects", keys.len());
        Ok(keys)
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        headers: &ObjectHeaders,
        fingerprint: &str,
        acl: AclPolicy,
    ) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .metadata(FINGERPRINT_METADATA_KEY, fingerprint)
            .acl(canned_acl(acl));

        if let Some(content_type) = &headers.content_type {
            request = request.content_type(content_type);
        }
        if let Some(content_encoding) = &headers.content_encoding {
            request = request.content_encoding(content_encoding);
        }
        if let Some(cache_control) = &headers.cache_control {
            request = request.cache_control(cache_control);
        }

        request.send().await.map_err(|e| StoreError::Upload {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Delete {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source: Box::new(e),
            })?;

        Ok(())
    }

    async fn verify_access(&self) -> Result<(), StoreError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|_| StoreError::BucketAccess {
                bucket: self.bucket.clone(),
            })?;

        Ok(())
    }
}
