use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_sdk_s3::primitives::DateTimeFormat;
use tracing::debug;

use super::{
    BackendConfig, BucketInfo, ListOptions, ObjectEntry, ObjectListing, SortBy, StorageBackend,
    StorageError,
};

/// Storage backend for S3 and S3-compatible services.
pub struct S3Backend {
    client: Client,
    provider: String,
    url_style: UrlStyle,
}

/// How public object URLs are rendered for this deployment.
#[derive(Debug, Clone)]
enum UrlStyle {
    /// `{base}/{bucket}/{file}` under an explicit public base URL
    Base(String),
    /// Path-style under the configured endpoint
    Endpoint(String),
    /// AWS virtual-hosted style
    VirtualHosted { region: String },
}

impl UrlStyle {
    fn render(&self, bucket: &str, file: &str) -> String {
        match self {
            UrlStyle::Base(base) => format!("{base}/{bucket}/{file}"),
            UrlStyle::Endpoint(endpoint) => format!("{endpoint}/{bucket}/{file}"),
            UrlStyle::VirtualHosted { region } => {
                format!("https://{bucket}.s3.{region}.amazonaws.com/{file}")
            }
        }
    }
}

impl S3Backend {
    /// Build a backend from configuration using the AWS default chain.
    pub async fn connect(config: BackendConfig) -> Result<Self, StorageError> {
        let BackendConfig {
            endpoint_url,
            region,
            force_path_style,
            anonymous,
            public_base_url,
            provider_name,
        } = config;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if anonymous {
            loader = loader.no_credentials();
        }
        if let Some(region) = &region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let base_config = loader.load().await;

        let region = region
            .or_else(|| base_config.region().map(|r| r.as_ref().to_string()))
            .unwrap_or_else(|| "us-east-1".to_string());

        let mut builder = aws_sdk_s3::config::Builder::from(&base_config);
        if let Some(endpoint) = &endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        if force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        let url_style = match (public_base_url, endpoint_url) {
            (Some(base), _) => UrlStyle::Base(trim_base(&base)),
            (None, Some(endpoint)) => UrlStyle::Endpoint(trim_base(&endpoint)),
            (None, None) => UrlStyle::VirtualHosted { region },
        };

        Ok(S3Backend {
            client,
            provider: provider_name.unwrap_or_else(|| "s3".to_string()),
            url_style,
        })
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StorageError> {
        let resp = self.client.list_buckets().send().await.map_err(|err| {
            StorageError::Unavailable(format!("listing buckets: {}", DisplayErrorContext(err)))
        })?;

        let buckets = resp
            .buckets()
            .iter()
            .map(|b| BucketInfo {
                name: b.name().unwrap_or_default().to_string(),
                created_at: b
                    .creation_date()
                    .and_then(|d| d.fmt(DateTimeFormat::DateTime).ok()),
            })
            .filter(|b| !b.name.is_empty())
            .collect();

        Ok(buckets)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        folder: &str,
        options: ListOptions,
    ) -> Result<ObjectListing, StorageError> {
        let prefix = folder_prefix(folder);

        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .delimiter("/")
            .max_keys(options.limit.min(1000) as i32);
        if !prefix.is_empty() {
            request = request.prefix(prefix.clone());
        }

        let resp = request
            .send()
            .await
            .map_err(|err| classify_list(err, bucket))?;

        let mut prefixes: Vec<String> = resp
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .filter_map(|p| p.strip_prefix(prefix.as_str()))
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        let mut objects: Vec<ObjectEntry> = resp
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key().unwrap_or_default();
                let name = key.strip_prefix(prefix.as_str())?;
                if name.is_empty() {
                    // The folder marker object itself
                    return None;
                }
                Some(ObjectEntry {
                    name: name.to_string(),
                    size: obj.size().unwrap_or(0) as u64,
                    last_modified: obj
                        .last_modified()
                        .and_then(|d| d.fmt(DateTimeFormat::DateTime).ok()),
                    // S3 listings carry no content types
                    content_type: None,
                })
            })
            .collect();

        if options.sort == SortBy::NameDesc {
            prefixes.reverse();
            objects.reverse();
        }

        debug!(
            bucket,
            folder,
            objects = objects.len(),
            prefixes = prefixes.len(),
            "listed folder"
        );

        Ok(ObjectListing { prefixes, objects })
    }

    fn object_url(&self, bucket: &str, file: &str) -> String {
        self.url_style.render(bucket, file)
    }

    async fn public_url(&self, bucket: &str, file: &str) -> Result<String, StorageError> {
        if bucket.is_empty() || file.is_empty() {
            return Err(StorageError::Malformed(format!(
                "refusing to build a URL for '{bucket}/{file}'"
            )));
        }

        self.client
            .head_object()
            .bucket(bucket)
            .key(file)
            .send()
            .await
            .map_err(|err| classify_head(err, bucket, file))?;

        Ok(self.object_url(bucket, file))
    }
}

/// Normalize a folder path into an S3 prefix ending in `/` (or empty).
fn folder_prefix(folder: &str) -> String {
    let trimmed = folder.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Listing failures that mean the name cannot be a bucket become
/// `NotFound` so callers skip the component and keep probing; everything
/// else is an outage.
fn classify_list(err: SdkError<ListObjectsV2Error>, bucket: &str) -> StorageError {
    if let Some(service) = err.as_service_error() {
        // Path components are probed as bucket names verbatim, and
        // stores answer a syntactically invalid name with an unmodeled
        // 400 instead of NoSuchBucket.
        if service.is_no_such_bucket() || service.code() == Some("InvalidBucketName") {
            return StorageError::NotFound(format!("bucket '{bucket}'"));
        }
    } else if matches!(err, SdkError::ConstructionFailure(_)) {
        // The SDK rejects some names before any request is sent.
        return StorageError::NotFound(format!("bucket '{bucket}'"));
    }
    StorageError::Unavailable(format!(
        "listing bucket '{bucket}': {}",
        DisplayErrorContext(err)
    ))
}

fn classify_head(err: SdkError<HeadObjectError>, bucket: &str, file: &str) -> StorageError {
    if let Some(service) = err.as_service_error() {
        if service.is_not_found() {
            return StorageError::NotFound(format!("object '{bucket}/{file}'"));
        }
    }
    StorageError::Unavailable(format!(
        "resolving '{bucket}/{file}': {}",
        DisplayErrorContext(err)
    ))
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::types::error::{NoSuchBucket, NotFound};
    use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;

    fn http_response(status: u16) -> HttpResponse {
        HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty())
    }

    #[test]
    fn test_public_base_url_style() {
        let style = UrlStyle::Base("https://proj.example.co/storage/v1/object/public".to_string());
        assert_eq!(
            style.render("covers", "art/front.png"),
            "https://proj.example.co/storage/v1/object/public/covers/art/front.png"
        );
    }

    #[test]
    fn test_endpoint_path_style() {
        let style = UrlStyle::Endpoint("http://localhost:4566".to_string());
        assert_eq!(
            style.render("docs", "guide.pdf"),
            "http://localhost:4566/docs/guide.pdf"
        );
    }

    #[test]
    fn test_virtual_hosted_style() {
        let style = UrlStyle::VirtualHosted {
            region: "eu-west-1".to_string(),
        };
        assert_eq!(
            style.render("docs", "guide.pdf"),
            "https://docs.s3.eu-west-1.amazonaws.com/guide.pdf"
        );
    }

    #[test]
    fn test_folder_prefix_normalization() {
        assert_eq!(folder_prefix(""), "");
        assert_eq!(folder_prefix("/"), "");
        assert_eq!(folder_prefix("archive"), "archive/");
        assert_eq!(folder_prefix("/archive/2020/"), "archive/2020/");
    }

    #[test]
    fn test_trim_base_strips_trailing_slashes() {
        assert_eq!(trim_base("https://cdn.example/"), "https://cdn.example");
        assert_eq!(trim_base("https://cdn.example"), "https://cdn.example");
    }

    #[test]
    fn test_classify_list_no_such_bucket() {
        let err = SdkError::service_error(
            ListObjectsV2Error::NoSuchBucket(NoSuchBucket::builder().build()),
            http_response(404),
        );
        assert!(matches!(
            classify_list(err, "missing"),
            StorageError::NotFound(_)
        ));
    }

    #[test]
    fn test_classify_list_invalid_bucket_name() {
        // A component like "Reading List" probed as a bucket draws a 400
        // the model has no variant for. It must read as a miss, not an
        // outage, or the search would abort instead of moving on.
        let err = SdkError::service_error(
            ListObjectsV2Error::generic(
                ErrorMetadata::builder()
                    .code("InvalidBucketName")
                    .message("The specified bucket is not valid.")
                    .build(),
            ),
            http_response(400),
        );
        assert!(matches!(
            classify_list(err, "Reading List"),
            StorageError::NotFound(_)
        ));
    }

    #[test]
    fn test_classify_list_rejected_name() {
        // Some names never leave the client; the SDK refuses to build
        // the request.
        let err: SdkError<ListObjectsV2Error> =
            SdkError::construction_failure("bucket name failed validation");
        assert!(matches!(
            classify_list(err, "shelf mark"),
            StorageError::NotFound(_)
        ));
    }

    #[test]
    fn test_classify_list_other_failures_are_outages() {
        let err = SdkError::service_error(
            ListObjectsV2Error::generic(
                ErrorMetadata::builder()
                    .code("SlowDown")
                    .message("Please reduce your request rate.")
                    .build(),
            ),
            http_response(503),
        );
        assert!(matches!(
            classify_list(err, "docs"),
            StorageError::Unavailable(_)
        ));

        let err: SdkError<ListObjectsV2Error> = SdkError::timeout_error("request timed out");
        assert!(matches!(
            classify_list(err, "docs"),
            StorageError::Unavailable(_)
        ));
    }

    #[test]
    fn test_classify_head_missing_object() {
        let err = SdkError::service_error(
            HeadObjectError::NotFound(NotFound::builder().build()),
            http_response(404),
        );
        assert!(matches!(
            classify_head(err, "docs", "guide.pdf"),
            StorageError::NotFound(_)
        ));
    }
}
