//! Fixed literals for the static site stack.
//!
//! Cache durations, key prefixes, and retention counts are deliberately not
//! configurable. The asset source path is the only override point
//! (see [`crate::config::StackConfig`]).

/// Conventional build output directory of the web front-end.
pub const DEFAULT_ASSET_PATH: &str = "../web/dist";

/// Key prefix under which every deployment job uploads into the bucket.
pub const DESTINATION_KEY_PREFIX: &str = "www/static";

/// Entry files that get the short cache lifetime and are invalidated on deploy.
///
/// This is a literal list, not a pattern. New top-level HTML entry points
/// receive the long-cache treatment until they are added here.
pub const SHORT_CACHE_PATHS: &[&str] = &["/index.html"];

/// Short cache lifetime for entry files.
pub const FIVE_MINUTES_IN_SECONDS: u64 = 5 * 60;

/// Long cache lifetime for every other asset.
pub const ONE_WEEK_IN_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Superseded object versions kept per key.
pub const NONCURRENT_VERSIONS_TO_RETAIN: u32 = 3;

/// Days after which a noncurrent object version expires.
pub const NONCURRENT_VERSION_EXPIRATION_DAYS: u32 = 360;

/// Object served for requests to the distribution root.
pub const DEFAULT_ROOT_OBJECT: &str = "index.html";

/// Managed `SECURITY_HEADERS` response headers policy.
pub const SECURITY_HEADERS_POLICY_ID: &str = "67f7725c-6f97-4210-82d7-5512b31e9d03";

/// Managed `CachingOptimized` cache policy.
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

/// Stack name used by the CLI when none is given.
pub const DEFAULT_STACK_NAME: &str = "InfraStack";

/// Directory `synth --out` writes to when no path is given.
pub const DEFAULT_OUTPUT_DIR: &str = "stack.out";

/// Template format version emitted in every template.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// IAM policy language version.
pub const POLICY_DOCUMENT_VERSION: &str = "2012-10-17";

/// Bootstrap bucket holding published file assets, as an `Fn::Sub` string.
pub const ASSETS_BUCKET_NAME: &str = "cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}";

/// Object key of the published bucket deployment handler bundle.
pub const DEPLOYMENT_HANDLER_CODE_KEY: &str = "bucket-deployment-handler.zip";

/// Runtime of the bucket deployment handler.
pub const DEPLOYMENT_HANDLER_RUNTIME: &str = "python3.11";

/// Entry point of the bucket deployment handler.
pub const DEPLOYMENT_HANDLER_ENTRY: &str = "index.handler";

/// Timeout of the bucket deployment handler.
pub const DEPLOYMENT_HANDLER_TIMEOUT_SECONDS: u64 = 900;

/// Packaging of directory assets once published.
pub const ASSET_PACKAGING: &str = "zip";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Length of the hash suffix appended to multi-component logical ids.
pub const LOGICAL_ID_HASH_LENGTH: usize = 8;

/// Application name used in CLI output and generated files.
pub const APP_NAME: &str = "staticstack";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "staticstack";
