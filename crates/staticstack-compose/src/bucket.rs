//! Object storage bucket spec.
//!
//! The bucket is private: public access is blocked unconditionally and the
//! distribution reads through an origin access control binding, expressed
//! as a service-principal bucket policy scoped to the distribution ARN.

use serde_json::{Value, json};
use staticstack_common::constants::{
    NONCURRENT_VERSION_EXPIRATION_DAYS, NONCURRENT_VERSIONS_TO_RETAIN, POLICY_DOCUMENT_VERSION,
};
use staticstack_common::types::LogicalId;

use crate::template::{self, RemovalPolicy, Resource, pseudo, resource_type};

/// Service principal the distribution reads the bucket as.
pub const CLOUDFRONT_SERVICE_PRINCIPAL: &str = "cloudfront.amazonaws.com";

/// Retention rule for superseded object versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoncurrentVersionRule {
    /// Noncurrent versions kept regardless of age.
    pub versions_to_retain: u32,
    /// Days after which older noncurrent versions expire.
    pub expiration_days: u32,
}

impl Default for NoncurrentVersionRule {
    fn default() -> Self {
        Self {
            versions_to_retain: NONCURRENT_VERSIONS_TO_RETAIN,
            expiration_days: NONCURRENT_VERSION_EXPIRATION_DAYS,
        }
    }
}

/// Declared state of the website bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    /// Construct id inside the stack.
    pub construct_id: String,
    /// Lifecycle rules applied to noncurrent versions.
    pub lifecycle_rules: Vec<NoncurrentVersionRule>,
}

impl BucketSpec {
    /// The versioned, private website bucket.
    #[must_use]
    pub fn website() -> Self {
        Self {
            construct_id: "WebsiteBucket".into(),
            lifecycle_rules: vec![NoncurrentVersionRule::default()],
        }
    }

    /// Construct path of the bucket resource.
    #[must_use]
    pub fn path(&self) -> [&str; 2] {
        [self.construct_id.as_str(), "Resource"]
    }

    /// Construct path of the bucket policy resource.
    #[must_use]
    pub fn policy_path(&self) -> [&str; 3] {
        [self.construct_id.as_str(), "Policy", "Resource"]
    }

    /// Renders the bucket resource.
    ///
    /// Versioning is always enabled and all four public access blocks are set.
    #[must_use]
    pub fn to_resource(&self) -> Resource {
        let rules: Vec<Value> = self
            .lifecycle_rules
            .iter()
            .map(|rule| {
                json!({
                    "NoncurrentVersionExpiration": {
                        "NewerNoncurrentVersions": rule.versions_to_retain,
                        "NoncurrentDays": rule.expiration_days,
                    },
                    "Status": "Enabled",
                })
            })
            .collect();

        Resource::new(
            resource_type::BUCKET,
            json!({
                "LifecycleConfiguration": { "Rules": rules },
                "PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true,
                },
                "VersioningConfiguration": { "Status": "Enabled" },
            }),
        )
        .with_removal_policy(RemovalPolicy::Retain)
    }

    /// Renders the policy letting only `distribution` read objects.
    #[must_use]
    pub fn access_policy(&self, bucket: &LogicalId, distribution: &LogicalId) -> Resource {
        let distribution_arn = template::join(
            "",
            vec![
                json!("arn:"),
                template::reference(pseudo::PARTITION),
                json!(":cloudfront::"),
                template::reference(pseudo::ACCOUNT_ID),
                json!(":distribution/"),
                template::reference(distribution.as_str()),
            ],
        );
        let objects = template::join(
            "",
            vec![template::get_att(bucket.as_str(), "Arn"), json!("/*")],
        );

        Resource::new(
            resource_type::BUCKET_POLICY,
            json!({
                "Bucket": template::reference(bucket.as_str()),
                "PolicyDocument": {
                    "Statement": [{
                        "Action": "s3:GetObject",
                        "Condition": {
                            "StringEquals": { "AWS:SourceArn": distribution_arn },
                        },
                        "Effect": "Allow",
                        "Principal": { "Service": CLOUDFRONT_SERVICE_PRINCIPAL },
                        "Resource": objects,
                    }],
                    "Version": POLICY_DOCUMENT_VERSION,
                },
            }),
        )
    }
}
