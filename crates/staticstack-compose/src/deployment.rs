//! Bucket deployment jobs and their shared handler.
//!
//! Each job uploads a filtered slice of the asset tree under the same key
//! prefix. Jobs never prune, so unrelated deployments can share the prefix.

use serde_json::json;
use staticstack_common::constants::{
    ASSETS_BUCKET_NAME, DEPLOYMENT_HANDLER_CODE_KEY, DEPLOYMENT_HANDLER_ENTRY,
    DEPLOYMENT_HANDLER_RUNTIME, DEPLOYMENT_HANDLER_TIMEOUT_SECONDS, DESTINATION_KEY_PREFIX,
    FIVE_MINUTES_IN_SECONDS, ONE_WEEK_IN_SECONDS, POLICY_DOCUMENT_VERSION, SHORT_CACHE_PATHS,
};
use staticstack_common::error::Result;
use staticstack_common::types::{CacheControl, LogicalId};

use crate::asset::{AssetFile, StagedAsset};
use crate::filter::FileFilter;
use crate::template::{self, RemovalPolicy, Resource, pseudo, resource_type};

/// Which slice of the asset tree a job uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Entry files: short cache, invalidated after upload.
    Entry,
    /// Everything else: long cache, never invalidated.
    Asset,
}

/// Declared state of one deployment job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentJobSpec {
    /// Construct id inside the stack.
    pub construct_id: String,
    /// Slice of the tree this job owns.
    pub kind: JobKind,
    /// Key prefix in the destination bucket.
    pub destination_key_prefix: String,
    /// Files this job uploads.
    pub filter: FileFilter,
    /// `Cache-Control` set on uploaded objects.
    pub cache_control: CacheControl,
    /// Paths invalidated on the distribution after upload, if associated.
    pub invalidation_paths: Option<Vec<String>>,
    prune: bool,
}

impl DeploymentJobSpec {
    /// The short-cache job for entry files.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry patterns are invalid.
    pub fn entry_files() -> Result<Self> {
        Ok(Self {
            construct_id: "DeployWebsiteHtml".into(),
            kind: JobKind::Entry,
            destination_key_prefix: DESTINATION_KEY_PREFIX.into(),
            filter: FileFilter::including(SHORT_CACHE_PATHS)?,
            cache_control: CacheControl::max_age(FIVE_MINUTES_IN_SECONDS),
            invalidation_paths: Some(SHORT_CACHE_PATHS.iter().map(|p| (*p).to_owned()).collect()),
            prune: false,
        })
    }

    /// The long-cache job for every other file.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry patterns are invalid.
    pub fn remaining_assets() -> Result<Self> {
        Ok(Self {
            construct_id: "DeployWebsiteAssets".into(),
            kind: JobKind::Asset,
            destination_key_prefix: DESTINATION_KEY_PREFIX.into(),
            filter: FileFilter::excluding(SHORT_CACHE_PATHS)?,
            cache_control: CacheControl::max_age(ONE_WEEK_IN_SECONDS),
            invalidation_paths: None,
            prune: false,
        })
    }

    /// Whether the job deletes destination objects missing from its source.
    #[must_use]
    pub const fn prune(&self) -> bool {
        self.prune
    }

    /// Construct path of the custom resource.
    #[must_use]
    pub fn path(&self) -> [&str; 3] {
        [self.construct_id.as_str(), "CustomResource", "Default"]
    }

    /// Files of `asset` this job uploads.
    #[must_use]
    pub fn select<'a>(&self, asset: &'a StagedAsset) -> Vec<&'a AssetFile> {
        self.filter.select(asset.files())
    }

    /// Renders the custom resource for this job.
    #[must_use]
    pub fn to_resource(
        &self,
        handler: &LogicalId,
        asset: &StagedAsset,
        bucket: &LogicalId,
        distribution: &LogicalId,
    ) -> Resource {
        let mut properties = json!({
            "ServiceToken": template::get_att(handler.as_str(), "Arn"),
            "SourceBucketNames": [template::sub(ASSETS_BUCKET_NAME)],
            "SourceObjectKeys": [asset.object_key()],
            "DestinationBucketName": template::reference(bucket.as_str()),
            "DestinationBucketKeyPrefix": self.destination_key_prefix,
            "Prune": self.prune,
            "SystemMetadata": { "cache-control": self.cache_control.to_string() },
        });

        if let Some(map) = properties.as_object_mut() {
            if !self.filter.include().is_empty() {
                let _ = map.insert("Include".into(), json!(self.filter.include()));
            }
            if !self.filter.exclude().is_empty() {
                let _ = map.insert("Exclude".into(), json!(self.filter.exclude()));
            }
            if let Some(paths) = &self.invalidation_paths {
                let _ = map.insert(
                    "DistributionId".into(),
                    template::reference(distribution.as_str()),
                );
                let _ = map.insert("DistributionPaths".into(), json!(paths));
            }
        }

        Resource::new(resource_type::BUCKET_DEPLOYMENT, properties)
            .with_removal_policy(RemovalPolicy::Delete)
    }
}

/// The function backing every deployment custom resource in a stack.
///
/// Declared once per stack however many jobs exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentHandler {
    /// Construct id inside the stack.
    pub construct_id: String,
}

impl Default for DeploymentHandler {
    fn default() -> Self {
        Self {
            construct_id: "CustomCDKBucketDeployment8693BB64968944B69AAFB0CC9EB8756C".into(),
        }
    }
}

impl DeploymentHandler {
    /// Construct path of the function.
    #[must_use]
    pub fn path(&self) -> [&str; 1] {
        [self.construct_id.as_str()]
    }

    /// Construct path of the execution role.
    #[must_use]
    pub fn role_path(&self) -> [&str; 3] {
        [self.construct_id.as_str(), "ServiceRole", "Resource"]
    }

    /// Construct path of the role's inline policy.
    #[must_use]
    pub fn policy_path(&self) -> [&str; 4] {
        [
            self.construct_id.as_str(),
            "ServiceRole",
            "DefaultPolicy",
            "Resource",
        ]
    }

    /// Renders the execution role.
    #[must_use]
    pub fn role() -> Resource {
        Resource::new(
            resource_type::ROLE,
            json!({
                "AssumeRolePolicyDocument": {
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": "lambda.amazonaws.com" },
                    }],
                    "Version": POLICY_DOCUMENT_VERSION,
                },
                "ManagedPolicyArns": [template::join(
                    "",
                    vec![
                        json!("arn:"),
                        template::reference(pseudo::PARTITION),
                        json!(":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"),
                    ],
                )],
            }),
        )
    }

    /// Renders the policy granting read on published assets, write on the
    /// destination bucket, and invalidation on distributions.
    #[must_use]
    pub fn policy(role: &LogicalId, policy_name: &LogicalId, bucket: &LogicalId) -> Resource {
        let assets_bucket_arn = template::join(
            "",
            vec![
                json!("arn:"),
                template::reference(pseudo::PARTITION),
                json!(":s3:::"),
                template::sub(ASSETS_BUCKET_NAME),
            ],
        );
        let assets_objects_arn = template::join(
            "",
            vec![assets_bucket_arn.clone(), json!("/*")],
        );
        let bucket_arn = template::get_att(bucket.as_str(), "Arn");
        let bucket_objects_arn = template::join("", vec![bucket_arn.clone(), json!("/*")]);

        Resource::new(
            resource_type::POLICY,
            json!({
                "PolicyDocument": {
                    "Statement": [
                        {
                            "Action": ["s3:GetBucket*", "s3:GetObject*", "s3:List*"],
                            "Effect": "Allow",
                            "Resource": [assets_bucket_arn, assets_objects_arn],
                        },
                        {
                            "Action": [
                                "s3:Abort*",
                                "s3:DeleteObject*",
                                "s3:GetBucket*",
                                "s3:GetObject*",
                                "s3:List*",
                                "s3:PutObject",
                                "s3:PutObjectLegalHold",
                                "s3:PutObjectRetention",
                                "s3:PutObjectTagging",
                                "s3:PutObjectVersionTagging",
                            ],
                            "Effect": "Allow",
                            "Resource": [bucket_arn, bucket_objects_arn],
                        },
                        {
                            "Action": ["cloudfront:CreateInvalidation", "cloudfront:GetInvalidation"],
                            "Effect": "Allow",
                            "Resource": "*",
                        },
                    ],
                    "Version": POLICY_DOCUMENT_VERSION,
                },
                "PolicyName": policy_name.as_str(),
                "Roles": [template::reference(role.as_str())],
            }),
        )
    }

    /// Renders the handler function, ordered after its role and policy.
    #[must_use]
    pub fn function(role: &LogicalId, policy: &LogicalId) -> Resource {
        Resource::new(
            resource_type::FUNCTION,
            json!({
                "Code": {
                    "S3Bucket": template::sub(ASSETS_BUCKET_NAME),
                    "S3Key": DEPLOYMENT_HANDLER_CODE_KEY,
                },
                "Handler": DEPLOYMENT_HANDLER_ENTRY,
                "Role": template::get_att(role.as_str(), "Arn"),
                "Runtime": DEPLOYMENT_HANDLER_RUNTIME,
                "Timeout": DEPLOYMENT_HANDLER_TIMEOUT_SECONDS,
            }),
        )
        .depends_on([policy.clone(), role.clone()])
    }
}
