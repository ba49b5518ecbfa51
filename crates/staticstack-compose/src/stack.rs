//! The resource composer.
//!
//! [`InfraStack::compose`] is a single pass from configuration to a
//! [`ResourceGraph`]. Apart from fingerprinting the asset directory it
//! performs no I/O, and composing twice with the same inputs yields the
//! same graph.

use staticstack_common::config::StackConfig;
use staticstack_common::error::{Result, StackError};
use staticstack_common::types::{CacheControl, LogicalId};

use crate::asset::{AssetFile, StagedAsset};
use crate::bucket::BucketSpec;
use crate::deployment::{DeploymentHandler, DeploymentJobSpec};
use crate::distribution::{ACCESS_CONTROL_NAME_MAX_LENGTH, DistributionSpec};
use crate::logical_id::{allocate, allocate_bounded};
use crate::output::OutputSpec;
use crate::template::Template;
use crate::validator;

/// Root context that stacks are composed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct App {
    description: Option<String>,
}

impl App {
    /// Creates an app with no description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the description copied into every template.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description copied into every template.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// A declared deployment job together with its logical id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentJob {
    /// The job's declared state.
    pub spec: DeploymentJobSpec,
    /// Logical id of its custom resource.
    pub logical_id: LogicalId,
}

/// What one deployment job will upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan<'a> {
    /// Construct id of the job.
    pub construct_id: &'a str,
    /// Logical id of the job's custom resource.
    pub logical_id: &'a LogicalId,
    /// `Cache-Control` set on its objects.
    pub cache_control: CacheControl,
    /// Distribution paths invalidated after upload.
    pub invalidation_paths: &'a [String],
    /// Files the job uploads.
    pub files: Vec<&'a AssetFile>,
}

impl JobPlan<'_> {
    /// Total size of the job's files in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// The composed stack: its template plus the inputs it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGraph {
    stack_name: String,
    template: Template,
    asset: StagedAsset,
    bucket: LogicalId,
    distribution: LogicalId,
    deployments: Vec<DeploymentJob>,
}

impl ResourceGraph {
    /// Name of the stack.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// The declarative output.
    #[must_use]
    pub const fn template(&self) -> &Template {
        &self.template
    }

    /// The fingerprinted asset directory.
    #[must_use]
    pub const fn asset(&self) -> &StagedAsset {
        &self.asset
    }

    /// Logical id of the website bucket.
    #[must_use]
    pub const fn bucket_id(&self) -> &LogicalId {
        &self.bucket
    }

    /// Logical id of the distribution.
    #[must_use]
    pub const fn distribution_id(&self) -> &LogicalId {
        &self.distribution
    }

    /// The declared deployment jobs, entry job first.
    #[must_use]
    pub fn deployments(&self) -> &[DeploymentJob] {
        &self.deployments
    }

    /// File name the template is written under.
    #[must_use]
    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.stack_name)
    }

    /// File name the asset manifest is written under.
    #[must_use]
    pub fn assets_file_name(&self) -> String {
        format!("{}.assets.json", self.stack_name)
    }

    /// Per-job breakdown of the files each job uploads.
    #[must_use]
    pub fn deployment_plan(&self) -> Vec<JobPlan<'_>> {
        self.deployments
            .iter()
            .map(|job| JobPlan {
                construct_id: &job.spec.construct_id,
                logical_id: &job.logical_id,
                cache_control: job.spec.cache_control,
                invalidation_paths: job.spec.invalidation_paths.as_deref().unwrap_or(&[]),
                files: job.spec.select(&self.asset),
            })
            .collect()
    }
}

/// The static site stack.
#[derive(Debug)]
pub struct InfraStack;

impl InfraStack {
    /// Composes the stack `id` inside `app` from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack id is invalid, the asset directory is
    /// missing or empty, or the composed graph fails validation.
    pub fn compose(app: &App, id: &str, config: &StackConfig) -> Result<ResourceGraph> {
        check_stack_name(id)?;
        let asset_path = config.resolved_asset_path();
        tracing::info!(stack = id, asset_path = %asset_path.display(), "composing stack");

        let asset = StagedAsset::fingerprint(&asset_path)?;
        let mut template = Template::new(app.description().map(str::to_owned));

        let bucket_spec = BucketSpec::website();
        let bucket = allocate(&bucket_spec.path())?;
        template.add_resource(bucket.clone(), bucket_spec.to_resource())?;

        let distribution_spec = DistributionSpec::website();
        let distribution = allocate(&distribution_spec.path())?;
        let access_control = allocate(&distribution_spec.access_control_path())?;
        let origin_id = allocate(&distribution_spec.origin_path_components(id))?;
        template.add_resource(
            access_control.clone(),
            DistributionSpec::origin_access_control(&allocate_bounded(
                &[
                    id,
                    distribution_spec.construct_id.as_str(),
                    "S3OriginAccessControl",
                ],
                ACCESS_CONTROL_NAME_MAX_LENGTH,
            )?),
        )?;
        template.add_resource(
            distribution.clone(),
            distribution_spec.to_resource(&bucket, &access_control, &origin_id),
        )?;
        template.add_resource(
            allocate(&bucket_spec.policy_path())?,
            bucket_spec.access_policy(&bucket, &distribution),
        )?;

        let handler = DeploymentHandler::default();
        let handler_id = allocate(&handler.path())?;
        let role_id = allocate(&handler.role_path())?;
        let policy_id = allocate(&handler.policy_path())?;
        template.add_resource(role_id.clone(), DeploymentHandler::role())?;
        template.add_resource(
            policy_id.clone(),
            DeploymentHandler::policy(&role_id, &policy_id, &bucket),
        )?;
        template.add_resource(
            handler_id.clone(),
            DeploymentHandler::function(&role_id, &policy_id),
        )?;

        let mut deployments = Vec::with_capacity(2);
        for spec in [
            DeploymentJobSpec::entry_files()?,
            DeploymentJobSpec::remaining_assets()?,
        ] {
            let logical_id = allocate(&spec.path())?;
            tracing::debug!(
                job = %spec.construct_id,
                files = spec.select(&asset).len(),
                cache_control = %spec.cache_control,
                "declared deployment job"
            );
            template.add_resource(
                logical_id.clone(),
                spec.to_resource(&handler_id, &asset, &bucket, &distribution),
            )?;
            deployments.push(DeploymentJob { spec, logical_id });
        }

        for output in [OutputSpec::domain_name(), OutputSpec::url()] {
            template.add_output(
                LogicalId::new(output.label.as_str()),
                output.render(&distribution),
            )?;
        }

        validator::validate(&template)?;
        tracing::info!(
            stack = id,
            resources = template.resources.len(),
            outputs = template.outputs.len(),
            asset_hash = %asset.hash(),
            "stack composed"
        );

        Ok(ResourceGraph {
            stack_name: id.to_owned(),
            template,
            asset,
            bucket,
            distribution,
            deployments,
        })
    }
}

/// Stack names start with a letter and contain only letters, digits, and hyphens.
fn check_stack_name(id: &str) -> Result<()> {
    let valid = id.len() <= 128
        && id.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StackError::Config {
            message: format!("invalid stack name: \"{id}\""),
        })
    }
}
