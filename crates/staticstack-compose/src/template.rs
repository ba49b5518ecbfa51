//! The resource description format emitted by the composer.
//!
//! A [`Template`] is the declarative target state handed to the external
//! reconciliation engine. Maps are ordered so serialization is stable
//! across runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use staticstack_common::error::{Result, StackError};
use staticstack_common::types::LogicalId;

/// Provider resource type names used by the stack.
pub mod resource_type {
    /// Object storage bucket.
    pub const BUCKET: &str = "AWS::S3::Bucket";
    /// Bucket access policy.
    pub const BUCKET_POLICY: &str = "AWS::S3::BucketPolicy";
    /// CDN distribution.
    pub const DISTRIBUTION: &str = "AWS::CloudFront::Distribution";
    /// Origin access control binding between distribution and bucket.
    pub const ORIGIN_ACCESS_CONTROL: &str = "AWS::CloudFront::OriginAccessControl";
    /// Bucket deployment custom resource.
    pub const BUCKET_DEPLOYMENT: &str = "Custom::CDKBucketDeployment";
    /// Function backing the bucket deployment custom resource.
    pub const FUNCTION: &str = "AWS::Lambda::Function";
    /// Execution role of the deployment handler.
    pub const ROLE: &str = "AWS::IAM::Role";
    /// Inline policy attached to the deployment handler role.
    pub const POLICY: &str = "AWS::IAM::Policy";
}

/// Pseudo parameters resolved by the provider at apply time.
pub mod pseudo {
    /// Partition of the target account (`aws`, `aws-cn`, ...).
    pub const PARTITION: &str = "AWS::Partition";
    /// Target account id.
    pub const ACCOUNT_ID: &str = "AWS::AccountId";
    /// Target region.
    pub const REGION: &str = "AWS::Region";
    /// Domain suffix of the partition.
    pub const URL_SUFFIX: &str = "AWS::URLSuffix";

    /// Returns `true` if `name` is a pseudo parameter rather than a logical id.
    #[must_use]
    pub fn is_pseudo(name: &str) -> bool {
        name.starts_with("AWS::")
    }
}

/// A `{"Ref": id}` intrinsic.
#[must_use]
pub fn reference(id: &str) -> Value {
    json!({ "Ref": id })
}

/// A `{"Fn::GetAtt": [id, attribute]}` intrinsic.
#[must_use]
pub fn get_att(id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id, attribute] })
}

/// A `{"Fn::Join": [delimiter, parts]}` intrinsic.
#[must_use]
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// A `{"Fn::Sub": template}` intrinsic.
#[must_use]
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// What the reconciliation engine does with a resource removed from the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    /// Keep the physical resource.
    Retain,
    /// Delete the physical resource.
    Delete,
}

/// A single declared resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    /// Provider type name, e.g. `AWS::S3::Bucket`.
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// Type-specific properties.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    /// Explicit ordering dependencies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    /// Policy applied when an update requires replacement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,
    /// Policy applied when the resource is removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,
}

impl Resource {
    /// Creates a resource of the given type.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            update_replace_policy: None,
            deletion_policy: None,
        }
    }

    /// Sets both the update-replace and the deletion policy.
    #[must_use]
    pub const fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.update_replace_policy = Some(policy);
        self.deletion_policy = Some(policy);
        self
    }

    /// Adds explicit ordering dependencies.
    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = LogicalId>) -> Self {
        self.depends_on.extend(ids);
        self
    }

    /// Looks up a property by a `/`-separated path, e.g. `DistributionConfig/DefaultRootObject`.
    #[must_use]
    pub fn property(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .try_fold(&self.properties, |value, key| value.get(key))
    }
}

/// A named template output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    /// Computed value, usually an intrinsic.
    pub value: Value,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Root of the resource description format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// Format version literal.
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    /// Free-form template description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared resources keyed by logical id.
    #[serde(default)]
    pub resources: BTreeMap<LogicalId, Resource>,
    /// Declared outputs keyed by logical id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<LogicalId, Output>,
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: staticstack_common::constants::TEMPLATE_FORMAT_VERSION.to_owned(),
            description,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Parses a template from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a well-formed template.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Declares a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the logical id is already taken.
    pub fn add_resource(&mut self, id: LogicalId, resource: Resource) -> Result<()> {
        if self.resources.contains_key(&id) {
            return Err(StackError::Config {
                message: format!("duplicate logical id: \"{id}\""),
            });
        }
        tracing::debug!(id = %id, resource_type = %resource.resource_type, "declared resource");
        let _ = self.resources.insert(id, resource);
        Ok(())
    }

    /// Declares an output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output id is already taken.
    pub fn add_output(&mut self, id: LogicalId, output: Output) -> Result<()> {
        if self.outputs.contains_key(&id) {
            return Err(StackError::Config {
                message: format!("duplicate output id: \"{id}\""),
            });
        }
        let _ = self.outputs.insert(id, output);
        Ok(())
    }

    /// Returns the resource with the given logical id.
    #[must_use]
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Iterates over resources of one type, in logical id order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// Iterates over the resources that reference `id` through `Ref`,
    /// `Fn::GetAtt`, or `DependsOn`, in logical id order.
    pub fn references<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a LogicalId> {
        self.resources
            .iter()
            .filter(move |(_, r)| {
                r.depends_on.iter().any(|d| d.as_str() == id)
                    || crate::graph::references(&r.properties).contains(id)
            })
            .map(|(referrer, _)| referrer)
    }

    /// Serializes the template as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serializes the template as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| StackError::Config {
            message: format!("cannot render template as YAML: {e}"),
        })
    }
}
