//! Content delivery distribution spec.

use serde_json::json;
use staticstack_common::constants::{
    CACHING_OPTIMIZED_POLICY_ID, DEFAULT_ROOT_OBJECT, DESTINATION_KEY_PREFIX,
    SECURITY_HEADERS_POLICY_ID,
};
use staticstack_common::types::{LogicalId, ViewerProtocolPolicy};

use crate::template::{self, Resource, resource_type};

/// Longest name the provider accepts for an origin access control.
pub const ACCESS_CONTROL_NAME_MAX_LENGTH: usize = 64;

/// Declared state of the single distribution and its default behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSpec {
    /// Construct id inside the stack.
    pub construct_id: String,
    /// Object served for `/`.
    pub default_root_object: String,
    /// Bucket prefix the origin reads from, with a leading `/`.
    pub origin_path: String,
    /// Viewer protocol handling of the default behavior.
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    /// Managed response headers policy of the default behavior.
    pub response_headers_policy_id: String,
    /// Managed cache policy of the default behavior.
    pub cache_policy_id: String,
}

impl DistributionSpec {
    /// The website distribution fronting the deployment prefix.
    #[must_use]
    pub fn website() -> Self {
        Self {
            construct_id: "Distribution".into(),
            default_root_object: DEFAULT_ROOT_OBJECT.into(),
            origin_path: format!("/{DESTINATION_KEY_PREFIX}"),
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            response_headers_policy_id: SECURITY_HEADERS_POLICY_ID.into(),
            cache_policy_id: CACHING_OPTIMIZED_POLICY_ID.into(),
        }
    }

    /// Construct path of the distribution resource.
    #[must_use]
    pub fn path(&self) -> [&str; 2] {
        [self.construct_id.as_str(), "Resource"]
    }

    /// Construct path of the origin, qualified by the stack name.
    #[must_use]
    pub fn origin_path_components<'a>(&'a self, stack: &'a str) -> [&'a str; 3] {
        [stack, self.construct_id.as_str(), "Origin1"]
    }

    /// Construct path of the origin access control resource.
    #[must_use]
    pub fn access_control_path(&self) -> [&str; 4] {
        [
            self.construct_id.as_str(),
            "Origin1",
            "S3OriginAccessControl",
            "Resource",
        ]
    }

    /// Renders the origin access control the origin signs requests with.
    #[must_use]
    pub fn origin_access_control(name: &LogicalId) -> Resource {
        Resource::new(
            resource_type::ORIGIN_ACCESS_CONTROL,
            json!({
                "OriginAccessControlConfig": {
                    "Name": name.as_str(),
                    "OriginAccessControlOriginType": "s3",
                    "SigningBehavior": "always",
                    "SigningProtocol": "sigv4",
                },
            }),
        )
    }

    /// Renders the distribution reading `bucket` through `access_control`.
    #[must_use]
    pub fn to_resource(
        &self,
        bucket: &LogicalId,
        access_control: &LogicalId,
        origin_id: &LogicalId,
    ) -> Resource {
        Resource::new(
            resource_type::DISTRIBUTION,
            json!({
                "DistributionConfig": {
                    "DefaultCacheBehavior": {
                        "CachePolicyId": self.cache_policy_id,
                        "Compress": true,
                        "ResponseHeadersPolicyId": self.response_headers_policy_id,
                        "TargetOriginId": origin_id.as_str(),
                        "ViewerProtocolPolicy": self.viewer_protocol_policy.as_str(),
                    },
                    "DefaultRootObject": self.default_root_object,
                    "Enabled": true,
                    "HttpVersion": "http2",
                    "IPV6Enabled": true,
                    "Origins": [{
                        "DomainName": template::get_att(bucket.as_str(), "RegionalDomainName"),
                        "Id": origin_id.as_str(),
                        "OriginAccessControlId": template::get_att(access_control.as_str(), "Id"),
                        "OriginPath": self.origin_path,
                        "S3OriginConfig": { "OriginAccessIdentity": "" },
                    }],
                },
            }),
        )
    }
}
