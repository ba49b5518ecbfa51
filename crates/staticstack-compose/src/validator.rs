//! Structural validation of a composed template.
//!
//! Checks the invariants of the static site stack before the template is
//! handed to the reconciliation engine.

use serde_json::Value;
use staticstack_common::constants::{DEFAULT_ROOT_OBJECT, SECURITY_HEADERS_POLICY_ID};
use staticstack_common::error::{Result, StackError};
use staticstack_common::types::{LogicalId, ViewerProtocolPolicy};

use crate::graph::DependencyGraph;
use crate::template::{Resource, Template, resource_type};

/// Number of deployment jobs every stack declares.
pub const EXPECTED_DEPLOYMENTS: usize = 2;

/// Outputs every stack declares.
pub const EXPECTED_OUTPUTS: [&str; 2] = ["DistributionDomainName", "DistributionUrl"];

/// Validates a composed template for structural correctness.
///
/// # Checks performed
///
/// 1. Exactly one bucket, versioned, with a lifecycle rule and every public
///    access block set.
/// 2. No bucket policy grants access to a wildcard principal.
/// 3. Exactly one distribution with a single default behavior, the
///    `index.html` root object, HTTPS redirection, and the managed
///    security headers policy.
/// 4. Exactly two deployment jobs, none pruning, one including and one
///    excluding the same entry paths.
/// 5. Both outputs declared.
/// 6. Every reference resolves and the graph is acyclic.
///
/// # Errors
///
/// Returns an error if any check fails.
pub fn validate(template: &Template) -> Result<()> {
    tracing::info!(resources = template.resources.len(), "validating resource graph");
    check_bucket(template)?;
    check_bucket_policies(template)?;
    check_distribution(template)?;
    check_deployments(template)?;
    check_outputs(template)?;
    let _ = DependencyGraph::from_template(template)?.resolve_order()?;
    Ok(())
}

fn exactly_one<'a>(template: &'a Template, kind: &str) -> Result<(&'a LogicalId, &'a Resource)> {
    let mut found = template.resources_of_type(kind);
    match (found.next(), found.next()) {
        (Some(one), None) => Ok(one),
        (None, _) => Err(StackError::validation(kind, "no resource of this type declared")),
        (Some(_), Some(_)) => Err(StackError::validation(
            kind,
            format!(
                "expected exactly one, found {}",
                template.resources_of_type(kind).count()
            ),
        )),
    }
}

fn check_bucket(template: &Template) -> Result<()> {
    let (id, bucket) = exactly_one(template, resource_type::BUCKET)?;

    if bucket.property("VersioningConfiguration/Status") != Some(&Value::from("Enabled")) {
        return Err(StackError::validation(id.as_str(), "versioning is not enabled"));
    }

    let has_rules = bucket
        .property("LifecycleConfiguration/Rules")
        .and_then(Value::as_array)
        .is_some_and(|rules| !rules.is_empty());
    if !has_rules {
        return Err(StackError::validation(id.as_str(), "no lifecycle rule declared"));
    }

    for flag in [
        "BlockPublicAcls",
        "BlockPublicPolicy",
        "IgnorePublicAcls",
        "RestrictPublicBuckets",
    ] {
        let path = format!("PublicAccessBlockConfiguration/{flag}");
        if bucket.property(&path) != Some(&Value::Bool(true)) {
            return Err(StackError::validation(
                id.as_str(),
                format!("public access is not fully blocked ({flag})"),
            ));
        }
    }
    Ok(())
}

fn check_bucket_policies(template: &Template) -> Result<()> {
    for (id, policy) in template.resources_of_type(resource_type::BUCKET_POLICY) {
        let statements = policy
            .property("PolicyDocument/Statement")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice);
        for statement in statements {
            let principal = &statement["Principal"];
            let public = principal == "*" || principal.get("AWS").is_some_and(|p| p == "*");
            if public {
                return Err(StackError::validation(
                    id.as_str(),
                    "bucket policy grants public access",
                ));
            }
        }
    }
    Ok(())
}

fn check_distribution(template: &Template) -> Result<()> {
    let (id, distribution) = exactly_one(template, resource_type::DISTRIBUTION)?;
    let fail = |message: &str| StackError::validation(id.as_str(), message);

    let root = distribution.property("DistributionConfig/DefaultRootObject");
    if root != Some(&Value::from(DEFAULT_ROOT_OBJECT)) {
        return Err(fail("default root object is not index.html"));
    }

    let behavior = distribution
        .property("DistributionConfig/DefaultCacheBehavior")
        .filter(|b| b.is_object())
        .ok_or_else(|| fail("no default behavior declared"))?;

    let extra_behaviors = distribution
        .property("DistributionConfig/CacheBehaviors")
        .and_then(Value::as_array)
        .is_some_and(|b| !b.is_empty());
    if extra_behaviors {
        return Err(fail("only the default behavior may be declared"));
    }

    if behavior["ViewerProtocolPolicy"] != ViewerProtocolPolicy::RedirectToHttps.as_str() {
        return Err(fail("viewers are not redirected to HTTPS"));
    }
    if behavior["ResponseHeadersPolicyId"] != SECURITY_HEADERS_POLICY_ID {
        return Err(fail("default behavior does not use the security headers policy"));
    }
    Ok(())
}

fn check_deployments(template: &Template) -> Result<()> {
    let jobs: Vec<_> = template
        .resources_of_type(resource_type::BUCKET_DEPLOYMENT)
        .collect();
    if jobs.len() != EXPECTED_DEPLOYMENTS {
        return Err(StackError::validation(
            resource_type::BUCKET_DEPLOYMENT,
            format!("expected {EXPECTED_DEPLOYMENTS} deployments, found {}", jobs.len()),
        ));
    }

    for (id, job) in &jobs {
        if job.properties["Prune"] != Value::Bool(false) {
            return Err(StackError::validation(id.as_str(), "deployment must not prune"));
        }
    }

    let include: Vec<_> = jobs
        .iter()
        .filter_map(|(_, job)| job.properties.get("Include"))
        .collect();
    let exclude: Vec<_> = jobs
        .iter()
        .filter_map(|(_, job)| job.properties.get("Exclude"))
        .collect();
    let partitioned = match (include.as_slice(), exclude.as_slice()) {
        ([inc], [exc]) => inc == exc,
        _ => false,
    };
    let overlapping = jobs.iter().any(|(_, job)| {
        job.properties.get("Include").is_some() && job.properties.get("Exclude").is_some()
    });
    if !partitioned || overlapping {
        return Err(StackError::validation(
            resource_type::BUCKET_DEPLOYMENT,
            "deployments do not partition the asset tree by the entry paths",
        ));
    }
    Ok(())
}

fn check_outputs(template: &Template) -> Result<()> {
    for name in EXPECTED_OUTPUTS {
        if !template.outputs.contains_key(name) {
            return Err(StackError::validation(name, "output not declared"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::bucket::BucketSpec;
    use crate::distribution::DistributionSpec;
    use crate::template::Output;

    fn deployment(filter_key: &str, prune: bool) -> Resource {
        let mut properties = json!({
            "DestinationBucketName": { "Ref": "Bucket" },
            "Prune": prune,
        });
        properties[filter_key] = json!(["/index.html"]);
        Resource::new(resource_type::BUCKET_DEPLOYMENT, properties)
    }

    fn valid() -> Template {
        let mut template = Template::new(None);
        let bucket = LogicalId::new("Bucket");
        let dist = LogicalId::new("Dist");
        let oac = LogicalId::new("Oac");
        template
            .add_resource(bucket.clone(), BucketSpec::website().to_resource())
            .expect("bucket");
        template
            .add_resource(oac.clone(), DistributionSpec::origin_access_control(&oac))
            .expect("oac");
        template
            .add_resource(
                dist.clone(),
                DistributionSpec::website().to_resource(&bucket, &oac, &LogicalId::new("Origin")),
            )
            .expect("dist");
        template
            .add_resource(LogicalId::new("Html"), deployment("Include", false))
            .expect("html");
        template
            .add_resource(LogicalId::new("Assets"), deployment("Exclude", false))
            .expect("assets");
        for name in EXPECTED_OUTPUTS {
            template
                .add_output(
                    LogicalId::new(name),
                    Output {
                        value: json!({ "Fn::GetAtt": ["Dist", "DomainName"] }),
                        description: None,
                    },
                )
                .expect("output");
        }
        template
    }

    fn expect_invalid(template: &Template, needle: &str) {
        let err = validate(template).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(needle), "expected \"{needle}\", got: {msg}");
    }

    #[test]
    fn valid_template_passes() {
        validate(&valid()).expect("valid");
    }

    #[test]
    fn missing_versioning_fails() {
        let mut template = valid();
        let bucket = template.resources.get_mut("Bucket").expect("bucket");
        bucket.properties["VersioningConfiguration"]["Status"] = json!("Suspended");
        expect_invalid(&template, "versioning");
    }

    #[test]
    fn missing_lifecycle_fails() {
        let mut template = valid();
        let bucket = template.resources.get_mut("Bucket").expect("bucket");
        bucket.properties["LifecycleConfiguration"]["Rules"] = json!([]);
        expect_invalid(&template, "lifecycle");
    }

    #[test]
    fn partial_public_access_block_fails() {
        let mut template = valid();
        let bucket = template.resources.get_mut("Bucket").expect("bucket");
        bucket.properties["PublicAccessBlockConfiguration"]["BlockPublicPolicy"] = json!(false);
        expect_invalid(&template, "BlockPublicPolicy");
    }

    #[test]
    fn public_bucket_policy_fails() {
        let mut template = valid();
        template
            .add_resource(
                LogicalId::new("Public"),
                Resource::new(
                    resource_type::BUCKET_POLICY,
                    json!({
                        "Bucket": { "Ref": "Bucket" },
                        "PolicyDocument": { "Statement": [{ "Principal": "*", "Effect": "Allow" }] },
                    }),
                ),
            )
            .expect("policy");
        expect_invalid(&template, "public access");
    }

    #[test]
    fn second_distribution_fails() {
        let mut template = valid();
        let copy = template.resources["Dist"].clone();
        template
            .add_resource(LogicalId::new("Dist2"), copy)
            .expect("dist2");
        expect_invalid(&template, "expected exactly one");
    }

    #[test]
    fn wrong_root_object_fails() {
        let mut template = valid();
        let dist = template.resources.get_mut("Dist").expect("dist");
        dist.properties["DistributionConfig"]["DefaultRootObject"] = json!("main.html");
        expect_invalid(&template, "index.html");
    }

    #[test]
    fn extra_behavior_fails() {
        let mut template = valid();
        let dist = template.resources.get_mut("Dist").expect("dist");
        dist.properties["DistributionConfig"]["CacheBehaviors"] = json!([{ "PathPattern": "/api/*" }]);
        expect_invalid(&template, "only the default behavior");
    }

    #[test]
    fn other_headers_policy_fails() {
        let mut template = valid();
        let dist = template.resources.get_mut("Dist").expect("dist");
        dist.properties["DistributionConfig"]["DefaultCacheBehavior"]["ResponseHeadersPolicyId"] =
            json!("60669652-455b-4ae9-85a4-c4c02393f86c");
        expect_invalid(&template, "security headers");
    }

    #[test]
    fn third_deployment_fails() {
        let mut template = valid();
        template
            .add_resource(LogicalId::new("More"), deployment("Include", false))
            .expect("more");
        expect_invalid(&template, "expected 2 deployments, found 3");
    }

    #[test]
    fn pruning_deployment_fails() {
        let mut template = valid();
        let _ = template
            .resources
            .insert(LogicalId::new("Html"), deployment("Include", true));
        expect_invalid(&template, "must not prune");
    }

    #[test]
    fn two_including_jobs_fail() {
        let mut template = valid();
        let _ = template
            .resources
            .insert(LogicalId::new("Assets"), deployment("Include", false));
        expect_invalid(&template, "partition");
    }

    #[test]
    fn missing_output_fails() {
        let mut template = valid();
        let _ = template.outputs.remove("DistributionUrl");
        expect_invalid(&template, "DistributionUrl");
    }

    #[test]
    fn dangling_reference_fails() {
        let mut template = valid();
        let html = template.resources.get_mut("Html").expect("html");
        html.properties["DestinationBucketName"] = json!({ "Ref": "Ghost" });
        expect_invalid(&template, "Ghost");
    }
}
