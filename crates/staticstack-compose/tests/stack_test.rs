//! Integration tests for the composed static site stack.
//!
//! Every test composes the stack against a temporary asset directory and
//! checks the rendered template through the assertion helpers, the same
//! way a caller reading the emitted JSON would.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use serde_json::json;
use staticstack_common::config::StackConfig;
use staticstack_common::constants::{CACHING_OPTIMIZED_POLICY_ID, SECURITY_HEADERS_POLICY_ID};
use staticstack_compose::assertions::TemplateAssertions;
use staticstack_compose::graph::DependencyGraph;
use staticstack_compose::manifest::AssetManifest;
use staticstack_compose::stack::{App, InfraStack, ResourceGraph};
use staticstack_compose::template::{Template, resource_type};

fn write_site(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }
}

fn compose(root: &Path) -> ResourceGraph {
    InfraStack::compose(
        &App::new(),
        "TestStack",
        &StackConfig::with_asset_path(root),
    )
    .expect("stack should compose")
}

fn default_site() -> (tempfile::TempDir, ResourceGraph) {
    let dir = tempfile::tempdir().expect("tempdir");
    write_site(
        dir.path(),
        &[
            ("index.html", "<!doctype html><title>site</title>"),
            ("assets/index-3f2a.js", "console.log('hi')"),
            ("assets/index-9c1d.css", "body{margin:0}"),
            ("favicon.ico", "ico"),
        ],
    );
    let graph = compose(dir.path());
    (dir, graph)
}

/// Round-trips the template through its JSON form so assertions see what a
/// deployer would.
fn emitted(graph: &ResourceGraph) -> Template {
    let json = graph.template().to_json_pretty().expect("serialize");
    Template::from_json(&json).expect("parse")
}

// ── Bucket ───────────────────────────────────────────────────────────

#[test]
fn bucket_is_versioned_with_noncurrent_expiration() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    let assertions = TemplateAssertions::new(&template);

    assertions.resource_count_is(resource_type::BUCKET, 1).expect("one bucket");
    assertions
        .has_resource_properties(
            resource_type::BUCKET,
            &json!({
                "VersioningConfiguration": { "Status": "Enabled" },
                "LifecycleConfiguration": {
                    "Rules": [{
                        "NoncurrentVersionExpiration": {
                            "NewerNoncurrentVersions": 3,
                            "NoncurrentDays": 360,
                        },
                        "Status": "Enabled",
                    }],
                },
            }),
        )
        .expect("versioning and lifecycle");
}

#[test]
fn bucket_blocks_public_access_and_is_retained() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    TemplateAssertions::new(&template)
        .has_resource_properties(
            resource_type::BUCKET,
            &json!({
                "PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true,
                },
            }),
        )
        .expect("public access blocked");

    let bucket = template
        .resource(graph.bucket_id().as_str())
        .expect("bucket declared");
    let raw = serde_json::to_value(bucket).expect("value");
    assert_eq!(raw["DeletionPolicy"], "Retain");
    assert_eq!(raw["UpdateReplacePolicy"], "Retain");
}

#[test]
fn only_the_distribution_may_read_the_bucket() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    let assertions = TemplateAssertions::new(&template);
    assertions
        .resource_count_is(resource_type::BUCKET_POLICY, 1)
        .expect("one policy");
    assertions
        .has_resource_properties(
            resource_type::BUCKET_POLICY,
            &json!({
                "Bucket": { "Ref": graph.bucket_id().as_str() },
                "PolicyDocument": {
                    "Statement": [{
                        "Action": "s3:GetObject",
                        "Effect": "Allow",
                        "Principal": { "Service": "cloudfront.amazonaws.com" },
                    }],
                },
            }),
        )
        .expect("distribution-only read access");
}

// ── Distribution ─────────────────────────────────────────────────────

#[test]
fn exactly_one_distribution_serves_index_html() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    let assertions = TemplateAssertions::new(&template);

    assertions
        .resource_count_is(resource_type::DISTRIBUTION, 1)
        .expect("one distribution");
    assertions
        .has_resource_properties(
            resource_type::DISTRIBUTION,
            &json!({ "DistributionConfig": { "DefaultRootObject": "index.html" } }),
        )
        .expect("root object");
}

#[test]
fn default_behavior_uses_managed_policies_and_https() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    TemplateAssertions::new(&template)
        .has_resource_properties(
            resource_type::DISTRIBUTION,
            &json!({
                "DistributionConfig": {
                    "DefaultCacheBehavior": {
                        "ResponseHeadersPolicyId": SECURITY_HEADERS_POLICY_ID,
                        "CachePolicyId": CACHING_OPTIMIZED_POLICY_ID,
                        "ViewerProtocolPolicy": "redirect-to-https",
                    },
                },
            }),
        )
        .expect("default behavior");
}

#[test]
fn origin_reads_the_prefix_through_access_control() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    let assertions = TemplateAssertions::new(&template);
    assertions
        .resource_count_is(resource_type::ORIGIN_ACCESS_CONTROL, 1)
        .expect("one access control");

    let (oac_id, _) = template
        .resources_of_type(resource_type::ORIGIN_ACCESS_CONTROL)
        .next()
        .expect("access control");
    assertions
        .has_resource_properties(
            resource_type::DISTRIBUTION,
            &json!({
                "DistributionConfig": {
                    "Origins": [{
                        "DomainName": {
                            "Fn::GetAtt": [graph.bucket_id().as_str(), "RegionalDomainName"],
                        },
                        "OriginAccessControlId": { "Fn::GetAtt": [oac_id.as_str(), "Id"] },
                        "OriginPath": "/www/static",
                    }],
                },
            }),
        )
        .expect("origin");
}

// ── Deployments ──────────────────────────────────────────────────────

#[test]
fn two_bucket_deployments_are_declared() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    TemplateAssertions::new(&template)
        .resource_count_is(resource_type::BUCKET_DEPLOYMENT, 2)
        .expect("two deployments");
}

#[test]
fn entry_file_job_has_short_cache_and_invalidates() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    TemplateAssertions::new(&template)
        .has_resource_properties(
            resource_type::BUCKET_DEPLOYMENT,
            &json!({
                "Include": ["/index.html"],
                "DestinationBucketKeyPrefix": "www/static",
                "Prune": false,
                "SystemMetadata": { "cache-control": "max-age=300" },
                "DistributionId": { "Ref": graph.distribution_id().as_str() },
                "DistributionPaths": ["/index.html"],
            }),
        )
        .expect("entry job");
}

#[test]
fn asset_job_has_long_cache_and_no_invalidation() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    let assertions = TemplateAssertions::new(&template);
    let found = assertions.find_resources(
        resource_type::BUCKET_DEPLOYMENT,
        &json!({
            "Exclude": ["/index.html"],
            "Prune": false,
            "SystemMetadata": { "cache-control": "max-age=604800" },
        }),
    );
    assert_eq!(found.len(), 1);
    let properties = &found[0].1.properties;
    assert!(properties.get("DistributionId").is_none());
    assert!(properties.get("DistributionPaths").is_none());
}

#[test]
fn jobs_partition_the_asset_tree() {
    let (_dir, graph) = default_site();
    let plan = graph.deployment_plan();
    let mut keys: Vec<&str> = plan
        .iter()
        .flat_map(|job| job.files.iter().map(|f| f.key.as_str()))
        .collect();
    let total = keys.len();
    keys.sort_unstable();
    keys.dedup();

    assert_eq!(total, keys.len(), "a file is uploaded by both jobs");
    let all: Vec<&str> = graph.asset().files().iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, all);
}

#[test]
fn deployments_share_one_handler() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    let assertions = TemplateAssertions::new(&template);
    assertions
        .resource_count_is(resource_type::FUNCTION, 1)
        .expect("one handler");
    let (handler, _) = template
        .resources_of_type(resource_type::FUNCTION)
        .next()
        .expect("handler");

    let jobs = assertions.find_resources(
        resource_type::BUCKET_DEPLOYMENT,
        &json!({ "ServiceToken": { "Fn::GetAtt": [handler.as_str(), "Arn"] } }),
    );
    assert_eq!(jobs.len(), 2);
}

#[test]
fn deployments_source_the_fingerprinted_asset() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    let key = graph.asset().object_key();
    let jobs = TemplateAssertions::new(&template)
        .find_resources(resource_type::BUCKET_DEPLOYMENT, &json!({ "SourceObjectKeys": [key] }));
    assert_eq!(jobs.len(), 2);
}

// ── Outputs ──────────────────────────────────────────────────────────

#[test]
fn outputs_expose_domain_and_url() {
    let (_dir, graph) = default_site();
    let template = emitted(&graph);
    let assertions = TemplateAssertions::new(&template);
    let dist = graph.distribution_id().as_str();

    assertions
        .has_output(
            "DistributionDomainName",
            &json!({
                "Value": { "Fn::GetAtt": [dist, "DomainName"] },
                "Description": "CloudFront distribution domain name",
            }),
        )
        .expect("domain output");
    assertions
        .has_output(
            "DistributionUrl",
            &json!({
                "Value": { "Fn::Join": ["", ["https://", { "Fn::GetAtt": [dist, "DomainName"] }]] },
                "Description": "CloudFront distribution URL",
            }),
        )
        .expect("url output");
}

// ── Whole graph ──────────────────────────────────────────────────────

#[test]
fn deployments_are_created_after_bucket_and_distribution() {
    let (_dir, graph) = default_site();
    let order = DependencyGraph::from_template(graph.template())
        .expect("graph")
        .resolve_order()
        .expect("acyclic");
    let pos = |id: &str| order.iter().position(|n| n == id).expect(id);

    for job in graph.deployments() {
        assert!(pos(graph.bucket_id().as_str()) < pos(job.logical_id.as_str()));
        assert!(pos(graph.distribution_id().as_str()) < pos(job.logical_id.as_str()));
    }
}

#[test]
fn composing_twice_emits_identical_templates() {
    let (dir, first) = default_site();
    let second = compose(dir.path());
    assert_eq!(
        first.template().to_json_pretty().expect("json"),
        second.template().to_json_pretty().expect("json")
    );
}

#[test]
fn changing_an_asset_changes_only_the_source_key() {
    let (dir, before) = default_site();
    write_site(dir.path(), &[("assets/index-3f2a.js", "console.log('bye')")]);
    let after = compose(dir.path());

    assert_ne!(before.asset().hash(), after.asset().hash());
    assert_eq!(
        before.template().resources.keys().collect::<Vec<_>>(),
        after.template().resources.keys().collect::<Vec<_>>()
    );
}

#[test]
fn manifest_lists_the_staged_asset() {
    let (_dir, graph) = default_site();
    let manifest = AssetManifest::for_assets([graph.asset()]);
    let entry = &manifest.files[graph.asset().hash().as_hex()];
    assert_eq!(
        entry.destinations["current_account-current_region"].object_key,
        graph.asset().object_key()
    );
}

#[test]
fn yaml_rendering_carries_the_same_resources() {
    let (_dir, graph) = default_site();
    let yaml = graph.template().to_yaml().expect("yaml");
    for id in graph.template().resources.keys() {
        assert!(yaml.contains(id.as_str()), "missing {id} in yaml");
    }
}

#[test]
fn index_only_site_partitions_by_the_entry_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_site(dir.path(), &[("index.html", "<!doctype html>")]);
    let graph = compose(dir.path());
    let template = emitted(&graph);
    let assertions = TemplateAssertions::new(&template);

    let entry = assertions.find_resources(
        resource_type::BUCKET_DEPLOYMENT,
        &json!({ "Include": ["/index.html"] }),
    );
    let rest = assertions.find_resources(
        resource_type::BUCKET_DEPLOYMENT,
        &json!({ "Exclude": ["/index.html"] }),
    );
    assert_eq!(entry.len(), 1);
    assert_eq!(rest.len(), 1);
    assert!(entry[0].1.properties.get("Exclude").is_none());
    assert!(rest[0].1.properties.get("Include").is_none());

    let plan = graph.deployment_plan();
    let entry_keys: Vec<&str> = plan[0].files.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(entry_keys, vec!["/index.html"]);
    assert!(plan[1].files.is_empty());
}

#[test]
fn site_without_index_still_composes() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_site(dir.path(), &[("app.js", "1")]);
    let graph = compose(dir.path());
    let plan = graph.deployment_plan();
    assert!(plan[0].files.is_empty());
    assert_eq!(plan[1].files.len(), 1);
}

#[test]
fn empty_asset_directory_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = InfraStack::compose(
        &App::new(),
        "TestStack",
        &StackConfig::with_asset_path(dir.path()),
    )
    .unwrap_err();
    assert!(err.to_string().contains("contains no files"), "got: {err}");
}
