//! Asset manifest written next to the template.
//!
//! Tells a publisher where each staged asset lives and under which object
//! key the deployment jobs expect to find it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use staticstack_common::constants::{ASSET_PACKAGING, ASSETS_BUCKET_NAME};
use staticstack_common::error::Result;

use crate::asset::StagedAsset;

/// Manifest schema version.
pub const MANIFEST_VERSION: &str = "1";

/// Destination key for the account and region the stack is deployed to.
pub const CURRENT_ENVIRONMENT: &str = "current_account-current_region";

/// Where a staged asset comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSource {
    /// Staging directory, relative to the manifest.
    pub path: String,
    /// How the directory is packaged for upload.
    pub packaging: String,
}

/// Where a staged asset is published to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDestination {
    /// Bucket name, with `${AWS::...}` placeholders.
    pub bucket_name: String,
    /// Object key inside the bucket.
    pub object_key: String,
}

/// One entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAsset {
    /// Staged source.
    pub source: AssetSource,
    /// Publishing targets keyed by environment.
    pub destinations: BTreeMap<String, AssetDestination>,
}

/// Manifest of every file asset a template depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    /// Schema version.
    pub version: String,
    /// Assets keyed by content hash.
    pub files: BTreeMap<String, FileAsset>,
}

impl AssetManifest {
    /// Builds the manifest for the given staged assets.
    #[must_use]
    pub fn for_assets<'a>(assets: impl IntoIterator<Item = &'a StagedAsset>) -> Self {
        let files = assets
            .into_iter()
            .map(|asset| {
                let destination = AssetDestination {
                    bucket_name: ASSETS_BUCKET_NAME.to_owned(),
                    object_key: asset.object_key(),
                };
                let entry = FileAsset {
                    source: AssetSource {
                        path: asset.staging_dir_name(),
                        packaging: ASSET_PACKAGING.to_owned(),
                    },
                    destinations: BTreeMap::from([(CURRENT_ENVIRONMENT.to_owned(), destination)]),
                };
                (asset.hash().as_hex().to_owned(), entry)
            })
            .collect();

        Self {
            version: MANIFEST_VERSION.to_owned(),
            files,
        }
    }

    /// Serializes the manifest as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
