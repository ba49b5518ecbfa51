//! Informational stack outputs.

use serde_json::json;
use staticstack_common::types::LogicalId;

use crate::template::{self, Output};

/// What an output reports about the distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputValue {
    /// The distribution's hostname.
    DomainName,
    /// `https://` followed by the hostname.
    Url,
}

/// Declared output record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    /// Output label, used verbatim as its logical id.
    pub label: String,
    /// Computed value.
    pub value: OutputValue,
    /// Human-readable description.
    pub description: String,
}

impl OutputSpec {
    /// `DistributionDomainName`.
    #[must_use]
    pub fn domain_name() -> Self {
        Self {
            label: "DistributionDomainName".into(),
            value: OutputValue::DomainName,
            description: "CloudFront distribution domain name".into(),
        }
    }

    /// `DistributionUrl`.
    #[must_use]
    pub fn url() -> Self {
        Self {
            label: "DistributionUrl".into(),
            value: OutputValue::Url,
            description: "CloudFront distribution URL".into(),
        }
    }

    /// Renders the output against the distribution's logical id.
    #[must_use]
    pub fn render(&self, distribution: &LogicalId) -> Output {
        let domain = template::get_att(distribution.as_str(), "DomainName");
        let value = match self.value {
            OutputValue::DomainName => domain,
            OutputValue::Url => template::join("", vec![json!("https://"), domain]),
        };
        Output {
            value,
            description: Some(self.description.clone()),
        }
    }
}
