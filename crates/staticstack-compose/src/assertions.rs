//! Structural assertions over a rendered template.
//!
//! Patterns are JSON values matched against resource properties or outputs:
//! objects match partially and recursively, arrays match element-wise and
//! must have the same length, scalars match by equality.
//!
//! ```
//! use serde_json::json;
//! use staticstack_compose::assertions::TemplateAssertions;
//! use staticstack_compose::template::Template;
//!
//! let template = Template::from_json(r#"{
//!     "AWSTemplateFormatVersion": "2010-09-09",
//!     "Resources": {
//!         "Bucket": { "Type": "AWS::S3::Bucket", "Properties": { "Tags": [] } }
//!     }
//! }"#).unwrap();
//! let assertions = TemplateAssertions::new(&template);
//! assertions.resource_count_is("AWS::S3::Bucket", 1).unwrap();
//! assertions.has_resource_properties("AWS::S3::Bucket", &json!({})).unwrap();
//! ```

use serde_json::Value;
use staticstack_common::types::LogicalId;

use crate::template::{Resource, Template};

/// A failed template assertion.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssertionError {
    /// The template declares a different number of resources of a type.
    #[error("expected {expected} resources of type {kind}, found {found}")]
    CountMismatch {
        /// Resource type.
        kind: String,
        /// Expected count.
        expected: usize,
        /// Actual count.
        found: usize,
    },

    /// No resource of a type matches the pattern.
    #[error("no {kind} resource matches the pattern ({candidates} candidates): {closest}")]
    NoMatch {
        /// Resource type.
        kind: String,
        /// Number of resources of the type.
        candidates: usize,
        /// Mismatch of the candidate that matched deepest.
        closest: String,
    },

    /// The template declares no output with this id.
    #[error("output {id} is not declared")]
    MissingOutput {
        /// Output id.
        id: String,
    },

    /// An output exists but does not match the pattern.
    #[error("output {id} does not match the pattern: {mismatch}")]
    OutputMismatch {
        /// Output id.
        id: String,
        /// First mismatch found.
        mismatch: String,
    },
}

/// Assertions over one template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateAssertions<'a> {
    template: &'a Template,
}

impl<'a> TemplateAssertions<'a> {
    /// Wraps `template`.
    #[must_use]
    pub const fn new(template: &'a Template) -> Self {
        Self { template }
    }

    /// Asserts that exactly `expected` resources of `kind` are declared.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::CountMismatch`] otherwise.
    pub fn resource_count_is(&self, kind: &str, expected: usize) -> Result<(), AssertionError> {
        let found = self.template.resources_of_type(kind).count();
        if found == expected {
            Ok(())
        } else {
            Err(AssertionError::CountMismatch {
                kind: kind.to_owned(),
                expected,
                found,
            })
        }
    }

    /// Asserts that some resource of `kind` has properties matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::NoMatch`] naming the closest mismatch.
    pub fn has_resource_properties(&self, kind: &str, pattern: &Value) -> Result<(), AssertionError> {
        let mut closest: Option<Mismatch> = None;
        let mut candidates = 0;
        for (id, resource) in self.template.resources_of_type(kind) {
            candidates += 1;
            match mismatch(pattern, &resource.properties, id.as_str()) {
                None => return Ok(()),
                Some(found) => {
                    if closest.as_ref().is_none_or(|c| found.depth > c.depth) {
                        closest = Some(found);
                    }
                }
            }
        }
        Err(AssertionError::NoMatch {
            kind: kind.to_owned(),
            candidates,
            closest: closest.map_or_else(|| "no resources of this type".to_owned(), |m| m.message),
        })
    }

    /// Returns every resource of `kind` whose properties match `pattern`.
    #[must_use]
    pub fn find_resources(&self, kind: &str, pattern: &Value) -> Vec<(&'a LogicalId, &'a Resource)> {
        self.template
            .resources_of_type(kind)
            .filter(|(id, resource)| mismatch(pattern, &resource.properties, id.as_str()).is_none())
            .collect()
    }

    /// Asserts that output `id` exists and matches `pattern`.
    ///
    /// The pattern is matched against the output as rendered, with `Value`
    /// and `Description` keys.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::MissingOutput`] or
    /// [`AssertionError::OutputMismatch`].
    pub fn has_output(&self, id: &str, pattern: &Value) -> Result<(), AssertionError> {
        let output = self
            .template
            .outputs
            .get(id)
            .ok_or_else(|| AssertionError::MissingOutput { id: id.to_owned() })?;
        let rendered = serde_json::to_value(output).unwrap_or(Value::Null);
        match mismatch(pattern, &rendered, id) {
            None => Ok(()),
            Some(found) => Err(AssertionError::OutputMismatch {
                id: id.to_owned(),
                mismatch: found.message,
            }),
        }
    }
}

#[derive(Debug)]
struct Mismatch {
    depth: usize,
    message: String,
}

/// Returns the first place `actual` fails to match `pattern`, if any.
fn mismatch(pattern: &Value, actual: &Value, at: &str) -> Option<Mismatch> {
    matches_at(pattern, actual, at, 0)
}

fn matches_at(pattern: &Value, actual: &Value, at: &str, depth: usize) -> Option<Mismatch> {
    match (pattern, actual) {
        (Value::Object(expected), Value::Object(found)) => {
            for (key, want) in expected {
                let path = format!("{at}/{key}");
                let Some(have) = found.get(key) else {
                    return Some(Mismatch {
                        depth,
                        message: format!("{path} is missing"),
                    });
                };
                if let Some(m) = matches_at(want, have, &path, depth + 1) {
                    return Some(m);
                }
            }
            None
        }
        (Value::Array(expected), Value::Array(found)) => {
            if expected.len() != found.len() {
                return Some(Mismatch {
                    depth,
                    message: format!(
                        "{at} has {} elements, expected {}",
                        found.len(),
                        expected.len()
                    ),
                });
            }
            expected
                .iter()
                .zip(found)
                .enumerate()
                .find_map(|(i, (want, have))| matches_at(want, have, &format!("{at}/{i}"), depth + 1))
        }
        (Value::Object(_) | Value::Array(_), _) => Some(Mismatch {
            depth,
            message: format!("{at} is {actual}, expected {pattern}"),
        }),
        _ if pattern == actual => None,
        _ => Some(Mismatch {
            depth,
            message: format!("{at} is {actual}, expected {pattern}"),
        }),
    }
}
