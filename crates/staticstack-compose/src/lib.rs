//! # staticstack-compose
//!
//! Declarative composer for the static site stack.
//!
//! Handles:
//! - **Template**: The resource description format and its intrinsic functions.
//! - **Asset**: Fingerprinting and staging of the static asset directory.
//! - **Bucket / Distribution / Deployment / Output**: Resource specs and their rendering.
//! - **Stack**: The composer that turns configuration into a resource graph.
//! - **Graph**: Reference graph and topological resolution.
//! - **Validator**: Structural invariants of a composed template.
//! - **Assertions**: Template matchers for tests and verification.
//!
//! # Example
//!
//! ```rust,no_run
//! use staticstack_common::config::StackConfig;
//! use staticstack_compose::stack::{App, InfraStack};
//!
//! let app = App::new();
//! let graph = InfraStack::compose(&app, "InfraStack", &StackConfig::default())?;
//! println!("{}", graph.template().to_json_pretty()?);
//! # Ok::<(), staticstack_common::error::StackError>(())
//! ```

pub mod assertions;
pub mod asset;
pub mod bucket;
pub mod deployment;
pub mod distribution;
pub mod filter;
pub mod graph;
pub mod logical_id;
pub mod manifest;
pub mod output;
pub mod stack;
pub mod template;
pub mod validator;
