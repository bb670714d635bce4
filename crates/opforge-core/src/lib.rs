//! opforge Core - building blocks for turning annotated manifests into a typed workload spec
//!
//! This crate provides the pieces the workload model is assembled from:
//! - `WorkloadKind`: the closed set of workload shapes and their textual tags
//! - `Manifest`: manifest reference expansion and content loading
//! - `markers`: inline field/collection marker parsing with type inference
//! - `ApiFields`: the merged, ordered field tree exposed to code generation
//! - `RbacRules` / `OwnershipRules`: rule sets implied by manifest resource kinds
//! - `SourceFile`: per-manifest generation units
//! - `naming`: package names, companion command metadata and pluralization

pub mod api;
pub mod error;
pub mod fields;
pub mod kind;
pub mod manifest;
pub mod markers;
pub mod naming;
pub mod ownership;
pub mod rbac;
pub mod source;

pub use api::{ComponentResource, GroupVersionKind, WorkloadApiSpec};
pub use error::{CoreError, Result};
pub use fields::{ApiField, ApiFields, FieldOrigin};
pub use kind::WorkloadKind;
pub use manifest::{Manifest, expand_manifests, load_manifests};
pub use markers::{FieldType, Marker, MarkerHit, MarkerScope, ParsedManifest, parse_manifest};
pub use naming::{CliCommand, CommandRole, pluralize, to_package_name};
pub use ownership::{OwnershipRule, OwnershipRules};
pub use rbac::{RbacRule, RbacRules};
pub use source::{ChildResource, SourceFile, func_names};
