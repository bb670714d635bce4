//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - missing fields, bad markers, conflicting definitions
pub const VALIDATION_ERROR: i32 = 2;

/// Config error - unreadable or malformed workload config
pub const CONFIG_ERROR: i32 = 3;

/// Manifest error - missing or invalid manifest
pub const MANIFEST_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Dependency error - unknown or circular component dependency
pub const DEPENDENCY_ERROR: i32 = 6;
