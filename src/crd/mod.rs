//! Custom Resource Definitions (CRDs) for imagegate.
//!
//! - `ImageSecurityPolicy`: per-namespace image acceptance criteria

mod image_security_policy;

pub use image_security_policy::*;
