//! Admission decision pipeline for pods.
//!
//! Checks, in order, stopping at the first decisive outcome:
//! - Breakglass: an override annotation admits the pod unconditionally
//! - Whitelist: pods made only of globally whitelisted images are admitted
//! - Policies: every image is validated against every ImageSecurityPolicy
//!   in the pod's namespace

mod decision;
mod engine;
mod error;
mod pod;
mod whitelist;

pub use decision::{Decision, DecisionState, SUCCESS_MESSAGE, Verdict};
pub use engine::{AdmissionEngine, DEFAULT_BREAKGLASS_ANNOTATION, Dependencies, EngineSettings};
pub use error::{AdmissionError, Result};
pub use pod::{PodInfo, extract_pod};
pub use whitelist::{GlobalWhitelist, WhitelistChecker};
