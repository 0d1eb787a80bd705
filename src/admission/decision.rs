//! Terminal states and verdicts of the admission pipeline.
//!
//! Every request ends in exactly one [`DecisionState`]. Allow and deny states
//! carry a [`Verdict`]; error states carry an [`AdmissionError`].

use std::fmt;

use super::error::AdmissionError;
use crate::policy::SecurityPolicyViolation;

/// Message attached to every allowed pod
pub const SUCCESS_MESSAGE: &str = "Successfully admitted.";

/// Terminal state reached by one run of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionState {
    /// Breakglass annotation present
    BreakglassAllow,
    /// Every image is globally whitelisted
    WhitelistAllow,
    /// Policies could not be fetched
    FetchError,
    /// Metadata client could not be acquired
    ClientError,
    /// A policy check errored
    ValidateError,
    /// An image is not fully qualified
    UnqualifiedDeny,
    /// An image violates a policy
    ViolationDeny,
    /// Every image passed every policy
    CleanAllow,
    /// The deadline expired before a verdict was reached
    TimedOut,
}

impl DecisionState {
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            DecisionState::BreakglassAllow | DecisionState::WhitelistAllow | DecisionState::CleanAllow
        )
    }

    pub fn is_denied(&self) -> bool {
        matches!(
            self,
            DecisionState::UnqualifiedDeny | DecisionState::ViolationDeny
        )
    }

    /// True when no verdict could be computed
    pub fn is_error(&self) -> bool {
        !self.is_allowed() && !self.is_denied()
    }
}

impl fmt::Display for DecisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionState::BreakglassAllow => write!(f, "BreakglassAllow"),
            DecisionState::WhitelistAllow => write!(f, "WhitelistAllow"),
            DecisionState::FetchError => write!(f, "FetchError"),
            DecisionState::ClientError => write!(f, "ClientError"),
            DecisionState::ValidateError => write!(f, "ValidateError"),
            DecisionState::UnqualifiedDeny => write!(f, "UnqualifiedDeny"),
            DecisionState::ViolationDeny => write!(f, "ViolationDeny"),
            DecisionState::CleanAllow => write!(f, "CleanAllow"),
            DecisionState::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// Allow/deny outcome with a human-readable explanation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub message: String,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: message.into(),
        }
    }
}

/// Full outcome of one pipeline run
#[derive(Debug)]
pub struct Decision {
    pub state: DecisionState,
    pub result: Result<Verdict, AdmissionError>,
    /// Violations that caused a deny, empty otherwise
    pub violations: Vec<SecurityPolicyViolation>,
}

impl Decision {
    pub fn allow(state: DecisionState) -> Self {
        Self {
            state,
            result: Ok(Verdict::allow()),
            violations: Vec::new(),
        }
    }

    pub fn deny(
        state: DecisionState,
        message: impl Into<String>,
        violations: Vec<SecurityPolicyViolation>,
    ) -> Self {
        Self {
            state,
            result: Ok(Verdict::deny(message)),
            violations,
        }
    }

    pub fn failed(state: DecisionState, error: AdmissionError) -> Self {
        Self {
            state,
            result: Err(error),
            violations: Vec::new(),
        }
    }
}
