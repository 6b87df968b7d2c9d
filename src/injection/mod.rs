//! # Injection Module
//!
//! Adversarial distortion of the drone's own telemetry.
//!
//! This module handles:
//! - Decoding operator attack payloads into typed specs and route directives
//! - Applying per-mode transforms to generated samples
//! - The drone-side heuristic that pre-emptively declares a failsafe

pub mod directive;
pub mod engine;
pub mod heuristic;
pub mod spec;

pub use directive::{DirectiveError, RouteDirective};
pub use engine::InjectionEngine;
pub use heuristic::{LocalFailsafeHeuristic, LocalTrigger};
pub use spec::{InjectionMode, InjectionSpec, InjectionStyle, InjectionSummary};
