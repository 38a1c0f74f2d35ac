//! Signal production: the rule table, the rule engine, and pluggable sources.

pub mod advisor;
pub mod engine;
pub mod rules;
pub mod source;

pub use advisor::SimulatedAdvisor;
pub use engine::RuleEngine;
pub use rules::{default_rules, RuleCondition, ScoringRule};
pub use source::{build_source, FallbackSource, SignalSource};
