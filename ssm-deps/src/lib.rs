//! Dependency graph construction and build/publish ordering.
//!
//! Grounded on `ssm/deps.py`. Uses a hand-rolled work-queue traversal
//! rather than a SAT solver: every name here has at most one candidate
//! provider, so the problem is "produce one deterministic order and
//! fail on the first unmet requirement or conflict," not "search among
//! many installable candidate sets."

mod error;
mod manager;
mod testable;

pub use error::Error;
pub use manager::DependencyManager;
pub use testable::{Conflict, Op, Provider, Requirement, Testable};
