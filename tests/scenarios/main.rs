//! Scenario-based tests for the step pipeline

mod helpers;

mod failure_handling;
mod finalization;
mod resume;
mod transitions;
