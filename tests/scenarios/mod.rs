//! Scenario-based tests for stageline

mod after_steps;
mod interruption;
mod secret_binding;
mod skip_conditions;
mod stage_order;
mod stage_selection;
