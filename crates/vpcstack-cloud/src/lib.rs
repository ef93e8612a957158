//! vpcstack cloud
//!
//! Turns a [`vpcstack_core::ResourceGraph`] into the document consumed by
//! the provisioning engine and previews the changes it would cause against
//! the engine's applied-state record.
//!
//! ```text
//! ResourceGraph ──synthesize──> ResourceSet ──> StackDocument (.vpcstack/out)
//!                                    │
//!        .vpcstack/state.json ──> AppliedState
//!                                    │
//!                                  plan ──> Plan (create / update / delete)
//! ```

pub mod action;
pub mod error;
pub mod plan;
pub mod state;
pub mod synth;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use error::{CloudError, Result};
pub use plan::plan;
pub use state::{AppliedState, ResourceState, StateManager};
pub use synth::{ResourceConfig, ResourceSet, StackDocument, provider_type, synthesize};
