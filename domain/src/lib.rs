//! Domain layer for the exception-processing platform.
//!
//! Entities, value objects, and invariant-bearing logic shared by every
//! other crate in the workspace. No dependency on async runtimes or
//! infrastructure concerns — everything here is synchronous and pure.

pub mod circuit;
pub mod decision;
pub mod error;
pub mod event;
pub mod exception;
pub mod ids;
pub mod pack;
pub mod playbook;
pub mod routing;
pub mod sanitize;
pub mod secret;
pub mod util;
pub mod value;

pub use decision::AgentDecision;
pub use error::PlatformError;
pub use event::{CanonicalEvent, EventType};
pub use exception::{ExceptionRecord, ExceptionStatus, Severity};
pub use ids::{ConsumerGroup, DomainName, EventId, ExceptionId, TenantId};
pub use pack::{DomainPack, Guardrails, PackValidationReport, TenantPolicyPack};
pub use playbook::{Playbook, PlaybookStep};
pub use routing::{ProviderKind, ProviderSelection, ResolutionInputs, RoutingConfig, RoutingOverride};
pub use sanitize::{sanitize_prompt, validate_prompt_for_domain};
pub use secret::mask_secret;
pub use value::{DynValue, DynValueError};
