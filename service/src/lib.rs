//! Merit service: the composition root a host application embeds.
//!
//! The service wires the LMDB store, the ledger, the claim manager, and the
//! payout orchestrator together behind [`MeritService`], and owns the
//! concerns none of those layers should: configuration, logging setup,
//! permission checks for moderation, and Prometheus metrics.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod permission;
pub mod service;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use logging::{init_logging, LogFormat};
pub use metrics::ServiceMetrics;
pub use permission::{PermissionHierarchy, StaticHierarchy};
pub use service::MeritService;
