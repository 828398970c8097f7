// Flightcast Library
// Advisory generation for the flight delay dashboard

pub mod advisory;
pub mod config;
pub mod context;
pub mod error;
#[cfg(feature = "server")]
pub mod gateway;
pub mod utils;

pub use advisory::{
    AdvisoryMode, AdvisoryOrchestrator, AdvisoryRequest, AdvisoryResult, CapabilityStatus,
    CascadeResolver,
};
pub use config::FlightcastConfig;
pub use context::FlightContext;
#[cfg(feature = "server")]
pub use gateway::AdvisoryGateway;
