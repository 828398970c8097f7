//! One-shot classification of on-device inference readiness.

use tracing::{info, warn};

use super::local::{LocalInference, SessionAvailability};
use super::types::CapabilityStatus;

/// Probe the local facility and classify its readiness.
///
/// Never fails. An absent facility is [`CapabilityStatus::Unavailable`] and
/// is not queried further; a failing readiness query is
/// [`CapabilityStatus::Error`].
pub async fn probe(facility: Option<&dyn LocalInference>) -> CapabilityStatus {
    let Some(facility) = facility else {
        info!("No local inference facility, on-device path unavailable");
        return CapabilityStatus::Unavailable;
    };

    let status = match facility.can_create_session().await {
        Ok(SessionAvailability::Readily) => CapabilityStatus::Readily,
        Ok(SessionAvailability::AfterDownload) => CapabilityStatus::AfterDownload,
        Ok(SessionAvailability::No) => CapabilityStatus::No,
        Err(e) => {
            warn!("Local inference probe failed: {}", e);
            CapabilityStatus::Error
        }
    };
    info!(%status, "Local inference probed");
    status
}
