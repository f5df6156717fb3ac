use tracing::{info, warn};

use crate::error::NamespaceError;
use crate::kubernetes::ClusterReader;

/// Service whose namespace marks where px-backup is deployed.
pub const MARKER_SERVICE: &str = "px-backup";

/// Pick the namespace to collect from.
///
/// An explicit namespace always wins. Otherwise every service in the cluster
/// is scanned for [`MARKER_SERVICE`]. A failed scan is treated as "not found".
pub async fn resolve_namespace(
    reader: &dyn ClusterReader,
    explicit: Option<&str>,
) -> Result<String, NamespaceError> {
    if let Some(ns) = explicit.filter(|ns| !ns.is_empty()) {
        return Ok(ns.to_string());
    }

    match reader.find_service_namespace(MARKER_SERVICE).await {
        Ok(Some(ns)) => {
            info!("Found {} service in namespace {}", MARKER_SERVICE, ns);
            Ok(ns)
        }
        Ok(None) => Err(NamespaceError::NotFound),
        Err(e) => {
            warn!("Error listing services: {}", e);
            Err(NamespaceError::NotFound)
        }
    }
}
