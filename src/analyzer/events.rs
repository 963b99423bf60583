//! Event lookup shared by analyzers that need the cluster's own diagnosis.

use super::AnalysisContext;
use crate::kubernetes::{ClusterError, ResourceKind, decode};
use k8s_openapi::api::core::v1::Event;
use k8s_openapi::chrono::{DateTime, Utc};

/// Fetch the most recent event about `name` in `namespace`.
///
/// A listing failure yields `Ok(None)`: a missing event is not a failure of
/// the resource. Only cancellation propagates.
pub async fn latest_event(
    ctx: &AnalysisContext<'_>,
    namespace: &str,
    name: &str,
) -> Result<Option<Event>, ClusterError> {
    let selector = format!("involvedObject.name={}", name);
    let objects = match ctx
        .guard(
            ctx.cluster
                .list(ResourceKind::Event, Some(namespace), Some(&selector)),
        )
        .await
    {
        Ok(objects) => objects,
        Err(ClusterError::Cancelled) => return Err(ClusterError::Cancelled),
        Err(e) => {
            log::debug!("Failed to list events for {}/{}: {}", namespace, name, e);
            return Ok(None);
        }
    };

    let latest = objects
        .into_iter()
        .filter_map(|obj| decode::<Event>(ResourceKind::Event, obj).ok())
        .filter(|event| event.involved_object.name.as_deref() == Some(name))
        .max_by(|a, b| event_time(a).cmp(&event_time(b)));

    Ok(latest)
}

/// Sort key for events: `lastTimestamp`, then `eventTime`, then creation time.
fn event_time(event: &Event) -> Option<DateTime<Utc>> {
    event
        .last_timestamp
        .as_ref()
        .map(|t| t.0)
        .or_else(|| event.event_time.as_ref().map(|t| t.0))
        .or_else(|| event.metadata.creation_timestamp.as_ref().map(|t| t.0))
}
