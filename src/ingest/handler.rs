use serde_json::{Map, Value};
use tracing::warn;

use super::protocol::{IngestRequest, IngestResponse, RequestKind};
use crate::relay::RelayState;

/// Run one ingestion request against the relay state. Publish and poll
/// are independent and may both happen in one call.
pub fn handle_request(
    state: &mut RelayState,
    request: &IngestRequest,
    payload: Map<String, Value>,
) -> IngestResponse {
    if let Some(event_type) = request.publish_type() {
        state.publish(event_type, request, payload);
    }

    let command = match request.request {
        RequestKind::PollCommand => state.poll(&request.filter()),
        RequestKind::Notify => None,
        RequestKind::Unknown => {
            warn!("unknown request kind from hook, treating as notify");
            None
        }
    };

    IngestResponse::ok(command)
}
