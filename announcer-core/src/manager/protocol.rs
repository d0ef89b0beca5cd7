// announcer-core/src/manager/protocol.rs

//! Conversions from the node identity to manager wire messages.

use crate::identity::NodeIdentity;
use crate::proto::manager as proto;

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl From<&NodeIdentity> for proto::UpdateSchedulerRequest {
    fn from(identity: &NodeIdentity) -> Self {
        Self {
            source_type: proto::SourceType::SchedulerSource as i32,
            hostname: identity.hostname.clone(),
            scheduler_cluster_id: identity.cluster_id,
            location: non_empty(&identity.location),
            idc: non_empty(&identity.idc),
            ip: identity.ip.to_string(),
            port: i32::from(identity.port),
        }
    }
}

impl From<&NodeIdentity> for proto::KeepAliveRequest {
    fn from(identity: &NodeIdentity) -> Self {
        Self {
            source_type: proto::SourceType::SchedulerSource as i32,
            hostname: identity.hostname.clone(),
            cluster_id: identity.cluster_id,
            ip: identity.ip.to_string(),
        }
    }
}
