// announcer-core/src/trainer/protocol.rs

//! Protocol wrapper types for trainer messages.

use crate::dataset::Dataset;
use crate::identity::NodeIdentity;
use crate::proto::trainer as proto;

/// One chunk of a dataset, tagged with its dataset and the sending node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainChunk {
    pub hostname: String,
    pub ip: String,
    pub cluster_id: u64,
    pub dataset: Dataset,
    pub payload: Vec<u8>,
}

impl TrainChunk {
    pub fn new(identity: &NodeIdentity, dataset: Dataset, payload: Vec<u8>) -> Self {
        Self {
            hostname: identity.hostname.clone(),
            ip: identity.ip.to_string(),
            cluster_id: identity.cluster_id,
            dataset,
            payload,
        }
    }
}

impl From<TrainChunk> for proto::TrainRequest {
    fn from(chunk: TrainChunk) -> Self {
        let request = match chunk.dataset {
            Dataset::Download => {
                proto::train_request::Request::TrainMlpRequest(proto::TrainMlpRequest {
                    dataset: chunk.payload,
                })
            }
            Dataset::NetworkTopology => {
                proto::train_request::Request::TrainGnnRequest(proto::TrainGnnRequest {
                    dataset: chunk.payload,
                })
            }
        };

        Self {
            hostname: chunk.hostname,
            ip: chunk.ip,
            cluster_id: chunk.cluster_id,
            request: Some(request),
        }
    }
}
