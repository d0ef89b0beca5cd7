// announcer-core/src/identity.rs

use std::net::IpAddr;

use crate::config::AnnouncerConfig;

/// Identity of this scheduler as announced to the manager and trainer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub hostname: String,
    pub ip: IpAddr,
    pub port: u16,
    pub idc: String,
    pub location: String,
    pub cluster_id: u64,
}

impl NodeIdentity {
    pub fn from_config(config: &AnnouncerConfig) -> Self {
        Self {
            hostname: config.server.host.clone(),
            ip: config.server.advertise_ip,
            port: config.server.advertise_port,
            idc: config.host.idc.clone(),
            location: config.host.location.clone(),
            cluster_id: config.manager.scheduler_cluster_id,
        }
    }
}
