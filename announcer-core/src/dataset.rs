// announcer-core/src/dataset.rs

use std::fmt;

/// Datasets collected by the scheduler and uploaded to the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Download records, used to train the MLP model.
    Download,
    /// Network topology probes, used to train the GNN model.
    NetworkTopology,
}

impl Dataset {
    /// Tag carried by every chunk of this dataset.
    pub fn name(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::NetworkTopology => "network_topology",
        }
    }

    /// Stage tag used when an upload of this dataset fails.
    pub fn upload_stage(self) -> &'static str {
        match self {
            Self::Download => "upload download",
            Self::NetworkTopology => "upload network topology",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
