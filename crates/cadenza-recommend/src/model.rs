use cadenza_core::TrackId;
use cadenza_som::{Network, Position};
use std::collections::{BTreeMap, BTreeSet};

/// Cells each classified track landed on.
pub type TrackPositions = BTreeMap<TrackId, BTreeSet<Position>>;

/// Everything needed to rebuild the similarity index: the trained network
/// and where each track was classified. This is exactly what gets cached.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    network: Network,
    track_positions: TrackPositions,
}

impl TrainedModel {
    pub fn new(network: Network, track_positions: TrackPositions) -> Self {
        Self {
            network,
            track_positions,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn track_positions(&self) -> &TrackPositions {
        &self.track_positions
    }
}
