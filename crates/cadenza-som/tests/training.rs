//! Training behaviour on small synthetic corpora.

use cadenza_som::{
    CancellationToken, DataNormalizer, InputVector, Network, NetworkTrainer, Position, TrainOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

fn clustered_samples() -> Vec<(usize, InputVector)> {
    let centers = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
    let jitter = [-0.05, 0.0, 0.05];

    let mut samples = Vec::new();
    for (cluster, &(cx, cy)) in centers.iter().enumerate() {
        for &dx in &jitter {
            for &dy in &jitter {
                samples.push((cluster, vec![cx + dx, cy + dy]));
            }
        }
    }
    samples
}

fn train(width: u32, height: u32, samples: &[InputVector], seed: u64) -> Network {
    let trainer = NetworkTrainer::new(width, height, 2, StdRng::seed_from_u64(seed));
    match trainer.train(samples, 100, None, &CancellationToken::new()) {
        TrainOutcome::Trained(network) => network,
        TrainOutcome::Aborted { .. } => panic!("training aborted"),
    }
}

#[test]
fn test_clusters_land_on_distinct_cells() {
    let labelled = clustered_samples();
    let raw: Vec<InputVector> = labelled.iter().map(|(_, v)| v.clone()).collect();
    let normalizer = DataNormalizer::compute_normalization_factors(2, &raw);
    let samples: Vec<InputVector> = raw.iter().map(|s| normalizer.normalize(s)).collect();

    let network = train(4, 4, &samples, 42);

    let mut cells_per_cluster: Vec<BTreeSet<Position>> = vec![BTreeSet::new(); 4];
    for ((cluster, _), sample) in labelled.iter().zip(&samples) {
        cells_per_cluster[*cluster].insert(network.closest_position(sample));
    }

    for a in 0..4 {
        for b in (a + 1)..4 {
            assert!(
                cells_per_cluster[a].is_disjoint(&cells_per_cluster[b]),
                "clusters {a} and {b} share a cell"
            );
        }
    }
}

#[test]
fn test_identical_samples_share_a_cell() {
    let samples = vec![vec![0.2, 0.8], vec![0.2, 0.8], vec![0.9, 0.1]];
    let network = train(3, 3, &samples, 1);
    assert_eq!(
        network.closest_position(&samples[0]),
        network.closest_position(&samples[1])
    );
}

#[test]
fn test_trained_map_has_spread() {
    let raw: Vec<InputVector> = clustered_samples().into_iter().map(|(_, v)| v).collect();
    let normalizer = DataNormalizer::compute_normalization_factors(2, &raw);
    let samples: Vec<InputVector> = raw.iter().map(|s| normalizer.normalize(s)).collect();

    let network = train(3, 3, &samples, 3);
    assert!(network.median_neighbor_distance() > 0.0);
}
