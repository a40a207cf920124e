use anyhow::{bail, Result};
use cadenza_core::{ArtistId, ArtistLinkType, ReleaseId, TrackId, TrackListId};
use cadenza_recommend::{Config, LoadOutcome};
use cadenza_som::CancellationToken;
use std::fmt::Display;

use super::{cancel_on_ctrl_c, log_progress, with_engine};
use crate::SimilarQuery;

pub async fn run_similar(config: Config, query: SimilarQuery) -> Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let results = tokio::task::spawn_blocking(move || {
        with_engine(&config, cancel, |engine| {
            match engine.load(false, Some(&log_progress))? {
                LoadOutcome::FromCache | LoadOutcome::Trained => {}
                LoadOutcome::Cancelled => bail!("Cancelled"),
                LoadOutcome::NoTrainableData => {
                    bail!("No trained model: no track has usable analysis data")
                }
            }

            let results = match query {
                SimilarQuery::Tracks { ids, count } => {
                    let ids: Vec<TrackId> = ids.into_iter().map(TrackId::new).collect();
                    to_strings(engine.get_similar_tracks(&ids, count)?)
                }
                SimilarQuery::TrackList { id, count } => to_strings(
                    engine.get_similar_tracks_from_track_list(TrackListId::new(id), count)?,
                ),
                SimilarQuery::Release { id, count } => {
                    to_strings(engine.get_similar_releases(ReleaseId::new(id), count)?)
                }
                SimilarQuery::Artist {
                    id,
                    link_types,
                    count,
                } => {
                    let link_types = if link_types.is_empty() {
                        ArtistLinkType::ALL.to_vec()
                    } else {
                        link_types
                    };
                    to_strings(engine.get_similar_artists(ArtistId::new(id), &link_types, count)?)
                }
            };
            Ok(results)
        })
    })
    .await??;

    if results.is_empty() {
        eprintln!("No similar entries found");
    }
    for id in results {
        println!("{}", id);
    }

    Ok(())
}

fn to_strings<T: Display>(ids: Vec<T>) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}
