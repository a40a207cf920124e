use anyhow::Result;
use cadenza_recommend::{Config, LoadOutcome};
use cadenza_som::CancellationToken;

use super::{cancel_on_ctrl_c, log_progress, with_engine};

pub async fn run_train(config: Config, force: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let (outcome, status) = tokio::task::spawn_blocking(move || {
        with_engine(&config, cancel, |engine| {
            let outcome = engine.load(force, Some(&log_progress))?;
            Ok((outcome, engine.status()))
        })
    })
    .await??;

    match outcome {
        LoadOutcome::FromCache => {
            println!("✓ Cached model is up to date (use --force to retrain)");
        }
        LoadOutcome::Trained => println!("✓ Training complete"),
        LoadOutcome::Cancelled => {
            println!("✗ Training cancelled, previous model kept");
            return Ok(());
        }
        LoadOutcome::NoTrainableData => {
            println!("✗ No track has usable analysis data, nothing to train");
            return Ok(());
        }
    }

    if let Some(status) = status {
        println!(
            "  Grid: {}x{}, {} dimensions, {} tracks",
            status.width, status.height, status.dimensions, status.track_count
        );
    }

    Ok(())
}
