//! services/api/src/web/playback_task.rs
//!
//! The playback driver: a background task that advances the simulated ramp of
//! the playback cursor while at least one socket is open. It is stopped via a
//! `CancellationToken`.

use crate::web::state::AppState;
use quran_viewer_core::playback::TICK_INTERVAL;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub async fn playback_process(app_state: Arc<AppState>, cancellation_token: CancellationToken) {
    debug!("Playback driver ticking every {:?}", TICK_INTERVAL);
    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Playback driver cancelled.");
                return;
            }
            _ = ticker.tick() => {
                app_state
                    .viewer
                    .drive_playback(|cursor| cursor.tick(TICK_INTERVAL));
            }
        }
    }
}
