// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, io, net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;
use tracing::{error, info, span, Level};

use super::Reply;
use crate::{
    config,
    playback::{Engine, PlayOutcome},
    state::Status,
};

/// A controller that exposes the engine over a small JSON API.
pub struct Driver {
    engine: Arc<Engine>,
    /// The socket address to listen on.
    addr: SocketAddr,
}

impl Driver {
    pub fn new(
        config: &config::HttpController,
        engine: Arc<Engine>,
    ) -> Result<Arc<Self>, Box<dyn Error>> {
        Ok(Arc::new(Driver {
            engine,
            addr: config.address()?,
        }))
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self) -> JoinHandle<Result<(), io::Error>> {
        let addr = self.addr;
        let engine = self.engine.clone();

        tokio::spawn(async move {
            let span = span!(Level::INFO, "HTTP driver");
            let listener = TcpListener::bind(addr).await?;
            span.in_scope(|| info!(addr = %addr, "HTTP driver started."));
            axum::serve(listener, router(engine)).await
        })
    }
}

/// Builds the API routes.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/play", post(play))
        .route("/api/stop", get(stop).post(stop))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// The body of a play request.
#[derive(Deserialize, Debug, Default)]
pub struct PlayRequest {
    #[serde(default)]
    notes: Vec<String>,
}

/// GET /api/status - the current run state.
async fn status(State(engine): State<Arc<Engine>>) -> Json<Status> {
    Json(engine.status())
}

/// POST /api/play - starts a playback unless one is already running.
async fn play(
    State(engine): State<Arc<Engine>>,
    Json(request): Json<PlayRequest>,
) -> Json<Reply> {
    // Starting a playback may write to the devices.
    let outcome = tokio::task::spawn_blocking(move || engine.play(request.notes))
        .await
        .unwrap_or_else(|e| {
            error!(err = %e, "Play task failed.");
            PlayOutcome::Failed
        });
    Json(Reply::from(outcome))
}

/// GET|POST /api/stop - stops everything. Always succeeds.
async fn stop(State(engine): State<Arc<Engine>>) -> Json<Reply> {
    // Serial writes and channel locks block.
    if let Err(e) = tokio::task::spawn_blocking(move || engine.stop()).await {
        error!(err = %e, "Stop task failed.");
    }
    Json(Reply::ok())
}
