//! HTTP surface: one Server-Sent-Events endpoint per dataset.
//!
//! Each connection gets its own emitter over the shared dataset, so two
//! dashboard tabs replay independently. A client closing the connection
//! cancels that emitter within one tick; process shutdown cancels them all
//! through a shared token.

pub mod shutdown;

use crate::replaystream::dataset::Dataset;
use crate::replaystream::emitter::{Emitter, EmitterConfig};
use crate::replaystream::normalize::Normalizer;
use crate::replaystream::sink::sse::DEFAULT_CHANNEL_CAPACITY;
use crate::replaystream::sink::{SseSink, StreamFrame, END_OF_DATA};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures::Stream;
use log::info;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

/// Everything needed to serve one dataset's stream endpoint.
pub struct DatasetStream {
    pub name: String,
    pub dataset: Arc<Dataset>,
    pub normalizer: Option<Normalizer>,
    pub emitter_config: EmitterConfig,
}

/// Build the router: `GET /{name}-stream` per dataset plus `GET /health`.
pub fn build_router(streams: Vec<Arc<DatasetStream>>, cancel: CancellationToken) -> Router {
    let mut router = Router::new().route("/health", get(health));

    for stream in streams {
        let path = format!("/{}-stream", stream.name);
        info!("serving dataset '{}' at {}", stream.name, path);
        router = router.route(
            &path,
            get({
                let cancel = cancel.clone();
                move || serve_stream(stream.clone(), cancel.clone())
            }),
        );
    }

    router.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Bind and serve until a shutdown signal arrives, then cancel every live
/// emitter and stop accepting connections.
pub async fn serve(
    addr: SocketAddr,
    streams: Vec<Arc<DatasetStream>>,
    cancel: CancellationToken,
) -> Result<(), std::io::Error> {
    let app = build_router(streams, cancel.clone());
    let listener = TcpListener::bind(addr).await?;
    info!("server is running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown::shutdown_signal().await;
            cancel.cancel();
        })
        .await
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// One SSE connection: spawn a dedicated emitter and relay its frames.
async fn serve_stream(
    stream: Arc<DatasetStream>,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (sink, mut rx) = SseSink::channel(DEFAULT_CHANNEL_CAPACITY);

    let mut emitter = Emitter::new(stream.name.clone(), Arc::clone(&stream.dataset), sink)
        .with_config(stream.emitter_config.clone());
    if let Some(normalizer) = &stream.normalizer {
        emitter = emitter.with_normalizer(normalizer.clone());
    }

    // Child token: process shutdown cancels every connection, one client
    // going away only ends its own emitter (via channel closure).
    tokio::spawn(emitter.run(shutdown.child_token()));

    let frames = async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            match frame {
                StreamFrame::Data(json) => {
                    yield Ok::<Event, Infallible>(Event::default().data(json));
                }
                StreamFrame::End => {
                    yield Ok::<Event, Infallible>(Event::default().data(END_OF_DATA));
                    break;
                }
            }
        }
    };

    Sse::new(frames).keep_alive(KeepAlive::default())
}
