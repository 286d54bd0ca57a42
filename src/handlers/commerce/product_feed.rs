use crate::{events::CatalogEvent, AppState};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{stream, Stream, StreamExt};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Server-sent catalog feed.
///
/// A new observer first receives a `products` event with the whole catalog,
/// then one `product-created` event per product created afterwards. The
/// subscription is taken before the snapshot is read, so a product created
/// in between shows up in the snapshot, the stream, or both, never neither.
pub async fn product_feed(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.feed.subscribe();
    let snapshot = state.services.products.all().await;
    info!(products = snapshot.len(), "Feed observer connected");

    let initial = stream::once(async move { to_sse(CatalogEvent::ProductsSnapshot(snapshot)) });
    let updates = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((to_sse(event), receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Feed observer fell behind; events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(initial.chain(updates)).keep_alive(KeepAlive::default())
}

fn to_sse(event: CatalogEvent) -> Result<Event, Infallible> {
    let name = event.name();
    match Event::default().event(name).json_data(&event) {
        Ok(sse) => Ok(sse),
        Err(err) => {
            warn!(event = name, error = %err, "Failed to encode feed event");
            Ok(Event::default().comment("encoding error"))
        }
    }
}
