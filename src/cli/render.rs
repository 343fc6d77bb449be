use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use mapstory::config::MapstoryConfig;
use mapstory::geocode::nominatim::NominatimClient;
use mapstory::memory::JsonFileSource;
use mapstory::{InteractiveMap, MapContext};

use super::{print_json, spinner, ViewArgs};

/// Render one frame for the memories in `path` and print it.
///
/// With `resolve`, unknown places are looked up first (one request at a
/// time, spaced by `geocoder.dispatch_delay_ms`), so the frame includes them.
pub async fn render(
    config: MapstoryConfig,
    path: &Path,
    view: &ViewArgs,
    resolve: bool,
) -> Result<()> {
    let source = JsonFileSource::open(path)?;
    let context = Arc::new(MapContext::new(config));

    let mut map = InteractiveMap::new(Arc::clone(&context));
    map.follow(&source);
    map.resize(view.size());
    let (center, zoom) = view.view(&context.config().map);
    map.set_view(center, zoom);

    let mut frame = map.render();

    if resolve && !frame.unmapped.is_empty() {
        let client = NominatimClient::new(&context.config().geocoder)
            .context("failed to create geocoding client")?;
        let mut revisions = context.subscribe_revisions();
        let worker = context.spawn_worker(Arc::new(client));

        let pb = spinner("geocoding places")?;
        loop {
            let (idle, queued) = context.with_resolver_mut(|r| (r.is_idle(), r.scheduler().pending_len()));
            if idle {
                break;
            }
            pb.set_message(format!("geocoding places, {queued} queued"));
            if revisions.changed().await.is_err() {
                break;
            }
        }
        pb.finish_and_clear();
        worker.shutdown().await;

        let dispatched = context.with_resolver_mut(|r| r.lookups_dispatched());
        tracing::info!(lookups = dispatched, "geocoding finished");
        frame = map.render();
    }

    print_json(&frame)
}
