use anyhow::{Context, Result};

use mapstory::config::MapstoryConfig;
use mapstory::geocode::nominatim::NominatimClient;
use mapstory::geocode::{gazetteer, lookup_first};

use super::spinner;

/// Resolve one place name: built-in table first, else a single external lookup.
pub async fn geocode(config: &MapstoryConfig, name: &str) -> Result<()> {
    if let Some(point) = gazetteer::lookup(name) {
        println!("{name}: {point} (built-in)");
        return Ok(());
    }

    let client = NominatimClient::new(&config.geocoder).context("failed to create geocoding client")?;
    let pb = spinner(format!("looking up {name}"))?;
    let result = lookup_first(&client, name).await;
    pb.finish_and_clear();

    match result.with_context(|| format!("lookup failed for {name:?}"))? {
        Some(point) => {
            println!("{name}: {point}");
            Ok(())
        }
        None => anyhow::bail!("no coordinates found for {name:?}"),
    }
}
