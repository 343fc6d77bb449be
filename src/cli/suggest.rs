use anyhow::{Context, Result};
use tokio::time::Instant;

use mapstory::config::MapstoryConfig;
use mapstory::geocode::autocomplete::{fetch, AddressAutocomplete, InputAction};
use mapstory::geocode::nominatim::NominatimClient;

use super::spinner;

/// Print address suggestions for `query`, as the editor's typeahead would show them.
pub async fn suggest(config: &MapstoryConfig, query: &str) -> Result<()> {
    let mut autocomplete = AddressAutocomplete::new(&config.autocomplete);
    let due = match autocomplete.on_input(query, Instant::now()) {
        InputAction::Cleared => {
            println!(
                "Type at least {} characters to get suggestions.",
                config.autocomplete.min_chars
            );
            return Ok(());
        }
        InputAction::Scheduled(due) => due,
    };

    let client = NominatimClient::new(&config.geocoder).context("failed to create geocoding client")?;
    let pb = spinner(format!("searching {query}"))?;
    tokio::time::sleep_until(due).await;
    let Some(pending) = autocomplete.poll(Instant::now()) else {
        pb.finish_and_clear();
        return Ok(());
    };
    let result = fetch(&client, &pending, autocomplete.limit()).await;
    pb.finish_and_clear();

    let result = result.with_context(|| format!("suggestion lookup failed for {query:?}"))?;
    autocomplete.apply(&pending, Ok(result));

    if !autocomplete.is_open() {
        println!("No suggestions for {query:?}.");
        return Ok(());
    }
    for (i, place) in autocomplete.suggestions().iter().enumerate() {
        println!("  {}. {}", i + 1, place.display_name);
    }
    Ok(())
}
