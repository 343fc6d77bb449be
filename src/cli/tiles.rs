use anyhow::Result;

use mapstory::config::MapstoryConfig;
use mapstory::render::tile_layers;

use super::ViewArgs;

/// Print the fallback and primary tile URLs for a view, in draw order.
pub fn tiles(config: &MapstoryConfig, args: &ViewArgs) -> Result<()> {
    let view = args.clamped_view(&config.map);
    let (fallback, primary) = tile_layers(&view, args.size(), &config.tiles.url_template);

    println!("View: {} @ zoom {:.2}", view.center, view.zoom);
    println!("{}", "=".repeat(40));
    println!("Fallback ({} tiles):", fallback.len());
    for tile in &fallback {
        println!("  {:<14} {}", tile.key, tile.url);
    }
    println!();
    println!("Primary ({} tiles):", primary.len());
    for tile in &primary {
        println!("  {:<14} {}", tile.key, tile.url);
    }
    println!();
    println!("{}", config.tiles.attribution);
    Ok(())
}
