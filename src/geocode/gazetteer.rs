//! Built-in table of well-known places.
//!
//! Checked before the cache or any network call. Matching is exact first,
//! then the first entry (in table order) whose name occurs inside the query,
//! so `"Altstadt, Köln"` resolves to Köln.

use crate::geo::GeoPoint;

const CITIES: &[(&str, GeoPoint)] = &[
    // Germany / DACH
    ("Berlin", GeoPoint::new(52.52, 13.405)),
    ("München", GeoPoint::new(48.135, 11.582)),
    ("Munich", GeoPoint::new(48.135, 11.582)),
    ("Hamburg", GeoPoint::new(53.551, 9.993)),
    ("Köln", GeoPoint::new(50.937, 6.96)),
    ("Cologne", GeoPoint::new(50.937, 6.96)),
    ("Frankfurt", GeoPoint::new(50.11, 8.682)),
    ("Stuttgart", GeoPoint::new(48.775, 9.182)),
    ("Düsseldorf", GeoPoint::new(51.227, 6.773)),
    ("Leipzig", GeoPoint::new(51.339, 12.373)),
    ("Dresden", GeoPoint::new(51.05, 13.737)),
    ("Hannover", GeoPoint::new(52.375, 9.732)),
    ("Nürnberg", GeoPoint::new(49.452, 11.076)),
    ("Wien", GeoPoint::new(48.208, 16.373)),
    ("Vienna", GeoPoint::new(48.208, 16.373)),
    ("Zürich", GeoPoint::new(47.376, 8.541)),
    ("Zurich", GeoPoint::new(47.376, 8.541)),
    ("Bern", GeoPoint::new(46.948, 7.447)),
    ("Salzburg", GeoPoint::new(47.809, 13.055)),
    ("Innsbruck", GeoPoint::new(47.269, 11.404)),
    ("Basel", GeoPoint::new(47.559, 7.588)),
    // International
    ("Paris", GeoPoint::new(48.856, 2.352)),
    ("London", GeoPoint::new(51.507, -0.127)),
    ("Rom", GeoPoint::new(41.902, 12.496)),
    ("Rome", GeoPoint::new(41.902, 12.496)),
    ("Barcelona", GeoPoint::new(41.385, 2.173)),
    ("Madrid", GeoPoint::new(40.416, -3.703)),
    ("Mallorca", GeoPoint::new(39.695, 3.017)),
    ("Palma", GeoPoint::new(39.569, 2.65)),
    ("Amsterdam", GeoPoint::new(52.367, 4.904)),
    ("Prag", GeoPoint::new(50.075, 14.437)),
    ("Prague", GeoPoint::new(50.075, 14.437)),
    ("Budapest", GeoPoint::new(47.497, 19.04)),
    ("NewYork", GeoPoint::new(40.712, -74.006)),
    ("NYC", GeoPoint::new(40.712, -74.006)),
    ("Dubai", GeoPoint::new(25.204, 55.27)),
    ("Bangkok", GeoPoint::new(13.756, 100.501)),
    ("Tokio", GeoPoint::new(35.676, 139.65)),
    ("Tokyo", GeoPoint::new(35.676, 139.65)),
    ("Sydney", GeoPoint::new(-33.868, 151.209)),
    ("Kapstadt", GeoPoint::new(-33.924, 18.424)),
    ("Gardasee", GeoPoint::new(45.604, 10.635)),
    ("Venedig", GeoPoint::new(45.44, 12.315)),
    ("Mailand", GeoPoint::new(45.464, 9.19)),
];

/// Look up a place name. The name is trimmed; matching is case-sensitive.
pub fn lookup(name: &str) -> Option<GeoPoint> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    CITIES
        .iter()
        .find(|(city, _)| *city == name)
        .or_else(|| CITIES.iter().find(|(city, _)| name.contains(city)))
        .map(|&(_, point)| point)
}
