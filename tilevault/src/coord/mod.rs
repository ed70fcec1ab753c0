//! Slippy-map tile coordinate math.
//!
//! Pure conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile indices, plus tile-count and download-size
//! estimation for a bounding box across a zoom range.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A geographic bounding box in degrees.
///
/// Boxes that cross the antimeridian (`west > east`) are not supported;
/// callers must not construct them. Behavior for such boxes is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Southern edge latitude.
    pub south: f64,
    /// Western edge longitude.
    pub west: f64,
    /// Northern edge latitude.
    pub north: f64,
    /// Eastern edge longitude.
    pub east: f64,
}

impl GeoBounds {
    /// Create a bounding box from its four edges.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }
}

/// Inclusive tile index range covering a bounding box at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    pub zoom: u8,
}

impl TileRange {
    /// Number of tiles in this range.
    pub fn count(&self) -> u64 {
        (self.max_x - self.min_x + 1) as u64 * (self.max_y - self.min_y + 1) as u64
    }

    /// Iterate over all (x, y) index pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let (min_y, max_y) = (self.min_y, self.max_y);
        (self.min_x..=self.max_x).flat_map(move |x| (min_y..=max_y).map(move |y| (x, y)))
    }
}

/// Converts a longitude to a tile X index at the given zoom level.
///
/// The result is clamped to `[0, 2^zoom - 1]`, so the antimeridian
/// (longitude 180) maps to the last column rather than one past it.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> u32 {
    let n = 2.0_f64.powi(zoom as i32);
    let x = ((lon + 180.0) / 360.0 * n) as u32;
    x.min(max_tile_index(zoom))
}

/// Converts a latitude to a tile Y index at the given zoom level.
///
/// Uses the Web Mercator projection: tile rows increase southward while
/// latitude increases northward. The result is clamped to
/// `[0, 2^zoom - 1]`; latitudes beyond the Mercator cutoff land on the
/// first or last row.
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> u32 {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32;
    y.min(max_tile_index(zoom))
}

#[inline]
fn max_tile_index(zoom: u8) -> u32 {
    if zoom >= 32 {
        u32::MAX
    } else {
        (1u32 << zoom) - 1
    }
}

/// Computes the tile index range covering `bounds` at `zoom`.
///
/// The Y axis is inverted relative to latitude: the northern edge maps to
/// `min_y` and the southern edge to `max_y`.
pub fn tile_range(bounds: &GeoBounds, zoom: u8) -> TileRange {
    TileRange {
        min_x: lon_to_tile_x(bounds.west, zoom),
        max_x: lon_to_tile_x(bounds.east, zoom),
        min_y: lat_to_tile_y(bounds.north, zoom),
        max_y: lat_to_tile_y(bounds.south, zoom),
        zoom,
    }
}

/// Total tile count for a bounding box across several zoom levels.
pub fn count_tiles(bounds: &GeoBounds, zooms: &[u8]) -> u64 {
    zooms.iter().map(|&z| tile_range(bounds, z).count()).sum()
}

/// Estimated download size in megabytes, rounded to one decimal place.
///
/// Uses a fixed assumed average tile size; this is a coarse approximation,
/// not a measurement. A single small request rounds down to `0.0`.
pub fn estimate_size_mb(bounds: &GeoBounds, zooms: &[u8], avg_tile_kb: u64) -> f64 {
    let tiles = count_tiles(bounds, zooms);
    let mb = (tiles * avg_tile_kb) as f64 / 1024.0;
    (mb * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_x_at_origin() {
        // Longitude 0 at zoom 1 falls on the second column.
        assert_eq!(lon_to_tile_x(0.0, 1), 1);
        assert_eq!(lon_to_tile_x(-180.0, 1), 0);
    }

    #[test]
    fn test_tile_y_at_equator() {
        // The equator at zoom 1 falls on the second row.
        assert_eq!(lat_to_tile_y(0.0, 1), 1);
    }

    #[test]
    fn test_known_city_tile() {
        // Saint Petersburg city centre (59.93, 30.34) at zoom 12.
        assert_eq!(lon_to_tile_x(30.34, 12), 2393);
        assert_eq!(lat_to_tile_y(59.93, 12), 1191);
    }

    #[test]
    fn test_boundary_coordinates_clamp_to_grid() {
        // The antimeridian and the poles land on the edge tiles, never
        // one past them.
        assert_eq!(lon_to_tile_x(180.0, 4), 15);
        assert_eq!(lon_to_tile_x(-180.0, 4), 0);
        assert_eq!(lat_to_tile_y(-90.0, 4), 15);
        assert_eq!(lat_to_tile_y(90.0, 4), 0);
        assert_eq!(lon_to_tile_x(180.0, 0), 0);
    }

    #[test]
    fn test_range_y_inversion() {
        let bounds = GeoBounds::new(59.0, 30.0, 60.0, 31.0);
        let range = tile_range(&bounds, 10);
        // North edge gives the smaller row index.
        assert!(range.min_y <= range.max_y);
        assert_eq!(range.min_y, lat_to_tile_y(60.0, 10));
        assert_eq!(range.max_y, lat_to_tile_y(59.0, 10));
    }

    #[test]
    fn test_single_tile_bounds() {
        // A box small enough to land inside one tile at zoom 12.
        let bounds = GeoBounds::new(59.80, 30.20, 59.81, 30.21);
        let range = tile_range(&bounds, 12);
        assert_eq!(range.count(), 1);
        assert_eq!(count_tiles(&bounds, &[12]), 1);
    }

    #[test]
    fn test_range_iter_row_major() {
        let range = TileRange {
            min_x: 2,
            max_x: 3,
            min_y: 5,
            max_y: 6,
            zoom: 8,
        };
        let pairs: Vec<_> = range.iter().collect();
        assert_eq!(pairs, vec![(2, 5), (2, 6), (3, 5), (3, 6)]);
        assert_eq!(pairs.len() as u64, range.count());
    }

    #[test]
    fn test_count_sums_zoom_levels() {
        let bounds = GeoBounds::new(59.0, 30.0, 60.0, 31.0);
        let total = count_tiles(&bounds, &[10, 11]);
        let per_zoom = tile_range(&bounds, 10).count() + tile_range(&bounds, 11).count();
        assert_eq!(total, per_zoom);
    }

    #[test]
    fn test_estimate_rounds_single_tile_to_zero() {
        // One 15KB tile is 0.0146 MB, which rounds to 0.0.
        let bounds = GeoBounds::new(59.80, 30.20, 59.81, 30.21);
        assert_eq!(estimate_size_mb(&bounds, &[12], 15), 0.0);
    }

    #[test]
    fn test_estimate_one_decimal() {
        // 100 tiles * 15KB = 1500KB = 1.46MB -> 1.5
        let bounds = GeoBounds::new(59.80, 30.20, 59.81, 30.21);
        let mb = (100u64 * 15) as f64 / 1024.0;
        assert_eq!((mb * 10.0).round() / 10.0, 1.5);
        // The public function agrees for a genuine one-tile box.
        assert_eq!(estimate_size_mb(&bounds, &[12], 1536), 1.5);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_tile_indices_in_bounds(
                lat in -90.0..=90.0_f64,
                lon in -180.0..=180.0_f64,
                zoom in 0u8..=18
            ) {
                let max_tile = 2u64.pow(zoom as u32);
                let x = lon_to_tile_x(lon, zoom) as u64;
                let y = lat_to_tile_y(lat, zoom) as u64;

                prop_assert!(x < max_tile, "x {} exceeds maximum {} at zoom {}", x, max_tile, zoom);
                prop_assert!(y < max_tile, "y {} exceeds maximum {} at zoom {}", y, max_tile, zoom);
            }

            #[test]
            fn test_longitude_monotonic(
                lon1 in -180.0..-90.0_f64,
                lon2 in -90.0..0.0_f64,
                zoom in 10u8..=15
            ) {
                let x1 = lon_to_tile_x(lon1, zoom);
                let x2 = lon_to_tile_x(lon2, zoom);
                prop_assert!(
                    x1 < x2,
                    "longitude not monotonic: lon {} (x {}) >= lon {} (x {})",
                    lon1, x1, lon2, x2
                );
            }

            #[test]
            fn test_latitude_anti_monotonic(
                lat1 in 10.0..80.0_f64,
                lat2 in -80.0..-10.0_f64,
                zoom in 10u8..=15
            ) {
                // Higher latitude means a smaller row index.
                let y_north = lat_to_tile_y(lat1, zoom);
                let y_south = lat_to_tile_y(lat2, zoom);
                prop_assert!(y_north < y_south);
            }

            #[test]
            fn test_range_count_consistent(
                south in -60.0..59.0_f64,
                west in -170.0..169.0_f64,
                zoom in 0u8..=12
            ) {
                let bounds = GeoBounds::new(south, west, south + 0.5, west + 0.5);
                let range = tile_range(&bounds, zoom);
                prop_assert!(range.min_x <= range.max_x);
                prop_assert!(range.min_y <= range.max_y);
                prop_assert_eq!(range.iter().count() as u64, range.count());
            }
        }
    }
}
