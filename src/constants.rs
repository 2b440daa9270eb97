// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All angles stored in scans and scan sets are in radians. Degrees only appear
at the WCS boundary, because FITS WCS keywords are in degrees.
 */

use marlu::LatLngHeight;

/// The projection used when a config file doesn't specify one.
pub const DEFAULT_PROJECTION: &str = "ARC";

/// The interpolation kind written into new configs. Reserved; nothing reads
/// it after the config is parsed.
pub const DEFAULT_INTERPOLATION: &str = "linear";

/// The pixel grid used when a config file doesn't specify one.
pub const DEFAULT_NPIX: [usize; 2] = [32, 32];

/// When merging channels, only pixels with an exposure above this percentile
/// of the exposure map are kept.
pub const SCRUNCH_EXPOSURE_PERCENTILE: f64 = 10.0;

/// Samples this close (in pixels) to the outer edges of the grid are put in
/// the edge bins rather than dropped as out-of-bounds. The grid is sized from
/// the coordinate range, so the extreme samples sit on the edges.
pub const GRID_EDGE_TOLERANCE: f64 = 1e-6;

/// Rows within this many pixels of a selected pixel (on both axes) belong to
/// the selection in the interactive loop.
pub const PIXEL_SELECTION_RADIUS: f64 = 1.0;

/// The baseband every MBFITS ARRAYDATA file is written for.
pub const MBFITS_BASEBAND: i32 = 1;

/// Placeholder for "not applicable" integers in MBFITS grouping rows.
pub const MBFITS_NULL_INT: i32 = -999;

/// Sardinia Radio Telescope.
pub const SRT_POSITION: LatLngHeight = LatLngHeight {
    longitude_rad: 0.161_353_748_418_925,
    latitude_rad: 0.689_277_316_538_659,
    height_metres: 600.0,
};

/// Medicina 32m dish.
pub const MEDICINA_POSITION: LatLngHeight = LatLngHeight {
    longitude_rad: 0.203_277_946_925_398,
    latitude_rad: 0.777_024_891_452_098,
    height_metres: 28.0,
};

/// Noto 32m dish.
pub const NOTO_POSITION: LatLngHeight = LatLngHeight {
    longitude_rad: 0.261_604_700_706_893,
    latitude_rad: 0.643_606_958_232_126,
    height_metres: 90.0,
};
