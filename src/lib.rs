// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Imaging and calibration of single-dish "on-the-fly" radio-telescope scans.

Many scans are aggregated into a [`ScanSet`], their sky coordinates projected
onto a pixel grid, and per-pixel flux, variance and exposure maps accumulated
per channel. Maps can be converted to Jy with a [`FluxCalibration`], refined
interactively by re-filtering the scans behind a pixel, and written out as
multi-extension FITS images. Scans can also be repackaged into the MBFITS
interchange format (see [`mbfits`]).
 */

pub mod calibration;
mod cli;
pub mod config;
pub mod constants;
pub mod imager;
pub mod interactive;
pub(crate) mod io;
pub(crate) mod math;
pub mod mbfits;
pub mod scan;
pub mod scanset;
pub mod wcs;

#[cfg(test)]
mod tests;

// Re-exports.
pub use calibration::{CalibratorTable, FluxCalibration};
pub use cli::{Sdt, SdtError};
pub use config::SdtConfig;
pub use imager::{ChannelImage, ImageMap, ImagingOptions};
pub use io::write::{write_images, ImageWriteError, ImageWriteOptions};
pub use scan::{FitsScanStore, Scan, ScanStore};
pub use scanset::{ScanSet, ScanSetSource};
pub use wcs::{Projection, SkyWcs};

use crossbeam_utils::atomic::AtomicCell;

lazy_static::lazy_static! {
    /// Should progress bars be drawn? Only the binary turns these on.
    pub(crate) static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}
