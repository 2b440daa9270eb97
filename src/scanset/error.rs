// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with building scan sets.

use thiserror::Error;

use crate::{config::ConfigError, io::fits::FitsError, scan::ScanError, wcs::WcsError};

#[derive(Error, Debug)]
pub enum ScanSetError {
    #[error("No usable scans were found; check the data directory and directory list in the config")]
    NoScans,

    #[error("Row {row} refers to scan {scan_id}, but only {num_scans} scans are listed")]
    UnknownScanId {
        row: usize,
        scan_id: usize,
        num_scans: usize,
    },

    #[error("Row {row} of channel {channel} uses feed {feed}, but the scan set only has {num_feeds} feeds")]
    UnknownFeed {
        channel: String,
        row: usize,
        feed: i64,
        num_feeds: usize,
    },

    #[error("Scan {scan_id} has {scan_samples} samples, but the scan set holds {rows} rows for it")]
    MirrorMismatch {
        scan_id: usize,
        scan_samples: usize,
        rows: usize,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wcs(#[from] WcsError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),
}
