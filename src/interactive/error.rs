// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from the interactive editing loop.

use thiserror::Error;

use crate::{imager::ImagerError, scan::ScanError, scanset::ScanSetError};

#[derive(Error, Debug)]
pub enum InteractiveError {
    #[error("Got {0} interval boundaries; boundaries must come in pairs")]
    OddBoundaryCount(usize),

    #[error("Channel {0} is not in the scan set")]
    UnknownChannel(String),

    #[error("Channel {channel} mixes data from feeds {feeds:?}")]
    MixedFeeds { channel: String, feeds: Vec<usize> },

    #[error("Could not work out the scan direction of scan {scan_id}; it has no finite coordinates")]
    UnclassifiableDirection { scan_id: usize },

    #[error("Scan ID {0} does not refer to a scan file")]
    UnknownScan(usize),

    #[error("Couldn't read user input: {0}")]
    Input(#[from] std::io::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    ScanSet(#[from] ScanSetError),

    #[error(transparent)]
    Imager(#[from] ImagerError),
}
