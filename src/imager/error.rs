// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with making images.

use thiserror::Error;

use crate::scanset::ScanSetError;

#[derive(Error, Debug)]
pub enum ImagerError {
    #[error("Channel {channel} mixes data from feeds {feeds:?}; every channel must come from a single feed")]
    MixedFeeds { channel: String, feeds: Vec<usize> },

    #[error(transparent)]
    ScanSet(#[from] ScanSetError),
}
