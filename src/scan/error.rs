// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading and writing scans.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::fits::FitsError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Scan array '{what}' has shape {got:?}, but {expected:?} was expected")]
    Shape {
        what: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Scan file {} doesn't exist", .0.display())]
    NotFound(PathBuf),

    #[error("Scans need coordinates for at least one feed")]
    NoFeeds,

    #[error("'{0}' isn't a channel name; channels are named like 'Feed0_LCP' or 'Ch0'")]
    BadChannelName(String),

    #[error("Channel '{channel}' is on feed {feed}, but the scan only has {num_feeds} feeds")]
    FeedOutOfRange {
        channel: String,
        feed: usize,
        num_feeds: usize,
    },

    #[error("Channel '{channel}' was recorded on feed {feed}, which disagrees with its name")]
    FeedMismatch { channel: String, feed: usize },

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),
}
