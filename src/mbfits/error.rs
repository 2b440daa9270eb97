// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from writing and reading MBFITS directories.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::fits::FitsError;

#[derive(Error, Debug)]
pub enum MbfitsError {
    #[error("Couldn't create directory {}: {err}", dir.display())]
    CreateDir { dir: PathBuf, err: std::io::Error },

    #[error("Unknown site '{site}'; known sites are: {valid}")]
    UnknownSite { site: String, valid: String },

    #[error("Couldn't work out whether subscan {subscan} ({channel}) moves in equatorial or horizontal coordinates")]
    UnclassifiableDirection { subscan: i64, channel: String },

    #[error("{} doesn't list a SCAN-MBFITS member", .0.display())]
    NoScanMember(PathBuf),

    #[error("Expected a FEBEPAR file at {}", .0.display())]
    MissingFebepar(PathBuf),

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),
}
