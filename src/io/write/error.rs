// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from writing images.

use thiserror::Error;

use crate::io::fits::FitsError;

#[derive(Error, Debug)]
pub enum ImageWriteError {
    #[error("There are no images to write")]
    NoImages,

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),
}
