// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with calibration tables.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Calibration table {file:?} doesn't have a recognised file extension! Valid extensions are: {valid}")]
    UnknownExtension { file: PathBuf, valid: String },

    #[error("Couldn't read calibration table {file:?}: {err}")]
    Read { file: PathBuf, err: std::io::Error },

    #[error("Couldn't decode {file_type} structure from {file:?}:\n{err}")]
    Decode {
        file: PathBuf,
        file_type: String,
        err: String,
    },
}
