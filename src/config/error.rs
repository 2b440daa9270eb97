// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading config files.

use std::path::PathBuf;

use thiserror::Error;

use crate::{io::GlobError, wcs::PROJECTIONS_COMMA_SEPARATED};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Couldn't read config file {}: {err}", file.display())]
    Read { file: PathBuf, err: std::io::Error },

    #[error("Couldn't decode toml structure from {}:\n{err}", file.display())]
    Parse { file: PathBuf, err: String },

    #[error("The config doesn't specify 'datadir' in its [local] table")]
    NoDataDir,

    #[error("Unknown projection '{0}'; supported projections are: {}", *PROJECTIONS_COMMA_SEPARATED)]
    UnknownProjection(String),

    #[error("The pixel grid ('npix') can't have zero pixels on an axis")]
    ZeroPixels,

    #[error("Path {} isn't valid UTF-8, so it can't be globbed", .0.display())]
    NonUtf8Path(PathBuf),

    #[error(transparent)]
    Glob(#[from] GlobError),
}
