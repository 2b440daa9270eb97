// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all sdtimager-related errors. This should be the *only*
//! error enum that is publicly visible from the binary.

use thiserror::Error;

use crate::{
    calibration::CalibrationError, config::ConfigError, imager::ImagerError,
    interactive::InteractiveError, io::write::ImageWriteError, mbfits::MbfitsError,
    scan::ScanError, scanset::ScanSetError,
};

/// The *only* publicly visible error from sdtimage. Each message should say
/// what the user can do about it, unless it's "generic".
#[derive(Error, Debug)]
pub enum SdtError {
    /// An error related to the config file.
    #[error("{0}\n\nA sample config can be printed with 'sdtimage sample-config'")]
    Config(String),

    /// An error related to reading, writing or assembling scans.
    #[error("{0}")]
    Scan(String),

    /// An error related to calibration tables.
    #[error("{0}\n\nCalibration tables are toml or json files with a 'default' factor and/or per-channel factors")]
    Calibration(String),

    /// An error related to making images.
    #[error("{0}")]
    Imaging(String),

    /// An error raised while editing scans interactively.
    #[error("{0}")]
    Interactive(String),

    /// An error related to MBFITS conversion.
    #[error("{0}")]
    Mbfits(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-v or -vv) and maybe disabling progress bars.")]
    Cfitsio(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<ConfigError> for SdtError {
    fn from(e: ConfigError) -> Self {
        let s = e.to_string();
        match e {
            ConfigError::Read { .. } | ConfigError::Glob(_) => Self::Generic(s),
            ConfigError::Parse { .. }
            | ConfigError::NoDataDir
            | ConfigError::UnknownProjection(_)
            | ConfigError::ZeroPixels
            | ConfigError::NonUtf8Path(_) => Self::Config(s),
        }
    }
}

impl From<ScanError> for SdtError {
    fn from(e: ScanError) -> Self {
        let s = e.to_string();
        match e {
            ScanError::Fits(_) | ScanError::Fitsio(_) => Self::Cfitsio(s),
            _ => Self::Scan(s),
        }
    }
}

impl From<ScanSetError> for SdtError {
    fn from(e: ScanSetError) -> Self {
        let s = e.to_string();
        match e {
            ScanSetError::Config(e) => Self::from(e),
            ScanSetError::Scan(e) => Self::from(e),
            ScanSetError::Fits(_) | ScanSetError::Fitsio(_) => Self::Cfitsio(s),
            ScanSetError::Wcs(_) => Self::Config(s),
            ScanSetError::NoScans
            | ScanSetError::UnknownScanId { .. }
            | ScanSetError::UnknownFeed { .. }
            | ScanSetError::MirrorMismatch { .. } => Self::Scan(s),
        }
    }
}

impl From<CalibrationError> for SdtError {
    fn from(e: CalibrationError) -> Self {
        let s = e.to_string();
        match e {
            CalibrationError::Read { .. } => Self::Generic(s),
            _ => Self::Calibration(s),
        }
    }
}

impl From<ImagerError> for SdtError {
    fn from(e: ImagerError) -> Self {
        let s = e.to_string();
        match e {
            ImagerError::ScanSet(e) => Self::from(e),
            ImagerError::MixedFeeds { .. } => Self::Imaging(s),
        }
    }
}

impl From<InteractiveError> for SdtError {
    fn from(e: InteractiveError) -> Self {
        let s = e.to_string();
        match e {
            InteractiveError::Input(e) => Self::from(e),
            InteractiveError::Scan(e) => Self::from(e),
            InteractiveError::ScanSet(e) => Self::from(e),
            InteractiveError::Imager(e) => Self::from(e),
            InteractiveError::OddBoundaryCount(_)
            | InteractiveError::UnknownChannel(_)
            | InteractiveError::MixedFeeds { .. }
            | InteractiveError::UnclassifiableDirection { .. }
            | InteractiveError::UnknownScan(_) => Self::Interactive(s),
        }
    }
}

impl From<ImageWriteError> for SdtError {
    fn from(e: ImageWriteError) -> Self {
        let s = e.to_string();
        match e {
            ImageWriteError::NoImages => Self::Imaging(s),
            ImageWriteError::Fits(_) | ImageWriteError::Fitsio(_) => Self::Cfitsio(s),
        }
    }
}

impl From<MbfitsError> for SdtError {
    fn from(e: MbfitsError) -> Self {
        let s = e.to_string();
        match e {
            MbfitsError::Fits(_) | MbfitsError::Fitsio(_) => Self::Cfitsio(s),
            MbfitsError::CreateDir { .. } => Self::Generic(s),
            MbfitsError::UnknownSite { .. }
            | MbfitsError::UnclassifiableDirection { .. }
            | MbfitsError::NoScanMember(_)
            | MbfitsError::MissingFebepar(_) => Self::Mbfits(s),
        }
    }
}

impl From<std::io::Error> for SdtError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
