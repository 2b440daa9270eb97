// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Converting images from counts to Jy.
//!
//! Factors come from anything implementing [`FluxCalibration`]. The provided
//! [`CalibratorTable`] reads them from a toml or json file:
//!
//! ```toml
//! [default]
//! factor = 0.01
//! error = 0.001
//!
//! [channels.Feed0_LCP]
//! factor = 0.0123
//! error = 0.0004
//! ```

mod error;
#[cfg(test)]
mod tests;

pub use error::CalibrationError;

use std::{fs::File, io::Read, path::Path, str::FromStr};

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use ndarray::{prelude::*, Zip};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::imager::{ImageMap, RawImage};

lazy_static::lazy_static! {
    static ref CALIBRATION_FILE_TYPES_COMMA_SEPARATED: String = CalibrationFileType::iter().join(", ");
}

#[derive(Debug, Display, EnumIter, EnumString)]
enum CalibrationFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

/// A source of counts-to-Jy conversion factors.
pub trait FluxCalibration {
    /// The Jy/counts factor for a channel and its uncertainty. A NaN factor
    /// means no calibration is available for the channel.
    fn jy_over_counts(&self, channel: &str) -> (f64, f64);
}

/// A conversion factor and its uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationFactor {
    pub factor: f64,
    #[serde(default)]
    pub error: f64,
}

/// Conversion factors per channel, with an optional fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibratorTable {
    /// Used for channels without their own entry.
    pub default: Option<CalibrationFactor>,

    #[serde(default)]
    pub channels: IndexMap<String, CalibrationFactor>,
}

impl CalibratorTable {
    /// Read a table from a toml or json file, chosen by file extension.
    pub fn read<P: AsRef<Path>>(file: P) -> Result<CalibratorTable, CalibrationError> {
        let file = file.as_ref();
        debug!("Reading calibration table {}", file.display());
        let file_type = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| CalibrationFileType::from_str(&e).ok())
            .ok_or_else(|| CalibrationError::UnknownExtension {
                file: file.to_path_buf(),
                valid: CALIBRATION_FILE_TYPES_COMMA_SEPARATED.clone(),
            })?;

        let mut contents = String::new();
        File::open(file)
            .and_then(|mut fh| fh.read_to_string(&mut contents))
            .map_err(|e| CalibrationError::Read {
                file: file.to_path_buf(),
                err: e,
            })?;
        let decode_error = |err: String| CalibrationError::Decode {
            file: file.to_path_buf(),
            file_type: file_type.to_string(),
            err,
        };
        let table = match file_type {
            CalibrationFileType::Toml => {
                toml::from_str(&contents).map_err(|e| decode_error(e.to_string()))?
            }
            CalibrationFileType::Json => {
                serde_json::from_str(&contents).map_err(|e| decode_error(e.to_string()))?
            }
        };
        Ok(table)
    }
}

impl FluxCalibration for CalibratorTable {
    fn jy_over_counts(&self, channel: &str) -> (f64, f64) {
        match self.channels.get(channel).or(self.default.as_ref()) {
            Some(c) => (c.factor, c.error),
            None => (f64::NAN, f64::NAN),
        }
    }
}

/// What happened to each channel during calibration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalibrationReport {
    pub calibrated: Vec<String>,

    /// Channels left in counts because no factor was available.
    pub skipped: Vec<String>,
}

/// Convert every channel of `images` to Jy.
///
/// The uncalibrated maps are kept as the channel's raw maps. Pixels with a NaN
/// variance, or a zero or NaN mean, can't be propagated through the relative
/// error formula; they are set to a mean of 1 and a variance of 0 first, and
/// marked in the channel's coerced mask. Pixels with no exposure end up with
/// a mean and variance of 0, as they were before calibration.
pub fn calibrate_images(
    images: &mut ImageMap,
    calibration: &dyn FluxCalibration,
) -> CalibrationReport {
    let mut report = CalibrationReport::default();
    for (name, image) in images.channels.iter_mut() {
        let (factor, factor_err) = calibration.jy_over_counts(name);
        if factor.is_nan() {
            warn!("The Jy/counts factor for {name} is NaN; leaving it uncalibrated");
            report.skipped.push(name.clone());
            continue;
        }

        let raw = RawImage {
            mean: image.mean.clone(),
            sdev: image.sdev.clone(),
        };
        let mut mean = image.mean.clone();
        let mut var = image.sdev.clone();
        let mut coerced = Array2::from_elem(mean.dim(), false);
        Zip::from(&mut mean)
            .and(&mut var)
            .and(&mut coerced)
            .and(&image.expo)
            .for_each(|m, v, c, &e| {
                if v.is_nan() {
                    *m = 1.0;
                    *v = 0.0;
                    *c = true;
                }
                if *m == 0.0 || m.is_nan() {
                    *m = 1.0;
                    *v = 0.0;
                    *c = true;
                }
                let calibrated = *m * factor;
                *v = calibrated * (*v / *m + factor_err / factor);
                *m = calibrated;
                // Empty pixels keep their raw (zero) sums.
                if e == 0.0 {
                    *m = 0.0;
                    *v = 0.0;
                }
            });

        image.mean = mean;
        image.sdev = var;
        image.raw = Some(raw);
        image.coerced = Some(coerced);
        report.calibrated.push(name.clone());
    }
    debug!(
        "Calibrated {} channels; {} left in counts",
        report.calibrated.len(),
        report.skipped.len()
    );
    report
}
