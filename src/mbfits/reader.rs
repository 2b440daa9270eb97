// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::{GroupingRow, MbfitsError, EMPTY_FEBE, GROUPING_FILE};
use crate::io::fits::{fits_get_col, fits_open, fits_open_hdu};

/// Reads back an MBFITS directory.
#[derive(Debug)]
pub struct MbfitsReader {
    dir: PathBuf,
    grouping: Vec<GroupingRow>,
    febes: Vec<String>,

    /// Times of the first subscan read; later subscans must match them.
    mjd: Option<Vec<f64>>,
}

impl MbfitsReader {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<MbfitsReader, MbfitsError> {
        let dir = dir.as_ref().to_path_buf();
        let grouping = read_grouping(&dir.join(GROUPING_FILE))?;
        let scan_file = grouping
            .iter()
            .find(|row| row.extname == "SCAN-MBFITS")
            .map(|row| dir.join(&row.member_location))
            .ok_or_else(|| MbfitsError::NoScanMember(dir.clone()))?;

        let mut fptr = fits_open(&scan_file)?;
        let hdu = fits_open_hdu(&mut fptr, "SCAN-MBFITS")?;
        let febes: Vec<String> = fits_get_col::<String>(&mut fptr, &hdu, "FEBE")?
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| f != EMPTY_FEBE)
            .collect();
        for febe in &febes {
            let febepar = dir.join(format!("{febe}-FEBEPAR.fits"));
            if !febepar.exists() {
                return Err(MbfitsError::MissingFebepar(febepar));
            }
        }
        debug!("{} has FEBEs {febes:?}", dir.display());

        Ok(MbfitsReader {
            dir,
            grouping,
            febes,
            mjd: None,
        })
    }

    pub fn grouping(&self) -> &[GroupingRow] {
        &self.grouping
    }

    pub fn febes(&self) -> &[String] {
        &self.febes
    }

    /// Locations of the ARRAYDATA members of a FEBE and baseband, in grouping
    /// order.
    pub fn list_scans(&self, febe: &str, baseband: i32) -> Vec<&str> {
        self.grouping
            .iter()
            .filter(|row| {
                row.extname == "ARRAYDATA-MBFITS" && row.febe == febe && row.baseband == baseband
            })
            .map(|row| row.member_location.as_str())
            .collect()
    }

    /// Read the samples of an ARRAYDATA member. The first member read fixes
    /// the times; a member whose times differ is skipped with a warning and
    /// `None` is returned.
    pub fn read_subscan(&mut self, member: &str) -> Result<Option<Vec<f64>>, MbfitsError> {
        let path = self.dir.join(member);
        let mut fptr = fits_open(&path)?;
        let hdu = fits_open_hdu(&mut fptr, "ARRAYDATA-MBFITS")?;
        let mjd: Vec<f64> = fits_get_col(&mut fptr, &hdu, "MJD")?;
        match &self.mjd {
            None => self.mjd = Some(mjd),
            Some(first) if !times_match(first, &mjd) => {
                warn!(
                    "{} has different times from the first subscan read; skipping it",
                    path.display()
                );
                return Ok(None);
            }
            Some(_) => (),
        }
        let data: Vec<f64> = fits_get_col(&mut fptr, &hdu, "DATA")?;
        Ok(Some(data))
    }
}

/// Element-wise closeness with a relative tolerance of 1e-5 and an absolute
/// tolerance of 1e-8.
fn times_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(&x, &y)| (x - y).abs() <= 1e-8 + 1e-5 * y.abs())
}

fn read_grouping(path: &Path) -> Result<Vec<GroupingRow>, MbfitsError> {
    let mut fptr = fits_open(path)?;
    let hdu = fits_open_hdu(&mut fptr, "GROUPING")?;
    let positions: Vec<i32> = fits_get_col(&mut fptr, &hdu, "MEMBER_POSITION")?;
    let locations: Vec<String> = fits_get_col(&mut fptr, &hdu, "MEMBER_LOCATION")?;
    let uri_types: Vec<String> = fits_get_col(&mut fptr, &hdu, "MEMBER_URI_TYPE")?;
    let extnames: Vec<String> = fits_get_col(&mut fptr, &hdu, "EXTNAME")?;
    let subsnums: Vec<i32> = fits_get_col(&mut fptr, &hdu, "SUBSNUM")?;
    let febes: Vec<String> = fits_get_col(&mut fptr, &hdu, "FEBE")?;
    let basebands: Vec<i32> = fits_get_col(&mut fptr, &hdu, "BASEBAND")?;

    let rows = positions
        .into_iter()
        .zip(locations)
        .zip(uri_types)
        .zip(extnames)
        .zip(subsnums)
        .zip(febes)
        .zip(basebands)
        .map(
            |((((((member_position, location), uri_type), extname), subsnum), febe), baseband)| {
                GroupingRow {
                    member_position,
                    member_location: location.trim().to_string(),
                    member_uri_type: uri_type.trim().to_string(),
                    extname: extname.trim().to_string(),
                    subsnum,
                    febe: febe.trim().to_string(),
                    baseband,
                }
            },
        )
        .collect();
    Ok(rows)
}
