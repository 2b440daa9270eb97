// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Repackaging scans into MBFITS directories.
//!
//! An MBFITS directory holds:
//! - `GROUPING.fits`, indexing every other file (one row per member, in the
//!   order members were added);
//! - `SCAN.fits`, listing the feed-backend combinations (FEBEs) present;
//! - `<FEBE>-FEBEPAR.fits` for every FEBE;
//! - `<subscan>/<FEBE>-DATAPAR.fits` (times and pointing) and
//!   `<subscan>/<FEBE>-ARRAYDATA-1.fits` (samples) for every subscan and FEBE.

mod error;
mod reader;

pub use error::MbfitsError;
pub use reader::MbfitsReader;

use std::path::{Path, PathBuf};

use fitsio::{
    hdu::FitsHdu,
    tables::{ColumnDataType, ColumnDescription, ConcreteColumnDescription},
    FitsFile,
};
use hifitime::{Duration, Epoch};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use marlu::{precession::get_lmst, LatLngHeight};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::{
        MBFITS_BASEBAND, MBFITS_NULL_INT, MEDICINA_POSITION, NOTO_POSITION, SRT_POSITION,
    },
    io::fits::{fits_create, fits_get_optional_key, fits_get_required_key, fits_open, fits_open_hdu},
    scan::{Scan, ScanChannel, SkyAxis},
    wcs::CardValue,
};

pub const GROUPING_FILE: &str = "GROUPING.fits";
pub const SCAN_FILE: &str = "SCAN.fits";

/// Written into SCAN.fits until the first FEBE is added.
const EMPTY_FEBE: &str = "EMPTY";

lazy_static::lazy_static! {
    static ref SITES_COMMA_SEPARATED: String = Site::iter().join(", ");
}

/// Telescopes with known positions.
#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum Site {
    #[strum(serialize = "srt")]
    Srt,
    #[strum(serialize = "medicina")]
    Medicina,
    #[strum(serialize = "noto")]
    Noto,
}

impl Site {
    pub fn position(self) -> LatLngHeight {
        match self {
            Site::Srt => SRT_POSITION,
            Site::Medicina => MEDICINA_POSITION,
            Site::Noto => NOTO_POSITION,
        }
    }
}

/// One row of the GROUPING table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingRow {
    pub member_position: i32,

    /// Relative to the MBFITS directory.
    pub member_location: String,
    pub member_uri_type: String,
    pub extname: String,
    pub subsnum: i32,
    pub febe: String,
    pub baseband: i32,
}

impl GroupingRow {
    fn member(location: String, extname: &str, subsnum: i32, febe: &str, baseband: i32) -> Self {
        GroupingRow {
            member_position: 2,
            member_location: location,
            member_uri_type: "URL".to_string(),
            extname: extname.to_string(),
            subsnum,
            febe: febe.to_string(),
            baseband,
        }
    }
}

/// The FEBE name of a scan channel, e.g. `CCB0LCP-TP`.
pub fn febe_name(scan: &Scan, channel: &ScanChannel) -> String {
    format!(
        "{}{}{}-{}",
        scan.meta.receiver, channel.feed, channel.polarization, scan.meta.backend
    )
}

/// MBFITS polarisation type for a polarisation name: its first letter
/// doubled, with H and V written as X and Y.
pub fn polarization_code(polarization: &str) -> String {
    let code = match polarization.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('H') => 'X',
        Some('V') => 'Y',
        Some(c) => c,
        None => '?',
    };
    format!("{code}{code}")
}

fn grouping_header() -> IndexMap<&'static str, CardValue> {
    IndexMap::from([
        ("TELESCOP", CardValue::Text(String::new())),
        ("ORIGIN", CardValue::Text("sdtimager".to_string())),
        (
            "CREATOR",
            CardValue::Text(format!("sdtimager {}", env!("CARGO_PKG_VERSION"))),
        ),
        ("MBFTSVER", CardValue::Text("1.65".to_string())),
        ("DATE-OBS", CardValue::Text(String::new())),
        ("OBJECT", CardValue::Text(String::new())),
        ("SCANNUM", CardValue::Int(0)),
        ("RA", CardValue::Float(0.0)),
        ("DEC", CardValue::Float(0.0)),
    ])
}

fn scan_header() -> IndexMap<&'static str, CardValue> {
    IndexMap::from([
        ("TELESCOP", CardValue::Text(String::new())),
        ("ORIGIN", CardValue::Text("sdtimager".to_string())),
        ("MBFTSVER", CardValue::Text("1.65".to_string())),
        ("DATE-OBS", CardValue::Text(String::new())),
        ("OBJECT", CardValue::Text(String::new())),
        ("SCANNUM", CardValue::Int(0)),
        ("PROJID", CardValue::Text(String::new())),
        ("SITELONG", CardValue::Float(0.0)),
        ("SITELAT", CardValue::Float(0.0)),
        ("SITEELEV", CardValue::Float(0.0)),
    ])
}

fn double_column(name: &str) -> Result<ConcreteColumnDescription, fitsio::errors::Error> {
    ColumnDescription::new(name)
        .with_type(ColumnDataType::Double)
        .create()
}

fn int_column(name: &str) -> Result<ConcreteColumnDescription, fitsio::errors::Error> {
    ColumnDescription::new(name)
        .with_type(ColumnDataType::Int)
        .create()
}

fn string_column(
    name: &str,
    values: &[String],
) -> Result<ConcreteColumnDescription, fitsio::errors::Error> {
    let width = values.iter().map(String::len).max().unwrap_or(1).max(1);
    ColumnDescription::new(name)
        .with_type(ColumnDataType::String)
        .that_repeats(width)
        .create()
}

fn write_header(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    header: &IndexMap<&'static str, CardValue>,
) -> Result<(), fitsio::errors::Error> {
    for (key, value) in header {
        value.write(fptr, hdu, key)?;
    }
    Ok(())
}

/// Builds an MBFITS directory one subscan at a time.
#[derive(Debug)]
pub struct MbfitsCreator {
    dir: PathBuf,
    grouping_header: IndexMap<&'static str, CardValue>,
    scan_header: IndexMap<&'static str, CardValue>,
    grouping: Vec<GroupingRow>,

    /// In the order they were first seen.
    febes: Vec<String>,
    subscan_count: i32,
}

impl MbfitsCreator {
    /// Create `dir` (if needed) with an initial GROUPING.fits and SCAN.fits.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<MbfitsCreator, MbfitsError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|err| MbfitsError::CreateDir {
            dir: dir.clone(),
            err,
        })?;
        let creator = MbfitsCreator {
            grouping_header: grouping_header(),
            scan_header: scan_header(),
            grouping: vec![GroupingRow {
                member_position: 1,
                member_location: SCAN_FILE.to_string(),
                member_uri_type: "URL".to_string(),
                extname: "SCAN-MBFITS".to_string(),
                subsnum: MBFITS_NULL_INT,
                febe: String::new(),
                baseband: MBFITS_NULL_INT,
            }],
            febes: vec![],
            subscan_count: 0,
            dir,
        };
        creator.write_grouping()?;
        creator.write_scan()?;
        info!("Created MBFITS directory {}", creator.dir.display());
        Ok(creator)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn grouping(&self) -> &[GroupingRow] {
        &self.grouping
    }

    pub fn febes(&self) -> &[String] {
        &self.febes
    }

    /// Copy header values from a summary file's primary HDU into the GROUPING
    /// and SCAN headers, wherever those headers have the same key. The
    /// summary's `RightAscension` and `Declination` (radians) become the
    /// GROUPING `RA` and `DEC` (degrees).
    pub fn fill_in_summary<P: AsRef<Path>>(&mut self, summary: P) -> Result<(), MbfitsError> {
        let summary = summary.as_ref();
        debug!("Reading summary {}", summary.display());
        let mut fptr = fits_open(summary)?;
        let hdu = fits_open_hdu(&mut fptr, 0)?;
        for header in [&mut self.grouping_header, &mut self.scan_header] {
            for (key, value) in header.iter_mut() {
                if let Some(new) = read_card_like(&mut fptr, &hdu, key, value)? {
                    *value = new;
                }
            }
        }
        let ra: f64 = fits_get_required_key(&mut fptr, &hdu, "RightAscension")?;
        let dec: f64 = fits_get_required_key(&mut fptr, &hdu, "Declination")?;
        self.grouping_header
            .insert("RA", CardValue::Float(ra.to_degrees()));
        self.grouping_header
            .insert("DEC", CardValue::Float(dec.to_degrees()));

        self.write_grouping()?;
        self.write_scan()?;
        Ok(())
    }

    /// Write every channel of `scan` as a new subscan.
    pub fn add_subscan(&mut self, scan: &Scan) -> Result<(), MbfitsError> {
        self.subscan_count += 1;
        let subscan = scan.meta.subscan_id;
        let site: Site = scan
            .meta
            .site
            .parse()
            .map_err(|_| MbfitsError::UnknownSite {
                site: scan.meta.site.clone(),
                valid: SITES_COMMA_SEPARATED.clone(),
            })?;
        let longitude = site.position().longitude_rad;
        let dut1 = Duration::from_seconds(0.0);
        // Local sidereal time in hours.
        let lst: Vec<f64> = scan
            .time
            .iter()
            .map(|&mjd| {
                get_lmst(longitude, Epoch::from_mjd_utc(mjd), dut1)
                    .rem_euclid(std::f64::consts::TAU)
                    .to_degrees()
                    / 15.0
            })
            .collect();

        let subscan_dir = subscan.to_string();
        let out_dir = self.dir.join(&subscan_dir);
        std::fs::create_dir_all(&out_dir).map_err(|err| MbfitsError::CreateDir {
            dir: out_dir.clone(),
            err,
        })?;

        for (name, channel) in &scan.channels {
            let febe = febe_name(scan, channel);
            debug!("Adding subscan {subscan} of {febe}");
            let direction = scan.scan_direction(channel.feed).ok_or_else(|| {
                MbfitsError::UnclassifiableDirection {
                    subscan,
                    channel: name.clone(),
                }
            })?;
            let (lon_axis, lat_axis) = match direction {
                SkyAxis::Ra | SkyAxis::Dec => (SkyAxis::Ra, SkyAxis::Dec),
                SkyAxis::Az | SkyAxis::El => (SkyAxis::Az, SkyAxis::El),
            };

            let datapar = format!("{subscan_dir}/{febe}-DATAPAR.fits");
            self.write_datapar(&datapar, scan, channel, &febe, &lst, (lon_axis, lat_axis))?;
            let arraydata = format!("{subscan_dir}/{febe}-ARRAYDATA-{MBFITS_BASEBAND}.fits");
            self.write_arraydata(&arraydata, scan, channel, &febe)?;

            if !self.febes.contains(&febe) {
                let febepar = format!("{febe}-FEBEPAR.fits");
                self.write_febepar(&febepar, channel, &febe)?;
                self.febes.push(febe.clone());
                self.write_scan()?;
                self.grouping.push(GroupingRow::member(
                    febepar,
                    "FEBEPAR-MBFITS",
                    MBFITS_NULL_INT,
                    &febe,
                    MBFITS_NULL_INT,
                ));
            }
            self.grouping.push(GroupingRow::member(
                datapar,
                "DATAPAR-MBFITS",
                MBFITS_NULL_INT,
                &febe,
                MBFITS_NULL_INT,
            ));
            self.grouping.push(GroupingRow::member(
                arraydata,
                "ARRAYDATA-MBFITS",
                self.subscan_count,
                &febe,
                MBFITS_BASEBAND,
            ));
            self.write_grouping()?;
        }
        Ok(())
    }

    fn write_grouping(&self) -> Result<(), MbfitsError> {
        let mut fptr = fits_create(self.dir.join(GROUPING_FILE))?;
        let primary = fits_open_hdu(&mut fptr, 0)?;
        write_header(&mut fptr, &primary, &self.grouping_header)?;

        let locations: Vec<String> = self
            .grouping
            .iter()
            .map(|r| r.member_location.clone())
            .collect();
        let uri_types: Vec<String> = self
            .grouping
            .iter()
            .map(|r| r.member_uri_type.clone())
            .collect();
        let extnames: Vec<String> = self.grouping.iter().map(|r| r.extname.clone()).collect();
        let febes: Vec<String> = self.grouping.iter().map(|r| r.febe.clone()).collect();
        let cols = [
            int_column("MEMBER_POSITION")?,
            string_column("MEMBER_LOCATION", &locations)?,
            string_column("MEMBER_URI_TYPE", &uri_types)?,
            string_column("EXTNAME", &extnames)?,
            int_column("SUBSNUM")?,
            string_column("FEBE", &febes)?,
            int_column("BASEBAND")?,
        ];
        let hdu = fptr.create_table("GROUPING", &cols)?;
        hdu.write_col(
            &mut fptr,
            "MEMBER_POSITION",
            &self
                .grouping
                .iter()
                .map(|r| r.member_position)
                .collect::<Vec<_>>(),
        )?;
        hdu.write_col(&mut fptr, "MEMBER_LOCATION", &locations)?;
        hdu.write_col(&mut fptr, "MEMBER_URI_TYPE", &uri_types)?;
        hdu.write_col(&mut fptr, "EXTNAME", &extnames)?;
        hdu.write_col(
            &mut fptr,
            "SUBSNUM",
            &self.grouping.iter().map(|r| r.subsnum).collect::<Vec<_>>(),
        )?;
        hdu.write_col(&mut fptr, "FEBE", &febes)?;
        hdu.write_col(
            &mut fptr,
            "BASEBAND",
            &self.grouping.iter().map(|r| r.baseband).collect::<Vec<_>>(),
        )?;
        Ok(())
    }

    fn write_scan(&self) -> Result<(), MbfitsError> {
        let mut fptr = fits_create(self.dir.join(SCAN_FILE))?;
        let primary = fits_open_hdu(&mut fptr, 0)?;
        write_header(&mut fptr, &primary, &self.scan_header)?;

        let febes = if self.febes.is_empty() {
            vec![EMPTY_FEBE.to_string()]
        } else {
            self.febes.clone()
        };
        let hdu = fptr.create_table("SCAN-MBFITS", &[string_column("FEBE", &febes)?])?;
        hdu.write_col(&mut fptr, "FEBE", &febes)?;
        Ok(())
    }

    fn write_febepar(
        &self,
        file: &str,
        channel: &ScanChannel,
        febe: &str,
    ) -> Result<(), MbfitsError> {
        let mut fptr = fits_create(self.dir.join(file))?;
        let polty = vec![polarization_code(&channel.polarization)];
        let cols = [
            int_column("USEBAND")?,
            int_column("USEFEED")?,
            int_column("BESECTS")?,
            int_column("FEEDTYPE")?,
            string_column("POLTY", &polty)?,
            ColumnDescription::new("POLA")
                .with_type(ColumnDataType::Double)
                .that_repeats(2)
                .create()?,
        ];
        let hdu = fptr.create_table("FEBEPAR-MBFITS", &cols)?;
        hdu.write_key(&mut fptr, "FEBE", febe)?;
        hdu.write_col(&mut fptr, "USEBAND", &[MBFITS_BASEBAND])?;
        hdu.write_col(&mut fptr, "USEFEED", &[channel.feed as i32])?;
        hdu.write_col(&mut fptr, "BESECTS", &[0_i32])?;
        hdu.write_col(&mut fptr, "FEEDTYPE", &[1_i32])?;
        hdu.write_col(&mut fptr, "POLTY", &polty)?;
        hdu.write_col(&mut fptr, "POLA", &[0.0_f64, 0.0])?;
        Ok(())
    }

    fn write_datapar(
        &self,
        file: &str,
        scan: &Scan,
        channel: &ScanChannel,
        febe: &str,
        lst: &[f64],
        (lon_axis, lat_axis): (SkyAxis, SkyAxis),
    ) -> Result<(), MbfitsError> {
        let n = scan.num_samples();
        let feed = channel.feed;
        let column = |axis: SkyAxis| scan.coordinates(axis).column(feed).to_vec();
        let basis_lon = column(lon_axis);
        let basis_lat = column(lat_axis);
        let integration_time = if channel.sample_rate > 0.0 {
            1.0 / channel.sample_rate
        } else {
            0.0
        };
        let columns: [(&str, Vec<f64>); 13] = [
            ("MJD", scan.time.to_vec()),
            ("LST", lst.to_vec()),
            ("INTEGTIM", vec![integration_time; n]),
            ("RA", column(SkyAxis::Ra)),
            ("DEC", column(SkyAxis::Dec)),
            ("LONGOFF", vec![0.0; n]),
            ("LATOFF", vec![0.0; n]),
            ("AZIMUTH", column(SkyAxis::Az)),
            ("ELEVATIO", column(SkyAxis::El)),
            ("CBASLONG", basis_lon.clone()),
            ("CBASLAT", basis_lat.clone()),
            ("BASLONG", basis_lon),
            ("BASLAT", basis_lat),
        ];

        let mut fptr = fits_create(self.dir.join(file))?;
        let descriptions = columns
            .iter()
            .map(|(name, _)| double_column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let hdu = fptr.create_table("DATAPAR-MBFITS", &descriptions)?;
        hdu.write_key(&mut fptr, "FEBE", febe)?;
        hdu.write_key(&mut fptr, "SUBSNUM", scan.meta.subscan_id)?;
        for (name, values) in &columns {
            hdu.write_col(&mut fptr, *name, values)?;
        }
        Ok(())
    }

    fn write_arraydata(
        &self,
        file: &str,
        scan: &Scan,
        channel: &ScanChannel,
        febe: &str,
    ) -> Result<(), MbfitsError> {
        let mut fptr = fits_create(self.dir.join(file))?;
        let cols = [double_column("MJD")?, double_column("DATA")?];
        let hdu = fptr.create_table("ARRAYDATA-MBFITS", &cols)?;
        hdu.write_key(&mut fptr, "SUBSNUM", scan.meta.subscan_id)?;
        hdu.write_key(&mut fptr, "DATE-OBS", scan.meta.date_obs.as_str())?;
        hdu.write_key(&mut fptr, "FEBE", febe)?;
        hdu.write_key(&mut fptr, "BASEBAND", MBFITS_BASEBAND as i64)?;
        hdu.write_key(&mut fptr, "CHANNELS", scan.meta.spectral_channels as i64)?;
        hdu.write_col(&mut fptr, "MJD", &scan.time.to_vec())?;
        hdu.write_col(&mut fptr, "DATA", &channel.values.to_vec())?;
        Ok(())
    }
}

/// Read `key` with the same type as `like`.
fn read_card_like(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    key: &str,
    like: &CardValue,
) -> Result<Option<CardValue>, MbfitsError> {
    let value = match like {
        CardValue::Int(_) => fits_get_optional_key(fptr, hdu, key)?.map(CardValue::Int),
        CardValue::Float(_) => fits_get_optional_key(fptr, hdu, key)?.map(CardValue::Float),
        CardValue::Text(_) => fits_get_optional_key(fptr, hdu, key)?.map(CardValue::Text),
    };
    Ok(value)
}
