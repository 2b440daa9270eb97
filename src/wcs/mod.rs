// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! World coordinate systems for turning sky positions into pixel coordinates.
//!
//! The projection mathematics comes from [`mapproj`]; this module only decides
//! where the grid sits on the sky and how large its pixels are.

#[cfg(test)]
mod tests;

use fitsio::{hdu::FitsHdu, FitsFile};
use itertools::Itertools;
use log::trace;
use mapproj::{
    cylindrical::car::Car,
    img2celestial::Img2Celestial,
    img2proj::WcsImgXY2ProjXY,
    zenithal::{arc::Arc, sin::Sin, stg::Stg, tan::Tan, zea::Zea},
    CanonicalProjection, CenteredProjection, LonLat,
};
use ndarray::prelude::*;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

lazy_static::lazy_static! {
    pub static ref PROJECTIONS_COMMA_SEPARATED: String = Projection::iter().join(", ");
}

/// The supported map projections, named by their FITS codes.
#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy, Default, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum Projection {
    /// Zenithal equidistant.
    #[default]
    #[strum(serialize = "ARC")]
    Arc,

    /// Gnomonic.
    #[strum(serialize = "TAN")]
    Tan,

    /// Orthographic.
    #[strum(serialize = "SIN")]
    Sin,

    /// Stereographic.
    #[strum(serialize = "STG")]
    Stg,

    /// Zenithal equal-area.
    #[strum(serialize = "ZEA")]
    Zea,

    /// Plate carrée.
    #[strum(serialize = "CAR")]
    Car,
}

/// Which pair of sky coordinates a WCS maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFrame {
    /// Right ascension and declination.
    Equatorial,
    /// Azimuth and elevation.
    Horizontal,
}

impl CoordinateFrame {
    pub fn from_altaz(altaz: bool) -> CoordinateFrame {
        if altaz {
            CoordinateFrame::Horizontal
        } else {
            CoordinateFrame::Equatorial
        }
    }

    /// The FITS axis-name prefixes, padded with dashes to 5 characters.
    fn ctype_prefixes(self) -> [&'static str; 2] {
        match self {
            CoordinateFrame::Equatorial => ["RA---", "DEC--"],
            CoordinateFrame::Horizontal => ["AZ---", "EL---"],
        }
    }
}

#[derive(Error, Debug)]
pub enum WcsError {
    #[error("The coordinates span no area on the sky, so a pixel size can't be derived")]
    ZeroExtent,

    #[error("The grid must have at least one pixel on each axis")]
    ZeroPixels,

    #[error("WCS reference value {0} is not finite")]
    NonFiniteReference(f64),
}

/// A FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl CardValue {
    pub(crate) fn write(
        &self,
        fptr: &mut FitsFile,
        hdu: &FitsHdu,
        key: &str,
    ) -> Result<(), fitsio::errors::Error> {
        match self {
            CardValue::Int(i) => hdu.write_key(fptr, key, *i),
            CardValue::Float(f) => hdu.write_key(fptr, key, *f),
            CardValue::Text(s) => hdu.write_key(fptr, key, s.as_str()),
        }
    }
}

/// A celestial WCS over a 2D pixel grid.
///
/// The reference pixel is the centre of the grid, so a dataset whose centre
/// is the reference coordinate fills the grid from edge to edge.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyWcs {
    pub projection: Projection,
    pub frame: CoordinateFrame,

    /// Grid size, horizontal then vertical.
    pub npix: [usize; 2],

    /// Reference pixel, 1-based as in FITS headers.
    pub crpix: [f64; 2],

    /// Reference coordinate \[degrees\].
    pub crval: [f64; 2],

    /// Pixel size \[degrees\]. The horizontal axis is negative so that the
    /// longitude grows to the left.
    pub cdelt: [f64; 2],
}

impl SkyWcs {
    /// Build a WCS centred on `reference` (radians) whose grid covers `extent`
    /// (radians, horizontal then vertical). A zero extent on one axis borrows
    /// the other axis's pixel size.
    pub fn new(
        projection: Projection,
        frame: CoordinateFrame,
        npix: [usize; 2],
        reference: [f64; 2],
        extent: [f64; 2],
    ) -> Result<SkyWcs, WcsError> {
        if npix.contains(&0) {
            return Err(WcsError::ZeroPixels);
        }
        for r in reference {
            if !r.is_finite() {
                return Err(WcsError::NonFiniteReference(r));
            }
        }

        let mut scale = [
            extent[0].abs().to_degrees() / npix[0] as f64,
            extent[1].abs().to_degrees() / npix[1] as f64,
        ];
        let usable = |s: f64| s.is_finite() && s > 0.0;
        match (usable(scale[0]), usable(scale[1])) {
            (true, true) => (),
            (true, false) => scale[1] = scale[0],
            (false, true) => scale[0] = scale[1],
            (false, false) => return Err(WcsError::ZeroExtent),
        }

        let wcs = SkyWcs {
            projection,
            frame,
            npix,
            // The reference sits on the middle of the grid, which is a pixel
            // centre when npix is odd.
            crpix: [npix[0] as f64 / 2.0 + 1.0, npix[1] as f64 / 2.0 + 1.0],
            crval: [reference[0].to_degrees(), reference[1].to_degrees()],
            cdelt: [-scale[0], scale[1]],
        };
        trace!("New WCS: {wcs:?}");
        Ok(wcs)
    }

    /// The FITS axis types, e.g. `RA---ARC` and `DEC--ARC`.
    pub fn ctype(&self) -> [String; 2] {
        let [h, v] = self.frame.ctype_prefixes();
        [
            format!("{h}{}", self.projection),
            format!("{v}{}", self.projection),
        ]
    }

    /// Convert sky coordinates (radians) into 0-based pixel coordinates. Points
    /// that the projection can't represent come back as NaN.
    pub fn sky_to_pixel(
        &self,
        lon: ArrayView1<f64>,
        lat: ArrayView1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        match self.projection {
            Projection::Arc => self.project(Arc::new(), lon, lat),
            Projection::Tan => self.project(Tan::new(), lon, lat),
            Projection::Sin => self.project(Sin::new(), lon, lat),
            Projection::Stg => self.project(Stg::new(), lon, lat),
            Projection::Zea => self.project(Zea::new(), lon, lat),
            Projection::Car => self.project(Car::new(), lon, lat),
        }
    }

    fn project<P: CanonicalProjection>(
        &self,
        proj: P,
        lon: ArrayView1<f64>,
        lat: ArrayView1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let mut centred = CenteredProjection::new(proj);
        centred.set_proj_center_from_lonlat(&LonLat::new(
            self.crval[0].to_radians(),
            self.crval[1].to_radians(),
        ));
        let img2proj = WcsImgXY2ProjXY::from_cr(
            self.crpix[0],
            self.crpix[1],
            0.0,
            self.cdelt[0],
            self.cdelt[1],
        );
        let mapper = Img2Celestial::new(img2proj, centred);

        let mut x = Array1::from_elem(lon.len(), f64::NAN);
        let mut y = Array1::from_elem(lon.len(), f64::NAN);
        for ((&lon, &lat), (x, y)) in lon
            .iter()
            .zip(lat.iter())
            .zip(x.iter_mut().zip(y.iter_mut()))
        {
            if !(lon.is_finite() && lat.is_finite()) {
                continue;
            }
            if let Some(img) = mapper.lonlat2img(&LonLat::new(lon, lat)) {
                // FITS pixel coordinates are 1-based.
                *x = img.x() - 1.0;
                *y = img.y() - 1.0;
            }
        }
        (x, y)
    }

    /// The header cards that describe this WCS.
    pub fn header_cards(&self) -> Vec<(&'static str, CardValue)> {
        let [ctype1, ctype2] = self.ctype();
        vec![
            ("WCSAXES", CardValue::Int(2)),
            ("CTYPE1", CardValue::Text(ctype1)),
            ("CTYPE2", CardValue::Text(ctype2)),
            ("CRPIX1", CardValue::Float(self.crpix[0])),
            ("CRPIX2", CardValue::Float(self.crpix[1])),
            ("CRVAL1", CardValue::Float(self.crval[0])),
            ("CRVAL2", CardValue::Float(self.crval[1])),
            ("CDELT1", CardValue::Float(self.cdelt[0])),
            ("CDELT2", CardValue::Float(self.cdelt[1])),
            ("CUNIT1", CardValue::Text("deg".to_string())),
            ("CUNIT2", CardValue::Text("deg".to_string())),
        ]
    }

    /// Write [`SkyWcs::header_cards`] into a HDU.
    pub(crate) fn write_cards(
        &self,
        fptr: &mut FitsFile,
        hdu: &FitsHdu,
    ) -> Result<(), fitsio::errors::Error> {
        for (key, value) in self.header_cards() {
            value.write(fptr, hdu, key)?;
        }
        Ok(())
    }
}
