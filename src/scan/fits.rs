// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scans stored as FITS files.
//!
//! The primary HDU carries the scan metadata. The "DATA" binary table has a
//! `TIME` column, one coordinate column per axis and feed (`RA0`, `DEC0`, ...,
//! `EL1`, ...), and for every channel a value column named after the channel
//! plus an integer `<channel>-filt` mask column. The "CHANNELS" table lists the
//! channels with their feed, polarization and sample rate.

use std::path::Path;

use fitsio::{
    hdu::FitsHdu,
    tables::{ColumnDataType, ColumnDescription, ConcreteColumnDescription},
    FitsFile,
};
use log::trace;
use ndarray::prelude::*;
use strum::IntoEnumIterator;

use super::{Scan, ScanChannel, ScanError, ScanMeta, ScanStore, SkyAxis};
use crate::io::fits::*;

/// Reads and writes scans as FITS files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FitsScanStore;

impl ScanStore for FitsScanStore {
    fn load(&self, path: &Path) -> Result<Scan, ScanError> {
        trace!("Reading scan {}", path.display());
        if !path.exists() {
            return Err(ScanError::NotFound(path.to_path_buf()));
        }
        read_scan(path)
    }

    fn save(&self, path: &Path, scan: &Scan) -> Result<(), ScanError> {
        trace!("Writing scan {}", path.display());
        write_scan(path, scan)
    }
}

/// What the "CHANNELS" table says about a channel.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChannelInfo {
    pub(crate) name: String,
    pub(crate) feed: usize,
    pub(crate) polarization: String,
    pub(crate) sample_rate: f64,
}

/// The mask column that accompanies a channel column.
pub(crate) fn filter_column_name(channel: &str) -> String {
    format!("{channel}-filt")
}

fn coordinate_column_name(axis: SkyAxis, feed: usize) -> String {
    format!("{axis}{feed}")
}

/// Column descriptions for every axis and feed.
pub(crate) fn coordinate_columns(
    num_feeds: usize,
) -> Result<Vec<ConcreteColumnDescription>, fitsio::errors::Error> {
    let mut cols = Vec::with_capacity(4 * num_feeds);
    for axis in SkyAxis::iter() {
        for feed in 0..num_feeds {
            cols.push(
                ColumnDescription::new(&coordinate_column_name(axis, feed))
                    .with_type(ColumnDataType::Double)
                    .create()?,
            );
        }
    }
    Ok(cols)
}

/// Column descriptions for a channel's values and mask.
pub(crate) fn channel_columns(
    channel: &str,
) -> Result<[ConcreteColumnDescription; 2], fitsio::errors::Error> {
    Ok([
        ColumnDescription::new(channel)
            .with_type(ColumnDataType::Double)
            .create()?,
        ColumnDescription::new(&filter_column_name(channel))
            .with_type(ColumnDataType::Int)
            .create()?,
    ])
}

pub(crate) fn write_coordinates(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    coords: [(SkyAxis, &Array2<f64>); 4],
) -> Result<(), fitsio::errors::Error> {
    for (axis, coords) in coords {
        for (feed, column) in coords.axis_iter(Axis(1)).enumerate() {
            hdu.write_col(fptr, &coordinate_column_name(axis, feed), &column.to_vec())?;
        }
    }
    Ok(())
}

/// Read the coordinates of every axis, in [`SkyAxis`] order.
pub(crate) fn read_coordinates(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    num_feeds: usize,
    num_rows: usize,
) -> Result<[Array2<f64>; 4], ScanError> {
    let mut read_axis = |axis: SkyAxis| -> Result<Array2<f64>, ScanError> {
        let mut coords = Array2::zeros((num_rows, num_feeds));
        for (feed, mut column) in coords.axis_iter_mut(Axis(1)).enumerate() {
            let name = coordinate_column_name(axis, feed);
            let values: Vec<f64> = fits_get_col(fptr, hdu, &name)?;
            if values.len() != num_rows {
                return Err(ScanError::Shape {
                    what: name,
                    expected: vec![num_rows],
                    got: vec![values.len()],
                });
            }
            column.assign(&ArrayView1::from(values.as_slice()));
        }
        Ok(coords)
    };
    Ok([
        read_axis(SkyAxis::Ra)?,
        read_axis(SkyAxis::Dec)?,
        read_axis(SkyAxis::Az)?,
        read_axis(SkyAxis::El)?,
    ])
}

pub(crate) fn write_mask(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    channel: &str,
    mask: &Array1<bool>,
) -> Result<(), fitsio::errors::Error> {
    let ints: Vec<i32> = mask.iter().map(|&good| i32::from(good)).collect();
    hdu.write_col(fptr, &filter_column_name(channel), &ints)?;
    Ok(())
}

pub(crate) fn read_mask(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    channel: &str,
) -> Result<Array1<bool>, FitsError> {
    let ints: Vec<i32> = fits_get_col(fptr, hdu, &filter_column_name(channel))?;
    Ok(ints.into_iter().map(|i| i != 0).collect())
}

/// Write the "CHANNELS" table.
pub(crate) fn write_channel_table(
    fptr: &mut FitsFile,
    channels: &[ChannelInfo],
) -> Result<(), fitsio::errors::Error> {
    let name_col = ColumnDescription::new("NAME")
        .with_type(ColumnDataType::String)
        .that_repeats(64)
        .create()?;
    let feed_col = ColumnDescription::new("FEED")
        .with_type(ColumnDataType::Int)
        .create()?;
    let pol_col = ColumnDescription::new("POL")
        .with_type(ColumnDataType::String)
        .that_repeats(16)
        .create()?;
    let rate_col = ColumnDescription::new("RATE")
        .with_type(ColumnDataType::Double)
        .create()?;
    let hdu = fptr.create_table("CHANNELS", &[name_col, feed_col, pol_col, rate_col])?;
    if channels.is_empty() {
        return Ok(());
    }
    hdu.write_col(
        fptr,
        "NAME",
        &channels.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
    )?;
    hdu.write_col(
        fptr,
        "FEED",
        &channels.iter().map(|c| c.feed as i32).collect::<Vec<_>>(),
    )?;
    hdu.write_col(
        fptr,
        "POL",
        &channels
            .iter()
            .map(|c| c.polarization.clone())
            .collect::<Vec<_>>(),
    )?;
    hdu.write_col(
        fptr,
        "RATE",
        &channels.iter().map(|c| c.sample_rate).collect::<Vec<_>>(),
    )?;
    Ok(())
}

/// Read the "CHANNELS" table.
pub(crate) fn read_channel_table(fptr: &mut FitsFile) -> Result<Vec<ChannelInfo>, FitsError> {
    let hdu = fits_open_hdu(fptr, "CHANNELS")?;
    let names: Vec<String> = fits_get_col(fptr, &hdu, "NAME")?;
    let feeds: Vec<i32> = fits_get_col(fptr, &hdu, "FEED")?;
    let pols: Vec<String> = fits_get_col(fptr, &hdu, "POL")?;
    let rates: Vec<f64> = fits_get_col(fptr, &hdu, "RATE")?;
    Ok(names
        .into_iter()
        .zip(feeds)
        .zip(pols)
        .zip(rates)
        .map(|(((name, feed), pol), rate)| ChannelInfo {
            name: name.trim().to_string(),
            feed: feed.max(0) as usize,
            polarization: pol.trim().to_string(),
            sample_rate: rate,
        })
        .collect())
}

fn write_scan(path: &Path, scan: &Scan) -> Result<(), ScanError> {
    scan.validate()?;

    let mut fptr = fits_create(path)?;
    let hdu = fits_open_hdu(&mut fptr, 0)?;
    let ScanMeta {
        receiver,
        backend,
        subscan_id,
        date_obs,
        spectral_channels,
        site,
        flag,
        backsub,
    } = &scan.meta;
    hdu.write_key(&mut fptr, "RECEIVER", receiver.as_str())?;
    hdu.write_key(&mut fptr, "BACKEND", backend.as_str())?;
    hdu.write_key(&mut fptr, "SUBSCAN", *subscan_id)?;
    hdu.write_key(&mut fptr, "DATE-OBS", date_obs.as_str())?;
    hdu.write_key(&mut fptr, "SPECCHAN", *spectral_channels as i64)?;
    hdu.write_key(&mut fptr, "SITE", site.as_str())?;
    hdu.write_key(&mut fptr, "FLAG", flag_value(*flag))?;
    hdu.write_key(&mut fptr, "BACKSUB", flag_value(*backsub))?;
    hdu.write_key(&mut fptr, "NFEEDS", scan.num_feeds() as i64)?;

    let mut cols = vec![ColumnDescription::new("TIME")
        .with_type(ColumnDataType::Double)
        .create()?];
    cols.extend(coordinate_columns(scan.num_feeds())?);
    for name in scan.channels.keys() {
        cols.extend(channel_columns(name)?);
    }
    let hdu = fptr.create_table("DATA", &cols)?;
    if scan.num_samples() > 0 {
        hdu.write_col(&mut fptr, "TIME", &scan.time.to_vec())?;
        write_coordinates(
            &mut fptr,
            &hdu,
            [
                (SkyAxis::Ra, &scan.ra),
                (SkyAxis::Dec, &scan.dec),
                (SkyAxis::Az, &scan.az),
                (SkyAxis::El, &scan.el),
            ],
        )?;
        for (name, channel) in &scan.channels {
            hdu.write_col(&mut fptr, name, &channel.values.to_vec())?;
            write_mask(&mut fptr, &hdu, name, &channel.filter)?;
        }
    }

    let channels: Vec<ChannelInfo> = scan
        .channels
        .iter()
        .map(|(name, c)| ChannelInfo {
            name: name.clone(),
            feed: c.feed,
            polarization: c.polarization.clone(),
            sample_rate: c.sample_rate,
        })
        .collect();
    write_channel_table(&mut fptr, &channels)?;
    Ok(())
}

fn read_scan(path: &Path) -> Result<Scan, ScanError> {
    let mut fptr = fits_open(path)?;
    let hdu = fits_open_hdu(&mut fptr, 0)?;
    let meta = ScanMeta {
        receiver: fits_get_optional_key(&mut fptr, &hdu, "RECEIVER")?.unwrap_or_default(),
        backend: fits_get_optional_key(&mut fptr, &hdu, "BACKEND")?.unwrap_or_default(),
        subscan_id: fits_get_optional_key(&mut fptr, &hdu, "SUBSCAN")?.unwrap_or(0),
        date_obs: fits_get_optional_key(&mut fptr, &hdu, "DATE-OBS")?.unwrap_or_default(),
        spectral_channels: fits_get_optional_key(&mut fptr, &hdu, "SPECCHAN")?.unwrap_or(1),
        site: fits_get_optional_key(&mut fptr, &hdu, "SITE")?.unwrap_or_default(),
        flag: fits_get_flag(&mut fptr, &hdu, "FLAG")?,
        backsub: fits_get_flag(&mut fptr, &hdu, "BACKSUB")?,
    };
    let num_feeds: usize = fits_get_required_key(&mut fptr, &hdu, "NFEEDS")?;
    let channels = read_channel_table(&mut fptr)?;

    let hdu = fits_open_hdu(&mut fptr, "DATA")?;
    let time: Vec<f64> = fits_get_col(&mut fptr, &hdu, "TIME")?;
    let num_samples = time.len();
    let [ra, dec, az, el] = read_coordinates(&mut fptr, &hdu, num_feeds, num_samples)?;
    let mut scan = Scan::new(Array1::from(time), ra, dec, az, el, meta)?;

    for ChannelInfo {
        name,
        feed,
        polarization,
        sample_rate,
    } in channels
    {
        let values: Vec<f64> = fits_get_col(&mut fptr, &hdu, &name)?;
        let mut channel = ScanChannel::new(Array1::from(values), feed, &polarization, sample_rate);
        channel.filter = read_mask(&mut fptr, &hdu, &name)?;
        scan.add_channel(&name, channel)?;
    }
    Ok(scan)
}
