// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scan sets written to and read from FITS files.
//!
//! The primary HDU holds the coordinate statistics. The "SCANSET" table holds
//! the rows, laid out like a scan's "DATA" table plus `SCAN_ID`, pixel
//! coordinates (`X0`, `Y0`, ...) and a `<channel>_feed` column per channel.
//! "CHANNELS" lists the channels and "SCANS" the scan files.

use std::path::{Path, PathBuf};

use fitsio::{
    hdu::FitsHdu,
    tables::{ColumnDataType, ColumnDescription},
    FitsFile,
};
use indexmap::IndexMap;
use log::debug;
use ndarray::prelude::*;
use strum::IntoEnumIterator;

use super::*;
use crate::{
    io::fits::*,
    scan::{
        fits::{
            channel_columns, coordinate_columns, read_channel_table, read_coordinates, read_mask,
            write_channel_table, write_coordinates, write_mask, ChannelInfo,
        },
        SkyAxis,
    },
};

fn feed_column_name(channel: &str) -> String {
    format!("{channel}_feed")
}

fn stat_keys(axis: SkyAxis) -> [String; 3] {
    [
        format!("MIN_{axis}"),
        format!("MAX_{axis}"),
        format!("MEAN_{axis}"),
    ]
}

fn write_pixel_columns(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    prefix: &str,
    pixels: &Array2<f64>,
) -> Result<(), fitsio::errors::Error> {
    for (feed, column) in pixels.axis_iter(Axis(1)).enumerate() {
        hdu.write_col(fptr, &format!("{prefix}{feed}"), &column.to_vec())?;
    }
    Ok(())
}

fn read_pixel_columns(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    prefix: &str,
    shape: (usize, usize),
) -> Result<Array2<f64>, ScanSetError> {
    let mut pixels = Array2::zeros(shape);
    for (feed, mut column) in pixels.axis_iter_mut(Axis(1)).enumerate() {
        let name = format!("{prefix}{feed}");
        let values: Vec<f64> = fits_get_col(fptr, hdu, &name)?;
        if values.len() != shape.0 {
            return Err(ScanError::Shape {
                what: name,
                expected: vec![shape.0],
                got: vec![values.len()],
            }
            .into());
        }
        column.assign(&ArrayView1::from(values.as_slice()));
    }
    Ok(pixels)
}

impl ScanSet {
    /// Write the scan set to a FITS file, replacing anything already there.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ScanSetError> {
        let path = path.as_ref();
        debug!("Writing scan set to {}", path.display());
        let num_feeds = self.num_feeds();

        let mut fptr = fits_create(path)?;
        let hdu = fits_open_hdu(&mut fptr, 0)?;
        hdu.write_key(&mut fptr, "NFEEDS", num_feeds as i64)?;
        for axis in SkyAxis::iter() {
            let stats = self.meta.stats.get(axis);
            let [min_key, max_key, mean_key] = stat_keys(axis);
            hdu.write_key(&mut fptr, &min_key, stats.min)?;
            hdu.write_key(&mut fptr, &max_key, stats.max)?;
            hdu.write_key(&mut fptr, &mean_key, stats.mean)?;
        }

        let mut cols = vec![
            ColumnDescription::new("TIME")
                .with_type(ColumnDataType::Double)
                .create()?,
            ColumnDescription::new("SCAN_ID")
                .with_type(ColumnDataType::Int)
                .create()?,
        ];
        cols.extend(coordinate_columns(num_feeds)?);
        for prefix in ["X", "Y"] {
            for feed in 0..num_feeds {
                cols.push(
                    ColumnDescription::new(&format!("{prefix}{feed}"))
                        .with_type(ColumnDataType::Double)
                        .create()?,
                );
            }
        }
        for name in self.channels.keys() {
            cols.extend(channel_columns(name)?);
            cols.push(
                ColumnDescription::new(&feed_column_name(name))
                    .with_type(ColumnDataType::Int)
                    .create()?,
            );
        }
        let hdu = fptr.create_table("SCANSET", &cols)?;
        hdu.write_col(&mut fptr, "TIME", &self.time.to_vec())?;
        hdu.write_col(
            &mut fptr,
            "SCAN_ID",
            &self.scan_id.iter().map(|&id| id as i32).collect::<Vec<_>>(),
        )?;
        write_coordinates(
            &mut fptr,
            &hdu,
            [
                (SkyAxis::Ra, &self.ra),
                (SkyAxis::Dec, &self.dec),
                (SkyAxis::Az, &self.az),
                (SkyAxis::El, &self.el),
            ],
        )?;
        write_pixel_columns(&mut fptr, &hdu, "X", &self.x)?;
        write_pixel_columns(&mut fptr, &hdu, "Y", &self.y)?;
        for (name, channel) in &self.channels {
            hdu.write_col(&mut fptr, name, &channel.values.to_vec())?;
            write_mask(&mut fptr, &hdu, name, &channel.filter)?;
            hdu.write_col(
                &mut fptr,
                &feed_column_name(name),
                &channel.feeds.iter().map(|&f| f as i32).collect::<Vec<_>>(),
            )?;
        }

        let channels: Vec<ChannelInfo> = self
            .channels
            .iter()
            .map(|(name, c)| ChannelInfo {
                name: name.clone(),
                feed: c.feeds.first().copied().unwrap_or(0),
                polarization: c.polarization.clone(),
                sample_rate: c.sample_rate,
            })
            .collect();
        write_channel_table(&mut fptr, &channels)?;

        let paths: Vec<String> = self
            .meta
            .scan_list
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let width = paths.iter().map(String::len).max().unwrap_or(1).max(1);
        let path_col = ColumnDescription::new("PATH")
            .with_type(ColumnDataType::String)
            .that_repeats(width)
            .create()?;
        let hdu = fptr.create_table("SCANS", &[path_col])?;
        if !paths.is_empty() {
            hdu.write_col(&mut fptr, "PATH", &paths)?;
        }
        Ok(())
    }

    /// Read a scan set written by [`ScanSet::write`], taking imaging settings
    /// from `config`. Only the WCS is rebuilt; the stored pixel coordinates
    /// are kept as they are.
    pub(super) fn read(path: &Path, config: SdtConfig) -> Result<ScanSet, ScanSetError> {
        debug!("Reading scan set from {}", path.display());
        let mut fptr = fits_open(path)?;
        let hdu = fits_open_hdu(&mut fptr, 0)?;
        let num_feeds: usize = fits_get_required_key(&mut fptr, &hdu, "NFEEDS")?;
        let mut read_stats = |axis: SkyAxis| -> Result<AxisStats, FitsError> {
            let [min_key, max_key, mean_key] = stat_keys(axis);
            Ok(AxisStats {
                min: fits_get_required_key(&mut fptr, &hdu, &min_key)?,
                max: fits_get_required_key(&mut fptr, &hdu, &max_key)?,
                mean: fits_get_required_key(&mut fptr, &hdu, &mean_key)?,
            })
        };
        let stats = CoordinateStats {
            ra: read_stats(SkyAxis::Ra)?,
            dec: read_stats(SkyAxis::Dec)?,
            az: read_stats(SkyAxis::Az)?,
            el: read_stats(SkyAxis::El)?,
        };

        let channel_info = read_channel_table(&mut fptr)?;

        let hdu = fits_open_hdu(&mut fptr, "SCANS")?;
        let scan_list: Vec<PathBuf> = fits_get_col::<String>(&mut fptr, &hdu, "PATH")?
            .into_iter()
            .map(|p| PathBuf::from(p.trim()))
            .collect();

        let hdu = fits_open_hdu(&mut fptr, "SCANSET")?;
        let time: Vec<f64> = fits_get_col(&mut fptr, &hdu, "TIME")?;
        let num_rows = time.len();
        let scan_id: Vec<i32> = fits_get_col(&mut fptr, &hdu, "SCAN_ID")?;
        let scan_id = scan_id
            .into_iter()
            .enumerate()
            .map(|(row, id)| match usize::try_from(id) {
                Ok(id) if id < scan_list.len() => Ok(id),
                _ => Err(ScanSetError::UnknownScanId {
                    row,
                    scan_id: id.max(0) as usize,
                    num_scans: scan_list.len(),
                }),
            })
            .collect::<Result<Vec<usize>, _>>()?;
        let [ra, dec, az, el] = read_coordinates(&mut fptr, &hdu, num_feeds, num_rows)?;
        let x = read_pixel_columns(&mut fptr, &hdu, "X", (num_rows, num_feeds))?;
        let y = read_pixel_columns(&mut fptr, &hdu, "Y", (num_rows, num_feeds))?;

        let mut channels = IndexMap::new();
        for ChannelInfo {
            name,
            polarization,
            sample_rate,
            ..
        } in channel_info
        {
            let values: Vec<f64> = fits_get_col(&mut fptr, &hdu, &name)?;
            let filter = read_mask(&mut fptr, &hdu, &name)?;
            let feeds: Vec<i32> = fits_get_col(&mut fptr, &hdu, &feed_column_name(&name))?;
            let feeds = feeds
                .into_iter()
                .enumerate()
                .map(|(row, feed)| match usize::try_from(feed) {
                    Ok(feed) if feed < num_feeds => Ok(feed),
                    _ => Err(ScanSetError::UnknownFeed {
                        channel: name.clone(),
                        row,
                        feed: feed.into(),
                        num_feeds,
                    }),
                })
                .collect::<Result<Vec<usize>, _>>()?;
            channels.insert(
                name,
                ScanSetChannel {
                    values: Array1::from(values),
                    feeds: Array1::from(feeds),
                    polarization,
                    sample_rate,
                    filter,
                },
            );
        }

        let wcs = build_wcs(&config, &stats, false)?;
        Ok(ScanSet {
            time: Array1::from(time),
            scan_id: Array1::from(scan_id),
            ra,
            dec,
            az,
            el,
            channels,
            x,
            y,
            wcs,
            meta: ScanSetMeta {
                scan_list,
                stats,
                config,
            },
        })
    }
}
