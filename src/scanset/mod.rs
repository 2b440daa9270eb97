// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Many scans aggregated into one table.
//!
//! Rows of every usable scan are concatenated, tagged with the index of their
//! scan file in the sorted scan list, and their sky coordinates projected onto
//! the pixel grid described by the config.

mod error;
mod fits;

pub use error::ScanSetError;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use ndarray::prelude::*;

use crate::{
    config::SdtConfig,
    math::min_max_mean,
    scan::{Scan, ScanError, ScanStore, SkyAxis},
    wcs::{CoordinateFrame, SkyWcs},
    PROGRESS_BARS,
};

/// Where a [`ScanSet`] comes from.
#[derive(Debug, Clone)]
pub enum ScanSetSource {
    /// Load every scan listed by a config.
    FromConfig(SdtConfig),

    /// Rehydrate a scan set previously written with [`ScanSet::write`]. Values
    /// from the config replace those used when the table was made.
    FromSerialized { table: PathBuf, config: SdtConfig },
}

/// A channel column of a [`ScanSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSetChannel {
    pub values: Array1<f64>,

    /// The feed each row was recorded on.
    pub feeds: Array1<usize>,

    pub polarization: String,

    /// \[Hz\]
    pub sample_rate: f64,

    /// True for good rows.
    pub filter: Array1<bool>,
}

/// Summary statistics of one sky axis over every row and feed \[radians\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl AxisStats {
    fn from_values(values: &Array2<f64>) -> AxisStats {
        match min_max_mean(values.iter()) {
            Some((min, max, mean)) => AxisStats { min, max, mean },
            None => AxisStats {
                min: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
            },
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateStats {
    pub ra: AxisStats,
    pub dec: AxisStats,
    pub az: AxisStats,
    pub el: AxisStats,
}

impl CoordinateStats {
    /// Statistics of the ra, dec, az and el arrays, in that order.
    fn from_arrays([ra, dec, az, el]: [&Array2<f64>; 4]) -> CoordinateStats {
        CoordinateStats {
            ra: AxisStats::from_values(ra),
            dec: AxisStats::from_values(dec),
            az: AxisStats::from_values(az),
            el: AxisStats::from_values(el),
        }
    }

    pub fn get(&self, axis: SkyAxis) -> &AxisStats {
        match axis {
            SkyAxis::Ra => &self.ra,
            SkyAxis::Dec => &self.dec,
            SkyAxis::Az => &self.az,
            SkyAxis::El => &self.el,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSetMeta {
    /// Every scan file that was considered, sorted. Scan IDs index this list.
    pub scan_list: Vec<PathBuf>,

    pub stats: CoordinateStats,

    pub config: SdtConfig,
}

/// Rows from many scans.
#[derive(Debug, Clone)]
pub struct ScanSet {
    /// MJD (UTC) of each row.
    pub time: Array1<f64>,

    /// Index into [`ScanSetMeta::scan_list`] for each row.
    pub scan_id: Array1<usize>,

    /// Sky coordinates \[radians\] with dimensions [row, feed].
    pub ra: Array2<f64>,
    pub dec: Array2<f64>,
    pub az: Array2<f64>,
    pub el: Array2<f64>,

    pub channels: IndexMap<String, ScanSetChannel>,

    /// 0-based pixel coordinates with dimensions [row, feed], consistent with
    /// `wcs`.
    pub x: Array2<f64>,
    pub y: Array2<f64>,

    pub wcs: SkyWcs,

    pub meta: ScanSetMeta,
}

impl ScanSet {
    pub fn new(source: ScanSetSource, store: &dyn ScanStore) -> Result<ScanSet, ScanSetError> {
        match source {
            ScanSetSource::FromConfig(config) => ScanSet::from_config(config, store),
            ScanSetSource::FromSerialized { table, config } => ScanSet::read(&table, config),
        }
    }

    fn from_config(config: SdtConfig, store: &dyn ScanStore) -> Result<ScanSet, ScanSetError> {
        let scan_list = config.scan_files()?;
        info!("Found {} scan files", scan_list.len());

        let progress = ProgressBar::with_draw_target(
            Some(scan_list.len() as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} scans ({elapsed_precise}<{eta_precise})").unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Loading scans");

        let mut concatenation: Option<Concatenation> = None;
        for (scan_id, path) in scan_list.iter().enumerate() {
            progress.inc(1);
            let scan = match store.load(path) {
                Ok(scan) => scan,
                Err(e) => {
                    warn!("Error while processing {}: {e}", path.display());
                    continue;
                }
            };
            if scan.meta.flag {
                debug!("Scan {} is flagged; skipping", path.display());
                continue;
            }
            match concatenation.as_mut() {
                None => concatenation = Some(Concatenation::new(&scan, scan_id)),
                Some(c) => {
                    if let Err(reason) = c.push(&scan, scan_id) {
                        warn!("Skipping {}: {reason}", path.display());
                    }
                }
            }
        }
        progress.abandon_with_message("Finished loading scans");

        let scan_set = concatenation
            .ok_or(ScanSetError::NoScans)?
            .finish(scan_list, config)?;
        info!(
            "Scan set has {} rows and {} channels",
            scan_set.num_rows(),
            scan_set.channels.len()
        );
        Ok(scan_set)
    }

    pub fn num_rows(&self) -> usize {
        self.time.len()
    }

    pub fn num_feeds(&self) -> usize {
        self.ra.len_of(Axis(1))
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(|s| s.as_str())
    }

    pub fn coordinates(&self, axis: SkyAxis) -> &Array2<f64> {
        match axis {
            SkyAxis::Ra => &self.ra,
            SkyAxis::Dec => &self.dec,
            SkyAxis::Az => &self.az,
            SkyAxis::El => &self.el,
        }
    }

    /// The file a scan ID refers to.
    pub fn scan_path(&self, scan_id: usize) -> Option<&Path> {
        self.meta.scan_list.get(scan_id).map(PathBuf::as_path)
    }

    /// The rows that came from a scan, in order.
    pub fn rows_of_scan(&self, scan_id: usize) -> Vec<usize> {
        self.scan_id
            .iter()
            .enumerate()
            .filter(|(_, &id)| id == scan_id)
            .map(|(row, _)| row)
            .collect()
    }

    /// Recompute the min, max and mean of every sky axis.
    pub fn analyze_coordinates(&mut self) {
        self.meta.stats = CoordinateStats::from_arrays([&self.ra, &self.dec, &self.az, &self.el]);
    }

    /// Build the WCS for equatorial (or horizontal, with `altaz`) coordinates
    /// from the config and the coordinate statistics.
    pub fn create_wcs(&self, altaz: bool) -> Result<SkyWcs, ScanSetError> {
        build_wcs(&self.meta.config, &self.meta.stats, altaz)
    }

    /// Project every row onto the pixel grid of a freshly built WCS, which
    /// becomes the scan set's WCS.
    pub fn convert_coordinates(&mut self, altaz: bool) -> Result<(), ScanSetError> {
        let wcs = self.create_wcs(altaz)?;
        let (x, y) = self.pixel_coordinates(&wcs);
        self.wcs = wcs;
        self.x = x;
        self.y = y;
        Ok(())
    }

    /// Pixel coordinates of every row and feed under `wcs`.
    pub fn pixel_coordinates(&self, wcs: &SkyWcs) -> (Array2<f64>, Array2<f64>) {
        let (hor, ver) = match wcs.frame {
            CoordinateFrame::Equatorial => (&self.ra, &self.dec),
            CoordinateFrame::Horizontal => (&self.az, &self.el),
        };
        let mut x = Array2::from_elem(hor.dim(), f64::NAN);
        let mut y = Array2::from_elem(hor.dim(), f64::NAN);
        for (feed, (lon, lat)) in hor
            .axis_iter(Axis(1))
            .zip(ver.axis_iter(Axis(1)))
            .enumerate()
        {
            let (px, py) = wcs.sky_to_pixel(lon, lat);
            x.column_mut(feed).assign(&px);
            y.column_mut(feed).assign(&py);
        }
        (x, y)
    }

    /// Copy a (possibly edited) scan back into the rows it came from. A
    /// flagged scan marks all of its rows bad.
    pub fn mirror_scan(&mut self, scan_id: usize, scan: &Scan) -> Result<(), ScanSetError> {
        let rows = self.rows_of_scan(scan_id);
        if rows.len() != scan.num_samples() {
            return Err(ScanSetError::MirrorMismatch {
                scan_id,
                scan_samples: scan.num_samples(),
                rows: rows.len(),
            });
        }
        for (name, column) in self.channels.iter_mut() {
            let Some(channel) = scan.channels.get(name) else {
                continue;
            };
            for (i_sample, &row) in rows.iter().enumerate() {
                column.values[row] = channel.values[i_sample];
                column.filter[row] = channel.filter[i_sample] && !scan.meta.flag;
            }
        }
        Ok(())
    }
}

fn build_wcs(
    config: &SdtConfig,
    stats: &CoordinateStats,
    altaz: bool,
) -> Result<SkyWcs, ScanSetError> {
    let (hor, ver) = if altaz {
        (SkyAxis::Az, SkyAxis::El)
    } else {
        (SkyAxis::Ra, SkyAxis::Dec)
    };
    let (ref_hor, ref_ver) = config.reference(altaz);
    let wcs = SkyWcs::new(
        config.projection,
        CoordinateFrame::from_altaz(altaz),
        config.npix,
        [
            ref_hor.unwrap_or(stats.get(hor).mean),
            ref_ver.unwrap_or(stats.get(ver).mean),
        ],
        [stats.get(hor).span(), stats.get(ver).span()],
    )?;
    Ok(wcs)
}

/// Channel columns while scans are being concatenated.
struct ChannelColumns {
    values: Vec<f64>,
    feeds: Vec<usize>,
    filter: Vec<bool>,
    polarization: String,
    sample_rate: f64,
}

/// Scans stacked row-wise. The first scan decides which channels and how many
/// feeds every other scan must have.
struct Concatenation {
    num_feeds: usize,
    time: Vec<f64>,
    scan_id: Vec<usize>,
    coords: [Vec<f64>; 4],
    channels: IndexMap<String, ChannelColumns>,
}

impl Concatenation {
    fn new(first: &Scan, scan_id: usize) -> Concatenation {
        let channels = first
            .channels
            .iter()
            .map(|(name, c)| {
                (
                    name.clone(),
                    ChannelColumns {
                        values: vec![],
                        feeds: vec![],
                        filter: vec![],
                        polarization: c.polarization.clone(),
                        sample_rate: c.sample_rate,
                    },
                )
            })
            .collect();
        let mut concatenation = Concatenation {
            num_feeds: first.num_feeds(),
            time: vec![],
            scan_id: vec![],
            coords: Default::default(),
            channels,
        };
        concatenation.append(first, scan_id);
        concatenation
    }

    fn push(&mut self, scan: &Scan, scan_id: usize) -> Result<(), String> {
        if scan.num_feeds() != self.num_feeds {
            return Err(format!(
                "it has {} feeds, but earlier scans have {}",
                scan.num_feeds(),
                self.num_feeds
            ));
        }
        let same_channels = scan.channels.len() == self.channels.len()
            && scan.channels.keys().all(|k| self.channels.contains_key(k));
        if !same_channels {
            return Err(format!(
                "its channels ({}) don't match those of earlier scans ({})",
                scan.channels.keys().cloned().collect::<Vec<_>>().join(", "),
                self.channels.keys().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        self.append(scan, scan_id);
        Ok(())
    }

    fn append(&mut self, scan: &Scan, scan_id: usize) {
        let n = scan.num_samples();
        self.time.extend(scan.time.iter());
        self.scan_id.extend(std::iter::repeat(scan_id).take(n));
        for (column, coords) in self
            .coords
            .iter_mut()
            .zip([&scan.ra, &scan.dec, &scan.az, &scan.el])
        {
            column.extend(coords.iter());
        }
        for (name, column) in self.channels.iter_mut() {
            let channel = &scan.channels[name];
            column.values.extend(channel.values.iter());
            column.filter.extend(channel.filter.iter());
            column.feeds.extend(std::iter::repeat(channel.feed).take(n));
        }
    }

    fn finish(self, scan_list: Vec<PathBuf>, config: SdtConfig) -> Result<ScanSet, ScanSetError> {
        let num_rows = self.time.len();
        let shape = (num_rows, self.num_feeds);
        let [ra, dec, az, el] = self.coords;
        let to_array = |v: Vec<f64>| {
            let len = v.len();
            Array2::from_shape_vec(shape, v).map_err(|_| ScanError::Shape {
                what: "coordinates".to_string(),
                expected: vec![shape.0 * shape.1],
                got: vec![len],
            })
        };
        let ra = to_array(ra)?;
        let dec = to_array(dec)?;
        let az = to_array(az)?;
        let el = to_array(el)?;
        let channels = self
            .channels
            .into_iter()
            .map(|(name, c)| {
                (
                    name,
                    ScanSetChannel {
                        values: Array1::from(c.values),
                        feeds: Array1::from(c.feeds),
                        polarization: c.polarization,
                        sample_rate: c.sample_rate,
                        filter: Array1::from(c.filter),
                    },
                )
            })
            .collect();

        let stats = CoordinateStats::from_arrays([&ra, &dec, &az, &el]);
        let wcs = build_wcs(&config, &stats, false)?;
        let mut scan_set = ScanSet {
            time: Array1::from(self.time),
            scan_id: Array1::from(self.scan_id),
            x: Array2::from_elem(shape, f64::NAN),
            y: Array2::from_elem(shape, f64::NAN),
            ra,
            dec,
            az,
            el,
            channels,
            wcs,
            meta: ScanSetMeta {
                scan_list,
                stats,
                config,
            },
        };
        let (x, y) = scan_set.pixel_coordinates(&scan_set.wcs);
        scan_set.x = x;
        scan_set.y = y;
        Ok(scan_set)
    }
}
