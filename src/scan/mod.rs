// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Single scans: one pass of the telescope across the sky, sampled in time.
//!
//! Scans are read and written through the [`ScanStore`] trait, so the rest of
//! the crate doesn't care about the on-disk format. [`FitsScanStore`] is the
//! store used by the binary.

mod error;
pub(crate) mod fits;
#[cfg(test)]
mod tests;

pub use error::ScanError;
pub use fits::FitsScanStore;

use std::path::Path;

use indexmap::IndexMap;
use ndarray::prelude::*;
use regex::Regex;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::math::span;

lazy_static::lazy_static! {
    static ref CHANNEL_NAME: Regex = Regex::new(r"^Ch[0-9]+$|^Feed[0-9]+_[a-zA-Z]+$").unwrap();

    static ref FEED_NUMBER: Regex = Regex::new(r"^Feed([0-9]+)_").unwrap();
}

/// Does this column name follow the channel naming convention (`Feed<N>_<POL>`
/// or `Ch<N>`)?
pub fn is_channel_name(name: &str) -> bool {
    CHANNEL_NAME.is_match(name)
}

/// The feed encoded in a `Feed<N>_<POL>` channel name. `Ch<N>` names don't
/// encode one.
pub fn channel_feed(name: &str) -> Option<usize> {
    FEED_NUMBER
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// The sky coordinates carried by every scan.
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkyAxis {
    #[strum(serialize = "RA")]
    Ra,
    #[strum(serialize = "DEC")]
    Dec,
    #[strum(serialize = "AZ")]
    Az,
    #[strum(serialize = "EL")]
    El,
}

/// One detector channel of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanChannel {
    /// One value per sample, in counts until calibrated.
    pub values: Array1<f64>,

    /// Which feed (beam) recorded this channel.
    pub feed: usize,

    pub polarization: String,

    /// \[Hz\]
    pub sample_rate: f64,

    /// Per-sample mask; true means the sample is good.
    pub filter: Array1<bool>,
}

impl ScanChannel {
    /// A new channel with every sample marked good.
    pub fn new(values: Array1<f64>, feed: usize, polarization: &str, sample_rate: f64) -> Self {
        let filter = Array1::from_elem(values.len(), true);
        ScanChannel {
            values,
            feed,
            polarization: polarization.to_string(),
            sample_rate,
            filter,
        }
    }
}

/// Scan header information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanMeta {
    pub receiver: String,
    pub backend: String,
    pub subscan_id: i64,

    /// ISO 8601 UTC start of the scan.
    pub date_obs: String,

    /// Number of spectral channels per sample (1 for total-power data).
    pub spectral_channels: usize,

    /// Lower-case telescope site name.
    pub site: String,

    /// The whole scan is bad.
    pub flag: bool,

    /// A baseline has been subtracted.
    pub backsub: bool,
}

/// A single scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    /// MJD (UTC) of each sample.
    pub time: Array1<f64>,

    /// Sky coordinates \[radians\] with dimensions [sample, feed].
    pub ra: Array2<f64>,
    pub dec: Array2<f64>,
    pub az: Array2<f64>,
    pub el: Array2<f64>,

    /// Channels in the order they were recorded.
    pub channels: IndexMap<String, ScanChannel>,

    pub meta: ScanMeta,
}

impl Scan {
    /// A scan without channels. All coordinate arrays must be [samples, feeds]
    /// with one sample per timestamp.
    pub fn new(
        time: Array1<f64>,
        ra: Array2<f64>,
        dec: Array2<f64>,
        az: Array2<f64>,
        el: Array2<f64>,
        meta: ScanMeta,
    ) -> Result<Scan, ScanError> {
        let scan = Scan {
            time,
            ra,
            dec,
            az,
            el,
            channels: IndexMap::new(),
            meta,
        };
        scan.validate()?;
        Ok(scan)
    }

    pub fn num_samples(&self) -> usize {
        self.time.len()
    }

    pub fn num_feeds(&self) -> usize {
        self.ra.len_of(Axis(1))
    }

    pub fn coordinates(&self, axis: SkyAxis) -> &Array2<f64> {
        match axis {
            SkyAxis::Ra => &self.ra,
            SkyAxis::Dec => &self.dec,
            SkyAxis::Az => &self.az,
            SkyAxis::El => &self.el,
        }
    }

    /// The sky axis along which `feed` moves the furthest; earlier axes win
    /// ties. `None` if the feed doesn't move at all.
    pub fn scan_direction(&self, feed: usize) -> Option<SkyAxis> {
        if feed >= self.num_feeds() {
            return None;
        }
        let mut direction: Option<(SkyAxis, f64)> = None;
        for axis in SkyAxis::iter() {
            let extent = span(self.coordinates(axis).column(feed).iter());
            if extent > 0.0 && direction.map_or(true, |(_, longest)| extent > longest) {
                direction = Some((axis, extent));
            }
        }
        direction.map(|(axis, _)| axis)
    }

    /// Add a channel, checking its name, length and feed.
    pub fn add_channel(&mut self, name: &str, channel: ScanChannel) -> Result<(), ScanError> {
        check_channel(name, &channel, self.num_samples(), self.num_feeds())?;
        self.channels.insert(name.to_string(), channel);
        Ok(())
    }

    /// Check that every array in the scan agrees on its dimensions.
    pub fn validate(&self) -> Result<(), ScanError> {
        let num_samples = self.num_samples();
        let num_feeds = self.num_feeds();
        for (what, coords) in [
            ("ra", &self.ra),
            ("dec", &self.dec),
            ("az", &self.az),
            ("el", &self.el),
        ] {
            if coords.dim() != (num_samples, num_feeds) {
                return Err(ScanError::Shape {
                    what: what.to_string(),
                    expected: vec![num_samples, num_feeds],
                    got: coords.shape().to_vec(),
                });
            }
        }
        if num_feeds == 0 {
            return Err(ScanError::NoFeeds);
        }
        for (name, channel) in &self.channels {
            check_channel(name, channel, num_samples, num_feeds)?;
        }
        Ok(())
    }
}

fn check_channel(
    name: &str,
    channel: &ScanChannel,
    num_samples: usize,
    num_feeds: usize,
) -> Result<(), ScanError> {
    if !is_channel_name(name) {
        return Err(ScanError::BadChannelName(name.to_string()));
    }
    for (what, len) in [
        (name.to_string(), channel.values.len()),
        (format!("{name}-filt"), channel.filter.len()),
    ] {
        if len != num_samples {
            return Err(ScanError::Shape {
                what,
                expected: vec![num_samples],
                got: vec![len],
            });
        }
    }
    if channel.feed >= num_feeds {
        return Err(ScanError::FeedOutOfRange {
            channel: name.to_string(),
            feed: channel.feed,
            num_feeds,
        });
    }
    if let Some(named_feed) = channel_feed(name) {
        if named_feed != channel.feed {
            return Err(ScanError::FeedMismatch {
                channel: name.to_string(),
                feed: channel.feed,
            });
        }
    }
    Ok(())
}

/// Something that scans can be read from and written back to.
pub trait ScanStore {
    /// Read the scan at `path`.
    fn load(&self, path: &Path) -> Result<Scan, ScanError>;

    /// Write `scan` to `path`, replacing whatever was there.
    fn save(&self, path: &Path, scan: &Scan) -> Result<(), ScanError>;
}
