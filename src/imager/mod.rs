// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Accumulating scan set rows into images.
//!
//! Every channel gets a mean flux map, a variance map (called "Sdev" in
//! output names) and an exposure map, all on the scan set's pixel grid.
//! Images are indexed `[y, x]`, matching FITS image conventions.

mod error;

pub use error::ImagerError;

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, warn};
use ndarray::{prelude::*, Zip};
use strum_macros::EnumIter;

use crate::{
    calibration::{calibrate_images, FluxCalibration},
    constants::{GRID_EDGE_TOLERANCE, SCRUNCH_EXPOSURE_PERCENTILE},
    math::{bin_index, percentile},
    scanset::ScanSet,
    wcs::{CoordinateFrame, SkyWcs},
};

/// What to do when making images.
#[derive(Clone, Copy, Default)]
pub struct ImagingOptions<'a> {
    /// Merge every channel into one image.
    pub scrunch: bool,

    /// Use feed 0's positions for every channel.
    pub no_offsets: bool,

    /// Image in azimuth and elevation rather than RA and Dec.
    pub altaz: bool,

    /// Convert the per-channel images to Jy.
    pub calibration: Option<&'a dyn FluxCalibration>,
}

/// Copies of a channel's maps from before calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub mean: Array2<f64>,
    pub sdev: Array2<f64>,
}

/// The maps made for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelImage {
    /// Mean value per pixel. Pixels with no exposure hold the (zero) sum.
    pub mean: Array2<f64>,

    /// Variance per pixel.
    pub sdev: Array2<f64>,

    /// Number of samples per pixel.
    pub expo: Array2<f64>,

    /// Set once the channel has been calibrated.
    pub raw: Option<RawImage>,

    /// Pixels whose values were replaced with placeholders before calibration.
    pub coerced: Option<Array2<bool>>,
}

/// The kinds of map written for a channel.
#[derive(Debug, EnumIter, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Mean,
    Sdev,
    Expo,
    Raw,
    SdevRaw,
}

impl MapKind {
    /// Appended to the channel name to name a map.
    pub fn suffix(self) -> &'static str {
        match self {
            MapKind::Mean => "",
            MapKind::Sdev => "-Sdev",
            MapKind::Expo => "-EXPO",
            MapKind::Raw => "-RAW",
            MapKind::SdevRaw => "-Sdev-RAW",
        }
    }
}

/// A named map borrowed from an [`ImageMap`].
#[derive(Debug)]
pub struct NamedMap<'a> {
    pub name: String,
    pub kind: MapKind,
    pub data: &'a Array2<f64>,
}

/// Images for every channel, with the WCS they were made on.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMap {
    pub wcs: SkyWcs,
    pub channels: BTreeMap<String, ChannelImage>,
}

impl ImageMap {
    /// Every map, ordered by name.
    pub fn maps(&self) -> Vec<NamedMap> {
        let mut maps = vec![];
        for (channel, image) in &self.channels {
            let mut kinds = vec![
                (MapKind::Mean, &image.mean),
                (MapKind::Sdev, &image.sdev),
                (MapKind::Expo, &image.expo),
            ];
            if let Some(raw) = &image.raw {
                kinds.push((MapKind::Raw, &raw.mean));
                kinds.push((MapKind::SdevRaw, &raw.sdev));
            }
            maps.extend(kinds.into_iter().map(|(kind, data)| NamedMap {
                name: format!("{channel}{}", kind.suffix()),
                kind,
                data,
            }));
        }
        maps.sort_by(|a, b| a.name.cmp(&b.name));
        maps
    }

    /// Look up a map by its full name, e.g. `Feed0_LCP-Sdev`.
    pub fn get(&self, name: &str) -> Option<&Array2<f64>> {
        self.maps()
            .into_iter()
            .find(|m| m.name == name)
            .map(|m| m.data)
    }
}

/// Per-pixel sums for one channel.
struct Accumulation {
    sum: Array2<f64>,
    sum_sq: Array2<f64>,
    expo: Array2<f64>,
}

impl Accumulation {
    fn zeros(shape: (usize, usize)) -> Accumulation {
        Accumulation {
            sum: Array2::zeros(shape),
            sum_sq: Array2::zeros(shape),
            expo: Array2::zeros(shape),
        }
    }

    fn add(&mut self, other: &Accumulation) {
        self.sum += &other.sum;
        self.sum_sq += &other.sum_sq;
        self.expo += &other.expo;
    }

    /// Mean and variance where there's exposure; elsewhere the sums are kept.
    fn normalise(&self) -> (Array2<f64>, Array2<f64>) {
        let mut mean = self.sum.clone();
        let mut var = self.sum_sq.clone();
        Zip::from(&mut mean)
            .and(&mut var)
            .and(&self.expo)
            .for_each(|m, v, &e| {
                if e > 0.0 {
                    *m /= e;
                    *v = *v / e - *m * *m;
                }
            });
        (mean, var)
    }
}

impl ScanSet {
    /// Make images of every channel. Nothing is cached; calling this again
    /// after editing the scan set gives fresh images.
    pub fn calculate_images(&self, options: &ImagingOptions) -> Result<ImageMap, ImagerError> {
        let horizontal = self.wcs.frame == CoordinateFrame::Horizontal;
        let fresh;
        let (wcs, x, y) = if options.altaz == horizontal {
            (&self.wcs, &self.x, &self.y)
        } else {
            let wcs = self.create_wcs(options.altaz)?;
            let (x, y) = self.pixel_coordinates(&wcs);
            fresh = (wcs, x, y);
            (&fresh.0, &fresh.1, &fresh.2)
        };
        let [nx, ny] = wcs.npix;

        let mut total = Accumulation::zeros((ny, nx));
        let mut channels = BTreeMap::new();
        for (name, channel) in &self.channels {
            let feeds: Vec<usize> = channel.feeds.iter().copied().unique().sorted().collect();
            let feed = match feeds.as_slice() {
                [] => 0,
                [feed] => *feed,
                _ => {
                    return Err(ImagerError::MixedFeeds {
                        channel: name.clone(),
                        feeds,
                    })
                }
            };
            let feed = if options.no_offsets { 0 } else { feed };
            debug!("Imaging {name} with feed {feed} positions");

            let mut acc = Accumulation::zeros((ny, nx));
            for (row, (&value, &good)) in channel
                .values
                .iter()
                .zip(channel.filter.iter())
                .enumerate()
            {
                if !good {
                    continue;
                }
                let (Some(i), Some(j)) = (
                    bin_index(x[[row, feed]], nx, GRID_EDGE_TOLERANCE),
                    bin_index(y[[row, feed]], ny, GRID_EDGE_TOLERANCE),
                ) else {
                    continue;
                };
                acc.expo[[j, i]] += 1.0;
                acc.sum[[j, i]] += value;
                acc.sum_sq[[j, i]] += value * value;
            }
            total.add(&acc);

            let (mean, sdev) = acc.normalise();
            channels.insert(
                name.clone(),
                ChannelImage {
                    mean,
                    sdev,
                    expo: acc.expo,
                    raw: None,
                    coerced: None,
                },
            );
        }

        let mut images = ImageMap {
            wcs: wcs.clone(),
            channels,
        };
        if let Some(calibration) = options.calibration {
            calibrate_images(&mut images, calibration);
        }

        if options.scrunch {
            let Some(first) = self.channels.keys().next() else {
                return Ok(images);
            };
            if options.calibration.is_some() {
                warn!("The merged image is made from uncalibrated totals");
            }
            images.channels = BTreeMap::from([(first.clone(), scrunch(&total))]);
        }
        Ok(images)
    }
}

/// Merge the totals of every channel. Pixels with an exposure at or below the
/// low percentile of the exposure map are zeroed.
fn scrunch(total: &Accumulation) -> ChannelImage {
    let threshold = percentile(total.expo.iter(), SCRUNCH_EXPOSURE_PERCENTILE);
    let mut mean = Array2::zeros(total.sum.dim());
    let mut sdev = Array2::zeros(total.sum.dim());
    Zip::from(&mut mean)
        .and(&mut sdev)
        .and(&total.sum)
        .and(&total.sum_sq)
        .and(&total.expo)
        .for_each(|m, v, &s, &sq, &e| {
            if e > threshold {
                *m = s / e;
                *v = sq / e - *m * *m;
            }
        });
    ChannelImage {
        mean,
        sdev,
        expo: total.expo.clone(),
        raw: None,
        coerced: None,
    }
}
