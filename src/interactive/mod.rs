// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Editing scans from their images.
//!
//! A user picks a pixel on a channel's variance map. Every scan passing
//! through that pixel is reloaded and shown to the user along its scan
//! direction; the user can zap intervals, subtract a linear baseline or flag
//! the whole scan. Each edited scan is saved before the scan set's copy of it
//! is patched, and the images are then made again.
//!
//! Every function here takes the channel being edited as an argument.

mod error;
mod terminal;

pub use error::InteractiveError;
pub use terminal::TerminalInterface;

use std::path::PathBuf;

use itertools::Itertools;
use log::{debug, trace, warn};
use ndarray::prelude::*;
use strum_macros::Display;

use crate::{
    constants::PIXEL_SELECTION_RADIUS,
    imager::{ImageMap, ImagingOptions},
    math::min_max_mean,
    scan::{ScanStore, SkyAxis},
    scanset::ScanSet,
    wcs::SkyWcs,
};

/// The direction a scan moves in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ScanAxis {
    #[strum(serialize = "RA")]
    Ra,
    #[strum(serialize = "Dec")]
    Dec,
}

impl ScanAxis {
    pub fn sky_axis(self) -> SkyAxis {
        match self {
            ScanAxis::Ra => SkyAxis::Ra,
            ScanAxis::Dec => SkyAxis::Dec,
        }
    }

    /// The axis with the larger coordinate range. Equal ranges give RA.
    /// `None` if either axis has no finite values.
    pub fn classify(ra: ArrayView1<f64>, dec: ArrayView1<f64>) -> Option<ScanAxis> {
        let (ra_min, ra_max, _) = min_max_mean(ra.iter())?;
        let (dec_min, dec_max, _) = min_max_mean(dec.iter())?;
        if ra_max - ra_min >= dec_max - dec_min {
            Some(ScanAxis::Ra)
        } else {
            Some(ScanAxis::Dec)
        }
    }
}

/// Pair up boundaries `[x0, x1, x2, x3, ...]` into closed intervals
/// `(x0, x1), (x2, x3), ...`. The two ends of an interval may come in either
/// order.
pub fn zap_intervals(boundaries: &[f64]) -> Result<Vec<(f64, f64)>, InteractiveError> {
    if boundaries.len() % 2 != 0 {
        return Err(InteractiveError::OddBoundaryCount(boundaries.len()));
    }
    Ok(boundaries
        .iter()
        .tuples()
        .map(|(&a, &b)| (a.min(b), a.max(b)))
        .collect())
}

/// A mask that is false for coordinates inside any of the intervals.
pub fn zap_mask(coordinates: ArrayView1<f64>, intervals: &[(f64, f64)]) -> Array1<bool> {
    coordinates.mapv(|c| !intervals.iter().any(|&(lo, hi)| c >= lo && c <= hi))
}

/// The feed a scan set channel was recorded on.
pub fn channel_feed(scan_set: &ScanSet, channel: &str) -> Result<usize, InteractiveError> {
    let column = scan_set
        .channels
        .get(channel)
        .ok_or_else(|| InteractiveError::UnknownChannel(channel.to_string()))?;
    let feeds: Vec<usize> = column.feeds.iter().copied().unique().sorted().collect();
    match feeds.as_slice() {
        [] => Ok(0),
        [feed] => Ok(*feed),
        _ => Err(InteractiveError::MixedFeeds {
            channel: channel.to_string(),
            feeds,
        }),
    }
}

/// The IDs of every scan with a sample of `channel` less than one pixel away
/// from `(x, y)` on both axes of the grid described by `wcs`, in ascending
/// order. Masked samples count too. With `no_offsets`, feed 0's positions are
/// used, as they are when imaging.
pub fn find_scans_through_pixel(
    scan_set: &ScanSet,
    wcs: &SkyWcs,
    channel: &str,
    no_offsets: bool,
    x: f64,
    y: f64,
) -> Result<Vec<usize>, InteractiveError> {
    let feed = channel_feed(scan_set, channel)?;
    let feed = if no_offsets { 0 } else { feed };
    let fresh;
    let (px, py) = if *wcs == scan_set.wcs {
        (&scan_set.x, &scan_set.y)
    } else {
        fresh = scan_set.pixel_coordinates(wcs);
        (&fresh.0, &fresh.1)
    };
    let ids = px
        .column(feed)
        .iter()
        .zip(py.column(feed))
        .zip(scan_set.scan_id.iter())
        .filter(|((px, py), _)| {
            (**px - x).abs() < PIXEL_SELECTION_RADIUS && (**py - y).abs() < PIXEL_SELECTION_RADIUS
        })
        .map(|(_, &id)| id)
        .unique()
        .sorted()
        .collect();
    Ok(ids)
}

/// A freshly loaded scan, as shown to the user for editing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanTrace {
    pub scan_id: usize,
    pub path: PathBuf,
    pub axis: ScanAxis,

    /// The channel's feed position along `axis` \[radians\].
    pub coordinates: Array1<f64>,
    pub values: Array1<f64>,
    pub mask: Array1<bool>,
}

/// Reload the given scans. Scans that fail to load, or that lack the
/// channel, are skipped with a warning.
pub fn load_traces(
    scan_set: &ScanSet,
    store: &dyn ScanStore,
    channel: &str,
    scan_ids: &[usize],
) -> Result<Vec<ScanTrace>, InteractiveError> {
    let feed = channel_feed(scan_set, channel)?;
    let mut traces = Vec::with_capacity(scan_ids.len());
    for &scan_id in scan_ids {
        let path = scan_set
            .scan_path(scan_id)
            .ok_or(InteractiveError::UnknownScan(scan_id))?;
        let scan = match store.load(path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Couldn't reload {}: {e}", path.display());
                continue;
            }
        };
        let Some(column) = scan.channels.get(channel) else {
            warn!("{} has no channel {channel}", path.display());
            continue;
        };
        let ra = scan.ra.column(feed);
        let dec = scan.dec.column(feed);
        let axis = ScanAxis::classify(ra, dec)
            .ok_or(InteractiveError::UnclassifiableDirection { scan_id })?;
        debug!("Scan {scan_id} runs along {axis}");
        let coordinates = match axis {
            ScanAxis::Ra => ra.to_owned(),
            ScanAxis::Dec => dec.to_owned(),
        };
        traces.push(ScanTrace {
            scan_id,
            path: path.to_path_buf(),
            axis,
            coordinates,
            values: column.values.clone(),
            mask: column.filter.clone(),
        });
    }
    Ok(traces)
}

/// Changes to make to one channel of a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanEdit {
    /// Interval boundaries along the scan direction. If not empty, the
    /// channel's mask is replaced with one excluding these intervals.
    pub zap: Vec<f64>,

    /// `(slope, intercept)` of a line in the scan direction coordinate to
    /// subtract from the channel's values.
    pub baseline: Option<(f64, f64)>,

    /// Mark the whole scan as bad.
    pub flag: bool,
}

/// Apply `edit` to `channel` of a scan: reload it, change it, save it, then
/// patch the scan set's rows for the scan. Returns false if the scan
/// couldn't be reloaded, in which case nothing is changed.
pub fn update_scan(
    scan_set: &mut ScanSet,
    store: &dyn ScanStore,
    channel: &str,
    scan_id: usize,
    axis: ScanAxis,
    edit: &ScanEdit,
) -> Result<bool, InteractiveError> {
    let intervals = zap_intervals(&edit.zap)?;
    let feed = channel_feed(scan_set, channel)?;
    let path = scan_set
        .scan_path(scan_id)
        .ok_or(InteractiveError::UnknownScan(scan_id))?
        .to_path_buf();

    let mut scan = match store.load(&path) {
        Ok(s) => s,
        Err(e) => {
            warn!("Couldn't reload {}; its edits are skipped: {e}", path.display());
            return Ok(false);
        }
    };
    let coordinates = scan.coordinates(axis.sky_axis()).column(feed).to_owned();
    let Some(column) = scan.channels.get_mut(channel) else {
        warn!("{} has no channel {channel}; its edits are skipped", path.display());
        return Ok(false);
    };

    if !edit.zap.is_empty() {
        column.filter = zap_mask(coordinates.view(), &intervals);
        debug!(
            "Scan {scan_id}: {} of {} samples zapped",
            column.filter.iter().filter(|&&g| !g).count(),
            column.filter.len()
        );
    }
    if let Some((slope, intercept)) = edit.baseline {
        column.values -= &coordinates.mapv(|c| slope * c + intercept);
        scan.meta.backsub = true;
    }
    if edit.flag {
        scan.meta.flag = true;
    }

    store.save(&path, &scan)?;
    scan_set.mirror_scan(scan_id, &scan)?;
    Ok(true)
}

/// The states of the editing loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Idle,
    PixelSelected {
        x: f64,
        y: f64,
        scan_ids: Vec<usize>,
    },
    AxisChosen {
        scan_id: usize,
        axis: ScanAxis,
    },
    ScanSelected {
        scan_id: usize,
    },
    Edited {
        scan_id: usize,
        edit: ScanEdit,
    },
    Saved {
        scan_id: usize,
    },
}

/// Something that shows maps and scans to a user and asks what to do.
pub trait UserInterface {
    /// Show a map and get the 0-based pixel coordinates of the user's choice,
    /// or `None` to stop editing.
    fn select_pixel(
        &mut self,
        channel: &str,
        map: &Array2<f64>,
    ) -> Result<Option<[f64; 2]>, InteractiveError>;

    /// Show a scan and get the changes for it, or `None` to skip the rest of
    /// the scans through the pixel.
    fn edit_scan(
        &mut self,
        channel: &str,
        trace: &ScanTrace,
    ) -> Result<Option<ScanEdit>, InteractiveError>;

    /// An edit was rejected; the scan will be shown again.
    fn rejected(&mut self, error: &InteractiveError) {
        warn!("{error}");
    }

    fn state_changed(&mut self, state: &LoopState) {
        trace!("{state:?}");
    }
}

/// The map shown when picking pixels: the channel's variance before
/// calibration, with empty and NaN pixels set to the mean of the others.
pub fn display_map(images: &ImageMap, channel: &str) -> Option<Array2<f64>> {
    let image = images.channels.get(channel)?;
    let sdev = image.raw.as_ref().map_or(&image.sdev, |raw| &raw.sdev);
    let is_bad = |v: f64| v == 0.0 || v.is_nan();
    let fill = min_max_mean(sdev.iter().filter(|&&v| !is_bad(v))).map_or(0.0, |(_, _, mean)| mean);
    Some(sdev.mapv(|v| if is_bad(v) { fill } else { v }))
}

/// Runs the editing loop over a scan set.
pub struct InteractiveSession<'a> {
    scan_set: &'a mut ScanSet,
    store: &'a dyn ScanStore,
    options: ImagingOptions<'a>,
    state: LoopState,
}

impl<'a> InteractiveSession<'a> {
    /// Editing works on per-channel images, so `options.scrunch` is ignored.
    pub fn new(
        scan_set: &'a mut ScanSet,
        store: &'a dyn ScanStore,
        options: ImagingOptions<'a>,
    ) -> InteractiveSession<'a> {
        InteractiveSession {
            scan_set,
            store,
            options: ImagingOptions {
                scrunch: false,
                ..options
            },
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    fn transition(&mut self, state: LoopState, ui: &mut dyn UserInterface) {
        ui.state_changed(&state);
        self.state = state;
    }

    /// Edit `channel` until the user stops selecting pixels, returning the
    /// last images made.
    pub fn run(
        &mut self,
        channel: &str,
        ui: &mut dyn UserInterface,
    ) -> Result<ImageMap, InteractiveError> {
        channel_feed(self.scan_set, channel)?;
        loop {
            self.transition(LoopState::Idle, ui);
            let images = self.scan_set.calculate_images(&self.options)?;
            let map = display_map(&images, channel)
                .ok_or_else(|| InteractiveError::UnknownChannel(channel.to_string()))?;
            let Some([x, y]) = ui.select_pixel(channel, &map)? else {
                return Ok(images);
            };

            let scan_ids = find_scans_through_pixel(
                self.scan_set,
                &images.wcs,
                channel,
                self.options.no_offsets,
                x,
                y,
            )?;
            debug!("Scans through ({x}, {y}): {scan_ids:?}");
            self.transition(
                LoopState::PixelSelected {
                    x,
                    y,
                    scan_ids: scan_ids.clone(),
                },
                ui,
            );

            let traces = load_traces(self.scan_set, self.store, channel, &scan_ids)?;
            'scans: for trace in traces {
                self.transition(
                    LoopState::AxisChosen {
                        scan_id: trace.scan_id,
                        axis: trace.axis,
                    },
                    ui,
                );
                self.transition(
                    LoopState::ScanSelected {
                        scan_id: trace.scan_id,
                    },
                    ui,
                );
                let edit = loop {
                    let Some(edit) = ui.edit_scan(channel, &trace)? else {
                        debug!("Leaving the remaining scans unchanged");
                        break 'scans;
                    };
                    match zap_intervals(&edit.zap) {
                        Ok(_) => break edit,
                        Err(e) => ui.rejected(&e),
                    }
                };
                self.transition(
                    LoopState::Edited {
                        scan_id: trace.scan_id,
                        edit: edit.clone(),
                    },
                    ui,
                );
                if update_scan(
                    self.scan_set,
                    self.store,
                    channel,
                    trace.scan_id,
                    trace.axis,
                    &edit,
                )? {
                    self.transition(
                        LoopState::Saved {
                            scan_id: trace.scan_id,
                        },
                        ui,
                    );
                }
            }
        }
    }
}
