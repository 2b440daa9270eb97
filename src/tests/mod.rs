// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use indoc::formatdoc;
use ndarray::prelude::*;

use crate::{
    config::SdtConfig,
    scan::{Scan, ScanChannel, ScanError, ScanMeta, ScanStore},
};

/// Scans kept in memory. Paths still have to exist on disk for the config
/// globbing to find them, but their contents are never read.
#[derive(Default)]
pub(crate) struct MemoryScanStore {
    scans: RefCell<BTreeMap<PathBuf, Scan>>,
    saves: Cell<usize>,
}

impl MemoryScanStore {
    pub(crate) fn insert(&self, path: &Path, scan: Scan) {
        self.scans.borrow_mut().insert(path.to_path_buf(), scan);
    }

    pub(crate) fn get(&self, path: &Path) -> Option<Scan> {
        self.scans.borrow().get(path).cloned()
    }

    pub(crate) fn remove(&self, path: &Path) {
        self.scans.borrow_mut().remove(path);
    }

    pub(crate) fn num_saves(&self) -> usize {
        self.saves.get()
    }
}

impl ScanStore for MemoryScanStore {
    fn load(&self, path: &Path) -> Result<Scan, ScanError> {
        self.get(path)
            .ok_or_else(|| ScanError::NotFound(path.to_path_buf()))
    }

    fn save(&self, path: &Path, scan: &Scan) -> Result<(), ScanError> {
        scan.validate()?;
        self.saves.set(self.saves.get() + 1);
        self.insert(path, scan.clone());
        Ok(())
    }
}

/// The centre of the synthetic grid \[radians\].
pub(crate) const RA0: f64 = 1.0;
pub(crate) const DEC0: f64 = 0.0;

/// Offsets from the grid centre that land one per pixel on a 4x4 grid whose
/// pixels are 0.001 rad wide.
pub(crate) const GRID_OFFSETS: [f64; 4] = [-0.002, -0.0005, 0.0005, 0.002];

/// A one-feed scan through the given positions with one LCP and one RCP
/// channel. Horizontal coordinates mirror the equatorial ones.
pub(crate) fn synthetic_scan(ra: &[f64], dec: &[f64], lcp: &[f64], rcp: &[f64]) -> Scan {
    let n = ra.len();
    let ra = Array2::from_shape_vec((n, 1), ra.to_vec()).unwrap();
    let dec = Array2::from_shape_vec((n, 1), dec.to_vec()).unwrap();
    let time = Array1::linspace(59000.0, 59000.0 + n as f64 / 86400.0, n);
    let meta = ScanMeta {
        receiver: "CCB".to_string(),
        backend: "TP".to_string(),
        subscan_id: 1,
        date_obs: "2020-05-31T00:00:00".to_string(),
        spectral_channels: 1,
        site: "srt".to_string(),
        flag: false,
        backsub: false,
    };
    let mut scan = Scan::new(time, ra.clone(), dec.clone(), ra, dec, meta).unwrap();
    scan.add_channel(
        "Feed0_LCP",
        ScanChannel::new(Array1::from(lcp.to_vec()), 0, "LCP", 100.0),
    )
    .unwrap();
    scan.add_channel(
        "Feed0_RCP",
        ScanChannel::new(Array1::from(rcp.to_vec()), 0, "RCP", 100.0),
    )
    .unwrap();
    scan
}

/// A scan visiting every point of the 4x4 grid once, rows of constant
/// declination one after the other. Channel values are `f(ra_index,
/// dec_index)` for LCP and twice that for RCP.
pub(crate) fn grid_scan<F: Fn(usize, usize) -> f64>(f: F) -> Scan {
    let mut ra = vec![];
    let mut dec = vec![];
    let mut lcp = vec![];
    let mut rcp = vec![];
    for (j, d) in GRID_OFFSETS.iter().enumerate() {
        for (i, r) in GRID_OFFSETS.iter().enumerate() {
            ra.push(RA0 + r);
            dec.push(DEC0 + d);
            lcp.push(f(i, j));
            rcp.push(2.0 * f(i, j));
        }
    }
    synthetic_scan(&ra, &dec, &lcp, &rcp)
}

/// Make a data directory layout under `root` holding one empty file per scan,
/// store the scans and return a config pointing at them. Scans are named
/// `scanNN.fits` inside `dir`.
pub(crate) fn setup_dataset(
    root: &Path,
    dir: &str,
    scans: Vec<Scan>,
    store: &MemoryScanStore,
    extra_analysis: &str,
) -> (SdtConfig, Vec<PathBuf>) {
    let data_dir = root.join("data");
    std::fs::create_dir_all(data_dir.join(dir)).unwrap();
    let mut paths = vec![];
    for (i, scan) in scans.into_iter().enumerate() {
        let path = data_dir.join(dir).join(format!("scan{i:02}.fits"));
        std::fs::write(&path, b"").unwrap();
        store.insert(&path, scan);
        paths.push(path);
    }
    let config_file = root.join("config.toml");
    std::fs::write(
        &config_file,
        formatdoc! {r#"
            [local]
            workdir = "."
            datadir = "data"

            [analysis]
            list_of_directories = ["{dir}"]
            projection = "CAR"
            npix = [4, 4]
            {extra_analysis}
        "#},
    )
    .unwrap();
    (SdtConfig::read(&config_file).unwrap(), paths)
}
