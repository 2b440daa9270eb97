// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod image;
mod mbfits;
mod sample_config;

use std::path::{Path, PathBuf};
use std::process::Output;
use std::str::from_utf8;

use assert_cmd::{output::OutputError, Command};
use ndarray::prelude::*;

use sdtimager::{
    scan::{ScanChannel, ScanMeta},
    FitsScanStore, Scan, ScanStore,
};

fn sdtimage() -> Command {
    Command::cargo_bin("sdtimage").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

const RA0: f64 = 1.0;
const DEC0: f64 = 0.0;
const GRID_OFFSETS: [f64; 4] = [-0.002, -0.0005, 0.0005, 0.002];

/// A scan visiting every point of a 4x4 grid once, one row of constant
/// declination after the other. LCP values are `i + j + k`, RCP twice that.
fn grid_scan(k: usize, subscan_id: i64) -> Scan {
    let mut ra = vec![];
    let mut dec = vec![];
    let mut lcp = vec![];
    for (j, d) in GRID_OFFSETS.iter().enumerate() {
        for (i, r) in GRID_OFFSETS.iter().enumerate() {
            ra.push(RA0 + r);
            dec.push(DEC0 + d);
            lcp.push((i + j + k) as f64);
        }
    }
    let n = ra.len();
    let ra = Array2::from_shape_vec((n, 1), ra).unwrap();
    let dec = Array2::from_shape_vec((n, 1), dec).unwrap();
    let time = Array1::linspace(59000.0, 59000.0 + n as f64 / 86400.0, n);
    let meta = ScanMeta {
        receiver: "CCB".to_string(),
        backend: "TP".to_string(),
        subscan_id,
        date_obs: "2020-05-31T00:00:00".to_string(),
        spectral_channels: 1,
        site: "srt".to_string(),
        flag: false,
        backsub: false,
    };
    let mut scan = Scan::new(time, ra.clone(), dec.clone(), ra, dec, meta).unwrap();
    let lcp = Array1::from(lcp);
    let rcp = &lcp * 2.0;
    scan.add_channel("Feed0_LCP", ScanChannel::new(lcp, 0, "LCP", 100.0))
        .unwrap();
    scan.add_channel("Feed0_RCP", ScanChannel::new(rcp, 0, "RCP", 100.0))
        .unwrap();
    scan
}

/// Write three passes over the grid as scan files under `root/data/map`, and
/// a config listing them. Returns the config file and the scan files.
fn write_grid_dataset(root: &Path) -> (PathBuf, Vec<PathBuf>) {
    let dir = root.join("data").join("map");
    std::fs::create_dir_all(&dir).unwrap();
    let store = FitsScanStore;
    let mut scans = vec![];
    for k in 0..3 {
        let path = dir.join(format!("scan{k:02}.fits"));
        store.save(&path, &grid_scan(k, k as i64 + 1)).unwrap();
        scans.push(path);
    }
    let config = root.join("config.toml");
    std::fs::write(
        &config,
        indoc::indoc! {r#"
            [local]
            workdir = "."
            datadir = "data"

            [analysis]
            list_of_directories = ["map"]
            projection = "CAR"
            npix = [4, 4]
        "#},
    )
    .unwrap();
    (config, scans)
}
