// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::tests::{grid_scan, synthetic_scan};

#[test]
fn test_channel_names() {
    assert!(is_channel_name("Feed0_LCP"));
    assert!(is_channel_name("Feed12_Q"));
    assert!(is_channel_name("Ch3"));
    assert!(!is_channel_name("Feed0_LCP-filt"));
    assert!(!is_channel_name("Feed_LCP"));
    assert!(!is_channel_name("TIME"));
    assert!(!is_channel_name("ra"));

    assert_eq!(channel_feed("Feed0_LCP"), Some(0));
    assert_eq!(channel_feed("Feed12_Q"), Some(12));
    assert_eq!(channel_feed("Ch3"), None);
}

#[test]
fn test_add_channel_checks() {
    let mut scan = synthetic_scan(&[1.0, 1.1], &[0.0, 0.0], &[1.0, 2.0], &[3.0, 4.0]);
    assert_eq!(scan.num_samples(), 2);
    assert_eq!(scan.num_feeds(), 1);
    assert!(scan.channels["Feed0_LCP"].filter.iter().all(|&f| f));

    let result = scan.add_channel(
        "Feed0_LCP-filt",
        ScanChannel::new(array![1.0, 2.0], 0, "LCP", 1.0),
    );
    assert!(matches!(result, Err(ScanError::BadChannelName(_))));

    let result = scan.add_channel("Ch1", ScanChannel::new(array![1.0], 0, "LCP", 1.0));
    assert!(matches!(result, Err(ScanError::Shape { .. })));

    let result = scan.add_channel("Ch1", ScanChannel::new(array![1.0, 2.0], 1, "LCP", 1.0));
    assert!(matches!(
        result,
        Err(ScanError::FeedOutOfRange { num_feeds: 1, .. })
    ));

    // Names that carry a feed must agree with it.
    let mut two_feeds = scan.clone();
    two_feeds.ra = Array2::zeros((2, 2));
    two_feeds.dec = Array2::zeros((2, 2));
    two_feeds.az = Array2::zeros((2, 2));
    two_feeds.el = Array2::zeros((2, 2));
    let result = two_feeds.add_channel(
        "Feed0_Q",
        ScanChannel::new(array![1.0, 2.0], 1, "Q", 1.0),
    );
    assert!(matches!(result, Err(ScanError::FeedMismatch { feed: 1, .. })));

    scan.add_channel("Ch1", ScanChannel::new(array![1.0, 2.0], 0, "LCP", 1.0))
        .unwrap();
    assert_eq!(
        scan.channels.keys().collect::<Vec<_>>(),
        ["Feed0_LCP", "Feed0_RCP", "Ch1"]
    );
}

#[test]
fn test_validate_shapes() {
    let mut scan = synthetic_scan(&[1.0, 1.1], &[0.0, 0.0], &[1.0, 2.0], &[3.0, 4.0]);
    assert!(scan.validate().is_ok());
    scan.el = Array2::zeros((3, 1));
    assert!(matches!(
        scan.validate(),
        Err(ScanError::Shape { what, .. }) if what == "el"
    ));

    let result = Scan::new(
        array![1.0],
        Array2::zeros((1, 0)),
        Array2::zeros((1, 0)),
        Array2::zeros((1, 0)),
        Array2::zeros((1, 0)),
        ScanMeta::default(),
    );
    assert!(matches!(result, Err(ScanError::NoFeeds)));
}

#[test]
fn test_fits_scan_store() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("scan.fits");
    let mut scan = grid_scan(|i, j| (i + 4 * j) as f64);
    scan.meta.subscan_id = 7;
    scan.meta.flag = true;
    scan.channels["Feed0_RCP"].filter[3] = false;

    let store = FitsScanStore;
    store.save(&path, &scan).unwrap();
    let read = store.load(&path).unwrap();

    assert_eq!(read.meta, scan.meta);
    assert_eq!(read.num_samples(), 16);
    assert_abs_diff_eq!(read.ra, scan.ra);
    assert_abs_diff_eq!(read.dec, scan.dec);
    assert_abs_diff_eq!(read.time, scan.time);
    assert_eq!(
        read.channels.keys().collect::<Vec<_>>(),
        ["Feed0_LCP", "Feed0_RCP"]
    );
    let rcp = &read.channels["Feed0_RCP"];
    assert_eq!(rcp.polarization, "RCP");
    assert_eq!(rcp.feed, 0);
    assert_abs_diff_eq!(rcp.sample_rate, 100.0);
    assert_abs_diff_eq!(rcp.values, scan.channels["Feed0_RCP"].values);
    assert!(!rcp.filter[3]);
    assert_eq!(rcp.filter.iter().filter(|&&f| f).count(), 15);

    // Saving again replaces the file.
    scan.meta.flag = false;
    store.save(&path, &scan).unwrap();
    assert!(!store.load(&path).unwrap().meta.flag);
}

#[test]
fn test_fits_scan_store_missing_file() {
    let result = FitsScanStore.load(std::path::Path::new("/does/not/exist.fits"));
    assert!(matches!(result, Err(ScanError::NotFound(_))));
}

#[test]
fn test_scan_direction() {
    let along_ra = synthetic_scan(&[1.0, 1.1, 1.2], &[0.0, 0.01, 0.0], &[0.0; 3], &[0.0; 3]);
    assert_eq!(along_ra.scan_direction(0), Some(SkyAxis::Ra));

    let mut along_el = along_ra.clone();
    along_el.ra.fill(1.0);
    along_el.dec.fill(0.0);
    along_el.az.fill(2.0);
    along_el.el = array![[0.5], [0.6], [0.7]];
    assert_eq!(along_el.scan_direction(0), Some(SkyAxis::El));

    let mut still = along_el.clone();
    still.el.fill(0.5);
    assert_eq!(still.scan_direction(0), None);
    assert_eq!(along_ra.scan_direction(1), None);

    // Equal extents go to the earlier axis.
    let diagonal = synthetic_scan(&[1.0, 1.5], &[0.0, 0.5], &[0.0; 2], &[0.0; 2]);
    assert_eq!(diagonal.scan_direction(0), Some(SkyAxis::Ra));
}
