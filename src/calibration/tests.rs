// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::TempDir;

use super::*;
use crate::{
    imager::ChannelImage,
    wcs::{CoordinateFrame, Projection, SkyWcs},
};

fn table() -> CalibratorTable {
    CalibratorTable {
        default: None,
        channels: IndexMap::from([(
            "Feed0_LCP".to_string(),
            CalibrationFactor {
                factor: 0.5,
                error: 0.05,
            },
        )]),
    }
}

fn images() -> ImageMap {
    let image = |mean: Array2<f64>, sdev: Array2<f64>| ChannelImage {
        expo: Array2::ones(mean.dim()),
        mean,
        sdev,
        raw: None,
        coerced: None,
    };
    ImageMap {
        wcs: SkyWcs::new(
            Projection::Arc,
            CoordinateFrame::Equatorial,
            [2, 2],
            [1.0, 0.0],
            [0.1, 0.1],
        )
        .unwrap(),
        channels: BTreeMap::from([
            (
                "Feed0_LCP".to_string(),
                image(
                    array![[2.0, 0.0], [4.0, 8.0]],
                    array![[0.4, 0.3], [f64::NAN, 1.6]],
                ),
            ),
            (
                "Feed0_RCP".to_string(),
                image(array![[1.0, 1.0], [1.0, 1.0]], array![[0.1, 0.1], [0.1, 0.1]]),
            ),
        ]),
    }
}

#[test]
fn test_table_lookup() {
    let mut table = table();
    assert_eq!(table.jy_over_counts("Feed0_LCP"), (0.5, 0.05));
    let (f, e) = table.jy_over_counts("Feed0_RCP");
    assert!(f.is_nan());
    assert!(e.is_nan());

    table.default = Some(CalibrationFactor {
        factor: 2.0,
        error: 0.0,
    });
    assert_eq!(table.jy_over_counts("Feed0_RCP"), (2.0, 0.0));
    assert_eq!(table.jy_over_counts("Feed0_LCP"), (0.5, 0.05));
}

#[test]
fn test_read_tables() {
    let tmp_dir = TempDir::new().unwrap();

    let toml_file = tmp_dir.path().join("cal.toml");
    std::fs::write(
        &toml_file,
        indoc! {r#"
            [default]
            factor = 2.0

            [channels.Feed0_LCP]
            factor = 0.5
            error = 0.05
        "#},
    )
    .unwrap();
    let read = CalibratorTable::read(&toml_file).unwrap();
    assert_eq!(read.channels, table().channels);
    assert_eq!(
        read.default,
        Some(CalibrationFactor {
            factor: 2.0,
            error: 0.0
        })
    );

    let json_file = tmp_dir.path().join("cal.JSON");
    std::fs::write(
        &json_file,
        r#"{"channels": {"Feed0_LCP": {"factor": 0.5, "error": 0.05}}}"#,
    )
    .unwrap();
    assert_eq!(CalibratorTable::read(&json_file).unwrap(), table());

    let bad_ext = tmp_dir.path().join("cal.ini");
    std::fs::write(&bad_ext, "").unwrap();
    assert!(matches!(
        CalibratorTable::read(&bad_ext),
        Err(CalibrationError::UnknownExtension { .. })
    ));

    let bad_toml = tmp_dir.path().join("bad.toml");
    std::fs::write(&bad_toml, "[channels.Feed0_LCP]\nfactr = 1.0\n").unwrap();
    assert!(matches!(
        CalibratorTable::read(&bad_toml),
        Err(CalibrationError::Decode { .. })
    ));

    assert!(matches!(
        CalibratorTable::read(tmp_dir.path().join("missing.toml")),
        Err(CalibrationError::Read { .. })
    ));
}

#[test]
fn test_calibrate_images() {
    let mut images = images();
    let before = images.clone();
    let report = calibrate_images(&mut images, &table());
    assert_eq!(report.calibrated, vec!["Feed0_LCP".to_string()]);
    assert_eq!(report.skipped, vec!["Feed0_RCP".to_string()]);

    let lcp = &images.channels["Feed0_LCP"];
    let raw = lcp.raw.as_ref().unwrap();
    assert_eq!(raw.mean, before.channels["Feed0_LCP"].mean);
    assert_abs_diff_eq!(raw.sdev[[0, 0]], 0.4);
    assert!(raw.sdev[[1, 0]].is_nan());

    // Untouched pixels come back when divided by the factor.
    assert_abs_diff_eq!(lcp.mean[[0, 0]] / 0.5, 2.0);
    assert_abs_diff_eq!(lcp.mean[[1, 1]] / 0.5, 8.0);
    // var' = mean' * (var / mean + eF / F)
    assert_abs_diff_eq!(lcp.sdev[[0, 0]], 1.0 * (0.4 / 2.0 + 0.1), epsilon = 1e-12);
    assert_abs_diff_eq!(lcp.sdev[[1, 1]], 4.0 * (1.6 / 8.0 + 0.1), epsilon = 1e-12);

    // A zero mean and a NaN variance are both replaced.
    let coerced = lcp.coerced.as_ref().unwrap();
    assert_eq!(coerced, &array![[false, true], [true, false]]);
    assert_abs_diff_eq!(lcp.mean[[0, 1]], 0.5);
    assert_abs_diff_eq!(lcp.sdev[[0, 1]], 0.5 * 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(lcp.mean[[1, 0]], 0.5);

    // No factor, no change.
    assert_eq!(images.channels["Feed0_RCP"], before.channels["Feed0_RCP"]);
    assert!(images.maps().iter().any(|m| m.name == "Feed0_LCP-Sdev-RAW"));
    assert!(!images.maps().iter().any(|m| m.name == "Feed0_RCP-RAW"));
}
