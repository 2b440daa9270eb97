// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use sdtimager::{constants::MBFITS_BASEBAND, mbfits::MbfitsReader};
use tempfile::TempDir;

use crate::{get_cmd_output, sdtimage, write_grid_dataset};

#[test]
fn test_mbfits_conversion() {
    let tmp_dir = TempDir::new().unwrap();
    let (_, scans) = write_grid_dataset(tmp_dir.path());
    let out = tmp_dir.path().join("mbfits");
    let mut args = vec![
        "mbfits".to_string(),
        "-o".to_string(),
        out.display().to_string(),
        "--no-progress-bars".to_string(),
    ];
    args.extend(scans.iter().map(|s| s.display().to_string()));
    let cmd = sdtimage().args(&args).ok();
    assert!(cmd.is_ok(), "mbfits failed: {:?}", get_cmd_output(cmd));

    let mut reader = MbfitsReader::open(&out).unwrap();
    assert_eq!(reader.febes(), ["CCB0LCP-TP", "CCB0RCP-TP"]);
    let members: Vec<String> = reader
        .list_scans("CCB0LCP-TP", MBFITS_BASEBAND)
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(
        members,
        [
            "1/CCB0LCP-TP-ARRAYDATA-1.fits",
            "2/CCB0LCP-TP-ARRAYDATA-1.fits",
            "3/CCB0LCP-TP-ARRAYDATA-1.fits"
        ]
    );
    // The first pass starts at zero and ends at 3 + 3.
    let data = reader.read_subscan(&members[0]).unwrap().unwrap();
    assert_eq!(data.len(), 16);
    assert_eq!(data[0], 0.0);
    assert_eq!(data[15], 6.0);
}

#[test]
fn test_mbfits_needs_scans() {
    let tmp_dir = TempDir::new().unwrap();
    let cmd = sdtimage()
        .args(["mbfits", "-o", &tmp_dir.path().display().to_string()])
        .ok();
    assert!(cmd.is_err());
}
