// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use fitsio::FitsFile;
use tempfile::TempDir;

use crate::{get_cmd_output, sdtimage, write_grid_dataset};

fn read_image(file: &std::path::Path, extname: &str) -> Vec<f64> {
    let mut fptr = FitsFile::open(file).unwrap();
    let hdu = fptr.hdu(extname).unwrap();
    hdu.read_image(&mut fptr).unwrap()
}

fn hdu_names(file: &std::path::Path) -> Vec<String> {
    let mut fptr = FitsFile::open(file).unwrap();
    let mut names = vec![];
    let mut i = 1;
    while let Ok(hdu) = fptr.hdu(i) {
        names.push(hdu.read_key::<String>(&mut fptr, "EXTNAME").unwrap());
        i += 1;
    }
    names
}

fn assert_images_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-9);
    }
}

#[test]
fn test_image_three_scans() {
    let tmp_dir = TempDir::new().unwrap();
    let (config, _) = write_grid_dataset(tmp_dir.path());
    let output = tmp_dir.path().join("map.fits");
    let cmd = sdtimage()
        .args([
            "image",
            "-c",
            &config.display().to_string(),
            "-o",
            &output.display().to_string(),
            "--save-expo",
            "--no-progress-bars",
        ])
        .ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}\nstdout: {stdout}");
    assert!(output.exists());

    let mut fptr = FitsFile::open(&output).unwrap();
    let hdu = fptr.hdu("IMGFeed0_LCP").unwrap();
    match hdu.info {
        fitsio::hdu::HduInfo::ImageInfo { ref shape, .. } => assert_eq!(shape, &[4, 4]),
        _ => panic!("IMGFeed0_LCP isn't an image"),
    }
    drop(fptr);

    let expo = read_image(&output, "IMGFeed0_LCP-EXPO");
    assert_eq!(expo.len(), 16);
    assert_abs_diff_eq!(expo.iter().sum::<f64>(), 48.0);

    // Mean LCP over the three passes is i + j + 1; the total over the grid is
    // 16 * 4.
    let mean = read_image(&output, "IMGFeed0_LCP");
    assert_abs_diff_eq!(mean.iter().sum::<f64>(), 64.0, epsilon = 1e-9);
    let rcp = read_image(&output, "IMGFeed0_RCP");
    assert_abs_diff_eq!(rcp.iter().sum::<f64>(), 128.0, epsilon = 1e-9);

    let names = hdu_names(&output);
    assert!(!names.iter().any(|n| n.ends_with("-Sdev")), "{names:?}");
}

#[test]
fn test_image_default_output_and_scanset_round_trip() {
    let tmp_dir = TempDir::new().unwrap();
    let (config, _) = write_grid_dataset(tmp_dir.path());
    let table = tmp_dir.path().join("scanset.fits");
    let cmd = sdtimage()
        .args([
            "image",
            "-c",
            &config.display().to_string(),
            "--scanset",
            &table.display().to_string(),
            "--save-sdev",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "image failed: {:?}", get_cmd_output(cmd));
    let first = tmp_dir.path().join("config.fits");
    assert!(first.exists());
    assert!(table.exists());
    let sdev = read_image(&first, "IMGFeed0_LCP-Sdev");

    let second = tmp_dir.path().join("again.fits");
    let cmd = sdtimage()
        .args([
            "image",
            "-c",
            &config.display().to_string(),
            "--from-scanset",
            &table.display().to_string(),
            "-o",
            &second.display().to_string(),
            "--save-sdev",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "image failed: {:?}", get_cmd_output(cmd));
    assert_images_close(&read_image(&second, "IMGFeed0_LCP-Sdev"), &sdev);
    assert_images_close(
        &read_image(&second, "IMGFeed0_LCP"),
        &read_image(&first, "IMGFeed0_LCP"),
    );
}

#[test]
fn test_image_calibrated() {
    let tmp_dir = TempDir::new().unwrap();
    let (config, _) = write_grid_dataset(tmp_dir.path());
    let table = tmp_dir.path().join("cal.toml");
    std::fs::write(
        &table,
        indoc::indoc! {r#"
            [default]
            factor = 2.0
            error = 0.0
        "#},
    )
    .unwrap();
    let output = tmp_dir.path().join("cal.fits");
    let cmd = sdtimage()
        .args([
            "image",
            "-c",
            &config.display().to_string(),
            "--calibrate",
            &table.display().to_string(),
            "-o",
            &output.display().to_string(),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "image failed: {:?}", get_cmd_output(cmd));
    let calibrated = read_image(&output, "IMGFeed0_LCP");
    let raw = read_image(&output, "IMGFeed0_LCP-RAW");
    for (c, r) in calibrated.iter().zip(&raw) {
        assert_abs_diff_eq!(*c, 2.0 * r, epsilon = 1e-9);
    }
}

#[test]
fn test_image_missing_config() {
    let tmp_dir = TempDir::new().unwrap();
    let cmd = sdtimage()
        .args([
            "image",
            "-c",
            &tmp_dir.path().join("nope.toml").display().to_string(),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("Couldn't read config file"), "{stderr}");
}
