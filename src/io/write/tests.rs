// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::{
    imager::{ChannelImage, RawImage},
    io::fits::{fits_get_image, fits_get_image_size, fits_get_required_key, fits_open},
    wcs::{CoordinateFrame, Projection, SkyWcs},
};

fn test_images() -> ImageMap {
    // 3 pixels wide, 2 high.
    let mean = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let image = ChannelImage {
        sdev: &mean / 10.0,
        expo: Array2::ones((2, 3)),
        raw: Some(RawImage {
            mean: &mean * 100.0,
            sdev: &mean * 1000.0,
        }),
        coerced: Some(Array2::from_elem((2, 3), false)),
        mean,
    };
    ImageMap {
        wcs: SkyWcs::new(
            Projection::Sin,
            CoordinateFrame::Equatorial,
            [3, 2],
            [0.5, 0.2],
            [0.003, 0.002],
        )
        .unwrap(),
        channels: BTreeMap::from([("Feed0_LCP".to_string(), image)]),
    }
}

fn extension_names(path: &std::path::Path) -> Vec<String> {
    let mut fptr = fits_open(path).unwrap();
    let mut names = vec![];
    let mut i = 1;
    while let Ok(hdu) = fptr.hdu(i) {
        names.push(fits_get_required_key(&mut fptr, &hdu, "EXTNAME").unwrap());
        i += 1;
    }
    names
}

#[test]
fn test_write_mean_maps_only() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("img.fits");
    let images = test_images();
    write_images(&path, &images, &ImageWriteOptions::default()).unwrap();

    assert_eq!(
        extension_names(&path),
        ["IMGFeed0_LCP", "IMGFeed0_LCP-RAW"]
    );

    let mut fptr = fits_open(&path).unwrap();
    let primary = fptr.primary_hdu().unwrap();
    let ctype1: String = fits_get_required_key(&mut fptr, &primary, "CTYPE1").unwrap();
    assert_eq!(ctype1, "RA---SIN");
    let crpix1: f64 = fits_get_required_key(&mut fptr, &primary, "CRPIX1").unwrap();
    assert_abs_diff_eq!(crpix1, images.wcs.crpix[0]);

    let hdu = fptr.hdu(hdu_name("Feed0_LCP").as_str()).unwrap();
    assert_eq!(fits_get_image_size(&fptr, &hdu).unwrap(), &vec![2, 3]);
    let data: Vec<f64> = fits_get_image(&mut fptr, &hdu).unwrap();
    assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let cdelt2: f64 = fits_get_required_key(&mut fptr, &hdu, "CDELT2").unwrap();
    assert_abs_diff_eq!(cdelt2, images.wcs.cdelt[1], epsilon = 1e-12);

    let hdu = fptr.hdu("IMGFeed0_LCP-RAW").unwrap();
    let data: Vec<f64> = fits_get_image(&mut fptr, &hdu).unwrap();
    assert_abs_diff_eq!(data[5], 600.0);
}

#[test]
fn test_write_optional_maps() {
    let tmp_dir = TempDir::new().unwrap();
    let path = tmp_dir.path().join("img.fits");
    let images = test_images();
    let options = ImageWriteOptions {
        save_sdev: true,
        save_expo: true,
    };
    write_images(&path, &images, &options).unwrap();
    assert_eq!(
        extension_names(&path),
        [
            "IMGFeed0_LCP",
            "IMGFeed0_LCP-EXPO",
            "IMGFeed0_LCP-RAW",
            "IMGFeed0_LCP-Sdev",
            "IMGFeed0_LCP-Sdev-RAW",
        ]
    );

    // Writing again replaces the file.
    let options = ImageWriteOptions {
        save_sdev: true,
        save_expo: false,
    };
    write_images(&path, &images, &options).unwrap();
    assert_eq!(extension_names(&path).len(), 4);

    let mut fptr = fits_open(&path).unwrap();
    let hdu = fptr.hdu("IMGFeed0_LCP-Sdev").unwrap();
    let data: Vec<f64> = fits_get_image(&mut fptr, &hdu).unwrap();
    assert_abs_diff_eq!(data[0], 0.1);
}

#[test]
fn test_nothing_to_write() {
    let tmp_dir = TempDir::new().unwrap();
    let mut images = test_images();
    images.channels.clear();
    let result = write_images(
        tmp_dir.path().join("img.fits"),
        &images,
        &ImageWriteOptions::default(),
    );
    assert!(matches!(result, Err(ImageWriteError::NoImages)));
}
