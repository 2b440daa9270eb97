// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use approx::assert_abs_diff_eq;
use ndarray::{array, Array1, Array2};

use crate::{constants::GRID_EDGE_TOLERANCE, math::bin_index};

use super::*;

fn test_wcs(projection: Projection) -> SkyWcs {
    SkyWcs::new(
        projection,
        CoordinateFrame::Equatorial,
        [4, 4],
        [1.0, 0.0],
        [0.004, 0.004],
    )
    .unwrap()
}

#[test]
fn test_projection_names() {
    assert_eq!(Projection::default(), Projection::Arc);
    assert_eq!(Projection::from_str("ARC").unwrap(), Projection::Arc);
    assert_eq!(Projection::from_str("car").unwrap(), Projection::Car);
    assert_eq!(Projection::from_str("Tan").unwrap(), Projection::Tan);
    assert!(Projection::from_str("AIT").is_err());
    assert_eq!(Projection::Zea.to_string(), "ZEA");
    assert_eq!(*PROJECTIONS_COMMA_SEPARATED, "ARC, TAN, SIN, STG, ZEA, CAR");
}

#[test]
fn test_new_wcs_geometry() {
    let wcs = test_wcs(Projection::Arc);
    assert_eq!(wcs.crpix, [3.0, 3.0]);
    assert_abs_diff_eq!(wcs.crval[0], 1.0_f64.to_degrees());
    assert_abs_diff_eq!(wcs.crval[1], 0.0);
    assert_abs_diff_eq!(wcs.cdelt[0], -0.001_f64.to_degrees());
    assert_abs_diff_eq!(wcs.cdelt[1], 0.001_f64.to_degrees());
    assert_eq!(wcs.ctype(), ["RA---ARC".to_string(), "DEC--ARC".to_string()]);

    let wcs = SkyWcs::new(
        Projection::Sin,
        CoordinateFrame::Horizontal,
        [5, 8],
        [0.5, 0.7],
        [0.01, 0.02],
    )
    .unwrap();
    // Odd grids put the reference in the middle of the central pixel.
    assert_eq!(wcs.crpix, [3.5, 5.0]);
    assert_eq!(wcs.ctype(), ["AZ---SIN".to_string(), "EL---SIN".to_string()]);
}

#[test]
fn test_degenerate_extent() {
    // A single declination strip borrows the RA pixel size.
    let wcs = SkyWcs::new(
        Projection::Arc,
        CoordinateFrame::Equatorial,
        [4, 4],
        [1.0, 0.0],
        [0.004, 0.0],
    )
    .unwrap();
    assert_abs_diff_eq!(wcs.cdelt[1], -wcs.cdelt[0]);

    let result = SkyWcs::new(
        Projection::Arc,
        CoordinateFrame::Equatorial,
        [4, 4],
        [1.0, 0.0],
        [0.0, 0.0],
    );
    assert!(matches!(result, Err(WcsError::ZeroExtent)));

    let result = SkyWcs::new(
        Projection::Arc,
        CoordinateFrame::Equatorial,
        [0, 4],
        [1.0, 0.0],
        [0.1, 0.1],
    );
    assert!(matches!(result, Err(WcsError::ZeroPixels)));

    let result = SkyWcs::new(
        Projection::Arc,
        CoordinateFrame::Equatorial,
        [4, 4],
        [f64::NAN, 0.0],
        [0.1, 0.1],
    );
    assert!(matches!(result, Err(WcsError::NonFiniteReference(_))));
}

#[test]
fn test_reference_lands_on_grid_centre() {
    for projection in Projection::iter() {
        let wcs = test_wcs(projection);
        let (x, y) = wcs.sky_to_pixel(array![1.0].view(), array![0.0].view());
        assert_abs_diff_eq!(x[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y[0], 2.0, epsilon = 1e-9);
    }
}

#[test]
fn test_extremes_land_on_grid_edges() {
    let wcs = test_wcs(Projection::Car);
    let lon = array![1.0 - 0.002, 1.0 + 0.002, 1.0, 1.0];
    let lat = array![0.0, 0.0, -0.002, 0.002];
    let (x, y) = wcs.sky_to_pixel(lon.view(), lat.view());

    // The two RA extremes are 4 pixels apart and symmetric about the centre.
    assert_abs_diff_eq!((x[0] - x[1]).abs(), 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(x[0] + x[1], 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(y[0], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(y[1], 2.0, epsilon = 1e-6);

    assert_abs_diff_eq!((y[2] - y[3]).abs(), 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(y[2] + y[3], 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(x[2], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(x[3], 2.0, epsilon = 1e-6);
}

#[test]
fn test_odd_grids_keep_every_point() {
    // A symmetric 5x5 lattice, one point per pixel.
    let wcs = SkyWcs::new(
        Projection::Car,
        CoordinateFrame::Equatorial,
        [5, 5],
        [1.0, 0.0],
        [0.005, 0.005],
    )
    .unwrap();
    assert_eq!(wcs.crpix, [3.5, 3.5]);

    let offsets = [-0.002, -0.001, 0.0, 0.001, 0.002];
    let (lon, lat): (Vec<f64>, Vec<f64>) = offsets
        .iter()
        .flat_map(|&d| offsets.iter().map(move |&r| (1.0 + r, d)))
        .unzip();
    let (x, y) = wcs.sky_to_pixel(Array1::from(lon).view(), Array1::from(lat).view());

    let mut hits = Array2::<usize>::zeros((5, 5));
    for (&x, &y) in x.iter().zip(y.iter()) {
        let i = bin_index(x, 5, GRID_EDGE_TOLERANCE).unwrap();
        let j = bin_index(y, 5, GRID_EDGE_TOLERANCE).unwrap();
        hits[[j, i]] += 1;
    }
    assert!(hits.iter().all(|&h| h == 1));
    // The centre of the lattice is the centre of the middle pixel.
    assert_abs_diff_eq!(x[12], 2.5, epsilon = 1e-9);
    assert_abs_diff_eq!(y[12], 2.5, epsilon = 1e-9);
}

#[test]
fn test_unprojectable_points_are_nan() {
    let wcs = test_wcs(Projection::Tan);
    // The far side of the sphere, and garbage input.
    let lon = array![1.0 + std::f64::consts::PI, f64::NAN];
    let lat = array![0.0, 0.0];
    let (x, y) = wcs.sky_to_pixel(lon.view(), lat.view());
    assert!(x.iter().all(|v| v.is_nan()));
    assert!(y.iter().all(|v| v.is_nan()));
}

#[test]
fn test_header_cards() {
    let wcs = test_wcs(Projection::Arc);
    let cards = wcs.header_cards();
    let get = |key: &str| {
        cards
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert_eq!(get("CTYPE1"), CardValue::Text("RA---ARC".to_string()));
    assert_eq!(get("CTYPE2"), CardValue::Text("DEC--ARC".to_string()));
    assert_eq!(get("CRPIX1"), CardValue::Float(3.0));
    assert_eq!(get("CUNIT2"), CardValue::Text("deg".to_string()));
    assert_eq!(get("WCSAXES"), CardValue::Int(2));
}
