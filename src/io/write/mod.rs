// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing images to FITS files.
//!
//! The primary HDU carries only the WCS. Every map then gets its own image
//! HDU named `IMG<map name>`, in order of map name, each with the same WCS.

mod error;
#[cfg(test)]
mod tests;

pub use error::ImageWriteError;

use std::path::Path;

use fitsio::images::{ImageDescription, ImageType};
use log::{debug, info};

use crate::{
    imager::{ImageMap, MapKind},
    io::fits::{fits_create, fits_open_hdu},
};

/// Which of the optional maps to write. Mean maps (and raw mean maps of
/// calibrated channels) are always written.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageWriteOptions {
    /// Also write the variance maps.
    pub save_sdev: bool,

    /// Also write the exposure maps.
    pub save_expo: bool,
}

impl ImageWriteOptions {
    fn wants(&self, kind: MapKind) -> bool {
        match kind {
            MapKind::Mean | MapKind::Raw => true,
            MapKind::Sdev | MapKind::SdevRaw => self.save_sdev,
            MapKind::Expo => self.save_expo,
        }
    }
}

/// The HDU name used for a map.
pub fn hdu_name(map_name: &str) -> String {
    format!("IMG{map_name}")
}

/// Write `images` to `path`, replacing any existing file.
pub fn write_images<P: AsRef<Path>>(
    path: P,
    images: &ImageMap,
    options: &ImageWriteOptions,
) -> Result<(), ImageWriteError> {
    let path = path.as_ref();
    if images.channels.is_empty() {
        return Err(ImageWriteError::NoImages);
    }

    let mut fptr = fits_create(path)?;
    let primary = fits_open_hdu(&mut fptr, 0)?;
    images.wcs.write_cards(&mut fptr, &primary)?;

    let [nx, ny] = images.wcs.npix;
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[ny, nx],
    };
    let mut num_written = 0;
    for map in images.maps() {
        if !options.wants(map.kind) {
            continue;
        }
        let name = hdu_name(&map.name);
        debug!("Writing {name}");
        let hdu = fptr.create_image(&name, &description)?;
        let data = map.data.as_standard_layout();
        // Standard layout is always contiguous.
        let data = data.as_slice().unwrap_or_default();
        hdu.write_image(&mut fptr, data)?;
        images.wcs.write_cards(&mut fptr, &hdu)?;
        num_written += 1;
    }
    info!("Wrote {num_written} images to {}", path.display());
    Ok(())
}
