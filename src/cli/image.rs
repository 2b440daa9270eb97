// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info};

use super::{
    common::{display_warnings, InfoPrinter, Warn},
    SdtError,
};
use crate::{
    calibration::{CalibratorTable, FluxCalibration},
    config::SdtConfig,
    imager::ImagingOptions,
    interactive::{InteractiveSession, TerminalInterface},
    io::write::{write_images, ImageWriteOptions},
    scan::FitsScanStore,
    scanset::{ScanSet, ScanSetSource},
};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct ImageArgs {
    /// The config file listing the scans to image.
    #[clap(short, long, help_heading = "INPUT")]
    config: PathBuf,

    /// Build the scan set from a table written earlier with --scanset rather
    /// than from the scans themselves.
    #[clap(long, help_heading = "INPUT", conflicts_with = "scanset")]
    from_scanset: Option<PathBuf>,

    /// A calibration table (toml or json) to convert the images to Jy.
    #[clap(long, help_heading = "IMAGING")]
    calibrate: Option<PathBuf>,

    /// Merge all channels into a single image.
    #[clap(long, help_heading = "IMAGING")]
    scrunch: bool,

    /// Ignore feed offsets; every channel uses feed 0's positions.
    #[clap(long, help_heading = "IMAGING")]
    no_offsets: bool,

    /// Image in azimuth and elevation instead of RA and Dec.
    #[clap(long, help_heading = "IMAGING")]
    altaz: bool,

    /// Inspect and edit the scans behind selected pixels before writing the
    /// images.
    #[clap(short, long, help_heading = "IMAGING")]
    interactive: bool,

    /// The channels to edit interactively. The default is every channel.
    #[clap(long, multiple_values = true, help_heading = "IMAGING")]
    channels: Option<Vec<String>>,

    /// The output image file. The default is the config file with a .fits
    /// extension.
    #[clap(short, long, help_heading = "OUTPUT")]
    output: Option<PathBuf>,

    /// Also write standard-deviation images.
    #[clap(long, help_heading = "OUTPUT")]
    save_sdev: bool,

    /// Also write exposure images.
    #[clap(long, help_heading = "OUTPUT")]
    save_expo: bool,

    /// Write the assembled scan set to this file.
    #[clap(long, help_heading = "OUTPUT")]
    scanset: Option<PathBuf>,
}

/// Where images go when the user doesn't say.
fn default_output(config_file: &Path) -> PathBuf {
    config_file.with_extension("fits")
}

impl ImageArgs {
    pub(super) fn run(self) -> Result<(), SdtError> {
        let ImageArgs {
            config: config_file,
            from_scanset,
            calibrate,
            scrunch,
            no_offsets,
            altaz,
            interactive,
            channels,
            output,
            save_sdev,
            save_expo,
            scanset,
        } = self;

        let config = SdtConfig::read(&config_file)?;
        let output = output.unwrap_or_else(|| default_output(&config_file));

        let mut printer = InfoPrinter::new("Imaging info".into());
        printer.push_block(vec![
            format!("Config: {}", config_file.display()).into(),
            format!("Data directory: {}", config.datadir.display()).into(),
            format!(
                "{}x{} pixels, {} projection",
                config.npix[0], config.npix[1], config.projection
            )
            .into(),
        ]);
        let mut flags = vec![];
        if scrunch {
            flags.push("Scrunching all channels into one image".into());
        }
        if no_offsets {
            flags.push("Ignoring feed offsets".into());
        }
        if altaz {
            flags.push("Imaging in azimuth and elevation".into());
        }
        if !flags.is_empty() {
            printer.push_block(flags);
        }
        printer.push_line(format!("Writing images to {}", output.display()).into());
        printer.display();

        let table = match &calibrate {
            Some(file) => {
                info!("Reading calibration table {}", file.display());
                Some(CalibratorTable::read(file)?)
            }
            None => None,
        };

        let store = FitsScanStore;
        let source = match from_scanset {
            Some(table) => ScanSetSource::FromSerialized { table, config },
            None => ScanSetSource::FromConfig(config),
        };
        let mut scan_set = ScanSet::new(source, &store)?;
        info!(
            "Scan set has {} rows from {} scans and {} channels",
            scan_set.num_rows(),
            scan_set.meta.scan_list.len(),
            scan_set.channels.len()
        );
        if let Some(file) = &scanset {
            scan_set.write(file)?;
            info!("Wrote scan set to {}", file.display());
        }

        let options = ImagingOptions {
            scrunch,
            no_offsets,
            altaz,
            calibration: table.as_ref().map(|t| t as &dyn FluxCalibration),
        };

        if interactive {
            let to_edit: Vec<String> = match channels {
                Some(c) => c,
                None => scan_set.channel_names().map(str::to_string).collect(),
            };
            let mut ui = TerminalInterface::new();
            let mut session = InteractiveSession::new(&mut scan_set, &store, options);
            for channel in &to_edit {
                debug!("Editing {channel}");
                session.run(channel, &mut ui)?;
            }
        } else if channels.is_some() {
            "--channels only matters with --interactive; ignoring it".warn();
        }

        let images = scan_set.calculate_images(&options)?;
        if table.is_some() {
            let uncalibrated: Vec<&str> = images
                .channels
                .iter()
                .filter(|(_, image)| image.raw.is_none())
                .map(|(name, _)| name.as_str())
                .collect();
            if !uncalibrated.is_empty() {
                format!("Left uncalibrated: {}", uncalibrated.join(", ")).warn();
            }
        }
        display_warnings();

        write_images(
            &output,
            &images,
            &ImageWriteOptions {
                save_sdev,
                save_expo,
            },
        )?;
        Ok(())
    }
}
