// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;

use super::{common::InfoPrinter, SdtError};
use crate::{
    mbfits::MbfitsCreator,
    scan::{FitsScanStore, ScanStore},
    PROGRESS_BARS,
};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct MbfitsArgs {
    /// The scans to convert, in subscan order.
    #[clap(name = "SCANS", required = true, parse(from_os_str))]
    scans: Vec<PathBuf>,

    /// The MBFITS directory to write.
    #[clap(short, long)]
    output: PathBuf,

    /// A summary FITS file whose primary header describes the observation.
    #[clap(long)]
    summary: Option<PathBuf>,
}

impl MbfitsArgs {
    pub(super) fn run(self) -> Result<(), SdtError> {
        let MbfitsArgs {
            scans,
            output,
            summary,
        } = self;

        let mut printer = InfoPrinter::new("MBFITS conversion".into());
        printer.push_line(format!("Converting {} scans", scans.len()).into());
        if let Some(summary) = &summary {
            printer.push_line(format!("Summary: {}", summary.display()).into());
        }
        printer.push_line(format!("Writing to {}", output.display()).into());
        printer.display();

        let mut creator = MbfitsCreator::new(&output)?;
        if let Some(summary) = &summary {
            creator.fill_in_summary(summary)?;
        }

        let progress = ProgressBar::with_draw_target(
            Some(scans.len() as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} subscans ({elapsed_precise}<{eta_precise})").unwrap()
                .progress_chars("=> "),
        )
        .with_message("Writing subscans");

        let store = FitsScanStore;
        for path in &scans {
            let scan = store.load(path)?;
            creator.add_subscan(&scan)?;
            progress.inc(1);
        }
        progress.abandon_with_message("Finished subscans");

        info!(
            "Wrote {} FEBEs and {} grouping members",
            creator.febes().len(),
            creator.grouping().len()
        );
        Ok(())
    }
}
