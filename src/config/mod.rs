// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Imaging configuration files.
//!
//! A config file is TOML with two tables, `[local]` and `[analysis]`. Every
//! key is optional; defaults are applied for anything that isn't specified.
//!
//! ```toml
//! [local]
//! workdir = "."
//! datadir = "/data/srt"
//!
//! [analysis]
//! list_of_directories = ["gauss_ra", "gauss_dec"]
//! projection = "ARC"
//! npix = [32, 32]
//! ```

mod error;

pub use error::ConfigError;

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_INTERPOLATION, DEFAULT_NPIX, DEFAULT_PROJECTION},
    io::get_all_matches_from_glob,
    wcs::Projection,
};

/// The directories inside the data directory that hold scans. `"*"` (or an
/// empty list) means every sub-directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectoryList {
    /// A single string; either `"*"` or newline-separated directory names.
    Text(String),
    /// Explicit directory names.
    Names(Vec<String>),
}

/// The `[local]` table, as written in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalSection {
    pub workdir: Option<PathBuf>,
    pub datadir: Option<PathBuf>,
}

/// The `[analysis]` table, as written in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSection {
    pub list_of_directories: Option<DirectoryList>,
    pub calibrator_directories: Option<DirectoryList>,
    pub projection: Option<String>,
    pub interpolation: Option<String>,
    pub npix: Option<[usize; 2]>,
    pub reference_ra: Option<f64>,
    pub reference_dec: Option<f64>,
    pub reference_az: Option<f64>,
    pub reference_el: Option<f64>,
}

/// The contents of a config file before defaults are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub local: LocalSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

/// A config with all defaults applied and directory lists resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SdtConfig {
    /// Where the config file lives, if it came from a file.
    pub config_file: Option<PathBuf>,
    pub workdir: PathBuf,
    pub datadir: PathBuf,
    /// Scan directories relative to `datadir`.
    pub list_of_directories: Vec<String>,
    pub calibrator_directories: Vec<String>,
    pub projection: Projection,
    /// Reserved; carried through but not used for imaging.
    pub interpolation: String,
    /// Pixel grid size, horizontal then vertical.
    pub npix: [usize; 2],
    /// User-specified WCS reference coordinates \[radians\].
    pub reference_ra: Option<f64>,
    pub reference_dec: Option<f64>,
    pub reference_az: Option<f64>,
    pub reference_el: Option<f64>,
}

impl SdtConfig {
    /// Read and resolve a config file. Relative `workdir` and `datadir` paths
    /// are taken relative to the config file's directory.
    pub fn read<P: AsRef<Path>>(file: P) -> Result<SdtConfig, ConfigError> {
        let file = file.as_ref();
        debug!("Reading config file {}", file.display());
        let mut contents = String::new();
        File::open(file)
            .and_then(|mut fh| fh.read_to_string(&mut contents))
            .map_err(|e| ConfigError::Read {
                file: file.to_path_buf(),
                err: e,
            })?;
        let parsed: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            file: file.to_path_buf(),
            err: e.to_string(),
        })?;
        let base = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut config = Self::resolve(parsed, &base)?;
        config.config_file = Some(file.to_path_buf());
        Ok(config)
    }

    /// Apply defaults to parsed config contents. `base` is the directory that
    /// relative paths are relative to.
    pub fn resolve(parsed: ConfigFile, base: &Path) -> Result<SdtConfig, ConfigError> {
        let ConfigFile { local, analysis } = parsed;
        let LocalSection { workdir, datadir } = local;
        let AnalysisSection {
            list_of_directories,
            calibrator_directories,
            projection,
            interpolation,
            npix,
            reference_ra,
            reference_dec,
            reference_az,
            reference_el,
        } = analysis;

        let absolutise = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        let workdir = absolutise(workdir.unwrap_or_else(|| PathBuf::from(".")));
        let datadir = absolutise(datadir.ok_or(ConfigError::NoDataDir)?);

        let projection = {
            let p = projection.unwrap_or_else(|| DEFAULT_PROJECTION.to_string());
            p.parse::<Projection>()
                .map_err(|_| ConfigError::UnknownProjection(p))?
        };

        let npix = npix.unwrap_or(DEFAULT_NPIX);
        if npix.contains(&0) {
            return Err(ConfigError::ZeroPixels);
        }

        let list_of_directories = resolve_directories(list_of_directories, &datadir)?;
        let calibrator_directories = match calibrator_directories {
            None => vec![],
            Some(l) => resolve_directories(Some(l), &datadir)?,
        };
        trace!("Scan directories: {list_of_directories:?}");

        Ok(SdtConfig {
            config_file: None,
            workdir,
            datadir,
            list_of_directories,
            calibrator_directories,
            projection,
            interpolation: interpolation.unwrap_or_else(|| DEFAULT_INTERPOLATION.to_string()),
            npix,
            reference_ra,
            reference_dec,
            reference_az,
            reference_el,
        })
    }

    /// Every scan file listed by this config, sorted. Sorting makes scan IDs
    /// reproducible.
    pub fn scan_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut files = vec![];
        for dir in &self.list_of_directories {
            let pattern = self.datadir.join(dir).join("*.fits");
            let pattern = pattern.to_str().ok_or_else(|| ConfigError::NonUtf8Path(pattern.clone()))?;
            for f in get_all_matches_from_glob(pattern)? {
                let is_summary = f
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.eq_ignore_ascii_case("summary.fits"))
                    .unwrap_or(false);
                if !is_summary {
                    files.push(f);
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// The WCS reference coordinates specified by the user for the requested
    /// axes, horizontal then vertical.
    pub fn reference(&self, altaz: bool) -> (Option<f64>, Option<f64>) {
        if altaz {
            (self.reference_az, self.reference_el)
        } else {
            (self.reference_ra, self.reference_dec)
        }
    }
}

/// Turn a directory list into names. `"*"`, an empty string or an empty list
/// means "every sub-directory of `datadir`".
fn resolve_directories(
    list: Option<DirectoryList>,
    datadir: &Path,
) -> Result<Vec<String>, ConfigError> {
    let names: Vec<String> = match list {
        None => vec![],
        Some(DirectoryList::Text(s)) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Some(DirectoryList::Names(v)) => v
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    };

    if names.is_empty() || names == ["*"] {
        let pattern = datadir.join("*");
        let pattern = pattern.to_str().ok_or_else(|| ConfigError::NonUtf8Path(pattern.clone()))?;
        let mut dirs: Vec<String> = get_all_matches_from_glob(pattern)?
            .into_iter()
            .filter(|p| p.is_dir())
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        dirs.sort();
        Ok(dirs)
    } else {
        Ok(names)
    }
}

/// The text of a sample config file.
pub fn sample_config() -> String {
    format!(
        r#"[local]
# Working directory, where outputs are written.
workdir = "."
# Directory containing the scan directories.
datadir = "."

[analysis]
# Scan directories inside datadir. "*" means all of them.
list_of_directories = "*"
# Calibrator scan directories (reserved).
# calibrator_directories = ["calibrator1", "calibrator2"]
# Map projection; one of {projections}.
projection = "{DEFAULT_PROJECTION}"
# Reserved.
interpolation = "{DEFAULT_INTERPOLATION}"
# Pixel grid size (horizontal, vertical).
npix = [{}, {}]
# Optional WCS reference coordinates [radians].
# reference_ra = 0.0
# reference_dec = 0.0
"#,
        DEFAULT_NPIX[0],
        DEFAULT_NPIX[1],
        projections = *crate::wcs::PROJECTIONS_COMMA_SEPARATED,
    )
}
