// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use sdtimager::SdtConfig;
use tempfile::TempDir;

use crate::{get_cmd_output, sdtimage};

#[test]
fn test_sample_config_is_readable() {
    let cmd = sdtimage().arg("sample-config").ok();
    assert!(cmd.is_ok(), "sample-config failed on simple test data");
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.starts_with("[local]"));

    let tmp_dir = TempDir::new().unwrap();
    std::fs::create_dir(tmp_dir.path().join("scans")).unwrap();
    let config_file = tmp_dir.path().join("config.toml");
    std::fs::write(&config_file, &stdout).unwrap();
    let config = SdtConfig::read(&config_file).unwrap();
    assert_eq!(config.npix, sdtimager::constants::DEFAULT_NPIX);
    assert_eq!(config.list_of_directories, ["scans"]);
}

#[test]
fn test_no_subcommand_shows_help() {
    let cmd = sdtimage().ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("USAGE"), "{stderr}");
}
