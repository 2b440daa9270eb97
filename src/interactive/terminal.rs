// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A plain terminal front end for the editing loop.

use console::{style, Term};
use ndarray::prelude::*;

use super::{InteractiveError, ScanEdit, ScanTrace, UserInterface};
use crate::math::min_max_mean;

/// Characters for increasingly large map values.
const RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// What the user typed at a prompt.
#[derive(Debug, PartialEq)]
pub(super) enum Reply<T> {
    Quit,
    Value(T),
    Invalid,
}

/// Render a map with the first row at the bottom, labelling columns and rows
/// with their indices modulo 10.
pub(super) fn render(map: &Array2<f64>) -> Vec<String> {
    let (min, max) = min_max_mean(map.iter()).map_or((0.0, 0.0), |(min, max, _)| (min, max));
    let scale = if max > min {
        (RAMP.len() - 1) as f64 / (max - min)
    } else {
        0.0
    };
    let mut lines: Vec<String> = map
        .outer_iter()
        .enumerate()
        .rev()
        .map(|(row, values)| {
            let cells: String = values
                .iter()
                .map(|&v| {
                    if v.is_finite() {
                        RAMP[((v - min) * scale).round() as usize]
                    } else {
                        '?'
                    }
                })
                .collect();
            format!("{:>2} |{cells}|", row % 10)
        })
        .collect();
    let columns: String = (0..map.ncols())
        .map(|c| char::from_digit((c % 10) as u32, 10).unwrap_or(' '))
        .collect();
    lines.push(format!("    {columns}"));
    lines
}

/// "column row" picks the centre of a pixel; "q" or nothing stops.
pub(super) fn parse_pixel(line: &str) -> Reply<[f64; 2]> {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("q") {
        return Reply::Quit;
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [column, row] => match (column.parse::<usize>(), row.parse::<usize>()) {
            (Ok(c), Ok(r)) => Reply::Value([c as f64 + 0.5, r as f64 + 0.5]),
            _ => Reply::Invalid,
        },
        _ => Reply::Invalid,
    }
}

/// Whitespace- or comma-separated numbers; "q" stops.
pub(super) fn parse_numbers(line: &str) -> Reply<Vec<f64>> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Reply::Quit;
    }
    let numbers: Result<Vec<f64>, _> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect();
    match numbers {
        Ok(n) => Reply::Value(n),
        Err(_) => Reply::Invalid,
    }
}

pub struct TerminalInterface {
    term: Term,
}

impl Default for TerminalInterface {
    fn default() -> Self {
        TerminalInterface {
            term: Term::stdout(),
        }
    }
}

impl TerminalInterface {
    pub fn new() -> TerminalInterface {
        TerminalInterface::default()
    }

    fn prompt(&self, question: &str) -> Result<String, InteractiveError> {
        self.term.write_str(&format!("{} ", style(question).bold()))?;
        Ok(self.term.read_line()?)
    }

    /// Ask until the reply parses.
    fn ask<T>(
        &self,
        question: &str,
        parse: impl Fn(&str) -> Reply<T>,
    ) -> Result<Option<T>, InteractiveError> {
        loop {
            match parse(&self.prompt(question)?) {
                Reply::Quit => return Ok(None),
                Reply::Value(v) => return Ok(Some(v)),
                Reply::Invalid => self.term.write_line("Couldn't understand that; try again")?,
            }
        }
    }
}

impl UserInterface for TerminalInterface {
    fn select_pixel(
        &mut self,
        channel: &str,
        map: &Array2<f64>,
    ) -> Result<Option<[f64; 2]>, InteractiveError> {
        self.term
            .write_line(&format!("{} variance", style(channel).bold()))?;
        for line in render(map) {
            self.term.write_line(&line)?;
        }
        self.ask("Pixel to inspect as 'column row' (blank to finish):", parse_pixel)
    }

    fn edit_scan(
        &mut self,
        channel: &str,
        trace: &ScanTrace,
    ) -> Result<Option<ScanEdit>, InteractiveError> {
        let (lo, hi) = min_max_mean(trace.coordinates.iter())
            .map_or((f64::NAN, f64::NAN), |(lo, hi, _)| (lo, hi));
        let num_bad = trace.mask.iter().filter(|&&g| !g).count();
        self.term.write_line(&format!(
            "Scan {} ({}), {channel} along {}: {} samples between {lo:.6} and {hi:.6} rad, {num_bad} masked",
            trace.scan_id,
            trace.path.display(),
            trace.axis,
            trace.values.len(),
        ))?;

        let Some(zap) = self.ask(
            &format!("{} boundaries of intervals to zap (blank for none, q to stop):", trace.axis),
            parse_numbers,
        )?
        else {
            return Ok(None);
        };
        let baseline = loop {
            let Some(numbers) = self.ask(
                "Baseline slope and intercept (blank for none, q to stop):",
                parse_numbers,
            )?
            else {
                return Ok(None);
            };
            match numbers.as_slice() {
                [] => break None,
                [slope, intercept] => break Some((*slope, *intercept)),
                _ => self.term.write_line("Give two numbers, or none")?,
            }
        };
        let flag = self
            .prompt("Flag the whole scan? [y/N]")?
            .trim()
            .eq_ignore_ascii_case("y");
        Ok(Some(ScanEdit {
            zap,
            baseline,
            flag,
        }))
    }

    fn rejected(&mut self, error: &InteractiveError) {
        // Nothing useful can be done if the terminal is gone.
        let _ = self
            .term
            .write_line(&format!("{}: {error}", style("Rejected").red()));
    }
}
