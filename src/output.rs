use std::io::{self, Write};
use std::time::Duration;

use serde::Serialize;

use crate::app::{RunSummary, SpeciesSummary};
use crate::counters::{
    DUPLICATE_WITHIN_RUN, LINES_PROCESSED, MALFORMED_LINES, UNEXPECTED_TAG, format_thousands,
};
use crate::domain::Feed;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(result: &RunSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_summary(result: &RunSummary) -> io::Result<()> {
        let mut stdout = io::stdout();
        for line in yield_table_lines(&result.pipeline_name, &result.species) {
            writeln!(stdout, "{line}")?;
        }
        if result.dry_run {
            writeln!(stdout, "(dry run, store not modified)")?;
        }
        Ok(())
    }
}

/// Summary block logged once per species.
pub fn species_summary_lines(pipeline: &str, summary: &SpeciesSummary) -> Vec<String> {
    let counters = &summary.counters;
    let mut lines = vec![
        "===".to_string(),
        format!("summary for {}", summary.species),
        format!(
            "   {:<20} = {}",
            "lines processed",
            format_thousands(counters.get(LINES_PROCESSED))
        ),
    ];

    let mut push_nonzero = |label: &str, value: u64| {
        if value != 0 {
            lines.push(format!("   {label:<20} = {}", format_thousands(value)));
        }
    };
    for feed in Feed::ALL {
        let suffix = feed.counter_suffix();
        let what = feed.match_label();
        push_nonzero(
            &format!("match by {what}"),
            counters.get(&format!("matchBy{suffix}")),
        );
        push_nonzero(
            &format!("no match by {what}"),
            counters.get(&format!("noMatchBy{suffix}")),
        );
        push_nonzero(
            &format!("multimatch by {what}"),
            counters.get(&format!("multimatchBy{suffix}")),
        );
    }
    push_nonzero("duplicates in run", counters.get(DUPLICATE_WITHIN_RUN));
    push_nonzero("malformed lines", counters.get(MALFORMED_LINES));
    push_nonzero("unexpected db tag", counters.get(UNEXPECTED_TAG));

    if summary.to_insert + summary.to_delete + summary.matching > 0 {
        lines.push(String::new());
        if summary.to_insert > 0 {
            lines.push(format!(
                "  inserted {pipeline} ids : {}",
                format_thousands(summary.to_insert as u64)
            ));
        }
        if summary.to_delete > 0 {
            lines.push(format!(
                "  deleted {pipeline} ids : {}",
                format_thousands(summary.to_delete as u64)
            ));
        }
        if summary.matching > 0 {
            lines.push(format!(
                "  matching {pipeline} ids : {}",
                format_thousands(summary.matching as u64)
            ));
        }
    }
    lines
}

/// Species -> net yield, in input order, zero yields left out.
pub fn yield_table_lines(pipeline: &str, summaries: &[SpeciesSummary]) -> Vec<String> {
    let mut lines = vec![format!("=== {pipeline} id count")];
    lines.extend(
        summaries
            .iter()
            .filter(|summary| summary.net_yield != 0)
            .map(|summary| format!("{:>12} - {:>7}", summary.species, summary.net_yield)),
    );
    lines
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
