//! Text summaries and machine-readable step records.

use std::fmt::Write as _;
use std::io::Write;

use crate::ensemble::SampleOutcome;
use crate::simulation::{RunReport, StepRecord};

/// Render a textual summary of a finished run.
#[must_use]
pub fn render_summary(report: &RunReport, records: &[StepRecord]) -> String {
    let mut output = String::new();

    writeln!(
        &mut output,
        "Sample {}: {} after {} steps (strain = {:.4})",
        report.sample, report.cause, report.steps, report.final_strain
    )
    .expect("writing to string cannot fail");

    let avalanches: Vec<&StepRecord> = records.iter().filter(|record| record.size > 0).collect();
    let largest = avalanches.iter().map(|record| record.size).max().unwrap_or(0);
    writeln!(
        &mut output,
        "Bonds broken: {} in {} avalanches (largest S = {largest})",
        report.total_broken,
        avalanches.len()
    )
    .expect("writing to string cannot fail");

    if let Some(biggest) = avalanches
        .iter()
        .max_by(|a, b| a.stress.drop.total_cmp(&b.stress.drop))
    {
        writeln!(
            &mut output,
            "Largest stress drop: {:.4e} at step {} (S = {})",
            biggest.stress.drop, biggest.step, biggest.size
        )
        .expect("writing to string cannot fail");
    }

    // Peak stress is taken over stable configurations only.
    if let Some(peak) = records
        .iter()
        .max_by(|a, b| a.stress_after.total_cmp(&b.stress_after))
    {
        writeln!(
            &mut output,
            "Peak stress: {:.4e} at step {} (strain = {:.4})",
            peak.stress_after, peak.step, peak.strain
        )
        .expect("writing to string cannot fail");
    }
    if let Some(last) = records.last() {
        writeln!(
            &mut output,
            "Final state: {} live bonds, {} crack clusters",
            last.live_bonds, last.clusters
        )
        .expect("writing to string cannot fail");
    }

    output
}

/// Render one line per ensemble member.
#[must_use]
pub fn render_ensemble(outcomes: &[SampleOutcome]) -> String {
    let mut output = String::new();
    let failed = outcomes
        .iter()
        .filter(|outcome| outcome.result.is_err())
        .count();
    writeln!(
        &mut output,
        "Ensemble of {} samples ({failed} failed)",
        outcomes.len()
    )
    .expect("writing to string cannot fail");
    for outcome in outcomes {
        let line = match &outcome.result {
            Ok(run) => writeln!(
                &mut output,
                "  sample {:>4}: {:<20} steps = {:>4}, broken = {:>6}",
                outcome.sample,
                run.report.cause.to_string(),
                run.report.steps,
                run.report.total_broken
            ),
            Err(error) => writeln!(&mut output, "  sample {:>4}: failed: {error}", outcome.sample),
        };
        line.expect("writing to string cannot fail");
    }
    output
}

/// Write step records as JSON lines.
///
/// # Errors
///
/// Returns the serialisation or I/O error of the first record that fails.
pub fn write_records<W: Write>(mut writer: W, records: &[StepRecord]) -> serde_json::Result<()> {
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    }
    writer.flush().map_err(serde_json::Error::io)
}
