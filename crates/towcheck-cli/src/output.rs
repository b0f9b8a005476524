//! Output formatting module

use std::fmt::Write as _;

use serde::Serialize;
use towcheck_app::app::weigh_service::{SpecSource, WeighOutcome};
use towcheck_domain::model::{
    CheckKind, SpecSnapshot, StoredSpec, TowBallSource, WeighResult,
};
use towcheck_types::{OutputFormat, Result};

/// Registry lookup as shown by `resolve`
#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<StoredSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<&'static str>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    println!("{}", content);
    Ok(())
}

pub fn output_outcome(output_format: OutputFormat, outcome: &WeighOutcome) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(outcome);
    }
    print!("{}", render_report(&outcome.result));
    println!();
    println!("Vehicle spec:    {}", source_label(outcome.vehicle_source));
    if let Some(source) = outcome.caravan_source {
        println!("Caravan spec:    {}", source_label(source));
    }
    Ok(())
}

pub fn output_result(output_format: OutputFormat, result: &WeighResult) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(result);
    }
    print!("{}", render_report(result));
    println!();
    println!(
        "Integrity:       {}",
        if result.verify() { "digest verified" } else { "DIGEST MISMATCH" }
    );
    Ok(())
}

fn source_label(source: SpecSource) -> &'static str {
    match source {
        SpecSource::Registry => "registry",
        SpecSource::Declared => "user declared, queued for admin review",
        SpecSource::ReusedPending => "user declared, already awaiting admin review",
        SpecSource::Resubmitted => "user declared, replaces the earlier pending declaration",
    }
}

/// Text report of a sealed result
pub fn render_report(result: &WeighResult) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_report(&mut out, result);
    out
}

fn write_report(out: &mut String, result: &WeighResult) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "Weigh Result")?;
    writeln!(out, "============")?;
    if result.is_provisional() {
        writeln!(
            out,
            "PROVISIONAL: based on user-provided specifications pending admin review"
        )?;
    }
    writeln!(out, "Id:              {}", result.id)?;
    writeln!(out, "Recorded:        {}", result.recorded_at.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(out, "Method:          {}", result.method.label())?;
    write_spec(out, "Vehicle", &result.vehicle_spec)?;
    if let Some(ref caravan) = result.caravan_spec {
        write_spec(out, "Caravan", caravan)?;
    }
    if let Some(ref previous) = result.supersedes {
        writeln!(out, "Supersedes:      {}", previous)?;
    }

    let w = &result.weights;
    writeln!(out)?;
    writeln!(out, "--- Weights (kg) ---")?;
    writeln!(out, "Vehicle only:    {:.1}", w.vehicle_only_total)?;
    if w.tow_ball_source != TowBallSource::None {
        let source = match w.tow_ball_source {
            TowBallSource::Direct => "measured",
            _ => "derived",
        };
        writeln!(out, "Tow ball:        {:.1} ({})", w.tow_ball_weight, source)?;
        writeln!(out, "Caravan axles:   {:.1}", w.caravan_only_total)?;
    }
    if let Some(front) = w.front_axle {
        writeln!(out, "Front axle:      {:.1}", front)?;
    }
    if let Some(rear) = w.rear_axle {
        writeln!(out, "Rear axle:       {:.1}", rear)?;
    }
    writeln!(out, "Combined:        {:.1}", w.combined_total)?;

    writeln!(out)?;
    writeln!(
        out,
        "{:<12} {:>10} {:>10} {:>8} {:>10}  {}",
        "Check", "Actual", "Limit", "Load", "Over", "Result"
    )?;
    writeln!(out, "{}", "-".repeat(62))?;
    for kind in CheckKind::ALL {
        let Some(check) = result.verdict.get(kind) else {
            continue;
        };
        writeln!(
            out,
            "{:<12} {:>10.1} {:>10.1} {:>7.1}% {:>10.1}  {}",
            kind.label(),
            check.actual,
            check.limit,
            check.display_percentage(),
            check.overload,
            if check.compliant { "OK" } else { "OVER" }
        )?;
    }
    writeln!(out)?;
    if result.verdict.overall_compliant {
        writeln!(out, "Overall:         COMPLIANT")?;
    } else {
        let over: Vec<&str> = result.verdict.failing().map(|(kind, _)| kind.label()).collect();
        writeln!(out, "Overall:         NOT COMPLIANT ({})", over.join(", "))?;
    }

    if w.has_warnings() {
        writeln!(out)?;
        writeln!(out, "Warnings:")?;
        for warning in &w.warnings {
            writeln!(out, "  - {}", warning)?;
        }
    }
    if let Some(ref notes) = result.notes {
        writeln!(out)?;
        writeln!(out, "Notes: {}", notes)?;
    }
    Ok(())
}

fn write_spec(out: &mut String, label: &str, spec: &SpecSnapshot) -> std::fmt::Result {
    writeln!(
        out,
        "{:<17}{} [{}]",
        format!("{}:", label),
        spec.key,
        spec.provenance
    )
}

pub fn output_lookup(output_format: OutputFormat, report: &LookupReport) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(report);
    }
    println!("Lookup: {}", report.status);
    if let Some(ref record) = report.record {
        println!();
        print_spec_detail(record);
    }
    if !report.missing.is_empty() {
        println!();
        println!("Missing required fields: {}", report.missing.join(", "));
        println!("Declare the specification manually in the request file.");
    }
    Ok(())
}

fn print_spec_detail(record: &StoredSpec) {
    println!("Id:              {}", record.id());
    println!("Kind:            {}", record.kind());
    println!("Key:             {}", record.key());
    println!("Provenance:      {}", record.provenance());
    let review = match record {
        StoredSpec::Vehicle(r) => r.reviewed_by().zip(r.reviewed_at()),
        StoredSpec::Caravan(r) => r.reviewed_by().zip(r.reviewed_at()),
    };
    if let Some((reviewer, at)) = review {
        println!("Reviewed:        {} ({})", reviewer, at.format("%Y-%m-%d %H:%M UTC"));
    }
    let fields: Vec<(&str, Option<String>)> = match record {
        StoredSpec::Vehicle(r) => {
            let c = r.capacities();
            vec![
                ("GVM", c.gvm.map(kg)),
                ("GCM", c.gcm.map(kg)),
                ("BTC", c.btc.map(kg)),
                ("TBM", c.tbm.map(kg)),
                ("FAWR", c.fawr.map(kg)),
                ("RAWR", c.rawr.map(kg)),
            ]
        }
        StoredSpec::Caravan(r) => {
            let c = r.capacities();
            vec![
                ("ATM", c.atm.map(kg)),
                ("GTM", c.gtm.map(kg)),
                ("Axle capacity", c.axle_capacity.map(kg)),
                ("Axles", c.number_of_axles.map(|n| n.to_string())),
            ]
        }
    };
    for (name, value) in fields {
        println!(
            "{:<17}{}",
            format!("{}:", name),
            value.unwrap_or_else(|| "-".to_string())
        );
    }
}

fn kg(value: f64) -> String {
    format!("{:.0} kg", value)
}

pub fn output_specs(output_format: OutputFormat, title: &str, specs: &[StoredSpec]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(specs);
    }
    println!("{}", title);
    println!("{}", "=".repeat(title.chars().count()));
    println!("Total: {}", specs.len());
    println!();

    if specs.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!(
        "{:<36} {:<8} {:<40} {}",
        "Id", "Kind", "Key", "Provenance"
    );
    println!("{}", "-".repeat(110));
    for spec in specs {
        println!(
            "{:<36} {:<8} {:<40} {}",
            spec.id(),
            spec.kind(),
            truncate(&spec.key().to_string(), 40),
            spec.provenance()
        );
    }
    Ok(())
}

pub fn output_history(output_format: OutputFormat, results: &[WeighResult], total: usize) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(results);
    }
    println!("Weigh History");
    println!("=============");
    println!("Total entries: {}", total);
    println!();

    if results.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!(
        "{:<36} {:<12} {:>10} {:>8}  {}",
        "Id", "Date", "Combined", "GVM", "Result"
    );
    println!("{}", "-".repeat(84));
    for result in results {
        let gvm = result
            .verdict
            .get(CheckKind::Gvm)
            .map(|c| format!("{:.1}%", c.display_percentage()))
            .unwrap_or_else(|| "-".to_string());
        let mut status = if result.verdict.overall_compliant {
            "OK".to_string()
        } else {
            "OVER".to_string()
        };
        if result.is_provisional() {
            status.push_str(" (provisional)");
        }
        println!(
            "{:<36} {:<12} {:>10.1} {:>8}  {}",
            result.id,
            result.recorded_at.format("%m/%d %H:%M"),
            result.weights.combined_total,
            gvm,
            status
        );
    }

    if total > results.len() {
        println!();
        println!("... and {} more entries", total - results.len());
    }
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
