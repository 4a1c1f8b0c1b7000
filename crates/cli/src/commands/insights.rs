//! Insight commands: dashboard, insights, sweep

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, DashboardSummary, InsightReport, SweepRequest, SweepResult};
use crate::output::{
    color_trend, format_change, format_load, format_value, print_info, print_json, print_table,
    print_warning, OutputFormat,
};

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Std dev")]
    std_dev: String,
}

#[derive(Tabled)]
struct ScenarioRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Baseline")]
    baseline: String,
    #[tabled(rename = "Scenario")]
    scenario: String,
    #[tabled(rename = "Heating")]
    heating: String,
    #[tabled(rename = "Cooling")]
    cooling: String,
}

#[derive(Tabled)]
struct SweepRow {
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Heating")]
    heating: String,
    #[tabled(rename = "Cooling")]
    cooling: String,
    #[tabled(rename = "Heating Δ")]
    heating_change: String,
    #[tabled(rename = "Cooling Δ")]
    cooling_change: String,
}

pub async fn dashboard(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary: DashboardSummary = client.get("api/v1/dashboard").await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_summary(&summary),
    }
    Ok(())
}

pub async fn insights(client: &ApiClient, baseline: &str, format: OutputFormat) -> Result<()> {
    let report: InsightReport = client
        .get(&format!("api/v1/insights?baseline={}", baseline))
        .await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_summary(&report.summary);

            println!("\n{}", "Automatic insights".bold());
            for statement in &report.automatic {
                println!("  • {}", statement);
            }

            println!("\n{}", "Predictive insights".bold());
            if !report.predictive.scenarios.is_empty() {
                print_table(
                    report
                        .predictive
                        .scenarios
                        .iter()
                        .map(|s| ScenarioRow {
                            feature: s.feature.clone(),
                            baseline: format_value(s.baseline_value),
                            scenario: format_value(s.scenario_value),
                            heating: format_load(s.predicted.heating_load),
                            cooling: format_load(s.predicted.cooling_load),
                        })
                        .collect(),
                );
            }
            for statement in &report.predictive.statements {
                println!("  • {}", statement);
            }
        }
    }
    Ok(())
}

pub async fn sweep(client: &ApiClient, request: SweepRequest, format: OutputFormat) -> Result<()> {
    let result: SweepResult = client.post("api/v1/insights/sweep", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if result.points.is_empty() {
                print_warning(&result.narrative);
                return Ok(());
            }
            print_table(sweep_rows(&result));
            print_info(&format!(
                "Heating {}, cooling {}",
                color_trend(&result.heating_trend),
                color_trend(&result.cooling_trend)
            ));
            println!("{}", result.narrative);
        }
    }
    Ok(())
}

fn sweep_rows(result: &SweepResult) -> Vec<SweepRow> {
    let Some(first) = result.points.first() else {
        return Vec::new();
    };
    result
        .points
        .iter()
        .map(|p| SweepRow {
            value: format_value(p.value),
            heating: format_load(p.load.heating_load),
            cooling: format_load(p.load.cooling_load),
            heating_change: format_change(first.load.heating_load, p.load.heating_load),
            cooling_change: format_change(first.load.cooling_load, p.load.cooling_load),
        })
        .collect()
}

fn print_summary(summary: &DashboardSummary) {
    if summary.total == 0 {
        print_warning("No predictions yet");
        return;
    }

    print_info(&format!("{} predictions", summary.total));
    print_table(vec![
        StatRow {
            load: "Heating".to_string(),
            mean: format_load(summary.heating.mean),
            min: format_load(summary.heating.min),
            max: format_load(summary.heating.max),
            std_dev: format!("{:.2}", summary.heating.std_dev),
        },
        StatRow {
            load: "Cooling".to_string(),
            mean: format_load(summary.cooling.mean),
            min: format_load(summary.cooling.min),
            max: format_load(summary.cooling.max),
            std_dev: format!("{:.2}", summary.cooling.std_dev),
        },
    ]);
    println!("Median load: {}", format_load(summary.overall_median));

    if !summary.cooling_by_orientation.is_empty() {
        let by_orientation: Vec<String> = summary
            .cooling_by_orientation
            .iter()
            .map(|o| format!("{}: {:.2}", o.orientation, o.mean_cooling_load))
            .collect();
        println!("Mean cooling by orientation: {}", by_orientation.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SweepPoint, ThermalLoad};

    #[test]
    fn test_sweep_rows_are_relative_to_first_point() {
        let point = |value: f64, heating: f64, cooling: f64| SweepPoint {
            value,
            load: ThermalLoad {
                heating_load: heating,
                cooling_load: cooling,
            },
        };
        let result = SweepResult {
            feature: "glazing_area".to_string(),
            points: vec![point(10.0, 20.0, 25.0), point(20.0, 22.0, 25.0)],
            heating_trend: "increasing".to_string(),
            cooling_trend: "flat".to_string(),
            narrative: String::new(),
        };

        let rows = sweep_rows(&result);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].heating_change, "+0.0%");
        assert_eq!(rows[1].heating_change, "+10.0%");
        assert_eq!(rows[1].cooling_change, "+0.0%");
        assert_eq!(rows[1].value, "20");
    }
}
