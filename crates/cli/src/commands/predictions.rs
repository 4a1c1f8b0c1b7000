//! Prediction commands: predict, history, show, delete, schema

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::client::{ApiClient, Features, PredictRequest, PredictionRecord, SchemaResponse};
use crate::output::{
    format_load, format_timestamp, format_value, print_info, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Created")]
    created_at: String,
    #[tabled(rename = "Height")]
    height: String,
    #[tabled(rename = "Surface")]
    surface_area: String,
    #[tabled(rename = "Orientation")]
    orientation: String,
    #[tabled(rename = "Heating")]
    heating: String,
    #[tabled(rename = "Cooling")]
    cooling: String,
}

impl From<&PredictionRecord> for PredictionRow {
    fn from(r: &PredictionRecord) -> Self {
        Self {
            id: r.id,
            created_at: format_timestamp(&r.created_at),
            height: format_value(r.features.overall_height),
            surface_area: format_value(r.features.surface_area),
            orientation: format_value(r.features.orientation),
            heating: format_load(r.load.heating_load),
            cooling: format_load(r.load.cooling_load),
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Integer")]
    integer: String,
}

/// Build the request features from positional values or `name=value` pairs
pub fn parse_features(values: Vec<f64>, named: &[String]) -> Result<Features> {
    match (values.is_empty(), named.is_empty()) {
        (false, false) => bail!("Pass either positional values or --feature pairs, not both"),
        (true, true) => bail!("No features given; pass 8 values in schema order or --feature name=value"),
        (false, true) => Ok(Features::Ordered(values)),
        (true, false) => {
            let mut map = BTreeMap::new();
            for pair in named {
                let (name, value) = pair
                    .split_once('=')
                    .with_context(|| format!("Invalid feature '{}', expected name=value", pair))?;
                let value: f64 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid number for feature '{}'", name.trim()))?;
                if map.insert(name.trim().to_string(), value).is_some() {
                    bail!("Feature '{}' given more than once", name.trim());
                }
            }
            Ok(Features::Named(map))
        }
    }
}

pub async fn predict(client: &ApiClient, features: Features, format: OutputFormat) -> Result<()> {
    let record: PredictionRecord = client
        .post("api/v1/predictions", &PredictRequest { features })
        .await?;

    match format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => {
            print_success(&format!("Prediction #{} stored", record.id));
            print_record(&record);
        }
    }
    Ok(())
}

pub async fn history(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let records: Vec<PredictionRecord> = client.get("api/v1/predictions").await?;

    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Table => {
            if records.is_empty() {
                print_warning("No predictions found");
                return Ok(());
            }
            print_table(records.iter().map(PredictionRow::from).collect());
            println!("\nTotal: {} predictions", records.len());
        }
    }
    Ok(())
}

pub async fn show(client: &ApiClient, id: u64, format: OutputFormat) -> Result<()> {
    let record: PredictionRecord = client.get(&format!("api/v1/predictions/{}", id)).await?;

    match format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => print_record(&record),
    }
    Ok(())
}

pub async fn delete(client: &ApiClient, id: u64) -> Result<()> {
    client.delete(&format!("api/v1/predictions/{}", id)).await?;
    print_success(&format!("Prediction #{} deleted", id));
    Ok(())
}

pub async fn schema(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let schema: SchemaResponse = client.get("api/v1/schema").await?;

    match format {
        OutputFormat::Json => print_json(&schema)?,
        OutputFormat::Table => {
            print_info(&format!("Model version: {}", schema.model_version));
            print_table(
                schema
                    .features
                    .iter()
                    .enumerate()
                    .map(|(index, f)| FeatureRow {
                        index,
                        name: f.name.clone(),
                        min: format_value(f.min),
                        max: format_value(f.max),
                        integer: if f.integer { "yes" } else { "no" }.to_string(),
                    })
                    .collect(),
            );
        }
    }
    Ok(())
}

fn print_record(record: &PredictionRecord) {
    let f = &record.features;
    let rows = vec![
        ("ID", record.id.to_string()),
        ("Created", format_timestamp(&record.created_at)),
        ("Model", record.model_version.clone()),
        ("Relative compactness", format_value(f.relative_compactness)),
        ("Surface area", format_value(f.surface_area)),
        ("Wall area", format_value(f.wall_area)),
        ("Roof area", format_value(f.roof_area)),
        ("Overall height", format_value(f.overall_height)),
        ("Orientation", format_value(f.orientation)),
        ("Glazing area", format_value(f.glazing_area)),
        ("Glazing distribution", format_value(f.glazing_area_distribution)),
        ("Heating load", format_load(record.load.heating_load)),
        ("Cooling load", format_load(record.load.cooling_load)),
    ];
    print_table(
        rows.into_iter()
            .map(|(field, value)| FieldRow {
                field: field.to_string(),
                value,
            })
            .collect(),
    );
}
