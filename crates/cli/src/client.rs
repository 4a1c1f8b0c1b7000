//! API client for the thermal load prediction server

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Header identifying the requesting user
const USER_HEADER: &str = "x-user-id";

pub struct ApiClient {
    client: Client,
    base_url: Url,
    user: String,
}

impl ApiClient {
    pub fn new(base_url: &str, user: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            user: user.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .header(USER_HEADER, &self.user)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("API error ({}, {}): {}", status, err.code, err.error),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        Ok(response)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.client.get(self.url(path)?)).await?;
        response.json().await.context("Failed to parse response")
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.send(self.client.post(self.url(path)?).json(body)).await?;
        response.json().await.context("Failed to parse response")
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.client.delete(self.url(path)?)).await?;
        Ok(())
    }
}

// Request and response types

/// Features keyed by name, or values in schema order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Features {
    Named(BTreeMap<String, f64>),
    Ordered(Vec<f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: Features,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingFeatures {
    pub relative_compactness: f64,
    pub surface_area: f64,
    pub wall_area: f64,
    pub roof_area: f64,
    pub overall_height: f64,
    pub orientation: f64,
    pub glazing_area: f64,
    pub glazing_area_distribution: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThermalLoad {
    pub heating_load: f64,
    pub cooling_load: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: u64,
    pub user_id: String,
    pub features: BuildingFeatures,
    pub load: ThermalLoad,
    pub model_version: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub integer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub model_version: String,
    pub features: Vec<FeatureSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrientationAverage {
    pub orientation: i64,
    pub mean_cooling_load: f64,
}

/// One prediction in the dashboard time series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub heating_load: f64,
    pub cooling_load: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub heating: LoadStats,
    pub cooling: LoadStats,
    pub max_heating_load: f64,
    pub min_cooling_load: f64,
    pub heating_std_dev: f64,
    pub overall_median: f64,
    #[serde(default)]
    pub cooling_by_orientation: Vec<OrientationAverage>,
    #[serde(default)]
    pub series: Vec<SeriesPoint>,
    #[serde(default)]
    pub height_vs_heating: Vec<ScatterPoint>,
    #[serde(default)]
    pub surface_area_vs_cooling: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub feature: String,
    pub baseline_value: f64,
    pub scenario_value: f64,
    pub predicted: ThermalLoad,
    pub narrative: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictiveInsights {
    pub baseline: Option<BuildingFeatures>,
    pub baseline_load: Option<ThermalLoad>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub summary: DashboardSummary,
    pub automatic: Vec<String>,
    pub predictive: PredictiveInsights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRequest {
    pub feature: String,
    pub start: f64,
    pub end: f64,
    pub step: f64,
    pub baseline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: f64,
    pub load: ThermalLoad,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub feature: String,
    pub points: Vec<SweepPoint>,
    pub heating_trend: String,
    pub cooling_trend: String,
    pub narrative: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(id: u64) -> String {
        serde_json::json!({
            "id": id,
            "user_id": "alice",
            "features": {
                "relative_compactness": 0.74,
                "surface_area": 686.0,
                "wall_area": 300.0,
                "roof_area": 150.0,
                "overall_height": 3.5,
                "orientation": 2.0,
                "glazing_area": 20.0,
                "glazing_area_distribution": 1.0
            },
            "load": { "heating_load": 12.5, "cooling_load": 15.25 },
            "model_version": "best_model-0123456789ab",
            "created_at": "2024-03-01T12:00:00Z"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_get_sends_user_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/predictions")
            .match_header("x-user-id", "alice")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{}]", record_json(1)))
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "alice").unwrap();
        let records: Vec<PredictionRecord> = client.get("api/v1/predictions").await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].load.cooling_load, 15.25);
    }

    #[tokio::test]
    async fn test_post_prediction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/predictions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "features": [0.74, 686.0, 300.0, 150.0, 3.5, 2.0, 20.0, 1.0]
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(record_json(7))
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "alice").unwrap();
        let request = PredictRequest {
            features: Features::Ordered(vec![0.74, 686.0, 300.0, 150.0, 3.5, 2.0, 20.0, 1.0]),
        };
        let record: PredictionRecord = client.post("api/v1/predictions", &request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.id, 7);
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/v1/predictions/9")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"not found: prediction #9","code":"not_found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "alice").unwrap();
        let err = client.delete("api/v1/predictions/9").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("not_found"), "{}", message);
        assert!(message.contains("prediction #9"), "{}", message);
    }

    #[tokio::test]
    async fn test_dashboard_keeps_chart_series() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "total": 1,
            "heating": { "mean": 12.5, "min": 12.5, "max": 12.5, "std_dev": 0.0 },
            "cooling": { "mean": 15.25, "min": 15.25, "max": 15.25, "std_dev": 0.0 },
            "max_heating_load": 12.5,
            "min_cooling_load": 15.25,
            "heating_std_dev": 0.0,
            "overall_median": 13.88,
            "cooling_by_orientation": [{ "orientation": 2, "mean_cooling_load": 15.25 }],
            "series": [{ "label": "01/03", "heating_load": 12.5, "cooling_load": 15.25 }],
            "height_vs_heating": [{ "x": 3.5, "y": 12.5 }],
            "surface_area_vs_cooling": [{ "x": 686.0, "y": 15.25 }]
        });
        server
            .mock("GET", "/api/v1/dashboard")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "alice").unwrap();
        let summary: DashboardSummary = client.get("api/v1/dashboard").await.unwrap();
        assert_eq!(summary.series[0].label, "01/03");

        // JSON output re-serializes the summary; chart data must survive
        let printed = serde_json::to_value(&summary).unwrap();
        assert_eq!(printed["height_vs_heating"], body["height_vs_heating"]);
        assert_eq!(printed["surface_area_vs_cooling"], body["surface_area_vs_cooling"]);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url", "alice").is_err());
    }
}
