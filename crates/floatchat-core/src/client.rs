use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use crate::error::DispatchError;
use crate::state::ImageRef;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Body of a `POST /chat` reply
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data_summary: Option<DataSummary>,
    #[serde(default)]
    pub plots: Option<Vec<PlotDescriptor>>,
    #[serde(default)]
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSummary {
    #[serde(default)]
    pub records_analyzed: Option<u64>,
    #[serde(default)]
    pub processing_time: Option<f64>,
}

/// One generated plot; carries either a single file or several
#[derive(Debug, Clone, Deserialize)]
pub struct PlotDescriptor {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filenames: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub plot_type: Option<String>,
}

impl PlotDescriptor {
    /// Files in the order the service listed them
    pub fn files(&self) -> Vec<&str> {
        match (&self.filenames, &self.filename) {
            (Some(names), _) if !names.is_empty() => names.iter().map(String::as_str).collect(),
            (_, Some(name)) => vec![name.as_str()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub ml_backend: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct SystemStatusBody {
    #[serde(default)]
    status: Option<String>,
}

/// Raw result of a health probe that reached the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusProbe {
    pub http_status: u16,
    /// The `status` field of the body, when the body parsed
    pub reported: Option<String>,
}

impl StatusProbe {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }
}

#[derive(Clone)]
pub struct FloatChatClient {
    client: Client,
    base_url: String,
}

impl FloatChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one question to the analysis service.
    ///
    /// Non-2xx statuses and undecodable bodies come back as errors; a body
    /// with `success: false` is returned as-is for the caller to judge.
    pub async fn chat(&self, message: &str) -> std::result::Result<ChatResponse, DispatchError> {
        let url = format!("{}/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error);
            return Err(DispatchError::HttpStatus {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&body).map_err(|e| DispatchError::Malformed(e.to_string()))
    }

    /// Probe `GET /system/status`, giving up after `timeout`
    pub async fn system_status(&self, timeout: Duration) -> std::result::Result<StatusProbe, reqwest::Error> {
        let url = format!("{}/system/status", self.base_url);

        let response = self.client.get(&url).timeout(timeout).send().await?;
        let http_status = response.status().as_u16();
        let reported = response
            .json::<SystemStatusBody>()
            .await
            .ok()
            .and_then(|b| b.status);

        Ok(StatusProbe {
            http_status,
            reported,
        })
    }

    pub fn plot_url(&self, filename: &str) -> String {
        format!("{}/plots/{}", self.base_url, urlencoding::encode(filename))
    }

    /// Load the bytes behind an image reference.
    ///
    /// Remote plots come from `GET /plots/{filename}`; fallback figures are
    /// local paths and are read from disk.
    pub async fn fetch_plot(&self, image: &ImageRef) -> Result<Vec<u8>> {
        if !is_remote(&image.url) {
            return tokio::fs::read(&image.url)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", image.url, e));
        }

        let response = self.client.get(&image.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch plot: {}", response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = FloatChatClient::new("http://localhost:5000/api/");
        assert_eq!(client.base_url(), "http://localhost:5000/api");
    }

    #[test]
    fn test_plot_url_encodes_filename() {
        let client = FloatChatClient::new("http://localhost:5000/api");
        assert_eq!(
            client.plot_url("temperature_map_20240101.png"),
            "http://localhost:5000/api/plots/temperature_map_20240101.png"
        );
        assert_eq!(
            client.plot_url("ts diagram.png"),
            "http://localhost:5000/api/plots/ts%20diagram.png"
        );
    }

    #[test]
    fn test_descriptor_files_prefers_list() {
        let single: PlotDescriptor =
            serde_json::from_str(r#"{ "filename": "map.png", "description": "map" }"#).unwrap();
        assert_eq!(single.files(), vec!["map.png"]);

        let multi: PlotDescriptor = serde_json::from_str(
            r#"{ "filenames": ["temp.png", "sal.png"], "description": "profiles", "plot_type": "profile" }"#,
        )
        .unwrap();
        assert_eq!(multi.files(), vec!["temp.png", "sal.png"]);
        assert_eq!(multi.plot_type.as_deref(), Some("profile"));

        let empty: PlotDescriptor =
            serde_json::from_str(r#"{ "filenames": [], "description": "nothing" }"#).unwrap();
        assert!(empty.files().is_empty());
    }

    #[test]
    fn test_chat_response_tolerates_nulls() {
        let response: ChatResponse = serde_json::from_str(
            r#"{ "success": true, "message": "ok", "plots": null, "data_summary": null }"#,
        )
        .unwrap();
        assert!(response.success);
        assert!(response.plots.is_none());
    }

    #[tokio::test]
    async fn test_fetch_local_plot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("figure.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let client = FloatChatClient::new("http://localhost:5000/api");
        let image = ImageRef::new(path.to_string_lossy(), "figure");
        let bytes = client.fetch_plot(&image).await.unwrap();
        assert_eq!(bytes, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_fetch_missing_local_plot_fails() {
        let client = FloatChatClient::new("http://localhost:5000/api");
        let image = ImageRef::new("/nonexistent/floatchat/figure.png", "missing");
        assert!(client.fetch_plot(&image).await.is_err());
    }
}
