//! Request/response exchange with the analysis service.
//!
//! [`QueryDispatcher::dispatch`] always yields an assistant [`Message`]:
//! service replies are normalized, and every failure is handed to the
//! [`FallbackResponder`] together with a diagnostic describing it.

use std::time::Instant;
use tracing::{debug, info, warn};
use crate::client::{ChatResponse, FloatChatClient};
use crate::error::DispatchError;
use crate::fallback::FallbackResponder;
use crate::state::{ImageRef, Message};
use crate::status::{ServiceStatus, StatusHandle};

#[derive(Clone)]
pub struct QueryDispatcher {
    client: FloatChatClient,
    fallback: FallbackResponder,
    status: StatusHandle,
}

impl QueryDispatcher {
    pub fn new(client: FloatChatClient, fallback: FallbackResponder, status: StatusHandle) -> Self {
        Self {
            client,
            fallback,
            status,
        }
    }

    pub fn client(&self) -> &FloatChatClient {
        &self.client
    }

    pub fn fallback(&self) -> &FallbackResponder {
        &self.fallback
    }

    pub async fn dispatch(&self, raw_text: &str) -> Message {
        let started = Instant::now();
        debug!(chars = raw_text.chars().count(), "dispatching query");

        match self.exchange(raw_text).await {
            Ok(message) => {
                if self.status.get() == ServiceStatus::Offline {
                    info!("analysis service answered although the startup probe found it offline");
                }
                info!(
                    images = message.images.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "query answered by analysis service"
                );
                message
            }
            Err(err) => {
                let mut diagnostic = err.to_string();
                if err.is_transport() && self.status.get() == ServiceStatus::Offline {
                    diagnostic.push_str(" (service was offline at startup)");
                }
                warn!(
                    diagnostic = %diagnostic,
                    status = self.status.get().as_str(),
                    "falling back to local answer"
                );
                self.fallback.respond(raw_text, &diagnostic)
            }
        }
    }

    async fn exchange(&self, raw_text: &str) -> Result<Message, DispatchError> {
        let response = self.client.chat(raw_text).await?;
        normalize_response(&self.client, response)
    }
}

/// Turn a decoded service reply into an assistant message
pub fn normalize_response(
    client: &FloatChatClient,
    response: ChatResponse,
) -> Result<Message, DispatchError> {
    if !response.success {
        let reason = response
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "no error detail given".to_string());
        return Err(DispatchError::Application(reason));
    }

    let summary = analysis_summary(&response);
    let mut text = response
        .message
        .ok_or_else(|| DispatchError::Malformed("success response without a message".to_string()))?;

    if let Some(summary) = summary {
        text.push_str("\n\n");
        text.push_str(&summary);
    }

    let mut images = Vec::new();
    for plot in response.plots.iter().flatten() {
        let files = plot.files();
        if files.is_empty() {
            warn!(plot_type = plot.plot_type.as_deref().unwrap_or("-"), "plot descriptor has no files, skipping");
            continue;
        }
        let caption = plot.description.clone().unwrap_or_default();
        images.extend(
            files
                .into_iter()
                .map(|file| ImageRef::new(client.plot_url(file), caption.clone())),
        );
    }

    Ok(Message::assistant(text, images))
}

fn analysis_summary(response: &ChatResponse) -> Option<String> {
    let summary = response.data_summary.as_ref()?;

    let mut parts = Vec::new();
    if let Some(records) = summary.records_analyzed {
        parts.push(format!("{} records", group_thousands(records)));
    }
    if let Some(secs) = summary.processing_time {
        parts.push(format!("in {:.2}s", secs));
    }
    if parts.is_empty() {
        return None;
    }

    let mut line = format!("Analyzed {}", parts.join(" "));
    let engine = response
        .metadata
        .as_ref()
        .and_then(|m| m.ml_backend.as_deref().or(m.system.as_deref()));
    if let Some(engine) = engine {
        line.push_str(" using ");
        line.push_str(engine);
    }
    Some(line)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
