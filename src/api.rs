//! Blocking REST client plus the worker thread that keeps network I/O off
//! the UI loop. Requests go in over a channel, results come back as
//! [`ApiEvent`]s the controller drains every tick.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::listview::Record;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http {status}: {}", message.as_deref().unwrap_or("<no body>"))]
    Status { status: u16, message: Option<String> },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Human readable text for the notification line. Known statuses get a
    /// canned message, everything else falls back to a generic one. There
    /// is no retry anywhere, the user repeats the action if they want to.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => "Could not reach the server.".to_string(),
            ApiError::Decode(_) => "The server sent an unreadable response.".to_string(),
            ApiError::Status { status, message } => {
                let canned = match status {
                    400 => "The server rejected the request as invalid.",
                    401 => "Your session has expired, log in again.",
                    403 => "You do not have permission for that.",
                    404 => "That item no longer exists on the server.",
                    500 => "The server hit an internal error.",
                    502 => "The server is unreachable behind its gateway.",
                    503 => "The service is temporarily unavailable.",
                    _ => "The request failed.",
                };
                match message {
                    Some(m) => format!("{canned} ({m})"),
                    None => canned.to_string(),
                }
            }
        }
    }
}

/// `{created, skipped}` summary returned by the CSV import endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ImportSummary {
    pub created: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApiOp {
    List,
    Save,
    Delete,
    Import,
    Upload,
}

#[derive(Debug)]
pub enum ApiRequest {
    List {
        generation: u64,
        resource: &'static str,
    },
    Create {
        generation: u64,
        resource: &'static str,
        body: Value,
    },
    Update {
        generation: u64,
        resource: &'static str,
        id: String,
        body: Value,
    },
    BulkDelete {
        generation: u64,
        resource: &'static str,
        ids: Vec<String>,
    },
    ImportCsv {
        generation: u64,
        resource: &'static str,
        file: PathBuf,
    },
    UploadImage {
        generation: u64,
        resource: &'static str,
        id: String,
        file: PathBuf,
    },
}

impl ApiRequest {
    fn generation(&self) -> u64 {
        match self {
            ApiRequest::List { generation, .. }
            | ApiRequest::Create { generation, .. }
            | ApiRequest::Update { generation, .. }
            | ApiRequest::BulkDelete { generation, .. }
            | ApiRequest::ImportCsv { generation, .. }
            | ApiRequest::UploadImage { generation, .. } => *generation,
        }
    }

    fn op(&self) -> ApiOp {
        match self {
            ApiRequest::List { .. } => ApiOp::List,
            ApiRequest::Create { .. } | ApiRequest::Update { .. } => ApiOp::Save,
            ApiRequest::BulkDelete { .. } => ApiOp::Delete,
            ApiRequest::ImportCsv { .. } => ApiOp::Import,
            ApiRequest::UploadImage { .. } => ApiOp::Upload,
        }
    }
}

#[derive(Debug)]
pub enum ApiEvent {
    Listed {
        generation: u64,
        records: Vec<Record>,
    },
    Saved {
        generation: u64,
    },
    Deleted {
        generation: u64,
        count: usize,
    },
    Imported {
        generation: u64,
        summary: ImportSummary,
    },
    Uploaded {
        generation: u64,
    },
    Failed {
        generation: u64,
        op: ApiOp,
        error: ApiError,
    },
}

impl ApiEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ApiEvent::Listed { generation, .. }
            | ApiEvent::Saved { generation }
            | ApiEvent::Deleted { generation, .. }
            | ApiEvent::Imported { generation, .. }
            | ApiEvent::Uploaded { generation }
            | ApiEvent::Failed { generation, .. } => *generation,
        }
    }
}

pub struct RestClient {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(RestClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn list(&self, resource: &str) -> Result<Vec<Record>, ApiError> {
        let url = format!("{}/api/{}", self.base_url, resource);
        let response = self.client.get(url).bearer_auth(&self.token).send()?;
        let values: Vec<Value> = parse_response(response)?;
        let total = values.len();
        let records: Vec<Record> = values.into_iter().filter_map(Record::from_value).collect();
        if records.len() < total {
            warn!(
                "Dropped {} of {} {} rows without an id",
                total - records.len(),
                total,
                resource
            );
        }
        Ok(records)
    }

    pub fn create(&self, resource: &str, body: &Value) -> Result<(), ApiError> {
        let url = format!("{}/api/{}", self.base_url, resource);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        expect_success(response)
    }

    pub fn update(&self, resource: &str, id: &str, body: &Value) -> Result<(), ApiError> {
        let url = format!("{}/api/{}/{}", self.base_url, resource, id);
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        expect_success(response)
    }

    /// One batched deletion for the whole selection.
    pub fn bulk_delete(&self, resource: &str, ids: &[String]) -> Result<(), ApiError> {
        let url = format!("{}/api/{}/bulk-delete", self.base_url, resource);
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.token)
            .json(&json!({ "ids": wire_ids(ids) }))
            .send()?;
        expect_success(response)
    }

    pub fn import_csv(&self, resource: &str, file: &PathBuf) -> Result<ImportSummary, ApiError> {
        let url = format!("{}/api/{}/import", self.base_url, resource);
        let form = reqwest::blocking::multipart::Form::new()
            .file("file", file)
            .map_err(ApiError::from_io)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()?;
        parse_response(response)
    }

    pub fn upload_image(&self, resource: &str, id: &str, file: &PathBuf) -> Result<(), ApiError> {
        let url = format!("{}/api/{}/{}/upload", self.base_url, resource, id);
        let form = reqwest::blocking::multipart::Form::new()
            .file("image", file)
            .map_err(ApiError::from_io)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()?;
        expect_success(response)
    }
}

impl ApiError {
    fn from_io(err: std::io::Error) -> Self {
        ApiError::Status {
            status: 0,
            message: Some(format!("could not read file: {err}")),
        }
    }
}

/// Ids that look numeric go on the wire as numbers, the rest as strings.
/// The backend is loose about this and the original client never converted.
fn wire_ids(ids: &[String]) -> Vec<Value> {
    ids.iter()
        .map(|id| match id.parse::<u64>() {
            Ok(n) => json!(n),
            Err(_) => json!(id),
        })
        .collect()
}

fn error_from_body(status: u16, text: &str) -> ApiError {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    let message = serde_json::from_str::<ErrorBody>(text).ok().map(|b| b.message);
    ApiError::Status { status, message }
}

fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json::<T>()?)
    } else {
        let text = response.text().unwrap_or_default();
        Err(error_from_body(status.as_u16(), &text))
    }
}

fn expect_success(response: reqwest::blocking::Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let text = response.text().unwrap_or_default();
        Err(error_from_body(status.as_u16(), &text))
    }
}

/// Sending half of the worker channel; the model submits through this.
#[derive(Clone)]
pub struct ApiHandle {
    requests: Sender<ApiRequest>,
}

impl crate::model::ApiSink for ApiHandle {
    fn submit(&self, request: ApiRequest) {
        debug!("Submitting {:?}", request);
        // A send failure means the worker is gone; the run loop is about to
        // end anyway.
        let _ = self.requests.send(request);
    }
}

/// Receiving half, drained by the controller once per tick.
pub struct ApiEvents {
    events: Receiver<ApiEvent>,
}

impl ApiEvents {
    pub fn try_recv(&self) -> Option<ApiEvent> {
        self.events.try_recv().ok()
    }
}

pub fn spawn_worker(client: RestClient) -> (ApiHandle, ApiEvents) {
    let (req_tx, req_rx) = channel::<ApiRequest>();
    let (evt_tx, evt_rx) = channel::<ApiEvent>();
    thread::spawn(move || worker_loop(client, req_rx, evt_tx));
    (ApiHandle { requests: req_tx }, ApiEvents { events: evt_rx })
}

fn worker_loop(client: RestClient, requests: Receiver<ApiRequest>, events: Sender<ApiEvent>) {
    while let Ok(request) = requests.recv() {
        let generation = request.generation();
        let op = request.op();
        let event = match perform(&client, request) {
            Ok(event) => event,
            Err(error) => {
                info!("Request failed: {error}");
                ApiEvent::Failed {
                    generation,
                    op,
                    error,
                }
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

fn perform(client: &RestClient, request: ApiRequest) -> Result<ApiEvent, ApiError> {
    match request {
        ApiRequest::List {
            generation,
            resource,
        } => {
            let records = client.list(resource)?;
            Ok(ApiEvent::Listed {
                generation,
                records,
            })
        }
        ApiRequest::Create {
            generation,
            resource,
            body,
        } => {
            client.create(resource, &body)?;
            Ok(ApiEvent::Saved { generation })
        }
        ApiRequest::Update {
            generation,
            resource,
            id,
            body,
        } => {
            client.update(resource, &id, &body)?;
            Ok(ApiEvent::Saved { generation })
        }
        ApiRequest::BulkDelete {
            generation,
            resource,
            ids,
        } => {
            let count = ids.len();
            client.bulk_delete(resource, &ids)?;
            Ok(ApiEvent::Deleted { generation, count })
        }
        ApiRequest::ImportCsv {
            generation,
            resource,
            file,
        } => {
            let summary = client.import_csv(resource, &file)?;
            Ok(ApiEvent::Imported {
                generation,
                summary,
            })
        }
        ApiRequest::UploadImage {
            generation,
            resource,
            id,
            file,
        } => {
            client.upload_image(resource, &id, &file)?;
            Ok(ApiEvent::Uploaded { generation })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_messages_cover_known_statuses() {
        for status in [400, 401, 403, 404, 500, 502, 503] {
            let err = ApiError::Status {
                status,
                message: None,
            };
            let msg = err.user_message();
            assert!(!msg.contains("request failed"), "no canned text for {status}");
        }
    }

    #[test]
    fn unknown_status_falls_back() {
        let err = ApiError::Status {
            status: 418,
            message: None,
        };
        assert_eq!(err.user_message(), "The request failed.");
    }

    #[test]
    fn server_message_is_appended() {
        let err = error_from_body(400, r#"{"message":"sku already exists"}"#);
        assert_eq!(
            err.user_message(),
            "The server rejected the request as invalid. (sku already exists)"
        );
    }

    #[test]
    fn non_json_body_still_maps() {
        let err = error_from_body(503, "<html>maintenance</html>");
        assert_eq!(err.user_message(), "The service is temporarily unavailable.");
    }

    #[test]
    fn wire_ids_keep_numeric_shape() {
        let ids = vec!["12".to_string(), "ab-34".to_string()];
        assert_eq!(wire_ids(&ids), vec![json!(12), json!("ab-34")]);
    }

    #[test]
    fn import_summary_decodes() {
        let s: ImportSummary = serde_json::from_str(r#"{"created": 7, "skipped": 2}"#).unwrap();
        assert_eq!(s.created, 7);
        assert_eq!(s.skipped, 2);
    }
}
