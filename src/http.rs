//! Request routing for the JSON API and the static front-end.
//!
//! Routing works on plain `ApiRequest`/`ApiResponse` values; the tiny_http
//! glue lives in `server`.

use std::panic::{self, AssertUnwindSafe};

use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tiny_http::Method;

use crate::assets::StaticAssets;
use crate::error::StoreError;
use crate::model::{ImportPayload, NewProject, TaskInput};
use crate::repo::{Committed, TaskRepository};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const DURABLE_HEADER: &str = "X-Todo-Durable";

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: String,
}

impl ApiRequest {
    /// Split `url` into a path and decoded query pairs.
    pub fn new(method: Method, url: &str, body: impl Into<String>) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (url, Vec::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            body: body.into(),
        }
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: Some(JSON_CONTENT_TYPE.to_string()),
                headers: Vec::new(),
                body,
            },
            Err(err) => {
                tracing::error!("Failed to serialize response: {}", err);
                Self::server_error()
            }
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some(TEXT_CONTENT_TYPE.to_string()),
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn bytes(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: Some(content_type.to_string()),
            headers: Vec::new(),
            body,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn server_error() -> Self {
        Self {
            status: 500,
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
            headers: Vec::new(),
            body: br#"{"error":"Server error"}"#.to_vec(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Route `request`, turning a panic anywhere below into a logged 500.
pub fn handle(repo: &TaskRepository, assets: &StaticAssets, request: &ApiRequest) -> ApiResponse {
    catch_panics(request, || route(repo, assets, request))
}

/// Run `handler`; a panic is logged with its message and answered with a
/// generic 500 that carries none of the detail.
fn catch_panics<F>(request: &ApiRequest, handler: F) -> ApiResponse
where
    F: FnOnce() -> ApiResponse,
{
    match panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(response) => response,
        Err(cause) => {
            let detail = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(
                "Handler panicked on {} {}: {}",
                request.method,
                request.path,
                detail
            );
            ApiResponse::server_error()
        }
    }
}

pub fn route(repo: &TaskRepository, assets: &StaticAssets, request: &ApiRequest) -> ApiResponse {
    if request.method == Method::Options {
        return ApiResponse::empty(204);
    }
    let api_rest = match request.path.as_str() {
        "/api" => Some(""),
        path => path.strip_prefix("/api/"),
    };
    match api_rest {
        Some(rest) => route_api(repo, request, rest),
        None => assets.serve(&request.method, &request.path),
    }
}

fn route_api(repo: &TaskRepository, request: &ApiRequest, rest: &str) -> ApiResponse {
    let method = &request.method;
    let (resource, tail) = match rest.split_once('/') {
        Some((resource, tail)) => (resource, tail),
        None => (rest, ""),
    };
    match (resource, tail) {
        ("tasks", "") => match method {
            Method::Get => {
                ApiResponse::json(200, &repo.list(request.query_param("project")))
            }
            Method::Post => create_task(repo, &request.body),
            Method::Delete => {
                let committed = repo.clear(request.query_param("project"));
                let body = serde_json::json!({ "status": "cleared", "removed": committed.value });
                committed_response(200, &body, committed.durable)
            }
            _ => method_not_allowed(),
        },
        ("tasks", tail) => {
            let raw_id = tail.split('/').next().unwrap_or_default();
            let id = percent_decode_str(raw_id).decode_utf8_lossy();
            match method {
                Method::Get => match repo.get(&id) {
                    Ok(task) => ApiResponse::json(200, &task),
                    Err(err) => store_error(&err),
                },
                Method::Put => update_task(repo, &id, &request.body),
                Method::Delete => match repo.delete(&id) {
                    Ok(committed) => committed_response(
                        200,
                        &serde_json::json!({ "status": "deleted" }),
                        committed.durable,
                    ),
                    Err(err) => store_error(&err),
                },
                _ => method_not_allowed(),
            }
        }
        ("projects", "") => match method {
            Method::Get => ApiResponse::json(200, &repo.projects()),
            Method::Post => match parse_body::<NewProject>(&request.body) {
                Ok(project) => match repo.add_project(&project.name) {
                    Ok(committed) => committed_json(201, committed),
                    Err(err) => store_error(&err),
                },
                Err(response) => response,
            },
            _ => method_not_allowed(),
        },
        ("stats", "") => match method {
            Method::Get => ApiResponse::json(200, &repo.analytics()),
            _ => method_not_allowed(),
        },
        ("export", "") => match method {
            Method::Get => ApiResponse::json(200, &repo.export()).with_header(
                "Content-Disposition",
                "attachment; filename=\"todo-export.json\"",
            ),
            _ => method_not_allowed(),
        },
        ("import", "") => match method {
            Method::Post => match parse_body::<ImportPayload>(&request.body) {
                Ok(payload) => match repo.import(payload) {
                    Ok(committed) => committed_json(200, committed),
                    Err(err) => store_error(&err),
                },
                Err(response) => response,
            },
            _ => method_not_allowed(),
        },
        _ => ApiResponse::error(404, "Not found"),
    }
}

fn create_task(repo: &TaskRepository, body: &str) -> ApiResponse {
    let input = match parse_body::<TaskInput>(body) {
        Ok(input) => input,
        Err(response) => return response,
    };
    match repo.create(input) {
        Ok(committed) => committed_json(201, committed),
        Err(err) => store_error(&err),
    }
}

fn update_task(repo: &TaskRepository, id: &str, body: &str) -> ApiResponse {
    let input = match parse_body::<TaskInput>(body) {
        Ok(input) => input,
        Err(response) => return response,
    };
    match repo.update(id, input) {
        Ok(committed) => committed_json(200, committed),
        Err(err) => store_error(&err),
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiResponse> {
    serde_json::from_str(body).map_err(|err| {
        tracing::debug!("Rejected request body: {}", err);
        ApiResponse::error(400, "Invalid JSON")
    })
}

fn committed_json<T: Serialize>(status: u16, committed: Committed<T>) -> ApiResponse {
    committed_response(status, &committed.value, committed.durable)
}

fn committed_response<T: Serialize + ?Sized>(status: u16, value: &T, durable: bool) -> ApiResponse {
    let response = ApiResponse::json(status, value);
    if durable {
        response
    } else {
        response.with_header(DURABLE_HEADER, "false")
    }
}

fn store_error(err: &StoreError) -> ApiResponse {
    let status = err.status();
    if status >= 500 {
        tracing::error!("Request failed: {}", err);
        return ApiResponse::server_error();
    }
    ApiResponse::error(status, &err.to_string())
}

fn method_not_allowed() -> ApiResponse {
    ApiResponse::error(405, "Method not allowed")
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
