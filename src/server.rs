use std::io::{Cursor, Read};
use std::thread;

use tiny_http::{Header, Request, Response, Server, StatusCode};

use crate::assets::StaticAssets;
use crate::http::{self, ApiRequest, ApiResponse, CORS_HEADERS};
use crate::repo::TaskRepository;

/// Answer requests on `server` with `workers` threads until it is unblocked.
pub fn serve(server: &Server, repo: &TaskRepository, assets: &StaticAssets, workers: usize) {
    thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            scope.spawn(|| {
                for request in server.incoming_requests() {
                    handle_request(request, repo, assets);
                }
            });
        }
    });
}

fn handle_request(mut request: Request, repo: &TaskRepository, assets: &StaticAssets) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let mut body = String::new();
    let response = match request.as_reader().read_to_string(&mut body) {
        Ok(_) => http::handle(repo, assets, &ApiRequest::new(method.clone(), &url, body)),
        Err(err) => {
            tracing::debug!("Unreadable request body on {} {}: {}", method, url, err);
            ApiResponse::error(400, "Request body must be UTF-8")
        }
    };
    tracing::debug!("{} {} -> {}", method, url, response.status);

    if let Err(err) = request.respond(into_tiny(response)) {
        tracing::warn!("Failed to write response for {} {}: {}", method, url, err);
    }
}

/// Convert to a tiny_http response, attaching the CORS headers every
/// response carries.
pub fn into_tiny(response: ApiResponse) -> Response<Cursor<Vec<u8>>> {
    let mut out = Response::from_data(response.body).with_status_code(StatusCode(response.status));
    let mut headers: Vec<(String, String)> = CORS_HEADERS
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    if let Some(content_type) = response.content_type {
        headers.push(("Content-Type".to_string(), content_type));
    }
    headers.extend(response.headers);
    for (name, value) in headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => out.add_header(header),
            Err(()) => tracing::warn!("Dropping invalid header {}", name),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_value(response: &Response<Cursor<Vec<u8>>>, name: &str) -> Option<String> {
        response
            .headers()
            .iter()
            .find(|h| h.field.to_string().eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str().to_string())
    }

    #[test]
    fn converted_response_carries_cors_and_content_type() {
        let response = into_tiny(ApiResponse::error(404, "Task not found"));
        assert_eq!(response.status_code(), StatusCode(404));
        assert_eq!(
            header_value(&response, "Access-Control-Allow-Origin").as_deref(),
            Some("*")
        );
        assert_eq!(
            header_value(&response, "Access-Control-Allow-Methods").as_deref(),
            Some("GET, POST, PUT, DELETE, OPTIONS")
        );
        assert_eq!(
            header_value(&response, "Access-Control-Allow-Headers").as_deref(),
            Some("Content-Type")
        );
        assert_eq!(
            header_value(&response, "Content-Type").as_deref(),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn extra_headers_are_forwarded() {
        let response = into_tiny(ApiResponse::empty(200).with_header("X-Todo-Durable", "false"));
        assert_eq!(
            header_value(&response, "X-Todo-Durable").as_deref(),
            Some("false")
        );
        assert_eq!(header_value(&response, "Content-Type"), None);
    }
}
