use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tiny_http::Method;

use crate::http::ApiResponse;

pub const ASSET_NAMES: [&str; 3] = ["index.html", "style.css", "script.js"];

/// The front-end files served from a web root directory.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn serve(&self, method: &Method, path: &str) -> ApiResponse {
        if path == "/favicon.ico" {
            return ApiResponse::empty(204);
        }
        let name = if path == "/" {
            ASSET_NAMES[0]
        } else {
            path.trim_start_matches('/')
        };
        if !ASSET_NAMES.contains(&name) {
            return not_found(name);
        }
        if !matches!(method, Method::Get | Method::Head) {
            return ApiResponse::error(405, "Method not allowed");
        }
        match fs::read(self.root.join(name)) {
            Ok(data) => ApiResponse::bytes(200, content_type_for(name), data),
            Err(err) if err.kind() == io::ErrorKind::NotFound => not_found(name),
            Err(err) => {
                tracing::error!("Failed to read asset {}: {}", name, err);
                ApiResponse::text(500, "500 Internal Server Error")
            }
        }
    }
}

fn not_found(name: &str) -> ApiResponse {
    ApiResponse::text(404, &format!("404 Not Found: {}", name))
}

pub fn content_type_for(path: &str) -> &'static str {
    if path.ends_with(".html") {
        "text/html; charset=utf-8"
    } else if path.ends_with(".css") {
        "text/css; charset=utf-8"
    } else if path.ends_with(".js") {
        "application/javascript; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
