use async_trait::async_trait;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};

/// Produces the HTML for a front-end route
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, path: &str) -> Response;
}

/// Serves pages pre-rendered by the front-end build.
///
/// `/orders` resolves to `orders.html`, then `orders/index.html`; `/` to
/// `index.html`. Unknown routes get `404.html` when the build has one.
pub struct StaticPages {
    root: PathBuf,
}

impl StaticPages {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn candidates(&self, path: &str) -> Vec<PathBuf> {
        let relative: PathBuf = path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        if relative.as_os_str().is_empty() {
            return vec![self.root.join("index.html")];
        }
        // Never leave the build directory
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Vec::new();
        }

        vec![
            self.root.join(&relative).with_extension("html"),
            self.root.join(&relative).join("index.html"),
        ]
    }

    async fn read(path: &Path) -> Option<Vec<u8>> {
        tokio::fs::read(path).await.ok()
    }
}

#[async_trait]
impl PageRenderer for StaticPages {
    async fn render(&self, path: &str) -> Response {
        for candidate in self.candidates(path) {
            if let Some(html) = Self::read(&candidate).await {
                return html_response(StatusCode::OK, html);
            }
        }

        tracing::debug!("No pre-rendered page for {}", path);
        match Self::read(&self.root.join("404.html")).await {
            Some(html) => html_response(StatusCode::NOT_FOUND, html),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

fn html_response(status: StatusCode, html: Vec<u8>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}
