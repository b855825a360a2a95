//! API client for graph data
//!
//! Uses web-sys fetch for WASM, reqwest for native. The widget never
//! fetches on its own; the host awaits `fetch_graph` and hands the payload
//! to `KnowledgeGraphWidget::set_payload`.

use serde::de::DeserializeOwned;

use crate::error::{GraphError, Result};
use crate::graph::GraphPayload;

/// Default graph endpoint, relative to the base URL
pub const GRAPH_PATH: &str = "/api/graph";

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;
        use web_sys::{Request, RequestInit, RequestMode, Response};

        let url = self.url(path);

        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);

        let request = Request::new_with_str_and_init(&url, &opts)
            .map_err(|e| GraphError::Transport(format!("request error: {:?}", e)))?;

        let window =
            web_sys::window().ok_or_else(|| GraphError::Transport("no window".to_string()))?;
        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| GraphError::Transport(format!("fetch error: {:?}", e)))?;

        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| GraphError::Transport("response is not a Response".to_string()))?;

        if !resp.ok() {
            return Err(GraphError::Http {
                status: resp.status(),
                url,
            });
        }

        let text = JsFuture::from(
            resp.text()
                .map_err(|e| GraphError::Transport(format!("text promise error: {:?}", e)))?,
        )
        .await
        .map_err(|e| GraphError::Transport(format!("body error: {:?}", e)))?;

        let body = text.as_string().unwrap_or_default();
        Ok(serde_json::from_str(&body)?)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);

        let response = reqwest::get(&url)
            .await
            .map_err(|e| GraphError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GraphError::Http {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GraphError::Transport(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the graph payload from the default endpoint
    pub async fn fetch_graph(&self) -> Result<GraphPayload> {
        self.fetch_graph_at(GRAPH_PATH).await
    }

    /// Fetch a graph payload from a custom path (e.g. a filtered subgraph)
    pub async fn fetch_graph_at(&self, path: &str) -> Result<GraphPayload> {
        let payload: GraphPayload = self.get(path).await?;
        tracing::debug!(
            "Fetched graph from {}: {} nodes, {} edges",
            path,
            payload.nodes.len(),
            payload.edges.len()
        );
        Ok(payload)
    }
}
