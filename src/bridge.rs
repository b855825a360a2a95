//! JS Bridge for WASM ↔ HTML communication
//!
//! Uses CustomEvents on `window` in both directions. The widget's
//! `GraphEvent`s go out as `kg-*` events with a JSON detail; the host page
//! asks for highlights with `kg-highlight-paths` and `kg-clear-highlight`,
//! which are queued here until the app polls them.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::Result;
use crate::graph::normalize::coerce_id;
use crate::graph::GraphEvent;

#[cfg(target_arch = "wasm32")]
use std::sync::Mutex;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use web_sys::{CustomEvent, CustomEventInit, Window};

pub const NODE_SELECTED_EVENT: &str = "kg-node-selected";
pub const EDGE_SELECTED_EVENT: &str = "kg-edge-selected";
pub const SOURCE_PREVIEW_EVENT: &str = "kg-source-preview";
pub const HIGHLIGHT_CLEARED_EVENT: &str = "kg-highlight-cleared";
pub const READY_EVENT: &str = "kg-ready";

pub const HIGHLIGHT_PATHS_REQUEST: &str = "kg-highlight-paths";
pub const CLEAR_HIGHLIGHT_REQUEST: &str = "kg-clear-highlight";

/// Requests from the host page, set by event listeners
#[cfg(target_arch = "wasm32")]
static PENDING: Mutex<Vec<BridgeRequest>> = Mutex::new(Vec::new());

// =============================================================================
// REQUESTS (host → widget)
// =============================================================================

/// Body of a `kg-highlight-paths` request. Ids may be strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRequest {
    #[serde(default, alias = "node_ids", deserialize_with = "id_list")]
    pub node_ids: Vec<String>,
    #[serde(default, alias = "edge_ids", deserialize_with = "id_list")]
    pub edge_ids: Vec<String>,
    #[serde(default, alias = "shortest_node_ids", deserialize_with = "id_list")]
    pub shortest_node_ids: Vec<String>,
    #[serde(default, alias = "shortest_edge_ids", deserialize_with = "id_list")]
    pub shortest_edge_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    HighlightPaths(HighlightRequest),
    ClearHighlight,
}

fn id_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.iter().filter_map(coerce_id).collect())
}

pub fn parse_highlight_request(json: &str) -> Result<HighlightRequest> {
    Ok(serde_json::from_str(json)?)
}

// =============================================================================
// EVENTS (widget → host)
// =============================================================================

/// DOM event name for a widget event
pub fn event_name(event: &GraphEvent) -> &'static str {
    match event {
        GraphEvent::NodeSelected { .. } => NODE_SELECTED_EVENT,
        GraphEvent::EdgeSelected { .. } => EDGE_SELECTED_EVENT,
        GraphEvent::SourcePreviewRequested { .. } => SOURCE_PREVIEW_EVENT,
        GraphEvent::HighlightCleared => HIGHLIGHT_CLEARED_EVENT,
    }
}

/// JSON detail carried by the DOM event
pub fn event_detail(event: &GraphEvent) -> Result<String> {
    let detail = match event {
        GraphEvent::NodeSelected { node } => serde_json::to_value(node)?,
        GraphEvent::EdgeSelected { edge } => serde_json::to_value(edge)?,
        GraphEvent::SourcePreviewRequested { node_id, source_id } => {
            serde_json::json!({ "nodeId": node_id, "sourceId": source_id })
        }
        GraphEvent::HighlightCleared => Value::Null,
    };
    Ok(detail.to_string())
}

// =============================================================================
// BRIDGE
// =============================================================================

/// Bridge for communication between WASM and HTML
pub struct JsBridge {
    #[cfg(target_arch = "wasm32")]
    window: Option<Window>,
}

impl JsBridge {
    pub fn new() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            let window = web_sys::window();
            match &window {
                Some(w) => Self::setup_listeners(w),
                None => tracing::warn!("JsBridge: no window, host events disabled"),
            }
            Self { window }
        }

        #[cfg(not(target_arch = "wasm32"))]
        Self {}
    }

    #[cfg(target_arch = "wasm32")]
    fn setup_listeners(window: &Window) {
        use wasm_bindgen::closure::Closure;

        let highlight_callback = Closure::<dyn Fn(CustomEvent)>::new(move |event: CustomEvent| {
            let detail = event.detail();
            let parsed = match detail.as_string() {
                Some(json) => parse_highlight_request(&json).map_err(|e| e.to_string()),
                None => serde_wasm_bindgen::from_value::<HighlightRequest>(detail)
                    .map_err(|e| e.to_string()),
            };
            match parsed {
                Ok(request) => push_request(BridgeRequest::HighlightPaths(request)),
                Err(e) => tracing::warn!("Ignoring malformed {}: {}", HIGHLIGHT_PATHS_REQUEST, e),
            }
        });
        let _ = window.add_event_listener_with_callback(
            HIGHLIGHT_PATHS_REQUEST,
            highlight_callback.as_ref().unchecked_ref(),
        );
        highlight_callback.forget();

        let clear_callback = Closure::<dyn Fn(CustomEvent)>::new(move |_event: CustomEvent| {
            push_request(BridgeRequest::ClearHighlight);
        });
        let _ = window.add_event_listener_with_callback(
            CLEAR_HIGHLIGHT_REQUEST,
            clear_callback.as_ref().unchecked_ref(),
        );
        clear_callback.forget();

        tracing::info!("JsBridge: event listeners registered on window");
    }

    /// Forward a widget event to the host page
    pub fn emit(&self, event: &GraphEvent) {
        let name = event_name(event);
        let detail = match event_detail(event) {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!("Failed to encode {}: {}", name, e);
                return;
            }
        };

        #[cfg(target_arch = "wasm32")]
        {
            let Some(window) = &self.window else {
                return;
            };
            let value = js_sys::JSON::parse(&detail).unwrap_or(JsValue::NULL);
            let init = CustomEventInit::new();
            init.set_detail(&value);

            if let Ok(dom_event) = CustomEvent::new_with_event_init_dict(name, &init) {
                let _ = window.dispatch_event(&dom_event);
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            tracing::debug!("{}: {}", name, detail);
        }
    }

    /// Emit ready event to JS
    pub fn emit_ready(&self) {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(window) = &self.window {
                if let Ok(event) = CustomEvent::new(READY_EVENT) {
                    let _ = window.dispatch_event(&event);
                }
            }
        }
    }

    /// Requests queued by the host page since the last poll, oldest first
    pub fn poll_requests(&mut self) -> Vec<BridgeRequest> {
        #[cfg(target_arch = "wasm32")]
        {
            if let Ok(mut pending) = PENDING.lock() {
                std::mem::take(&mut *pending)
            } else {
                Vec::new()
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        Vec::new()
    }
}

#[cfg(target_arch = "wasm32")]
fn push_request(request: BridgeRequest) {
    if let Ok(mut pending) = PENDING.lock() {
        pending.push(request);
    }
}

impl Default for JsBridge {
    fn default() -> Self {
        Self::new()
    }
}
