//! Knowledge graph widget
//!
//! Renders a typed entity/relationship graph with a force-directed layout,
//! infers entity categories for coloring, and emphasizes paths on request
//! from the host (highlight and shortest-path tiers over a dimmed rest).
//!
//! The widget is [`KnowledgeGraphWidget`]; [`KgApp`] wraps it in an eframe
//! shell with a toolbar and the JS bridge.

#![allow(clippy::too_many_arguments)]

pub mod api;
pub mod app;
pub mod bridge;
pub mod config;
pub mod error;
pub mod graph;

pub use api::ApiClient;
pub use app::KgApp;
pub use config::{global_config, GraphSettings};
pub use error::{GraphError, Result};
pub use graph::{
    classify,
    normalize,
    // Core graph types
    Category,
    GraphEdge,
    GraphEvent,
    GraphNode,
    GraphPayload,
    GraphSnapshot,
    // Highlighting
    HighlightState,
    KnowledgeGraphWidget,
    NormalizeReport,
    StyleTable,
    Tier,
};

/// Canvas element the web build mounts into
#[cfg(target_arch = "wasm32")]
pub const CANVAS_ID: &str = "kg_canvas";

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    let api = ApiClient::new("");

    wasm_bindgen_futures::spawn_local(async move {
        let Some(canvas) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(CANVAS_ID))
            .and_then(|e| wasm_bindgen::JsCast::dyn_into::<web_sys::HtmlCanvasElement>(e).ok())
        else {
            tracing::error!("No <canvas id=\"{}\"> on the page", CANVAS_ID);
            return;
        };

        if let Err(e) = eframe::WebRunner::new()
            .start(
                canvas,
                eframe::WebOptions::default(),
                Box::new(|cc| Ok(Box::new(KgApp::with_api(cc, api)))),
            )
            .await
        {
            tracing::error!("Failed to start eframe: {:?}", e);
        }
    });
}
