//! Knowledge graph viewer application
//!
//! Layout:
//! ┌───────────────────────────────────────────┐
//! │  Toolbar (zoom, fit, refresh, highlight)  │
//! ├───────────────────────────────────────────┤
//! │                                           │
//! │  Graph canvas                             │
//! │                                           │
//! ├───────────────────────────────────────────┤
//! │  Status (selection / load errors)         │
//! └───────────────────────────────────────────┘
//!
//! Widget events are forwarded to the host page through the JS bridge; host
//! highlight requests are polled from it once per frame.

use eframe::egui;
use egui::RichText;

use crate::api::ApiClient;
use crate::bridge::{BridgeRequest, JsBridge};
use crate::graph::{GraphEvent, GraphPayload, KnowledgeGraphWidget, NormalizeReport};

use std::sync::{Arc, Mutex};

/// Slot a background fetch writes its result into
type PendingFetch = Arc<Mutex<Option<crate::error::Result<GraphPayload>>>>;

/// Main application state
pub struct KgApp {
    graph_widget: KnowledgeGraphWidget,
    bridge: JsBridge,

    /// Source for refreshes; `None` when the payload was handed in directly
    api: Option<ApiClient>,
    pending_graph: Option<PendingFetch>,

    // Tokio runtime for native fetches, built on first use
    #[cfg(not(target_arch = "wasm32"))]
    runtime: Option<Arc<tokio::runtime::Runtime>>,

    /// Comma-separated ids typed into the toolbar
    highlight_input: String,
    status: String,
    error: Option<String>,
}

impl KgApp {
    fn empty() -> Self {
        Self {
            graph_widget: KnowledgeGraphWidget::new(),
            bridge: JsBridge::new(),
            api: None,
            pending_graph: None,
            #[cfg(not(target_arch = "wasm32"))]
            runtime: None,
            highlight_input: String::new(),
            status: String::new(),
            error: None,
        }
    }

    /// Show a payload that is already in memory
    pub fn with_payload(_cc: &eframe::CreationContext<'_>, payload: GraphPayload) -> Self {
        let mut app = Self::empty();
        let report = app.graph_widget.set_payload(payload);
        app.status = load_status(&report);
        app.bridge.emit_ready();
        app
    }

    /// Fetch the graph from the server, now and on every refresh
    pub fn with_api(_cc: &eframe::CreationContext<'_>, api: ApiClient) -> Self {
        let mut app = Self::empty();
        app.api = Some(api);
        app.load_graph();
        app.bridge.emit_ready();
        app
    }

    pub fn widget(&self) -> &KnowledgeGraphWidget {
        &self.graph_widget
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Fetch when backed by an API, else rebuild from the retained payload
    fn load_graph(&mut self) {
        let Some(api) = self.api.clone() else {
            if let Some(report) = self.graph_widget.refresh() {
                self.status = load_status(&report);
            }
            return;
        };
        if self.pending_graph.is_some() {
            tracing::debug!("Graph fetch already in flight");
            return;
        }

        self.error = None;
        self.status = "Loading graph…".to_string();

        let result: PendingFetch = Arc::new(Mutex::new(None));
        let result_clone = result.clone();
        let fetch = async move {
            let res = api.fetch_graph().await;
            if let Ok(mut slot) = result_clone.lock() {
                *slot = Some(res);
            }
        };

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(fetch);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.runtime() {
                Ok(runtime) => {
                    runtime.spawn(fetch);
                }
                Err(e) => {
                    tracing::warn!("Cannot start fetch runtime: {}", e);
                    self.error = Some(e.to_string());
                    return;
                }
            }
        }

        self.pending_graph = Some(result);
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn runtime(&mut self) -> std::io::Result<Arc<tokio::runtime::Runtime>> {
        if let Some(runtime) = &self.runtime {
            return Ok(runtime.clone());
        }
        let runtime = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()?,
        );
        self.runtime = Some(runtime.clone());
        Ok(runtime)
    }

    /// Take a finished fetch result, if any, and load it
    fn check_pending_fetch(&mut self) {
        let Some(pending) = self.pending_graph.as_ref() else {
            return;
        };
        let finished = match pending.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(result) = finished else {
            return;
        };
        self.pending_graph = None;

        match result {
            Ok(payload) => {
                let report = self.graph_widget.set_payload(payload);
                self.status = load_status(&report);
            }
            Err(e) => {
                tracing::warn!("Graph fetch failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn is_loading(&self) -> bool {
        self.pending_graph.is_some()
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    fn handle_bridge_requests(&mut self) {
        for request in self.bridge.poll_requests() {
            match request {
                BridgeRequest::HighlightPaths(req) => self.graph_widget.highlight_paths(
                    &req.node_ids,
                    &req.edge_ids,
                    &req.shortest_node_ids,
                    &req.shortest_edge_ids,
                ),
                BridgeRequest::ClearHighlight => self.graph_widget.clear_highlight(),
            }
        }
    }

    fn forward_widget_events(&mut self) {
        for event in self.graph_widget.take_events() {
            if let Some(status) = event_status(&event) {
                self.status = status;
            }
            self.bridge.emit(&event);
        }
    }

    fn apply_highlight_input(&mut self) {
        let ids = parse_id_list(&self.highlight_input);
        if ids.is_empty() {
            self.graph_widget.clear_highlight();
        } else {
            let none: &[String] = &[];
            self.graph_widget.highlight_paths(&ids, &ids, none, none);
        }
    }
}

/// Ids from a comma or whitespace separated list
pub fn parse_id_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_status(report: &NormalizeReport) -> String {
    if report.is_clean() {
        "Graph loaded".to_string()
    } else {
        format!(
            "Graph loaded; skipped {} nodes and {} edges",
            report.dropped_nodes(),
            report.dropped_edges()
        )
    }
}

fn event_status(event: &GraphEvent) -> Option<String> {
    match event {
        GraphEvent::NodeSelected { node } => {
            Some(format!("Selected {} ({})", node.name, node.category))
        }
        GraphEvent::EdgeSelected { edge } => Some(format!(
            "Selected {} → {} [{}]",
            edge.source,
            edge.target,
            edge.label()
        )),
        GraphEvent::SourcePreviewRequested { source_id, .. } => {
            Some(format!("Source preview requested: {}", source_id))
        }
        GraphEvent::HighlightCleared => None,
    }
}

impl eframe::App for KgApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_pending_fetch();
        self.handle_bridge_requests();

        if self.is_loading() {
            ctx.request_repaint();
        }

        let mut refresh_clicked = false;
        let mut highlight_clicked = false;

        // =====================================================================
        // TOP PANEL - toolbar
        // =====================================================================
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("−").on_hover_text("Zoom out (-)").clicked() {
                    self.graph_widget.zoom_out();
                }
                if ui.button("+").on_hover_text("Zoom in (+)").clicked() {
                    self.graph_widget.zoom_in();
                }
                if ui.button("100%").on_hover_text("Reset zoom (0)").clicked() {
                    self.graph_widget.reset_zoom();
                }
                if ui.button("Fit").on_hover_text("Fit to content (F)").clicked() {
                    self.graph_widget.fit_to_content();
                }
                if ui.button("⟳ Refresh").clicked() {
                    refresh_clicked = true;
                }

                ui.separator();

                ui.label("Highlight:");
                let input = ui.add(
                    egui::TextEdit::singleline(&mut self.highlight_input)
                        .hint_text("node / edge ids")
                        .desired_width(200.0),
                );
                if input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    highlight_clicked = true;
                }
                if ui.button("Apply").clicked() {
                    highlight_clicked = true;
                }
                if ui.button("Clear").clicked() {
                    self.highlight_input.clear();
                    self.graph_widget.clear_highlight();
                }
            });
        });

        // =====================================================================
        // BOTTOM PANEL - status
        // =====================================================================
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(err) = &self.error {
                    ui.label(RichText::new(format!("Error: {}", err)).color(egui::Color32::RED));
                } else {
                    ui.label(self.status.as_str());
                }
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.graph_widget.ui(ui);
            });

        if refresh_clicked {
            self.load_graph();
        }
        if highlight_clicked {
            self.apply_highlight_input();
        }

        self.forward_widget_events();
    }
}
