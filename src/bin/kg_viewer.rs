//! Native viewer: shows a graph payload JSON file in a window.
//!
//! ```text
//! kg-viewer path/to/graph.json
//! kg-viewer --url http://localhost:8000
//! RUST_LOG=kg_graph=debug kg-viewer graph.json
//! ```

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kg_graph=info,kg_viewer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let source = match args.as_slice() {
        [flag, url] if flag == "--url" => {
            tracing::info!("Fetching graph from {}", url);
            Source::Api(kg_graph::ApiClient::new(url))
        }
        [path] if !path.starts_with('-') => {
            let json = std::fs::read_to_string(path)?;
            let payload = kg_graph::GraphPayload::from_json_str(&json)?;
            tracing::info!(
                "Opening {} ({} nodes, {} edges in payload)",
                path,
                payload.nodes.len(),
                payload.edges.len()
            );
            Source::Payload(payload)
        }
        _ => {
            eprintln!("usage: kg-viewer <graph.json> | kg-viewer --url <base-url>");
            std::process::exit(2);
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Knowledge Graph")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([480.0, 320.0]),
        ..Default::default()
    };

    eframe::run_native(
        "kg-viewer",
        native_options,
        Box::new(move |cc| {
            cc.egui_ctx.set_theme(egui::Theme::Dark);
            let app = match source {
                Source::Payload(payload) => kg_graph::KgApp::with_payload(cc, payload),
                Source::Api(api) => kg_graph::KgApp::with_api(cc, api),
            };
            Ok(Box::new(app))
        }),
    )?;

    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
enum Source {
    Payload(kg_graph::GraphPayload),
    Api(kg_graph::ApiClient),
}

#[cfg(target_arch = "wasm32")]
fn main() {}
