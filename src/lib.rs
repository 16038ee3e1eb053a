//! Knowledge-graph evolution dashboard
//!
//! Fetches the triple-count history of a versioned RDF repository and shows:
//! - Evolution chart: total triples with insertion/deletion bars, autoscaled
//!   to the visible window
//! - Class and property hierarchies for a clicked snapshot, or the diff of
//!   two clicked snapshots
//!
//! `core` is platform-agnostic; the egui dashboard (feature `wasm`) and the
//! `evo-cli` binary (feature `cli`) drive the same [`core::Session`].

pub mod core;
pub mod time;

#[cfg(any(feature = "wasm", feature = "cli"))]
pub mod http;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
mod app;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
mod theme;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
mod web {
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;

    use crate::app::EvoApp;

    fn find_canvas(id: &str) -> Result<web_sys::HtmlCanvasElement, JsValue> {
        web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?
            .get_element_by_id(id)
            .ok_or_else(|| JsValue::from_str("no canvas element"))?
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("not a canvas element"))
    }

    #[wasm_bindgen(start)]
    pub fn main() {
        console_error_panic_hook::set_once();

        // Initialize tracing for browser console
        tracing_wasm::set_as_global_default();

        let web_options = eframe::WebOptions::default();

        wasm_bindgen_futures::spawn_local(async {
            let canvas = match find_canvas("canvas") {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = ?e, "Cannot start dashboard");
                    return;
                }
            };

            if let Err(e) = eframe::WebRunner::new()
                .start(
                    canvas,
                    web_options,
                    Box::new(|cc| Ok(Box::new(EvoApp::new(cc)))),
                )
                .await
            {
                tracing::error!(error = ?e, "Failed to start eframe");
            }
        });
    }
}
