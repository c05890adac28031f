mod app;
mod components;
mod config;
mod links;
mod logging;
mod markup;
mod models;
mod notify;
mod pages;
mod rpc;
mod share;
mod sidebar;
mod state;
mod storage;
mod studio;
#[cfg(all(test, not(target_arch = "wasm32")))]
mod testing;
mod util;
mod viewer;

use crate::app::App;
use crate::config::EnvConfig;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();

    let config = EnvConfig::new();
    logging::init(&config.log_level);
    tracing::info!(api_url = %config.api_url, "starting doc studio");

    mount_to_body(move || view! { <App config=config.clone() /> });
}
