#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::{egui::ViewportBuilder, run_native, NativeOptions};
use stock_watchboard::ui::WatchboardApp;

fn main() -> Result<(), eframe::Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .init();
    let viewport = ViewportBuilder::default()
        .with_title("Stock Watchboard")
        .with_inner_size((1280.0, 860.0))
        .with_min_inner_size((640.0, 420.0));

    let native_options = NativeOptions {
        viewport,
        ..Default::default()
    };

    run_native(
        "Stock Watchboard",
        native_options,
        Box::new(|cc| Ok(Box::new(WatchboardApp::new(cc)))),
    )
}
