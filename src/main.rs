#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::egui;

mod app;
mod core;
mod style;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        centered: true,
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([600.0, 520.0])
            .with_title("Image Converter"),
        ..Default::default()
    };

    eframe::run_native(
        "Image Converter",
        options,
        Box::new(|cc| Ok(Box::new(app::ConverterApp::new(cc)?))),
    )
}
