mod app;
mod color;
mod state;
mod ui;
mod worker;

use app::PlaygroundApp;
use eframe::egui;
use rusty_playground::settings::Settings;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = Settings::from_env();
    log::info!("starting with {settings:?}");
    let state = match AppState::new(settings) {
        Ok(state) => state,
        Err(e) => {
            log::error!("{e:#}");
            return Err(eframe::Error::AppCreation(e.into()));
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Playground – ML Pipeline",
        options,
        Box::new(|_cc| Ok(Box::new(PlaygroundApp::new(state)))),
    )
}
