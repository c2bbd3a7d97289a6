mod api;
mod app;
mod config;
mod detail;
mod exporter;
mod filters;
mod logging;
mod models;
mod scatterplot;
mod share;
mod table;
mod tasks;
mod tree;
mod typeahead;
mod ui;

use crate::api::HttpApi;
use crate::app::AppState;
use crate::config::CONFIG;
use crate::share::parse_share_link;
use eframe::egui;
use eframe::egui::Visuals;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct MyApp {
    state: AppState,
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(Visuals::dark());

        self.state.poll();

        egui::SidePanel::left("tree_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("TIN-X");
                ui.separator();
                ui::side_panel(ui, &mut self.state);
            });

        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .min_height(50.0)
            .default_height(self.state.log_panel_height)
            .show_animated(ctx, self.state.log_panel_visible, |ui| {
                ui::log_panel(ui, &mut self.state);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui::central_panel(ctx, ui, &mut self.state);

            if !self.state.log_panel_visible {
                ui.with_layout(egui::Layout::bottom_up(egui::Align::Center), |ui| {
                    if ui.button("Show Log").clicked() {
                        self.state.log_panel_visible = true;
                    }
                });
            }
        });

        ui::detail_window(ctx, &mut self.state);
        ui::share_window(ctx, &mut self.state);
        ui::about_window(ctx, &mut self.state);

        if self.state.has_pending() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let log = logging::init();
    let config = CONFIG.clone();
    info!(environment = %config.environment, api = %config.api_root, "starting TIN-X explorer");

    let api = Arc::new(HttpApi::new(&config)?);
    let mut state = AppState::new(api, config, log);

    if let Some(arg) = std::env::args().nth(1) {
        match parse_share_link(&arg) {
            Some(link) => state.open_share_link(link),
            None => warn!(%arg, "ignoring argument that is not a share link"),
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        "TIN-X Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp { state }))),
    )?;

    Ok(())
}
