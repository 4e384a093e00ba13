use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Local};
use crossbeam::channel::{Receiver, Sender};
use eframe::{
    egui::{
        self, Button, CentralPanel, Color32, Context, FontData,
        FontDefinitions, FontFamily, Grid, RichText, ScrollArea, Separator, SidePanel, Slider,
        Style, TextEdit, TextStyle, TopBottomPanel, Visuals,
    },
    App, CreationContext,
};
use egui_extras::DatePickerButton;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::back::{
    message::{Panel, PanelState, ToBackend, ToFrontend},
    provider::{Providers, StockInfo},
    series::{Direction, PriceSeries},
    session::{DateRange, SessionConfig, DEFAULT_REFRESH_SECS, MAX_REFRESH_SECS, MIN_REFRESH_SECS},
    watch::{parse_watchlist, DEFAULT_WATCHLIST},
    Back,
};

mod chart;

pub const TOKEN_ENV: &str = "FINMIND_API_TOKEN";
pub const CJK_FONT_ENV: &str = "WATCHBOARD_CJK_FONT";

const COLUMNS: usize = 4;

#[derive(Default)]
pub struct WatchboardApp {
    setting: Setting,
    token: String,
    // last values sent to the poller
    committed_watchlist: String,
    committed_token: String,
    panels: Vec<Panel>,
    fetched_at: Option<DateTime<Local>>,
    stock_list: Option<Result<Vec<StockInfo>, String>>,
    startup_error: Option<String>,
    // Data transferring
    front_tx: Option<Sender<ToBackend>>,
    back_rx: Option<Receiver<ToFrontend>>,
}

/// Persisted between runs. The API token never is.
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct Setting {
    open: bool,
    watchlist: String,
    notes: String,
    interval: u32,
    range: DateRange,
}

impl Default for Setting {
    fn default() -> Self {
        Self {
            open: true,
            watchlist: DEFAULT_WATCHLIST.to_string(),
            notes: String::new(),
            interval: DEFAULT_REFRESH_SECS,
            range: DateRange::default(),
        }
    }
}

fn setup_custom_fonts(ctx: &Context, path: &str) {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!("cannot read font {}: {}", path, e);
            return;
        }
    };
    let mut fonts = FontDefinitions::default();
    fonts
        .font_data
        .insert("cjk".to_owned(), Arc::new(FontData::from_owned(bytes)));
    fonts
        .families
        .entry(FontFamily::Proportional)
        .or_default()
        .push("cjk".to_owned());
    fonts
        .families
        .entry(FontFamily::Monospace)
        .or_default()
        .push("cjk".to_owned());
    ctx.set_fonts(fonts);
    info!("loaded fallback font {}", path);
}

/// Panels grouped into display rows.
fn grid_rows<T>(items: &[T]) -> std::slice::Chunks<'_, T> {
    items.chunks(COLUMNS)
}

/// Records `current` as the last commit; false when nothing changed.
fn commit(last: &mut String, current: &str) -> bool {
    if last == current {
        return false;
    }
    last.clear();
    last.push_str(current);
    true
}

fn change_color(direction: Direction) -> Color32 {
    match direction {
        Direction::Up => Color32::RED,
        Direction::Down => Color32::GREEN,
        Direction::Flat => Color32::WHITE,
    }
}

impl WatchboardApp {
    pub fn new(cc: &CreationContext) -> Self {
        let mut new_app = Self::default();
        new_app.configure_style(&cc.egui_ctx);
        if let Ok(path) = std::env::var(CJK_FONT_ENV) {
            setup_custom_fonts(&cc.egui_ctx, &path);
        }

        if let Some(storage) = cc.storage {
            if let Some(setting) = eframe::get_value(storage, eframe::APP_KEY) {
                new_app.setting = setting
            }
        }
        new_app.token = std::env::var(TOKEN_ENV).unwrap_or_default();
        new_app.committed_watchlist = new_app.setting.watchlist.clone();
        new_app.committed_token = new_app.token.clone();

        let providers = match Providers::new() {
            Ok(p) => p,
            Err(e) => {
                error!("cannot build http clients: {}", e);
                new_app.startup_error = Some(e.to_string());
                return new_app;
            }
        };

        let mut session = SessionConfig {
            items: parse_watchlist(&new_app.setting.watchlist),
            range: new_app.setting.range,
            refresh_secs: new_app.setting.interval,
            token: None,
        };
        session.set_token(Some(new_app.token.clone()));

        let (front_tx, front_rx) = crossbeam::channel::unbounded();
        let (back_tx, back_rx) = crossbeam::channel::unbounded();
        let mut back =
            Back::new(providers, session, back_tx, front_rx).with_repaint(cc.egui_ctx.clone());
        thread::spawn(move || back.run());
        new_app.front_tx = Some(front_tx);
        new_app.back_rx = Some(back_rx);
        new_app
    }

    fn configure_style(&self, ctx: &Context) {
        // change colours assume a dark background
        let style = Style {
            visuals: Visuals::dark(),
            ..Style::default()
        };
        ctx.set_style(style);
    }

    fn send(&self, msg: ToBackend) {
        if let Some(tx) = &self.front_tx {
            if let Err(e) = tx.send(msg) {
                error!("send ToBackend msg failed: {}", e);
            }
        }
    }

    fn receive(&mut self) {
        let Some(rx) = &self.back_rx else {
            return;
        };
        while let Ok(message) = rx.try_recv() {
            match message {
                ToFrontend::Board { fetched_at, panels } => {
                    self.fetched_at = Some(fetched_at);
                    self.panels = panels;
                }
                ToFrontend::StockList(list) => {
                    self.stock_list = Some(list);
                }
            }
        }
    }

    fn render_top_panel(&mut self, ctx: &Context) {
        TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let config_btn = ui.add(Button::new(
                    RichText::new("🛠")
                        .text_style(TextStyle::Body)
                        .color(Color32::LIGHT_BLUE),
                ));
                if config_btn.clicked() {
                    self.setting.open = !self.setting.open
                }
                ui.heading("📈 Stocks, ETFs & Crypto");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let refresh_btn = ui.add(Button::new(
                        RichText::new("🔄")
                            .text_style(TextStyle::Body)
                            .color(Color32::GREEN),
                    ));
                    if refresh_btn.clicked() {
                        self.send(ToBackend::Refresh);
                    }
                    if let Some(at) = self.fetched_at {
                        ui.weak(format!("updated {}", at.format("%H:%M:%S")));
                    }
                });
            });
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label("Watchlist (Name:Symbol, comma separated)");
                let response = ui.add(
                    TextEdit::singleline(&mut self.setting.watchlist)
                        .desired_width(f32::INFINITY),
                );
                if response.lost_focus()
                    && commit(&mut self.committed_watchlist, &self.setting.watchlist)
                {
                    self.send(ToBackend::SetWatchlist(parse_watchlist(
                        &self.setting.watchlist,
                    )));
                }
            });
            ui.add_space(4.0);
        });
    }

    fn setting_panel(&mut self, ctx: &Context) {
        if self.setting.open {
            SidePanel::left("setting")
                .default_width(240.0)
                .show(ctx, |ui| {
                    ui.label(RichText::new("⚙ setting").color(Color32::LIGHT_BLUE));
                    ui.add(Separator::default().spacing(6.0));
                    self.setting_panel_contents(ui);
                });
        }
    }

    fn setting_panel_contents(&mut self, ui: &mut egui::Ui) {
        ui.label(RichText::new("🔐 FinMind token").color(Color32::GOLD));
        let response = ui.add(
            TextEdit::singleline(&mut self.token)
                .password(true)
                .hint_text("API token"),
        );
        if response.lost_focus() && commit(&mut self.committed_token, &self.token) {
            self.send(ToBackend::SetToken(Some(self.token.clone())));
        }
        if !self.token.trim().is_empty() && ui.button("📋 Show Taiwan stock list").clicked() {
            self.send(ToBackend::LoadStockList);
        }
        self.render_stock_list(ui);
        ui.add(Separator::default().spacing(6.0));

        ui.horizontal(|ui| {
            ui.label(RichText::new("🕘").color(Color32::GREEN));
            let interval_slider = ui.add(
                Slider::new(&mut self.setting.interval, MIN_REFRESH_SECS..=MAX_REFRESH_SECS)
                    .suffix(" s")
                    .step_by(10.0),
            );
            if interval_slider.changed() {
                self.send(ToBackend::SetInterval(self.setting.interval));
            }
        });
        ui.add(Separator::default().spacing(6.0));

        let mut range_changed = false;
        Grid::new("date_range").num_columns(2).show(ui, |ui| {
            ui.label("Start");
            range_changed |= ui
                .add(DatePickerButton::new(&mut self.setting.range.start).id_salt("start_date"))
                .changed();
            ui.end_row();
            ui.label("End");
            range_changed |= ui
                .add(DatePickerButton::new(&mut self.setting.range.end).id_salt("end_date"))
                .changed();
            ui.end_row();
        });
        if !self.setting.range.is_valid() {
            ui.colored_label(Color32::YELLOW, "start date is after end date");
        }
        if range_changed {
            self.send(ToBackend::SetRange(self.setting.range));
        }
        ui.add(Separator::default().spacing(6.0));

        ui.label(RichText::new("📌 Notes").color(Color32::LIGHT_BLUE));
        ui.add(
            TextEdit::multiline(&mut self.setting.notes)
                .hint_text("favourite codes, not queried")
                .desired_rows(4),
        );
    }

    fn render_stock_list(&self, ui: &mut egui::Ui) {
        match &self.stock_list {
            None => {}
            Some(Err(e)) => {
                ui.colored_label(Color32::RED, format!("cannot load stock list: {}", e));
            }
            Some(Ok(list)) => {
                ScrollArea::vertical()
                    .id_salt("stock_list")
                    .max_height(280.0)
                    .show(ui, |ui| {
                        Grid::new("stock_list_grid").striped(true).show(ui, |ui| {
                            for stock in list {
                                ui.label(stock.stock_id.as_str());
                                ui.label(stock.stock_name.as_str());
                                ui.end_row();
                            }
                        });
                    });
            }
        }
    }

    fn render_panels(&self, ui: &mut egui::Ui) {
        if let Some(e) = &self.startup_error {
            ui.colored_label(Color32::RED, format!("Error: {}", e));
            return;
        }
        if self.fetched_at.is_none() {
            ui.spinner();
            return;
        }
        if self.panels.is_empty() {
            ui.weak("Watchlist is empty. Add entries like Apple:AAPL above.");
            return;
        }
        ScrollArea::vertical().show(ui, |ui| {
            for (row, chunk) in grid_rows(&self.panels).enumerate() {
                ui.columns(COLUMNS, |cols| {
                    for (i, panel) in chunk.iter().enumerate() {
                        render_panel(&mut cols[i], row * COLUMNS + i, panel);
                    }
                });
                ui.add_space(12.0);
            }
        });
    }
}

fn render_panel(ui: &mut egui::Ui, index: usize, panel: &Panel) {
    ui.heading(format!("{} ({})", panel.item.name, panel.item.symbol));
    match &panel.state {
        PanelState::Chart { series, quote } => {
            chart::price_chart(ui, index, series);
            price_label(ui, series);
            match quote {
                Some(q) => {
                    ui.colored_label(
                        change_color(q.direction()),
                        format!("Change: {}", q.change_label()),
                    );
                }
                None => {
                    ui.weak("Change: no previous close");
                }
            }
        }
        PanelState::Warning(msg) => {
            ui.colored_label(Color32::YELLOW, format!("⚠ {}", msg));
        }
        PanelState::Error(msg) => {
            ui.colored_label(Color32::RED, format!("Error: {}", msg));
        }
    }
}

fn price_label(ui: &mut egui::Ui, series: &PriceSeries) {
    if let Some(latest) = series.latest() {
        let currency = series.currency.as_deref().unwrap_or_default();
        ui.label(format!("Price: {:.2} {}", latest.round_dp(2), currency));
    }
}

impl App for WatchboardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.receive();
        self.render_top_panel(ctx);
        self.setting_panel(ctx);
        CentralPanel::default().show(ctx, |ui| {
            self.render_panels(ui);
        });
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.setting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_hold_four_panels() {
        let items: Vec<u8> = (0..6).collect();
        let sizes: Vec<usize> = grid_rows(&items).map(<[u8]>::len).collect();
        assert_eq!(sizes, vec![4, 2]);
        assert_eq!(grid_rows::<u8>(&[]).count(), 0);
    }

    #[test]
    fn rises_are_red_and_falls_green() {
        assert_eq!(change_color(Direction::Up), Color32::RED);
        assert_eq!(change_color(Direction::Down), Color32::GREEN);
        assert_eq!(change_color(Direction::Flat), Color32::WHITE);
    }

    #[test]
    fn unchanged_input_is_not_recommitted() {
        let mut last = String::from("Apple:AAPL");
        assert!(!commit(&mut last, "Apple:AAPL"));
        assert!(commit(&mut last, "Apple:AAPL, TSMC:2330.TW"));
        assert_eq!(last, "Apple:AAPL, TSMC:2330.TW");
        assert!(!commit(&mut last, "Apple:AAPL, TSMC:2330.TW"));

        let mut token = String::new();
        assert!(!commit(&mut token, ""));
        assert!(commit(&mut token, "tok"));
    }

    #[test]
    fn default_setting_watches_four_symbols() {
        let setting = Setting::default();
        assert_eq!(setting.interval, 60);
        assert_eq!(parse_watchlist(&setting.watchlist).len(), 4);
        assert!(setting.range.is_valid());
    }
}
