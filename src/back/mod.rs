use std::time::Duration;

use chrono::Local;
use crossbeam::{
    channel::{tick, Receiver, Sender},
    select,
};
use eframe::egui::Context;
use tracing::{error, info, warn};

pub mod message;
pub mod provider;
pub mod series;
pub mod session;
pub mod watch;

use message::{Panel, PanelState, ToBackend, ToFrontend};
use provider::{Fetch, FetchError};
use session::{clamp_refresh, SessionConfig};

/// Background poller: fetches every watch item on each tick and ships the
/// results to the UI thread.
pub struct Back<F> {
    fetcher: F,
    session: SessionConfig,
    back_tx: Sender<ToFrontend>,
    front_rx: Receiver<ToBackend>,
    repaint: Option<Context>,
    tick_unit: Duration,
}

impl<F: Fetch> Back<F> {
    pub fn new(
        fetcher: F,
        session: SessionConfig,
        back_tx: Sender<ToFrontend>,
        front_rx: Receiver<ToBackend>,
    ) -> Self {
        Self {
            fetcher,
            session,
            back_tx,
            front_rx,
            repaint: None,
            tick_unit: Duration::from_secs(1),
        }
    }

    pub fn with_repaint(mut self, ctx: Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    /// Scales refresh seconds down so ticker tests run in milliseconds.
    #[cfg(test)]
    fn with_tick_unit(mut self, unit: Duration) -> Self {
        self.tick_unit = unit;
        self
    }

    fn interval(&self) -> Duration {
        self.tick_unit * clamp_refresh(self.session.refresh_secs)
    }

    /// Runs until the UI side hangs up.
    pub fn run(&mut self) {
        info!(
            "poller started: {} items every {:?}",
            self.session.items.len(),
            self.interval()
        );
        self.refetch_data();
        let mut ticker = tick(self.interval());
        loop {
            // None means the ticker fired
            let event = select! {
                recv(self.front_rx) -> msg => Some(msg),
                recv(ticker) -> _msg => None,
            };
            let msg = match event {
                None => {
                    self.refetch_data();
                    continue;
                }
                Some(Ok(msg)) => msg,
                Some(Err(_)) => {
                    info!("frontend gone, poller stopping");
                    break;
                }
            };
            match msg {
                ToBackend::LoadStockList => {
                    self.load_stock_list();
                    continue;
                }
                ToBackend::SetInterval(secs) => {
                    self.session.refresh_secs = clamp_refresh(secs);
                    info!("refresh interval set to {}s", self.session.refresh_secs);
                }
                ToBackend::Refresh => self.refetch_data(),
                ToBackend::SetWatchlist(items) => {
                    self.session.items = items;
                    self.refetch_data();
                }
                ToBackend::SetRange(range) => {
                    self.session.range = range;
                    self.refetch_data();
                }
                ToBackend::SetToken(token) => {
                    self.session.set_token(token);
                    self.refetch_data();
                }
            }
            ticker = tick(self.interval());
        }
    }

    /// One tick: every item fetched in order, failures kept per item.
    pub fn poll(&self) -> Vec<Panel> {
        let token = self.session.token();
        self.session
            .items
            .iter()
            .map(|item| {
                let state = match self.fetcher.fetch_symbol(&item.symbol, &self.session.range, token) {
                    Ok(series) => {
                        let quote = series.quote();
                        PanelState::Chart { series, quote }
                    }
                    Err(err) => {
                        warn!("{} ({}): {}", item.name, item.symbol, err);
                        panel_failure(err)
                    }
                };
                Panel {
                    item: item.clone(),
                    state,
                }
            })
            .collect()
    }

    fn refetch_data(&self) {
        let panels = self.poll();
        self.send(ToFrontend::Board {
            fetched_at: Local::now(),
            panels,
        });
    }

    fn send(&self, msg: ToFrontend) {
        if let Err(e) = self.back_tx.send(msg) {
            error!("send ToFrontend msg failed: {}", e);
            return;
        }
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
    }

    fn load_stock_list(&self) {
        let result = match self.session.token() {
            Some(token) => self
                .fetcher
                .stock_list(token)
                .map_err(|e| e.to_string()),
            None => Err("a FinMind token is required".to_string()),
        };
        if let Err(e) = &result {
            warn!("stock list: {}", e);
        }
        self.send(ToFrontend::StockList(result));
    }
}

fn panel_failure(err: FetchError) -> PanelState {
    if err.is_empty_series() {
        PanelState::Warning(err.to_string())
    } else {
        PanelState::Error(err.to_string())
    }
}
