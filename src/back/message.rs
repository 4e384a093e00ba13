use chrono::{DateTime, Local};

use super::provider::StockInfo;
use super::series::{PriceSeries, Quote};
use super::session::DateRange;
use super::watch::WatchItem;

#[derive(Debug)]
pub enum ToBackend {
    Refresh,
    SetInterval(u32),
    SetWatchlist(Vec<WatchItem>),
    SetRange(DateRange),
    SetToken(Option<String>),
    LoadStockList,
}

#[derive(Debug)]
pub enum ToFrontend {
    Board {
        fetched_at: DateTime<Local>,
        panels: Vec<Panel>,
    },
    StockList(Result<Vec<StockInfo>, String>),
}

/// Outcome for one watch item in one tick.
#[derive(Debug)]
pub struct Panel {
    pub item: WatchItem,
    pub state: PanelState,
}

#[derive(Debug)]
pub enum PanelState {
    Chart {
        series: PriceSeries,
        quote: Option<Quote>,
    },
    Warning(String),
    Error(String),
}
