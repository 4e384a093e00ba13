use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

pub type Price = Decimal;

#[derive(Clone, Debug, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Price,
}

/// Daily closes for one symbol, oldest first.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub currency: Option<String>,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: &str, currency: Option<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self {
            symbol: symbol.into(),
            currency,
            points,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn closes(&self) -> Vec<Price> {
        self.points.iter().map(|p| p.close).collect()
    }

    #[inline]
    pub fn latest(&self) -> Option<Price> {
        self.points.last().map(|p| p.close)
    }

    pub fn quote(&self) -> Option<Quote> {
        Quote::from_closes(&self.closes())
    }

    /// `[day number, close]` pairs for plotting.
    pub fn plot_points(&self) -> Vec<[f64; 2]> {
        self.points
            .iter()
            .filter_map(|p| Some([date_to_x(p.date), p.close.to_f64()?]))
            .collect()
    }
}

pub fn date_to_x(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    date.num_days_from_ce() as f64
}

pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quote {
    pub latest: Price,
    pub previous: Price,
    pub change: Price,
    /// `None` when the previous close is zero or the ratio overflows.
    pub percent: Option<Price>,
}

impl Quote {
    /// Needs at least two closes; uses the last two.
    pub fn from_closes(closes: &[Price]) -> Option<Self> {
        match closes {
            [.., previous, latest] => {
                let change = latest - previous;
                let percent = change
                    .checked_div(*previous)
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
                Some(Self {
                    latest: *latest,
                    previous: *previous,
                    change,
                    percent,
                })
            }
            _ => None,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.change > Decimal::ZERO {
            Direction::Up
        } else if self.change < Decimal::ZERO {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    /// `+10.00 (+10.00%)`
    pub fn change_label(&self) -> String {
        let percent = match self.percent {
            Some(p) => format!("{}%", signed(p)),
            None => "n/a".to_string(),
        };
        format!("{} ({})", signed(self.change), percent)
    }
}

/// Two decimals, explicit `+` for positive values and no sign for zero.
pub fn signed(value: Price) -> String {
    let rounded = value.round_dp(2);
    if rounded.is_zero() {
        "0.00".to_string()
    } else if rounded.is_sign_positive() {
        format!("+{:.2}", rounded)
    } else {
        format!("{:.2}", rounded)
    }
}
