//! Daily price-limit guards.
//!
//! A buy cannot fill at or above the limit-up price and a sell cannot fill at
//! or below the limit-down price. Limit prices are the previous close scaled
//! by the limit percentage. When a price tick is configured the limit price is
//! first rounded to that grid, as exchanges publish it.

/// Slack for comparing a fill price against a computed limit price.
const PRICE_EPSILON: f64 = 1e-9;

/// Round a price to the nearest multiple of `tick`.
pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    (price / tick).round() * tick
}

fn on_grid(price: f64, tick: Option<f64>) -> f64 {
    match tick {
        Some(tick) => round_to_tick(price, tick),
        None => price,
    }
}

pub fn limit_up_price(prev_close: f64, limit_pct: f64, tick: Option<f64>) -> f64 {
    on_grid(prev_close * (1.0 + limit_pct), tick)
}

pub fn limit_down_price(prev_close: f64, limit_pct: f64, tick: Option<f64>) -> f64 {
    on_grid(prev_close * (1.0 - limit_pct), tick)
}

/// True when `price` is at or beyond limit-up, so a buy cannot fill.
pub fn blocks_buy(price: f64, prev_close: f64, limit_pct: f64, tick: Option<f64>) -> bool {
    price >= limit_up_price(prev_close, limit_pct, tick) - PRICE_EPSILON
}

/// True when `price` is at or beyond limit-down, so a sell cannot fill.
pub fn blocks_sell(price: f64, prev_close: f64, limit_pct: f64, tick: Option<f64>) -> bool {
    price <= limit_down_price(prev_close, limit_pct, tick) + PRICE_EPSILON
}
