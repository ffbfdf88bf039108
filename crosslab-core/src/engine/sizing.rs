//! Buy sizing — how many whole lots the available cash can pay for.

use crate::domain::TradeSide;
use crate::engine::fees::FeeSchedule;

/// Cash debited by a buy: notional plus fees.
pub fn buy_cost(price: f64, shares: u64, fees: &FeeSchedule, instrument_code: &str) -> f64 {
    price * shares as f64 + fees.fees(price, shares, TradeSide::Buy, instrument_code)
}

/// Largest lot-multiple share count whose full cost fits in `cash`.
///
/// Starts from `floor(cash / (price * (1 + commission_rate + transfer_fee_rate)))`
/// rounded down to the lot size, then steps down one lot at a time while the
/// fee floor (or a per-share transfer fee on a cheap instrument) still pushes
/// the cost above `cash`. The result always satisfies
/// `cash - buy_cost(price, shares) >= 0`.
pub fn affordable_shares(
    cash: f64,
    price: f64,
    fees: &FeeSchedule,
    lot_size: u64,
    instrument_code: &str,
) -> u64 {
    if lot_size == 0 || cash <= 0.0 || price <= 0.0 {
        return 0;
    }

    let mut max_shares = (cash / (price * (1.0 + fees.sizing_rate()))).floor();

    // The per-share transfer fee can exceed `price * transfer_fee_rate` when
    // price < 1; cap by the per-share cost bound as well.
    if fees.applies_transfer_fee(instrument_code) {
        let per_share = price * (1.0 + fees.commission_rate) + fees.transfer_fee_rate;
        max_shares = max_shares.min((cash / per_share).floor());
    }

    if !max_shares.is_finite() || max_shares < lot_size as f64 {
        return 0;
    }

    let mut shares = (max_shares as u64 / lot_size) * lot_size;
    while shares > 0 && buy_cost(price, shares, fees, instrument_code) > cash {
        shares -= lot_size;
    }
    shares
}
