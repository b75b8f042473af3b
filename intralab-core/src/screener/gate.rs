//! Pure per-symbol gate: snapshot + levels in, candidate or rejection out.
//!
//! Stage order is fixed; the first failing stage names the rejection.

use chrono::Duration;
use tracing::debug;

use super::{Candidate, Rejection};
use crate::acceptance;
use crate::config::AppConfig;
use crate::domain::{ist, Candle, Side};
use crate::levels::{distance_bpct, SessionLevels};
use crate::session::SessionSnapshot;

/// Lunch-window volume multiplier on top of `min_vol_ratio`.
pub const LUNCH_VOLUME_MULT: f64 = 1.25;

/// Length of the contiguous run of bars ending at the last bar.
pub fn trailing_contiguous(candles: &[Candle], interval_min: i64) -> usize {
    if candles.is_empty() {
        return 0;
    }
    let step = Duration::minutes(interval_min);
    let mut run = 1;
    for pair in candles.windows(2).rev() {
        if pair[1].timestamp - pair[0].timestamp != step {
            break;
        }
        run += 1;
    }
    run
}

pub fn gate(
    snapshot: SessionSnapshot,
    levels: SessionLevels,
    daily_score: f64,
    config: &AppConfig,
) -> Result<Candidate, Rejection> {
    let ps = &config.precision_screener;
    let symbol = snapshot.symbol.as_str();

    // 1. fetch
    let run = trailing_contiguous(&snapshot.candles, config.engine.interval_min);
    if run < ps.min_bars {
        debug!(symbol, bars = run, need = ps.min_bars, "insufficient contiguous bars");
        return Err(Rejection::FetchSkip);
    }
    let features = snapshot.features().ok_or(Rejection::FetchSkip)?;
    let vr = features.volume_ratio;

    // 2. time gates
    let now = snapshot.tick.with_timezone(&ist()).time();
    if now >= ps.late_cutoff {
        debug!(symbol, %now, "past late cutoff");
        return Err(Rejection::TimeGate);
    }
    if ps.lunch_window.contains(now) && vr < LUNCH_VOLUME_MULT * ps.min_vol_ratio {
        debug!(symbol, vr, "lunch window needs stronger volume");
        return Err(Rejection::TimeGate);
    }

    // 3. volume + VWAP band
    let close = features.close;
    let grace = ps.vwap_grace_bpct.unwrap_or(config.intraday_gate.vwap_relax_bpct);
    let vwap_ok = !config.intraday_gate.require_above_vwap
        || features.vwap.is_some_and(|v| close >= v * (1.0 - grace / 100.0));
    if vr < ps.min_vol_ratio || !vwap_ok {
        debug!(symbol, vr, vwap = ?features.vwap, close, "volume/vwap gate failed");
        return Err(Rejection::GateFail);
    }

    // 4. level
    let Some(level) = levels.resolve_reference() else {
        debug!(symbol, "no reference level");
        return Err(Rejection::LevelFail);
    };

    // 5. primary trigger
    let broke = close > level.price * (1.0 + ps.buffer_bpct / 100.0);
    let ema_ok = features.ma20_slope >= ps.ma20_min_slope
        && features.ema20.is_some_and(|e| close >= e);
    let rsi_ok = features.rsi.is_some_and(|r| in_range(r, ps.rsi_range));
    let adx_ok = features.adx.is_some_and(|a| in_range(a, ps.adx_range));
    if !(broke && ema_ok && rsi_ok && adx_ok) {
        debug!(
            symbol,
            level = level.price,
            close,
            broke,
            ema_ok,
            rsi_ok,
            adx_ok,
            "primary trigger failed"
        );
        return Err(Rejection::BreakFail);
    }

    // 6. retest and hold
    let acceptance = acceptance::evaluate(
        &snapshot.candles,
        features.vwap,
        level.price,
        Side::Long,
        ps.confirm_bars,
        ps.retest_bpct,
        true,
    );
    if !acceptance.ok() {
        debug!(symbol, ?acceptance, "confirmation failed");
        return Err(Rejection::ConfirmFail);
    }

    // 7. chase guard
    let dist = distance_bpct(level.price, close).unwrap_or(f64::INFINITY);
    if dist.abs() > ps.max_breakout_dist_bpct {
        debug!(symbol, dist, "chase guard");
        return Err(Rejection::ChaseFail);
    }

    Ok(Candidate {
        symbol: symbol.to_string(),
        daily_score,
        bias: Side::Long,
        level,
        levels,
        last_close: close,
        vwap: features.vwap,
        atr5: features.atr5,
        dist_from_level_bpct: dist,
        acceptance,
        features,
        snapshot,
    })
}

fn in_range(v: f64, [lo, hi]: [f64; 2]) -> bool {
    v >= lo && v <= hi
}
