//! Risk-based position sizing and late-entry size penalties.

use crate::config::{IntradayGateConfig, LateEntryPenaltyConfig, RiskConfig};
use crate::session::IntradayFeatures;

pub const DEFAULT_BOOK_FRACTION: f64 = 0.30;

/// Quantity risking `risk_capital * risk_pct_per_trade` at `risk_per_share`,
/// scaled by `qty_scale`, floored at `min_qty` and rounded down to whole lots
/// (never below one lot). Zero when the risk is not positive.
pub fn position_size(risk: &RiskConfig, risk_per_share: f64, qty_scale: f64) -> u64 {
    if !(risk_per_share > 0.0) || !risk_per_share.is_finite() {
        return 0;
    }
    let budget = risk.risk_capital * risk.risk_pct_per_trade;
    let raw = (budget / risk_per_share).floor().max(0.0);
    let scaled = (raw * qty_scale.clamp(0.0, 1.0)).floor() as u64;
    let qty = scaled.max(risk.min_qty);
    let lot = risk.round_lot.max(1);
    if qty == 0 {
        return 0;
    }
    ((qty / lot) * lot).max(lot)
}

/// Multiplicative size penalty plus the caution label of each penalty applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SizePenalty {
    pub qty_scale: f64,
    pub cautions: Vec<String>,
}

pub fn late_entry_penalty(
    features: &IntradayFeatures,
    late: &LateEntryPenaltyConfig,
    gate: &IntradayGateConfig,
) -> SizePenalty {
    let mut qty_scale = 1.0;
    let mut cautions = Vec::new();

    if let (Some(cap), Some(rsi)) = (late.rsi_above, features.rsi) {
        if rsi > cap {
            qty_scale *= 0.6;
            cautions.push(format!("late_entry_rsi>{cap}"));
        }
    }
    if let (Some(cap), Some(hist)) = (late.macd_above, features.macd_hist) {
        if hist > cap {
            qty_scale *= 0.8;
            cautions.push(format!("late_entry_macd_hist>{cap}"));
        }
    }
    if features.volume_ratio < gate.min_volume_ratio {
        qty_scale *= 0.8;
        cautions.push("weak_volume_ratio".to_string());
    }
    if let Some(rsi) = features.rsi {
        if !(gate.min_rsi..=gate.max_rsi).contains(&rsi) {
            qty_scale *= 0.85;
            cautions.push("rsi_out_of_band".to_string());
        }
    }
    if let Some(adx) = features.adx {
        if !(gate.min_adx..=gate.max_adx).contains(&adx) {
            qty_scale *= 0.9;
            cautions.push("adx_out_of_band".to_string());
        }
    }

    SizePenalty { qty_scale, cautions }
}

/// Parse "book_30%" style actions into a fraction in [0.05, 0.95].
pub fn parse_book_fraction(action: &str) -> f64 {
    let digits: String = action
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let pct = digits.parse::<f64>().ok().filter(|v| v.is_finite());
    match pct {
        Some(p) => (p / 100.0).clamp(0.05, 0.95),
        None => DEFAULT_BOOK_FRACTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(rsi: f64, adx: f64, vr: f64, hist: f64) -> IntradayFeatures {
        IntradayFeatures {
            close: 100.0,
            vwap: Some(99.0),
            volume_ratio: vr,
            rsi: Some(rsi),
            rsi_slope: 0.0,
            adx: Some(adx),
            adx_slope: 0.0,
            ema20: Some(99.5),
            ema50: Some(99.0),
            ma20_slope: 0.0,
            macd_hist: Some(hist),
            above_vwap: true,
            squeeze_pctile: None,
            atr5: 0.5,
        }
    }

    #[test]
    fn size_from_risk_budget() {
        let risk = RiskConfig::default();
        // 100000 * 0.005 = 500 rupees at 1.0 per share
        assert_eq!(position_size(&risk, 1.0, 1.0), 500);
        assert_eq!(position_size(&risk, 3.0, 1.0), 166);
        assert_eq!(position_size(&risk, 1.0, 0.6), 300);
        assert_eq!(position_size(&risk, 0.0, 1.0), 0);
    }

    #[test]
    fn size_respects_min_qty_and_lots() {
        let risk = RiskConfig {
            min_qty: 10,
            round_lot: 25,
            ..RiskConfig::default()
        };
        assert_eq!(position_size(&risk, 1.0, 1.0), 500);
        assert_eq!(position_size(&risk, 3.0, 1.0), 150);
        // raw 1 -> min_qty 10 -> one lot
        assert_eq!(position_size(&risk, 400.0, 1.0), 25);
    }

    #[test]
    fn penalties_multiply() {
        let late = LateEntryPenaltyConfig {
            rsi_above: Some(72.0),
            macd_above: Some(0.1),
        };
        let gate = IntradayGateConfig::default();
        let p = late_entry_penalty(&features(75.0, 45.0, 1.0, 0.2), &late, &gate);
        let expected = 0.6 * 0.8 * 0.8 * 0.85 * 0.9;
        assert!((p.qty_scale - expected).abs() < 1e-12);
        assert_eq!(
            p.cautions,
            vec![
                "late_entry_rsi>72",
                "late_entry_macd_hist>0.1",
                "weak_volume_ratio",
                "rsi_out_of_band",
                "adx_out_of_band"
            ]
        );
    }

    #[test]
    fn clean_features_have_no_penalty() {
        let p = late_entry_penalty(
            &features(60.0, 25.0, 2.0, 0.0),
            &LateEntryPenaltyConfig::default(),
            &IntradayGateConfig::default(),
        );
        assert_eq!(p.qty_scale, 1.0);
        assert!(p.cautions.is_empty());
    }

    #[test]
    fn book_fraction_parsing() {
        assert!((parse_book_fraction("book_30%") - 0.30).abs() < 1e-12);
        assert!((parse_book_fraction("book_100%") - 0.95).abs() < 1e-12);
        assert!((parse_book_fraction("book_2%") - 0.05).abs() < 1e-12);
        assert!((parse_book_fraction("trail") - DEFAULT_BOOK_FRACTION).abs() < 1e-12);
    }
}
