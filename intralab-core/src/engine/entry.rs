//! Entry triggers, evaluated once per (symbol, tick) on the last known bar.
//!
//! Priority: zone touch, then zone proximity, then breakout. The first
//! trigger that fires decides the fill price.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EngineConfig;
use crate::domain::{Candle, Side};
use crate::planner::{EntryZone, Plan};
use crate::screener::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    ZoneTouch,
    ZoneProx,
    Breakout,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::ZoneTouch => "ZONE_TOUCH",
            TriggerType::ZoneProx => "ZONE_PROX",
            TriggerType::Breakout => "BREAKOUT",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    pub trigger: TriggerType,
    pub price: f64,
    /// Close-to-nearest-zone-edge distance in percent.
    pub dist_to_zone_bpct: f64,
}

/// Percent distance from `close` to the nearer zone edge.
pub fn zone_distance_bpct(close: f64, zone: &EntryZone) -> f64 {
    let lo = if zone.lo > 0.0 { (close - zone.lo).abs() / zone.lo } else { f64::INFINITY };
    let hi = if zone.hi > 0.0 { (close - zone.hi).abs() / zone.hi } else { f64::INFINITY };
    lo.min(hi) * 100.0
}

/// First firing trigger for `bar`, or `None`.
///
/// `prox_bpct` is the proximity tolerance for this tick (tighter at lunch).
pub fn detect(
    bar: &Candle,
    plan: &Plan,
    candidate: &Candidate,
    prox_bpct: f64,
    engine: &EngineConfig,
) -> Option<EntrySignal> {
    let zone = plan.entry_zone;
    let dist = zone_distance_bpct(bar.close, &zone);

    if bar.low <= zone.hi && bar.high >= zone.lo {
        return Some(EntrySignal {
            trigger: TriggerType::ZoneTouch,
            price: zone.mid(),
            dist_to_zone_bpct: dist,
        });
    }

    if dist <= prox_bpct {
        return Some(EntrySignal {
            trigger: TriggerType::ZoneProx,
            price: bar.close,
            dist_to_zone_bpct: dist,
        });
    }

    if engine.enable_breakout {
        let features = &candidate.features;
        let vr_ok = features.volume_ratio >= engine.breakout_min_vr;
        let fired = match plan.bias {
            Side::Long => {
                bar.close > candidate.level.price && features.ma20_slope >= 0.0 && vr_ok
            }
            Side::Short => {
                plan.key_level.is_finite()
                    && bar.close < plan.key_level
                    && features.ma20_slope <= 0.0
                    && vr_ok
            }
        };
        if fired {
            return Some(EntrySignal {
                trigger: TriggerType::Breakout,
                price: bar.close,
                dist_to_zone_bpct: dist,
            });
        }
    }

    None
}
