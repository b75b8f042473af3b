//! Per-trade event stream: one `ENTRY` and one or more `EXIT` events per
//! trade, serialized as newline-delimited JSON.

use std::io::{BufRead, Write};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{ExitReason, OpenTrade, Side, TradeId};
use crate::engine::entry::{EntrySignal, TriggerType};
use crate::engine::exits::ExitFill;
use crate::planner::Plan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeEvent {
    Entry {
        symbol: String,
        trade_id: TradeId,
        time: DateTime<FixedOffset>,
        price: f64,
        qty: u64,
        side: Side,
        zone: [f64; 2],
        stop: f64,
        t1: f64,
        t2: Option<f64>,
        trigger: TriggerType,
    },
    Exit {
        symbol: String,
        trade_id: TradeId,
        time: DateTime<FixedOffset>,
        price: f64,
        reason: ExitReason,
        qty: u64,
        pnl: f64,
    },
}

impl TradeEvent {
    pub fn entry(trade: &OpenTrade, plan: &Plan, signal: &EntrySignal) -> Self {
        TradeEvent::Entry {
            symbol: trade.symbol.clone(),
            trade_id: trade.trade_id.clone(),
            time: trade.entry_time,
            price: trade.entry_price,
            qty: trade.qty_initial,
            side: trade.side,
            zone: [plan.entry_zone.lo, plan.entry_zone.hi],
            stop: trade.stop,
            t1: trade.t1,
            t2: trade.t2,
            trigger: signal.trigger,
        }
    }

    pub fn exit(fill: &ExitFill) -> Self {
        TradeEvent::Exit {
            symbol: fill.symbol.clone(),
            trade_id: fill.trade_id.clone(),
            time: fill.time,
            price: fill.price,
            reason: fill.reason,
            qty: fill.qty,
            pnl: fill.pnl_actual,
        }
    }

    pub fn trade_id(&self) -> &TradeId {
        match self {
            TradeEvent::Entry { trade_id, .. } | TradeEvent::Exit { trade_id, .. } => trade_id,
        }
    }

    /// Log the event on the `trade` target.
    pub fn emit(&self) {
        match self {
            TradeEvent::Entry {
                symbol,
                trade_id,
                time,
                price,
                qty,
                side,
                stop,
                t1,
                trigger,
                ..
            } => info!(
                target: "trade",
                %symbol, %trade_id, %time, price, qty, %side, stop, t1, %trigger,
                "ENTRY"
            ),
            TradeEvent::Exit {
                symbol,
                trade_id,
                time,
                price,
                reason,
                qty,
                pnl,
            } => info!(
                target: "trade",
                %symbol, %trade_id, %time, price, %reason, qty, pnl,
                "EXIT"
            ),
        }
    }
}

pub fn write_ndjson<W: Write>(mut out: W, events: &[TradeEvent]) -> std::io::Result<()> {
    for event in events {
        serde_json::to_writer(&mut out, event)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

pub fn read_ndjson<R: BufRead>(input: R) -> Result<Vec<TradeEvent>, serde_json::Error> {
    let mut events = Vec::new();
    for line in input.lines() {
        let line = line.map_err(serde_json::Error::io)?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}
