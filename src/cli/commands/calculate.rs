//! Calculate indicator command.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use quotefeed_config::AppConfig;
use quotefeed_core::{CalculateResponse, CandleRange, IndicatorRequest, IndicatorResult};
use serde_json::Value;

use super::build_service;
use crate::cli::CalculateArgs;

pub async fn run(args: CalculateArgs, config: &AppConfig) -> Result<()> {
    let parameters: Value =
        serde_json::from_str(&args.params).context("--params must be a JSON object")?;
    let interval = args.interval.unwrap_or(config.service.default_interval);
    let bars = args.bars.unwrap_or(config.service.default_lookback_bars);
    let range = CandleRange::trailing(Utc::now().timestamp_millis(), bars, interval)
        .context("--bars is too large for the interval")?;

    let request =
        IndicatorRequest::new(args.symbol, args.indicator, parameters).with_range(range);
    let service = build_service(config)?;

    let (status, response) = service.handle(&request).await;
    match response {
        CalculateResponse::Data { data } => {
            print_table(&data, args.tail);
            Ok(())
        }
        CalculateResponse::Error(body) => {
            let hint = body
                .retry_after_secs
                .map(|secs| format!(" (retry after {secs}s)"))
                .unwrap_or_default();
            bail!("Request failed with status {status}: {}{hint}", body.error)
        }
    }
}

fn print_table(result: &IndicatorResult, tail: Option<usize>) {
    println!(
        "{} {} {}",
        result.symbol, result.kind, result.parameters
    );
    if result.timestamps.is_empty() {
        println!("No candles in range");
        return;
    }

    print!("{:<20}", "time");
    for series in &result.series {
        print!("{:>14}", series.name);
    }
    println!();

    let len = result.timestamps.len();
    let start = tail.map_or(0, |n| len.saturating_sub(n));
    for (i, ts) in result.timestamps.iter().enumerate().skip(start) {
        let time = DateTime::<Utc>::from_timestamp_millis(*ts)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| ts.to_string());
        print!("{time:<20}");
        for series in &result.series {
            match series.values.get(i) {
                Some(v) if v.is_finite() => print!("{v:>14.4}"),
                _ => print!("{:>14}", "-"),
            }
        }
        println!();
    }
}
