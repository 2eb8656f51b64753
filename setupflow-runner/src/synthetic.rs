//! Synthetic candles for development and demos.
//!
//! A bounded random walk per symbol and day, seeded from BLAKE3 of the
//! symbol and date, so the same request always yields the same candles no
//! matter which range it was cut from. Weekends have no session.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use setupflow_core::domain::{Candle, DailyLevels, Timeframe};
use setupflow_core::{CandleSource, DataError};

use crate::levels::recalculate;

fn rng_for(key: &str) -> StdRng {
    StdRng::from_seed(*blake3::hash(key.as_bytes()).as_bytes())
}

/// Price level a symbol oscillates around.
fn anchor_price(symbol: &str) -> f64 {
    rng_for(symbol).gen_range(50.0..500.0)
}

#[derive(Debug, Clone, Copy)]
pub struct SyntheticSource {
    timeframe: Timeframe,
}

impl SyntheticSource {
    pub fn new(timeframe: Timeframe) -> Self {
        Self { timeframe }
    }

    /// All candles of one trading day.
    pub fn session(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        date: NaiveDate,
    ) -> Result<Vec<Candle>, DataError> {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Ok(Vec::new());
        }
        let mut rng = rng_for(&format!("{symbol}:{date}"));
        let step = timeframe.duration();
        let count = (Duration::days(1).num_seconds() / step.num_seconds()).max(1);
        let start = date.and_time(NaiveTime::MIN).and_utc();

        let mut price = anchor_price(symbol) * (1.0 + rng.gen_range(-0.02..0.02));
        let mut candles = Vec::with_capacity(count as usize);
        for i in 0..count {
            let open = price;
            let close = open * (1.0 + rng.gen_range(-0.002..0.002));
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.001));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.001));
            let volume = rng.gen_range(100.0..1_000.0);
            candles.push(Candle::new(
                symbol,
                timeframe,
                start + step * i as i32,
                open,
                high,
                low,
                close,
                volume,
            )?);
            price = close;
        }
        Ok(candles)
    }
}

impl CandleSource for SyntheticSource {
    fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        let mut out = Vec::new();
        let mut day = from.date_naive();
        while day <= to.date_naive() {
            out.extend(
                self.session(symbol, timeframe, day)?
                    .into_iter()
                    .filter(|c| c.timestamp >= from && c.timestamp <= to),
            );
            day += Duration::days(1);
        }
        Ok(out)
    }

    fn daily_levels(&self, symbol: &str, date: NaiveDate) -> Result<Option<DailyLevels>, DataError> {
        recalculate(self, symbol, self.timeframe, date)
    }
}
