//! Classic floor-trader pivot points from the prior session's high/low/close.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotLevels {
    pub pp: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
}

/// PP=(H+L+C)/3, R1=2·PP−L, R2=PP+(H−L), S1=2·PP−H, S2=PP−(H−L).
pub fn pivot_points(high: f64, low: f64, close: f64) -> PivotLevels {
    let pp = (high + low + close) / 3.0;
    let range = high - low;
    PivotLevels {
        pp,
        r1: 2.0 * pp - low,
        r2: pp + range,
        s1: 2.0 * pp - high,
        s2: pp - range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_session_is_exact() {
        let p = pivot_points(110.0, 90.0, 100.0);
        assert_eq!(p.pp, 100.0);
        assert_eq!(p.r1, 110.0);
        assert_eq!(p.s1, 90.0);
        assert_eq!(p.r2, 120.0);
        assert_eq!(p.s2, 80.0);
    }

    #[test]
    fn levels_are_ordered() {
        let p = pivot_points(15_320.0, 15_110.0, 15_280.0);
        assert!(p.s2 < p.s1 && p.s1 < p.pp && p.pp < p.r1 && p.r1 < p.r2);
    }
}
