//! 자산 곡선 추적과 성과 지표 집계.

use trader_core::{BacktestMetrics, BacktestTrade};

/// 봉 단위 자산 곡선 추적기 (미실현 손익 포함).
#[derive(Debug, Clone)]
pub struct EquityTracker {
    peak: f64,
    max_drawdown_pct: f64,
}

impl EquityTracker {
    pub fn new(initial_equity: f64) -> Self {
        Self {
            peak: initial_equity,
            max_drawdown_pct: 0.0,
        }
    }

    /// 현재 자산 가치 기록.
    pub fn mark(&mut self, equity: f64) {
        if !equity.is_finite() {
            return;
        }
        if equity > self.peak {
            self.peak = equity;
        } else if self.peak > 0.0 {
            let dd = (self.peak - equity) / self.peak * 100.0;
            self.max_drawdown_pct = self.max_drawdown_pct.max(dd);
        }
    }

    pub fn max_drawdown_pct(&self) -> f64 {
        self.max_drawdown_pct
    }
}

/// 거래 목록으로 지표 집계.
pub fn summarize(trades: &[BacktestTrade], initial_equity: f64, max_drawdown_pct: f64) -> BacktestMetrics {
    let total_trades = trades.len();
    let winning_trades = trades.iter().filter(|t| t.pnl > 0.0).count();
    let losing_trades = trades.iter().filter(|t| t.pnl < 0.0).count();
    let net_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let win_rate_pct = if total_trades > 0 {
        winning_trades as f64 / total_trades as f64 * 100.0
    } else {
        0.0
    };

    BacktestMetrics {
        total_trades,
        winning_trades,
        losing_trades,
        win_rate_pct,
        net_pnl,
        max_drawdown_pct,
        ending_equity: initial_equity + net_pnl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawdown_is_measured_from_running_peak() {
        let mut tracker = EquityTracker::new(100.0);
        for equity in [110.0, 99.0, 120.0, 108.0, f64::NAN] {
            tracker.mark(equity);
        }
        assert!((tracker.max_drawdown_pct() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_trade_list_has_zero_win_rate() {
        let m = summarize(&[], 1_000.0, 0.0);
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.win_rate_pct, 0.0);
        assert_eq!(m.ending_equity, 1_000.0);
        assert!(m.is_finite());
    }
}
