//! The tick pipeline: one stage per step index
//!
//! Each tick runs exactly one stage, looked up in [`PIPELINE`] by the
//! task's current step. Stages one through four are data fetches that
//! tolerate missing upstream data (a degraded gateway demotes to a log
//! line and neutral defaults); the last two turn the accumulated context
//! into a decision and an immutable report. Only a storage failure in the
//! final stage is fatal to the task.

use crate::config::EngineConfig;
use crate::scorer::{DecisionSignals, score};
use tickflow_core::{Decision, Execution, ExecutionResult, QuoteWindow, Report, Result};
use tickflow_market::{MarketDataGateway, provider_symbol};
use tickflow_store::ReportStore;
use tracing::warn;

/// One unit of pipeline work, bound to a step index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    BasicInfo,
    QuoteWindow,
    Fundamentals,
    KlineHistory,
    Scoring,
    Publish,
}

impl Stage {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Stage::BasicInfo => "basic info",
            Stage::QuoteWindow => "quote window",
            Stage::Fundamentals => "fundamentals",
            Stage::KlineHistory => "kline history",
            Stage::Scoring => "scoring",
            Stage::Publish => "publish",
        }
    }
}

/// Stage order; the step index is the position in this table
pub(crate) const PIPELINE: [Stage; 6] = [
    Stage::BasicInfo,
    Stage::QuoteWindow,
    Stage::Fundamentals,
    Stage::KlineHistory,
    Stage::Scoring,
    Stage::Publish,
];

/// Fixed pipeline length; `total_steps` on every execution
pub const TOTAL_STEPS: u32 = PIPELINE.len() as u32;

/// What a stage hands back to the engine loop
pub(crate) struct StageOutcome {
    /// Human-readable log line describing what the stage did
    pub log: String,
    /// Populated only by the final stage
    pub result: Option<ExecutionResult>,
}

impl StageOutcome {
    fn log(text: impl Into<String>) -> Self {
        Self {
            log: text.into(),
            result: None,
        }
    }
}

/// Runs a single stage against the collaborators
pub(crate) struct StageRunner<'a> {
    pub gateway: &'a dyn MarketDataGateway,
    pub reports: &'a dyn ReportStore,
    pub config: &'a EngineConfig,
}

impl StageRunner<'_> {
    /// Execute `stage`, mutating the execution's context in place
    ///
    /// Errors only on storage failure; upstream data problems are
    /// absorbed into the returned log line.
    pub(crate) async fn run(&self, stage: Stage, exec: &mut Execution) -> Result<StageOutcome> {
        match stage {
            Stage::BasicInfo => Ok(self.basic_info(exec).await),
            Stage::QuoteWindow => Ok(self.quote_window(exec).await),
            Stage::Fundamentals => Ok(self.fundamentals(exec).await),
            Stage::KlineHistory => Ok(self.kline_history(exec).await),
            Stage::Scoring => Ok(Self::scoring(exec)),
            Stage::Publish => self.publish(exec).await,
        }
    }

    async fn basic_info(&self, exec: &mut Execution) -> StageOutcome {
        let symbol = provider_symbol(&exec.symbol, exec.market);
        match self.gateway.get_basic(&symbol).await {
            Ok(Some(basic)) => {
                let log = format!(
                    "resolved {}: {} ({})",
                    exec.symbol, basic.name, basic.industry
                );
                exec.context.basic = Some(basic);
                StageOutcome::log(log)
            }
            Ok(None) => StageOutcome::log("basic info unavailable, proceeding with defaults"),
            Err(err) => {
                warn!(symbol = %exec.symbol, error = %err, "basic info fetch failed");
                StageOutcome::log("basic info unavailable, proceeding with defaults")
            }
        }
    }

    async fn quote_window(&self, exec: &mut Execution) -> StageOutcome {
        let symbol = provider_symbol(&exec.symbol, exec.market);
        match self
            .gateway
            .get_recent_quotes(&symbol, self.config.quote_window)
            .await
        {
            Ok(quotes) if !quotes.is_empty() => {
                let window = QuoteWindow::new(quotes);
                let log = format!(
                    "fetched {} recent quotes, window change {:+.2}%",
                    window.quotes.len(),
                    window.change_pct()
                );
                exec.context.quotes = Some(window);
                StageOutcome::log(log)
            }
            Ok(_) => StageOutcome::log("quote data unavailable, proceeding with defaults"),
            Err(err) => {
                warn!(symbol = %exec.symbol, error = %err, "quote fetch failed");
                StageOutcome::log("quote data unavailable, proceeding with defaults")
            }
        }
    }

    async fn fundamentals(&self, exec: &mut Execution) -> StageOutcome {
        let symbol = provider_symbol(&exec.symbol, exec.market);
        match self.gateway.get_fundamentals(&symbol).await {
            Ok(Some(fundamentals)) => {
                let log = format!(
                    "fundamentals loaded: ROE {:.1}, P/E {:.1}, P/B {:.1}",
                    fundamentals.roe, fundamentals.pe, fundamentals.pb
                );
                exec.context.fundamentals = Some(fundamentals);
                StageOutcome::log(log)
            }
            Ok(None) => StageOutcome::log("fundamentals unavailable, proceeding with defaults"),
            Err(err) => {
                warn!(symbol = %exec.symbol, error = %err, "fundamentals fetch failed");
                StageOutcome::log("fundamentals unavailable, proceeding with defaults")
            }
        }
    }

    async fn kline_history(&self, exec: &mut Execution) -> StageOutcome {
        let symbol = provider_symbol(&exec.symbol, exec.market);
        match self
            .gateway
            .get_kline_history(&symbol, self.config.kline_limit)
            .await
        {
            Ok(klines) if !klines.is_empty() => {
                let log = format!("fetched {} kline candles", klines.len());
                exec.context.klines = Some(klines);
                StageOutcome::log(log)
            }
            Ok(_) => StageOutcome::log("kline history unavailable, proceeding with defaults"),
            Err(err) => {
                warn!(symbol = %exec.symbol, error = %err, "kline fetch failed");
                StageOutcome::log("kline history unavailable, proceeding with defaults")
            }
        }
    }

    fn scoring(exec: &mut Execution) -> StageOutcome {
        let signals = DecisionSignals::from_stage_data(&exec.context);
        let decision = score(&signals);
        exec.context.decision = Some(decision);
        StageOutcome::log(format!(
            "decision: {} (risk {}, confidence {}%)",
            decision.action, decision.risk, decision.confidence
        ))
    }

    async fn publish(&self, exec: &mut Execution) -> Result<StageOutcome> {
        // The scoring stage normally ran one tick earlier; recomputing is
        // cheap and keeps this stage total
        let decision = match exec.context.decision {
            Some(decision) => decision,
            None => score(&DecisionSignals::from_stage_data(&exec.context)),
        };

        let summary = build_summary(exec, decision);
        let report = Report::new(exec, summary.clone(), decision);
        let report_id = self
            .reports
            .save(report)
            .await
            .map_err(tickflow_core::Error::from)?;

        let result = ExecutionResult {
            report_id: report_id.clone(),
            summary,
            recommendation: decision.action.as_str().to_string(),
            confidence_score: decision.confidence,
            risk_level: decision.risk.as_str().to_string(),
        };

        Ok(StageOutcome {
            log: format!("report {report_id} saved, analysis complete"),
            result: Some(result),
        })
    }
}

fn build_summary(exec: &Execution, decision: Decision) -> String {
    let name = exec
        .context
        .basic
        .as_ref()
        .map_or(exec.symbol.as_str(), |b| b.name.as_str());
    let signals = DecisionSignals::from_stage_data(&exec.context);
    format!(
        "{name} ({}/{}): {}, confidence {}%; window change {:+.2}%, ROE {:.1}, P/E {:.1}, P/B {:.1}",
        exec.symbol,
        exec.market,
        decision.action,
        decision.confidence,
        signals.change_pct,
        signals.roe,
        signals.pe,
        signals.pb
    )
}
