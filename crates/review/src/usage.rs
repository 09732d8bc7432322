use std::collections::HashMap;

use serde::Serialize;
use warden_config::PricingOverride;

/// Per-million-token pricing for each model class. A config override
/// substitutes custom rates for every model.
fn default_rates(model: &str) -> (f64, f64) {
    match model {
        m if m.contains("1.5-pro") => (1.25, 5.00),
        m if m.contains("2.0-flash") => (0.10, 0.40),
        // 1.5-flash and anything unknown gets the cheapest class.
        _ => (0.075, 0.30),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub call_count: u64,
    pub first_call: Option<String>,
    pub last_call: Option<String>,
}

/// Token and cost accounting, owned by the task that makes the calls and
/// threaded through explicitly. One tracker per orchestrator run.
#[derive(Debug, Default)]
pub struct UsageTracker {
    tasks: HashMap<String, TaskUsage>,
    pricing: Option<PricingOverride>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub call_count: u64,
    pub estimated_cost_usd: f64,
}

impl UsageTracker {
    pub fn new(pricing: Option<PricingOverride>) -> Self {
        Self {
            tasks: HashMap::new(),
            pricing,
        }
    }

    pub fn record(&mut self, task_type: &str, input_tokens: u64, output_tokens: u64) {
        let now = chrono::Utc::now().to_rfc3339();
        let task = self.tasks.entry(task_type.to_string()).or_default();
        if task.first_call.is_none() {
            task.first_call = Some(now.clone());
        }
        task.last_call = Some(now);
        task.input_tokens += input_tokens;
        task.output_tokens += output_tokens;
        task.total_tokens += input_tokens + output_tokens;
        task.call_count += 1;
    }

    pub fn task(&self, task_type: &str) -> Option<&TaskUsage> {
        self.tasks.get(task_type)
    }

    pub fn summary(&self, model: &str) -> UsageSummary {
        let (input_rate, output_rate) = match &self.pricing {
            Some(p) => (p.input_per_million, p.output_per_million),
            None => default_rates(model),
        };
        let mut summary = UsageSummary {
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            call_count: 0,
            estimated_cost_usd: 0.0,
        };
        for task in self.tasks.values() {
            summary.input_tokens += task.input_tokens;
            summary.output_tokens += task.output_tokens;
            summary.total_tokens += task.total_tokens;
            summary.call_count += task.call_count;
        }
        summary.estimated_cost_usd = summary.input_tokens as f64 / 1_000_000.0 * input_rate
            + summary.output_tokens as f64 / 1_000_000.0 * output_rate;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_per_task() {
        let mut tracker = UsageTracker::new(None);
        tracker.record("review", 1000, 200);
        tracker.record("review", 500, 100);
        tracker.record("find_bugs", 10, 5);

        let review = tracker.task("review").unwrap();
        assert_eq!(review.call_count, 2);
        assert_eq!(review.input_tokens, 1500);
        assert_eq!(review.total_tokens, 1800);

        let summary = tracker.summary("gemini-1.5-flash");
        assert_eq!(summary.call_count, 3);
        assert_eq!(summary.total_tokens, 1815);
    }

    #[test]
    fn cost_uses_model_class_rates() {
        let mut tracker = UsageTracker::new(None);
        tracker.record("review", 1_000_000, 1_000_000);
        let flash = tracker.summary("gemini-1.5-flash");
        assert!((flash.estimated_cost_usd - 0.375).abs() < 1e-9);
        let pro = tracker.summary("gemini-1.5-pro");
        assert!((pro.estimated_cost_usd - 6.25).abs() < 1e-9);
    }

    #[test]
    fn pricing_override_wins() {
        let mut tracker = UsageTracker::new(Some(PricingOverride {
            input_per_million: 1.0,
            output_per_million: 2.0,
        }));
        tracker.record("review", 2_000_000, 500_000);
        let summary = tracker.summary("gemini-1.5-flash");
        assert!((summary.estimated_cost_usd - 3.0).abs() < 1e-9);
    }
}
