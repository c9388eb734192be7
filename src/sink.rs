use serde_json::Value;

use crate::error::ExtractError;
use crate::invoker::InvocationMetrics;
use crate::model::Dish;

/// Consumer of extraction outcomes (a UI, a report, stdout)
pub trait ResultSink {
    fn on_success(&mut self, dish: &Dish, metrics: &InvocationMetrics, label: &str);

    /// `raw` is the backend payload when the failure happened after the call returned
    fn on_failure(&mut self, error: &ExtractError, raw: Option<&Value>, label: &str);
}

/// Prints records as pretty JSON on stdout and failures on stderr
#[derive(Debug, Default)]
pub struct StdoutSink {
    /// Also print the raw payload of failed calls
    pub show_raw: bool,
}

impl ResultSink for StdoutSink {
    fn on_success(&mut self, dish: &Dish, metrics: &InvocationMetrics, label: &str) {
        match serde_json::to_string_pretty(dish) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("[{}] could not render record: {}", label, e),
        }
        eprintln!("[{}] {}", label, metrics);
    }

    fn on_failure(&mut self, error: &ExtractError, raw: Option<&Value>, label: &str) {
        eprintln!("[{}] {:?}: {}", label, error.kind(), error);
        if let (true, Some(raw)) = (self.show_raw, raw) {
            eprintln!("[{}] raw payload: {}", label, raw);
        }
    }
}

/// Keeps every outcome in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub successes: Vec<(String, Dish, InvocationMetrics)>,
    pub failures: Vec<(String, String, Option<Value>)>,
}

impl ResultSink for CollectingSink {
    fn on_success(&mut self, dish: &Dish, metrics: &InvocationMetrics, label: &str) {
        self.successes
            .push((label.to_string(), dish.clone(), *metrics));
    }

    fn on_failure(&mut self, error: &ExtractError, raw: Option<&Value>, label: &str) {
        self.failures
            .push((label.to_string(), error.to_string(), raw.cloned()));
    }
}
