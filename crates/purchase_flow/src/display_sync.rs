//! Cosmetic jackpot and tickets-sold counters.
//!
//! These numbers are animated locally and carry no contract state.

use std::{sync::Arc, time::Duration};

use rand::Rng;
use tokio::task::JoinHandle;
use tracing::debug;

pub const JACKPOT_START: f64 = 1_000_000.0;
pub const JACKPOT_MAX_STEP: f64 = 123.45;
pub const TICK_INTERVAL: Duration = Duration::from_millis(2500);

/// Something that can display a counter value.
pub trait CounterTarget: Send + Sync {
    fn set_text(&self, text: &str);
}

pub struct DisplaySync {
    jackpot: Option<Arc<dyn CounterTarget>>,
    tickets: Option<Arc<dyn CounterTarget>>,
    jackpot_value: f64,
}

impl DisplaySync {
    pub fn new(
        jackpot: Option<Arc<dyn CounterTarget>>,
        tickets: Option<Arc<dyn CounterTarget>>,
    ) -> Self {
        Self {
            jackpot,
            tickets,
            jackpot_value: JACKPOT_START,
        }
    }

    pub fn jackpot_value(&self) -> f64 {
        self.jackpot_value
    }

    fn targets(&self) -> Option<(&Arc<dyn CounterTarget>, &Arc<dyn CounterTarget>)> {
        Some((self.jackpot.as_ref()?, self.tickets.as_ref()?))
    }

    /// Shows the initial values. Returns `false` and does nothing when either
    /// target is missing.
    pub fn start(&self) -> bool {
        let Some((jackpot, tickets)) = self.targets() else {
            debug!("counter targets missing; display sync disabled");
            return false;
        };
        jackpot.set_text(&format_jackpot(self.jackpot_value));
        tickets.set_text("0");
        true
    }

    /// Grows the jackpot by `step` and renders it.
    pub fn advance(&mut self, step: f64) {
        self.jackpot_value += step.max(0.0);
        if let Some((jackpot, _)) = self.targets() {
            jackpot.set_text(&format_jackpot(self.jackpot_value));
        }
    }

    pub fn tick<R: Rng>(&mut self, rng: &mut R) {
        let step = rng.gen_range(0.0..JACKPOT_MAX_STEP);
        self.advance(step);
    }

    /// Runs the counters on a timer until the task is aborted.
    pub fn spawn(mut self, every: Duration) -> Option<JoinHandle<()>> {
        if !self.start() {
            return None;
        }
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let step = rand::thread_rng().gen_range(0.0..JACKPOT_MAX_STEP);
                self.advance(step);
            }
        }))
    }
}

/// `$1,234,567` with no fractional digits.
pub fn format_jackpot(value: f64) -> String {
    let whole = value.max(0.0).round() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}
