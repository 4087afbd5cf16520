use std::{
    io::{self, Write},
    sync::Mutex,
};

use purchase_flow::{display_sync::CounterTarget, ActionView, StatusLine, UiSurface};
use tracing::warn;

/// Prints the action element and status line as they change.
pub struct TerminalSurface<W> {
    out: W,
    last_action: Option<ActionView>,
    last_status: Option<StatusLine>,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_action: None,
            last_status: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            warn!(error = %err, "failed to write to terminal");
        }
    }
}

impl<W: Write + Send> UiSurface for TerminalSurface<W> {
    fn render_action(&mut self, action: &ActionView) {
        if self.last_action.as_ref() == Some(action) {
            return;
        }
        let text = if action.enabled {
            format!("[ {} ]", action.label)
        } else {
            format!("[ {} ] (disabled)", action.label)
        };
        self.line(&text);
        self.last_action = Some(action.clone());
    }

    fn render_status(&mut self, status: &StatusLine) {
        if self.last_status.as_ref() == Some(status) {
            return;
        }
        let prefix = if status.is_error { "error" } else { "status" };
        self.line(&format!("{prefix}: {}", status.message));
        self.last_status = Some(status.clone());
    }

    fn notify(&mut self, message: &str) {
        self.line(&format!("!! {message}"));
    }
}

/// Holds the latest counter text until the user asks for it.
#[derive(Debug, Default)]
pub struct CounterCell(Mutex<String>);

impl CounterCell {
    pub fn text(&self) -> String {
        self.0.lock().map(|text| text.clone()).unwrap_or_default()
    }
}

impl CounterTarget for CounterCell {
    fn set_text(&self, text: &str) {
        if let Ok(mut current) = self.0.lock() {
            *current = text.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use purchase_flow::Action;

    use super::*;

    fn printed(surface: TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.into_inner()).expect("utf8")
    }

    #[test]
    fn repeated_renders_print_once() {
        let mut surface = TerminalSurface::new(Vec::new());
        let view = ActionView {
            label: "CONNECT WALLET".into(),
            enabled: true,
            action: Some(Action::Connect),
        };
        surface.render_action(&view);
        surface.render_action(&view);
        surface.render_status(&StatusLine::info("Connect your wallet to participate."));
        surface.render_status(&StatusLine::info("Connect your wallet to participate."));

        assert_eq!(
            printed(surface),
            "[ CONNECT WALLET ]\nstatus: Connect your wallet to participate.\n"
        );
    }

    #[test]
    fn disabled_actions_and_errors_are_marked() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.render_action(&ActionView {
            label: "WRONG NETWORK".into(),
            enabled: false,
            action: None,
        });
        surface.render_status(&StatusLine::error("Please switch to Base Sepolia."));
        surface.notify("Transaction failed: sold out");

        assert_eq!(
            printed(surface),
            "[ WRONG NETWORK ] (disabled)\nerror: Please switch to Base Sepolia.\n!! Transaction failed: sold out\n"
        );
    }

    #[test]
    fn counter_cell_keeps_latest_text() {
        let cell = CounterCell::default();
        assert_eq!(cell.text(), "");
        cell.set_text("$1,000,000");
        cell.set_text("$1,000,050");
        assert_eq!(cell.text(), "$1,000,050");
    }
}
