use crate::phase::{ActionView, StatusLine};

/// Where the controller publishes what the user sees.
pub trait UiSurface: Send {
    fn render_action(&mut self, action: &ActionView);
    fn render_status(&mut self, status: &StatusLine);
    /// Blocking notice the user must acknowledge, such as a purchase result.
    fn notify(&mut self, message: &str);
}
