//! Wallet connection and ticket purchase flow for the jackpot lottery.
//!
//! [`PurchaseController`] owns the session context and the current [`Phase`];
//! the front end renders whatever [`ActionView`] and [`StatusLine`] the
//! controller pushes through its [`UiSurface`].

mod controller;
pub mod display_sync;
mod phase;
mod session;
mod surface;

pub use controller::{ControllerOptions, PurchaseController, PurchaseReceipt};
pub use phase::{Action, ActionView, Observation, Phase, StatusLine, ViewLabels};
pub use session::{Session, SessionState};
pub use surface::UiSurface;
