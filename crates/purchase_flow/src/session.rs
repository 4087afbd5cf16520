use alloy_primitives::Address;
use shared::domain::ChainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub account: Address,
    pub chain_id: ChainId,
}

/// Wallet session lifecycle: nothing yet, a live connection, or the last
/// connection after the agent dropped or switched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Connected(Session),
    Stale(Session),
}

impl SessionState {
    pub fn connected(&self) -> Option<Session> {
        match self {
            SessionState::Connected(session) => Some(*session),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected(_))
    }

    pub fn connect(&mut self, session: Session) {
        *self = SessionState::Connected(session);
    }

    pub fn mark_stale(&mut self) {
        if let SessionState::Connected(session) = *self {
            *self = SessionState::Stale(session);
        }
    }

    pub fn update_chain(&mut self, chain_id: ChainId) {
        if let SessionState::Connected(session) = self {
            session.chain_id = chain_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            account: Address::repeat_byte(0x42),
            chain_id: ChainId(84532),
        }
    }

    #[test]
    fn lifecycle_moves_from_uninitialized_to_stale() {
        let mut state = SessionState::default();
        assert_eq!(state.connected(), None);

        state.connect(session());
        assert_eq!(state.connected(), Some(session()));

        state.mark_stale();
        assert_eq!(state, SessionState::Stale(session()));
        assert!(!state.is_connected());
    }

    #[test]
    fn stale_marking_ignores_uninitialized() {
        let mut state = SessionState::Uninitialized;
        state.mark_stale();
        assert_eq!(state, SessionState::Uninitialized);
    }

    #[test]
    fn chain_updates_only_touch_live_sessions() {
        let mut state = SessionState::Connected(session());
        state.update_chain(ChainId(1));
        assert_eq!(state.connected().map(|s| s.chain_id), Some(ChainId(1)));

        state.mark_stale();
        state.update_chain(ChainId(5));
        assert_eq!(state, SessionState::Stale(Session { chain_id: ChainId(1), ..session() }));
    }
}
