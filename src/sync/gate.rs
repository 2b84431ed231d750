/// Identifies one suggestion fetch. Only the most recently issued ticket can
/// fill the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Slot {
    #[default]
    Empty,
    InFlight(Ticket),
    Held(String),
}

/// Level-triggered guard for the "nudge me" suggestion.
///
/// A fetch is due whenever the mirror is non-empty and the slot is empty.
/// The guard is evaluated on every mirror change, so repeated pushes while a
/// fetch is running or a suggestion is held never start another one.
#[derive(Debug, Default)]
pub struct SuggestionGate {
    slot: Slot,
    issued: u64,
}

impl SuggestionGate {
    pub fn on_mirror_change(&mut self, mirror_len: usize) -> Option<Ticket> {
        if mirror_len == 0 || self.slot != Slot::Empty {
            return None;
        }
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.slot = Slot::InFlight(ticket);
        Some(ticket)
    }

    /// Store the fetched suggestion. Returns `false` if the ticket is no
    /// longer the outstanding one (the gate was cleared meanwhile).
    pub fn fulfil(&mut self, ticket: Ticket, suggestion: String) -> bool {
        if self.slot != Slot::InFlight(ticket) {
            return false;
        }
        self.slot = if suggestion.is_empty() {
            Slot::Empty
        } else {
            Slot::Held(suggestion)
        };
        true
    }

    /// Drop the held suggestion (or orphan the in-flight fetch) and re-arm.
    pub fn clear(&mut self) {
        self.slot = Slot::Empty;
    }

    pub fn held(&self) -> Option<&str> {
        match &self.slot {
            Slot::Held(s) => Some(s),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> bool {
        matches!(self.slot, Slot::InFlight(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_empty_state() {
        let mut gate = SuggestionGate::default();
        let mut fetches = 0;

        assert!(gate.on_mirror_change(0).is_none());

        let ticket = gate.on_mirror_change(3).expect("first non-empty push fires");
        fetches += 1;
        // More pushes while the fetch runs.
        assert!(gate.on_mirror_change(4).is_none());
        assert!(gate.fulfil(ticket, "What song did you dance to?".to_string()));

        // Held: further pushes stay quiet.
        for len in [4, 5, 1] {
            if gate.on_mirror_change(len).is_some() {
                fetches += 1;
            }
        }
        assert_eq!(fetches, 1);
        assert_eq!(gate.held(), Some("What song did you dance to?"));

        gate.clear();
        assert!(gate.held().is_none());
        assert!(gate.on_mirror_change(6).is_some());
        fetches += 1;
        assert!(gate.on_mirror_change(6).is_none());
        assert_eq!(fetches, 2);
    }

    #[test]
    fn cleared_fetch_result_is_discarded() {
        let mut gate = SuggestionGate::default();
        let stale = gate.on_mirror_change(1).unwrap();
        gate.clear();
        let fresh = gate.on_mirror_change(2).unwrap();

        assert!(!gate.fulfil(stale, "old".to_string()));
        assert!(gate.in_flight());
        assert!(gate.fulfil(fresh, "new".to_string()));
        assert_eq!(gate.held(), Some("new"));
    }

    #[test]
    fn empty_result_rearms() {
        let mut gate = SuggestionGate::default();
        let ticket = gate.on_mirror_change(1).unwrap();
        assert!(gate.fulfil(ticket, String::new()));
        assert!(gate.held().is_none());
        assert!(gate.on_mirror_change(1).is_some());
    }
}
