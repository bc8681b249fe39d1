//! Which country the pointer is over.

/// Pointer crossing a country mesh boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverEvent {
    Enter(String),
    Leave(String),
}

/// At most one hovered country.
///
/// `pointer_leave` only clears the state when it names the hovered country:
/// enter/leave for neighbouring meshes may arrive in either order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoverState {
    current: Option<String>,
}

impl HoverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_hovered(&self, identifier: &str) -> bool {
        self.current.as_deref() == Some(identifier)
    }

    /// Returns `true` if the hovered country changed.
    pub fn pointer_enter(&mut self, identifier: &str) -> bool {
        if self.is_hovered(identifier) {
            return false;
        }
        self.current = Some(identifier.to_string());
        true
    }

    /// Returns `true` if the hover was cleared.
    pub fn pointer_leave(&mut self, identifier: &str) -> bool {
        if !self.is_hovered(identifier) {
            return false;
        }
        self.current = None;
        true
    }

    pub fn apply(&mut self, event: &HoverEvent) -> bool {
        match event {
            HoverEvent::Enter(id) => self.pointer_enter(id),
            HoverEvent::Leave(id) => self.pointer_leave(id),
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Turns per-move pick results into enter/leave events, the way a scene
/// graph would deliver them to individual meshes.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    under: Option<String>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, picked: Option<&str>) -> Vec<HoverEvent> {
        if self.under.as_deref() == picked {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(2);
        if let Some(prev) = self.under.take() {
            events.push(HoverEvent::Leave(prev));
        }
        if let Some(next) = picked {
            events.push(HoverEvent::Enter(next.to_string()));
            self.under = Some(next.to_string());
        }
        events
    }

    pub fn reset(&mut self) {
        self.under = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{HoverEvent, HoverState, PointerTracker};

    #[test]
    fn enter_replaces_previous_country() {
        let mut hover = HoverState::new();
        assert!(hover.pointer_enter("FRA"));
        assert!(hover.pointer_enter("DEU"));
        assert_eq!(hover.current(), Some("DEU"));
        assert!(!hover.is_hovered("FRA"));
    }

    #[test]
    fn stale_leave_is_ignored() {
        let mut hover = HoverState::new();
        hover.pointer_enter("FRA");
        hover.pointer_enter("DEU");
        assert!(!hover.pointer_leave("FRA"));
        assert_eq!(hover.current(), Some("DEU"));
        assert!(hover.pointer_leave("DEU"));
        assert_eq!(hover.current(), None);
    }

    #[test]
    fn tracker_emits_leave_then_enter() {
        let mut tracker = PointerTracker::new();
        assert_eq!(tracker.update(Some("FRA")), vec![HoverEvent::Enter("FRA".into())]);
        assert!(tracker.update(Some("FRA")).is_empty());
        assert_eq!(
            tracker.update(Some("DEU")),
            vec![
                HoverEvent::Leave("FRA".into()),
                HoverEvent::Enter("DEU".into())
            ]
        );
        assert_eq!(tracker.update(None), vec![HoverEvent::Leave("DEU".into())]);
    }

    #[test]
    fn out_of_order_delivery_still_converges() {
        let mut hover = HoverState::new();
        hover.apply(&HoverEvent::Enter("FRA".into()));
        // Enter for the neighbour arrives before the leave for the old one.
        hover.apply(&HoverEvent::Enter("DEU".into()));
        hover.apply(&HoverEvent::Leave("FRA".into()));
        assert_eq!(hover.current(), Some("DEU"));
    }
}
