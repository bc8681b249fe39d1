use serde::Serialize;

use crate::frame::Frame;

/// Things that happened in the globe scene, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneEvent {
    DatasetLoaded { features: usize },
    DatasetFailed { reason: String },
    TextureResident { month: u32 },
    TextureFailed { month: u32, reason: String },
    CountryHovered { identifier: Option<String> },
    CountrySelected { name: String },
    SidebarOpened,
    SidebarClosed,
    RotationLocked,
    DateChanged { date: String },
    EventsLoaded { country: String, count: usize },
    EventsFailed { country: String, message: String },
    StaleResponseDropped { request: u64 },
}

impl SceneEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SceneEvent::DatasetLoaded { .. } => "dataset_loaded",
            SceneEvent::DatasetFailed { .. } => "dataset_failed",
            SceneEvent::TextureResident { .. } => "texture_resident",
            SceneEvent::TextureFailed { .. } => "texture_failed",
            SceneEvent::CountryHovered { .. } => "country_hovered",
            SceneEvent::CountrySelected { .. } => "country_selected",
            SceneEvent::SidebarOpened => "sidebar_opened",
            SceneEvent::SidebarClosed => "sidebar_closed",
            SceneEvent::RotationLocked => "rotation_locked",
            SceneEvent::DateChanged { .. } => "date_changed",
            SceneEvent::EventsLoaded { .. } => "events_loaded",
            SceneEvent::EventsFailed { .. } => "events_failed",
            SceneEvent::StaleResponseDropped { .. } => "stale_response_dropped",
        }
    }

    /// Contained failures; hosts log these at warn level.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SceneEvent::DatasetFailed { .. }
                | SceneEvent::TextureFailed { .. }
                | SceneEvent::EventsFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub frame_index: u64,
    #[serde(flatten)]
    pub event: SceneEvent,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, frame_index: u64, event: SceneEvent) {
        tracing::trace!(frame = frame_index, kind = event.kind(), "scene event");
        self.events.push(Event { frame_index, event });
    }

    pub fn emit_at(&mut self, frame: Frame, event: SceneEvent) {
        self.emit(frame.index, event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, SceneEvent};
    use crate::frame::Frame;

    #[test]
    fn records_events_with_frame_index() {
        let mut bus = EventBus::new();
        let f = Frame::first().next(0.1).next(0.1);
        bus.emit_at(f, SceneEvent::RotationLocked);
        assert_eq!(bus.events().len(), 1);
        assert_eq!(bus.events()[0].frame_index, 2);
        assert_eq!(bus.events()[0].event.kind(), "rotation_locked");
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(0, SceneEvent::SidebarOpened);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.events().is_empty());
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let mut bus = EventBus::new();
        bus.emit(
            4,
            SceneEvent::CountrySelected {
                name: "France".into(),
            },
        );
        let json = serde_json::to_value(&bus.events()[0]).expect("serialize");
        assert_eq!(json["kind"], "country_selected");
        assert_eq!(json["name"], "France");
        assert_eq!(json["frame_index"], 4);
    }

    #[test]
    fn failures_are_flagged() {
        assert!(SceneEvent::DatasetFailed { reason: "x".into() }.is_failure());
        assert!(!SceneEvent::SidebarClosed.is_failure());
    }
}
