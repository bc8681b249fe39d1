use foundation::time::MonthKey;
use thiserror::Error;

use crate::residency::ResidencyState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("texture request failed with HTTP {status}")]
    Http { status: u16 },
    #[error("texture request failed: {0}")]
    Network(String),
    #[error("texture decode failed: {0}")]
    Decode(String),
}

/// One entry of the mount-time preload phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexturePreload {
    pub month: MonthKey,
    pub url: String,
}

/// What the globe should be drawn with for a given month.
#[derive(Debug, PartialEq)]
pub enum TextureResolution<'a, T> {
    Exact(&'a T),
    /// The wanted month is not resident (yet, or ever); draw the most recent
    /// resident texture instead.
    Fallback { month: MonthKey, texture: &'a T },
    /// Nothing resident at all: draw the untextured base colour.
    Untextured,
}

impl<'a, T> TextureResolution<'a, T> {
    pub fn texture(&self) -> Option<&'a T> {
        match self {
            TextureResolution::Exact(t) => Some(t),
            TextureResolution::Fallback { texture, .. } => Some(texture),
            TextureResolution::Untextured => None,
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    state: ResidencyState,
    texture: Option<T>,
    error: Option<TextureError>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            state: ResidencyState::Absent,
            texture: None,
            error: None,
        }
    }
}

/// Twelve month textures with residency tracking and fallback.
///
/// `T` is whatever the renderer keeps per texture (a GPU texture + bind
/// group in the web host, decoded dimensions in tests).
#[derive(Debug)]
pub struct MonthTextureCache<T> {
    slots: [Slot<T>; 12],
    last_resident: Option<MonthKey>,
}

impl<T> Default for MonthTextureCache<T> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::default()),
            last_resident: None,
        }
    }
}

impl<T> MonthTextureCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every month not yet resident or in flight, `first` at the front so
    /// the visible month arrives first. Listed months move to `Requested`.
    pub fn preload_plan(
        &mut self,
        first: MonthKey,
        url_for: impl Fn(MonthKey) -> String,
    ) -> Vec<TexturePreload> {
        let order = std::iter::once(first).chain(MonthKey::all().filter(|m| *m != first));
        let mut plan = Vec::with_capacity(12);
        for month in order {
            let slot = &mut self.slots[month.index()];
            if !slot.state.can_advance_to(ResidencyState::Requested) {
                continue;
            }
            slot.state = ResidencyState::Requested;
            slot.error = None;
            plan.push(TexturePreload {
                month,
                url: url_for(month),
            });
        }
        tracing::debug!(requested = plan.len(), "month texture preload plan");
        plan
    }

    pub fn state(&self, month: MonthKey) -> ResidencyState {
        self.slots[month.index()].state
    }

    pub fn error(&self, month: MonthKey) -> Option<&TextureError> {
        self.slots[month.index()].error.as_ref()
    }

    /// Progress an in-flight slot (`Downloading`, `Decoding`). Illegal
    /// transitions are ignored and reported as `false`.
    pub fn advance(&mut self, month: MonthKey, next: ResidencyState) -> bool {
        let slot = &mut self.slots[month.index()];
        if !slot.state.can_advance_to(next) || matches!(next, ResidencyState::Resident) {
            return false;
        }
        slot.state = next;
        true
    }

    pub fn mark_resident(&mut self, month: MonthKey, texture: T) {
        let slot = &mut self.slots[month.index()];
        slot.state = ResidencyState::Resident;
        slot.texture = Some(texture);
        slot.error = None;
        self.last_resident = Some(month);
        tracing::info!(month = %month, "month texture resident");
    }

    pub fn mark_failed(&mut self, month: MonthKey, error: TextureError) {
        let slot = &mut self.slots[month.index()];
        if slot.state == ResidencyState::Resident {
            return;
        }
        tracing::warn!(month = %month, %error, "month texture failed");
        slot.state = ResidencyState::Failed;
        slot.error = Some(error);
    }

    pub fn resident_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == ResidencyState::Resident)
            .count()
    }

    pub fn resolve(&self, month: MonthKey) -> TextureResolution<'_, T> {
        if let Some(texture) = self.slots[month.index()].texture.as_ref() {
            return TextureResolution::Exact(texture);
        }
        match self.last_resident {
            Some(fallback) => match self.slots[fallback.index()].texture.as_ref() {
                Some(texture) => TextureResolution::Fallback {
                    month: fallback,
                    texture,
                },
                None => TextureResolution::Untextured,
            },
            None => TextureResolution::Untextured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MonthTextureCache, TextureError, TextureResolution};
    use crate::residency::ResidencyState;
    use foundation::time::MonthKey;

    fn month(n: u32) -> MonthKey {
        MonthKey::new(n).expect("month")
    }

    fn url(m: MonthKey) -> String {
        format!("/Textures/earth-{}.jpg", m.name())
    }

    #[test]
    fn preload_plan_covers_all_months_visible_first() {
        let mut cache: MonthTextureCache<u32> = MonthTextureCache::new();
        let plan = cache.preload_plan(month(4), url);
        assert_eq!(plan.len(), 12);
        assert_eq!(plan[0].month, month(4));
        assert_eq!(plan[0].url, "/Textures/earth-april.jpg");
        assert_eq!(plan[1].month, month(1));
        assert!(MonthKey::all().all(|m| cache.state(m) == ResidencyState::Requested));

        // A second plan has nothing left to request.
        assert!(cache.preload_plan(month(4), url).is_empty());
    }

    #[test]
    fn failed_month_falls_back_to_last_resident() {
        let mut cache: MonthTextureCache<&str> = MonthTextureCache::new();
        cache.preload_plan(month(1), url);
        assert_eq!(cache.resolve(month(1)), TextureResolution::Untextured);

        cache.mark_resident(month(1), "jan");
        cache.mark_resident(month(2), "feb");
        cache.mark_failed(month(3), TextureError::Http { status: 404 });

        assert_eq!(cache.resolve(month(1)), TextureResolution::Exact(&"jan"));
        assert_eq!(
            cache.resolve(month(3)),
            TextureResolution::Fallback {
                month: month(2),
                texture: &"feb"
            }
        );
        assert_eq!(cache.state(month(3)), ResidencyState::Failed);
        assert_eq!(
            cache.error(month(3)),
            Some(&TextureError::Http { status: 404 })
        );
        assert_eq!(cache.resident_count(), 2);
    }

    #[test]
    fn pending_month_uses_fallback_instead_of_flashing() {
        let mut cache: MonthTextureCache<u8> = MonthTextureCache::new();
        cache.preload_plan(month(6), url);
        cache.mark_resident(month(6), 6);
        assert!(cache.advance(month(7), ResidencyState::Downloading));
        assert_eq!(cache.resolve(month(7)).texture(), Some(&6));
    }

    #[test]
    fn failure_after_resident_is_ignored_and_failed_slots_replan() {
        let mut cache: MonthTextureCache<u8> = MonthTextureCache::new();
        cache.preload_plan(month(1), url);
        cache.mark_resident(month(1), 1);
        cache.mark_failed(month(1), TextureError::Decode("bad".into()));
        assert_eq!(cache.state(month(1)), ResidencyState::Resident);

        cache.mark_failed(month(2), TextureError::Network("offline".into()));
        let plan = cache.preload_plan(month(1), url);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].month, month(2));
    }

    #[test]
    fn advance_rejects_illegal_steps() {
        let mut cache: MonthTextureCache<u8> = MonthTextureCache::new();
        assert!(!cache.advance(month(5), ResidencyState::Decoding));
        cache.preload_plan(month(5), url);
        assert!(!cache.advance(month(5), ResidencyState::Resident));
        assert!(cache.advance(month(5), ResidencyState::Downloading));
        assert!(cache.advance(month(5), ResidencyState::Decoding));
    }
}
