/// Lifecycle of a loadable asset.
///
/// Requested → Downloading → Decoding → Resident, or → Failed from any
/// in-flight state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ResidencyState {
    /// Not asked for yet.
    #[default]
    Absent,
    Requested,
    Downloading,
    Decoding,
    Resident,
    Failed,
}

impl ResidencyState {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            ResidencyState::Requested | ResidencyState::Downloading | ResidencyState::Decoding
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: ResidencyState) -> bool {
        use ResidencyState::*;
        matches!(
            (self, next),
            (Absent | Failed, Requested)
                | (Requested, Downloading)
                | (Downloading, Decoding)
                | (Requested | Downloading | Decoding, Resident)
                | (Requested | Downloading | Decoding, Failed)
        )
    }
}
