/// Opacity of a hovered country's highlight.
pub const HOVER_OPACITY: f32 = 0.7;

/// CSS `aliceblue`.
pub const ALICE_BLUE: [f32; 4] = [0.941, 0.973, 1.0, 1.0];

/// Globe colour when no month texture is resident.
pub const UNTEXTURED_GLOBE: [f32; 4] = [0.12, 0.23, 0.42, 1.0];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub visible: bool,
    pub color: [f32; 4],
    /// Radial offset above the globe surface, in scene units.
    pub lift: f32,
}

impl LayerStyle {
    pub const fn new(visible: bool, color: [f32; 4], lift: f32) -> Self {
        Self {
            visible,
            color,
            lift,
        }
    }

    pub fn boundaries(epsilon: f64) -> Self {
        Self::new(true, ALICE_BLUE, epsilon as f32)
    }

    /// Hit-test meshes are transparent at rest and tinted white on hover.
    pub fn country(hovered: bool) -> Self {
        if hovered {
            Self::new(true, [1.0, 1.0, 1.0, HOVER_OPACITY], 0.0)
        } else {
            Self::new(false, [1.0, 1.0, 1.0, 0.0], 0.0)
        }
    }

    pub fn opacity(&self) -> f32 {
        if self.visible { self.color[3] } else { 0.0 }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            visible: true,
            color: [1.0, 1.0, 1.0, 1.0],
            lift: 0.0,
        }
    }
}
