//! The globe scene: owns the date, the rotation state machine, the camera,
//! the shared country dataset and everything derived from it.
//!
//! Asynchronous results (dataset, textures) are tagged with the mount
//! generation that requested them; anything from an older generation is
//! dropped on arrival.

use std::fmt;
use std::sync::Arc;

use formats::countries::CountryDataset;
use foundation::time::{HistoricalDate, MonthKey};
use layers::boundaries::{BoundaryPolyline, BoundaryRenderer};
use layers::countries::{CountryMesh, CountryMeshSet};
use layers::globe::texture_url;
use runtime::config::ExplorerConfig;
use runtime::event_bus::{Event, EventBus, SceneEvent};
use runtime::frame::{Frame, FrameClock};
use streaming::cache::{MonthTextureCache, TextureError, TexturePreload, TextureResolution};

use crate::camera::{CameraLimits, OrbitCamera, mat4_rotation_y};
use crate::hover::{HoverState, PointerTracker};
use crate::picking::{CountryPicker, PickHit, pick_country};
use crate::rotation::RotationDriver;
use crate::selection::{SelectionDispatch, SelectionReader, selected_country};

/// Identifies one mount of the scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountGeneration(pub u64);

impl fmt::Display for MountGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mount#{}", self.0)
    }
}

/// Everything the host must start fetching before the globe first renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PreloadPlan {
    pub generation: MountGeneration,
    pub dataset_url: String,
    /// Visible month first.
    pub textures: Vec<TexturePreload>,
}

#[derive(Debug, Clone, Default)]
pub enum DatasetStatus {
    #[default]
    Pending,
    Ready(Arc<CountryDataset>),
    /// Contained: no boundaries, no hit-testing.
    Failed(String),
}

impl DatasetStatus {
    pub fn dataset(&self) -> Option<&Arc<CountryDataset>> {
        match self {
            DatasetStatus::Ready(ds) => Some(ds),
            _ => None,
        }
    }
}

pub struct GlobeScene<T> {
    config: ExplorerConfig,
    generation: MountGeneration,
    mounted: bool,

    clock: FrameClock,
    frame: Frame,
    rotation: RotationDriver,
    rotation_angle: f64,
    camera: OrbitCamera,

    dataset: DatasetStatus,
    meshes: CountryMeshSet,
    picker: CountryPicker,
    boundaries: BoundaryRenderer,
    textures: MonthTextureCache<T>,

    hover: HoverState,
    tracker: PointerTracker,
    selection: SelectionDispatch,
    selection_reader: SelectionReader,
    date: HistoricalDate,
    sidebar_open: bool,

    events: EventBus,
}

impl<T> GlobeScene<T> {
    pub fn new(config: ExplorerConfig, date: HistoricalDate) -> Self {
        let (selection, selection_reader) = selected_country();
        let camera = OrbitCamera::new(camera_limits(&config));
        Self {
            rotation: RotationDriver::new(config.auto_rotate_rate_rad_per_s),
            config,
            generation: MountGeneration(0),
            mounted: false,
            clock: FrameClock::new(),
            frame: Frame::first(),
            rotation_angle: 0.0,
            camera,
            dataset: DatasetStatus::Pending,
            meshes: CountryMeshSet::default(),
            picker: CountryPicker::default(),
            boundaries: BoundaryRenderer::new(),
            textures: MonthTextureCache::new(),
            hover: HoverState::new(),
            tracker: PointerTracker::new(),
            selection,
            selection_reader,
            date,
            sidebar_open: false,
            events: EventBus::new(),
        }
    }

    /// Start a fresh scene lifetime and return what must be preloaded.
    ///
    /// Rotation resumes auto-spinning, the dataset goes back to pending and
    /// the texture cache is emptied. Date and selection survive.
    pub fn mount(&mut self) -> PreloadPlan {
        self.generation = MountGeneration(self.generation.0 + 1);
        self.mounted = true;

        self.clock = FrameClock::new();
        self.frame = Frame::first();
        self.rotation = RotationDriver::new(self.config.auto_rotate_rate_rad_per_s);
        self.rotation_angle = 0.0;
        self.camera = OrbitCamera::new(camera_limits(&self.config));

        self.reset_dataset(DatasetStatus::Pending);
        self.textures = MonthTextureCache::new();
        self.sidebar_open = false;

        let template = self.config.texture_url_template.clone();
        let textures = self
            .textures
            .preload_plan(self.date.month_key(), |m| texture_url(&template, m));

        tracing::info!(
            generation = %self.generation,
            textures = textures.len(),
            "globe scene mounted"
        );
        PreloadPlan {
            generation: self.generation,
            dataset_url: self.config.countries_url.clone(),
            textures,
        }
    }

    /// Results still in flight are discarded when they arrive.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        tracing::info!(generation = %self.generation, "globe scene unmounted");
        self.mounted = false;
        self.generation = MountGeneration(self.generation.0 + 1);
        self.reset_dataset(DatasetStatus::Pending);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn generation(&self) -> MountGeneration {
        self.generation
    }

    fn is_current(&self, generation: MountGeneration, what: &'static str) -> bool {
        let current = self.mounted && generation == self.generation;
        if !current {
            tracing::debug!(%generation, current = %self.generation, what, "dropping result from stale mount");
        }
        current
    }

    fn reset_dataset(&mut self, status: DatasetStatus) {
        self.dataset = status;
        self.meshes = CountryMeshSet::default();
        self.picker = CountryPicker::default();
        self.boundaries.clear();
        self.hover.clear();
        self.tracker.reset();
    }

    // ── Assets ───────────────────────────────────────────────

    /// Share a parsed dataset between hit-testing and outlines.
    pub fn on_dataset_loaded(
        &mut self,
        generation: MountGeneration,
        dataset: Arc<CountryDataset>,
    ) -> bool {
        if !self.is_current(generation, "dataset") {
            return false;
        }
        let meshes = CountryMeshSet::build(&dataset, self.config.globe_radius);
        self.picker = CountryPicker::new(&meshes);
        self.meshes = meshes;
        tracing::info!(
            features = dataset.len(),
            skipped = dataset.skipped,
            "country dataset ready"
        );
        self.emit(SceneEvent::DatasetLoaded {
            features: dataset.len(),
        });
        self.dataset = DatasetStatus::Ready(dataset);
        true
    }

    pub fn on_dataset_failed(&mut self, generation: MountGeneration, reason: impl fmt::Display) -> bool {
        if !self.is_current(generation, "dataset") {
            return false;
        }
        let reason = reason.to_string();
        tracing::warn!(%reason, "country dataset unavailable; globe runs without boundaries");
        self.reset_dataset(DatasetStatus::Failed(reason.clone()));
        self.emit(SceneEvent::DatasetFailed { reason });
        true
    }

    pub fn dataset_status(&self) -> &DatasetStatus {
        &self.dataset
    }

    pub fn meshes(&self) -> &CountryMeshSet {
        &self.meshes
    }

    /// Outline polylines, memoized on (dataset, radius).
    pub fn boundary_lines(&mut self) -> Arc<[BoundaryPolyline]> {
        let radius = self.config.boundary_radius();
        self.boundaries.lines(self.dataset.dataset(), radius)
    }

    pub fn boundary_rebuilds(&self) -> u64 {
        self.boundaries.rebuilds()
    }

    pub fn on_texture_loaded(&mut self, generation: MountGeneration, month: MonthKey, texture: T) -> bool {
        if !self.is_current(generation, "texture") {
            return false;
        }
        self.textures.mark_resident(month, texture);
        self.emit(SceneEvent::TextureResident {
            month: month.number(),
        });
        true
    }

    pub fn on_texture_failed(
        &mut self,
        generation: MountGeneration,
        month: MonthKey,
        error: TextureError,
    ) -> bool {
        if !self.is_current(generation, "texture") {
            return false;
        }
        let reason = error.to_string();
        self.textures.mark_failed(month, error);
        self.emit(SceneEvent::TextureFailed {
            month: month.number(),
            reason,
        });
        true
    }

    pub fn textures(&self) -> &MonthTextureCache<T> {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut MonthTextureCache<T> {
        &mut self.textures
    }

    /// Texture for the committed date's month, with fallback.
    pub fn globe_texture(&self) -> TextureResolution<'_, T> {
        self.textures.resolve(self.date.month_key())
    }

    // ── Frame ────────────────────────────────────────────────

    pub fn on_frame(&mut self, now_s: f64) -> Frame {
        self.frame = self.clock.tick(now_s);
        self.rotation_angle += self.rotation.advance(self.frame.dt_s);
        self.camera.update(self.frame.dt_s);
        self.frame
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn rotation(&self) -> RotationDriver {
        self.rotation
    }

    pub fn rotation_angle(&self) -> f64 {
        self.rotation_angle
    }

    /// Column-major model matrix of the spinning globe group.
    pub fn model_matrix(&self) -> [[f32; 4]; 4] {
        mat4_rotation_y(self.rotation_angle)
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.camera.set_canvas_size(width, height);
    }

    // ── Pointer ──────────────────────────────────────────────

    fn lock_rotation(&mut self) {
        if self.rotation.on_drag_start() {
            tracing::debug!(angle = self.rotation_angle, "auto-rotation locked");
            self.emit(SceneEvent::RotationLocked);
        }
    }

    /// Pointer pressed on the canvas: the camera interaction starts here.
    pub fn on_drag_start(&mut self, pos_px: [f64; 2], now_s: f64) {
        self.lock_rotation();
        self.camera.on_pointer_down(pos_px, now_s);
    }

    pub fn on_drag_end(&mut self) {
        self.camera.on_pointer_up();
    }

    /// Wheel zoom also counts as taking over the camera.
    pub fn on_wheel(&mut self, delta: f64) {
        self.lock_rotation();
        self.camera.on_wheel(delta);
    }

    /// Orbit (while dragging) and update the hovered country.
    pub fn on_pointer_move(&mut self, pos_px: [f64; 2], now_s: f64) -> Option<&str> {
        self.camera.on_pointer_move(pos_px, now_s);

        let picked = self
            .pick(pos_px)
            .and_then(|hit| self.meshes.get(hit.index))
            .map(|m| m.identifier.clone());
        let before = self.hover.current().map(str::to_string);
        for event in self.tracker.update(picked.as_deref()) {
            self.hover.apply(&event);
        }
        if self.hover.current() != before.as_deref() {
            let identifier = self.hover.current().map(str::to_string);
            self.emit(SceneEvent::CountryHovered { identifier });
        }
        self.hover.current()
    }

    /// Pointer left the canvas.
    pub fn on_pointer_leave(&mut self) {
        let had_hover = self.hover.current().is_some();
        for event in self.tracker.update(None) {
            self.hover.apply(&event);
        }
        if had_hover && self.hover.current().is_none() {
            self.emit(SceneEvent::CountryHovered { identifier: None });
        }
    }

    /// Select the country under the pointer. Presses that turned into an
    /// orbit drag do not select.
    pub fn on_click(&mut self, pos_px: [f64; 2]) -> Option<String> {
        if self.camera.press_was_drag() {
            return None;
        }
        let name = self
            .pick(pos_px)
            .and_then(|hit| self.meshes.get(hit.index))
            .map(|m| m.display_name.clone())?;

        let change = self.selection.select(name.clone());
        tracing::debug!(country = %name, version = change.version, "country selected");
        self.emit(SceneEvent::CountrySelected { name: name.clone() });
        if change.is_first() || !self.sidebar_open {
            self.open_sidebar();
        }
        Some(name)
    }

    /// Country under a canvas pixel, accounting for the globe's spin.
    pub fn pick(&self, pos_px: [f64; 2]) -> Option<PickHit> {
        if self.meshes.is_empty() {
            return None;
        }
        let ray = self
            .camera
            .screen_ray(pos_px)
            .into_rotated_y(self.rotation_angle);
        pick_country(&self.meshes, &self.picker, ray)
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hover.current()
    }

    pub fn hovered_mesh(&self) -> Option<&CountryMesh> {
        self.hover.current().and_then(|id| self.meshes.find(id))
    }

    // ── Selection, date, sidebar ─────────────────────────────

    pub fn selection(&self) -> SelectionReader {
        self.selection_reader.clone()
    }

    pub fn selected_country(&self) -> Option<String> {
        self.selection_reader.get()
    }

    pub fn date(&self) -> HistoricalDate {
        self.date
    }

    /// Accept a committed date from the date selector.
    pub fn set_date(&mut self, date: HistoricalDate) -> bool {
        if date == self.date {
            return false;
        }
        self.date = date;
        tracing::debug!(%date, month = %date.month_key(), "date changed");
        self.emit(SceneEvent::DateChanged {
            date: date.to_string(),
        });
        true
    }

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    fn open_sidebar(&mut self) {
        self.sidebar_open = true;
        self.emit(SceneEvent::SidebarOpened);
    }

    pub fn close_sidebar(&mut self) -> bool {
        if !self.sidebar_open {
            return false;
        }
        self.sidebar_open = false;
        self.emit(SceneEvent::SidebarClosed);
        true
    }

    // ── Events ───────────────────────────────────────────────

    fn emit(&mut self, event: SceneEvent) {
        self.events.emit_at(self.frame, event);
    }

    /// Record an outcome observed by the host, such as an event query.
    pub fn record(&mut self, event: SceneEvent) {
        self.emit(event);
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }
}

fn camera_limits(config: &ExplorerConfig) -> CameraLimits {
    CameraLimits {
        min_distance: config.camera_min_distance,
        max_distance: config.camera_max_distance,
        start_distance: config.camera_start_distance,
        fov_y_deg: config.camera_fov_y_deg,
        ..CameraLimits::default()
    }
}
