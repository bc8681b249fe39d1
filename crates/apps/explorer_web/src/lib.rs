use chrono::NaiveDate;
use console_error_panic_hook::set_once;
use std::cell::RefCell;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use foundation::time::{HistoricalDate, MonthKey};
use layers::boundaries::{BoundaryPolyline, line_list_positions};
use layers::globe::GlobeModel;
use layers::symbology::{ALICE_BLUE, LayerStyle, UNTEXTURED_GLOBE};
use panels::date_selector::{DateField, DateSelector};
use panels::sidebar::{EventQuery, EventQueryError, EventSidebar, SidebarView};
use runtime::config::ExplorerConfig;
use runtime::event_bus::SceneEvent;
use scene::controller::{GlobeScene, MountGeneration, PreloadPlan};
use streaming::cache::{TexturePreload, TextureResolution};
use streaming::request::RequestId;
use streaming::residency::ResidencyState;

mod fetch;
mod texture;
mod wgpu;

use fetch::{fetch_dataset, fetch_events_body, fetch_texture_bytes};
use texture::{DecodedImage, decode_texture};
use self::wgpu::{
    FrameGlobals, WgpuContext, has_month_texture, init_wgpu_from_canvas_id, render, resize_wgpu,
    set_boundary_lines, set_hover_mesh, upload_month_texture,
};

const DEFAULT_CANVAS_ID: &str = "explorer-canvas-3d";
const LIGHT_DIR: [f32; 4] = [5.0, 5.0, 5.0, 0.0];
const AMBIENT: f32 = 0.65;
const DIRECTIONAL: f32 = 0.55;

#[derive(Debug, Copy, Clone, PartialEq)]
enum TextureSlot {
    Exact(usize),
    Fallback(usize),
    Untextured,
}

impl TextureSlot {
    fn index(self) -> Option<usize> {
        match self {
            TextureSlot::Exact(i) | TextureSlot::Fallback(i) => Some(i),
            TextureSlot::Untextured => None,
        }
    }
}

pub struct ExplorerState {
    config: ExplorerConfig,
    scene: GlobeScene<DecodedImage>,
    date_selector: DateSelector,
    sidebar: EventSidebar,
    canvas_width: f64,
    canvas_height: f64,
    wgpu: Option<WgpuContext>,
    uploaded_lines: Option<Arc<[BoundaryPolyline]>>,
    uploaded_hover: Option<String>,
}

impl ExplorerState {
    pub fn new(config: ExplorerConfig, today: NaiveDate) -> Self {
        let date_selector = DateSelector::new(today, &config);
        let scene = GlobeScene::new(config.clone(), date_selector.committed());
        let sidebar = EventSidebar::new(&config);
        let mut state = Self {
            config,
            scene,
            date_selector,
            sidebar,
            canvas_width: 1280.0,
            canvas_height: 720.0,
            wgpu: None,
            uploaded_lines: None,
            uploaded_hover: None,
        };
        state.scene.set_canvas_size(state.canvas_width, state.canvas_height);
        state
    }

    fn mount(&mut self) -> PreloadPlan {
        self.uploaded_lines = None;
        self.uploaded_hover = None;
        self.scene.mount()
    }

    fn unmount(&mut self) {
        self.scene.unmount();
        self.sidebar.reset();
        self.uploaded_lines = None;
        self.uploaded_hover = None;
    }

    fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_width = width;
        self.canvas_height = height;
        self.scene.set_canvas_size(width, height);
        if let Some(ctx) = &mut self.wgpu {
            resize_wgpu(ctx, width as u32, height as u32);
        }
    }

    /// Query for the current (country, date) pair, if it changed.
    fn sync_sidebar(&mut self) -> Option<(RequestId, EventQuery)> {
        let country = self.scene.selected_country();
        self.sidebar
            .request_for(country.as_deref(), Some(self.scene.date()))
    }

    fn click(&mut self, pos_px: [f64; 2]) -> (Option<String>, Option<(RequestId, EventQuery)>) {
        let selected = self.scene.on_click(pos_px);
        let query = if selected.is_some() {
            self.sync_sidebar()
        } else {
            None
        };
        (selected, query)
    }

    fn commit_date(
        &mut self,
        field: DateField,
        now_ms: f64,
    ) -> (Option<HistoricalDate>, Option<(RequestId, EventQuery)>) {
        let Some(date) = self.date_selector.commit(field, now_ms) else {
            return (None, None);
        };
        if self.scene.set_date(date) {
            (Some(date), self.sync_sidebar())
        } else {
            (None, None)
        }
    }

    fn apply_event_response(
        &mut self,
        id: RequestId,
        country: &str,
        result: Result<String, EventQueryError>,
    ) -> bool {
        if !self.sidebar.on_response(id, result) {
            self.scene
                .record(SceneEvent::StaleResponseDropped { request: id.0 });
            return false;
        }
        let event = match self.sidebar.view() {
            SidebarView::Loaded { events } => SceneEvent::EventsLoaded {
                country: country.to_string(),
                count: events.len(),
            },
            SidebarView::Empty => SceneEvent::EventsLoaded {
                country: country.to_string(),
                count: 0,
            },
            SidebarView::Failed { message } => SceneEvent::EventsFailed {
                country: country.to_string(),
                message: message.clone(),
            },
            SidebarView::Idle | SidebarView::Loading => return true,
        };
        self.scene.record(event);
        true
    }

    fn sidebar_json(&self) -> serde_json::Value {
        serde_json::json!({
            "open": self.scene.is_sidebar_open(),
            "header": self.sidebar.header(),
            "view": self.sidebar.view(),
        })
    }

    fn texture_slot(&self) -> TextureSlot {
        match self.scene.globe_texture() {
            TextureResolution::Exact(_) => TextureSlot::Exact(self.scene.date().month_key().index()),
            TextureResolution::Fallback { month, .. } => TextureSlot::Fallback(month.index()),
            TextureResolution::Untextured => TextureSlot::Untextured,
        }
    }

    fn frame_globals(&self) -> FrameGlobals {
        let hover = LayerStyle::country(true);
        FrameGlobals {
            view_proj: self.scene.camera().view_proj_matrix(),
            model: self.scene.model_matrix(),
            light_dir: LIGHT_DIR,
            base_color: UNTEXTURED_GLOBE,
            line_color: ALICE_BLUE,
            hover_color: hover.color,
            params: [
                if self.texture_slot().index().is_some() { 1.0 } else { 0.0 },
                AMBIENT,
                DIRECTIONAL,
                0.0,
            ],
        }
    }

    /// Hover tint sits halfway between the surface and the outlines.
    fn hover_lift(&self) -> f32 {
        let r = self.config.globe_radius;
        ((r + self.config.boundary_epsilon * 0.5) / r) as f32
    }

    fn render_scene(&mut self) {
        let lines = self.scene.boundary_lines();
        let globals = self.frame_globals();
        let slot = self.texture_slot();
        let lift = self.hover_lift();

        let ExplorerState {
            scene,
            wgpu,
            uploaded_lines,
            uploaded_hover,
            ..
        } = self;
        let Some(ctx) = wgpu else {
            return;
        };

        let lines_changed = uploaded_lines
            .as_ref()
            .is_none_or(|uploaded| {
                !Arc::ptr_eq(uploaded, &lines) && !(uploaded.is_empty() && lines.is_empty())
            });
        if lines_changed {
            set_boundary_lines(ctx, &line_list_positions(&lines));
            *uploaded_lines = Some(lines);
        }

        let hovered = scene.hovered().map(str::to_string);
        if hovered != *uploaded_hover {
            match scene.hovered_mesh() {
                Some(mesh) => {
                    let positions: Vec<[f32; 3]> = mesh
                        .positions
                        .iter()
                        .map(|p| {
                            let [x, y, z] = p.to_f32();
                            [x * lift, y * lift, z * lift]
                        })
                        .collect();
                    set_hover_mesh(ctx, Some((positions.as_slice(), mesh.indices.as_slice())));
                }
                None => set_hover_mesh(ctx, None),
            }
            *uploaded_hover = hovered;
        }

        if let Some(index) = slot.index() {
            if !has_month_texture(ctx, index) {
                let image = MonthKey::new(index as u32 + 1)
                    .and_then(|month| scene.textures().resolve(month).texture());
                if let Some(image) = image {
                    upload_month_texture(ctx, index, image);
                }
            }
        }

        if let Err(err) = render(ctx, &globals, slot.index()) {
            tracing::warn!(?err, "frame render failed");
        }
    }
}

thread_local! {
    static STATE: RefCell<Option<ExplorerState>> = const { RefCell::new(None) };
}

fn today() -> NaiveDate {
    let now = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
        .unwrap_or_default()
}

/// Run `f` against the explorer, creating it with defaults on first use.
fn with_state<R: Default>(f: impl FnOnce(&mut ExplorerState) -> R) -> R {
    STATE
        .try_with(|cell| {
            let mut slot = cell.borrow_mut();
            let state =
                slot.get_or_insert_with(|| ExplorerState::new(ExplorerConfig::default(), today()));
            f(state)
        })
        .unwrap_or_default()
}

fn log_error(context: &str, err: impl std::fmt::Display) {
    web_sys::console::log_1(&JsValue::from_str(&format!("{context}: {err}")));
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    tracing_wasm::set_as_global_default();

    // Optional page-provided configuration.
    let preset = web_sys::window()
        .and_then(|w| js_sys::Reflect::get(&w, &JsValue::from_str("__explorerConfig")).ok())
        .and_then(|v| v.as_string());
    if let Some(json) = preset {
        if let Err(err) = configure(&json) {
            log_error("ignoring window.__explorerConfig", err.as_string().unwrap_or_default());
        }
    }
    Ok(())
}

/// Replace the configuration with a JSON object. Resets the scene.
#[wasm_bindgen]
pub fn configure(json: &str) -> Result<(), JsValue> {
    let config = ExplorerConfig::from_json_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    STATE.with(|cell| {
        let mut slot = cell.borrow_mut();
        let wgpu = slot.as_mut().and_then(|s| s.wgpu.take());
        let mut state = ExplorerState::new(config, today());
        state.wgpu = wgpu;
        *slot = Some(state);
    });
    tracing::info!("explorer configured");
    Ok(())
}

/// Mount the globe scene and start every preload.
#[wasm_bindgen]
pub fn mount() {
    let plan = STATE.with(|cell| {
        let mut slot = cell.borrow_mut();
        let state =
            slot.get_or_insert_with(|| ExplorerState::new(ExplorerConfig::default(), today()));
        state.mount()
    });

    let generation = plan.generation;
    spawn_local(load_dataset(generation, plan.dataset_url));
    for preload in plan.textures {
        spawn_local(load_texture(generation, preload));
    }
}

#[wasm_bindgen]
pub fn unmount() {
    with_state(|s| s.unmount());
}

async fn load_dataset(generation: MountGeneration, url: String) {
    match fetch_dataset(&url).await {
        Ok(dataset) => {
            with_state(|s| s.scene.on_dataset_loaded(generation, Arc::new(dataset)));
        }
        Err(err) => {
            tracing::warn!(%url, %err, "country dataset failed to load");
            with_state(|s| s.scene.on_dataset_failed(generation, &err));
        }
    }
}

async fn load_texture(generation: MountGeneration, preload: TexturePreload) {
    let month = preload.month;
    let advance = |next: ResidencyState| {
        with_state(|s| {
            s.scene.generation() == generation && s.scene.textures_mut().advance(month, next)
        })
    };

    if !advance(ResidencyState::Downloading) {
        return;
    }
    let result = match fetch_texture_bytes(&preload.url).await {
        Ok(bytes) => {
            advance(ResidencyState::Decoding);
            decode_texture(&bytes)
        }
        Err(err) => Err(err),
    };
    match result {
        Ok(image) => {
            with_state(|s| s.scene.on_texture_loaded(generation, month, image));
        }
        Err(err) => {
            tracing::warn!(url = %preload.url, %err, "month texture failed to load");
            with_state(|s| s.scene.on_texture_failed(generation, month, err));
        }
    }
}

fn spawn_event_query(query: Option<(RequestId, EventQuery)>) {
    let Some((id, query)) = query else {
        return;
    };
    spawn_local(async move {
        let result = fetch_events_body(&query.url).await;
        with_state(|s| s.apply_event_response(id, &query.country, result));
    });
}

#[wasm_bindgen]
pub fn init_wgpu(canvas_id: Option<String>) {
    spawn_local(async move {
        if let Err(err) = init_wgpu_inner(canvas_id.as_deref().unwrap_or(DEFAULT_CANVAS_ID)).await {
            web_sys::console::log_1(&JsValue::from_str(&format!("wgpu init error: {:?}", err)));
        }
    });
}

async fn init_wgpu_inner(canvas_id: &str) -> Result<(), JsValue> {
    let radius = with_state(|s| s.config.globe_radius);
    let sphere = GlobeModel::new(radius).mesh();
    let ctx = init_wgpu_from_canvas_id(canvas_id, &sphere).await?;

    with_state(|s| {
        s.wgpu = Some(ctx);
        s.uploaded_lines = None;
        s.uploaded_hover = None;
        s.render_scene();
    });
    Ok(())
}

#[wasm_bindgen]
pub fn set_canvas_size(width: f64, height: f64) {
    with_state(|s| s.set_canvas_size(width, height));
}

/// Advance the scene to `now_ms` (host clock) and draw. Returns the globe's
/// spin angle in radians.
#[wasm_bindgen]
pub fn advance_frame(now_ms: f64) -> f64 {
    with_state(|s| {
        s.scene.on_frame(now_ms / 1000.0);
        s.date_selector.tick(now_ms);
        for event in s.scene.drain_events() {
            tracing::info!(
                frame = event.frame_index,
                kind = event.event.kind(),
                "scene event"
            );
            if event.event.is_failure() {
                if let Ok(json) = serde_json::to_string(&event) {
                    log_error("explorer", json);
                }
            }
        }
        s.render_scene();
        s.scene.rotation_angle()
    })
}

#[wasm_bindgen]
pub fn pointer_down(x_px: f64, y_px: f64, now_ms: f64) {
    with_state(|s| s.scene.on_drag_start([x_px, y_px], now_ms / 1000.0));
}

/// Returns the identifier of the hovered country.
#[wasm_bindgen]
pub fn pointer_move(x_px: f64, y_px: f64, now_ms: f64) -> Option<String> {
    with_state(|s| {
        s.scene
            .on_pointer_move([x_px, y_px], now_ms / 1000.0)
            .map(str::to_string)
    })
}

#[wasm_bindgen]
pub fn pointer_up() {
    with_state(|s| s.scene.on_drag_end());
}

#[wasm_bindgen]
pub fn pointer_leave() {
    with_state(|s| s.scene.on_pointer_leave());
}

#[wasm_bindgen]
pub fn wheel(delta_y: f64) {
    with_state(|s| s.scene.on_wheel(delta_y));
}

/// Select the country under the pointer; returns its display name.
#[wasm_bindgen]
pub fn click(x_px: f64, y_px: f64) -> Option<String> {
    let (selected, query) = with_state(|s| s.click([x_px, y_px]));
    spawn_event_query(query);
    selected
}

#[wasm_bindgen]
pub fn date_input(field: &str, text: &str) -> Result<(), JsValue> {
    let field =
        DateField::parse(field).ok_or_else(|| JsValue::from_str(&format!("unknown date field `{field}`")))?;
    with_state(|s| s.date_selector.input(field, text));
    Ok(())
}

/// Field lost focus. Returns the committed date if it changed.
#[wasm_bindgen]
pub fn date_commit(field: &str, now_ms: f64) -> Result<Option<String>, JsValue> {
    let field =
        DateField::parse(field).ok_or_else(|| JsValue::from_str(&format!("unknown date field `{field}`")))?;
    let (date, query) = with_state(|s| s.commit_date(field, now_ms));
    spawn_event_query(query);
    Ok(date.map(|d| d.to_string()))
}

#[wasm_bindgen]
pub fn date_selector_view() -> Result<String, JsValue> {
    let view = with_state(|s| Some(s.date_selector.view()));
    serde_json::to_string(&view).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn sidebar_view() -> Result<String, JsValue> {
    let view = with_state(|s| s.sidebar_json());
    serde_json::to_string(&view).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn close_sidebar() -> bool {
    with_state(|s| s.scene.close_sidebar())
}

/// Route for an event card.
#[wasm_bindgen]
pub fn event_path(id: &str) -> String {
    panels::sidebar::event_path(id)
}
