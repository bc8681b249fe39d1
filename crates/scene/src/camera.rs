//! Orbit camera around the globe: arcball rotation with inertia, smooth
//! exponential zoom, and screen-space picking rays.
//!
//! Every input carries its own timestamp so the camera stays deterministic
//! under test; the host passes `performance.now()`-based seconds.

use std::collections::VecDeque;

use foundation::math::Vec3;

use crate::picking::Ray;

/// Damping factor for angular velocity decay (per second).
const ANGULAR_DAMPING: f64 = 4.0;

/// Minimum angular velocity threshold before stopping inertia.
const ANGULAR_VELOCITY_THRESHOLD: f64 = 0.001;

/// Zoom smoothing factor (higher = faster response).
const ZOOM_SMOOTHING: f64 = 8.0;

/// Exponent applied per wheel delta unit.
const ZOOM_SPEED: f64 = 0.002;

/// Maximum samples to keep for velocity estimation.
const VELOCITY_HISTORY_SIZE: usize = 5;

/// Pointer travel (px) after which a press counts as a drag, not a click.
pub const CLICK_SLOP_PX: f64 = 4.0;

const IDENTITY: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLimits {
    pub min_distance: f64,
    pub max_distance: f64,
    pub start_distance: f64,
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            min_distance: 4.0,
            max_distance: 12.0,
            start_distance: 10.0,
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct VelocitySample {
    delta_quat: [f64; 4],
    dt: f64,
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Camera orientation as a unit quaternion `[x, y, z, w]`; identity
    /// puts the eye on +Z looking at the origin.
    orientation: [f64; 4],
    distance: f64,
    target_distance: f64,
    angular_velocity: [f64; 4],
    inertia_active: bool,
    limits: CameraLimits,

    canvas_width: f64,
    canvas_height: f64,

    dragging: bool,
    start_pos_px: [f64; 2],
    /// Furthest the pointer strayed from `start_pos_px` during this press.
    max_travel_px: f64,
    arcball_last_unit: Option<Vec3>,
    velocity_history: VecDeque<VelocitySample>,
    last_move_time_s: f64,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraLimits::default())
    }
}

impl OrbitCamera {
    pub fn new(limits: CameraLimits) -> Self {
        let start = limits
            .start_distance
            .clamp(limits.min_distance, limits.max_distance);
        Self {
            orientation: IDENTITY,
            distance: start,
            target_distance: start,
            angular_velocity: IDENTITY,
            inertia_active: false,
            limits,
            canvas_width: 1280.0,
            canvas_height: 720.0,
            dragging: false,
            start_pos_px: [0.0, 0.0],
            max_travel_px: 0.0,
            arcball_last_unit: None,
            velocity_history: VecDeque::with_capacity(VELOCITY_HISTORY_SIZE),
            last_move_time_s: 0.0,
        }
    }

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_width = width.max(1.0);
        self.canvas_height = height.max(1.0);
    }

    pub fn aspect(&self) -> f64 {
        self.canvas_width / self.canvas_height
    }

    /// Begin an orbit drag.
    pub fn on_pointer_down(&mut self, pos_px: [f64; 2], now_s: f64) {
        self.stop_inertia();
        self.dragging = true;
        self.start_pos_px = pos_px;
        self.max_travel_px = 0.0;
        self.last_move_time_s = now_s;
        self.arcball_last_unit = Some(self.screen_to_arcball(pos_px));
    }

    pub fn on_pointer_move(&mut self, pos_px: [f64; 2], now_s: f64) {
        if !self.dragging {
            return;
        }

        let dt = (now_s - self.last_move_time_s).max(1e-6);
        self.last_move_time_s = now_s;

        let travel = ((pos_px[0] - self.start_pos_px[0]).powi(2)
            + (pos_px[1] - self.start_pos_px[1]).powi(2))
        .sqrt();
        self.max_travel_px = self.max_travel_px.max(travel);

        let next_unit = self.screen_to_arcball(pos_px);
        if let Some(prev_unit) = self.arcball_last_unit {
            // Orbiting the eye from `next` back to `prev` makes the surface
            // under the pointer follow it.
            let delta_q = quat_from_unit_vectors(next_unit, prev_unit);
            self.orientation = quat_normalize(quat_mul(self.orientation, delta_q));

            self.velocity_history.push_back(VelocitySample {
                delta_quat: delta_q,
                dt,
            });
            if self.velocity_history.len() > VELOCITY_HISTORY_SIZE {
                self.velocity_history.pop_front();
            }
        }
        self.arcball_last_unit = Some(next_unit);
    }

    pub fn on_pointer_up(&mut self) {
        if !self.dragging {
            return;
        }

        self.angular_velocity = self.estimate_angular_velocity();
        self.inertia_active = quat_angle(self.angular_velocity) > ANGULAR_VELOCITY_THRESHOLD;

        self.dragging = false;
        self.arcball_last_unit = None;
        self.velocity_history.clear();
    }

    /// Positive `delta` zooms out.
    pub fn on_wheel(&mut self, delta: f64) {
        self.stop_inertia();
        if !delta.is_finite() {
            return;
        }
        self.target_distance = (self.target_distance * (delta * ZOOM_SPEED).exp())
            .clamp(self.limits.min_distance, self.limits.max_distance);
    }

    /// Advance inertia and zoom smoothing by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let dt = dt.clamp(0.0, 0.1);

        if self.inertia_active && !self.dragging {
            let step = quat_slerp(IDENTITY, self.angular_velocity, dt * 60.0);
            self.orientation = quat_normalize(quat_mul(self.orientation, step));

            let decay = (-ANGULAR_DAMPING * dt).exp();
            self.angular_velocity = quat_slerp(IDENTITY, self.angular_velocity, decay);
            if quat_angle(self.angular_velocity) < ANGULAR_VELOCITY_THRESHOLD {
                self.stop_inertia();
            }
        }

        let zoom_alpha = 1.0 - (-ZOOM_SMOOTHING * dt).exp();
        self.distance += (self.target_distance - self.distance) * zoom_alpha;
        self.distance = self
            .distance
            .clamp(self.limits.min_distance, self.limits.max_distance);
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Whether the current (or last) press moved far enough to be a drag.
    pub fn press_was_drag(&self) -> bool {
        self.max_travel_px > CLICK_SLOP_PX
    }

    pub fn is_inertia_active(&self) -> bool {
        self.inertia_active
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn target_distance(&self) -> f64 {
        self.target_distance
    }

    pub fn limits(&self) -> CameraLimits {
        self.limits
    }

    pub fn eye_position(&self) -> Vec3 {
        quat_rotate(self.orientation, Vec3::new(0.0, 0.0, self.distance))
    }

    fn up(&self) -> Vec3 {
        quat_rotate(self.orientation, Vec3::new(0.0, 1.0, 0.0))
    }

    /// Column-major view-projection matrix (wgpu clip space, z in 0..1).
    pub fn view_proj_matrix(&self) -> [[f32; 4]; 4] {
        let view = mat4_look_at_rh(self.eye_position(), Vec3::ZERO, self.up());
        let proj = mat4_perspective_rh_z0(
            self.limits.fov_y_deg.to_radians(),
            self.aspect(),
            self.limits.near,
            self.limits.far,
        );
        mat4_mul(proj, view)
    }

    /// World-space ray through a canvas pixel.
    pub fn screen_ray(&self, pos_px: [f64; 2]) -> Ray {
        let ndc_x = 2.0 * pos_px[0] / self.canvas_width - 1.0;
        let ndc_y = 1.0 - 2.0 * pos_px[1] / self.canvas_height;
        let tan_half = (0.5 * self.limits.fov_y_deg.to_radians()).tan();

        let eye = self.eye_position();
        let forward = quat_rotate(self.orientation, Vec3::new(0.0, 0.0, -1.0));
        let right = quat_rotate(self.orientation, Vec3::new(1.0, 0.0, 0.0));
        let up = self.up();

        let dir = forward
            + right.scale(ndc_x * tan_half * self.aspect())
            + up.scale(ndc_y * tan_half);
        Ray::new(eye, dir.normalized().unwrap_or(forward))
    }

    fn stop_inertia(&mut self) {
        self.inertia_active = false;
        self.angular_velocity = IDENTITY;
        self.velocity_history.clear();
    }

    fn screen_to_arcball(&self, pos_px: [f64; 2]) -> Vec3 {
        let min_dim = self.canvas_width.min(self.canvas_height).max(1.0);
        let nx = (2.0 * pos_px[0] - self.canvas_width) / min_dim;
        let ny = (self.canvas_height - 2.0 * pos_px[1]) / min_dim;

        let r2 = nx * nx + ny * ny;
        let v = if r2 <= 1.0 {
            Vec3::new(nx, ny, (1.0 - r2).sqrt())
        } else {
            let inv_r = 1.0 / r2.sqrt();
            Vec3::new(nx * inv_r, ny * inv_r, 0.0)
        };
        v.normalized().unwrap_or(Vec3::new(0.0, 0.0, 1.0))
    }

    fn estimate_angular_velocity(&self) -> [f64; 4] {
        if self.velocity_history.is_empty() {
            return IDENTITY;
        }

        let mut total_dt = 0.0;
        let mut accumulated = IDENTITY;
        for sample in &self.velocity_history {
            if sample.dt > 0.0 {
                let rate = 1.0 / sample.dt;
                accumulated = quat_mul(
                    quat_slerp(IDENTITY, sample.delta_quat, rate * 0.016),
                    accumulated,
                );
                total_dt += sample.dt;
            }
        }

        if total_dt > 0.0 {
            let avg_dt = total_dt / self.velocity_history.len() as f64;
            quat_slerp(IDENTITY, accumulated, avg_dt)
        } else {
            IDENTITY
        }
    }
}

// ============================================================================
// Quaternion math
// ============================================================================

fn quat_mul(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [
        a[3] * b[0] + a[0] * b[3] + a[1] * b[2] - a[2] * b[1],
        a[3] * b[1] - a[0] * b[2] + a[1] * b[3] + a[2] * b[0],
        a[3] * b[2] + a[0] * b[1] - a[1] * b[0] + a[2] * b[3],
        a[3] * b[3] - a[0] * b[0] - a[1] * b[1] - a[2] * b[2],
    ]
}

fn quat_normalize(q: [f64; 4]) -> [f64; 4] {
    let n = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if n > 1e-10 {
        [q[0] / n, q[1] / n, q[2] / n, q[3] / n]
    } else {
        IDENTITY
    }
}

fn quat_rotate(q: [f64; 4], v: Vec3) -> Vec3 {
    let qv = Vec3::new(q[0], q[1], q[2]);
    let t = qv.cross(v).scale(2.0);
    v + t.scale(q[3]) + qv.cross(t)
}

fn quat_slerp(a: [f64; 4], b: [f64; 4], t: f64) -> [f64; 4] {
    let mut dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];

    let mut b = b;
    if dot < 0.0 {
        b = [-b[0], -b[1], -b[2], -b[3]];
        dot = -dot;
    }

    if dot > 0.9995 {
        return quat_normalize([
            a[0] + t * (b[0] - a[0]),
            a[1] + t * (b[1] - a[1]),
            a[2] + t * (b[2] - a[2]),
            a[3] + t * (b[3] - a[3]),
        ]);
    }

    let theta_0 = dot.clamp(-1.0, 1.0).acos();
    let theta = theta_0 * t;
    let sin_theta_0 = theta_0.sin();
    let s0 = theta.cos() - dot * theta.sin() / sin_theta_0;
    let s1 = theta.sin() / sin_theta_0;

    [
        s0 * a[0] + s1 * b[0],
        s0 * a[1] + s1 * b[1],
        s0 * a[2] + s1 * b[2],
        s0 * a[3] + s1 * b[3],
    ]
}

fn quat_angle(q: [f64; 4]) -> f64 {
    2.0 * q[3].abs().clamp(0.0, 1.0).acos()
}

/// Rotation taking unit vector `a` onto unit vector `b`.
fn quat_from_unit_vectors(a: Vec3, b: Vec3) -> [f64; 4] {
    let dot = a.dot(b).clamp(-1.0, 1.0);

    if dot < -0.999999 {
        let mut axis = Vec3::new(1.0, 0.0, 0.0).cross(a);
        if axis.dot(axis) < 1e-12 {
            axis = Vec3::new(0.0, 1.0, 0.0).cross(a);
        }
        let axis = axis.normalized().unwrap_or(Vec3::new(0.0, 1.0, 0.0));
        return [axis.x, axis.y, axis.z, 0.0];
    }
    if dot > 0.999999 {
        return IDENTITY;
    }

    let axis = a.cross(b);
    quat_normalize([axis.x, axis.y, axis.z, 1.0 + dot])
}

// ============================================================================
// Matrix utilities
// ============================================================================

fn mat4_mul(a: [[f32; 4]; 4], b: [[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut c = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            c[col][row] = a[0][row] * b[col][0]
                + a[1][row] * b[col][1]
                + a[2][row] * b[col][2]
                + a[3][row] * b[col][3];
        }
    }
    c
}

fn mat4_perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> [[f32; 4]; 4] {
    let f = 1.0 / (0.5 * fov_y_rad).tan();
    [
        [(f / aspect) as f32, 0.0, 0.0, 0.0],
        [0.0, f as f32, 0.0, 0.0],
        [0.0, 0.0, (far / (near - far)) as f32, -1.0],
        [0.0, 0.0, ((near * far) / (near - far)) as f32, 0.0],
    ]
}

fn mat4_look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> [[f32; 4]; 4] {
    let f = (target - eye).normalized().unwrap_or(Vec3::new(0.0, 0.0, -1.0));
    let s = f.cross(up).normalized().unwrap_or(Vec3::new(1.0, 0.0, 0.0));
    let u = s.cross(f);

    [
        [s.x as f32, u.x as f32, (-f.x) as f32, 0.0],
        [s.y as f32, u.y as f32, (-f.y) as f32, 0.0],
        [s.z as f32, u.z as f32, (-f.z) as f32, 0.0],
        [(-s.dot(eye)) as f32, (-u.dot(eye)) as f32, f.dot(eye) as f32, 1.0],
    ]
}

/// Column-major rotation about +Y, for the spinning globe's model matrix.
pub fn mat4_rotation_y(angle_rad: f64) -> [[f32; 4]; 4] {
    let (s, c) = angle_rad.sin_cos();
    [
        [c as f32, 0.0, (-s) as f32, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [s as f32, 0.0, c as f32, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}
