/// Per-frame uniforms shared by every pipeline.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameGlobals {
    pub view_proj: [[f32; 4]; 4],
    /// Spin of the globe group (globe, outlines, hover).
    pub model: [[f32; 4]; 4],
    pub light_dir: [f32; 4],
    /// Used when no month texture is resident.
    pub base_color: [f32; 4],
    pub line_color: [f32; 4],
    pub hover_color: [f32; 4],
    /// x: textured flag, y: ambient, z: directional intensity.
    pub params: [f32; 4],
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use ::wgpu::util::DeviceExt;
    use std::borrow::Cow;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    use super::FrameGlobals;
    use crate::texture::DecodedImage;
    use layers::globe::SphereMesh;

    const STARS_COUNT: u32 = 1000;

    #[derive(Debug)]
    struct GlobeTexture {
        _texture: ::wgpu::Texture,
        bind_group: ::wgpu::BindGroup,
    }

    #[derive(Debug)]
    pub struct WgpuContext {
        pub _instance: &'static ::wgpu::Instance,
        pub surface: ::wgpu::Surface<'static>,
        pub device: ::wgpu::Device,
        pub queue: ::wgpu::Queue,
        pub config: ::wgpu::SurfaceConfiguration,
        pub _canvas: web_sys::HtmlCanvasElement,
        stars_pipeline: ::wgpu::RenderPipeline,
        globe_pipeline: ::wgpu::RenderPipeline,
        line_pipeline: ::wgpu::RenderPipeline,
        hover_pipeline: ::wgpu::RenderPipeline,
        uniform_buffer: ::wgpu::Buffer,
        uniform_bind_group: ::wgpu::BindGroup,
        texture_layout: ::wgpu::BindGroupLayout,
        sampler: ::wgpu::Sampler,
        placeholder: GlobeTexture,
        month_textures: [Option<GlobeTexture>; 12],
        depth_view: ::wgpu::TextureView,
        globe_vertex_buffer: ::wgpu::Buffer,
        globe_index_buffer: ::wgpu::Buffer,
        globe_index_count: u32,
        line_vertex_buffer: Option<::wgpu::Buffer>,
        line_vertex_count: u32,
        hover_buffers: Option<(::wgpu::Buffer, ::wgpu::Buffer, u32)>,
    }

    const GLOBALS_WGSL: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    light_dir: vec4<f32>,
    base_color: vec4<f32>,
    line_color: vec4<f32>,
    hover_color: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;
"#;

    const GLOBE_SHADER: &str = r#"
@group(1) @binding(0)
var globe_tex: texture_2d<f32>;
@group(1) @binding(1)
var globe_sampler: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VsOut {
    let world = globals.model * vec4<f32>(position, 1.0);
    let n = (globals.model * vec4<f32>(normal, 0.0)).xyz;
    return VsOut(globals.view_proj * world, n, uv);
}

@fragment
fn fs_main(fs_in: VsOut) -> @location(0) vec4<f32> {
    let n = normalize(fs_in.normal);
    let l = normalize(globals.light_dir.xyz);
    let light = globals.params.y + globals.params.z * max(dot(n, l), 0.0);
    let texel = textureSample(globe_tex, globe_sampler, fs_in.uv);
    let base = select(globals.base_color.rgb, texel.rgb, globals.params.x > 0.5);
    return vec4<f32>(min(base * light, vec3<f32>(1.0)), 1.0);
}
"#;

    const OVERLAY_SHADER: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.view_proj * globals.model * vec4<f32>(position, 1.0);
}

@fragment
fn fs_line() -> @location(0) vec4<f32> {
    return globals.line_color;
}

@fragment
fn fs_hover() -> @location(0) vec4<f32> {
    return globals.hover_color;
}
"#;

    const STARS_SHADER: &str = r#"
fn hash_u32(x_in: u32) -> u32 {
    var x = x_in;
    x ^= x >> 16u;
    x *= 0x7feb352du;
    x ^= x >> 15u;
    x *= 0x846ca68bu;
    x ^= x >> 16u;
    return x;
}

fn hash01(x: u32) -> f32 {
    return f32(hash_u32(x)) / 4294967295.0;
}

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) a: f32,
};

@vertex
fn vs_main(@builtin(vertex_index) vid: u32) -> VsOut {
    let rx = hash01(vid ^ 0x68bc21ebu);
    let ry = hash01(vid ^ 0x02e5be93u);
    let rb = hash01(vid ^ 0x9e3779b9u);
    let a = 0.05 + 0.35 * rb * rb;
    return VsOut(vec4<f32>(rx * 2.0 - 1.0, ry * 2.0 - 1.0, 0.9999, 1.0), a);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, in.a);
}
"#;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct GlobeVertex {
        position: [f32; 3],
        normal: [f32; 3],
        uv: [f32; 2],
    }

    fn shader(device: &::wgpu::Device, label: &str, body: &str, with_globals: bool) -> ::wgpu::ShaderModule {
        let source = if with_globals {
            format!("{GLOBALS_WGSL}{body}")
        } else {
            body.to_string()
        };
        device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        })
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("explorer-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Depth24Plus,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn primitive(topology: ::wgpu::PrimitiveTopology) -> ::wgpu::PrimitiveState {
        ::wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: ::wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: ::wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        }
    }

    fn depth_state(write: bool) -> ::wgpu::DepthStencilState {
        ::wgpu::DepthStencilState {
            format: ::wgpu::TextureFormat::Depth24Plus,
            depth_write_enabled: write,
            depth_compare: ::wgpu::CompareFunction::LessEqual,
            stencil: ::wgpu::StencilState::default(),
            bias: ::wgpu::DepthBiasState::default(),
        }
    }

    const POSITION_ONLY: [::wgpu::VertexAttribute; 1] = [::wgpu::VertexAttribute {
        format: ::wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    }];

    fn overlay_pipeline(
        device: &::wgpu::Device,
        layout: &::wgpu::PipelineLayout,
        module: &::wgpu::ShaderModule,
        format: ::wgpu::TextureFormat,
        label: &str,
        fragment_entry: &str,
        topology: ::wgpu::PrimitiveTopology,
    ) -> ::wgpu::RenderPipeline {
        device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: ::wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[::wgpu::VertexBufferLayout {
                    array_stride: 12,
                    step_mode: ::wgpu::VertexStepMode::Vertex,
                    attributes: &POSITION_ONLY,
                }],
            },
            fragment: Some(::wgpu::FragmentState {
                module,
                entry_point: Some(fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format,
                    blend: Some(::wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: primitive(topology),
            depth_stencil: Some(depth_state(false)),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn create_globe_texture(
        device: &::wgpu::Device,
        queue: &::wgpu::Queue,
        layout: &::wgpu::BindGroupLayout,
        sampler: &::wgpu::Sampler,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> GlobeTexture {
        let texture = device.create_texture_with_data(
            queue,
            &::wgpu::TextureDescriptor {
                label: Some(label),
                size: ::wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: ::wgpu::TextureDimension::D2,
                format: ::wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: ::wgpu::TextureUsages::TEXTURE_BINDING | ::wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            ::wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        let view = texture.create_view(&::wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                ::wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ::wgpu::BindingResource::TextureView(&view),
                },
                ::wgpu::BindGroupEntry {
                    binding: 1,
                    resource: ::wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        GlobeTexture {
            _texture: texture,
            bind_group,
        }
    }

    pub async fn init_wgpu_from_canvas_id(
        canvas_id: &str,
        sphere: &SphereMesh,
    ) -> Result<WgpuContext, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window missing"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document missing"))?;
        let canvas_elem = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas missing"))?
            .dyn_into::<web_sys::HtmlCanvasElement>()?;

        let width = canvas_elem.width();
        let height = canvas_elem.height();

        // The surface must not outlive its instance; leak the instance for
        // the lifetime of the page.
        let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
            &::wgpu::InstanceDescriptor {
                backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                ..Default::default()
            },
        )));

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas_elem.clone()))
            .map_err(|e| JsValue::from_str(&format!("surface error: {e}")))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("adapter error: {e}")))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("explorer-wgpu-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("device error: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| JsValue::from_str("surface reports no formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let globe_shader = shader(&device, "explorer-globe-shader", GLOBE_SHADER, true);
        let overlay_shader = shader(&device, "explorer-overlay-shader", OVERLAY_SHADER, true);
        let stars_shader = shader(&device, "explorer-stars-shader", STARS_SHADER, false);

        let uniform_buffer = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("explorer-globals"),
            size: std::mem::size_of::<FrameGlobals>() as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("explorer-globals-bgl"),
            entries: &[::wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: ::wgpu::BindingType::Buffer {
                    ty: ::wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("explorer-globals-bg"),
            layout: &uniform_layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("explorer-globe-texture-bgl"),
            entries: &[
                ::wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ::wgpu::ShaderStages::FRAGMENT,
                    ty: ::wgpu::BindingType::Texture {
                        sample_type: ::wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: ::wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                ::wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ::wgpu::ShaderStages::FRAGMENT,
                    ty: ::wgpu::BindingType::Sampler(::wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&::wgpu::SamplerDescriptor {
            label: Some("explorer-globe-sampler"),
            address_mode_u: ::wgpu::AddressMode::Repeat,
            mag_filter: ::wgpu::FilterMode::Linear,
            min_filter: ::wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder = create_globe_texture(
            &device,
            &queue,
            &texture_layout,
            &sampler,
            "explorer-globe-placeholder",
            1,
            1,
            &[255, 255, 255, 255],
        );

        let globe_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("explorer-globe-pipeline-layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });
        let overlay_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("explorer-overlay-pipeline-layout"),
            bind_group_layouts: &[&uniform_layout],
            immediate_size: 0,
        });
        let stars_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("explorer-stars-pipeline-layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        let stars_pipeline = device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some("explorer-stars-pipeline"),
            layout: Some(&stars_layout),
            vertex: ::wgpu::VertexState {
                module: &stars_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(::wgpu::FragmentState {
                module: &stars_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(::wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: primitive(::wgpu::PrimitiveTopology::PointList),
            depth_stencil: None,
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let globe_pipeline = device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some("explorer-globe-pipeline"),
            layout: Some(&globe_layout),
            vertex: ::wgpu::VertexState {
                module: &globe_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[::wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<GlobeVertex>() as ::wgpu::BufferAddress,
                    step_mode: ::wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x3,
                            offset: 12,
                            shader_location: 1,
                        },
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x2,
                            offset: 24,
                            shader_location: 2,
                        },
                    ],
                }],
            },
            fragment: Some(::wgpu::FragmentState {
                module: &globe_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(::wgpu::BlendState::REPLACE),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: primitive(::wgpu::PrimitiveTopology::TriangleList),
            depth_stencil: Some(depth_state(true)),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let line_pipeline = overlay_pipeline(
            &device,
            &overlay_layout,
            &overlay_shader,
            config.format,
            "explorer-boundary-pipeline",
            "fs_line",
            ::wgpu::PrimitiveTopology::LineList,
        );
        let hover_pipeline = overlay_pipeline(
            &device,
            &overlay_layout,
            &overlay_shader,
            config.format,
            "explorer-hover-pipeline",
            "fs_hover",
            ::wgpu::PrimitiveTopology::TriangleList,
        );

        let vertices: Vec<GlobeVertex> = sphere
            .positions
            .iter()
            .zip(&sphere.normals)
            .zip(&sphere.uvs)
            .map(|((position, normal), uv)| GlobeVertex {
                position: *position,
                normal: *normal,
                uv: *uv,
            })
            .collect();
        let globe_vertex_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("explorer-globe-vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: ::wgpu::BufferUsages::VERTEX,
        });
        let globe_index_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("explorer-globe-indices"),
            contents: bytemuck::cast_slice(&sphere.indices),
            usage: ::wgpu::BufferUsages::INDEX,
        });

        queue.write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&<FrameGlobals as bytemuck::Zeroable>::zeroed()));

        Ok(WgpuContext {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            _canvas: canvas_elem,
            stars_pipeline,
            globe_pipeline,
            line_pipeline,
            hover_pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            sampler,
            placeholder,
            month_textures: Default::default(),
            depth_view,
            globe_vertex_buffer,
            globe_index_buffer,
            globe_index_count: sphere.indices.len() as u32,
            line_vertex_buffer: None,
            line_vertex_count: 0,
            hover_buffers: None,
        })
    }

    pub fn resize_wgpu(ctx: &mut WgpuContext, width: u32, height: u32) {
        ctx.config.width = width.max(1);
        ctx.config.height = height.max(1);
        ctx.surface.configure(&ctx.device, &ctx.config);
        ctx.depth_view = create_depth_view(&ctx.device, &ctx.config);
    }

    pub fn has_month_texture(ctx: &WgpuContext, month_index: usize) -> bool {
        ctx.month_textures
            .get(month_index)
            .is_some_and(|slot| slot.is_some())
    }

    /// Upload a decoded month texture, downscaling past the device limit.
    pub fn upload_month_texture(ctx: &mut WgpuContext, month_index: usize, image: &DecodedImage) {
        if month_index >= ctx.month_textures.len() {
            return;
        }
        let max_dim = ctx.device.limits().max_texture_dimension_2d;
        let label = format!("explorer-month-texture-{}", month_index + 1);

        let texture = if image.width > max_dim || image.height > max_dim {
            let Some(rgba) = image::RgbaImage::from_raw(image.width, image.height, image.rgba.clone())
            else {
                tracing::warn!(month = month_index + 1, "texture buffer does not match its size");
                return;
            };
            let scale = f64::from(max_dim) / f64::from(image.width.max(image.height));
            let width = ((f64::from(image.width) * scale) as u32).clamp(1, max_dim);
            let height = ((f64::from(image.height) * scale) as u32).clamp(1, max_dim);
            tracing::debug!(
                month = month_index + 1,
                from = ?(image.width, image.height),
                to = ?(width, height),
                "downscaling month texture"
            );
            let resized =
                image::imageops::resize(&rgba, width, height, image::imageops::FilterType::Triangle);
            create_globe_texture(
                &ctx.device,
                &ctx.queue,
                &ctx.texture_layout,
                &ctx.sampler,
                &label,
                width,
                height,
                resized.as_raw(),
            )
        } else {
            create_globe_texture(
                &ctx.device,
                &ctx.queue,
                &ctx.texture_layout,
                &ctx.sampler,
                &label,
                image.width,
                image.height,
                &image.rgba,
            )
        };
        ctx.month_textures[month_index] = Some(texture);
    }

    /// Replace the boundary `LineList`.
    pub fn set_boundary_lines(ctx: &mut WgpuContext, positions: &[[f32; 3]]) {
        if positions.is_empty() {
            ctx.line_vertex_buffer = None;
            ctx.line_vertex_count = 0;
            return;
        }
        ctx.line_vertex_buffer = Some(ctx.device.create_buffer_init(
            &::wgpu::util::BufferInitDescriptor {
                label: Some("explorer-boundary-vertices"),
                contents: bytemuck::cast_slice(positions),
                usage: ::wgpu::BufferUsages::VERTEX,
            },
        ));
        ctx.line_vertex_count = positions.len() as u32;
    }

    pub fn set_hover_mesh(ctx: &mut WgpuContext, mesh: Option<(&[[f32; 3]], &[u32])>) {
        ctx.hover_buffers = match mesh {
            Some((positions, indices)) if !indices.is_empty() => {
                let vertices = ctx.device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("explorer-hover-vertices"),
                    contents: bytemuck::cast_slice(positions),
                    usage: ::wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = ctx.device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("explorer-hover-indices"),
                    contents: bytemuck::cast_slice(indices),
                    usage: ::wgpu::BufferUsages::INDEX,
                });
                Some((vertices, index_buffer, indices.len() as u32))
            }
            _ => None,
        };
    }

    pub fn render(
        ctx: &WgpuContext,
        globals: &FrameGlobals,
        month_index: Option<usize>,
    ) -> Result<(), JsValue> {
        let frame = ctx
            .surface
            .get_current_texture()
            .map_err(|e| JsValue::from_str(&format!("surface acquire failed: {e}")))?;
        let view = frame
            .texture
            .create_view(&::wgpu::TextureViewDescriptor::default());

        let globe_texture = month_index
            .and_then(|i| ctx.month_textures.get(i))
            .and_then(Option::as_ref);
        let mut globals = *globals;
        globals.params[0] = if globe_texture.is_some() { 1.0 } else { 0.0 };
        ctx.queue
            .write_buffer(&ctx.uniform_buffer, 0, bytemuck::bytes_of(&globals));

        let mut encoder = ctx
            .device
            .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                label: Some("explorer-frame-encoder"),
            });

        // Pass 1: clear to black and draw the starfield.
        {
            let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("explorer-stars-pass"),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: ::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(::wgpu::Color::BLACK),
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(&ctx.stars_pipeline);
            rpass.draw(0..STARS_COUNT, 0..1);
        }

        // Pass 2: globe, then outlines and hover tint over it.
        {
            let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("explorer-globe-pass"),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: ::wgpu::Operations {
                        load: ::wgpu::LoadOp::Load,
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_view,
                    depth_ops: Some(::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(1.0),
                        store: ::wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(&ctx.globe_pipeline);
            rpass.set_bind_group(0, &ctx.uniform_bind_group, &[]);
            let texture = globe_texture.unwrap_or(&ctx.placeholder);
            rpass.set_bind_group(1, &texture.bind_group, &[]);
            rpass.set_vertex_buffer(0, ctx.globe_vertex_buffer.slice(..));
            rpass.set_index_buffer(ctx.globe_index_buffer.slice(..), ::wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..ctx.globe_index_count, 0, 0..1);

            if let Some(lines) = &ctx.line_vertex_buffer {
                rpass.set_pipeline(&ctx.line_pipeline);
                rpass.set_bind_group(0, &ctx.uniform_bind_group, &[]);
                rpass.set_vertex_buffer(0, lines.slice(..));
                rpass.draw(0..ctx.line_vertex_count, 0..1);
            }

            if let Some((vertices, indices, count)) = &ctx.hover_buffers {
                rpass.set_pipeline(&ctx.hover_pipeline);
                rpass.set_bind_group(0, &ctx.uniform_bind_group, &[]);
                rpass.set_vertex_buffer(0, vertices.slice(..));
                rpass.set_index_buffer(indices.slice(..), ::wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..*count, 0, 0..1);
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use super::FrameGlobals;
    use crate::texture::DecodedImage;
    use layers::globe::SphereMesh;
    use wasm_bindgen::prelude::JsValue;

    #[derive(Debug, Default)]
    pub struct WgpuContext;

    pub async fn init_wgpu_from_canvas_id(
        _canvas_id: &str,
        _sphere: &SphereMesh,
    ) -> Result<WgpuContext, JsValue> {
        Err(JsValue::from_str(
            "wgpu initialization is only available on wasm32 targets",
        ))
    }

    pub fn resize_wgpu(_ctx: &mut WgpuContext, _width: u32, _height: u32) {}

    pub fn has_month_texture(_ctx: &WgpuContext, _month_index: usize) -> bool {
        false
    }

    pub fn upload_month_texture(_ctx: &mut WgpuContext, _month_index: usize, _image: &DecodedImage) {}

    pub fn set_boundary_lines(_ctx: &mut WgpuContext, _positions: &[[f32; 3]]) {}

    pub fn set_hover_mesh(_ctx: &mut WgpuContext, _mesh: Option<(&[[f32; 3]], &[u32])>) {}

    pub fn render(
        _ctx: &WgpuContext,
        _globals: &FrameGlobals,
        _month_index: Option<usize>,
    ) -> Result<(), JsValue> {
        Err(JsValue::from_str(
            "wgpu rendering is only available on wasm32 targets",
        ))
    }
}

pub use imp::{
    WgpuContext, has_month_texture, init_wgpu_from_canvas_id, render, resize_wgpu,
    set_boundary_lines, set_hover_mesh, upload_month_texture,
};
