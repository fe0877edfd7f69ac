// Renderer and window event loop for the editor

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec2, Vec3};
use wgpu::util::DeviceExt;
use winit::{
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{DeviceEvent, ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, CursorIcon, Fullscreen, Window, WindowBuilder},
};

use crate::assets::{AssetLibrary, TextureImage};
use crate::config::{EditorConfig, WindowConfig};
use crate::drawable::{Canvas, Drawable};
use crate::editor::{EditorSession, Effect, Mode, Prompt, EDIT_PLANE_EXTENT};
use crate::input::{self, Command, ZOOM_STEP};
use crate::material::{Material, MaterialType};
use crate::timing::{FrameTiming, TickScheduler};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Two white directional lights shining down from either side of z
const LIGHT_DIRECTIONS: [Vec3; 2] = [Vec3::new(0.0, 1.0, -1.0), Vec3::new(0.0, 1.0, 1.0)];
const LIGHT_INTENSITY: f32 = 0.5;
const GLOBAL_AMBIENT: f32 = 0.2;

const FIELD_OF_VIEW: f32 = 60.0;
const NEAR_PLANE: f32 = 0.01;
const FAR_PLANE: f32 = 100.0;
/// Top view camera height above the editing plane
const TOP_VIEW_EYE: f32 = 0.9;
/// Degrees the 3D edit view turns per dragged pixel
const ORBIT_SPEED: f32 = 0.5;

const TOP_VIEW_BACKGROUND: [f32; 3] = [1.0, 1.0, 1.0];
const GRID_SPACING: f32 = 0.1;
const GRID_LIFT: f32 = 0.002;
const MARKER_SIZE: f32 = 0.03;

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter found")]
    NoAdapter,
    #[error("failed to acquire device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
    uv: [f32; 2],
    /// 1.0 when the fragment samples the bound texture
    textured: f32,
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2, 3 => Float32];

    fn plain(position: Vec3, color: [f32; 3]) -> Self {
        Self {
            position: position.to_array(),
            color,
            uv: [0.0; 2],
            textured: 0.0,
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// Uniform buffer structure for MVP matrix
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    mvp: [[f32; 4]; 4],
}

impl Uniforms {
    fn new(mvp: Mat4) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
        }
    }
}

/// Pixel rectangle of the window a view draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Viewport {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Viewport {
    fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewKind {
    /// First-person view of the navigator
    Walk,
    /// Orthographic top view of the editing plane
    Top,
    /// Perspective view the user turns and zooms
    Orbit,
}

#[derive(Debug, Clone, Copy)]
struct ViewSetup {
    kind: ViewKind,
    viewport: Viewport,
    mvp: Mat4,
    /// Eye position in world space, for the specular term
    eye: Vec3,
}

/// Views to draw this frame. Edit mode splits the window into the top view
/// on the left and the 3D view on the right.
fn view_setups(session: &EditorSession, width: u32, height: u32) -> Vec<ViewSetup> {
    let fov = FIELD_OF_VIEW.to_radians();
    match session.mode() {
        Mode::Navigation => {
            let viewport = Viewport {
                x: 0,
                y: 0,
                width,
                height,
            };
            let player = session.player();
            let projection = Mat4::perspective_rh(fov, viewport.aspect(), NEAR_PLANE, FAR_PLANE);
            vec![ViewSetup {
                kind: ViewKind::Walk,
                viewport,
                mvp: projection * player.view(),
                eye: player.position(),
            }]
        }
        Mode::Edit => {
            let half = width / 2;
            let left = Viewport {
                x: 0,
                y: 0,
                width: half,
                height,
            };
            let right = Viewport {
                x: half,
                y: 0,
                width: width - half,
                height,
            };

            // Looking down -y with +x up the screen puts +z on the right
            let top_eye = Vec3::Y * TOP_VIEW_EYE;
            let top_view = Mat4::look_at_rh(top_eye, Vec3::ZERO, Vec3::X);
            let extent = EDIT_PLANE_EXTENT;
            let top_projection = Mat4::orthographic_rh(-extent, extent, -extent, extent, -extent, extent);

            let edit_view = session.edit_view();
            let orbit_eye = Vec3::Y * edit_view.camera_height;
            let model = Mat4::from_rotation_z(edit_view.rotation_z.to_radians())
                * Mat4::from_rotation_x(edit_view.rotation_x.to_radians());
            let orbit_projection = Mat4::perspective_rh(fov, right.aspect(), NEAR_PLANE, FAR_PLANE);
            let orbit_view = Mat4::look_at_rh(orbit_eye, Vec3::ZERO, Vec3::X);

            vec![
                ViewSetup {
                    kind: ViewKind::Top,
                    viewport: left,
                    mvp: top_projection * top_view,
                    eye: top_eye,
                },
                ViewSetup {
                    kind: ViewKind::Orbit,
                    viewport: right,
                    mvp: orbit_projection * orbit_view * model,
                    eye: model.inverse().transform_point3(orbit_eye),
                },
            ]
        }
    }
}

struct Batch {
    texture: Option<u32>,
    vertices: Vec<Vertex>,
}

/// Geometry of one view, triangles grouped by texture.
#[derive(Default)]
struct ViewGeometry {
    triangles: Vec<Vertex>,
    batches: Vec<(Option<u32>, Range<u32>)>,
    lines: Vec<Vertex>,
}

/// Collects what drawables emit into lit vertices, starting a new batch
/// whenever the bound texture changes.
struct FrameBuilder {
    eye: Vec3,
    material: Material,
    color: Option<[f32; 3]>,
    texturing: bool,
    line_color: [f32; 3],
    batches: Vec<Batch>,
    lines: Vec<Vertex>,
}

impl FrameBuilder {
    fn new(eye: Vec3) -> Self {
        Self {
            eye,
            material: MaterialType::default().properties(),
            color: None,
            texturing: false,
            line_color: [1.0; 3],
            batches: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn bind_texture(&mut self, texture: Option<u32>) {
        if self.batches.last().map(|batch| batch.texture) != Some(texture) {
            self.batches.push(Batch {
                texture,
                vertices: Vec::new(),
            });
        }
    }

    fn draw(&mut self, drawable: &dyn Drawable) {
        self.bind_texture(drawable.has_texture().then(|| drawable.texture_id()));
        drawable.draw(self);
    }

    fn draw_wireframe(&mut self, drawable: &dyn Drawable, color: [f32; 3]) {
        self.line_color = color;
        drawable.draw_wireframe(self);
    }

    fn colored_line(&mut self, from: Vec3, to: Vec3, color: [f32; 3]) {
        self.lines.push(Vertex::plain(from, color));
        self.lines.push(Vertex::plain(to, color));
    }

    /// Flat quad covering the editing plane below everything else
    fn backdrop(&mut self, height: f32, color: [f32; 3]) {
        self.bind_texture(None);
        let e = EDIT_PLANE_EXTENT;
        let corners = [
            Vec3::new(-e, height, -e),
            Vec3::new(e, height, -e),
            Vec3::new(e, height, e),
            Vec3::new(-e, height, e),
        ];
        if let Some(batch) = self.batches.last_mut() {
            for index in [0, 1, 2, 0, 2, 3] {
                batch.vertices.push(Vertex::plain(corners[index], color));
            }
        }
    }

    fn grid(&mut self, color: [f32; 3]) {
        let e = EDIT_PLANE_EXTENT;
        let steps = (e / GRID_SPACING).round() as i32;
        for step in -steps..=steps {
            let offset = step as f32 * GRID_SPACING;
            self.colored_line(
                Vec3::new(offset, GRID_LIFT, -e),
                Vec3::new(offset, GRID_LIFT, e),
                color,
            );
            self.colored_line(
                Vec3::new(-e, GRID_LIFT, offset),
                Vec3::new(e, GRID_LIFT, offset),
                color,
            );
        }
    }

    fn axes(&mut self) {
        let origin = Vec3::Y * GRID_LIFT * 2.0;
        self.colored_line(origin, origin + Vec3::X * 0.5, [1.0, 0.0, 0.0]);
        self.colored_line(origin, origin + Vec3::Y * 0.5, [0.0, 1.0, 0.0]);
        self.colored_line(origin, origin + Vec3::Z * 0.5, [0.0, 0.0, 1.0]);
    }

    fn marker(&mut self, at: Vec3, color: [f32; 3]) {
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            self.colored_line(at - axis * MARKER_SIZE, at + axis * MARKER_SIZE, color);
        }
    }

    /// Color of a triangle with the given normal and centroid: global
    /// ambient plus ambient, diffuse and specular from each light, lit on
    /// both sides.
    fn shade(&self, normal: Vec3, centroid: Vec3) -> [f32; 3] {
        let (ambient, diffuse, specular, shininess) = match self.color {
            Some(rgb) => {
                let rgb = Vec3::from(rgb);
                (rgb, rgb, Vec3::ZERO, 1.0)
            }
            None => (
                Vec3::from_slice(&self.material.ambient),
                Vec3::from_slice(&self.material.diffuse),
                Vec3::from_slice(&self.material.specular),
                self.material.shininess,
            ),
        };
        let to_eye = (self.eye - centroid).normalize_or_zero();

        let mut color = ambient * GLOBAL_AMBIENT;
        for direction in LIGHT_DIRECTIONS {
            let light = direction.normalize();
            let lambert = normal.dot(light).abs();
            color += (ambient + diffuse * lambert) * LIGHT_INTENSITY;
            if lambert > 0.0 {
                let half = (light + to_eye).normalize_or_zero();
                color += specular * LIGHT_INTENSITY * normal.dot(half).abs().powf(shininess);
            }
        }
        color.min(Vec3::ONE).to_array()
    }

    fn finish(self) -> ViewGeometry {
        let mut geometry = ViewGeometry {
            lines: self.lines,
            ..ViewGeometry::default()
        };
        for batch in self.batches {
            if batch.vertices.is_empty() {
                continue;
            }
            let start = geometry.triangles.len() as u32;
            geometry.triangles.extend(batch.vertices);
            geometry
                .batches
                .push((batch.texture, start..geometry.triangles.len() as u32));
        }
        geometry
    }
}

impl Canvas for FrameBuilder {
    fn set_material(&mut self, material: MaterialType) {
        self.material = material.properties();
    }

    fn set_color(&mut self, color: Option<[f32; 3]>) {
        self.color = color;
    }

    fn set_texturing(&mut self, enabled: bool) {
        self.texturing = enabled;
    }

    fn triangle(&mut self, positions: [Vec3; 3], uvs: [Vec2; 3]) {
        let [a, b, c] = positions;
        let normal = (b - a).cross(c - a).normalize_or_zero();
        let color = self.shade(normal, (a + b + c) / 3.0);
        if self.batches.is_empty() {
            self.bind_texture(None);
        }
        let textured = self.texturing
            && self
                .batches
                .last()
                .is_some_and(|batch| batch.texture.is_some());
        if let Some(batch) = self.batches.last_mut() {
            for (position, uv) in positions.into_iter().zip(uvs) {
                batch.vertices.push(Vertex {
                    position: position.to_array(),
                    color,
                    uv: uv.to_array(),
                    textured: if textured { 1.0 } else { 0.0 },
                });
            }
        }
    }

    fn line(&mut self, from: Vec3, to: Vec3) {
        let color = self.line_color;
        self.colored_line(from, to, color);
    }
}

/// Build the geometry of one view from the session state
fn build_view(setup: &ViewSetup, session: &EditorSession, assets: &AssetLibrary) -> ViewGeometry {
    let mut builder = FrameBuilder::new(setup.eye);
    let editing = setup.kind != ViewKind::Walk;
    let wire_color = if setup.kind == ViewKind::Top {
        [0.1, 0.1, 0.1]
    } else {
        [0.9, 0.9, 0.9]
    };

    if setup.kind == ViewKind::Top {
        builder.backdrop(-EDIT_PLANE_EXTENT + TOP_VIEW_EYE + GRID_LIFT, TOP_VIEW_BACKGROUND);
    }

    let drawables = session
        .scene()
        .drawables()
        .chain(assets.showcase().iter().map(|object| object as &dyn Drawable));
    for drawable in drawables {
        if session.wireframe() {
            builder.draw_wireframe(drawable, wire_color);
        } else {
            builder.draw(drawable);
        }
    }

    if editing {
        builder.grid([0.6, 0.6, 0.6]);
        builder.axes();
        if let Some(group) = session.current_group() {
            for point in group.wall().points() {
                builder.marker(*point + Vec3::Y * GRID_LIFT, [1.0, 0.5, 0.0]);
            }
        }
        if let Some(position) = session.highlight_position() {
            builder.marker(position, [1.0, 0.0, 0.0]);
        }
    }
    builder.finish()
}

/// One view's buffers, ready for a render pass.
struct PreparedView {
    viewport: Viewport,
    uniforms: wgpu::BindGroup,
    triangles: Option<wgpu::Buffer>,
    batches: Vec<(Option<u32>, Range<u32>)>,
    lines: Option<(wgpu::Buffer, u32)>,
}

/// Editor state driven by the event loop.
pub struct App {
    session: EditorSession,
    assets: AssetLibrary,
    title: String,
    timing: FrameTiming,
    movement: TickScheduler,
    cursor: PhysicalPosition<f64>,
    orbiting: bool,
}

impl App {
    pub fn new(session: EditorSession, assets: AssetLibrary, config: &EditorConfig) -> Self {
        Self {
            session,
            assets,
            title: config.window.title.clone(),
            timing: FrameTiming::new(Instant::now()),
            movement: TickScheduler::new(Duration::from_millis(config.movement.tick_ms)),
            cursor: PhysicalPosition::new(0.0, 0.0),
            orbiting: false,
        }
    }
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
    triangle_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: HashMap<u32, wgpu::BindGroup>,
    blank_texture: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
}

impl Renderer {
    pub async fn new(event_loop: &EventLoop<()>, config: &WindowConfig) -> Result<Self, RendererError> {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(&config.title)
                .with_inner_size(LogicalSize::new(config.width, config.height))
                .build(event_loop)?,
        );

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter)?;
        log::info!("Using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RendererError::NoSurfaceFormat)?;

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let triangle_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            wgpu::PrimitiveTopology::LineList,
        );

        // Textures repeat, like the wall UVs expect
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let depth_view = create_depth_view(&device, surface_config.width, surface_config.height);

        // Bound wherever nothing is textured; white leaves colors unchanged
        let blank_texture = create_texture_bind_group(
            &device,
            &queue,
            &texture_layout,
            &sampler,
            "Blank Texture",
            &TextureImage {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            },
        );

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            window,
            triangle_pipeline,
            line_pipeline,
            uniform_layout,
            texture_layout,
            sampler,
            textures: HashMap::new(),
            blank_texture,
            depth_view,
        })
    }

    pub fn run(mut self, event_loop: EventLoop<()>, mut app: App) -> Result<(), RendererError> {
        self.upload_textures(&app.assets);
        self.apply_mode(app.session.mode());

        event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                    self.handle_window_event(event, target, &mut app);
                }
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta: (dx, dy) },
                    ..
                } => {
                    if app.session.mode() == Mode::Navigation {
                        self.dispatch(
                            Command::Look {
                                dx: dx as f32,
                                dy: dy as f32,
                            },
                            target,
                            &mut app,
                        );
                    }
                }
                Event::AboutToWait => {
                    self.window.request_redraw();
                }
                _ => {}
            }
        })?;
        Ok(())
    }

    fn handle_window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<()>, app: &mut App) {
        match event {
            WindowEvent::CloseRequested => target.exit(),
            WindowEvent::Resized(physical_size) => self.resize(physical_size),
            WindowEvent::RedrawRequested => self.update_and_render(app),
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard_input(event, target, app),
            WindowEvent::CursorMoved { position, .. } => {
                if app.orbiting && app.session.mode() == Mode::Edit {
                    let dx = (position.x - app.cursor.x) as f32 * ORBIT_SPEED;
                    let dy = (position.y - app.cursor.y) as f32 * ORBIT_SPEED;
                    self.dispatch(Command::Orbit { dx, dy }, target, app);
                }
                app.cursor = position;
            }
            WindowEvent::MouseInput { state, button, .. } => match (button, state) {
                (MouseButton::Left, ElementState::Pressed) => {
                    let size = self.window.inner_size();
                    app.orbiting = app.cursor.x >= f64::from(size.width / 2);
                    let place = Command::Place {
                        x: app.cursor.x as f32,
                        y: app.cursor.y as f32,
                        width: size.width as f32,
                        height: size.height as f32,
                    };
                    self.dispatch(place, target, app);
                }
                (MouseButton::Left, ElementState::Released) => app.orbiting = false,
                (MouseButton::Right, ElementState::Pressed) => {
                    self.dispatch(Command::RemoveWallPoint, target, app);
                }
                _ => {}
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                // Scrolling up brings the camera closer
                if notches != 0.0 {
                    self.dispatch(Command::Zoom(-notches.signum() * ZOOM_STEP), target, app);
                }
            }
            _ => {}
        }
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent, target: &EventLoopWindowTarget<()>, app: &mut App) {
        let PhysicalKey::Code(keycode) = event.physical_key else {
            return;
        };
        let is_pressed = event.state == ElementState::Pressed;
        if let Some(direction) = input::movement_key(keycode) {
            self.dispatch(Command::Hold(direction, is_pressed), target, app);
        }
        if is_pressed && !event.repeat {
            if let Some(command) = input::command_for_key(app.session.mode(), keycode) {
                self.dispatch(command, target, app);
            }
        }
    }

    fn dispatch(&mut self, command: Command, target: &EventLoopWindowTarget<()>, app: &mut App) {
        match app.session.apply(command) {
            Effect::None => {}
            Effect::ModeChanged(mode) => {
                self.apply_mode(mode);
                app.movement.reset();
                app.orbiting = false;
            }
            Effect::Fullscreen(enabled) => {
                self.window
                    .set_fullscreen(enabled.then_some(Fullscreen::Borderless(None)));
            }
            Effect::Prompt(prompt) => {
                run_prompt(prompt, &mut app.session);
                app.movement.reset();
            }
            Effect::Quit => target.exit(),
        }
    }

    /// Grab and hide the cursor while walking, free it while editing
    fn apply_mode(&self, mode: Mode) {
        match mode {
            Mode::Navigation => {
                let grabbed = self
                    .window
                    .set_cursor_grab(CursorGrabMode::Confined)
                    .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked));
                if let Err(err) = grabbed {
                    log::warn!("Could not grab the cursor: {}", err);
                }
                self.window.set_cursor_visible(false);
            }
            Mode::Edit => {
                if let Err(err) = self.window.set_cursor_grab(CursorGrabMode::None) {
                    log::debug!("Could not release the cursor: {}", err);
                }
                self.window.set_cursor_visible(true);
                self.window.set_cursor_icon(CursorIcon::Crosshair);
            }
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, new_size.width, new_size.height);
    }

    fn upload_textures(&mut self, assets: &AssetLibrary) {
        let max_dimension = self.device.limits().max_texture_dimension_2d;
        for (id, image) in assets.textures() {
            if image.width == 0 || image.height == 0 || image.width.max(image.height) > max_dimension {
                log::warn!("Texture {} is {}x{}, skipped", id, image.width, image.height);
                continue;
            }
            let bind_group = create_texture_bind_group(
                &self.device,
                &self.queue,
                &self.texture_layout,
                &self.sampler,
                &format!("Texture {}", id),
                image,
            );
            self.textures.insert(id, bind_group);
        }
        log::debug!("{} textures uploaded", self.textures.len());
    }

    fn update_and_render(&mut self, app: &mut App) {
        let now = Instant::now();
        if let Some(fps) = app.timing.update(now) {
            self.window
                .set_title(&app.session.status_line(&app.title, fps));
        }
        if app.session.mode() == Mode::Navigation {
            for _ in 0..app.movement.due(now) {
                app.session.tick();
            }
        }
        self.render(&app.session, &app.assets);
    }

    fn prepare_view(&self, setup: &ViewSetup, geometry: ViewGeometry) -> PreparedView {
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new(setup.mvp)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let uniforms = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let triangles = (!geometry.triangles.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Triangle Buffer"),
                contents: bytemuck::cast_slice(&geometry.triangles),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
        let lines = (!geometry.lines.is_empty()).then(|| {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Line Buffer"),
                contents: bytemuck::cast_slice(&geometry.lines),
                usage: wgpu::BufferUsages::VERTEX,
            });
            (buffer, geometry.lines.len() as u32)
        });

        PreparedView {
            viewport: setup.viewport,
            uniforms,
            triangles,
            batches: geometry.batches,
            lines,
        }
    }

    fn draw_view<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, view: &'a PreparedView) {
        let viewport = view.viewport;
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }
        render_pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        render_pass.set_scissor_rect(viewport.x, viewport.y, viewport.width, viewport.height);
        render_pass.set_bind_group(0, &view.uniforms, &[]);

        if let Some(buffer) = &view.triangles {
            render_pass.set_pipeline(&self.triangle_pipeline);
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            for (texture, range) in &view.batches {
                let bind_group = texture
                    .and_then(|id| self.textures.get(&id))
                    .unwrap_or(&self.blank_texture);
                render_pass.set_bind_group(1, bind_group, &[]);
                render_pass.draw(range.clone(), 0..1);
            }
        }

        if let Some((buffer, count)) = &view.lines {
            render_pass.set_pipeline(&self.line_pipeline);
            render_pass.set_bind_group(1, &self.blank_texture, &[]);
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            render_pass.draw(0..*count, 0..1);
        }
    }

    fn render(&mut self, session: &EditorSession, assets: &AssetLibrary) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface is out of memory");
                return;
            }
            Err(err) => {
                log::debug!("Surface lost ({}), reconfiguring", err);
                self.resize(self.window.inner_size());
                return;
            }
        };

        let views: Vec<PreparedView> =
            view_setups(session, self.surface_config.width, self.surface_config.height)
                .iter()
                .map(|setup| self.prepare_view(setup, build_view(setup, session, assets)))
                .collect();

        let target = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for view in &views {
                self.draw_view(&mut render_pass, view);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(match topology {
            wgpu::PrimitiveTopology::LineList => "Line Pipeline",
            _ => "Triangle Pipeline",
        }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader_module,
            entry_point: "vs_main",
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader_module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Walls and imported meshes are seen from both sides
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    image: &TextureImage,
) -> wgpu::BindGroup {
    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width),
            rows_per_image: Some(image.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Ask for the paths a prompt needs on the console, then run it.
/// The window stops updating while waiting.
fn run_prompt(prompt: Prompt, session: &mut EditorSession) {
    match prompt {
        Prompt::SaveScene => {
            let Some(path) = ask("Save scene to: ") else {
                return;
            };
            let path = PathBuf::from(path);
            if let Err(err) = session.save_scene(&path) {
                log::warn!("Could not save {}: {}", path.display(), err);
            }
        }
        Prompt::LoadScene => {
            let Some(path) = ask("Load scene from: ") else {
                return;
            };
            let path = PathBuf::from(path);
            if let Err(err) = session.load_scene(&path) {
                log::warn!("Could not load {}: {}", path.display(), err);
            }
        }
        Prompt::ImportPly => {
            let Some(path) = ask("PLY file: ") else {
                return;
            };
            let path = PathBuf::from(path);
            if let Err(err) = session.import_ply(&path) {
                log::warn!("Could not import {}: {}", path.display(), err);
                return;
            }
            // Keeps the file name when left empty
            if let Some(name) = ask("PLY name: ") {
                session.rename_current_ply(name);
            }
        }
    }
}

/// One trimmed line from stdin; `None` when empty or unreadable
fn ask(question: &str) -> Option<String> {
    print!("{}", question);
    std::io::stdout().flush().ok()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).ok()?;
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}
