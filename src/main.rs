use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{
    ElementState, Event, KeyboardInput, MouseButton as WinitMouseButton, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use patina::app::{self, WindowViewport};
use patina::camera::Camera;
use patina::input::{InputState, KeyCode, MouseButton, NamedKey};
use patina::obj::load_obj_from_str;
use patina::render::{Renderer, RendererOptions};
use patina::scene::Scene;

const MOVE_SPEED: f32 = 4.0;
const TURN_SPEED: f32 = 1.5;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read scene {}", options.path))?;
    let scene = Scene::from_xml(&xml).context("failed to parse scene XML")?;
    let assets_dir = Path::new(&options.path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    println!(
        "Loaded scene with {} objects ({} directional, {} point lights)",
        scene.objects.len(),
        scene.directional_lights.len(),
        scene.point_lights.len()
    );
    for object in &scene.objects {
        println!(" - {} ({})", object.name, object.object_type);
    }

    if options.summary_only {
        run_headless(&scene, &assets_dir)
    } else {
        match run_interactive(scene.clone(), assets_dir.clone(), options.no_post) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(&scene, &assets_dir)
                } else {
                    Err(err)
                }
            }
        }
    }
}

fn run_headless(scene: &Scene, assets_dir: &Path) -> Result<()> {
    println!("Mesh report:");
    for object in scene.mesh_objects() {
        let Some(name) = object.mesh.as_deref() else {
            println!(" - {} uses the built-in cube", object.name);
            continue;
        };
        let loaded = fs::read_to_string(assets_dir.join(name))
            .map_err(anyhow::Error::from)
            .and_then(|data| load_obj_from_str(&data));
        match loaded {
            Ok(mesh) => println!(
                " - {name}: {} vertices, {} triangles",
                mesh.vertices.len(),
                mesh.triangle_count()
            ),
            Err(err) => println!(" - {name}: failed to load ({err})"),
        }
    }
    Ok(())
}

fn run_interactive(scene: Scene, assets_dir: PathBuf, no_post: bool) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Patina")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let renderer = block_on(Renderer::new(Arc::clone(&window), assets_dir))?;
    let viewport = WindowViewport::new(window.inner_size().width, window.inner_size().height);
    let camera = app::camera_from_scene(&scene);

    let mut app = AppState {
        renderer,
        scene,
        camera,
        input: InputState::new(),
        viewport,
        options: RendererOptions::default(),
        no_post,
        last_frame: Instant::now(),
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    app.shutdown();

    if let Some(err) = app.last_error {
        return Err(err);
    }

    Ok(())
}

struct AppState {
    renderer: Renderer,
    scene: Scene,
    camera: Camera,
    input: InputState,
    viewport: WindowViewport,
    options: RendererOptions,
    no_post: bool,
    last_frame: Instant,
    last_error: Option<anyhow::Error>,
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                        self.viewport.update(size.width, size.height);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                        self.viewport
                            .update(new_inner_size.width, new_inner_size.height);
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        self.handle_keyboard(input, control_flow);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        self.handle_mouse_button(*state, *button);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let pos = Vec2::new(position.x as f32, position.y as f32);
                        self.input.set_mouse_position(pos);
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                self.frame()?;
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn frame(&mut self) -> Result<()> {
        let now = Instant::now();
        let delta_time = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;

        self.drive_camera(delta_time);

        let (width, height) = self.viewport.size();
        let projection = app::projection_params(&self.scene, width, height);
        let view_projection = self.camera.view_projection(&projection);
        let params = app::fragment_params(&self.scene, self.camera.position, &self.options);

        self.renderer.update_globals(
            &view_projection,
            &params,
            &self.scene.directional_lights,
            &self.scene.point_lights,
            self.options.texturing,
        );

        let mut options = self.options.clone();
        if self.no_post {
            options.box_blur = false;
            options.gaussian_blur = false;
            options.sharpen = false;
            options.invert_colors = false;
        }

        if let Err(err) = self.renderer.render(&self.scene.objects, &options) {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    let size = self.renderer.window().inner_size();
                    self.renderer.resize(size);
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    info!("Surface timeout; retrying next frame");
                }
            }
        }
        Ok(())
    }

    /// WASD flight, Space/LeftShift for height, arrow keys to look around,
    /// Q/E to adjust the blur kernel size.
    fn drive_camera(&mut self, delta_time: f32) {
        let mut velocity = Vec3::ZERO;
        let forward = self.camera.look_direction();
        if self.input.is_key_down(KeyCode::Character('W')) {
            velocity += forward;
        }
        if self.input.is_key_down(KeyCode::Character('S')) {
            velocity -= forward;
        }
        if self.input.is_key_down(KeyCode::Character('A')) {
            velocity += self.camera.relative_left();
        }
        if self.input.is_key_down(KeyCode::Character('D')) {
            velocity += self.camera.relative_right();
        }
        if self.input.is_key_down(KeyCode::Named(NamedKey::Space)) {
            velocity += Vec3::Y;
        }
        if self.input.is_key_down(KeyCode::Named(NamedKey::LeftShift)) {
            velocity -= Vec3::Y;
        }
        self.camera.velocity = velocity.normalize_or_zero() * MOVE_SPEED;
        self.camera.advance(delta_time);

        if self.input.is_key_down(KeyCode::Named(NamedKey::Left)) {
            self.camera.yaw -= TURN_SPEED * delta_time;
        }
        if self.input.is_key_down(KeyCode::Named(NamedKey::Right)) {
            self.camera.yaw += TURN_SPEED * delta_time;
        }
        if self.input.is_key_down(KeyCode::Named(NamedKey::Up)) {
            self.camera.pitch += TURN_SPEED * delta_time;
        }
        if self.input.is_key_down(KeyCode::Named(NamedKey::Down)) {
            self.camera.pitch -= TURN_SPEED * delta_time;
        }
        self.camera.pitch = self.camera.pitch.clamp(-1.5, 1.5);

        if self.input.is_key_down(KeyCode::Character('Q')) {
            self.options.blur_size = (self.options.blur_size - 0.5 * delta_time).max(0.0);
        }
        if self.input.is_key_down(KeyCode::Character('E')) {
            self.options.blur_size = (self.options.blur_size + 0.5 * delta_time).min(0.99);
        }
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput, control_flow: &mut ControlFlow) {
        let Some(keycode) = input.virtual_keycode.and_then(map_keycode) else {
            return;
        };
        match input.state {
            ElementState::Pressed => {
                if keycode == KeyCode::Named(NamedKey::Escape) {
                    control_flow.set_exit();
                    return;
                }
                if let KeyCode::Digit(digit) = keycode {
                    self.toggle_option(digit);
                }
                self.input.set_key_down(keycode);
            }
            ElementState::Released => self.input.set_key_up(keycode),
        }
    }

    fn toggle_option(&mut self, digit: u8) {
        let options = &mut self.options;
        match digit {
            1 => options.box_blur = !options.box_blur,
            2 => options.gaussian_blur = !options.gaussian_blur,
            3 => options.sharpen = !options.sharpen,
            4 => options.invert_colors = !options.invert_colors,
            5 => options.texturing = !options.texturing,
            6 => options.specular_highlights = !options.specular_highlights,
            _ => return,
        }
        info!("renderer options now {:?}", self.options);
    }

    fn handle_mouse_button(&self, state: ElementState, button: WinitMouseButton) {
        let index = match button {
            WinitMouseButton::Left => 0,
            WinitMouseButton::Right => 1,
            WinitMouseButton::Middle => 2,
            WinitMouseButton::Other(value) => value,
        } as u8;
        let button = MouseButton::new(index);
        match state {
            ElementState::Pressed => self.input.set_mouse_button_down(button),
            ElementState::Released => self.input.set_mouse_button_up(button),
        }
    }

    fn shutdown(&mut self) {
        println!(
            "Final camera state: pos=({:.2}, {:.2}, {:.2}) yaw={:.2} pitch={:.2}",
            self.camera.position.x,
            self.camera.position.y,
            self.camera.position.z,
            self.camera.yaw,
            self.camera.pitch
        );
    }
}

fn map_keycode(code: winit::event::VirtualKeyCode) -> Option<KeyCode> {
    use winit::event::VirtualKeyCode as Key;
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::Left => KeyCode::Named(NamedKey::Left),
        Key::Right => KeyCode::Named(NamedKey::Right),
        Key::Up => KeyCode::Named(NamedKey::Up),
        Key::Down => KeyCode::Named(NamedKey::Down),
        Key::LShift => KeyCode::Named(NamedKey::LeftShift),
        Key::RShift => KeyCode::Named(NamedKey::RightShift),
        Key::LControl => KeyCode::Named(NamedKey::LeftCtrl),
        Key::RControl => KeyCode::Named(NamedKey::RightCtrl),
        Key::Key1 => KeyCode::Digit(1),
        Key::Key2 => KeyCode::Digit(2),
        Key::Key3 => KeyCode::Digit(3),
        Key::Key4 => KeyCode::Digit(4),
        Key::Key5 => KeyCode::Digit(5),
        Key::Key6 => KeyCode::Digit(6),
        Key::A => KeyCode::Character('A'),
        Key::D => KeyCode::Character('D'),
        Key::E => KeyCode::Character('E'),
        Key::Q => KeyCode::Character('Q'),
        Key::S => KeyCode::Character('S'),
        Key::W => KeyCode::Character('W'),
        _ => return None,
    })
}

struct CliOptions {
    path: String,
    summary_only: bool,
    no_post: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: patina <scene.xml> [--summary-only] [--no-post]"
            ));
        };
        let mut summary_only = false;
        let mut no_post = false;
        for arg in args {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--no-post" => no_post = true,
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --summary-only or --no-post"
                    ));
                }
            }
        }
        Ok(Self {
            path,
            summary_only,
            no_post,
        })
    }
}
