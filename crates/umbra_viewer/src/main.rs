use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use umbra_core::{cornell_box, load_obj, GeometryStore};
use umbra_display::Presenter;
use umbra_tracer::{
    enumerate_devices, DeviceKind, FrameBuffer, FrameSink, PngSink, RenderConfig, RenderContext,
    Renderer,
};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Intersection backend names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceArg {
    #[value(alias = "bvh")]
    Cpu,
    Embree,
}

impl From<DeviceArg> for DeviceKind {
    fn from(device: DeviceArg) -> Self {
        match device {
            DeviceArg::Cpu => DeviceKind::Cpu,
            DeviceArg::Embree => DeviceKind::Embree,
        }
    }
}

/// Command line options.
#[derive(Debug, Parser)]
#[command(name = "umbra_viewer")]
#[command(about = "Ray-traced visibility and hard shadows for a triangle scene")]
struct Options {
    /// OBJ scene to render (defaults to the built-in Cornell Box)
    scene: Option<PathBuf>,

    /// JSON render configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the frame to this PNG file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render without opening a window
    #[arg(long)]
    headless: bool,

    /// Intersection backend (overrides the config file)
    #[arg(long, value_enum)]
    device: Option<DeviceArg>,

    /// Print the available intersection backends and exit
    #[arg(long)]
    list_devices: bool,
}

/// Application state
struct App {
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    frame: FrameBuffer,
    background: [u8; 4],
}

impl App {
    fn new(frame: FrameBuffer, background: [u8; 4]) -> Self {
        Self {
            window: None,
            presenter: None,
            frame,
            background,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title("Umbra")
            .with_inner_size(winit::dpi::PhysicalSize::new(self.frame.width, self.frame.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        // Initialize presenter (async in pollster block)
        let mut presenter = pollster::block_on(Presenter::new(window.clone()))?;
        presenter.set_clear_color(self.background);
        if let Err(e) = presenter.present(&self.frame) {
            log::warn!("First present failed, retrying on redraw: {:#}", e);
        }
        window.request_redraw();

        self.window = Some(window);
        self.presenter = Some(presenter);

        log::info!("Window and presenter initialized");
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                log::error!("Failed to open window: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(physical_size) => {
                if let Some(presenter) = &mut self.presenter {
                    presenter.resize((physical_size.width, physical_size.height));
                    log::info!("Resized to {}x{}", physical_size.width, physical_size.height);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(presenter) = &mut self.presenter else {
                    return;
                };

                if let Err(e) = presenter.render() {
                    // Check if it's a surface error we can handle
                    match e.downcast_ref::<wgpu::SurfaceError>() {
                        Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            presenter.resize(presenter.size);
                            if let Some(window) = &self.window {
                                window.request_redraw();
                            }
                        }
                        Some(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("Out of memory!");
                            event_loop.exit();
                        }
                        Some(surface_err) => log::error!("Surface error: {:?}", surface_err),
                        None => log::error!("Render error: {:?}", e),
                    }
                }
            }
            _ => {}
        }
    }
}

fn load_scene(path: Option<&PathBuf>) -> Result<GeometryStore> {
    match path {
        Some(path) => {
            log::info!("Loading scene: {}", path.display());
            load_obj(path).with_context(|| format!("failed to load {}", path.display()))
        }
        None => {
            log::info!("No scene given, using the built-in Cornell Box");
            Ok(cornell_box())
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let options = Options::parse();

    if options.list_devices {
        for device in enumerate_devices() {
            println!("{:<8} {} ({} threads)", device.kind, device.name, device.threads);
        }
        return Ok(());
    }

    log::info!("Starting Umbra");

    let mut config = match &options.config {
        Some(path) => RenderConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    if let Some(device) = options.device {
        config.device = Some(device.into());
    }

    let background = config.background;
    let store = load_scene(options.scene.as_ref())?;
    let renderer = Renderer::new(RenderContext::new(store, &config), config.device)?;
    let frame = renderer.render_frame()?;

    if let Some(output) = &options.output {
        PngSink::new(output).present(&frame.image)?;
    }

    if options.headless {
        if options.output.is_none() {
            log::warn!("--headless without --output: the frame is discarded");
        }
        return Ok(());
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(frame.image, background);

    log::info!("Running event loop");
    event_loop.run_app(&mut app)?;

    Ok(())
}
