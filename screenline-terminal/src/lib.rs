/// Terminal host for screenline: spins a wireframe cube drawn with thick lines
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent},
    execute, queue,
    style::{self, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use screenline_core::transform::rotation;
use screenline_core::{
    Color, Eye, FrameOutcome, MeshGeometry, Model, NodeId, NodeKind, PerspectiveCamera, Pt3, Rect,
    Real, SceneError, SceneGraph, ThickLine, Viewport,
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Tunables for the terminal demo.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalConfig {
    /// Line width in terminal cells.
    pub thickness: Real,
    pub target_fps: u32,
    /// Horizontal field of view in degrees.
    pub field_of_view: Real,
    pub camera_distance: Real,
}

impl TerminalConfig {
    /// Defaults overridden by `SCREENLINE_THICKNESS` and `SCREENLINE_FPS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(thickness) = env_value("SCREENLINE_THICKNESS") {
            config.thickness = thickness;
        }
        if let Some(fps) = env_value::<u32>("SCREENLINE_FPS") {
            config.target_fps = fps.max(1);
        }
        config
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            thickness: 1.5,
            target_fps: 30,
            field_of_view: 70.0,
            camera_distance: 5.0,
        }
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

/// Accumulated spin of the model, in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Spin {
    pitch: Real,
    yaw: Real,
    roll: Real,
}

/// Scene, line overlay and terminal rasterizer for one session.
pub struct TerminalApp {
    config: TerminalConfig,
    graph: SceneGraph,
    viewport: NodeId,
    model: NodeId,
    line: ThickLine,
    spin: Spin,
    renderer: AsciiRenderer,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(model: Model, config: TerminalConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Self::with_size(model, config, width as usize, height as usize)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
    }

    /// Build the scene for a `width` x `height` cell grid.
    pub fn with_size(
        model: Model,
        config: TerminalConfig,
        width: usize,
        height: usize,
    ) -> Result<Self, SceneError> {
        let eye = Eye::looking_at(Pt3::new(0.0, 0.0, config.camera_distance), Pt3::origin());
        let camera = PerspectiveCamera::new(eye, config.field_of_view, 0.1, 100.0);

        let mut graph = SceneGraph::new();
        let viewport = graph.add_viewport(Viewport::new(
            camera,
            Rect::from_size(width as Real, height as Real),
        ));
        let model_node = graph.add_child(viewport, NodeKind::Group, None)?;

        let mut line = ThickLine::new()
            .with_thickness(config.thickness)
            .with_color(Color::rgb(0.3, 0.9, 1.0));
        line.set_wireframe(&model);
        line.attach(model_node);
        info!(segments = line.segment_count(), width, height, "terminal scene ready");

        Ok(Self {
            config,
            graph,
            viewport,
            model: model_node,
            line,
            spin: Spin {
                pitch: 0.3,
                yaw: 0.3,
                roll: 0.0,
            },
            renderer: AsciiRenderer::new(width, height),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;
        self.line.detach();

        result
    }

    fn frame_time(&self) -> Duration {
        Duration::from_millis(1000 / self.config.target_fps.max(1) as u64)
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = self.frame_time();

        while self.running {
            let frame_start = Instant::now();

            if event::poll(Duration::from_millis(0))? {
                self.handle_event()?;
            }

            self.update();
            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self) -> io::Result<()> {
        match event::read()? {
            Event::Key(KeyEvent { code, .. }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.running = false,
                KeyCode::Char('w') | KeyCode::Up => self.spin.pitch += 0.1,
                KeyCode::Char('s') | KeyCode::Down => self.spin.pitch -= 0.1,
                KeyCode::Char('a') | KeyCode::Left => self.spin.yaw -= 0.1,
                KeyCode::Char('d') | KeyCode::Right => self.spin.yaw += 0.1,
                KeyCode::Char('e') => self.spin.roll += 0.1,
                KeyCode::Char('r') => self.spin.roll -= 0.1,
                KeyCode::Char('+') => self.adjust_thickness(0.5),
                KeyCode::Char('-') => self.adjust_thickness(-0.5),
                _ => {}
            },
            Event::Resize(width, height) => self.resize(width as usize, height as usize),
            _ => {}
        }
        Ok(())
    }

    fn adjust_thickness(&mut self, delta: Real) {
        let thickness = (self.line.thickness() + delta).max(0.5);
        self.line.set_thickness(thickness);
    }

    /// Follow a terminal resize; the next tick sees the new viewport matrix.
    pub fn resize(&mut self, width: usize, height: usize) {
        if let Ok(Some(viewport)) = self.graph.viewport_mut(self.viewport) {
            viewport.rect = Rect::from_size(width as Real, height as Real);
        }
        self.renderer = AsciiRenderer::new(width, height);
    }

    fn update(&mut self) {
        // Continuous slow rotation for demo effect
        self.spin.pitch += 0.01;
        self.spin.yaw += 0.015;

        let model = rotation(self.spin.pitch, self.spin.yaw, self.spin.roll);
        if let Err(err) = self.graph.set_transform(self.model, Some(model)) {
            warn!(%err, "model node vanished");
        }
    }

    /// Tick the line and rasterize it. Returns what the tick did.
    pub fn render_frame(&mut self) -> FrameOutcome {
        let outcome = match self.line.tick(&self.graph) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%err, "line overlay is not attached to a viewport");
                return FrameOutcome::Invalid;
            }
        };
        if outcome == FrameOutcome::Rebuilt {
            debug!(triangles = self.line.mesh().triangle_count(), "line rebuilt");
        }

        self.renderer.clear();
        if let Some(to_pixels) = self.line.viewport_transform() {
            self.renderer.render_line(self.line.mesh(), to_pixels);
        }
        outcome
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    fn render(&mut self) -> io::Result<()> {
        self.render_frame();

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout, tint(self.line.color()))?;

        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(style::Color::Yellow),
            Print(format!(
                "Screenline | FPS: {:.1} | width {:.1} | WASD/Arrows=Rotate E/R=Roll +/-=Width Q=Quit",
                self.fps,
                self.line.thickness()
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

fn tint(color: Color) -> style::Color {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    style::Color::Rgb {
        r: channel(color.r),
        g: channel(color.g),
        b: channel(color.b),
    }
}

/// The default demo model: a cube wireframe.
pub fn demo_model() -> Model {
    Model::mesh(MeshGeometry::cube(2.0))
}
