/// Terminal-based wireframe viewer for Lathe3D scenes
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use lathe3d_core::{NodeId, Scene};
use log::{debug, warn};
use std::io::{self, stdout, Write};

pub mod config;
pub mod renderer;

pub use config::ViewerConfig;
pub use renderer::AsciiRenderer;

const HELP: &str = "WASD/Arrows=Rotate +/-=Zoom R=Revolve Q=Quit";

/// Main application struct for terminal scene viewing
pub struct TerminalApp {
    scene: Scene,
    camera: NodeId,
    renderer: AsciiRenderer,
    config: ViewerConfig,
    status: String,
    running: bool,
}

impl TerminalApp {
    pub fn new(scene: Scene, config: ViewerConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Self::with_size(scene, config, width as usize, height as usize)
    }

    /// Build a viewer for a grid of the given size without touching the terminal
    pub fn with_size(
        scene: Scene,
        config: ViewerConfig,
        width: usize,
        height: usize,
    ) -> io::Result<Self> {
        let camera = *scene
            .cameras()
            .first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "scene has no camera"))?;
        // Top row is the status line
        let renderer = AsciiRenderer::with_ramp(width, height.saturating_sub(1), &config.edge_ramp);

        let mut app = Self {
            scene,
            camera,
            renderer,
            config,
            status: String::new(),
            running: true,
        };
        app.fit_camera();
        Ok(app)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        self.render()?;

        // Redraw only in response to input; nothing animates on its own
        while self.running {
            match event::read()? {
                Event::Key(key) => {
                    self.handle_key(key);
                    self.render()?;
                }
                Event::Resize(width, height) => {
                    self.renderer
                        .resize(width as usize, (height as usize).saturating_sub(1));
                    self.fit_camera();
                    self.render()?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let model = self.scene.mesh_node();
        let step = self.config.rotation_step;

        let drag = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
                None
            }
            KeyCode::Char('w') | KeyCode::Up => Some((0.0, -1.0)),
            KeyCode::Char('s') | KeyCode::Down => Some((0.0, 1.0)),
            KeyCode::Char('a') | KeyCode::Left => Some((-1.0, 0.0)),
            KeyCode::Char('d') | KeyCode::Right => Some((1.0, 0.0)),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.zoom(self.config.zoom_step);
                None
            }
            KeyCode::Char('-') => {
                self.zoom(-self.config.zoom_step);
                None
            }
            KeyCode::Char('r') => {
                self.revolve();
                None
            }
            _ => None,
        };

        if let Some((dx, dy)) = drag {
            if let Err(e) = self.scene.drag_rotate(model, dx, dy, step) {
                warn!("rotation failed: {}", e);
            }
        }
    }

    fn zoom(&mut self, offset: f64) {
        if !self.scene.zoom(self.camera, offset) {
            self.status = "cannot zoom further".to_string();
        }
    }

    /// Re-revolve the scene's curve with the configured parameters
    fn revolve(&mut self) {
        self.status = match self.scene.rebuild_mesh(self.config.revolution) {
            Ok(Some(mesh)) => format!(
                "revolved: {} vertices, {} edges",
                mesh.vertices.len(),
                mesh.edges.len()
            ),
            Ok(None) => "profile needs at least 4 control points".to_string(),
            Err(e) => e.to_string(),
        };
        debug!("{}", self.status);
    }

    fn fit_camera(&mut self) {
        let screen = self.renderer.screen();
        if let Some(camera) = self.scene.camera_mut(self.camera) {
            camera.fit_viewport(screen.width, screen.height);
        }
    }

    /// Project the scene into the character grid
    pub fn render_frame(&mut self) -> io::Result<()> {
        self.renderer.clear();
        self.renderer
            .render_scene(&self.scene, self.camera)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn render(&mut self) -> io::Result<()> {
        self.render_frame()?;

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 1))?;
        self.renderer.draw(&mut stdout)?;

        // Draw status line
        let (visible, total) = self.renderer.edge_counts();
        let near = self.scene.camera(self.camera).map_or(0.0, |c| c.near);
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Lathe3D | edges {}/{} | near {:.2} | {} {}",
                visible, total, near, HELP, self.status
            )),
            ResetColor
        )?;

        stdout.flush()?;
        self.status.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use lathe3d_core::Mat4;
    use nalgebra::Point2;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn app(scene: Scene) -> TerminalApp {
        TerminalApp::with_size(scene, ViewerConfig::default(), 80, 25).unwrap()
    }

    #[test]
    fn test_scene_without_camera_is_rejected() {
        let result = TerminalApp::with_size(Scene::empty(), ViewerConfig::default(), 80, 25);
        assert!(result.is_err());
    }

    #[test]
    fn test_viewport_fits_grid() {
        let app = app(Scene::with_cube());
        let camera = app.scene().camera(app.camera).unwrap();
        // 80 columns by 48 half-rows
        assert_eq!(camera.viewport_height, 1.5);
        assert_eq!(camera.viewport_width, 2.5);
    }

    #[test]
    fn test_keys_rotate_zoom_and_quit() {
        let mut app = app(Scene::with_cube());
        let model = app.scene().mesh_node();

        app.handle_key(key('d'));
        assert_ne!(app.scene().graph().local_transform(model), Mat4::identity());

        app.handle_key(key('+'));
        let near = app.scene().camera(app.camera).unwrap().near;
        assert!((near - 2.9).abs() < 1e-12);

        app.handle_key(key('q'));
        assert!(!app.running);
    }

    #[test]
    fn test_revolve_key_rebuilds_mesh() {
        let mut scene = Scene::with_cube();
        for (x, y) in [(0.0, 0.5), (1.0, 1.0), (2.0, 0.8), (3.0, 1.2), (4.0, 0.4)] {
            scene.spline_mut().push(Point2::new(x, y));
        }
        let mut app = app(scene);
        app.handle_key(key('r'));
        let mesh = app.scene().mesh().unwrap();
        assert_eq!(mesh.vertices.len(), 20 * 6);
        let edge_count = mesh.edges.len();
        assert!(app.status.starts_with("revolved"));

        app.render_frame().unwrap();
        let (visible, total) = app.renderer.edge_counts();
        assert_eq!(total, edge_count);
        assert!(visible > 0);
    }
}
