/// Terminal viewport for uploaded meshes
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use log::debug;
use meshview_core::{
    transform::{fit_to_unit, model_matrix},
    Camera, Mesh, Orbit, Rgba, SceneCamera, View,
};
use nalgebra::Matrix4;
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::{face_tints, AsciiRenderer};

const ROTATE_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 1.1;

/// Interactive orbit viewer over one selected mesh
pub struct TerminalApp {
    mesh: Mesh,
    tints: Vec<Option<Rgba>>,
    fit: Matrix4<f32>,
    orbit: Orbit,
    scene_camera: SceneCamera,
    camera: Camera,
    renderer: AsciiRenderer,
    title: String,
    auto_rotate: bool,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(view: &View) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let scene_camera = SceneCamera::default();
        let mesh = view.mesh.clone();

        let title = match &view.info.scene_name {
            Some(name) => format!("{} ({name})", view.info.file_type),
            None => view.info.file_type.clone(),
        };

        Ok(Self {
            tints: face_tints(&mesh),
            fit: fit_to_unit(&mesh),
            mesh,
            orbit: Orbit::new(),
            camera: terminal_camera(&scene_camera, width, height),
            scene_camera,
            renderer: AsciiRenderer::new(width as usize, height as usize),
            title,
            auto_rotate: true,
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

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30);

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            if self.auto_rotate {
                self.orbit.rotate(0.015, 0.0);
            }

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

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(code),
            Event::Resize(width, height) => {
                debug!("terminal resized to {width}x{height}");
                self.renderer.resize(width as usize, height as usize);
                self.camera = terminal_camera(&self.scene_camera, width, height);
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('w') | KeyCode::Up => self.orbit.rotate(0.0, -ROTATE_STEP),
            KeyCode::Char('s') | KeyCode::Down => self.orbit.rotate(0.0, ROTATE_STEP),
            KeyCode::Char('a') | KeyCode::Left => self.orbit.rotate(-ROTATE_STEP, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.orbit.rotate(ROTATE_STEP, 0.0),
            KeyCode::Char('+') | KeyCode::Char('=') => self.orbit.zoom_by(ZOOM_STEP),
            KeyCode::Char('-') => self.orbit.zoom_by(1.0 / ZOOM_STEP),
            KeyCode::Char(' ') => self.auto_rotate = !self.auto_rotate,
            KeyCode::Char('r') => self.orbit = Orbit::new(),
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let model = model_matrix(&self.fit, &self.orbit);

        self.renderer.clear();
        self.renderer
            .render_mesh(&self.mesh, &self.tints, &model, &self.camera);

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "{} | FPS: {:.1} | WASD/Arrows=Orbit +/-=Zoom Space=Spin R=Reset Q=Quit",
                self.title, self.fps
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Terminal cells are about twice as tall as wide, so the camera sees a
/// viewport of doubled height.
fn terminal_camera(scene: &SceneCamera, width: u16, height: u16) -> Camera {
    Camera::from_scene(scene, width.max(1) as u32, (height.max(1) as u32) * 2)
}
