/// meshview in the terminal
///
/// Loads an STL or 3MF file, prints the sidebar metadata and opens an
/// orbiting ASCII viewport.
/// Controls:
///   - WASD / Arrow Keys: Orbit
///   - +/-: Zoom
///   - Space: Toggle spin
///   - Q/ESC: Quit
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use meshview_core::{
    FaceColorMode, HeightColoring, MeshSelection, Upload, ViewState, Viewer, ViewerConfig, PROMPT,
};
use meshview_terminal::TerminalApp;

#[derive(Parser, Debug)]
#[command(name = "meshview-terminal", version, about = "View STL and 3MF meshes in the terminal")]
struct Cli {
    /// Mesh file (.stl or .3mf)
    file: Option<PathBuf>,

    /// Show the named mesh of a multi-mesh 3MF file
    #[arg(long, conflicts_with = "merge")]
    mesh: Option<String>,

    /// Show every mesh of the file merged into one
    #[arg(long)]
    merge: bool,

    /// Average face colors onto vertices instead of coloring faces flat
    #[arg(long)]
    interpolate_faces: bool,

    /// Use one flat color for uncolored meshes instead of a height gradient
    #[arg(long)]
    flat_height: bool,

    /// Keep coincident vertices of 3MF meshes separate
    #[arg(long)]
    no_weld: bool,

    /// Viewer configuration as JSON; flags override its fields
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the metadata and exit
    #[arg(long)]
    info: bool,

    /// Print the page state as JSON and exit
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn viewer_config(&self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                ViewerConfig::from_json(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => ViewerConfig::default(),
        };

        if let Some(name) = &self.mesh {
            config.selection = MeshSelection::Named(name.clone());
        } else if self.merge {
            config.selection = MeshSelection::Merged;
        }
        if self.interpolate_faces {
            config.face_color_mode = FaceColorMode::Interpolate;
        }
        if self.flat_height {
            config.height_coloring = HeightColoring::Flat;
        }
        if self.no_weld {
            config.merge_vertices = false;
        }
        Ok(config)
    }

    fn upload(&self) -> Result<Option<Upload>> {
        let Some(path) = &self.file else {
            return Ok(None);
        };
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Some(Upload::new(name, bytes)))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let viewer = Viewer::new(cli.viewer_config()?);
    let upload = cli.upload()?;
    let state = viewer.handle(upload.as_ref());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&state.to_json())?);
        return Ok(());
    }

    match state {
        ViewState::Prompt => {
            println!("{PROMPT}");
            Ok(())
        }
        ViewState::Failed(panel) => {
            for line in panel.lines() {
                eprintln!("{line}");
            }
            bail!("{}", panel.banner)
        }
        ViewState::Rendered(view) => {
            for line in view.info.lines() {
                println!("{line}");
            }
            if cli.info {
                return Ok(());
            }

            println!("Starting viewport (press Q to quit)...");
            std::thread::sleep(Duration::from_secs(1));

            let mut app = TerminalApp::new(&view)?;
            app.run()?;
            Ok(())
        }
    }
}
