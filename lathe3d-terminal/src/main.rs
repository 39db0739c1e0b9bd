/// Lathe3D Terminal Viewer
///
/// Usage: lathe3d-terminal [scene-file] [--config viewer.toml]
///
/// Without a scene file a unit cube is shown.
/// Controls:
///   - WASD / Arrow Keys: Rotate the model
///   - +/-: Zoom
///   - R: Revolve the scene's profile curve
///   - Q/ESC: Quit

use lathe3d_core::{scene_file, Scene};
use lathe3d_terminal::{TerminalApp, ViewerConfig};
use std::env;
use std::io;

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut scene_path = None;
    let mut config_path = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            _ => scene_path = Some(arg),
        }
    }

    let config = match config_path {
        Some(path) => ViewerConfig::load(&path).map_err(|e| {
            let message = format!("Failed to load config {}: {}", path, e);
            io::Error::new(io::ErrorKind::InvalidData, message)
        })?,
        None => ViewerConfig::default(),
    };

    let scene = match scene_path {
        Some(path) => {
            println!("Loading scene file: {}", path);
            scene_file::load_scene(&path).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Failed to load scene: {}", e))
            })?
        }
        None => Scene::with_cube(),
    };

    let mut app = TerminalApp::new(scene, config)?;
    app.run()?;

    println!("Thank you for using Lathe3D!");
    Ok(())
}
