/// Example: Revolve a vase profile and view it in the terminal
///
/// Usage: cargo run --example revolve_profile -- [output.scene]
///
/// When an output path is given the scene is saved there before viewing.

use lathe3d_core::{scene_file, Scene};
use lathe3d_terminal::{TerminalApp, ViewerConfig};
use nalgebra::Point2;
use std::env;
use std::io;

const VASE_PROFILE: [(f64, f64); 8] = [
    (-3.0, 0.2),
    (-2.5, 1.0),
    (-1.5, 1.6),
    (-0.5, 1.2),
    (0.5, 0.6),
    (1.5, 0.7),
    (2.5, 1.1),
    (3.0, 1.3),
];

fn main() -> io::Result<()> {
    env_logger::init();

    let config = ViewerConfig::default();
    let mut scene = Scene::with_cube();
    for (x, y) in VASE_PROFILE {
        scene.spline_mut().push(Point2::new(x, y));
    }

    let params = lathe3d_core::RevolutionParams {
        rotation_count: 16,
        along_layer_count: 8,
        across_layer_count: 6,
    };
    let mesh = scene
        .rebuild_mesh(params)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "profile is too short"))?;
    println!("Revolved {} vertices, {} edges", mesh.vertices.len(), mesh.edges.len());

    if let Some(path) = env::args().nth(1) {
        scene_file::save_scene(&scene, &path).map_err(|e| {
            io::Error::new(io::ErrorKind::Other, format!("Failed to save scene: {}", e))
        })?;
        println!("Saved scene to {}", path);
    }

    let mut app = TerminalApp::new(scene, config)?;
    app.run()
}
