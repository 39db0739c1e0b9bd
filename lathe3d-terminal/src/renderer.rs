/// ASCII wireframe renderer for terminal output
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use lathe3d_core::projection::{self, AxisLine, ProjectedEdge, Screen};
use lathe3d_core::{NodeId, Scene};
use std::io::Write;

/// Character ramp for edge weight (far to near)
pub const DEFAULT_EDGE_RAMP: &str = ".:-=+*#%@";

const AXIS_COLORS: [Color; 3] = [Color::Red, Color::Green, Color::Blue];

/// Renders projected wireframes into a character grid.
///
/// Terminal cells are about twice as tall as they are wide, so the scene is
/// projected onto a screen with twice as many rows as the grid and folded
/// back when plotting.
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    ramp: Vec<char>,
    depth_buffer: Vec<f64>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
    visible_edges: usize,
    total_edges: usize,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_ramp(width, height, DEFAULT_EDGE_RAMP)
    }

    pub fn with_ramp(width: usize, height: usize, ramp: &str) -> Self {
        let mut ramp: Vec<char> = ramp.chars().collect();
        if ramp.is_empty() {
            ramp = DEFAULT_EDGE_RAMP.chars().collect();
        }
        let size = width * height;
        Self {
            width,
            height,
            ramp,
            depth_buffer: vec![f64::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::Reset; size],
            visible_edges: 0,
            total_edges: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Projection target matching this grid
    pub fn screen(&self) -> Screen {
        Screen::new(self.width as u32, self.height as u32 * 2)
    }

    /// Edges drawn and edges considered in the last render
    pub fn edge_counts(&self) -> (usize, usize) {
        (self.visible_edges, self.total_edges)
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self {
            ramp: std::mem::take(&mut self.ramp),
            ..Self::new(width, height)
        };
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f64::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::Reset);
        self.visible_edges = 0;
        self.total_edges = 0;
    }

    pub fn render_scene(&mut self, scene: &Scene, camera: NodeId) -> lathe3d_core::Result<()> {
        let meshes = projection::project_scene(scene, camera, self.screen())?;
        for mesh in &meshes {
            for axis in &mesh.axes {
                self.render_axis(axis);
            }
            for edge in &mesh.edges {
                self.render_edge(edge);
            }
            self.visible_edges += mesh.edges.len();
        }
        self.total_edges += scene
            .graph()
            .descendants(scene.root())
            .into_iter()
            .filter_map(|id| scene.graph().mesh_node(id))
            .filter_map(|node| node.mesh.as_ref())
            .map(|mesh| mesh.edges.len())
            .sum::<usize>();
        Ok(())
    }

    fn render_axis(&mut self, axis: &AxisLine) {
        let color = AXIS_COLORS[axis.axis % AXIS_COLORS.len()];
        // Axes sit behind every edge
        self.draw_line(axis.start, axis.end, |cell| {
            if *cell.character == ' ' {
                cell.replace(1.0, '·', color);
            }
        });
    }

    fn render_edge(&mut self, edge: &ProjectedEdge) {
        let weight = edge.weight().clamp(0.0, 1.0);
        let index = ((weight * self.ramp.len() as f64) as usize).min(self.ramp.len() - 1);
        let character = self.ramp[index];
        let color = match index * 4 / self.ramp.len() {
            0 => Color::DarkGrey,
            1 => Color::Grey,
            2 => Color::White,
            _ => Color::Cyan,
        };
        let depth = edge.min_z;
        self.draw_line(edge.start, edge.end, |cell| {
            if depth < *cell.depth {
                cell.replace(depth, character, color);
            }
        });
    }

    /// Walk the cells on a screen-space segment (Bresenham), after clipping
    /// it to the grid
    fn draw_line<F>(&mut self, start: (i32, i32), end: (i32, i32), mut plot: F)
    where
        F: FnMut(Cell<'_>),
    {
        let bounds = (self.width as f64 - 1.0, self.height as f64 * 2.0 - 1.0);
        let Some(((x0, y0), (x1, y1))) = clip_segment(start, end, bounds) else {
            return;
        };

        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);

        loop {
            let idx = (y / 2) as usize * self.width + x as usize;
            plot(Cell {
                depth: &mut self.depth_buffer[idx],
                character: &mut self.char_buffer[idx],
                color: &mut self.color_buffer[idx],
            });
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                writer.queue(SetForegroundColor(self.color_buffer[idx]))?;
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }

    #[cfg(test)]
    fn char_at(&self, x: usize, row: usize) -> char {
        self.char_buffer[row * self.width + x]
    }
}

/// Mutable view of one grid cell
struct Cell<'a> {
    depth: &'a mut f64,
    character: &'a mut char,
    color: &'a mut Color,
}

impl Cell<'_> {
    fn replace(self, depth: f64, character: char, color: Color) {
        *self.depth = depth;
        *self.character = character;
        *self.color = color;
    }
}

/// Liang-Barsky clip of a segment to `[0, max_x] x [0, max_y]`
fn clip_segment(
    start: (i32, i32),
    end: (i32, i32),
    (max_x, max_y): (f64, f64),
) -> Option<((i32, i32), (i32, i32))> {
    if max_x < 0.0 || max_y < 0.0 {
        return None;
    }
    let (x0, y0) = (start.0 as f64, start.1 as f64);
    let (dx, dy) = (end.0 as f64 - x0, end.1 as f64 - y0);

    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [(-dx, x0), (dx, max_x - x0), (-dy, y0), (dy, max_y - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    let at = |t: f64| {
        (
            (x0 + t * dx).round().clamp(0.0, max_x) as i32,
            (y0 + t * dy).round().clamp(0.0, max_y) as i32,
        )
    };
    Some((at(t0), at(t1)))
}
