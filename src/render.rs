//! Retained display list and the RGBA rasterizer behind it.
//!
//! Gauge geometry is turned into [`DrawCommand`]s by [`Scene`], then painted
//! onto a [`Canvas`] wrapping a `width * height * 4` byte frame.

use std::fs;
use std::path::Path;

use rusttype::{point, Font, PositionedGlyph, Scale};

use crate::config::{Color, GaugeStyle};
use crate::dashboard::Dashboard;
use crate::error::{SpeedometerError, SpeedometerResult};
use crate::gauge::Gauge;
use crate::geometry::{DialArc, Disc, Point, Segment};

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Arc {
        arc: DialArc,
        color: Color,
    },
    Line {
        segment: Segment,
        thickness: f64,
        color: Color,
    },
    Polygon {
        points: Vec<Point>,
        color: Color,
    },
    Disc {
        disc: Disc,
        color: Color,
    },
    /// Text centered on `anchor`.
    Text {
        anchor: Point,
        text: String,
        font_size: f32,
        color: Color,
    },
}

#[derive(Debug, Default)]
pub struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Background plus both dashboard gauges at their placements.
    pub fn for_dashboard(dashboard: &mut Dashboard, style: &GaugeStyle) -> Self {
        let mut scene = Self::new();
        scene.add_command(DrawCommand::Clear(style.background_color));
        for (gauge, placement) in dashboard.gauges_mut() {
            scene.add_gauge(gauge, placement.origin, style);
        }
        scene
    }

    /// Rim, ticks, labels, hub and needle of `gauge`, translated to `origin`.
    pub fn add_gauge(&mut self, gauge: &mut Gauge, origin: Point, style: &GaugeStyle) {
        let dial = gauge.dial();
        let shift = |p: Point| p.offset(origin.x, origin.y);
        let shift_segment = |s: Segment| Segment::new(shift(s.start), shift(s.end));

        if let Some(border) = dial.border {
            self.add_command(DrawCommand::Arc {
                arc: DialArc {
                    center: shift(border.center),
                    ..border
                },
                color: style.dial_color,
            });
        }
        if let Some(critical) = dial.critical_section {
            self.add_command(DrawCommand::Arc {
                arc: DialArc {
                    center: shift(critical.center),
                    ..critical
                },
                color: style.critical_color,
            });
        }

        let major_thickness = gauge.config().border_width;
        for tick in dial.majors() {
            self.add_command(DrawCommand::Line {
                segment: shift_segment(tick.segment),
                thickness: major_thickness,
                color: style.dial_color,
            });
        }
        for tick in dial.minors() {
            self.add_command(DrawCommand::Line {
                segment: shift_segment(tick.segment),
                thickness: f64::from(style.minor_tick_thickness),
                color: style.dial_color,
            });
        }
        for tick in dial.majors() {
            if let Some(anchor) = tick.label_anchor {
                self.add_command(DrawCommand::Text {
                    anchor: shift(anchor),
                    text: tick.value.to_string(),
                    font_size: style.label_font_size,
                    color: style.text_color,
                });
            }
        }

        if let Some(hub) = dial.hub {
            self.add_command(DrawCommand::Disc {
                disc: Disc {
                    center: shift(hub.center),
                    ..hub
                },
                color: style.hub_color,
            });
        }
        if let Some(needle) = gauge.needle() {
            self.add_command(DrawCommand::Polygon {
                points: needle.points.iter().copied().map(shift).collect(),
                color: style.needle_color,
            });
        }
    }

    pub fn render(&self, canvas: &mut Canvas, style: &GaugeStyle) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => canvas.clear(*color),
                DrawCommand::Arc { arc, color } => draw_arc(canvas, arc, *color),
                DrawCommand::Line {
                    segment,
                    thickness,
                    color,
                } => draw_thick_line_aa(canvas, segment, *thickness, *color),
                DrawCommand::Polygon { points, color } => fill_convex_polygon(canvas, points, *color),
                DrawCommand::Disc { disc, color } => draw_disc(canvas, disc, *color),
                DrawCommand::Text {
                    anchor,
                    text,
                    font_size,
                    color,
                } => {
                    if let Some(font) = &style.font {
                        draw_text(canvas, *anchor, text, font, Scale::uniform(*font_size), *color);
                    }
                }
            }
        }
    }
}

/// Reads a TrueType/OpenType font for tick labels.
pub fn load_font(path: &Path) -> SpeedometerResult<Font<'static>> {
    let data = fs::read(path).map_err(|source| SpeedometerError::FontRead {
        path: path.to_path_buf(),
        source,
    })?;
    Font::try_from_vec(data).ok_or_else(|| SpeedometerError::InvalidFont(path.to_path_buf()))
}

// ============================================================================
// CANVAS
// ============================================================================

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        let idx = self.index(x as i64, y as i64)?;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.frame[idx..idx + 4]);
        Some(rgba)
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        (idx + 4 <= self.frame.len()).then_some(idx)
    }

    /// Alpha-blends `color` over the pixel at `(x, y)`; out-of-bounds writes are ignored.
    fn blend(&mut self, x: i64, y: i64, color: Color, alpha: f64) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let a = alpha.clamp(0.0, 1.0);
        for (offset, src) in [color.r, color.g, color.b].into_iter().enumerate() {
            let dst = f64::from(self.frame[idx + offset]);
            self.frame[idx + offset] = (f64::from(src) * a + dst * (1.0 - a)).round() as u8;
        }
        self.frame[idx + 3] = 0xff;
    }
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

fn draw_thick_line_aa(canvas: &mut Canvas, segment: &Segment, thickness: f64, color: Color) {
    let (x0, y0) = (segment.start.x, segment.start.y);
    let (x1, y1) = (segment.end.x, segment.end.y);
    let pad = thickness / 2.0 + 1.0;
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len_sq = dx * dx + dy * dy;

    for y in (y0.min(y1) - pad).floor() as i64..=(y0.max(y1) + pad).ceil() as i64 {
        for x in (x0.min(x1) - pad).floor() as i64..=(x0.max(x1) + pad).ceil() as i64 {
            let (px, py) = (x as f64 - x0, y as f64 - y0);
            let t = if len_sq > 0.0 {
                ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let dist = (px - t * dx).hypot(py - t * dy);
            let aa = 1.0 - (dist - thickness / 2.0).clamp(0.0, 1.0);
            if aa > 0.01 {
                canvas.blend(x, y, color, aa);
            }
        }
    }
}

fn draw_disc(canvas: &mut Canvas, disc: &Disc, color: Color) {
    let Disc { center, radius } = *disc;
    for y in (center.y - radius - 1.0).floor() as i64..=(center.y + radius + 1.0).ceil() as i64 {
        for x in (center.x - radius - 1.0).floor() as i64..=(center.x + radius + 1.0).ceil() as i64 {
            let dist = (x as f64 - center.x).hypot(y as f64 - center.y);
            let aa = 1.0 - (dist - radius).clamp(0.0, 1.0);
            if aa > 0.0 {
                canvas.blend(x, y, color, aa);
            }
        }
    }
}

/// Whether screen angle `angle` (degrees) lies on the arc's sweep.
fn within_sweep(arc: &DialArc, angle: f64) -> bool {
    if arc.sweep.abs() >= 360.0 {
        return true;
    }
    if arc.sweep >= 0.0 {
        (angle - arc.start_angle).rem_euclid(360.0) <= arc.sweep
    } else {
        (arc.start_angle - angle).rem_euclid(360.0) <= -arc.sweep
    }
}

fn draw_arc(canvas: &mut Canvas, arc: &DialArc, color: Color) {
    let half_stroke = arc.stroke_width / 2.0;
    let reach = arc.radius + half_stroke + 1.0;
    let center = arc.center;

    for y in (center.y - reach).floor() as i64..=(center.y + reach).ceil() as i64 {
        for x in (center.x - reach).floor() as i64..=(center.x + reach).ceil() as i64 {
            let dx = x as f64 - center.x;
            let dy = center.y - y as f64;
            let dist = dx.hypot(dy);
            let aa = 1.0 - ((dist - arc.radius).abs() - half_stroke).clamp(0.0, 1.0);
            if aa > 0.0 && within_sweep(arc, dy.atan2(dx).to_degrees()) {
                canvas.blend(x, y, color, aa);
            }
        }
    }
}

fn fill_convex_polygon(canvas: &mut Canvas, points: &[Point], color: Color) {
    if points.len() < 3 {
        return;
    }

    let twice_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    if twice_area == 0.0 {
        return;
    }
    let winding = twice_area.signum();

    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    for y in (min_y - 1.0).floor() as i64..=(max_y + 1.0).ceil() as i64 {
        for x in (min_x - 1.0).floor() as i64..=(max_x + 1.0).ceil() as i64 {
            let (px, py) = (x as f64, y as f64);
            // Signed distance to the nearest edge, positive inside.
            let inside = points
                .iter()
                .zip(points.iter().cycle().skip(1))
                .map(|(a, b)| {
                    let (ex, ey) = (b.x - a.x, b.y - a.y);
                    let len = ex.hypot(ey);
                    if len == 0.0 {
                        f64::INFINITY
                    } else {
                        winding * (ex * (py - a.y) - ey * (px - a.x)) / len
                    }
                })
                .fold(f64::INFINITY, f64::min);
            let aa = (inside + 0.5).clamp(0.0, 1.0);
            if aa > 0.01 {
                canvas.blend(x, y, color, aa);
            }
        }
    }
}

fn draw_text(canvas: &mut Canvas, anchor: Point, text: &str, font: &Font, scale: Scale, color: Color) {
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .collect();

    let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), bb| {
            (
                min_x.min(bb.min.x),
                max_x.max(bb.max.x),
                min_y.min(bb.min.y),
                max_y.max(bb.max.y),
            )
        },
    );
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let offset_x = anchor.x.round() as i64 - i64::from(max_x - min_x) / 2;
    let offset_y = anchor.y.round() as i64 - i64::from(max_y - min_y) / 2;
    for glyph in &glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let px = offset_x + i64::from(gx) + i64::from(bb.min.x - min_x);
                let py = offset_y + i64::from(gy) + i64::from(bb.min.y - min_y);
                canvas.blend(px, py, color, f64::from(coverage));
            });
        }
    }
}
