//! Value-to-angle mapping and the screen-space shapes of a circular gauge.
//!
//! Everything here is a pure function of a [`GaugeConfig`] and the surface
//! diameter. Angles are degrees, counter-clockwise from the positive x axis;
//! screen points use a y-down convention, so a point at radius `r` and angle
//! `θ` lands at `(D/2 + r·cos θ, D/2 - r·sin θ)`.
//!
//! Dial geometry (ticks, labels, rim arcs) only changes with the config or the
//! diameter and is memoized by [`GeometryCache`]. The needle depends on the
//! displayed value as well and is rebuilt every frame by [`needle_for`].

use std::sync::Arc;

use tracing::debug;

use crate::config::GaugeConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end.x - self.start.x).hypot(self.end.y - self.start.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickKind {
    Major,
    Minor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickMark {
    pub value: i32,
    pub kind: TickKind,
    /// Runs from the inner end of the tick out toward the rim.
    pub segment: Segment,
    /// Center of the value label; only major ticks carry one.
    pub label_anchor: Option<Point>,
}

/// A stroked circular arc. `sweep` is signed: negative runs clockwise on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialArc {
    pub center: Point,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep: f64,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disc {
    pub center: Point,
    pub radius: f64,
}

/// The static part of a gauge for one `(config, diameter)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DialGeometry {
    pub diameter: u32,
    pub ticks: Vec<TickMark>,
    pub border: Option<DialArc>,
    pub critical_section: Option<DialArc>,
    pub hub: Option<Disc>,
}

impl DialGeometry {
    fn empty(diameter: u32) -> Self {
        Self {
            diameter,
            ticks: Vec::new(),
            border: None,
            critical_section: None,
            hub: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
            && self.border.is_none()
            && self.critical_section.is_none()
            && self.hub.is_none()
    }

    pub fn majors(&self) -> impl Iterator<Item = &TickMark> {
        self.ticks.iter().filter(|t| t.kind == TickKind::Major)
    }

    pub fn minors(&self) -> impl Iterator<Item = &TickMark> {
        self.ticks.iter().filter(|t| t.kind == TickKind::Minor)
    }
}

/// Needle triangle: `[base, tip, base]`, the base straddling a point behind the center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Needle {
    pub points: [Point; 3],
}

impl Needle {
    pub fn tip(&self) -> Point {
        self.points[1]
    }
}

/// Shortest needle, as a fraction of the dial radius.
const MIN_NEEDLE_REACH: f64 = 0.25;

/// Radius `length` in from `radius`, never past the center.
fn inset(radius: f64, length: f64) -> f64 {
    (radius - length).max(0.0)
}

/// Maps `value` onto the sweep. Values outside the range extrapolate linearly.
pub fn angle_for(config: &GaugeConfig, value: i32) -> f64 {
    let span = f64::from(config.max_value) - f64::from(config.min_value);
    let fraction = (f64::from(value) - f64::from(config.min_value)) / span;
    config.start_angle + (config.end_angle - config.start_angle) * fraction
}

/// Screen position at `radius` from `center` along `angle` (degrees).
pub fn polar(center: Point, radius: f64, angle: f64) -> Point {
    let theta = angle.to_radians();
    Point::new(
        center.x + radius * theta.cos(),
        center.y - radius * theta.sin(),
    )
}

/// `min, min + step, ...` up to and including the last value `<= max`.
pub fn mark_values(min: i32, max: i32, step: i32) -> impl Iterator<Item = i32> {
    let step = usize::try_from(step).ok().filter(|&step| step > 0);
    step.into_iter()
        .flat_map(move |step| (min..=max).step_by(step))
}

pub fn compute_dial(config: &GaugeConfig, diameter: u32) -> DialGeometry {
    if diameter == 0 {
        return DialGeometry::empty(diameter);
    }

    let half = f64::from(diameter) / 2.0;
    let center = Point::new(half, half);
    let rim = inset(half, config.tick_margin);

    let mut ticks = Vec::new();
    if config.max_value > config.min_value {
        let label_radius = inset(
            half,
            config.major_tick_length + config.tick_margin + config.tick_text_margin,
        );
        for value in mark_values(config.min_value, config.max_value, config.value_step) {
            let angle = angle_for(config, value);
            ticks.push(TickMark {
                value,
                kind: TickKind::Major,
                segment: Segment::new(
                    polar(center, inset(half, config.major_tick_length), angle),
                    polar(center, rim, angle),
                ),
                label_anchor: Some(polar(center, label_radius, angle)),
            });
        }
        for value in mark_values(config.min_value, config.max_value, config.minor_mark_step) {
            let angle = angle_for(config, value);
            ticks.push(TickMark {
                value,
                kind: TickKind::Minor,
                segment: Segment::new(
                    polar(center, inset(half, config.minor_tick_length), angle),
                    polar(center, rim, angle),
                ),
                label_anchor: None,
            });
        }
    }

    let sweep = config.end_angle - config.start_angle;
    let border_radius = inset(half, config.border_width / 2.0);
    let border = DialArc {
        center,
        radius: border_radius,
        start_angle: config.start_angle,
        sweep,
        stroke_width: config.border_width,
    };

    let critical_section = (config.critical_section_percent > 0.0).then(|| {
        let fraction = config.critical_section_percent;
        DialArc {
            center,
            radius: inset(border_radius, config.critical_section_inset),
            start_angle: config.start_angle + sweep * (1.0 - fraction),
            sweep: sweep * fraction,
            stroke_width: config.critical_section_width,
        }
    });

    DialGeometry {
        diameter,
        ticks,
        border: Some(border),
        critical_section,
        hub: Some(Disc {
            center,
            radius: config.hub_radius,
        }),
    }
}

/// Needle pointing at `value`, or `None` on a zero-size surface.
pub fn needle_for(config: &GaugeConfig, diameter: u32, value: i32) -> Option<Needle> {
    if diameter == 0 {
        return None;
    }

    let half = f64::from(diameter) / 2.0;
    let center = Point::new(half, half);
    let theta = angle_for(config, value).to_radians();
    let (sin, cos) = theta.sin_cos();
    // Small dials keep a forward-pointing tip instead of flipping through the center.
    let reach = (half - config.needle_tip_inset).max(half * MIN_NEEDLE_REACH);

    // (along, across) in the needle's frame, rotated counter-clockwise on screen.
    let place = |along: f64, across: f64| {
        Point::new(
            center.x + along * cos + across * sin,
            center.y - along * sin + across * cos,
        )
    };

    Some(Needle {
        points: [
            place(-config.needle_tail, config.needle_half_width),
            place(reach, 0.0),
            place(-config.needle_tail, -config.needle_half_width),
        ],
    })
}

/// Memoized [`compute_dial`] keyed by `(config, diameter)`.
#[derive(Debug, Default)]
pub struct GeometryCache {
    entry: Option<(GaugeConfig, u32, Arc<DialGeometry>)>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dial(&mut self, config: &GaugeConfig, diameter: u32) -> Arc<DialGeometry> {
        if let Some((cached_config, cached_diameter, dial)) = &self.entry {
            if *cached_diameter == diameter && cached_config == config {
                return Arc::clone(dial);
            }
        }

        let dial = Arc::new(compute_dial(config, diameter));
        debug!(
            diameter,
            ticks = dial.ticks.len(),
            "recomputed dial geometry"
        );
        self.entry = Some((config.clone(), diameter, Arc::clone(&dial)));
        dial
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sweep_endpoints_are_exact() {
        let config = GaugeConfig::default();
        assert_eq!(angle_for(&config, 0), 220.0);
        assert_eq!(angle_for(&config, 220), -40.0);
        assert_relative_eq!(angle_for(&config, 110), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn out_of_range_values_extrapolate() {
        let config = GaugeConfig::default();
        let per_unit = -260.0 / 220.0;
        assert_relative_eq!(angle_for(&config, 240), -40.0 + 20.0 * per_unit, epsilon = 1e-9);
        assert_relative_eq!(angle_for(&config, -10), 220.0 - 10.0 * per_unit, epsilon = 1e-9);
    }

    #[test]
    fn default_speed_dial_tick_counts() {
        let dial = compute_dial(&GaugeConfig::default(), 500);
        assert_eq!(dial.majors().count(), 12);
        assert_eq!(dial.minors().count(), 45);
        assert!(dial.majors().all(|t| t.label_anchor.is_some()));
        assert!(dial.minors().all(|t| t.label_anchor.is_none()));
    }

    #[test]
    fn uneven_step_stops_at_last_mark_in_range() {
        let config = GaugeConfig::builder().max_value(100).value_step(30).build();
        let values: Vec<i32> = compute_dial(&config, 300).majors().map(|t| t.value).collect();
        assert_eq!(values, vec![0, 30, 60, 90]);
    }

    #[test]
    fn zero_diameter_is_empty() {
        let config = GaugeConfig::default();
        assert!(compute_dial(&config, 0).is_empty());
        assert!(needle_for(&config, 0, 100).is_none());
    }

    #[test]
    fn degenerate_config_produces_no_ticks() {
        let inverted = GaugeConfig::builder().min_value(50).max_value(10).build();
        assert!(compute_dial(&inverted, 400).ticks.is_empty());

        let zero_step = GaugeConfig::builder().value_step(0).minor_mark_step(-5).build();
        assert!(compute_dial(&zero_step, 400).ticks.is_empty());
    }

    #[test]
    fn first_major_tick_runs_from_inner_radius_to_margin() {
        let dial = compute_dial(&GaugeConfig::default(), 500);
        let first = dial.majors().next().unwrap();
        let theta = 220f64.to_radians();

        assert_eq!(first.value, 0);
        assert_relative_eq!(first.segment.start.x, 250.0 + 200.0 * theta.cos());
        assert_relative_eq!(first.segment.start.y, 250.0 - 200.0 * theta.sin());
        assert_relative_eq!(first.segment.end.x, 250.0 + 240.0 * theta.cos());
        assert_relative_eq!(first.segment.length(), 40.0, epsilon = 1e-9);

        let label = first.label_anchor.unwrap();
        assert_relative_eq!(label.x, 250.0 + 160.0 * theta.cos());
        assert_relative_eq!(label.y, 250.0 - 160.0 * theta.sin());
    }

    #[test]
    fn critical_section_covers_end_of_sweep() {
        let dial = compute_dial(&GaugeConfig::default(), 500);
        let critical = dial.critical_section.unwrap();
        assert_relative_eq!(critical.start_angle, 12.0, epsilon = 1e-9);
        assert_relative_eq!(critical.sweep, -52.0, epsilon = 1e-9);
        assert_relative_eq!(critical.start_angle + critical.sweep, -40.0, epsilon = 1e-9);
        assert_relative_eq!(critical.radius, 225.0);

        let border = dial.border.unwrap();
        assert_relative_eq!(border.radius, 245.0);
        assert_relative_eq!(border.sweep, -260.0);
    }

    #[test]
    fn needle_at_zero_degrees_points_right() {
        let config = GaugeConfig::builder()
            .max_value(180)
            .start_angle(0.0)
            .end_angle(180.0)
            .build();
        let needle = needle_for(&config, 400, 0).unwrap();

        assert_relative_eq!(needle.tip().x, 250.0);
        assert_relative_eq!(needle.tip().y, 200.0);
        assert_relative_eq!(needle.points[0].x, 140.0);
        assert_relative_eq!(needle.points[0].y, 210.0);
        assert_relative_eq!(needle.points[2].y, 190.0);
    }

    #[test]
    fn needle_at_ninety_degrees_points_up() {
        let config = GaugeConfig::builder()
            .max_value(180)
            .start_angle(0.0)
            .end_angle(180.0)
            .build();
        let needle = needle_for(&config, 400, 90).unwrap();

        assert_relative_eq!(needle.tip().x, 200.0, epsilon = 1e-9);
        assert_relative_eq!(needle.tip().y, 150.0, epsilon = 1e-9);
        assert_relative_eq!(needle.points[0].x, 210.0, epsilon = 1e-9);
        assert_relative_eq!(needle.points[0].y, 260.0, epsilon = 1e-9);
    }

    fn bearing(center: f64, p: Point) -> f64 {
        (center - p.y).atan2(p.x - center).to_degrees()
    }

    #[test]
    fn needle_on_small_dial_still_points_at_value() {
        // 500x400 window: each gauge gets a 250px dial.
        let config = GaugeConfig::default();
        let needle = needle_for(&config, 250, 0).unwrap();

        assert_relative_eq!(bearing(125.0, needle.tip()).rem_euclid(360.0), 220.0, epsilon = 1e-9);
        assert_relative_eq!(
            Segment::new(Point::new(125.0, 125.0), needle.tip()).length(),
            125.0 * MIN_NEEDLE_REACH,
            epsilon = 1e-9
        );
    }

    #[test]
    fn labels_on_small_dial_stay_on_their_tick_side() {
        let config = GaugeConfig::default();
        let dial = compute_dial(&config, 220);
        for tick in dial.majors() {
            let label = tick.label_anchor.unwrap();
            let expected = angle_for(&config, tick.value);
            let diff = (bearing(110.0, label) - expected).rem_euclid(360.0);
            assert!(diff < 1e-6 || diff > 360.0 - 1e-6, "label for {} at {diff}", tick.value);
        }

        // Too small for labels: they collapse onto the center rather than flip.
        let tiny = compute_dial(&config, 100);
        assert!(tiny
            .majors()
            .all(|t| t.label_anchor == Some(Point::new(50.0, 50.0))));
    }

    #[test]
    fn cache_reuses_geometry_until_key_changes() {
        let mut cache = GeometryCache::new();
        let config = GaugeConfig::default();

        let first = cache.dial(&config, 400);
        let again = cache.dial(&config, 400);
        assert!(Arc::ptr_eq(&first, &again));

        let resized = cache.dial(&config, 300);
        assert!(!Arc::ptr_eq(&first, &resized));

        let reconfigured = cache.dial(&GaugeConfig::engine_rate(), 300);
        assert!(!Arc::ptr_eq(&resized, &reconfigured));
        assert_eq!(reconfigured.majors().count(), 8);
    }
}
