//! Software rasterizer for trail links.
//!
//! Every link is drawn as a round-capped stroke. The antialiasing level only
//! changes how densely each pixel is sampled against that stroke, so frames
//! at different levels share exactly the same geometry.

use image::{Rgba, RgbaImage};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

use crate::params::MAX_AA_LEVEL;
use crate::trail::WeightedLink;

/// Raster frame handed to the display and capture collaborators.
pub type Frame = RgbaImage;

/// Distance kept free between the curve and the surface edge, in pixels.
pub const VIEWPORT_MARGIN: f64 = 50.0;

/// Maps curve space (unit disc, y up) onto a pixel surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Radius in pixels of the unit circle.
    pub fn radius(&self) -> f64 {
        (f64::from(self.width.min(self.height)) / 2.0 - VIEWPORT_MARGIN).max(1.0)
    }

    pub fn center(&self) -> Point {
        Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    pub fn to_surface(&self, point: Point) -> Point {
        let radius = self.radius();
        let center = self.center();
        Point::new(point.x * radius + center.x, -point.y * radius + center.y)
    }
}

/// Colors and stroke used when rasterizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub background: [u8; 4],
    pub line: [u8; 4],
    pub stroke_width: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: [0, 0, 25, 255],
            line: [255, 255, 255, 255],
            stroke_width: 1.0,
        }
    }
}

/// Stateless renderer: the output depends only on its inputs.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    style: RenderStyle,
}

impl Renderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Samples per pixel axis for an antialiasing level.
    pub fn samples_per_axis(aa_level: u32) -> u32 {
        aa_level.min(MAX_AA_LEVEL) + 1
    }

    /// Renders a full frame. An empty slice yields the background only.
    pub fn render(&self, links: &[WeightedLink], viewport: &Viewport, aa_level: u32) -> Frame {
        let mut frame =
            RgbaImage::from_pixel(viewport.width, viewport.height, Rgba(self.style.background));
        let samples = Self::samples_per_axis(aa_level);
        for link in links {
            if link.weight <= 0.0 {
                continue;
            }
            let from = viewport.to_surface(link.line.p0);
            let to = viewport.to_surface(link.line.p1);
            self.stroke(&mut frame, from, to, link.weight, samples);
        }
        frame
    }

    fn stroke(&self, frame: &mut Frame, from: Point, to: Point, weight: f64, samples: u32) {
        let half = (self.style.stroke_width / 2.0).max(0.0);
        let reach = half + std::f64::consts::FRAC_1_SQRT_2;
        let (width, height) = frame.dimensions();

        let Some((x0, x1)) = pixel_span(from.x.min(to.x) - reach, from.x.max(to.x) + reach, width)
        else {
            return;
        };
        let Some((y0, y1)) = pixel_span(from.y.min(to.y) - reach, from.y.max(to.y) + reach, height)
        else {
            return;
        };

        let half_sq = half * half;
        let reach_sq = reach * reach;
        let step = 1.0 / f64::from(samples);
        let total = f64::from(samples * samples);
        let opacity = weight.min(1.0) * f64::from(self.style.line[3]) / 255.0;

        for py in y0..=y1 {
            for px in x0..=x1 {
                let center = Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
                if distance_sq_to_segment(center, from, to) > reach_sq {
                    continue;
                }

                let mut hits = 0u32;
                for sy in 0..samples {
                    for sx in 0..samples {
                        let sample = Point::new(
                            f64::from(px) + (f64::from(sx) + 0.5) * step,
                            f64::from(py) + (f64::from(sy) + 0.5) * step,
                        );
                        if distance_sq_to_segment(sample, from, to) <= half_sq {
                            hits += 1;
                        }
                    }
                }
                if hits == 0 {
                    continue;
                }

                let alpha = f64::from(hits) / total * opacity;
                blend(frame.get_pixel_mut(px, py), self.style.line, alpha);
            }
        }
    }
}

fn pixel_span(min: f64, max: f64, limit: u32) -> Option<(u32, u32)> {
    if max < 0.0 || min >= f64::from(limit) {
        return None;
    }
    let start = min.floor().max(0.0) as u32;
    let end = (max.floor() as u32).min(limit - 1);
    Some((start, end))
}

fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab: Vec2 = b - a;
    let ap: Vec2 = p - a;
    let len_sq = ab.dot(ab);
    let t = if len_sq > 0.0 {
        (ap.dot(ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let offset = p - (a + ab * t);
    offset.dot(offset)
}

/// Source-over blend of `color` at `alpha` onto `dst`.
fn blend(dst: &mut Rgba<u8>, color: [u8; 4], alpha: f64) {
    let alpha = alpha.clamp(0.0, 1.0);
    for channel in 0..3 {
        let src = f64::from(color[channel]);
        let below = f64::from(dst.0[channel]);
        dst.0[channel] = (src * alpha + below * (1.0 - alpha)).round() as u8;
    }
    let below_alpha = f64::from(dst.0[3]) / 255.0;
    dst.0[3] = ((alpha + below_alpha * (1.0 - alpha)) * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use kurbo::Line;

    use super::*;

    fn full(line: Line) -> WeightedLink {
        WeightedLink { line, weight: 1.0 }
    }

    fn diagonal() -> Vec<WeightedLink> {
        vec![
            full(Line::new((-0.8, -0.3), (0.1, 0.7))),
            full(Line::new((0.1, 0.7), (0.9, -0.55))),
        ]
    }

    fn inked_bounds(frame: &Frame, background: [u8; 4]) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in frame.enumerate_pixels() {
            if pixel.0 == background {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds
    }

    #[test]
    fn empty_trail_renders_background_only() {
        let renderer = Renderer::default();
        let viewport = Viewport::new(320, 200);
        let frame = renderer.render(&[], &viewport, 4);

        assert_eq!(frame.dimensions(), (320, 200));
        let background = renderer.style().background;
        assert!(frame.pixels().all(|pixel| pixel.0 == background));
    }

    #[test]
    fn aliased_and_antialiased_frames_share_geometry() {
        let renderer = Renderer::default();
        let style = *renderer.style();
        let viewport = Viewport::new(400, 400);
        let links = diagonal();

        let aliased = renderer.render(&links, &viewport, 0);
        let smooth = renderer.render(&links, &viewport, 8);
        assert_eq!(aliased.dimensions(), smooth.dimensions());

        assert!(aliased
            .pixels()
            .all(|pixel| pixel.0 == style.background || pixel.0 == style.line));
        assert!(smooth
            .pixels()
            .any(|pixel| pixel.0 != style.background && pixel.0 != style.line));

        let (ax0, ay0, ax1, ay1) = inked_bounds(&aliased, style.background).unwrap();
        let (sx0, sy0, sx1, sy1) = inked_bounds(&smooth, style.background).unwrap();
        for (a, s) in [(ax0, sx0), (ay0, sy0), (ax1, sx1), (ay1, sy1)] {
            assert!(a.abs_diff(s) <= 1, "aliased {a} vs smooth {s}");
        }
    }

    #[test]
    fn fade_weight_scales_opacity() {
        let renderer = Renderer::default();
        let viewport = Viewport::new(200, 200);
        let line = Line::new((-0.5, 0.0), (0.5, 0.0));
        let center = (100, 100);

        let opaque = renderer.render(&[full(line)], &viewport, 0);
        let faded = renderer.render(&[WeightedLink { line, weight: 0.5 }], &viewport, 0);

        let opaque_red = opaque.get_pixel(center.0, center.1).0[0];
        let faded_red = faded.get_pixel(center.0, center.1).0[0];
        assert_eq!(opaque_red, 255);
        assert!(faded_red > 0 && faded_red < opaque_red);
    }

    #[test]
    fn viewport_centers_unit_circle_with_margin() {
        let viewport = Viewport::new(800, 600);
        assert_eq!(viewport.radius(), 250.0);
        assert_eq!(viewport.to_surface(Point::ORIGIN), Point::new(400.0, 300.0));
        assert_eq!(viewport.to_surface(Point::new(0.0, 1.0)), Point::new(400.0, 50.0));
        assert_eq!(Viewport::new(60, 60).radius(), 1.0);
    }

    #[test]
    fn links_outside_the_surface_are_skipped() {
        let renderer = Renderer::default();
        let viewport = Viewport::new(100, 100);
        let frame = renderer.render(&[full(Line::new((40.0, 40.0), (41.0, 42.0)))], &viewport, 2);
        let background = renderer.style().background;
        assert!(frame.pixels().all(|pixel| pixel.0 == background));
    }
}
