//! SVG assembly. Each chart draw builds its own [`SvgBuilder`], pushes raw
//! markup fragments, and finalizes into a standalone document: xmlns
//! declared, background painted, root font set. Nothing here is shared
//! between tiles, so draws are free of cross-request state.

use crate::theme::Theme;

pub struct SvgBuilder {
    width: f64,
    height: f64,
    body: String,
}

impl SvgBuilder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            body: String::new(),
        }
    }

    /// Appends a raw markup fragment. Text content must already be escaped
    /// with [`escape_xml`].
    pub fn push(&mut self, fragment: &str) {
        self.body.push_str(fragment);
    }

    /// Wraps the accumulated body into a self-contained SVG document.
    pub fn finish(self, theme: &Theme) -> String {
        let width = self.width;
        let height = self.height;
        let mut svg = String::with_capacity(self.body.len() + 256);
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" font-family=\"{}\" font-size=\"{}\">",
            theme.font_family, theme.font_size
        ));
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            theme.background
        ));
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        svg
    }
}

/// A single `<text>` element. `anchor` is an SVG text-anchor value.
pub fn text_element(x: f64, y: f64, anchor: &str, font_size: f64, fill: &str, content: &str) -> String {
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-size=\"{font_size}\" fill=\"{fill}\">{}</text>",
        escape_xml(content)
    )
}

/// `<text>` rotated around its own anchor point, for slanted axis labels.
pub fn rotated_text_element(
    x: f64,
    y: f64,
    angle: f64,
    anchor: &str,
    font_size: f64,
    fill: &str,
    content: &str,
) -> String {
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" transform=\"rotate({angle} {x:.2} {y:.2})\" text-anchor=\"{anchor}\" font-size=\"{font_size}\" fill=\"{fill}\">{}</text>",
        escape_xml(content)
    )
}

/// Polyline path data (`M x y L x y ...`) from a point list.
pub fn points_to_path(points: &[(f64, f64)]) -> String {
    let mut d = String::new();
    for (idx, (x, y)) in points.iter().enumerate() {
        if idx == 0 {
            d.push_str(&format!("M {x:.2} {y:.2}"));
        } else {
            d.push_str(&format!(" L {x:.2} {y:.2}"));
        }
    }
    d
}

/// Closed ring path data for region outlines. Multiple rings in one call
/// produce subpaths, which render holes under the evenodd fill rule.
pub fn rings_to_path(rings: &[Vec<(f64, f64)>]) -> String {
    let mut d = String::new();
    for ring in rings {
        if ring.is_empty() {
            continue;
        }
        if !d.is_empty() {
            d.push(' ');
        }
        d.push_str(&points_to_path(ring));
        d.push_str(" Z");
    }
    d
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
