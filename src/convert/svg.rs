//! Raster to SVG emission.
//!
//! Every pixel with non-zero alpha becomes one unit `<rect>` filled with the
//! pixel's RGB colour; fully transparent pixels are skipped. Nothing is merged,
//! so the output grows linearly with the number of opaque pixels and callers
//! are expected to bound the raster size before calling [`emit_svg`].

use std::fmt::Write;

use image::RgbaImage;

/// Approximate length of one emitted `<rect>` element
const RECT_LEN_HINT: usize = 64;

/// Render `image` as an SVG document with one rectangle per opaque pixel.
pub fn emit_svg(image: &RgbaImage) -> String {
    let (width, height) = image.dimensions();
    let mut svg = String::with_capacity(128 + (width as usize * height as usize) * RECT_LEN_HINT);

    // Writing into a String cannot fail
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    svg.push('\n');

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            if a == 0 {
                continue;
            }
            let _ = writeln!(
                svg,
                r##"<rect x="{}" y="{}" width="1" height="1" fill="#{:02x}{:02x}{:02x}"/>"##,
                x, y, r, g, b
            );
        }
    }

    svg.push_str("</svg>\n");
    svg
}
