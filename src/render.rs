//! QR rendering for encoded tokens.

use crate::RollcallError;
use base64::{engine::general_purpose::STANDARD, Engine};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

/// Minimum rendered edge, in pixels.
pub const MIN_DIMENSION: u32 = 256;

/// A scannable rendering of an encoded token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    svg: String,
    width: usize,
}

impl QrImage {
    /// The SVG document.
    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Modules per side of the symbol.
    pub fn width(&self) -> usize {
        self.width
    }

    /// `data:` URI suitable for an `<img src>`.
    pub fn to_data_uri(&self) -> String {
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(self.svg.as_bytes()))
    }
}

/// Render `payload` verbatim as a QR code.
///
/// Error correction level M tolerates roughly 15% occlusion.
pub fn render_qr(payload: &str) -> Result<QrImage, RollcallError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| RollcallError::Render(format!("QR generation failed: {}", e)))?;

    let svg = code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(QrImage {
        svg,
        width: code.width(),
    })
}
