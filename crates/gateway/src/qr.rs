//! QR challenge → image data URL. Stateless.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use qrcode::render::svg;
use qrcode::QrCode;

use zg_domain::error::{Error, Result};

/// Encode an opaque QR payload as an SVG data URL suitable for an `<img>`
/// tag.
pub fn to_data_url(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| Error::Other(format!("qr encoding: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        BASE64.encode(image)
    ))
}
