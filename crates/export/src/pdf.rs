//! Print-to-PDF parameter mapping.
//!
//! Translates the configured PDF options (CSS-style lengths, paper format
//! names, templated headers) into the raw print parameters the browser
//! protocol expects, which are all in inches.

use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chrono::Utc;
use mdpress_config::PdfOptions;
use tracing::warn;

/// Known paper formats as (width, height) in inches.
fn paper_format(name: &str) -> Option<(f64, f64)> {
    match name.to_lowercase().as_str() {
        "letter" => Some((8.5, 11.0)),
        "legal" => Some((8.5, 14.0)),
        "tabloid" => Some((11.0, 17.0)),
        "ledger" => Some((17.0, 11.0)),
        "a0" => Some((33.1, 46.8)),
        "a1" => Some((23.4, 33.1)),
        "a2" => Some((16.54, 23.4)),
        "a3" => Some((11.7, 16.54)),
        "a4" => Some((8.27, 11.7)),
        "a5" => Some((5.83, 8.27)),
        "a6" => Some((4.13, 5.83)),
        _ => None,
    }
}

/// Parse a CSS-style length ("1.5cm", "72px", "0.5in") into inches.
/// A bare number is taken as pixels at 96 dpi.
pub fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (number, divisor) = if let Some(n) = value.strip_suffix("px") {
        (n, 96.0)
    } else if let Some(n) = value.strip_suffix("in") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("cm") {
        (n, 2.54)
    } else if let Some(n) = value.strip_suffix("mm") {
        (n, 25.4)
    } else {
        (value, 96.0)
    };
    number.trim().parse::<f64>().ok().map(|n| n / divisor)
}

/// Replace `%%ISO-DATETIME%%`, `%%ISO-DATE%%`, and `%%ISO-TIME%%` in a
/// header or footer template with the current UTC time.
pub fn substitute_date_placeholders(template: &str) -> String {
    let now = Utc::now();
    template
        .replace(
            "%%ISO-DATETIME%%",
            &now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        )
        .replace("%%ISO-DATE%%", &now.format("%Y-%m-%d").to_string())
        .replace("%%ISO-TIME%%", &now.format("%H:%M:%S").to_string())
}

/// Build the protocol parameters for one print job.
pub fn build_pdf_params(options: &PdfOptions) -> PrintToPdfParams {
    let mut params = PrintToPdfParams::default();

    params.landscape = Some(options.orientation.eq_ignore_ascii_case("landscape"));
    params.display_header_footer = Some(options.display_header_footer);
    params.print_background = Some(options.print_background);
    params.scale = Some(options.scale);

    // Explicit dimensions win over the named format.
    let width = parse_length(&options.width);
    let height = parse_length(&options.height);
    if width.is_some() || height.is_some() {
        params.paper_width = width;
        params.paper_height = height;
    } else {
        let (w, h) = paper_format(&options.format).unwrap_or_else(|| {
            warn!(format = %options.format, "unknown paper format, using A4");
            (8.27, 11.7)
        });
        params.paper_width = Some(w);
        params.paper_height = Some(h);
    }

    params.margin_top = parse_length(&options.margin.top);
    params.margin_right = parse_length(&options.margin.right);
    params.margin_bottom = parse_length(&options.margin.bottom);
    params.margin_left = parse_length(&options.margin.left);

    if !options.page_ranges.is_empty() {
        params.page_ranges = Some(options.page_ranges.clone());
    }
    if options.display_header_footer {
        params.header_template = Some(substitute_date_placeholders(&options.header_template));
        params.footer_template = Some(substitute_date_placeholders(&options.footer_template));
    }

    params
}
