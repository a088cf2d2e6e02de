//! Card color resolution.

use crate::types::DEFAULT_COLOR;

/// Named colors accepted in place of a hex code.
const NAMED_COLORS: &[(&str, &str)] = &[
    ("red", "#FF0000"),
    ("blue", "#0000FF"),
    ("green", "#00FF00"),
    ("yellow", "#FFFF00"),
    ("orange", "#FFA500"),
    ("purple", "#800080"),
    ("pink", "#FFC0CB"),
    ("cyan", "#00FFFF"),
    ("magenta", "#FF00FF"),
    ("lime", "#00FF00"),
    ("navy", "#000080"),
    ("teal", "#008080"),
    ("silver", "#C0C0C0"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("maroon", "#800000"),
    ("olive", "#808000"),
    ("aqua", "#00FFFF"),
    ("fuchsia", "#FF00FF"),
    ("white", "#FFFFFF"),
    ("black", "#000000"),
    ("gold", "#FFD700"),
    ("discord", "#7289DA"),
    ("blurple", "#5865F2"),
];

/// Resolve user color input to `#RRGGBB` / `#RGB`.
///
/// Accepts a color name (case-insensitive) or a 3/6 digit hex code with or
/// without `#`. Anything else, including no input, yields [`DEFAULT_COLOR`].
pub fn resolve_color(input: Option<&str>) -> String {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_COLOR.to_string();
    };

    let lowered = raw.to_ascii_lowercase();
    if let Some((_, value)) = NAMED_COLORS.iter().find(|(name, _)| *name == lowered) {
        return (*value).to_string();
    }

    let digits = raw.strip_prefix('#').unwrap_or(raw);
    if matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return format!("#{}", digits.to_ascii_uppercase());
    }

    DEFAULT_COLOR.to_string()
}

/// Parse a resolved color into a 24-bit RGB value. `#RGB` expands to `#RRGGBB`.
pub fn color_to_rgb(color: &str) -> Option<u32> {
    let digits = color.strip_prefix('#').unwrap_or(color);
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    u32::from_str_radix(&expanded, 16).ok()
}
