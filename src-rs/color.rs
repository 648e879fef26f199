use image::Rgba;

/// Parse a CSS color string. Supports `#rgb`, `#rrggbb`, `#rrggbbaa`,
/// `rgb(...)`, `rgba(...)` and a handful of keywords.
pub fn parse_color_opt(raw: &str) -> Option<Rgba<u8>> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = s.to_ascii_lowercase();
    if let Some(body) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let r = channel(parts[0])?;
        let g = channel(parts[1])?;
        let b = channel(parts[2])?;
        let a = match parts.get(3) {
            Some(alpha) => {
                let value = alpha.parse::<f64>().ok()?;
                if value <= 1.0 {
                    (value * 255.0).round().clamp(0.0, 255.0) as u8
                } else {
                    value.round().clamp(0.0, 255.0) as u8
                }
            }
            None => 255,
        };
        return Some(Rgba([r, g, b, a]));
    }

    let named = match lower.as_str() {
        "black" => [0, 0, 0, 255],
        "white" => [255, 255, 255, 255],
        "red" => [255, 0, 0, 255],
        "green" => [0, 128, 0, 255],
        "lime" => [0, 255, 0, 255],
        "blue" => [0, 0, 255, 255],
        "yellow" => [255, 255, 0, 255],
        "orange" => [255, 165, 0, 255],
        "gray" | "grey" => [128, 128, 128, 255],
        "transparent" => [0, 0, 0, 0],
        _ => return None,
    };
    Some(Rgba(named))
}

pub fn parse_color(raw: &str, fallback: [u8; 4]) -> Rgba<u8> {
    parse_color_opt(raw).unwrap_or(Rgba(fallback))
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(Rgba(out))
        }
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn channel(raw: &str) -> Option<u8> {
    Some(raw.parse::<f64>().ok()?.round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_color_opt("#ff0000"), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_color_opt("#0f08"), None);
        assert_eq!(parse_color_opt("#0f0"), Some(Rgba([0, 255, 0, 255])));
        assert_eq!(parse_color_opt("#00000080"), Some(Rgba([0, 0, 0, 128])));
    }

    #[test]
    fn parses_functional_forms() {
        assert_eq!(
            parse_color_opt("rgba(0, 0, 0, 0.5)"),
            Some(Rgba([0, 0, 0, 128]))
        );
        assert_eq!(parse_color_opt("rgb(10,20,30)"), Some(Rgba([10, 20, 30, 255])));
        assert_eq!(parse_color_opt("rgb(10,20)"), None);
    }

    #[test]
    fn unknown_falls_back() {
        assert_eq!(parse_color("nope", [1, 2, 3, 4]), Rgba([1, 2, 3, 4]));
        assert_eq!(parse_color("White", [0, 0, 0, 0]), Rgba([255, 255, 255, 255]));
    }
}
