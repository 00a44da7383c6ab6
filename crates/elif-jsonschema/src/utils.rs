use serde_json::{Number, Value};

/// Convert a type name into the kebab-case form used for `$id` suffixes.
///
/// `TestUser` -> `test-user`, `HTTPServer` -> `http-server`
pub fn to_kebab_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == ' ' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            continue;
        }
        if c.is_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Parse an integer literal
pub fn parse_integer(value: &str) -> Option<Number> {
    value.trim().parse::<i64>().ok().map(Number::from)
}

/// Parse a numeric literal, keeping integers integral
pub fn parse_number(value: &str) -> Option<Number> {
    parse_integer(value).or_else(|| {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
    })
}

/// Parse a float literal; integral input still produces a float (`1` -> `1.0`)
pub fn parse_float(value: &str) -> Option<Number> {
    value.trim().parse::<f64>().ok().and_then(Number::from_f64)
}

/// Best-effort literal coercion: boolean, then number, then string
pub fn coerce_literal(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match parse_number(value) {
            Some(number) => Value::Number(number),
            None => Value::String(value.to_string()),
        },
    }
}
