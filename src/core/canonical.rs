//! Canonical JSON (RFC 8785, JCS) for content hashing.
//!
//! Semantically identical payloads must hash identically across platforms,
//! so serialization follows ECMAScript `JSON.stringify()` rules:
//!
//! - Object keys sorted by UTF-16 code units, at every nesting level
//! - No insignificant whitespace
//! - Strings escaped with the JSON short forms, other controls as `\u00xx`
//! - Floats in shortest round-trip form (`1.0` -> `1`, `1e21` -> `1e+21`)
//! - Arrays keep their order
//!
//! Integers that serde_json holds as `i64`/`u64` are written exactly.

use serde_json::{Map, Number, Value};

use crate::error::SealError;

/// Deepest object/array nesting accepted in a payload
pub const MAX_DEPTH: usize = 64;

/// Canonicalize any JSON value
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, SealError> {
    let mut out = String::new();
    write_value(&mut out, value, 0)?;
    Ok(out.into_bytes())
}

/// Canonicalize an evidence payload (a JSON object)
pub fn canonicalize_payload(payload: &Map<String, Value>) -> Result<Vec<u8>, SealError> {
    let mut out = String::new();
    write_object(&mut out, payload, 0)?;
    Ok(out.into_bytes())
}

/// Canonicalize and return as a string (for logs and fixtures)
pub fn canonical_string(value: &Value) -> Result<String, SealError> {
    let mut out = String::new();
    write_value(&mut out, value, 0)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &Value, depth: usize) -> Result<(), SealError> {
    match value {
        Value::Object(map) => write_object(out, map, depth),
        Value::Array(items) => {
            let depth = enter(depth)?;
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_value(out, item, depth)?;
            }
            out.push(']');
            Ok(())
        }
        Value::String(s) => {
            write_string(out, s);
            Ok(())
        }
        Value::Number(n) => write_number(out, n),
        Value::Bool(b) => {
            out.push_str(if *b { "true" } else { "false" });
            Ok(())
        }
        Value::Null => {
            out.push_str("null");
            Ok(())
        }
    }
}

fn write_object(out: &mut String, map: &Map<String, Value>, depth: usize) -> Result<(), SealError> {
    let depth = enter(depth)?;

    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

    out.push('{');
    for (idx, (key, value)) in entries.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, value, depth)?;
    }
    out.push('}');
    Ok(())
}

fn enter(depth: usize) -> Result<usize, SealError> {
    let next = depth + 1;
    if next > MAX_DEPTH {
        return Err(SealError::canonicalization(format!(
            "nesting deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(next)
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_number(out: &mut String, n: &Number) -> Result<(), SealError> {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        out.push_str(&format_f64(f)?);
    } else {
        return Err(SealError::canonicalization(format!(
            "number {} has no canonical form",
            n
        )));
    }
    Ok(())
}

/// ECMAScript Number::toString for finite doubles
fn format_f64(v: f64) -> Result<String, SealError> {
    if !v.is_finite() {
        return Err(SealError::canonicalization("non-finite number"));
    }
    if v == 0.0 {
        // -0 collapses to 0
        return Ok("0".to_string());
    }

    let sign = if v.is_sign_negative() { "-" } else { "" };
    let mut buf = ryu::Buffer::new();
    let (digits, n) = decimal_parts(buf.format_finite(v.abs()))?;
    let k = digits.len() as i32;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let exp = n - 1;
        let exp_sign = if exp >= 0 { "+" } else { "-" };
        let mantissa = if k == 1 {
            digits.clone()
        } else {
            format!("{}.{}", &digits[..1], &digits[1..])
        };
        format!("{}e{}{}", mantissa, exp_sign, exp.abs())
    };

    Ok(format!("{}{}", sign, body))
}

/// Split a ryu rendering into significant digits and decimal exponent `n`,
/// so that value = 0.DIGITS * 10^n.
fn decimal_parts(rendered: &str) -> Result<(String, i32), SealError> {
    let (mantissa, exp) = match rendered.split_once('e') {
        Some((m, e)) => {
            let exp = e
                .parse::<i32>()
                .map_err(|_| SealError::canonicalization(format!("bad exponent in {}", rendered)))?;
            (m, exp)
        }
        None => (rendered, 0),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut digits = format!("{}{}", int_part, frac_part);
    let mut point = int_part.len() as i32 + exp;

    let leading = digits.len() - digits.trim_start_matches('0').len();
    digits.drain(..leading);
    point -= leading as i32;

    let significant = digits.trim_end_matches('0').len();
    digits.truncate(significant);

    if digits.is_empty() {
        return Err(SealError::canonicalization(format!(
            "no significant digits in {}",
            rendered
        )));
    }

    Ok((digits, point))
}
