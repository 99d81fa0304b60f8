//! Text functions
//!
//! All positions and lengths are character-based, so multi-byte text
//! behaves the same as ASCII. Positions are 1-based on the way in and
//! out, matching the spreadsheet convention.

use regex::Regex;

use gridbase_core::CellValue;

use crate::error::{FormulaError, FormulaResult};
use crate::functions::{number_arg, string_arg, FuncContext};
use crate::value::{js_string, TypedValue};

/// CONCATENATE - join arguments into one string; null reads as empty,
/// arrays join with ", "
pub fn fn_concatenate(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let mut out = String::new();
    for param in params {
        out.push_str(&js_string(&param.value));
    }
    Ok(CellValue::String(out))
}

/// Character-wise substring search, returning a 0-based index
fn char_find(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn find_position(params: &[TypedValue]) -> Option<Option<usize>> {
    let needle: Vec<char> = string_arg(params, 0)?.chars().collect();
    let haystack: Vec<char> = string_arg(params, 1)?.chars().collect();
    let start = number_arg(params, 2).unwrap_or(1.0).trunc().max(1.0) as usize;
    Some(char_find(&haystack, &needle, start - 1).map(|i| i + 1))
}

/// FIND - 1-based position of one string in another, 0 when absent
pub fn fn_find(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match find_position(params) {
        Some(Some(position)) => Ok(CellValue::Number(position as f64)),
        Some(None) => Ok(CellValue::Number(0.0)),
        None => Ok(CellValue::Null),
    }
}

/// SEARCH - like FIND, but null when absent
pub fn fn_search(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match find_position(params) {
        Some(Some(position)) => Ok(CellValue::Number(position as f64)),
        _ => Ok(CellValue::Null),
    }
}

/// MID - substring by 1-based start and length
pub fn fn_mid(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let start = number_arg(params, 1).unwrap_or(1.0).trunc().max(1.0) as usize;
    let count = number_arg(params, 2).unwrap_or(0.0).trunc().max(0.0) as usize;

    let out: String = text.chars().skip(start - 1).take(count).collect();
    Ok(CellValue::String(out))
}

/// LEFT - leading characters, one by default
pub fn fn_left(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let count = number_arg(params, 1).unwrap_or(1.0).trunc().max(0.0) as usize;
    Ok(CellValue::String(text.chars().take(count).collect()))
}

/// RIGHT - trailing characters, one by default
pub fn fn_right(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let count = number_arg(params, 1).unwrap_or(1.0).trunc().max(0.0) as usize;
    let total = text.chars().count();
    Ok(CellValue::String(
        text.chars().skip(total.saturating_sub(count)).collect(),
    ))
}

/// LEN - character count
pub fn fn_len(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match string_arg(params, 0) {
        Some(s) => Ok(CellValue::Number(s.chars().count() as f64)),
        None => Ok(CellValue::Null),
    }
}

/// LOWER
pub fn fn_lower(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match string_arg(params, 0) {
        Some(s) => Ok(CellValue::String(s.to_lowercase())),
        None => Ok(CellValue::Null),
    }
}

/// UPPER
pub fn fn_upper(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match string_arg(params, 0) {
        Some(s) => Ok(CellValue::String(s.to_uppercase())),
        None => Ok(CellValue::Null),
    }
}

/// TRIM - strip surrounding whitespace
pub fn fn_trim(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match string_arg(params, 0) {
        Some(s) => Ok(CellValue::String(s.trim().to_string())),
        None => Ok(CellValue::Null),
    }
}

/// REPT - repeat a string; a non-positive count gives the empty string
pub fn fn_rept(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let count = number_arg(params, 1).unwrap_or(0.0).trunc().max(0.0) as usize;
    Ok(CellValue::String(text.repeat(count)))
}

/// T - the argument if it is text, null otherwise
pub fn fn_t(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match params.first().map(|p| &p.value) {
        Some(CellValue::String(s)) => Ok(CellValue::String(s.clone())),
        _ => Ok(CellValue::Null),
    }
}

/// REPLACE - splice new text over a 1-based character range
pub fn fn_replace(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let start = number_arg(params, 1).unwrap_or(1.0).trunc().max(1.0) as usize;
    let count = number_arg(params, 2).unwrap_or(0.0).trunc().max(0.0) as usize;
    let replacement = string_arg(params, 3).unwrap_or_default();

    let chars: Vec<char> = text.chars().collect();
    let split = (start - 1).min(chars.len());
    let resume = (split + count).min(chars.len());

    let mut out: String = chars[..split].iter().collect();
    out.push_str(&replacement);
    out.extend(&chars[resume..]);
    Ok(CellValue::String(out))
}

/// SUBSTITUTE - replace matches of a substring, optionally only the
/// nth occurrence
pub fn fn_substitute(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let pattern = string_arg(params, 1).unwrap_or_default();
    let replacement = string_arg(params, 2).unwrap_or_default();

    if pattern.is_empty() {
        return Ok(CellValue::String(text));
    }

    match number_arg(params, 3) {
        None => Ok(CellValue::String(text.replace(&pattern, &replacement))),
        Some(occurrence) => {
            let occurrence = occurrence.trunc();
            if occurrence < 1.0 {
                return Ok(CellValue::String(text));
            }
            match text.match_indices(&pattern).nth(occurrence as usize - 1) {
                Some((at, _)) => {
                    let mut out = String::with_capacity(text.len());
                    out.push_str(&text[..at]);
                    out.push_str(&replacement);
                    out.push_str(&text[at + pattern.len()..]);
                    Ok(CellValue::String(out))
                }
                None => Ok(CellValue::String(text)),
            }
        }
    }
}

/// ENCODE_URL_COMPONENT - percent-encode everything outside the
/// unreserved set
pub fn fn_encode_url_component(
    params: &[TypedValue],
    _ctx: &FuncContext<'_>,
) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };

    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => out.push(byte as char),
            b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    Ok(CellValue::String(out))
}

fn compile_pattern(name: &str, pattern: &str) -> FormulaResult<Regex> {
    Regex::new(pattern)
        .map_err(|_| FormulaError::param(name, format!("invalid regular expression '{}'", pattern)))
}

/// REGEXP_MATCH - whether the pattern matches anywhere in the text
pub fn fn_regexp_match(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let pattern = string_arg(params, 1).unwrap_or_default();
    let re = compile_pattern("REGEXP_MATCH", &pattern)?;
    Ok(CellValue::Boolean(re.is_match(&text)))
}

/// REGEXP_EXTRACT - first match of the pattern, preferring capture
/// group 1; null when nothing matches
pub fn fn_regexp_extract(
    params: &[TypedValue],
    _ctx: &FuncContext<'_>,
) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let pattern = string_arg(params, 1).unwrap_or_default();
    let re = compile_pattern("REGEXP_EXTRACT", &pattern)?;

    match re.captures(&text) {
        Some(caps) => {
            let found = caps.get(1).or_else(|| caps.get(0));
            Ok(found
                .map(|m| CellValue::String(m.as_str().to_string()))
                .unwrap_or(CellValue::Null))
        }
        None => Ok(CellValue::Null),
    }
}

/// REGEXP_REPLACE - replace every match; `$1`-style group references
/// work in the replacement
pub fn fn_regexp_replace(
    params: &[TypedValue],
    _ctx: &FuncContext<'_>,
) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let pattern = string_arg(params, 1).unwrap_or_default();
    let replacement = string_arg(params, 2).unwrap_or_default();
    let re = compile_pattern("REGEXP_REPLACE", &pattern)?;
    Ok(CellValue::String(
        re.replace_all(&text, replacement.as_str()).into_owned(),
    ))
}
