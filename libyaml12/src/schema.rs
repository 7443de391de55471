//! Tag resolution against the YAML 1.2 core schema.

use num_bigint::BigInt;
use num_traits::Num;

use crate::node::{Node, NodeKind};

/// Prefix of the standard YAML tags.
pub const YAML_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// Decides which resolved tags are known and whether a node fits its tag.
pub trait TagResolver {
    /// Whether this resolver knows the tag `uri`.
    fn claims(&self, uri: &str) -> bool;

    /// Whether `node` can be constructed as the claimed tag `uri`.
    fn accepts(&self, uri: &str, node: &Node) -> bool;
}

/// The core schema: `str`, `int`, `float`, `bool`, `null`, `seq` and `map`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreSchema;

impl CoreSchema {
    /// Value of a core schema integer: decimal with optional sign, `0o`
    /// octal or `0x` hexadecimal, of any size. `None` when `text` is not
    /// one.
    pub fn int_value(text: &str) -> Option<BigInt> {
        let (radix, digits, negative) = if let Some(octal) = text.strip_prefix("0o") {
            (8, octal, false)
        } else if let Some(hex) = text.strip_prefix("0x") {
            (16, hex, false)
        } else if let Some(decimal) = text.strip_prefix('-') {
            (10, decimal, true)
        } else {
            (10, text.strip_prefix('+').unwrap_or(text), false)
        };
        // from_str_radix also takes a sign and `_` separators.
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let value = BigInt::from_str_radix(digits, radix).ok()?;
        Some(if negative { -value } else { value })
    }

    fn short_name(uri: &str) -> Option<&str> {
        let name = uri.strip_prefix(YAML_TAG_PREFIX)?;
        matches!(name, "str" | "int" | "float" | "bool" | "null" | "seq" | "map").then_some(name)
    }
}

impl TagResolver for CoreSchema {
    fn claims(&self, uri: &str) -> bool {
        Self::short_name(uri).is_some()
    }

    fn accepts(&self, uri: &str, node: &Node) -> bool {
        let Some(name) = Self::short_name(uri) else {
            return false;
        };
        match (&node.kind, name) {
            (NodeKind::Sequence { .. }, "seq") => true,
            (NodeKind::Mapping { .. }, "map") => true,
            (NodeKind::Scalar(_), "str") => true,
            (NodeKind::Scalar(scalar), "null") => is_null(&scalar.value),
            (NodeKind::Scalar(scalar), "bool") => is_bool(&scalar.value),
            (NodeKind::Scalar(scalar), "int") => is_int(&scalar.value),
            (NodeKind::Scalar(scalar), "float") => is_float(&scalar.value),
            _ => false,
        }
    }
}

pub fn is_null(text: &str) -> bool {
    matches!(text, "" | "~" | "null" | "Null" | "NULL")
}

pub fn is_bool(text: &str) -> bool {
    matches!(text, "true" | "True" | "TRUE" | "false" | "False" | "FALSE")
}

pub fn is_int(text: &str) -> bool {
    CoreSchema::int_value(text).is_some()
}

pub fn is_float(text: &str) -> bool {
    if matches!(text, ".nan" | ".NaN" | ".NAN") {
        return true;
    }
    let unsigned = text.strip_prefix(&['-', '+'][..]).unwrap_or(text);
    if matches!(unsigned, ".inf" | ".Inf" | ".INF") {
        return true;
    }

    let (mantissa, exponent) = match unsigned.find(&['e', 'E'][..]) {
        Some(i) => (&unsigned[..i], Some(&unsigned[i + 1..])),
        None => (unsigned, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (mantissa, None),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = match fraction {
        Some(fraction) => {
            all_digits(whole) && all_digits(fraction) && !(whole.is_empty() && fraction.is_empty())
        }
        None => !whole.is_empty() && all_digits(whole),
    };
    let exponent_ok = exponent.map_or(true, |e| {
        let e = e.strip_prefix(&['-', '+'][..]).unwrap_or(e);
        !e.is_empty() && all_digits(e)
    });
    mantissa_ok && exponent_ok
}
