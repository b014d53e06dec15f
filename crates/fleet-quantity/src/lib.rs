//! Parser for the canonical Kubernetes resource-quantity scheme used
//! throughout the quota engine, classification engine, health probe, and
//! constraint monitor (spec §3):
//!
//! > decimal suffixes `{k,M,G,T}` = 10^3n; binary `{Ki,Mi,Gi,Ti}` = 2^{10n};
//! > `m` = milli (×10⁻³). Parsing produces an integer of CPU-milli for CPU
//! > resources or bytes for memory/storage.
//!
//! Grounded on the suffix-scaling approach of `stackable-operator`'s
//! `quantity` module, simplified from its arbitrary-precision `Quantity`
//! type down to the two integer outputs this spec's testable properties
//! require (spec §8).

use snafu::{ensure, OptionExt, Snafu};

pub type Result<T, E = ParseQuantityError> = std::result::Result<T, E>;

#[derive(Debug, Snafu, PartialEq)]
pub enum ParseQuantityError {
    #[snafu(display("quantity '{input}' has no leading numeric value"))]
    InvalidFormat { input: String },
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Suffix {
    /// No suffix: the value is already in the resource's base unit (cores,
    /// bytes).
    None,
    /// `m`: milli, ×10⁻³.
    Milli,
    /// `k`, `M`, `G`, `T`: decimal multiple, ×1000^n.
    Decimal(i32),
    /// `Ki`, `Mi`, `Gi`, `Ti`: binary multiple, ×1024^n.
    Binary(i32),
}

const DECIMAL_SUFFIXES: [(&str, i32); 4] = [("k", 1), ("M", 2), ("G", 3), ("T", 4)];
const BINARY_SUFFIXES: [(&str, i32); 4] = [("Ki", 1), ("Mi", 2), ("Gi", 3), ("Ti", 4)];

fn split_suffix(input: &str) -> Result<(f64, Suffix)> {
    if input.is_empty() {
        return Ok((0.0, Suffix::None));
    }

    for (suffix, exponent) in BINARY_SUFFIXES {
        if let Some(number) = input.strip_suffix(suffix) {
            let value = parse_number(number, input)?;
            return Ok((value, Suffix::Binary(exponent)));
        }
    }

    if let Some(number) = input.strip_suffix('m') {
        let value = parse_number(number, input)?;
        return Ok((value, Suffix::Milli));
    }

    for (suffix, exponent) in DECIMAL_SUFFIXES {
        if let Some(number) = input.strip_suffix(suffix) {
            let value = parse_number(number, input)?;
            return Ok((value, Suffix::Decimal(exponent)));
        }
    }

    let value = parse_number(input, input)?;
    Ok((value, Suffix::None))
}

fn parse_number(number: &str, original: &str) -> Result<f64> {
    ensure!(
        !number.is_empty(),
        InvalidFormatSnafu {
            input: original.to_string()
        }
    );
    number.parse::<f64>().ok().context(InvalidFormatSnafu {
        input: original.to_string(),
    })
}

fn scaled_base_units(input: &str) -> Result<f64> {
    let (value, suffix) = split_suffix(input)?;
    let scaled = match suffix {
        Suffix::None => value,
        Suffix::Milli => value * 1e-3,
        Suffix::Decimal(n) => value * 1000f64.powi(n),
        Suffix::Binary(n) => value * 1024f64.powi(n),
    };
    Ok(scaled)
}

/// Parses a CPU quantity (e.g. `"500m"`, `"2"`, `"1.5"`) into CPU-milli.
/// `parse_cpu_millis("") == Ok(0)`.
pub fn parse_cpu_millis(input: &str) -> Result<i64> {
    let cores = scaled_base_units(input)?;
    Ok((cores * 1000.0).round() as i64)
}

/// Parses a memory/storage quantity (e.g. `"500Mi"`, `"1Gi"`, `"2048"`) into
/// bytes. `parse_bytes("") == Ok(0)`.
pub fn parse_bytes(input: &str) -> Result<i64> {
    let bytes = scaled_base_units(input)?;
    Ok(bytes.round() as i64)
}

/// Dispatches on whether `resource_key` names a CPU resource
/// (`requests.cpu`, `limits.cpu`, or bare `cpu`) or anything else, which is
/// treated as a byte-denominated or unitless (e.g. `pods`) resource. Used by
/// the quota engine (spec §4.G) where hard-limit maps mix CPU and non-CPU
/// keys under one canonical integer representation.
pub fn parse_for_resource(resource_key: &str, input: &str) -> Result<i64> {
    if resource_key.ends_with("cpu") {
        parse_cpu_millis(input)
    } else {
        parse_bytes(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("500Mi", 500 * 1024 * 1024)]
    #[case("1Gi", 1 << 30)]
    #[case("", 0)]
    #[case("2048", 2048)]
    #[case("1Ki", 1024)]
    fn bytes_cases(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(parse_bytes(input).unwrap(), expected);
    }

    #[rstest]
    #[case("100m", 100)]
    #[case("", 0)]
    #[case("1", 1000)]
    #[case("0.5", 500)]
    #[case("2", 2000)]
    fn cpu_milli_cases(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(parse_cpu_millis(input).unwrap(), expected);
    }

    #[test]
    fn rejects_unparseable_number() {
        assert!(matches!(
            parse_bytes("abc"),
            Err(ParseQuantityError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn dispatches_by_resource_key() {
        assert_eq!(parse_for_resource("requests.cpu", "250m").unwrap(), 250);
        assert_eq!(parse_for_resource("requests.memory", "1Gi").unwrap(), 1 << 30);
        assert_eq!(parse_for_resource("pods", "100").unwrap(), 100);
    }
}
