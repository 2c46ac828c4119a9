//! Kubernetes resource quantity parsing, enough to compare requests against
//! limits.

use regex::Regex;
use std::sync::OnceLock;

static CPU_RE: OnceLock<Regex> = OnceLock::new();
static MEMORY_RE: OnceLock<Regex> = OnceLock::new();

fn cpu_re() -> &'static Regex {
    CPU_RE.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)?)(m?)$").expect("static regex"))
}

fn memory_re() -> &'static Regex {
    MEMORY_RE.get_or_init(|| {
        Regex::new(r"^(\d+)(Ki|Mi|Gi|Ti|k|M|G|T)?$").expect("static regex")
    })
}

/// `"500m"` -> 500, `"2"` -> 2000, `"0.5"` -> 500. `None` for empty or
/// unparseable input.
pub fn parse_cpu_millis(value: &str) -> Option<u64> {
    let caps = cpu_re().captures(value.trim())?;
    let number: f64 = caps[1].parse().ok()?;
    let millis = if &caps[2] == "m" {
        number
    } else {
        number * 1000.0
    };
    Some(millis.round() as u64)
}

/// `"128Mi"` -> 134217728, `"1G"` -> 1000000000, `"512"` -> 512.
pub fn parse_memory_bytes(value: &str) -> Option<u64> {
    let caps = memory_re().captures(value.trim())?;
    let number: u64 = caps[1].parse().ok()?;
    let multiplier: u64 = match caps.get(2).map(|m| m.as_str()) {
        None => 1,
        Some("Ki") => 1 << 10,
        Some("Mi") => 1 << 20,
        Some("Gi") => 1 << 30,
        Some("Ti") => 1 << 40,
        Some("k") => 1_000,
        Some("M") => 1_000_000,
        Some("G") => 1_000_000_000,
        Some("T") => 1_000_000_000_000,
        Some(_) => return None,
    };
    number.checked_mul(multiplier)
}
