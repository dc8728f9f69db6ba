use std::fmt::Display;

use thiserror::Error;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;

pub const DEFAULT_MEMORY: u64 = 512 * MB;
pub const DEFAULT_POOL_SIZE: u64 = 128 * MB;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryParseError {
    #[error("empty memory size")]
    Empty,
    #[error("invalid memory size {0:?}: expected digits followed by a unit")]
    InvalidNumber(String),
    #[error("unknown unit {0:?} (expected one of K, M, G, B)")]
    UnknownUnit(char),
    #[error("memory size {0:?} does not fit in 64 bits")]
    Overflow(String),
}

/// Outcome of parsing a memory argument with a fallback.
///
/// `fallback` holds the reason when `bytes` is the supplied default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySize {
    pub bytes: u64,
    pub fallback: Option<MemoryParseError>,
}

impl MemorySize {
    pub fn was_defaulted(&self) -> bool {
        self.fallback.is_some()
    }
}

impl Display for MemorySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bytes)
    }
}

/// Parses `<digits><unit>` where unit is one of K, M, G, B in either case.
pub fn parse_memory(text: &str) -> Result<u64, MemoryParseError> {
    let (split, unit) = text.char_indices().last().ok_or(MemoryParseError::Empty)?;
    let digits = &text[..split];

    // The number is checked before the unit, so "abcX" reports the number.
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MemoryParseError::InvalidNumber(text.to_string()));
    }
    // Only plain ASCII digits remain, so the parse can fail on overflow alone.
    let value: u64 = digits
        .parse()
        .map_err(|_| MemoryParseError::Overflow(text.to_string()))?;

    let scale = match unit.to_ascii_uppercase() {
        'K' => KB,
        'M' => MB,
        'G' => GB,
        'B' => 1,
        other => return Err(MemoryParseError::UnknownUnit(other)),
    };

    value
        .checked_mul(scale)
        .ok_or_else(|| MemoryParseError::Overflow(text.to_string()))
}

/// Lenient variant used by the CLI: any parse failure keeps `default`.
pub fn parse_memory_size(text: &str, default: u64) -> MemorySize {
    match parse_memory(text) {
        Ok(bytes) => MemorySize {
            bytes,
            fallback: None,
        },
        Err(err) => MemorySize {
            bytes: default,
            fallback: Some(err),
        },
    }
}

/// Memory budget and buffer pool size taken from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBudget {
    pub memory: u64,
    pub pool_size: u64,
    /// Why a default was used, if one was.
    pub fallback: Option<MemoryParseError>,
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self {
            memory: DEFAULT_MEMORY,
            pool_size: DEFAULT_POOL_SIZE,
            fallback: None,
        }
    }
}

/// Resolves the `[memory] [pool_size]` arguments.
///
/// The pool argument is only read once the memory argument parsed. A bad
/// memory value keeps both defaults, so the pool can never outgrow a
/// defaulted budget. A bad pool value keeps the parsed memory.
pub fn parse_budget(memory: Option<&str>, pool_size: Option<&str>) -> MemoryBudget {
    let mut budget = MemoryBudget::default();
    let Some(memory) = memory else {
        return budget;
    };

    match parse_memory(memory) {
        Ok(bytes) => budget.memory = bytes,
        Err(err) => {
            budget.fallback = Some(err);
            return budget;
        }
    }

    if let Some(pool_size) = pool_size {
        let pool = parse_memory_size(pool_size, DEFAULT_POOL_SIZE);
        budget.pool_size = pool.bytes;
        budget.fallback = pool.fallback;
    }
    budget
}
