//! Sysfs attribute reading and the numeric formats the kernel publishes
//! there.

use crate::error::{AccessError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Roots every filesystem lookup goes through. The defaults are the real
/// kernel locations; tests and chroots point them elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysPaths {
    pub class_root: PathBuf,
    pub dev_dir: PathBuf,
}

impl Default for SysPaths {
    fn default() -> Self {
        SysPaths {
            class_root: PathBuf::from("/sys/class"),
            dev_dir: PathBuf::from("/dev"),
        }
    }
}

impl SysPaths {
    pub fn new(class_root: impl Into<PathBuf>, dev_dir: impl Into<PathBuf>) -> Self {
        SysPaths {
            class_root: class_root.into(),
            dev_dir: dev_dir.into(),
        }
    }

    pub fn class_dir(&self, class: &str, name: &str) -> PathBuf {
        self.class_root.join(class).join(name)
    }

    pub fn dev_node(&self, name: &str) -> PathBuf {
        self.dev_dir.join(name)
    }
}

/// Reads a sysfs attribute and returns its first line.
pub fn read_attr(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)?;
    let line = contents.lines().next().unwrap_or("").to_string();
    debug!("{} = {:?}", path.display(), line);
    Ok(line)
}

pub fn read_hex_attr(path: &Path) -> Result<u64> {
    let line = read_attr(path)?;
    parse_hex(&line).ok_or_else(|| AccessError::Parse {
        path: path.to_path_buf(),
        contents: line,
    })
}

pub fn read_auto_attr(path: &Path) -> Result<u64> {
    let line = read_attr(path)?;
    parse_auto(&line).ok_or_else(|| AccessError::Parse {
        path: path.to_path_buf(),
        contents: line,
    })
}

/// Sizes and offsets read from sysfs must fit the address space, which is
/// 32 bits on many of the boards these drivers run on.
pub fn read_hex_size_attr(path: &Path) -> Result<usize> {
    fit_usize(path, read_hex_attr(path)?)
}

pub fn read_auto_size_attr(path: &Path) -> Result<usize> {
    fit_usize(path, read_auto_attr(path)?)
}

fn fit_usize(path: &Path, value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| AccessError::Parse {
        path: path.to_path_buf(),
        contents: format!("0x{:x}", value),
    })
}

/// Parses like `strtoull(s, NULL, 16)`: leading whitespace, an optional `+`,
/// an optional `0x`, then the longest run of hex digits. Trailing garbage is
/// ignored. A leading `-` is rejected rather than wrapped.
pub fn parse_hex(s: &str) -> Option<u64> {
    let s = strip_sign(s)?;
    let s = strip_radix_prefix(s).unwrap_or(s);
    parse_prefix(s, 16)
}

/// Parses like `strtoull(s, NULL, 0)`: `0x` selects hex, a leading `0`
/// selects octal, anything else is decimal.
pub fn parse_auto(s: &str) -> Option<u64> {
    let s = strip_sign(s)?;
    if let Some(hex) = strip_radix_prefix(s) {
        parse_prefix(hex, 16)
    } else if s.starts_with('0') {
        parse_prefix(s, 8)
    } else {
        parse_prefix(s, 10)
    }
}

fn strip_sign(s: &str) -> Option<&str> {
    let s = s.trim_start();
    if s.starts_with('-') {
        return None;
    }
    Some(s.strip_prefix('+').unwrap_or(s))
}

// "0x" only counts as a prefix when a hex digit follows it, otherwise the
// number is the lone "0".
fn strip_radix_prefix(s: &str) -> Option<&str> {
    let rest = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    match rest.chars().next() {
        Some(c) if c.is_ascii_hexdigit() => Some(rest),
        _ => None,
    }
}

fn parse_prefix(s: &str, radix: u32) -> Option<u64> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_digit(radix))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    u64::from_str_radix(&s[..end], radix).ok()
}
