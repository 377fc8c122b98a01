//! Primitive bit-string encoders.
//!
//! Every encoder works on raw bit-strings (`'0'`/`'1'` text), most significant bit first.
//! Fixed-width encoders produce exactly the requested width. Variable-width encoders
//! (Fibonacci codes, ranges) also expose a `read` that decodes a prefix starting at an offset
//! and returns the offset just past it, which is how callers learn a field's width.

use crate::codec::{GppError, Result};
use crate::value::RangeEntry;
use chrono::{DateTime, Utc};

fn is_bit_string(bits: &str) -> bool {
    bits.bytes().all(|b| b == b'0' || b == b'1')
}

fn take(bits: &str, from: usize, n: usize) -> Result<&str> {
    let end = from + n;
    if end > bits.len() {
        return Err(GppError::Decoding(format!(
            "bit string too short: need {} bits at offset {}, have {}",
            n,
            from,
            bits.len()
        )));
    }
    Ok(&bits[from..end])
}

/// Sorted, deduplicated runs of consecutive ids as (first, last).
fn group_runs(ids: &[u32]) -> Vec<(u32, u32)> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for id in sorted {
        match runs.last_mut() {
            Some((_, last)) if *last + 1 == id => *last = id,
            _ => runs.push((id, id)),
        }
    }
    runs
}

pub struct FixedIntegerEncoder;

impl FixedIntegerEncoder {
    pub fn encode(value: u32, width: usize) -> Result<String> {
        if width > 32 {
            return Err(GppError::Encoding(format!("integer width {} exceeds 32 bits", width)));
        }
        FixedLongEncoder::encode(value as u64, width)
    }

    pub fn decode(bits: &str) -> Result<u32> {
        if bits.len() > 32 {
            return Err(GppError::Decoding(format!("Undecodable FixedInteger '{}'", bits)));
        }
        FixedLongEncoder::decode(bits).map(|v| v as u32)
    }
}

pub struct FixedLongEncoder;

impl FixedLongEncoder {
    pub fn encode(value: u64, width: usize) -> Result<String> {
        if width > 64 || (width < 64 && value >> width != 0) {
            return Err(GppError::Encoding(format!(
                "Numeric value '{}' is too large for a bit string length of '{}'",
                value, width
            )));
        }
        if width == 0 {
            return Ok(String::new());
        }
        Ok(format!("{:0width$b}", value, width = width))
    }

    pub fn decode(bits: &str) -> Result<u64> {
        if bits.len() > 64 || !is_bit_string(bits) {
            return Err(GppError::Decoding(format!("Undecodable FixedLong '{}'", bits)));
        }
        Ok(bits.bytes().fold(0u64, |acc, b| (acc << 1) | (b - b'0') as u64))
    }
}

pub struct BooleanEncoder;

impl BooleanEncoder {
    pub fn encode(value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }

    pub fn decode(bits: &str) -> Result<bool> {
        match bits {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(GppError::Decoding(format!("Undecodable Boolean '{}'", bits))),
        }
    }
}

pub struct FixedBitfieldEncoder;

impl FixedBitfieldEncoder {
    /// Exactly `width` bits, one per value in order, zero-padded on the right.
    pub fn encode(values: &[bool], width: usize) -> Result<String> {
        if values.len() > width {
            return Err(GppError::Encoding(format!(
                "Too many values '{}' for a bitfield of length '{}'",
                values.len(),
                width
            )));
        }
        let mut out: String = values.iter().map(|&b| if b { '1' } else { '0' }).collect();
        out.extend(std::iter::repeat('0').take(width - values.len()));
        Ok(out)
    }

    /// `'1'` is true, anything else false; output length equals input length.
    pub fn decode(bits: &str) -> Vec<bool> {
        bits.chars().map(|c| c == '1').collect()
    }
}

pub struct FixedIntegerListEncoder;

impl FixedIntegerListEncoder {
    pub fn encode(values: &[u32], element_width: usize, num_elements: usize) -> Result<String> {
        if values.len() != num_elements {
            return Err(GppError::Encoding(format!(
                "Expected {} values, got {}",
                num_elements,
                values.len()
            )));
        }
        let mut out = String::with_capacity(element_width * num_elements);
        for &v in values {
            out.push_str(&FixedIntegerEncoder::encode(v, element_width)?);
        }
        Ok(out)
    }

    pub fn decode(bits: &str, element_width: usize, num_elements: usize) -> Result<Vec<u32>> {
        if bits.len() != element_width * num_elements {
            return Err(GppError::Decoding(format!(
                "Undecodable FixedIntegerList '{}': expected {} bits",
                bits,
                element_width * num_elements
            )));
        }
        (0..num_elements)
            .map(|i| FixedIntegerEncoder::decode(&bits[i * element_width..(i + 1) * element_width]))
            .collect()
    }
}

/// Six bits per character: `code - 65`, with space as 63.
pub struct FixedStringEncoder;

impl FixedStringEncoder {
    pub fn encode(value: &str, chars: usize) -> Result<String> {
        if value.chars().count() > chars {
            return Err(GppError::Encoding(format!(
                "String '{}' is longer than {} characters",
                value, chars
            )));
        }
        let mut out = String::with_capacity(chars * 6);
        for c in value.chars() {
            let code = match c {
                ' ' => 63,
                c if (65..65 + 63).contains(&(c as u32)) => c as u32 - 65,
                _ => {
                    return Err(GppError::Encoding(format!(
                        "Unencodable FixedString '{}': character '{}'",
                        value, c
                    )))
                }
            };
            out.push_str(&FixedIntegerEncoder::encode(code, 6)?);
        }
        out.extend(std::iter::repeat('0').take(chars * 6 - out.len()));
        Ok(out)
    }

    pub fn decode(bits: &str) -> Result<String> {
        if bits.len() % 6 != 0 || !is_bit_string(bits) {
            return Err(GppError::Decoding(format!("Undecodable FixedString '{}'", bits)));
        }
        let mut out = String::with_capacity(bits.len() / 6);
        for chunk in bits.as_bytes().chunks(6) {
            let code = chunk.iter().fold(0u32, |acc, b| (acc << 1) | (b - b'0') as u32);
            if code == 63 {
                out.push(' ');
            } else {
                out.push(char::from(65 + code as u8));
            }
        }
        Ok(out)
    }
}

/// Deciseconds since the Unix epoch in 36 bits.
pub struct DatetimeEncoder;

impl DatetimeEncoder {
    pub const WIDTH: usize = 36;

    pub fn encode(value: &DateTime<Utc>) -> Result<String> {
        let millis = value.timestamp_millis();
        if millis < 0 {
            return Err(GppError::Encoding(format!("Datetime '{}' is before the epoch", value)));
        }
        FixedLongEncoder::encode(((millis + 50) / 100) as u64, Self::WIDTH)
    }

    pub fn decode(bits: &str) -> Result<DateTime<Utc>> {
        if bits.len() != Self::WIDTH {
            return Err(GppError::Decoding(format!("Undecodable Datetime '{}'", bits)));
        }
        let deci = FixedLongEncoder::decode(bits)?;
        DateTime::<Utc>::from_timestamp_millis(deci as i64 * 100)
            .ok_or_else(|| GppError::Decoding(format!("Datetime out of range '{}'", bits)))
    }
}

/// Longest code whose value can fit a `u32`, terminator included.
const MAX_FIBONACCI_BITS: usize = 47;

/// Zeckendorf code, smallest Fibonacci term first, terminated by an extra `1`.
pub struct FibonacciIntegerEncoder;

impl FibonacciIntegerEncoder {
    pub fn encode(value: u32) -> Result<String> {
        if value == 0 {
            return Err(GppError::Encoding("Fibonacci codes start at 1".to_string()));
        }
        let v = value as u64;
        let mut fib: Vec<u64> = vec![1];
        if v >= 2 {
            fib.push(2);
            loop {
                let n = fib.len();
                let next = fib[n - 1] + fib[n - 2];
                if next > v {
                    break;
                }
                fib.push(next);
            }
        }
        let mut bits = vec![b'0'; fib.len()];
        let mut remaining = v;
        for i in (0..fib.len()).rev() {
            if remaining >= fib[i] {
                bits[i] = b'1';
                remaining -= fib[i];
            }
        }
        bits.push(b'1');
        Ok(bits.into_iter().map(char::from).collect())
    }

    pub fn decode(bits: &str) -> Result<u32> {
        if !is_bit_string(bits) || bits.len() < 2 || bits.find("11") != Some(bits.len() - 2) {
            return Err(GppError::Decoding(format!("Undecodable FibonacciInteger '{}'", bits)));
        }
        if bits.len() > MAX_FIBONACCI_BITS {
            return Err(GppError::Decoding(format!("FibonacciInteger overflow '{}'", bits)));
        }
        let (mut term, mut next) = (1u64, 2u64);
        let mut value = 0u64;
        for c in bits[..bits.len() - 1].bytes() {
            if c == b'1' {
                value += term;
            }
            let after = term + next;
            term = next;
            next = after;
        }
        u32::try_from(value)
            .map_err(|_| GppError::Decoding(format!("FibonacciInteger overflow '{}'", bits)))
    }

    /// Decode the code starting at `from`; returns the value and the offset after its `11`.
    pub fn read(bits: &str, from: usize) -> Result<(u32, usize)> {
        let rest = bits.get(from..).unwrap_or("");
        let end = rest
            .find("11")
            .map(|i| from + i + 2)
            .ok_or_else(|| GppError::Decoding(format!("Unterminated FibonacciInteger at {}", from)))?;
        Ok((Self::decode(&bits[from..end])?, end))
    }
}

/// 12-bit run count, then per run `0`+16-bit id or `1`+16-bit first+16-bit last.
pub struct FixedIntegerRangeEncoder;

impl FixedIntegerRangeEncoder {
    pub fn encode(ids: &[u32]) -> Result<String> {
        let runs = group_runs(ids);
        let mut out = FixedIntegerEncoder::encode(runs.len() as u32, 12)?;
        for (first, last) in runs {
            if first == last {
                out.push('0');
                out.push_str(&FixedIntegerEncoder::encode(first, 16)?);
            } else {
                out.push('1');
                out.push_str(&FixedIntegerEncoder::encode(first, 16)?);
                out.push_str(&FixedIntegerEncoder::encode(last, 16)?);
            }
        }
        Ok(out)
    }

    pub fn decode(bits: &str) -> Result<Vec<u32>> {
        Self::read(bits, 0).map(|(ids, _)| ids)
    }

    pub fn read(bits: &str, from: usize) -> Result<(Vec<u32>, usize)> {
        let count = FixedIntegerEncoder::decode(take(bits, from, 12)?)?;
        let mut pos = from + 12;
        let mut ids: Vec<u32> = Vec::new();
        for _ in 0..count {
            let is_run = BooleanEncoder::decode(take(bits, pos, 1)?)?;
            pos += 1;
            let first = FixedIntegerEncoder::decode(take(bits, pos, 16)?)?;
            pos += 16;
            let last = if is_run {
                let last = FixedIntegerEncoder::decode(take(bits, pos, 16)?)?;
                pos += 16;
                last
            } else {
                first
            };
            if last < first {
                return Err(GppError::Decoding(format!("Invalid range {}-{}", first, last)));
            }
            // Runs must ascend without overlap, which also bounds the output to 65536 ids.
            if let Some(&prev) = ids.last() {
                if first <= prev {
                    return Err(GppError::Decoding(format!(
                        "Range starting at {} does not follow {}",
                        first, prev
                    )));
                }
            }
            ids.extend(first..=last);
        }
        Ok((ids, pos))
    }
}

/// 12-bit run count, then runs as Fibonacci-coded deltas from the previous id.
pub struct FibonacciIntegerRangeEncoder;

impl FibonacciIntegerRangeEncoder {
    pub fn encode(ids: &[u32]) -> Result<String> {
        let runs = group_runs(ids);
        let mut out = FixedIntegerEncoder::encode(runs.len() as u32, 12)?;
        let mut offset = 0u32;
        for (first, last) in runs {
            if last > u16::MAX as u32 {
                return Err(GppError::Encoding(format!("FibonacciIntegerRange id {} out of range", last)));
            }
            if first == last {
                out.push('0');
                out.push_str(&FibonacciIntegerEncoder::encode(first - offset)?);
            } else {
                out.push('1');
                out.push_str(&FibonacciIntegerEncoder::encode(first - offset)?);
                out.push_str(&FibonacciIntegerEncoder::encode(last - first)?);
            }
            offset = last;
        }
        Ok(out)
    }

    pub fn decode(bits: &str) -> Result<Vec<u32>> {
        Self::read(bits, 0).map(|(ids, _)| ids)
    }

    pub fn read(bits: &str, from: usize) -> Result<(Vec<u32>, usize)> {
        let count = FixedIntegerEncoder::decode(take(bits, from, 12)?)?;
        let mut pos = from + 12;
        let mut offset = 0u32;
        let mut ids = Vec::new();
        for _ in 0..count {
            let is_run = BooleanEncoder::decode(take(bits, pos, 1)?)?;
            pos += 1;
            let (delta, next) = FibonacciIntegerEncoder::read(bits, pos)?;
            pos = next;
            let first = offset
                .checked_add(delta)
                .ok_or_else(|| GppError::Decoding("FibonacciIntegerRange overflow".to_string()))?;
            let last = if is_run {
                let (len, next) = FibonacciIntegerEncoder::read(bits, pos)?;
                pos = next;
                first
                    .checked_add(len)
                    .ok_or_else(|| GppError::Decoding("FibonacciIntegerRange overflow".to_string()))?
            } else {
                first
            };
            if last > u16::MAX as u32 {
                return Err(GppError::Decoding(format!("FibonacciIntegerRange id {} out of range", last)));
            }
            ids.extend(first..=last);
            offset = last;
        }
        Ok((ids, pos))
    }
}

/// 16-bit max id, then `1`+fixed range or `0`+bitfield of max bits, whichever is shorter.
pub struct OptimizedFixedRangeEncoder;

impl OptimizedFixedRangeEncoder {
    pub fn encode(ids: &[u32]) -> Result<String> {
        let range = FixedIntegerRangeEncoder::encode(ids)?;
        optimized_encode(ids, range)
    }

    pub fn decode(bits: &str) -> Result<Vec<u32>> {
        Self::read(bits, 0).map(|(ids, _)| ids)
    }

    pub fn read(bits: &str, from: usize) -> Result<(Vec<u32>, usize)> {
        optimized_read(bits, from, FixedIntegerRangeEncoder::read)
    }
}

/// Same as [`OptimizedFixedRangeEncoder`] with a Fibonacci range.
pub struct OptimizedFibonacciRangeEncoder;

impl OptimizedFibonacciRangeEncoder {
    pub fn encode(ids: &[u32]) -> Result<String> {
        let range = FibonacciIntegerRangeEncoder::encode(ids)?;
        optimized_encode(ids, range)
    }

    pub fn decode(bits: &str) -> Result<Vec<u32>> {
        Self::read(bits, 0).map(|(ids, _)| ids)
    }

    pub fn read(bits: &str, from: usize) -> Result<(Vec<u32>, usize)> {
        optimized_read(bits, from, FibonacciIntegerRangeEncoder::read)
    }
}

fn optimized_encode(ids: &[u32], range: String) -> Result<String> {
    let max = ids.iter().copied().max().unwrap_or(0);
    let mut out = FixedIntegerEncoder::encode(max, 16)?;
    if range.len() <= max as usize {
        out.push('1');
        out.push_str(&range);
    } else {
        let mut bitfield = vec![false; max as usize];
        for &id in ids {
            if id >= 1 {
                bitfield[id as usize - 1] = true;
            }
        }
        out.push('0');
        out.push_str(&FixedBitfieldEncoder::encode(&bitfield, max as usize)?);
    }
    Ok(out)
}

fn optimized_read(
    bits: &str,
    from: usize,
    read_range: fn(&str, usize) -> Result<(Vec<u32>, usize)>,
) -> Result<(Vec<u32>, usize)> {
    let max = FixedIntegerEncoder::decode(take(bits, from, 16)?)? as usize;
    let is_range = BooleanEncoder::decode(take(bits, from + 16, 1)?)?;
    if is_range {
        let (ids, end) = read_range(bits, from + 17)?;
        if let Some(&last) = ids.last() {
            if last as usize > max {
                return Err(GppError::Decoding(format!("Range id {} exceeds max id {}", last, max)));
            }
        }
        Ok((ids, end))
    } else {
        let field = FixedBitfieldEncoder::decode(take(bits, from + 17, max)?);
        let ids = field
            .iter()
            .enumerate()
            .filter(|&(_, &set)| set)
            .map(|(i, _)| i as u32 + 1)
            .collect();
        Ok((ids, from + 17 + max))
    }
}

/// 12-bit entry count, then per entry key, type and a fixed integer range of ids.
pub struct ArrayOfRangesEncoder;

impl ArrayOfRangesEncoder {
    pub fn encode(entries: &[RangeEntry], key_width: usize, type_width: usize) -> Result<String> {
        let mut out = FixedIntegerEncoder::encode(entries.len() as u32, 12)?;
        for e in entries {
            out.push_str(&FixedIntegerEncoder::encode(e.key(), key_width)?);
            out.push_str(&FixedIntegerEncoder::encode(e.kind(), type_width)?);
            out.push_str(&FixedIntegerRangeEncoder::encode(e.ids())?);
        }
        Ok(out)
    }

    pub fn decode(bits: &str, key_width: usize, type_width: usize) -> Result<Vec<RangeEntry>> {
        Self::read(bits, 0, key_width, type_width).map(|(entries, _)| entries)
    }

    pub fn read(
        bits: &str,
        from: usize,
        key_width: usize,
        type_width: usize,
    ) -> Result<(Vec<RangeEntry>, usize)> {
        let count = FixedIntegerEncoder::decode(take(bits, from, 12)?)?;
        let mut pos = from + 12;
        let mut entries = Vec::new();
        for _ in 0..count {
            let key = FixedIntegerEncoder::decode(take(bits, pos, key_width)?)?;
            pos += key_width;
            let kind = FixedIntegerEncoder::decode(take(bits, pos, type_width)?)?;
            pos += type_width;
            let (ids, next) = FixedIntegerRangeEncoder::read(bits, pos)?;
            pos = next;
            if entries.iter().any(|e: &RangeEntry| e.key() == key && e.kind() == kind) {
                return Err(GppError::Decoding(format!("Duplicate range entry {}/{}", key, kind)));
            }
            let entry = RangeEntry::new(key, kind, ids)
                .map_err(|e| GppError::Decoding(e.to_string()))?;
            entries.push(entry);
        }
        Ok((entries, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_are_sorted_and_merged() {
        assert_eq!(group_runs(&[5, 1, 2, 3, 7, 3]), vec![(1, 3), (5, 5), (7, 7)]);
        assert!(group_runs(&[]).is_empty());
    }

    #[test]
    fn take_reports_short_input() {
        let err = take("0101", 2, 3).unwrap_err();
        assert!(matches!(err, GppError::Decoding(_)));
    }
}
