//! The five codecs plus the `NONE` passthrough, and the cheap fingerprint
//! / cost-model machinery that picks among them (spec 4.3).
//!
//! Every strategy operates on a flat `Vec<EncodableEntry>` — the manager
//! in `mod.rs` is responsible for getting a typed page's entries into
//! that shape and back out again.

use std::collections::HashMap;

use itertools::Itertools;

use super::{CompressedBlob, CompressionMetadata, EncodableEntry, Strategy};
use crate::config::BTreeConfig;

const PREFIX_MIN_LEN: usize = 4;
const DICT_MAX_DISTINCT_RATIO: f64 = 0.5;
const RLE_MIN_DOMINANT_RATIO: f64 = 0.2;
const DELTA_MIN_MONOTONIC_RATIO: f64 = 0.8;

/// General-purpose's estimated ratio when the fingerprint shows some
/// other redundancy signal (so deflate-family compression plausibly
/// helps, just less efficiently than a structure-aware codec).
const GENERAL_REDUNDANT_RATIO: f64 = 0.8;
/// General-purpose's estimated ratio when nothing else fired either —
/// the fallback is not assumed to help data with no detected structure.
const GENERAL_FLAT_RATIO: f64 = 0.95;

// ---------------------------------------------------------------------
// Fingerprinting
// ---------------------------------------------------------------------

pub(crate) struct Fingerprint {
    pub count: usize,
    pub has_values: bool,
    pub common_prefix: Vec<u8>,
    pub keys_numeric: bool,
    pub values_numeric: bool,
    pub monotonic_ratio: f64,
    pub distinct_value_ratio: f64,
    pub max_run_length: usize,
    pub total_payload_size: usize,
}

impl Fingerprint {
    pub fn compute(entries: &[EncodableEntry]) -> Self {
        let count = entries.len();
        let has_values = entries.first().map_or(false, |e| e.value.is_some());
        let total_payload_size: usize = entries.iter().map(|e| e.raw_len()).sum();

        let common_prefix = common_prefix(entries);

        let keys_numeric = count > 0 && entries.iter().all(|e| e.key_int.is_some());
        let monotonic_ratio = if keys_numeric && count > 1 {
            let mut rising = 0usize;
            for w in entries.windows(2) {
                if w[1].key_int.unwrap() > w[0].key_int.unwrap() {
                    rising += 1;
                }
            }
            rising as f64 / (count - 1) as f64
        } else {
            0.0
        };

        let values_numeric = has_values && entries.iter().all(|e| e.value_int.is_some());

        let distinct_value_ratio = if has_values {
            let distinct = entries.iter().filter_map(|e| e.value.as_ref()).unique().count();
            distinct as f64 / count as f64
        } else {
            1.0
        };

        let max_run_length = if has_values {
            let mut max_run = 0usize;
            let mut cur_run = 0usize;
            let mut last: Option<&Vec<u8>> = None;
            for e in entries {
                let v = e.value.as_ref();
                if v == last {
                    cur_run += 1;
                } else {
                    cur_run = 1;
                    last = v;
                }
                max_run = max_run.max(cur_run);
            }
            max_run
        } else {
            0
        };

        Self {
            count,
            has_values,
            common_prefix,
            keys_numeric,
            values_numeric,
            monotonic_ratio,
            distinct_value_ratio,
            max_run_length,
            total_payload_size,
        }
    }

    fn prefix_eligible(&self) -> bool {
        self.common_prefix.len() >= PREFIX_MIN_LEN
    }

    fn dict_eligible(&self) -> bool {
        self.has_values && self.distinct_value_ratio < DICT_MAX_DISTINCT_RATIO
    }

    fn rle_eligible(&self) -> bool {
        self.has_values
            && self.count > 0
            && (self.max_run_length as f64 / self.count as f64) >= RLE_MIN_DOMINANT_RATIO
    }

    fn delta_eligible(&self) -> bool {
        self.keys_numeric && self.count > 1 && self.monotonic_ratio >= DELTA_MIN_MONOTONIC_RATIO
    }

    fn redundancy_detected(&self) -> bool {
        self.prefix_eligible() || self.dict_eligible() || self.rle_eligible() || self.delta_eligible()
    }
}

fn common_prefix(entries: &[EncodableEntry]) -> Vec<u8> {
    let mut iter = entries.iter();
    let first = match iter.next() {
        Some(e) => &e.key,
        None => return Vec::new(),
    };
    let mut prefix_len = first.len();
    for e in iter {
        let max = prefix_len.min(e.key.len());
        let mut l = 0;
        while l < max && first[l] == e.key[l] {
            l += 1;
        }
        prefix_len = l;
        if prefix_len == 0 {
            break;
        }
    }
    first[..prefix_len].to_vec()
}

// ---------------------------------------------------------------------
// Cost model / selection
// ---------------------------------------------------------------------

pub(crate) fn estimate_all(
    entries: &[EncodableEntry],
    fp: &Fingerprint,
    config: &BTreeConfig,
) -> HashMap<Strategy, f64> {
    let mut out = HashMap::new();
    let total = fp.total_payload_size.max(1) as f64;

    if fp.prefix_eligible() {
        let savings = (fp.common_prefix.len() * fp.count.saturating_sub(1)) as f64;
        out.insert(Strategy::Prefix, ratio(savings, total));
    }

    if fp.dict_eligible() {
        out.insert(Strategy::Dict, ratio(dict_savings(entries) as f64, total));
    }

    if fp.delta_eligible() {
        out.insert(Strategy::Delta, ratio(delta_savings(entries, fp) as f64, total));
    }

    if fp.rle_eligible() {
        out.insert(Strategy::Rle, ratio(rle_savings(entries) as f64, total));
    }

    if fp.total_payload_size >= config.min_payload_for_general {
        let ratio_value = if fp.redundancy_detected() {
            GENERAL_REDUNDANT_RATIO
        } else {
            GENERAL_FLAT_RATIO
        };
        out.insert(Strategy::General, ratio_value);
    }

    out
}

fn ratio(savings: f64, total: f64) -> f64 {
    (1.0 - savings / total).max(0.01).min(1.0)
}

/// Priority used to break ties between equally-good estimates: cheapest
/// decoder wins (spec 4.3, step 3).
const TIE_BREAK_ORDER: [Strategy; 5] = [
    Strategy::Prefix,
    Strategy::Rle,
    Strategy::Delta,
    Strategy::Dict,
    Strategy::General,
];

pub(crate) fn pick_best(estimates: &HashMap<Strategy, f64>, acceptance: f64) -> Option<Strategy> {
    let mut best: Option<(Strategy, f64)> = None;
    for &strategy in TIE_BREAK_ORDER.iter() {
        if let Some(&r) = estimates.get(&strategy) {
            match best {
                None => best = Some((strategy, r)),
                Some((_, best_r)) if r < best_r => best = Some((strategy, r)),
                _ => {}
            }
        }
    }
    match best {
        Some((strategy, r)) if r <= acceptance => Some(strategy),
        _ => None,
    }
}

// ---------------------------------------------------------------------
// Byte-level helpers
// ---------------------------------------------------------------------

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn read_u32(buf: &[u8], pos: &mut usize) -> Result<u32, String> {
    if *pos + 4 > buf.len() {
        return Err("truncated buffer reading u32".to_string());
    }
    let v = u32::from_be_bytes([buf[*pos], buf[*pos + 1], buf[*pos + 2], buf[*pos + 3]]);
    *pos += 4;
    Ok(v)
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

fn read_bytes(buf: &[u8], pos: &mut usize) -> Result<Vec<u8>, String> {
    let len = read_u32(buf, pos)? as usize;
    if *pos + len > buf.len() {
        return Err("truncated buffer reading byte string".to_string());
    }
    let out = buf[*pos..*pos + len].to_vec();
    *pos += len;
    Ok(out)
}

fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

fn varint_len(mut v: u64) -> usize {
    let mut n = 1;
    while v >= 0x80 {
        v >>= 7;
        n += 1;
    }
    n
}

fn write_varint(buf: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            buf.push(byte | 0x80);
        } else {
            buf.push(byte);
            break;
        }
    }
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, String> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        if *pos >= buf.len() {
            return Err("truncated buffer reading varint".to_string());
        }
        let byte = buf[*pos];
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

// ---------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------

pub(crate) fn encode(
    strategy: Strategy,
    entries: &[EncodableEntry],
    fp: &Fingerprint,
) -> Result<(CompressedBlob, CompressionMetadata), String> {
    match strategy {
        Strategy::Prefix => Ok(encode_prefix(entries, fp)),
        Strategy::Dict => Ok(encode_dict(entries)),
        Strategy::Delta => Ok(encode_delta(entries, fp)),
        Strategy::Rle => Ok(encode_rle(entries)),
        Strategy::General => encode_general(entries),
        Strategy::None => Ok(encode_none(entries)),
    }
}

pub(crate) fn encode_none(entries: &[EncodableEntry]) -> (CompressedBlob, CompressionMetadata) {
    let has_values = entries.first().map_or(true, |e| e.has_value());
    let mut buf = Vec::new();
    for e in entries {
        write_bytes(&mut buf, &e.key);
        if has_values {
            write_bytes(&mut buf, e.value.as_ref().expect("has_values is uniform across a page"));
        }
    }
    let metadata = CompressionMetadata::None {
        count: entries.len(),
        has_values,
    };
    (CompressedBlob(buf), metadata)
}

fn encode_prefix(entries: &[EncodableEntry], fp: &Fingerprint) -> (CompressedBlob, CompressionMetadata) {
    let has_values = fp.has_values;
    let prefix = fp.common_prefix.clone();
    let mut buf = Vec::new();
    for e in entries {
        write_bytes(&mut buf, &e.key[prefix.len()..]);
        if has_values {
            write_bytes(&mut buf, e.value.as_ref().unwrap());
        }
    }
    let metadata = CompressionMetadata::Prefix {
        prefix,
        count: entries.len(),
        has_values,
    };
    (CompressedBlob(buf), metadata)
}

/// `sum(value_size × (count − 1))` across distinct values, minus the table
/// overhead of storing each distinct value once (spec 4.3 step 2).
fn dict_savings(entries: &[EncodableEntry]) -> i64 {
    let mut counts: HashMap<&Vec<u8>, usize> = HashMap::new();
    for e in entries {
        if let Some(value) = e.value.as_ref() {
            *counts.entry(value).or_insert(0) += 1;
        }
    }
    let repeat_savings: i64 = counts
        .iter()
        .map(|(value, count)| (value.len() * count.saturating_sub(1)) as i64)
        .sum();
    let table_overhead: i64 = counts.keys().map(|value| value.len() as i64).sum();
    (repeat_savings - table_overhead).max(0)
}

fn encode_dict(entries: &[EncodableEntry]) -> (CompressedBlob, CompressionMetadata) {
    let mut table: Vec<Vec<u8>> = Vec::new();
    let mut index_of: HashMap<Vec<u8>, u32> = HashMap::new();
    let mut buf = Vec::new();

    for e in entries {
        let value = e.value.as_ref().expect("dict strategy requires values");
        let index = *index_of.entry(value.clone()).or_insert_with(|| {
            table.push(value.clone());
            (table.len() - 1) as u32
        });
        write_bytes(&mut buf, &e.key);
        write_u32(&mut buf, index);
    }

    let metadata = CompressionMetadata::Dict {
        table,
        count: entries.len(),
    };
    (CompressedBlob(buf), metadata)
}

fn delta_savings(entries: &[EncodableEntry], fp: &Fingerprint) -> i64 {
    let mut savings = 0i64;
    for w in entries.windows(2) {
        let d = w[1].key_int.unwrap() - w[0].key_int.unwrap();
        savings += 8 - varint_len(zigzag_encode(d)) as i64;
    }
    if fp.values_numeric {
        for w in entries.windows(2) {
            let d = w[1].value_int.unwrap() - w[0].value_int.unwrap();
            savings += 8 - varint_len(zigzag_encode(d)) as i64;
        }
    }
    savings.max(0)
}

fn encode_delta(entries: &[EncodableEntry], fp: &Fingerprint) -> (CompressedBlob, CompressionMetadata) {
    let has_values = fp.has_values;
    let values_numeric = fp.values_numeric;
    let key_base = entries[0].key_int.unwrap();
    let value_base = if values_numeric { entries[0].value_int } else { None };

    let mut buf = Vec::new();
    let mut prev_key = key_base;
    let mut prev_value = value_base.unwrap_or(0);
    for (i, e) in entries.iter().enumerate() {
        let key_delta = if i == 0 { 0 } else { e.key_int.unwrap() - prev_key };
        prev_key = e.key_int.unwrap();
        write_varint(&mut buf, zigzag_encode(key_delta));

        if has_values {
            if values_numeric {
                let value_delta = if i == 0 { 0 } else { e.value_int.unwrap() - prev_value };
                prev_value = e.value_int.unwrap();
                write_varint(&mut buf, zigzag_encode(value_delta));
            } else {
                write_bytes(&mut buf, e.value.as_ref().unwrap());
            }
        }
    }

    let metadata = CompressionMetadata::Delta {
        base: key_base,
        value_base: value_base.unwrap_or(0),
        count: entries.len(),
        has_values,
        values_numeric,
    };
    (CompressedBlob(buf), metadata)
}

fn rle_savings(entries: &[EncodableEntry]) -> i64 {
    let mut savings = 0i64;
    let mut cur_run = 0usize;
    let mut last: Option<&Vec<u8>> = None;
    for e in entries {
        let v = e.value.as_ref();
        match (v, last) {
            (Some(a), Some(b)) if a == b => cur_run += 1,
            _ => {
                if let Some(b) = last {
                    savings += (cur_run.saturating_sub(1) * b.len()) as i64;
                }
                cur_run = 1;
                last = v;
            }
        }
    }
    if let Some(b) = last {
        savings += (cur_run.saturating_sub(1) * b.len()) as i64;
    }
    savings
}

fn encode_rle(entries: &[EncodableEntry]) -> (CompressedBlob, CompressionMetadata) {
    let mut buf = Vec::new();
    for e in entries {
        write_bytes(&mut buf, &e.key);
    }

    let mut runs: Vec<(Vec<u8>, u32)> = Vec::new();
    for e in entries {
        let v = e.value.as_ref().expect("rle strategy requires values");
        match runs.last_mut() {
            Some((last_v, count)) if last_v == v => *count += 1,
            _ => runs.push((v.clone(), 1)),
        }
    }

    write_u32(&mut buf, runs.len() as u32);
    for (value, count) in &runs {
        write_bytes(&mut buf, value);
        write_u32(&mut buf, *count);
    }

    let metadata = CompressionMetadata::Rle {
        count: entries.len(),
        has_values: true,
    };
    (CompressedBlob(buf), metadata)
}

fn encode_general(entries: &[EncodableEntry]) -> Result<(CompressedBlob, CompressionMetadata), String> {
    use std::io::Write;

    let (raw, _) = encode_none(entries);
    let raw_len = raw.0.len();
    let has_values = entries.first().map_or(true, |e| e.has_value());

    let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&raw.0).map_err(|e| e.to_string())?;
    let compressed = encoder.finish().map_err(|e| e.to_string())?;

    let metadata = CompressionMetadata::General {
        count: entries.len(),
        has_values,
        raw_len,
    };
    Ok((CompressedBlob(compressed), metadata))
}

// ---------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------

pub(crate) fn decode(blob: &CompressedBlob, metadata: &CompressionMetadata) -> Result<Vec<EncodableEntry>, String> {
    match metadata {
        CompressionMetadata::None { count, has_values } => decode_none(&blob.0, *count, *has_values),
        CompressionMetadata::Prefix { prefix, count, has_values } => {
            decode_prefix(&blob.0, prefix, *count, *has_values)
        }
        CompressionMetadata::Dict { table, count } => decode_dict(&blob.0, table, *count),
        CompressionMetadata::Delta { base, value_base, count, has_values, values_numeric } => {
            decode_delta(&blob.0, *base, *value_base, *count, *has_values, *values_numeric)
        }
        CompressionMetadata::Rle { count, has_values } => decode_rle(&blob.0, *count, *has_values),
        CompressionMetadata::General { count, has_values, .. } => decode_general(&blob.0, *count, *has_values),
    }
}

fn decode_none(buf: &[u8], count: usize, has_values: bool) -> Result<Vec<EncodableEntry>, String> {
    let mut pos = 0;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let key = read_bytes(buf, &mut pos)?;
        let value = if has_values { Some(read_bytes(buf, &mut pos)?) } else { None };
        out.push(EncodableEntry::raw(key, value));
    }
    Ok(out)
}

fn decode_prefix(buf: &[u8], prefix: &[u8], count: usize, has_values: bool) -> Result<Vec<EncodableEntry>, String> {
    let mut pos = 0;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let tail = read_bytes(buf, &mut pos)?;
        let mut key = prefix.to_vec();
        key.extend_from_slice(&tail);
        let value = if has_values { Some(read_bytes(buf, &mut pos)?) } else { None };
        out.push(EncodableEntry::raw(key, value));
    }
    Ok(out)
}

fn decode_dict(buf: &[u8], table: &[Vec<u8>], count: usize) -> Result<Vec<EncodableEntry>, String> {
    let mut pos = 0;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let key = read_bytes(buf, &mut pos)?;
        let index = read_u32(buf, &mut pos)? as usize;
        let value = table
            .get(index)
            .cloned()
            .ok_or_else(|| format!("dictionary index {} out of range ({} entries)", index, table.len()))?;
        out.push(EncodableEntry::raw(key, Some(value)));
    }
    Ok(out)
}

/// Delta decode is the one codec whose blob is not directly byte-for-byte
/// key/value data: keys (and, when `values_numeric` is set, values too)
/// are reconstructed as cumulative sums and re-expressed as 8-byte
/// big-endian `i64`s here. [`super::CompressionManager`] special-cases
/// this metadata variant and converts those canonical `i64` bytes through
/// `CompressibleKey::from_i64`/`CompressibleValue::from_i64` rather than
/// the usual `from_bytes` path.
fn decode_delta(
    buf: &[u8],
    base: i64,
    value_base: i64,
    count: usize,
    has_values: bool,
    values_numeric: bool,
) -> Result<Vec<EncodableEntry>, String> {
    let mut pos = 0;
    let mut out = Vec::with_capacity(count);
    let mut cur_key = base;
    let mut cur_value = value_base;

    for i in 0..count {
        let key_delta = zigzag_decode(read_varint(buf, &mut pos)?);
        cur_key = if i == 0 { base } else { cur_key + key_delta };

        let value = if has_values {
            if values_numeric {
                let value_delta = zigzag_decode(read_varint(buf, &mut pos)?);
                cur_value = if i == 0 { value_base } else { cur_value + value_delta };
                Some(cur_value.to_be_bytes().to_vec())
            } else {
                Some(read_bytes(buf, &mut pos)?)
            }
        } else {
            None
        };

        out.push(EncodableEntry::raw(cur_key.to_be_bytes().to_vec(), value));
    }
    Ok(out)
}

fn decode_rle(buf: &[u8], count: usize, has_values: bool) -> Result<Vec<EncodableEntry>, String> {
    let mut pos = 0;
    let mut keys = Vec::with_capacity(count);
    for _ in 0..count {
        keys.push(read_bytes(buf, &mut pos)?);
    }

    if !has_values {
        return Ok(keys.into_iter().map(|k| EncodableEntry::raw(k, None)).collect());
    }

    let run_count = read_u32(buf, &mut pos)? as usize;
    let mut values = Vec::with_capacity(count);
    for _ in 0..run_count {
        let value = read_bytes(buf, &mut pos)?;
        let run_len = read_u32(buf, &mut pos)? as usize;
        for _ in 0..run_len {
            values.push(value.clone());
        }
    }

    if values.len() != keys.len() {
        return Err(format!(
            "rle run lengths ({}) do not match key count ({})",
            values.len(),
            keys.len()
        ));
    }

    Ok(keys
        .into_iter()
        .zip(values.into_iter())
        .map(|(k, v)| EncodableEntry::raw(k, Some(v)))
        .collect())
}

fn decode_general(buf: &[u8], count: usize, has_values: bool) -> Result<Vec<EncodableEntry>, String> {
    use std::io::Write;

    let mut decoder = flate2::write::DeflateDecoder::new(Vec::new());
    decoder.write_all(buf).map_err(|e| e.to_string())?;
    let raw = decoder.finish().map_err(|e| e.to_string())?;
    decode_none(&raw, count, has_values)
}
