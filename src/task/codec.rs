//! Byte encoding used to hand a task across a process boundary.
//!
//! Format:
//! - 4 bytes: magic `HPRB`
//! - varint: format version (currently 1)
//! - string: task type tag
//! - desc fields: key, start_time, end_time, interval_sec, count, priority,
//!   context_interval_sec, parameters
//! - kind-specific fields; for HTTP probes: url, method, headers, duration,
//!   data_consumed
//!
//! Integers are unsigned varints, `f64` values are the varint of their bit
//! pattern, timestamps are zig-zag varints of epoch milliseconds, strings are
//! a varint length followed by UTF-8 bytes, optional values carry a leading
//! presence byte.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use unsigned_varint::{decode as varint_decode, encode as varint_encode};

use super::{MeasurementError, ProbeTask, Task, TaskDesc, TaskKind};
use crate::probe::ProbeSpec;

const MAGIC: &[u8; 4] = b"HPRB";

/// Current format version.
pub const FORMAT_VERSION: u64 = 1;

/// Serialize a task.
pub fn encode_task(task: &Task) -> Vec<u8> {
    let mut w = Writer::default();
    w.buf.extend_from_slice(MAGIC);
    w.u64(FORMAT_VERSION);
    w.str(task.kind().tag());
    write_desc(&mut w, task.desc());

    match task {
        Task::HttpProbe(t) => {
            w.str(t.spec().url());
            w.str(t.spec().method());
            w.opt_str(t.spec().headers());
            w.u64(t.duration());
            w.u64(t.data_consumed());
        }
    }

    w.buf
}

/// Deserialize a task produced by [`encode_task`].
///
/// The stored URL is already normalized and is restored as-is.
pub fn decode_task(data: &[u8]) -> Result<Task, MeasurementError> {
    let mut r = Reader { remaining: data };

    if r.take(MAGIC.len())? != MAGIC {
        return Err(MeasurementError::Decode("bad magic".to_string()));
    }
    let version = r.u64()?;
    if version != FORMAT_VERSION {
        return Err(MeasurementError::Decode(format!("unsupported format version {}", version)));
    }

    let tag = r.string()?;
    let kind = TaskKind::from_tag(&tag)
        .ok_or_else(|| MeasurementError::Decode(format!("unknown task type {:?}", tag)))?;
    let desc = read_desc(&mut r, kind)?;

    let task = match kind {
        TaskKind::HttpProbe => {
            let url = r.string()?;
            let method = r.string()?;
            let headers = r.opt_string()?;
            let duration = r.u64()?;
            let data_consumed = r.u64()?;
            let spec = ProbeSpec::from_stored(url, method, headers)
                .map_err(|e| MeasurementError::Decode(e.to_string()))?;
            Task::HttpProbe(ProbeTask::from_parts(desc, spec, duration, data_consumed))
        }
    };

    if !r.remaining.is_empty() {
        return Err(MeasurementError::Decode(format!(
            "{} trailing bytes",
            r.remaining.len()
        )));
    }

    Ok(task)
}

fn write_desc(w: &mut Writer, desc: &TaskDesc) {
    w.str(&desc.key);
    w.time(&desc.start_time);
    match &desc.end_time {
        Some(end) => {
            w.buf.push(1);
            w.time(end);
        }
        None => w.buf.push(0),
    }
    w.u64(desc.interval_sec.to_bits());
    w.u64(desc.count);
    w.u64(desc.priority);
    w.u64(u64::from(desc.context_interval_sec));
    w.u64(desc.parameters.len() as u64);
    for (k, v) in &desc.parameters {
        w.str(k);
        w.str(v);
    }
}

fn read_desc(r: &mut Reader<'_>, kind: TaskKind) -> Result<TaskDesc, MeasurementError> {
    let key = r.string()?;
    let start_time = r.time()?;
    let end_time = if r.flag()? { Some(r.time()?) } else { None };
    let interval_sec = f64::from_bits(r.u64()?);
    let count = r.u64()?;
    let priority = r.u64()?;
    let context_interval_sec = u32::try_from(r.u64()?)
        .map_err(|_| MeasurementError::Decode("context interval out of range".to_string()))?;

    let n = r.u64()?;
    let mut parameters = BTreeMap::new();
    for _ in 0..n {
        let k = r.string()?;
        let v = r.string()?;
        parameters.insert(k, v);
    }

    Ok(TaskDesc {
        kind,
        key,
        start_time,
        end_time,
        interval_sec,
        count,
        priority,
        context_interval_sec,
        parameters,
    })
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u64(&mut self, v: u64) {
        let mut tmp = varint_encode::u64_buffer();
        self.buf.extend_from_slice(varint_encode::u64(v, &mut tmp));
    }

    fn str(&mut self, s: &str) {
        self.u64(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn opt_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.buf.push(1);
                self.str(s);
            }
            None => self.buf.push(0),
        }
    }

    fn time(&mut self, t: &DateTime<Utc>) {
        let ms = t.timestamp_millis();
        self.u64(((ms << 1) ^ (ms >> 63)) as u64);
    }
}

struct Reader<'a> {
    remaining: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], MeasurementError> {
        if self.remaining.len() < n {
            return Err(MeasurementError::Decode("unexpected end of data".to_string()));
        }
        let (head, tail) = self.remaining.split_at(n);
        self.remaining = tail;
        Ok(head)
    }

    fn u64(&mut self) -> Result<u64, MeasurementError> {
        let (v, rest) = varint_decode::u64(self.remaining)
            .map_err(|e| MeasurementError::Decode(format!("bad varint: {}", e)))?;
        self.remaining = rest;
        Ok(v)
    }

    fn flag(&mut self) -> Result<bool, MeasurementError> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(MeasurementError::Decode(format!("bad presence byte {}", b))),
        }
    }

    fn string(&mut self) -> Result<String, MeasurementError> {
        let len = usize::try_from(self.u64()?)
            .map_err(|_| MeasurementError::Decode("string length out of range".to_string()))?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| MeasurementError::Decode(format!("invalid utf-8: {}", e)))
    }

    fn opt_string(&mut self) -> Result<Option<String>, MeasurementError> {
        if self.flag()? {
            Ok(Some(self.string()?))
        } else {
            Ok(None)
        }
    }

    fn time(&mut self) -> Result<DateTime<Utc>, MeasurementError> {
        let raw = self.u64()?;
        let ms = ((raw >> 1) as i64) ^ -((raw & 1) as i64);
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| MeasurementError::Decode(format!("timestamp out of range: {}", ms)))
    }
}
