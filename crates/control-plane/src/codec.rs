//! Wire encoding of worker configurations sent over the control plane.
//!
//! Each record is `version: u8 | body_len: u16 BE | body`, and the body is a
//! sequence of `tag: u8 | len: u16 BE | value` fields. Records are written
//! back to back; the receiver reads until the sender closes its write side.

use warden_core::{SensorKind, WardenError, WardenResult, WorkerConfig, DEFAULT_MEASUREMENT_LOG};

pub const RECORD_VERSION: u8 = 1;
const RECORD_HEADER_LEN: usize = 3;
const FIELD_HEADER_LEN: usize = 3;

const TAG_KIND: u8 = 1;
const TAG_ADDRESS: u8 = 2;
const TAG_LOG_PATH: u8 = 3;
const TAG_ECHO: u8 = 4;
const TAG_INTERVAL: u8 = 5;

fn put_field(body: &mut Vec<u8>, tag: u8, value: &[u8]) -> WardenResult<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        WardenError::config(format!("field {tag} is too long ({} bytes)", value.len()))
    })?;
    body.push(tag);
    body.extend_from_slice(&len.to_be_bytes());
    body.extend_from_slice(value);
    Ok(())
}

/// Encode one configuration as a complete record.
pub fn encode_record(config: &WorkerConfig) -> WardenResult<Vec<u8>> {
    let log_path = config
        .log_path()
        .to_str()
        .ok_or_else(|| WardenError::config("measurement log path is not valid UTF-8"))?;
    let interval = i32::try_from(config.interval()).unwrap_or(i32::MAX);

    let mut body = Vec::with_capacity(32 + log_path.len());
    put_field(&mut body, TAG_KIND, &[config.kind().code()])?;
    put_field(&mut body, TAG_ADDRESS, &[config.address()])?;
    put_field(&mut body, TAG_LOG_PATH, log_path.as_bytes())?;
    put_field(&mut body, TAG_ECHO, &[u8::from(config.echo())])?;
    put_field(&mut body, TAG_INTERVAL, &interval.to_be_bytes())?;

    let body_len = u16::try_from(body.len())
        .map_err(|_| WardenError::config("record body exceeds 65535 bytes"))?;
    let mut record = Vec::with_capacity(RECORD_HEADER_LEN + body.len());
    record.push(RECORD_VERSION);
    record.extend_from_slice(&body_len.to_be_bytes());
    record.extend_from_slice(&body);
    Ok(record)
}

/// Result of decoding everything one connection delivered.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub configs: Vec<WorkerConfig>,
    /// Records skipped because a required field was missing or malformed.
    pub rejected: Vec<WardenError>,
    /// Why decoding stopped before the end of the input, if it did.
    pub halted: Option<WardenError>,
}

pub fn decode_batch(mut bytes: &[u8]) -> DecodedBatch {
    let mut batch = DecodedBatch::default();
    while !bytes.is_empty() {
        if bytes.len() < RECORD_HEADER_LEN {
            batch.halted = Some(WardenError::protocol(format!(
                "truncated record header ({} bytes)",
                bytes.len()
            )));
            break;
        }
        if bytes[0] != RECORD_VERSION {
            batch.halted = Some(WardenError::protocol(format!(
                "unsupported record version {}",
                bytes[0]
            )));
            break;
        }
        let body_len = usize::from(u16::from_be_bytes([bytes[1], bytes[2]]));
        let Some(body) = bytes.get(RECORD_HEADER_LEN..RECORD_HEADER_LEN + body_len) else {
            batch.halted = Some(WardenError::protocol(format!(
                "truncated record: body of {body_len} bytes, {} available",
                bytes.len() - RECORD_HEADER_LEN
            )));
            break;
        };
        match decode_body(body) {
            Ok(config) => batch.configs.push(config),
            Err(e) => batch.rejected.push(e),
        }
        bytes = &bytes[RECORD_HEADER_LEN + body_len..];
    }
    batch
}

fn decode_body(mut body: &[u8]) -> WardenResult<WorkerConfig> {
    let mut kind = None;
    let mut address = None;
    let mut log_path = None;
    let mut echo = false;
    let mut interval = 1i64;

    while !body.is_empty() {
        if body.len() < FIELD_HEADER_LEN {
            return Err(WardenError::config("truncated field header"));
        }
        let tag = body[0];
        let len = usize::from(u16::from_be_bytes([body[1], body[2]]));
        let value = body
            .get(FIELD_HEADER_LEN..FIELD_HEADER_LEN + len)
            .ok_or_else(|| WardenError::config(format!("field {tag} overruns the record")))?;

        match tag {
            TAG_KIND => {
                let code = single_byte(tag, value)?;
                kind = Some(SensorKind::from_code(code).ok_or_else(|| {
                    WardenError::config(format!("unknown sensor kind code {code}"))
                })?);
            }
            TAG_ADDRESS => address = Some(single_byte(tag, value)?),
            TAG_LOG_PATH => {
                let path = std::str::from_utf8(value)
                    .map_err(|_| WardenError::config("measurement log path is not UTF-8"))?;
                log_path = Some(path.to_string());
            }
            TAG_ECHO => echo = single_byte(tag, value)? != 0,
            TAG_INTERVAL => {
                let raw: [u8; 4] = value.try_into().map_err(|_| {
                    WardenError::config(format!("interval field has {} bytes", value.len()))
                })?;
                interval = i64::from(i32::from_be_bytes(raw));
            }
            // fields added by newer senders
            _ => {}
        }
        body = &body[FIELD_HEADER_LEN + len..];
    }

    let kind = kind.ok_or_else(|| WardenError::config("record has no sensor kind"))?;
    let address = address.ok_or_else(|| WardenError::config("record has no sensor address"))?;
    let log_path = log_path
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_MEASUREMENT_LOG.to_string());
    Ok(WorkerConfig::new(kind, address, log_path, echo, interval))
}

fn single_byte(tag: u8, value: &[u8]) -> WardenResult<u8> {
    match value {
        [byte] => Ok(*byte),
        _ => Err(WardenError::config(format!(
            "field {tag} must be 1 byte, got {}",
            value.len()
        ))),
    }
}
