//! Standard temporal and spatial hydration functions.
//!
//! | Tag | Fields | Value |
//! |-----|--------|-------|
//! | `D` | days since epoch | `Date` |
//! | `t` | nanoseconds since midnight | `Time` |
//! | `d` | seconds, nanoseconds | `LocalDateTime` |
//! | `F` | seconds, nanoseconds, offset seconds | `DateTime` (UTC) |
//! | `E` | months, days, seconds, nanoseconds | `Duration` |
//! | `X` | srid, x, y | `Point2D` |
//! | `Y` | srid, x, y, z | `Point3D` |

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::{malformed, HydrationFunctions};
use crate::model::{IsoDuration, Value};
use crate::Result;

pub const DATE: u8 = b'D';
pub const LOCAL_TIME: u8 = b't';
pub const LOCAL_DATE_TIME: u8 = b'd';
pub const DATE_TIME: u8 = b'F';
pub const DURATION: u8 = b'E';
pub const POINT_2D: u8 = b'X';
pub const POINT_3D: u8 = b'Y';

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

/// Add every standard function to `functions`.
pub fn register(functions: &mut HydrationFunctions) {
    functions.register(DATE, date);
    functions.register(LOCAL_TIME, local_time);
    functions.register(LOCAL_DATE_TIME, local_date_time);
    functions.register(DATE_TIME, date_time);
    functions.register(DURATION, duration);
    functions.register(POINT_2D, point_2d);
    functions.register(POINT_3D, point_3d);
}

fn ints<const N: usize>(tag: u8, fields: &[Value]) -> Result<[i64; N]> {
    if fields.len() != N {
        return Err(malformed(tag, format!("expected {N} fields, got {}", fields.len())));
    }
    let mut out = [0i64; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = field
            .as_int()
            .ok_or_else(|| malformed(tag, format!("expected an integer, got {}", field.type_name())))?;
    }
    Ok(out)
}

fn floats<const N: usize>(tag: u8, fields: &[Value]) -> Result<[f64; N]> {
    let mut out = [0f64; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = field
            .as_float()
            .ok_or_else(|| malformed(tag, format!("expected a float, got {}", field.type_name())))?;
    }
    Ok(out)
}

fn nanos(tag: u8, value: i64) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|n| i64::from(*n) < NANOS_PER_SECOND)
        .ok_or_else(|| malformed(tag, format!("nanoseconds {value} out of range")))
}

fn timestamp(tag: u8, seconds: i64, nanoseconds: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(seconds, nanos(tag, nanoseconds)?)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| malformed(tag, format!("timestamp {seconds} out of range")))
}

fn date(fields: Vec<Value>) -> Result<Value> {
    let [days] = ints(DATE, &fields)?;
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .zip(TimeDelta::try_days(days))
        .and_then(|(epoch, delta)| epoch.checked_add_signed(delta))
        .map(Value::Date)
        .ok_or_else(|| malformed(DATE, format!("{days} days out of range")))
}

fn local_time(fields: Vec<Value>) -> Result<Value> {
    let [nanoseconds] = ints(LOCAL_TIME, &fields)?;
    if !(0..NANOS_PER_DAY).contains(&nanoseconds) {
        return Err(malformed(LOCAL_TIME, format!("{nanoseconds} ns is not a time of day")));
    }
    let seconds = (nanoseconds / NANOS_PER_SECOND) as u32;
    let fraction = (nanoseconds % NANOS_PER_SECOND) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, fraction)
        .map(Value::Time)
        .ok_or_else(|| malformed(LOCAL_TIME, format!("{nanoseconds} ns is not a time of day")))
}

fn local_date_time(fields: Vec<Value>) -> Result<Value> {
    let [seconds, nanoseconds] = ints(LOCAL_DATE_TIME, &fields)?;
    timestamp(LOCAL_DATE_TIME, seconds, nanoseconds).map(Value::LocalDateTime)
}

/// Seconds are wall-clock seconds at `offset`; the result is the UTC instant.
fn date_time(fields: Vec<Value>) -> Result<Value> {
    let [seconds, nanoseconds, offset] = ints(DATE_TIME, &fields)?;
    let utc = seconds
        .checked_sub(offset)
        .ok_or_else(|| malformed(DATE_TIME, "offset overflows timestamp"))?;
    timestamp(DATE_TIME, utc, nanoseconds).map(|dt| Value::DateTime(dt.and_utc()))
}

fn duration(fields: Vec<Value>) -> Result<Value> {
    let [months, days, seconds, nanoseconds] = ints(DURATION, &fields)?;
    Ok(Value::Duration(IsoDuration { months, days, seconds, nanoseconds }))
}

fn point_2d(fields: Vec<Value>) -> Result<Value> {
    let Some((srid, coords)) = fields.split_first().filter(|_| fields.len() == 3) else {
        return Err(malformed(POINT_2D, format!("expected 3 fields, got {}", fields.len())));
    };
    let [srid] = ints(POINT_2D, std::slice::from_ref(srid))?;
    let [x, y] = floats(POINT_2D, coords)?;
    Ok(Value::Point2D { srid, x, y })
}

fn point_3d(fields: Vec<Value>) -> Result<Value> {
    let Some((srid, coords)) = fields.split_first().filter(|_| fields.len() == 4) else {
        return Err(malformed(POINT_3D, format!("expected 4 fields, got {}", fields.len())));
    };
    let [srid] = ints(POINT_3D, std::slice::from_ref(srid))?;
    let [x, y, z] = floats(POINT_3D, coords)?;
    Ok(Value::Point3D { srid, x, y, z })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_date() {
        let value = date(vec![Value::Int(18_000)]).unwrap();
        assert_eq!(value, Value::Date(NaiveDate::from_ymd_opt(2019, 4, 14).unwrap()));
        let before_epoch = date(vec![Value::Int(-1)]).unwrap();
        assert_eq!(before_epoch, Value::Date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()));
    }

    #[test]
    fn test_local_time() {
        let value = local_time(vec![Value::Int(3_600 * NANOS_PER_SECOND + 5)]).unwrap();
        assert_eq!(value, Value::Time(NaiveTime::from_hms_nano_opt(1, 0, 0, 5).unwrap()));
        assert!(matches!(local_time(vec![Value::Int(NANOS_PER_DAY)]), Err(Error::MalformedStructure { tag: 't', .. })));
    }

    #[test]
    fn test_date_time_applies_offset() {
        // 12:00 at +01:00 is 11:00 UTC.
        let value = date_time(vec![Value::Int(43_200), Value::Int(0), Value::Int(3_600)]).unwrap();
        let Value::DateTime(dt) = value else { panic!("expected a datetime") };
        assert_eq!(dt.timestamp(), 39_600);
    }

    #[test]
    fn test_points() {
        let p = point_2d(vec![Value::Int(7203), Value::Float(1.0), Value::Int(2)]).unwrap();
        assert_eq!(p, Value::Point2D { srid: 7203, x: 1.0, y: 2.0 });
        assert!(matches!(point_3d(vec![Value::Int(9157)]), Err(Error::MalformedStructure { tag: 'Y', .. })));
    }

    #[test]
    fn test_wrong_field_kind() {
        let result = duration(vec![Value::Int(1), Value::from("x"), Value::Int(0), Value::Int(0)]);
        assert!(matches!(result, Err(Error::MalformedStructure { tag: 'E', .. })));
    }
}
