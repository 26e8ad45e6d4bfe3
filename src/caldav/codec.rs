use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use icalendar::Calendar;

/// Parse a `text/calendar` body.
pub fn decode_calendar(body: &[u8]) -> Result<Calendar> {
    let text = std::str::from_utf8(body).context("calendar body is not UTF-8")?;
    let calendar: Calendar = text.parse().map_err(|err: String| anyhow!(err))?;
    if calendar.components.is_empty() {
        return Err(anyhow!("calendar has no components"));
    }
    Ok(calendar)
}

pub fn encode_calendar(calendar: &Calendar) -> Bytes {
    Bytes::from(calendar.to_string())
}
