//! Console rendering of relayed messages

use chrono::{DateTime, TimeZone};
use relay_gateway::protocol::ServerMessage;
use std::fmt::Display;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a relayed message as `[time] sender text`, with the time in `tz`
pub fn render_message<Tz>(message: &ServerMessage, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let time = DateTime::from_timestamp(message.timestamp, 0).map_or_else(
        || message.timestamp.to_string(),
        |at| at.with_timezone(tz).format(TIME_FORMAT).to_string(),
    );

    format!("[{time}] {} {}", message.username, message.text)
}
