//! Timestamp formats and zones.
//!
//! Formats are written with date/time pattern letters
//! (`yyyy-MM-dd HH:mm:ss.SSS`) and translated once into a chrono format.
//! A format containing `%` is taken as a chrono format as is.

use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, ParseErrorKind, StrftimeItems};
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

/// Compiled timestamp format.
#[derive(Debug, Clone)]
pub struct TimestampFormat {
    pattern: String,
    strftime: String,
    has_offset: bool,
}

impl TimestampFormat {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the pattern uses letters
    /// without a chrono equivalent or is not a valid chrono format.
    pub fn new(pattern: &str) -> Result<Self, String> {
        let strftime = if pattern.contains('%') {
            pattern.to_string()
        } else {
            translate(pattern)?
        };
        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid format '{strftime}'"));
        }
        let has_offset = strftime.contains("%z") || strftime.contains("%:z");
        Ok(Self {
            pattern: pattern.to_string(),
            strftime,
            has_offset,
        })
    }

    /// Pattern as configured.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Equivalent chrono format.
    #[must_use]
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Parse `raw` into an instant.
    ///
    /// `zone` applies when the format carries no offset. Formats without a
    /// time of day resolve to midnight.
    ///
    /// # Errors
    ///
    /// Returns the reason if `raw` does not conform to the format or names
    /// a local time that does not exist in `zone`.
    pub fn parse(&self, raw: &str, zone: TimestampZone) -> Result<DateTime<Utc>, String> {
        if self.has_offset {
            return DateTime::parse_from_str(raw, &self.strftime)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|e| e.to_string());
        }

        let naive = match NaiveDateTime::parse_from_str(raw, &self.strftime) {
            Ok(naive) => naive,
            Err(e) if e.kind() == ParseErrorKind::NotEnough => {
                NaiveDate::parse_from_str(raw, &self.strftime)
                    .map_err(|_| e.to_string())?
                    .and_time(NaiveTime::MIN)
            }
            Err(e) => return Err(e.to_string()),
        };
        zone.resolve(&naive)
            .ok_or_else(|| format!("local time {naive} does not exist in zone {zone}"))
    }
}

/// Zone used for timestamps without an offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampZone {
    /// Zone of the machine running the reader.
    #[default]
    Local,
    Fixed(FixedOffset),
    /// Named zone of the tz database, such as `Europe/London`.
    Named(Tz),
}

impl TimestampZone {
    /// Coordinated universal time.
    #[must_use]
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Instant of the local date-time `naive` in this zone.
    ///
    /// Ambiguous local times of `Local` and named zones resolve to the
    /// earliest instant. Returns `None` for local times skipped by a
    /// transition.
    #[must_use]
    pub fn resolve(self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc)),
            Self::Fixed(offset) => offset
                .from_local_datetime(naive)
                .single()
                .map(|fixed| fixed.with_timezone(&Utc)),
            Self::Named(tz) => tz
                .from_local_datetime(naive)
                .earliest()
                .map(|named| named.with_timezone(&Utc)),
        }
    }
}

impl FromStr for TimestampZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        match upper.as_str() {
            "LOCAL" | "SYSTEM" => Ok(Self::Local),
            "UTC" | "UT" | "GMT" | "Z" => Ok(Self::utc()),
            other => {
                let offset = other
                    .strip_prefix("UTC")
                    .or_else(|| other.strip_prefix("GMT"))
                    .unwrap_or(other);
                if let Some(fixed) = parse_offset(offset) {
                    return Ok(Self::Fixed(fixed));
                }
                trimmed
                    .parse::<Tz>()
                    .map(Self::Named)
                    .map_err(|_| format!("unsupported time zone '{s}'"))
            }
        }
    }
}

impl fmt::Display for TimestampZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Parse `+H`, `+HH`, `+HHMM` or `+HH:MM`.
fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    if hours.is_empty() || hours.len() > 2 || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 18 || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Translate pattern letters into a chrono format.
fn translate(pattern: &str) -> Result<String, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i = quoted(&chars, i, &mut out)?;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        i += run;
        let spec = match (c, run) {
            ('y' | 'u', 2) => "%y",
            ('y' | 'u', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1 | 2) => "%d",
            ('D', 1..=3) => "%j",
            ('H', 1 | 2) => "%H",
            ('h', 1 | 2) => "%I",
            ('m', 1 | 2) => "%M",
            ('s', 1 | 2) => "%S",
            ('a', 1) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('Z', 1..=3) | ('X' | 'x', 1 | 2) => "%z",
            ('Z', 5) | ('X' | 'x', 3) => "%:z",
            ('S', _) => {
                // A dot before the fraction is optional with %.f.
                if out.ends_with('.') {
                    out.pop();
                    "%.f"
                } else if run <= 3 {
                    "%3f"
                } else if run <= 6 {
                    "%6f"
                } else {
                    "%9f"
                }
            }
            _ => {
                return Err(format!(
                    "unsupported pattern letters '{}'",
                    c.to_string().repeat(run)
                ))
            }
        };
        out.push_str(spec);
    }
    Ok(out)
}

/// Copy a quoted literal starting at `start`; `''` stands for a quote.
fn quoted(chars: &[char], start: usize, out: &mut String) -> Result<usize, String> {
    if chars.get(start + 1) == Some(&'\'') {
        out.push('\'');
        return Ok(start + 2);
    }
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err("unterminated quote in pattern".to_string()),
            Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                out.push('\'');
                i += 2;
            }
            Some('\'') => return Ok(i + 1),
            Some(&c) => {
                push_literal(out, c);
                i += 1;
            }
        }
    }
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
