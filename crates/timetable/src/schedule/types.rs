/// Types for weekly lecture schedule data
use crate::types::EntityId;
use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Accepts `HH:MM` and the `HH:MM:SS` form some server versions emit.
static TIME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2}):(\d{2})(?::(\d{2}))?\s*$").unwrap());

/// Teaching days of the week. The university week runs Sunday to Thursday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
        }
    }

    /// Column heading used on the printed timetable.
    pub fn arabic_name(&self) -> &'static str {
        match self {
            Weekday::Sunday => "الأحد",
            Weekday::Monday => "الاثنين",
            Weekday::Tuesday => "الثلاثاء",
            Weekday::Wednesday => "الأربعاء",
            Weekday::Thursday => "الخميس",
        }
    }

    /// Parses a day name, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a wall-clock time string into a minute-precision time.
///
/// Returns `None` for anything that is not `H:MM`, `HH:MM` or `HH:MM:SS`
/// with valid ranges. Seconds are dropped.
pub fn parse_wall_time(value: &str) -> Option<NaiveTime> {
    let caps = TIME_REGEX.captures(value)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    if let Some(second) = caps.get(3) {
        let second: u32 = second.as_str().parse().ok()?;
        if second > 59 {
            return None;
        }
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Formats a time as a zero-padded `HH:MM` label.
pub fn format_wall_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Room reference embedded in a lecture, or an entry of `GET /rooms`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomRef {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub room_name: Option<String>,
}

/// Stage (study year) reference, or an entry of `GET /stages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageRef {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Lecturer reference embedded in a lecture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LecturerRef {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A lecture record as returned by `GET /lectures`.
///
/// Decoding never fails on a bad day or time value: an unknown day becomes
/// `None` and a non-string time is dropped, so one malformed record can't
/// take down the whole week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LectureEvent {
    pub id: EntityId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub course_name: String,

    #[serde(default, deserialize_with = "lenient_day")]
    pub day_of_week: Option<Weekday>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub start_time: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub end_time: Option<String>,

    #[serde(default, rename = "Room", alias = "room")]
    pub room: Option<RoomRef>,

    #[serde(default, rename = "Stage", alias = "stage")]
    pub stage: Option<StageRef>,

    #[serde(
        default,
        rename = "Lecturers",
        alias = "lecturers",
        deserialize_with = "null_as_default"
    )]
    pub lecturers: Vec<LecturerRef>,
}

impl LectureEvent {
    /// Parsed start time, if the record carries a valid one.
    pub fn start(&self) -> Option<NaiveTime> {
        self.start_time.as_deref().and_then(parse_wall_time)
    }

    /// Parsed end time, if the record carries a valid one.
    pub fn end(&self) -> Option<NaiveTime> {
        self.end_time.as_deref().and_then(parse_wall_time)
    }

    pub fn room_name(&self) -> Option<&str> {
        self.room.as_ref().and_then(|r| r.room_name.as_deref())
    }

    /// Lecturer display names, skipping entries without one.
    pub fn lecturer_names(&self) -> impl Iterator<Item = &str> {
        self.lecturers.iter().filter_map(|l| l.name.as_deref())
    }

    /// `HH:MM - HH:MM`, falling back to the raw strings for unparseable times.
    pub fn time_range_label(&self) -> String {
        let show = |parsed: Option<NaiveTime>, raw: &Option<String>| match parsed {
            Some(t) => format_wall_time(t),
            None => raw.clone().unwrap_or_else(|| "?".to_string()),
        };
        format!(
            "{} - {}",
            show(self.start(), &self.start_time),
            show(self.end(), &self.end_time)
        )
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_day<'de, D>(deserializer: D) -> Result<Option<Weekday>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Weekday::parse(&s),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}
