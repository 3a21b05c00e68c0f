//! Text search over lectures.
//!
//! The grid, timeline and print layouts all consume the output of a single
//! [`filter`] call so they can never disagree on which lectures are shown.

use super::types::LectureEvent;

/// A case-folded search query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    folded: String,
}

impl SearchQuery {
    pub fn new(raw: &str) -> Self {
        Self {
            folded: raw.to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    /// True if the query is empty or occurs in the course name, a lecturer
    /// name or the room name.
    pub fn matches(&self, event: &LectureEvent) -> bool {
        if self.is_empty() {
            return true;
        }
        let hit = |text: &str| text.to_lowercase().contains(&self.folded);

        hit(event.course_name.as_str())
            || event.lecturer_names().any(hit)
            || event.room_name().is_some_and(hit)
    }
}

/// Returns true if `event` matches `query`.
pub fn matches(event: &LectureEvent, query: &str) -> bool {
    SearchQuery::new(query).matches(event)
}

/// Applies the query once and returns the surviving lectures in input order.
pub fn filter(events: &[LectureEvent], query: &str) -> Vec<LectureEvent> {
    let query = SearchQuery::new(query);
    events
        .iter()
        .filter(|event| query.matches(event))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::{LecturerRef, RoomRef};
    use crate::types::EntityId;

    fn lecture(id: i64, course: &str, room: Option<&str>, lecturers: &[&str]) -> LectureEvent {
        LectureEvent {
            id: EntityId::Int(id),
            course_name: course.to_string(),
            day_of_week: None,
            start_time: None,
            end_time: None,
            room: room.map(|name| RoomRef {
                id: None,
                room_name: Some(name.to_string()),
            }),
            stage: None,
            lecturers: lecturers
                .iter()
                .map(|name| LecturerRef {
                    id: None,
                    name: Some(name.to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_matches_each_field_case_insensitively() {
        let event = lecture(1, "Linear Algebra", Some("Hall B"), &["Dr. Noor"]);
        assert!(matches(&event, ""));
        assert!(matches(&event, "ALGEBRA"));
        assert!(matches(&event, "noor"));
        assert!(matches(&event, "hall b"));
        assert!(!matches(&event, "physics"));
    }

    #[test]
    fn test_missing_room_and_lecturers_never_match() {
        let mut event = lecture(1, "Networks", None, &[]);
        event.lecturers.push(LecturerRef::default());
        event.room = Some(RoomRef::default());
        assert!(!matches(&event, "hall"));
        assert!(matches(&event, "net"));
    }

    #[test]
    fn test_filter_is_idempotent_and_narrowing() {
        let events = vec![
            lecture(1, "Compilers", Some("Lab 1"), &["Dr. Amal"]),
            lecture(2, "Databases", Some("Lab 2"), &["Dr. Omar"]),
            lecture(3, "Compiler Lab", None, &[]),
        ];
        let once = filter(&events, "compil");
        let twice = filter(&once, "compil");
        assert_eq!(once, twice);

        let everything = filter(&events, "");
        assert_eq!(everything.len(), 3);
        assert!(once.iter().all(|e| everything.iter().any(|all| all.id == e.id)));
        assert_eq!(
            once.iter().map(|e| e.id.clone()).collect::<Vec<_>>(),
            vec![EntityId::Int(1), EntityId::Int(3)]
        );
    }
}
