//! Next-event selection.

use chrono::{DateTime, Utc};

use crate::types::Event;

/// Pick the timed event with the earliest start strictly after `now`.
///
/// All-day events never qualify. On equal starts the first one in `events`
/// wins.
pub fn next_event(events: &[Event], now: DateTime<Utc>) -> Option<&Event> {
    events
        .iter()
        .filter_map(|e| e.start.instant().filter(|start| *start > now).map(|start| (e, start)))
        .min_by_key(|(_, start)| *start)
        .map(|(e, _)| e)
}

/// Whole minutes from `now` until the event starts, rounded down.
pub fn minutes_until(event: &Event, now: DateTime<Utc>) -> Option<i64> {
    event
        .start
        .instant()
        .map(|start| (start - now).num_minutes())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::EventTime;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
    }

    fn event(id: &str, start: EventTime) -> Event {
        Event {
            id: id.to_string(),
            calendar_id: "primary".to_string(),
            summary: id.to_string(),
            description: None,
            location: None,
            end: start.clone(),
            start,
            attendees: vec![],
            organizer: None,
            html_link: None,
        }
    }

    fn at(id: &str, offset: Duration) -> Event {
        event(id, EventTime::DateTime(now() + offset))
    }

    #[test]
    fn picks_earliest_future_start() {
        let events = vec![
            at("later", Duration::minutes(10)),
            at("soon", Duration::minutes(5)),
            at("past", Duration::minutes(-5)),
        ];
        assert_eq!(next_event(&events, now()).unwrap().id, "soon");
    }

    #[test]
    fn empty_list_has_no_next_event() {
        assert!(next_event(&[], now()).is_none());
    }

    #[test]
    fn all_past_has_no_next_event() {
        let events = vec![at("a", Duration::minutes(-1)), at("b", Duration::hours(-3))];
        assert!(next_event(&events, now()).is_none());
    }

    #[test]
    fn event_starting_now_is_not_next() {
        let events = vec![at("now", Duration::zero()), at("next", Duration::seconds(1))];
        assert_eq!(next_event(&events, now()).unwrap().id, "next");
    }

    #[test]
    fn equal_starts_keep_first() {
        let events = vec![
            at("first", Duration::minutes(15)),
            at("second", Duration::minutes(15)),
        ];
        assert_eq!(next_event(&events, now()).unwrap().id, "first");
    }

    #[test]
    fn all_day_events_are_skipped() {
        let tomorrow = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        let events = vec![
            event("holiday", EventTime::Date(tomorrow)),
            at("standup", Duration::days(2)),
        ];
        assert_eq!(next_event(&events, now()).unwrap().id, "standup");
    }

    #[test]
    fn minutes_until_rounds_down() {
        let e = at("x", Duration::seconds(29 * 60 + 59));
        assert_eq!(minutes_until(&e, now()), Some(29));

        let all_day = event("y", EventTime::Date(NaiveDate::from_ymd_opt(2024, 2, 2).unwrap()));
        assert_eq!(minutes_until(&all_day, now()), None);
    }
}
