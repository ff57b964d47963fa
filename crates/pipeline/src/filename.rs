//! Canonical filename derivation.
//!
//! Turns a submission row into
//! `LeaderFirstLeaderLast_FollowerFirstFollowerLast_Division_SeasonYear[_RoutineName][_PersonalDescriptor]`.
//! Everything here is pure: the same row always yields the same name.

use crate::consts::{UNDERSCORES_REGEX, UNSAFE_CHARS_REGEX};
use crate::process::error::{ErrorKind, Result};
use routine_sheet::{Column, SubmissionRow};
use routine_tags::TagFields;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime};

/// Google Forms, e.g. `11/15/2024 9:41:07`.
const FORMS_DATETIME: &[BorrowedFormatItem<'_>] =
    format_description!("[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]:[second]");
const FORMS_DATE: &[BorrowedFormatItem<'_>] = format_description!("[month padding:none]/[day padding:none]/[year]");
const ISO_DATETIME: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const ISO_DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Normalizes a user-entered value into a filename segment.
///
/// Whitespace-separated words are joined with their first letter
/// upper-cased, every run of characters outside `[A-Za-z0-9_]` becomes a
/// single `_`, and leading or trailing `_` are stripped.
///
/// ```
/// use routine_pipeline::sanitize;
///
/// assert_eq!(sanitize("Novice Jack & Jill"), "NoviceJack_Jill");
/// assert_eq!(sanitize("NoviceJack_Jill"), "NoviceJack_Jill");
/// assert_eq!(sanitize("  sparkly shoes "), "SparklyShoes");
/// ```
pub fn sanitize(value: &str) -> String {
    let joined: String = value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    let replaced = UNSAFE_CHARS_REGEX.replace_all(&joined, "_");
    UNDERSCORES_REGEX.replace_all(&replaced, "_").trim_matches('_').to_string()
}

fn submission_date(timestamp: &str) -> Option<Date> {
    let timestamp = timestamp.trim();
    PrimitiveDateTime::parse(timestamp, FORMS_DATETIME)
        .map(|dt| dt.date())
        .or_else(|_| Date::parse(timestamp, FORMS_DATE))
        .or_else(|_| PrimitiveDateTime::parse(timestamp, ISO_DATETIME).map(|dt| dt.date()))
        .or_else(|_| Date::parse(timestamp, ISO_DATE))
        .or_else(|_| OffsetDateTime::parse(timestamp, &Rfc3339).map(|dt| dt.date()))
        .ok()
}

/// The competition season a submission belongs to: submissions from
/// November onwards count towards the following year.
///
/// ```
/// use routine_pipeline::season_year;
///
/// assert_eq!(season_year("11/15/2024 10:00:00"), Some(2025));
/// assert_eq!(season_year("10/31/2024 23:59:59"), Some(2024));
/// assert_eq!(season_year("not a date"), None);
/// ```
pub fn season_year(timestamp: &str) -> Option<i32> {
    let date = submission_date(timestamp)?;
    Some(match date.month() {
        Month::November | Month::December => date.year() + 1,
        _ => date.year(),
    })
}

/// A submission row that passed validation, with every naming field
/// sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub leader_first: String,
    pub leader_last: String,
    pub follower_first: String,
    pub follower_last: String,
    pub division: String,
    pub season_year: i32,
    pub routine_name: String,
    pub personal_descriptor: String,
    pub source_reference: String,
}
impl Submission {
    /// Validate a row without touching anything outside it.
    pub fn parse(row: &SubmissionRow) -> Result<Self> {
        if !row.is_complete() {
            exn::bail!(ErrorKind::MalformedRow(row.width()));
        }
        let required = |column: Column| -> Result<String> {
            match sanitize(row.get(column)) {
                value if value.is_empty() => exn::bail!(ErrorKind::MissingRequiredField(column.name())),
                value => Ok(value),
            }
        };
        let Some(season_year) = season_year(row.timestamp()) else {
            exn::bail!(ErrorKind::MissingRequiredField(Column::Timestamp.name()));
        };
        Ok(Self {
            leader_first: required(Column::LeaderFirst)?,
            leader_last: required(Column::LeaderLast)?,
            follower_first: required(Column::FollowerFirst)?,
            follower_last: required(Column::FollowerLast)?,
            division: required(Column::Division)?,
            season_year,
            routine_name: sanitize(row.routine_name()),
            personal_descriptor: sanitize(row.personal_descriptor()),
            source_reference: row.source_reference().to_string(),
        })
    }

    /// Base filename, without version suffix or extension.
    pub fn derive_name(&self) -> String {
        let mut name = format!(
            "{}{}_{}{}_{}_{:04}",
            self.leader_first,
            self.leader_last,
            self.follower_first,
            self.follower_last,
            self.division,
            self.season_year
        );
        for extra in [&self.routine_name, &self.personal_descriptor] {
            if !extra.is_empty() {
                name.push('_');
                name.push_str(extra);
            }
        }
        name
    }

    pub fn tag_fields(&self) -> TagFields {
        TagFields {
            leader_first: self.leader_first.clone(),
            leader_last: self.leader_last.clone(),
            follower_first: self.follower_first.clone(),
            follower_last: self.follower_last.clone(),
            division: self.division.clone(),
            season_year: self.season_year,
            routine_name: self.routine_name.clone(),
            personal_descriptor: self.personal_descriptor.clone(),
        }
    }
}
