//! Embedded audio metadata.
//!
//! [`merge`] decides what a submission's tags should be; a [`TagCodec`]
//! decides whether (and how) they can be written into a given file.

mod codec;
pub mod error;

pub use crate::codec::{Capability, LoftyCodec, TagCodec, TagEditor};

/// Separator between preserved values in the merged comment.
pub const COMMENT_SEPARATOR: &str = " | ";

/// The four tag fields the pipeline reads and writes. `None` and empty
/// values are equivalent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub comment: Option<String>,
}
impl TagSet {
    fn values(&self) -> impl Iterator<Item = &str> {
        [&self.title, &self.artist, &self.album, &self.comment]
            .into_iter()
            .filter_map(|value| value.as_deref().map(str::trim))
            .filter(|value| !value.is_empty())
    }
}

/// Submission values that end up in the tags, already sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFields {
    pub leader_first: String,
    pub leader_last: String,
    pub follower_first: String,
    pub follower_last: String,
    pub division: String,
    pub season_year: i32,
    pub routine_name: String,
    pub personal_descriptor: String,
}
impl TagFields {
    /// `LeaderFirstLeaderLast & FollowerFirstFollowerLast`
    pub fn title(&self) -> String {
        format!(
            "{}{} & {}{}",
            self.leader_first, self.leader_last, self.follower_first, self.follower_last
        )
    }

    /// `Division SeasonYear[, RoutineName][, PersonalDescriptor]`
    pub fn artist(&self) -> String {
        let mut artist = format!("{} {:04}", self.division, self.season_year);
        for extra in [&self.routine_name, &self.personal_descriptor] {
            if !extra.is_empty() {
                artist.push_str(", ");
                artist.push_str(extra);
            }
        }
        artist
    }
}

/// Computes the tags to write for a submission.
///
/// Every previously non-empty Title, Artist, Album and Comment value is
/// preserved, in that order, in the new Comment. Title and Artist are
/// replaced, Album is left as it was.
///
/// ```
/// use routine_tags::{TagFields, TagSet, merge};
///
/// let existing = TagSet {
///     title: Some("A".to_string()),
///     comment: Some("B".to_string()),
///     ..TagSet::default()
/// };
/// let fields = TagFields {
///     leader_first: "Kaiano".to_string(),
///     leader_last: "Levine".to_string(),
///     follower_first: "Libby".to_string(),
///     follower_last: "Wooton".to_string(),
///     division: "NoviceJack_Jill".to_string(),
///     season_year: 2025,
///     routine_name: String::new(),
///     personal_descriptor: String::new(),
/// };
/// let merged = merge(&existing, &fields);
/// assert_eq!(merged.comment.as_deref(), Some("A | B"));
/// assert_eq!(merged.title.as_deref(), Some("KaianoLevine & LibbyWooton"));
/// assert_eq!(merged.artist.as_deref(), Some("NoviceJack_Jill 2025"));
/// ```
pub fn merge(existing: &TagSet, fields: &TagFields) -> TagSet {
    let preserved = existing.values().collect::<Vec<_>>().join(COMMENT_SEPARATOR);
    TagSet {
        title: Some(fields.title()),
        artist: Some(fields.artist()),
        album: existing.album.clone(),
        comment: (!preserved.is_empty()).then_some(preserved),
    }
}
