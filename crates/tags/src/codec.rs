//! Reading and writing tags inside audio bytes.

use crate::TagSet;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use lofty::config::WriteOptions;
use lofty::file::{FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag, TagExt};
use std::io::Cursor;

/// Looks up whether a file can be tagged.
pub trait TagCodec: Send + Sync {
    /// Inspect `data`. The extension (without the dot) is only a hint, used
    /// when the content itself is not recognised.
    fn open(&self, data: &[u8], extension: Option<&str>) -> Result<Capability>;
}

/// Outcome of [`TagCodec::open`].
pub enum Capability {
    Supported(Box<dyn TagEditor>),
    /// Not a format the codec can tag. The bytes should be used unchanged.
    Unsupported,
}

/// Tags of one opened file.
pub trait TagEditor: Send {
    /// Human-readable format name, for logging.
    fn format(&self) -> &str;

    /// The tags currently in the file.
    fn tags(&self) -> &TagSet;

    /// Produce a copy of `data` (the same bytes the editor was opened from)
    /// carrying `tags`. `None` fields are removed from the file.
    fn write(&self, data: &[u8], tags: &TagSet) -> Result<Vec<u8>>;
}

/// [`TagCodec`] backed by `lofty`: MP3, FLAC, MP4/M4A, Ogg Vorbis, Opus,
/// WAV, AIFF and the other formats it knows.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyCodec;

impl TagCodec for LoftyCodec {
    fn open(&self, data: &[u8], extension: Option<&str>) -> Result<Capability> {
        let probe = Probe::new(Cursor::new(data))
            .guess_file_type()
            .or_raise(|| ErrorKind::Read("unknown".to_string()))?;
        let (probe, sniffed) = match probe.file_type() {
            Some(_) => (probe, true),
            None => match extension.and_then(FileType::from_ext) {
                Some(file_type) => (probe.set_file_type(file_type), false),
                None => return Ok(Capability::Unsupported),
            },
        };
        let Some(file_type) = probe.file_type() else {
            return Ok(Capability::Unsupported);
        };
        let format = format!("{file_type:?}");

        let tagged = match probe.read() {
            Ok(tagged) => tagged,
            // Only the extension claimed this was audio.
            Err(e) if !sniffed => {
                tracing::debug!(format = %format, error = %e, "Content does not match extension, not tagging");
                return Ok(Capability::Unsupported);
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Read(format)),
        };

        let tags = tagged.primary_tag().or_else(|| tagged.first_tag()).map(tag_set).unwrap_or_default();
        // Writes always go to the primary tag of the format.
        let base = match tagged.primary_tag() {
            Some(tag) => tag.clone(),
            None => Tag::new(tagged.primary_tag_type()),
        };

        Ok(Capability::Supported(Box::new(LoftyEditor { format, base, tags })))
    }
}

fn tag_set(tag: &Tag) -> TagSet {
    TagSet {
        title: tag.title().map(|v| v.into_owned()),
        artist: tag.artist().map(|v| v.into_owned()),
        album: tag.album().map(|v| v.into_owned()),
        comment: tag.comment().map(|v| v.into_owned()),
    }
}

struct LoftyEditor {
    format: String,
    base: Tag,
    tags: TagSet,
}

impl TagEditor for LoftyEditor {
    fn format(&self) -> &str {
        &self.format
    }

    fn tags(&self) -> &TagSet {
        &self.tags
    }

    fn write(&self, data: &[u8], tags: &TagSet) -> Result<Vec<u8>> {
        let mut tag = self.base.clone();
        match &tags.title {
            Some(value) if !value.is_empty() => tag.set_title(value.clone()),
            _ => tag.remove_title(),
        }
        match &tags.artist {
            Some(value) if !value.is_empty() => tag.set_artist(value.clone()),
            _ => tag.remove_artist(),
        }
        match &tags.album {
            Some(value) if !value.is_empty() => tag.set_album(value.clone()),
            _ => tag.remove_album(),
        }
        match &tags.comment {
            Some(value) if !value.is_empty() => tag.set_comment(value.clone()),
            _ => tag.remove_comment(),
        }

        let mut file = Cursor::new(data.to_vec());
        tag.save_to(&mut file, WriteOptions::default()).or_raise(|| ErrorKind::Write(self.format.clone()))?;
        Ok(file.into_inner())
    }
}
