use crate::consts::FILE_ID_REGEX;
use crate::process::error::{ErrorKind, Result};
use exn::ResultExt;
use routine_storage::{BackendHandle, FileInfo, validate_path};
use std::path::Path;

/// Resolves a source file reference to exactly one file in the pool.
///
/// A reference that is itself a path to an existing file in the pool wins.
/// Otherwise the first long identifier in the reference (the `<id>` of a
/// `.../file/d/<id>/view` or `open?id=<id>` link) must be contained in the
/// name of exactly one pool file outside of `excluded`.
pub(crate) async fn locate(pool: &BackendHandle, reference: &str, excluded: &Path) -> Result<FileInfo> {
    let reference = reference.trim();
    if reference.is_empty() {
        exn::bail!(ErrorKind::SourceNotFound(reference.to_string()));
    }

    if let Ok(path) = validate_path(reference) {
        match pool.stat(&path).await {
            Ok(file) => return Ok(file),
            // Links rarely make valid local paths; the identifier decides.
            Err(e) => tracing::debug!(error = ?e, "Source reference is not a file in the pool"),
        }
    }

    let Some(id) = FILE_ID_REGEX.find(reference).map(|m| m.as_str()) else {
        exn::bail!(ErrorKind::SourceNotFound(reference.to_string()));
    };
    let mut matches: Vec<FileInfo> = pool
        .list(None)
        .await
        .or_raise(|| ErrorKind::SourceNotFound(reference.to_string()))?
        .into_iter()
        .filter(|file| !file.path.starts_with(excluded))
        .filter(|file| file.file_name().is_some_and(|name| name.contains(id)))
        .collect();
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => exn::bail!(ErrorKind::SourceNotFound(reference.to_string())),
        n => {
            tracing::warn!(id = %id, matches = n, "Source file identifier is ambiguous");
            exn::bail!(ErrorKind::SourceNotFound(reference.to_string()))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routine_storage::backend::{MockBackend, Operation};
    use rstest::rstest;
    use std::ops::Deref;
    use std::sync::Arc;

    const ID: &str = "1AbCdEfGhIjKlMnOpQrStUvWxYz";
    const SET_ASIDE: &str = "ProcessedOriginals";

    fn pool() -> BackendHandle {
        Arc::new(MockBackend::with_files([
            (format!("Upload - {ID}.mp3"), "audio"),
            ("Other - 1ZyXwVuTsRqPoNmLkJiHgFeDcBa.wav".to_string(), "audio"),
            ("nested/track.flac".to_string(), "audio"),
        ]))
    }

    async fn find(pool: &BackendHandle, reference: &str) -> Result<FileInfo> {
        locate(pool, reference, Path::new(SET_ASIDE)).await
    }

    #[rstest]
    #[case::drive_view_url(format!("https://drive.google.com/file/d/{ID}/view?usp=drive_link"))]
    #[case::drive_open_url(format!("https://drive.google.com/open?id={ID}"))]
    #[case::bare_id(ID.to_string())]
    #[tokio::test]
    async fn test_locate_by_identifier(#[case] reference: String) {
        let file = find(&pool(), &reference).await.unwrap();
        assert_eq!(file.path, Path::new(&format!("Upload - {ID}.mp3")));
    }

    #[tokio::test]
    async fn test_locate_by_path() {
        let file = find(&pool(), " nested/track.flac ").await.unwrap();
        assert_eq!(file.path, Path::new("nested/track.flac"));
    }

    #[tokio::test]
    async fn test_stat_error_falls_back_to_identifier() {
        let pool: BackendHandle =
            Arc::new(MockBackend::with_files([(format!("Upload - {ID}.mp3"), "audio")]).fail_on(Operation::Stat));
        let file = find(&pool, &format!("https://drive.google.com/file/d/{ID}/view")).await.unwrap();
        assert_eq!(file.path, Path::new(&format!("Upload - {ID}.mp3")));
    }

    #[tokio::test]
    async fn test_set_aside_originals_are_ignored() {
        let pool: BackendHandle = Arc::new(MockBackend::with_files([
            (format!("Upload - {ID}.mp3"), "new"),
            (format!("{SET_ASIDE}/Upload - {ID}.mp3"), "old"),
        ]));
        let file = find(&pool, ID).await.unwrap();
        assert_eq!(file.path, Path::new(&format!("Upload - {ID}.mp3")));

        let pool: BackendHandle =
            Arc::new(MockBackend::with_files([(format!("{SET_ASIDE}/Upload - {ID}.mp3"), "old")]));
        let err = find(&pool, ID).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::SourceNotFound(_)));
    }

    #[rstest]
    #[case::empty("")]
    #[case::no_identifier("https://example.com/short")]
    #[case::unknown_identifier("https://drive.google.com/file/d/1NotInThePoolAtAllNotInThePool/view")]
    #[case::escaping_path("../outside.mp3")]
    #[tokio::test]
    async fn test_source_not_found(#[case] reference: &str) {
        let err = find(&pool(), reference).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_ambiguous_identifier() {
        let pool: BackendHandle = Arc::new(MockBackend::with_files([
            (format!("{ID}.mp3"), "a"),
            (format!("copy of {ID}.mp3"), "b"),
        ]));
        let err = find(&pool, ID).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_failure() {
        let pool: BackendHandle = Arc::new(MockBackend::default().fail_on(Operation::List));
        let err = find(&pool, ID).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::SourceNotFound(_)));
    }
}
