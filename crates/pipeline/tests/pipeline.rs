use routine_pipeline::error::ErrorKind as PipelineErrorKind;
use routine_pipeline::process::error::ErrorKind;
use routine_pipeline::process::{Disposal, RowReport, Stage, Tagging};
use routine_pipeline::{Context, Destination, PROCESSED_ORIGINALS, ScanEvent, ScanSummary, run, scan};
use routine_sheet::{LEDGER_FOLDER, MemorySheet, SNAPSHOT_FILE, SubmissionLedger};
use routine_storage::StorageBackend;
use routine_storage::backend::{MockBackend, Operation};
use routine_tags::{Capability, TagCodec, TagEditor, TagSet};
use rstest::rstest;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ID: &str = "1AbCdEfGhIjKlMnOpQrStUvWxYz";
const EXPECTED: &str = "NoviceJack_Jill/KaianoLevine_LibbyWooton_NoviceJack_Jill_2025_WestCoastSwing_SparklyShoes_v1.mp3";

/// Treats anything starting with `audio` as taggable and appends the tags it
/// is asked to write to the bytes, so tests can see what was written.
struct FakeCodec {
    fail_write: bool,
}

struct FakeEditor {
    tags: TagSet,
    fail_write: bool,
}

impl TagCodec for FakeCodec {
    fn open(&self, data: &[u8], _extension: Option<&str>) -> routine_tags::error::Result<Capability> {
        if !data.starts_with(b"audio") {
            return Ok(Capability::Unsupported);
        }
        Ok(Capability::Supported(Box::new(FakeEditor {
            tags: TagSet {
                title: Some("Old Title".to_string()),
                artist: Some("Old Artist".to_string()),
                ..TagSet::default()
            },
            fail_write: self.fail_write,
        })))
    }
}

impl TagEditor for FakeEditor {
    fn format(&self) -> &str {
        "fake"
    }

    fn tags(&self) -> &TagSet {
        &self.tags
    }

    fn write(&self, data: &[u8], tags: &TagSet) -> routine_tags::error::Result<Vec<u8>> {
        if self.fail_write {
            exn::bail!(routine_tags::error::ErrorKind::Write("fake".to_string()));
        }
        let mut out = data.to_vec();
        for value in [&tags.title, &tags.artist, &tags.album, &tags.comment] {
            out.extend_from_slice(format!("\n{}", value.as_deref().unwrap_or("-")).as_bytes());
        }
        Ok(out)
    }
}

fn header() -> Vec<String> {
    [
        "Timestamp",
        "Email Address",
        "Leader First Name",
        "Leader Last Name",
        "Follower First Name",
        "Follower Last Name",
        "Division",
        "Routine Name",
        "Personal Descriptor",
        "Upload your music",
        "I acknowledge",
    ]
    .map(String::from)
    .to_vec()
}

fn submission(reference: &str) -> Vec<String> {
    [
        "11/15/2024 10:00:00",
        "kaiano@example.com",
        "Kaiano",
        "Levine",
        "Libby",
        "Wooton",
        "Novice Jack & Jill",
        "West Coast Swing",
        "Sparkly Shoes",
        reference,
        "Yes",
    ]
    .map(String::from)
    .to_vec()
}

fn drive_url() -> String {
    format!("https://drive.google.com/file/d/{ID}/view?usp=drive_link")
}

fn pool() -> MockBackend {
    MockBackend::with_files([(format!("Music Uploads/Sparkly Shoes - {ID}.mp3"), "audio")])
}

struct Fixture {
    source: Arc<MockBackend>,
    destination: Arc<MockBackend>,
    sheet: Arc<MemorySheet>,
    ctx: Context,
}

fn fixture(source: MockBackend, destination: MockBackend, sheet: MemorySheet) -> Fixture {
    fixture_with_codec(source, destination, sheet, FakeCodec { fail_write: false })
}

fn fixture_with_codec(
    source: MockBackend,
    destination: MockBackend,
    sheet: MemorySheet,
    codec: impl TagCodec + 'static,
) -> Fixture {
    let source = Arc::new(source);
    let destination = Arc::new(destination);
    let sheet = Arc::new(sheet);
    let ctx = Context::new(source.clone(), Destination::new(destination.clone()), sheet.clone())
        .with_codec(Arc::new(codec));
    Fixture {
        source,
        destination,
        sheet,
        ctx,
    }
}

fn flag(sheet: &MemorySheet, row: u32) -> String {
    sheet.records()[row as usize - 1].get(11).cloned().unwrap_or_default()
}

async fn events(ctx: &Context) -> Vec<ScanEvent> {
    use futures::TryStreamExt;
    scan(ctx).try_collect().await.unwrap()
}

#[tokio::test]
async fn test_end_to_end() {
    let f = fixture(pool(), MockBackend::default(), MemorySheet::new([header(), submission(&drive_url())]));

    let summary = run(&f.ctx).await.unwrap();
    assert_eq!(
        summary,
        ScanSummary {
            total: 1,
            processed: 1,
            ..ScanSummary::default()
        }
    );

    assert_eq!(f.destination.paths().await, vec![PathBuf::from(EXPECTED)]);
    let uploaded = String::from_utf8(f.destination.read(Path::new(EXPECTED)).await.unwrap()).unwrap();
    assert_eq!(
        uploaded,
        "audio\nKaianoLevine & LibbyWooton\nNoviceJack_Jill 2025, WestCoastSwing, SparklyShoes\n-\nOld Title | Old Artist"
    );
    assert!(f.source.paths().await.is_empty());
    assert_eq!(flag(&f.sheet, 2), "X");
    assert!(f.sheet.records().iter().all(|record| record.len() == 12));
}

#[tokio::test]
async fn test_second_scan_is_idempotent() {
    let f = fixture(pool(), MockBackend::default(), MemorySheet::new([header(), submission(&drive_url())]));
    run(&f.ctx).await.unwrap();
    let source_calls = f.source.journal().len();
    let destination_calls = f.destination.journal().len();

    let summary = run(&f.ctx).await.unwrap();
    assert_eq!((summary.processed, summary.skipped, summary.failed), (0, 1, 0));
    assert_eq!(f.source.journal().len(), source_calls);
    assert_eq!(f.destination.journal().len(), destination_calls);
    assert_eq!(f.destination.paths().await.len(), 1);
    assert_eq!(f.sheet.flag_writes().len(), 1);
}

#[tokio::test]
async fn test_collision_picks_next_version() {
    let base = "NoviceJack_Jill/KaianoLevine_LibbyWooton_NoviceJack_Jill_2025_WestCoastSwing_SparklyShoes";
    let destination = MockBackend::with_files([
        (format!("{base}_v1.mp3"), "one"),
        (format!("{base}_v2.mp3"), "two"),
        (format!("{base}_v1.wav"), "other extension"),
    ]);
    let f = fixture(pool(), destination, MemorySheet::new([header(), submission(&drive_url())]));

    let events = events(&f.ctx).await;
    let Some(ScanEvent::Processed(report)) = events.iter().find(|e| matches!(e, ScanEvent::Processed(_))) else {
        panic!("row was not processed");
    };
    assert_eq!(report.version, 3);
    assert_eq!(report.destination, PathBuf::from(format!("{base}_v3.mp3")));
    assert_eq!(f.destination.read(Path::new(&format!("{base}_v1.mp3"))).await.unwrap(), b"one");
}

#[rstest]
#[case::source_listing(&[Operation::List], &[], Stage::Locate)]
#[case::download(&[Operation::Read], &[], Stage::Download)]
#[case::destination_listing(&[], &[Operation::List], Stage::Name)]
#[case::upload(&[], &[Operation::Write], Stage::Upload)]
#[case::delete_and_move(&[Operation::Delete, Operation::Rename], &[], Stage::Delete)]
#[tokio::test]
async fn test_side_effect_ordering(
    #[case] source_failures: &[Operation],
    #[case] destination_failures: &[Operation],
    #[case] stage: Stage,
) {
    let source = source_failures.iter().fold(pool(), |backend, op| backend.fail_on(*op));
    let destination = destination_failures.iter().fold(MockBackend::default(), |backend, op| backend.fail_on(*op));
    let f = fixture(source, destination, MemorySheet::new([header(), submission(&drive_url())]));

    let events = events(&f.ctx).await;
    let Some(ScanEvent::Failed(failure)) = events.iter().find(|e| matches!(e, ScanEvent::Failed(_))) else {
        panic!("row did not fail");
    };
    assert_eq!(failure.row, 2);
    assert_eq!(failure.stage, stage);

    let uploaded =
        f.destination.attempted(Operation::Write) && !destination_failures.contains(&Operation::Write);
    // Delete only after a successful upload.
    assert_eq!(f.source.attempted(Operation::Delete), uploaded);
    // Never flagged unless both succeeded.
    assert!(f.sheet.flag_writes().is_empty());
    assert_eq!(flag(&f.sheet, 2), "");
    assert!(matches!(events.last(), Some(ScanEvent::Complete(summary)) if summary.failed_rows == vec![2]));
}

fn processed(events: &[ScanEvent]) -> Vec<&RowReport> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Processed(report) => Some(report),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_undeletable_original_is_moved_aside() {
    let f = fixture(
        pool().fail_on(Operation::Delete),
        MockBackend::default(),
        MemorySheet::new([header(), submission(&drive_url())]),
    );

    let events = events(&f.ctx).await;
    let moved = PathBuf::from(PROCESSED_ORIGINALS).join(format!("Sparkly Shoes - {ID}.mp3"));
    assert_eq!(processed(&events)[0].disposal, Disposal::Moved(moved.clone()));
    assert_eq!(f.source.paths().await, vec![moved]);
    assert_eq!(flag(&f.sheet, 2), "X");

    // Later scans neither upload again nor find the moved original.
    for _ in 0..2 {
        let summary = run(&f.ctx).await.unwrap();
        assert_eq!((summary.processed, summary.skipped, summary.failed), (0, 1, 0));
    }
    assert_eq!(f.destination.paths().await, vec![PathBuf::from(EXPECTED)]);
}

#[tokio::test]
async fn test_moved_original_keeps_earlier_ones() {
    let earlier = format!("Archive/Sparkly Shoes - {ID}.mp3");
    let source = MockBackend::with_files([
        (format!("Music Uploads/Sparkly Shoes - {ID}.mp3"), "audio"),
        (earlier.clone(), "audio from last season"),
    ])
    .fail_on(Operation::Delete);
    let f = fixture(source, MockBackend::default(), MemorySheet::new([header(), submission(&drive_url())]));
    let ctx = f.ctx.with_processed_originals("Archive");

    let events = events(&ctx).await;
    let moved = PathBuf::from(format!("Archive/2_Sparkly Shoes - {ID}.mp3"));
    assert_eq!(processed(&events)[0].disposal, Disposal::Moved(moved.clone()));
    assert_eq!(f.source.paths().await, vec![moved, PathBuf::from(&earlier)]);
    assert_eq!(f.source.read(Path::new(&earlier)).await.unwrap(), b"audio from last season");
    assert_eq!(flag(&f.sheet, 2), "X");
}

#[tokio::test]
async fn test_flag_write_failure() {
    let f = fixture(
        pool(),
        MockBackend::default(),
        MemorySheet::new([header(), submission(&drive_url())]).fail_flag_writes(),
    );
    let events = events(&f.ctx).await;
    let Some(ScanEvent::Failed(failure)) = events.iter().find(|e| matches!(e, ScanEvent::Failed(_))) else {
        panic!("row did not fail");
    };
    assert_eq!(failure.stage, Stage::Mark);
    assert!(matches!(failure.error.deref(), ErrorKind::FlagWriteError));
    // Upload and delete already happened.
    assert_eq!(f.destination.paths().await, vec![PathBuf::from(EXPECTED)]);
    assert!(f.source.paths().await.is_empty());
    assert_eq!(flag(&f.sheet, 2), "");
}

#[tokio::test]
async fn test_tagging_error_stops_row() {
    let f = fixture_with_codec(
        pool(),
        MockBackend::default(),
        MemorySheet::new([header(), submission(&drive_url())]),
        FakeCodec { fail_write: true },
    );
    let events = events(&f.ctx).await;
    let Some(ScanEvent::Failed(failure)) = events.iter().find(|e| matches!(e, ScanEvent::Failed(_))) else {
        panic!("row did not fail");
    };
    assert_eq!(failure.stage, Stage::Tag);
    assert!(matches!(failure.error.deref(), ErrorKind::TaggingError));
    assert!(!f.destination.attempted(Operation::Write));
    assert!(!f.source.attempted(Operation::Delete));
}

#[tokio::test]
async fn test_unsupported_format_uploads_identical_bytes() {
    let document = b"%PDF-1.4 definitely not audio".to_vec();
    let source = MockBackend::with_files([(format!("{ID}.pdf"), document.clone())]);
    let f = fixture_with_codec(
        source,
        MockBackend::default(),
        MemorySheet::new([header(), submission(&drive_url())]),
        routine_tags::LoftyCodec,
    );

    let events = events(&f.ctx).await;
    let Some(ScanEvent::Processed(report)) = events.iter().find(|e| matches!(e, ScanEvent::Processed(_))) else {
        panic!("row was not processed");
    };
    assert_eq!(report.tagging, Tagging::Unsupported);
    assert!(report.destination.to_string_lossy().ends_with("_SparklyShoes_v1.pdf"));
    assert_eq!(f.destination.read(&report.destination).await.unwrap(), document);
    assert_eq!(flag(&f.sheet, 2), "X");
}

#[tokio::test]
async fn test_direct_path_reference_keeps_extension_case() {
    let source = MockBackend::with_files([("uploads/Routine.MP3", "audio")]);
    let f = fixture(source, MockBackend::default(), MemorySheet::new([header(), submission("uploads/Routine.MP3")]));

    let summary = run(&f.ctx).await.unwrap();
    assert_eq!(summary.processed, 1);
    let paths = f.destination.paths().await;
    assert_eq!(paths.len(), 1);
    assert!(paths[0].to_string_lossy().ends_with("_SparklyShoes_v1.MP3"));
}

#[tokio::test]
async fn test_invalid_rows_touch_nothing() {
    let mut missing_leader = submission(&drive_url());
    missing_leader[2] = String::new();
    let mut short = submission(&drive_url());
    short.truncate(9);
    let f = fixture(pool(), MockBackend::default(), MemorySheet::new([header(), missing_leader, short]));

    let events = events(&f.ctx).await;
    let failures: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Failed(failure) => Some(failure),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|failure| failure.stage == Stage::Parse));
    assert!(matches!(failures[0].error.deref(), ErrorKind::MissingRequiredField("LeaderFirst")));
    assert!(matches!(failures[1].error.deref(), ErrorKind::MalformedRow(_)));
    assert!(f.source.journal().is_empty());
    assert!(f.destination.journal().is_empty());
}

#[tokio::test]
async fn test_scan_continues_after_failures() {
    let mut done = submission("already/filed.mp3");
    done.push("X".to_string());
    let f = fixture(
        pool(),
        MockBackend::default(),
        MemorySheet::new([
            header(),
            done,
            submission("https://drive.google.com/file/d/1ThisFileWasNeverUploadedToTheFolder/view"),
            submission(&drive_url()),
        ]),
    );

    let summary = run(&f.ctx).await.unwrap();
    assert_eq!(
        summary,
        ScanSummary {
            total: 3,
            processed: 1,
            skipped: 1,
            failed: 1,
            failed_rows: vec![3],
        }
    );
    assert_eq!(flag(&f.sheet, 2), "X");
    assert_eq!(flag(&f.sheet, 3), "");
    assert_eq!(flag(&f.sheet, 4), "X");
}

#[tokio::test]
async fn test_source_pool_as_destination() {
    let pool = Arc::new(pool());
    let sheet = Arc::new(MemorySheet::new([header(), submission(&drive_url())]));
    let ctx = Context::new(pool.clone(), Destination::new(pool.clone()), sheet.clone())
        .with_codec(Arc::new(FakeCodec { fail_write: false }));

    run(&ctx).await.unwrap();
    assert_eq!(pool.paths().await, vec![PathBuf::from(EXPECTED)]);
}

#[tokio::test]
async fn test_ledger_is_recorded() {
    let f = fixture(pool(), MockBackend::default(), MemorySheet::new([header(), submission(&drive_url())]));
    let ctx = f.ctx.with_ledger(SubmissionLedger::new(f.destination.clone()));

    run(&ctx).await.unwrap();
    let tab = f.destination.read(&Path::new(LEDGER_FOLDER).join("NoviceJack_Jill.csv")).await.unwrap();
    let tab = String::from_utf8(tab).unwrap();
    assert_eq!(
        tab,
        "Timestamp,Partnership,Division,Routine Name,Descriptor,Version\n\
         11/15/2024 10:00:00,KaianoLevine & LibbyWooton,NoviceJack_Jill,West Coast Swing,Sparkly Shoes,1\n"
    );
    assert!(f.destination.exists(&Path::new(LEDGER_FOLDER).join(SNAPSHOT_FILE)).await.unwrap());
}

#[tokio::test]
async fn test_ledger_failure_does_not_fail_row() {
    let f = fixture(pool(), MockBackend::default(), MemorySheet::new([header(), submission(&drive_url())]));
    let ctx = f.ctx.with_ledger(SubmissionLedger::new(Arc::new(MockBackend::default().fail_on(Operation::Write))));

    let summary = run(&ctx).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(flag(&f.sheet, 2), "X");
}

#[tokio::test]
async fn test_unreadable_sheet_is_fatal() {
    let f = fixture(pool(), MockBackend::default(), MemorySheet::new([header(), submission(&drive_url())]));
    drop(f.ctx);
    let ctx = Context::new(f.source.clone(), Destination::new(f.destination.clone()), Arc::new(Unreadable));

    let err = run(&ctx).await.unwrap_err();
    assert!(matches!(err.deref(), PipelineErrorKind::Sheet));
    assert!(f.source.journal().is_empty());
}

struct Unreadable;

#[async_trait::async_trait]
impl routine_sheet::RowSource for Unreadable {
    fn name(&self) -> &str {
        "unreadable"
    }

    async fn ensure_flag_column(&self) -> routine_sheet::error::Result<()> {
        Ok(())
    }

    async fn rows(&self) -> routine_sheet::error::Result<Vec<routine_sheet::SubmissionRow>> {
        exn::bail!(routine_sheet::error::ErrorKind::Read)
    }

    async fn write_flag(&self, _row: u32, _flag: routine_sheet::ProcessedFlag) -> routine_sheet::error::Result<()> {
        Ok(())
    }
}
