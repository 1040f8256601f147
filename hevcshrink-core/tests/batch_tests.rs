// hevcshrink-core/tests/batch_tests.rs

mod common;

use common::{
    CancellingTranscoder, FakeProbe, FakeTranscoder, MissingFfmpeg, MissingProbe,
    ScriptedConfirmer, create_corrupt, create_video,
};
use hevcshrink_core::config::{CoreConfig, CoreConfigBuilder, DeletionPolicy};
use hevcshrink_core::error::{CoreError, ErrorKind};
use hevcshrink_core::external::StdFsMetadataProvider;
use hevcshrink_core::processing::{
    BatchState, CancelFlag, DeletionOutcome, FileOutcome, NeverConfirm, Orchestrator, SkipReason,
    process_videos,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn config_for(dir: &Path) -> CoreConfig {
    CoreConfigBuilder::new()
        .input_dir(dir.to_path_buf())
        .build()
        .unwrap()
}

#[test]
fn test_one_corrupt_file_does_not_stop_the_batch() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mp4", 1000);
    let corrupt = create_corrupt(dir.path(), "b.mp4");
    create_video(dir.path(), "c.mp4", 2000);

    let config = config_for(dir.path());
    let transcoder = FakeTranscoder::shrinking();
    let summary = process_videos(
        &config,
        &transcoder,
        &FakeProbe::with_bitrate(4_000_000),
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;

    assert_eq!(summary.encoded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, ErrorKind::Probe);
    assert!(summary.failures[0].path.ends_with("b.mp4"));

    // Corrupt original untouched, nothing written for it
    assert_eq!(fs::read(&corrupt)?, common::CORRUPT);
    assert!(!dir.path().join("b_modified.mp4").exists());
    assert!(dir.path().join("a_modified.mp4").exists());
    assert!(dir.path().join("c_modified.mp4").exists());

    assert_eq!(summary.total_original_bytes, 3000);
    assert_eq!(summary.total_encoded_bytes, 1500);
    assert_eq!(summary.bytes_saved, 1500);
    assert_eq!(summary.encoder.as_deref(), Some("hevc_fake"));
    Ok(())
}

#[test]
fn test_empty_directory_gives_empty_summary() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("notes.txt"), b"not a video")?;

    let config = config_for(dir.path());
    let transcoder = FakeTranscoder::shrinking();
    let probe = FakeProbe::with_bitrate(1_000_000);
    let mut orchestrator =
        Orchestrator::new(&config, &transcoder, &probe, &StdFsMetadataProvider, &NeverConfirm);
    assert_eq!(orchestrator.state(), BatchState::Idle);

    let summary = orchestrator.run()?;
    assert_eq!(orchestrator.state(), BatchState::Done);
    assert_eq!(summary.total_files(), 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.bytes_saved, 0);
    assert!(transcoder.calls.borrow().is_empty());
    assert!(probe.probed.borrow().is_empty());
    Ok(())
}

#[test]
fn test_missing_directory_is_input_error() {
    let config = config_for(Path::new("/surely/not/a/real/dir/hevcshrink"));
    let transcoder = FakeTranscoder::shrinking();
    let result = process_videos(
        &config,
        &transcoder,
        &FakeProbe::with_bitrate(1),
        &StdFsMetadataProvider,
        &NeverConfirm,
    );
    match result {
        Err(e @ CoreError::NotFound(_)) => assert_eq!(e.kind(), ErrorKind::Input),
        other => panic!("Unexpected result: {:?}", other.map(|s| s.total_files())),
    }
}

#[test]
fn test_default_multiplier_is_three_quarters() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mkv", 100);

    let config = config_for(dir.path());
    assert_eq!(config.multiplier.value(), 0.75);

    let transcoder = FakeTranscoder::shrinking();
    process_videos(
        &config,
        &transcoder,
        &FakeProbe::with_bitrate(8_000_000),
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;
    assert_eq!(transcoder.targets(), vec![6_000_000]);
    Ok(())
}

#[test]
fn test_target_bitrate_uses_multiplier() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mkv", 100);

    let config = CoreConfigBuilder::new()
        .input_dir(dir.path().to_path_buf())
        .multiplier(0.4)
        .build()?;
    let transcoder = FakeTranscoder::shrinking();
    let summary = process_videos(
        &config,
        &transcoder,
        &FakeProbe::with_bitrate(5_000_000),
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;
    assert_eq!(transcoder.targets(), vec![2_000_000]);
    match &summary.outcomes[0] {
        FileOutcome::Encoded(r) => {
            assert_eq!(r.source_bitrate_bps, 5_000_000);
            assert_eq!(r.target_bitrate_bps, 2_000_000);
            assert_ne!(r.output_path, r.source_path);
            assert!(r
                .output_path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .contains("_modified"));
        }
        other => panic!("Expected encoded outcome, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_originals_deleted_only_after_confirmation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let keep = create_video(dir.path(), "keep.mp4", 1000);

    let config = CoreConfigBuilder::new()
        .input_dir(dir.path().to_path_buf())
        .deletion_policy(DeletionPolicy::Ask)
        .build()?;

    let declined = ScriptedConfirmer::new(false);
    let summary = process_videos(
        &config,
        &FakeTranscoder::shrinking(),
        &FakeProbe::with_bitrate(1_000_000),
        &StdFsMetadataProvider,
        &declined,
    )?;
    assert_eq!(declined.asked.get(), 1);
    assert_eq!(declined.seen.borrow()[0].original_size, 1000);
    assert_eq!(declined.seen.borrow()[0].encoded_size, 500);
    assert!(keep.exists());
    assert_eq!(summary.originals_deleted, 0);

    let dir = tempdir()?;
    let gone = create_video(dir.path(), "gone.mp4", 1000);
    let config = CoreConfigBuilder::new()
        .input_dir(dir.path().to_path_buf())
        .deletion_policy(DeletionPolicy::Ask)
        .build()?;
    let accepted = ScriptedConfirmer::new(true);
    let summary = process_videos(
        &config,
        &FakeTranscoder::shrinking(),
        &FakeProbe::with_bitrate(1_000_000),
        &StdFsMetadataProvider,
        &accepted,
    )?;
    assert!(!gone.exists());
    assert!(dir.path().join("gone_modified.mp4").exists());
    assert_eq!(summary.originals_deleted, 1);
    Ok(())
}

#[test]
fn test_failed_encode_never_deletes_or_asks() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let original = create_video(dir.path(), "broken.mp4", 1000);

    let config = CoreConfigBuilder::new()
        .input_dir(dir.path().to_path_buf())
        .deletion_policy(DeletionPolicy::Always)
        .build()?;
    let confirmer = ScriptedConfirmer::new(true);
    let summary = process_videos(
        &config,
        &FakeTranscoder::failing_on("broken.mp4"),
        &FakeProbe::with_bitrate(1_000_000),
        &StdFsMetadataProvider,
        &confirmer,
    )?;

    assert!(original.exists());
    assert_eq!(confirmer.asked.get(), 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].kind, ErrorKind::Encode);
    assert!(summary.failures[0].message.contains("broken.mp4"));
    Ok(())
}

#[test]
fn test_larger_output_still_offers_deletion() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let original = create_video(dir.path(), "a.mp4", 1000);

    let config = CoreConfigBuilder::new()
        .input_dir(dir.path().to_path_buf())
        .deletion_policy(DeletionPolicy::Ask)
        .build()?;
    let confirmer = ScriptedConfirmer::new(false);
    let summary = process_videos(
        &config,
        &FakeTranscoder::growing(),
        &FakeProbe::with_bitrate(1_000_000),
        &StdFsMetadataProvider,
        &confirmer,
    )?;

    assert_eq!(confirmer.asked.get(), 1);
    assert!(!confirmer.seen.borrow()[0].is_beneficial());
    assert!(original.exists());
    assert_eq!(summary.bytes_saved, -500);
    Ok(())
}

#[test]
fn test_existing_output_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mp4", 1000);
    fs::write(dir.path().join("a_modified.mp4"), b"previous run")?;

    let transcoder = FakeTranscoder::shrinking();
    let summary = process_videos(
        &config_for(dir.path()),
        &transcoder,
        &FakeProbe::with_bitrate(1_000_000),
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;

    assert_eq!(summary.skipped, 1);
    assert!(matches!(
        &summary.outcomes[0],
        FileOutcome::Skipped(s) if matches!(s.reason, SkipReason::OutputExists(_))
    ));
    assert!(transcoder.calls.borrow().is_empty());
    assert_eq!(fs::read(dir.path().join("a_modified.mp4"))?, b"previous run");
    Ok(())
}

#[test]
fn test_unknown_bitrate_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mkv", 1000);

    let probe = FakeProbe {
        bitrate_bps: None,
        duration_secs: None,
        probed: Default::default(),
    };
    let transcoder = FakeTranscoder::shrinking();
    let summary = process_videos(
        &config_for(dir.path()),
        &transcoder,
        &probe,
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;

    assert_eq!(summary.skipped, 1);
    assert!(transcoder.calls.borrow().is_empty());
    Ok(())
}

#[test]
fn test_estimated_bitrate_is_used_when_stream_has_none() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mkv", 1000);

    let probe = FakeProbe {
        bitrate_bps: None,
        duration_secs: Some(8.0),
        probed: Default::default(),
    };
    let transcoder = FakeTranscoder::shrinking();
    process_videos(
        &config_for(dir.path()),
        &transcoder,
        &probe,
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;

    // 1000 bytes over 8 s is 1000 bit/s, times 0.75
    assert_eq!(transcoder.targets(), vec![750]);
    Ok(())
}

#[test]
fn test_summary_records_deletion_outcome() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mp4", 1000);

    let config = CoreConfigBuilder::new()
        .input_dir(dir.path().to_path_buf())
        .deletion_policy(DeletionPolicy::Always)
        .build()?;
    let summary = process_videos(
        &config,
        &FakeTranscoder::shrinking(),
        &FakeProbe::with_bitrate(1_000_000),
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;
    match &summary.outcomes[0] {
        FileOutcome::Encoded(r) => assert_eq!(r.deletion, DeletionOutcome::Deleted),
        other => panic!("Expected encoded outcome, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_missing_ffprobe_fails_every_file_with_probe_kind() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mp4", 1000);
    create_video(dir.path(), "b.mkv", 1000);
    create_video(dir.path(), "c.mov", 1000);

    let transcoder = FakeTranscoder::shrinking();
    let summary = process_videos(
        &config_for(dir.path()),
        &transcoder,
        &MissingProbe,
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;

    assert_eq!(summary.failed, 3);
    assert_eq!(summary.encoded, 0);
    assert_eq!(summary.total_files(), 3);
    assert!(summary.failures.iter().all(|f| f.kind == ErrorKind::Probe));
    assert!(summary.failures[0].message.contains("ffprobe"));
    assert!(transcoder.calls.borrow().is_empty());
    Ok(())
}

#[test]
fn test_missing_ffmpeg_fails_every_file_with_encode_kind() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let a = create_video(dir.path(), "a.mp4", 1000);
    create_video(dir.path(), "b.mp4", 1000);

    let transcoder = MissingFfmpeg::new();
    let config = CoreConfigBuilder::new()
        .input_dir(dir.path().to_path_buf())
        .deletion_policy(DeletionPolicy::Always)
        .build()?;
    let summary = process_videos(
        &config,
        &transcoder,
        &FakeProbe::with_bitrate(1_000_000),
        &StdFsMetadataProvider,
        &NeverConfirm,
    )?;

    assert_eq!(summary.failed, 2);
    assert!(summary.failures.iter().all(|f| f.kind == ErrorKind::Encode));
    assert!(summary.failures[0].message.contains("ffmpeg"));
    assert!(transcoder.calls.borrow().is_empty());
    assert!(a.exists());
    assert_eq!(summary.originals_deleted, 0);
    Ok(())
}

#[test]
fn test_cancel_before_start_skips_every_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mp4", 1000);
    create_video(dir.path(), "b.mp4", 1000);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let config = config_for(dir.path());
    let transcoder = FakeTranscoder::shrinking();
    let probe = FakeProbe::with_bitrate(1_000_000);
    let summary = Orchestrator::new(
        &config,
        &transcoder,
        &probe,
        &StdFsMetadataProvider,
        &NeverConfirm,
    )
    .with_cancel_flag(cancel)
    .run()?;

    assert!(summary.cancelled);
    assert_eq!(summary.skipped, 2);
    assert!(summary.outcomes.iter().all(|o| matches!(
        o,
        FileOutcome::Skipped(s) if s.reason == SkipReason::Cancelled
    )));
    assert!(probe.probed.borrow().is_empty());
    assert!(transcoder.calls.borrow().is_empty());
    Ok(())
}

#[test]
fn test_cancel_during_encode_finishes_current_file_only() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    create_video(dir.path(), "a.mp4", 1000);
    create_video(dir.path(), "b.mp4", 1000);
    create_video(dir.path(), "c.mp4", 1000);

    let cancel = CancelFlag::new();
    let transcoder = CancellingTranscoder {
        inner: FakeTranscoder::shrinking(),
        cancel: cancel.clone(),
    };
    let config = config_for(dir.path());
    let probe = FakeProbe::with_bitrate(1_000_000);
    let mut orchestrator = Orchestrator::new(
        &config,
        &transcoder,
        &probe,
        &StdFsMetadataProvider,
        &NeverConfirm,
    )
    .with_cancel_flag(cancel);
    let summary = orchestrator.run()?;

    assert_eq!(orchestrator.state(), BatchState::Done);
    assert!(summary.cancelled);
    assert_eq!(summary.encoded, 1);
    assert_eq!(summary.skipped, 2);
    assert!(dir.path().join("a_modified.mp4").exists());
    assert!(!dir.path().join("b_modified.mp4").exists());
    assert_eq!(transcoder.inner.calls.borrow().len(), 1);
    Ok(())
}

#[test]
fn test_encode_failing_after_cancel_is_not_a_failure() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let a = create_video(dir.path(), "a.mp4", 1000);
    create_video(dir.path(), "b.mp4", 1000);

    let cancel = CancelFlag::new();
    let transcoder = CancellingTranscoder {
        inner: FakeTranscoder::failing_on("a.mp4"),
        cancel: cancel.clone(),
    };
    let config = config_for(dir.path());
    let probe = FakeProbe::with_bitrate(1_000_000);
    let summary = Orchestrator::new(
        &config,
        &transcoder,
        &probe,
        &StdFsMetadataProvider,
        &NeverConfirm,
    )
    .with_cancel_flag(cancel)
    .run()?;

    assert!(summary.cancelled);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 2);
    assert!(a.exists());
    assert!(!dir.path().join("a_modified.mp4").exists());
    Ok(())
}
