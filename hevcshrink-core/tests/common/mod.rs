// hevcshrink-core/tests/common/mod.rs
//
// Fake collaborators shared by the integration tests. Files are plain byte
// blobs in a tempdir; their contents decide how the fakes behave.

#![allow(dead_code)]

use hevcshrink_core::error::{CoreError, CoreResult};
use hevcshrink_core::external::{FfprobeExecutor, MediaProbe, VideoStreamProbe};
use hevcshrink_core::processing::{
    CancelFlag, DeletionConfirmer, SizeComparison, Transcoder, output_path_for,
};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

/// Content prefix that makes `FakeProbe` reject a file.
pub const CORRUPT: &[u8] = b"corrupt";

/// Writes `len` bytes of video-ish content to `dir/name`.
pub fn create_video(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(&path, vec![b'v'; len]).expect("write video");
    path
}

/// Writes a file that `FakeProbe` treats as unreadable media.
pub fn create_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, CORRUPT).expect("write corrupt file");
    path
}

/// Probe that reports a fixed stream bitrate, or a probe error for corrupt files.
pub struct FakeProbe {
    pub bitrate_bps: Option<u64>,
    pub duration_secs: Option<f64>,
    pub probed: RefCell<Vec<PathBuf>>,
}

impl FakeProbe {
    pub fn with_bitrate(bitrate_bps: u64) -> Self {
        Self {
            bitrate_bps: Some(bitrate_bps),
            duration_secs: Some(60.0),
            probed: RefCell::new(Vec::new()),
        }
    }
}

impl FfprobeExecutor for FakeProbe {
    fn probe(&self, input_path: &Path) -> CoreResult<MediaProbe> {
        self.probed.borrow_mut().push(input_path.to_path_buf());
        let bytes = fs::read(input_path)?;
        if bytes.starts_with(CORRUPT) {
            return Err(CoreError::probe(
                input_path,
                "Invalid data found when processing input",
            ));
        }
        Ok(MediaProbe {
            video: Some(VideoStreamProbe {
                codec_name: Some("h264".to_string()),
                width: Some(1920),
                height: Some(1080),
                bit_rate_bps: self.bitrate_bps,
                duration_secs: self.duration_secs,
                ..Default::default()
            }),
            format_duration_secs: self.duration_secs,
            format_bit_rate_bps: None,
        })
    }
}

/// Probe whose binary is not installed.
pub struct MissingProbe;

impl FfprobeExecutor for MissingProbe {
    fn probe(&self, _input_path: &Path) -> CoreResult<MediaProbe> {
        Err(CoreError::DependencyNotFound("ffprobe".to_string()))
    }

    fn check_available(&self) -> CoreResult<()> {
        Err(CoreError::DependencyNotFound("ffprobe".to_string()))
    }
}

/// Transcoder that writes `numerator/denominator` of the source size.
pub struct FakeTranscoder {
    pub marker: String,
    pub numerator: u64,
    pub denominator: u64,
    pub fail_names: Vec<String>,
    pub calls: RefCell<Vec<(PathBuf, u64)>>,
}

impl FakeTranscoder {
    pub fn shrinking() -> Self {
        Self {
            marker: "_modified".to_string(),
            numerator: 1,
            denominator: 2,
            fail_names: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn growing() -> Self {
        Self {
            numerator: 3,
            denominator: 2,
            ..Self::shrinking()
        }
    }

    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_names: vec![name.to_string()],
            ..Self::shrinking()
        }
    }

    pub fn targets(&self) -> Vec<u64> {
        self.calls.borrow().iter().map(|(_, t)| *t).collect()
    }
}

impl Transcoder for FakeTranscoder {
    fn encode(&self, source: &Path, target_bitrate_bps: u64) -> CoreResult<PathBuf> {
        self.calls
            .borrow_mut()
            .push((source.to_path_buf(), target_bitrate_bps));

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_names.contains(&name) {
            return Err(CoreError::encode(source, "No NVENC capable devices found"));
        }

        let output = output_path_for(source, &self.marker)?;
        let len = fs::metadata(source)?.len() * self.numerator / self.denominator;
        fs::write(&output, vec![b'h'; len as usize])?;
        Ok(output)
    }

    fn encoder_name(&self) -> Option<String> {
        Some("hevc_fake".to_string())
    }
}

/// Confirmer with a fixed answer that counts how often it was asked.
pub struct ScriptedConfirmer {
    pub answer: bool,
    pub asked: Cell<usize>,
    pub seen: RefCell<Vec<SizeComparison>>,
}

impl ScriptedConfirmer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl DeletionConfirmer for ScriptedConfirmer {
    fn confirm_delete(&self, _original: &Path, comparison: &SizeComparison) -> bool {
        self.asked.set(self.asked.get() + 1);
        self.seen.borrow_mut().push(*comparison);
        self.answer
    }
}

/// Transcoder whose one-time setup fails, as when ffmpeg is not installed.
pub struct MissingFfmpeg {
    pub calls: RefCell<Vec<PathBuf>>,
}

impl MissingFfmpeg {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl Transcoder for MissingFfmpeg {
    fn encode(&self, source: &Path, _target_bitrate_bps: u64) -> CoreResult<PathBuf> {
        self.calls.borrow_mut().push(source.to_path_buf());
        Err(CoreError::DependencyNotFound("ffmpeg".to_string()))
    }

    fn prepare(&self) -> CoreResult<()> {
        Err(CoreError::DependencyNotFound("ffmpeg".to_string()))
    }
}

/// Shrinking transcoder that raises `cancel` once its first encode is done,
/// like a Ctrl-C pressed during that encode.
pub struct CancellingTranscoder {
    pub inner: FakeTranscoder,
    pub cancel: CancelFlag,
}

impl Transcoder for CancellingTranscoder {
    fn encode(&self, source: &Path, target_bitrate_bps: u64) -> CoreResult<PathBuf> {
        let result = self.inner.encode(source, target_bitrate_bps);
        self.cancel.cancel();
        result
    }

    fn encoder_name(&self) -> Option<String> {
        self.inner.encoder_name()
    }
}
