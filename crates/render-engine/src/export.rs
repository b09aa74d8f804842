//! Export sessions, output naming and the ffmpeg runner.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use cliptrim_common::{ClipError, ClipResult, ExportSettings};
use cliptrim_edit_model::EditDocument;

use crate::budget::mib_to_bytes;
use crate::compiler::{ExportCompiler, ExportMode, ExportPlan, ExportRequest};
use crate::encoder::{select_encoder, EncoderKind};
use crate::progress::{ExportOutcome, ProgressTracker};

/// Prefix for muted video exports.
pub const MUTED_PREFIX: &str = "MUTED_";

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProgress {
    /// Percent complete, 0 to 100.
    pub percent: u8,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Encoding,
    Complete,
    Failed,
}

fn report(progress: Option<&ProgressCallback>, percent: u8, stage: ExportStage) {
    if let Some(cb) = progress {
        cb(ExportProgress { percent, stage });
    }
}

/// Suffix of the lock file kept next to an edit document while it exports.
pub const LOCK_SUFFIX: &str = ".lock";

/// Grants at most one [`ExportSession`] at a time.
///
/// Clones share the same flag. A gate made with [`ExportGate::for_document`]
/// also holds a lock file beside the document, so separate processes
/// exporting the same edit exclude each other too.
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    busy: Arc<AtomicBool>,
    lock_path: Option<PathBuf>,
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate for one edit document, locked through `<document>.lock`.
    pub fn for_document(document_path: &Path) -> Self {
        let mut name = document_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(LOCK_SUFFIX);
        Self {
            busy: Arc::default(),
            lock_path: Some(document_path.with_file_name(name)),
        }
    }

    pub fn lock_path(&self) -> Option<&Path> {
        self.lock_path.as_deref()
    }

    /// Start an export, or fail with [`ClipError::ConcurrentExportRejected`]
    /// if one is already running.
    pub fn try_begin(&self) -> ClipResult<ExportSession> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClipError::ConcurrentExportRejected)?;

        let lock_path = match &self.lock_path {
            Some(path) => match acquire_lock_file(path) {
                Ok(()) => Some(path.clone()),
                Err(e) => {
                    self.busy.store(false, Ordering::Release);
                    return Err(e);
                }
            },
            None => None,
        };
        Ok(ExportSession {
            busy: Arc::clone(&self.busy),
            lock_path,
        })
    }

    pub fn is_exporting(&self) -> bool {
        self.busy.load(Ordering::Acquire) || self.lock_path.as_deref().is_some_and(Path::exists)
    }
}

fn acquire_lock_file(path: &Path) -> ClipResult<()> {
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            tracing::warn!(lock = %path.display(), "Export lock is held");
            return Err(ClipError::ConcurrentExportRejected);
        }
        Err(e) => return Err(e.into()),
    };
    // Holder pid, for clearing a stale lock by hand.
    if let Err(e) = writeln!(file, "{}", std::process::id()) {
        tracing::debug!(error = %e, "Could not write pid to export lock");
    }
    Ok(())
}

/// Held for the duration of one export; releases the gate on drop.
#[derive(Debug)]
pub struct ExportSession {
    busy: Arc<AtomicBool>,
    lock_path: Option<PathBuf>,
}

impl Drop for ExportSession {
    fn drop(&mut self) {
        if let Some(path) = &self.lock_path {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(lock = %path.display(), error = %e, "Failed to remove export lock");
            }
        }
        self.busy.store(false, Ordering::Release);
    }
}

/// File name for an export.
///
/// Generated names look like `(clip-match_clipped-03-12-45-PM).mp4`; a
/// custom name replaces everything but the extension and muted prefix.
pub fn output_file_name(
    source_stem: &str,
    mode: ExportMode,
    custom_name: Option<&str>,
    now: DateTime<Local>,
) -> String {
    let base = match custom_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => format!(
            "(clip-{source_stem}_clipped-{})",
            now.format("%I-%M-%S-%p")
        ),
    };
    let prefix = if mode == ExportMode::MutedVideo {
        MUTED_PREFIX
    } else {
        ""
    };
    format!("{prefix}{base}.{}", mode.extension())
}

/// Export directory: the configured one when set, otherwise the platform
/// movies directory joined with the configured subfolder.
pub fn output_dir_for(settings: &ExportSettings) -> PathBuf {
    match &settings.output_dir {
        Some(dir) => dir.clone(),
        None => dirs::video_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Movies")))
            .unwrap_or_else(std::env::temp_dir)
            .join(&settings.subfolder),
    }
}

/// [`output_dir_for`], created if missing.
pub fn resolve_output_dir(settings: &ExportSettings) -> ClipResult<PathBuf> {
    let dir = output_dir_for(settings);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Size budget used for a mode.
pub fn size_budget_bytes(settings: &ExportSettings, mode: ExportMode) -> u64 {
    match mode {
        ExportMode::Video => mib_to_bytes(settings.video_budget_mib),
        ExportMode::MutedVideo => mib_to_bytes(settings.muted_budget_mib),
        ExportMode::Audio | ExportMode::Gif => 0,
    }
}

/// Build the compiler input from a stored edit document.
pub fn request_from_document(
    doc: &EditDocument,
    mode: ExportMode,
    settings: &ExportSettings,
    output_path: PathBuf,
) -> ExportRequest {
    ExportRequest {
        segments: doc.segments.clone(),
        regions: doc.regions.clone(),
        media_width: doc.media.width,
        media_height: doc.media.height,
        audio_track_index: doc.audio_track_index,
        has_audio: doc.has_audio,
        mode,
        size_budget_bytes: size_budget_bytes(settings, mode),
        source_path: doc.media.path.clone(),
        output_path,
        original_file_size: doc.media.file_size,
        original_duration_ms: doc.media.duration_ms,
    }
}

/// Compiler configured from export settings for one encoder.
pub fn compiler_for(settings: &ExportSettings, encoder: EncoderKind) -> ExportCompiler {
    ExportCompiler {
        encoder,
        audio_bitrate_bps: settings.audio_bitrate_bps,
        muted_threshold_bytes: mib_to_bytes(settings.muted_threshold_mib),
    }
}

/// Export an edit to disk.
///
/// This is the main entry point for rendering. The gate is held until
/// the function returns, whatever the outcome.
pub async fn export_clip(
    request: ExportRequest,
    settings: &ExportSettings,
    gate: &ExportGate,
    progress: Option<ProgressCallback>,
) -> ClipResult<PathBuf> {
    let _session = gate.try_begin()?;

    tracing::info!(
        source = %request.source_path.display(),
        output = %request.output_path.display(),
        mode = ?request.mode,
        segments = request.segments.len(),
        "Starting export"
    );
    report(progress.as_ref(), 0, ExportStage::Preparing);

    match render(request, settings, progress.as_ref()).await {
        Ok(path) => {
            tracing::info!(output = %path.display(), "Export complete");
            Ok(path)
        }
        Err(e) => {
            tracing::error!(error = %e, "Export failed");
            report(progress.as_ref(), 0, ExportStage::Failed);
            Err(e)
        }
    }
}

async fn render(
    request: ExportRequest,
    settings: &ExportSettings,
    progress: Option<&ProgressCallback>,
) -> ClipResult<PathBuf> {
    if !request.source_path.exists() {
        return Err(ClipError::FileNotFound {
            path: request.source_path.clone(),
        });
    }
    if let Some(parent) = request.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let encoder = if request.mode.has_video() {
        select_encoder(&settings.ffmpeg_path, settings.prefer_hardware).await
    } else {
        EncoderKind::X264
    };
    let plan = compiler_for(settings, encoder).compile(&request)?;

    run_plan(&settings.ffmpeg_path, &plan, progress).await?;
    Ok(plan.output_path)
}

/// Run a compiled plan to completion, reporting progress from ffmpeg's
/// `-progress` stream on stdout.
pub async fn run_plan(
    ffmpeg: &str,
    plan: &ExportPlan,
    progress: Option<&ProgressCallback>,
) -> ClipResult<()> {
    tracing::debug!(args = ?plan.args, "Running ffmpeg");

    let mut child = Command::new(ffmpeg)
        .args(&plan.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ClipError::spawn(ffmpeg, e))?;

    tracing::info!(
        pid = child.id(),
        encoder = plan.encoder.codec(),
        expected_ms = plan.expected_duration_ms,
        "ffmpeg process started"
    );

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ClipError::invalid_state("ffmpeg stdout was not captured"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| ClipError::invalid_state("ffmpeg stderr was not captured"))?;

    // ffmpeg blocks once the stderr pipe fills, so drain it alongside stdout.
    let stderr_task = tokio::spawn(async move {
        let mut output = String::new();
        match stderr.read_to_string(&mut output).await {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    });

    let mut tracker = ProgressTracker::new(plan.expected_duration_ms);
    let mut lines = BufReader::new(stdout).lines();
    let mut last_reported = None;
    while let Some(line) = lines.next_line().await? {
        if let Some(percent) = tracker.feed(&line) {
            if last_reported != Some(percent) {
                last_reported = Some(percent);
                report(progress, percent, ExportStage::Encoding);
            }
        }
    }

    let status = child.wait().await?;
    let stderr_output = stderr_task
        .await
        .unwrap_or_else(|e| format!("<failed to join stderr reader: {e}>"));

    finish(&mut tracker, status, &stderr_output, progress)
}

fn finish(
    tracker: &mut ProgressTracker,
    status: ExitStatus,
    stderr: &str,
    progress: Option<&ProgressCallback>,
) -> ClipResult<()> {
    match tracker.finish(status.success()) {
        ExportOutcome::Completed => {
            report(progress, 100, ExportStage::Complete);
            Ok(())
        }
        ExportOutcome::Failed { last_percent } => {
            tracing::warn!(
                %status,
                last_percent,
                saw_end = tracker.saw_end(),
                "ffmpeg export failed"
            );
            Err(ClipError::external("ffmpeg", status, stderr))
        }
    }
}

/// Output path for a document in `dir`, named from the source or the
/// document's custom name.
pub fn output_path_in(
    dir: &Path,
    doc: &EditDocument,
    mode: ExportMode,
    now: DateTime<Local>,
) -> PathBuf {
    dir.join(output_file_name(
        &doc.media.file_stem(),
        mode,
        doc.custom_name.as_deref(),
        now,
    ))
}

/// Default output path for a document, creating the export directory.
pub fn default_output_path(
    doc: &EditDocument,
    mode: ExportMode,
    settings: &ExportSettings,
) -> ClipResult<PathBuf> {
    let dir = resolve_output_dir(settings)?;
    Ok(output_path_in(&dir, doc, mode, Local::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cliptrim_common::EditingConfig;
    use cliptrim_edit_model::{MediaInfo, Segment};
    use std::sync::Mutex;

    fn afternoon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 3, 15, 12, 45).unwrap()
    }

    fn document(path: &Path) -> EditDocument {
        EditDocument::new(
            MediaInfo {
                path: path.to_path_buf(),
                duration_ms: 10_000,
                width: 1280,
                height: 720,
                file_size: 4 * 1024 * 1024,
                audio_tracks: 1,
            },
            true,
            &EditingConfig::default(),
        )
    }

    #[test]
    fn test_gate_rejects_second_session() {
        let gate = ExportGate::new();
        let session = gate.try_begin().unwrap();
        assert!(gate.is_exporting());
        assert!(matches!(
            gate.clone().try_begin(),
            Err(ClipError::ConcurrentExportRejected)
        ));
        drop(session);
        assert!(!gate.is_exporting());
        assert!(gate.try_begin().is_ok());
    }

    #[test]
    fn test_generated_names() {
        assert_eq!(
            output_file_name("match", ExportMode::Video, None, afternoon()),
            "(clip-match_clipped-03-12-45-PM).mp4"
        );
        assert_eq!(
            output_file_name("match", ExportMode::MutedVideo, None, afternoon()),
            "MUTED_(clip-match_clipped-03-12-45-PM).mp4"
        );
        assert_eq!(
            output_file_name("match", ExportMode::Gif, None, afternoon()),
            "(clip-match_clipped-03-12-45-PM).gif"
        );
    }

    #[test]
    fn test_custom_names() {
        assert_eq!(
            output_file_name("match", ExportMode::Audio, Some("intro"), afternoon()),
            "intro.mp3"
        );
        assert_eq!(
            output_file_name("match", ExportMode::MutedVideo, Some("intro"), afternoon()),
            "MUTED_intro.mp4"
        );
        // blank custom names fall back to the generated one
        assert_eq!(
            output_file_name("match", ExportMode::Video, Some("  "), afternoon()),
            "(clip-match_clipped-03-12-45-PM).mp4"
        );
    }

    #[test]
    fn test_configured_output_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = ExportSettings {
            output_dir: Some(tmp.path().join("exports")),
            ..ExportSettings::default()
        };
        let dir = resolve_output_dir(&settings).unwrap();
        assert_eq!(dir, tmp.path().join("exports"));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_request_from_document() {
        let doc = document(Path::new("/videos/match.mp4"));
        let settings = ExportSettings::default();
        let req = request_from_document(
            &doc,
            ExportMode::Video,
            &settings,
            PathBuf::from("/out/clip.mp4"),
        );
        assert_eq!(req.segments, vec![Segment::new(0, 10_000)]);
        assert_eq!((req.media_width, req.media_height), (1280, 720));
        assert_eq!(req.size_budget_bytes, mib_to_bytes(6.7));
        assert_eq!(size_budget_bytes(&settings, ExportMode::Gif), 0);

        let path = output_path_in(Path::new("/out"), &doc, ExportMode::Video, afternoon());
        assert_eq!(
            path,
            PathBuf::from("/out/(clip-match_clipped-03-12-45-PM).mp4")
        );
    }

    #[test]
    fn test_document_lock_excludes_other_gates() {
        let tmp = tempfile::tempdir().unwrap();
        let doc_path = tmp.path().join("match.mp4.cliptrim.json");
        let first = ExportGate::for_document(&doc_path);
        let second = ExportGate::for_document(&doc_path);
        let lock = tmp.path().join("match.mp4.cliptrim.json.lock");
        assert_eq!(first.lock_path(), Some(lock.as_path()));

        let session = first.try_begin().unwrap();
        assert!(lock.exists());
        assert!(second.is_exporting());
        assert!(matches!(
            second.try_begin(),
            Err(ClipError::ConcurrentExportRejected)
        ));
        // a rejected attempt leaves its own flag clear
        assert!(!second.busy.load(Ordering::Acquire));

        drop(session);
        assert!(!lock.exists());
        assert!(!first.is_exporting());
        assert!(!second.is_exporting());
        assert!(second.try_begin().is_ok());
    }

    #[test]
    fn test_unwritable_lock_dir_releases_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let gate = ExportGate::for_document(&tmp.path().join("gone").join("doc.cliptrim.json"));
        assert!(matches!(gate.try_begin(), Err(ClipError::Io(_))));
        assert!(!gate.is_exporting());
    }

    #[tokio::test]
    async fn test_missing_source_reports_failure_and_releases_gate() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = document(&tmp.path().join("missing.mp4"));
        let settings = ExportSettings::default();
        let req = request_from_document(
            &doc,
            ExportMode::Video,
            &settings,
            tmp.path().join("out.mp4"),
        );

        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&stages);
        let callback: ProgressCallback = Box::new(move |p| seen.lock().unwrap().push(p.stage));

        let gate = ExportGate::for_document(&tmp.path().join("missing.mp4.cliptrim.json"));
        let err = export_clip(req, &settings, &gate, Some(callback))
            .await
            .unwrap_err();
        assert!(matches!(err, ClipError::FileNotFound { .. }));
        assert!(!gate.is_exporting());
        assert_eq!(
            *stages.lock().unwrap(),
            vec![ExportStage::Preparing, ExportStage::Failed]
        );
    }

    #[tokio::test]
    async fn test_compile_error_reports_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("match.mp4");
        std::fs::write(&source, b"not really video").unwrap();
        let mut doc = document(&source);
        doc.has_audio = false;
        let settings = ExportSettings::default();
        let req = request_from_document(
            &doc,
            ExportMode::Audio,
            &settings,
            tmp.path().join("clip.mp3"),
        );

        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&stages);
        let callback: ProgressCallback = Box::new(move |p| seen.lock().unwrap().push(p.stage));

        let err = export_clip(req, &settings, &ExportGate::new(), Some(callback))
            .await
            .unwrap_err();
        assert!(matches!(err, ClipError::InvalidState { .. }));
        assert_eq!(
            *stages.lock().unwrap(),
            vec![ExportStage::Preparing, ExportStage::Failed]
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_releases_gate() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("match.mp4");
        std::fs::write(&source, b"not really video").unwrap();
        let doc = document(&source);
        let settings = ExportSettings {
            ffmpeg_path: "/nonexistent/bin/ffmpeg-cliptrim".to_string(),
            ..ExportSettings::default()
        };
        let req = request_from_document(
            &doc,
            ExportMode::Video,
            &settings,
            tmp.path().join("out").join("clip.mp4"),
        );

        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&stages);
        let callback: ProgressCallback = Box::new(move |p| seen.lock().unwrap().push(p.stage));

        let gate = ExportGate::new();
        let err = export_clip(req, &settings, &gate, Some(callback))
            .await
            .unwrap_err();
        assert!(matches!(err, ClipError::ProcessSpawn { .. }));
        assert!(!gate.is_exporting());
        assert_eq!(
            *stages.lock().unwrap(),
            vec![ExportStage::Preparing, ExportStage::Failed]
        );
        assert!(gate.try_begin().is_ok());
    }

    #[tokio::test]
    async fn test_busy_gate_rejects_without_running() {
        let gate = ExportGate::new();
        let _held = gate.try_begin().unwrap();
        let doc = document(Path::new("/videos/match.mp4"));
        let settings = ExportSettings::default();
        let req = request_from_document(
            &doc,
            ExportMode::Audio,
            &settings,
            PathBuf::from("/out/a.mp3"),
        );
        let err = export_clip(req, &settings, &gate, None).await.unwrap_err();
        assert!(matches!(err, ClipError::ConcurrentExportRejected));
        assert!(gate.is_exporting());
    }
}
