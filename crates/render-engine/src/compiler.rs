//! Export compiler: edit state in, ffmpeg invocation out.
//!
//! # Graph layout
//!
//! ```text
//! [0:v] ── region 1 ── region 2 ── … ──┐  split → crop → blur/pixelate/fill
//!                                      │  → overlay, once per region
//!                          split=N (N segments, regions only)
//!                                      │
//!          trim,setpts ×N     atrim,asetpts[,volume] ×N  ([0:a:K])
//!                                      │
//!                               concat (timeline order)
//!                                      │
//!                              crop,setsar=1 [outv]
//!                                      │
//!                  GIF only: fps,scale,split → palettegen → paletteuse
//! ```
//!
//! The graph does not depend on the chosen encoder; only the encode
//! arguments do.

use std::path::PathBuf;

use cliptrim_common::{ClipError, ClipResult};
use cliptrim_edit_model::{
    validate_segments, CropRect, FilterMode, FilterRegion, RegionSet, Segment,
};

use crate::budget::{
    estimate_output_bytes, muted_rate_control, BitrateBudgeter, RateControl,
};
use crate::encoder::{EncodeProfile, EncoderKind};
use crate::graph::{Filter, FilterChain, FilterGraph};

/// Decoder pre-roll kept before the first segment, in milliseconds.
pub const SEEK_PREROLL_MS: i64 = 500;

/// Downscale factor for blur regions.
pub const BLUR_FACTOR: u32 = 10;

/// Downscale factor for pixelate regions.
pub const PIXELATE_FACTOR: u32 = 30;

pub const GIF_FPS: u32 = 12;
pub const GIF_WIDTH: u32 = 480;

/// Frame rate cap for muted exports that need a bitrate target.
pub const MUTED_FPS_CAP: u32 = 25;

/// What kind of file an export produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportMode {
    /// Video and selected audio track, size-targeted.
    Video,
    /// Audio only, MP3.
    Audio,
    /// Animated GIF of the first segment.
    Gif,
    /// Video only, fast encode.
    MutedVideo,
}

impl ExportMode {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportMode::Video | ExportMode::MutedVideo => "mp4",
            ExportMode::Audio => "mp3",
            ExportMode::Gif => "gif",
        }
    }

    pub fn has_video(&self) -> bool {
        !matches!(self, ExportMode::Audio)
    }

    fn wants_audio(&self) -> bool {
        matches!(self, ExportMode::Video | ExportMode::Audio)
    }
}

/// Everything the compiler needs, passed explicitly.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub segments: Vec<Segment>,
    pub regions: RegionSet,
    pub media_width: u32,
    pub media_height: u32,
    pub audio_track_index: usize,
    /// Whether the source has any audio stream.
    pub has_audio: bool,
    pub mode: ExportMode,
    /// Target output size for size-aware modes.
    pub size_budget_bytes: u64,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// Size of the source file, for muted-mode estimation.
    pub original_file_size: u64,
    pub original_duration_ms: i64,
}

/// A fully formed, immutable ffmpeg invocation.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub mode: ExportMode,
    pub encoder: EncoderKind,
    pub graph: FilterGraph,
    /// Input seek applied with `-ss`, in milliseconds.
    pub seek_origin_ms: i64,
    /// Length of the output, for progress.
    pub expected_duration_ms: i64,
    pub rate_control: Option<RateControl>,
    pub output_path: PathBuf,
    /// Arguments after the program name.
    pub args: Vec<String>,
}

/// A region or crop converted to even pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// `round(n * dim)` rounded down to even.
pub fn to_even_px(normalized: f64, dimension: u32) -> u32 {
    let px = (normalized * dimension as f64).round().max(0.0) as u32;
    px & !1
}

impl PixelRect {
    fn from_edges(left: f64, top: f64, right: f64, bottom: f64, width: u32, height: u32) -> Self {
        let x = to_even_px(left, width);
        let y = to_even_px(top, height);
        let w = to_even_px(right - left, width).min(width.saturating_sub(x) & !1);
        let h = to_even_px(bottom - top, height).min(height.saturating_sub(y) & !1);
        Self { x, y, w, h }
    }

    /// `None` when the region collapses to nothing at this frame size.
    pub fn for_region(region: &FilterRegion, width: u32, height: u32) -> Option<Self> {
        let rect = Self::from_edges(
            region.left,
            region.top,
            region.right,
            region.bottom,
            width,
            height,
        );
        (rect.w > 0 && rect.h > 0).then_some(rect)
    }

    pub fn for_crop(crop: &CropRect, width: u32, height: u32) -> Self {
        let rect = Self::from_edges(crop.left, crop.top, crop.right, crop.bottom, width, height);
        Self {
            w: rect.w.max(2),
            h: rect.h.max(2),
            ..rect
        }
    }

    fn crop_filter(&self) -> Filter {
        Filter::new("crop")
            .opt("w", self.w)
            .opt("h", self.h)
            .opt("x", self.x)
            .opt("y", self.y)
    }
}

/// Milliseconds as ffmpeg seconds with millisecond precision.
fn secs(ms: i64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

/// Compiles [`ExportRequest`]s for one encoder.
#[derive(Debug, Clone)]
pub struct ExportCompiler {
    pub encoder: EncoderKind,
    /// Audio bitrate for video exports, reserved out of the size budget.
    pub audio_bitrate_bps: u32,
    /// Muted exports estimated at or under this size use constant quality.
    pub muted_threshold_bytes: u64,
}

impl ExportCompiler {
    pub fn new(encoder: EncoderKind) -> Self {
        Self {
            encoder,
            audio_bitrate_bps: 32_000,
            muted_threshold_bytes: 8 * 1024 * 1024,
        }
    }

    pub fn compile(&self, request: &ExportRequest) -> ClipResult<ExportPlan> {
        let first = request
            .segments
            .first()
            .ok_or_else(|| ClipError::invalid_state("nothing to export: no segments"))?;
        validate_segments(&request.segments, request.original_duration_ms)?;
        if request.mode.has_video() && (request.media_width == 0 || request.media_height == 0) {
            return Err(ClipError::invalid_state(
                "media dimensions are required for video exports",
            ));
        }
        if request.mode == ExportMode::Audio && !request.has_audio {
            return Err(ClipError::invalid_state("source has no audio to export"));
        }

        let segments: &[Segment] = match request.mode {
            ExportMode::Gif => std::slice::from_ref(first),
            _ => &request.segments,
        };
        let seek_origin_ms = (first.start_ms - SEEK_PREROLL_MS).max(0);
        let expected_duration_ms: i64 = segments.iter().map(Segment::duration_ms).sum();
        let with_audio = request.mode.wants_audio() && request.has_audio;

        let mut graph = FilterGraph::new();
        if request.mode.has_video() {
            let masked = self.push_regions(&mut graph, request);
            let sources = fan_out(&mut graph, masked, segments.len());
            for (i, (segment, source)) in segments.iter().zip(&sources).enumerate() {
                graph.push(trim_video(source, segment, seek_origin_ms, i));
            }
        }
        if with_audio {
            let input = format!("0:a:{}", request.audio_track_index);
            for (i, segment) in segments.iter().enumerate() {
                graph.push(trim_audio(&input, segment, seek_origin_ms, i));
            }
        }
        push_concat(&mut graph, segments.len(), request.mode.has_video(), with_audio);
        if request.mode.has_video() {
            let crop = PixelRect::for_crop(
                &request.regions.crop,
                request.media_width,
                request.media_height,
            );
            push_output_stage(&mut graph, crop, request.mode);
        }

        let rate_control = self.rate_control(request, expected_duration_ms);
        let args = self.build_args(request, &graph, seek_origin_ms, with_audio, rate_control);

        tracing::debug!(
            mode = ?request.mode,
            segments = segments.len(),
            regions = request.regions.regions.len(),
            graph = %graph,
            "Compiled export graph"
        );

        Ok(ExportPlan {
            mode: request.mode,
            encoder: self.encoder,
            graph,
            seek_origin_ms,
            expected_duration_ms,
            rate_control,
            output_path: request.output_path.clone(),
            args,
        })
    }

    /// Chain region masks onto `[0:v]`, returning the label of the result.
    fn push_regions(&self, graph: &mut FilterGraph, request: &ExportRequest) -> String {
        let mut current = "0:v".to_string();
        let rects = request.regions.active_regions().filter_map(|region| {
            PixelRect::for_region(region, request.media_width, request.media_height)
                .map(|rect| (rect, region.mode))
        });

        for (k, (rect, mode)) in rects.enumerate() {
            let base = format!("r{k}base");
            let masked = format!("r{k}mask");
            let fx = format!("r{k}fx");
            let out = format!("r{k}");

            graph.push(FilterChain::from_labels(
                vec![current],
                vec![Filter::new("split")],
                vec![base.clone(), masked.clone()],
            ));

            let mut filters = vec![rect.crop_filter()];
            filters.extend(mask_filters(rect, mode));
            graph.push(FilterChain::from_labels(
                vec![masked],
                filters,
                vec![fx.clone()],
            ));

            graph.push(FilterChain::from_labels(
                vec![base, fx],
                vec![Filter::new("overlay").opt("x", rect.x).opt("y", rect.y)],
                vec![out.clone()],
            ));
            current = out;
        }
        current
    }

    fn rate_control(&self, request: &ExportRequest, duration_ms: i64) -> Option<RateControl> {
        let duration_secs = duration_ms as f64 / 1000.0;
        match request.mode {
            ExportMode::Video => {
                let audio_bps = if request.has_audio {
                    self.audio_bitrate_bps
                } else {
                    0
                };
                Some(RateControl::target(BitrateBudgeter::VIDEO.video_kbps(
                    request.size_budget_bytes,
                    duration_secs,
                    audio_bps,
                )))
            }
            ExportMode::MutedVideo => {
                let estimate = estimate_output_bytes(
                    request.original_file_size,
                    duration_ms,
                    request.original_duration_ms,
                    request.regions.crop.area(),
                );
                Some(muted_rate_control(
                    estimate,
                    self.muted_threshold_bytes,
                    request.size_budget_bytes,
                    duration_secs,
                ))
            }
            ExportMode::Audio | ExportMode::Gif => None,
        }
    }

    fn build_args(
        &self,
        request: &ExportRequest,
        graph: &FilterGraph,
        seek_origin_ms: i64,
        with_audio: bool,
        rate_control: Option<RateControl>,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-nostats".into(),
            "-ss".into(),
            secs(seek_origin_ms),
            "-i".into(),
            request.source_path.to_string_lossy().into_owned(),
            "-filter_complex".into(),
            graph.to_string(),
        ];

        if request.mode.has_video() {
            args.extend(["-map".into(), "[outv]".into()]);
        }
        if with_audio {
            args.extend(["-map".into(), "[outa]".into()]);
        }

        match request.mode {
            ExportMode::Video => {
                args.extend(self.encoder.preset_args(EncodeProfile::Quality));
                if let Some(rate) = &rate_control {
                    args.extend(self.encoder.rate_args(rate));
                }
                if with_audio {
                    args.extend([
                        "-c:a".into(),
                        "aac".into(),
                        "-b:a".into(),
                        format!("{}k", self.audio_bitrate_bps / 1000),
                        "-ac".into(),
                        "1".into(),
                    ]);
                } else {
                    args.push("-an".into());
                }
                args.extend(["-movflags".into(), "+faststart".into()]);
            }
            ExportMode::MutedVideo => {
                args.extend(self.encoder.preset_args(EncodeProfile::LowLatency));
                if let Some(rate) = &rate_control {
                    args.extend(self.encoder.rate_args(rate));
                    if matches!(rate, RateControl::TargetBitrate { .. }) {
                        args.extend(["-r".into(), MUTED_FPS_CAP.to_string()]);
                    }
                }
                args.extend([
                    "-an".into(),
                    "-movflags".into(),
                    "+faststart".into(),
                ]);
            }
            ExportMode::Audio => {
                args.extend([
                    "-vn".into(),
                    "-c:a".into(),
                    "libmp3lame".into(),
                    "-b:a".into(),
                    "192k".into(),
                ]);
            }
            ExportMode::Gif => {
                args.extend(["-an".into(), "-loop".into(), "0".into()]);
            }
        }

        args.extend([
            "-progress".into(),
            "pipe:1".into(),
            request.output_path.to_string_lossy().into_owned(),
        ]);
        args
    }
}

/// Filters applied to the cropped copy of a region.
fn mask_filters(rect: PixelRect, mode: FilterMode) -> Vec<Filter> {
    let shrink = |factor: u32| ((rect.w / factor).max(1), (rect.h / factor).max(1));
    match mode {
        FilterMode::Blur => {
            let (sw, sh) = shrink(BLUR_FACTOR);
            vec![
                Filter::new("scale").opt("w", sw).opt("h", sh),
                Filter::new("scale")
                    .opt("w", rect.w)
                    .opt("h", rect.h)
                    .opt("flags", "bicubic"),
            ]
        }
        FilterMode::Pixelate => {
            let (sw, sh) = shrink(PIXELATE_FACTOR);
            vec![
                Filter::new("scale").opt("w", sw).opt("h", sh),
                Filter::new("scale")
                    .opt("w", rect.w)
                    .opt("h", rect.h)
                    .opt("flags", "neighbor"),
            ]
        }
        FilterMode::Solid => vec![Filter::new("drawbox")
            .opt("x", 0)
            .opt("y", 0)
            .opt("w", "iw")
            .opt("h", "ih")
            .opt("color", "black")
            .opt("t", "fill")],
    }
}

/// Labels each trim chain reads its video from.
///
/// The raw input pad may be read repeatedly; a labelled intermediate pad
/// may only be consumed once, so it is split when several segments need it.
fn fan_out(graph: &mut FilterGraph, source: String, count: usize) -> Vec<String> {
    if source == "0:v" || count <= 1 {
        return vec![source; count];
    }
    let outputs: Vec<String> = (0..count).map(|i| format!("src{i}")).collect();
    graph.push(FilterChain::from_labels(
        vec![source],
        vec![Filter::new("split").arg(count)],
        outputs.clone(),
    ));
    outputs
}

fn trim_window(segment: &Segment, seek_origin_ms: i64) -> (String, String) {
    let start = (segment.start_ms - seek_origin_ms).max(0);
    (secs(start), secs(segment.duration_ms()))
}

fn trim_video(source: &str, segment: &Segment, seek_origin_ms: i64, index: usize) -> FilterChain {
    let (start, duration) = trim_window(segment, seek_origin_ms);
    FilterChain::from_labels(
        vec![source.to_string()],
        vec![
            Filter::new("trim").opt("start", start).opt("duration", duration),
            Filter::new("setpts").arg("PTS-STARTPTS"),
        ],
        vec![format!("v{index}")],
    )
}

fn trim_audio(input: &str, segment: &Segment, seek_origin_ms: i64, index: usize) -> FilterChain {
    let (start, duration) = trim_window(segment, seek_origin_ms);
    let mut filters = vec![
        Filter::new("atrim").opt("start", start).opt("duration", duration),
        Filter::new("asetpts").arg("PTS-STARTPTS"),
    ];
    if segment.muted {
        filters.push(Filter::new("volume").arg(0));
    } else if !segment.has_neutral_audio() {
        filters.push(Filter::new("volume").arg(format!("{:.3}", segment.volume)));
    }
    FilterChain::from_labels(vec![input.to_string()], filters, vec![format!("a{index}")])
}

fn push_concat(graph: &mut FilterGraph, count: usize, video: bool, audio: bool) {
    let mut inputs = Vec::with_capacity(count * 2);
    for i in 0..count {
        if video {
            inputs.push(format!("v{i}"));
        }
        if audio {
            inputs.push(format!("a{i}"));
        }
    }
    let mut outputs = Vec::new();
    if video {
        outputs.push("cv".to_string());
    }
    if audio {
        outputs.push("outa".to_string());
    }
    graph.push(FilterChain::from_labels(
        inputs,
        vec![Filter::new("concat")
            .opt("n", count)
            .opt("v", u8::from(video))
            .opt("a", u8::from(audio))],
        outputs,
    ));
}

fn push_output_stage(graph: &mut FilterGraph, crop: PixelRect, mode: ExportMode) {
    let mut filters = vec![crop.crop_filter(), Filter::new("setsar").arg(1)];
    if mode != ExportMode::Gif {
        graph.push(FilterChain::new(&["cv"], filters, &["outv"]));
        return;
    }

    filters.extend([
        Filter::new("fps").arg(GIF_FPS),
        Filter::new("scale")
            .opt("w", GIF_WIDTH)
            .opt("h", -1)
            .opt("flags", "lanczos"),
        Filter::new("split"),
    ]);
    graph.push(FilterChain::new(&["cv"], filters, &["g0", "g1"]));
    graph.push(FilterChain::new(&["g0"], vec![Filter::new("palettegen")], &["pal"]));
    graph.push(FilterChain::new(
        &["g1", "pal"],
        vec![Filter::new("paletteuse")],
        &["outv"],
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::mib_to_bytes;

    fn request(segments: Vec<Segment>, mode: ExportMode) -> ExportRequest {
        ExportRequest {
            segments,
            regions: RegionSet::default(),
            media_width: 1920,
            media_height: 1080,
            audio_track_index: 0,
            has_audio: true,
            mode,
            size_budget_bytes: mib_to_bytes(6.7),
            source_path: PathBuf::from("/in/match.mp4"),
            output_path: PathBuf::from("/out/clip.mp4"),
            original_file_size: 200 * 1024 * 1024,
            original_duration_ms: 60_000,
        }
    }

    fn compile(req: &ExportRequest) -> ExportPlan {
        ExportCompiler::new(EncoderKind::X264).compile(req).unwrap()
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        let i = args.iter().position(|a| a == flag)?;
        args.get(i + 1).map(String::as_str)
    }

    #[test]
    fn test_even_pixel_rounding() {
        assert_eq!(to_even_px(0.5, 1920), 960);
        assert_eq!(to_even_px(0.1, 1079), 108);
        // 0.0005 * 1920 rounds to 1, then down to 0
        assert_eq!(to_even_px(0.0005, 1920), 0);
        assert_eq!(to_even_px(0.3333, 101), 34);
    }

    #[test]
    fn test_empty_segments_rejected() {
        let err = ExportCompiler::new(EncoderKind::X264)
            .compile(&request(vec![], ExportMode::Video))
            .unwrap_err();
        assert!(matches!(err, ClipError::InvalidState { .. }));
    }

    #[test]
    fn test_non_finite_volume_rejected() {
        let mut segment = Segment::new(0, 1_000);
        segment.volume = f32::NAN;
        let err = ExportCompiler::new(EncoderKind::X264)
            .compile(&request(vec![segment], ExportMode::Video))
            .unwrap_err();
        assert!(matches!(err, ClipError::BoundaryViolation { .. }));
    }

    #[test]
    fn test_plain_video_graph() {
        let plan = compile(&request(
            vec![Segment::new(2_000, 5_000), Segment::new(8_000, 9_500)],
            ExportMode::Video,
        ));
        assert_eq!(plan.seek_origin_ms, 1_500);
        assert_eq!(plan.expected_duration_ms, 4_500);
        assert_eq!(
            plan.graph.to_string(),
            "[0:v]trim=start=0.500:duration=3.000,setpts=PTS-STARTPTS[v0];\
             [0:v]trim=start=6.500:duration=1.500,setpts=PTS-STARTPTS[v1];\
             [0:a:0]atrim=start=0.500:duration=3.000,asetpts=PTS-STARTPTS[a0];\
             [0:a:0]atrim=start=6.500:duration=1.500,asetpts=PTS-STARTPTS[a1];\
             [v0][a0][v1][a1]concat=n=2:v=1:a=1[cv][outa];\
             [cv]crop=w=1920:h=1080:x=0:y=0,setsar=1[outv]"
        );
    }

    #[test]
    fn test_no_regions_means_no_split_or_overlay() {
        let plan = compile(&request(
            vec![Segment::new(0, 1_000), Segment::new(2_000, 3_000)],
            ExportMode::Video,
        ));
        assert!(!plan.graph.contains_filter("split"));
        assert!(!plan.graph.contains_filter("overlay"));
    }

    #[test]
    fn test_seek_origin_never_negative() {
        let plan = compile(&request(vec![Segment::new(200, 1_000)], ExportMode::Video));
        assert_eq!(plan.seek_origin_ms, 0);
        assert_eq!(arg_after(&plan.args, "-ss"), Some("0.000"));
        let trim = plan.graph.filters().find(|f| f.name() == "trim").unwrap();
        assert_eq!(trim.option("start"), Some("0.200"));
    }

    #[test]
    fn test_regions_chain_and_fan_out() {
        let mut req = request(
            vec![Segment::new(0, 1_000), Segment::new(2_000, 3_000), Segment::new(4_000, 5_000)],
            ExportMode::Video,
        );
        req.regions.add_region(FilterRegion::from_corners(0.1, 0.1, 0.3, 0.3, FilterMode::Blur));
        req.regions.add_region(FilterRegion::from_corners(0.5, 0.5, 0.6, 0.9, FilterMode::Solid));
        let plan = compile(&req);
        let text = plan.graph.to_string();

        assert_eq!(plan.graph.count_filter("overlay"), 2);
        assert!(text.starts_with(
            "[0:v]split[r0base][r0mask];\
             [r0mask]crop=w=384:h=216:x=192:y=108,scale=w=38:h=21,scale=w=384:h=216:flags=bicubic[r0fx];\
             [r0base][r0fx]overlay=x=192:y=108[r0];\
             [r0]split[r1base][r1mask];"
        ));
        assert!(text.contains("drawbox=x=0:y=0:w=iw:h=ih:color=black:t=fill[r1fx]"));
        assert!(text.contains("[r1]split=3[src0][src1][src2];[src0]trim="));
        assert!(text.contains("[src2]trim=start=4.000"));
    }

    #[test]
    fn test_single_segment_with_region_skips_fan_out() {
        let mut req = request(vec![Segment::new(0, 1_000)], ExportMode::Video);
        req.regions.add_region(FilterRegion::from_corners(0.0, 0.0, 0.5, 0.5, FilterMode::Pixelate));
        let text = compile(&req).graph.to_string();
        assert!(text.contains("scale=w=32:h=18,scale=w=960:h=540:flags=neighbor"));
        assert!(text.contains("[r0]trim=start=0.000"));
        assert!(!text.contains("split=1"));
    }

    #[test]
    fn test_degenerate_regions_skipped() {
        let mut req = request(vec![Segment::new(0, 1_000)], ExportMode::Video);
        req.regions.add_region(FilterRegion::from_corners(0.2, 0.2, 0.2, 0.8, FilterMode::Blur));
        // rounds to zero width at this frame size
        req.regions.add_region(FilterRegion::from_corners(0.5, 0.5, 0.5004, 0.8, FilterMode::Blur));
        let plan = compile(&req);
        assert!(!plan.graph.contains_filter("overlay"));
    }

    #[test]
    fn test_crop_is_even_aligned() {
        let mut req = request(vec![Segment::new(0, 1_000)], ExportMode::Video);
        req.media_width = 1281;
        req.media_height = 721;
        req.regions.set_crop(CropRect::new(0.1, 0.1, 0.9, 0.9));
        let text = compile(&req).graph.to_string();
        assert!(text.contains("[cv]crop=w=1024:h=576:x=128:y=72,setsar=1[outv]"));
    }

    #[test]
    fn test_muted_segment_audio_is_silenced() {
        let mut segments = vec![Segment::new(0, 1_000), Segment::new(1_000, 2_000)];
        segments[0].muted = true;
        segments[1].volume = 1.5;
        let text = compile(&request(segments, ExportMode::Video)).graph.to_string();
        assert!(text.contains("asetpts=PTS-STARTPTS,volume=0[a0]"));
        assert!(text.contains("asetpts=PTS-STARTPTS,volume=1.500[a1]"));
    }

    #[test]
    fn test_video_args() {
        let plan = compile(&request(vec![Segment::new(0, 30_000)], ExportMode::Video));
        assert_eq!(arg_after(&plan.args, "-c:v"), Some("libx264"));
        assert_eq!(arg_after(&plan.args, "-b:v"), Some("1841k"));
        assert_eq!(arg_after(&plan.args, "-c:a"), Some("aac"));
        assert_eq!(arg_after(&plan.args, "-b:a"), Some("32k"));
        assert_eq!(arg_after(&plan.args, "-ac"), Some("1"));
        assert_eq!(arg_after(&plan.args, "-progress"), Some("pipe:1"));
        assert_eq!(plan.args.last().map(String::as_str), Some("/out/clip.mp4"));
        let maps: Vec<_> = plan
            .args
            .windows(2)
            .filter(|w| w[0] == "-map")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(maps, ["[outv]", "[outa]"]);
    }

    #[test]
    fn test_video_without_audio_source() {
        let mut req = request(vec![Segment::new(0, 1_000)], ExportMode::Video);
        req.has_audio = false;
        let plan = compile(&req);
        assert!(!plan.graph.contains_filter("atrim"));
        assert!(plan.graph.to_string().contains("concat=n=1:v=1:a=0[cv]"));
        assert!(plan.args.contains(&"-an".to_string()));
        assert!(!plan.args.contains(&"[outa]".to_string()));
    }

    #[test]
    fn test_audio_mode() {
        let mut req = request(
            vec![Segment::new(0, 1_000), Segment::new(3_000, 4_000)],
            ExportMode::Audio,
        );
        req.audio_track_index = 1;
        req.regions.add_region(FilterRegion::from_corners(0.1, 0.1, 0.3, 0.3, FilterMode::Blur));
        let plan = compile(&req);
        assert_eq!(
            plan.graph.to_string(),
            "[0:a:1]atrim=start=0.000:duration=1.000,asetpts=PTS-STARTPTS[a0];\
             [0:a:1]atrim=start=3.000:duration=1.000,asetpts=PTS-STARTPTS[a1];\
             [a0][a1]concat=n=2:v=0:a=1[outa]"
        );
        assert_eq!(arg_after(&plan.args, "-c:a"), Some("libmp3lame"));
        assert_eq!(arg_after(&plan.args, "-b:a"), Some("192k"));
        assert!(plan.rate_control.is_none());
    }

    #[test]
    fn test_audio_mode_requires_audio() {
        let mut req = request(vec![Segment::new(0, 1_000)], ExportMode::Audio);
        req.has_audio = false;
        assert!(ExportCompiler::new(EncoderKind::X264).compile(&req).is_err());
    }

    #[test]
    fn test_gif_uses_first_segment_only() {
        let plan = compile(&request(
            vec![Segment::new(1_000, 3_000), Segment::new(5_000, 9_000)],
            ExportMode::Gif,
        ));
        assert_eq!(plan.expected_duration_ms, 2_000);
        assert_eq!(plan.graph.count_filter("trim"), 1);
        assert!(!plan.graph.contains_filter("atrim"));
        assert!(plan.graph.to_string().ends_with(
            "[cv]crop=w=1920:h=1080:x=0:y=0,setsar=1,fps=12,scale=w=480:h=-1:flags=lanczos,split[g0][g1];\
             [g0]palettegen[pal];[g1][pal]paletteuse[outv]"
        ));
    }

    #[test]
    fn test_muted_small_estimate_uses_constant_quality() {
        let mut req = request(vec![Segment::new(0, 2_000)], ExportMode::MutedVideo);
        req.original_file_size = 60 * 1024 * 1024;
        let plan = ExportCompiler::new(EncoderKind::Nvenc).compile(&req).unwrap();
        assert_eq!(
            plan.rate_control,
            Some(RateControl::ConstantQuality { quality: 23 })
        );
        assert_eq!(arg_after(&plan.args, "-rc"), Some("constqp"));
        assert_eq!(arg_after(&plan.args, "-tune"), Some("ull"));
        assert!(plan.args.contains(&"-an".to_string()));
        assert!(!plan.args.contains(&"-r".to_string()));
        assert!(!plan.graph.contains_filter("atrim"));
    }

    #[test]
    fn test_muted_large_estimate_targets_bitrate_and_caps_fps() {
        let mut req = request(vec![Segment::new(0, 30_000)], ExportMode::MutedVideo);
        req.size_budget_bytes = mib_to_bytes(7.5);
        let plan = compile(&req);
        assert!(matches!(
            plan.rate_control,
            Some(RateControl::TargetBitrate { kbps: 2097, .. })
        ));
        assert_eq!(arg_after(&plan.args, "-r"), Some("25"));
    }

    #[test]
    fn test_same_graph_for_both_encoders() {
        let req = request(vec![Segment::new(0, 4_000)], ExportMode::Video);
        let hw = ExportCompiler::new(EncoderKind::Nvenc).compile(&req).unwrap();
        let sw = ExportCompiler::new(EncoderKind::X264).compile(&req).unwrap();
        assert_eq!(hw.graph, sw.graph);
        assert_ne!(hw.args, sw.args);
    }
}
