//! Edits made through the editor flow through to the compiled ffmpeg plan.

use std::path::PathBuf;

use cliptrim_common::{EditingConfig, ExportSettings};
use cliptrim_edit_model::{CropRect, EditDocument, FilterMode, FilterRegion, MediaInfo};
use cliptrim_render_engine::{compiler_for, request_from_document, EncoderKind, ExportMode};

fn document() -> EditDocument {
    EditDocument::new(
        MediaInfo {
            path: PathBuf::from("/videos/match.mp4"),
            duration_ms: 20_000,
            width: 1920,
            height: 1080,
            file_size: 50 * 1024 * 1024,
            audio_tracks: 2,
        },
        true,
        &EditingConfig::default(),
    )
}

#[test]
fn edited_document_compiles_to_expected_graph() {
    let config = EditingConfig::default();
    let mut doc = document();
    let mut editor = doc.to_editor(&config).unwrap();

    editor.split_at(5_000);
    editor.split_at(12_000);
    assert_eq!(editor.delete_segments(&[1]), 1);
    editor.set_muted(&[1], true);
    editor.select_audio_track(1);
    editor
        .regions_mut()
        .add_region(FilterRegion::from_corners(0.75, 0.0, 1.0, 0.25, FilterMode::Pixelate));
    editor.regions_mut().set_crop(CropRect::new(0.0, 0.0, 0.5, 0.5));
    doc.store(&editor);

    let settings = ExportSettings::default();
    let request = request_from_document(
        &doc,
        ExportMode::Video,
        &settings,
        PathBuf::from("/out/clip.mp4"),
    );
    let plan = compiler_for(&settings, EncoderKind::X264)
        .compile(&request)
        .unwrap();

    assert_eq!(plan.seek_origin_ms, 0);
    assert_eq!(plan.expected_duration_ms, 13_000);
    assert_eq!(plan.graph.count_filter("overlay"), 1);

    let graph = plan.graph.to_string();
    assert!(graph.contains("[r0]split=2[src0][src1]"));
    assert!(graph.contains("[src0]trim=start=0.000:duration=5.000"));
    assert!(graph.contains("[src1]trim=start=12.000:duration=8.000"));
    assert!(graph.contains("[0:a:1]atrim=start=12.000:duration=8.000,asetpts=PTS-STARTPTS,volume=0[a1]"));
    assert!(graph.ends_with("[cv]crop=w=960:h=540:x=0:y=0,setsar=1[outv]"));
}

#[test]
fn undo_after_export_compile_leaves_plan_inputs_untouched() {
    let config = EditingConfig::default();
    let mut doc = document();
    let mut editor = doc.to_editor(&config).unwrap();
    editor.split_at(10_000);
    doc.store(&editor);

    let settings = ExportSettings::default();
    let request = request_from_document(
        &doc,
        ExportMode::Audio,
        &settings,
        PathBuf::from("/out/clip.mp3"),
    );
    let before = request.segments.clone();
    compiler_for(&settings, EncoderKind::X264)
        .compile(&request)
        .unwrap();

    assert!(editor.undo());
    assert_eq!(request.segments, before);
    assert_eq!(editor.segments().len(), 1);
}
