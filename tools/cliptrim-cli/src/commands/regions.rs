//! Crop and privacy filter regions.

use std::path::PathBuf;

use cliptrim_common::AppConfig;
use cliptrim_edit_model::{FilterRegion, RegionSet};

use super::{parse_crop, parse_mode, parse_quad, RegionAction, Session};

pub fn crop(
    config: &AppConfig,
    path: PathBuf,
    rect: Option<String>,
    reset: bool,
) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let regions = session.editor.regions_mut();
    match (rect, reset) {
        (Some(text), _) => regions.set_crop(parse_crop(&text)?),
        (None, true) => regions.reset_crop(),
        (None, false) => {}
    }

    let crop = session.editor.regions().crop;
    if crop.is_full() {
        println!("Crop: none");
    } else {
        println!(
            "Crop: {:.3},{:.3} to {:.3},{:.3}",
            crop.left, crop.top, crop.right, crop.bottom
        );
    }
    session.save()
}

pub fn region(config: &AppConfig, path: PathBuf, action: RegionAction) -> anyhow::Result<()> {
    let mut session = Session::open(config, &path)?;
    let regions = session.editor.regions_mut();

    match action {
        RegionAction::Add { corners, mode } => {
            let [x0, y0, x1, y1] = parse_quad(&corners)?;
            let region = FilterRegion::from_corners(x0, y0, x1, y1, parse_mode(&mode)?);
            if region.is_degenerate() {
                println!("Warning: region has no area and will not be rendered");
            }
            let index = regions.add_region(region);
            println!("Added region {index} ({})", region.mode);
        }
        RegionAction::Remove { index } => match regions.remove_region(index) {
            Some(_) => println!("Removed region {index}"),
            None => anyhow::bail!("No region {index}"),
        },
        RegionAction::Mode { index, mode } => {
            let current = regions
                .regions
                .get(index)
                .map(|r| r.mode)
                .ok_or_else(|| anyhow::anyhow!("No region {index}"))?;
            let mode = match mode {
                Some(text) => parse_mode(&text)?,
                None => current.cycled(),
            };
            regions.set_region_mode(index, mode);
            println!("Region {index}: {mode}");
        }
        RegionAction::Clear => {
            regions.clear_regions();
            println!("Cleared all regions");
        }
        RegionAction::List => {
            list(regions);
            return Ok(());
        }
    }

    list(session.editor.regions());
    session.save()
}

fn list(regions: &RegionSet) {
    if regions.regions.is_empty() {
        println!("  (no regions)");
    }
    for (i, r) in regions.regions.iter().enumerate() {
        println!(
            "  [{i}] {:.3},{:.3} to {:.3},{:.3}  {}{}",
            r.left,
            r.top,
            r.right,
            r.bottom,
            r.mode,
            if r.is_degenerate() { "  (empty)" } else { "" }
        );
    }
}
