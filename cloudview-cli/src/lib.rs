//! Load a point cloud file, then show it.
//!
//! The binary is a thin wrapper around [`run`]; the sequence itself is
//! generic over [`PointCloudDisplay`] so it can be driven without a window.

pub mod cli;

pub use cli::Args;

use anyhow::{Context, Result};
use cloudview_core::PointCloudData;
use cloudview_io::read_point_cloud_with;
use cloudview_visualization::{PointCloudDisplay, Viewer};
use log::info;

/// Load the file named by `args`
pub fn load(args: &Args) -> Result<PointCloudData> {
    let cloud = read_point_cloud_with(&args.file, &args.read_options())
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    Ok(cloud)
}

/// Load, then hand the cloud to `display` and wait for it to return
pub fn run_with<D: PointCloudDisplay>(args: &Args, display: &mut D) -> Result<()> {
    let cloud = load(args)?;
    display
        .display(&cloud)
        .with_context(|| format!("Failed to display {}", args.file.display()))?;
    Ok(())
}

/// One-line description of a loaded cloud, used by `--check`
pub fn summary(cloud: &PointCloudData) -> String {
    let bounds = cloud.bounding_box();
    format!(
        "{} points ({}), bounds [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
        cloud.len(),
        cloud.attribute_summary(),
        bounds.min.x,
        bounds.min.y,
        bounds.min.z,
        bounds.max.x,
        bounds.max.y,
        bounds.max.z,
    )
}

/// Run the command line: report with `--check`, otherwise open the viewer
pub fn run(args: &Args) -> Result<()> {
    if args.check {
        let cloud = load(args)?;
        info!("{}: {}", args.file.display(), summary(&cloud));
        return Ok(());
    }

    let mut viewer = Viewer::new(args.viewer_config());
    run_with(args, &mut viewer)
}
