use clap::Parser;
use cloudview_io::{FileFormat, ReadOptions};
use cloudview_visualization::ViewerConfig;
use std::path::PathBuf;

pub const DEFAULT_FILE: &str = "/tmp/bottle.ply";

/// Load a point cloud file and inspect it in an interactive 3D viewer.
#[derive(Debug, Parser)]
#[clap(name = "cloudview", version)]
pub struct Args {
    /// Point cloud file to show (ply, pcd, xyz, xyzn, xyzrgb, pts)
    #[clap(env = "CLOUDVIEW_FILE", default_value = DEFAULT_FILE)]
    pub file: PathBuf,

    /// Read the file as this format instead of detecting it
    #[clap(long)]
    pub format: Option<FileFormat>,

    /// Drop points with a NaN coordinate while loading
    #[clap(long)]
    pub remove_nan: bool,

    /// Drop points with an infinite coordinate while loading
    #[clap(long)]
    pub remove_infinite: bool,

    /// Edge length of each drawn point, in pixels
    #[clap(long, default_value = "3.0")]
    pub point_size: f32,

    /// Initial window width
    #[clap(long, default_value = "1280")]
    pub width: u32,

    /// Initial window height
    #[clap(long, default_value = "720")]
    pub height: u32,

    /// Window title
    #[clap(long, default_value = "cloudview")]
    pub title: String,

    /// Background color as r,g,b with components in 0..1
    #[clap(long, value_parser = parse_color, default_value = "1,1,1")]
    pub background: [f64; 3],

    /// Load the file and report it without opening a window
    #[clap(long)]
    pub check: bool,

    /// Verbosity of the command line output.
    #[clap(long, default_value = "info")]
    pub log_level: log::Level,
}

impl Args {
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            format: self.format,
            remove_nan_points: self.remove_nan,
            remove_infinite_points: self.remove_infinite,
        }
    }

    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            point_size: self.point_size,
            background_color: self.background,
        }
    }
}

fn parse_color(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("expected r,g,b but got {:?}", s));
    };

    let mut color = [0.0; 3];
    for (slot, part) in color.iter_mut().zip([r, g, b]) {
        let value: f64 = part
            .parse()
            .map_err(|_| format!("{:?} is not a number", part))?;
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("color component {} is outside 0..1", value));
        }
        *slot = value;
    }
    Ok(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["cloudview"]).unwrap();
        // CLOUDVIEW_FILE may be set by whoever runs the tests
        if std::env::var_os("CLOUDVIEW_FILE").is_none() {
            assert_eq!(args.file, PathBuf::from(DEFAULT_FILE));
        }
        assert_eq!(args.format, None);
        assert!(!args.check);
        assert_eq!(args.log_level, log::Level::Info);
        assert_eq!(args.viewer_config(), ViewerConfig::default());
        assert_eq!(args.read_options(), ReadOptions::default());
    }

    #[test]
    fn test_all_options() {
        let args = Args::try_parse_from([
            "cloudview",
            "scan.data",
            "--format",
            "pcd",
            "--remove-nan",
            "--remove-infinite",
            "--point-size",
            "5",
            "--width",
            "640",
            "--height",
            "480",
            "--title",
            "scan",
            "--background",
            "0, 0.5, 1",
            "--check",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.file, PathBuf::from("scan.data"));
        let options = args.read_options();
        assert_eq!(options.format, Some(FileFormat::Pcd));
        assert!(options.remove_nan_points && options.remove_infinite_points);

        let config = args.viewer_config();
        assert_eq!(config.title, "scan");
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.point_size, 5.0);
        assert_eq!(config.background_color, [0.0, 0.5, 1.0]);
        assert!(args.check);
        assert_eq!(args.log_level, log::Level::Debug);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Args::try_parse_from(["cloudview", "--format", "obj"]).is_err());
        assert!(Args::try_parse_from(["cloudview", "--background", "1,1"]).is_err());
        assert!(Args::try_parse_from(["cloudview", "--background", "1,2,0"]).is_err());
        assert!(Args::try_parse_from(["cloudview", "--width", "wide"]).is_err());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("0.1,0.2,0.3"), Ok([0.1, 0.2, 0.3]));
        assert!(parse_color("a,b,c").is_err());
        assert!(parse_color("").is_err());
    }
}
