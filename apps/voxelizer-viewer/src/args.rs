//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{bail, Context};
use voxelizer_voxel::{Normalization, ProjectionMethod, VoxelizeMode, VoxelizerConfig};

/// Built-in test meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshKind {
    Cube,
    Sphere,
    Torus,
    Tetrahedron,
}

impl MeshKind {
    fn parse(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "cube" => Self::Cube,
            "sphere" => Self::Sphere,
            "torus" => Self::Torus,
            "tetra" | "tetrahedron" => Self::Tetrahedron,
            other => bail!("unknown mesh '{other}' (expected cube, sphere, torus or tetra)"),
        })
    }
}

/// Where the mesh comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum MeshSource {
    Builtin(MeshKind),
    Obj(PathBuf),
}

/// Parsed viewer options.
#[derive(Clone, Debug)]
pub struct ViewerArgs {
    pub source: MeshSource,
    pub config: VoxelizerConfig,
    /// Mip level to preview and build the box array from.
    pub mip: usize,
    /// Preview output path; `{}` is replaced by the frame number.
    pub output: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Camera yaw in degrees.
    pub orbit: f32,
    /// Number of preview frames spread over a full turn.
    pub frames: u32,
    pub help: bool,
}

impl Default for ViewerArgs {
    fn default() -> Self {
        Self {
            source: MeshSource::Builtin(MeshKind::Sphere),
            config: VoxelizerConfig::default(),
            mip: 0,
            output: None,
            width: 512,
            height: 512,
            orbit: 35.0,
            frames: 1,
            help: false,
        }
    }
}

impl ViewerArgs {
    /// Parse from process arguments.
    pub fn from_args() -> anyhow::Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        Self::parse_args(&args)
    }

    /// Parse from a slice of arguments. The first entry is the program name.
    pub fn parse_args(args: &[String]) -> anyhow::Result<Self> {
        let mut parsed = Self::default();

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut value = || next_value(args, &mut i, flag);

            match flag {
                "-h" | "--help" => parsed.help = true,
                "--mesh" => parsed.source = MeshSource::Builtin(MeshKind::parse(value()?)?),
                "--obj" => parsed.source = MeshSource::Obj(PathBuf::from(value()?)),
                "-r" | "--resolution" => parsed.config.resolution = parse_number(flag, value()?)?,
                "--solid" => parsed.config.mode = VoxelizeMode::Solid,
                "--method" => parsed.config.method = value()?.parse()?,
                "--mip" => parsed.mip = parse_number(flag, value()?)?,
                "--slots" => parsed.config.kbuffer_slots = parse_number(flag, value()?)?,
                "--max-passes" => parsed.config.max_peel_passes = parse_number(flag, value()?)?,
                "--normalize" => parsed.config.normalization = value()?.parse::<Normalization>()?,
                "-o" | "--output" => parsed.output = Some(value()?.to_string()),
                "--width" => parsed.width = parse_number(flag, value()?)?,
                "--height" => parsed.height = parse_number(flag, value()?)?,
                "--orbit" => parsed.orbit = parse_number(flag, value()?)?,
                "-f" | "--frames" => parsed.frames = parse_number(flag, value()?)?,
                other => bail!("unknown argument '{other}' (see --help)"),
            }
            i += 1;
        }

        if parsed.frames == 0 {
            bail!("--frames must be at least 1");
        }
        if parsed.width == 0 || parsed.height == 0 {
            bail!("preview size must be non-zero");
        }
        parsed.config.validate()?;
        Ok(parsed)
    }

    pub fn method(&self) -> ProjectionMethod {
        self.config.method
    }
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{flag} expects a value"))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value '{value}' for {flag}"))
}
