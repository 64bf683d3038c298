use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "glslplay",
    author,
    version,
    about = "Live-preview playground for GLSL fragment shaders"
)]
pub struct Cli {
    /// Directory holding the shader sources and an optional playground.toml.
    #[arg(value_name = "DIR", default_value = "shaders")]
    pub root: PathBuf,

    /// Window size as WIDTHxHEIGHT.
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "480x360", value_parser = parse_size)]
    pub size: (u32, u32),

    /// Driver preamble line count used to correct diagnostic line numbers
    /// (overrides the manifest value).
    #[arg(long, value_name = "LINES")]
    pub preamble_lines: Option<u32>,

    /// Initial resolution divisor: 1, 2, 4, or 8.
    #[arg(long, value_name = "N", default_value_t = 1, value_parser = parse_divisor)]
    pub scale: u32,

    /// Render as fast as possible instead of waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(spec: &str) -> Result<(u32, u32), String> {
    let (width, height) = spec
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 480x360".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

fn parse_divisor(spec: &str) -> Result<u32, String> {
    match spec.trim() {
        "1" => Ok(1),
        "2" => Ok(2),
        "4" => Ok(4),
        "8" => Ok(8),
        other => Err(format!("unsupported divisor '{other}' (use 1, 2, 4, or 8)")),
    }
}
