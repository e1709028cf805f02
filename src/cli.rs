// ============================================================================
// PaintRing CLI - headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   paintring --input in.png --op color:255,0,0 --op fill:5,5 --output out.png
//   paintring --new 400x400 --op stroke:50,50:50,150 --op undo -o out.png
//   paintring -i in.png --op resize:800x600 --op paste:logo.png -o out.png
//
// No window is opened. Operations run in command-line order against the same
// controller the window uses, presenting into an in-memory chain.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{bail, Context};
use clap::Parser;

use paintring::canvas::{Color, Point, Size};
use paintring::components::tools::{PointerEvent, PointerMove, ToolKind};
use paintring::settings::PaintSettings;
use paintring::{io, PaintController};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PaintRing headless editor.
#[derive(Parser, Debug)]
#[command(
    name = "paintring",
    about = "PaintRing headless batch editor",
    long_about = "Apply paint operations to a PNG without opening the window.\n\n\
                  Operations (repeat --op, applied in order):\n  \
                  color:R,G,B[,A]       set the paint color\n  \
                  fill:X,Y              flood fill from a pixel\n  \
                  stroke:X1,Y1:X2,Y2    pencil line\n  \
                  resize:WxH            resize, keeping content at the origin\n  \
                  paste:FILE.png        paste an image at the origin\n  \
                  clear | undo | redo"
)]
pub struct CliArgs {
    /// PNG to start from.
    #[arg(short, long, value_name = "FILE.png", conflicts_with = "new")]
    pub input: Option<PathBuf>,

    /// Start from a blank canvas of this size instead of a file.
    #[arg(short, long, value_name = "WxH", value_parser = parse_size)]
    pub new: Option<Size>,

    /// Operation to apply. May be repeated.
    #[arg(short = 'x', long = "op", value_name = "OP", value_parser = parse_op)]
    pub ops: Vec<CliOp>,

    /// Where to write the resulting PNG.
    #[arg(short, long, value_name = "FILE.png")]
    pub output: PathBuf,

    /// Pencil brush size in pixels.
    #[arg(short, long, default_value_t = 1)]
    pub brush: u32,

    /// Print each operation as it is applied.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| matches!(a.as_str(), "--input" | "-i" | "--new" | "-n"))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CliOp {
    Color(Color),
    Fill(Point),
    Stroke(Point, Point),
    Resize(Size),
    Paste(PathBuf),
    Clear,
    Undo,
    Redo,
}

impl FromStr for CliOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = s.split_once(':').unwrap_or((s, ""));
        match (name.trim().to_ascii_lowercase().as_str(), arg) {
            ("clear", "") => Ok(CliOp::Clear),
            ("undo", "") => Ok(CliOp::Undo),
            ("redo", "") => Ok(CliOp::Redo),
            ("color", a) => parse_color(a).map(CliOp::Color),
            ("fill", a) => parse_point(a).map(CliOp::Fill),
            ("stroke", a) => {
                let (from, to) = a
                    .split_once(':')
                    .ok_or_else(|| format!("stroke needs X1,Y1:X2,Y2, got '{a}'"))?;
                Ok(CliOp::Stroke(parse_point(from)?, parse_point(to)?))
            }
            ("resize", a) => parse_size(a).map(CliOp::Resize),
            ("paste", a) if !a.is_empty() => Ok(CliOp::Paste(PathBuf::from(a))),
            _ => Err(format!("unknown operation '{s}'")),
        }
    }
}

fn parse_op(s: &str) -> Result<CliOp, String> {
    s.parse()
}

fn parse_numbers<T: FromStr>(s: &str, sep: char) -> Result<Vec<T>, String> {
    s.split(sep)
        .map(|part| {
            part.trim()
                .parse::<T>()
                .map_err(|_| format!("'{}' is not a valid number", part.trim()))
        })
        .collect()
}

fn parse_point(s: &str) -> Result<Point, String> {
    match parse_numbers::<f32>(s, ',')?.as_slice() {
        [x, y] => Ok(Point::new(*x, *y)),
        _ => Err(format!("expected X,Y, got '{s}'")),
    }
}

fn parse_color(s: &str) -> Result<Color, String> {
    match parse_numbers::<u8>(s, ',')?.as_slice() {
        [r, g, b] => Ok(Color::rgb(*r, *g, *b)),
        [r, g, b, a] => Ok(Color::rgba(*r, *g, *b, *a)),
        _ => Err(format!("expected R,G,B[,A], got '{s}'")),
    }
}

fn parse_size(s: &str) -> Result<Size, String> {
    match parse_numbers::<u32>(&s.to_ascii_lowercase(), 'x')?.as_slice() {
        [w, h] if *w > 0 && *h > 0 => Ok(Size::new(*w, *h)),
        _ => Err(format!("expected WxH with non-zero sides, got '{s}'")),
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the batch job and return an OS exit code: `0` on success, `1` on any
/// failure.
pub fn run(args: CliArgs) -> ExitCode {
    match run_job(&args) {
        Ok(()) => {
            if args.verbose {
                println!("  → {}", args.output.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_job(args: &CliArgs) -> anyhow::Result<()> {
    let mut settings = PaintSettings {
        brush_size: args.brush,
        ..PaintSettings::default()
    };
    if let Some(size) = args.new {
        settings.canvas_width = size.width;
        settings.canvas_height = size.height;
    }

    let mut controller = PaintController::headless(settings)?;
    match (&args.input, args.new) {
        (Some(path), _) => {
            let surface = io::load_png_file(path)
                .with_context(|| format!("could not load '{}'", path.display()))?;
            controller.load_surface(surface)?;
        }
        (None, Some(_)) => {}
        (None, None) => bail!("either --input or --new is required"),
    }

    for (idx, op) in args.ops.iter().enumerate() {
        if args.verbose {
            println!("[{}/{}] {:?}", idx + 1, args.ops.len(), op);
        }
        apply(&mut controller, op).with_context(|| format!("operation {} ({op:?}) failed", idx + 1))?;
    }

    save(&controller, &args.output)?;
    controller.shutdown()?;
    Ok(())
}

fn apply(controller: &mut PaintController, op: &CliOp) -> anyhow::Result<()> {
    match op {
        CliOp::Color(color) => controller.set_color(*color),
        CliOp::Fill(at) => {
            controller.select_tool(ToolKind::Fill)?;
            controller.pointer_down(PointerEvent::pressed(at.x, at.y))?;
            controller.pointer_up(PointerEvent::released(at.x, at.y));
        }
        CliOp::Stroke(from, to) => {
            controller.select_tool(ToolKind::Pencil)?;
            controller.pointer_down(PointerEvent::pressed(from.x, from.y))?;
            controller.pointer_move(&PointerMove::to(to.x, to.y, true));
            controller.pointer_up(PointerEvent::released(to.x, to.y));
        }
        CliOp::Resize(size) => {
            controller.resize(*size)?;
        }
        CliOp::Paste(path) => {
            let surface = io::load_png_file(path)
                .with_context(|| format!("could not load '{}'", path.display()))?;
            controller.paste(&surface)?;
        }
        CliOp::Clear => controller.clear()?,
        CliOp::Undo => {
            if !controller.undo()? {
                log::warn!("nothing to undo");
            }
        }
        CliOp::Redo => {
            if !controller.redo()? {
                log::warn!("nothing to redo");
            }
        }
    }
    Ok(())
}

fn save(controller: &PaintController, output: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(output)
        .with_context(|| format!("could not create '{}'", output.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    controller.save_png(&mut writer)?;
    std::io::Write::flush(&mut writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_parse() {
        assert_eq!("undo".parse::<CliOp>(), Ok(CliOp::Undo));
        assert_eq!(
            "color:255,0,0".parse::<CliOp>(),
            Ok(CliOp::Color(Color::RED))
        );
        assert_eq!(
            "color:1,2,3,4".parse::<CliOp>(),
            Ok(CliOp::Color(Color::rgba(1, 2, 3, 4)))
        );
        assert_eq!(
            "fill:5,6".parse::<CliOp>(),
            Ok(CliOp::Fill(Point::new(5.0, 6.0)))
        );
        assert_eq!(
            "stroke:1,2:3,4".parse::<CliOp>(),
            Ok(CliOp::Stroke(Point::new(1.0, 2.0), Point::new(3.0, 4.0)))
        );
        assert_eq!(
            "resize:800X600".parse::<CliOp>(),
            Ok(CliOp::Resize(Size::new(800, 600)))
        );
    }

    #[test]
    fn malformed_ops_are_rejected() {
        assert!("color:300,0,0".parse::<CliOp>().is_err());
        assert!("fill:5".parse::<CliOp>().is_err());
        assert!("stroke:1,2".parse::<CliOp>().is_err());
        assert!("resize:0x10".parse::<CliOp>().is_err());
        assert!("undo:3".parse::<CliOp>().is_err());
        assert!("paste:".parse::<CliOp>().is_err());
        assert!("spray:1,1".parse::<CliOp>().is_err());
    }

    #[test]
    fn args_keep_op_order() {
        let args = CliArgs::try_parse_from([
            "paintring", "--new", "10x10", "--op", "fill:1,1", "--op", "undo", "-o", "out.png",
        ])
        .unwrap();
        assert_eq!(args.new, Some(Size::new(10, 10)));
        assert_eq!(args.ops, vec![CliOp::Fill(Point::new(1.0, 1.0)), CliOp::Undo]);
    }

    #[test]
    fn job_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.png");
        let out = output.to_str().unwrap();
        let args = CliArgs::try_parse_from([
            "paintring", "--new", "10x10", "--op", "color:255,0,0", "--op", "fill:0,0", "-o", out,
        ])
        .unwrap();
        run_job(&args).unwrap();

        let written = io::load_png_file(&output).unwrap();
        assert_eq!(written.size(), Size::new(10, 10));
        assert!(written.pixels().iter().all(|c| *c == Color::RED));
    }
}
