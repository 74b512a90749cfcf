//! Loads an IGA file, validates it, optionally dumps its contents and
//! re-encodes it into memory.
//!
//! Usage: `iga-inspect <file.iga> [--verbose|-v]`
//!
//! Exit codes: 1 usage, 2 open failed, 3 decode failed, 4 invalid model,
//! 5 encode failed.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use iga_fileio::{
    DecodeOptions, GeometryModel, PieceRef, Side, encode_container, read_container_with_options,
};
use tracing::{debug, info};

/// Environment variable overriding the per-block allocation ceiling.
const MAX_ALLOC_VAR: &str = "IGA_MAX_ALLOC";

struct Args {
    path: String,
    verbose: bool,
}

/// A failure and the exit code it maps to.
struct Failure {
    code: u8,
    error: anyhow::Error,
}

fn exit_with(code: u8) -> impl FnOnce(anyhow::Error) -> Failure {
    move |error| Failure { code, error }
}

fn parse_args() -> Option<Args> {
    let mut path = None;
    let mut verbose = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            _ if path.is_none() => path = Some(arg),
            _ => return None,
        }
    }
    Some(Args { path: path?, verbose })
}

fn decode_options() -> Result<DecodeOptions> {
    let options = DecodeOptions::new();
    match std::env::var(MAX_ALLOC_VAR) {
        Ok(value) => {
            let max_alloc = value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{MAX_ALLOC_VAR}={value:?} is not a byte count"))?;
            Ok(options.with_max_alloc(max_alloc))
        }
        Err(std::env::VarError::NotPresent) => Ok(options),
        Err(err) => Err(anyhow!(err).context(MAX_ALLOC_VAR)),
    }
}

fn main() -> ExitCode {
    let Some(args) = parse_args() else {
        eprintln!("Usage: iga-inspect <file.iga> [--verbose|-v]");
        return ExitCode::from(1);
    };

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()))
        .with_writer(io::stderr)
        .init();

    match inspect(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {:#}", failure.error);
            ExitCode::from(failure.code)
        }
    }
}

fn inspect(args: &Args) -> Result<(), Failure> {
    let options = decode_options().map_err(exit_with(1))?;
    debug!("allocation ceiling: {} bytes", options.max_alloc);

    let file = File::open(&args.path)
        .with_context(|| format!("failed to open {}", args.path))
        .map_err(exit_with(2))?;

    let model = read_container_with_options(BufReader::new(file), options)
        .with_context(|| format!("failed to load valid data from {}", args.path))
        .map_err(exit_with(3))?;

    let mut diagnostics = String::new();
    if !model.is_valid_with(&mut diagnostics) {
        eprint!("{diagnostics}");
        return Err(Failure {
            code: 4,
            error: anyhow!("{} is not a valid IGA file", args.path),
        });
    }
    info!("loaded {}", args.path);
    println!(
        "Loaded the IGA file; it contains {} elements.",
        model.elem_count()
    );

    if args.verbose {
        let stdout = io::stdout();
        print_model(&model, &mut stdout.lock())
            .context("failed to print model")
            .map_err(exit_with(1))?;
    }

    let bytes = encode_container(&model)
        .context("writing the IGA file failed")
        .map_err(exit_with(5))?;
    println!(
        "Writing the IGA file to a buffer produced {} bytes.",
        bytes.len()
    );
    Ok(())
}

fn print_model(model: &GeometryModel, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Surface type is {}", model.surface_type())?;

    for elem in 0..model.elem_count() {
        let sides: Vec<String> = Side::ALL
            .iter()
            .map(|&side| model.elem_edges_on_side(elem, side).unwrap_or(0).to_string())
            .collect();
        let pieces = model.piece_range(elem).unwrap_or_default();
        writeln!(
            out,
            "Elem {elem} has {} edges ({}) and covers pieces {}..{}.",
            model.elem_edge_count(elem).unwrap_or(0),
            sides.join(", "),
            pieces.start,
            pieces.end
        )?;

        for edge in model.edge_range(elem).unwrap_or_default() {
            let interval = model.edge_interval(edge).unwrap_or(1.0);
            if model.is_boundary_edge(edge) {
                writeln!(out, "  Edge {edge} is on the boundary and has interval {interval}")?;
            } else if let Some(other) = model.edge_other(edge) {
                writeln!(
                    out,
                    "  Edge {edge} is adjacent to Elem {other} and has interval {interval}"
                )?;
            }
        }

        for piece in model.elem_pieces(elem) {
            print_piece(&piece, out)?;
        }
    }
    Ok(())
}

fn print_piece(piece: &PieceRef<'_>, out: &mut impl Write) -> io::Result<()> {
    let kind = if piece.is_tensor() { "tensor product" } else { "explicit" };
    let geometry = match piece.point() {
        Some(pt) => format!("({},{},{}/{})", pt.x, pt.y, pt.z, pt.w),
        None => "(missing)".to_string(),
    };
    writeln!(
        out,
        "  Piece {} is {kind}, order {}x{}, geometry {geometry} and has coeffs:",
        piece.index(),
        piece.s_order(),
        piece.t_order()
    )?;

    let join = |values: &[f64]| {
        values
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    };
    if piece.is_tensor() {
        writeln!(out, "    S: {}", join(piece.s_coeffs().unwrap_or_default()))?;
        writeln!(out, "    T: {}", join(piece.t_coeffs().unwrap_or_default()))?;
    } else if let Some(grid) = piece.explicit_coeffs() {
        // Top row first, so the grid reads the way the parameter space looks.
        let s_order = piece.s_order() as usize;
        for row in grid.chunks(s_order.max(1)).rev() {
            writeln!(out, "    {}", join(row))?;
        }
    }
    Ok(())
}
