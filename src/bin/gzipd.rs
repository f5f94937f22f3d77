use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rdeflate::{gzip_compress, gzip_compress_bound, gzip_decompress};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(
    name = "gzip",
    about = "compress or decompress files in the gzip format"
)]
struct GzipParams {
    /// Compress fastest.
    #[structopt(short = "1")]
    level_1: bool,
    #[structopt(short = "2")]
    level_2: bool,
    #[structopt(short = "3")]
    level_3: bool,
    #[structopt(short = "4")]
    level_4: bool,
    #[structopt(short = "5")]
    level_5: bool,
    #[structopt(short = "6")]
    level_6: bool,
    #[structopt(short = "7")]
    level_7: bool,
    #[structopt(short = "8")]
    level_8: bool,
    /// Compress best.
    #[structopt(short = "9")]
    level_9: bool,

    /// Write output to stdout; keep original files unchanged.
    #[structopt(short = "c", long = "stdout")]
    stdout: bool,

    /// Decompress instead of compress.
    #[structopt(short = "d", long = "decompress")]
    decompress: bool,

    /// Force overwrite of output files and compression of linked/terminal files.
    #[structopt(short = "f", long = "force")]
    force: bool,

    /// Keep (don't delete) input files.
    #[structopt(short = "k", long = "keep")]
    keep: bool,

    /// Don't save or restore the original file name. Accepted for
    /// compatibility; the library never embeds FNAME, so this has no
    /// effect on the bytes written.
    #[structopt(short = "n", long = "no-name")]
    #[allow(dead_code)]
    no_name: bool,

    /// Suppress warnings.
    #[structopt(short = "q", long = "quiet")]
    quiet: bool,

    /// Use the given suffix on compressed files, instead of `.gz`.
    #[structopt(short = "S", long = "suffix", default_value = ".gz")]
    suffix: String,

    /// Test compressed file integrity; writes nothing.
    #[structopt(short = "t", long = "test")]
    test: bool,

    #[structopt(parse(from_os_str))]
    files: Vec<PathBuf>,
}

/// Exit code policy: 0 clean, 1 hard error, 2 warnings only (gzip-compatible).
struct RunReport {
    had_error: bool,
    had_warning: bool,
}

impl RunReport {
    fn exit_code(&self) -> ExitCode {
        if self.had_error {
            ExitCode::from(1)
        } else if self.had_warning {
            ExitCode::from(2)
        } else {
            ExitCode::SUCCESS
        }
    }
}

fn level_from_flags(p: &GzipParams) -> u32 {
    // highest requested level wins, matching gzip's last-flag-wins behavior
    // for conflicting -N options closely enough for CLI purposes.
    let flags = [
        (9, p.level_9),
        (8, p.level_8),
        (7, p.level_7),
        (6, p.level_6),
        (5, p.level_5),
        (4, p.level_4),
        (3, p.level_3),
        (2, p.level_2),
        (1, p.level_1),
    ];
    flags
        .iter()
        .find(|(_, set)| *set)
        .map(|(level, _)| *level)
        .unwrap_or(6)
}

fn invoked_as_gunzip() -> bool {
    std::env::args()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_stem()
                .map(|s| s.to_string_lossy().contains("gunzip"))
        })
        .unwrap_or(false)
}

fn compress_file(
    input_path: &Path,
    params: &GzipParams,
    report: &mut RunReport,
) -> io::Result<()> {
    let mut data = Vec::new();
    File::open(input_path)?.read_to_end(&mut data)?;

    let level = level_from_flags(params);
    let bound = gzip_compress_bound(level, data.len());
    let mut out = vec![0u8; bound];
    let n = gzip_compress(level, &data, &mut out)
        .expect("gzip_compress_bound must cover its own output");
    out.truncate(n);

    if params.stdout {
        io::stdout().write_all(&out)?;
        return Ok(());
    }

    let output_path = input_path.with_extension(format!(
        "{}{}",
        input_path
            .extension()
            .map(|e| format!("{}.", e.to_string_lossy()))
            .unwrap_or_default(),
        params.suffix.trim_start_matches('.')
    ));

    if output_path.exists() && !params.force {
        if !params.quiet {
            eprintln!(
                "gzip: {} already exists; not overwritten (use -f to force)",
                output_path.display()
            );
        }
        report.had_warning = true;
        return Ok(());
    }

    write_with_metadata(input_path, &output_path, &out)?;

    if !params.keep {
        std::fs::remove_file(input_path)?;
    }

    Ok(())
}

fn decompress_file(
    input_path: &Path,
    params: &GzipParams,
    report: &mut RunReport,
) -> io::Result<()> {
    let mut data = Vec::new();
    File::open(input_path)?.read_to_end(&mut data)?;

    // Decompressed size is not known up front; grow the output buffer
    // until it's large enough, mirroring the original library's
    // grow-and-retry pattern for `INSUFFICIENT_SPACE`.
    let mut out = vec![0u8; data.len().max(4096) * 4];
    let written = loop {
        match gzip_decompress(&data, &mut out) {
            Ok(n) => break n,
            Err(rdeflate::LibdeflateError::InsufficientSpace) => {
                out.resize(out.len() * 2, 0);
            }
            Err(e) => {
                if !params.quiet {
                    eprintln!("gzip: {}: {}", input_path.display(), e);
                }
                report.had_error = true;
                return Ok(());
            }
        }
    };
    out.truncate(written);

    if params.test {
        return Ok(());
    }

    if params.stdout {
        io::stdout().write_all(&out)?;
        return Ok(());
    }

    let suffix = params.suffix.as_str();
    let name = input_path.to_string_lossy();
    if !name.ends_with(suffix) {
        if !params.quiet {
            eprintln!(
                "gzip: {}: unknown suffix -- ignored",
                input_path.display()
            );
        }
        report.had_warning = true;
        return Ok(());
    }
    let output_path = PathBuf::from(&name[..name.len() - suffix.len()]);

    if output_path.exists() && !params.force {
        if !params.quiet {
            eprintln!(
                "gzip: {} already exists; not overwritten (use -f to force)",
                output_path.display()
            );
        }
        report.had_warning = true;
        return Ok(());
    }

    write_with_metadata(input_path, &output_path, &out)?;

    if !params.keep {
        std::fs::remove_file(input_path)?;
    }

    Ok(())
}

/// Write `data` to `output_path`, then restore `input_path`'s mode and
/// modification time where the platform supports it.
fn write_with_metadata(input_path: &Path, output_path: &Path, data: &[u8]) -> io::Result<()> {
    {
        let mut writer = BufWriter::new(File::create(output_path)?);
        writer.write_all(data)?;
    }

    let source_metadata = std::fs::metadata(input_path)?;
    let output_file = File::options().write(true).open(output_path)?;

    #[cfg(unix)]
    {
        let _ = output_file.set_permissions(source_metadata.permissions());
    }

    if let Ok(modified) = source_metadata.modified() {
        let _ = output_file.set_modified(modified);
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let params: GzipParams = GzipParams::from_args();
    let decompress_mode = params.decompress || params.test || invoked_as_gunzip();

    let mut report = RunReport {
        had_error: false,
        had_warning: false,
    };

    if params.files.is_empty() {
        let mut data = Vec::new();
        if io::stdin().read_to_end(&mut data).is_err() {
            return ExitCode::from(1);
        }
        let result = if decompress_mode {
            let mut out = vec![0u8; data.len().max(4096) * 4];
            gzip_decompress(&data, &mut out).map(|n| {
                out.truncate(n);
                out
            })
        } else {
            let level = level_from_flags(&params);
            let mut out = vec![0u8; gzip_compress_bound(level, data.len())];
            gzip_compress(level, &data, &mut out)
                .map(|n| {
                    out.truncate(n);
                    out
                })
                .ok_or(rdeflate::LibdeflateError::InsufficientSpace)
        };
        match result {
            Ok(out) => {
                if io::stdout().write_all(&out).is_err() {
                    return ExitCode::from(1);
                }
            }
            Err(e) => {
                eprintln!("gzip: stdin: {e}");
                return ExitCode::from(1);
            }
        }
        return report.exit_code();
    }

    for file in &params.files {
        let result = if decompress_mode {
            decompress_file(file, &params, &mut report)
        } else {
            compress_file(file, &params, &mut report)
        };

        if let Err(e) = result {
            if !params.quiet {
                eprintln!("gzip: {}: {}", file.display(), e);
            }
            report.had_error = true;
        }
    }

    report.exit_code()
}
