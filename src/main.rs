use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser};

use docx_roundtrip::docx::extract::{
    default_segments_output_for, extract_docx_segments, save_segments_json,
};
use docx_roundtrip::error::DocxError;
use docx_roundtrip::progress::ConsoleProgress;
use docx_roundtrip::segment::Segment;

#[derive(Parser, Debug)]
#[command(name = "docx-roundtrip")]
#[command(about = "Extract translatable DOCX paragraphs into addressable JSON segments", long_about = None)]
struct Args {
    /// Input .docx
    #[arg(value_name = "DOCX")]
    input: Option<PathBuf>,

    /// Output segments JSON (default: <input_stem>_segments.json)
    #[arg(short, long, value_name = "JSON", conflicts_with = "samples_dir")]
    output: Option<PathBuf>,

    /// Process every .docx in a directory, writing one JSON per file
    #[arg(long, value_name = "DIR", conflicts_with = "input")]
    samples_dir: Option<PathBuf>,

    /// Suppress progress output on stderr
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if let Some(dir) = args.samples_dir {
        return run_batch(&dir, &progress);
    }

    let input = match args.input {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            return Ok(());
        }
    };
    let output = args
        .output
        .unwrap_or_else(|| default_segments_output_for(&input));

    let segments =
        extract_docx_segments(&input).with_context(|| format!("extract: {}", input.display()))?;
    save_segments_json(&segments, &output)?;
    progress.info(format!(
        "{}: {} segments -> {}",
        input.display(),
        segments.len(),
        output.display()
    ));
    preview(&progress, &segments);
    Ok(())
}

/// Batch driver. Each document is independent: one file's failure is
/// reported and skipped, siblings keep processing.
fn run_batch(dir: &Path, progress: &ConsoleProgress) -> anyhow::Result<()> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("list samples dir: {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("docx"))
        .collect();
    files.sort();

    if files.is_empty() {
        progress.info(format!("no .docx files found in {}", dir.display()));
        return Ok(());
    }

    let mut failed = 0usize;
    for (i, path) in files.iter().enumerate() {
        progress.progress("extract", i + 1, files.len());
        match extract_docx_segments(path) {
            Ok(segments) => {
                // A failed output write is skipped the same way a failed
                // extraction is; siblings keep processing either way.
                let output = default_segments_output_for(path);
                match save_segments_json(&segments, &output) {
                    Ok(()) => {
                        progress.info(format!(
                            "{}: {} segments -> {}",
                            path.display(),
                            segments.len(),
                            output.display()
                        ));
                        preview(progress, &segments);
                    }
                    Err(err) => {
                        failed += 1;
                        progress.info(format!("{}: {err:#} (skipped)", path.display()));
                    }
                }
            }
            Err(err) => {
                failed += 1;
                progress.info(format!("{}: {}", path.display(), skip_reason(&err)));
            }
        }
    }
    if failed > 0 {
        progress.info(format!(
            "{failed} of {} file(s) failed; the rest were written",
            files.len()
        ));
    }
    Ok(())
}

fn skip_reason(err: &DocxError) -> String {
    match err {
        DocxError::ArchiveCorrupt(_) => {
            format!("{err} (not a readable zip container; skipped)")
        }
        DocxError::EntryNotFound(_) => {
            format!("{err} (not a WordprocessingML package; skipped)")
        }
        DocxError::MalformedMarkup(_) => {
            format!("{err} (document markup is damaged; skipped)")
        }
    }
}

fn preview(progress: &ConsoleProgress, segments: &[Segment]) {
    for seg in segments.iter().take(3) {
        let excerpt: String = seg.source.chars().take(80).collect();
        progress.info(format!("  {}: {excerpt}", seg.id));
    }
    if segments.len() > 3 {
        progress.info(format!("  ... and {} more", segments.len() - 3));
    }
}
