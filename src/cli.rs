//! Command-line interface for sam-reheader.
//!
//! The binary sits in the middle of an alignment pipeline: the live SAM
//! stream arrives on stdin, the merged stream leaves on stdout, and
//! everything diagnostic goes to stderr.
//!
//! ## Usage
//!
//! ```text
//! # Re-apply a saved header to an aligner's output stream
//! minimap2 -a ref.mmi reads.fastq | sam-reheader saved_header.sam | samtools view -b -
//!
//! # Record this pipeline step's own provenance while merging
//! ... | sam-reheader saved_header.sam \
//!         --insert "$(printf '@PG\tID:my-step\tPN:my-tools\tVN:1.2')" | ...
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::merge::reheader_samstream;

#[derive(Parser)]
#[command(name = "sam-reheader")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Merge saved and streamed SAM headers in front of an untouched alignment stream")]
#[command(
    long_about = "sam-reheader merges a previously saved header with the header embedded in a live SAM stream.\n\nMetadata lines are de-duplicated and validated, colliding @PG identifiers are renamed with their provenance chain kept intact, and the alignment records that follow the header are relayed byte for byte; the stream is never buffered."
)]
pub struct Cli {
    /// Path to the saved template header; every line must be a parseable
    /// header record
    pub header: PathBuf,

    /// Literal header line to insert between the template and the stream's
    /// own header lines; repeatable, applied in the order given
    #[arg(long, value_name = "LINE")]
    pub insert: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Execute the merge against stdin/stdout.
///
/// # Errors
///
/// Returns an error if the template header cannot be opened or if any phase
/// of the merge fails.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let header_in = File::open(&cli.header)
        .map(BufReader::new)
        .with_context(|| format!("failed to open header file '{}'", cli.header.display()))?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    reheader_samstream(header_in, stdin.lock(), &mut out, &cli.insert)?;
    out.flush()?;
    Ok(())
}
