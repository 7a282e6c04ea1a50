//! Phase-ordered merge of header sources in front of a streaming payload.
//!
//! Three header sources feed one [`SamHeader`], strictly in this order:
//!
//! 1. **Template**: every line of the saved header file;
//! 2. **Insertions**: synthetic lines from repeated `--insert` options;
//! 3. **Live header**: leading `@` lines of the incoming stream.
//!
//! The first stream line that does not start with `@` is the header/payload
//! boundary. The merged header is serialized exactly once, only after the
//! boundary (or end of stream) is known; then the boundary line and every
//! remaining byte are relayed untouched. The payload is never
//! materialized: memory is bounded by header size alone, while the payload
//! can be arbitrarily large.
//!
//! Any error before serialization aborts the run with no output written.

use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::debug;

use crate::header::{HeaderError, SamHeader};

#[derive(Error, Debug)]
pub enum MergeError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Merge the template header, synthetic insertions, and the stream's own
/// header, then relay the stream's payload verbatim.
///
/// Header lines are consumed with their line terminators stripped and
/// re-emitted canonically; payload bytes are copied as-is, including a
/// missing final newline.
///
/// # Errors
///
/// Returns `MergeError::Header` for any unparseable or conflicting header
/// line from any source, and `MergeError::Io` for reader/writer failures or
/// a non-UTF-8 header line.
pub fn reheader_samstream<R, S, W>(
    header_in: R,
    mut stream_in: S,
    mut out: W,
    inserts: &[String],
) -> Result<(), MergeError>
where
    R: BufRead,
    S: BufRead,
    W: Write,
{
    let mut header = SamHeader::new();

    // Template phase: the saved header, line by line, until exhaustion.
    let mut template_lines = 0usize;
    for line in header_in.lines() {
        header.add_line(&line?)?;
        template_lines += 1;
    }
    debug!(lines = template_lines, "template header consumed");

    // Insertion phase: synthetic records, in the order given.
    for line in inserts {
        header.add_line(line)?;
    }
    if !inserts.is_empty() {
        debug!(lines = inserts.len(), "synthetic records inserted");
    }

    // Live-header phase: leading '@' lines belong to the header. The first
    // line that does not is the boundary; it is payload, not parsed.
    let mut stream_lines = 0usize;
    let mut buf = Vec::new();
    let boundary = loop {
        buf.clear();
        let n = stream_in.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break None;
        }
        if buf.first() != Some(&b'@') {
            break Some(std::mem::take(&mut buf));
        }
        header.add_line(text_line(&buf)?)?;
        stream_lines += 1;
    };
    debug!(lines = stream_lines, "live stream header consumed");

    // Serialization + passthrough: exactly one header write, then bytes.
    header.write_header(&mut out)?;
    if let Some(line) = boundary {
        out.write_all(&line)?;
        io::copy(&mut stream_in, &mut out)?;
    }
    Ok(())
}

/// Borrow a raw header line as text with its terminator stripped.
fn text_line(raw: &[u8]) -> io::Result<&str> {
    let line = std::str::from_utf8(raw).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "header line is not valid UTF-8")
    })?;
    Ok(line.trim_end_matches('\n').trim_end_matches('\r'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(template: &str, stream: &[u8], inserts: &[&str]) -> Result<Vec<u8>, MergeError> {
        let inserts: Vec<String> = inserts.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        reheader_samstream(
            Cursor::new(template.as_bytes().to_vec()),
            Cursor::new(stream.to_vec()),
            &mut out,
            &inserts,
        )?;
        Ok(out)
    }

    #[test]
    fn test_e2e_blank() {
        let out = run("", b"", &[]).unwrap();
        assert_eq!(out, b"@HD\tVN:1.6\tSO:unknown\n");
    }

    #[test]
    fn test_e2e_header_with_no_alignments() {
        let out = run("@RG\tID:hoot\n", b"@PG\tID:hoot\n", &[]).unwrap();
        assert_eq!(
            out,
            b"@HD\tVN:1.6\tSO:unknown\n\
              @RG\tID:hoot\n\
              @PG\tID:hoot\n"
        );
    }

    #[test]
    fn test_e2e_stream_hd_and_sq_take_over() {
        let out = run(
            "@RG\tID:hoot\n",
            b"@HD\tVN:1.6\tSO:sorted\n@SQ\tSN:my-seq\tLN:8000\n",
            &[],
        )
        .unwrap();
        assert_eq!(
            out,
            b"@HD\tVN:1.6\tSO:sorted\n\
              @SQ\tSN:my-seq\tLN:8000\n\
              @RG\tID:hoot\n"
        );
    }

    #[test]
    fn test_e2e() {
        let stream = "@HD\tVN:1.6\tSO:hooted\n\
                      @SQ\tSN:this-should-appear\tLN:1000\n\
                      @SQ\tSN:this-should-also-appear\tLN:5000\n\
                      @PG\tID:my_program\n\
                      @PG\tID:my_other_program\n\
                      READ1\nREAD2\nREAD3\nREAD4\n";
        let out = run(
            "@RG\tID:my_reads\n@SQ\tSN:this-should-not-appear\tLN:100\n",
            stream.as_bytes(),
            &[
                "@PG\tID:inserted_rg\tPN:hoot-tools\tVN:8",
                "@PG\tID:inserted_rg2\tPN:hoot-tools-again\tVN:2",
            ],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "@HD\tVN:1.6\tSO:hooted\n\
             @SQ\tSN:this-should-appear\tLN:1000\n\
             @SQ\tSN:this-should-also-appear\tLN:5000\n\
             @RG\tID:my_reads\n\
             @PG\tID:inserted_rg\tPN:hoot-tools\tVN:8\n\
             @PG\tID:inserted_rg2\tPN:hoot-tools-again\tVN:2\tPP:inserted_rg\n\
             @PG\tID:my_program\tPP:inserted_rg2\n\
             @PG\tID:my_other_program\tPP:my_program\n\
             READ1\nREAD2\nREAD3\nREAD4\n"
        );
    }

    #[test]
    fn test_e2e_no_hd_like_minimap2() {
        let stream = "@SQ\tSN:this-should-appear\tLN:1000\n\
                      @SQ\tSN:this-should-also-appear\tLN:5000\n\
                      @PG\tID:my_program\n\
                      @PG\tID:my_other_program\n\
                      READ1\nREAD2\nREAD3\nREAD4\n";
        let out = run(
            "@RG\tID:my_reads\n@SQ\tSN:this-should-not-appear\tLN:100\n",
            stream.as_bytes(),
            &[
                "@PG\tID:inserted_rg\tPN:hoot-tools\tVN:8",
                "@PG\tID:inserted_rg2\tPN:hoot-tools-again\tVN:2",
            ],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "@HD\tVN:1.6\tSO:unknown\n\
             @SQ\tSN:this-should-appear\tLN:1000\n\
             @SQ\tSN:this-should-also-appear\tLN:5000\n\
             @RG\tID:my_reads\n\
             @PG\tID:inserted_rg\tPN:hoot-tools\tVN:8\n\
             @PG\tID:inserted_rg2\tPN:hoot-tools-again\tVN:2\tPP:inserted_rg\n\
             @PG\tID:my_program\tPP:inserted_rg2\n\
             @PG\tID:my_other_program\tPP:my_program\n\
             READ1\nREAD2\nREAD3\nREAD4\n"
        );
    }

    #[test]
    fn test_e2e_bad_insert() {
        let err = run(
            "@RG\tID:my_reads\n",
            b"READ1\n",
            &["@PG\\tID:inserted_rg\\tPN:hoot-tools\\tVN:8"],
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Record type could not be determined"));
    }

    #[test]
    fn test_bad_template_line_aborts_without_output() {
        let err = run("not a header line\n", b"READ1\n", &[]).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Record type could not be determined"));
    }

    #[test]
    fn test_payload_passes_through_byte_exact() {
        // Non-UTF-8 payload bytes and a missing final newline both survive.
        let mut stream = b"@SQ\tSN:chr1\tLN:1000\n".to_vec();
        stream.extend_from_slice(b"READ\t\xff\xfe\x00raw\nLAST-NO-NEWLINE");
        let out = run("", &stream, &[]).unwrap();
        let mut expected = b"@HD\tVN:1.6\tSO:unknown\n@SQ\tSN:chr1\tLN:1000\n".to_vec();
        expected.extend_from_slice(b"READ\t\xff\xfe\x00raw\nLAST-NO-NEWLINE");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_crlf_header_lines_are_normalized() {
        let out = run("", b"@SQ\tSN:chr1\tLN:1000\r\nREAD1\n", &[]).unwrap();
        assert_eq!(
            out,
            b"@HD\tVN:1.6\tSO:unknown\n@SQ\tSN:chr1\tLN:1000\nREAD1\n"
        );
    }

    #[test]
    fn test_blank_line_starts_payload() {
        let out = run("", b"@SQ\tSN:chr1\tLN:1000\n\nREAD1\n", &[]).unwrap();
        assert_eq!(
            out,
            b"@HD\tVN:1.6\tSO:unknown\n@SQ\tSN:chr1\tLN:1000\n\nREAD1\n"
        );
    }
}
