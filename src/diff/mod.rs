//! Unified diff synthesis for text pairs.
//!
//! Output follows the classic unified format:
//!
//! ```text
//! --- name_a
//! +++ name_b
//! @@ -1,4 +1,5 @@
//!  context
//! -removed
//! +added
//! ```
//!
//! Identical inputs produce an empty string. A final line without a
//! terminator is followed by the `\ No newline at end of file` marker so the
//! result stays applicable with `patch`.

mod matcher;

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use matcher::{OpCode, OpTag, SequenceMatcher};

/// Unchanged lines kept around each change.
pub const DEFAULT_CONTEXT: usize = 3;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "a",
            Self::B => "b",
        })
    }
}

#[derive(Debug, Error)]
pub enum DiffError {
    /// Refusal, not a computation limit: NUL-carrying content is treated as
    /// binary and never stored with a line diff.
    #[error("side {side} (`{name}`) contains NUL bytes and is not line-oriented text")]
    BinaryContent { side: Side, name: String },

    #[error(
        "hunk range -{a_start},{a_end} +{b_start},{b_end} exceeds input lengths {len_a}/{len_b}"
    )]
    InvalidRange {
        a_start: usize,
        a_end: usize,
        b_start: usize,
        b_end: usize,
        len_a: usize,
        len_b: usize,
    },

    #[error("failed to render diff: {0}")]
    Render(#[from] fmt::Error),
}

/// Splits `text` into lines, each keeping its `\n` terminator.
///
/// Concatenating the result reproduces `text` exactly. An empty string has
/// no lines.
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Unified diff from `content_a` to `content_b` with the default context.
pub fn unified_diff(
    name_a: &str,
    name_b: &str,
    content_a: &str,
    content_b: &str,
) -> Result<String, DiffError> {
    unified_diff_with_context(name_a, name_b, content_a, content_b, DEFAULT_CONTEXT)
}

pub fn unified_diff_with_context(
    name_a: &str,
    name_b: &str,
    content_a: &str,
    content_b: &str,
    context: usize,
) -> Result<String, DiffError> {
    reject_binary(Side::A, name_a, content_a)?;
    reject_binary(Side::B, name_b, content_b)?;

    let lines_a = split_lines(content_a);
    let lines_b = split_lines(content_b);
    let groups = SequenceMatcher::new(&lines_a, &lines_b).grouped_opcodes(context);
    if groups.is_empty() {
        return Ok(String::new());
    }

    let mut out = String::with_capacity(content_a.len() + content_b.len());
    writeln!(out, "--- {name_a}")?;
    writeln!(out, "+++ {name_b}")?;
    for group in &groups {
        write_hunk(&mut out, group, &lines_a, &lines_b)?;
    }
    Ok(out)
}

fn reject_binary(side: Side, name: &str, content: &str) -> Result<(), DiffError> {
    if content.contains('\0') {
        return Err(DiffError::BinaryContent {
            side,
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn write_hunk(
    out: &mut String,
    group: &[OpCode],
    lines_a: &[&str],
    lines_b: &[&str],
) -> Result<(), DiffError> {
    let (Some(first), Some(last)) = (group.first(), group.last()) else {
        return Ok(());
    };
    for code in group {
        check_range(code, lines_a.len(), lines_b.len())?;
    }

    writeln!(
        out,
        "@@ -{} +{} @@",
        format_range(first.a_start, last.a_end),
        format_range(first.b_start, last.b_end)
    )?;

    for code in group {
        match code.tag {
            OpTag::Equal => write_lines(out, ' ', &lines_a[code.a_start..code.a_end])?,
            OpTag::Delete => write_lines(out, '-', &lines_a[code.a_start..code.a_end])?,
            OpTag::Insert => write_lines(out, '+', &lines_b[code.b_start..code.b_end])?,
            OpTag::Replace => {
                write_lines(out, '-', &lines_a[code.a_start..code.a_end])?;
                write_lines(out, '+', &lines_b[code.b_start..code.b_end])?;
            }
        }
    }
    Ok(())
}

fn check_range(code: &OpCode, len_a: usize, len_b: usize) -> Result<(), DiffError> {
    if code.a_start > code.a_end || code.a_end > len_a || code.b_start > code.b_end || code.b_end > len_b
    {
        return Err(DiffError::InvalidRange {
            a_start: code.a_start,
            a_end: code.a_end,
            b_start: code.b_start,
            b_end: code.b_end,
            len_a,
            len_b,
        });
    }
    Ok(())
}

fn write_lines(out: &mut String, prefix: char, lines: &[&str]) -> fmt::Result {
    for line in lines {
        out.push(prefix);
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push('\n');
            out.push_str(NO_NEWLINE_MARKER);
        }
    }
    Ok(())
}

/// Hunk range as `start,len`, with `len` omitted when it is 1 and `start`
/// pointing at the preceding line when the range is empty.
fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    match length {
        1 => format!("{}", start + 1),
        0 => format!("{start},0"),
        _ => format!("{},{length}", start + 1),
    }
}
