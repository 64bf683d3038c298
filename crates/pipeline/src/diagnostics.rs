//! Turns driver info logs into locations a human can act on.
//!
//! GL drivers report errors against the assembled buffer (often shifted by an
//! injected preamble whose length is driver-specific), in one of a few
//! vendor-flavored shapes. `parse_compile_log` extracts the first fatal
//! diagnostic; `resolve` maps its line number back through the offset table
//! to a fragment name and the literal source line. Both are best-effort by
//! contract: a log we cannot parse or a line outside the table degrades to an
//! unattributed report instead of an error, so diagnostics display can never
//! take the tool down.

use std::fmt;

use crate::device::StageKind;
use crate::source::AssembledSource;

/// Fragment name reported when a diagnostic cannot be attributed.
pub const UNKNOWN_FRAGMENT: &str = "<unknown>";

/// A compiler diagnostic as emitted by the driver: the line number uses
/// compiler-native counting over the assembled buffer (1-based, preamble
/// included). `reported_line` is `None` when the log did not match any known
/// `stage(line): message` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: StageKind,
    pub reported_line: Option<u32>,
    pub message: String,
}

/// A diagnostic mapped back to a human-meaningful location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDiagnostic {
    pub stage: StageKind,
    /// Line within the assembled buffer after preamble correction, when the
    /// reported number was parsable and the correction did not underflow.
    pub assembled_line: Option<u32>,
    pub fragment_name: String,
    pub line_text: String,
    pub message: String,
}

impl fmt::Display for ResolvedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.assembled_line {
            Some(line) if self.fragment_name != UNKNOWN_FRAGMENT => {
                write!(
                    f,
                    "{} shader {}:{}: {}",
                    self.stage, self.fragment_name, line, self.message
                )?;
                if !self.line_text.is_empty() {
                    write!(f, "\n    {}", self.line_text)?;
                }
                Ok(())
            }
            _ => write!(f, "{} shader: {}", self.stage, self.message),
        }
    }
}

/// Extracts the first fatal diagnostic from a compile info log.
///
/// Recognized line-reference shapes, tried against the first non-blank log
/// line:
///
/// - NVIDIA-style `0(42) : error C1008: ...`
/// - Mesa-style `0:42(7): error: ...`
/// - GLSL-ES style `ERROR: 0:42: ...`
///
/// Anything else keeps the raw log as the message with no line reference.
pub fn parse_compile_log(stage: StageKind, log: &str) -> Diagnostic {
    let first = log.lines().find(|line| !line.trim().is_empty());
    if let Some((line_no, message)) = first.and_then(parse_line_reference) {
        Diagnostic {
            stage,
            reported_line: Some(line_no),
            message: message.to_string(),
        }
    } else {
        Diagnostic {
            stage,
            reported_line: None,
            message: log.trim().to_string(),
        }
    }
}

fn parse_line_reference(line: &str) -> Option<(u32, &str)> {
    let line = line.trim_start();
    let line = line
        .strip_prefix("ERROR:")
        .or_else(|| line.strip_prefix("WARNING:"))
        .map(str::trim_start)
        .unwrap_or(line);

    let (_, rest) = take_number(line)?;
    match rest.as_bytes().first()? {
        // `0(42) : message`
        b'(' => {
            let close = rest.find(')')?;
            let line_no: u32 = rest[1..close].parse().ok()?;
            let message = rest[close + 1..].trim_start().strip_prefix(':')?;
            Some((line_no, message.trim()))
        }
        // `0:42(7): message` or `0:42: message`
        b':' => {
            let (line_no, mut rest) = take_number(&rest[1..])?;
            if rest.starts_with('(') {
                let close = rest.find(')')?;
                rest = &rest[close + 1..];
            }
            let message = rest.trim_start().strip_prefix(':')?;
            Some((line_no, message.trim()))
        }
        _ => None,
    }
}

fn take_number(s: &str) -> Option<(u32, &str)> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)?;
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Maps a diagnostic through the offset table: subtract the configured
/// preamble length, find the span whose line range contains the result, and
/// pull the literal line text for display. Out-of-range lines fall back to
/// [`UNKNOWN_FRAGMENT`] rather than failing.
pub fn resolve(
    diag: &Diagnostic,
    assembled: &AssembledSource,
    preamble_lines: u32,
) -> ResolvedDiagnostic {
    let logical_line = diag
        .reported_line
        .and_then(|reported| reported.checked_sub(preamble_lines))
        .filter(|line| *line > 0);

    let span = logical_line.and_then(|line| assembled.span_for_line(line));
    match (logical_line, span) {
        (Some(line), Some(span)) => ResolvedDiagnostic {
            stage: diag.stage,
            assembled_line: Some(line),
            fragment_name: span.name.clone(),
            line_text: assembled.line_text(line).unwrap_or_default().to_string(),
            message: diag.message.clone(),
        },
        _ => ResolvedDiagnostic {
            stage: diag.stage,
            assembled_line: logical_line,
            fragment_name: UNKNOWN_FRAGMENT.to_string(),
            line_text: String::new(),
            message: diag.message.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFragment;

    fn sample_source() -> AssembledSource {
        AssembledSource::from_fragments(vec![
            SourceFragment::new("a", "a\nb\n"),
            SourceFragment::new("b", "c\nd\ne\n"),
        ])
        .expect("assembly")
    }

    #[test]
    fn parses_nvidia_shape() {
        let diag = parse_compile_log(
            StageKind::Fragment,
            "0(42) : error C1008: undefined variable \"foo\"\n",
        );
        assert_eq!(diag.reported_line, Some(42));
        assert_eq!(diag.message, "error C1008: undefined variable \"foo\"");
    }

    #[test]
    fn parses_mesa_shape() {
        let diag = parse_compile_log(StageKind::Fragment, "0:17(12): error: `foo' undeclared\n");
        assert_eq!(diag.reported_line, Some(17));
        assert_eq!(diag.message, "error: `foo' undeclared");
    }

    #[test]
    fn parses_glsl_es_shape() {
        let diag = parse_compile_log(
            StageKind::Vertex,
            "ERROR: 0:9: 'position' : undeclared identifier\n",
        );
        assert_eq!(diag.reported_line, Some(9));
        assert_eq!(diag.message, "'position' : undeclared identifier");
    }

    #[test]
    fn unparsable_log_keeps_raw_message() {
        let diag = parse_compile_log(StageKind::Fragment, "internal compiler error\n");
        assert_eq!(diag.reported_line, None);
        assert_eq!(diag.message, "internal compiler error");
    }

    #[test]
    fn resolves_known_round_trip() {
        let source = sample_source();
        let diag = Diagnostic {
            stage: StageKind::Fragment,
            reported_line: Some(4),
            message: "syntax error".into(),
        };

        let resolved = resolve(&diag, &source, 0);
        assert_eq!(resolved.fragment_name, "b");
        assert_eq!(resolved.assembled_line, Some(4));
        assert_eq!(resolved.line_text, "d");
    }

    #[test]
    fn preamble_offset_shifts_attribution() {
        let source = sample_source();
        let diag = Diagnostic {
            stage: StageKind::Fragment,
            reported_line: Some(16),
            message: "syntax error".into(),
        };

        let resolved = resolve(&diag, &source, 12);
        assert_eq!(resolved.fragment_name, "b");
        assert_eq!(resolved.assembled_line, Some(4));
        assert_eq!(resolved.line_text, "d");
    }

    #[test]
    fn out_of_range_line_degrades_to_unknown() {
        let source = sample_source();
        let diag = Diagnostic {
            stage: StageKind::Fragment,
            reported_line: Some(40),
            message: "syntax error".into(),
        };

        let resolved = resolve(&diag, &source, 0);
        assert_eq!(resolved.fragment_name, UNKNOWN_FRAGMENT);
        assert_eq!(resolved.line_text, "");
        assert_eq!(resolved.assembled_line, Some(40));
    }

    #[test]
    fn preamble_underflow_degrades_to_unknown() {
        let source = sample_source();
        let diag = Diagnostic {
            stage: StageKind::Fragment,
            reported_line: Some(3),
            message: "syntax error".into(),
        };

        let resolved = resolve(&diag, &source, 12);
        assert_eq!(resolved.fragment_name, UNKNOWN_FRAGMENT);
        assert_eq!(resolved.assembled_line, None);
    }

    #[test]
    fn unattributed_display_uses_raw_message() {
        let resolved = resolve(
            &Diagnostic {
                stage: StageKind::Fragment,
                reported_line: None,
                message: "internal error".into(),
            },
            &sample_source(),
            0,
        );
        assert_eq!(resolved.to_string(), "fragment shader: internal error");
    }

    #[test]
    fn attributed_display_includes_line_text() {
        let source = sample_source();
        let diag = Diagnostic {
            stage: StageKind::Fragment,
            reported_line: Some(4),
            message: "syntax error".into(),
        };

        let rendered = resolve(&diag, &source, 0).to_string();
        assert_eq!(rendered, "fragment shader b:4: syntax error\n    d");
    }
}
