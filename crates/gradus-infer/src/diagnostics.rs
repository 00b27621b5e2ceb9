//! Ariadne-based rendering for constraint violations.
//!
//! A violation carries two provenances: the bound whose insertion failed
//! and the bound it was checked against. Both are labeled when they point
//! into the source. Output is colorless for consistent snapshots.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::error::{BoundOrigin, ConstraintViolation};

/// Convert a rowan TextRange to a Rust Range<usize> for ariadne.
fn text_range_to_range(range: rowan::TextRange) -> Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();
    start..end
}

fn origin_span(origin: &BoundOrigin) -> Option<Range<usize>> {
    origin.span().map(text_range_to_range)
}

/// Render a constraint violation as a labeled diagnostic.
pub fn render_violation(violation: &ConstraintViolation, source: &str, filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp a range to be valid within source bounds.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let msg = format!(
        "{} is not a subtype of {} (variable ?{})",
        violation.lower, violation.upper, violation.var.0
    );
    let primary = origin_span(&violation.origin)
        .or_else(|| origin_span(&violation.conflicting))
        .unwrap_or(0..0);
    let primary = clamp(primary);

    let mut builder = Report::build(ReportKind::Error, primary.clone())
        .with_message(&msg)
        .with_config(config);

    if let Some(span) = origin_span(&violation.origin) {
        builder.add_label(
            Label::new(clamp(span))
                .with_message(format!("{} introduced here", violation.origin))
                .with_color(Color::Red),
        );
    }
    if let Some(span) = origin_span(&violation.conflicting) {
        builder.add_label(
            Label::new(clamp(span))
                .with_message(format!("conflicts with the {} here", violation.conflicting))
                .with_color(Color::Blue),
        );
    }
    builder.set_note(format!("in {}", filename));

    let report = builder.finish();
    let mut buf = Vec::new();
    if let Err(e) = report.write(Source::from(source), &mut buf) {
        return format!("error: {} ({})", msg, e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
