//! Syntax diagnostics from the Crystal parser.

use liger_core::{Diagnostic, Diagnostics};
use liger_syntax::{Item, Program};

/// Diagnostics configuration derived from the server config.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsConfig {
    /// Warn about public methods without an explicit return type.
    pub strict: bool,
}

/// Compute diagnostics for a document.
///
/// A failed parse yields exactly one error diagnostic positioned at the
/// parser's 1-based location converted to 0-based coordinates; errors
/// without a real position are reported at the document start with a
/// `Parse error: ` prefix.
pub fn compute_diagnostics(
    text: &str,
    ast: Option<&Program>,
    config: &DiagnosticsConfig,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    match ast {
        Some(program) => {
            if config.strict {
                strict_warnings(program, &mut diagnostics);
            }
        }
        None => match liger_syntax::parse(text) {
            Ok(_) => {}
            Err(error) => {
                let diagnostic = if error.line() >= 1 && error.column() >= 1 {
                    Diagnostic::point_error(
                        error.message.clone(),
                        error.line() - 1,
                        error.column() - 1,
                    )
                } else {
                    Diagnostic::point_error(format!("Parse error: {}", error.message), 0, 0)
                };
                diagnostics.push(diagnostic.with_source("crystal"));
            }
        },
    }

    diagnostics
}

/// Strict-mode advisories: public methods ought to declare return types.
fn strict_warnings(program: &Program, diagnostics: &mut Diagnostics) {
    for item in program.walk() {
        if let Item::Method(method) = item {
            let exempt = method.is_private
                || method.is_abstract
                || method.return_type.is_some()
                || method.name == "initialize"
                || method.name.ends_with('=');
            if exempt {
                continue;
            }
            let span = method.name_span;
            if span.line >= 1 && span.column >= 1 {
                diagnostics.push(
                    liger_core::Diagnostic::warning(
                        format!("method `{}` has no explicit return type", method.name),
                        liger_core::Range::on_line(
                            span.line - 1,
                            span.column - 1,
                            span.column - 1 + method.name.chars().count() as u32,
                        ),
                    )
                    .with_source("crystal"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liger_core::Severity;

    fn diagnose(text: &str) -> Diagnostics {
        let ast = liger_syntax::parse(text).ok();
        compute_diagnostics(text, ast.as_ref(), &DiagnosticsConfig::default())
    }

    #[test]
    fn test_valid_source_has_no_diagnostics() {
        let diags = diagnose("class A\n  def run\n  end\nend\n");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_empty_document_has_no_diagnostics() {
        assert!(diagnose("").is_empty());
    }

    #[test]
    fn test_missing_end_is_one_error() {
        let diags = diagnose("class A\n  def run\n");
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.source.as_deref(), Some("crystal"));
        // `def` opens on line 2 (1-based), reported 0-based
        assert_eq!(diag.range.start.line, 1);
        assert_eq!(diag.range.start.character, 2);
        assert_eq!(diag.range.end.character, 3);
    }

    #[test]
    fn test_unexpected_end_position() {
        let diags = diagnose("x = 1\nend\n");
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.range.start.line, 1);
        assert_eq!(diag.range.start.character, 0);
    }

    #[test]
    fn test_strict_mode_flags_untyped_public_method() {
        let text = "class A\n  def untyped\n  end\n  def typed : Int32\n  end\n  private def hidden\n  end\nend\n";
        let ast = liger_syntax::parse(text).unwrap();
        let diags = compute_diagnostics(text, Some(&ast), &DiagnosticsConfig { strict: true });
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.severity, Severity::Warning);
        assert!(diag.message.contains("untyped"));
    }
}
