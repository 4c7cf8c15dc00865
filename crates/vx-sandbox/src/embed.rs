//! Document envelope around sandboxed code.
//!
//! Code is embedded in a `<script>` element before it crosses into the
//! worker. Any `</script` inside the code would close the element early, so
//! each occurrence (case-insensitive) is rewritten to `<\/script`. The script
//! lexer reads `\/` as `/`, which keeps string literals intact.

const OPEN: &str = "<script>";
const CLOSE: &str = "</script>";
const NEEDLE: &str = "</script";

/// Escape `code` and wrap it in the envelope.
pub fn wrap(code: &str) -> String {
    let mut out = String::with_capacity(code.len() + OPEN.len() + CLOSE.len() + 8);
    out.push_str("<!doctype html><html><body>");
    out.push_str(OPEN);
    out.push_str(&escape(code));
    out.push_str(CLOSE);
    out.push_str("</body></html>");
    out
}

/// Neutralize every case-insensitive `</script`.
pub fn escape(code: &str) -> String {
    let lower = code.to_ascii_lowercase();
    let mut out = String::with_capacity(code.len());
    let mut last = 0;
    for (idx, _) in lower.match_indices(NEEDLE) {
        out.push_str(&code[last..idx]);
        // Keep the original casing of "script".
        out.push_str("<\\/");
        out.push_str(&code[idx + 2..idx + NEEDLE.len()]);
        last = idx + NEEDLE.len();
    }
    out.push_str(&code[last..]);
    out
}

/// Extract the script body from a document produced by [`wrap`].
pub fn unwrap(document: &str) -> Option<&str> {
    let start = document.find(OPEN)? + OPEN.len();
    let end = document[start..].find(CLOSE)? + start;
    Some(&document[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_plain_code() {
        let code = "console.log('hi')";
        assert_eq!(unwrap(&wrap(code)), Some(code));
    }

    #[test]
    fn closing_tag_neutralized_any_case() {
        let code = "let s = '</script>'; let t = '</SCRIPT>'; let u = '</ScRiPt'";
        let escaped = escape(code);
        assert_eq!(
            escaped,
            r"let s = '<\/script>'; let t = '<\/SCRIPT>'; let u = '<\/ScRiPt'"
        );
        // The body survives the envelope intact.
        assert_eq!(unwrap(&wrap(code)), Some(escaped.as_str()));
    }

    #[test]
    fn unwrap_rejects_foreign_documents() {
        assert_eq!(unwrap("<html></html>"), None);
    }

    #[test]
    fn non_ascii_preserved() {
        let code = "console.log('héllo </script> ✓')";
        assert_eq!(escape(code), r"console.log('héllo <\/script> ✓')");
    }

    mod prop {
        use proptest::prelude::*;

        use super::super::*;

        proptest! {
            #[test]
            fn escaped_code_never_closes_the_element(code in ".{0,64}(</[sS][cC][rR][iI][pP][tT]>)?.{0,16}") {
                let escaped = escape(&code);
                prop_assert!(!escaped.to_ascii_lowercase().contains("</script"));
                let doc = wrap(&code);
                prop_assert_eq!(unwrap(&doc), Some(escaped.as_str()));
            }
        }
    }
}
