//! Rejection paths: malformed components, parse failures and escaping.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::compiler::CompileOptions;
    use crate::error::*;
    use crate::compile;

    fn reject(source: &str) -> CompilerError {
        compile(
            source,
            &CompileOptions {
                file: "bad.html".to_string(),
                ..CompileOptions::default()
            },
        )
        .unwrap_err()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // COMPONENT STRUCTURE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_nested_component() {
        let err = reject("<component name=\"a\">\n  <div>\n    <component name=\"b\"></component>\n  </div>\n</component>");
        assert_eq!(err.code, COMPONENT_NESTED);
        assert_eq!((err.line, err.column), (3, 5));
        assert_eq!(err.file, "bad.html");
    }

    #[test]
    fn test_style_rules() {
        let err = reject("<component name=\"a\"><style>a{}</style>\n<style>b{}</style></component>");
        assert_eq!(err.code, COMPONENT_STYLE_SINGLE);
        assert_eq!(err.line, 2);

        let err = reject("<component name=\"a\"><div><style>a{}</style></div></component>");
        assert_eq!(err.code, COMPONENT_STYLE_LOCATION);
    }

    #[test]
    fn test_script_rules() {
        let err = reject("<component name=\"a\"><script>let a;</script><script>let b;</script></component>");
        assert_eq!(err.code, COMPONENT_SCRIPT_SINGLE);

        let err = reject("<component name=\"a\"><p><script>let a;</script></p></component>");
        assert_eq!(err.code, COMPONENT_SCRIPT_LOCATION);
    }

    #[test]
    fn test_nesting_is_reported_before_style_and_script() {
        let err = reject(
            "<component name=\"a\"><p><script></script></p><component name=\"b\"></component></component>",
        );
        assert_eq!(err.code, COMPONENT_NESTED);
    }

    #[test]
    fn test_missing_name() {
        let err = reject("<p>ok</p>\n<component><i>x</i></component>");
        assert_eq!(err.code, COMPONENT_NAME);
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_host_attributes_cannot_bind() {
        let err = reject("<component name=\"a\" onclick=\"go()\"><i>x</i></component>");
        assert_eq!(err.code, COMPONENT_HOST_BINDING);
        assert_eq!(err.get("attribute"), Some("onclick"));

        let err = reject("<component name=\"a\" title=\"${t}\"><i>x</i></component>");
        assert_eq!(err.code, COMPONENT_HOST_BINDING);
        assert_eq!(err.get("attribute"), Some("title"));

        let ok = compile(
            "<component name=\"a\" class=\"card\" param-size=\"number\"><i>x</i></component>",
            &CompileOptions::default(),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_script_parse_error_is_located() {
        let err = reject("<component name=\"a\">\n<script>let = ;</script></component>");
        assert_eq!(err.code, JS_PARSE);
        assert_eq!(err.line, 2);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ERROR SHAPE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_display_carries_details_and_location() {
        let err = reject("<div>\n  <p>${ n = 1 }</p>\n</div>");
        assert_eq!(err.code, JS_INTERPOLATION_SIDE_EFFECT);
        let text = err.to_string();
        assert!(
            text.starts_with(
                "[js:interpolation:sideeffect] Interpolation must not modify component state. \
                 { expression: 'n = 1', variable: 'n', file: 'bad.html', line: '2', column: '"
            ),
            "{}",
            text
        );
        assert!(text.ends_with("' }"));
    }

    #[test]
    fn test_serialized_error() {
        let err = reject("<section>");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], json!(PARSE_ENDING_TAG));
        assert_eq!(value["file"], json!("bad.html"));
        assert_eq!(value["hint"], json!(describe(PARSE_ENDING_TAG)));
        assert!(value["details"].is_array());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ESCAPING
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_attribute_values_are_escaped() {
        let html = compile("<a title=\"${t}\">x</a>", &CompileOptions::default())
            .unwrap()
            .compiled
            .render(&json!({ "t": "\"><script>" }))
            .unwrap();
        assert_eq!(html, "<a title=\"&quot;><script>\">x</a>");
    }

    #[test]
    fn test_missing_values_render_empty() {
        let html = compile("<p>${a.b}|${c}</p>", &CompileOptions::default())
            .unwrap()
            .compiled
            .render(&json!({}))
            .unwrap();
        assert_eq!(html, "<p>|</p>");
    }
}
