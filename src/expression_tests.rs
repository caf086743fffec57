#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use serde_json::json;

    use crate::compiler::compile_expression;
    use crate::error::{JS_INTERPOLATION_SIDE_EFFECT, JS_INTERPOLATION_UNSUPPORTED, JS_PARSE};
    use crate::expression::{summarize, Shape};
    use crate::reactivity::ContextScope;
    use crate::scope::parse_program;
    use crate::static_eval::Value;

    fn context(script: &str) -> ContextScope {
        let allocator = Allocator::default();
        let program = parse_program(&allocator, script).unwrap();
        let mut scope = ContextScope::default();
        scope.declare_program(&program);
        scope
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SIDE EFFECTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_every_write_form_is_a_side_effect() {
        let scope = context("let v = 1;");
        let writes = [
            "v = 2", "v += 1", "v -= 1", "v *= 2", "v /= 2", "v %= 2", "v **= 2", "v <<= 1",
            "v >>= 1", "v >>>= 1", "v &= 1", "v |= 1", "v ^= 1", "v &&= 1", "v ||= 1",
            "v ??= 1", "v++", "v--", "++v", "--v",
        ];
        for write in writes {
            for source in [write.to_string(), format!("{}, y", write)] {
                let summary = summarize(&source).unwrap();
                let err = scope.check_side_effects(&summary).unwrap_err();
                assert_eq!(err.code, JS_INTERPOLATION_SIDE_EFFECT, "{}", source);
                assert_eq!(err.get("variable"), Some("v"), "{}", source);
                assert_eq!(err.get("expression"), Some(source.as_str()));
            }
        }
    }

    #[test]
    fn test_reads_are_not_side_effects() {
        let scope = context("let v = 1; let list = [];");
        for source in ["v + 1", "v === 2 ? 'a' : 'b'", "list.length", "`${v}`", "list.map(x => x * v)"] {
            let summary = summarize(source).unwrap();
            assert!(scope.check_side_effects(&summary).is_ok(), "{}", source);
        }
    }

    #[test]
    fn test_writes_to_undeclared_names_are_allowed_in_context() {
        let scope = context("let v = 1;");
        let summary = summarize("window.x = v").unwrap();
        assert!(scope.check_side_effects(&summary).is_ok());
    }

    #[test]
    fn test_switch_case_locals_are_not_context_writes() {
        let scope = context("let v = 0;");
        let summary =
            summarize("[1].map(x => { switch (x) { case 1: let v = 2; v++; } return x; })").unwrap();
        assert!(scope.check_side_effects(&summary).is_ok());

        let summary = summarize("[1].map(x => { switch (x) { case 1: v++; } return x; })").unwrap();
        let err = scope.check_side_effects(&summary).unwrap_err();
        assert_eq!(err.get("variable"), Some("v"));
    }

    #[test]
    fn test_one_hop_through_calls() {
        let scope = context(
            "let v = 0; function set() { v = 1; } function relay() { set(); } function far() { relay(); }",
        );
        let err = scope.check_side_effects(&summarize("set()").unwrap()).unwrap_err();
        assert_eq!(err.get("function"), Some("set"));
        let err = scope.check_side_effects(&summarize("relay()").unwrap()).unwrap_err();
        assert_eq!(err.get("function"), Some("set"));
        assert!(scope.check_side_effects(&summarize("far()").unwrap()).is_ok());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SUMMARIES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_free_names_skip_locals_and_members() {
        let summary = summarize("items.filter(i => i.done && i.owner === user).length").unwrap();
        let free: Vec<&str> = summary.free.iter().map(String::as_str).collect();
        assert_eq!(free, vec!["items", "user"]);
    }

    #[test]
    fn test_handler_shapes() {
        let shape = |source: &str| summarize(source).unwrap().shape;
        assert_eq!(shape("save"), Shape::Identifier("save".to_string()));
        assert_eq!(
            shape("save(1, x)"),
            Shape::Call {
                callee: "save".to_string(),
                arguments: Some("1, x".to_string()),
            }
        );
        assert_eq!(
            shape("save()"),
            Shape::Call {
                callee: "save".to_string(),
                arguments: None,
            }
        );
        assert_eq!(shape("(e) => go(e)"), Shape::Arrow);
        assert_eq!(shape("function (e) {}"), Shape::Function);
        assert_eq!(shape("a.b()"), Shape::Other);
        assert_eq!(shape("n++"), Shape::Other);
    }

    #[test]
    fn test_literals() {
        assert!(summarize("'text'").unwrap().is_literal());
        assert!(summarize("`plain`").unwrap().is_literal());
        assert!(!summarize("`${x}`").unwrap().is_literal());
        assert!(!summarize("x").unwrap().is_literal());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PAGE EXPRESSIONS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_page_expressions_evaluate() {
        let scope = json!({ "user": { "name": "Ada", "tags": ["a", "b"] }, "n": 2 });
        let value = |source: &str| compile_expression(source).unwrap().evaluate(&scope);
        assert_eq!(value("user.name"), Value::String("Ada".to_string()));
        assert_eq!(value("user.tags[n - 1]"), Value::String("b".to_string()));
        assert_eq!(value("n ** 3 % 5"), Value::Number(3.0));
        assert_eq!(value("user.missing ?? 'none'"), Value::String("none".to_string()));
        assert_eq!(value("(n, n + 1)"), Value::Number(3.0));
    }

    #[test]
    fn test_page_expression_errors() {
        let err = compile_expression("x += 1").unwrap_err();
        assert_eq!(err.code, JS_INTERPOLATION_SIDE_EFFECT);

        let err = compile_expression("list.map(f)").unwrap_err();
        assert_eq!(err.code, JS_INTERPOLATION_UNSUPPORTED);
        assert_eq!(err.get("reason"), Some("function call"));

        let err = compile_expression("a +").unwrap_err();
        assert_eq!(err.code, JS_PARSE);
    }
}
