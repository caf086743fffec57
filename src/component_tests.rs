//! Component compilation tests: payload tables, script rewriting, events,
//! parameters and sub-components.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::asset::AssetKind;
    use crate::compiler::{CompileOptions, CompileOutput};
    use crate::component::ParamType;
    use crate::error::*;
    use crate::compile;

    fn build(source: &str) -> Result<CompileOutput, CompilerError> {
        compile(
            source,
            &CompileOptions {
                file: "components.html".to_string(),
                ..CompileOptions::default()
            },
        )
    }

    fn payload(source: &str) -> String {
        let output = build(source).unwrap();
        assert_eq!(output.components.len(), 1);
        output.components[0].payload.clone()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PAYLOAD
    // ═══════════════════════════════════════════════════════════════════════════════

    const COUNTER: &str = r#"<component name="counter" element="x-counter" client-param-start="number">
  <button ref="btn" onclick="increment" class="btn ${kind}">${count}</button>
  <p>${label}</p>
  <script>
    let count = start;
    let kind = 'big';
    const label = 'n';
    function increment() { count += 1; }
    function OnMount() {}
  </script>
</component>"#;

    #[test]
    fn test_payload_tables() {
        let output = build(COUNTER).unwrap();
        let component = &output.components[0];
        assert_eq!(component.name, "counter");
        assert_eq!(component.tag, "x-counter");
        assert_eq!(component.client_params[0].name, "start");
        assert_eq!(component.client_params[0].kind, ParamType::Number);

        let payload = &component.payload;
        assert!(payload.starts_with("STX.r('x-counter', function (STX) {\n"), "{}", payload);
        assert!(payload.contains("const _$line = 1; const _$file = \"components.html\";"));
        assert!(payload.contains("    e: ['_ref_"), "{}", payload);
        assert!(payload.contains("    t: ['class'],\n"), "{}", payload);
        assert!(payload.contains("    o: ['click'],\n"), "{}", payload);
        assert!(payload.contains("_$bind_prop_tpl(0, 0, ['btn ', 0"), "{}", payload);
        assert!(payload.contains("_$bind(1, 1), _$bind(2, 2)"), "{}", payload);
        assert!(payload.contains("    v: [[], [1], [0], [2]],\n"), "{}", payload);
        assert!(payload.contains("    a: [[0, 0, 0]],\n"), "{}", payload);
        assert!(payload.ends_with("    }\n  };\n});\n"));
    }

    #[test]
    fn test_context_function_body() {
        let payload = payload(COUNTER);
        assert!(payload.contains("let btn;\nlet start = $.params['start'];"), "{}", payload);
        assert!(
            payload.contains("$.onChangeParams((_$p) => { _$i(0, start, start = _$p['start']); });"),
            "{}",
            payload
        );
        assert!(payload.contains("_$i(1, count, count += 1)"), "{}", payload);
        assert!(payload.contains("      $.hooks({ a: OnMount });\n"), "{}", payload);
        assert!(payload.contains("      btn = $.el(0);\n"), "{}", payload);
        assert!(payload.contains(
            "return { e: [() => _$escape(kind), () => _$escape(count), () => _$escape(label)], h: [(e) => { increment(e) }] };"
        ), "{}", payload);
    }

    #[test]
    fn test_host_element_markup() {
        let output = build(COUNTER).unwrap();
        let html = output.compiled.render(&json!({})).unwrap();
        assert!(html.starts_with("<x-counter>"), "{}", html);
        assert!(html.ends_with("</x-counter>"), "{}", html);
        assert!(html.contains("<button class=\"_ref_"), "{}", html);
        assert!(html.contains("<embed hidden class=\"_i_"), "{}", html);
        for gone in ["${", "ref=", "onclick", "<script", "client-param", "name="] {
            assert!(!html.contains(gone), "{} in {}", gone, html);
        }
    }

    #[test]
    fn test_payload_is_deterministic() {
        assert_eq!(payload(COUNTER), payload(COUNTER));
        let html = |source: &str| build(source).unwrap().compiled.render(&json!({})).unwrap();
        assert_eq!(html(COUNTER), html(COUNTER));
    }

    #[test]
    fn test_post_increment_in_arrow() {
        let payload = payload(
            "<component name=\"counter\"><script>let v=1; const f=()=>{ v++; }</script></component>",
        );
        assert!(payload.contains("_$i(0, v, (v++, v))"), "{}", payload);
        assert!(!payload.contains("_$bind"));
        assert!(payload.contains("      return {};\n"));
    }

    #[test]
    fn test_imports_and_exports() {
        let payload = payload(
            "<component name=\"fmt\"><script>import { fmt } from './fmt.js';\nlet n = 1;\nexport const total = 2;</script></component>",
        );
        assert!(
            payload.starts_with("import { fmt } from './fmt.js';\nSTX.r('fmt', function (STX) {"),
            "{}",
            payload
        );
        assert!(payload.contains("$.exports({ total });"), "{}", payload);
        assert!(payload.contains("const total = 2;"));
        assert!(!payload.contains("export const"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INTERPOLATION CHECKS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_interpolation_write_is_rejected() {
        let err = build(
            "<component name=\"c\"><span>${ a = --a + 1, b }</span><script>let a=0;let b='';</script></component>",
        )
        .unwrap_err();
        assert_eq!(err.code, JS_INTERPOLATION_SIDE_EFFECT);
        assert_eq!(err.get("variable"), Some("a"));
        assert_eq!(err.file, "components.html");
    }

    #[test]
    fn test_interpolation_call_into_mutating_function() {
        let err = build(
            "<component name=\"c\"><p>${ bump() }</p><script>let n = 0; function bump() { n++; }</script></component>",
        )
        .unwrap_err();
        assert_eq!(err.code, JS_INTERPOLATION_SIDE_EFFECT);
        assert_eq!(err.get("function"), Some("bump"));
        assert_eq!(err.get("variable"), Some("n"));
    }

    #[test]
    fn test_local_writes_inside_interpolation() {
        let payload = payload(
            "<component name=\"c\"><p>${ items.map(i => { let t = i; t++; return t; }) }</p><script>let items = [];</script></component>",
        );
        assert!(payload.contains("    v: [[0]],\n"), "{}", payload);
    }

    #[test]
    fn test_unsafe_interpolation_is_not_escaped() {
        let payload = payload("<component name=\"c\"><p>#{html}</p><script>let html = '';</script></component>");
        assert!(payload.contains("e: [() => (html)]"), "{}", payload);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_event_handler_forms() {
        let payload = payload(
            r#"<component name="ev">
<button onclick="save(1, 'x')">a</button>
<button onclick="track('hit', e)">b</button>
<button onclick="count++">c</button>
<button onclick="(e) => count = 0">d</button>
<button onclick="function go(e) { count = 2; }">e</button>
<button onclick="js:alert(1)">f</button>
<button onclick="refresh">g</button>
<script>let count = 0; function save(n, s) {}</script>
</component>"#,
        );
        assert!(payload.contains("(e) => { save(1, 'x') }"), "{}", payload);
        assert!(payload.contains("(e) => { STX.push('track', $, e, 'hit', e) }"), "{}", payload);
        assert!(payload.contains("(e) => { _$i(0, count, (count++, count)) }"), "{}", payload);
        assert!(payload.contains("(e) => _$i(0, count, count = 0)"), "{}", payload);
        assert!(payload.contains("(function go(e)"), "{}", payload);
        assert!(payload.contains("_$i(0, count, count = 2)"), "{}", payload);
        assert!(payload.contains(", alert(1), "), "{}", payload);
        assert!(payload.contains("(e) => { STX.push('refresh', $, e) }"), "{}", payload);
        assert!(payload.contains("    o: ['click'],\n"));
        assert!(payload.contains("[0, 6, 6]]"), "{}", payload);
    }

    #[test]
    fn test_events_share_element_handles() {
        let payload = payload(
            "<component name=\"ev\"><input ref=\"field\" oninput=\"sync\" onchange=\"sync\"><script>function sync() {}</script></component>",
        );
        assert!(payload.contains("    o: ['input', 'change'],\n"), "{}", payload);
        assert!(payload.contains("    a: [[0, 0, 0], [1, 0, 0]],\n"), "{}", payload);
        assert!(payload.contains("h: [(e) => { sync(e) }]"), "{}", payload);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PARAMETERS AND REFERENCES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_client_param_reference() {
        let output = build(
            "<component name=\"user\" param-user-id=\"?string\" client-param-id=\"@user-id\"><i>${id}</i></component>",
        )
        .unwrap();
        let component = &output.components[0];
        assert_eq!(component.server_params[0].name, "userId");
        let client = &component.client_params[0];
        assert_eq!(client.name, "id");
        assert_eq!(client.kind, ParamType::String);
        assert!(client.optional);
        assert_eq!(client.reference.as_deref(), Some("userId"));
        assert!(component.payload.contains("let id = $.params['id'];"));
    }

    #[test]
    fn test_param_errors() {
        let err = build("<component name=\"c\" client-param-x=\"@missing\"></component>").unwrap_err();
        assert_eq!(err.code, COMPONENT_PARAM_CLIENT_REF_NOT_FOUND);
        assert_eq!(err.get("reference"), Some("missing"));

        let err = build("<component name=\"c\" client-param-tick=\"number\"></component>").unwrap_err();
        assert_eq!(err.code, COMPONENT_PARAM_CLIENT_NAME);

        let err = build("<component name=\"c\" param-when=\"date\"></component>").unwrap_err();
        assert_eq!(err.code, COMPONENT_PARAM_TYPE);
        assert_eq!(err.get("type"), Some("date"));
    }

    #[test]
    fn test_reference_errors() {
        let err = build("<component name=\"c\"><i ref=\"a\"></i>\n<b ref=\"a\"></b></component>").unwrap_err();
        assert_eq!(err.code, COMPONENT_JS_REF_DUPLICATED);
        assert_eq!(err.line, 2);

        let err = build("<component name=\"c\"><i ref=\"push\"></i></component>").unwrap_err();
        assert_eq!(err.code, COMPONENT_JS_REF_NAME);

        let err = build("<component name=\"c\"><i ref=\"btn\"></i><script>let btn = 1;</script></component>")
            .unwrap_err();
        assert_eq!(err.code, COMPONENT_JS_REDECLARATION);
        assert_eq!(err.get("identifier"), Some("btn"));

        let err = build("<component name=\"c\" client-param-btn=\"string\"><i ref=\"btn\"></i></component>")
            .unwrap_err();
        assert_eq!(err.code, COMPONENT_JS_REDECLARATION);
    }

    #[test]
    fn test_reference_names_are_camel_cased() {
        let payload = payload("<component name=\"c\"><i ref=\"save-button\"></i></component>");
        assert!(payload.contains("let saveButton;"), "{}", payload);
        assert!(payload.contains("saveButton = $.el(0);"), "{}", payload);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SUB-COMPONENTS AND ASSETS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_sub_component_attributes_and_asset_order() {
        let output = build(
            r#"<component name="badge"><span>${text}</span><script>let text = '';</script></component>
<component name="card"><badge title="${title}" label="x ${title}"></badge><script>let title = 'a';</script></component>"#,
        )
        .unwrap();
        assert_eq!(output.components.len(), 2);
        let badge = &output.components[0];
        let card = &output.components[1];
        assert_eq!(card.name, "card");
        assert!(card.payload.contains("e: [() => (title), () => _$escape(title)]"), "{}", card.payload);
        assert!(card.payload.contains("_$bind_prop(0, 0, 0), _$bind_prop_tpl(0, 1, ['x ', 1])"));
        assert!(card.payload.contains("    t: ['title', 'label'],\n"));
        assert!(card.payload.contains("    v: [[0, 1]],\n"));

        let names: Vec<&str> = output.assets.iter().map(|a| a.name.as_str()).collect();
        let badge_at = names.iter().position(|n| *n == badge.asset).unwrap();
        let card_at = names.iter().position(|n| *n == card.asset).unwrap();
        assert!(badge_at < card_at);
        let card_asset = &output.assets[card_at];
        assert_eq!(card_asset.dependencies, vec![badge.asset.clone()]);
    }

    #[test]
    fn test_style_asset() {
        let output = build(
            "<component name=\"c\"><style> p { color: red; } </style><p>x</p></component>",
        )
        .unwrap();
        let component = &output.components[0];
        let style = component.style.as_deref().unwrap();
        let first = &output.assets[0];
        assert_eq!(first.name, style);
        assert_eq!(first.kind, AssetKind::Stylesheet);
        assert_eq!(first.content, "p { color: red; }");
        assert_eq!(output.assets[1].name, component.asset);
        let html = output.compiled.render(&json!({})).unwrap();
        assert_eq!(html, "<c><p>x</p></c>");
    }

    #[test]
    fn test_component_next_to_server_interpolation() {
        let output = build(
            "<h1>${title}</h1><component name=\"c\"><p>${title}</p><script>let title = 'x';</script></component>",
        )
        .unwrap();
        assert_eq!(output.compiled.dynamics().len(), 2);
        let html = output.compiled.render(&json!({ "title": "T" })).unwrap();
        assert!(html.starts_with("<h1>T</h1><c><p><embed hidden class=\"_i_"), "{}", html);
    }
}
