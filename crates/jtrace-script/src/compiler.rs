//! Program assembly.

use jtrace_core::{HookSpec, SnippetPosition, LOG_TAG};
use tracing::debug;

use crate::helpers;
use crate::literal::{comment_text, constant_literal, js_quote};

/// Comment emitted above each global fragment.
pub const GLOBAL_SCRIPT_BANNER: &str = "// ---- jtrace custom script ----";

/// Compiles `hooks` (in order) and `globals` into one program.
///
/// Every hook gets its own block with a `_<n>` suffix on all of its
/// variables, `n` counting from 1 in iteration order, so blocks never
/// collide. Each block is wrapped in its own try/catch: a hook that fails
/// to resolve logs a diagnostic and leaves the others installed.
///
/// Blank global fragments are skipped.
pub fn compile<'a, I>(hooks: I, globals: &[String]) -> String
where
    I: IntoIterator<Item = &'a HookSpec>,
{
    let mut w = ScriptWriter::default();
    w.line("'use strict';");
    write_globals(&mut w, globals);
    w.line("setImmediate(function() {");
    w.line("  Java.perform(function() {");
    w.raw(&helpers::render());

    let mut count = 0usize;
    for spec in hooks {
        count += 1;
        write_hook(&mut w, spec, count);
    }
    if count == 0 {
        w.line("    // no hooks");
    }

    w.line("  });");
    w.line("});");

    debug!(hooks = count, globals = globals.len(), bytes = w.len(), "Compiled hook program");
    w.finish()
}

// ============================================================================
// Writer
// ============================================================================

#[derive(Default)]
struct ScriptWriter {
    buf: String,
}

impl ScriptWriter {
    fn line(&mut self, text: impl AsRef<str>) {
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
    }

    fn raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn finish(self) -> String {
        self.buf
    }
}

// ============================================================================
// Sections
// ============================================================================

fn write_globals(w: &mut ScriptWriter, globals: &[String]) {
    let mut wrote = false;
    for script in globals.iter().filter(|s| !s.trim().is_empty()) {
        w.line("");
        w.line(GLOBAL_SCRIPT_BANNER);
        w.line(script);
        wrote = true;
    }
    if wrote {
        w.line("");
    }
}

fn write_snippet(w: &mut ScriptWriter, code: &str, indent: &str) {
    w.line(format!("{indent}try {{"));
    for line in code.lines() {
        w.line(format!("{indent}  {line}"));
    }
    w.line(format!(
        "{indent}}} catch (e) {{ console.log('{LOG_TAG} Template error: ' + e); }}"
    ));
}

fn quoted_list(items: &[String]) -> String {
    items.iter().map(|s| js_quote(s)).collect::<Vec<_>>().join(", ")
}

fn write_hook(w: &mut ScriptWriter, spec: &HookSpec, idx: usize) {
    let target = &spec.target;
    let opts = spec.options;
    let patch = &spec.patch;
    let ret_type = target.return_type();
    let arg_types = target.arg_types();
    let s = format!("_{idx}");

    w.line("    try {");
    w.line(format!("    // Hook: {}", comment_text(target.display_signature())));
    w.line(format!("    var TARGET_CLASS{s} = {};", js_quote(target.class_name())));
    w.line(format!("    var TARGET_METHOD{s} = {};", js_quote(target.method_name())));
    w.line(format!("    var RETURN_TYPE{s} = {};", js_quote(ret_type)));
    w.line(format!("    var ARG_TYPES{s} = [{}];", quoted_list(arg_types)));
    w.line(format!("    var METHOD_SIG{s} = {};", js_quote(target.display_signature())));

    w.line(format!("    var OPTIONS{s} = {{"));
    w.line(format!("      logArgs: {},", opts.log_args));
    w.line(format!("      logReturn: {},", opts.log_return));
    w.line(format!("      logThread: {},", opts.log_thread));
    w.line(format!("      printStack: {},", opts.print_stack));
    w.line(format!("      printThis: {},", opts.print_this));
    w.line(format!("      prettyPrint: {}", opts.pretty_print));
    w.line("    };");

    w.line(format!("    var PATCH{s} = {{"));
    w.line(format!("      enabled: {},", spec.patch_enabled()));
    w.line(format!("      mode: {},", js_quote(patch.mode.as_str())));
    w.line(format!("      constValue: {},", constant_literal(patch, ret_type)));
    w.line(format!("      expr: {},", js_quote(&patch.expression)));
    w.line(format!("      cond: {},", js_quote(&patch.condition)));
    w.line(format!("      thenValue: {},", js_quote(&patch.then_value)));
    w.line(format!("      elseValue: {},", js_quote(&patch.else_value)));
    w.line(format!("      script: {}", js_quote(&patch.script_body)));
    w.line("    };");

    w.line(format!("    var clazz{s} = Java.use(TARGET_CLASS{s});"));
    w.line(format!("    var CALL_COUNT{s} = 0;"));
    w.line(format!("    var overload{s} = null;"));

    let (handle, lookup, missing) = if target.is_constructor() {
        (
            format!("ctor{s}"),
            format!("clazz{s}.$init"),
            format!("constructor not found: ' + TARGET_CLASS{s}"),
        )
    } else {
        (
            format!("methodRef{s}"),
            format!("clazz{s}[TARGET_METHOD{s}]"),
            format!("method not found: ' + METHOD_SIG{s}"),
        )
    };
    w.line(format!("    var {handle} = {lookup};"));
    w.line(format!("    if (!{handle}) {{"));
    w.line(format!("      console.log('{LOG_TAG} Hook skipped, {missing});"));
    w.line("    } else {");
    w.line("      try {");
    w.line(format!(
        "        overload{s} = {handle}.overload({});",
        quoted_list(arg_types)
    ));
    w.line("      } catch (e) {");
    w.line(format!(
        "        console.log('{LOG_TAG} Hook skipped (no overload): ' + METHOD_SIG{s} + ' => ' + e);"
    ));
    w.line("      }");
    w.line("    }");

    w.line(format!("    if (overload{s}) {{"));
    w.line(format!("    overload{s}.implementation = function() {{"));
    w.line("      var args = [].slice.call(arguments);");
    w.line("      var threadName = null;");
    w.line(format!("      if (OPTIONS{s}.logThread) {{"));
    w.line("        try {");
    w.line("          threadName = Java.use('java.lang.Thread').currentThread().getName();");
    w.line("        } catch (e) {}");
    w.line("      }");
    w.line(format!("      var callId = ++CALL_COUNT{s};"));
    w.line(format!(
        "      var callLine = formatCall(METHOD_SIG{s}, args, OPTIONS{s}, threadName);"
    ));
    w.line(format!("      var prefix = '{LOG_TAG} #' + callId + ' ';"));
    w.line("      console.log(prefix + 'CALL ' + callLine);");
    w.line(format!("      var TARGET_CLASS = TARGET_CLASS{s};"));
    w.line(format!("      var TARGET_METHOD = TARGET_METHOD{s};"));
    w.line(format!("      var METHOD_SIG = METHOD_SIG{s};"));
    w.line(format!("      if (OPTIONS{s}.printThis) {{"));
    w.line(format!(
        "        try {{ console.log(prefix + 'THIS ' + safeToString(this, OPTIONS{s})); }} catch (e) {{}}"
    ));
    w.line("      }");
    w.line(format!("      if (OPTIONS{s}.printStack) {{"));
    w.line("        console.log(prefix + 'STACK\\n' + getStackTrace());");
    w.line("      }");

    let snippet = spec.snippet();
    if let Some((code, SnippetPosition::Prepend)) = snippet {
        write_snippet(w, code, "      ");
    }

    let call_args: String = (0..arg_types.len()).map(|i| format!(", args[{i}]")).collect();
    w.line(format!("      var ret = overload{s}.call(this{call_args});"));

    if let Some((code, SnippetPosition::Append)) = snippet {
        write_snippet(w, code, "      ");
    }

    w.line(format!("      if (OPTIONS{s}.logReturn) {{"));
    w.line(format!("        if (RETURN_TYPE{s} === 'void') {{"));
    w.line(format!("          console.log(prefix + 'RET  ' + METHOD_SIG{s} + ' => void');"));
    w.line("        } else {");
    w.line(format!(
        "          console.log(prefix + 'RET  ' + METHOD_SIG{s} + ' => ' + safeToString(ret, OPTIONS{s}));"
    ));
    w.line("        }");
    w.line("      }");
    w.line(format!("      var patched = applyPatch(ret, args, this, PATCH{s});"));
    w.line(format!("      if (patched !== ret && RETURN_TYPE{s} !== 'void') {{"));
    w.line(format!(
        "        console.log(prefix + 'RET  ' + METHOD_SIG{s} + ' => ' + safeToString(patched, OPTIONS{s}) + ' (patched)');"
    ));
    w.line("      }");
    w.line(format!("      if (RETURN_TYPE{s} === 'void') {{ return; }}"));
    w.line(format!("      return castReturn(patched, RETURN_TYPE{s});"));
    w.line("    };");
    w.line("    }");
    w.line(format!(
        "    }} catch (e) {{ console.log('{LOG_TAG} Hook error: ' + e); }}"
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use jtrace_core::{MethodTarget, ScriptOptions};

    fn spec(method: &str, ret: &str, args: &[&str]) -> HookSpec {
        let target = MethodTarget::new(
            "com.example.Api",
            method,
            ret,
            args.iter().map(|a| a.to_string()).collect(),
        );
        HookSpec::new(target, ScriptOptions::default())
    }

    #[test]
    fn test_empty_program() {
        let program = compile(std::iter::empty(), &[]);
        assert!(program.starts_with("'use strict';\nsetImmediate(function() {\n"));
        assert!(program.contains("    // no hooks\n"));
        assert!(program.ends_with("  });\n});\n"));
    }

    #[test]
    fn test_overload_arguments() {
        let hooks = [spec("run", "void", &[]), spec("sum", "int", &["int", "int"])];
        let program = compile(&hooks, &[]);
        assert!(program.contains("overload_1 = methodRef_1.overload();"));
        assert!(program.contains("overload_2 = methodRef_2.overload(\"int\", \"int\");"));
        assert!(program.contains("var ret = overload_1.call(this);"));
        assert!(program.contains("var ret = overload_2.call(this, args[0], args[1]);"));
    }

    #[test]
    fn test_hook_comment_stays_on_one_line() {
        let target = MethodTarget::new("com.example.Api", "run", "void", vec![])
            .with_display_signature("com.example.Api.run()\nsend('escaped');\r\u{2028}//");
        let hooks = [HookSpec::new(target, ScriptOptions::default())];
        let program = compile(&hooks, &[]);

        assert!(program.contains("    // Hook: com.example.Api.run() send('escaped');  //\n"));
        assert!(!program.lines().any(|l| l.trim_start().starts_with("send('escaped')")));
        assert!(program.contains("var METHOD_SIG_1 = \"com.example.Api.run()\\nsend('escaped');\\r\\u2028//\";"));
    }

    #[test]
    fn test_constructor_lookup() {
        let target = MethodTarget::constructor("com.example.Session", vec!["long".into()]);
        let hooks = [HookSpec::new(target, ScriptOptions::default())];
        let program = compile(&hooks, &[]);
        assert!(program.contains("var ctor_1 = clazz_1.$init;"));
        assert!(program.contains("constructor not found: ' + TARGET_CLASS_1);"));
        assert!(program.contains("overload_1 = ctor_1.overload(\"long\");"));
    }

    #[test]
    fn test_snippet_placement() {
        let before = spec("a", "int", &[]).with_snippet("send('pre');", SnippetPosition::Prepend);
        let after = spec("b", "int", &[]).with_snippet("send('post');\nsend('x');", SnippetPosition::Append);
        let program = compile([&before, &after], &[]);

        let pre = program.find("send('pre');").unwrap();
        let call1 = program.find("var ret = overload_1.call(this);").unwrap();
        assert!(pre < call1);

        let call2 = program.find("var ret = overload_2.call(this);").unwrap();
        let post = program.find("        send('post');").unwrap();
        assert!(post > call2);
        assert!(program.contains("        send('x');\n"));
        assert_eq!(program.matches("Template error").count(), 2);
    }

    #[test]
    fn test_globals_wrapped() {
        let globals = vec!["var G = 1;".to_string(), "   ".to_string(), "var H = 2;".to_string()];
        let program = compile(std::iter::empty(), &globals);
        assert_eq!(program.matches(GLOBAL_SCRIPT_BANNER).count(), 2);
        let g = program.find("var G = 1;").unwrap();
        let entry = program.find("setImmediate(").unwrap();
        assert!(g < entry);
    }
}
