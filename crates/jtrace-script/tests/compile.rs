//! Properties of compiled hook programs.

use jtrace_core::{HookRegistry, HookSpec, MethodTarget, ReturnPatchRule, ScriptOptions};
use jtrace_script::compile;

fn hook(class: &str, method: &str, ret: &str) -> HookSpec {
    HookSpec::new(
        MethodTarget::new(class, method, ret, vec![]),
        ScriptOptions::default(),
    )
}

/// Extracts the `PATCH_<n>` object literal from a program.
fn patch_block(program: &str, idx: usize) -> String {
    let start = program
        .find(&format!("var PATCH_{idx} = {{"))
        .expect("patch block present");
    let end = program[start..].find("};").expect("patch block closed");
    program[start..start + end].to_string()
}

#[test]
fn test_one_isolated_block_per_hook() {
    for n in 0..6 {
        let hooks: Vec<HookSpec> = (0..n)
            .map(|i| hook("com.example.Api", &format!("m{i}"), "int"))
            .collect();
        let program = compile(&hooks, &[]);

        assert_eq!(program.matches("    // Hook: ").count(), n);
        assert_eq!(program.matches("Hook error: ").count(), n);
        for i in 1..=n {
            assert_eq!(
                program.matches(&format!("var TARGET_CLASS_{i} = ")).count(),
                1,
                "suffix _{i} must be unique"
            );
        }
        assert!(!program.contains(&format!("TARGET_CLASS_{} ", n + 1)));
    }
}

#[test]
fn test_constant_rendering_follows_return_type() {
    let hooks = vec![
        hook("A", "flag", "boolean").with_patch(ReturnPatchRule::constant("true")),
        hook("A", "name", "java.lang.String").with_patch(ReturnPatchRule::constant("true")),
        hook("A", "calc", "java.lang.String").with_patch(ReturnPatchRule::constant("raw:1+1")),
        hook("A", "count", "int").with_patch(ReturnPatchRule::constant("raw:1+1")),
    ];
    let program = compile(&hooks, &[]);

    assert!(patch_block(&program, 1).contains("constValue: true,"));
    assert!(patch_block(&program, 2).contains("constValue: \"true\","));
    assert!(patch_block(&program, 3).contains("constValue: 1+1,"));
    assert!(patch_block(&program, 4).contains("constValue: 1+1,"));
}

#[test]
fn test_void_method_never_patched() {
    let mut rule = ReturnPatchRule::constant("1");
    rule.enabled = true;
    let hooks = vec![
        hook("A", "reset", "void").with_patch(rule.clone()),
        hook("A", "value", "int").with_patch(rule),
    ];
    let program = compile(&hooks, &[]);

    assert!(patch_block(&program, 1).contains("enabled: false,"));
    assert!(patch_block(&program, 2).contains("enabled: true,"));
}

#[test]
fn test_patch_modes_are_quoted() {
    let hooks = vec![
        hook("A", "e", "int").with_patch(ReturnPatchRule::expression("ret * 2")),
        hook("A", "c", "int").with_patch(ReturnPatchRule::conditional("args.length > 0", "1", "")),
        hook("A", "s", "int").with_patch(ReturnPatchRule::script("return \"x\";")),
    ];
    let program = compile(&hooks, &[]);

    let e = patch_block(&program, 1);
    assert!(e.contains("mode: \"EXPRESSION\","));
    assert!(e.contains("expr: \"ret * 2\","));
    let c = patch_block(&program, 2);
    assert!(c.contains("mode: \"CONDITIONAL\","));
    assert!(c.contains("cond: \"args.length > 0\","));
    assert!(c.contains("thenValue: \"1\","));
    assert!(c.contains("elseValue: \"\","));
    let s = patch_block(&program, 3);
    assert!(s.contains("script: \"return \\\"x\\\";\""));
}

#[test]
fn test_disabled_hook_leaves_program_and_keeps_spec() {
    let mut registry = HookRegistry::new();
    for name in ["first", "second", "third"] {
        registry.upsert(hook("com.example.Api", name, "int"), None);
    }
    let second_key = "com.example.Api.second():int";

    let all = compile(registry.active_specs(), &[]);
    assert_eq!(all.matches("    // Hook: ").count(), 3);

    registry.set_active(second_key, false).unwrap();
    let program = compile(registry.active_specs(), &[]);

    assert_eq!(program.matches("    // Hook: ").count(), 2);
    assert!(!program.contains("second"));
    assert!(program.contains("var METHOD_SIG_1 = \"com.example.Api.first():int\";"));
    assert!(program.contains("var METHOD_SIG_2 = \"com.example.Api.third():int\";"));
    assert!(registry.spec(second_key).is_some());

    registry.set_active(second_key, true).unwrap();
    assert_eq!(compile(registry.active_specs(), &[]), all);
}

#[test]
fn test_options_baked_in() {
    let mut options = ScriptOptions::default();
    options.print_stack = true;
    options.log_args = false;
    let spec = HookSpec::new(MethodTarget::new("A", "m", "int", vec![]), options);
    let program = compile([&spec], &[]);

    assert!(program.contains("      logArgs: false,\n"));
    assert!(program.contains("      printStack: true,\n"));
    assert!(program.contains("      prettyPrint: true\n"));
}
