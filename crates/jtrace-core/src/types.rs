//! Java type-name helpers.
//!
//! Type names are in the engine's notation: primitives by keyword
//! (`int`, `boolean`), reference types fully qualified
//! (`java.lang.String`), arrays with trailing `[]`.

/// Primitive numeric type names, including `char`.
const NUMERIC_TYPES: &[&str] = &["byte", "short", "char", "int", "long", "float", "double"];

/// Returns true for the `void` return type.
pub fn is_void(type_name: &str) -> bool {
    type_name == "void"
}

/// Returns true for the primitive `boolean` type.
///
/// The boxed `java.lang.Boolean` is deliberately not included: constant
/// patches against it are rendered as strings and coerced at call time.
pub fn is_boolean(type_name: &str) -> bool {
    type_name == "boolean"
}

/// Returns true for primitive numeric types (including `char`).
pub fn is_numeric(type_name: &str) -> bool {
    NUMERIC_TYPES.contains(&type_name)
}

/// Returns true for any of the eight primitive types.
pub fn is_primitive(type_name: &str) -> bool {
    is_boolean(type_name) || is_numeric(type_name)
}

/// Returns true for `java.lang.String` or its short form.
pub fn is_string(type_name: &str) -> bool {
    matches!(type_name, "java.lang.String" | "String")
}

/// Returns true for array types (`int[]`, `java.lang.String[][]`).
pub fn is_array(type_name: &str) -> bool {
    type_name.ends_with("[]")
}

/// Removes a generic parameter list: `java.util.List<String>` → `java.util.List`.
pub fn strip_generics(type_name: &str) -> &str {
    match type_name.find('<') {
        Some(idx) => type_name.get(..idx).unwrap_or(type_name),
        None => type_name,
    }
}

/// Rewrites decompiler names for anonymous classes into binary names.
///
/// `com.app.Outer.AnonymousClass3` becomes `com.app.Outer$3`.
pub fn normalize_class_name(name: &str) -> String {
    const MARKER: &str = ".AnonymousClass";

    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(idx) = rest.find(MARKER) {
        let (head, tail) = rest.split_at(idx);
        let after = tail.get(MARKER.len()..).unwrap_or("");
        let digits = after.chars().take_while(char::is_ascii_digit).count();
        out.push_str(head);
        if digits == 0 {
            out.push_str(MARKER);
            rest = after;
            continue;
        }
        out.push('$');
        out.push_str(after.get(..digits).unwrap_or(""));
        rest = after.get(digits..).unwrap_or("");
    }
    out.push_str(rest);
    out
}
