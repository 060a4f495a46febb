//! Static operator and builtin tables for the target VM.
//!
//! Opcode names follow
//! <https://github.com/Anuken/Mindustry/blob/master/core/src/mindustry/logic/LogicOp.java>.

/// Maps a source-level binary operator token to the logic `op` name.
/// Named function-style operators map to themselves.
pub fn binary_op_name(op: &str) -> Option<&'static str> {
    Some(match op {
        "+" => "add",
        "-" => "sub",
        "*" => "mul",
        "/" => "div",
        "%" => "mod",
        "==" => "equal",
        "!=" => "notEqual",
        "<" => "lessThan",
        "<=" => "lessThanEq",
        ">" => "greaterThan",
        ">=" => "greaterThanEq",
        ">>" => "shl",
        "<<" => "shr",
        "|" => "or",
        "&" => "and",
        "^" => "xor",
        "pow" => "pow",
        "max" => "max",
        "min" => "min",
        "angle" => "angle",
        "len" => "len",
        "land" => "land",
        "idiv" => "idiv",
        "strictEqual" => "strictEqual",
        "noise" => "noise",
        _ => return None,
    })
}

/// Maps a comparison token to the jump-condition opcode name.
pub fn condition_op_name(op: &str) -> Option<&'static str> {
    Some(match op {
        "==" => "equal",
        "!=" => "notEqual",
        "<" => "lessThan",
        "<=" => "lessThanEq",
        ">" => "greaterThan",
        ">=" => "greaterThanEq",
        _ => return None,
    })
}

/// Maps a source-level unary operator token to the logic `op` name.
/// Named function-style operators map to themselves.
pub fn unary_op_name(op: &str) -> Option<&'static str> {
    Some(match op {
        "~" => "not",
        "abs" => "abs",
        "log" => "log",
        "log10" => "log10",
        "sin" => "sin",
        "cos" => "cos",
        "tan" => "tan",
        "floor" => "floor",
        "ceil" => "ceil",
        "sqrt" => "sqrt",
        "rand" => "rand",
        _ => return None,
    })
}

/// The comparison that is true exactly when `op` is false.
pub fn inverse_op(op: &str) -> Option<&'static str> {
    Some(match op {
        "==" => "!=",
        "!=" => "==",
        "<" => ">=",
        "<=" => ">",
        ">" => "<=",
        ">=" => "<",
        _ => return None,
    })
}

/// Binary operators that look like function calls in the source.
pub const FUNC_BINARY_OPS: &[&str] = &[
    "pow",
    "max",
    "min",
    "angle",
    "len",
    "land",
    "idiv",
    "strictEqual",
    "noise",
];

/// Unary operators that look like function calls in the source.
pub const FUNC_UNARY_OPS: &[&str] = &[
    "abs", "log", "log10", "sin", "cos", "tan", "floor", "ceil", "sqrt", "rand",
];

/// Identifiers naming VM-intrinsic registers; referenced with an `@` prefix.
pub const SPECIAL_VARS: &[&str] = &["links", "ipt", "counter", "time", "unit"];

/// Maps a `draw*` pseudo-function to its `draw` sub-command.
pub fn draw_command(name: &str) -> Option<&'static str> {
    Some(match name {
        "drawclear" => "clear",
        "drawcolor" => "color",
        "drawstroke" => "stroke",
        "drawline" => "line",
        "drawrect" => "rect",
        "drawlinerect" => "lineRect",
        "drawpoly" => "poly",
        "drawlinepoly" => "linePoly",
        "drawtriangle" => "triangle",
        _ => return None,
    })
}

/// Pseudo-function names recognized by compiler front ends. Forward
/// declarations of these (from a builtin header) must not create
/// user-function records.
pub const BUILTINS: &[&str] = &[
    "print",
    "printd",
    "printflush",
    "end",
    "asm",
    "enable",
    "shoot",
    "radar",
    "sensor",
    "get_link",
    "read",
    "write",
    "drawclear",
    "drawcolor",
    "drawstroke",
    "drawline",
    "drawrect",
    "drawlinerect",
    "drawpoly",
    "drawlinepoly",
    "drawtriangle",
    "drawflush",
];

/// Whether `name` refers to any builtin, including the function-style
/// operators.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name) || FUNC_BINARY_OPS.contains(&name) || FUNC_UNARY_OPS.contains(&name)
}
