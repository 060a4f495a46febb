//! Compiler from a C subset to [Mindustry logic](https://mindustrygame.github.io/wiki/logic/0-introduction/).
//!
//! The main entry point is [`compile`](fn.compile.html), which takes a
//! preprocessed source file and an optimization level and produces the flat
//! logic program as text, one instruction per line, with every jump target
//! resolved to an absolute instruction index.
//!
//! Parsing is implemented with [pest]; the [`Error`](type.Error.html) type
//! is `pest::error::Error`, so every diagnostic (syntactic or semantic)
//! carries file/line context and pretty-prints the offending source.
//!
//! # Supported language
//!
//! Expressions: integer/float/string literals, variables, unary `! ~ + -`,
//! pre/post `++`/`--`, binary arithmetic/comparison/bitwise operators with C
//! precedence, assignment and augmented assignment, calls. Statements:
//! compound blocks, `if`/`else`, `while`, `do`-`while`, `for`, `break`,
//! `continue`, `return`, labels and `goto`. Declarations: local and global
//! variables, function definitions and forward declarations. The opaque
//! `struct MindustryObject` is accepted as a type tag; other structs,
//! enums, pointers-as-values and array subscripts are rejected.
//!
//! Besides user functions, calls may name the target VM's builtins:
//!
//!  Group | Names
//! -------|-------
//! I/O    | `print`, `printd`, `printflush`, `end`, `asm`
//! Units  | `enable`, `shoot`, `radar`, `sensor`
//! Memory | `get_link`, `read`, `write`
//! Draw   | `drawclear`, `drawcolor`, `drawstroke`, `drawline`, `drawrect`, `drawlinerect`, `drawpoly`, `drawlinepoly`, `drawtriangle`, `drawflush`
//! Math   | binary `pow max min angle len land idiv strictEqual noise`, unary `abs log log10 sin cos tan floor ceil sqrt rand`
//!
//! # Calling convention
//!
//! The target VM has no call stack, so one is fabricated statically: every
//! value lives in a named VM variable. `__rax` holds each expression's
//! result, locals are mangled to `_<var>_<func>`, a call writes its
//! arguments directly into the callee's slots, stores the absolute address
//! of the instruction after the call in `__retaddr_<callee>` and jumps to
//! the callee's start; `return` copies `__retaddr_<callee>` into
//! `@counter`.
//!
//! # Optimization levels
//!
//!  Level | Effect
//! -------|--------
//! 0      | straight-line emission, every value routed through `__rax`
//! 1      | indirection peepholes and inverse-comparison jump folding (default)
//! 2      | dead-function elimination, `main` returns become `end`
//! 3      | drop the `__rax` copies that make `++`/`--` and `op=` usable as values
//!
//! [pest]: https://docs.rs/pest/

mod ast;
mod compiler;
mod link;
mod parser;


use pest::Span;

pub use parser::{CParser, Rule};

pub type Error = pest::error::Error<Rule>;

pub type Result<T> = std::result::Result<T, Error>;

fn new_parser_error(span: Span, message: String) -> Error {
    Error::new_from_span(pest::error::ErrorVariant::CustomError { message }, span)
}

/// Compile a preprocessed source file to a Mindustry logic program.
pub fn compile(input: &str, opt_level: u32) -> Result<String> {
    let program = ast::parse(input)?;
    let mut compiler = compiler::Compiler::new(opt_level);
    compiler.emit_program(&program)?;
    Ok(compiler.link())
}
