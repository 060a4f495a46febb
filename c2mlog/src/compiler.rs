//! AST-directed instruction emission.
//!
//! Every expression leaves its value in the scratch register `__rax`; the
//! peephole helpers ([`Compiler::set_to_rax`], [`Compiler::consume_operand`])
//! retarget or pop the tail of the instruction stream at `-O1` and above so
//! the indirection through `__rax` disappears from the output. Locals live
//! in mangled slots (`_<var>_<func>`), call sites write arguments straight
//! into the callee's slots and record the return address in
//! `__retaddr_<callee>`.

use std::collections::{HashMap, HashSet};

use pest::Span;

use mlog::instructions::Instruction;
use mlog::ops;
use mlog::JumpCondition;

use crate::ast::{Expr, FuncDef, Item, Program, Stmt, VarDecl};
use crate::{new_parser_error, Result};

/// Scratch result register; every expression leaves its value here.
pub const RAX: &str = "__rax";
/// Base name for the uniqued left-operand scratch slots.
const RBX: &str = "__rbx";

fn set(dest: impl Into<String>, src: impl Into<String>) -> Instruction {
    Instruction::Set {
        dest: dest.into(),
        src: src.into(),
    }
}

fn binary_op(
    dest: impl Into<String>,
    left: impl Into<String>,
    right: impl Into<String>,
    op: impl Into<String>,
) -> Instruction {
    Instruction::BinaryOp {
        dest: dest.into(),
        left: left.into(),
        right: right.into(),
        op: op.into(),
    }
}

/// Per-function accumulator. `start` is assigned by the linker; `labels`
/// maps label names to function-local offsets; the call-graph edge sets are
/// populated at `-O2` and above.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    pub instructions: Vec<Instruction>,
    pub start: usize,
    pub labels: HashMap<String, usize>,
    pub callees: HashSet<String>,
    pub callers: HashSet<String>,
}

impl Function {
    fn new(name: &str, params: &[&str]) -> Function {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        Function {
            name: name.to_string(),
            locals: params.clone(),
            params,
            instructions: Vec::new(),
            start: 0,
            labels: HashMap::new(),
            callees: HashSet::new(),
            callers: HashSet::new(),
        }
    }
}

/// An active loop: its body-start offset and the offsets of jumps to patch
/// to the first instruction after the loop (the body guard plus any breaks).
struct Loop {
    start: usize,
    end_jumps: Vec<usize>,
}

/// A uniqued scratch-register name. The generation index lets the allocator
/// ignore a release that is not for the current top generation.
struct Scratch {
    name: String,
    gen: usize,
}

/// One compilation session: function records in layout order, the function
/// under emission, globals, the loop stack and the scratch-name counters.
pub struct Compiler<'i> {
    pub(crate) opt_level: u32,
    pub(crate) functions: Vec<Function>,
    curr: Option<Function>,
    globals: Vec<String>,
    loops: Vec<Loop>,
    loop_end: Option<usize>,
    counters: HashMap<String, usize>,
    gotos: Vec<(&'i str, Span<'i>)>,
}

impl<'i> Compiler<'i> {
    pub fn new(opt_level: u32) -> Compiler<'i> {
        Compiler {
            opt_level,
            functions: Vec::new(),
            curr: None,
            globals: Vec::new(),
            loops: Vec::new(),
            loop_end: None,
            counters: HashMap::new(),
            gotos: Vec::new(),
        }
    }

    pub fn emit_program(&mut self, program: &Program<'i>) -> Result<()> {
        for item in &program.items {
            match item {
                Item::Globals(decls) => {
                    for d in decls {
                        self.add_global(d)?;
                    }
                }
                Item::ForwardDecl { name, params } => {
                    if !ops::is_builtin(name) && self.find_function(name).is_none() {
                        self.functions.push(Function::new(name, params));
                    }
                }
                Item::Function(def) => self.emit_function(def)?,
            }
        }
        if self.find_function("main").is_none() {
            return Err(new_parser_error(
                program.span.clone(),
                "no `main` function defined".to_owned(),
            ));
        }
        Ok(())
    }

    pub(crate) fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub(crate) fn find_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    fn func(&self) -> &Function {
        self.curr.as_ref().unwrap()
    }

    fn func_mut(&mut self) -> &mut Function {
        self.curr.as_mut().unwrap()
    }

    fn push(&mut self, instruction: Instruction) {
        self.func_mut().instructions.push(instruction);
    }

    fn pop(&mut self) -> Instruction {
        self.func_mut().instructions.pop().unwrap()
    }

    fn peek(&self) -> Option<&Instruction> {
        self.func().instructions.last()
    }

    /// Offset of the next instruction to be pushed.
    fn here(&self) -> usize {
        self.func().instructions.len()
    }

    fn patch_jump(&mut self, at: usize, target: usize) {
        match &mut self.func_mut().instructions[at] {
            Instruction::RelativeJump { offset, .. } => *offset = Some(target),
            _ => unreachable!(),
        }
    }

    fn alloc_scratch(&mut self, base: &str) -> Scratch {
        let n = self.counters.entry(base.to_string()).or_insert(0);
        let scratch = Scratch {
            name: format!("{}_{}", base, *n),
            gen: *n,
        };
        *n += 1;
        scratch
    }

    /// Releases must come in reverse allocation order; a release that is not
    /// for the top generation is a no-op.
    fn release_scratch(&mut self, base: &str, scratch: Scratch) {
        if let Some(n) = self.counters.get_mut(base) {
            if *n == scratch.gen + 1 {
                *n = scratch.gen;
            }
        }
    }

    fn top_writes_rax(&self) -> bool {
        matches!(self.peek().and_then(Instruction::dest), Some(RAX))
    }

    fn can_avoid_indirection(&self, var: &str) -> bool {
        self.opt_level >= 1
            && matches!(self.peek(), Some(Instruction::Set { dest, .. }) if dest == var)
    }

    /// Store the value of `__rax` into `varname`, retargeting the last
    /// instruction in place when it wrote `__rax` itself.
    fn set_to_rax(&mut self, varname: &str) {
        if self.opt_level >= 1 && self.top_writes_rax() {
            *self
                .func_mut()
                .instructions
                .last_mut()
                .unwrap()
                .dest_mut()
                .unwrap() = varname.to_string();
        } else {
            self.push(set(varname, RAX));
        }
    }

    /// Use the value sitting in `reg` as an instruction operand, popping a
    /// trailing `set reg <src>` and substituting `<src>` when possible.
    fn consume_operand(&mut self, reg: &str) -> String {
        if self.can_avoid_indirection(reg) {
            match self.pop() {
                Instruction::Set { src, .. } => src,
                _ => unreachable!(),
            }
        } else {
            reg.to_string()
        }
    }

    /// Like [`consume_operand`](#method.consume_operand) for `__rax`, but
    /// when the tail computes into `__rax` without being a plain `set`, the
    /// computation is retargeted into a fresh scratch slot instead.
    fn consume_rvalue(&mut self) -> (String, Option<Scratch>) {
        if self.can_avoid_indirection(RAX) {
            match self.pop() {
                Instruction::Set { src, .. } => (src, None),
                _ => unreachable!(),
            }
        } else if self.opt_level >= 1 && self.top_writes_rax() {
            let scratch = self.alloc_scratch(RBX);
            self.set_to_rax(&scratch.name);
            (scratch.name.clone(), Some(scratch))
        } else {
            (RAX.to_string(), None)
        }
    }

    fn emit_function(&mut self, def: &FuncDef<'i>) -> Result<()> {
        self.curr = Some(Function::new(def.name, &def.params));
        self.loop_end = None;
        self.gotos.clear();
        self.emit_stmt(&def.body)?;
        // Implicit return: needed when the body has not returned yet, or a
        // loop body abuts the function end and its exit jumps would
        // otherwise point past the last instruction.
        if self.loop_end == Some(self.here()) || !self.ends_terminated() {
            self.push(set(RAX, "null"));
            self.push_ret();
        }
        let func = self.curr.take().unwrap();
        for (label, span) in self.gotos.drain(..) {
            if !func.labels.contains_key(label) {
                return Err(new_parser_error(
                    span,
                    format!("goto to unknown label `{}`", label),
                ));
            }
        }
        if let Some(existing) = self.find_function_mut(&func.name) {
            // A forward declaration may already carry call edges; keep them.
            let callers = std::mem::replace(&mut existing.callers, HashSet::new());
            *existing = func;
            existing.callers.extend(callers);
        } else {
            self.functions.push(func);
        }
        Ok(())
    }

    fn ends_terminated(&self) -> bool {
        matches!(
            self.peek(),
            Some(Instruction::Return { .. }) | Some(Instruction::End)
        )
    }

    fn push_ret(&mut self) {
        if self.opt_level >= 2 && self.func().name == "main" {
            // The value set up for the return is dead; `main` just ends.
            if matches!(self.peek(), Some(Instruction::Set { dest, .. }) if dest == RAX) {
                self.pop();
            }
            self.push(Instruction::End);
        } else {
            let func_name = self.func().name.clone();
            self.push(Instruction::Return { func_name });
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt<'i>) -> Result<()> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.emit_stmt(s)?;
                }
            }
            Stmt::Decl(decls) => {
                for d in decls {
                    self.emit_local_decl(d)?;
                }
            }
            Stmt::Expr(e) => self.emit_expr(e)?,
            Stmt::If { cond, then, els } => self.emit_if(cond, then, els.as_deref())?,
            Stmt::While { cond, body } => {
                self.start_loop(Some(cond))?;
                self.emit_stmt(body)?;
                self.end_loop();
            }
            Stmt::DoWhile { body, cond } => {
                // Jump over the condition on the first iteration.
                self.push(Instruction::RelativeJump {
                    offset: None,
                    func_start: 0,
                    cond: JumpCondition::always(),
                });
                let skip = self.here() - 1;
                self.start_loop(Some(cond))?;
                let body_start = self.here();
                self.patch_jump(skip, body_start);
                self.emit_stmt(body)?;
                self.end_loop();
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.emit_stmt(init)?;
                }
                self.start_loop(cond.as_ref())?;
                self.emit_stmt(body)?;
                if let Some(step) = step {
                    self.emit_expr(step)?;
                }
                self.end_loop();
            }
            Stmt::Break(span) => {
                if self.loops.is_empty() {
                    return Err(new_parser_error(
                        span.clone(),
                        "break outside of a loop".to_owned(),
                    ));
                }
                self.push(Instruction::RelativeJump {
                    offset: None,
                    func_start: 0,
                    cond: JumpCondition::always(),
                });
                let at = self.here() - 1;
                self.loops.last_mut().unwrap().end_jumps.push(at);
            }
            Stmt::Continue(span) => {
                let start = match self.loops.last() {
                    Some(lp) => lp.start,
                    None => {
                        return Err(new_parser_error(
                            span.clone(),
                            "continue outside of a loop".to_owned(),
                        ));
                    }
                };
                self.push(Instruction::RelativeJump {
                    offset: Some(start),
                    func_start: 0,
                    cond: JumpCondition::always(),
                });
            }
            Stmt::Return { value } => {
                match value {
                    Some(e) => self.emit_expr(e)?,
                    None => self.push(set(RAX, "null")),
                }
                self.push_ret();
            }
            Stmt::Label { name, stmt, span } => {
                let at = self.here();
                if self
                    .func_mut()
                    .labels
                    .insert(name.to_string(), at)
                    .is_some()
                {
                    return Err(new_parser_error(
                        span.clone(),
                        format!("duplicate label `{}`", name),
                    ));
                }
                self.emit_stmt(stmt)?;
            }
            Stmt::Goto { label, span } => {
                self.gotos.push((*label, span.clone()));
                self.push(Instruction::Goto {
                    label: label.to_string(),
                    offset: None,
                    func_start: 0,
                });
            }
            Stmt::Empty => {}
        }
        Ok(())
    }

    fn emit_local_decl(&mut self, d: &VarDecl<'i>) -> Result<()> {
        self.func_mut().locals.push(d.name.to_string());
        if let Some(init) = &d.init {
            let mangled = format!("_{}_{}", d.name, self.func().name);
            self.emit_expr(init)?;
            self.set_to_rax(&mangled);
        }
        Ok(())
    }

    fn add_global(&mut self, d: &VarDecl<'i>) -> Result<()> {
        if d.init.is_some() {
            return Err(new_parser_error(
                d.span.clone(),
                "global initializers are not supported".to_owned(),
            ));
        }
        self.globals.push(d.name.to_string());
        Ok(())
    }

    fn emit_if(&mut self, cond: &Expr<'i>, then: &Stmt<'i>, els: Option<&Stmt<'i>>) -> Result<()> {
        self.emit_expr(cond)?;
        self.push_body_jump();
        let guard = self.here() - 1;
        self.emit_stmt(then)?;
        let skip_else = match els {
            Some(_) => {
                self.push(Instruction::RelativeJump {
                    offset: None,
                    func_start: 0,
                    cond: JumpCondition::always(),
                });
                Some(self.here() - 1)
            }
            None => None,
        };
        let after_then = self.here();
        self.patch_jump(guard, after_then);
        if let Some(els) = els {
            self.emit_stmt(els)?;
            let after_else = self.here();
            self.patch_jump(skip_else.unwrap(), after_else);
        }
        Ok(())
    }

    fn start_loop(&mut self, cond: Option<&Expr<'i>>) -> Result<()> {
        self.loops.push(Loop {
            start: self.here(),
            end_jumps: Vec::new(),
        });
        if let Some(cond) = cond {
            self.emit_expr(cond)?;
            self.push_body_jump();
            let at = self.here() - 1;
            self.loops.last_mut().unwrap().end_jumps.push(at);
        }
        Ok(())
    }

    fn end_loop(&mut self) {
        let lp = self.loops.pop().unwrap();
        self.push(Instruction::RelativeJump {
            offset: Some(lp.start),
            func_start: 0,
            cond: JumpCondition::always(),
        });
        let after = self.here();
        self.loop_end = Some(after);
        for at in lp.end_jumps {
            self.patch_jump(at, after);
        }
    }

    /// Jump over a loop/if body when its condition is false. A trailing
    /// invertible comparison is folded into the jump condition.
    fn push_body_jump(&mut self) {
        let invert = self.opt_level >= 1
            && matches!(self.peek(), Some(Instruction::BinaryOp { op, .. }) if ops::inverse_op(op).is_some());
        let cond = if invert {
            match self.pop() {
                Instruction::BinaryOp {
                    left, right, op, ..
                } => JumpCondition::new(ops::inverse_op(&op).unwrap(), left, right),
                _ => unreachable!(),
            }
        } else {
            JumpCondition::new("==", RAX, "0")
        };
        self.push(Instruction::RelativeJump {
            offset: None,
            func_start: 0,
            cond,
        });
    }

    fn resolve_ident(&self, name: &str, span: Span<'i>) -> Result<String> {
        if self.func().locals.iter().any(|l| l == name) {
            Ok(format!("_{}_{}", name, self.func().name))
        } else if self.globals.iter().any(|g| g == name) {
            Ok(name.to_string())
        } else if self.find_function(name).is_some() {
            Ok(name.to_string())
        } else if ops::SPECIAL_VARS.contains(&name) {
            Ok(format!("@{}", name))
        } else {
            Err(new_parser_error(
                span,
                format!("unknown variable `{}`", name),
            ))
        }
    }

    /// Resolution for assignment targets: functions are not assignable.
    fn resolve_var(&self, name: &str, span: Span<'i>) -> Result<String> {
        if self.func().locals.iter().any(|l| l == name) {
            Ok(format!("_{}_{}", name, self.func().name))
        } else if self.globals.iter().any(|g| g == name) {
            Ok(name.to_string())
        } else if ops::SPECIAL_VARS.contains(&name) {
            Ok(format!("@{}", name))
        } else {
            Err(new_parser_error(
                span,
                format!("unknown variable `{}`", name),
            ))
        }
    }

    fn emit_expr(&mut self, expr: &Expr<'i>) -> Result<()> {
        match expr {
            Expr::Num { text, .. } => self.push(set(RAX, *text)),
            Expr::Str { text, .. } => self.push(set(RAX, format!("\"{}\"", text))),
            Expr::Ident { name, span } => {
                let varname = self.resolve_ident(name, span.clone())?;
                self.push(set(RAX, varname));
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let left_slot = self.alloc_scratch(RBX);
                self.emit_expr(lhs)?;
                self.set_to_rax(&left_slot.name);
                self.emit_expr(rhs)?;
                let right = self.consume_operand(RAX);
                let left = self.consume_operand(&left_slot.name);
                self.push(binary_op(RAX, left, right, *op));
                self.release_scratch(RBX, left_slot);
            }
            Expr::Unary { op, expr, .. } => self.emit_unary(op, expr)?,
            Expr::IncDec {
                op,
                name,
                postfix,
                span,
            } => {
                let varname = self.resolve_var(name, span.clone())?;
                let binop = &op[..1];
                if *postfix {
                    if self.opt_level < 3 {
                        self.push(set(RAX, varname.clone()));
                    }
                    self.push(binary_op(varname.clone(), varname, "1", binop));
                } else {
                    self.push(binary_op(varname.clone(), varname.clone(), "1", binop));
                    if self.opt_level < 3 {
                        self.push(set(RAX, varname));
                    }
                }
            }
            Expr::Assign {
                name,
                op,
                value,
                span,
            } => {
                self.emit_expr(value)?;
                let varname = self.resolve_var(name, span.clone())?;
                if *op == "=" {
                    self.set_to_rax(&varname);
                } else {
                    let binop = &op[..op.len() - 1];
                    let (src, scratch) = self.consume_rvalue();
                    self.push(binary_op(varname.clone(), varname.clone(), src, binop));
                    if let Some(scratch) = scratch {
                        self.release_scratch(RBX, scratch);
                    }
                    if self.opt_level < 3 {
                        self.push(set(RAX, varname));
                    }
                }
            }
            Expr::Call { name, args, span } => self.emit_call(name, args, span.clone())?,
        }
        Ok(())
    }

    fn emit_unary(&mut self, op: &str, expr: &Expr<'i>) -> Result<()> {
        match op {
            "+" => self.emit_expr(expr)?,
            "!" => {
                self.emit_expr(expr)?;
                let invert = self.opt_level >= 1
                    && matches!(self.peek(), Some(Instruction::BinaryOp { op, .. }) if ops::inverse_op(op).is_some());
                if invert {
                    match self.pop() {
                        Instruction::BinaryOp {
                            dest,
                            left,
                            right,
                            op,
                        } => {
                            let inv = ops::inverse_op(&op).unwrap();
                            self.push(binary_op(dest, left, right, inv));
                        }
                        _ => unreachable!(),
                    }
                } else {
                    self.push(binary_op(RAX, RAX, "0", "=="));
                }
            }
            "-" | "~" => {
                self.emit_expr(expr)?;
                self.push(Instruction::UnaryOp {
                    dest: RAX.to_string(),
                    src: RAX.to_string(),
                    op: op.to_string(),
                });
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    fn expect_arity(
        &self,
        args: &[Expr<'i>],
        arity: usize,
        span: Span<'i>,
        name: &str,
    ) -> Result<()> {
        if args.len() == arity {
            Ok(())
        } else {
            Err(new_parser_error(
                span,
                format!(
                    "`{}` takes {} argument(s), got {}",
                    name,
                    arity,
                    args.len()
                ),
            ))
        }
    }

    fn string_arg(&self, arg: &Expr<'i>, builtin: &str) -> Result<&'i str> {
        match arg {
            Expr::Str { text, .. } => Ok(text),
            _ => Err(new_parser_error(
                arg.span(),
                format!("non-string argument to {}", builtin),
            )),
        }
    }

    /// Evaluate one argument for a single-operand pseudo-function.
    fn unary_builtin_arg(
        &mut self,
        args: &[Expr<'i>],
        span: Span<'i>,
        name: &str,
    ) -> Result<String> {
        self.expect_arity(args, 1, span, name)?;
        self.emit_expr(&args[0])?;
        Ok(self.consume_operand(RAX))
    }

    /// Evaluate two arguments through a uniqued left slot, as for a binary
    /// expression.
    fn binary_builtin_args(
        &mut self,
        name: &str,
        args: &[Expr<'i>],
        span: Span<'i>,
    ) -> Result<(String, String)> {
        self.expect_arity(args, 2, span, name)?;
        let base = format!("__{}_arg0", name);
        let slot = self.alloc_scratch(&base);
        self.emit_expr(&args[0])?;
        self.set_to_rax(&slot.name);
        self.emit_expr(&args[1])?;
        let right = self.consume_operand(RAX);
        let left = self.consume_operand(&slot.name);
        self.release_scratch(&base, slot);
        Ok((left, right))
    }

    /// Evaluate every argument into its own uniqued slot, then fold trailing
    /// slots back into immediates where the stream tail allows it.
    fn pseudofunc_args(&mut self, name: &str, args: &[Expr<'i>]) -> Result<Vec<String>> {
        let mut slots = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            self.emit_expr(arg)?;
            let base = format!("__{}_arg{}", name, i);
            let slot = self.alloc_scratch(&base);
            self.set_to_rax(&slot.name);
            slots.push((base, slot));
        }
        let mut names: Vec<String> = slots.iter().map(|(_, s)| s.name.clone()).collect();
        self.fold_trailing_args(&mut names);
        for (base, slot) in slots.into_iter().rev() {
            self.release_scratch(&base, slot);
        }
        Ok(names)
    }

    /// Scan the argument list in reverse, popping `set` instructions off the
    /// stream tail and substituting their sources; stop at the first slot
    /// that is not on the tail, preserving stream order for the rest.
    fn fold_trailing_args(&mut self, names: &mut [String]) {
        for i in (0..names.len()).rev() {
            if self.can_avoid_indirection(&names[i]) {
                names[i] = match self.pop() {
                    Instruction::Set { src, .. } => src,
                    _ => unreachable!(),
                };
            } else {
                break;
            }
        }
    }

    fn emit_call(&mut self, name: &str, args: &[Expr<'i>], span: Span<'i>) -> Result<()> {
        match name {
            "asm" => {
                self.expect_arity(args, 1, span, name)?;
                let code = self.string_arg(&args[0], "asm")?;
                self.push(Instruction::RawAsm {
                    code: code.to_string(),
                });
            }
            "print" | "printd" => {
                let val = self.unary_builtin_arg(args, span, name)?;
                self.push(Instruction::Print { val });
            }
            "printflush" => {
                let val = self.unary_builtin_arg(args, span, name)?;
                self.push(Instruction::PrintFlush { val });
            }
            "end" => {
                self.expect_arity(args, 0, span, name)?;
                self.push(Instruction::End);
            }
            "radar" => self.emit_radar(args, span)?,
            "sensor" => self.emit_sensor(args, span)?,
            "enable" => {
                let (obj, enabled) = self.binary_builtin_args("enable", args, span)?;
                self.push(Instruction::Enable { obj, enabled });
            }
            "shoot" => {
                self.expect_arity(args, 4, span, name)?;
                let names = self.pseudofunc_args("shoot", args)?;
                match &names[..] {
                    [obj, x, y, shoot] => self.push(Instruction::Shoot {
                        obj: obj.clone(),
                        x: x.clone(),
                        y: y.clone(),
                        shoot: shoot.clone(),
                    }),
                    _ => unreachable!(),
                }
            }
            "get_link" => {
                self.expect_arity(args, 1, span, name)?;
                self.emit_expr(&args[0])?;
                let index = self.consume_operand(RAX);
                self.push(Instruction::GetLink {
                    dest: RAX.to_string(),
                    index,
                });
            }
            "read" => {
                let (cell, index) = self.binary_builtin_args("read", args, span)?;
                self.push(Instruction::Read {
                    dest: RAX.to_string(),
                    cell,
                    index,
                });
            }
            "write" => {
                self.expect_arity(args, 3, span, name)?;
                let names = self.pseudofunc_args("write", args)?;
                match &names[..] {
                    [src, cell, index] => self.push(Instruction::Write {
                        src: src.clone(),
                        cell: cell.clone(),
                        index: index.clone(),
                    }),
                    _ => unreachable!(),
                }
            }
            "drawflush" => {
                let display = self.unary_builtin_arg(args, span, name)?;
                self.push(Instruction::DrawFlush { display });
            }
            _ => {
                if let Some(cmd) = ops::draw_command(name) {
                    if args.len() > 6 {
                        return Err(new_parser_error(
                            span,
                            format!("`{}` takes at most 6 arguments, got {}", name, args.len()),
                        ));
                    }
                    let draw_args = self.pseudofunc_args(name, args)?;
                    self.push(Instruction::Draw {
                        cmd,
                        args: draw_args,
                    });
                } else if ops::FUNC_BINARY_OPS.contains(&name) {
                    let (left, right) = self.binary_builtin_args(name, args, span)?;
                    self.push(binary_op(RAX, left, right, name));
                } else if ops::FUNC_UNARY_OPS.contains(&name) {
                    self.expect_arity(args, 1, span, name)?;
                    self.emit_expr(&args[0])?;
                    let src = self.consume_operand(RAX);
                    self.push(Instruction::UnaryOp {
                        dest: RAX.to_string(),
                        src,
                        op: name.to_string(),
                    });
                } else {
                    self.emit_user_call(name, args, span)?;
                }
            }
        }
        Ok(())
    }

    fn emit_radar(&mut self, args: &[Expr<'i>], span: Span<'i>) -> Result<()> {
        self.expect_arity(args, 6, span, "radar")?;
        // The three target filters and the sort key must be literal words in
        // the rendered instruction; only the source building and the index
        // travel through scratch slots.
        let target1 = self.string_arg(&args[1], "radar")?;
        let target2 = self.string_arg(&args[2], "radar")?;
        let target3 = self.string_arg(&args[3], "radar")?;
        let sort = self.string_arg(&args[4], "radar")?;

        let src_base = "__radar_arg0";
        let src_slot = self.alloc_scratch(src_base);
        self.emit_expr(&args[0])?;
        self.set_to_rax(&src_slot.name);

        let index_base = "__radar_arg5";
        let index_slot = self.alloc_scratch(index_base);
        self.emit_expr(&args[5])?;
        self.set_to_rax(&index_slot.name);

        let mut names = vec![src_slot.name.clone(), index_slot.name.clone()];
        self.fold_trailing_args(&mut names);
        self.release_scratch(index_base, index_slot);
        self.release_scratch(src_base, src_slot);

        let index = names.pop().unwrap();
        let src = names.pop().unwrap();
        self.push(Instruction::Radar {
            dest: RAX.to_string(),
            src,
            target1: target1.to_string(),
            target2: target2.to_string(),
            target3: target3.to_string(),
            sort: sort.to_string(),
            index,
        });
        Ok(())
    }

    fn emit_sensor(&mut self, args: &[Expr<'i>], span: Span<'i>) -> Result<()> {
        self.expect_arity(args, 2, span, "sensor")?;
        let prop = self.string_arg(&args[1], "sensor")?;
        let base = "__sensor_arg0";
        let slot = self.alloc_scratch(base);
        self.emit_expr(&args[0])?;
        self.set_to_rax(&slot.name);
        let src = self.consume_operand(&slot.name);
        self.release_scratch(base, slot);
        self.push(Instruction::Sensor {
            dest: RAX.to_string(),
            src,
            prop: prop.to_string(),
        });
        Ok(())
    }

    fn emit_user_call(&mut self, name: &str, args: &[Expr<'i>], span: Span<'i>) -> Result<()> {
        let params = match self.find_function(name) {
            Some(f) => f.params.clone(),
            None => {
                return Err(new_parser_error(
                    span,
                    format!("`{}` is not a function", name),
                ));
            }
        };
        for (param, arg) in params.iter().zip(args) {
            self.emit_expr(arg)?;
            self.set_to_rax(&format!("_{}_{}", param, name));
        }
        if self.opt_level >= 2 {
            let caller = self.func().name.clone();
            self.func_mut().callees.insert(name.to_string());
            if let Some(callee) = self.find_function_mut(name) {
                callee.callers.insert(caller);
            }
        }
        // The return address: the instruction after the call, relative to
        // this function's start. The linker adds the caller's start.
        let ret = self.here() + 2;
        self.push(set(format!("__retaddr_{}", name), ret.to_string()));
        self.push(Instruction::FunctionCall {
            func_name: name.to_string(),
            func_start: None,
        });
        Ok(())
    }
}
