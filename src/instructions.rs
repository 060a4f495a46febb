use std::fmt;

use crate::ops;

/// A single Mindustry logic instruction.
///
/// All operands are strings in the VM's global variable namespace: a
/// variable name, an `@`-intrinsic, or a literal. `op` fields hold the
/// source-level token (`+`, `==`, `pow`, ...) and are translated to the
/// logic opcode name on render.
///
/// [`RelativeJump`](#variant.RelativeJump), [`FunctionCall`](#variant.FunctionCall)
/// and [`Goto`](#variant.Goto) are symbolic: their `offset`/`func_start`
/// fields stay unresolved until the linker has laid every function out.
/// Rendering an unresolved jump is a programming error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Placeholder. Renders as `noop`.
    Noop,
    /// Copy a value or load an immediate: `set <dest> <src>`.
    Set { dest: String, src: String },
    /// Arithmetic, comparison or logical operation:
    /// `op <opcode> <dest> <left> <right>`.
    BinaryOp {
        dest: String,
        left: String,
        right: String,
        op: String,
    },
    /// Single-operand operation: `op <opcode> <dest> <src> 0`.
    /// Numeric negation (`-`) renders as `op sub <dest> 0 <src>` since the
    /// VM has no negation opcode.
    UnaryOp { dest: String, src: String, op: String },
    /// Conditional or unconditional jump to `func_start + offset`:
    /// `jump <abs> <cond>`.
    RelativeJump {
        offset: Option<usize>,
        func_start: usize,
        cond: JumpCondition,
    },
    /// Unconditional jump to the start of the named function:
    /// `jump <start> equal 0 0`.
    FunctionCall {
        func_name: String,
        func_start: Option<usize>,
    },
    /// Loads the program counter from the callee's return-address register:
    /// `set @counter __retaddr_<func>`.
    Return { func_name: String },
    /// Jump to a named label inside the same function. `offset` is resolved
    /// from the function's label table at link time.
    Goto {
        label: String,
        offset: Option<usize>,
        func_start: usize,
    },
    /// Terminate the program: `end`.
    End,
    /// `print <val>`.
    Print { val: String },
    /// `printflush <val>`.
    PrintFlush { val: String },
    /// `radar <t1> <t2> <t3> <sort> <src> <index> <dest>`.
    Radar {
        dest: String,
        src: String,
        target1: String,
        target2: String,
        target3: String,
        sort: String,
        index: String,
    },
    /// `sensor <dest> <src> @<prop>`.
    Sensor {
        dest: String,
        src: String,
        prop: String,
    },
    /// `control enabled <obj> <enabled> 0 0 0`.
    Enable { obj: String, enabled: String },
    /// `control shoot <obj> <x> <y> <shoot> 0`.
    Shoot {
        obj: String,
        x: String,
        y: String,
        shoot: String,
    },
    /// `getlink <dest> <index>`.
    GetLink { dest: String, index: String },
    /// `read <dest> <cell> <index>`.
    Read {
        dest: String,
        cell: String,
        index: String,
    },
    /// `write <src> <cell> <index>`.
    Write {
        src: String,
        cell: String,
        index: String,
    },
    /// `draw <cmd> <a0> ... <a5>`, missing arguments padded with `0`.
    Draw { cmd: &'static str, args: Vec<String> },
    /// `drawflush <display>`.
    DrawFlush { display: String },
    /// Verbatim passthrough for `asm("...")` bodies.
    RawAsm { code: String },
}

impl Instruction {
    /// The register this instruction writes, if it has one.
    pub fn dest(&self) -> Option<&str> {
        use Instruction::*;

        match self {
            Set { dest, .. }
            | BinaryOp { dest, .. }
            | UnaryOp { dest, .. }
            | Radar { dest, .. }
            | Sensor { dest, .. }
            | GetLink { dest, .. }
            | Read { dest, .. } => Some(dest),
            _ => None,
        }
    }

    /// Mutable access to the written register, for retargeting peepholes.
    pub fn dest_mut(&mut self) -> Option<&mut String> {
        use Instruction::*;

        match self {
            Set { dest, .. }
            | BinaryOp { dest, .. }
            | UnaryOp { dest, .. }
            | Radar { dest, .. }
            | Sensor { dest, .. }
            | GetLink { dest, .. }
            | Read { dest, .. } => Some(dest),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Noop => write!(f, "noop"),
            Set { dest, src } => write!(f, "set {} {}", dest, src),
            BinaryOp {
                dest,
                left,
                right,
                op,
            } => {
                let opcode = ops::binary_op_name(op).unwrap_or(op);
                write!(f, "op {} {} {} {}", opcode, dest, left, right)
            }
            UnaryOp { dest, src, op } => {
                if op == "-" {
                    write!(f, "op sub {} 0 {}", dest, src)
                } else {
                    let opcode = ops::unary_op_name(op).unwrap_or(op);
                    write!(f, "op {} {} {} 0", opcode, dest, src)
                }
            }
            RelativeJump {
                offset,
                func_start,
                cond,
            } => write!(f, "jump {} {}", func_start + offset.unwrap(), cond),
            FunctionCall { func_start, .. } => {
                write!(f, "jump {} {}", func_start.unwrap(), JumpCondition::always())
            }
            Return { func_name } => write!(f, "set @counter __retaddr_{}", func_name),
            Goto {
                offset, func_start, ..
            } => write!(
                f,
                "jump {} {}",
                func_start + offset.unwrap(),
                JumpCondition::always()
            ),
            End => write!(f, "end"),
            Print { val } => write!(f, "print {}", val),
            PrintFlush { val } => write!(f, "printflush {}", val),
            Radar {
                dest,
                src,
                target1,
                target2,
                target3,
                sort,
                index,
            } => write!(
                f,
                "radar {} {} {} {} {} {} {}",
                target1, target2, target3, sort, src, index, dest
            ),
            Sensor { dest, src, prop } => write!(f, "sensor {} {} @{}", dest, src, prop),
            Enable { obj, enabled } => write!(f, "control enabled {} {} 0 0 0", obj, enabled),
            Shoot { obj, x, y, shoot } => {
                write!(f, "control shoot {} {} {} {} 0", obj, x, y, shoot)
            }
            GetLink { dest, index } => write!(f, "getlink {} {}", dest, index),
            Read { dest, cell, index } => write!(f, "read {} {} {}", dest, cell, index),
            Write { src, cell, index } => write!(f, "write {} {} {}", src, cell, index),
            Draw { cmd, args } => {
                write!(f, "draw {}", cmd)?;
                for i in 0..6 {
                    write!(f, " {}", args.get(i).map(String::as_str).unwrap_or("0"))?;
                }
                Ok(())
            }
            DrawFlush { display } => write!(f, "drawflush {}", display),
            RawAsm { code } => write!(f, "{}", code),
        }
    }
}

/// The `(op, left, right)` condition attached to a jump. `op` is a
/// source-level comparison token; the unconditional jump is the sentinel
/// `0 == 0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JumpCondition {
    pub op: String,
    pub left: String,
    pub right: String,
}

impl JumpCondition {
    pub fn new<L, R>(op: &str, left: L, right: R) -> JumpCondition
    where
        L: Into<String>,
        R: Into<String>,
    {
        JumpCondition {
            op: op.to_string(),
            left: left.into(),
            right: right.into(),
        }
    }

    /// The always-taken condition, `0 == 0`.
    pub fn always() -> JumpCondition {
        JumpCondition::new("==", "0", "0")
    }
}

impl fmt::Display for JumpCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opcode = ops::condition_op_name(&self.op).unwrap_or(&self.op);
        write!(f, "{} {} {}", opcode, self.left, self.right)
    }
}
