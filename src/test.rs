use crate::instructions::*;
use crate::ops;

#[test]
fn render_set() {
    let instr = Instruction::Set {
        dest: "_x_main".to_string(),
        src: "5".to_string(),
    };
    assert_eq!(instr.to_string(), "set _x_main 5");
}

#[test]
fn render_binary_op_translates_token() {
    let instr = Instruction::BinaryOp {
        dest: "__rax".to_string(),
        left: "_a_main".to_string(),
        right: "10".to_string(),
        op: "<".to_string(),
    };
    assert_eq!(instr.to_string(), "op lessThan __rax _a_main 10");
}

#[test]
fn render_named_binary_op_passes_through() {
    let instr = Instruction::BinaryOp {
        dest: "__rax".to_string(),
        left: "2".to_string(),
        right: "8".to_string(),
        op: "pow".to_string(),
    };
    assert_eq!(instr.to_string(), "op pow __rax 2 8");
}

#[test]
fn render_shift_tokens() {
    let shl = Instruction::BinaryOp {
        dest: "x".to_string(),
        left: "x".to_string(),
        right: "1".to_string(),
        op: ">>".to_string(),
    };
    let shr = Instruction::BinaryOp {
        dest: "x".to_string(),
        left: "x".to_string(),
        right: "1".to_string(),
        op: "<<".to_string(),
    };
    assert_eq!(shl.to_string(), "op shl x x 1");
    assert_eq!(shr.to_string(), "op shr x x 1");
}

#[test]
fn render_unary_ops() {
    let not = Instruction::UnaryOp {
        dest: "__rax".to_string(),
        src: "__rax".to_string(),
        op: "~".to_string(),
    };
    assert_eq!(not.to_string(), "op not __rax __rax 0");

    let neg = Instruction::UnaryOp {
        dest: "__rax".to_string(),
        src: "__rax".to_string(),
        op: "-".to_string(),
    };
    assert_eq!(neg.to_string(), "op sub __rax 0 __rax");

    let sqrt = Instruction::UnaryOp {
        dest: "__rax".to_string(),
        src: "16".to_string(),
        op: "sqrt".to_string(),
    };
    assert_eq!(sqrt.to_string(), "op sqrt __rax 16 0");
}

#[test]
fn render_resolved_jumps() {
    let jump = Instruction::RelativeJump {
        offset: Some(9),
        func_start: 3,
        cond: JumpCondition::new(">=", "_i_main", "10"),
    };
    assert_eq!(jump.to_string(), "jump 12 greaterThanEq _i_main 10");

    let call = Instruction::FunctionCall {
        func_name: "main".to_string(),
        func_start: Some(3),
    };
    assert_eq!(call.to_string(), "jump 3 equal 0 0");

    let goto = Instruction::Goto {
        label: "top".to_string(),
        offset: Some(1),
        func_start: 3,
    };
    assert_eq!(goto.to_string(), "jump 4 equal 0 0");
}

#[test]
fn render_return_reads_retaddr() {
    let ret = Instruction::Return {
        func_name: "add".to_string(),
    };
    assert_eq!(ret.to_string(), "set @counter __retaddr_add");
}

#[test]
fn render_control_builtins() {
    let enable = Instruction::Enable {
        obj: "_b_main".to_string(),
        enabled: "0".to_string(),
    };
    assert_eq!(enable.to_string(), "control enabled _b_main 0 0 0 0");

    let shoot = Instruction::Shoot {
        obj: "_b_main".to_string(),
        x: "10".to_string(),
        y: "20".to_string(),
        shoot: "1".to_string(),
    };
    assert_eq!(shoot.to_string(), "control shoot _b_main 10 20 1 0");
}

#[test]
fn render_memory_builtins() {
    let read = Instruction::Read {
        dest: "__rax".to_string(),
        cell: "cell1".to_string(),
        index: "2".to_string(),
    };
    assert_eq!(read.to_string(), "read __rax cell1 2");

    let write = Instruction::Write {
        src: "42".to_string(),
        cell: "cell1".to_string(),
        index: "1".to_string(),
    };
    assert_eq!(write.to_string(), "write 42 cell1 1");

    let link = Instruction::GetLink {
        dest: "_b_main".to_string(),
        index: "0".to_string(),
    };
    assert_eq!(link.to_string(), "getlink _b_main 0");
}

#[test]
fn render_radar_and_sensor() {
    let radar = Instruction::Radar {
        dest: "_t_main".to_string(),
        src: "_b_main".to_string(),
        target1: "enemy".to_string(),
        target2: "any".to_string(),
        target3: "any".to_string(),
        sort: "distance".to_string(),
        index: "0".to_string(),
    };
    assert_eq!(
        radar.to_string(),
        "radar enemy any any distance _b_main 0 _t_main"
    );

    let sensor = Instruction::Sensor {
        dest: "_hp_main".to_string(),
        src: "_t_main".to_string(),
        prop: "health".to_string(),
    };
    assert_eq!(sensor.to_string(), "sensor _hp_main _t_main @health");
}

#[test]
fn render_draw_pads_to_six_args() {
    let draw = Instruction::Draw {
        cmd: "line",
        args: vec![
            "10".to_string(),
            "20".to_string(),
            "30".to_string(),
            "40".to_string(),
        ],
    };
    assert_eq!(draw.to_string(), "draw line 10 20 30 40 0 0");

    let flush = Instruction::DrawFlush {
        display: "display1".to_string(),
    };
    assert_eq!(flush.to_string(), "drawflush display1");
}

#[test]
fn render_misc() {
    assert_eq!(Instruction::Noop.to_string(), "noop");
    assert_eq!(Instruction::End.to_string(), "end");
    let asm = Instruction::RawAsm {
        code: "ubind @mono".to_string(),
    };
    assert_eq!(asm.to_string(), "ubind @mono");
    let print = Instruction::Print {
        val: "\"hi\"".to_string(),
    };
    assert_eq!(print.to_string(), "print \"hi\"");
}

#[test]
fn jump_condition_always() {
    assert_eq!(JumpCondition::always().to_string(), "equal 0 0");
}

#[test]
fn dest_accessors() {
    let mut set = Instruction::Set {
        dest: "__rax".to_string(),
        src: "5".to_string(),
    };
    assert_eq!(set.dest(), Some("__rax"));
    *set.dest_mut().unwrap() = "_x_main".to_string();
    assert_eq!(set.to_string(), "set _x_main 5");

    let jump = Instruction::RelativeJump {
        offset: Some(0),
        func_start: 0,
        cond: JumpCondition::always(),
    };
    assert_eq!(jump.dest(), None);
}

#[test]
fn inverse_op_pairs() {
    for (op, inv) in &[
        ("==", "!="),
        ("!=", "=="),
        ("<", ">="),
        ("<=", ">"),
        (">", "<="),
        (">=", "<"),
    ] {
        assert_eq!(ops::inverse_op(op), Some(*inv));
        assert_eq!(ops::inverse_op(inv), Some(*op));
    }
    assert_eq!(ops::inverse_op("+"), None);
}

#[test]
fn builtin_tables() {
    assert!(ops::is_builtin("print"));
    assert!(ops::is_builtin("pow"));
    assert!(ops::is_builtin("sqrt"));
    assert!(ops::is_builtin("drawlinerect"));
    assert!(!ops::is_builtin("main"));
    assert_eq!(ops::draw_command("drawlinepoly"), Some("linePoly"));
    assert_eq!(ops::draw_command("print"), None);
    assert!(ops::SPECIAL_VARS.contains(&"counter"));
}
