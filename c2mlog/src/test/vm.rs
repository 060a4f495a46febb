//! A small interpreter over the rendered instruction text, enough to check
//! the behavior of compiled programs: `set` (including `@counter` for
//! returns), the integer `op`s, `jump`, `print` and `end`.

use std::collections::{BTreeMap, HashMap};

pub struct Machine {
    vars: HashMap<String, i64>,
    printed: Vec<String>,
}

impl Machine {
    pub fn run(program: &str) -> Machine {
        let lines: Vec<Vec<&str>> = program
            .lines()
            .map(|line| line.split_whitespace().collect())
            .collect();
        let mut machine = Machine {
            vars: HashMap::new(),
            printed: Vec::new(),
        };
        let mut pc = 0usize;
        let mut steps = 0usize;
        while pc < lines.len() {
            steps += 1;
            assert!(steps < 100_000, "program did not terminate");
            let line = &lines[pc];
            pc += 1;
            match line[0] {
                "set" => {
                    let value = machine.value(line[2]);
                    if line[1] == "@counter" {
                        pc = value as usize;
                    } else {
                        machine.vars.insert(line[1].to_string(), value);
                    }
                }
                "op" => {
                    let result =
                        Machine::apply(line[1], machine.value(line[3]), machine.value(line[4]));
                    machine.vars.insert(line[2].to_string(), result);
                }
                "jump" => {
                    let target: usize = line[1].parse().unwrap();
                    if Machine::apply(line[2], machine.value(line[3]), machine.value(line[4])) != 0
                    {
                        pc = target;
                    }
                }
                "print" => {
                    if line[1].starts_with('"') {
                        machine.printed.push(line[1].trim_matches('"').to_string());
                    } else {
                        machine.printed.push(machine.value(line[1]).to_string());
                    }
                }
                "printflush" => {}
                "noop" => {}
                "end" => break,
                other => panic!("instruction not supported by the test machine: {}", other),
            }
        }
        machine
    }

    fn value(&self, token: &str) -> i64 {
        if token == "null" {
            0
        } else if let Ok(number) = token.parse::<i64>() {
            number
        } else {
            self.vars.get(token).copied().unwrap_or(0)
        }
    }

    fn apply(op: &str, left: i64, right: i64) -> i64 {
        match op {
            "add" => left + right,
            "sub" => left - right,
            "mul" => left * right,
            "div" => left / right,
            "mod" => left % right,
            "equal" => (left == right) as i64,
            "notEqual" => (left != right) as i64,
            "lessThan" => (left < right) as i64,
            "lessThanEq" => (left <= right) as i64,
            "greaterThan" => (left > right) as i64,
            "greaterThanEq" => (left >= right) as i64,
            "and" => left & right,
            "or" => left | right,
            "xor" => left ^ right,
            "not" => !left,
            "shl" => left << right,
            "shr" => left >> right,
            "pow" => left.pow(right as u32),
            "max" => left.max(right),
            "min" => left.min(right),
            "abs" => left.abs(),
            other => panic!("op not supported by the test machine: {}", other),
        }
    }

    pub fn var(&self, name: &str) -> i64 {
        self.value(name)
    }

    pub fn printed(&self) -> &[String] {
        &self.printed[..]
    }

    /// Every non-scratch variable, for comparing runs across optimization
    /// levels.
    pub fn user_vars(&self) -> BTreeMap<String, i64> {
        self.vars
            .iter()
            .filter(|(name, _)| !name.starts_with("__"))
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}
