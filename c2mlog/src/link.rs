//! Layout and link resolution.
//!
//! Functions are laid out sequentially after a short preamble, in the order
//! their records were created. Once every function has its absolute start
//! offset, all symbolic targets (relative jumps, calls, gotos and the
//! caller-relative return-address literals) are rewritten to absolute
//! instruction indices, and the program is rendered one instruction per
//! line.

use std::collections::{HashMap, HashSet};

use mlog::instructions::Instruction;

use crate::compiler::Compiler;

impl Compiler<'_> {
    /// Resolve every symbolic target and render the final program.
    pub fn link(mut self) -> String {
        if self.opt_level >= 2 {
            self.sweep_unreachable();
        }

        let mut preamble = if self.opt_level >= 2 && self.functions.len() == 1 {
            // With `main` alone and ending in `end`, the whole preamble
            // collapses to the initial jump.
            vec![Instruction::FunctionCall {
                func_name: "main".to_string(),
                func_start: None,
            }]
        } else {
            vec![
                Instruction::Set {
                    dest: "__retaddr_main".to_string(),
                    src: "2".to_string(),
                },
                Instruction::FunctionCall {
                    func_name: "main".to_string(),
                    func_start: None,
                },
                Instruction::End,
            ]
        };

        let mut offset = preamble.len();
        for function in &mut self.functions {
            function.start = offset;
            offset += function.instructions.len();
        }

        let starts: HashMap<String, usize> = self
            .functions
            .iter()
            .map(|f| (f.name.clone(), f.start))
            .collect();

        for instruction in &mut preamble {
            if let Instruction::FunctionCall { func_start, .. } = instruction {
                *func_start = Some(starts["main"]);
            }
        }

        for function in &mut self.functions {
            let start = function.start;
            let labels = function.labels.clone();
            for instruction in &mut function.instructions {
                match instruction {
                    Instruction::RelativeJump { func_start, .. } => *func_start = start,
                    Instruction::FunctionCall {
                        func_name,
                        func_start,
                    } => *func_start = Some(starts[func_name.as_str()]),
                    Instruction::Goto {
                        label,
                        offset,
                        func_start,
                    } => {
                        *offset = Some(labels[label.as_str()]);
                        *func_start = start;
                    }
                    Instruction::Set { dest, src } if dest.starts_with("__retaddr") => {
                        if let Ok(local) = src.parse::<usize>() {
                            *src = (local + start).to_string();
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut out: Vec<String> = preamble.iter().map(Instruction::to_string).collect();
        for function in &self.functions {
            out.extend(function.instructions.iter().map(Instruction::to_string));
        }
        out.join("\n")
    }

    /// Drop every function without a (transitive) caller path back to the
    /// program entry.
    fn sweep_unreachable(&mut self) {
        if let Some(main) = self.find_function_mut("main") {
            main.callers.insert("__start".to_string());
        }
        let reachable: HashSet<String> = self
            .functions
            .iter()
            .filter(|f| self.is_reachable(&f.name, &mut HashSet::new()))
            .map(|f| f.name.clone())
            .collect();
        self.functions.retain(|f| reachable.contains(&f.name));
    }

    /// `visited` guards against call cycles.
    fn is_reachable(&self, name: &str, visited: &mut HashSet<String>) -> bool {
        if !visited.insert(name.to_string()) {
            return false;
        }
        match self.find_function(name) {
            Some(function) => function
                .callers
                .iter()
                .any(|caller| caller == "__start" || self.is_reachable(caller, visited)),
            None => false,
        }
    }
}
