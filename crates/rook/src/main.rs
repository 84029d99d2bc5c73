use rook_compiler::{compile, disasm};
use rook_core::vm::Vm;
use std::process;

const USAGE: &str = "usage: rook [-v] [-e code] [script]";

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut script_file: Option<String> = None;
    let mut exec_chunks: Vec<String> = Vec::new();
    let mut show_version = false;

    // Parse arguments
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-v" => {
                show_version = true;
                i += 1;
            }
            "-e" => {
                if i + 1 >= args.len() {
                    eprintln!("rook: '-e' needs argument");
                    process::exit(64);
                }
                exec_chunks.push(args[i + 1].clone());
                i += 2;
            }
            arg => {
                if arg.starts_with('-') {
                    // Combined form like -e"code"
                    if let Some(code) = arg.strip_prefix("-e").filter(|c| !c.is_empty()) {
                        exec_chunks.push(code.to_string());
                        i += 1;
                    } else {
                        eprintln!("rook: unrecognized option '{arg}'");
                        eprintln!("{USAGE}");
                        process::exit(64);
                    }
                } else {
                    script_file = Some(arg.to_string());
                    if i + 1 < args.len() {
                        eprintln!("rook: unexpected argument '{}'", args[i + 1]);
                        process::exit(64);
                    }
                    i += 1;
                }
            }
        }
    }

    if show_version {
        println!("Rook 0.1.0");
    }

    if exec_chunks.is_empty() && script_file.is_none() {
        if !show_version {
            eprintln!("{USAGE}");
            process::exit(64);
        }
        return;
    }

    // All chunks share one VM, so selectors and globals resolve consistently
    // across them.
    let mut vm = Vm::new();
    let mut failed = false;

    for chunk in &exec_chunks {
        failed |= !compile_and_list(&mut vm, chunk.as_bytes());
    }

    if let Some(path) = &script_file {
        match std::fs::read(path) {
            Ok(source) => {
                failed |= !compile_and_list(&mut vm, &source);
            }
            Err(err) => {
                eprintln!("rook: cannot read '{path}': {err}");
                process::exit(66);
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

/// Compile one chunk; print its listing on success or its diagnostics on
/// failure. Returns whether compilation succeeded.
fn compile_and_list(vm: &mut Vm, source: &[u8]) -> bool {
    match compile(vm, source) {
        Ok(func) => {
            print!("{}", disasm::disassemble(vm, func));
            true
        }
        Err(errors) => {
            for error in &errors.0 {
                eprintln!("{error}");
            }
            false
        }
    }
}
