use std::{env, fs, io::IsTerminal as _, process::ExitCode};

use vismut::{compile, report};

fn main() -> ExitCode {
    report::set_color_enabled(std::io::stderr().is_terminal());

    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("usage: vismut <source-file>");
        return ExitCode::FAILURE;
    };

    let source = match fs::read(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: could not read {file_path}: {err}");
            return ExitCode::from(vismut::ErrorKind::Io.code());
        }
    };

    let compilation = match compile(&source, file_path) {
        Ok(compilation) => compilation,
        Err(err) => {
            eprint!("{}", report::render(&source, file_path, &err));
            return ExitCode::from(err.kind.code());
        }
    };

    // Artifacts land next to the input.
    let ast_path = format!("{file_path}.ast.txt");
    if let Err(err) = fs::write(&ast_path, compilation.dump()) {
        eprintln!("error: could not write {ast_path}: {err}");
        return ExitCode::from(vismut::ErrorKind::Io.code());
    }

    let c_text = match compilation.emit_c() {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: emission failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    let c_path = format!("{file_path}.c");
    if let Err(err) = fs::write(&c_path, c_text) {
        eprintln!("error: could not write {c_path}: {err}");
        return ExitCode::from(vismut::ErrorKind::Io.code());
    }

    ExitCode::SUCCESS
}
