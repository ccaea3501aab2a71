#[macro_use]
extern crate clap;

use std::fs;
use std::path::Path;
use std::process;
use std::time::Instant;

use clap::Arg;

use ortavm::{constants, NoNativeLoader, Processor, Program};
use util::expand_home;
use xasm::{AssemblyOptions, Preprocessor};

/// Standard prelude installed to `~/.orta/std.x` on first run, so programs
/// can `#include <std.x>`.
const STD_X: &str = "\
; Orta standard prelude
#define TRUE 1
#define FALSE 0
#define NULLPTR 0
#define STDOUT 1
#define STDERR 2
";

struct Options {
    no_preproc: bool,
    keep_preprocessed: bool,
    disable_compile: bool,
    only_compile: bool,
    debug: bool,
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Program to run (*.x source or *.xbin image)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("nopreproc")
                .long("nopreproc")
                .help("Disable source file preprocessing"),
        )
        .arg(
            Arg::with_name("notdeletepreprocessed")
                .long("notdeletepreprocessed")
                .help("Keep the intermediate .pre.x file"),
        )
        .arg(
            Arg::with_name("disable-compile")
                .long("disable-compile")
                .help("Do not write a .xbin after running a source file"),
        )
        .arg(
            Arg::with_name("only-compile")
                .long("only-compile")
                .help("Compile to .xbin without executing"),
        )
        .arg(
            Arg::with_name("debug")
                .long("debug")
                .help("Print stack and register state after termination"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let options = Options {
        no_preproc: matches.is_present("nopreproc"),
        keep_preprocessed: matches.is_present("notdeletepreprocessed"),
        disable_compile: matches.is_present("disable-compile"),
        only_compile: matches.is_present("only-compile"),
        debug: matches.is_present("debug"),
    };

    process::exit(orta_main(input, &options));
}

fn orta_main(input: &str, options: &Options) -> i32 {
    if let Err(message) = install_std() {
        eprintln!("{}{}", constants::LOG_PREFIX, message);
        return 1;
    }

    let path = Path::new(input);
    let is_image = input.ends_with(".xbin");

    let (program, assembly) = if is_image {
        match xbin::read_file(path) {
            Ok(program) => (program, AssemblyOptions::default()),
            Err(err) => {
                eprintln!(
                    "{}Failed to load bytecode file \"{}\": {}",
                    constants::LOG_PREFIX,
                    input,
                    err
                );
                return 1;
            }
        }
    } else if input.ends_with(".x") {
        match load_source(path, options) {
            Ok(loaded) => loaded,
            Err(message) => {
                eprintln!("{}{}", constants::LOG_PREFIX, message);
                return 1;
            }
        }
    } else {
        eprintln!(
            "{}Unsupported file format, expected .x or .xbin",
            constants::LOG_PREFIX
        );
        return 1;
    };

    let mut exit_code = 0;
    if !options.only_compile {
        let capacity = assembly
            .stack_capacity
            .unwrap_or(constants::DEFAULT_STACK_CAPACITY);
        let entry = assembly.entry.as_deref().unwrap_or(constants::DEFAULT_ENTRY);
        let mut processor = Processor::new(capacity, Box::new(NoNativeLoader));

        let started = Instant::now();
        match processor.run_from(&program, entry) {
            Ok(code) => exit_code = code,
            Err(diagnostic) => {
                eprintln!("{}{}", constants::LOG_PREFIX, diagnostic);
                return 1;
            }
        }

        if options.debug {
            println!("Execution completed in {:?}", started.elapsed());
            print_state(&processor);
        }
    }

    if !is_image && !options.disable_compile {
        let image_path = path.with_extension("xbin");
        if let Err(err) = xbin::write_file(&image_path, &program) {
            eprintln!(
                "{}Failed to create bytecode file \"{}\": {}",
                constants::LOG_PREFIX,
                image_path.display(),
                err
            );
        }
    }

    exit_code
}

fn load_source(path: &Path, options: &Options) -> Result<(Program, AssemblyOptions), String> {
    if options.no_preproc {
        let program = xasm::assemble_file_raw(path).map_err(|err| err.to_string())?;
        return Ok((program, AssemblyOptions::default()));
    }

    let mut preprocessor = Preprocessor::new();
    let (text, assembly) = preprocessor
        .preprocess_file(path)
        .map_err(|err| err.to_string())?;

    let pre_path = path.with_extension("pre.x");
    fs::write(&pre_path, &text)
        .map_err(|err| format!("Cannot write \"{}\": {}", pre_path.display(), err))?;

    let result = xasm::assemble_source(&text, &path.to_string_lossy()).map_err(|err| err.to_string());
    if !options.keep_preprocessed {
        let _ = fs::remove_file(&pre_path);
    }

    Ok((result?, assembly))
}

fn install_std() -> Result<(), String> {
    let dir = expand_home("~/.orta/").ok_or("Cannot resolve the home directory")?;
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .map_err(|err| format!("Cannot create \"{}\": {}", dir.display(), err))?;
    }
    let std_path = dir.join("std.x");
    if !std_path.exists() {
        fs::write(&std_path, STD_X)
            .map_err(|err| format!("Cannot install \"{}\": {}", std_path.display(), err))?;
    }
    Ok(())
}

fn print_state(processor: &Processor) {
    println!("\nStack ({} items):", processor.stack().count());
    for (index, word) in processor.stack().items().iter().enumerate() {
        println!("[{}] {}: {}", index, word.type_name(), word);
    }

    println!("\nRegisters:");
    for (id, word) in processor.registers().iter() {
        println!("[{:>3}] {}: {}", id, word.type_name(), word);
    }
}
