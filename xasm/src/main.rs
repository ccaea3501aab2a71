#[macro_use]
extern crate clap;

use std::path::{Path, PathBuf};
use std::process;

use clap::Arg;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the output file to write to"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");

    if let Err(message) = xasm_main(input, output) {
        eprintln!("{}", message);
        process::exit(1);
    }
}

fn xasm_main(input: &str, output: Option<&str>) -> Result<(), String> {
    let input_path = Path::new(input);

    let (program, _options) = xasm::assemble_file(input_path)
        .map_err(|err| format!("Assembling \"{}\" failed: {}", input, err))?;

    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.with_extension("xbin"));

    xbin::write_file(&output_path, &program)
        .map_err(|err| format!("Writing \"{}\" failed: {}", output_path.display(), err))?;

    Ok(())
}
