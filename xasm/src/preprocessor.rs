use std::fs;
use std::path::{Path, PathBuf};

use ortavm::constants;
use util::expand_home;

use crate::error::PreprocessError;

/// Program-level settings collected from directives while preprocessing.
/// They apply to the immediate run only and are not persisted in images.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssemblyOptions {
    pub stack_capacity: Option<usize>,
    pub entry: Option<String>,
}

struct Define {
    name: String,
    value: String,
}

/// Line-oriented preprocessor.
///
/// Recognized directives: `#define NAME [VALUE]`, `#include "PATH"` /
/// `#include <PATH>`, `#stack N` and `#entry NAME`. Defines substitute free
/// identifier occurrences outside string literals and comments; a define
/// value is expanded against earlier defines when it is recorded. Includes
/// splice the preprocessed content of the referenced file, searching the
/// current directory, then `~/.orta/`, then any host-supplied paths.
pub struct Preprocessor {
    defines: Vec<Define>,
    include_paths: Vec<PathBuf>,
    include_stack: Vec<PathBuf>,
}

impl Preprocessor {
    pub fn new() -> Preprocessor {
        let mut include_paths = vec![PathBuf::from(".")];
        if let Some(orta_home) = expand_home("~/.orta/") {
            include_paths.push(orta_home);
        }
        Preprocessor {
            defines: Vec::new(),
            include_paths,
            include_stack: Vec::new(),
        }
    }

    pub fn add_include_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.include_paths.push(path.into());
    }

    pub fn add_define(&mut self, name: &str, value: &str) {
        let expanded = self.expand(value);
        self.defines.push(Define {
            name: name.to_owned(),
            value: expanded,
        });
    }

    pub fn preprocess_file(
        &mut self,
        path: &Path,
    ) -> Result<(String, AssemblyOptions), PreprocessError> {
        let mut options = AssemblyOptions::default();
        let mut output = String::new();
        self.process_file(path, &mut options, &mut output)?;
        Ok((output, options))
    }

    fn process_file(
        &mut self,
        path: &Path,
        options: &mut AssemblyOptions,
        output: &mut String,
    ) -> Result<(), PreprocessError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_owned());
        if self.include_stack.contains(&canonical) {
            return Err(PreprocessError::CircularInclude { path: canonical });
        }
        if self.include_stack.len() >= constants::MAX_INCLUDE_DEPTH {
            return Err(PreprocessError::DepthExceeded { path: canonical });
        }

        let text = fs::read_to_string(path).map_err(|source| PreprocessError::Io {
            path: path.to_owned(),
            source,
        })?;

        self.include_stack.push(canonical);
        let result = self.process_source(&text, path, options, output);
        self.include_stack.pop();
        result
    }

    fn process_source(
        &mut self,
        text: &str,
        origin: &Path,
        options: &mut AssemblyOptions,
        output: &mut String,
    ) -> Result<(), PreprocessError> {
        for (number, line) in text.lines().enumerate() {
            let line_no = number + 1;
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                self.process_directive(trimmed, line_no, origin, options, output)?;
            } else {
                output.push_str(&self.expand(line));
                output.push('\n');
            }
        }
        Ok(())
    }

    fn process_directive(
        &mut self,
        directive: &str,
        line: usize,
        origin: &Path,
        options: &mut AssemblyOptions,
        output: &mut String,
    ) -> Result<(), PreprocessError> {
        let bad = || PreprocessError::BadDirective {
            directive: directive.to_owned(),
            line,
        };
        let body = &directive[1..];
        let mut parts = body.splitn(2, char::is_whitespace);
        let keyword = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match keyword {
            "define" => {
                let mut words = rest.splitn(2, char::is_whitespace);
                let name = words.next().filter(|n| !n.is_empty()).ok_or_else(bad)?;
                let value = words.next().map(str::trim).unwrap_or("1");
                let name = name.to_owned();
                self.add_define(&name, value);
                Ok(())
            }
            "include" => {
                let spec = parse_include_spec(rest).ok_or_else(bad)?;
                let resolved =
                    self.resolve_include(spec)
                        .ok_or_else(|| PreprocessError::MissingInclude {
                            spec: spec.to_owned(),
                            from: origin.to_owned(),
                        })?;
                self.process_file(&resolved, options, output)
            }
            "stack" => {
                let capacity = rest.parse::<usize>().ok().filter(|&n| n > 0).ok_or_else(bad)?;
                options.stack_capacity = Some(capacity);
                Ok(())
            }
            "entry" => {
                if rest.is_empty() || rest.contains(char::is_whitespace) {
                    return Err(bad());
                }
                options.entry = Some(rest.to_owned());
                Ok(())
            }
            _ => Err(bad()),
        }
    }

    fn resolve_include(&self, spec: &str) -> Option<PathBuf> {
        if spec.starts_with('~') {
            let expanded = expand_home(spec)?;
            if expanded.exists() {
                return Some(expanded);
            }
            return None;
        }
        let direct = PathBuf::from(spec);
        if direct.is_absolute() {
            if direct.exists() {
                return Some(direct);
            }
            return None;
        }
        for base in &self.include_paths {
            let candidate = base.join(spec);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    /// Substitutes defines at identifier boundaries, leaving string
    /// literals and everything after a comment start untouched.
    fn expand(&self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut in_string = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if in_string {
                out.push(c);
                if c == '\\' && i + 1 < chars.len() {
                    out.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                if c == '"' {
                    in_string = false;
                }
                i += 1;
                continue;
            }
            match c {
                '"' => {
                    in_string = true;
                    out.push(c);
                    i += 1;
                }
                ';' => {
                    out.extend(&chars[i..]);
                    break;
                }
                c if is_ident_start(c) => {
                    let start = i;
                    while i < chars.len() && is_ident_char(chars[i]) {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();
                    match self.defines.iter().find(|d| d.name == word) {
                        Some(define) => out.push_str(&define.value),
                        None => out.push_str(&word),
                    }
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Preprocessor {
        Preprocessor::new()
    }
}

fn parse_include_spec(rest: &str) -> Option<&str> {
    if let Some(stripped) = rest.strip_prefix('"') {
        return stripped.split('"').next().filter(|s| !s.is_empty());
    }
    if let Some(stripped) = rest.strip_prefix('<') {
        return stripped.split('>').next().filter(|s| !s.is_empty());
    }
    None
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
