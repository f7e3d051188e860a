//! Command-line argument parsing.
//!
//! The parser is a flat `while` loop with a `match` on each argument.
//! No parser library: most short options take their value either joined
//! (`-lfoo`) or as the following argument (`-l foo`), and positional
//! arguments are classified by extension, which derive-style parsers do
//! not model well.
//!
//! Single-letter mode flags (`-s`, `-M`, `-d`, `-X`, ...) must appear
//! exactly: a joined suffix such as `-Mx` is an unknown option rather
//! than being silently ignored.

use super::driver::{Cpu, Driver, Phase, TargetOs, INC_PATH, INC_PATH_MDOS, INC_PATH_TI};
use super::file_types::{classify, FileEntry, FileKind};
use crate::common::error::{DriverError, Result};

/// Long options forwarded verbatim to the code generator, with a flag for
/// whether the option consumes a following value.
const PASS_OPTIONS: &[(&str, bool)] = &[
    ("bss-name", true),
    ("check-stack", false),
    ("code-name", true),
    ("data-name", true),
    ("debug", false),
    ("inline-stdfuncs", false),
    ("register-space", true),
    ("register-vars", false),
    ("rodata-name", true),
    ("signed-char", false),
    ("standard", true),
    ("verbose", false),
    ("writable-strings", false),
];

impl Driver {
    /// Parse the argument list (everything after argv[0]) and populate the
    /// driver's configuration and registries.
    pub fn parse_args(&mut self, args: &[String]) -> Result<()> {
        let mut c_files = 0usize;
        let mut only_one_input = false;

        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();

            if !arg.starts_with('-') {
                let kind = classify(arg)?;
                if kind == FileKind::CSource {
                    c_files += 1;
                }
                self.inputs.push(FileEntry::new(arg, kind));
                i += 1;
                continue;
            }

            match arg {
                // Terminal phase selection.
                "-c" => self.terminal_phase = Phase::Assemble,
                "-S" => self.terminal_phase = Phase::Compile,
                "-E" => {
                    self.terminal_phase = Phase::Preprocess;
                    only_one_input = true;
                }

                "-o" => {
                    if self.output_set {
                        return Err(DriverError::usage("-o can only be used once"));
                    }
                    i += 1;
                    match args.get(i) {
                        Some(name) => {
                            self.output = name.clone();
                            self.output_set = true;
                        }
                        None => return Err(DriverError::usage("no target given")),
                    }
                }
                arg if arg.starts_with("-o") => {
                    if self.output_set {
                        return Err(DriverError::usage("-o can only be used once"));
                    }
                    self.output = arg[2..].to_string();
                    self.output_set = true;
                }

                // List-building options, joined or separate.
                arg if arg.starts_with("-l") => {
                    let value = Self::option_value(args, &mut i, "-l")?;
                    self.libraries.push(value);
                }
                arg if arg.starts_with("-L") => {
                    let value = Self::option_value(args, &mut i, "-L")?;
                    self.library_paths.push(value);
                }
                arg if arg.starts_with("-I") => {
                    let value = Self::option_value(args, &mut i, "-I")?;
                    self.include_paths.push(value);
                }
                arg if arg.starts_with("-D") => {
                    let value = Self::option_value(args, &mut i, "-D")?;
                    self.defines.push(value);
                }

                // Single-letter mode flags.
                "-s" => self.standalone = true,
                "-X" => self.temps.set_keep(true),
                "-M" => self.mapfile = true,
                "-d" => self.discardable = true,
                // Reserved; accepted and ignored.
                "-i" => {}

                arg if arg.starts_with("-m") => {
                    self.cpu = match &arg[2..] {
                        "9900" => Cpu::Tms9900,
                        "9995" => Cpu::Tms9995,
                        _ => return Err(DriverError::usage("only 9900 and 9995 supported")),
                    };
                }

                // Target platform; also fixes the default CPU.
                arg if arg.starts_with("-t") => match &arg[2..] {
                    "ti994a" => {
                        self.target_os = TargetOs::Ti994a;
                        self.cpu = Cpu::Tms9900;
                    }
                    "mdos" => {
                        self.target_os = TargetOs::Mdos;
                        self.cpu = Cpu::Tms9995;
                    }
                    "fuzix" => self.target_os = TargetOs::Fuzix { sub: 0 },
                    "fuzixrel1" => self.target_os = TargetOs::Fuzix { sub: 1 },
                    "fuzixrel2" => self.target_os = TargetOs::Fuzix { sub: 2 },
                    _ => {
                        return Err(DriverError::usage(
                            "only fuzix, mdos and ti994a target types are known",
                        ))
                    }
                },

                arg if arg.starts_with("--") => self.long_option(args, &mut i)?,

                _ => {
                    return Err(DriverError::usage(format!("unknown option '{}'", arg)));
                }
            }
            i += 1;
        }

        if only_one_input && c_files > 1 {
            return Err(DriverError::usage("too many files for -E"));
        }

        if !self.standalone {
            self.add_system_includes();
        }
        Ok(())
    }

    /// Value of an option accepting `-Xvalue` or `-X value`.
    fn option_value(args: &[String], i: &mut usize, flag: &str) -> Result<String> {
        let joined = &args[*i][2..];
        if !joined.is_empty() {
            return Ok(joined.to_string());
        }
        *i += 1;
        args.get(*i)
            .cloned()
            .ok_or_else(|| DriverError::usage(format!("{} requires an argument", flag)))
    }

    /// Validate a `--` option against the recognized pass-through set and
    /// forward it (plus its value, when it takes one) to the code
    /// generator's argument list.
    fn long_option(&mut self, args: &[String], i: &mut usize) -> Result<()> {
        let name = &args[*i][2..];
        let Some((_, takes_value)) = PASS_OPTIONS.iter().find(|(opt, _)| *opt == name) else {
            return Err(DriverError::usage(format!("unrecognized option '--{}'", name)));
        };
        self.ccom_args.push(args[*i].clone());
        if *takes_value {
            *i += 1;
            let value = args.get(*i).ok_or_else(|| {
                DriverError::usage(format!("--{} requires an argument", name))
            })?;
            self.ccom_args.push(value.clone());
        }
        Ok(())
    }

    /// Register the implicit system include directories for the selected
    /// platform. Skipped entirely in standalone mode.
    fn add_system_includes(&mut self) {
        match self.target_os {
            TargetOs::Ti994a => self.include_paths.push(INC_PATH_TI.to_string()),
            TargetOs::Mdos => self.include_paths.push(INC_PATH_MDOS.to_string()),
            TargetOs::Fuzix { .. } | TargetOs::None => {}
        }
        self.include_paths.push(INC_PATH.to_string());
    }
}
