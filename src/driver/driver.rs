//! Core driver: configuration, file registries, the per-file phase state
//! machine, and the extension rewriter.
//!
//! The pipeline runs each input through up to three conversions
//! (preprocess -> compile -> assemble), one file at a time, then hands the
//! accumulated objects to the link assembler. Submodules handle distinct
//! concerns:
//! - `cli.rs`: hand-rolled argument parsing with joined short options
//! - `file_types.rs`: input classification by extension
//! - `link.rs`: link command assembly, library resolution, post-link
//!   conversion

use log::debug;

use super::file_types::{FileEntry, FileKind};
use super::link::CMD_LD;
use crate::common::command::ToolCommand;
use crate::common::error::{DriverError, Result};
use crate::common::temp_files::TempFileLedger;

/// Toolchain installation layout. Fixed at build time; the driver has no
/// configuration files.
pub(super) const LIB_PATH: &str = "/opt/cc9995/lib/";
pub(super) const INC_PATH: &str = "/opt/cc9995/include/";

pub(super) const INC_PATH_TI: &str = "/opt/cc9995/include/target-ti994a/";
pub(super) const INC_PATH_MDOS: &str = "/opt/cc9995/include/target-mdos/";

const CMD_CPP: &str = "/opt/cc9995/lib/tms9995-cpp";
const CMD_CCOM: &str = "/opt/cc9995/lib/tms9995-ccom";
const CMD_AS: &str = "/opt/cc9995/bin/as9900";

/// Optimizer pass selectors handed to the code generator, in order.
const OPTIMIZE_PASSES: &[&str] = &["tailcall", "ssa", "temps", "deljumps", "dce", "ccp", "scp"];

/// Stage thresholds for the is-this-temporary decision in
/// `rewrite_extension`. A rewritten name is an intermediate, and registered
/// for deletion, when the terminal phase lies strictly beyond the
/// threshold; otherwise it is the user's requested artifact.
pub(super) const TEMP_ALWAYS: u8 = 0;
pub(super) const TEMP_IF_PAST_PREPROCESS: u8 = 1;
pub(super) const TEMP_IF_PAST_COMPILE: u8 = 2;
pub(super) const TEMP_NEVER: u8 = 5;

/// How far the user wants the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// `-E`: stop after preprocessing.
    Preprocess = 1,
    /// `-S`: stop once assembly has been generated.
    Compile = 2,
    /// `-c`: stop after assembling objects.
    Assemble = 3,
    /// Full build including the link (default).
    Link = 4,
}

impl Phase {
    /// Stage number used for the numeric temporary-file comparison.
    pub(super) fn stage(self) -> u8 {
        self as u8
    }
}

/// Target CPU variant. The 9900 lacks some 9995 instructions, which the
/// code generator needs to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cpu {
    Tms9900,
    Tms9995,
}

/// Target execution environment. Selects the load address, the runtime
/// startup object, the library directory, and any post-link binary
/// conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOs {
    None,
    /// Fuzix, with its relocation sub-variant (0 = plain, 1 and 2 are the
    /// two relocatable-binary layouts).
    Fuzix { sub: u8 },
    Ti994a,
    Mdos,
}

/// The driver owns all configuration and file registries and walks each
/// input through the pipeline.
///
/// Configuration is populated by `parse_args()` and read-only afterwards.
/// Registries are append-only and live for the whole process; only entry
/// names and the `consumed` markers mutate during the run.
pub struct Driver {
    pub(super) output: String,
    pub(super) output_set: bool,
    pub(super) terminal_phase: Phase,
    pub(super) cpu: Cpu,
    pub(super) target_os: TargetOs,
    /// Freestanding build: no runtime startup object, no system includes,
    /// no C library.
    pub(super) standalone: bool,
    /// Strip symbols at link time. The link assembler honors this, but
    /// `-s` already means standalone, so a dedicated flag is still
    /// pending; until one lands no CLI spelling sets it.
    pub(super) strip: bool,
    pub(super) mapfile: bool,
    pub(super) discardable: bool,

    pub(super) inputs: Vec<FileEntry>,
    pub(super) libraries: Vec<String>,
    pub(super) library_paths: Vec<String>,
    pub(super) include_paths: Vec<String>,
    pub(super) defines: Vec<String>,
    /// Pass-through arguments forwarded verbatim to the code generator.
    pub(super) ccom_args: Vec<String>,

    /// Toolchain program locations. Default to the installed layout;
    /// tests point them at stand-ins.
    pub(super) cmd_cpp: String,
    pub(super) cmd_ccom: String,
    pub(super) cmd_as: String,
    pub(super) cmd_ld: String,

    pub(super) temps: TempFileLedger,
}

impl Driver {
    pub fn new() -> Self {
        Self {
            output: "a.out".to_string(),
            output_set: false,
            terminal_phase: Phase::Link,
            cpu: Cpu::Tms9995,
            target_os: TargetOs::None,
            standalone: false,
            strip: false,
            mapfile: false,
            discardable: false,
            inputs: Vec::new(),
            libraries: Vec::new(),
            library_paths: Vec::new(),
            include_paths: Vec::new(),
            // Predefined macros come before anything from -D.
            defines: vec!["__CC9995__".to_string(), "__tms9995__".to_string()],
            ccom_args: Vec::new(),
            cmd_cpp: CMD_CPP.to_string(),
            cmd_ccom: CMD_CCOM.to_string(),
            cmd_as: CMD_AS.to_string(),
            cmd_ld: CMD_LD.to_string(),
            temps: TempFileLedger::new(),
        }
    }

    /// Whether any input files were given.
    pub fn has_inputs(&self) -> bool {
        !self.inputs.is_empty()
    }

    /// Run the whole build: drive every input through the state machine in
    /// registration order, link if requested, then warn about inputs that
    /// nothing consumed.
    pub fn run(&mut self) -> Result<()> {
        for idx in 0..self.inputs.len() {
            self.sequence(idx)?;
            // Every intermediate from this file is gone before the next
            // input starts.
            self.temps.flush();
        }
        if self.terminal_phase == Phase::Link {
            self.link()?;
            // Anything registered during the link itself.
            self.temps.flush();
        }
        self.warn_unused();
        Ok(())
    }

    // ---- Phase state machine ----

    /// Advance one input through the pipeline until it reaches the
    /// requested terminal phase or becomes an object.
    fn sequence(&mut self, idx: usize) -> Result<()> {
        loop {
            let kind = self.inputs[idx].kind;
            debug!("processing {} ({:?})", self.inputs[idx].name, kind);
            match kind {
                FileKind::AsmWithCpp => {
                    let name = self.inputs[idx].name.clone();
                    let next = self.preprocess_asm(&name)?;
                    self.advance(idx, next, FileKind::Asm);
                }
                FileKind::CSource => {
                    let name = self.inputs[idx].name.clone();
                    let next = self.preprocess_c(&name)?;
                    self.advance(idx, next, FileKind::PreprocessedC);
                }
                FileKind::PreprocessedC => {
                    if self.terminal_phase == Phase::Preprocess {
                        return Ok(());
                    }
                    let name = self.inputs[idx].name.clone();
                    let next = self.compile(&name)?;
                    self.advance(idx, next, FileKind::Asm);
                }
                FileKind::Asm => {
                    if self.terminal_phase <= Phase::Compile {
                        return Ok(());
                    }
                    let name = self.inputs[idx].name.clone();
                    let next = self.assemble(&name)?;
                    self.advance(idx, next, FileKind::Object);
                }
                FileKind::Object | FileKind::Archive => return Ok(()),
            }
        }
    }

    /// Record one completed stage transition.
    fn advance(&mut self, idx: usize, name: String, kind: FileKind) {
        let entry = &mut self.inputs[idx];
        debug!("{} -> {} ({:?})", entry.name, name, kind);
        entry.name = name;
        entry.kind = kind;
        entry.consumed = true;
    }

    /// `.S` input: run the preprocessor over raw assembly, stdin and
    /// stdout both redirected.
    fn preprocess_asm(&mut self, path: &str) -> Result<String> {
        let output = self.rewrite_extension(path, "s", TEMP_IF_PAST_PREPROCESS)?;
        let mut cmd = ToolCommand::new(self.cmd_cpp.as_str());
        cmd.arg("-E")?;
        cmd.redirect_in(path);
        cmd.redirect_out(output.as_str());
        cmd.run()?;
        Ok(output)
    }

    /// `.c` input: macro and include expansion into a `.%` file. The
    /// filename is a direct argument here; only stdout is redirected.
    fn preprocess_c(&mut self, path: &str) -> Result<String> {
        let output = self.rewrite_extension(path, "%", TEMP_ALWAYS)?;
        let mut cmd = ToolCommand::new(self.cmd_cpp.as_str());
        cmd.arg_list(Some("-I"), &self.include_paths)?;
        cmd.arg_list(Some("-D"), &self.defines)?;
        cmd.arg(path)?;
        cmd.redirect_out(output.as_str());
        cmd.run()?;
        Ok(output)
    }

    /// Preprocessed C through the code generator, producing assembly.
    fn compile(&mut self, path: &str) -> Result<String> {
        let output = self.rewrite_extension(path, "s", TEMP_IF_PAST_COMPILE)?;
        let mut cmd = ToolCommand::new(self.cmd_ccom.as_str());
        cmd.arg_list(None, &self.ccom_args)?;
        for pass in OPTIMIZE_PASSES {
            cmd.arg("-x")?;
            cmd.arg(*pass)?;
        }
        if self.cpu == Cpu::Tms9900 {
            // The 9900 has no signed divide.
            cmd.arg("-mno-divs")?;
        }
        if self.discardable {
            cmd.arg("-mdiscard")?;
        }
        cmd.redirect_in(path);
        cmd.redirect_out(output.as_str());
        cmd.run()?;
        Ok(output)
    }

    /// Assemble to an object. The assembler takes the filename directly
    /// and derives the object name itself; no redirection.
    fn assemble(&mut self, path: &str) -> Result<String> {
        let mut cmd = ToolCommand::new(self.cmd_as.as_str());
        cmd.arg(path)?;
        cmd.run()?;
        self.rewrite_extension(path, "o", TEMP_NEVER)
    }

    // ---- Extension rewriter ----

    /// Replace the extension on `path` with `new_ext`, producing the next
    /// stage's filename. The name is registered in the temp ledger when
    /// the terminal phase runs strictly past `temp_threshold`, i.e. when a
    /// later stage will consume the file and it is not the user's
    /// requested artifact.
    pub(super) fn rewrite_extension(
        &mut self,
        path: &str,
        new_ext: &str,
        temp_threshold: u8,
    ) -> Result<String> {
        let dot = path.rfind('.').ok_or_else(|| DriverError::MissingExtension {
            path: path.to_string(),
        })?;
        let next = format!("{}.{}", &path[..dot], new_ext);
        if self.terminal_phase.stage() > temp_threshold {
            self.temps.register(next.as_str());
        }
        Ok(next)
    }

    /// Advisory pass after the run: report anything no stage consumed.
    fn warn_unused(&self) {
        for entry in &self.inputs {
            if !entry.consumed {
                eprintln!("cc9995: warning: file {} unused.", entry.name);
            }
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Scratch directory for a pipeline test, plus the path of the log the
    /// stand-in tools append to.
    fn fake_toolchain(tag: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("cc9995_pipe_{}_{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let log = dir.join("tools.log");
        (dir, log)
    }

    /// Shell stand-in for one toolchain program; appends its own name to
    /// the log so tests can assert which stages ran, in what order.
    fn stub_tool(dir: &Path, name: &str, log: &Path) -> String {
        let path = dir.join(name);
        fs::write(
            &path,
            format!("#!/bin/sh\necho {} >> {}\n", name, log.display()),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn fake_driver(dir: &Path, log: &Path) -> Driver {
        let mut driver = Driver::new();
        driver.cmd_cpp = stub_tool(dir, "cpp", log);
        driver.cmd_ccom = stub_tool(dir, "ccom", log);
        driver.cmd_as = stub_tool(dir, "as", log);
        driver.cmd_ld = stub_tool(dir, "ld", log);
        driver
    }

    fn tool_log(log: &Path) -> Vec<String> {
        fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn full_build_runs_every_stage_and_flushes_intermediates() {
        let (dir, log) = fake_toolchain("full");
        let a = dir.join("a.c");
        let b = dir.join("b.c");
        fs::write(&a, "int main(void) { return 0; }\n").unwrap();
        fs::write(&b, "int x;\n").unwrap();

        let mut driver = fake_driver(&dir, &log);
        driver
            .inputs
            .push(FileEntry::new(a.to_str().unwrap(), FileKind::CSource));
        driver
            .inputs
            .push(FileEntry::new(b.to_str().unwrap(), FileKind::CSource));
        driver.run().unwrap();

        // Each file runs its full pipeline before the next begins; the
        // link comes once, at the end.
        assert_eq!(
            tool_log(&log),
            vec!["cpp", "ccom", "as", "cpp", "ccom", "as", "ld"]
        );
        for entry in &driver.inputs {
            assert_eq!(entry.kind, FileKind::Object);
            assert!(entry.consumed);
        }
        assert_eq!(driver.inputs[0].name, dir.join("a.o").to_string_lossy());
        // Intermediates were flushed after each input.
        assert!(!dir.join("a.%").exists());
        assert!(!dir.join("a.s").exists());
        assert!(!dir.join("b.%").exists());
        assert!(!dir.join("b.s").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn assembly_output_stops_before_assembler() {
        let (dir, log) = fake_toolchain("stop_s");
        let a = dir.join("a.c");
        fs::write(&a, "int x;\n").unwrap();

        let mut driver = fake_driver(&dir, &log);
        driver.terminal_phase = Phase::Compile;
        driver
            .inputs
            .push(FileEntry::new(a.to_str().unwrap(), FileKind::CSource));
        driver.run().unwrap();

        assert_eq!(tool_log(&log), vec!["cpp", "ccom"]);
        assert_eq!(driver.inputs[0].kind, FileKind::Asm);
        assert!(driver.inputs[0].consumed);
        // The requested artifact survives the flush; the scratch file does not.
        assert!(dir.join("a.s").exists());
        assert!(!dir.join("a.%").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn preprocessed_asm_with_keep_retains_intermediate() {
        let (dir, log) = fake_toolchain("keep");
        let src = dir.join("x.S");
        fs::write(&src, " nop\n").unwrap();

        let mut driver = fake_driver(&dir, &log);
        driver.terminal_phase = Phase::Assemble;
        driver.temps.set_keep(true);
        driver
            .inputs
            .push(FileEntry::new(src.to_str().unwrap(), FileKind::AsmWithCpp));
        driver.run().unwrap();

        // No link under -c, and no second preprocess for a .S input.
        assert_eq!(tool_log(&log), vec!["cpp", "as"]);
        assert_eq!(driver.inputs[0].kind, FileKind::Object);
        assert!(driver.inputs[0].consumed);
        // -X keeps the preprocessed assembly that is otherwise scratch.
        assert!(dir.join("x.s").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn input_past_the_terminal_phase_is_left_alone() {
        let (dir, log) = fake_toolchain("unused");
        let mut driver = fake_driver(&dir, &log);
        driver.terminal_phase = Phase::Preprocess;
        driver.inputs.push(FileEntry::new("already.s", FileKind::Asm));
        driver.run().unwrap();

        // Nothing ran and nothing advanced; the entry draws the unused
        // warning at the end of the run.
        assert!(tool_log(&log).is_empty());
        assert_eq!(driver.inputs[0].kind, FileKind::Asm);
        assert!(!driver.inputs[0].consumed);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn phase_ordering_matches_pipeline() {
        assert!(Phase::Preprocess < Phase::Compile);
        assert!(Phase::Compile < Phase::Assemble);
        assert!(Phase::Assemble < Phase::Link);
        assert_eq!(Phase::Preprocess.stage(), 1);
        assert_eq!(Phase::Link.stage(), 4);
    }

    #[test]
    fn rewrite_replaces_final_extension() {
        let mut driver = Driver::new();
        assert_eq!(driver.rewrite_extension("a.c", "%", TEMP_NEVER).unwrap(), "a.%");
        assert_eq!(driver.rewrite_extension("a.%", "s", TEMP_NEVER).unwrap(), "a.s");
        assert_eq!(
            driver
                .rewrite_extension("/deep/path/to/a.c", "s", TEMP_NEVER)
                .unwrap(),
            "/deep/path/to/a.s"
        );
    }

    #[test]
    fn rewrite_requires_an_extension() {
        let mut driver = Driver::new();
        assert!(matches!(
            driver.rewrite_extension("noext", "s", TEMP_NEVER),
            Err(DriverError::MissingExtension { .. })
        ));
    }

    #[test]
    fn full_build_registers_intermediates() {
        let mut driver = Driver::new();
        // Terminal phase Link (4): .% (threshold 0) and .s (threshold 2)
        // are intermediates, .o (threshold 5) is not.
        driver.rewrite_extension("a.c", "%", TEMP_ALWAYS).unwrap();
        driver.rewrite_extension("a.%", "s", TEMP_IF_PAST_COMPILE).unwrap();
        driver.rewrite_extension("a.s", "o", TEMP_NEVER).unwrap();
        let pending: Vec<_> = driver
            .temps
            .pending()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(pending, vec!["a.%", "a.s"]);
        // Don't unlink the test's working directory files on drop.
        driver.temps.set_keep(true);
    }

    #[test]
    fn requested_artifact_is_not_temporary() {
        let mut driver = Driver::new();
        driver.terminal_phase = Phase::Compile;
        // -S: the .s output is the artifact, the .% is still scratch.
        driver.rewrite_extension("a.c", "%", TEMP_ALWAYS).unwrap();
        driver
            .rewrite_extension("a.%", "s", TEMP_IF_PAST_COMPILE)
            .unwrap();
        let pending: Vec<_> = driver
            .temps
            .pending()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(pending, vec!["a.%"]);
        driver.temps.set_keep(true);
    }

    #[test]
    fn preprocessed_output_from_s_kept_under_dash_e() {
        let mut driver = Driver::new();
        driver.terminal_phase = Phase::Preprocess;
        // .S -> .s under -E: terminal phase 1 is not past threshold 1.
        driver
            .rewrite_extension("x.S", "s", TEMP_IF_PAST_PREPROCESS)
            .unwrap();
        assert!(driver.temps.pending().is_empty());
    }
}
