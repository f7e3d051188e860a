//! Final link command assembly, library resolution, and platform-specific
//! post-link binary conversion.

use std::path::Path;

use super::driver::{Driver, TargetOs, LIB_PATH};
use super::file_types::FileKind;
use crate::common::command::ToolCommand;
use crate::common::error::{DriverError, Result};

pub(super) const CMD_LD: &str = "/opt/cc9995/bin/ld9900";

const CRT0: &str = "/opt/cc9995/lib/crt0.o";
const LIBC: &str = "/opt/cc9995/lib/libc.a";
/// Compiler support library; closes every link line after the platform libc.
const LIB_SUPPORT: &str = "/opt/cc9995/lib/lib9995.a";

const LIB_PATH_TI: &str = "/opt/cc9995/lib/target-ti994a/";
const CRT0_TI: &str = "/opt/cc9995/lib/target-ti994a/crt0-ti994a.o";
const CMD_TIBIN: &str = "/opt/cc9995/lib/target-ti994a/tibin";

const LIB_PATH_MDOS: &str = "/opt/cc9995/lib/target-mdos/";
const CRT0_MDOS: &str = "/opt/cc9995/lib/target-mdos/crt0-mdos.o";
const CMD_MDOSBIN: &str = "/opt/cc9995/lib/target-mdos/mdosbin";

impl Driver {
    /// Run the link once all inputs are objects or archives, then any
    /// platform binary conversion over the produced output.
    pub(super) fn link(&mut self) -> Result<()> {
        let args = self.link_args()?;
        let mut cmd = ToolCommand::new(self.cmd_ld.as_str());
        for arg in &args {
            cmd.arg(arg.as_str())?;
        }
        cmd.run()?;
        self.convert_binary()
    }

    /// Assemble the complete linker argument list:
    /// base arguments, runtime startup object, every accumulated input in
    /// registration order, then every resolved library (explicit `-l`
    /// names first, then the implicitly appended platform libc and the
    /// support library).
    pub(super) fn link_args(&mut self) -> Result<Vec<String>> {
        let mut args = self.base_link_args();

        if !self.standalone {
            let crt0 = self.register_runtime();
            args.push(crt0.to_string());
        }
        self.libraries.push(LIB_SUPPORT.to_string());

        for entry in &mut self.inputs {
            debug_assert!(matches!(entry.kind, FileKind::Object | FileKind::Archive));
            args.push(entry.name.clone());
            entry.consumed = true;
        }

        for name in &self.libraries {
            args.push(self.resolve_library(name)?);
        }
        Ok(args)
    }

    /// Alignment, load-address, strip, output-name and map arguments, in
    /// the order the linker expects them.
    pub(super) fn base_link_args(&self) -> Vec<String> {
        let mut args = vec!["-A".to_string(), "2".to_string()];

        let base: &[&str] = match self.target_os {
            TargetOs::Fuzix { sub: 1 } => &["-b", "-C", "256", "-Z", "0"],
            TargetOs::Fuzix { sub: 2 } => &["-b", "-C", "512", "-Z", "2"],
            TargetOs::Fuzix { .. } => &[],
            // Link at 0xA000.
            TargetOs::Ti994a => &["-b", "-C", "40960"],
            // Link at 0x0400, less the 6 byte header in the crt.
            TargetOs::Mdos => &["-b", "-C", "1018"],
            TargetOs::None => &["-b", "-C", "256"],
        };
        args.extend(base.iter().map(|s| s.to_string()));

        if self.strip {
            args.push("-s".to_string());
        }
        args.push("-o".to_string());
        args.push(self.output.clone());
        if self.mapfile {
            args.push("-m".to_string());
            args.push(format!("{}.map", self.output));
        }
        args
    }

    /// Register the platform runtime pieces: appends the platform library
    /// directory to the search paths and the platform libc to the library
    /// list, and returns the startup object for the front of the link line.
    fn register_runtime(&mut self) -> &'static str {
        match self.target_os {
            TargetOs::Ti994a => {
                self.library_paths.push(LIB_PATH_TI.to_string());
                self.libraries.push(LIBC.to_string());
                CRT0_TI
            }
            TargetOs::Mdos => {
                self.library_paths.push(LIB_PATH_MDOS.to_string());
                self.libraries.push(LIBC.to_string());
                CRT0_MDOS
            }
            TargetOs::Fuzix { .. } | TargetOs::None => {
                self.library_paths.push(LIB_PATH.to_string());
                self.libraries.push(LIBC.to_string());
                CRT0
            }
        }
    }

    /// Resolve one `-l` token to a concrete archive path.
    ///
    /// A token that already looks like a path (contains a separator or a
    /// dot) passes through verbatim. Otherwise each registered `-L`
    /// directory is probed in order for `lib<name>.a` and the first
    /// existing candidate wins.
    pub(super) fn resolve_library(&self, name: &str) -> Result<String> {
        if name.contains('/') || name.contains('.') {
            return Ok(name.to_string());
        }
        for dir in &self.library_paths {
            let candidate = Path::new(dir).join(format!("lib{}.a", name));
            if candidate.exists() {
                return Ok(candidate.to_string_lossy().into_owned());
            }
        }
        Err(DriverError::LibraryNotFound {
            name: name.to_string(),
        })
    }

    /// Some platforms need the linked output converted to their own binary
    /// format; that is a second command, not part of the link itself.
    fn convert_binary(&self) -> Result<()> {
        let tool = match self.target_os {
            TargetOs::Ti994a => CMD_TIBIN,
            TargetOs::Mdos => CMD_MDOSBIN,
            TargetOs::Fuzix { .. } | TargetOs::None => return Ok(()),
        };
        let mut cmd = ToolCommand::new(tool);
        cmd.arg(self.output.as_str())?;
        cmd.run()
    }
}
