//! Input file classification by extension.

use crate::common::error::{DriverError, Result};

/// What an input file currently is.
///
/// Kinds only ever advance forward through the pipeline
/// (`AsmWithCpp`/`CSource` toward `Object`); objects and archives are
/// terminal and never touched by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.S`: assembly that must pass through the preprocessor first.
    AsmWithCpp,
    /// `.c`: C source.
    CSource,
    /// `.%`: preprocessed C, ready for the code generator. Never appears
    /// on the command line; produced internally by the preprocess stage.
    PreprocessedC,
    /// `.s`: assembly ready for the assembler.
    Asm,
    /// `.o`: linkable object.
    Object,
    /// `.a`: archive, handed straight to the linker.
    Archive,
}

/// One entry in the driver's input list. The name is rewritten in place as
/// the entry advances through the stages.
#[derive(Debug)]
pub struct FileEntry {
    pub name: String,
    pub kind: FileKind,
    /// Set once a stage accepts this entry as its primary input. Entries
    /// still unset at the end of the run draw an "unused" warning.
    pub consumed: bool,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            kind,
            consumed: false,
        }
    }
}

/// Classify a command-line filename by its extension.
///
/// Classification is total and deterministic: anything but `.c`, `.s`,
/// `.S`, `.o`, `.a` is a fatal usage error, as is a name with no extension
/// at all.
pub fn classify(path: &str) -> Result<FileKind> {
    let dot = path.rfind('.').ok_or_else(|| DriverError::UnknownFileType {
        path: path.to_string(),
    })?;
    match &path[dot + 1..] {
        "c" => Ok(FileKind::CSource),
        "s" => Ok(FileKind::Asm),
        "S" => Ok(FileKind::AsmWithCpp),
        "o" => Ok(FileKind::Object),
        "a" => Ok(FileKind::Archive),
        _ => Err(DriverError::UnknownFileType {
            path: path.to_string(),
        }),
    }
}
