//! OS shell integration: context-menu entries and file-type associations.
//!
//! Effective on Windows only, against the per-user registry hive (no
//! elevation needed). All operations are idempotent and serialized through a
//! process-wide lock, since the shell configuration is one shared external
//! resource. On other platforms every operation reports `Unsupported`.

use std::str::FromStr;
use std::sync::Mutex;

use crate::error::EngineError;
use crate::formats::{self, FormatDescriptor};

/// How the app opens when launched from the context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Cli,
    Gui,
}

/// How the app opens an associated archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssocMode {
    Gui,
    Viewer,
}

/// Which formats a file-association operation targets.
#[derive(Debug, Clone)]
pub enum FormatSelection {
    All,
    List(Vec<String>),
}

impl FromStr for FormatSelection {
    type Err = EngineError;

    /// Parses `all` or a comma-separated format id list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(FormatSelection::All);
        }
        let ids: Vec<String> = s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(EngineError::InvalidOption(
                "no formats specified for association".into(),
            ));
        }
        Ok(FormatSelection::List(ids))
    }
}

impl FormatSelection {
    /// Resolves to registry descriptors, rejecting unknown ids.
    pub fn resolve(&self) -> Result<Vec<&'static FormatDescriptor>, EngineError> {
        match self {
            FormatSelection::All => Ok(formats::list_formats().iter().collect()),
            FormatSelection::List(ids) => {
                ids.iter().map(|id| formats::get_format(id)).collect()
            }
        }
    }
}

static SHELL_LOCK: Mutex<()> = Mutex::new(());

fn locked<T>(f: impl FnOnce() -> Result<T, EngineError>) -> Result<T, EngineError> {
    let _guard = SHELL_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
    f()
}

pub fn add_context_menu(mode: OpenMode) -> Result<(), EngineError> {
    locked(|| imp::add_context_menu(mode))
}

pub fn remove_context_menu() -> Result<(), EngineError> {
    locked(imp::remove_context_menu)
}

pub fn set_file_association(
    selection: &FormatSelection,
    mode: AssocMode,
) -> Result<(), EngineError> {
    locked(|| imp::set_file_association(selection, mode))
}

pub fn remove_file_association(selection: &FormatSelection) -> Result<(), EngineError> {
    locked(|| imp::remove_file_association(selection))
}

#[cfg(windows)]
mod imp {
    use super::{AssocMode, FormatSelection, OpenMode};
    use crate::error::EngineError;

    use winreg::enums::HKEY_CURRENT_USER;
    use winreg::RegKey;

    const MENU_KEYS: &[&str] = &[
        "Software\\Classes\\Directory\\shell\\MultiArc",
        "Software\\Classes\\*\\shell\\MultiArc",
    ];

    fn exe_path() -> Result<String, EngineError> {
        let exe = std::env::current_exe().map_err(EngineError::from)?;
        Ok(exe.to_string_lossy().into_owned())
    }

    pub fn add_context_menu(mode: OpenMode) -> Result<(), EngineError> {
        let exe = exe_path()?;
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);

        for key_path in MENU_KEYS {
            let (menu, _) = hkcu.create_subkey(key_path).map_err(EngineError::from)?;
            menu.set_value("", &"Compress with MultiArc")
                .map_err(EngineError::from)?;
            menu.set_value("Icon", &format!("{},0", exe))
                .map_err(EngineError::from)?;

            let (command, _) = menu.create_subkey("command").map_err(EngineError::from)?;
            let command_str = match mode {
                OpenMode::Cli => format!("\"{}\" c \"%1\"", exe),
                OpenMode::Gui => format!("\"{}\"", exe),
            };
            command.set_value("", &command_str).map_err(EngineError::from)?;
        }
        Ok(())
    }

    pub fn remove_context_menu() -> Result<(), EngineError> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        for key_path in MENU_KEYS {
            match hkcu.delete_subkey_all(key_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(EngineError::from(e)),
            }
        }
        Ok(())
    }

    pub fn set_file_association(
        selection: &FormatSelection,
        mode: AssocMode,
    ) -> Result<(), EngineError> {
        let exe = exe_path()?;
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);

        for desc in selection.resolve()? {
            let prog_id = format!("MultiArc.{}", desc.name.replace('+', ""));

            let (ext_key, _) = hkcu
                .create_subkey(format!("Software\\Classes\\.{}", desc.extension))
                .map_err(EngineError::from)?;
            ext_key.set_value("", &prog_id).map_err(EngineError::from)?;

            let (app_key, _) = hkcu
                .create_subkey(format!("Software\\Classes\\{}", prog_id))
                .map_err(EngineError::from)?;
            app_key
                .set_value("", &format!("{} archive", desc.name))
                .map_err(EngineError::from)?;

            let (icon, _) = app_key
                .create_subkey("DefaultIcon")
                .map_err(EngineError::from)?;
            icon.set_value("", &format!("{},0", exe))
                .map_err(EngineError::from)?;

            let (command, _) = app_key
                .create_subkey("shell\\open\\command")
                .map_err(EngineError::from)?;
            let command_str = match mode {
                AssocMode::Viewer => format!("\"{}\" view \"%1\"", exe),
                AssocMode::Gui => format!("\"{}\" d \"%1\"", exe),
            };
            command.set_value("", &command_str).map_err(EngineError::from)?;
        }
        Ok(())
    }

    pub fn remove_file_association(selection: &FormatSelection) -> Result<(), EngineError> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        for desc in selection.resolve()? {
            let prog_id = format!("MultiArc.{}", desc.name.replace('+', ""));
            for key in [
                format!("Software\\Classes\\.{}", desc.extension),
                format!("Software\\Classes\\{}", prog_id),
            ] {
                match hkcu.delete_subkey_all(&key) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(EngineError::from(e)),
                }
            }
        }
        Ok(())
    }
}

#[cfg(not(windows))]
mod imp {
    use super::{AssocMode, FormatSelection, OpenMode};
    use crate::error::EngineError;

    pub fn add_context_menu(_mode: OpenMode) -> Result<(), EngineError> {
        Err(EngineError::Unsupported)
    }

    pub fn remove_context_menu() -> Result<(), EngineError> {
        Err(EngineError::Unsupported)
    }

    pub fn set_file_association(
        _selection: &FormatSelection,
        _mode: AssocMode,
    ) -> Result<(), EngineError> {
        Err(EngineError::Unsupported)
    }

    pub fn remove_file_association(_selection: &FormatSelection) -> Result<(), EngineError> {
        Err(EngineError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn selection_parses_all_and_lists() {
        assert!(matches!(
            "all".parse::<FormatSelection>().unwrap(),
            FormatSelection::All
        ));
        let sel: FormatSelection = "zip, 7z".parse().unwrap();
        let descs = sel.resolve().unwrap();
        assert_eq!(descs.len(), 2);
        assert!("  ".parse::<FormatSelection>().is_err());
    }

    #[cfg(not(windows))]
    #[test]
    fn shell_ops_report_unsupported_off_windows() {
        let err = add_context_menu(OpenMode::Gui).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = remove_context_menu().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
