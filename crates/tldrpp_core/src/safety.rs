//! Destructive-command detection and the execution audit log.
//!
//! The verb list is data: [`DEFAULT_DESTRUCTIVE_COMMANDS`] is only the
//! fallback for the `[safety] destructive_commands` config key.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

pub const DEFAULT_DESTRUCTIVE_COMMANDS: &[&str] = &[
    "rm", "rmdir", "del", "erase", "dd", "mkfs", "fdisk", "parted", "iptables", "ufw",
    "firewall-cmd", "chmod", "chown", "chattr", "kill", "killall", "pkill", "shutdown", "reboot",
    "halt", "mv", "move", "rename", "cp", "copy", "xcopy", "tar", "zip", "unzip", "git", "svn",
    "hg",
];

/// True when `command` is one of `verbs` or starts with `<verb> `, ignoring case.
pub fn is_destructive<S: AsRef<str>>(command: &str, verbs: &[S]) -> bool {
    let command = command.trim().to_lowercase();
    verbs.iter().any(|verb| {
        let verb = verb.as_ref().trim().to_lowercase();
        !verb.is_empty()
            && (command == verb
                || command
                    .strip_prefix(verb.as_str())
                    .is_some_and(|rest| rest.starts_with(' ')))
    })
}

/// Append one executed command to the audit log, creating it if needed.
pub fn append_exec_log(log_path: &Path, command: &str) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::io(parent, source))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|source| Error::io(log_path, source))?;
    writeln!(file, "{command}").map_err(|source| Error::io(log_path, source))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{DEFAULT_DESTRUCTIVE_COMMANDS, append_exec_log, is_destructive};

    #[test]
    fn detects_builtin_destructive_verbs() {
        assert!(is_destructive("rm -rf build", DEFAULT_DESTRUCTIVE_COMMANDS));
        assert!(is_destructive("RM file", DEFAULT_DESTRUCTIVE_COMMANDS));
        assert!(is_destructive("reboot", DEFAULT_DESTRUCTIVE_COMMANDS));
        assert!(!is_destructive("rmate file", DEFAULT_DESTRUCTIVE_COMMANDS));
        assert!(!is_destructive("ls -la", DEFAULT_DESTRUCTIVE_COMMANDS));
    }

    #[test]
    fn configured_list_replaces_builtin_one() {
        let verbs = vec!["terraform".to_string()];
        assert!(is_destructive("terraform destroy", &verbs));
        assert!(!is_destructive("rm -rf /tmp/x", &verbs));
        assert!(!is_destructive("anything", &[String::new()]));
    }

    #[test]
    fn exec_log_appends_lines() {
        let temp = tempdir().expect("tempdir");
        let log_path = temp.path().join("state").join("exec.log");
        append_exec_log(&log_path, "tar -xf a.tgz").expect("first");
        append_exec_log(&log_path, "ls").expect("second");
        assert_eq!(
            fs::read_to_string(&log_path).expect("read"),
            "tar -xf a.tgz\nls\n"
        );
    }
}
