//! Launch file interpreter
//!
//! A launch file is UTF-8 text made of `key = value` lines. Blank lines and
//! lines starting with `//`, `;` or `#` are ignored. Values may reference
//! variables as `$name$`, and the reserved key `include` parses another
//! launch file in place with the same variables.
//!
//! ```text
//! # snes.emu
//! include     = common.emu
//! launch_exe  = $EmuLauncherDir$/snes9x
//! launch_args = --fullscreen "$ConfigFileDir$/roms/zelda.sfc"
//! ```

use super::context::{ContextStack, Location};
use super::diagnostics::{Diagnostics, ErrorKind};
use super::environment::HostEnvironment;
use super::launch_spec::{ShutdownTimeout, LAUNCH_ARGS, LAUNCH_DIR, LAUNCH_EXE, SHUTDOWN_TIMEOUT};
use super::substitution::{self, SubstitutionError, DELIMITER};
use super::variables::VariableTable;
use std::path::{Path, PathBuf};

/// Prefixes that mark a line as a comment
pub const COMMENT_MARKERS: [&str; 3] = ["//", ";", "#"];

/// Splits a line into key and value
pub const SEPARATOR: char = '=';

/// Key whose value names another launch file to parse inline
pub const INCLUDE_KEY: &str = "include";

/// Dropped from the start of a file before it is split into lines
const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// One classified physical line
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Skip,
    Assignment { key: &'a str, value: &'a str },
}

/// Classify a raw line without resolving anything
fn classify(line: &str) -> Result<Line<'_>, ErrorKind> {
    let trimmed = line.trim();
    if trimmed.is_empty() || COMMENT_MARKERS.iter().any(|m| trimmed.starts_with(m)) {
        return Ok(Line::Skip);
    }

    let (key, value) = trimmed
        .split_once(SEPARATOR)
        .ok_or(ErrorKind::MissingSeparator)?;
    let key = key.trim();

    if key.is_empty() {
        return Err(ErrorKind::EmptyKey);
    }
    if let Some(c) = key.chars().find(|c| *c == ' ' || *c == DELIMITER) {
        return Err(ErrorKind::InvalidKeyCharacter(c));
    }

    Ok(Line::Assignment {
        key,
        value: value.trim(),
    })
}

/// Shared state for one launch: the variables, the errors, and the stack of
/// files currently being read
///
/// Included files are parsed against the same session, so they all write into
/// one flat variable table.
#[derive(Debug)]
pub struct ParseSession {
    env: HostEnvironment,
    variables: VariableTable,
    diagnostics: Diagnostics,
    contexts: ContextStack,
}

impl ParseSession {
    /// Create a session with the reserved and host variables already defined
    pub fn new(env: HostEnvironment, default_timeout: ShutdownTimeout) -> Self {
        let mut variables = VariableTable::new();
        variables.upsert(LAUNCH_EXE, "");
        variables.upsert(LAUNCH_ARGS, "");
        variables.upsert(LAUNCH_DIR, "");
        variables.upsert("MachineName", env.machine_name.as_str());
        variables.upsert("UserName", env.user_name.as_str());
        variables.upsert("WorkingDir", env.working_dir.to_string_lossy());
        variables.upsert("EmuLauncherDir", env.launcher_dir.to_string_lossy());
        variables.upsert("ConfigFileDir", env.config_dir.to_string_lossy());
        variables.upsert(SHUTDOWN_TIMEOUT, default_timeout.to_string());

        Self {
            env,
            variables,
            diagnostics: Diagnostics::new(),
            contexts: ContextStack::new(),
        }
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Record an error at the active parsing location, if any
    pub fn report(&mut self, kind: ErrorKind) {
        self.diagnostics.record(kind, self.contexts.active());
    }

    /// Value of a variable; an undefined name is reported and reads as empty
    pub fn lookup(&mut self, name: &str) -> String {
        match self.variables.get(name) {
            Some(value) => value.to_string(),
            None => {
                self.report(ErrorKind::UndefinedVariable(name.to_string()));
                String::new()
            }
        }
    }

    /// Expand all `$name$` references in `text`
    ///
    /// On an unterminated delimiter the text expanded so far is returned.
    pub fn resolve(&mut self, text: &str) -> String {
        let variables = &self.variables;
        let diagnostics = &mut self.diagnostics;
        let location = self.contexts.active();

        let result = substitution::substitute(text, |name| match variables.get(name) {
            Some(value) => value.to_string(),
            None => {
                diagnostics.record(ErrorKind::UndefinedVariable(name.to_string()), location);
                String::new()
            }
        });

        match result {
            Ok(resolved) => resolved,
            Err(SubstitutionError::Unterminated(partial)) => {
                self.report(ErrorKind::UnterminatedDelimiter(text.to_string()));
                partial
            }
            Err(e @ SubstitutionError::MaxPassesExceeded(_)) => {
                self.report(ErrorKind::CycleDetected(e.to_string()));
                text.to_string()
            }
        }
    }

    /// Parse a launch file into the session
    ///
    /// Does nothing once any error has been recorded. A structural error in a
    /// line stops the rest of that file; assignments made before it are kept.
    pub fn parse(&mut self, path: &str) {
        if !self.diagnostics.is_empty() {
            return;
        }

        let full_path = self.resolve_path(path);
        if self.contexts.contains(&full_path) {
            self.report(ErrorKind::CycleDetected(format!(
                "'{}' includes itself",
                full_path.display()
            )));
            return;
        }

        log::debug!("Parsing launch file: {}", full_path.display());
        self.contexts.push(full_path.clone());

        let content = match std::fs::read_to_string(&full_path) {
            Ok(content) => content
                .strip_prefix(BYTE_ORDER_MARK)
                .map(str::to_owned)
                .unwrap_or(content),
            Err(e) => {
                self.report(ErrorKind::FileUnreadable {
                    path: path.to_string(),
                    reason: e.to_string(),
                });
                String::new()
            }
        };

        for line in content.split('\n') {
            self.contexts.next_line();

            match classify(line) {
                Ok(Line::Skip) => continue,
                Ok(Line::Assignment { key, value }) => {
                    let value = self.resolve(value);
                    self.assign(key, value);
                }
                Err(kind) => {
                    self.report(kind);
                    break;
                }
            }
        }

        self.contexts.pop();
    }

    fn assign(&mut self, key: &str, value: String) {
        if key.eq_ignore_ascii_case(INCLUDE_KEY) {
            self.parse(&value);
        } else {
            self.variables.upsert(key, value);
        }
    }

    /// Find `path` relative to the active file, the working directory, then
    /// the launcher directory
    ///
    /// When nothing matches, the miss is reported and `path` is returned as is
    /// so the read failure is reported against it too.
    fn resolve_path(&mut self, path: &str) -> PathBuf {
        let mut roots: Vec<&Path> = Vec::with_capacity(3);
        if let Some(dir) = self.contexts.active_dir() {
            roots.push(dir);
        }
        roots.push(&self.env.working_dir);
        roots.push(&self.env.launcher_dir);

        let found = roots
            .into_iter()
            .map(|root| root.join(path))
            .find(|candidate| candidate.is_file());

        match found {
            Some(candidate) => std::fs::canonicalize(&candidate).unwrap_or(candidate),
            None => {
                self.report(ErrorKind::FileNotFound(path.to_string()));
                PathBuf::from(path)
            }
        }
    }

    /// Location of the file currently being parsed
    pub fn active_location(&self) -> Option<&Location> {
        self.contexts.active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn session_in(dir: &TempDir) -> ParseSession {
        let env = HostEnvironment {
            machine_name: "arcade".to_string(),
            user_name: "player1".to_string(),
            working_dir: dir.path().to_path_buf(),
            launcher_dir: dir.path().join("bin"),
            config_dir: dir.path().to_path_buf(),
        };
        ParseSession::new(env, ShutdownTimeout::default())
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn kinds(session: &ParseSession) -> Vec<ErrorKind> {
        session.diagnostics().iter().map(|d| d.kind.clone()).collect()
    }

    // ── line classification ─────────────────────────────────────────────────

    #[test]
    fn test_classify_skips_comments_and_blanks() {
        for line in ["", "   ", "\t\r", "// x", "; x", "# x", "   # indented"] {
            assert_eq!(classify(line), Ok(Line::Skip), "line {:?}", line);
        }
    }

    #[test]
    fn test_classify_splits_at_first_separator() {
        assert_eq!(
            classify("  url = http://host/?a=b  \r"),
            Ok(Line::Assignment {
                key: "url",
                value: "http://host/?a=b"
            })
        );
    }

    #[test]
    fn test_classify_structural_errors() {
        assert_eq!(classify("no_equals_here"), Err(ErrorKind::MissingSeparator));
        assert_eq!(classify("  = value"), Err(ErrorKind::EmptyKey));
        assert_eq!(classify("my key = 1"), Err(ErrorKind::InvalidKeyCharacter(' ')));
        assert_eq!(classify("$key$ = 1"), Err(ErrorKind::InvalidKeyCharacter('$')));
    }

    // ── seeding ─────────────────────────────────────────────────────────────

    #[test]
    fn test_seeded_variables() {
        let dir = tempdir().unwrap();
        let session = session_in(&dir);
        let keys: Vec<&str> = session.variables().iter().map(|v| v.key.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "launch_exe",
                "launch_args",
                "launch_dir",
                "MachineName",
                "UserName",
                "WorkingDir",
                "EmuLauncherDir",
                "ConfigFileDir",
                "shutdown_timeout"
            ]
        );
        assert_eq!(session.variables().get("shutdown_timeout"), Some("5000"));
        assert_eq!(session.variables().get("username"), Some("player1"));
    }

    // ── parsing ─────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_assignments_with_references() {
        let dir = tempdir().unwrap();
        write(&dir, "game.emu", "a = 1\nb = $a$2\nhost = $MachineName$\n");

        let mut session = session_in(&dir);
        session.parse("game.emu");

        assert!(session.diagnostics().is_empty(), "{}", session.diagnostics());
        assert_eq!(session.variables().get("a"), Some("1"));
        assert_eq!(session.variables().get("b"), Some("12"));
        assert_eq!(session.variables().get("host"), Some("arcade"));
    }

    #[test]
    fn test_parse_reassignment_ignores_case() {
        let dir = tempdir().unwrap();
        write(&dir, "game.emu", "EXE = foo\nexe = bar\n");

        let mut session = session_in(&dir);
        session.parse("game.emu");

        let matching: Vec<_> = session
            .variables()
            .iter()
            .filter(|v| v.key.eq_ignore_ascii_case("exe"))
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].value, "bar");
    }

    #[test]
    fn test_comments_add_nothing() {
        let dir = tempdir().unwrap();
        write(&dir, "game.emu", "// x\n; x\n# x\n\n   \n\t\n");

        let mut session = session_in(&dir);
        let before = session.variables().len();
        session.parse("game.emu");

        assert!(session.diagnostics().is_empty());
        assert_eq!(session.variables().len(), before);
    }

    #[test]
    fn test_missing_separator_stops_the_file() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "game.emu", "first = 1\nno_equals_here\nlater = 2\n");

        let mut session = session_in(&dir);
        session.parse("game.emu");

        assert_eq!(kinds(&session), vec![ErrorKind::MissingSeparator]);
        let diagnostic = session.diagnostics().iter().next().unwrap();
        let location = diagnostic.location.as_ref().unwrap();
        assert_eq!(location.file, fs::canonicalize(path).unwrap());
        assert_eq!(location.line, 2);

        assert_eq!(session.variables().get("first"), Some("1"));
        assert_eq!(session.variables().get("later"), None);
    }

    #[test]
    fn test_error_on_last_line_without_newline() {
        let dir = tempdir().unwrap();
        write(&dir, "game.emu", "a = 1\n\nbroken");

        let mut session = session_in(&dir);
        session.parse("game.emu");

        let diagnostic = session.diagnostics().iter().next().unwrap();
        assert_eq!(diagnostic.location.as_ref().unwrap().line, 3);
    }

    #[test]
    fn test_unterminated_delimiter_keeps_value() {
        let dir = tempdir().unwrap();
        write(&dir, "game.emu", "v = $foo\n");

        let mut session = session_in(&dir);
        session.parse("game.emu");

        assert_eq!(
            kinds(&session),
            vec![ErrorKind::UnterminatedDelimiter("$foo".to_string())]
        );
        assert_eq!(session.variables().get("v"), Some("$foo"));
    }

    #[test]
    fn test_undefined_variables_are_all_reported() {
        let dir = tempdir().unwrap();
        write(&dir, "game.emu", "v = $nope$-$also_nope$\nw = ok\n");

        let mut session = session_in(&dir);
        session.parse("game.emu");

        assert_eq!(
            kinds(&session),
            vec![
                ErrorKind::UndefinedVariable("nope".to_string()),
                ErrorKind::UndefinedVariable("also_nope".to_string()),
            ]
        );
        // Recoverable: the rest of the file is still applied
        assert_eq!(session.variables().get("v"), Some("-"));
        assert_eq!(session.variables().get("w"), Some("ok"));
    }

    #[test]
    fn test_parse_is_noop_after_errors() {
        let dir = tempdir().unwrap();
        write(&dir, "game.emu", "a = 1\n");

        let mut session = session_in(&dir);
        session.report(ErrorKind::MissingArgument);
        session.parse("game.emu");

        assert_eq!(session.variables().get("a"), None);
        assert_eq!(session.diagnostics().len(), 1);
    }

    #[test]
    fn test_missing_file_reports_lookup_and_read() {
        let dir = tempdir().unwrap();

        let mut session = session_in(&dir);
        session.parse("missing.emu");

        let recorded = kinds(&session);
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0], ErrorKind::FileNotFound("missing.emu".to_string()));
        assert!(matches!(recorded[1], ErrorKind::FileUnreadable { .. }));
        // The context is popped even though the file never opened
        assert!(session.active_location().is_none());
    }

    // ── includes ────────────────────────────────────────────────────────────

    #[test]
    fn test_include_shares_variables() {
        let dir = tempdir().unwrap();
        write(&dir, "common/b.emu", "x = 1\n");
        write(&dir, "a.emu", "include = common/b.emu\ny = $x$$x$\n");

        let mut session = session_in(&dir);
        session.parse("a.emu");

        assert!(session.diagnostics().is_empty(), "{}", session.diagnostics());
        assert_eq!(session.variables().get("x"), Some("1"));
        assert_eq!(session.variables().get("y"), Some("11"));
    }

    #[test]
    fn test_include_resolves_relative_to_including_file() {
        let dir = tempdir().unwrap();
        write(&dir, "games/snes.emu", "INCLUDE = shared.emu\n");
        write(&dir, "games/shared.emu", "core = snes9x\n");

        let mut session = session_in(&dir);
        session.parse("games/snes.emu");

        assert!(session.diagnostics().is_empty(), "{}", session.diagnostics());
        assert_eq!(session.variables().get("core"), Some("snes9x"));
    }

    #[test]
    fn test_include_falls_back_to_launcher_dir() {
        let dir = tempdir().unwrap();
        write(&dir, "bin/defaults.emu", "from_launcher = yes\n");
        write(&dir, "games/snes.emu", "include = defaults.emu\n");

        let mut session = session_in(&dir);
        session.parse("games/snes.emu");

        assert!(session.diagnostics().is_empty(), "{}", session.diagnostics());
        assert_eq!(session.variables().get("from_launcher"), Some("yes"));
    }

    #[test]
    fn test_error_in_include_is_attributed_to_included_file() {
        let dir = tempdir().unwrap();
        let b = write(&dir, "b.emu", "# header\nbad line\n");
        write(&dir, "a.emu", "include = b.emu\nafter = 1\n");

        let mut session = session_in(&dir);
        session.parse("a.emu");

        let diagnostic = session.diagnostics().iter().next().unwrap();
        assert_eq!(diagnostic.kind, ErrorKind::MissingSeparator);
        let location = diagnostic.location.as_ref().unwrap();
        assert_eq!(location.file, fs::canonicalize(b).unwrap());
        assert_eq!(location.line, 2);
        assert_eq!(session.diagnostics().len(), 1);
    }

    #[test]
    fn test_missing_include_is_attributed_to_include_line() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.emu", "x = 1\ninclude = nowhere.emu\n");

        let mut session = session_in(&dir);
        session.parse("a.emu");

        let first = session.diagnostics().iter().next().unwrap();
        assert_eq!(first.kind, ErrorKind::FileNotFound("nowhere.emu".to_string()));
        let location = first.location.as_ref().unwrap();
        assert_eq!(location.file, fs::canonicalize(a).unwrap());
        assert_eq!(location.line, 2);
    }

    #[test]
    fn test_include_cycle_is_detected() {
        let dir = tempdir().unwrap();
        write(&dir, "a.emu", "include = b.emu\n");
        write(&dir, "b.emu", "include = ./a.emu\n");

        let mut session = session_in(&dir);
        session.parse("a.emu");

        assert_eq!(session.diagnostics().len(), 1);
        assert!(session
            .diagnostics()
            .any(|k| matches!(k, ErrorKind::CycleDetected(_))));
    }

    #[test]
    fn test_same_file_included_twice_is_not_a_cycle() {
        let dir = tempdir().unwrap();
        write(&dir, "count.emu", "n = $n$1\n");
        write(&dir, "a.emu", "n = 0\ninclude = count.emu\ninclude = count.emu\n");

        let mut session = session_in(&dir);
        session.parse("a.emu");

        assert!(session.diagnostics().is_empty(), "{}", session.diagnostics());
        assert_eq!(session.variables().get("n"), Some("011"));
    }

    #[test]
    fn test_byte_order_mark_before_assignment() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "bom.emu", "\u{FEFF}launch_exe = /bin/true\nlaunch_args = -v\n");
        let mut session = session_in(&dir);

        session.parse(path.to_str().unwrap());

        assert!(session.diagnostics().is_empty());
        assert_eq!(session.variables().get("launch_exe"), Some("/bin/true"));
        assert_eq!(session.variables().get("launch_args"), Some("-v"));
        assert!(session.variables().iter().all(|v| !v.key.starts_with('\u{FEFF}')));
    }

    #[test]
    fn test_byte_order_mark_before_comment() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "bom.emu", "\u{FEFF}// saved by notepad\ncore = snes9x\n");
        let mut session = session_in(&dir);

        session.parse(path.to_str().unwrap());

        assert!(session.diagnostics().is_empty(), "{}", session.diagnostics());
        assert_eq!(session.variables().get("core"), Some("snes9x"));
    }
}
