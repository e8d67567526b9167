//! Load → validate → render → launch sequencing for one schema.

use crate::error::{SchemaLoadError, SubmitError};
use crate::executor::Launcher;
use crate::model::Schema;
use crate::paths;
use crate::platform::Platform;
use crate::template;
use crate::validation::{validate_form, FormValues, ValidationResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a submission attempt that did not hit an error.
#[derive(Debug)]
pub enum Submission {
    /// At least one field failed; nothing was launched.
    Invalid(Vec<ValidationResult>),
    /// Terminal started; the script runs from this temporary file.
    Launched(PathBuf),
}

/// Validated and rendered script, not yet launched.
#[derive(Debug)]
pub enum Prepared {
    Invalid(Vec<ValidationResult>),
    Ready(String),
}

#[derive(Debug)]
pub struct Session {
    schema: Schema,
}

impl Session {
    pub fn open(path: &Path) -> Result<Self, SchemaLoadError> {
        Ok(Self::new(Schema::load(path)?))
    }

    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Location of the template for `platform`: expanded, and the sibling
    /// `.ps1` on Windows.
    pub fn script_path(&self, platform: &Platform) -> PathBuf {
        let expanded = paths::expand(&self.schema.script_path);
        if platform.is_windows() {
            let base = expanded.strip_suffix(".sh").unwrap_or(&expanded);
            PathBuf::from(format!("{base}.ps1"))
        } else {
            PathBuf::from(expanded)
        }
    }

    /// Validate `values` and, if the form is valid, render the script.
    pub fn prepare(&self, values: &FormValues, platform: &Platform) -> Result<Prepared, SubmitError> {
        let form = validate_form(&self.schema.entries, values);
        if !form.all_valid {
            return Ok(Prepared::Invalid(form.results));
        }

        let path = self.script_path(platform);
        let body = fs::read_to_string(&path).map_err(|source| SubmitError::ScriptRead {
            path: path.clone(),
            source,
        })?;
        let script = template::render(&body, &form.environment).map_err(SubmitError::Template)?;
        Ok(Prepared::Ready(script))
    }

    pub fn submit(
        &self,
        values: &FormValues,
        launcher: &dyn Launcher,
    ) -> Result<Submission, SubmitError> {
        match self.prepare(values, launcher.platform())? {
            Prepared::Invalid(results) => Ok(Submission::Invalid(results)),
            Prepared::Ready(script) => {
                let path = launcher.launch(&script)?;
                Ok(Submission::Launched(path))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{LaunchError, ValidationError};
    use crate::validation::InputValue;
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    /// Records launched scripts; the first `failures` launches fail.
    pub(crate) struct Recorder {
        platform: Platform,
        pub(crate) launched: RefCell<Vec<String>>,
        pub(crate) failures: Cell<usize>,
    }

    impl Recorder {
        pub(crate) fn new(platform: Platform) -> Self {
            Self {
                platform,
                launched: RefCell::new(Vec::new()),
                failures: Cell::new(0),
            }
        }
    }

    impl Launcher for Recorder {
        fn platform(&self) -> &Platform {
            &self.platform
        }

        fn launch(&self, script_body: &str) -> Result<PathBuf, LaunchError> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(LaunchError::SpawnFailed {
                    program: "term".into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            self.launched.borrow_mut().push(script_body.to_string());
            Ok(PathBuf::from("/tmp/script_test.sh"))
        }
    }

    pub(crate) fn fixture(script: &str) -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        let script_path = dir.path().join("run.sh");
        fs::write(&script_path, script).unwrap();
        fs::write(dir.path().join("run.ps1"), "Write-Host _PORT").unwrap();

        let schema = format!(
            r#"{{
                "Header": "Node",
                "SubmitButtonText": "Go",
                "exec": {exec},
                "Entries": [
                    {{"VariableName": "PORT", "Question": "Port", "CanBeNull": false, "Type": "int"}},
                    {{"VariableName": "NAMESPACE", "Question": "Namespace", "Type": "string"}},
                    {{"VariableName": "NAME", "Question": "Name", "Type": "string"}}
                ]
            }}"#,
            exec = serde_json::to_string(&script_path.to_string_lossy()).unwrap()
        );
        let schema_path = dir.path().join("schema.json");
        fs::write(&schema_path, schema).unwrap();

        let session = Session::open(&schema_path).unwrap();
        (dir, session)
    }

    pub(crate) fn values(port: &str) -> FormValues {
        [
            ("PORT", InputValue::Text(port.into())),
            ("NAMESPACE", InputValue::Choice("prod".into())),
            ("NAME", InputValue::Text("web".into())),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn valid_submission_renders_and_launches() {
        let (_dir, session) = fixture("listen _PORT\nkubectl -n _NAMESPACE rollout _NAME\n");
        let launcher = Recorder::new(Platform::Linux);

        let outcome = session.submit(&values("8080"), &launcher).unwrap();
        assert!(matches!(outcome, Submission::Launched(_)));
        assert_eq!(
            launcher.launched.borrow().as_slice(),
            ["listen 8080\nkubectl -n prod rollout web\n"]
        );
    }

    #[test]
    fn invalid_submission_does_not_launch() {
        let (_dir, session) = fixture("listen _PORT");
        let launcher = Recorder::new(Platform::Linux);

        let outcome = session.submit(&values("abc"), &launcher).unwrap();
        let Submission::Invalid(results) = outcome else {
            panic!("expected invalid submission");
        };
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].error,
            Some(ValidationError::TypeMismatch {
                expected: crate::model::ValueType::Int
            })
        );
        assert!(launcher.launched.borrow().is_empty());
    }

    #[test]
    fn windows_uses_sibling_powershell_script() {
        let (_dir, session) = fixture("listen _PORT");
        let launcher = Recorder::new(Platform::Windows);

        assert!(session
            .script_path(&Platform::Windows)
            .to_string_lossy()
            .ends_with("run.ps1"));
        session.submit(&values("22"), &launcher).unwrap();
        assert_eq!(launcher.launched.borrow().as_slice(), ["Write-Host 22"]);
    }

    #[test]
    fn missing_script_is_a_recoverable_error() {
        let (dir, session) = fixture("listen _PORT");
        fs::remove_file(dir.path().join("run.sh")).unwrap();
        let launcher = Recorder::new(Platform::Linux);

        let err = session.submit(&values("22"), &launcher).unwrap_err();
        assert!(matches!(err, SubmitError::ScriptRead { .. }));

        // Same session can be resubmitted once the script is back.
        fs::write(dir.path().join("run.sh"), "ok _PORT").unwrap();
        session.submit(&values("23"), &launcher).unwrap();
        assert_eq!(launcher.launched.borrow().as_slice(), ["ok 23"]);
    }

    #[test]
    fn launch_errors_are_surfaced() {
        let (_dir, session) = fixture("listen _PORT");
        let launcher = Recorder::new(Platform::Linux);
        launcher.failures.set(1);

        let err = session.submit(&values("22"), &launcher).unwrap_err();
        assert!(matches!(err, SubmitError::Launch(LaunchError::SpawnFailed { .. })));
    }

    #[test]
    fn prepare_returns_rendered_script() {
        let (_dir, session) = fixture("echo _NAME");
        match session.prepare(&values("1"), &Platform::Linux).unwrap() {
            Prepared::Ready(script) => assert_eq!(script, "echo web"),
            Prepared::Invalid(results) => panic!("unexpected errors: {results:?}"),
        }
    }

    #[test]
    fn open_rejects_malformed_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"Entries\": [").unwrap();
        assert!(matches!(
            Session::open(&path),
            Err(SchemaLoadError::Parse { .. })
        ));
    }
}
