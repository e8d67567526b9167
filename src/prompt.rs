//! Line-oriented presentation using dialoguer prompts.

use crate::executor::Launcher;
use crate::model::{FieldKind, FieldSpec, Schema};
use crate::paths;
use crate::session::{Session, Submission};
use crate::validation::{validate, FormValues, InputValue};
use anyhow::Result;
use dialoguer::{Confirm, Input, Password, Select};
use std::fs;
use std::path::Path;

/// Ask for every field in order, re-prompting until each one is valid.
/// Returns `None` when the user backs out of a choice.
pub fn collect(schema: &Schema) -> Result<Option<FormValues>> {
    if !schema.header.is_empty() {
        println!("{}\n", schema.header);
    }

    let mut values = FormValues::new();
    for spec in &schema.entries {
        let value = if spec.is_choice() {
            let Some(idx) = Select::new()
                .with_prompt(label(spec))
                .items(spec.acceptable_answers.as_slice())
                .default(0)
                .interact_opt()?
            else {
                return Ok(None);
            };
            InputValue::Choice(spec.acceptable_answers[idx].clone())
        } else {
            match spec.kind {
                FieldKind::FilePicker | FieldKind::FolderPicker => {
                    match pick_path(spec, "")? {
                        Some(path) => InputValue::Path(path),
                        None => InputValue::Path(String::new()),
                    }
                }
                FieldKind::Password => InputValue::Text(
                    Password::new()
                        .with_prompt(label(spec))
                        .allow_empty_password(true)
                        .validate_with(|raw: &String| field_check(spec, raw))
                        .interact()?,
                ),
                FieldKind::Text => {
                    let prompt = match &spec.placeholder {
                        Some(hint) if !hint.is_empty() => format!("{} [{}]", label(spec), hint),
                        _ => label(spec).to_string(),
                    };
                    InputValue::Text(
                        Input::<String>::new()
                            .with_prompt(prompt)
                            .allow_empty(true)
                            .validate_with(|raw: &String| field_check(spec, raw))
                            .interact_text()?,
                    )
                }
            }
        };
        values.set(spec.name.clone(), value);
    }

    Ok(Some(values))
}

/// Submit `values`, asking whether to try again after each failed attempt.
/// Returns `None` when the user declines.
pub fn submit(
    session: &Session,
    values: &FormValues,
    launcher: &dyn Launcher,
) -> Result<Option<Submission>> {
    submit_with(session, values, launcher, |_| {
        Ok(Confirm::new()
            .with_prompt("Try again?")
            .default(true)
            .interact()?)
    })
}

fn submit_with(
    session: &Session,
    values: &FormValues,
    launcher: &dyn Launcher,
    mut retry: impl FnMut(&anyhow::Error) -> Result<bool>,
) -> Result<Option<Submission>> {
    loop {
        match session.submit(values, launcher) {
            Ok(submission) => return Ok(Some(submission)),
            Err(err) => {
                let err = anyhow::Error::new(err);
                tracing::debug!(error = %err, "submission failed");
                eprintln!("Error: {:#}", err);
                if !retry(&err)? {
                    return Ok(None);
                }
            }
        }
    }
}

/// Prompt for a path for a picker field. The answer is expanded, must exist,
/// and must satisfy the field rules. Empty input yields `None`.
pub fn pick_path(spec: &FieldSpec, current: &str) -> Result<Option<String>> {
    let raw = Input::<String>::new()
        .with_prompt(label(spec))
        .with_initial_text(current)
        .allow_empty(true)
        .validate_with(|raw: &String| -> Result<(), String> {
            if raw.is_empty() {
                return field_check(spec, raw);
            }
            let path = paths::expand(raw);
            check_picked_path(spec, Path::new(&path))?;
            field_check(spec, &path)
        })
        .interact_text()?;

    if raw.is_empty() {
        Ok(None)
    } else {
        Ok(Some(paths::expand(&raw)))
    }
}

/// The picked path must exist as the kind of entry the field asks for, and a
/// file must carry one of the listed extensions when any are listed.
pub fn check_picked_path(spec: &FieldSpec, path: &Path) -> Result<(), String> {
    let meta = fs::metadata(path).map_err(|_| format!("{} does not exist", path.display()))?;

    match spec.kind {
        FieldKind::FolderPicker if !meta.is_dir() => {
            Err(format!("{} is not a folder", path.display()))
        }
        FieldKind::FilePicker if !meta.is_file() => {
            Err(format!("{} is not a file", path.display()))
        }
        FieldKind::FilePicker if !spec.acceptable_answers.is_empty() => {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let allowed = spec
                .acceptable_answers
                .iter()
                .any(|a| a.trim_start_matches('.').to_lowercase() == ext);
            if allowed {
                Ok(())
            } else {
                Err(format!(
                    "Expecting a .{} file",
                    spec.acceptable_answers.join(", .")
                ))
            }
        }
        _ => Ok(()),
    }
}

fn field_check(spec: &FieldSpec, raw: &str) -> Result<(), String> {
    match validate(spec, raw).message() {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

fn label(spec: &FieldSpec) -> &str {
    if spec.question.is_empty() {
        &spec.name
    } else {
        &spec.question
    }
}
