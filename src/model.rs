use crate::error::SchemaLoadError;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

const FILE_PICKER: &str = "FILEPICKER";
const FOLDER_PICKER: &str = "FOLDERPICKER";

/// Schema document as it appears on disk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaFile {
    #[serde(default)]
    pub header: String,

    #[serde(default)]
    pub entries: Vec<EntryFile>,

    #[serde(default = "default_submit_label")]
    pub submit_button_text: String,

    /// Script template path.
    #[serde(rename = "exec")]
    pub exec: String,
}

fn default_submit_label() -> String {
    "Submit".into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntryFile {
    pub variable_name: String,

    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub can_be_null: bool,

    #[serde(default)]
    pub acceptable_answers: Option<Vec<String>>,

    #[serde(default)]
    pub placeholder: Option<String>,

    #[serde(rename = "Type")]
    pub value_type: ValueType,

    #[serde(default)]
    pub allowed_chars: Option<String>,

    #[serde(default)]
    pub min_length: Option<usize>,

    #[serde(default)]
    pub max_length: Option<usize>,
}

/// Semantic type a field value must parse as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    Float,
    String,
    Password,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Password => "password",
        })
    }
}

/// How the presentation layer collects a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
    FilePicker,
    FolderPicker,
}

/// Regular expression that must match a whole value.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        // The source must stand alone before it is anchored.
        Regex::new(source)?;
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_full_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub question: String,
    pub nullable: bool,
    /// Choices for text fields, extension filter for file pickers.
    pub acceptable_answers: Vec<String>,
    pub kind: FieldKind,
    pub placeholder: Option<String>,
    pub value_type: ValueType,
    pub allowed_chars: Option<Pattern>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl FieldSpec {
    /// Presented as a closed choice rather than free text.
    pub fn is_choice(&self) -> bool {
        matches!(self.kind, FieldKind::Text | FieldKind::Password)
            && !self.acceptable_answers.is_empty()
    }

    pub fn is_picker(&self) -> bool {
        matches!(self.kind, FieldKind::FilePicker | FieldKind::FolderPicker)
    }
}

impl TryFrom<EntryFile> for FieldSpec {
    type Error = SchemaLoadError;

    fn try_from(entry: EntryFile) -> Result<Self, Self::Error> {
        let kind = match entry.placeholder.as_deref() {
            Some(FILE_PICKER) => FieldKind::FilePicker,
            Some(FOLDER_PICKER) => FieldKind::FolderPicker,
            _ if entry.value_type == ValueType::Password => FieldKind::Password,
            _ => FieldKind::Text,
        };
        let placeholder = match kind {
            FieldKind::Text | FieldKind::Password => entry.placeholder,
            FieldKind::FilePicker | FieldKind::FolderPicker => None,
        };

        let allowed_chars = match entry.allowed_chars.as_deref() {
            None | Some("") => None,
            Some(source) => Some(Pattern::new(source).map_err(|source| {
                SchemaLoadError::InvalidPattern {
                    field: entry.variable_name.clone(),
                    source,
                }
            })?),
        };

        if let (Some(min), Some(max)) = (entry.min_length, entry.max_length) {
            if min > max {
                return Err(SchemaLoadError::InvalidBounds {
                    field: entry.variable_name,
                    min,
                    max,
                });
            }
        }

        Ok(FieldSpec {
            name: entry.variable_name,
            question: entry.question,
            nullable: entry.can_be_null,
            acceptable_answers: entry.acceptable_answers.unwrap_or_default(),
            kind,
            placeholder,
            value_type: entry.value_type,
            allowed_chars,
            min_length: entry.min_length,
            max_length: entry.max_length,
        })
    }
}

/// Loaded, checked schema. Read-only after load.
#[derive(Debug, Clone)]
pub struct Schema {
    pub header: String,
    pub entries: Vec<FieldSpec>,
    pub submit_label: String,
    pub script_path: String,
}

impl Schema {
    pub fn load(path: &Path) -> Result<Self, SchemaLoadError> {
        let text = fs::read_to_string(path).map_err(|source| SchemaLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parse schema text; `path` is only used for error context.
    pub fn parse(path: &Path, text: &str) -> Result<Self, SchemaLoadError> {
        let file: SchemaFile =
            serde_json::from_str(text).map_err(|source| SchemaLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let schema = Self::try_from(file)?;
        tracing::debug!(
            path = %path.display(),
            entries = schema.entries.len(),
            "schema loaded"
        );
        Ok(schema)
    }
}

impl TryFrom<SchemaFile> for Schema {
    type Error = SchemaLoadError;

    fn try_from(file: SchemaFile) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(file.entries.len());

        for (index, entry) in file.entries.into_iter().enumerate() {
            if entry.variable_name.trim().is_empty() {
                return Err(SchemaLoadError::EmptyName { index });
            }
            if !seen.insert(entry.variable_name.clone()) {
                return Err(SchemaLoadError::DuplicateName(entry.variable_name));
            }
            entries.push(FieldSpec::try_from(entry)?);
        }

        Ok(Schema {
            header: file.header,
            entries,
            submit_label: file.submit_button_text,
            script_path: file.exec,
        })
    }
}
