//! # Field Schema Module
//!
//! Ordered question lists and their column layouts. Each schema is a contract
//! with whoever reads the spreadsheet: columns must not move silently.
//!
//! ## Layouts
//!
//! | Schema   | Prompts | Columns |
//! |----------|---------|---------|
//! | GIM      | 9       | Date, Name, Type, Amount, OT, DINCEL, *(total)*, Helper, Earned, Time |
//! | TR work  | 7       | Date, Name, Type, Amount, Helper, Earned, Time, *(exit earned)*, *(exit time)* |
//! | TR exit  | 7       | *(seven blanks)*, Earned, Time |
//!
//! The GIM total column is filled by a formula on the sheet side. Both TR
//! schemas ask the same questions and share one sheet, so an exit row carries
//! only its earned amount and time in the trailing block.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level category; also the name of the worksheet rows go to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Gim,
    Tr,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Gim, Mode::Tr];

    /// Worksheet title
    pub fn sheet_name(self) -> &'static str {
        match self {
            Mode::Gim => "GIM",
            Mode::Tr => "TR",
        }
    }

    /// Parse a user reply, ignoring case and surrounding whitespace
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_uppercase().as_str() {
            "GIM" | "ГИМ" => Some(Mode::Gim),
            "TR" | "ТР" => Some(Mode::Tr),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// Record kind within the TR category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubMode {
    Work,
    Exit,
}

impl SubMode {
    pub const ALL: [SubMode; 2] = [SubMode::Work, SubMode::Exit];

    pub fn label(self) -> &'static str {
        match self {
            SubMode::Work => "WORK",
            SubMode::Exit => "EXIT",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_uppercase().as_str() {
            "WORK" | "РАБОТА" => Some(SubMode::Work),
            "EXIT" | "ВЫХОД" => Some(SubMode::Exit),
            _ => None,
        }
    }
}

/// A single collected answer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKey {
    Date,
    Name,
    WorkType,
    Amount,
    Overtime,
    Dincel,
    Helper,
    Earned,
    Time,
}

impl FieldKey {
    /// Localization key of the question text
    pub fn prompt_key(self) -> &'static str {
        match self {
            FieldKey::Date => "prompt-date",
            FieldKey::Name => "prompt-name",
            FieldKey::WorkType => "prompt-work-type",
            FieldKey::Amount => "prompt-amount",
            FieldKey::Overtime => "prompt-overtime",
            FieldKey::Dincel => "prompt-dincel",
            FieldKey::Helper => "prompt-helper",
            FieldKey::Earned => "prompt-earned",
            FieldKey::Time => "prompt-time",
        }
    }
}

/// Validates and normalizes a free-text answer
pub type Validator = fn(&str) -> Result<String, &'static str>;

/// Accepts any non-blank answer, trimmed
pub fn non_empty(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("answer-empty");
    }
    Ok(trimmed.to_string())
}

/// One question of a schema
#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub validator: Validator,
}

impl FieldSpec {
    const fn text(key: FieldKey) -> Self {
        Self { key, validator: non_empty }
    }
}

/// Destination of one spreadsheet column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Field(FieldKey),
    Blank,
}

/// Identifies one of the fixed schemas
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaKind {
    Gim,
    TrWork,
    TrExit,
}

/// Ordered prompts plus the column layout they are written with
pub struct Schema {
    pub mode: Mode,
    pub fields: &'static [FieldSpec],
    pub columns: &'static [Column],
}

use Column::{Blank, Field};
use FieldKey::*;

const GIM_FIELDS: [FieldSpec; 9] = [
    FieldSpec::text(Date),
    FieldSpec::text(Name),
    FieldSpec::text(WorkType),
    FieldSpec::text(Amount),
    FieldSpec::text(Overtime),
    FieldSpec::text(Dincel),
    FieldSpec::text(Helper),
    FieldSpec::text(Earned),
    FieldSpec::text(Time),
];

const GIM_COLUMNS: [Column; 10] = [
    Field(Date),
    Field(Name),
    Field(WorkType),
    Field(Amount),
    Field(Overtime),
    Field(Dincel),
    Blank,
    Field(Helper),
    Field(Earned),
    Field(Time),
];

const TR_FIELDS: [FieldSpec; 7] = [
    FieldSpec::text(Date),
    FieldSpec::text(Name),
    FieldSpec::text(WorkType),
    FieldSpec::text(Amount),
    FieldSpec::text(Helper),
    FieldSpec::text(Earned),
    FieldSpec::text(Time),
];

const TR_WORK_COLUMNS: [Column; 9] = [
    Field(Date),
    Field(Name),
    Field(WorkType),
    Field(Amount),
    Field(Helper),
    Field(Earned),
    Field(Time),
    Blank,
    Blank,
];

const TR_EXIT_COLUMNS: [Column; 9] = [
    Blank,
    Blank,
    Blank,
    Blank,
    Blank,
    Blank,
    Blank,
    Field(Earned),
    Field(Time),
];

static GIM: Schema = Schema {
    mode: Mode::Gim,
    fields: &GIM_FIELDS,
    columns: &GIM_COLUMNS,
};

static TR_WORK: Schema = Schema {
    mode: Mode::Tr,
    fields: &TR_FIELDS,
    columns: &TR_WORK_COLUMNS,
};

static TR_EXIT: Schema = Schema {
    mode: Mode::Tr,
    fields: &TR_FIELDS,
    columns: &TR_EXIT_COLUMNS,
};

impl SchemaKind {
    pub fn schema(self) -> &'static Schema {
        match self {
            SchemaKind::Gim => &GIM,
            SchemaKind::TrWork => &TR_WORK,
            SchemaKind::TrExit => &TR_EXIT,
        }
    }

    /// Schema for a mode and, where the mode needs one, a sub-mode
    ///
    /// Returns `None` for TR without a sub-mode.
    pub fn select(mode: Mode, sub_mode: Option<SubMode>) -> Option<Self> {
        match (mode, sub_mode) {
            (Mode::Gim, _) => Some(SchemaKind::Gim),
            (Mode::Tr, Some(SubMode::Work)) => Some(SchemaKind::TrWork),
            (Mode::Tr, Some(SubMode::Exit)) => Some(SchemaKind::TrExit),
            (Mode::Tr, None) => None,
        }
    }
}

impl Schema {
    pub fn sheet_name(&self) -> &'static str {
        self.mode.sheet_name()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Build the output row from answers given in field order
    ///
    /// Blank columns and fields without an answer become empty strings, so
    /// the row always has exactly `column_count()` cells.
    pub fn build_row(&self, answers: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| match column {
                Column::Blank => String::new(),
                Column::Field(key) => self
                    .fields
                    .iter()
                    .position(|spec| spec.key == *key)
                    .and_then(|index| answers.get(index))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect()
    }
}
