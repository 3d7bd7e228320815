//! Onboarding (access request) form schema.
//!
//! A premium channel may define a multi-step form the viewer fills in to
//! request access. Each field is one of a closed set of kinds; answers are
//! validated against the schema before the completion RPC is issued.
//!
//! ```toml
//! [channels.pune_mp.onboarding]
//! finish_rpc = "finish_pune_onboarding"
//!
//! [[channels.pune_mp.onboarding.screens]]
//! id = "about"
//! title = "About you"
//!
//! [[channels.pune_mp.onboarding.screens.fields]]
//! id = "ward"
//! label = "Ward"
//! type = "select"
//! required = true
//! options = ["Kothrud", "Baner"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Complete form definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingConfig {
    /// Screens in display order.
    #[serde(default)]
    pub screens: Vec<OnboardingScreen>,
    /// Name of the RPC invoked with the collected answers.
    pub finish_rpc: String,
}

/// One step of the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingScreen {
    /// Screen identifier.
    pub id: String,
    /// Heading shown above the fields.
    #[serde(default)]
    pub title: String,
    /// Fields on this screen.
    #[serde(default)]
    pub fields: Vec<OnboardingField>,
}

/// A single form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingField {
    /// Answer key; unique across the whole form.
    pub id: String,
    /// Prompt shown to the viewer.
    #[serde(default)]
    pub label: String,
    /// Whether an answer must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Kind-specific settings.
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// The closed set of field kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text.
    Text {
        /// Maximum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Exactly one of `options`.
    Select {
        /// Allowed values.
        options: Vec<String>,
    },
    /// Any subset of `options`.
    Multiselect {
        /// Allowed values.
        options: Vec<String>,
        /// Upper bound on the number of selected values.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_selected: Option<usize>,
    },
    /// A checkbox. A required boolean must be checked.
    Boolean,
}

impl FieldKind {
    /// Name of the kind as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Select { .. } => "select",
            FieldKind::Multiselect { .. } => "multiselect",
            FieldKind::Boolean => "boolean",
        }
    }

    /// Options of select-like kinds.
    pub fn options(&self) -> Option<&[String]> {
        match self {
            FieldKind::Select { options } | FieldKind::Multiselect { options, .. } => {
                Some(options)
            }
            _ => None,
        }
    }
}

/// A viewer's answer to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Checkbox state.
    Flag(bool),
    /// Free text or the chosen select option.
    Text(String),
    /// Chosen multiselect options.
    Choices(Vec<String>),
}

/// Answers keyed by field id.
pub type Answers = BTreeMap<String, AnswerValue>;

/// Answer validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum OnboardingError {
    #[error("field '{0}' is required")]
    MissingRequired(String),
    #[error("field '{field}' expects a {expected} answer")]
    WrongKind {
        field: String,
        expected: &'static str,
    },
    #[error("'{value}' is not an option of field '{field}'")]
    UnknownOption { field: String, value: String },
    #[error("field '{field}' is limited to {max} characters")]
    TooLong { field: String, max: usize },
    #[error("field '{field}' allows at most {max} selections")]
    TooManySelected { field: String, max: usize },
    #[error("answer for unknown field '{0}'")]
    UnknownField(String),
}

/// A named RPC invocation with its JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    /// RPC name.
    pub name: String,
    /// Arguments object.
    pub payload: serde_json::Value,
}

impl OnboardingConfig {
    /// All fields across every screen, in display order.
    pub fn fields(&self) -> impl Iterator<Item = &OnboardingField> {
        self.screens.iter().flat_map(|s| s.fields.iter())
    }

    /// Look up a field by id.
    pub fn field(&self, id: &str) -> Option<&OnboardingField> {
        self.fields().find(|f| f.id == id)
    }

    /// Check `answers` against the schema, returning every problem found.
    pub fn validate_answers(&self, answers: &Answers) -> Result<(), Vec<OnboardingError>> {
        let mut errors = Vec::new();

        for id in answers.keys() {
            if self.field(id).is_none() {
                errors.push(OnboardingError::UnknownField(id.clone()));
            }
        }

        for field in self.fields() {
            if let Err(e) = field.check(answers.get(&field.id)) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Build the completion RPC for `channel` once `answers` validate.
    pub fn completion_call(
        &self,
        channel: &str,
        answers: &Answers,
    ) -> Result<RpcCall, Vec<OnboardingError>> {
        self.validate_answers(answers)?;
        Ok(RpcCall {
            name: self.finish_rpc.clone(),
            payload: serde_json::json!({
                "channel": channel,
                "answers": answers,
            }),
        })
    }
}

impl OnboardingField {
    fn check(&self, answer: Option<&AnswerValue>) -> Result<(), OnboardingError> {
        let Some(answer) = answer else {
            return if self.required {
                Err(OnboardingError::MissingRequired(self.id.clone()))
            } else {
                Ok(())
            };
        };

        match (&self.kind, answer) {
            (FieldKind::Text { max_length }, AnswerValue::Text(text)) => {
                if self.required && text.trim().is_empty() {
                    return Err(OnboardingError::MissingRequired(self.id.clone()));
                }
                if let Some(max) = *max_length
                    && text.chars().count() > max
                {
                    return Err(OnboardingError::TooLong {
                        field: self.id.clone(),
                        max,
                    });
                }
                Ok(())
            }
            (FieldKind::Select { options }, AnswerValue::Text(choice)) => {
                if !options.contains(choice) {
                    return Err(OnboardingError::UnknownOption {
                        field: self.id.clone(),
                        value: choice.clone(),
                    });
                }
                Ok(())
            }
            (
                FieldKind::Multiselect {
                    options,
                    max_selected,
                },
                AnswerValue::Choices(choices),
            ) => {
                if self.required && choices.is_empty() {
                    return Err(OnboardingError::MissingRequired(self.id.clone()));
                }
                if let Some(bad) = choices.iter().find(|c| !options.contains(*c)) {
                    return Err(OnboardingError::UnknownOption {
                        field: self.id.clone(),
                        value: bad.clone(),
                    });
                }
                if let Some(max) = *max_selected
                    && choices.len() > max
                {
                    return Err(OnboardingError::TooManySelected {
                        field: self.id.clone(),
                        max,
                    });
                }
                Ok(())
            }
            (FieldKind::Boolean, AnswerValue::Flag(checked)) => {
                if self.required && !checked {
                    return Err(OnboardingError::MissingRequired(self.id.clone()));
                }
                Ok(())
            }
            (kind, _) => Err(OnboardingError::WrongKind {
                field: self.id.clone(),
                expected: kind.name(),
            }),
        }
    }
}
