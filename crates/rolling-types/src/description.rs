//! Declarative descriptions returned to the UI layer.
//!
//! When an operation cannot complete without more input, it answers with a
//! [`Description`] rather than an error. Links and forms carry the
//! parameters of the follow-up request so the renderer never has to know
//! what an action expects.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A screen to show the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Description {
    /// Screen title.
    pub title: String,
    /// Content, top to bottom.
    pub parts: Vec<Part>,
    /// Where the renderer should go instead of showing this screen.
    #[serde(default)]
    pub redirect: Option<String>,
}

impl Description {
    /// An empty screen with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parts: Vec::new(),
            redirect: None,
        }
    }

    /// Append a part.
    #[must_use]
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Append a paragraph of text.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_part(Part::Text { text: text.into() })
    }
}

/// One block of a [`Description`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Part {
    /// A paragraph.
    Text {
        /// Paragraph content.
        text: String,
    },
    /// A choice that re-submits the current action with `params`.
    Link {
        /// Label shown to the player.
        label: String,
        /// Complete parameters of the follow-up request.
        params: serde_json::Value,
    },
    /// Input fields merged into `params` on submit.
    Form {
        /// Parameters already decided.
        params: serde_json::Value,
        /// Fields the player fills in.
        fields: Vec<FormField>,
    },
}

/// A single input of a [`Part::Form`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FormField {
    /// Parameter name the value is submitted under.
    pub name: String,
    /// Label shown next to the input.
    pub label: String,
    /// Pre-filled value.
    pub default_value: Option<String>,
    /// Unit hint shown after the input (e.g. `"kg"`).
    pub unit_label: Option<String>,
}

/// A structured, user-displayable refusal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ErrorDescription {
    /// Short title.
    pub title: String,
    /// Message, one entry per line.
    pub lines: Vec<String>,
    /// Set when the refusal is only due to missing action points.
    pub insufficient_action_points: bool,
}
