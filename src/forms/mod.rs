pub mod sync;

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use crate::error::{FlowError, FlowResult};

/// Field type that carries the decision options of a gateway.
pub const DECISION_FIELD_TYPE: &str = "radio";

/// 表单定义 (dynamic form schema)
///
/// Only the parts the synchronizer reads are typed; everything else in the
/// document is kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormSchema {
    #[serde(default)]
    pub components: Vec<FormField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, rename = "values", skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FormOption>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormOption {
    pub value: String,
    pub label: String,
}

impl FormField {
    pub fn is_decision_field(&self) -> bool {
        self.field_type == DECISION_FIELD_TYPE
    }
}

impl FormSchema {
    pub fn parse(form_key: &str, content: &str) -> FlowResult<Self> {
        serde_json::from_str(content).map_err(|e| FlowError::MalformedForm {
            form_key: form_key.to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_json(&self, form_key: &str) -> FlowResult<String> {
        serde_json::to_string(self).map_err(|e| FlowError::MalformedForm {
            form_key: form_key.to_string(),
            message: e.to_string(),
        })
    }

    pub fn decision_field(&self) -> Option<&FormField> {
        self.components.iter().find(|f| f.is_decision_field())
    }

    /// Replaces the options of the first `radio` field, or appends a new one keyed
    /// `input` when the form has none.
    pub fn set_decision_options(&mut self, options: Vec<FormOption>) {
        match self.components.iter_mut().find(|f| f.is_decision_field()) {
            Some(field) => {
                field.key = crate::compiler::injector::DECISION_VARIABLE.to_string();
                field.options = Some(options);
            }
            None => self.components.push(FormField {
                field_type: DECISION_FIELD_TYPE.to_string(),
                key: crate::compiler::injector::DECISION_VARIABLE.to_string(),
                label: "Radio".to_string(),
                options: Some(options),
                extra: Map::new(),
            }),
        }
    }
}
