use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const VERB_IRI_PREFIX: &str = "http://adlnet.gov/expapi/verbs/";
pub const INTERACTION_ACTIVITY_TYPE: &str = "http://adlnet.gov/expapi/activities/cmi.interaction";
pub const LONG_FILL_IN: &str = "long-fill-in";
pub const DEFAULT_LANGUAGE: &str = "en-US";

pub type LanguageMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "VerbObject", try_from = "VerbObject")]
pub enum Verb {
    Initialized,
    Responded,
    Answered,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Initialized => "initialized",
            Verb::Responded => "responded",
            Verb::Answered => "answered",
        }
    }

    pub fn iri(&self) -> String {
        format!("{}{}", VERB_IRI_PREFIX, self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VerbObject {
    id: String,
    #[serde(default)]
    display: LanguageMap,
}

impl From<Verb> for VerbObject {
    fn from(verb: Verb) -> Self {
        VerbObject {
            id: verb.iri(),
            display: language_map(verb.as_str()),
        }
    }
}

impl TryFrom<VerbObject> for Verb {
    type Error = String;

    fn try_from(object: VerbObject) -> Result<Self, Self::Error> {
        match object.id.strip_prefix(VERB_IRI_PREFIX) {
            Some("initialized") => Ok(Verb::Initialized),
            Some("responded") => Ok(Verb::Responded),
            Some("answered") => Ok(Verb::Answered),
            _ => Err(format!("unsupported verb: {}", object.id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDefinition {
    pub description: LanguageMap,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub interaction_type: String,
    /// Always empty: free text answers are never scored here.
    pub correct_responses_pattern: Vec<String>,
}

impl InteractionDefinition {
    pub fn long_fill_in(prompt_text: &str) -> Self {
        Self {
            description: language_map(prompt_text),
            activity_type: INTERACTION_ACTIVITY_TYPE.to_string(),
            interaction_type: LONG_FILL_IN.to_string(),
            correct_responses_pattern: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub object_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub definition: InteractionDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementResult {
    pub response: String,
}

/// Activity statement describing the learner's interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub verb: Verb,
    pub object: Activity,
    pub result: StatementResult,
}

impl Statement {
    pub fn new(
        verb: Verb,
        activity_id: Option<String>,
        definition: InteractionDefinition,
        response: String,
    ) -> Self {
        Self {
            verb,
            object: Activity {
                object_type: "Activity".to_string(),
                id: activity_id,
                definition,
            },
            result: StatementResult { response },
        }
    }

    pub fn definition(&self) -> &InteractionDefinition {
        &self.object.definition
    }

    pub fn response(&self) -> &str {
        &self.result.response
    }
}

/// Snapshot envelope handed to report renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XapiData {
    pub statement: Statement,
}

fn language_map(text: &str) -> LanguageMap {
    let mut map = LanguageMap::new();
    map.insert(DEFAULT_LANGUAGE.to_string(), text.to_string());
    map
}
