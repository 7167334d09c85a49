use serde_json::{Map, Value};

/// Key under which the per-agent map is rendered.
pub const AGENTS_KEY: &str = "agents";
/// Key under which the streamed token buffer is rendered.
pub const TOKEN_BUFFER_KEY: &str = "llm_stream";

/// Aggregated result of one session.
///
/// Sections and agents are last-write-wins per key; the token buffer only
/// grows. A terminal `done` result replaces the whole model (see
/// [`ResultModel::from_result`]).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResultModel {
    sections: Map<String, Value>,
    agents: Map<String, Value>,
    token_buffer: String,
}

impl ResultModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the model carried by a terminal result, verbatim.
    pub fn from_result(result: Map<String, Value>) -> Self {
        Self {
            sections: result,
            agents: Map::new(),
            token_buffer: String::new(),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> &Map<String, Value> {
        &self.sections
    }

    pub fn agent(&self, name: &str) -> Option<&Value> {
        self.agents().get(name)
    }

    /// Per-agent payloads as rendered under `agents` by [`Self::to_json`].
    ///
    /// Streamed agent results take precedence; once a terminal result has
    /// replaced the model, its own `agents` object (if any) is returned.
    pub fn agents(&self) -> &Map<String, Value> {
        if self.agents.is_empty()
            && let Some(Value::Object(from_result)) = self.sections.get(AGENTS_KEY)
        {
            return from_result;
        }
        &self.agents
    }

    pub fn token_buffer(&self) -> &str {
        &self.token_buffer
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.agents.is_empty() && self.token_buffer.is_empty()
    }

    pub(crate) fn set_section(&mut self, name: impl Into<String>, payload: Value) {
        self.sections.insert(name.into(), payload);
    }

    pub(crate) fn set_agent(&mut self, name: impl Into<String>, payload: Value) {
        self.agents.insert(name.into(), payload);
    }

    pub(crate) fn append_tokens(&mut self, text: &str) {
        self.token_buffer.push_str(text);
    }

    /// Renders the model as the single JSON object the presentation layer
    /// consumes.
    ///
    /// `agents` and `llm_stream` are added only when non-empty and take
    /// precedence over sections with the same name.
    pub fn to_json(&self) -> Value {
        let mut out = self.sections.clone();
        if !self.agents.is_empty() {
            out.insert(AGENTS_KEY.to_string(), Value::Object(self.agents.clone()));
        }
        if !self.token_buffer.is_empty() {
            out.insert(
                TOKEN_BUFFER_KEY.to_string(),
                Value::String(self.token_buffer.clone()),
            );
        }
        Value::Object(out)
    }
}
