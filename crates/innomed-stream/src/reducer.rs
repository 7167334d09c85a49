//! Folds decoded events into a [`ResultModel`].
//!
//! The reducer is pure and order sensitive: sections and agents are
//! last-write-wins, so replaying the same ordered log always yields the same
//! model, and reordering it may not.

use crate::event::Event;
use crate::model::ResultModel;

/// Section written by `status` frames.
pub const STATUS_SECTION: &str = "status";

/// Applies one event to the model.
pub fn reduce(mut model: ResultModel, event: &Event) -> ResultModel {
    match event {
        Event::Status(payload) => model.set_section(STATUS_SECTION, payload.clone()),
        Event::AgentResult { agent, payload } => model.set_agent(agent.as_str(), payload.clone()),
        Event::TokenChunk(text) => model.append_tokens(text),
        Event::NamedSection { name, payload } => model.set_section(name.as_str(), payload.clone()),
        Event::Done(result) => return ResultModel::from_result(result.clone()),
        Event::Error(_) => {}
    }
    model
}

/// Folds an ordered event log starting from an empty model.
pub fn replay<'a>(events: impl IntoIterator<Item = &'a Event>) -> ResultModel {
    events.into_iter().fold(ResultModel::new(), reduce)
}
