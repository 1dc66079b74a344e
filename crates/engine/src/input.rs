//! State machine invocation payloads.

use autostate_core::{Action, AutoStateError};
use serde_json::Value;

use crate::events::TriggerEvent;

/// What the engine was asked to do.
#[derive(Debug, Clone)]
pub enum Input {
    /// An external event: re-evaluate the resources it names.
    Trigger(TriggerEvent),
    /// A previously armed action has fired.
    Action(Action),
}

impl Input {
    /// Discriminate on shape: `detail` means a trigger event, `when` means
    /// an armed action.
    pub fn from_value(value: Value) -> Result<Self, AutoStateError> {
        let Some(object) = value.as_object() else {
            return Err(AutoStateError::InvalidInput("input is not a JSON object".to_string()));
        };
        if object.contains_key("detail") {
            serde_json::from_value(value)
                .map(Input::Trigger)
                .map_err(|e| AutoStateError::InvalidInput(format!("unrecognized trigger event: {e}")))
        } else if object.contains_key("when") {
            serde_json::from_value(value)
                .map(Input::Action)
                .map_err(|e| AutoStateError::InvalidInput(format!("malformed action: {e}")))
        } else {
            Err(AutoStateError::InvalidInput(
                "input is neither a trigger event nor an action".to_string(),
            ))
        }
    }
}

/// `{"StateMachine": {"Id": ...}, "Execution": {"Input": ...}}`.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// ARN of the invoking state machine, used to arm the next action.
    pub state_machine_arn: Option<String>,
    pub input: Input,
}

impl Invocation {
    /// Parse a full invocation. A payload without the `Execution` wrapper is
    /// taken to be the input itself.
    pub fn from_value(mut value: Value) -> Result<Self, AutoStateError> {
        let state_machine_arn = value
            .pointer("/StateMachine/Id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let input = match value.get_mut("Execution") {
            Some(execution) => execution
                .get_mut("Input")
                .map(Value::take)
                .ok_or_else(|| AutoStateError::InvalidInput("Execution.Input is missing".to_string()))?,
            None => value,
        };

        Ok(Self {
            state_machine_arn,
            input: Input::from_value(input)?,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, AutoStateError> {
        Self::from_value(serde_json::from_str(raw)?)
    }
}
