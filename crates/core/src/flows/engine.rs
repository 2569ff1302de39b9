use thiserror::Error;

use crate::flows::states::{
    ConversationEvent, ConversationState, FlowContext, TransitionOutcome, TurnAction,
};
use crate::intent::TurnResolution;

pub trait FlowDefinition {
    fn initial_state(&self) -> ConversationState;
    fn transition(
        &self,
        current: ConversationState,
        event: &ConversationEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The single dining conversation flow: collect purpose, then cuisine, then
/// location, then search on every further message.
#[derive(Clone, Debug, Default)]
pub struct DiningFlow;

impl FlowDefinition for DiningFlow {
    fn initial_state(&self) -> ConversationState {
        ConversationState::New
    }

    fn transition(
        &self,
        current: ConversationState,
        event: &ConversationEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_dining(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> ConversationState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: ConversationState,
        event: &ConversationEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }
}

impl Default for FlowEngine<DiningFlow> {
    fn default() -> Self {
        Self::new(DiningFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("no transition from {state:?} for {event_kind} event")]
    InvalidTransition { state: ConversationState, event_kind: &'static str },
    #[error("profile is missing {missing} required to act in {state:?}")]
    MissingContext { state: ConversationState, missing: &'static str },
}

fn transition_dining(
    current: ConversationState,
    event: &ConversationEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ConversationState::{AwaitingLocation, AwaitingPreference, New, Ready};
    use TurnAction::{
        AcknowledgeLocation, AskFoodPreference, AskLocation, GenerateRecommendation,
        PromptPurposeSelection, RunSearch, SaveLocation, SavePreference,
        SavePurposeAndPreference, SendGreeting,
    };

    let (to, actions) = match (current, event) {
        // A purpose choice (postback button) re-enters the preference step
        // from anywhere, resolver not involved.
        (_, ConversationEvent::PurposeSelected(purpose)) => (
            AwaitingPreference,
            vec![
                TurnAction::SavePurpose { purpose: *purpose },
                AskFoodPreference { purpose: *purpose },
            ],
        ),

        (New, ConversationEvent::Text(resolution)) => match resolution {
            TurnResolution::Greeting => (New, vec![SendGreeting]),
            TurnResolution::SetPurpose { purpose } => (
                AwaitingPreference,
                vec![
                    TurnAction::SavePurpose { purpose: *purpose },
                    AskFoodPreference { purpose: *purpose },
                ],
            ),
            TurnResolution::SetPurposeAndPreference { purpose, preference } => {
                let save = SavePurposeAndPreference {
                    purpose: *purpose,
                    preference: preference.clone(),
                };
                match context.location {
                    Some(location) => (
                        Ready,
                        vec![
                            save,
                            RunSearch {
                                purpose: *purpose,
                                keyword: preference.clone(),
                                location,
                            },
                        ],
                    ),
                    None => {
                        (AwaitingLocation, vec![save, AskLocation { preference: preference.clone() }])
                    }
                }
            }
            // Without a purpose the only safe move is the purpose prompt;
            // a search must never start from here.
            _ => (New, vec![PromptPurposeSelection]),
        },

        (AwaitingPreference, ConversationEvent::Text(resolution)) => match resolution {
            TurnResolution::ContinueExistingFlow { preference }
            | TurnResolution::NewSearch { keyword: preference } => {
                let purpose = context.purpose.ok_or(FlowTransitionError::MissingContext {
                    state: current,
                    missing: "dining purpose",
                })?;
                match context.location {
                    Some(location) => (
                        Ready,
                        vec![
                            SavePreference { preference: preference.clone() },
                            RunSearch { purpose, keyword: preference.clone(), location },
                        ],
                    ),
                    None => (
                        AwaitingLocation,
                        vec![
                            SavePreference { preference: preference.clone() },
                            AskLocation { preference: preference.clone() },
                        ],
                    ),
                }
            }
            _ => {
                return Err(FlowTransitionError::InvalidTransition {
                    state: current,
                    event_kind: event.kind(),
                })
            }
        },

        (AwaitingLocation, ConversationEvent::Text(resolution)) => match resolution {
            TurnResolution::RequestRecommendation { raw_text } => (
                AwaitingLocation,
                vec![GenerateRecommendation { raw_text: raw_text.clone() }],
            ),
            TurnResolution::NewSearch { keyword }
            | TurnResolution::ContinueExistingFlow { preference: keyword } => (
                AwaitingLocation,
                vec![
                    SavePreference { preference: keyword.clone() },
                    AskLocation { preference: keyword.clone() },
                ],
            ),
            _ => {
                return Err(FlowTransitionError::InvalidTransition {
                    state: current,
                    event_kind: event.kind(),
                })
            }
        },

        (Ready, ConversationEvent::Text(resolution)) => match resolution {
            TurnResolution::RequestRecommendation { raw_text } => {
                (Ready, vec![GenerateRecommendation { raw_text: raw_text.clone() }])
            }
            TurnResolution::NewSearch { keyword }
            | TurnResolution::ContinueExistingFlow { preference: keyword } => {
                let purpose = context.purpose.ok_or(FlowTransitionError::MissingContext {
                    state: current,
                    missing: "dining purpose",
                })?;
                let location = context.location.ok_or(FlowTransitionError::MissingContext {
                    state: current,
                    missing: "location",
                })?;
                (
                    Ready,
                    vec![
                        SavePreference { preference: keyword.clone() },
                        RunSearch { purpose, keyword: keyword.clone(), location },
                    ],
                )
            }
            _ => {
                return Err(FlowTransitionError::InvalidTransition {
                    state: current,
                    event_kind: event.kind(),
                })
            }
        },

        (New, ConversationEvent::Location(location)) => {
            (New, vec![SaveLocation { location: *location }, PromptPurposeSelection])
        }
        (AwaitingPreference, ConversationEvent::Location(location)) => (
            AwaitingPreference,
            vec![SaveLocation { location: *location }, AcknowledgeLocation],
        ),
        (AwaitingLocation | Ready, ConversationEvent::Location(location)) => {
            let purpose = context.purpose.ok_or(FlowTransitionError::MissingContext {
                state: current,
                missing: "dining purpose",
            })?;
            let keyword =
                context.preference.clone().ok_or(FlowTransitionError::MissingContext {
                    state: current,
                    missing: "food preference",
                })?;
            (
                Ready,
                vec![
                    SaveLocation { location: *location },
                    RunSearch { purpose, keyword, location: *location },
                ],
            )
        }
    };

    Ok(TransitionOutcome { from: current, to, actions })
}
