pub mod engine;
pub mod states;

pub use engine::{DiningFlow, FlowDefinition, FlowEngine, FlowTransitionError};
pub use states::{ConversationEvent, ConversationState, FlowContext, TransitionOutcome, TurnAction};
