//! LINE Messaging API surface: webhook event parsing, signature checks,
//! outbound payload builders, and the carousel composer that turns selected
//! restaurants into reply cards.

pub mod carousel;
pub mod client;
pub mod events;
pub mod messages;
pub mod signature;

pub use carousel::ResponseComposer;
pub use client::{HttpReplyClient, NoopReplyClient, RecordingReplyClient, ReplyClient, ReplyError};
pub use events::{InboundEvent, PostbackData, WebhookBody};
pub use messages::{
    purpose_selection_message, text_message, text_with_location_quick_reply, Action,
    OutboundMessage, Template, MAX_ACTIONS_PER_CARD, MAX_CAROUSEL_COLUMNS,
};
