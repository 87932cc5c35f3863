/// Runtime events.
pub mod events;
/// Single-writer organizer task and handle.
pub mod handle;
