pub mod action_exec;
pub mod alert;
pub mod decision_log;
pub mod inbox;
pub mod incident;
pub mod incident_action;
pub mod incident_event;
pub mod outbox_event;
