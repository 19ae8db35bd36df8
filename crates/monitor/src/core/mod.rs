pub mod event_classifier;
pub mod event_indexer;
pub mod health_monitor;
