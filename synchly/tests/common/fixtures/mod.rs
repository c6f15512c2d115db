//! Reusable test utilities:
//! - Mock remote endpoint with session accounting
//! - Mock dump adapters and scripted pipelines
//! - Recording notifier and webhook server
//! - In-memory registries and module documents

// Not every test binary uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_dump;
pub mod mock_pipeline;
pub mod mock_remote;
pub mod mock_webhook;
pub mod test_data;
pub mod test_registry;

pub use mock_dump::MockDumpAdapter;
pub use mock_pipeline::{RecordingNotifier, ScriptedPipeline};
pub use mock_remote::MockConnector;
pub use mock_webhook::MockWebhookServer;
pub use test_data::*;
pub use test_registry::TestRegistry;
