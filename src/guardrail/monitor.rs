use super::fast::FastMonitor;
use super::state::{MonitorState, MonitorVerdict};
use super::streaming::StreamingMonitor;
use crate::config::{GuardrailConfig, MonitorKind};
use crate::llm::ModelClient;
use crate::protocol::DetectionContext;
use std::sync::Arc;
use std::time::Duration;

/// The monitor selected for a turn.
pub enum ActiveMonitor {
    Fast(FastMonitor),
    Streaming(StreamingMonitor),
}

impl ActiveMonitor {
    pub fn from_config(
        config: &GuardrailConfig,
        ctx: DetectionContext,
        client: Arc<dyn ModelClient>,
        router_model: &str,
    ) -> Self {
        match config.monitor {
            MonitorKind::Fast => Self::Fast(FastMonitor::new(ctx)),
            MonitorKind::Streaming => Self::Streaming(StreamingMonitor::new(
                ctx,
                client,
                router_model,
                Duration::from_millis(config.router_timeout_ms),
            )),
        }
    }

    pub async fn inspect(&mut self, text: &str) -> Option<MonitorVerdict> {
        match self {
            Self::Fast(monitor) => monitor.check_chunk(text),
            Self::Streaming(monitor) => {
                monitor
                    .analyze_chunk(text, |correction| {
                        tracing::debug!(chars = correction.len(), "Router correction received");
                    })
                    .await
            }
        }
    }

    pub fn state(&self) -> &MonitorState {
        match self {
            Self::Fast(monitor) => monitor.state(),
            Self::Streaming(monitor) => monitor.state(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Fast(monitor) => monitor.reset(),
            Self::Streaming(monitor) => monitor.reset(),
        }
    }
}
