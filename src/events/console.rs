//! Terminal-facing event sink used by the CLI.

use super::{EventSink, GatewayEvent, LogLevel};
use console::style;
use crossport_common::ReturnCode;
use std::path::PathBuf;
use tracing::info;

/// Renders gateway events to the terminal. When an output directory is
/// configured, successful translation results are additionally written to
/// disk as project files.
pub struct ConsoleSink {
    output_dir: Option<PathBuf>,
}

impl ConsoleSink {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self { output_dir }
    }

    fn print_line(level: LogLevel, message: &str) {
        let tag = match level {
            LogLevel::Error => style(level.as_str()).red().bold(),
            LogLevel::Warning => style(level.as_str()).yellow(),
            LogLevel::Debug => style(level.as_str()).dim(),
            LogLevel::Info => style(level.as_str()).green(),
        };
        println!("[{tag}] {message}");
    }
}

#[async_trait::async_trait]
impl EventSink for ConsoleSink {
    async fn deliver(&self, event: GatewayEvent) -> anyhow::Result<()> {
        match event {
            GatewayEvent::ProgressUpdate { key, state } => {
                println!(
                    "{} {} -> {}",
                    style("progress").cyan(),
                    key.as_str(),
                    state.as_str()
                );
            }
            GatewayEvent::LogLine { message, level } => Self::print_line(level, &message),
            GatewayEvent::UnitTestCandidates { candidates, .. } => {
                println!(
                    "{} {} unit test candidate(s)",
                    style("candidates").cyan(),
                    candidates.len()
                );
            }
            GatewayEvent::UnitTestResult { response, level } => {
                Self::print_line(level, &format!("unit test pick: {}", response.solution));
            }
            GatewayEvent::TranslationCandidates { response, .. } => {
                println!(
                    "{} {} translation candidate(s)",
                    style("candidates").cyan(),
                    response.solutions.len()
                );
            }
            GatewayEvent::TranslationResult { response, level } => {
                Self::print_line(level, &format!("translation: {}", response.solution));
                if response.return_code == ReturnCode::Success {
                    if let Some(dir) = &self.output_dir {
                        let written = crate::project_io::write_project(&response.solution, dir)?;
                        info!(files = written, dir = %dir.display(), "wrote translation result");
                    }
                }
            }
            GatewayEvent::AssessmentResult { response, level } => {
                Self::print_line(
                    level,
                    &format!("assessment returned {} item(s)", response.solutions.len()),
                );
            }
            GatewayEvent::PlanGenerated { plan, .. } => {
                println!("{plan}");
            }
        }
        Ok(())
    }
}
