//! Output formatter trait

use concord_application::TaskReport;

/// Trait for formatting task reports
pub trait OutputFormatter {
    /// Format the complete report
    fn format(&self, report: &TaskReport) -> String;

    /// Format as JSON
    fn format_json(&self, report: &TaskReport) -> String;

    /// Format verdict and chosen output only
    fn format_summary(&self, report: &TaskReport) -> String;
}
