use crate::analyzer::AnalyzerRegistry;
use colored::Colorize;

/// Print the analyzers `analyze --filter` accepts.
pub fn handle_filters(registry: &AnalyzerRegistry) {
    println!("{}", "Available filters:".bold());
    for kind in registry.kinds() {
        println!("  > {}", kind.cyan());
    }
}
