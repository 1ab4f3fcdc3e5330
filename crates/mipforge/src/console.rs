//! Colorful console output for solver progress.
//!
//! Provides a `tracing` layer that formats the structured events of
//! `mipforge_solver` (each carries an `event` field naming it).

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::OnceLock;

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

/// Initializes the console output.
///
/// Safe to call multiple times - only the first call has effect.
pub fn init() {
    INIT.get_or_init(|| {
        print_banner();

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "mipforge_solver=info".parse() {
            filter = filter.add_directive(directive);
        }

        // another global subscriber may already be installed
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(SolverConsoleLayer)
            .try_init();
    });
}

fn print_banner() {
    let version_line = format!(
        "MipForge v{} - Mixed-Integer Programming Core",
        env!("CARGO_PKG_VERSION")
    );
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", version_line.bright_cyan().bold());
    let _ = stdout.flush();
}

/// A tracing layer that formats solver events with colors.
#[derive(Debug, Default)]
pub struct SolverConsoleLayer;

impl<S: Subscriber> Layer<S> for SolverConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("mipforge_solver") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        if let Some(line) = format_solver_event(&visitor) {
            let _ = writeln!(io::stdout(), "{}", line);
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    ints: HashMap<&'static str, u64>,
    floats: HashMap<&'static str, f64>,
    texts: HashMap<&'static str, String>,
}

impl EventVisitor {
    fn int(&self, key: &str) -> u64 {
        self.ints.get(key).copied().unwrap_or(0)
    }

    fn float(&self, key: &str) -> Option<f64> {
        self.floats.get(key).copied()
    }

    fn text(&self, key: &str) -> &str {
        self.texts.get(key).map(String::as_str).unwrap_or("?")
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value).trim_matches('"').to_string();
        self.record_text(field, s);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.ints.insert(field.name(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.ints.insert(field.name(), value.max(0) as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.floats.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.texts.insert(field.name(), value.to_string());
    }
}

impl EventVisitor {
    fn record_text(&mut self, field: &Field, value: String) {
        if field.name() == "event" {
            self.event = Some(value);
        } else {
            self.texts.insert(field.name(), value);
        }
    }
}

fn format_solver_event(v: &EventVisitor) -> Option<String> {
    let line = match v.event.as_deref()? {
        "problem_size" => format!(
            "{} vars ({} bin, {} int, {} impl, {} cont), {} conss, {} nonzeros",
            count(v.int("vars")),
            count(v.int("binaries")),
            count(v.int("integers")),
            count(v.int("implicit")),
            count(v.int("continuous")),
            count(v.int("conss")),
            count(v.int("nonzeros")),
        ),
        "presolve_end" => format!(
            "presolving ended after {} rounds: {}",
            count(v.int("rounds")),
            v.text("status").white().bold()
        ),
        "solve_start" => format!(
            "run {} started on {} vars, {} conss",
            v.int("run"),
            count(v.int("vars")),
            count(v.int("conss"))
        ),
        "new_incumbent" => {
            return Some(format!(
                "    {} {} at depth {} ({})",
                "->".bright_blue(),
                format_bound(v.float("obj")).bright_green(),
                v.int("depth"),
                v.text("heuristic").bright_black()
            ))
        }
        "restart" => format!(
            "{} after {} nodes, {} root fixings",
            "restart".bright_yellow(),
            count(v.int("nodes")),
            count(v.int("root_int_fixings"))
        ),
        "solve_end" => format_solve_end(v),
        "concurrent_end" => format!(
            "concurrent solve won by instance {}: {} ({})",
            v.int("winner"),
            v.text("status").white().bold(),
            format_bound(v.float("primal_bound"))
        ),
        _ => return None,
    };
    Some(format!(
        "{} {} {} {}",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Solver]".bright_cyan(),
        line
    ))
}

fn format_solve_end(v: &EventVisitor) -> String {
    let gap = match v.float("gap") {
        Some(g) if g.is_finite() => format!("{:.2}%", g * 100.0),
        _ => "inf".to_string(),
    };
    let seconds = v.float("solve_seconds").unwrap_or(0.0);
    format!(
        "solving ended: {} | primal {} | dual {} | gap {} | {} nodes in {} runs | {}",
        v.text("status").white().bold(),
        format_bound(v.float("primal_bound")).bright_green(),
        format_bound(v.float("dual_bound")).yellow(),
        gap.bright_magenta(),
        count(v.int("nodes")),
        v.int("runs"),
        format_duration(seconds)
    )
}

fn count(n: u64) -> String {
    n.to_formatted_string(&Locale::en)
}

fn format_bound(value: Option<f64>) -> String {
    match value {
        Some(x) if x.is_finite() => format!("{:.6}", x),
        Some(x) if x > 0.0 => "+inf".to_string(),
        Some(_) => "-inf".to_string(),
        None => "N/A".to_string(),
    }
}

fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{}ms", (seconds * 1000.0).round() as u64)
    } else if seconds < 60.0 {
        format!("{:.2}s", seconds)
    } else {
        let secs = seconds as u64;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{:5}.{:03}", d.as_secs() % 100_000, d.subsec_millis()))
        .unwrap_or_else(|_| "    0.000".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bound_handles_infinities() {
        assert_eq!(format_bound(Some(1.5)), "1.500000");
        assert_eq!(format_bound(Some(f64::INFINITY)), "+inf");
        assert_eq!(format_bound(Some(f64::NEG_INFINITY)), "-inf");
        assert_eq!(format_bound(None), "N/A");
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(0.25), "250ms");
        assert_eq!(format_duration(2.5), "2.50s");
        assert_eq!(format_duration(125.0), "2m 5s");
    }

    #[test]
    fn test_unknown_event_is_skipped() {
        let v = EventVisitor {
            event: Some("node_solved".to_string()),
            ..EventVisitor::default()
        };
        assert!(format_solver_event(&v).is_none());
        assert!(format_solver_event(&EventVisitor::default()).is_none());
    }
}
