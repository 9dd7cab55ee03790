//! Run orchestration: compile, execute, classify, finalize.
//!
//! [`run`] is the crate's front door. It never returns an error: every
//! possible ending of a traced run is folded into a [`RunReport`] carrying
//! the trace collected so far plus a [`RunOutcome`]. The trace finalizer runs
//! exactly once per run with a non-empty trace, on success and on failure
//! alike, so the last step always absorbs undrained output and reflects the
//! final global state.

use std::path::{Path, PathBuf};

use steptrace_lang::{canonical_script_path, compile, CodeUnit, SyntaxError};

use crate::governor::Limits;
use crate::interp::{ExecutionContext, Interpreter};
use crate::io::OutputBuffer;
use crate::snapshot::snapshot;
use crate::trace::{Trace, MODULE_SCOPE};
use crate::value::Value;

/// Seed used when the caller does not supply one. Runs are reproducible by
/// default; callers opt into variation, not out of it.
pub const DEFAULT_SEED: u64 = 42;

/// Everything needed to trace one program.
pub struct RunRequest<'a> {
    /// Source text of the traced script.
    pub source: &'a str,
    /// Path the script is nominally loaded from; canonicalized into the
    /// event filter's match key.
    pub path: &'a Path,
    /// Canned input text, or `None` to simulate bare Enter presses.
    pub input: Option<&'a str>,
    /// Library units executed untraced before the script, sharing its
    /// globals.
    pub libraries: &'a [CodeUnit],
    pub limits: Limits,
    pub seed: u64,
}

impl<'a> RunRequest<'a> {
    pub fn new(source: &'a str, path: &'a Path) -> Self {
        RunRequest {
            source,
            path,
            input: None,
            libraries: &[],
            limits: Limits::default(),
            seed: DEFAULT_SEED,
        }
    }
}

/// How a traced run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// The program never started; the trace is empty.
    SyntaxFailure(String),
    RuntimeFailure(String),
    /// A resource-governor cap tripped mid-run.
    ResourceExceeded(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    /// The diagnostic message, if the run did not succeed.
    pub fn message(&self) -> Option<&str> {
        match self {
            RunOutcome::Success => None,
            RunOutcome::SyntaxFailure(m)
            | RunOutcome::RuntimeFailure(m)
            | RunOutcome::ResourceExceeded(m) => Some(m),
        }
    }
}

/// The result of one traced run: whatever trace was collected, plus the
/// classified ending.
#[derive(Debug)]
pub struct RunReport {
    pub trace: Trace,
    pub outcome: RunOutcome,
}

/// Compiles a library unit against its own path, for preloading via
/// [`RunRequest::libraries`].
pub fn compile_library(source: &str, path: &Path) -> Result<CodeUnit, SyntaxError> {
    compile(source, path)
}

/// Traces one program to completion or to its first failure.
pub fn run(req: &RunRequest<'_>) -> RunReport {
    let unit = match compile(req.source, req.path) {
        Ok(unit) => unit,
        Err(err) => {
            tracing::debug!("compile failed: {}", err);
            return RunReport {
                trace: Trace::new(),
                outcome: RunOutcome::SyntaxFailure(err.to_string()),
            };
        }
    };

    let main_path: PathBuf = canonical_script_path(req.path);
    let ctx = ExecutionContext::new(main_path, req.input, req.limits, req.seed);
    let mut interp = Interpreter::new(ctx);
    interp.define_global("__name__", Value::Str("__main__".to_string()));

    let result = req
        .libraries
        .iter()
        .try_for_each(|lib| interp.preload(lib))
        .and_then(|()| interp.run_module(&unit));

    let (mut trace, globals, mut out) = interp.into_parts();
    finalize(&mut trace, &globals, &mut out);

    let outcome = match result {
        Ok(()) => RunOutcome::Success,
        Err(err) if err.is_resource_limit() => RunOutcome::ResourceExceeded(err.to_string()),
        Err(err) => RunOutcome::RuntimeFailure(err.to_string()),
    };
    tracing::debug!("run finished: {} step(s), outcome {:?}", trace.len(), outcome);
    RunReport { trace, outcome }
}

/// Patches the last step so the trace accounts for everything that happened
/// after the final instrumentation event: leftover output is appended, the
/// global snapshot is refreshed, and at module scope the local snapshot is
/// refreshed with it (they are the same mapping there). Function-frame locals
/// are left alone; they belong to a frame that no longer exists.
fn finalize(
    trace: &mut Trace,
    globals: &indexmap::IndexMap<String, Value>,
    out: &mut OutputBuffer,
) {
    let leftover = out.drain();
    let Some(last) = trace.last_mut() else {
        return;
    };
    last.output.push_str(&leftover);
    let final_globals = snapshot(globals);
    if last.func_name == MODULE_SCOPE {
        last.local_vars = final_globals.clone();
    }
    last.global_vars = final_globals;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::EventKind;
    use std::time::Duration;

    fn trace_of(source: &str) -> RunReport {
        run(&RunRequest::new(source, Path::new("main.py")))
    }

    fn concat_output(report: &RunReport) -> String {
        report
            .trace
            .steps()
            .iter()
            .map(|s| s.output.as_str())
            .collect()
    }

    #[test]
    fn two_line_script_yields_two_steps() {
        let report = trace_of("x = 1\nprint(x)\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(report.trace.len(), 2);

        let steps = report.trace.steps();
        assert_eq!(steps[0].event, EventKind::Line);
        assert_eq!(steps[0].func_name, MODULE_SCOPE);
        assert_eq!(steps[0].line_no, 1);
        assert!(steps[0].local_vars.is_empty());

        assert_eq!(steps[1].line_no, 2);
        assert_eq!(steps[1].local_vars["x"], "1");
        assert_eq!(steps[1].global_vars["x"], "1");
        // print ran after the last line event; the finalizer attributed its
        // output to the final step.
        assert_eq!(steps[1].output, "1\n");
    }

    #[test]
    fn module_locals_equal_globals_on_every_step() {
        let report = trace_of("a = 1\nb = a + 1\nc = b * 2\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        for step in report.trace.steps() {
            assert_eq!(step.local_vars, step.global_vars);
        }
        let last = report.trace.steps().last().unwrap();
        assert_eq!(last.global_vars["c"], "4");
    }

    #[test]
    fn output_concatenation_matches_program_output() {
        let report = trace_of("for i in range(3):\n    print(i)\nprint('done')\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(concat_output(&report), "0\n1\n2\ndone\n");
    }

    #[test]
    fn input_echo_lands_in_the_transcript() {
        let report = run(&RunRequest {
            input: Some("hi"),
            ..RunRequest::new("value = input()\nprint(value)\n", Path::new("main.py"))
        });
        assert_eq!(report.outcome, RunOutcome::Success);
        // The echoed line and the printed line both appear, in order.
        assert_eq!(concat_output(&report), "hi\nhi\n");
        let last = report.trace.steps().last().unwrap();
        assert_eq!(last.global_vars["value"], "'hi'");
    }

    #[test]
    fn exhausted_input_reads_as_empty_string() {
        let report = trace_of("a = input()\nb = input()\nprint(len(a) + len(b))\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(concat_output(&report), "0\n");
    }

    #[test]
    fn literal_backslash_n_splits_input_lines() {
        let report = run(&RunRequest {
            input: Some("5\\n7"),
            ..RunRequest::new(
                "a = int(input())\nb = int(input())\nprint(a + b)\n",
                Path::new("main.py"),
            )
        });
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(concat_output(&report), "5\n7\n12\n");
    }

    #[test]
    fn syntax_error_yields_empty_trace() {
        let report = trace_of("def broken(:\n    pass\n");
        assert!(report.trace.is_empty());
        assert!(matches!(report.outcome, RunOutcome::SyntaxFailure(_)));
    }

    #[test]
    fn runtime_failure_keeps_partial_trace_and_function_locals() {
        let report = trace_of("def f():\n    x = 10\n    return x / 0\nf()\n");
        let RunOutcome::RuntimeFailure(msg) = &report.outcome else {
            panic!("expected runtime failure, got {:?}", report.outcome);
        };
        assert!(msg.contains("division by zero"));
        assert!(!report.trace.is_empty());

        // The last recorded step is inside f; the finalizer must not clobber
        // its locals with the global snapshot.
        let last = report.trace.steps().last().unwrap();
        assert_eq!(last.func_name, "f");
        assert_eq!(last.local_vars["x"], "10");
        assert!(!last.global_vars.contains_key("x"));
    }

    #[test]
    fn function_calls_record_line_and_return_events() {
        let report = trace_of("def double(n):\n    return n * 2\ny = double(4)\nprint(y)\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        let steps = report.trace.steps();

        let returns: Vec<_> = steps
            .iter()
            .filter(|s| s.event == EventKind::Return)
            .collect();
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].func_name, "double");
        assert_eq!(returns[0].local_vars["n"], "4");

        let last = steps.last().unwrap();
        assert_eq!(last.global_vars["y"], "8");
        assert_eq!(concat_output(&report), "8\n");
    }

    #[test]
    fn loop_headers_reappear_each_iteration() {
        let report = trace_of("total = 0\nfor i in range(3):\n    total = total + i\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        let lines: Vec<u32> = report.trace.steps().iter().map(|s| s.line_no).collect();
        assert_eq!(lines, vec![1, 2, 3, 2, 3, 2, 3]);
        let last = report.trace.steps().last().unwrap();
        assert_eq!(last.global_vars["total"], "3");
    }

    #[test]
    fn infinite_loop_is_stopped_by_the_event_cap() {
        let report = run(&RunRequest {
            limits: Limits {
                max_events: 50,
                max_duration: Duration::from_secs(60),
            },
            ..RunRequest::new("while True:\n    pass\n", Path::new("main.py"))
        });
        assert!(matches!(report.outcome, RunOutcome::ResourceExceeded(_)));
        // The trace up to the trip is retained.
        assert!(!report.trace.is_empty());
        assert!(report.trace.len() <= 50);
    }

    #[test]
    fn huge_string_repetition_fails_the_run_not_the_engine() {
        let report = trace_of("x = 'abc' * 9223372036854775807\n");
        let RunOutcome::RuntimeFailure(msg) = &report.outcome else {
            panic!("expected runtime failure, got {:?}", report.outcome);
        };
        assert!(msg.contains("OverflowError"));
        // The step for the failing line was already recorded.
        assert_eq!(report.trace.len(), 1);
    }

    #[test]
    fn unbounded_recursion_fails_before_the_event_cap() {
        let report = trace_of("def f():\n    return f()\nf()\n");
        let RunOutcome::RuntimeFailure(msg) = &report.outcome else {
            panic!("expected runtime failure, got {:?}", report.outcome);
        };
        assert!(msg.contains("RecursionError"));
    }

    #[test]
    fn library_frames_are_invisible_but_their_output_is_not() {
        let lib = compile_library(
            "def helper():\n    print('from lib')\n    return 5\n",
            Path::new("lib/helpers.py"),
        )
        .unwrap();
        let libs = [lib];
        let report = run(&RunRequest {
            libraries: &libs,
            ..RunRequest::new("x = helper()\nprint(x)\n", Path::new("main.py"))
        });
        assert_eq!(report.outcome, RunOutcome::Success);

        // Every step belongs to the traced script's module frame; nothing
        // from the library file was recorded.
        for step in report.trace.steps() {
            assert_eq!(step.func_name, MODULE_SCOPE);
        }
        // But the library's print surfaced in the next accepted step.
        assert_eq!(concat_output(&report), "from lib\n5\n");
        let last = report.trace.steps().last().unwrap();
        assert_eq!(last.global_vars["x"], "5");
    }

    #[test]
    fn same_seed_gives_identical_traces() {
        let source = "rolls = []\nfor i in range(5):\n    rolls.append(randint(1, 6))\nprint(rolls)\n";
        let a = trace_of(source);
        let b = trace_of(source);
        assert_eq!(a.outcome, RunOutcome::Success);
        assert_eq!(
            serde_json::to_string(&a.trace).unwrap(),
            serde_json::to_string(&b.trace).unwrap()
        );
    }

    #[test]
    fn different_seeds_are_accepted() {
        let source = "x = randint(1, 1000000)\n";
        let report = run(&RunRequest {
            seed: 7,
            ..RunRequest::new(source, Path::new("main.py"))
        });
        assert_eq!(report.outcome, RunOutcome::Success);
    }

    #[test]
    fn dunder_names_never_reach_the_trace() {
        let report = trace_of("x = 1\n");
        for step in report.trace.steps() {
            assert!(!step.global_vars.contains_key("__name__"));
        }
    }

    #[test]
    fn list_aliasing_is_visible_in_snapshots() {
        let report = trace_of("a = [1, 2]\nb = a\nb.append(3)\nprint(a)\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        let last = report.trace.steps().last().unwrap();
        assert_eq!(last.global_vars["a"], "[1, 2, 3]");
        assert_eq!(last.global_vars["b"], "[1, 2, 3]");
        assert_eq!(concat_output(&report), "[1, 2, 3]\n");
    }

    #[test]
    fn cyclic_list_degrades_to_placeholder_not_failure() {
        let report = trace_of("a = [1]\na.append(a)\nprint('done')\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        let last = report.trace.steps().last().unwrap();
        assert_eq!(last.global_vars["a"], "<unserializable list>");
    }

    #[test]
    fn global_statement_rebinding_shows_in_globals() {
        let report =
            trace_of("count = 0\ndef bump():\n    global count\n    count = count + 1\nbump()\nbump()\n");
        assert_eq!(report.outcome, RunOutcome::Success);
        let last = report.trace.steps().last().unwrap();
        assert_eq!(last.global_vars["count"], "2");
    }
}
