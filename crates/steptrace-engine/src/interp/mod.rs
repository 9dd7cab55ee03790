//! The tracing interpreter: statement execution, the instrumentation hook,
//! and the event filter.
//!
//! Execution is single-threaded and cooperative. The interpreter walks the
//! AST; before each statement in an *accepted* frame it fires a line event,
//! which consults the resource governor, drains the output buffer, and
//! appends a [`Step`](crate::trace::Step). Frame acceptance is decided on
//! entry by comparing the frame's originating file against the traced
//! script's canonical path: builtins and library units fail the comparison
//! and execute invisibly, though their writes surface in the next accepted
//! step.
//!
//! All run-scoped mutable state lives in one [`ExecutionContext`] owned by
//! the interpreter for exactly one run; nothing is shared across runs.

mod eval;

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use rand_chacha::ChaCha8Rng;

use steptrace_lang::ast::{Stmt, StmtKind, Target};
use steptrace_lang::CodeUnit;

use crate::error::RuntimeError;
use crate::governor::{Governor, Limits};
use crate::io::{self, LineSource, OutputBuffer};
use crate::snapshot::snapshot;
use crate::trace::{EventKind, Step, Trace, MODULE_SCOPE};
use crate::value::{FunctionObj, Value};

/// Maximum user-level call depth. Well under the native stack budget since
/// each traced call costs a handful of Rust frames.
const MAX_CALL_DEPTH: usize = 64;

/// Run-scoped mutable state, created at run start and discarded at run end.
pub struct ExecutionContext {
    pub out: OutputBuffer,
    pub input: Box<dyn LineSource>,
    pub trace: Trace,
    pub governor: Governor,
    /// Canonical path of the traced script; the event filter's match key.
    pub main_path: Rc<PathBuf>,
    pub rng: ChaCha8Rng,
}

impl ExecutionContext {
    pub fn new(main_path: PathBuf, input: Option<&str>, limits: Limits, seed: u64) -> Self {
        use rand::SeedableRng;
        ExecutionContext {
            out: OutputBuffer::new(),
            input: io::source_for(input),
            trace: Trace::new(),
            governor: Governor::new(limits),
            main_path: Rc::new(main_path),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

/// One call frame. `accepted` is the event filter's decision for this frame,
/// fixed at entry; the stack of frames carries the stack of decisions the
/// hook needs (a rejected caller never produces instrumented callees).
pub(crate) struct Frame {
    pub func_name: String,
    pub locals: IndexMap<String, Value>,
    /// Names declared `global` in this frame.
    pub global_names: HashSet<String>,
    pub is_module: bool,
    pub accepted: bool,
    /// Originating file of the code this frame runs; inherited by any
    /// functions it defines.
    pub origin: Rc<PathBuf>,
    /// Line of the most recently started statement, used by return events.
    pub last_line: u32,
}

/// How a block of statements finished.
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter {
    pub(crate) ctx: ExecutionContext,
    pub(crate) globals: IndexMap<String, Value>,
    depth: usize,
}

impl Interpreter {
    pub fn new(ctx: ExecutionContext) -> Self {
        Interpreter {
            ctx,
            globals: IndexMap::new(),
            depth: 0,
        }
    }

    /// Seeds a module-level binding before execution begins (used for the
    /// implicit `__name__` global).
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    /// Executes a library unit untraced. Its top-level definitions land in
    /// the shared globals, but because the unit's origin differs from the
    /// traced script, calls into them later are invisible to the trace.
    pub fn preload(&mut self, unit: &CodeUnit) -> Result<(), RuntimeError> {
        let mut frame = self.module_frame(unit, false);
        self.exec_block(&unit.body, &mut frame)?;
        Ok(())
    }

    /// Executes the traced script's module frame to completion.
    pub fn run_module(&mut self, unit: &CodeUnit) -> Result<(), RuntimeError> {
        let accepted = self.accepts(&unit.path);
        if accepted {
            // Module frame entry is an instrumentation event like any other.
            self.ctx.governor.on_event()?;
        }
        let mut frame = self.module_frame(unit, accepted);
        self.exec_block(&unit.body, &mut frame)?;
        Ok(())
    }

    /// Tears the run down, handing the trace, final globals, and whatever is
    /// left in the output buffer to the finalizer.
    pub fn into_parts(self) -> (Trace, IndexMap<String, Value>, OutputBuffer) {
        (self.ctx.trace, self.globals, self.ctx.out)
    }

    /// The event filter's frame-entry decision: does this code originate
    /// from the traced script?
    fn accepts(&self, origin: &PathBuf) -> bool {
        origin == &*self.ctx.main_path
    }

    fn module_frame(&self, unit: &CodeUnit, accepted: bool) -> Frame {
        Frame {
            func_name: MODULE_SCOPE.to_string(),
            locals: IndexMap::new(),
            global_names: HashSet::new(),
            is_module: true,
            accepted,
            origin: Rc::new(unit.path.clone()),
            last_line: 0,
        }
    }

    /// The step recorder: governor first, then drain the output produced
    /// since the previous accepted event, then snapshot both scopes. At
    /// module scope locals and globals are the same mapping.
    fn record_step(
        &mut self,
        event: EventKind,
        frame: &Frame,
        line: u32,
    ) -> Result<(), RuntimeError> {
        self.ctx.governor.on_event()?;
        let output = self.ctx.out.drain();
        let global_vars = snapshot(&self.globals);
        let local_vars = if frame.is_module {
            global_vars.clone()
        } else {
            snapshot(&frame.locals)
        };
        self.ctx.trace.push(Step {
            event,
            func_name: frame.func_name.clone(),
            line_no: line,
            local_vars,
            global_vars,
            output,
        });
        Ok(())
    }

    pub(crate) fn exec_block(
        &mut self,
        stmts: &[Stmt],
        frame: &mut Frame,
    ) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            frame.last_line = stmt.line;
            if frame.accepted {
                self.record_step(EventKind::Line, frame, stmt.line)?;
            }
            match self.exec_stmt(stmt, frame)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, frame: &mut Frame) -> Result<Flow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr, frame)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value, frame)?;
                self.assign(target, value, frame, stmt.line)?;
            }
            StmtKind::AugAssign { target, op, value } => {
                let rhs = self.eval(value, frame)?;
                match target {
                    Target::Name(name) => {
                        let current = self.load_name(frame, name, stmt.line)?;
                        let updated = self.binary_op(*op, current, rhs, stmt.line)?;
                        self.store_name(frame, name, updated);
                    }
                    Target::Index { base, index } => {
                        let base = self.eval(base, frame)?;
                        let index = self.eval(index, frame)?;
                        let current = self.index_get(&base, &index, stmt.line)?;
                        let updated = self.binary_op(*op, current, rhs, stmt.line)?;
                        self.index_set(&base, &index, updated, stmt.line)?;
                    }
                }
            }
            StmtKind::Def { name, params, body } => {
                let func = Value::Function(Rc::new(FunctionObj {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    origin: frame.origin.clone(),
                }));
                self.store_name(frame, name, func);
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(e) => self.eval(e, frame)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If { arms, orelse } => {
                for (cond, body) in arms {
                    if self.eval(cond, frame)?.truthy() {
                        return self.exec_block(body, frame);
                    }
                }
                return self.exec_block(orelse, frame);
            }
            StmtKind::While { cond, body } => {
                let mut first = true;
                loop {
                    // The loop header line re-fires on every iteration, the
                    // way CPython traces `while`.
                    if !first && frame.accepted {
                        frame.last_line = stmt.line;
                        self.record_step(EventKind::Line, frame, stmt.line)?;
                    }
                    first = false;
                    if !self.eval(cond, frame)?.truthy() {
                        break;
                    }
                    match self.exec_block(body, frame)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            StmtKind::For { var, iter, body } => {
                let items = self.iterate(iter, frame)?;
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 && frame.accepted {
                        frame.last_line = stmt.line;
                        self.record_step(EventKind::Line, frame, stmt.line)?;
                    }
                    self.store_name(frame, var, item);
                    match self.exec_block(body, frame)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
            StmtKind::Global(names) => {
                // At module scope `global` is a no-op; names already live
                // there.
                if !frame.is_module {
                    frame.global_names.extend(names.iter().cloned());
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(
        &mut self,
        target: &Target,
        value: Value,
        frame: &mut Frame,
        line: u32,
    ) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => {
                self.store_name(frame, name, value);
                Ok(())
            }
            Target::Index { base, index } => {
                let base = self.eval(base, frame)?;
                let index = self.eval(index, frame)?;
                self.index_set(&base, &index, value, line)
            }
        }
    }

    /// Calls a user-defined function: the hook fires on frame entry (a call
    /// event the governor sees), the filter fixes the callee's acceptance,
    /// and on normal exit an accepted frame records a return event.
    pub(crate) fn call_function(
        &mut self,
        func: Rc<FunctionObj>,
        args: Vec<Value>,
        line: u32,
        caller_accepted: bool,
    ) -> Result<Value, RuntimeError> {
        if caller_accepted {
            self.ctx.governor.on_event()?;
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::RecursionLimit {
                limit: MAX_CALL_DEPTH,
                line,
            });
        }
        if args.len() != func.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: func.name.clone(),
                expected: func.params.len(),
                got: args.len(),
                line,
            });
        }

        let accepted = caller_accepted && self.accepts(&func.origin);
        let mut frame = Frame {
            func_name: func.name.clone(),
            locals: func.params.iter().cloned().zip(args).collect(),
            global_names: HashSet::new(),
            is_module: false,
            accepted,
            origin: func.origin.clone(),
            last_line: line,
        };

        self.depth += 1;
        let flow = self.exec_block(&func.body, &mut frame);
        self.depth -= 1;

        let value = match flow? {
            Flow::Return(value) => value,
            _ => Value::None,
        };
        if frame.accepted {
            self.record_step(EventKind::Return, &frame, frame.last_line)?;
        }
        Ok(value)
    }

    // ---- name binding -------------------------------------------------

    /// Lookup order: frame locals (unless declared `global`), then module
    /// globals, then builtins.
    pub(crate) fn load_name(
        &self,
        frame: &Frame,
        name: &str,
        line: u32,
    ) -> Result<Value, RuntimeError> {
        if !frame.is_module && !frame.global_names.contains(name) {
            if let Some(value) = frame.locals.get(name) {
                return Ok(value.clone());
            }
        }
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = crate::value::Builtin::lookup(name) {
            return Ok(Value::Builtin(builtin));
        }
        Err(RuntimeError::NameError {
            name: name.to_string(),
            line,
        })
    }

    pub(crate) fn store_name(&mut self, frame: &mut Frame, name: &str, value: Value) {
        if frame.is_module || frame.global_names.contains(name) {
            self.globals.insert(name.to_string(), value);
        } else {
            frame.locals.insert(name.to_string(), value);
        }
    }
}
