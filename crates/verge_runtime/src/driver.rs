//! The exploration driver.
//!
//! [`run`] owns the whole life of a checking run:
//!
//! 1. **Init** (single-threaded): evaluate every start state per
//!    quantifier binding, canonicalize, check assumptions and invariants,
//!    insert into the seen set, and enqueue survivors round-robin.
//! 2. **Warmup**: the initial thread explores alone until the queue holds
//!    more than 20 states, then releases the `THREADS - 1` parked workers
//!    and flips the phase to RUN; from there all threads are symmetric.
//! 3. **Exploration**: dequeue a state; for every rule and binding,
//!    duplicate it, record the transition id, evaluate the guard and body,
//!    canonicalize, check assumptions and invariants, insert; on a fresh
//!    insertion check covers and liveness, and enqueue below the depth
//!    bound. A state that fires no (non-stuttering) rule is a deadlock
//!    when detection is on. Progress is reported every 10,000 states.
//! 4. **Wrap-up** (single-threaded again): report cover results, run the
//!    final liveness pass to a fixpoint, and print the summary.
//!
//! Errors anywhere are counted against `max_errors`; reaching the limit
//! sets the shared counter that every thread polls, and threads finish
//! their current expansion and exit cooperatively. Assumption violations
//! abandon only the offending rule iteration.

use crate::arena::StateAllocator;
use crate::config::{trace, Config, CounterexampleTrace, DeadlockDetection};
use crate::error::{Trap, TrapKind};
use crate::liveness;
use crate::model::{
    binding_combinations, binding_values, for_each_binding, EvalCtx, Model, PropertyKind,
    QuantBinding,
};
use crate::output::{xml_escape, Output};
use crate::queue::{QueueThread, Queues};
use crate::rendezvous::Rendezvous;
use crate::set::{SeenSet, SetThread};
use crate::state::{StateLayout, StateRef};
use crate::symmetry;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Instant;

/// Queue length at which the initial thread stops exploring alone.
const WARMUP_QUEUE_TARGET: usize = 20;

/// States between progress reports.
const PROGRESS_INTERVAL: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Warmup,
    Run,
    Done,
}

/// Whether an error was tolerable or must stop the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorOutcome {
    Recover,
    Fatal,
}

struct Checker {
    model: Model,
    cfg: Config,
    layout: StateLayout,
    out: Output,
    queues: Queues,
    seen: SeenSet,
    rendezvous: Rendezvous,
    error_count: AtomicU64,
    rules_fired: Vec<AtomicU64>,
    /// Hit counters, one per cover property.
    covers: Vec<AtomicU64>,
    phase: Mutex<Phase>,
    phase_cond: Condvar,
    started: Instant,
}

impl Checker {
    fn seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    fn errors(&self) -> u64 {
        self.error_count.load(Ordering::SeqCst)
    }

    fn cancelled(&self) -> bool {
        self.errors() >= self.cfg.max_errors
    }

    fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Releases the parked secondary workers into the RUN phase. Called by
    /// the initial thread, which must first have raised the rendezvous
    /// participant count.
    fn start_run_phase(&self) {
        self.rendezvous.set_running(self.cfg.threads);
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        *phase = Phase::Run;
        self.phase_cond.notify_all();
    }

    /// Marks the run finished, waking parked workers so they can exit.
    fn finish_phase(&self) {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *phase == Phase::Warmup {
            *phase = Phase::Done;
        }
        self.phase_cond.notify_all();
    }

    /// Blocks a secondary worker until warmup ends one way or the other.
    fn wait_for_start(&self) -> Phase {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        while *phase == Phase::Warmup {
            phase = self
                .phase_cond
                .wait(phase)
                .unwrap_or_else(|e| e.into_inner());
        }
        *phase
    }

    // ------------------------------------------------------------------
    // Error reporting
    // ------------------------------------------------------------------

    /// Reports an error (with its counterexample when a state is at hand)
    /// and decides whether the run continues.
    fn report_error(&self, state: Option<StateRef>, message: &str) -> ErrorOutcome {
        let prior = self.error_count.fetch_add(1, Ordering::SeqCst);

        if prior < self.cfg.max_errors {
            let _guard = self.out.lock();
            let with_trace = state.is_some()
                && self.cfg.counterexample_trace != CounterexampleTrace::Off;

            if self.cfg.machine_readable {
                self.out.put(&format!(
                    "<error includes_trace=\"{}\">\n<message>{}</message>\n",
                    with_trace,
                    xml_escape(message)
                ));
                if with_trace {
                    self.print_counterexample(state.unwrap());
                }
                self.out.put("</error>\n");
            } else {
                if state.is_some() {
                    self.out
                        .put("The following is the error trace for the error:\n\n");
                } else {
                    self.out.put("Result:\n\n");
                }
                self.out.put(&format!(
                    "\t{}{}{}{}\n\n",
                    self.out.red(),
                    self.out.bold(),
                    message,
                    self.out.reset()
                ));
                if with_trace {
                    self.print_counterexample(state.unwrap());
                    self.out.put("End of the error trace.\n\n");
                }
            }
            self.out.flush();
        }

        if prior + 1 >= self.cfg.max_errors {
            ErrorOutcome::Fatal
        } else {
            ErrorOutcome::Recover
        }
    }

    // ------------------------------------------------------------------
    // Counterexample printing (caller holds the print lock)
    // ------------------------------------------------------------------

    fn print_counterexample(&self, s: StateRef) {
        if self.cfg.counterexample_trace == CounterexampleTrace::Off {
            return;
        }

        // walk back to the start state, then print forwards
        let mut chain = Vec::with_capacity(s.depth(&self.layout));
        let mut current = Some(s);
        while let Some(state) = current {
            chain.push(state);
            current = state.previous(&self.layout);
        }
        chain.reverse();

        for (i, current) in chain.iter().enumerate() {
            let previous = if i == 0 { None } else { Some(chain[i - 1]) };
            self.print_transition(*current);

            if self.cfg.machine_readable {
                self.out.put("<state>\n");
            }
            let diff_base = match self.cfg.counterexample_trace {
                CounterexampleTrace::Full => None,
                _ => previous,
            };
            self.print_state(diff_base, *current);
            if self.cfg.machine_readable {
                self.out.put("</state>\n");
            } else {
                self.out.put("----------\n\n");
            }
        }
    }

    /// Prints the transition that produced `s`, reconstructed from the
    /// stored `rule_taken` id: the owning rule by subtracting per-rule
    /// binding counts, the binding tuple by division and modulo.
    fn print_transition(&self, s: StateRef) {
        let rule_taken = s.rule_taken(&self.layout);
        if rule_taken == 0 {
            self.out.put("unknown state transition\n");
            return;
        }

        let is_start = s.previous(&self.layout).is_none();
        let mut base = 1u64;

        let describe = |label: &str, name: &str, bindings: &[QuantBinding], index: u64| {
            let values = binding_values(bindings, index);
            if self.cfg.machine_readable {
                let mut line = format!("<transition>{}", xml_escape(name));
                for (b, v) in bindings.iter().zip(&values) {
                    line.push_str(&format!(
                        "<parameter name=\"{}\">{}</parameter>",
                        xml_escape(&b.name),
                        xml_escape(&render_binding_value(b, *v))
                    ));
                }
                line.push_str("</transition>\n");
                line
            } else {
                let mut line = format!("{} {}", label, name);
                for (b, v) in bindings.iter().zip(&values) {
                    line.push_str(&format!(", {}: {}", b.name, render_binding_value(b, *v)));
                }
                line.push_str(" fired.\n");
                line
            }
        };

        if is_start {
            for desc in &self.model.start_states {
                let count = binding_combinations(&desc.bindings);
                if rule_taken < base + count {
                    let text =
                        describe("Startstate", &desc.name, &desc.bindings, rule_taken - base);
                    self.out.put(&text);
                    return;
                }
                base += count;
            }
        } else {
            for desc in &self.model.rules {
                let count = binding_combinations(&desc.bindings);
                if rule_taken < base + count {
                    let text = describe("Rule", &desc.name, &desc.bindings, rule_taken - base);
                    self.out.put(&text);
                    return;
                }
                base += count;
            }
        }

        self.out.put(&format!(
            "no rule found to link to state at depth {}\n",
            s.depth(&self.layout)
        ));
    }

    fn print_state(&self, previous: Option<StateRef>, s: StateRef) {
        let mut text = String::new();
        match &self.model.print_state {
            Some(print) => print(
                &mut text,
                previous.map(|p| p.data(&self.layout)),
                s.data(&self.layout),
            ),
            None => {
                // fallback for models registered without a printer
                for byte in s.data(&self.layout) {
                    text.push_str(&format!("{:02x}", byte));
                }
                text.push('\n');
            }
        }
        self.out.put(&text);
    }

    // ------------------------------------------------------------------
    // Property checking
    // ------------------------------------------------------------------

    /// Evaluates assumptions against `s`; a false assumption is an
    /// assumption trap (pruning the current iteration).
    fn check_assumptions(&self, s: StateRef) -> Result<(), Trap> {
        for prop in &self.model.properties {
            if prop.kind != PropertyKind::Assumption {
                continue;
            }
            let mut violated = None;
            for_each_binding(&prop.bindings, |args| {
                let mut ctx = EvalCtx::read_only(s.data(&self.layout), &self.out);
                match (prop.check)(&mut ctx, args) {
                    Ok(true) => ControlFlow::Continue(()),
                    Ok(false) => {
                        violated = Some(Trap::assumption());
                        ControlFlow::Break(())
                    }
                    Err(t) => {
                        violated = Some(t);
                        ControlFlow::Break(())
                    }
                }
            });
            if let Some(t) = violated {
                return Err(t);
            }
        }
        Ok(())
    }

    /// Evaluates invariants against `s`; a false invariant is a failed-
    /// invariant trap.
    fn check_invariants(&self, s: StateRef) -> Result<(), Trap> {
        for (index, prop) in self.model.properties.iter().enumerate() {
            if prop.kind != PropertyKind::Invariant {
                continue;
            }
            let mut failed = None;
            for_each_binding(&prop.bindings, |args| {
                let mut ctx = EvalCtx::read_only(s.data(&self.layout), &self.out);
                match (prop.check)(&mut ctx, args) {
                    Ok(true) => ControlFlow::Continue(()),
                    Ok(false) => {
                        let label = if prop.name.is_empty() {
                            (index + 1).to_string()
                        } else {
                            format!("\"{}\"", prop.name)
                        };
                        failed = Some(Trap::new(
                            TrapKind::FailedInvariant,
                            format!("invariant {} failed", label),
                        ));
                        ControlFlow::Break(())
                    }
                    Err(t) => {
                        failed = Some(t);
                        ControlFlow::Break(())
                    }
                }
            });
            if let Some(t) = failed {
                return Err(t);
            }
        }
        Ok(())
    }

    /// Counts cover hits in a freshly inserted state.
    fn check_covers(&self, s: StateRef) -> Result<(), Trap> {
        let mut cover_index = 0;
        for prop in &self.model.properties {
            if prop.kind != PropertyKind::Cover {
                continue;
            }
            let mut trapped = None;
            for_each_binding(&prop.bindings, |args| {
                let mut ctx = EvalCtx::read_only(s.data(&self.layout), &self.out);
                match (prop.check)(&mut ctx, args) {
                    Ok(true) => {
                        self.covers[cover_index].fetch_add(1, Ordering::SeqCst);
                        ControlFlow::Continue(())
                    }
                    Ok(false) => ControlFlow::Continue(()),
                    Err(t) => {
                        trapped = Some(t);
                        ControlFlow::Break(())
                    }
                }
            });
            if let Some(t) = trapped {
                return Err(t);
            }
            cover_index += 1;
        }
        Ok(())
    }

    /// Marks liveness bits satisfied by a freshly inserted state.
    fn check_liveness(&self, s: StateRef) -> Result<(), Trap> {
        let mut liveness_index = 0;
        for prop in &self.model.properties {
            if prop.kind != PropertyKind::Liveness {
                continue;
            }
            let mut trapped = None;
            for_each_binding(&prop.bindings, |args| {
                let mut ctx = EvalCtx::read_only(s.data(&self.layout), &self.out);
                let result = match (prop.check)(&mut ctx, args) {
                    Ok(true) => {
                        liveness::mark(&self.layout, s, liveness_index);
                        ControlFlow::Continue(())
                    }
                    Ok(false) => ControlFlow::Continue(()),
                    Err(t) => {
                        trapped = Some(t);
                        ControlFlow::Break(())
                    }
                };
                liveness_index += 1;
                result
            });
            if let Some(t) = trapped {
                return Err(t);
            }
        }
        Ok(())
    }
}

fn render_binding_value(b: &QuantBinding, v: i64) -> String {
    match &b.member_names {
        Some(names) => {
            let index = (v - b.lower) as usize;
            names
                .get(index)
                .cloned()
                .unwrap_or_else(|| v.to_string())
        }
        None => v.to_string(),
    }
}

// ----------------------------------------------------------------------
// Worker
// ----------------------------------------------------------------------

struct WorkerCtx {
    arena: StateAllocator,
    qt: QueueThread,
}

struct Worker<'a> {
    ck: &'a Checker,
    arena: &'a mut StateAllocator,
    qt: &'a mut QueueThread,
    set: SetThread,
    queue_id: usize,
    last_queue_size: usize,
    rules_fired: u64,
    /// Only the initial thread triggers the warmup-to-run transition.
    is_initial: bool,
}

impl<'a> Worker<'a> {
    fn new(ck: &'a Checker, ctx: &'a mut WorkerCtx, set: SetThread) -> Self {
        let thread_id = ctx.qt.thread_id;
        Self {
            ck,
            arena: &mut ctx.arena,
            qt: &mut ctx.qt,
            set,
            queue_id: thread_id,
            last_queue_size: 0,
            rules_fired: 0,
            is_initial: thread_id == 0,
        }
    }

    fn thread_id(&self) -> usize {
        self.qt.thread_id
    }

    /// The per-thread exploration loop.
    fn explore(mut self) {
        loop {
            if self.ck.cancelled() {
                break;
            }
            let Some(s) = self
                .ck
                .queues
                .dequeue(self.qt, &self.ck.out, &mut self.queue_id)
            else {
                break;
            };

            if self.expand(s).is_break() {
                break;
            }
        }
        self.exit();
    }

    /// Expands one dequeued state across every rule and binding.
    fn expand(&mut self, s: StateRef) -> ControlFlow<()> {
        let ck = self.ck;
        // assume a deadlock until some rule proves otherwise
        let mut possible_deadlock = true;
        let mut rule_taken = 1u64;
        let mut flow = ControlFlow::Continue(());

        'rules: for rule in &ck.model.rules {
            let mut stop = false;
            for_each_binding(&rule.bindings, |args| {
                let step = self.expand_one(s, rule, args, rule_taken, &mut possible_deadlock);
                rule_taken += 1;
                if step.is_break() {
                    stop = true;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
            if stop {
                flow = ControlFlow::Break(());
                break 'rules;
            }
        }

        if flow.is_continue()
            && ck.cfg.deadlock_detection != DeadlockDetection::Off
            && possible_deadlock
        {
            if ck.report_error(Some(s), "deadlock") == ErrorOutcome::Fatal {
                flow = ControlFlow::Break(());
            }
        }

        flow
    }

    /// One rule × binding expansion of `s`.
    fn expand_one(
        &mut self,
        s: StateRef,
        rule: &crate::model::RuleDesc,
        args: &[i64],
        rule_taken: u64,
        possible_deadlock: &mut bool,
    ) -> ControlFlow<()> {
        let ck = self.ck;
        let layout = &ck.layout;

        let n = StateRef::from_block(self.arena.alloc());
        unsafe {
            n.init_duplicate(layout, s);
            n.set_rule_taken(layout, rule_taken);
        }

        // guard, then body
        let fired = {
            let enabled = match &rule.guard {
                Some(guard) => {
                    let mut ctx = EvalCtx::read_only(n.data(layout), &ck.out);
                    guard(&mut ctx, args)
                }
                None => Ok(true),
            };
            match enabled {
                Ok(false) => {
                    self.arena.free(n.as_block());
                    return ControlFlow::Continue(());
                }
                Ok(true) => {
                    let mut ctx =
                        EvalCtx::read_write(unsafe { n.data_mut(layout) }, &ck.out);
                    (rule.body)(&mut ctx, args)
                }
                Err(t) => Err(t),
            }
        };

        if let Err(t) = fired {
            return self.handle_trap(n, t);
        }

        self.rules_fired += 1;
        if ck.cfg.deadlock_detection != DeadlockDetection::Stuttering || !n.data_eq(s, layout) {
            *possible_deadlock = false;
        }

        symmetry::canonicalize(&ck.model, layout, &ck.cfg, &ck.out, n);

        if let Err(t) = ck.check_assumptions(n) {
            return self.handle_trap(n, t);
        }
        if let Err(t) = ck.check_invariants(n) {
            return self.handle_trap(n, t);
        }

        match ck
            .seen
            .insert(&mut self.set, &ck.rendezvous, &ck.out, layout, n)
        {
            None => {
                // a twin was already seen; recycle the candidate
                self.arena.free(n.as_block());
            }
            Some(count) => {
                if let Err(t) = ck.check_covers(n) {
                    return self.handle_published_trap(n, t);
                }
                if let Err(t) = ck.check_liveness(n) {
                    return self.handle_published_trap(n, t);
                }

                if ck.cfg.bound == 0 || n.bound(layout) < ck.cfg.bound {
                    let queue_size =
                        ck.queues
                            .enqueue(self.qt, &ck.out, n, self.thread_id());
                    self.queue_id = self.thread_id();

                    if count % PROGRESS_INTERVAL == 0 {
                        self.report_progress(count, queue_size);
                    }

                    if self.is_initial
                        && ck.cfg.threads > 1
                        && ck.phase() == Phase::Warmup
                        && queue_size > WARMUP_QUEUE_TARGET
                    {
                        ck.start_run_phase();
                    }
                }

                if ck.out.tracing(trace::MEMORY_USAGE) {
                    ck.out.trace(
                        trace::MEMORY_USAGE,
                        &format!(
                            "arena now holds {} bytes after {} states",
                            self.arena.allocated_bytes(),
                            count
                        ),
                    );
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// Handles a trap from a candidate that is still thread-private.
    fn handle_trap(&mut self, n: StateRef, t: Trap) -> ControlFlow<()> {
        if t.kind.is_assumption() {
            // prune this rule iteration only
            self.arena.free(n.as_block());
            return ControlFlow::Continue(());
        }
        /* The candidate is deliberately not recycled: the error report
         * just walked its predecessor chain.
         */
        match self.ck.report_error(Some(n), &t.message) {
            ErrorOutcome::Recover => ControlFlow::Continue(()),
            ErrorOutcome::Fatal => ControlFlow::Break(()),
        }
    }

    /// Handles a trap once the state is already published (post-insert):
    /// the block can no longer be recycled in any path.
    fn handle_published_trap(&mut self, n: StateRef, t: Trap) -> ControlFlow<()> {
        debug_assert!(!t.kind.is_assumption());
        match self.ck.report_error(Some(n), &t.message) {
            ErrorOutcome::Recover => ControlFlow::Continue(()),
            ErrorOutcome::Fatal => ControlFlow::Break(()),
        }
    }

    fn report_progress(&mut self, count: usize, queue_size: usize) {
        let ck = self.ck;
        let _guard = ck.out.lock();
        if ck.cfg.machine_readable {
            ck.out.put(&format!(
                "<progress states=\"{}\" duration_seconds=\"{}\" rules_fired=\"{}\" queue_size=\"{}\" thread_id=\"{}\"/>\n",
                count,
                ck.seconds(),
                self.rules_fired,
                queue_size,
                self.thread_id()
            ));
        } else {
            let queue_color = if queue_size > self.last_queue_size {
                ck.out.yellow()
            } else {
                ck.out.green()
            };
            let thread_prefix = if ck.cfg.threads > 1 {
                format!("thread {}: ", self.thread_id())
            } else {
                String::new()
            };
            ck.out.put(&format!(
                "\t {}{} states explored in {}s, with {} rules fired and {}{}{} states in the queue.\n",
                thread_prefix,
                count,
                ck.seconds(),
                self.rules_fired,
                queue_color,
                queue_size,
                ck.out.reset()
            ));
        }
        ck.out.flush();
        self.last_queue_size = queue_size;
    }

    /// Worker exit: publish the fired-rule count and leave the shared
    /// structures.
    fn exit(self) {
        self.ck.rules_fired[self.thread_id()].store(self.rules_fired, Ordering::SeqCst);
        self.ck.seen.leave(self.set, &self.ck.rendezvous);
    }
}

// ----------------------------------------------------------------------
// Init
// ----------------------------------------------------------------------

/// Evaluates every start state, single-threaded. Returns break when the
/// error limit was hit.
fn init(ck: &Checker, ctx: &mut WorkerCtx, set: &mut SetThread) -> ControlFlow<()> {
    let layout = &ck.layout;
    let mut queue_id = 0usize;
    let mut rule_taken = 1u64;

    for desc in &ck.model.start_states {
        let mut stop = false;
        for_each_binding(&desc.bindings, |args| {
            let s = StateRef::from_block(ctx.arena.alloc());
            unsafe {
                s.set_rule_taken(layout, rule_taken);
            }
            rule_taken += 1;

            let applied = {
                let mut eval = EvalCtx::read_write(unsafe { s.data_mut(layout) }, &ck.out);
                (desc.apply)(&mut eval, args)
            };

            let result = applied
                .and_then(|_| {
                    symmetry::canonicalize(&ck.model, layout, &ck.cfg, &ck.out, s);
                    ck.check_assumptions(s)
                })
                .and_then(|_| ck.check_invariants(s));

            match result {
                Err(t) if t.kind.is_assumption() => {
                    ctx.arena.free(s.as_block());
                    ControlFlow::Continue(())
                }
                Err(t) => match ck.report_error(Some(s), &t.message) {
                    ErrorOutcome::Recover => ControlFlow::Continue(()),
                    ErrorOutcome::Fatal => {
                        stop = true;
                        ControlFlow::Break(())
                    }
                },
                Ok(()) => {
                    match ck
                        .seen
                        .insert(set, &ck.rendezvous, &ck.out, layout, s)
                    {
                        None => ctx.arena.free(s.as_block()),
                        Some(_) => {
                            let covers = ck.check_covers(s).and_then(|_| ck.check_liveness(s));
                            if let Err(t) = covers {
                                if ck.report_error(Some(s), &t.message) == ErrorOutcome::Fatal {
                                    stop = true;
                                    return ControlFlow::Break(());
                                }
                            }
                            ck.queues.enqueue(&mut ctx.qt, &ck.out, s, queue_id);
                            queue_id = (queue_id + 1) % ck.queues.queue_count();
                        }
                    }
                    ControlFlow::Continue(())
                }
            }
        });
        if stop {
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

// ----------------------------------------------------------------------
// Final liveness pass
// ----------------------------------------------------------------------

/// Re-fires every rule from every seen state, learning liveness facts
/// from the canonical twin of each successor, until a fixpoint.
fn check_liveness_final(ck: &Checker, ctx: &mut WorkerCtx, set: &SetThread) {
    let layout = &ck.layout;
    if layout.liveness_count == 0 {
        return;
    }

    let mut states = Vec::new();
    ck.seen.for_each(set, |s| states.push(s));

    loop {
        let mut progress = 0usize;

        for &s in &states {
            if liveness::unknown(layout, s) == 0 {
                continue;
            }
            if ck.cfg.bound > 0 && s.bound(layout) >= ck.cfg.bound {
                continue;
            }

            for rule in &ck.model.rules {
                for_each_binding(&rule.bindings, |args| {
                    let n = StateRef::from_block(ctx.arena.alloc());
                    unsafe {
                        n.init_duplicate(layout, s);
                    }

                    let fired = match &rule.guard {
                        Some(guard) => {
                            let mut eval = EvalCtx::read_only(n.data(layout), &ck.out);
                            guard(&mut eval, args)
                        }
                        None => Ok(true),
                    }
                    .and_then(|enabled| {
                        if !enabled {
                            return Ok(false);
                        }
                        let mut eval =
                            EvalCtx::read_write(unsafe { n.data_mut(layout) }, &ck.out);
                        (rule.body)(&mut eval, args).map(|_| true)
                    });

                    match fired {
                        Ok(true) => {
                            symmetry::canonicalize(&ck.model, layout, &ck.cfg, &ck.out, n);
                            if ck.check_assumptions(n).is_ok() {
                                /* No invariant check needed: this successor
                                 * already passed it during exploration.
                                 */
                                if let Some(twin) = ck.seen.find(set, layout, n) {
                                    progress += liveness::learn(layout, s, twin);
                                }
                            }
                        }
                        Ok(false) | Err(_) => {}
                    }

                    ctx.arena.free(n.as_block());
                    ControlFlow::Continue(())
                });
            }
        }

        if progress == 0 {
            break;
        }
    }
}

/// Reports liveness properties that some state never satisfied. Returns
/// the number of violations.
fn check_liveness_summarize(ck: &Checker, set: &SetThread) -> u64 {
    let layout = &ck.layout;
    if layout.liveness_count == 0 {
        return 0;
    }

    let mut missed = vec![false; layout.liveness_count];
    let mut witnesses: Vec<Option<StateRef>> = vec![None; layout.liveness_count];

    ck.seen.for_each(set, |s| {
        for index in 0..layout.liveness_count {
            if !missed[index] && !liveness::is_marked(layout, s, index) {
                missed[index] = true;
                witnesses[index] = Some(s);
            }
        }
    });

    let mut names = Vec::with_capacity(layout.liveness_count);
    for (pi, prop) in ck.model.properties.iter().enumerate() {
        if prop.kind != PropertyKind::Liveness {
            continue;
        }
        let combos = binding_combinations(&prop.bindings);
        for _ in 0..combos {
            let label = if prop.name.is_empty() {
                (pi + 1).to_string()
            } else {
                format!("\"{}\"", prop.name)
            };
            names.push(label);
        }
    }

    let mut total = 0;
    for (index, was_missed) in missed.iter().enumerate() {
        if !was_missed {
            continue;
        }
        total += 1;
        let _guard = ck.out.lock();
        if ck.cfg.machine_readable {
            ck.out.put(&format!(
                "<error includes_trace=\"false\"><message>liveness property {} violated</message></error>\n",
                xml_escape(&names[index])
            ));
        } else {
            ck.out.put(&format!(
                "\t{}{}liveness property {} violated:{}\n",
                ck.out.red(),
                ck.out.bold(),
                names[index],
                ck.out.reset()
            ));
            if let Some(witness) = witnesses[index] {
                ck.print_state(None, witness);
            }
        }
        ck.out.flush();
    }
    total
}

// ----------------------------------------------------------------------
// Entry point
// ----------------------------------------------------------------------

/// Outcome of a checking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Process exit status: 0 when no error was found.
    pub status: i32,
    /// Distinct (canonicalized) states discovered.
    pub states: usize,
    /// Total rule firings across all threads.
    pub rules_fired: u64,
    /// Errors found, including missed covers and violated liveness.
    pub errors: u64,
}

/// Runs the checker. Returns the process exit status: 0 when no error was
/// found.
pub fn run(model: Model, cfg: Config) -> i32 {
    run_report(model, cfg).status
}

/// Runs the checker and returns the full outcome.
pub fn run_report(model: Model, mut cfg: Config) -> Report {
    cfg.threads = cfg.threads.max(1);
    cfg.max_errors = cfg.max_errors.max(1);

    let schedule_widths: Vec<usize> = if cfg.symmetry_reduction
        != crate::config::SymmetryReduction::Off
        && cfg.counterexample_trace != CounterexampleTrace::Off
    {
        model
            .scalarsets
            .iter()
            .map(|d| symmetry::schedule_width(d.bound))
            .collect()
    } else {
        Vec::new()
    };

    let liveness_count = model.liveness_count();
    let layout = StateLayout::new(
        &cfg,
        model.state_bits,
        liveness_count,
        model.rule_id_bound(),
        &schedule_widths,
    );

    let out = Output::new(&cfg);
    if cfg.sandbox {
        crate::sandbox::activate();
    }

    let seen = SeenSet::new(cfg.set_capacity, cfg.set_expand_threshold, layout.data_bytes);
    let cover_count = model.cover_count();
    let threads = cfg.threads;

    let ck = Checker {
        queues: Queues::new(threads),
        rendezvous: Rendezvous::new(),
        error_count: AtomicU64::new(0),
        rules_fired: (0..threads).map(|_| AtomicU64::new(0)).collect(),
        covers: (0..cover_count).map(|_| AtomicU64::new(0)).collect(),
        phase: Mutex::new(Phase::Warmup),
        phase_cond: Condvar::new(),
        started: Instant::now(),
        layout,
        seen,
        out,
        model,
        cfg,
    };

    // report header
    {
        let _guard = ck.out.lock();
        if ck.cfg.machine_readable {
            ck.out.put(&format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<verge_run>\n<information state_size_bits=\"{}\" state_size_bytes=\"{}\" hash_table_slots=\"{}\"/>\n",
                ck.layout.data_bits,
                ck.layout.data_bytes,
                ck.seen.slot_count()
            ));
        } else {
            ck.out.put(&format!(
                "Memory usage:\n\n\t* The size of each state is {} bits (rounded up to {} bytes).\n\t* The size of the hash table is {} slots.\n\n",
                ck.layout.data_bits,
                ck.layout.data_bytes,
                ck.seen.slot_count()
            ));
        }
        ck.out.flush();
    }

    let mut ctx0 = WorkerCtx {
        arena: StateAllocator::new(ck.layout.total_words),
        qt: QueueThread::new(0, threads),
    };
    let mut set0 = ck.seen.thread_init();

    let init_flow = init(&ck, &mut ctx0, &mut set0);

    if !ck.cfg.machine_readable {
        let _guard = ck.out.lock();
        ck.out.put("Progress Report:\n\n");
        ck.out.flush();
    }

    // secondary contexts, created up front so their arenas outlive the
    // worker threads and keep published states alive for the wrap-up
    let secondary: Vec<WorkerCtx> = (1..threads)
        .map(|tid| WorkerCtx {
            arena: StateAllocator::new(ck.layout.total_words),
            qt: QueueThread::new(tid, threads),
        })
        .collect();

    let mut retained: Vec<WorkerCtx> = Vec::with_capacity(threads);

    std::thread::scope(|scope| {
        let ck = &ck;
        let handles: Vec<_> = secondary
            .into_iter()
            .map(|mut ctx| {
                scope.spawn(move || {
                    if ck.wait_for_start() == Phase::Run {
                        let set = ck.seen.thread_init();
                        Worker::new(ck, &mut ctx, set).explore();
                    }
                    ctx
                })
            })
            .collect();

        if init_flow.is_continue() {
            Worker::new(ck, &mut ctx0, set0).explore();
        } else {
            ck.seen.leave(set0, &ck.rendezvous);
        }

        // wake any workers still parked in warmup so they can exit
        ck.finish_phase();

        for handle in handles {
            retained.push(handle.join().expect("worker thread panicked"));
        }
    });
    retained.push(ctx0);

    // single-threaded wrap-up
    let mut status = if ck.errors() > 0 { 1 } else { 0 };
    let wrap_set = ck.seen.thread_init();
    let ctx = retained.last_mut().expect("missing initial context");

    // cover results
    if ck.errors() == 0 {
        let mut cover_index = 0;
        for prop in &ck.model.properties {
            if prop.kind != PropertyKind::Cover {
                continue;
            }
            let hits = ck.covers[cover_index].load(Ordering::SeqCst);
            cover_index += 1;
            let _guard = ck.out.lock();
            if ck.cfg.machine_readable {
                ck.out.put(&format!(
                    "<cover_result message=\"{}\" count=\"{}\"/>\n",
                    xml_escape(&prop.name),
                    hits
                ));
            }
            if hits == 0 {
                if !ck.cfg.machine_readable {
                    ck.out.put(&format!(
                        "\t{}{}cover \"{}\" not hit{}\n",
                        ck.out.red(),
                        ck.out.bold(),
                        prop.name,
                        ck.out.reset()
                    ));
                }
                ck.error_count.fetch_add(1, Ordering::SeqCst);
                status = 1;
            } else if !ck.cfg.machine_readable {
                ck.out.put(&format!(
                    "\t{}{}cover \"{}\" hit {} times{}\n",
                    ck.out.green(),
                    ck.out.bold(),
                    prop.name,
                    hits,
                    ck.out.reset()
                ));
            }
            ck.out.flush();
        }
    }

    // final liveness check
    if ck.errors() == 0 && ck.layout.liveness_count > 0 {
        check_liveness_final(&ck, ctx, &wrap_set);
        let failed = check_liveness_summarize(&ck, &wrap_set);
        if failed > 0 {
            ck.error_count.fetch_add(failed, Ordering::SeqCst);
            status = 1;
        }
    }

    // summary
    let fire_count: u64 = ck
        .rules_fired
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum();
    {
        let _guard = ck.out.lock();
        if ck.cfg.machine_readable {
            ck.out.put(&format!(
                "<summary states=\"{}\" rules_fired=\"{}\" errors=\"{}\" duration_seconds=\"{}\"/>\n</verge_run>\n",
                ck.seen.len(),
                fire_count,
                ck.errors(),
                ck.seconds()
            ));
        } else {
            ck.out.put(
                "\n==========================================================================\n\nStatus:\n\n",
            );
            if ck.errors() == 0 {
                ck.out.put(&format!(
                    "\t{}{}No error found.{}\n",
                    ck.out.green(),
                    ck.out.bold(),
                    ck.out.reset()
                ));
            } else {
                ck.out.put(&format!(
                    "\t{}{}{} error(s) found.{}\n",
                    ck.out.red(),
                    ck.out.bold(),
                    ck.errors(),
                    ck.out.reset()
                ));
            }
            ck.out.put(&format!(
                "\nState Space Explored:\n\n\t{} states, {} rules fired in {}s.\n",
                ck.seen.len(),
                fire_count,
                ck.seconds()
            ));
        }
        ck.out.flush();
    }

    // the wrap-up reference is released without a rendezvous: the run is
    // single-threaded again
    ck.seen.release(&wrap_set);
    ck.queues.drain_blocks();

    let report = Report {
        status,
        states: ck.seen.len(),
        rules_fired: fire_count,
        errors: ck.errors(),
    };
    drop(retained);
    report
}
