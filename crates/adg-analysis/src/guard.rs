use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tracing::warn;

use adg_core::{AnalysisConfig, AnalysisError, Result};

/// Resource budgets for one guarded operation. Passed by value into every
/// invocation; there is no ambient default.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub timeout: Duration,
    pub max_depth: u32,
    pub max_nodes: u64,
    pub max_memory_bytes: u64,
    pub memory_check_interval: u64,
}

impl Limits {
    /// The budget precise strategies run under.
    pub fn tight(config: &AnalysisConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            max_depth: config.max_depth,
            max_nodes: config.max_nodes,
            max_memory_bytes: config.max_memory_bytes,
            memory_check_interval: config.memory_check_interval,
        }
    }

    /// The budget the fallback strategy runs under. The fallback does flat
    /// scans, so it gets a larger time and node budget and an effectively
    /// unbounded depth (it never recurses over syntax).
    pub fn loose(config: &AnalysisConfig) -> Self {
        let factor = config.fallback_limit_multiplier.max(1.0);
        Self {
            timeout: Duration::from_millis((config.timeout_ms as f64 * factor) as u64),
            max_depth: u32::MAX,
            max_nodes: (config.max_nodes as f64 * factor) as u64,
            max_memory_bytes: config.max_memory_bytes,
            memory_check_interval: config.memory_check_interval,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::tight(&AnalysisConfig::default())
    }
}

/// Samples this process's resident set via sysinfo. Sampling is not free,
/// which is why the guard only consults it every `memory_check_interval`
/// visited nodes.
struct MemoryProbe {
    system: System,
    pid: Pid,
}

impl MemoryProbe {
    fn new() -> Option<Self> {
        match sysinfo::get_current_pid() {
            Ok(pid) => Some(Self {
                system: System::new(),
                pid,
            }),
            Err(e) => {
                warn!("cannot resolve current pid, memory ceiling disabled: {}", e);
                None
            }
        }
    }

    fn rss_bytes(&mut self) -> Option<u64> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        self.system.process(self.pid).map(|p| p.memory())
    }
}

/// Per-operation counters enforcing the depth, node, memory, and deadline
/// ceilings. The first ceiling to trip wins; the guard itself never retries.
///
/// The memory ceiling is a soft one: it is sampled every
/// `memory_check_interval` nodes, so a breach between samples is caught at
/// the next sample rather than instantly.
pub struct GuardState {
    limits: Limits,
    started: Instant,
    deadline: Instant,
    nodes_visited: u64,
    probe: Option<MemoryProbe>,
}

impl GuardState {
    pub fn new(mut limits: Limits) -> Self {
        limits.memory_check_interval = limits.memory_check_interval.max(1);
        let started = Instant::now();
        Self {
            limits,
            started,
            deadline: started + limits.timeout,
            nodes_visited: 0,
            probe: MemoryProbe::new(),
        }
    }

    /// Checks the depth ceiling before a descent. Called at the point of
    /// recursion so a breach short-circuits immediately, not after the
    /// subtree completes.
    pub fn enter(&self, depth: u32) -> Result<()> {
        if depth > self.limits.max_depth {
            return Err(AnalysisError::DepthLimitExceeded {
                depth,
                max_depth: self.limits.max_depth,
            });
        }
        Ok(())
    }

    /// Accounts one visited node: bumps the node counter, checks the node
    /// ceiling and the deadline, and samples memory at the configured
    /// interval.
    pub fn visit(&mut self) -> Result<()> {
        self.nodes_visited += 1;

        if self.nodes_visited > self.limits.max_nodes {
            return Err(AnalysisError::NodeCountExceeded {
                count: self.nodes_visited,
                max_nodes: self.limits.max_nodes,
            });
        }

        // Cooperative deadline check so a blocking walk winds down close to
        // the point the supervising timeout fires.
        if Instant::now() > self.deadline {
            return Err(AnalysisError::Timeout {
                elapsed_ms: self.started.elapsed().as_millis() as u64,
                budget_ms: self.limits.timeout.as_millis() as u64,
            });
        }

        if self.nodes_visited % self.limits.memory_check_interval == 0 {
            self.check_memory()?;
        }
        Ok(())
    }

    pub fn nodes_visited(&self) -> u64 {
        self.nodes_visited
    }

    fn check_memory(&mut self) -> Result<()> {
        let Some(probe) = self.probe.as_mut() else {
            return Ok(());
        };
        if let Some(used) = probe.rss_bytes() {
            if used > self.limits.max_memory_bytes {
                return Err(AnalysisError::MemoryLimitExceeded {
                    used_bytes: used,
                    max_bytes: self.limits.max_memory_bytes,
                });
            }
        }
        Ok(())
    }
}

/// Runs a CPU-bound parse or walk under the full set of ceilings.
///
/// The operation executes on the blocking pool and is raced against the
/// timeout. On expiry the join handle is dropped: the abandoned task's
/// output is discarded, never merged, and its own cooperative deadline
/// check makes it unwind shortly after. Returns the operation's value plus
/// the number of nodes it visited.
pub async fn run_guarded<T, F>(limits: Limits, op: F) -> Result<(T, u64)>
where
    T: Send + 'static,
    F: FnOnce(&mut GuardState) -> Result<T> + Send + 'static,
{
    let handle: JoinHandle<Result<(T, u64)>> = tokio::task::spawn_blocking(move || {
        let mut guard = GuardState::new(limits);
        let value = op(&mut guard)?;
        Ok((value, guard.nodes_visited()))
    });

    match tokio::time::timeout(limits.timeout, handle).await {
        Ok(joined) => joined.map_err(|e| AnalysisError::Parse(format!("analysis task failed: {}", e)))?,
        Err(_) => Err(AnalysisError::Timeout {
            elapsed_ms: limits.timeout.as_millis() as u64,
            budget_ms: limits.timeout.as_millis() as u64,
        }),
    }
}
