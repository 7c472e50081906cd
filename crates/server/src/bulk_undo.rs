//! Two-phase bulk undo: look up a change snapshot, hold it for confirmation,
//! then replay it as an ordinary draw operation.
//!
//! Phase 1 (`/undoarea`, `/undoplayer`, `/undoplayernot`) validates the
//! selector, runs the BlockDB lookup off the async runtime, and parks the
//! snapshot in the session. Phase 2 is `/ok` within the confirmation window;
//! `/nvm` or the timeout discards the snapshot. Nothing is mutated until
//! phase 2 submits the replay.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ashlar_engine::PlayerId;
use ashlar_engine::blockdb::{BlockDb, BlockDbEntry, ContextFlags, LookupFilter};
use ashlar_engine::geometry::BoundingBox;

use crate::player_registry::PlayerRegistry;

/// How far back to look: a change count or a wall-clock window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoRange {
    Count(usize),
    Age(Duration),
}

/// Whose changes to target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetFilter {
    Everyone,
    Named(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoSelector {
    pub range: UndoRange,
    pub targets: TargetFilter,
    /// Undo everyone *except* the named players.
    pub invert: bool,
}

/// Parse `"90s"`, `"15m"`, `"2h"`, `"7d"` and compounds like `"1h30m"`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let mut total = 0u64;
    let mut digits = String::new();
    let mut saw_unit = false;
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u64 = digits.parse().ok()?;
        digits.clear();
        let scale = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86_400,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(scale)?)?;
        saw_unit = true;
    }
    if !digits.is_empty() || !saw_unit {
        return None;
    }
    Some(Duration::from_secs(total))
}

/// Parse `<count | duration> <player... | *>` selector arguments.
pub fn parse_selector(args: &[&str], invert: bool) -> Result<UndoSelector, String> {
    let Some(first) = args.first() else {
        return Err("usage: <count or duration> <player names, or *>".into());
    };
    let range = if let Ok(count) = first.parse::<usize>() {
        if count == 0 {
            return Err("count must be at least 1".into());
        }
        UndoRange::Count(count)
    } else if let Some(age) = parse_duration(first) {
        UndoRange::Age(age)
    } else {
        return Err(format!("{first} is neither a count nor a duration like 15m or 2h"));
    };

    let names: Vec<&str> = args[1..].to_vec();
    if names.is_empty() {
        return Err("name at least one player, or * for everyone".into());
    }
    let targets = if names.contains(&"*") {
        if invert {
            return Err("* makes no sense with an exclusion filter".into());
        }
        if names.len() > 1 {
            return Err("* cannot be combined with player names".into());
        }
        TargetFilter::Everyone
    } else {
        TargetFilter::Named(names.iter().map(|n| n.to_string()).collect())
    };

    Ok(UndoSelector {
        range,
        targets,
        invert,
    })
}

/// A confirmed-or-discarded change snapshot parked in the session.
#[derive(Debug)]
pub struct PendingUndo {
    pub entries: Vec<BlockDbEntry>,
    pub flags: ContextFlags,
    pub summary: String,
    created: Instant,
}

impl PendingUndo {
    pub fn is_expired(&self, window: Duration) -> bool {
        self.created.elapsed() > window
    }
}

fn describe(selector: &UndoSelector, scope: &str) -> String {
    let who = match &selector.targets {
        TargetFilter::Everyone => "everyone".to_string(),
        TargetFilter::Named(names) if selector.invert => {
            format!("everyone except {}", names.join(", "))
        }
        TargetFilter::Named(names) => names.join(", "),
    };
    let range = match selector.range {
        UndoRange::Count(n) => format!("the last {n} changes"),
        UndoRange::Age(age) => format!("changes in the last {}s", age.as_secs()),
    };
    format!("{range} by {who} {scope}")
}

/// Phase 1: resolve the selector, run the lookup on a blocking worker, and
/// build the confirmation snapshot. `Ok(None)` means nothing matched.
pub async fn prepare(
    db: Arc<BlockDb>,
    registry: &PlayerRegistry,
    own: PlayerId,
    selector: &UndoSelector,
    area: Option<BoundingBox>,
) -> Result<Option<PendingUndo>, String> {
    let mut filter = match selector.range {
        UndoRange::Count(n) => LookupFilter::by_count(n),
        UndoRange::Age(age) => LookupFilter::by_age(age),
    };
    let scope = if let Some(area) = area {
        filter = filter.in_area(area);
        "in the marked area"
    } else {
        "everywhere"
    };

    let mut self_only = false;
    if let TargetFilter::Named(names) = &selector.targets {
        let mut ids: HashSet<PlayerId> = HashSet::with_capacity(names.len());
        for name in names {
            match registry.resolve_name(name) {
                Some(id) => {
                    ids.insert(id);
                }
                None => return Err(format!("{name} has never played here")),
            }
        }
        self_only = !selector.invert && ids.len() == 1 && ids.contains(&own);
        filter = filter.for_players(ids, selector.invert);
    }

    let snapshot_db = Arc::clone(&db);
    let entries = tokio::task::spawn_blocking(move || snapshot_db.lookup(&filter))
        .await
        .map_err(|_| "lookup task failed".to_string())?
        .map_err(|e| e.to_string())?;

    if entries.is_empty() {
        return Ok(None);
    }

    let flags = if self_only {
        ContextFlags::UNDONE_SELF
    } else {
        ContextFlags::UNDONE_OTHER
    };
    let summary = format!(
        "Found {} change(s) matching {}. Type /ok to revert or /nvm to discard.",
        entries.len(),
        describe(selector, scope)
    );
    tracing::info!(matched = entries.len(), "bulk undo snapshot prepared");
    Ok(Some(PendingUndo {
        entries,
        flags,
        summary,
        created: Instant::now(),
    }))
}
